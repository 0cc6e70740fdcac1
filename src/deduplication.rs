// 🔍 Duplicate Merger - detect runners that ended up as two rows
//
// After all races are folded, two rows in one category whose normalized
// names match are shown to a DuplicateResolver (operator or policy):
//   KeepLeft  - merge, left row's values win
//   KeepRight - merge, right row's values win
//   KeepBoth  - different people, leave both rows

use crate::aggregate::{AggregateRow, CategoryTable};
use crate::error::{RaceId, RankingError, Result};
use crate::identity::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::str::FromStr;
use tracing::{debug, info};

// ============================================================================
// RESOLUTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Merge, left row has priority on every column
    KeepLeft,

    /// Merge, right row has priority on every column
    KeepRight,

    /// Two different runners
    KeepBoth,
}

impl FromStr for Resolution {
    type Err = String;

    /// Accepts the prompt codes (1/2/3) and their spelled-out forms
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "l" | "left" | "keep-left" => Ok(Resolution::KeepLeft),
            "2" | "r" | "right" | "keep-right" => Ok(Resolution::KeepRight),
            "3" | "b" | "both" | "keep-both" => Ok(Resolution::KeepBoth),
            other => Err(format!("unknown resolution '{}'", other)),
        }
    }
}

// ============================================================================
// CANDIDATE + RESOLVER CAPABILITY
// ============================================================================

/// Two rows of one category that look like the same runner
#[derive(Debug, Clone)]
pub struct DuplicateCandidate<'a> {
    pub category: &'a str,
    pub left: &'a AggregateRow,
    pub right: &'a AggregateRow,

    /// Every race column of the table, ascending
    pub race_ids: &'a [RaceId],
}

/// Decision-maker for duplicate candidates (console prompt, scripted answers, policy)
///
/// Returning an error means no resolution could be reached; the merger then
/// stops that category with UnresolvedDuplicate instead of guessing.
pub trait DuplicateResolver {
    fn resolve(&mut self, candidate: &DuplicateCandidate<'_>) -> anyhow::Result<Resolution>;
}

/// Answers from a fixed queue, for tests and replays of earlier decisions
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<Resolution>,
    asked: usize,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = Resolution>) -> Self {
        ScriptedResolver {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl DuplicateResolver for ScriptedResolver {
    fn resolve(&mut self, candidate: &DuplicateCandidate<'_>) -> anyhow::Result<Resolution> {
        self.asked += 1;
        self.answers.pop_front().ok_or_else(|| {
            anyhow::anyhow!(
                "no scripted answer left for '{}' / '{}'",
                candidate.left.name,
                candidate.right.name
            )
        })
    }
}

/// Automated decisions from a function of the candidate
pub struct PolicyResolver<F>
where
    F: FnMut(&DuplicateCandidate<'_>) -> Resolution,
{
    policy: F,
}

impl<F> PolicyResolver<F>
where
    F: FnMut(&DuplicateCandidate<'_>) -> Resolution,
{
    pub fn new(policy: F) -> Self {
        PolicyResolver { policy }
    }
}

impl<F> DuplicateResolver for PolicyResolver<F>
where
    F: FnMut(&DuplicateCandidate<'_>) -> Resolution,
{
    fn resolve(&mut self, candidate: &DuplicateCandidate<'_>) -> anyhow::Result<Resolution> {
        Ok((self.policy)(candidate))
    }
}

// ============================================================================
// MERGE REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub candidates: usize,
    pub merged: usize,
    pub kept_separate: usize,
}

impl MergeReport {
    fn absorb(&mut self, other: &MergeReport) {
        self.candidates += other.candidates;
        self.merged += other.merged;
        self.kept_separate += other.kept_separate;
    }
}

// ============================================================================
// DUPLICATE MERGER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DuplicateMerger;

impl DuplicateMerger {
    pub fn new() -> Self {
        DuplicateMerger
    }

    /// Same normalized name, not already the same identity
    pub fn is_candidate(&self, left: &AggregateRow, right: &AggregateRow) -> bool {
        left.identity != right.identity && normalize_name(&left.name) == normalize_name(&right.name)
    }

    /// Index pairs (i < j) that would be offered to a resolver, before any merge
    pub fn find_candidates(&self, rows: &[AggregateRow]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                if self.is_candidate(&rows[i], &rows[j]) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Column-wise union; the priority row's values win where both have one
    pub fn merge_rows(
        &self,
        left: &AggregateRow,
        right: &AggregateRow,
        resolution: Resolution,
    ) -> AggregateRow {
        let (primary, secondary) = match resolution {
            Resolution::KeepRight => (right, left),
            Resolution::KeepLeft | Resolution::KeepBoth => (left, right),
        };

        // A registration code beats a name key whichever side it came from
        let identity = if primary.identity.is_registered() || !secondary.identity.is_registered() {
            primary.identity.clone()
        } else {
            secondary.identity.clone()
        };

        let mut results = secondary.results.clone();
        results.extend(primary.results.iter().map(|(race, entry)| (*race, *entry)));

        let mut merged_aliases: BTreeSet<_> = primary
            .merged_aliases
            .union(&secondary.merged_aliases)
            .cloned()
            .collect();
        merged_aliases.insert(primary.identity.clone());
        merged_aliases.insert(secondary.identity.clone());
        merged_aliases.remove(&identity);

        AggregateRow {
            identity,
            name: primary.name.clone(),
            registration: primary
                .registration
                .clone()
                .or_else(|| secondary.registration.clone()),
            results,
            merged_aliases,
        }
    }

    /// Pairwise pass over one category. Works on a copy: on error the caller's
    /// rows are untouched.
    pub fn merge_category(
        &self,
        category: &str,
        rows: &[AggregateRow],
        race_ids: &[RaceId],
        resolver: &mut dyn DuplicateResolver,
    ) -> Result<(Vec<AggregateRow>, MergeReport)> {
        let mut rows = rows.to_vec();
        let mut report = MergeReport::default();

        let mut i = 0;
        while i < rows.len() {
            let mut j = i + 1;
            while j < rows.len() {
                if !self.is_candidate(&rows[i], &rows[j]) {
                    j += 1;
                    continue;
                }

                report.candidates += 1;
                let candidate = DuplicateCandidate {
                    category,
                    left: &rows[i],
                    right: &rows[j],
                    race_ids,
                };

                let resolution = resolver.resolve(&candidate).map_err(|e| {
                    RankingError::UnresolvedDuplicate {
                        category: category.to_string(),
                        left: rows[i].name.clone(),
                        right: rows[j].name.clone(),
                        detail: e.to_string(),
                    }
                })?;

                match resolution {
                    Resolution::KeepBoth => {
                        report.kept_separate += 1;
                        j += 1;
                    }
                    Resolution::KeepLeft | Resolution::KeepRight => {
                        // Removed row is gone for good; j now points at the next one
                        let right = rows.remove(j);
                        let merged = self.merge_rows(&rows[i], &right, resolution);
                        info!(
                            category,
                            survivor = %merged.name,
                            identity = %merged.identity,
                            "merged duplicate runner"
                        );
                        rows[i] = merged;
                        report.merged += 1;
                    }
                }
            }
            i += 1;
        }

        Ok((rows, report))
    }

    /// Run the pass over every category of the table, committing each on success
    pub fn merge_table(
        &self,
        table: &mut CategoryTable,
        resolver: &mut dyn DuplicateResolver,
    ) -> Result<MergeReport> {
        let race_ids: Vec<RaceId> = table.race_ids().collect();
        let categories = table.categories().to_vec();
        let mut total = MergeReport::default();

        for category in &categories {
            let (rows, report) =
                self.merge_category(category, table.rows(category), &race_ids, resolver)?;
            debug!(category = %category, ?report, "duplicate pass done");
            table.replace_rows(category, rows)?;
            total.absorb(&report);
        }

        Ok(total)
    }
}

// ============================================================================
// TESTS
// ============================================================================

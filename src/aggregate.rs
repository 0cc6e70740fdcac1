// 📚 Aggregator - fold normalized races into per-category season tables
//
// One AggregateRow per runner identity per category, one (place, points)
// entry per race the runner took part in. Folding a race again replaces
// that race's column, so re-folding is idempotent.

use crate::error::{RaceId, RankingError, Result};
use crate::identity::{resolve_key, RegistrationRules, RunnerIdentity};
use crate::normalizer::RaceResultRow;
use crate::scoring::Place;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

// ============================================================================
// TABLE TYPES
// ============================================================================

/// One race's cell pair in an aggregate row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub place: Place,
    pub points: u32,
}

impl From<&RaceResultRow> for RaceEntry {
    fn from(row: &RaceResultRow) -> Self {
        RaceEntry {
            place: row.place,
            points: row.points,
        }
    }
}

/// A runner's season record in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub identity: RunnerIdentity,
    pub name: String,
    pub registration: Option<String>,

    /// Absent key = did not take part in that race
    pub results: BTreeMap<RaceId, RaceEntry>,

    /// Identities folded into this row by the duplicate merger
    #[serde(default)]
    pub merged_aliases: BTreeSet<RunnerIdentity>,
}

impl AggregateRow {
    pub fn new(identity: RunnerIdentity, name: &str) -> Self {
        let registration = identity.registration().map(str::to_string);
        AggregateRow {
            identity,
            name: name.to_string(),
            registration,
            results: BTreeMap::new(),
            merged_aliases: BTreeSet::new(),
        }
    }

    pub fn entry(&self, race_id: RaceId) -> Option<&RaceEntry> {
        self.results.get(&race_id)
    }

    /// Points of every race actually attended
    pub fn recorded_points(&self) -> Vec<u32> {
        self.results.values().map(|e| e.points).collect()
    }

    pub fn races_attended(&self) -> usize {
        self.results.len()
    }

    pub fn answers_to(&self, identity: &RunnerIdentity) -> bool {
        &self.identity == identity || self.merged_aliases.contains(identity)
    }
}

/// Category code → ordered aggregate rows, plus the races folded so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    /// Closed category set in configured order
    categories: Vec<String>,
    rows: HashMap<String, Vec<AggregateRow>>,
    races: BTreeSet<RaceId>,
}

impl CategoryTable {
    pub fn new(categories: &[String]) -> Self {
        let rows = categories
            .iter()
            .map(|c| (c.clone(), Vec::new()))
            .collect();
        CategoryTable {
            categories: categories.to_vec(),
            rows,
            races: BTreeSet::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn rows(&self, category: &str) -> &[AggregateRow] {
        self.rows.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows_mut(&mut self, category: &str) -> Result<&mut Vec<AggregateRow>> {
        self.rows
            .get_mut(category)
            .ok_or_else(|| RankingError::UnknownCategory(category.to_string()))
    }

    /// Swap in a fully processed set of rows for one category
    pub fn replace_rows(&mut self, category: &str, rows: Vec<AggregateRow>) -> Result<()> {
        *self.rows_mut(category)? = rows;
        Ok(())
    }

    /// Races folded into the table, ascending
    pub fn race_ids(&self) -> impl Iterator<Item = RaceId> + '_ {
        self.races.iter().copied()
    }

    pub fn race_count(&self) -> usize {
        self.races.len()
    }

    pub fn runner_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.rows.contains_key(category)
    }
}

// ============================================================================
// FOLD
// ============================================================================

/// Outcome of folding one race
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FoldReport {
    pub race_id: RaceId,
    pub folded: usize,
    pub new_runners: usize,

    /// AmbiguousIdentity reports for rows left out of the fold
    pub warnings: Vec<RankingError>,
}

/// A row that passed validation and is about to be written
struct PlannedEntry<'a> {
    category: &'a str,
    identity: RunnerIdentity,
    row: &'a RaceResultRow,
}

pub struct Aggregator {
    pub rules: RegistrationRules,
}

impl Aggregator {
    pub fn new(rules: RegistrationRules) -> Self {
        Aggregator { rules }
    }

    /// Fold one normalized race into the table.
    ///
    /// Validation happens before any write: an unknown category rejects the
    /// whole race and leaves the table untouched.
    pub fn fold(
        &self,
        table: &mut CategoryTable,
        race_id: RaceId,
        rows: &[RaceResultRow],
    ) -> Result<FoldReport> {
        let mut report = FoldReport {
            race_id,
            ..FoldReport::default()
        };

        // Pass 1: resolve and validate
        let mut planned: Vec<PlannedEntry> = Vec::with_capacity(rows.len());
        let mut seen: HashSet<(&str, RunnerIdentity)> = HashSet::new();

        for row in rows {
            let category = row.category.as_str();
            if !table.has_category(category) {
                return Err(RankingError::UnknownCategory(category.to_string()));
            }

            let identity = resolve_key(row, &self.rules);

            let target = match target_identity(table.rows(category), &identity) {
                Ok(target) => target,
                Err(reason) => {
                    report.warnings.push(self.ambiguous(race_id, row, reason));
                    continue;
                }
            };

            if !seen.insert((category, target.clone())) {
                let reason = match &identity {
                    _ if target != identity => {
                        "runner already in this race under an identity merged into the same record"
                    }
                    RunnerIdentity::Unregistered(_) => {
                        "another unregistered runner with the same name in this race"
                    }
                    RunnerIdentity::Registered(_) => "registration code appears twice in this race",
                };
                report.warnings.push(self.ambiguous(race_id, row, reason));
                continue;
            }

            planned.push(PlannedEntry {
                category,
                identity: target,
                row,
            });
        }

        // Pass 2: replace this race's column in place
        let refolded = self.clear_race(table, race_id);

        for entry in planned {
            let category_rows = table.rows_mut(entry.category)?;
            match category_rows.iter_mut().find(|r| r.identity == entry.identity) {
                Some(existing) => {
                    existing.results.insert(race_id, RaceEntry::from(entry.row));
                }
                None => {
                    let mut new_row = AggregateRow::new(entry.identity, &entry.row.name);
                    new_row.results.insert(race_id, RaceEntry::from(entry.row));
                    category_rows.push(new_row);
                    report.new_runners += 1;
                }
            }
            report.folded += 1;
        }

        if refolded {
            for rows in table.rows.values_mut() {
                rows.retain(|r| !r.results.is_empty());
            }
        }
        table.races.insert(race_id);

        debug!(
            race_id,
            folded = report.folded,
            new_runners = report.new_runners,
            warnings = report.warnings.len(),
            "race folded"
        );

        Ok(report)
    }

    /// Drop any earlier entries for `race_id` without moving rows.
    /// Returns whether the race had been folded before.
    fn clear_race(&self, table: &mut CategoryTable, race_id: RaceId) -> bool {
        if !table.races.contains(&race_id) {
            return false;
        }
        for rows in table.rows.values_mut() {
            for row in rows.iter_mut() {
                row.results.remove(&race_id);
            }
        }
        true
    }

    fn ambiguous(&self, race_id: RaceId, row: &RaceResultRow, reason: &str) -> RankingError {
        warn!(race_id, category = %row.category, name = %row.name, reason, "row not folded");
        RankingError::AmbiguousIdentity {
            race_id,
            category: row.category.clone(),
            name: row.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Identity of the row a resolved key folds into.
///
/// A registration code merged away into a survivor folds into that survivor.
/// A name key that only matches a merged alias is ambiguous.
fn target_identity(
    rows: &[AggregateRow],
    identity: &RunnerIdentity,
) -> std::result::Result<RunnerIdentity, &'static str> {
    if rows.iter().any(|r| &r.identity == identity) {
        return Ok(identity.clone());
    }
    match rows.iter().find(|r| r.answers_to(identity)) {
        Some(survivor) if identity.is_registered() => Ok(survivor.identity.clone()),
        Some(_) => Err("name matches a runner already merged into another record"),
        None => Ok(identity.clone()),
    }
}

// ============================================================================
// TESTS
// ============================================================================

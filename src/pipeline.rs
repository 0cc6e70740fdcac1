// Season pipeline: normalize → fold → merge duplicates → best-N standings
//
// The CategoryTable is created here and owned by one call; races are folded
// one after another in ascending id order.

use crate::aggregate::{Aggregator, CategoryTable, FoldReport};
use crate::config::SeasonConfig;
use crate::deduplication::{DuplicateMerger, DuplicateResolver, MergeReport};
use crate::error::{RaceId, RankingError, Result};
use crate::loader::RaceResults;
use crate::normalizer::normalize_race;
use crate::standings::{BestNSelector, Standings};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonReport {
    pub folds: Vec<FoldReport>,

    /// Races rejected wholesale (FormatError / InvalidRank / UnknownCategory)
    pub rejected: Vec<(RaceId, RankingError)>,

    /// Rows outside the series categories, over all races
    pub skipped_rows: usize,

    pub merge: MergeReport,
}

impl SeasonReport {
    /// AmbiguousIdentity reports from every fold
    pub fn warnings(&self) -> impl Iterator<Item = &RankingError> {
        self.folds.iter().flat_map(|f| f.warnings.iter())
    }

    pub fn folded_races(&self) -> Vec<RaceId> {
        self.folds.iter().map(|f| f.race_id).collect()
    }
}

pub struct SeasonPipeline<'a> {
    config: &'a SeasonConfig,
    aggregator: Aggregator,
    merger: DuplicateMerger,
}

impl<'a> SeasonPipeline<'a> {
    pub fn new(config: &'a SeasonConfig) -> Self {
        SeasonPipeline {
            config,
            aggregator: Aggregator::new(config.registration.clone()),
            merger: DuplicateMerger::new(),
        }
    }

    /// Normalize and fold every race. A broken race is reported and skipped;
    /// the others still fold.
    pub fn build_table(&self, mut races: Vec<RaceResults>) -> (CategoryTable, SeasonReport) {
        races.sort_by_key(|r| r.race_id);

        let mut table = CategoryTable::new(&self.config.categories);
        let mut report = SeasonReport::default();

        for race in &races {
            match self.fold_race(&mut table, race) {
                Ok((fold, skipped)) => {
                    report.skipped_rows += skipped;
                    report.folds.push(fold);
                }
                Err(e) => {
                    warn!(race_id = race.race_id, error = %e, "race rejected");
                    report.rejected.push((race.race_id, e));
                }
            }
        }

        (table, report)
    }

    fn fold_race(&self, table: &mut CategoryTable, race: &RaceResults) -> Result<(FoldReport, usize)> {
        let normalized = normalize_race(race.race_id, &race.rows, self.config)?;
        let fold = self
            .aggregator
            .fold(table, normalized.race_id, &normalized.rows)?;
        Ok((fold, normalized.skipped_rows))
    }

    /// Full run. An unresolved duplicate stops the run; nothing is ranked.
    pub fn run(
        &self,
        races: Vec<RaceResults>,
        resolver: &mut dyn DuplicateResolver,
    ) -> Result<(Standings, SeasonReport)> {
        let (mut table, mut report) = self.build_table(races);

        report.merge = self.merger.merge_table(&mut table, resolver)?;

        let standings = BestNSelector::select(&table);
        info!(
            races = table.race_count(),
            runners = table.runner_count(),
            merged = report.merge.merged,
            "standings computed"
        );

        Ok((standings, report))
    }
}

// Series Ranking - Core Library
// Season standings for an orienteering race series, used by the CLI and tests

pub mod error;
pub mod scoring;        // Place → points
pub mod normalizer;     // Raw race rows → canonical rows
pub mod identity;       // Registration code or normalized name
pub mod aggregate;      // Fold races into per-category tables
pub mod deduplication;  // Merge residual duplicate runners
pub mod standings;      // Best-N-of-M totals and order
pub mod pipeline;
pub mod config;
pub mod loader;
pub mod export;
pub mod prompt;

// Re-export commonly used types
pub use error::{RaceId, RankingError};
pub use scoring::{score, score_rank, Place};
pub use normalizer::{normalize_race, NormalizedRace, RaceResultRow, RawResultRow, Registration};
pub use identity::{normalize_name, resolve_key, RegistrationRules, RunnerIdentity};
pub use aggregate::{AggregateRow, Aggregator, CategoryTable, FoldReport, RaceEntry};
pub use deduplication::{
    DuplicateCandidate, DuplicateMerger, DuplicateResolver, MergeReport,
    PolicyResolver, Resolution, ScriptedResolver,
};
pub use standings::{best_n_total, counted_results, BestNSelector, CategoryStandings, RankedRow, Standings};
pub use pipeline::{SeasonPipeline, SeasonReport};
pub use config::SeasonConfig;
pub use loader::{CsvRaceLoader, PointsDirLoader, RaceInfo, RaceLoader, RaceResults};
#[cfg(feature = "oris")]
pub use loader::OrisClient;
pub use export::{write_race_points, write_standings};
pub use prompt::ConsoleResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

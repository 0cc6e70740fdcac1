// ⚠️ Ranking Errors - typed failures of the ranking core
// I/O and CLI layers wrap these in anyhow with context

use thiserror::Error;

/// Race identifier as issued by the results service (ORIS event id)
pub type RaceId = u32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    /// Scoring was asked for a rank below 1 that is not the disqualification sentinel
    #[error("invalid rank {rank}: places start at 1")]
    InvalidRank { rank: i64 },

    /// A row of a race could not be normalized; the whole race is rejected
    #[error("race {race_id}, row {line}: {detail}")]
    FormatError {
        race_id: RaceId,
        line: usize,
        detail: String,
    },

    /// Two unregistered runners share a normalized name; the row was not folded
    #[error("race {race_id}, category {category}: ambiguous runner '{name}' ({reason})")]
    AmbiguousIdentity {
        race_id: RaceId,
        category: String,
        name: String,
        reason: String,
    },

    /// The duplicate resolver gave no usable answer for a candidate pair
    #[error("category {category}: unresolved duplicate '{left}' / '{right}': {detail}")]
    UnresolvedDuplicate {
        category: String,
        left: String,
        right: String,
        detail: String,
    },

    /// Category code outside the configured closed set
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

pub type Result<T> = std::result::Result<T, RankingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_mentions_race() {
        let err = RankingError::FormatError {
            race_id: 7421,
            line: 12,
            detail: "unparseable place 'abc'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("7421"));
        assert!(msg.contains("row 12"));
    }
}

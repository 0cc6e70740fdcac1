// 🏅 Scoring Function - finishing place → series points
//
//   1st = 200, 2nd = 190, 3rd = 182, 4th = 176, 5th = 172
//   6th and below = 176 - place, floored at 0
//   disqualified = 0

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points for the five podium-ish places that sit above the linear tail
const TOP_PLACES: [u32; 5] = [200, 190, 182, 176, 172];

/// Linear tail: place r (r >= 6) scores BASE - r
const TAIL_BASE: u32 = 176;

// ============================================================================
// PLACE
// ============================================================================

/// Finishing place of one runner in one race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Place {
    /// Classified finisher, rank >= 1
    Ranked(u32),

    /// Did not finish, mispunched, disqualified
    Disqualified,
}

impl Place {
    /// Build a classified place from a raw rank
    pub fn ranked(rank: i64) -> Result<Place> {
        if rank < 1 {
            return Err(RankingError::InvalidRank { rank });
        }
        // Ranks beyond u32 score 0 anyway
        Ok(Place::Ranked(u32::try_from(rank).unwrap_or(u32::MAX)))
    }

    pub fn rank(&self) -> Option<u32> {
        match self {
            Place::Ranked(r) => Some(*r),
            Place::Disqualified => None,
        }
    }

    /// Source convention: ordinal with trailing dot ("1."), blank when disqualified
    pub fn to_ordinal(&self) -> String {
        match self {
            Place::Ranked(r) => format!("{}.", r),
            Place::Disqualified => String::new(),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Ranked(r) => write!(f, "{}.", r),
            Place::Disqualified => write!(f, "DISK"),
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// Points awarded for a place. Total over every `Place` value.
pub fn score(place: Place) -> u32 {
    match place {
        Place::Disqualified => 0,
        Place::Ranked(0) => 0, // unreachable through Place::ranked
        Place::Ranked(r) if r as usize <= TOP_PLACES.len() => TOP_PLACES[r as usize - 1],
        Place::Ranked(r) => TAIL_BASE.saturating_sub(r),
    }
}

/// Points for a raw integer rank; fails with InvalidRank for rank < 1
pub fn score_rank(rank: i64) -> Result<u32> {
    Place::ranked(rank).map(score)
}

// ============================================================================
// TESTS
// ============================================================================

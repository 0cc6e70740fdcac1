// 🧹 Race Normalizer - raw result rows → canonical RaceResultRow
//
// Rules:
//   - blank registration → Unregistered (also the exported "nereg." marker)
//   - blank place or a disqualification marker → Disqualified
//   - "12." (ordinal with trailing dot) → 12, bare "12" accepted too
//   - anything else unparseable → FormatError, whole race rejected
//   - rows outside the configured categories are not part of the series

use crate::config::SeasonConfig;
use crate::error::{RaceId, RankingError, Result};
use crate::scoring::{score, Place};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker written for runners without a registration code
pub const UNREGISTERED_MARKER: &str = "nereg.";

// ============================================================================
// CORE TYPES
// ============================================================================

/// One row exactly as delivered by a race loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResultRow {
    #[serde(rename = "ClassDesc")]
    pub category: String,

    #[serde(rename = "Place", default)]
    pub place_text: String,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "RegNo", default)]
    pub registration_text: String,

    #[serde(rename = "Time", default)]
    pub time_text: String,
}

impl RawResultRow {
    pub fn new(category: &str, place: &str, name: &str, registration: &str, time: &str) -> Self {
        RawResultRow {
            category: category.to_string(),
            place_text: place.to_string(),
            name: name.to_string(),
            registration_text: registration.to_string(),
            time_text: time.to_string(),
        }
    }
}

/// Registration as seen in a race: some text, or explicitly none
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Registration {
    Code(String),
    Unregistered,
}

impl Registration {
    pub fn parse(text: &str) -> Registration {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == UNREGISTERED_MARKER {
            Registration::Unregistered
        } else {
            Registration::Code(trimmed.to_string())
        }
    }

    pub fn as_code(&self) -> Option<&str> {
        match self {
            Registration::Code(code) => Some(code),
            Registration::Unregistered => None,
        }
    }

    /// Text form used in exported tables
    pub fn display(&self) -> &str {
        self.as_code().unwrap_or(UNREGISTERED_MARKER)
    }
}

/// One runner's result in one race. `points` always equals `score(place)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResultRow {
    pub category: String,
    pub place: Place,
    pub name: String,
    pub registration: Registration,
    pub time: String,
    pub points: u32,
}

impl RaceResultRow {
    pub fn new(
        category: &str,
        place: Place,
        name: &str,
        registration: Registration,
        time: &str,
    ) -> Self {
        RaceResultRow {
            category: category.to_string(),
            place,
            name: name.to_string(),
            registration,
            time: time.to_string(),
            points: score(place),
        }
    }
}

/// Output of normalizing one race
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRace {
    pub race_id: RaceId,
    pub rows: Vec<RaceResultRow>,

    /// Rows dropped because their category is not scored by the series
    pub skipped_rows: usize,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Parse place text. Ok(None) means "not a place at all".
fn parse_place(text: &str, config: &SeasonConfig) -> Result<Option<Place>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || config.is_disqualification_marker(trimmed) {
        return Ok(Some(Place::Disqualified));
    }

    let digits = trimmed.strip_suffix('.').unwrap_or(trimmed).trim();
    match digits.parse::<i64>() {
        Ok(rank) => Place::ranked(rank).map(Some),
        Err(_) => Ok(None),
    }
}

/// Normalize one race wholesale: either every row converts or the race is rejected
pub fn normalize_race(
    race_id: RaceId,
    raw_rows: &[RawResultRow],
    config: &SeasonConfig,
) -> Result<NormalizedRace> {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut skipped_rows = 0;

    for (index, raw) in raw_rows.iter().enumerate() {
        let line = index + 1;
        let category = raw.category.trim();

        // Place is validated before the category filter so a broken payload
        // is rejected even if the broken row belongs to an unscored class
        let place = match parse_place(&raw.place_text, config)? {
            Some(place) => place,
            None => {
                return Err(RankingError::FormatError {
                    race_id,
                    line,
                    detail: format!("unparseable place '{}'", raw.place_text),
                });
            }
        };

        if !config.has_category(category) {
            debug!(race_id, line, category, "skipping row outside series categories");
            skipped_rows += 1;
            continue;
        }

        let name = raw.name.trim();
        if name.is_empty() {
            return Err(RankingError::FormatError {
                race_id,
                line,
                detail: "missing runner name".to_string(),
            });
        }

        rows.push(RaceResultRow::new(
            category,
            place,
            name,
            Registration::parse(&raw.registration_text),
            raw.time_text.trim(),
        ));
    }

    Ok(NormalizedRace {
        race_id,
        rows,
        skipped_rows,
    })
}

// ============================================================================
// TESTS
// ============================================================================

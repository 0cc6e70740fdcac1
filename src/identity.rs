// 🪪 Identity Resolver - who is this runner?
//
// Two tiers:
//   1. Registration code, when well-formed (authoritative, externally issued)
//   2. Normalized name otherwise (diacritics stripped, case-folded)
//
// Names collide, which is why the duplicate merger runs after the fold.

use crate::normalizer::{RaceResultRow, Registration};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGISTRATION RULES
// ============================================================================

/// Shape of a valid registration code: fixed length, leading uppercase letter in range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationRules {
    pub length: usize,
    pub first_letter_min: char,
    pub first_letter_max: char,
}

impl Default for RegistrationRules {
    fn default() -> Self {
        RegistrationRules {
            length: 7,
            first_letter_min: 'A',
            first_letter_max: 'Z',
        }
    }
}

impl RegistrationRules {
    pub fn is_valid(&self, code: &str) -> bool {
        if code.chars().count() != self.length {
            return false;
        }
        match code.chars().next() {
            Some(first) => {
                first.is_ascii_uppercase()
                    && first >= self.first_letter_min
                    && first <= self.first_letter_max
            }
            None => false,
        }
    }
}

// ============================================================================
// RUNNER IDENTITY
// ============================================================================

/// Key used to fold results across races
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunnerIdentity {
    /// Well-formed registration code
    Registered(String),

    /// Normalized name of a runner without a valid code
    Unregistered(String),
}

impl RunnerIdentity {
    pub fn is_registered(&self) -> bool {
        matches!(self, RunnerIdentity::Registered(_))
    }

    pub fn registration(&self) -> Option<&str> {
        match self {
            RunnerIdentity::Registered(code) => Some(code),
            RunnerIdentity::Unregistered(_) => None,
        }
    }
}

impl fmt::Display for RunnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerIdentity::Registered(code) => write!(f, "reg:{}", code),
            RunnerIdentity::Unregistered(name) => write!(f, "name:{}", name),
        }
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Case-folded, diacritics-stripped, whitespace-collapsed name
///
/// "Jiří  Novák" → "jiri novak"
pub fn normalize_name(name: &str) -> String {
    let stripped: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity of a single result row; deterministic and pure
pub fn resolve_key(row: &RaceResultRow, rules: &RegistrationRules) -> RunnerIdentity {
    resolve_parts(&row.name, &row.registration, rules)
}

/// Identity from a display name and a registration, shared with aggregate rows
pub fn resolve_parts(
    name: &str,
    registration: &Registration,
    rules: &RegistrationRules,
) -> RunnerIdentity {
    match registration {
        Registration::Code(code) if rules.is_valid(code) => {
            RunnerIdentity::Registered(code.clone())
        }
        // Malformed codes are treated as no code at all
        _ => RunnerIdentity::Unregistered(normalize_name(name)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Place;

    fn create_test_row(name: &str, registration: Registration) -> RaceResultRow {
        RaceResultRow {
            category: "H".to_string(),
            place: Place::Ranked(1),
            name: name.to_string(),
            registration,
            time: "25:13".to_string(),
            points: 200,
        }
    }

    #[test]
    fn test_normalize_name_strips_diacritics() {
        assert_eq!(normalize_name("Jiří Novák"), "jiri novak");
        assert_eq!(normalize_name("ŽOFIE Šťastná"), "zofie stastna");
        assert_eq!(normalize_name("  Petr   Dvořák "), "petr dvorak");
    }

    #[test]
    fn test_valid_registration_is_primary_key() {
        let rules = RegistrationRules::default();
        let row = create_test_row("Jan Novák", Registration::Code("A123456".to_string()));

        assert_eq!(
            resolve_key(&row, &rules),
            RunnerIdentity::Registered("A123456".to_string())
        );
    }

    #[test]
    fn test_wrong_length_falls_back_to_name() {
        let rules = RegistrationRules::default();
        let row = create_test_row("Jan Novák", Registration::Code("A12345".to_string()));

        assert_eq!(
            resolve_key(&row, &rules),
            RunnerIdentity::Unregistered("jan novak".to_string())
        );
    }

    #[test]
    fn test_lowercase_or_out_of_range_letter_falls_back_to_name() {
        let rules = RegistrationRules {
            length: 7,
            first_letter_min: 'A',
            first_letter_max: 'M',
        };

        let lower = create_test_row("Eva Malá", Registration::Code("a123456".to_string()));
        let out_of_range = create_test_row("Eva Malá", Registration::Code("Z123456".to_string()));
        let digit = create_test_row("Eva Malá", Registration::Code("1234567".to_string()));

        for row in [lower, out_of_range, digit] {
            assert_eq!(
                resolve_key(&row, &rules),
                RunnerIdentity::Unregistered("eva mala".to_string())
            );
        }
    }

    #[test]
    fn test_unregistered_uses_name() {
        let rules = RegistrationRules::default();
        let row = create_test_row("Eva Malá", Registration::Unregistered);

        let key = resolve_key(&row, &rules);
        assert!(!key.is_registered());
        assert_eq!(key.registration(), None);
        assert_eq!(key, RunnerIdentity::Unregistered("eva mala".to_string()));
    }

    #[test]
    fn test_same_name_different_variant_not_equal() {
        assert_ne!(
            RunnerIdentity::Registered("eva mala".to_string()),
            RunnerIdentity::Unregistered("eva mala".to_string())
        );
    }
}

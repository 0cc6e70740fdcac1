// Season configuration
// Loaded from series.toml in the working directory (or --config PATH)

use crate::identity::RegistrationRules;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "series.toml";

pub const DEFAULT_ORIS_URL: &str = "https://oris.orientacnisporty.cz/API/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    /// Closed set of category codes scored by the series, in output order
    pub categories: Vec<String>,

    /// Shape of a well-formed registration code
    pub registration: RegistrationRules,

    /// Place texts meaning "not classified" (compared case-insensitively)
    pub disqualification_markers: Vec<String>,

    /// Where points_<race>.csv and standings_<category>.csv are written / read
    pub output_dir: PathBuf,

    /// ORIS API endpoint
    pub oris_url: String,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                "H".to_string(),
                "D".to_string(),
                "HD12".to_string(),
                "P".to_string(),
            ],
            registration: RegistrationRules::default(),
            disqualification_markers: vec![
                "DISK".to_string(),
                "DNF".to_string(),
                "DSQ".to_string(),
                "MP".to_string(),
                "NEKL".to_string(),
                "-".to_string(),
            ],
            output_dir: PathBuf::from("."),
            oris_url: DEFAULT_ORIS_URL.to_string(),
        }
    }
}

impl SeasonConfig {
    /// Load from an explicit path, or from series.toml if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: SeasonConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            bail!("config lists no categories");
        }
        let mut seen = std::collections::HashSet::new();
        for category in &self.categories {
            if category.trim().is_empty() {
                bail!("config contains a blank category code");
            }
            if !seen.insert(category.as_str()) {
                bail!("category '{}' listed twice", category);
            }
        }
        let rules = &self.registration;
        if rules.length == 0 {
            bail!("registration.length must be positive");
        }
        if rules.first_letter_min > rules.first_letter_max {
            bail!(
                "registration letter range {}..={} is empty",
                rules.first_letter_min,
                rules.first_letter_max
            );
        }
        Ok(())
    }

    pub fn has_category(&self, code: &str) -> bool {
        self.categories.iter().any(|c| c == code)
    }

    pub fn is_disqualification_marker(&self, text: &str) -> bool {
        self.disqualification_markers
            .iter()
            .any(|m| m.eq_ignore_ascii_case(text))
    }
}

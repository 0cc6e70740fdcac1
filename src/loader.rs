// 📥 Race Loaders - where raw result rows come from
//
// The ranking core only sees RaceResults. Loaders:
//   - CsvRaceLoader    one CSV file with ORIS column names
//   - PointsDirLoader  points_<race>.csv files exported by an earlier `race` run
//   - OrisClient       the ORIS results API (feature "oris")

use crate::error::RaceId;
use crate::export::points_file_name;
use crate::normalizer::RawResultRow;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Event metadata shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceInfo {
    pub name: String,
    pub date: Option<NaiveDate>,
}

/// Everything a loader hands to the ranking core for one race
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResults {
    pub race_id: RaceId,
    pub info: Option<RaceInfo>,
    pub rows: Vec<RawResultRow>,
}

impl RaceResults {
    pub fn new(race_id: RaceId, rows: Vec<RawResultRow>) -> Self {
        RaceResults {
            race_id,
            info: None,
            rows,
        }
    }

    pub fn with_info(mut self, info: RaceInfo) -> Self {
        self.info = Some(info);
        self
    }
}

/// Source of per-race raw rows
pub trait RaceLoader {
    /// Load all rows of one race, or fail before the core is involved
    fn load(&self, race_id: RaceId) -> Result<RaceResults>;

    /// Short description for logs
    fn source_name(&self) -> String;
}

// ============================================================================
// CSV
// ============================================================================

/// Read raw rows from CSV (headers ClassDesc, Place, Name, RegNo, Time; others ignored)
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawResultRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row: RawResultRow = result
            .with_context(|| format!("Failed to read row {} of {}", index + 1, path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}

/// One race supplied as a CSV file
pub struct CsvRaceLoader {
    path: PathBuf,
}

impl CsvRaceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvRaceLoader { path: path.into() }
    }
}

impl RaceLoader for CsvRaceLoader {
    fn load(&self, race_id: RaceId) -> Result<RaceResults> {
        Ok(RaceResults::new(race_id, read_raw_rows(&self.path)?))
    }

    fn source_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Directory of points_<race>.csv files from earlier `race` runs
pub struct PointsDirLoader {
    dir: PathBuf,
}

impl PointsDirLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PointsDirLoader { dir: dir.into() }
    }

    /// Race ids with an exported points file, ascending
    pub fn race_ids(&self) -> Result<Vec<RaceId>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(id) = file_name.to_str().and_then(parse_points_file_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn load_all(&self) -> Result<Vec<RaceResults>> {
        self.race_ids()?
            .into_iter()
            .map(|id| self.load(id))
            .collect()
    }
}

impl RaceLoader for PointsDirLoader {
    fn load(&self, race_id: RaceId) -> Result<RaceResults> {
        let path = self.dir.join(points_file_name(race_id));
        Ok(RaceResults::new(race_id, read_raw_rows(&path)?))
    }

    fn source_name(&self) -> String {
        self.dir.display().to_string()
    }
}

/// "points_7421.csv" → 7421
fn parse_points_file_name(name: &str) -> Option<RaceId> {
    name.strip_prefix("points_")?
        .strip_suffix(".csv")?
        .parse()
        .ok()
}

// ============================================================================
// ORIS API
// ============================================================================

/// ORIS field as text: strings as-is, numbers printed, null/missing empty
fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn check_status(response: &Value) -> Result<()> {
    match response.get("Status").and_then(Value::as_str) {
        Some("OK") => Ok(()),
        Some(other) => Err(anyhow!("ORIS returned status '{}'", other)),
        None => Err(anyhow!("ORIS response has no Status field")),
    }
}

/// Parse a getEvent response
pub fn parse_event_info(response: &Value) -> Result<RaceInfo> {
    check_status(response)?;
    let data = response
        .get("Data")
        .ok_or_else(|| anyhow!("ORIS event response has no Data"))?;

    let date_text = field_text(data, "Date");
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").ok();

    Ok(RaceInfo {
        name: field_text(data, "Name"),
        date,
    })
}

/// Parse a getEventResults response into raw rows ordered by result ID
pub fn parse_event_results(response: &Value) -> Result<Vec<RawResultRow>> {
    check_status(response)?;

    let data = match response.get("Data") {
        Some(Value::Object(map)) => map,
        // ORIS sends an empty array when a race has no results yet
        Some(Value::Array(items)) if items.is_empty() => return Ok(Vec::new()),
        _ => return Err(anyhow!("ORIS results response has no Data object")),
    };

    let mut keyed: Vec<(u64, RawResultRow)> = data
        .values()
        .map(|item| {
            let id = field_text(item, "ID").parse().unwrap_or(u64::MAX);
            let row = RawResultRow {
                category: field_text(item, "ClassDesc"),
                place_text: field_text(item, "Place"),
                name: field_text(item, "Name"),
                registration_text: field_text(item, "RegNo"),
                time_text: field_text(item, "Time"),
            };
            (id, row)
        })
        .collect();

    keyed.sort_by_key(|(id, _)| *id);
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Blocking client for the ORIS JSON API. No retries: a failed request fails the race.
#[cfg(feature = "oris")]
pub struct OrisClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

#[cfg(feature = "oris")]
impl OrisClient {
    pub fn new(base_url: &str) -> Self {
        OrisClient {
            base_url: base_url.to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    fn call(&self, method: &str, id_param: &str, race_id: RaceId) -> Result<Value> {
        tracing::debug!(method, race_id, "calling ORIS");
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("format", "json".to_string()),
                ("method", method.to_string()),
                (id_param, race_id.to_string()),
            ])
            .send()
            .with_context(|| format!("Failed to reach ORIS ({})", self.base_url))?
            .error_for_status()
            .context("ORIS request failed")?;

        response
            .json::<Value>()
            .with_context(|| format!("ORIS {} returned invalid JSON", method))
    }

    pub fn event_info(&self, race_id: RaceId) -> Result<RaceInfo> {
        parse_event_info(&self.call("getEvent", "id", race_id)?)
    }

    pub fn event_results(&self, race_id: RaceId) -> Result<Vec<RawResultRow>> {
        parse_event_results(&self.call("getEventResults", "eventid", race_id)?)
    }
}

#[cfg(feature = "oris")]
impl RaceLoader for OrisClient {
    fn load(&self, race_id: RaceId) -> Result<RaceResults> {
        let info = self.event_info(race_id)?;
        let rows = self.event_results(race_id)?;
        Ok(RaceResults::new(race_id, rows).with_info(info))
    }

    fn source_name(&self) -> String {
        format!("ORIS ({})", self.base_url)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_points_file_name() {
        assert_eq!(parse_points_file_name("points_7421.csv"), Some(7421));
        assert_eq!(parse_points_file_name("points_abc.csv"), None);
        assert_eq!(parse_points_file_name("standings_H.csv"), None);
    }

    #[test]
    fn test_parse_event_info() {
        let response = json!({
            "Status": "OK",
            "Data": { "Name": "BZL 3 - Hády", "Date": "2024-01-13" }
        });

        let info = parse_event_info(&response).unwrap();

        assert_eq!(info.name, "BZL 3 - Hády");
        assert_eq!(info.date, NaiveDate::from_ymd_opt(2024, 1, 13));
    }

    #[test]
    fn test_bad_status_is_error() {
        let response = json!({ "Status": "Bad event id", "Data": null });
        assert!(parse_event_info(&response).is_err());
        assert!(parse_event_results(&response).is_err());
    }

    #[test]
    fn test_parse_event_results_orders_by_id() {
        let response = json!({
            "Status": "OK",
            "Data": {
                "Result_12": {
                    "ID": "12", "ClassDesc": "H", "Place": "2.", "Name": "Petr Malý",
                    "RegNo": "B654321", "UserID": "99", "Time": "41:20"
                },
                "Result_3": {
                    "ID": "3", "ClassDesc": "H", "Place": "1.", "Name": "Jan Novák",
                    "RegNo": null, "UserID": null, "Time": "38:02"
                }
            }
        });

        let rows = parse_event_results(&response).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Jan Novák");
        assert_eq!(rows[0].registration_text, "");
        assert_eq!(rows[1].place_text, "2.");
    }

    #[test]
    fn test_empty_results_array() {
        let response = json!({ "Status": "OK", "Data": [] });
        assert!(parse_event_results(&response).unwrap().is_empty());
    }

    #[test]
    fn test_read_raw_rows_ignores_extra_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ClassDesc,Place,Name,RegNo,UserID,Time").unwrap();
        writeln!(file, "H,1.,Jan Novák,A123456,17,31:02").unwrap();
        writeln!(file, "D,,Eva Malá,,,").unwrap();

        let rows = read_raw_rows(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawResultRow::new("H", "1.", "Jan Novák", "A123456", "31:02"));
        assert_eq!(rows[1].place_text, "");
    }
}

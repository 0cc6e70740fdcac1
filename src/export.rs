// 📤 Results Writer - flat CSV tables
//
//   points_<race>.csv       one normalized race with points
//   standings_<category>.csv one category's season standings

use crate::error::RaceId;
use crate::normalizer::RaceResultRow;
use crate::standings::{CategoryStandings, Standings};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn points_file_name(race_id: RaceId) -> String {
    format!("points_{}.csv", race_id)
}

pub fn standings_file_name(category: &str) -> String {
    format!("standings_{}.csv", category)
}

/// Exported race row; readable again as a RawResultRow
#[derive(Debug, Serialize)]
struct PointsRecord<'a> {
    #[serde(rename = "ClassDesc")]
    category: &'a str,
    #[serde(rename = "Place")]
    place: String,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "RegNo")]
    registration: &'a str,
    #[serde(rename = "Time")]
    time: &'a str,
    #[serde(rename = "Points")]
    points: u32,
}

impl<'a> From<&'a RaceResultRow> for PointsRecord<'a> {
    fn from(row: &'a RaceResultRow) -> Self {
        PointsRecord {
            category: &row.category,
            place: row.place.to_ordinal(),
            name: &row.name,
            registration: row.registration.display(),
            time: &row.time,
            points: row.points,
        }
    }
}

/// Write points_<race>.csv into `dir`, returning the file path
pub fn write_race_points(dir: &Path, race_id: RaceId, rows: &[RaceResultRow]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(points_file_name(race_id));

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        wtr.serialize(PointsRecord::from(row))?;
    }
    wtr.flush()?;

    Ok(path)
}

/// Header: Rank, Name, RegNo, Place_<id>, Points_<id> per race, Total
pub fn standings_header(race_ids: &[RaceId]) -> Vec<String> {
    let mut header = vec!["Rank".to_string(), "Name".to_string(), "RegNo".to_string()];
    for id in race_ids {
        header.push(format!("Place_{}", id));
        header.push(format!("Points_{}", id));
    }
    header.push("Total".to_string());
    header
}

fn standings_records(standings: &CategoryStandings) -> Vec<Vec<String>> {
    standings
        .rows
        .iter()
        .map(|ranked| {
            let mut record = vec![
                ranked.rank.to_string(),
                ranked.row.name.clone(),
                ranked.row.registration.clone().unwrap_or_default(),
            ];
            for id in &standings.race_ids {
                match ranked.row.entry(*id) {
                    Some(entry) => {
                        record.push(entry.place.to_ordinal());
                        record.push(entry.points.to_string());
                    }
                    None => {
                        record.push(String::new());
                        record.push(String::new());
                    }
                }
            }
            record.push(ranked.total.to_string());
            record
        })
        .collect()
}

pub fn write_category_standings(dir: &Path, standings: &CategoryStandings) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(standings_file_name(&standings.category));

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(standings_header(&standings.race_ids))?;
    for record in standings_records(standings) {
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    Ok(path)
}

/// One file per category, in configured order
pub fn write_standings(dir: &Path, standings: &Standings) -> Result<Vec<PathBuf>> {
    standings
        .categories
        .iter()
        .map(|category| write_category_standings(dir, category))
        .collect()
}

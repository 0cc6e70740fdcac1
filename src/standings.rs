// 🏆 Best-N Selector - season totals and final order
//
// With M races folded, each runner counts their best N = floor(M/2) + 1
// recorded results. Missed races add nothing and never fill a slot.

use crate::aggregate::{AggregateRow, CategoryTable};
use crate::error::RaceId;
use serde::{Deserialize, Serialize};

/// Number of results that count when `races` races have been held
pub fn counted_results(races: usize) -> usize {
    races / 2 + 1
}

/// Sum of the `n` highest values (all of them if fewer than `n`)
pub fn best_n_total(points: &[u32], n: usize) -> u32 {
    let mut sorted = points.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.iter().take(n).sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRow {
    pub row: AggregateRow,
    pub total: u32,

    /// 1-based position; equal totals share a rank
    pub rank: usize,
}

/// Final standings of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStandings {
    pub category: String,
    pub race_ids: Vec<RaceId>,
    pub counted: usize,
    pub rows: Vec<RankedRow>,
}

/// Final standings for the season, categories in configured order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Standings {
    pub categories: Vec<CategoryStandings>,
}

impl Standings {
    pub fn category(&self, code: &str) -> Option<&CategoryStandings> {
        self.categories.iter().find(|c| c.category == code)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

pub struct BestNSelector;

impl BestNSelector {
    /// Rank one category's rows. Stable: equal totals keep their table order.
    pub fn rank_rows(rows: &[AggregateRow], race_count: usize) -> Vec<RankedRow> {
        let n = counted_results(race_count);

        let mut ranked: Vec<RankedRow> = rows
            .iter()
            .map(|row| RankedRow {
                total: best_n_total(&row.recorded_points(), n),
                row: row.clone(),
                rank: 0,
            })
            .collect();

        ranked.sort_by(|a, b| b.total.cmp(&a.total));

        let mut previous_total = None;
        let mut current_rank = 0;
        for (index, entry) in ranked.iter_mut().enumerate() {
            if previous_total != Some(entry.total) {
                current_rank = index + 1;
                previous_total = Some(entry.total);
            }
            entry.rank = current_rank;
        }

        ranked
    }

    /// Standings for the whole table; no races at all gives empty standings
    pub fn select(table: &CategoryTable) -> Standings {
        let race_count = table.race_count();
        if race_count == 0 {
            return Standings::default();
        }

        let race_ids: Vec<RaceId> = table.race_ids().collect();
        let categories = table
            .categories()
            .iter()
            .map(|category| CategoryStandings {
                category: category.clone(),
                race_ids: race_ids.clone(),
                counted: counted_results(race_count),
                rows: Self::rank_rows(table.rows(category), race_count),
            })
            .collect();

        Standings { categories }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, RaceEntry};
    use crate::identity::{RegistrationRules, RunnerIdentity};
    use crate::normalizer::{RaceResultRow, Registration};
    use crate::scoring::Place;

    fn create_test_row(name: &str, points: &[u32]) -> AggregateRow {
        let mut row = AggregateRow::new(RunnerIdentity::Unregistered(name.to_lowercase()), name);
        for (i, p) in points.iter().enumerate() {
            row.results.insert(
                i as RaceId + 1,
                RaceEntry {
                    place: Place::Ranked(1),
                    points: *p,
                },
            );
        }
        row
    }

    #[test]
    fn test_counted_results() {
        assert_eq!(counted_results(0), 1);
        assert_eq!(counted_results(1), 1);
        assert_eq!(counted_results(2), 2);
        assert_eq!(counted_results(3), 2);
        assert_eq!(counted_results(5), 3);
        assert_eq!(counted_results(8), 5);
    }

    #[test]
    fn test_best_two_of_three() {
        assert_eq!(best_n_total(&[100, 50, 30], counted_results(3)), 150);
        assert_eq!(best_n_total(&[30, 100, 50], 2), 150);
    }

    #[test]
    fn test_fewer_races_than_n() {
        assert_eq!(best_n_total(&[80], counted_results(5)), 80);
        assert_eq!(best_n_total(&[], 3), 0);
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let rows = vec![
            create_test_row("Anna", &[100]),
            create_test_row("Bara", &[200]),
            create_test_row("Cyril", &[100]),
        ];

        let ranked = BestNSelector::rank_rows(&rows, 1);

        let names: Vec<&str> = ranked.iter().map(|r| r.row.name.as_str()).collect();
        assert_eq!(names, vec!["Bara", "Anna", "Cyril"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].rank, 2);
    }

    #[test]
    fn test_no_races_gives_empty_standings() {
        let table = CategoryTable::new(&["H".to_string()]);
        let standings = BestNSelector::select(&table);
        assert!(standings.is_empty());
    }

    #[test]
    fn test_race_count_is_per_table_not_per_category() {
        let aggregator = Aggregator::new(RegistrationRules::default());
        let mut table = CategoryTable::new(&["H".to_string(), "D".to_string()]);
        let jan = |rank| RaceResultRow::new("H", Place::Ranked(rank), "Jan Novák", Registration::Code("A123456".to_string()), "");
        let eva = |rank| RaceResultRow::new("D", Place::Ranked(rank), "Eva Malá", Registration::Code("B765432".to_string()), "");

        aggregator.fold(&mut table, 1, &[jan(1), eva(1)]).unwrap();
        aggregator.fold(&mut table, 2, &[jan(1), eva(2)]).unwrap();
        aggregator.fold(&mut table, 3, &[jan(1), eva(3)]).unwrap();
        // Nobody ran D in race 4; it still counts towards M for D
        aggregator.fold(&mut table, 4, &[jan(2)]).unwrap();

        let standings = BestNSelector::select(&table);
        let women = standings.category("D").unwrap();

        assert_eq!(women.race_ids, vec![1, 2, 3, 4]);
        assert_eq!(women.counted, 3);
        assert_eq!(women.rows[0].total, 200 + 190 + 182);
    }
}

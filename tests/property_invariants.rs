use proptest::prelude::*;

use series_ranking::{
    best_n_total, counted_results, score_rank, Aggregator, BestNSelector, CategoryTable,
    Place, RaceResultRow, Registration, RegistrationRules,
};

const NAMES: &[&str] = &["Jan Novák", "Eva Malá", "Petr Dvořák", "Jiří Král", "Anna Veselá"];
const CODES: &[&str] = &["A100001", "B200002", "C300003", "D400004", "E500005"];

fn row_strategy() -> impl Strategy<Value = RaceResultRow> {
    (0usize..NAMES.len(), prop::option::of(0usize..CODES.len()), 0u32..40).prop_map(
        |(name_idx, code_idx, rank)| {
            let place = if rank == 0 { Place::Disqualified } else { Place::Ranked(rank) };
            let registration = match code_idx {
                Some(i) => Registration::Code(CODES[i].to_string()),
                None => Registration::Unregistered,
            };
            RaceResultRow::new("H", place, NAMES[name_idx], registration, "")
        },
    )
}

proptest! {
    #[test]
    fn score_is_non_increasing(p1 in 1i64..5_000, delta in 0i64..5_000) {
        let p2 = p1 + delta;
        prop_assert!(score_rank(p1).unwrap() >= score_rank(p2).unwrap());
    }

    #[test]
    fn score_never_exceeds_winner(p in 1i64..i64::MAX) {
        prop_assert!(score_rank(p).unwrap() <= 200);
    }

    #[test]
    fn non_positive_rank_is_rejected(p in i64::MIN..1i64) {
        prop_assert!(score_rank(p).is_err());
    }

    #[test]
    fn best_n_bounded_by_sum_and_max(points in prop::collection::vec(0u32..=200, 0..12), races in 0usize..12) {
        let n = counted_results(races);
        let total = best_n_total(&points, n);
        let sum: u32 = points.iter().sum();
        prop_assert!(total <= sum);
        if points.len() <= n {
            prop_assert_eq!(total, sum);
        }
        let max = points.iter().copied().max().unwrap_or(0);
        prop_assert!(total >= max);
    }

    #[test]
    fn folding_a_race_twice_is_idempotent(
        first in prop::collection::vec(row_strategy(), 0..8),
        second in prop::collection::vec(row_strategy(), 0..8),
    ) {
        let aggregator = Aggregator::new(RegistrationRules::default());
        let categories = vec!["H".to_string()];

        let mut once = CategoryTable::new(&categories);
        aggregator.fold(&mut once, 1, &first).unwrap();
        aggregator.fold(&mut once, 2, &second).unwrap();

        let mut twice = once.clone();
        aggregator.fold(&mut twice, 1, &first).unwrap();
        aggregator.fold(&mut twice, 2, &second).unwrap();

        prop_assert_eq!(once.rows("H"), twice.rows("H"));
        prop_assert_eq!(BestNSelector::select(&once), BestNSelector::select(&twice));
    }

    #[test]
    fn every_row_is_folded_or_reported(rows in prop::collection::vec(row_strategy(), 0..10)) {
        let aggregator = Aggregator::new(RegistrationRules::default());
        let mut table = CategoryTable::new(&["H".to_string()]);

        let report = aggregator.fold(&mut table, 1, &rows).unwrap();

        prop_assert_eq!(report.folded + report.warnings.len(), rows.len());
        prop_assert_eq!(table.rows("H").len(), report.folded);
    }
}

//! Load smoothing journey
//!
//! Many learners starting on the same day must not pile their reviews onto
//! the same dates once a daily capacity is configured.

use std::collections::HashMap;

use cadence_core::ScheduleConfig;
use cadence_e2e_tests::{assert_schedule_invariants, date, TestDataFactory, TestDatabaseManager};
use chrono::NaiveDate;

fn pending_per_day(db: &TestDatabaseManager, ids: &[String]) -> HashMap<NaiveDate, u32> {
    let mut per_day = HashMap::new();
    for id in ids {
        for repetition in db.service.list_repetitions(id).unwrap() {
            if repetition.is_pending() {
                *per_day.entry(repetition.review_date).or_insert(0) += 1;
            }
        }
    }
    per_day
}

#[test]
fn test_capacity_spreads_reviews() {
    let db = TestDatabaseManager::with_config(TestDataFactory::one_per_day());
    let ids = db.seed_scheduled(6, date(2024, 1, 1));

    let per_day = pending_per_day(&db, &ids);
    assert_eq!(per_day.values().sum::<u32>(), 30);
    assert!(per_day.values().all(|&count| count == 1), "{:?}", per_day);

    for id in &ids {
        assert_schedule_invariants(&db.service, id);
    }
}

#[test]
fn test_smoothing_only_moves_later() {
    let db = TestDatabaseManager::with_config(TestDataFactory::one_per_day());
    let ids = db.seed_scheduled(5, date(2024, 1, 1));
    let unsmoothed = [
        date(2024, 1, 2),
        date(2024, 1, 4),
        date(2024, 1, 8),
        date(2024, 1, 15),
        date(2024, 1, 31),
    ];

    for id in &ids {
        let repetitions = db.service.list_repetitions(id).unwrap();
        for (repetition, earliest) in repetitions.iter().zip(unsmoothed) {
            assert!(repetition.review_date >= earliest);
        }
    }
    // The second learner is bumped by a day on every review
    let second = db.service.list_repetitions(&ids[1]).unwrap();
    assert_eq!(second[0].review_date, date(2024, 1, 3));
}

#[test]
fn test_load_index_matches_pending_reviews() {
    let db = TestDatabaseManager::new_temp();
    let ids = db.seed_scheduled(3, date(2024, 1, 1));
    assert_eq!(db.storage.pending_load_on(date(2024, 1, 2)).unwrap(), 3);

    let first = db.service.list_repetitions(&ids[0]).unwrap();
    TestDataFactory::complete(&db.service, &first[0], 20.0, date(2024, 1, 2));
    assert_eq!(db.storage.pending_load_on(date(2024, 1, 2)).unwrap(), 2);

    let second = db.service.list_repetitions(&ids[1]).unwrap();
    db.service.delete(&second[0].id).unwrap();
    assert_eq!(db.storage.pending_load_on(date(2024, 1, 2)).unwrap(), 1);

    let third = db.service.list_repetitions(&ids[2]).unwrap();
    db.service.reschedule(&third[0].id, date(2024, 1, 3), false).unwrap();
    assert_eq!(db.storage.pending_load_on(date(2024, 1, 2)).unwrap(), 0);
    assert_eq!(db.storage.pending_load_on(date(2024, 1, 3)).unwrap(), 1);

    let per_day = pending_per_day(&db, &ids);
    for (day, count) in per_day {
        assert_eq!(db.storage.pending_load_on(day).unwrap(), count, "load on {}", day);
    }
}

#[test]
fn test_zero_capacity_disables_smoothing() {
    let config = ScheduleConfig::default().with_daily_capacity(Some(0));
    let db = TestDatabaseManager::with_config(config);
    let ids = db.seed_scheduled(4, date(2024, 1, 1));

    for id in &ids {
        let first = &db.service.list_repetitions(id).unwrap()[0];
        assert_eq!(first.review_date, date(2024, 1, 2));
    }
}

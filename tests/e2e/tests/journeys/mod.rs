//! Journey Tests
//!
//! A learner's whole path through one unit in a single test: start, study
//! with drift, move a review, finish the cycle, and check what persisted.

use cadence_core::{CyclesStudied, RepetitionOrder};
use cadence_e2e_tests::{assert_schedule_invariants, date, TestDataFactory, TestDatabaseManager};

#[test]
fn test_full_learner_journey() {
    let mut db = TestDatabaseManager::new_temp();
    let (progress, schedule) = TestDataFactory::start_unit(&db, date(2024, 1, 1));
    let id = progress.id.clone();

    // Studied FIRST a day late: everything after moves by one
    let late = TestDataFactory::complete(&db.service, &schedule[0], 20.0, date(2024, 1, 3));
    assert_eq!(late.shifted.len(), 4);
    assert_schedule_invariants(&db.service, &id);

    // SECOND is now 2024-01-05; the learner pushes it and the rest out
    let moved = db
        .service
        .reschedule(&schedule[1].id, date(2024, 1, 7), true)
        .unwrap();
    assert_eq!(moved.cascaded.len(), 3);
    assert_schedule_invariants(&db.service, &id);

    db.reopen();
    let mut last = None;
    for order in [
        RepetitionOrder::Second,
        RepetitionOrder::Third,
        RepetitionOrder::Fourth,
        RepetitionOrder::Fifth,
    ] {
        let current = db.service.list_repetitions(&id).unwrap();
        let repetition = &current[order.index()];
        assert_eq!(repetition.repetition_order, order);
        let percent = (order.index() as f64 + 1.0) * 20.0;
        last = Some(TestDataFactory::complete(
            &db.service,
            repetition,
            percent,
            repetition.review_date,
        ));
        assert_schedule_invariants(&db.service, &id);
    }

    let last = last.unwrap();
    assert_eq!(last.progress.cycles_studied, CyclesStudied::FIRST_REVIEW);
    assert_eq!(last.progress.first_learning_date, Some(date(2024, 1, 1)));
    // FIFTH: 2024-01-31, +1 late, +2 pushed
    assert_eq!(last.progress.cycle_anchor_date, Some(date(2024, 2, 3)));

    let due = db.service.due_between(date(2024, 2, 1), date(2024, 2, 10)).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].next_study_date, Some(date(2024, 2, 5)));
}

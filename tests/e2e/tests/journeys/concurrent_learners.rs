//! Concurrent learners journey
//!
//! One shared service, several threads completing and rescheduling at once.
//! Each use case is one transaction, so every progress ends up consistent.

use std::sync::Arc;
use std::thread;

use cadence_core::{CompletionUpdate, CyclesStudied, RepetitionStatus};
use cadence_e2e_tests::{assert_schedule_invariants, date, TestDataFactory, TestDatabaseManager};

#[test]
fn test_parallel_cycles_stay_consistent() {
    let db = TestDatabaseManager::with_config(TestDataFactory::one_per_day());
    let ids = db.seed_scheduled(4, date(2024, 1, 1));

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let service = Arc::clone(&db.service);
            thread::spawn(move || TestDataFactory::complete_cycle_on_time(&service, &id))
        })
        .collect();
    for handle in handles {
        let last = handle.join().expect("worker panicked");
        assert_eq!(last.progress.cycles_studied, CyclesStudied::FIRST_REVIEW);
    }

    for id in &ids {
        assert_schedule_invariants(&db.service, id);
        assert_eq!(db.service.list_history(id).unwrap().len(), 10);
    }
}

#[test]
fn test_parallel_reschedules_of_one_progress() {
    let db = TestDatabaseManager::new_temp();
    let (progress, schedule) = TestDataFactory::start_unit(&db, date(2024, 1, 1));

    // Same target from every thread; the end state must be the same either way
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&db.service);
            let id = schedule[1].id.clone();
            thread::spawn(move || service.reschedule(&id, date(2024, 1, 6), false))
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked").unwrap();
    }

    let second = db.service.get_repetition(&schedule[1].id).unwrap();
    assert_eq!(second.review_date, date(2024, 1, 6));
    assert_schedule_invariants(&db.service, &progress.id);
}

#[test]
fn test_parallel_final_completions_advance_once() {
    let db = TestDatabaseManager::new_temp();
    let (progress, schedule) = TestDataFactory::start_unit(&db, date(2024, 1, 1));
    for repetition in &schedule[..4] {
        TestDataFactory::complete(&db.service, repetition, 80.0, repetition.review_date);
    }

    // Every thread completes FIFTH; later ones see it already completed
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&db.service);
            let id = schedule[4].id.clone();
            thread::spawn(move || {
                service.update_completion_on(
                    &id,
                    CompletionUpdate::completed_on(100.0, date(2024, 1, 31)),
                    date(2024, 1, 31),
                )
            })
        })
        .collect();
    let mut advances = 0;
    for handle in handles {
        let result = handle.join().expect("worker panicked").unwrap();
        assert_eq!(result.repetition.status, RepetitionStatus::Completed);
        if result.next_cycle.is_some() {
            advances += 1;
        }
    }
    assert_eq!(advances, 1);

    let progress = db.service.get_progress(&progress.id).unwrap();
    assert_eq!(progress.cycles_studied, CyclesStudied::FIRST_REVIEW);
    assert_eq!(db.service.list_history(&progress.id).unwrap().len(), 10);
    assert_schedule_invariants(&db.service, &progress.id);
}

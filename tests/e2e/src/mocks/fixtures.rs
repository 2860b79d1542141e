//! Test Data Factory
//!
//! Provides utilities for building learner scenarios:
//! - Progresses with a generated first cycle
//! - Walking a cycle through in order, on time or with drift
//! - Invariant checks shared by the journey tests

use chrono::NaiveDate;
use cadence_core::{
    CompletionResult, CompletionUpdate, ModuleProgress, Repetition, RepetitionOrder,
    RepetitionService, ScheduleConfig,
};

use crate::harness::TestDatabaseManager;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// Factory for creating test scenarios
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let (progress, schedule) = TestDataFactory::start_unit(&db, date(2024, 1, 1));
/// let last = TestDataFactory::complete_cycle_on_time(&db.service, &progress.id);
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// Default offsets, one review per day at most
    pub fn one_per_day() -> ScheduleConfig {
        ScheduleConfig::default().with_daily_capacity(Some(1))
    }

    /// Create a progress started on `first` together with its first cycle
    pub fn start_unit(db: &TestDatabaseManager, first: NaiveDate) -> (ModuleProgress, Vec<Repetition>) {
        let progress = db.seed_progress("unit", 250, Some(first));
        let schedule = db
            .service
            .create_default_schedule_on(&progress.id, first)
            .expect("Failed to create schedule");
        let progress = db.service.get_progress(&progress.id).expect("progress exists");
        (progress, schedule)
    }

    /// Complete one repetition on the given day
    pub fn complete(
        service: &RepetitionService,
        repetition: &Repetition,
        percent: f64,
        on: NaiveDate,
    ) -> CompletionResult {
        service
            .update_completion_on(&repetition.id, CompletionUpdate::completed_on(percent, on), on)
            .expect("Failed to complete repetition")
    }

    /// Complete every repetition of the current cycle on its review date
    ///
    /// Returns the result of the last completion.
    pub fn complete_cycle_on_time(
        service: &RepetitionService,
        progress_id: &str,
    ) -> CompletionResult {
        let mut last = None;
        for order in RepetitionOrder::ALL {
            let current = service
                .list_repetitions(progress_id)
                .expect("Failed to list repetitions");
            let repetition = current
                .iter()
                .find(|r| r.repetition_order == order)
                .expect("every order is scheduled");
            let percent = (order.index() as f64 + 1.0) * 20.0;
            last = Some(Self::complete(service, repetition, percent, repetition.review_date));
        }
        last.expect("a cycle has five repetitions")
    }
}

/// Invariants that must hold for a progress after any call returns
///
/// - at most one repetition per order in the current cycle
/// - review dates never decrease from FIRST to FIFTH
/// - `next_study_date` is the earliest pending review date
pub fn assert_schedule_invariants(service: &RepetitionService, progress_id: &str) {
    let progress = service.get_progress(progress_id).expect("progress exists");
    let repetitions = service
        .list_repetitions(progress_id)
        .expect("Failed to list repetitions");

    let mut orders: Vec<RepetitionOrder> = repetitions.iter().map(|r| r.repetition_order).collect();
    orders.dedup();
    assert_eq!(orders.len(), repetitions.len(), "duplicate order in {:?}", repetitions);

    for pair in repetitions.windows(2) {
        assert!(
            pair[0].repetition_order < pair[1].repetition_order,
            "repetitions listed out of order"
        );
        assert!(
            pair[0].review_date <= pair[1].review_date,
            "{} on {} after {} on {}",
            pair[0].repetition_order,
            pair[0].review_date,
            pair[1].repetition_order,
            pair[1].review_date
        );
    }

    let earliest_pending = repetitions
        .iter()
        .filter(|r| r.is_pending())
        .map(|r| r.review_date)
        .min();
    assert_eq!(progress.next_study_date, earliest_pending);

    let ids: Vec<&str> = repetitions.iter().map(|r| r.id.as_str()).collect();
    let cached: Vec<&str> = progress.repetition_ids.iter().map(String::as_str).collect();
    assert_eq!(ids, cached);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_unit_satisfies_invariants() {
        let db = TestDatabaseManager::new_temp();
        let (progress, schedule) = TestDataFactory::start_unit(&db, date(2024, 1, 1));

        assert_eq!(schedule.len(), 5);
        assert_schedule_invariants(&db.service, &progress.id);
    }

    #[test]
    fn test_complete_cycle_on_time_advances() {
        let db = TestDatabaseManager::new_temp();
        let (progress, _) = TestDataFactory::start_unit(&db, date(2024, 1, 1));

        let last = TestDataFactory::complete_cycle_on_time(&db.service, &progress.id);
        assert!(last.next_cycle.is_some());
        assert_eq!(last.progress.percent_complete, 100.0);
    }
}

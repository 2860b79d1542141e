//! Schedule Manager
//!
//! Core date algorithms:
//! - First learning date initialization (set once)
//! - Five-step cycle generation from the configured offset table
//! - Load smoothing against the system-wide daily pending count
//! - Recomputing the cached next study date

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;

use super::add_days;
use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::model::{ModuleProgress, Repetition, RepetitionOrder};
use crate::storage::queries;

/// Generates and maintains review dates for one progress at a time
pub struct ScheduleManager<'a> {
    conn: &'a Connection,
    config: &'a ScheduleConfig,
}

impl<'a> ScheduleManager<'a> {
    pub fn new(conn: &'a Connection, config: &'a ScheduleConfig) -> Self {
        Self { conn, config }
    }

    /// Set the first learning date to `today` if it was never set
    ///
    /// Returns `true` when the progress was changed and persisted.
    pub fn initialize_first_learning_date(
        &self,
        progress: &mut ModuleProgress,
        today: NaiveDate,
    ) -> Result<bool> {
        if progress.first_learning_date.is_some() {
            return Ok(false);
        }
        progress.first_learning_date = Some(today);
        if progress.cycle_anchor_date.is_none() {
            progress.cycle_anchor_date = Some(today);
        }
        queries::save_progress(self.conn, progress)?;
        tracing::debug!("First learning date for {} set to {}", progress.id, today);
        Ok(true)
    }

    /// Build the unsaved FIRST..FIFTH repetitions for the progress's current cycle
    pub fn create_repetitions_for_progress(
        &self,
        progress: &ModuleProgress,
    ) -> Result<Vec<Repetition>> {
        let base = schedule_base(progress)?;
        let mut planned: HashMap<NaiveDate, u32> = HashMap::new();
        let mut previous: Option<NaiveDate> = None;
        let mut repetitions = Vec::with_capacity(RepetitionOrder::COUNT);

        for order in RepetitionOrder::ALL {
            let mut candidate = self.candidate_date(base, progress, order)?;
            // Smoothing may have pushed the previous order past this one's slot
            if let Some(prev) = previous {
                candidate = candidate.max(prev);
            }
            let date = self.smooth(candidate, &planned)?;
            *planned.entry(date).or_insert(0) += 1;
            previous = Some(date);

            repetitions.push(Repetition::pending(
                &progress.id,
                progress.cycles_studied,
                order,
                date,
            ));
        }

        Ok(repetitions)
    }

    /// Review date for one order of the current cycle, load smoothing applied
    pub fn calculate_review_date(
        &self,
        progress: &ModuleProgress,
        order: RepetitionOrder,
    ) -> Result<NaiveDate> {
        let base = schedule_base(progress)?;
        let candidate = self.candidate_date(base, progress, order)?;
        self.smooth(candidate, &HashMap::new())
    }

    /// Recompute `next_study_date` from pending repetitions and persist it
    pub fn update_next_study_date(&self, progress: &mut ModuleProgress) -> Result<Option<NaiveDate>> {
        let pending = queries::pending_by_date(self.conn, &progress.id, progress.cycles_studied)?;
        progress.next_study_date = pending.first().map(|r| r.review_date);
        progress.repetition_ids = queries::cycle_repetitions(
            self.conn,
            &progress.id,
            progress.cycles_studied,
        )?
        .into_iter()
        .map(|r| r.id)
        .collect();
        queries::save_progress(self.conn, progress)?;
        Ok(progress.next_study_date)
    }

    fn candidate_date(
        &self,
        base: NaiveDate,
        progress: &ModuleProgress,
        order: RepetitionOrder,
    ) -> Result<NaiveDate> {
        let offset = self
            .config
            .offset_days(order, progress.cycles_studied.index());
        add_days(base, offset)
    }

    /// Move `candidate` later until the day is under capacity
    ///
    /// `planned` counts dates already chosen in the current batch that are
    /// not yet in the load index. Never returns a date before `candidate`.
    fn smooth(&self, candidate: NaiveDate, planned: &HashMap<NaiveDate, u32>) -> Result<NaiveDate> {
        let Some(capacity) = self.config.capacity() else {
            return Ok(candidate);
        };

        let mut date = candidate;
        for shift in 0..=self.config.max_smoothing_days {
            date = add_days(candidate, i64::from(shift))?;
            let load = queries::pending_load_on(self.conn, date)?
                + planned.get(&date).copied().unwrap_or(0);
            if load < capacity {
                if shift > 0 {
                    tracing::debug!(
                        "Review moved {} day(s) from {} to {} (capacity {})",
                        shift,
                        candidate,
                        date,
                        capacity
                    );
                }
                return Ok(date);
            }
        }

        tracing::warn!(
            "Every day from {} to {} is at capacity {}; using {}",
            candidate,
            date,
            capacity,
            date
        );
        Ok(date)
    }
}

fn schedule_base(progress: &ModuleProgress) -> Result<NaiveDate> {
    progress.schedule_base().ok_or_else(|| {
        ScheduleError::InvalidArgument(format!(
            "module progress {} has no first learning date",
            progress.id
        ))
    })
}

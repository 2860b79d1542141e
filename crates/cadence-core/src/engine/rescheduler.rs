//! Rescheduler
//!
//! Shifts the pending repetitions that follow an anchor while keeping the
//! gaps between them. Completed repetitions are never touched.

use chrono::NaiveDate;
use rusqlite::Connection;

use super::add_days;
use crate::error::Result;
use crate::model::{ModuleProgress, Repetition, RepetitionOrder};
use crate::storage::queries;

pub struct Rescheduler<'a> {
    conn: &'a Connection,
}

impl<'a> Rescheduler<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Re-base every pending repetition after `anchor_order` on `new_anchor_date`
    ///
    /// Each one keeps its distance from the anchor:
    /// `new_date = new_anchor_date + (old_date - old_anchor_date)`.
    /// Returns the repetitions that were moved (empty when there are none).
    pub fn reschedule_future_repetitions(
        &self,
        progress: &ModuleProgress,
        anchor_order: RepetitionOrder,
        old_anchor_date: NaiveDate,
        new_anchor_date: NaiveDate,
    ) -> Result<Vec<Repetition>> {
        let mut future = queries::pending_after(
            self.conn,
            &progress.id,
            progress.cycles_studied,
            anchor_order,
        )?;
        if future.is_empty() {
            return Ok(future);
        }

        for repetition in &mut future {
            let gap = (repetition.review_date - old_anchor_date).num_days();
            repetition.review_date = add_days(new_anchor_date, gap)?;
        }
        queries::save_repetitions(self.conn, &future)?;

        tracing::debug!(
            "Re-based {} repetition(s) of {} after {} from {} to {}",
            future.len(),
            progress.id,
            anchor_order,
            old_anchor_date,
            new_anchor_date
        );
        Ok(future)
    }

    /// Drift correction after a repetition was completed
    ///
    /// Applies `completed_on - planned_date` to every later pending
    /// repetition. Studying early pulls the rest of the cycle in, studying
    /// late pushes it out.
    pub fn update_following_after_completion(
        &self,
        progress: &ModuleProgress,
        completed: &Repetition,
        planned_date: NaiveDate,
    ) -> Result<Vec<Repetition>> {
        let actual = completed.completed_on.unwrap_or(completed.review_date);
        if actual == planned_date {
            return Ok(Vec::new());
        }

        self.reschedule_future_repetitions(
            progress,
            completed.repetition_order,
            planned_date,
            actual,
        )
    }
}

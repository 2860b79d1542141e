//! Cycle Manager
//!
//! A cycle ends when all five repetitions are completed. The next cycle is
//! anchored on the date the last of them was studied; the first learning
//! date itself never moves.

use rusqlite::Connection;

use super::ScheduleManager;
use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::model::{ModuleProgress, Repetition, RepetitionOrder};
use crate::storage::queries;

pub struct CycleManager<'a> {
    conn: &'a Connection,
    config: &'a ScheduleConfig,
}

impl<'a> CycleManager<'a> {
    pub fn new(conn: &'a Connection, config: &'a ScheduleConfig) -> Self {
        Self { conn, config }
    }

    /// Advance to the next cycle if the current one is finished
    ///
    /// Returns the freshly generated repetitions, or `None` when the cycle is
    /// still in progress.
    pub fn check_and_advance_cycle(
        &self,
        progress: &mut ModuleProgress,
    ) -> Result<Option<Vec<Repetition>>> {
        let (total, completed) =
            queries::cycle_counts(self.conn, &progress.id, progress.cycles_studied)?;
        if total != completed || completed as usize != RepetitionOrder::COUNT {
            return Ok(None);
        }

        let finished = queries::cycle_repetitions(self.conn, &progress.id, progress.cycles_studied)?;
        let last_completion = finished
            .iter()
            .map(|r| r.completed_on.unwrap_or(r.review_date))
            .max();

        let previous = progress.cycles_studied;
        progress.cycles_studied = previous.next();
        if let Some(anchor) = last_completion {
            progress.cycle_anchor_date = Some(anchor);
        }

        let schedule = ScheduleManager::new(self.conn, self.config);
        let repetitions = schedule.create_repetitions_for_progress(progress)?;
        queries::insert_repetitions(self.conn, &repetitions)?;
        progress.repetition_ids = repetitions.iter().map(|r| r.id.clone()).collect();
        queries::save_progress(self.conn, progress)?;

        tracing::info!(
            "Progress {} advanced from {} to {} (anchor {:?})",
            progress.id,
            previous,
            progress.cycles_studied,
            progress.cycle_anchor_date
        );
        Ok(Some(repetitions))
    }

    /// Same as [`CycleManager::check_and_advance_cycle`]
    pub fn check_and_update_cycle_studied(
        &self,
        progress: &mut ModuleProgress,
    ) -> Result<Option<Vec<Repetition>>> {
        self.check_and_advance_cycle(progress)
    }
}

//! Existence and uniqueness guards
//!
//! Pure reads; nothing here writes to the database.

use rusqlite::Connection;

use crate::error::{Result, ScheduleError};
use crate::model::{CyclesStudied, ModuleProgress, Repetition, RepetitionOrder};
use crate::storage::queries;

/// Lookups that fail with `NotFound` / `AlreadyExists` instead of `Option`
pub struct Validator<'a> {
    conn: &'a Connection,
}

impl<'a> Validator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn find_module_progress(&self, id: &str) -> Result<ModuleProgress> {
        require_id(id, "progressId")?;
        queries::load_progress(self.conn, id)?
            .ok_or_else(|| ScheduleError::NotFound(format!("module progress {}", id)))
    }

    pub fn find_repetition(&self, id: &str) -> Result<Repetition> {
        require_id(id, "repetitionId")?;
        queries::load_repetition(self.conn, id)?
            .ok_or_else(|| ScheduleError::NotFound(format!("repetition {}", id)))
    }

    /// Fails when the slot `(progress, cycle, order)` is already taken
    pub fn validate_repetition_does_not_exist(
        &self,
        progress_id: &str,
        cycle: CyclesStudied,
        order: RepetitionOrder,
    ) -> Result<()> {
        if let Some(existing) = queries::repetition_in_slot(self.conn, progress_id, cycle, order)? {
            return Err(ScheduleError::AlreadyExists(format!(
                "repetition {} for progress {} ({}, {})",
                existing.id, progress_id, cycle, order
            )));
        }
        Ok(())
    }

    /// Existence-only check for read paths
    pub fn validate_module_progress_exists(&self, id: &str) -> Result<()> {
        self.find_module_progress(id).map(|_| ())
    }
}

/// Reject blank identifiers before touching the database
pub(crate) fn require_id(id: &str, field: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ScheduleError::InvalidArgument(format!("{} is required", field)));
    }
    Ok(())
}

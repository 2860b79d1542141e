//! Repetition Service
//!
//! Use-case entry points. Each mutating call is one immediate transaction:
//! validation, writes, drift correction, cycle advancement and the next study
//! date refresh either all land or none do.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::{
    add_days, verify_cycle_ordering, CycleManager, Rescheduler, ScheduleManager, Validator,
};
use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::model::{
    CompletionUpdate, CreateRepetitionInput, ModuleProgress, Repetition, RepetitionStatus,
};
use crate::storage::{queries, Storage};

/// Outcome of [`RepetitionService::reschedule`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleResult {
    pub repetition: Repetition,
    /// Later pending repetitions moved along with it
    pub cascaded: Vec<Repetition>,
    pub next_study_date: Option<NaiveDate>,
}

/// Outcome of [`RepetitionService::update_completion`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub repetition: Repetition,
    pub progress: ModuleProgress,
    /// Pending repetitions shifted by drift correction
    pub shifted: Vec<Repetition>,
    /// Schedule of the next cycle, when this completion finished one
    pub next_cycle: Option<Vec<Repetition>>,
}

pub struct RepetitionService {
    storage: Arc<Storage>,
    config: ScheduleConfig,
}

impl RepetitionService {
    pub fn new(storage: Arc<Storage>, config: ScheduleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Manually add one repetition to the progress's current cycle
    pub fn create(&self, input: CreateRepetitionInput) -> Result<Repetition> {
        let repetition = self.storage.write(|tx| {
            let validator = Validator::new(tx);
            let mut progress = validator.find_module_progress(&input.progress_id)?;
            validator.validate_repetition_does_not_exist(
                &progress.id,
                progress.cycles_studied,
                input.repetition_order,
            )?;

            let mut repetition = Repetition::pending(
                &progress.id,
                progress.cycles_studied,
                input.repetition_order,
                input.review_date,
            );
            if input.status == RepetitionStatus::Completed {
                repetition.status = RepetitionStatus::Completed;
                repetition.completed_on = Some(input.review_date);
            }
            queries::insert_repetition(tx, &repetition)?;
            verify_cycle_ordering(tx, &progress)?;

            ScheduleManager::new(tx, &self.config).update_next_study_date(&mut progress)?;
            Ok(repetition)
        })?;

        tracing::info!(
            "Created {} repetition {} for progress {} on {}",
            repetition.repetition_order,
            repetition.id,
            repetition.progress_id,
            repetition.review_date
        );
        Ok(repetition)
    }

    /// Generate the default schedule, learning starts today
    pub fn create_default_schedule(&self, progress_id: &str) -> Result<Vec<Repetition>> {
        self.create_default_schedule_on(progress_id, today())
    }

    /// Generate the five repetitions of the current cycle
    ///
    /// Idempotent: an existing schedule is returned unchanged. A unit with no
    /// words gets no schedule. `today` only matters when the first learning
    /// date is still unset.
    pub fn create_default_schedule_on(
        &self,
        progress_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Repetition>> {
        self.storage.write(|tx| {
            let mut progress = Validator::new(tx).find_module_progress(progress_id)?;

            let existing = queries::cycle_repetitions(tx, &progress.id, progress.cycles_studied)?;
            if !existing.is_empty() {
                tracing::info!("Progress {} already has a schedule", progress.id);
                return Ok(existing);
            }
            if !progress.module_ref.needs_schedule() {
                tracing::info!(
                    "Module {} has no words; no schedule for {}",
                    progress.module_ref.module_id,
                    progress.id
                );
                return Ok(Vec::new());
            }

            let schedule = ScheduleManager::new(tx, &self.config);
            schedule.initialize_first_learning_date(&mut progress, today)?;
            let repetitions = schedule.create_repetitions_for_progress(&progress)?;
            queries::insert_repetitions(tx, &repetitions)?;
            schedule.update_next_study_date(&mut progress)?;

            tracing::info!(
                "Scheduled {} repetitions for {} ({}), next study {:?}",
                repetitions.len(),
                progress.id,
                progress.cycles_studied,
                progress.next_study_date
            );
            Ok(repetitions)
        })
    }

    /// Soft-delete a repetition and refresh the next study date
    pub fn delete(&self, repetition_id: &str) -> Result<ModuleProgress> {
        self.storage.write(|tx| {
            let validator = Validator::new(tx);
            let repetition = validator.find_repetition(repetition_id)?;
            let mut progress = validator.find_module_progress(&repetition.progress_id)?;

            queries::soft_delete_repetition(tx, &repetition.id)?;
            ScheduleManager::new(tx, &self.config).update_next_study_date(&mut progress)?;

            tracing::info!(
                "Deleted repetition {} ({}) of {}",
                repetition.id,
                repetition.repetition_order,
                progress.id
            );
            Ok(progress)
        })
    }

    /// Move a pending repetition to `new_date`
    ///
    /// With `cascade`, later pending repetitions keep their distance to it.
    /// Without it they stay put, so the new date may not pass the next one.
    /// A completed repetition keeps the day it was studied; reopen it first.
    pub fn reschedule(
        &self,
        repetition_id: &str,
        new_date: NaiveDate,
        cascade: bool,
    ) -> Result<RescheduleResult> {
        self.storage.write(|tx| {
            let validator = Validator::new(tx);
            let mut repetition = validator.find_repetition(repetition_id)?;
            let mut progress = validator.find_module_progress(&repetition.progress_id)?;
            ensure_current_cycle(&progress, &repetition)?;
            if !repetition.is_pending() {
                return Err(ScheduleError::InvalidArgument(format!(
                    "repetition {} was completed on {}; reopen it before moving it",
                    repetition.id, repetition.review_date
                )));
            }

            let old_date = repetition.review_date;
            repetition.review_date = new_date;
            queries::save_repetition(tx, &repetition)?;

            let cascaded = if cascade {
                Rescheduler::new(tx).reschedule_future_repetitions(
                    &progress,
                    repetition.repetition_order,
                    old_date,
                    new_date,
                )?
            } else {
                Vec::new()
            };
            verify_cycle_ordering(tx, &progress)?;

            let next_study_date =
                ScheduleManager::new(tx, &self.config).update_next_study_date(&mut progress)?;
            tracing::info!(
                "Rescheduled {} from {} to {} ({} cascaded)",
                repetition.id,
                old_date,
                new_date,
                cascaded.len()
            );
            Ok(RescheduleResult {
                repetition,
                cascaded,
                next_study_date,
            })
        })
    }

    /// Record a status change, completion date defaults to today
    pub fn update_completion(
        &self,
        repetition_id: &str,
        update: CompletionUpdate,
    ) -> Result<CompletionResult> {
        self.update_completion_on(repetition_id, update, today())
    }

    /// Record a status change
    ///
    /// Completing a pending repetition moves its review date to the day it was
    /// actually studied, shifts the later pending ones by the same drift and,
    /// when it was the last of the cycle, starts the next cycle. A study day
    /// that would put the cycle out of date order is only kept as
    /// `completed_on`; the review date and the rest of the cycle stay as
    /// planned. Reverting a completion only clears the completion date.
    ///
    /// Re-marking with the same status only updates `percent_complete`, also
    /// for repetitions of a finished cycle.
    pub fn update_completion_on(
        &self,
        repetition_id: &str,
        update: CompletionUpdate,
        today: NaiveDate,
    ) -> Result<CompletionResult> {
        if !update.percent_complete.is_finite()
            || !(0.0..=100.0).contains(&update.percent_complete)
        {
            return Err(ScheduleError::InvalidArgument(format!(
                "percentComplete must be between 0 and 100, got {}",
                update.percent_complete
            )));
        }

        self.storage.write(|tx| {
            let validator = Validator::new(tx);
            let mut repetition = validator.find_repetition(repetition_id)?;
            let mut progress = validator.find_module_progress(&repetition.progress_id)?;
            progress.percent_complete = update.percent_complete;

            let mut shifted = Vec::new();
            let mut next_cycle = None;
            match (repetition.status, update.status) {
                (RepetitionStatus::NotStarted, RepetitionStatus::Completed) => {
                    ensure_current_cycle(&progress, &repetition)?;
                    let siblings =
                        queries::cycle_repetitions(tx, &progress.id, progress.cycles_studied)?;
                    let planned = repetition.review_date;
                    let studied_on = update.completed_on.unwrap_or(today);
                    let in_sequence = study_day_keeps_order(&siblings, &repetition, studied_on);

                    repetition.status = RepetitionStatus::Completed;
                    repetition.completed_on = Some(studied_on);
                    if in_sequence {
                        repetition.review_date = studied_on;
                    }
                    queries::save_repetition(tx, &repetition)?;

                    if in_sequence {
                        shifted = Rescheduler::new(tx)
                            .update_following_after_completion(&progress, &repetition, planned)?;
                    } else {
                        tracing::debug!(
                            "{} studied on {} out of sequence, keeping review date {}",
                            repetition.id,
                            studied_on,
                            planned
                        );
                    }
                    verify_cycle_ordering(tx, &progress)?;

                    next_cycle =
                        CycleManager::new(tx, &self.config).check_and_advance_cycle(&mut progress)?;
                    tracing::info!(
                        "Completed {} ({}) on {}, planned {}",
                        repetition.id,
                        repetition.repetition_order,
                        studied_on,
                        planned
                    );
                }
                (RepetitionStatus::Completed, RepetitionStatus::NotStarted) => {
                    ensure_current_cycle(&progress, &repetition)?;
                    repetition.status = RepetitionStatus::NotStarted;
                    repetition.completed_on = None;
                    queries::save_repetition(tx, &repetition)?;
                    tracing::info!("Reopened {} ({})", repetition.id, repetition.repetition_order);
                }
                _ => {
                    tracing::debug!(
                        "Status of {} unchanged ({})",
                        repetition.id,
                        repetition.status.as_str()
                    );
                }
            }

            ScheduleManager::new(tx, &self.config).update_next_study_date(&mut progress)?;
            Ok(CompletionResult {
                repetition,
                progress,
                shifted,
                next_cycle,
            })
        })
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get_progress(&self, progress_id: &str) -> Result<ModuleProgress> {
        self.storage
            .read(|conn| Validator::new(conn).find_module_progress(progress_id))
    }

    pub fn get_repetition(&self, repetition_id: &str) -> Result<Repetition> {
        self.storage
            .read(|conn| Validator::new(conn).find_repetition(repetition_id))
    }

    /// Repetitions of the current cycle, FIRST..FIFTH
    pub fn list_repetitions(&self, progress_id: &str) -> Result<Vec<Repetition>> {
        self.storage.read(|conn| {
            let progress = Validator::new(conn).find_module_progress(progress_id)?;
            queries::cycle_repetitions(conn, &progress.id, progress.cycles_studied)
        })
    }

    /// Every live repetition of every cycle
    pub fn list_history(&self, progress_id: &str) -> Result<Vec<Repetition>> {
        self.storage.read(|conn| {
            Validator::new(conn).validate_module_progress_exists(progress_id)?;
            queries::all_repetitions(conn, progress_id)
        })
    }

    /// Progresses whose next study date falls in `[from, to]`
    pub fn due_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ModuleProgress>> {
        if from > to {
            return Err(ScheduleError::InvalidArgument(format!(
                "range start {} is after end {}",
                from, to
            )));
        }
        self.storage
            .read(|conn| queries::progress_due_between(conn, from, to))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Would completing `repetition` on `studied_on` keep the cycle in date order?
///
/// Simulates the completion in memory: the repetition moves to `studied_on`
/// and every later pending sibling shifts by the same drift. `siblings` is the
/// current cycle, FIRST..FIFTH.
fn study_day_keeps_order(
    siblings: &[Repetition],
    repetition: &Repetition,
    studied_on: NaiveDate,
) -> bool {
    let drift = (studied_on - repetition.review_date).num_days();
    let mut previous: Option<NaiveDate> = None;
    for sibling in siblings {
        let date = if sibling.id == repetition.id {
            studied_on
        } else if sibling.is_pending() && sibling.repetition_order > repetition.repetition_order {
            match add_days(sibling.review_date, drift) {
                Ok(date) => date,
                Err(_) => return false,
            }
        } else {
            sibling.review_date
        };
        if previous.is_some_and(|p| p > date) {
            return false;
        }
        previous = Some(date);
    }
    true
}

/// Finished cycles are history; only the running one may change
fn ensure_current_cycle(progress: &ModuleProgress, repetition: &Repetition) -> Result<()> {
    if repetition.cycle != progress.cycles_studied {
        return Err(ScheduleError::InvalidArgument(format!(
            "repetition {} belongs to {}, progress {} is in {}",
            repetition.id, repetition.cycle, progress.id, progress.cycles_studied
        )));
    }
    Ok(())
}

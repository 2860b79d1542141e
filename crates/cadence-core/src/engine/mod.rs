//! Scheduling Engine
//!
//! Components, leaves first:
//! - [`Validator`]: existence and uniqueness guards
//! - [`ScheduleManager`]: cycle generation, load smoothing, next study date
//! - [`Rescheduler`]: cascades and drift correction
//! - [`CycleManager`]: cycle completion and advancement
//! - [`RepetitionService`]: transactional use cases composed from the above
//!
//! Components borrow a connection (normally the use case's transaction), so
//! everything one use case writes commits or rolls back together.

mod cycle;
mod rescheduler;
mod schedule;
mod service;
mod validator;

pub use cycle::CycleManager;
pub use rescheduler::Rescheduler;
pub use schedule::ScheduleManager;
pub use service::{CompletionResult, RepetitionService, RescheduleResult};
pub use validator::Validator;

use chrono::{NaiveDate, TimeDelta};
use rusqlite::Connection;

use crate::error::{Result, ScheduleError};
use crate::model::ModuleProgress;
use crate::storage::queries;

/// `date + days`, failing instead of panicking outside chrono's range
pub(crate) fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            ScheduleError::InvalidArgument(format!("{} + {} days is out of range", date, days))
        })
}

/// Fail if review dates in the progress's current cycle go backwards
///
/// Runs before commit; an error rolls the whole use case back.
pub(crate) fn verify_cycle_ordering(conn: &Connection, progress: &ModuleProgress) -> Result<()> {
    let repetitions = queries::cycle_repetitions(conn, &progress.id, progress.cycles_studied)?;
    for pair in repetitions.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if earlier.review_date > later.review_date {
            return Err(ScheduleError::InvalidArgument(format!(
                "{} on {} would fall after {} on {}",
                earlier.repetition_order,
                earlier.review_date,
                later.repetition_order,
                later.review_date
            )));
        }
    }
    Ok(())
}

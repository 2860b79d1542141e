//! Row mapping and per-connection queries
//!
//! These functions take a plain `&Connection` so the engine can run them
//! inside a caller-owned transaction (`Transaction` derefs to `Connection`).
//! Soft-deleted rows are filtered everywhere.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, ScheduleError};
use crate::model::{
    CyclesStudied, ModuleProgress, ModuleRef, Repetition, RepetitionOrder, RepetitionStatus,
};

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Parse RFC3339 timestamp
fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(format!("Invalid {} timestamp '{}': {}", field_name, value, e)))
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

/// Convert a row to ModuleProgress (repetition ids are filled in separately)
fn row_to_progress(row: &rusqlite::Row) -> rusqlite::Result<ModuleProgress> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let cycles: u32 = row.get("cycles_studied")?;

    Ok(ModuleProgress {
        id: row.get("id")?,
        learner_id: row.get("learner_id")?,
        module_ref: ModuleRef {
            module_id: row.get("module_id")?,
            word_count: row.get("word_count")?,
        },
        first_learning_date: row.get("first_learning_date")?,
        cycle_anchor_date: row.get("cycle_anchor_date")?,
        cycles_studied: CyclesStudied::from_index(cycles),
        next_study_date: row.get("next_study_date")?,
        percent_complete: row.get("percent_complete")?,
        repetition_ids: Vec::new(),
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

/// Convert a row to Repetition
fn row_to_repetition(row: &rusqlite::Row) -> rusqlite::Result<Repetition> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let cycle: u32 = row.get("cycle")?;
    let position: i64 = row.get("repetition_order")?;
    let status: String = row.get("status")?;

    let repetition_order = usize::try_from(position - 1)
        .ok()
        .and_then(RepetitionOrder::from_index)
        .ok_or_else(|| conversion_error(format!("Invalid repetition_order {}", position)))?;
    let status = status.parse::<RepetitionStatus>().map_err(conversion_error)?;

    Ok(Repetition {
        id: row.get("id")?,
        progress_id: row.get("progress_id")?,
        cycle: CyclesStudied::from_index(cycle),
        repetition_order,
        status,
        review_date: row.get("review_date")?,
        completed_on: row.get("completed_on")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

/// One-based column value for an order
fn order_position(order: RepetitionOrder) -> i64 {
    order.index() as i64 + 1
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}

// ============================================================================
// MODULE PROGRESS
// ============================================================================

pub(crate) fn insert_progress(conn: &Connection, progress: &ModuleProgress) -> Result<()> {
    conn.execute(
        "INSERT INTO module_progress (
            id, learner_id, module_id, word_count,
            first_learning_date, cycle_anchor_date, cycles_studied,
            next_study_date, percent_complete, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            progress.id,
            progress.learner_id,
            progress.module_ref.module_id,
            progress.module_ref.word_count,
            progress.first_learning_date,
            progress.cycle_anchor_date,
            progress.cycles_studied.index(),
            progress.next_study_date,
            progress.percent_complete,
            progress.created_at.to_rfc3339(),
            progress.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Load a live progress together with its current cycle's repetition ids
pub(crate) fn load_progress(conn: &Connection, id: &str) -> Result<Option<ModuleProgress>> {
    let progress = conn
        .prepare_cached("SELECT * FROM module_progress WHERE id = ?1 AND deleted_at IS NULL")?
        .query_row(params![id], row_to_progress)
        .optional()?;

    match progress {
        Some(mut progress) => {
            progress.repetition_ids = cycle_repetition_ids(conn, id, progress.cycles_studied)?;
            Ok(Some(progress))
        }
        None => Ok(None),
    }
}

/// Persist the mutable scheduling fields of a progress
pub(crate) fn save_progress(conn: &Connection, progress: &ModuleProgress) -> Result<()> {
    let changed = conn.execute(
        "UPDATE module_progress SET
            first_learning_date = ?1,
            cycle_anchor_date = ?2,
            cycles_studied = ?3,
            next_study_date = ?4,
            percent_complete = ?5,
            updated_at = ?6
        WHERE id = ?7 AND deleted_at IS NULL",
        params![
            progress.first_learning_date,
            progress.cycle_anchor_date,
            progress.cycles_studied.index(),
            progress.next_study_date,
            progress.percent_complete,
            Utc::now().to_rfc3339(),
            progress.id,
        ],
    )?;
    if changed == 0 {
        return Err(ScheduleError::NotFound(format!("module progress {}", progress.id)));
    }
    Ok(())
}

/// Soft-delete a progress and its live repetitions, freeing their load
pub(crate) fn soft_delete_progress(conn: &Connection, id: &str) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE module_progress SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    if changed > 0 {
        conn.execute(
            "UPDATE repetitions SET deleted_at = ?1, updated_at = ?1
             WHERE progress_id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
    }
    Ok(changed > 0)
}

/// Live progresses whose next study date falls in `[from, to]`
pub(crate) fn progress_due_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ModuleProgress>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM module_progress
         WHERE deleted_at IS NULL
         AND next_study_date IS NOT NULL
         AND next_study_date >= ?1 AND next_study_date <= ?2
         ORDER BY next_study_date ASC, id ASC",
    )?;
    let mut progresses = collect(stmt.query_map(params![from, to], row_to_progress)?)?;
    for progress in &mut progresses {
        progress.repetition_ids =
            cycle_repetition_ids(conn, &progress.id, progress.cycles_studied)?;
    }
    Ok(progresses)
}

// ============================================================================
// REPETITIONS
// ============================================================================

pub(crate) fn insert_repetition(conn: &Connection, repetition: &Repetition) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO repetitions (
            id, progress_id, cycle, repetition_order, status,
            review_date, completed_on, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    stmt.execute(params![
        repetition.id,
        repetition.progress_id,
        repetition.cycle.index(),
        order_position(repetition.repetition_order),
        repetition.status.as_str(),
        repetition.review_date,
        repetition.completed_on,
        repetition.created_at.to_rfc3339(),
        repetition.updated_at.to_rfc3339(),
    ])?;
    Ok(())
}

pub(crate) fn insert_repetitions(conn: &Connection, repetitions: &[Repetition]) -> Result<()> {
    for repetition in repetitions {
        insert_repetition(conn, repetition)?;
    }
    Ok(())
}

/// Persist status and dates of a repetition
pub(crate) fn save_repetition(conn: &Connection, repetition: &Repetition) -> Result<()> {
    let changed = conn
        .prepare_cached(
            "UPDATE repetitions SET
                status = ?1,
                review_date = ?2,
                completed_on = ?3,
                updated_at = ?4
            WHERE id = ?5 AND deleted_at IS NULL",
        )?
        .execute(params![
            repetition.status.as_str(),
            repetition.review_date,
            repetition.completed_on,
            Utc::now().to_rfc3339(),
            repetition.id,
        ])?;
    if changed == 0 {
        return Err(ScheduleError::NotFound(format!("repetition {}", repetition.id)));
    }
    Ok(())
}

pub(crate) fn save_repetitions(conn: &Connection, repetitions: &[Repetition]) -> Result<()> {
    for repetition in repetitions {
        save_repetition(conn, repetition)?;
    }
    Ok(())
}

pub(crate) fn load_repetition(conn: &Connection, id: &str) -> Result<Option<Repetition>> {
    let repetition = conn
        .prepare_cached("SELECT * FROM repetitions WHERE id = ?1 AND deleted_at IS NULL")?
        .query_row(params![id], row_to_repetition)
        .optional()?;
    Ok(repetition)
}

pub(crate) fn soft_delete_repetition(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE repetitions SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![Utc::now().to_rfc3339(), id],
    )?;
    Ok(changed > 0)
}

/// Live repetition occupying a slot, if any
pub(crate) fn repetition_in_slot(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
    order: RepetitionOrder,
) -> Result<Option<Repetition>> {
    let repetition = conn
        .prepare_cached(
            "SELECT * FROM repetitions
             WHERE progress_id = ?1 AND cycle = ?2 AND repetition_order = ?3
             AND deleted_at IS NULL",
        )?
        .query_row(
            params![progress_id, cycle.index(), order_position(order)],
            row_to_repetition,
        )
        .optional()?;
    Ok(repetition)
}

/// All live repetitions of one cycle, FIRST..FIFTH
pub(crate) fn cycle_repetitions(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
) -> Result<Vec<Repetition>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM repetitions
         WHERE progress_id = ?1 AND cycle = ?2 AND deleted_at IS NULL
         ORDER BY repetition_order ASC",
    )?;
    let rows = stmt.query_map(params![progress_id, cycle.index()], row_to_repetition)?;
    collect(rows)
}

fn cycle_repetition_ids(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM repetitions
         WHERE progress_id = ?1 AND cycle = ?2 AND deleted_at IS NULL
         ORDER BY repetition_order ASC",
    )?;
    let rows = stmt.query_map(params![progress_id, cycle.index()], |row| row.get(0))?;
    collect(rows)
}

/// Every live repetition of a progress across cycles, oldest cycle first
pub(crate) fn all_repetitions(conn: &Connection, progress_id: &str) -> Result<Vec<Repetition>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM repetitions
         WHERE progress_id = ?1 AND deleted_at IS NULL
         ORDER BY cycle ASC, repetition_order ASC",
    )?;
    let rows = stmt.query_map(params![progress_id], row_to_repetition)?;
    collect(rows)
}

/// Pending repetitions of one cycle, earliest review date first
pub(crate) fn pending_by_date(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
) -> Result<Vec<Repetition>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM repetitions
         WHERE progress_id = ?1 AND cycle = ?2 AND status = 'not_started'
         AND deleted_at IS NULL
         ORDER BY review_date ASC, repetition_order ASC",
    )?;
    let rows = stmt.query_map(params![progress_id, cycle.index()], row_to_repetition)?;
    collect(rows)
}

/// Pending repetitions after `order` in one cycle, in order
pub(crate) fn pending_after(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
    order: RepetitionOrder,
) -> Result<Vec<Repetition>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM repetitions
         WHERE progress_id = ?1 AND cycle = ?2 AND repetition_order > ?3
         AND status = 'not_started' AND deleted_at IS NULL
         ORDER BY repetition_order ASC",
    )?;
    let rows = stmt.query_map(
        params![progress_id, cycle.index(), order_position(order)],
        row_to_repetition,
    )?;
    collect(rows)
}

/// Total and completed counts for one cycle
pub(crate) fn cycle_counts(
    conn: &Connection,
    progress_id: &str,
    cycle: CyclesStudied,
) -> Result<(u32, u32)> {
    let counts = conn
        .prepare_cached(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0)
             FROM repetitions
             WHERE progress_id = ?1 AND cycle = ?2 AND deleted_at IS NULL",
        )?
        .query_row(params![progress_id, cycle.index()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
    Ok(counts)
}

/// Pending reviews scheduled on a date across all progresses
pub(crate) fn pending_load_on(conn: &Connection, date: NaiveDate) -> Result<u32> {
    let load: Option<u32> = conn
        .prepare_cached("SELECT pending FROM daily_load WHERE review_date = ?1")?
        .query_row(params![date], |row| row.get(0))
        .optional()?;
    Ok(load.unwrap_or(0))
}

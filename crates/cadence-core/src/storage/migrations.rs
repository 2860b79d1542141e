//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: module progress and repetitions",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Daily load index for review date smoothing",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS module_progress (
    id TEXT PRIMARY KEY,
    learner_id TEXT NOT NULL,
    module_id TEXT NOT NULL,
    word_count INTEGER NOT NULL DEFAULT 0,

    -- Scheduling anchors
    first_learning_date TEXT,
    cycle_anchor_date TEXT,
    cycles_studied INTEGER NOT NULL DEFAULT 0,

    -- Derived from pending repetitions, never written directly by callers
    next_study_date TEXT,

    percent_complete REAL NOT NULL DEFAULT 0.0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_progress_next_study ON module_progress(next_study_date);
CREATE INDEX IF NOT EXISTS idx_progress_learner ON module_progress(learner_id);
CREATE INDEX IF NOT EXISTS idx_progress_module ON module_progress(module_id);

CREATE TABLE IF NOT EXISTS repetitions (
    id TEXT PRIMARY KEY,
    progress_id TEXT NOT NULL REFERENCES module_progress(id),
    cycle INTEGER NOT NULL DEFAULT 0,
    repetition_order INTEGER NOT NULL,  -- 1 = FIRST ... 5 = FIFTH
    status TEXT NOT NULL DEFAULT 'not_started',  -- 'not_started', 'completed'
    review_date TEXT NOT NULL,
    completed_on TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

-- One live repetition per slot
CREATE UNIQUE INDEX IF NOT EXISTS idx_repetitions_slot
    ON repetitions(progress_id, cycle, repetition_order)
    WHERE deleted_at IS NULL;

CREATE INDEX IF NOT EXISTS idx_repetitions_progress_status
    ON repetitions(progress_id, status, review_date);
CREATE INDEX IF NOT EXISTS idx_repetitions_review_date ON repetitions(review_date);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Date -> pending count index, kept current by triggers
///
/// Load smoothing reads one row here instead of scanning repetitions.
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS daily_load (
    review_date TEXT PRIMARY KEY,
    pending INTEGER NOT NULL DEFAULT 0
);

INSERT OR REPLACE INTO daily_load (review_date, pending)
SELECT review_date, COUNT(*) FROM repetitions
WHERE status = 'not_started' AND deleted_at IS NULL
GROUP BY review_date;

CREATE TRIGGER IF NOT EXISTS repetitions_load_ai AFTER INSERT ON repetitions
WHEN NEW.status = 'not_started' AND NEW.deleted_at IS NULL
BEGIN
    INSERT OR IGNORE INTO daily_load (review_date, pending) VALUES (NEW.review_date, 0);
    UPDATE daily_load SET pending = pending + 1 WHERE review_date = NEW.review_date;
END;

CREATE TRIGGER IF NOT EXISTS repetitions_load_au_old AFTER UPDATE ON repetitions
WHEN OLD.status = 'not_started' AND OLD.deleted_at IS NULL
BEGIN
    UPDATE daily_load SET pending = MAX(pending - 1, 0) WHERE review_date = OLD.review_date;
END;

CREATE TRIGGER IF NOT EXISTS repetitions_load_au_new AFTER UPDATE ON repetitions
WHEN NEW.status = 'not_started' AND NEW.deleted_at IS NULL
BEGIN
    INSERT OR IGNORE INTO daily_load (review_date, pending) VALUES (NEW.review_date, 0);
    UPDATE daily_load SET pending = pending + 1 WHERE review_date = NEW.review_date;
END;

CREATE TRIGGER IF NOT EXISTS repetitions_load_ad AFTER DELETE ON repetitions
WHEN OLD.status = 'not_started' AND OLD.deleted_at IS NULL
BEGIN
    UPDATE daily_load SET pending = MAX(pending - 1, 0) WHERE review_date = OLD.review_date;
END;

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // Use execute_batch to handle multi-statement SQL including triggers
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

//! SQLite Storage Implementation
//!
//! Owns the database connections and hands out transactions to the engine.

use chrono::{NaiveDate, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use super::queries;
use crate::error::{Result, ScheduleError};
use crate::model::{ModuleProgress, NewModuleProgress, Repetition};

// ============================================================================
// STORAGE
// ============================================================================

/// Main storage struct
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self` (not `&mut self`), making Storage `Send + Sync`
/// so callers can share an `Arc<Storage>`.
///
/// Every mutating use case runs in one `BEGIN IMMEDIATE` transaction on the
/// writer connection, so a progress is never read by one use case while
/// another is halfway through rewriting its repetitions.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("CADENCE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cadence", "core").ok_or_else(|| {
            ScheduleError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("cadence.db"))
    }

    /// Create new storage instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        // Open writer connection
        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!("Applied {} migration(s) to {}", applied, path.display());
        }

        // Open reader connection to same path
        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Run `f` inside one immediate transaction on the writer
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls back every write made through it.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ScheduleError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` against the reader connection
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| ScheduleError::Init("Reader lock poisoned".into()))?;
        f(&reader)
    }

    // ========================================================================
    // MODULE PROGRESS
    // ========================================================================

    /// Register a learner on a unit
    pub fn create_progress(&self, input: NewModuleProgress) -> Result<ModuleProgress> {
        if input.learner_id.trim().is_empty() {
            return Err(ScheduleError::InvalidArgument("learnerId is required".into()));
        }
        if input.module_ref.module_id.trim().is_empty() {
            return Err(ScheduleError::InvalidArgument("moduleId is required".into()));
        }

        let now = Utc::now();
        let progress = ModuleProgress {
            id: Uuid::new_v4().to_string(),
            learner_id: input.learner_id,
            module_ref: input.module_ref,
            first_learning_date: input.first_learning_date,
            cycle_anchor_date: input.first_learning_date,
            cycles_studied: Default::default(),
            next_study_date: None,
            percent_complete: 0.0,
            repetition_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.write(|tx| queries::insert_progress(tx, &progress))?;
        tracing::debug!(
            "Created progress {} for module {}",
            progress.id,
            progress.module_ref.module_id
        );
        Ok(progress)
    }

    /// Get a live progress by ID
    pub fn get_progress(&self, id: &str) -> Result<Option<ModuleProgress>> {
        self.read(|conn| queries::load_progress(conn, id))
    }

    /// Get a live repetition by ID
    pub fn get_repetition(&self, id: &str) -> Result<Option<Repetition>> {
        self.read(|conn| queries::load_repetition(conn, id))
    }

    /// Soft-delete a progress; its repetitions stay on disk but become unreachable
    pub fn delete_progress(&self, id: &str) -> Result<bool> {
        self.write(|tx| queries::soft_delete_progress(tx, id))
    }

    /// Pending reviews on a date across all progresses
    pub fn pending_load_on(&self, date: NaiveDate) -> Result<u32> {
        self.read(|conn| queries::pending_load_on(conn, date))
    }

    /// Create a consistent copy of the database
    pub fn backup_to(&self, path: &std::path::Path) -> Result<()> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| ScheduleError::Init("Reader lock poisoned".into()))?;
        let target = path.to_string_lossy().replace('\'', "''");
        reader.execute_batch(&format!("VACUUM INTO '{}'", target))?;
        Ok(())
    }
}

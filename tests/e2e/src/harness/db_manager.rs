//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A service wired to the database with a chosen configuration
//! - Pre-seeded progresses with generated schedules
//! - Reopening a database to check persistence

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use cadence_core::{
    ModuleProgress, ModuleRef, NewModuleProgress, RepetitionService, ScheduleConfig, Storage,
};
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
///
/// let progress = db.seed_progress("unit-1", 300, Some(date(2024, 1, 1)));
/// let schedule = db.service.create_default_schedule(&progress.id)?;
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// Shared storage instance
    pub storage: Arc<Storage>,
    /// Service over `storage`
    pub service: Arc<RepetitionService>,
    config: ScheduleConfig,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Temporary database without load smoothing
    pub fn new_temp() -> Self {
        Self::with_config(ScheduleConfig::default().with_daily_capacity(None))
    }

    /// Temporary database with a specific schedule configuration
    pub fn with_config(config: ScheduleConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_cadence.db");
        let (storage, service) = open(&db_path, &config);

        Self {
            storage,
            service,
            config,
            _temp_dir: Some(temp_dir),
            db_path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Create one progress; `words` of 0 means nothing to review
    pub fn seed_progress(
        &self,
        module_id: &str,
        words: u32,
        first_learning_date: Option<NaiveDate>,
    ) -> ModuleProgress {
        self.storage
            .create_progress(NewModuleProgress {
                learner_id: "learner-1".to_string(),
                module_ref: ModuleRef::new(module_id, words),
                first_learning_date,
            })
            .expect("Failed to create progress")
    }

    /// Create `count` progresses started on `first` and schedule each of them
    pub fn seed_scheduled(&self, count: usize, first: NaiveDate) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            let progress = self.seed_progress(&format!("unit-{}", i), 100 + i as u32, Some(first));
            self.service
                .create_default_schedule_on(&progress.id, first)
                .expect("Failed to create schedule");
            ids.push(progress.id);
        }

        ids
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Drop the connections and open the same file again
    pub fn reopen(&mut self) {
        let (storage, service) = open(&self.db_path, &self.config);
        self.storage = storage;
        self.service = service;
    }
}

fn open(path: &Path, config: &ScheduleConfig) -> (Arc<Storage>, Arc<RepetitionService>) {
    let storage = Arc::new(Storage::new(Some(path.to_path_buf())).expect("Failed to create test storage"));
    let service = RepetitionService::new(storage.clone(), config.clone())
        .expect("Failed to create service");
    (storage, Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_temp_database_creation() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.path().exists());
        assert_eq!(db.service.config().daily_capacity, None);
    }

    #[test]
    fn test_seed_scheduled() {
        let db = TestDatabaseManager::new_temp();
        let ids = db.seed_scheduled(4, first_day());

        assert_eq!(ids.len(), 4);
        for id in &ids {
            assert_eq!(db.service.list_repetitions(id).unwrap().len(), 5);
        }
    }

    #[test]
    fn test_reopen_keeps_schedules() {
        let mut db = TestDatabaseManager::new_temp();
        let ids = db.seed_scheduled(2, first_day());

        db.reopen();
        let progress = db.service.get_progress(&ids[1]).unwrap();
        assert_eq!(progress.repetition_ids.len(), 5);
        assert!(progress.next_study_date.is_some());
    }
}

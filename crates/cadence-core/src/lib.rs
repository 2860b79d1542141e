//! # Cadence Core
//!
//! Spaced-repetition scheduling engine for study units. A learner studies a
//! unit once, then reviews it five times per cycle at growing intervals:
//!
//! - **Fixed-ratio cycles**: default offsets of 1, 3, 7, 14 and 30 days,
//!   stretched by a multiplier for every later cycle
//! - **Drift correction**: studying early or late shifts the rest of the cycle
//! - **Load smoothing**: reviews slide to the next day with room when a day is
//!   at capacity across all learners
//! - **Atomic use cases**: every mutation is one SQLite transaction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_core::prelude::*;
//!
//! let storage = Arc::new(Storage::new(None)?);
//! let service = RepetitionService::new(storage.clone(), ScheduleConfig::default())?;
//!
//! let progress = storage.create_progress(NewModuleProgress {
//!     learner_id: "ana".into(),
//!     module_ref: ModuleRef::new("spanish-1", 450),
//!     first_learning_date: None,
//! })?;
//!
//! // Five reviews, starting tomorrow
//! let schedule = service.create_default_schedule(&progress.id)?;
//!
//! // Studied the first one
//! let result = service.update_completion(&schedule[0].id, CompletionUpdate::completed(20.0))?;
//! println!("next study: {:?}", result.progress.next_study_date);
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the binary
//! - `encryption`: SQLCipher, keyed by `CADENCE_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::ScheduleConfig;
pub use engine::{
    CompletionResult, CycleManager, RepetitionService, RescheduleResult, Rescheduler,
    ScheduleManager, Validator,
};
pub use error::{Result, ScheduleError};
pub use model::{
    CompletionUpdate, CreateRepetitionInput, CyclesStudied, ModuleProgress, ModuleRef,
    NewModuleProgress, Repetition, RepetitionOrder, RepetitionStatus,
};
pub use storage::Storage;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current database schema version
pub const SCHEMA_VERSION: u32 = 2;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CompletionResult, CompletionUpdate, CreateRepetitionInput, CyclesStudied,
        ModuleProgress, ModuleRef, NewModuleProgress, Repetition, RepetitionOrder,
        RepetitionService, RepetitionStatus, RescheduleResult, Result, ScheduleConfig,
        ScheduleError, Storage,
    };
}

//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Module progress and repetition tables (arena of repetitions keyed by id)
//! - A trigger-maintained date -> pending-count index for load smoothing
//! - Versioned schema migrations

mod migrations;
pub(crate) mod queries;
mod sqlite;

pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::Storage;

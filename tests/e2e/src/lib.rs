//! Cadence end-to-end test support
//!
//! - [`harness`]: isolated databases with a ready service
//! - [`mocks`]: fixtures, scenario builders and invariant checks

pub mod harness;

pub use harness::TestDatabaseManager;
pub use mocks::{assert_schedule_invariants, date, TestDataFactory};

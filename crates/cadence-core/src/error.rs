//! Error types shared by storage and the scheduling engine

/// Scheduling error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Progress or repetition not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Duplicate repetition for a progress and order
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// Rejected request or configuration
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration parse error
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Scheduling result type
pub type Result<T> = std::result::Result<T, ScheduleError>;

//! Repetition - One scheduled review event
//!
//! Every cycle holds exactly one repetition per [`RepetitionOrder`]. A
//! repetition moves from `NOT_STARTED` to `COMPLETED`; a new cycle creates
//! fresh repetitions instead of resetting old ones.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::CyclesStudied;

// ============================================================================
// REPETITION ORDER
// ============================================================================

/// Fixed position of a review within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepetitionOrder {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl RepetitionOrder {
    /// Number of repetitions in one cycle
    pub const COUNT: usize = 5;

    /// All orders, earliest first
    pub const ALL: [RepetitionOrder; Self::COUNT] = [
        RepetitionOrder::First,
        RepetitionOrder::Second,
        RepetitionOrder::Third,
        RepetitionOrder::Fourth,
        RepetitionOrder::Fifth,
    ];

    /// Zero-based position within the cycle
    pub fn index(&self) -> usize {
        match self {
            RepetitionOrder::First => 0,
            RepetitionOrder::Second => 1,
            RepetitionOrder::Third => 2,
            RepetitionOrder::Fourth => 3,
            RepetitionOrder::Fifth => 4,
        }
    }

    /// Inverse of [`RepetitionOrder::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The order that follows this one, `None` for the last
    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The order before this one, `None` for the first
    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepetitionOrder::First => "FIRST",
            RepetitionOrder::Second => "SECOND",
            RepetitionOrder::Third => "THIRD",
            RepetitionOrder::Fourth => "FOURTH",
            RepetitionOrder::Fifth => "FIFTH",
        }
    }
}

impl std::fmt::Display for RepetitionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RepetitionOrder {
    type Err = String;

    /// Accepts names (`first`, `SECOND`) or one-based positions (`3`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FIRST" | "1" => Ok(RepetitionOrder::First),
            "SECOND" | "2" => Ok(RepetitionOrder::Second),
            "THIRD" | "3" => Ok(RepetitionOrder::Third),
            "FOURTH" | "4" => Ok(RepetitionOrder::Fourth),
            "FIFTH" | "5" => Ok(RepetitionOrder::Fifth),
            _ => Err(format!("Unknown repetition order: {}", s)),
        }
    }
}

// ============================================================================
// REPETITION STATUS
// ============================================================================

/// Review status of a single repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepetitionStatus {
    #[default]
    NotStarted,
    Completed,
}

impl RepetitionStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RepetitionStatus::NotStarted => "not_started",
            RepetitionStatus::Completed => "completed",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RepetitionStatus::NotStarted)
    }
}

impl std::fmt::Display for RepetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RepetitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_started" | "pending" => Ok(RepetitionStatus::NotStarted),
            "completed" | "done" => Ok(RepetitionStatus::Completed),
            _ => Err(format!("Unknown repetition status: {}", s)),
        }
    }
}

// ============================================================================
// REPETITION
// ============================================================================

/// A scheduled review event owned by exactly one module progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repetition {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning module progress
    pub progress_id: String,
    /// Cycle this repetition was generated for
    pub cycle: CyclesStudied,
    /// Position within the cycle
    pub repetition_order: RepetitionOrder,
    pub status: RepetitionStatus,
    /// Due date while pending, study date once completed
    pub review_date: NaiveDate,
    /// Actual completion date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repetition {
    /// Build an unsaved pending repetition
    pub(crate) fn pending(
        progress_id: &str,
        cycle: CyclesStudied,
        repetition_order: RepetitionOrder,
        review_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            progress_id: progress_id.to_string(),
            cycle,
            repetition_order,
            status: RepetitionStatus::NotStarted,
            review_date,
            completed_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Manual creation of a single repetition in the current cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepetitionInput {
    pub progress_id: String,
    pub repetition_order: RepetitionOrder,
    pub review_date: NaiveDate,
    #[serde(default)]
    pub status: RepetitionStatus,
}

/// Status change reported by the learner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionUpdate {
    pub status: RepetitionStatus,
    /// Learner-reported completion score (0 - 100)
    pub percent_complete: f64,
    /// Study date; defaults to today when completing
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}

impl CompletionUpdate {
    /// Mark as completed today with the given score
    pub fn completed(percent_complete: f64) -> Self {
        Self {
            status: RepetitionStatus::Completed,
            percent_complete,
            completed_on: None,
        }
    }

    /// Mark as completed on a specific date
    pub fn completed_on(percent_complete: f64, date: NaiveDate) -> Self {
        Self {
            status: RepetitionStatus::Completed,
            percent_complete,
            completed_on: Some(date),
        }
    }
}

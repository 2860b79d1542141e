//! Module Progress - One learner working through one unit
//!
//! Each progress record carries:
//! - An opaque reference to the studied unit
//! - The first learning date (set once) and the current cycle's anchor date
//! - The cached next study date, always recomputed from pending repetitions
//! - The ids of the current cycle's repetitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CYCLE STAGE
// ============================================================================

/// Number of completed passes through the five-step repetition sequence
///
/// Ordered `FIRST_TIME → FIRST_REVIEW → SECOND_REVIEW → THIRD_REVIEW → …`.
/// Stages past the third review are labelled `REVIEW_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CyclesStudied(u32);

impl CyclesStudied {
    pub const FIRST_TIME: CyclesStudied = CyclesStudied(0);
    pub const FIRST_REVIEW: CyclesStudied = CyclesStudied(1);
    pub const SECOND_REVIEW: CyclesStudied = CyclesStudied(2);
    pub const THIRD_REVIEW: CyclesStudied = CyclesStudied(3);

    pub fn from_index(index: u32) -> Self {
        CyclesStudied(index)
    }

    /// Zero-based cycle index
    pub fn index(&self) -> u32 {
        self.0
    }

    /// The following stage
    pub fn next(&self) -> Self {
        CyclesStudied(self.0.saturating_add(1))
    }

    pub fn is_first_time(&self) -> bool {
        self.0 == 0
    }

    pub fn label(&self) -> String {
        match self.0 {
            0 => "FIRST_TIME".to_string(),
            1 => "FIRST_REVIEW".to_string(),
            2 => "SECOND_REVIEW".to_string(),
            3 => "THIRD_REVIEW".to_string(),
            n => format!("REVIEW_{}", n),
        }
    }
}

impl std::fmt::Display for CyclesStudied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for CyclesStudied {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "FIRST_TIME" => Ok(Self::FIRST_TIME),
            "FIRST_REVIEW" => Ok(Self::FIRST_REVIEW),
            "SECOND_REVIEW" => Ok(Self::SECOND_REVIEW),
            "THIRD_REVIEW" => Ok(Self::THIRD_REVIEW),
            other => other
                .strip_prefix("REVIEW_")
                .and_then(|n| n.parse::<u32>().ok())
                .map(CyclesStudied)
                .ok_or_else(|| format!("Unknown cycle stage: {}", s)),
        }
    }
}

impl From<CyclesStudied> for String {
    fn from(value: CyclesStudied) -> Self {
        value.label()
    }
}

impl TryFrom<String> for CyclesStudied {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// MODULE REFERENCE
// ============================================================================

/// Opaque handle to a unit owned by the external catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRef {
    pub module_id: String,
    /// Size of the unit; zero means there is nothing to schedule
    pub word_count: u32,
}

impl ModuleRef {
    pub fn new(module_id: impl Into<String>, word_count: u32) -> Self {
        Self {
            module_id: module_id.into(),
            word_count,
        }
    }

    /// Whether the unit has enough material to need a review schedule
    pub fn needs_schedule(&self) -> bool {
        self.word_count > 0
    }
}

// ============================================================================
// MODULE PROGRESS
// ============================================================================

/// Learner progress through one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub learner_id: String,
    pub module_ref: ModuleRef,
    /// Date the first schedule was generated; never changes once set
    pub first_learning_date: Option<NaiveDate>,
    /// Base date for the current cycle's offsets
    pub cycle_anchor_date: Option<NaiveDate>,
    pub cycles_studied: CyclesStudied,
    /// Earliest pending review date (derived)
    pub next_study_date: Option<NaiveDate>,
    /// Learner-reported completion (0 - 100)
    pub percent_complete: f64,
    /// Current cycle's repetition ids, ordered FIRST..FIFTH
    pub repetition_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleProgress {
    /// Base date for the current cycle's review dates
    pub fn schedule_base(&self) -> Option<NaiveDate> {
        self.cycle_anchor_date.or(self.first_learning_date)
    }
}

/// Input for registering a learner on a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModuleProgress {
    pub learner_id: String,
    pub module_ref: ModuleRef,
    /// Pre-existing start date when importing history
    #[serde(default)]
    pub first_learning_date: Option<NaiveDate>,
}

//! Schedule configuration
//!
//! Offset table, cycle growth and per-day capacity.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::model::RepetitionOrder;

/// Default day offsets from the cycle anchor, one per repetition order
pub const DEFAULT_OFFSETS_DAYS: [u32; RepetitionOrder::COUNT] = [1, 3, 7, 14, 30];

/// Default growth of offsets per completed cycle
pub const DEFAULT_CYCLE_MULTIPLIER: f64 = 1.5;

/// Default number of pending reviews allowed on one calendar day
pub const DEFAULT_DAILY_CAPACITY: u32 = 50;

/// Configuration for review date generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Days after the cycle anchor for FIRST..FIFTH (non-decreasing)
    pub offsets_days: [u32; RepetitionOrder::COUNT],
    /// Offsets are scaled by `cycle_multiplier ^ cycle_index`
    pub cycle_multiplier: f64,
    /// Upper bound for a single scaled offset
    pub max_offset_days: Option<u32>,
    /// Pending reviews per day before dates get nudged later; `None`/0 disables
    pub daily_capacity: Option<u32>,
    /// How far load smoothing may push a date
    pub max_smoothing_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            offsets_days: DEFAULT_OFFSETS_DAYS,
            cycle_multiplier: DEFAULT_CYCLE_MULTIPLIER,
            max_offset_days: Some(365),
            daily_capacity: Some(DEFAULT_DAILY_CAPACITY),
            max_smoothing_days: 60,
        }
    }
}

impl ScheduleConfig {
    /// Same offsets in every cycle and no load smoothing
    pub fn fixed(offsets_days: [u32; RepetitionOrder::COUNT]) -> Self {
        Self {
            offsets_days,
            cycle_multiplier: 1.0,
            max_offset_days: None,
            daily_capacity: None,
            ..Default::default()
        }
    }

    pub fn with_daily_capacity(mut self, capacity: Option<u32>) -> Self {
        self.daily_capacity = capacity;
        self
    }

    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ScheduleConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tables that would break schedule ordering
    pub fn validate(&self) -> Result<()> {
        if self.offsets_days.windows(2).any(|w| w[0] > w[1]) {
            return Err(ScheduleError::InvalidArgument(format!(
                "offsetsDays must be non-decreasing, got {:?}",
                self.offsets_days
            )));
        }
        if !self.cycle_multiplier.is_finite() || self.cycle_multiplier < 1.0 {
            return Err(ScheduleError::InvalidArgument(format!(
                "cycleMultiplier must be a finite value >= 1.0, got {}",
                self.cycle_multiplier
            )));
        }
        Ok(())
    }

    /// Effective capacity, `None` when smoothing is off
    pub fn capacity(&self) -> Option<u32> {
        self.daily_capacity.filter(|c| *c > 0)
    }

    /// Scaled offset for an order in a given cycle
    ///
    /// Monotonic in `order` for any valid config: scaling, rounding and
    /// capping all preserve non-decreasing input.
    pub fn offset_days(&self, order: RepetitionOrder, cycle_index: u32) -> i64 {
        let base = f64::from(self.offsets_days[order.index()]);
        let exponent = i32::try_from(cycle_index).unwrap_or(i32::MAX);
        let scaled = (base * self.cycle_multiplier.powi(exponent)).round();
        // Float saturates to i64::MAX on overflow; the cap below keeps it sane
        let mut days = if scaled.is_finite() { scaled as i64 } else { i64::MAX };
        if let Some(cap) = self.max_offset_days {
            days = days.min(i64::from(cap));
        }
        // chrono rejects durations this large anyway
        days.min(i64::from(u32::MAX))
    }
}

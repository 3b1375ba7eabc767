//! Pipeline configuration

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Separators that split free-form focus text into topics
pub const DEFAULT_FOCUS_SEPARATORS: &[&str] = &["\n", "\u{ff0c}", ",", "\u{3001}", ";", "\u{ff1b}"];

/// Lowest accepted floor of test points per mandatory plan
pub const MIN_MANDATORY_POINTS: usize = 4;

/// Upper bound for `cases_timeout_secs` (one week)
pub const MAX_CASES_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ceiling for the whole cases stage, at most [`MAX_CASES_TIMEOUT_SECS`]
    pub cases_timeout_secs: u64,
    /// Idle gap after which the consumer side emits a heartbeat
    pub heartbeat_interval_secs: u64,
    /// Bounded hand-off channel capacity
    pub channel_capacity: usize,
    /// Minimum test points per mandatory plan, never below [`MIN_MANDATORY_POINTS`]
    pub mandatory_min_points: usize,
    /// Synthetic cases per test point when generation fails
    pub fallback_cases_per_point: usize,
    /// Minimum trimmed requirement length for quality analysis
    pub min_analysis_chars: usize,
    /// Focus text separators
    pub focus_separators: Vec<String>,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cases stage ceiling
    #[inline]
    #[must_use]
    pub fn with_cases_timeout(mut self, secs: u64) -> Self {
        self.cases_timeout_secs = secs;
        self
    }

    /// With heartbeat interval
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    /// With channel capacity
    #[inline]
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// With mandatory point floor
    #[inline]
    #[must_use]
    pub fn with_mandatory_min_points(mut self, min: usize) -> Self {
        self.mandatory_min_points = min;
        self
    }

    /// With fallback cases per point
    #[inline]
    #[must_use]
    pub fn with_fallback_cases_per_point(mut self, count: usize) -> Self {
        self.fallback_cases_per_point = count;
        self
    }

    /// Cases stage ceiling as a duration
    #[inline]
    #[must_use]
    pub fn cases_timeout(&self) -> Duration {
        Duration::from_secs(self.cases_timeout_secs)
    }

    /// Heartbeat interval as a duration
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Check invariants
    ///
    /// # Errors
    /// Returns `PipelineError::Config` naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cases_timeout_secs == 0 {
            return Err(PipelineError::Config("cases_timeout_secs must be positive".into()));
        }
        if self.cases_timeout_secs > MAX_CASES_TIMEOUT_SECS {
            return Err(PipelineError::Config(format!(
                "cases_timeout_secs must be at most {MAX_CASES_TIMEOUT_SECS}"
            )));
        }
        if self.mandatory_min_points < MIN_MANDATORY_POINTS {
            return Err(PipelineError::Config(format!(
                "mandatory_min_points must be at least {MIN_MANDATORY_POINTS}"
            )));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(PipelineError::Config(
                "heartbeat_interval_secs must be positive".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config("channel_capacity must be positive".into()));
        }
        if self.focus_separators.iter().any(String::is_empty) {
            return Err(PipelineError::Config("focus separators must be non-empty".into()));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cases_timeout_secs: 1800,
            heartbeat_interval_secs: 10,
            channel_capacity: 32,
            mandatory_min_points: MIN_MANDATORY_POINTS,
            fallback_cases_per_point: 3,
            min_analysis_chars: 100,
            focus_separators: DEFAULT_FOCUS_SEPARATORS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

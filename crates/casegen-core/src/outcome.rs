//! Explicit stage outcomes
//!
//! A stage either produced its value from the generator or substituted a
//! local fallback. Both carry a usable value; the fallback also records why.

use serde::{Deserialize, Serialize};

/// Result of one stage unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// Value came from the generator
    Generated {
        /// Produced value
        value: T,
    },
    /// Generator failed; value was synthesized locally
    FellBack {
        /// Synthesized value
        value: T,
        /// Failure description
        reason: String,
    },
}

impl<T> StageOutcome<T> {
    /// Wrap a generated value
    #[inline]
    #[must_use]
    pub fn generated(value: T) -> Self {
        Self::Generated { value }
    }

    /// Wrap a fallback value
    #[inline]
    #[must_use]
    pub fn fell_back(value: T, reason: impl Into<String>) -> Self {
        Self::FellBack {
            value,
            reason: reason.into(),
        }
    }

    /// Check if the fallback path was taken
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FellBack { .. })
    }

    /// Fallback reason, if any
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Generated { .. } => None,
            Self::FellBack { reason, .. } => Some(reason),
        }
    }

    /// Borrow the value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &T {
        match self {
            Self::Generated { value } | Self::FellBack { value, .. } => value,
        }
    }

    /// Take the value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Generated { value } | Self::FellBack { value, .. } => value,
        }
    }

    /// Transform the value, keeping the outcome kind
    #[must_use]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StageOutcome<U> {
        match self {
            Self::Generated { value } => StageOutcome::Generated { value: f(value) },
            Self::FellBack { value, reason } => StageOutcome::FellBack {
                value: f(value),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_inspectable() {
        let outcome = StageOutcome::fell_back(vec![1], "timeout");
        assert!(outcome.is_fallback());
        assert_eq!(outcome.reason(), Some("timeout"));
        assert_eq!(outcome.map(|v| v.len()).into_value(), 1);
    }

    #[test]
    fn generated_has_no_reason() {
        let outcome = StageOutcome::generated("x");
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.reason(), None);
        assert_eq!(*outcome.value(), "x");
    }
}

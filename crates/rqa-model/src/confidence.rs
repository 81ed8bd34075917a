//! Confidence scores and bands
//!
//! Every persisted finding carries a confidence score in `[0, 1]`. Producers
//! that omit one get the 0.50 default assigned during normalization - a
//! finding is never dropped for a missing score.

use serde::{Deserialize, Serialize};

/// A confidence score clamped to `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfidenceScore(f64);

impl ConfidenceScore {
    /// Default assigned when a producing stage omits the score
    pub const DEFAULT: ConfidenceScore = ConfidenceScore(0.5);

    /// Create a score, rejecting values outside `[0, 1]` or non-finite input
    ///
    /// # Errors
    /// Returns [`ScoreError::OutOfRange`] for values outside the unit
    /// interval and [`ScoreError::NotFinite`] for NaN/infinite input.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScoreError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Create a score by clamping arbitrary finite input into `[0, 1]`
    ///
    /// Non-finite input clamps to the default. Used at ingestion
    /// boundaries where producer output is untrusted.
    #[inline]
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self::DEFAULT
        }
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Band this score falls into
    #[inline]
    #[must_use]
    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::of(self.0)
    }
}

impl std::fmt::Display for ConfidenceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Confidence bands used for reporting and triage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// `[0.90, 1.00]` - clear violation with strong evidence
    High,
    /// `[0.70, 0.90)` - likely issue, context-dependent
    Medium,
    /// `[0.50, 0.70)` - needs human review
    Low,
    /// `[0.00, 0.50)` - probable false positive
    VeryLow,
}

impl ConfidenceBand {
    /// Classify a raw value
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value >= 0.90 {
            ConfidenceBand::High
        } else if value >= 0.70 {
            ConfidenceBand::Medium
        } else if value >= 0.50 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }
}

/// Errors constructing a [`ConfidenceScore`]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    /// Value outside the unit interval
    #[error("score out of range [0,1]: {0}")]
    OutOfRange(f64),

    /// NaN or infinite value
    #[error("score is not a finite number")]
    NotFinite,
}

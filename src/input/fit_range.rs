// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `FitRange` enum.

use std::fmt::Display;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Portion of the common time axis used for the linear fit.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub enum FitRange {
    /// Fractions of the number of samples.
    /// Samples with indices `floor(n * start)` (inclusive) to `floor(n * end)` (exclusive) are used.
    #[serde(alias = "fraction")]
    Fraction { start: f64, end: f64 },
    /// Absolute time bounds in ps. Both bounds are inclusive.
    #[serde(alias = "time")]
    Time { begin: f64, end: f64 },
}

impl FitRange {
    /// Fit range defined by fractions of the number of samples.
    pub fn fraction(start: f64, end: f64) -> Self {
        FitRange::Fraction { start, end }
    }

    /// Fit range defined by absolute time bounds (in ps).
    pub fn time(begin: f64, end: f64) -> Self {
        FitRange::Time { begin, end }
    }

    /// Check that the fit range is valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            FitRange::Fraction { start, end } => {
                if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) {
                    return Err(ConfigError::InvalidFitRange(format!(
                        "fractions must lie between 0 and 1 (got {} and {})",
                        start, end
                    )));
                }

                if start >= end {
                    return Err(ConfigError::InvalidFitRange(format!(
                        "start fraction ({}) must be lower than end fraction ({})",
                        start, end
                    )));
                }
            }
            FitRange::Time { begin, end } => {
                if !begin.is_finite() || end.is_nan() || begin >= end {
                    return Err(ConfigError::InvalidFitRange(format!(
                        "begin ({} ps) must be lower than end ({} ps)",
                        begin, end
                    )));
                }
            }
        }

        Ok(())
    }

    /// Get the range of indices of `time` that fall into the fit range.
    /// `time` must be sorted in ascending order.
    pub fn select(&self, time: &[f64]) -> Range<usize> {
        let n = time.len();
        match *self {
            FitRange::Fraction { start, end } => {
                let first = ((n as f64 * start).floor() as usize).min(n);
                let last = ((n as f64 * end).floor() as usize).min(n);
                first..last.max(first)
            }
            FitRange::Time { begin, end } => {
                let first = time.partition_point(|&t| t < begin);
                let last = time.partition_point(|&t| t <= end);
                first..last.max(first)
            }
        }
    }
}

impl Display for FitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitRange::Fraction { start, end } => write!(f, "{}-{} of samples", start, end),
            FitRange::Time { begin, end } => write!(f, "{}-{} ps", begin, end),
        }
    }
}

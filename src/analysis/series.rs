// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Time series and their alignment on a common time axis.

use getset::{CopyGetters, Getters};

use crate::PANIC_MESSAGE;

/// Observable sampled at increasing times.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct TimeSeries {
    /// Sampling times (in ps). Non-decreasing.
    #[getset(get = "pub")]
    time: Vec<f64>,
    /// Values of the observable.
    #[getset(get = "pub")]
    values: Vec<f64>,
    /// Coefficient reported for this series by the program that produced it (if any).
    #[getset(get_copy = "pub")]
    reported: Option<f64>,
}

impl TimeSeries {
    /// Create a new time series.
    ///
    /// ## Panics
    /// Panics if `time` and `values` have different lengths.
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> Self {
        assert_eq!(
            time.len(),
            values.len(),
            "FATAL ENSFIT ERROR | TimeSeries::new | Time and values have different lengths. {}",
            PANIC_MESSAGE
        );

        TimeSeries {
            time,
            values,
            reported: None,
        }
    }

    /// Attach a reported coefficient to the series.
    pub fn with_reported(mut self, reported: Option<f64>) -> Self {
        self.reported = reported;
        self
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time of the first sample.
    #[inline(always)]
    pub fn start(&self) -> Option<f64> {
        self.time.first().copied()
    }

    /// Time of the last sample.
    #[inline(always)]
    pub fn end(&self) -> Option<f64> {
        self.time.last().copied()
    }

    /// Linearly interpolate the series at time `t`.
    /// Outside the sampled interval, the value of the nearest sample is returned.
    /// Returns NaN for an empty series.
    pub fn interpolate(&self, t: f64) -> f64 {
        let (Some(&first), Some(&last)) = (self.time.first(), self.time.last()) else {
            return f64::NAN;
        };

        if t <= first {
            return self.values[0];
        }

        if t >= last {
            return self.values[self.values.len() - 1];
        }

        // index of the first sample after `t`; always in 1..len
        let upper = self.time.partition_point(|&x| x <= t);
        let lower = upper - 1;

        let (t0, t1) = (self.time[lower], self.time[upper]);
        let (v0, v1) = (self.values[lower], self.values[upper]);

        if t1 == t0 {
            v0
        } else {
            v0 + (v1 - v0) * (t - t0) / (t1 - t0)
        }
    }

    /// Linearly interpolate the series onto the given time axis.
    pub fn resample(&self, axis: &[f64]) -> Vec<f64> {
        axis.iter().map(|&t| self.interpolate(t)).collect()
    }
}

/// Construct `n_points` uniformly spaced times spanning the interval covered by all the series.
/// Returns `None` if there is no series, any series is empty, the overlap is empty
/// or fewer than 2 points are requested.
pub fn common_axis(series: &[TimeSeries], n_points: usize) -> Option<Vec<f64>> {
    if series.is_empty() || n_points < 2 {
        return None;
    }

    let mut start = f64::NEG_INFINITY;
    let mut end = f64::INFINITY;
    for s in series {
        start = start.max(s.start()?);
        end = end.min(s.end()?);
    }

    if !(end > start) {
        return None;
    }

    Some(linspace(start, end, n_points))
}

/// `n` uniformly spaced values from `start` to `end` (both inclusive).
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

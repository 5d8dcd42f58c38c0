// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Descriptive statistics and detection of outliers.

use crate::input::outliers::{Fences, OutlierMethod};

/// Scale applied to the population standard deviation when the median absolute deviation vanishes.
const MAD_FALLBACK_SCALE: f64 = 0.6745;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(statistical::mean(values))
    }
}

/// Sample standard deviation (with Bessel's correction). `None` for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else if all_equal(values) {
        Some(0.0)
    } else {
        Some(statistical::standard_deviation(values, None))
    }
}

/// Population standard deviation. `None` for an empty slice.
pub fn population_std(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        _ if all_equal(values) => Some(0.0),
        _ => Some(statistical::population_standard_deviation(values, None)),
    }
}

/// Returns `true` if all the values are identical.
#[inline(always)]
fn all_equal(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Quantile `q` (between 0 and 1) calculated by linear interpolation between the closest ranks.
/// `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64))
}

/// Median. `None` for an empty slice.
#[inline(always)]
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Median absolute deviation from the median. `None` for an empty slice.
pub fn median_absolute_deviation(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    median(&deviations)
}

/// Interval of values that are not considered outliers. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// Construct the bounds from the provided values. `None` for an empty slice.
    pub fn from_values(values: &[f64], method: OutlierMethod, multiplier: f64) -> Option<Bounds> {
        let (center_low, center_high, spread) = match method {
            OutlierMethod::Iqr => {
                let q1 = quantile(values, 0.25)?;
                let q3 = quantile(values, 0.75)?;
                (q1, q3, q3 - q1)
            }
            OutlierMethod::Sigma => {
                let center = mean(values)?;
                (center, center, population_std(values)?)
            }
            OutlierMethod::Mad => {
                let center = median(values)?;
                let mad = median_absolute_deviation(values)?;
                let spread = if mad == 0.0 {
                    population_std(values)? * MAD_FALLBACK_SCALE
                } else {
                    mad
                };
                (center, center, spread)
            }
        };

        Some(Bounds {
            lower: center_low - multiplier * spread,
            upper: center_high + multiplier * spread,
        })
    }

    /// Is the value inside the bounds?
    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Identify outliers among the values. Returns one flag per value (`true` = outlier).
///
/// With `Fences::Pooled`, every value is tested against bounds constructed from all the values.
/// With `Fences::LeaveOneOut`, every value is tested against bounds constructed from the other values.
/// Values lying exactly on a fence are not outliers.
pub fn detect_outliers(
    values: &[f64],
    method: OutlierMethod,
    multiplier: f64,
    fences: Fences,
) -> Vec<bool> {
    match fences {
        Fences::Pooled => match Bounds::from_values(values, method, multiplier) {
            Some(bounds) => values.iter().map(|&v| !bounds.contains(v)).collect(),
            None => Vec::new(),
        },
        Fences::LeaveOneOut => (0..values.len())
            .map(|i| {
                let others: Vec<f64> = values
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &v)| v)
                    .collect();

                Bounds::from_values(&others, method, multiplier)
                    .map(|bounds| !bounds.contains(values[i]))
                    .unwrap_or(false)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn basic_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std(&values).unwrap(), 2.0);
        assert_relative_eq!(
            sample_std(&values).unwrap(),
            (32.0f64 / 7.0).sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(median(&values).unwrap(), 4.5);
    }

    #[test]
    fn empty_statistics() {
        assert!(mean(&[]).is_none());
        assert!(sample_std(&[1.0]).is_none());
        assert!(population_std(&[]).is_none());
        assert_relative_eq!(population_std(&[3.0]).unwrap(), 0.0);
        assert!(quantile(&[], 0.5).is_none());
    }

    #[test]
    fn quantile_linear() {
        let values = [1.0, 2.0, 100.0];
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.5);
        assert_relative_eq!(quantile(&values, 0.75).unwrap(), 51.0);
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 100.0);

        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
    }

    #[test]
    fn mad() {
        let values = [1.0, 1.0, 2.0, 2.0, 4.0, 6.0, 9.0];
        assert_relative_eq!(median_absolute_deviation(&values).unwrap(), 1.0);
    }

    #[test]
    fn bounds_iqr() {
        let bounds =
            Bounds::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0], OutlierMethod::Iqr, 1.5).unwrap();
        assert_relative_eq!(bounds.lower, -1.0);
        assert_relative_eq!(bounds.upper, 7.0);
        assert!(bounds.contains(7.0));
        assert!(!bounds.contains(7.1));
    }

    #[test]
    fn bounds_sigma() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let bounds = Bounds::from_values(&values, OutlierMethod::Sigma, 3.0).unwrap();
        assert_relative_eq!(bounds.lower, -1.0);
        assert_relative_eq!(bounds.upper, 11.0);
    }

    #[test]
    fn bounds_mad_fallback() {
        let values = [1.0, 1.0, 1.0, 1.0, 3.0];
        let bounds = Bounds::from_values(&values, OutlierMethod::Mad, 3.0).unwrap();
        let spread = 0.8 * MAD_FALLBACK_SCALE;
        assert_relative_eq!(bounds.lower, 1.0 - 3.0 * spread, epsilon = 1e-12);
        assert_relative_eq!(bounds.upper, 1.0 + 3.0 * spread, epsilon = 1e-12);
    }

    #[test]
    fn pooled_masking() {
        // a single extreme value among three inflates the pooled spread
        let values = [600.0, 600.0, 60000.0];
        let flags = detect_outliers(&values, OutlierMethod::Iqr, 1.5, Fences::Pooled);
        assert_eq!(flags, vec![false, false, false]);
    }

    #[test]
    fn leave_one_out() {
        let values = [600.0, 601.0, 60000.0];
        let flags = detect_outliers(&values, OutlierMethod::Iqr, 1.5, Fences::LeaveOneOut);
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn identical_values_no_outliers() {
        let values = [5.0; 6];
        for method in [OutlierMethod::Iqr, OutlierMethod::Sigma, OutlierMethod::Mad] {
            for fences in [Fences::Pooled, Fences::LeaveOneOut] {
                let flags = detect_outliers(&values, method, 1.5, fences);
                assert!(flags.iter().all(|&f| !f));
            }
        }
    }

    #[test]
    fn pooled_large_group() {
        let values = [1.0, 1.1, 0.9, 1.05, 0.95, 1.02, 8.0];
        let flags = detect_outliers(&values, OutlierMethod::Iqr, 1.5, Fences::Pooled);
        assert_eq!(flags, vec![false, false, false, false, false, false, true]);

        let flags = detect_outliers(&values, OutlierMethod::Mad, 3.0, Fences::Pooled);
        assert_eq!(flags, vec![false, false, false, false, false, false, true]);
    }

    #[test]
    fn detect_empty() {
        assert!(detect_outliers(&[], OutlierMethod::Iqr, 1.5, Fences::Pooled).is_empty());
        assert!(detect_outliers(&[], OutlierMethod::Iqr, 1.5, Fences::LeaveOneOut).is_empty());
        assert_eq!(
            detect_outliers(&[1.0], OutlierMethod::Iqr, 1.5, Fences::LeaveOneOut),
            vec![false]
        );
    }
}

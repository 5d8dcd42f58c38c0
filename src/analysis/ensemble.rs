// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Ensemble-average-then-fit estimation of transport coefficients.
//!
//! Independent runs of the same system are aligned on a common time axis,
//! runs with outlying behavior are optionally discarded, the remaining runs are averaged
//! and a straight line is fitted to the averaged curve within the fit range.
//! The slope of the line is converted into the coefficient.

use std::ops::Range;

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use thiserror::Error;

use crate::errors::ConfigError;
use crate::input::{FitRange, OutlierRejection, RunStatistic};

use super::regression::LinearFit;
use super::series::{common_axis, TimeSeries};
use super::statistics::{detect_outliers, mean, sample_std};

/// Converts the slope of an MSD curve (Å^2/ps) into a diffusion coefficient (cm^2/s) in three dimensions.
pub const MSD_TO_DIFFUSION: f64 = 1e-4 / 6.0;

/// Reason why no estimate could be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MissingData {
    #[error("no runs available")]
    NoRuns,
    #[error("the runs do not overlap in time")]
    NoOverlap,
    #[error("all runs have been rejected as outliers")]
    AllRejected,
    #[error("only {found} points in the fit range ({required} required)")]
    InsufficientPoints { found: usize, required: usize },
    #[error("the line could not be fitted")]
    DegenerateFit,
}

/// Estimator of a coefficient from the slope of an ensemble-averaged curve.
#[derive(Debug, Clone, Builder, Getters, CopyGetters)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct EnsembleEstimator {
    /// Part of the common time axis used for fitting.
    #[getset(get_copy = "pub")]
    fit_range: FitRange,
    /// Minimal number of points of the common time axis inside the fit range.
    /// If not specified, the default value is 10.
    #[builder(default = "10")]
    #[getset(get_copy = "pub")]
    min_points: usize,
    /// Number of points of the common time axis.
    /// If not specified, the default value is 500.
    #[builder(default = "500")]
    #[getset(get_copy = "pub")]
    resample_points: usize,
    /// Rejection of outlier runs. If not specified, all runs are used.
    #[builder(setter(strip_option), default)]
    #[getset(get = "pub")]
    rejection: Option<OutlierRejection>,
    /// Factor converting the fitted slope into the coefficient.
    /// If not specified, the slope of an MSD curve in Å^2/ps is converted to D in cm^2/s.
    #[builder(default = "MSD_TO_DIFFUSION")]
    #[getset(get_copy = "pub")]
    conversion: f64,
}

/// Ensemble-averaged curve and the coefficient estimated from it.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct EnsembleFit {
    /// Common time axis.
    #[getset(get = "pub")]
    axis: Vec<f64>,
    /// Element-wise mean of the kept runs.
    #[getset(get = "pub")]
    mean: Vec<f64>,
    /// Element-wise sample standard deviation of the kept runs (zeros for a single run).
    #[getset(get = "pub")]
    std: Vec<f64>,
    /// Indices of the input runs that were used.
    #[getset(get = "pub")]
    kept: Vec<usize>,
    /// Indices of the input runs rejected as outliers.
    #[getset(get = "pub")]
    rejected: Vec<usize>,
    /// Indices of the common time axis used for fitting.
    #[getset(get = "pub")]
    fit_indices: Range<usize>,
    /// Line fitted to the averaged curve.
    #[getset(get_copy = "pub")]
    fit: LinearFit,
    /// Estimated coefficient.
    #[getset(get_copy = "pub")]
    coefficient: f64,
    /// Standard error of the estimated coefficient.
    #[getset(get_copy = "pub")]
    coefficient_error: f64,
}

impl EnsembleFit {
    /// Number of runs used for the estimate.
    #[inline(always)]
    pub fn n_runs(&self) -> usize {
        self.kept.len()
    }

    /// Time interval actually covered by the fit.
    pub fn fit_interval(&self) -> (f64, f64) {
        (
            self.axis[self.fit_indices.start],
            self.axis[self.fit_indices.end - 1],
        )
    }
}

impl EnsembleEstimator {
    pub fn new() -> EnsembleEstimatorBuilder {
        EnsembleEstimatorBuilder::default()
    }

    /// Estimate the coefficient from a set of independent runs.
    ///
    /// Never fails because of the content of the data: if the estimate cannot be produced,
    /// the reason is returned instead.
    pub fn estimate(&self, runs: &[TimeSeries]) -> Result<EnsembleFit, MissingData> {
        if runs.is_empty() {
            return Err(MissingData::NoRuns);
        }

        let axis = common_axis(runs, self.resample_points).ok_or(MissingData::NoOverlap)?;
        let aligned: Vec<Vec<f64>> = runs.iter().map(|run| run.resample(&axis)).collect();
        let fit_indices = self.fit_range.select(&axis);

        let flags = self.reject(runs, &aligned, &axis, &fit_indices);
        let (kept, rejected): (Vec<usize>, Vec<usize>) =
            (0..runs.len()).partition(|&i| !flags[i]);

        if kept.is_empty() {
            return Err(MissingData::AllRejected);
        }

        let (mean_curve, std_curve) = average(&aligned, &kept);

        if fit_indices.len() < self.min_points {
            return Err(MissingData::InsufficientPoints {
                found: fit_indices.len(),
                required: self.min_points,
            });
        }

        let fit = LinearFit::fit(&axis[fit_indices.clone()], &mean_curve[fit_indices.clone()])
            .ok_or(MissingData::DegenerateFit)?;

        Ok(EnsembleFit {
            coefficient: fit.slope() * self.conversion,
            coefficient_error: fit.slope_stderr() * self.conversion,
            axis,
            mean: mean_curve,
            std: std_curve,
            kept,
            rejected,
            fit_indices,
            fit,
        })
    }

    /// Flag runs that should be rejected as outliers.
    /// Runs for which the summary statistic is not available are never rejected.
    fn reject(
        &self,
        runs: &[TimeSeries],
        aligned: &[Vec<f64>],
        axis: &[f64],
        fit_indices: &Range<usize>,
    ) -> Vec<bool> {
        let mut flags = vec![false; runs.len()];

        let Some(rejection) = &self.rejection else {
            return flags;
        };

        let statistics: Vec<(usize, f64)> = runs
            .iter()
            .zip(aligned.iter())
            .enumerate()
            .filter_map(|(i, (run, values))| {
                let value = match rejection.statistic() {
                    RunStatistic::FinalValue => values.last().copied(),
                    RunStatistic::Slope => LinearFit::fit(
                        &axis[fit_indices.clone()],
                        &values[fit_indices.clone()],
                    )
                    .map(|fit| fit.slope()),
                    RunStatistic::Reported => run.reported(),
                }?;

                value.is_finite().then_some((i, value))
            })
            .collect();

        if statistics.len() < rejection.min_runs() {
            log::debug!(
                "Outlier rejection skipped: {} runs with a {} available ({} required).",
                statistics.len(),
                rejection.statistic(),
                rejection.min_runs()
            );
            return flags;
        }

        let values: Vec<f64> = statistics.iter().map(|&(_, v)| v).collect();
        let outliers = detect_outliers(
            &values,
            rejection.method(),
            rejection.multiplier(),
            rejection.fences(),
        );

        for (&(index, _), outlier) in statistics.iter().zip(outliers) {
            flags[index] = outlier;
        }

        flags
    }
}

/// Element-wise mean and sample standard deviation of the selected curves.
fn average(aligned: &[Vec<f64>], selected: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let n_points = aligned.first().map(|x| x.len()).unwrap_or(0);
    let mut mean_curve = Vec::with_capacity(n_points);
    let mut std_curve = Vec::with_capacity(n_points);

    let mut column = Vec::with_capacity(selected.len());
    for j in 0..n_points {
        column.clear();
        column.extend(selected.iter().map(|&i| aligned[i][j]));

        mean_curve.push(mean(&column).unwrap_or(f64::NAN));
        std_curve.push(sample_std(&column).unwrap_or(0.0));
    }

    (mean_curve, std_curve)
}

impl EnsembleEstimatorBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(range) = self.fit_range {
            range.validate().map_err(|e| e.to_string())?;
        }

        if let Some(min_points) = self.min_points {
            if min_points < 2 {
                return Err(ConfigError::InvalidMinPoints(min_points).to_string());
            }
        }

        if let Some(points) = self.resample_points {
            if points < 2 {
                return Err(ConfigError::InvalidResample(points).to_string());
            }
        }

        if let Some(Some(rejection)) = &self.rejection {
            rejection.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::{Fences, OutlierMethod};

    /// Linear MSD curve in Å^2 corresponding to diffusion coefficient `d` (cm^2/s).
    fn linear_run(d: f64, end: f64, dt: f64) -> TimeSeries {
        let slope = d / MSD_TO_DIFFUSION;
        let n = (end / dt).round() as usize + 1;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let values = time.iter().map(|t| slope * t).collect();
        TimeSeries::new(time, values)
    }

    fn estimator(rejection: Option<OutlierRejection>) -> EnsembleEstimator {
        let mut builder = EnsembleEstimator::new();
        builder.fit_range(FitRange::time(100.0, 900.0));
        if let Some(r) = rejection {
            builder.rejection(r);
        }
        builder.build().unwrap()
    }

    #[test]
    fn identical_runs() {
        let run = linear_run(1e-5, 1000.0, 2.0);
        let single = estimator(None).estimate(&[run.clone()]).unwrap();
        let triple = estimator(None)
            .estimate(&[run.clone(), run.clone(), run])
            .unwrap();

        assert!(triple.std().iter().all(|&s| s == 0.0));
        assert!(single.std().iter().all(|&s| s == 0.0));
        assert_relative_eq!(triple.coefficient(), single.coefficient(), epsilon = 1e-15);
        assert_relative_eq!(triple.fit().intercept(), single.fit().intercept(), epsilon = 1e-9);
        assert_eq!(triple.n_runs(), 3);
        assert!(triple.rejected().is_empty());
    }

    #[test]
    fn recovers_coefficient() {
        let run = linear_run(2.5e-5, 1000.0, 1.0);
        let fit = estimator(None).estimate(&[run]).unwrap();
        assert_relative_eq!(fit.coefficient(), 2.5e-5, max_relative = 1e-9);
        assert_relative_eq!(fit.fit().r_squared(), 1.0, epsilon = 1e-9);

        let (begin, end) = fit.fit_interval();
        assert!(begin >= 100.0);
        assert!(end <= 900.0);
    }

    #[test]
    fn rejects_outlier() {
        let runs = [
            linear_run(1e-5, 1000.0, 2.0),
            linear_run(1.2e-5, 1000.0, 2.0),
            linear_run(1e-3, 1000.0, 2.0),
        ];

        let fit = estimator(Some(OutlierRejection::default()))
            .estimate(&runs)
            .unwrap();
        assert_eq!(fit.rejected(), &vec![2]);
        assert_eq!(fit.kept(), &vec![0, 1]);
        assert_relative_eq!(fit.coefficient(), 1.1e-5, max_relative = 1e-9);

        // the averaged curve equals the mean of the two kept runs
        let expected = estimator(None).estimate(&runs[..2]).unwrap();
        for (a, b) in fit.mean().iter().zip(expected.mean().iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn rejection_by_slope() {
        let runs = [
            linear_run(1e-5, 1000.0, 2.0),
            linear_run(1.1e-5, 1000.0, 2.0),
            linear_run(0.9e-5, 1000.0, 2.0),
            linear_run(5e-4, 1000.0, 2.0),
        ];

        let rejection = OutlierRejection::new()
            .statistic(RunStatistic::Slope)
            .method(OutlierMethod::Mad)
            .build()
            .unwrap();

        let fit = estimator(Some(rejection)).estimate(&runs).unwrap();
        assert_eq!(fit.rejected(), &vec![3]);
        assert_relative_eq!(fit.coefficient(), 1e-5, max_relative = 1e-9);
    }

    #[test]
    fn rejection_reported_missing() {
        // runs carry no reported coefficient, so nothing can be rejected
        let runs = [
            linear_run(1e-5, 1000.0, 2.0),
            linear_run(1e-5, 1000.0, 2.0),
            linear_run(1e-3, 1000.0, 2.0),
        ];

        let rejection = OutlierRejection::new()
            .statistic(RunStatistic::Reported)
            .build()
            .unwrap();

        let fit = estimator(Some(rejection)).estimate(&runs).unwrap();
        assert!(fit.rejected().is_empty());
    }

    #[test]
    fn rejection_too_few_runs() {
        let runs = [linear_run(1e-5, 1000.0, 2.0), linear_run(1e-3, 1000.0, 2.0)];
        let rejection = OutlierRejection::new()
            .fences(Fences::Pooled)
            .min_runs(3)
            .build()
            .unwrap();

        let fit = estimator(Some(rejection)).estimate(&runs).unwrap();
        assert_eq!(fit.n_runs(), 2);
    }

    #[test]
    fn insufficient_points() {
        let run = linear_run(1e-5, 1000.0, 2.0);
        let estimator = EnsembleEstimator::new()
            .fit_range(FitRange::time(100.0, 101.0))
            .build()
            .unwrap();

        assert!(matches!(
            estimator.estimate(&[run]),
            Err(MissingData::InsufficientPoints { required: 10, .. })
        ));
    }

    #[test]
    fn fit_range_outside_data() {
        let run = linear_run(1e-5, 50.0, 1.0);
        assert!(matches!(
            estimator(None).estimate(&[run]),
            Err(MissingData::InsufficientPoints { found: 0, .. })
        ));
    }

    #[test]
    fn no_runs() {
        assert_eq!(estimator(None).estimate(&[]).unwrap_err(), MissingData::NoRuns);
    }

    #[test]
    fn no_overlap() {
        let a = TimeSeries::new(vec![0.0, 10.0], vec![0.0, 1.0]);
        let b = TimeSeries::new(vec![20.0, 30.0], vec![0.0, 1.0]);
        assert_eq!(
            estimator(None).estimate(&[a, b]).unwrap_err(),
            MissingData::NoOverlap
        );
    }

    #[test]
    fn overlap_of_different_lengths() {
        let long = linear_run(1e-5, 2000.0, 2.0);
        let short = linear_run(1e-5, 1000.0, 5.0);
        let fit = estimator(None).estimate(&[long, short]).unwrap();

        assert_relative_eq!(fit.axis()[0], 0.0);
        assert_relative_eq!(*fit.axis().last().unwrap(), 1000.0);
        assert_relative_eq!(fit.coefficient(), 1e-5, max_relative = 1e-9);
    }

    #[test]
    fn fraction_range() {
        let run = linear_run(3e-5, 1000.0, 1.0);
        let estimator = EnsembleEstimator::new()
            .fit_range(FitRange::fraction(0.1, 0.9))
            .resample_points(100)
            .build()
            .unwrap();

        let fit = estimator.estimate(&[run]).unwrap();
        assert_eq!(fit.fit_indices(), &(10..90));
        assert_relative_eq!(fit.coefficient(), 3e-5, max_relative = 1e-9);
    }

    #[test]
    fn invalid_estimator() {
        assert!(EnsembleEstimator::new()
            .fit_range(FitRange::time(500.0, 100.0))
            .build()
            .is_err());
        assert!(EnsembleEstimator::new()
            .fit_range(FitRange::time(100.0, 500.0))
            .min_points(1)
            .build()
            .is_err());
        assert!(EnsembleEstimator::new()
            .fit_range(FitRange::time(100.0, 500.0))
            .resample_points(1)
            .build()
            .is_err());
        assert!(EnsembleEstimator::new().build().is_err());
    }
}

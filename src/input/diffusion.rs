// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `DiffusionParams` structure.

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use serde::Deserialize;

use crate::analysis::ensemble::{EnsembleEstimator, MSD_TO_DIFFUSION};
use crate::errors::ConfigError;
use crate::PANIC_MESSAGE;

use super::{FitRange, OutlierRejection};

/// Parameters of the calculation of ensemble diffusion coefficients from msd curves.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct DiffusionParams {
    /// Directories to search (recursively) for msd files.
    #[builder(setter(custom))]
    #[serde(alias = "input", alias = "directories")]
    #[getset(get = "pub")]
    inputs: Vec<String>,
    /// Pattern of names of the msd files.
    /// If not specified, the default value is '*_msd_*.xvg'.
    #[builder(setter(into), default = "default_pattern()")]
    #[serde(default = "default_pattern")]
    #[getset(get = "pub")]
    pattern: String,
    /// Path to a csv file listing runs to exclude (output of the quality screening).
    /// If not specified, no run is excluded.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    outliers: Option<String>,
    /// Part of the msd curve used for fitting.
    /// If not specified, times from 50 to 500 ps are used.
    #[builder(default = "default_fit_range()")]
    #[serde(default = "default_fit_range")]
    #[getset(get_copy = "pub")]
    fit_range: FitRange,
    /// Minimal number of points inside the fit range.
    /// If not specified, the default value is 10.
    #[builder(default = "10")]
    #[serde(default = "default_min_points")]
    #[getset(get_copy = "pub")]
    min_points: usize,
    /// Number of points of the common time axis of the runs.
    /// If not specified, the default value is 500.
    #[builder(default = "500")]
    #[serde(default = "default_resample_points")]
    #[getset(get_copy = "pub")]
    resample_points: usize,
    /// Fits with a coefficient of determination below this value are reported as poor.
    /// If not specified, the default value is 0.95.
    #[builder(default = "0.95")]
    #[serde(default = "default_r2_threshold", alias = "r2")]
    #[getset(get_copy = "pub")]
    r2_threshold: f64,
    /// Factor applied to the msd values when reading them.
    /// If not specified, the default value is 100 (conversion from nm^2 to Å^2).
    #[builder(default = "100.0")]
    #[serde(default = "default_msd_scale")]
    #[getset(get_copy = "pub")]
    msd_scale: f64,
    /// Rejection of outlier runs inside each ensemble.
    /// If not specified, all runs are used.
    #[builder(setter(strip_option), default)]
    #[getset(get = "pub")]
    rejection: Option<OutlierRejection>,
    /// Write the ensemble-averaged msd curves into xvg files.
    #[builder(default = "false")]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    write_curves: bool,
}

fn default_pattern() -> String {
    String::from("*_msd_*.xvg")
}

fn default_fit_range() -> FitRange {
    FitRange::time(50.0, 500.0)
}

fn default_min_points() -> usize {
    10
}

fn default_resample_points() -> usize {
    500
}

fn default_r2_threshold() -> f64 {
    0.95
}

fn default_msd_scale() -> f64 {
    100.0
}

pub(super) fn validate_inputs(inputs: &[String]) -> Result<(), ConfigError> {
    if inputs.is_empty() {
        Err(ConfigError::NoInputs)
    } else {
        Ok(())
    }
}

pub(super) fn validate_min_points(min_points: usize) -> Result<(), ConfigError> {
    if min_points < 2 {
        Err(ConfigError::InvalidMinPoints(min_points))
    } else {
        Ok(())
    }
}

fn validate_resample_points(points: usize) -> Result<(), ConfigError> {
    if points < 2 {
        Err(ConfigError::InvalidResample(points))
    } else {
        Ok(())
    }
}

fn validate_r2_threshold(threshold: f64) -> Result<(), ConfigError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidR2Threshold(threshold))
    }
}

pub(super) fn validate_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidPositive(name.to_owned(), value))
    }
}

impl DiffusionParams {
    pub fn new() -> DiffusionParamsBuilder {
        DiffusionParamsBuilder::default()
    }

    /// Check that the parameters are valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_inputs(&self.inputs)?;
        self.fit_range.validate()?;
        validate_min_points(self.min_points)?;
        validate_resample_points(self.resample_points)?;
        validate_positive("msd_scale", self.msd_scale)?;
        validate_r2_threshold(self.r2_threshold)?;

        if let Some(rejection) = &self.rejection {
            rejection.validate()?;
        }

        Ok(())
    }

    /// Construct the estimator of diffusion coefficients.
    pub(crate) fn estimator(&self, no_filter: bool) -> EnsembleEstimator {
        let mut builder = EnsembleEstimator::new();
        builder
            .fit_range(self.fit_range)
            .min_points(self.min_points)
            .resample_points(self.resample_points)
            .conversion(MSD_TO_DIFFUSION);

        if let (Some(rejection), false) = (&self.rejection, no_filter) {
            builder.rejection(rejection.clone());
        }

        builder.build().expect(PANIC_MESSAGE)
    }
}

impl DiffusionParamsBuilder {
    /// Add a directory to search for msd files.
    pub fn input(&mut self, directory: &str) -> &mut Self {
        self.inputs
            .get_or_insert_with(Vec::new)
            .push(directory.to_owned());
        self
    }

    /// Set all directories to search for msd files.
    pub fn inputs(&mut self, directories: &[&str]) -> &mut Self {
        self.inputs = Some(directories.iter().map(|x| (*x).to_owned()).collect());
        self
    }

    fn validate(&self) -> Result<(), String> {
        match &self.inputs {
            Some(inputs) => validate_inputs(inputs).map_err(|e| e.to_string())?,
            None => return Err(ConfigError::NoInputs.to_string()),
        }

        if let Some(range) = self.fit_range {
            range.validate().map_err(|e| e.to_string())?;
        }

        if let Some(min_points) = self.min_points {
            validate_min_points(min_points).map_err(|e| e.to_string())?;
        }

        if let Some(points) = self.resample_points {
            validate_resample_points(points).map_err(|e| e.to_string())?;
        }

        if let Some(scale) = self.msd_scale {
            validate_positive("msd_scale", scale).map_err(|e| e.to_string())?;
        }

        if let Some(threshold) = self.r2_threshold {
            validate_r2_threshold(threshold).map_err(|e| e.to_string())?;
        }

        if let Some(Some(rejection)) = &self.rejection {
            rejection.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

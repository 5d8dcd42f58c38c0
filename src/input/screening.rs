// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `ScreeningParams` structure.

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use serde::Deserialize;

use crate::errors::ConfigError;
use crate::PANIC_MESSAGE;

use super::diffusion::{validate_inputs, validate_min_points, validate_positive};
use super::{FitRange, OutlierRejection, RunStatistic};

/// Parameters of the quality screening of individual runs.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ScreeningParams {
    /// Directories to search (recursively) for msd files.
    #[builder(setter(custom))]
    #[serde(alias = "input", alias = "directories")]
    #[getset(get = "pub")]
    inputs: Vec<String>,
    /// Pattern of names of the msd files.
    /// If not specified, the default value is '*_msd_*.xvg'.
    #[builder(setter(into), default = "String::from(\"*_msd_*.xvg\")")]
    #[serde(default = "default_pattern")]
    #[getset(get = "pub")]
    pattern: String,
    /// Identification of outlier runs within each group of runs
    /// (same composition, temperature and element).
    /// If not specified, IQR with multiplier 1.5 is applied to the reported coefficients
    /// of groups with at least 3 runs.
    #[builder(default = "default_rejection()")]
    #[serde(default = "default_rejection")]
    #[getset(get = "pub")]
    rejection: OutlierRejection,
    /// Part of each msd curve fitted to obtain the coefficient of the run.
    /// If not specified, the samples between 10 % and 90 % of the curve are used.
    #[builder(default = "FitRange::fraction(0.1, 0.9)")]
    #[serde(default = "default_fit_range")]
    #[getset(get_copy = "pub")]
    fit_range: FitRange,
    /// Minimal number of points of the fit of a single run.
    /// If not specified, the default value is 3.
    #[builder(default = "3")]
    #[serde(default = "default_min_points")]
    #[getset(get_copy = "pub")]
    min_points: usize,
    /// Factor applied to the msd values when reading them.
    /// If not specified, the default value is 100 (conversion from nm^2 to Å^2).
    #[builder(default = "100.0")]
    #[serde(default = "default_msd_scale")]
    #[getset(get_copy = "pub")]
    msd_scale: f64,
    /// Runs with a fitted intercept above this value (in Å^2) are flagged.
    /// If not specified, the default value is 10 Å^2.
    #[builder(default = "10.0")]
    #[serde(default = "default_intercept_max")]
    #[getset(get_copy = "pub")]
    intercept_max: f64,
    /// Runs with a fitted diffusion coefficient of at least this value (in cm^2/s) are flagged.
    /// If not specified, the default value is 5e-5 cm^2/s.
    #[builder(default = "5e-5")]
    #[serde(default = "default_d_max")]
    #[getset(get_copy = "pub")]
    d_max: f64,
    /// If any element of a simulation is flagged, flag all elements of the simulation.
    /// If not specified, the default value is `true`.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    #[getset(get_copy = "pub")]
    propagate: bool,
}

fn default_pattern() -> String {
    String::from("*_msd_*.xvg")
}

fn default_rejection() -> OutlierRejection {
    OutlierRejection::new()
        .statistic(RunStatistic::Reported)
        .build()
        .expect(PANIC_MESSAGE)
}

fn default_fit_range() -> FitRange {
    FitRange::fraction(0.1, 0.9)
}

fn default_min_points() -> usize {
    3
}

fn default_msd_scale() -> f64 {
    100.0
}

fn default_intercept_max() -> f64 {
    10.0
}

fn default_d_max() -> f64 {
    5e-5
}

fn default_true() -> bool {
    true
}

impl ScreeningParams {
    pub fn new() -> ScreeningParamsBuilder {
        ScreeningParamsBuilder::default()
    }

    /// Check that the parameters are valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_inputs(&self.inputs)?;
        self.rejection.validate()?;
        self.fit_range.validate()?;
        validate_min_points(self.min_points)?;
        validate_positive("msd_scale", self.msd_scale)?;
        validate_positive("intercept_max", self.intercept_max)?;
        validate_positive("d_max", self.d_max)?;
        Ok(())
    }
}

impl ScreeningParamsBuilder {
    /// Add a directory to search for msd files.
    pub fn input(&mut self, directory: &str) -> &mut Self {
        self.inputs
            .get_or_insert_with(Vec::new)
            .push(directory.to_owned());
        self
    }

    fn validate(&self) -> Result<(), String> {
        match &self.inputs {
            Some(inputs) => validate_inputs(inputs).map_err(|e| e.to_string())?,
            None => return Err(ConfigError::NoInputs.to_string()),
        }

        if let Some(rejection) = &self.rejection {
            rejection.validate().map_err(|e| e.to_string())?;
        }

        if let Some(range) = self.fit_range {
            range.validate().map_err(|e| e.to_string())?;
        }

        if let Some(min_points) = self.min_points {
            validate_min_points(min_points).map_err(|e| e.to_string())?;
        }

        for (name, value) in [
            ("msd_scale", self.msd_scale),
            ("intercept_max", self.intercept_max),
            ("d_max", self.d_max),
        ] {
            if let Some(value) = value {
                validate_positive(name, value).map_err(|e| e.to_string())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::OutlierMethod;

    #[test]
    fn defaults() {
        let params = ScreeningParams::new().input("data").build().unwrap();
        assert_eq!(params.rejection().method(), OutlierMethod::Iqr);
        assert_eq!(params.rejection().statistic(), RunStatistic::Reported);
        assert_relative_eq!(params.rejection().multiplier(), 1.5);
        assert_eq!(params.rejection().min_runs(), 3);
        assert_eq!(params.fit_range(), FitRange::fraction(0.1, 0.9));
        assert_eq!(params.min_points(), 3);
        assert_relative_eq!(params.intercept_max(), 10.0);
        assert_relative_eq!(params.d_max(), 5e-5);
        assert!(params.propagate());
    }

    #[test]
    fn invalid() {
        assert!(ScreeningParams::new().build().is_err());
        assert!(ScreeningParams::new()
            .input("data")
            .d_max(-1.0)
            .build()
            .is_err());
    }

    #[test]
    fn yaml() {
        let params: ScreeningParams = serde_yaml::from_str(
            "inputs: [gromacs]\nrejection:\n  method: MAD\n  statistic: slope\npropagate: false\n",
        )
        .unwrap();
        params.validate().unwrap();
        assert_eq!(params.rejection().method(), OutlierMethod::Mad);
        assert_eq!(params.rejection().statistic(), RunStatistic::Slope);
        assert!(!params.propagate());
        assert_eq!(params.pattern(), "*_msd_*.xvg");
    }
}

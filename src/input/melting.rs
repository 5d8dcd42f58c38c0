// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `MeltingParams` structure.

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use serde::Deserialize;

use crate::errors::ConfigError;

use super::diffusion::validate_positive;

/// Parameters of the estimation of melting temperatures from Lindemann indices.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct MeltingParams {
    /// Glob patterns of the csv tables with Lindemann indices.
    /// If not specified, the default value is 'lindemann_master_run_*.csv'.
    #[builder(default = "vec![String::from(\"lindemann_master_run_*.csv\")]")]
    #[serde(default = "default_lindemann")]
    #[getset(get = "pub")]
    lindemann: Vec<String>,
    /// Path to a csv file listing runs to exclude (output of the quality screening).
    /// If not specified, no run is excluded.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    outliers: Option<String>,
    /// Lindemann index marking the onset of melting.
    /// If not specified, the default value is 0.1.
    #[builder(default = "0.1")]
    #[serde(default = "default_threshold")]
    #[getset(get_copy = "pub")]
    threshold: f64,
    /// Steepest increase of the smoothed Lindemann index (in 1/K) that still counts as no transition.
    /// If not specified, the default value is 1e-4 1/K.
    #[builder(default = "1e-4")]
    #[serde(default = "default_min_slope")]
    #[getset(get_copy = "pub")]
    min_slope: f64,
    /// Width (in temperature steps) of the Gaussian kernel smoothing the Lindemann curve.
    /// If not specified, the default value is 1.
    #[builder(default = "1.0")]
    #[serde(default = "default_sigma", alias = "sigma")]
    #[getset(get_copy = "pub")]
    smoothing_sigma: f64,
    /// Estimate melting temperature also by clustering the runs into two groups.
    /// If not specified, the default value is `true`.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    #[getset(get_copy = "pub")]
    clustering: bool,
}

fn default_lindemann() -> Vec<String> {
    vec![String::from("lindemann_master_run_*.csv")]
}

fn default_threshold() -> f64 {
    0.1
}

fn default_min_slope() -> f64 {
    1e-4
}

fn default_sigma() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl MeltingParams {
    pub fn new() -> MeltingParamsBuilder {
        MeltingParamsBuilder::default()
    }

    /// Check that the parameters are valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_positive("threshold", self.threshold)?;
        validate_positive("min_slope", self.min_slope)?;
        validate_positive("smoothing_sigma", self.smoothing_sigma)?;
        Ok(())
    }
}

impl MeltingParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("threshold", self.threshold),
            ("min_slope", self.min_slope),
            ("smoothing_sigma", self.smoothing_sigma),
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

    #[test]
    fn defaults() {
        let params = MeltingParams::new().build().unwrap();
        assert_eq!(params.lindemann(), &vec![String::from("lindemann_master_run_*.csv")]);
        assert!(params.outliers().is_none());
        assert_relative_eq!(params.threshold(), 0.1);
        assert_relative_eq!(params.min_slope(), 1e-4);
        assert_relative_eq!(params.smoothing_sigma(), 1.0);
        assert!(params.clustering());
    }

    #[test]
    fn invalid() {
        assert!(MeltingParams::new().threshold(0.0).build().is_err());
        assert!(MeltingParams::new().smoothing_sigma(-1.0).build().is_err());
    }

    #[test]
    fn yaml() {
        let params: MeltingParams =
            serde_yaml::from_str("lindemann: [\"data/*.csv\"]\nsigma: 1.5\nclustering: false\n")
                .unwrap();
        params.validate().unwrap();
        assert_relative_eq!(params.smoothing_sigma(), 1.5);
        assert!(!params.clustering());
    }
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `HeatCapacityParams` structure and the `Partitioning` enum.

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::errors::ConfigError;

use super::diffusion::{validate_min_points, validate_positive};

/// Method used to assign runs into phases (solid, pre-melting, liquid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Partitioning {
    /// Phases are assigned by comparing the Lindemann index with fixed thresholds.
    #[default]
    #[serde(alias = "thresholds")]
    Thresholds,
    /// Phases are identified by k-means clustering of standardized (temperature, Lindemann index) pairs.
    /// Clusters are ordered by their mean Lindemann index.
    #[serde(alias = "kmeans", alias = "k_means")]
    KMeans { n_clusters: usize },
}

/// Parameters of the calculation of regional heat capacities.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct HeatCapacityParams {
    /// Path to the csv table with average energies of the cluster runs.
    #[builder(setter(into))]
    #[getset(get = "pub")]
    energy: String,
    /// Path to the csv table with average energies of the bare support.
    /// If not specified, support runs are looked up in the `energy` table.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    support_energy: Option<String>,
    /// Regular expression identifying structures of the bare support.
    /// If not specified, the default value is 'sup-1|sup-2'.
    #[builder(setter(into), default = "String::from(\"sup-1|sup-2\")")]
    #[serde(default = "default_support_pattern")]
    #[getset(get = "pub")]
    support_pattern: String,
    /// Heat capacity of the support (in meV/K) used when it cannot be calculated.
    /// If not specified, the default value is 38.2151 meV/K.
    #[builder(default = "38.2151")]
    #[serde(default = "default_support_cv")]
    #[getset(get_copy = "pub")]
    support_cv: f64,
    /// Glob patterns of the csv tables with Lindemann indices.
    /// If not specified, the default value is 'lindemann_master_run_*.csv'.
    #[builder(default = "default_lindemann()")]
    #[serde(default = "default_lindemann")]
    #[getset(get = "pub")]
    lindemann: Vec<String>,
    /// Path to a csv file listing runs to exclude (output of the quality screening).
    /// If not specified, no run is excluded.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    outliers: Option<String>,
    /// Runs with a Lindemann index below this value are solid.
    /// If not specified, the default value is 0.1.
    #[builder(default = "0.1")]
    #[serde(default = "default_solid_threshold")]
    #[getset(get_copy = "pub")]
    solid_threshold: f64,
    /// Runs with a Lindemann index at or above this value are liquid.
    /// If not specified, the default value is 0.15.
    #[builder(default = "0.15")]
    #[serde(default = "default_melting_threshold")]
    #[getset(get_copy = "pub")]
    melting_threshold: f64,
    /// Assignment of runs into phases.
    /// If not specified, fixed thresholds are used.
    #[builder(default)]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    partitioning: Partitioning,
    /// Minimal number of runs of a phase required to fit its heat capacity.
    /// If not specified, the default value is 5.
    #[builder(default = "5")]
    #[serde(default = "default_min_points")]
    #[getset(get_copy = "pub")]
    min_points: usize,
    /// If specified, runs with outlying Lindemann index or energy are removed from each
    /// group of runs with the same structure and temperature. The value is the IQR multiplier
    /// used for energies; Lindemann indices always use 3.0.
    #[builder(setter(strip_option), default)]
    #[getset(get_copy = "pub")]
    iqr_factor: Option<f64>,
}

fn default_support_pattern() -> String {
    String::from("sup-1|sup-2")
}

fn default_support_cv() -> f64 {
    38.2151
}

fn default_lindemann() -> Vec<String> {
    vec![String::from("lindemann_master_run_*.csv")]
}

fn default_solid_threshold() -> f64 {
    0.1
}

fn default_melting_threshold() -> f64 {
    0.15
}

fn default_min_points() -> usize {
    5
}

pub(super) fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidRegex(pattern.to_owned(), e))
}

fn validate_thresholds(solid: f64, melting: f64) -> Result<(), ConfigError> {
    if solid.is_finite() && melting.is_finite() && solid > 0.0 && solid < melting {
        Ok(())
    } else {
        Err(ConfigError::InvalidThresholds(solid, melting))
    }
}

fn validate_partitioning(partitioning: Partitioning) -> Result<(), ConfigError> {
    match partitioning {
        Partitioning::KMeans { n_clusters } if !(2..=3).contains(&n_clusters) => {
            Err(ConfigError::InvalidClusters(n_clusters))
        }
        _ => Ok(()),
    }
}

impl HeatCapacityParams {
    pub fn new() -> HeatCapacityParamsBuilder {
        HeatCapacityParamsBuilder::default()
    }

    /// Check that the parameters are valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        compile_pattern(&self.support_pattern)?;
        validate_positive("support_cv", self.support_cv)?;
        validate_thresholds(self.solid_threshold, self.melting_threshold)?;
        validate_partitioning(self.partitioning)?;
        validate_min_points(self.min_points)?;
        if let Some(factor) = self.iqr_factor {
            validate_positive("iqr_factor", factor)?;
        }
        Ok(())
    }

    /// Compiled regular expression identifying the support structures.
    pub(crate) fn support_regex(&self) -> Result<Regex, ConfigError> {
        compile_pattern(&self.support_pattern)
    }
}

impl HeatCapacityParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(pattern) = &self.support_pattern {
            compile_pattern(pattern).map_err(|e| e.to_string())?;
        }

        if let Some(cv) = self.support_cv {
            validate_positive("support_cv", cv).map_err(|e| e.to_string())?;
        }

        let solid = self.solid_threshold.unwrap_or_else(default_solid_threshold);
        let melting = self
            .melting_threshold
            .unwrap_or_else(default_melting_threshold);
        validate_thresholds(solid, melting).map_err(|e| e.to_string())?;

        if let Some(partitioning) = self.partitioning {
            validate_partitioning(partitioning).map_err(|e| e.to_string())?;
        }

        if let Some(min_points) = self.min_points {
            validate_min_points(min_points).map_err(|e| e.to_string())?;
        }

        if let Some(Some(factor)) = self.iqr_factor {
            validate_positive("iqr_factor", factor).map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

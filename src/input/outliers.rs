// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `OutlierRejection` structure and related enums.

use derive_builder::Builder;
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::errors::ConfigError;

/// Statistical rule used to identify outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display)]
pub enum OutlierMethod {
    /// Values outside `[Q1 - k * IQR, Q3 + k * IQR]`.
    #[default]
    #[serde(alias = "iqr", alias = "IQR")]
    #[strum(serialize = "IQR")]
    Iqr,
    /// Values outside `mean ± k * sigma` (population standard deviation).
    #[serde(alias = "sigma", alias = "3sigma")]
    #[strum(serialize = "3sigma")]
    Sigma,
    /// Values outside `median ± k * MAD`.
    #[serde(alias = "mad", alias = "MAD")]
    #[strum(serialize = "MAD")]
    Mad,
}

impl OutlierMethod {
    /// Conventional multiplier for the method.
    pub fn default_multiplier(self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::Sigma | OutlierMethod::Mad => 3.0,
        }
    }
}

/// How the outlier fences are constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display)]
pub enum Fences {
    /// Fences are calculated once from all values of the group.
    #[serde(alias = "pooled")]
    #[strum(serialize = "pooled")]
    Pooled,
    /// Each value is tested against fences calculated from the other values of the group.
    /// Resistant to masking in small groups where a single extreme value inflates the spread.
    #[default]
    #[serde(alias = "leave_one_out", alias = "loo")]
    #[strum(serialize = "leave-one-out")]
    LeaveOneOut,
}

impl Fences {
    /// Smallest group size for which the fences are meaningful.
    pub fn min_runs(self) -> usize {
        match self {
            Fences::Pooled => 2,
            Fences::LeaveOneOut => 3,
        }
    }
}

/// Per-run summary statistic used to decide whether a run is an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, Display)]
pub enum RunStatistic {
    /// Last value of the run on the common time axis.
    #[default]
    #[serde(alias = "final", alias = "final_value")]
    #[strum(serialize = "final value")]
    FinalValue,
    /// Slope of the run fitted over the fit range.
    #[serde(alias = "slope")]
    #[strum(serialize = "slope")]
    Slope,
    /// Coefficient reported in the header of the input file.
    #[serde(alias = "reported")]
    #[strum(serialize = "reported coefficient")]
    Reported,
}

/// Parameters of the rejection of outlier runs from an ensemble.
#[derive(Debug, Clone, Builder, CopyGetters, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct OutlierRejection {
    /// Rule used to identify outliers.
    /// If not specified, the default value is 'OutlierMethod::Iqr'.
    #[builder(default)]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    method: OutlierMethod,
    /// Multiplier of the spread defining the fences.
    /// If not specified, the conventional multiplier of the method is used (1.5 for IQR, 3 otherwise).
    #[builder(setter(strip_option), default)]
    #[serde(default, alias = "k")]
    multiplier: Option<f64>,
    /// Minimal number of runs in a group for the rejection to be attempted.
    /// If not specified, the default value is 3.
    #[builder(default = "3")]
    #[serde(default = "default_min_runs")]
    #[getset(get_copy = "pub")]
    min_runs: usize,
    /// Summary statistic of each run tested for outliers.
    /// If not specified, the default value is 'RunStatistic::FinalValue'.
    #[builder(default)]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    statistic: RunStatistic,
    /// How the fences are constructed.
    /// If not specified, the default value is 'Fences::LeaveOneOut'.
    #[builder(default)]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    fences: Fences,
}

fn default_min_runs() -> usize {
    3
}

fn validate_multiplier(multiplier: Option<f64>) -> Result<(), ConfigError> {
    match multiplier {
        Some(k) if !k.is_finite() || k <= 0.0 => Err(ConfigError::InvalidMultiplier(k)),
        _ => Ok(()),
    }
}

fn validate_min_runs(min_runs: usize, fences: Fences) -> Result<(), ConfigError> {
    if min_runs < fences.min_runs() {
        Err(ConfigError::InvalidMinRuns(min_runs, fences.min_runs()))
    } else {
        Ok(())
    }
}

impl OutlierRejection {
    pub fn new() -> OutlierRejectionBuilder {
        OutlierRejectionBuilder::default()
    }

    /// Multiplier of the spread defining the fences.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
            .unwrap_or_else(|| self.method.default_multiplier())
    }

    /// Check that the parameters are valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        validate_multiplier(self.multiplier)?;
        validate_min_runs(self.min_runs, self.fences)?;
        Ok(())
    }
}

impl Default for OutlierRejection {
    fn default() -> Self {
        OutlierRejection {
            method: OutlierMethod::default(),
            multiplier: None,
            min_runs: default_min_runs(),
            statistic: RunStatistic::default(),
            fences: Fences::default(),
        }
    }
}

impl OutlierRejectionBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(multiplier) = self.multiplier {
            validate_multiplier(multiplier).map_err(|e| e.to_string())?;
        }

        let fences = self.fences.unwrap_or_default();
        validate_min_runs(self.min_runs.unwrap_or(default_min_runs()), fences)
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

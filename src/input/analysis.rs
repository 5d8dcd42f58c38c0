// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the main `Analysis` structure and its methods.

use std::fs::read_to_string;
use std::path::Path;

use colored::Colorize;
use derive_builder::Builder;
use getset::{CopyGetters, Getters, Setters};
use serde::Deserialize;

use crate::errors::ConfigError;

use super::{DiffusionParams, HeatCapacityParams, MeltingParams, ScreeningParams, SystemFilter};

/// Type of the analysis to perform.
#[derive(Debug, Clone, Deserialize)]
pub enum AnalysisType {
    /// Per-run quality screening producing a list of outlier runs.
    #[serde(alias = "screening")]
    Screening(ScreeningParams),
    /// Ensemble diffusion coefficients from msd curves.
    #[serde(alias = "diffusion")]
    Diffusion(DiffusionParams),
    /// Regional heat capacities from energies and Lindemann indices.
    #[serde(alias = "heat_capacity", alias = "cv")]
    HeatCapacity(HeatCapacityParams),
    /// Melting temperatures from Lindemann indices.
    #[serde(alias = "melting")]
    Melting(MeltingParams),
}

impl AnalysisType {
    pub fn name(&self) -> &str {
        match self {
            Self::Screening(_) => "quality screening of individual runs",
            Self::Diffusion(_) => "ensemble diffusion coefficients",
            Self::HeatCapacity(_) => "regional heat capacities",
            Self::Melting(_) => "melting temperatures",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Screening(params) => params.validate(),
            Self::Diffusion(params) => params.validate(),
            Self::HeatCapacity(params) => params.validate(),
            Self::Melting(params) => params.validate(),
        }
    }
}

impl From<ScreeningParams> for AnalysisType {
    fn from(value: ScreeningParams) -> Self {
        AnalysisType::Screening(value)
    }
}

impl From<DiffusionParams> for AnalysisType {
    fn from(value: DiffusionParams) -> Self {
        AnalysisType::Diffusion(value)
    }
}

impl From<HeatCapacityParams> for AnalysisType {
    fn from(value: HeatCapacityParams) -> Self {
        AnalysisType::HeatCapacity(value)
    }
}

impl From<MeltingParams> for AnalysisType {
    fn from(value: MeltingParams) -> Self {
        AnalysisType::Melting(value)
    }
}

/// Structure holding all the information necessary to perform the specified analysis.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Setters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Analysis {
    /// Type of the analysis to perform and its parameters.
    #[builder(setter(into))]
    #[serde(alias = "type", alias = "analysis")]
    #[getset(get = "pub")]
    analysis_type: AnalysisType,
    /// Directory where the output files will be written. Created if it does not exist.
    /// If not specified, the current working directory is used.
    #[builder(setter(into), default = "String::from(\".\")")]
    #[serde(default = "default_output_directory", alias = "output")]
    #[getset(get = "pub")]
    output_directory: String,
    /// Selection of the analyzed systems by their names.
    /// If not specified, all systems are analyzed.
    #[builder(default)]
    #[serde(default)]
    #[getset(get = "pub")]
    filter: SystemFilter,
    /// Be silent. Print nothing to the standard output during the analysis.
    #[builder(setter(custom), default = "false")]
    #[serde(default)]
    #[getset(get_copy = "pub", set = "pub")]
    silent: bool,
    /// Do not make backups. Overwrite all output files.
    #[builder(setter(custom), default = "false")]
    #[serde(default)]
    #[getset(get_copy = "pub", set = "pub")]
    overwrite: bool,
    /// Ignore the lists of outlier runs and do not reject any runs.
    #[builder(setter(custom), default = "false")]
    #[serde(default, alias = "nofilter")]
    #[getset(get_copy = "pub", set = "pub")]
    no_filter: bool,
}

fn default_output_directory() -> String {
    String::from(".")
}

impl Analysis {
    pub fn new() -> AnalysisBuilder {
        AnalysisBuilder::default()
    }

    /// Read the analysis from a yaml configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Analysis, ConfigError> {
        let name = path.as_ref().to_string_lossy().into_owned();
        let string =
            read_to_string(&path).map_err(|_| ConfigError::CouldNotOpenConfig(name.clone()))?;
        let analysis: Analysis = serde_yaml::from_str(&string)
            .map_err(|e| ConfigError::CouldNotParseConfig(name, e))?;

        analysis.validate()?;
        Ok(analysis)
    }

    /// Check that the Analysis structure is valid. Used after deserialization from config yaml file.
    fn validate(&self) -> Result<(), ConfigError> {
        self.analysis_type.validate()
    }

    /// Log basic information about the analysis.
    pub fn info(&self) {
        log::info!("Will calculate {}.", self.analysis_type.name().cyan());
        log::info!(
            "Output files will be written into '{}'.",
            self.output_directory.cyan()
        );

        if !self.filter.is_empty() {
            log::info!("Only systems selected by the system filter will be analyzed.");
        }

        if self.no_filter {
            log::info!("Outlier lists will be ignored and no runs will be rejected.");
        }

        match &self.analysis_type {
            AnalysisType::Screening(params) => log::info!(
                "Runs will be screened using {} (k = {}) on the {}.",
                params.rejection().method(),
                params.rejection().multiplier(),
                params.rejection().statistic()
            ),
            AnalysisType::Diffusion(params) => {
                log::info!(
                    "Ensemble msd curves will be fitted over {} (at least {} points).",
                    params.fit_range(),
                    params.min_points()
                );
                if let Some(rejection) = params.rejection() {
                    log::info!(
                        "Outlier runs will be rejected using {} (k = {}, {} fences) on the {}.",
                        rejection.method(),
                        rejection.multiplier(),
                        rejection.fences(),
                        rejection.statistic()
                    );
                }
            }
            AnalysisType::HeatCapacity(params) => log::info!(
                "Phases will be assigned using {:?} (thresholds {} and {}).",
                params.partitioning(),
                params.solid_threshold(),
                params.melting_threshold()
            ),
            AnalysisType::Melting(params) => log::info!(
                "Melting will be detected at Lindemann index {}.",
                params.threshold()
            ),
        }
    }
}

impl AnalysisBuilder {
    /// Be silent. Print nothing to the standard output during the analysis.
    #[inline(always)]
    pub fn silent(&mut self) -> &mut Self {
        self.silent = Some(true);
        self
    }

    /// Do not make backups. Overwrite all output files.
    #[inline(always)]
    pub fn overwrite(&mut self) -> &mut Self {
        self.overwrite = Some(true);
        self
    }

    /// Ignore the lists of outlier runs and do not reject any runs.
    #[inline(always)]
    pub fn no_filter(&mut self) -> &mut Self {
        self.no_filter = Some(true);
        self
    }

    /// Alias for `output_directory`.
    #[inline(always)]
    pub fn output(&mut self, value: &str) -> &mut Self {
        self.output_directory(value)
    }

    /// Validate the process of analysis building.
    fn validate(&self) -> Result<(), String> {
        if let Some(analysis_type) = &self.analysis_type {
            analysis_type.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::{FitRange, Fences, OutlierMethod, Partitioning, RunStatistic};

    #[test]
    fn analysis_yaml_diffusion_basic() {
        let analysis = Analysis::from_file("tests/files/inputs/diffusion_basic.yaml").unwrap();

        assert_eq!(analysis.output_directory(), "temp_diffusion");
        assert!(!analysis.silent());
        assert!(!analysis.overwrite());
        assert!(!analysis.no_filter());
        assert!(analysis.filter().is_empty());

        match analysis.analysis_type() {
            AnalysisType::Diffusion(params) => {
                assert_eq!(params.inputs(), &vec![String::from("gromacs")]);
                assert_eq!(params.fit_range(), FitRange::time(50.0, 500.0));
                assert!(params.rejection().is_none());
            }
            _ => panic!("Incorrect analysis type."),
        }
    }

    #[test]
    fn analysis_yaml_diffusion_full() {
        let analysis = Analysis::from_file("tests/files/inputs/diffusion_full.yaml").unwrap();

        assert_eq!(analysis.output_directory(), "results");
        assert!(analysis.silent());
        assert!(analysis.overwrite());
        assert!(analysis.no_filter());
        assert!(analysis.filter().matches("pt6sn8"));
        assert!(!analysis.filter().matches("Cv-2"));

        match analysis.analysis_type() {
            AnalysisType::Diffusion(params) => {
                assert_eq!(
                    params.inputs(),
                    &vec![String::from("gromacs"), String::from("gromacs_extra")]
                );
                assert_eq!(params.pattern(), "*_msd_*.xvg");
                assert_eq!(params.outliers().as_deref(), Some("run_outliers.csv"));
                assert_eq!(params.fit_range(), FitRange::time(100.0, 900.0));
                assert_eq!(params.min_points(), 20);
                assert_eq!(params.resample_points(), 1000);
                assert_relative_eq!(params.r2_threshold(), 0.99);
                assert_relative_eq!(params.msd_scale(), 1.0);
                assert!(params.write_curves());

                let rejection = params.rejection().as_ref().unwrap();
                assert_eq!(rejection.method(), OutlierMethod::Iqr);
                assert_relative_eq!(rejection.multiplier(), 1.5);
                assert_eq!(rejection.statistic(), RunStatistic::FinalValue);
                assert_eq!(rejection.fences(), Fences::LeaveOneOut);
            }
            _ => panic!("Incorrect analysis type."),
        }
    }

    #[test]
    fn analysis_yaml_heat_capacity() {
        let analysis = Analysis::from_file("tests/files/inputs/heat_capacity.yaml").unwrap();
        match analysis.analysis_type() {
            AnalysisType::HeatCapacity(params) => {
                assert_eq!(params.energy(), "lammps/energies.csv");
                assert_eq!(params.partitioning(), Partitioning::KMeans { n_clusters: 3 });
            }
            _ => panic!("Incorrect analysis type."),
        }
    }

    #[test]
    fn analysis_yaml_melting() {
        let analysis = Analysis::from_file("tests/files/inputs/melting.yaml").unwrap();
        match analysis.analysis_type() {
            AnalysisType::Melting(params) => {
                assert_relative_eq!(params.threshold(), 0.12);
            }
            _ => panic!("Incorrect analysis type."),
        }
    }

    #[test]
    fn analysis_yaml_fail_invalid_fit_range() {
        match Analysis::from_file("tests/files/inputs/invalid_fit_range.yaml") {
            Err(ConfigError::InvalidFitRange(_)) => (),
            Ok(_) => panic!("Function should have failed."),
            Err(e) => panic!("Incorrect error type returned: {:?}", e),
        }
    }

    #[test]
    fn analysis_yaml_fail_unknown_field() {
        match Analysis::from_file("tests/files/inputs/unknown_field.yaml") {
            Err(ConfigError::CouldNotParseConfig(_, _)) => (),
            Ok(_) => panic!("Function should have failed."),
            Err(e) => panic!("Incorrect error type returned: {:?}", e),
        }
    }

    #[test]
    fn analysis_yaml_fail_nonexistent() {
        match Analysis::from_file("tests/files/inputs/nonexistent.yaml") {
            Err(ConfigError::CouldNotOpenConfig(_)) => (),
            Ok(_) => panic!("Function should have failed."),
            Err(e) => panic!("Incorrect error type returned: {:?}", e),
        }
    }

    #[test]
    fn analysis_builder() {
        let analysis = Analysis::new()
            .analysis_type(DiffusionParams::new().input("gromacs").build().unwrap())
            .output("results")
            .overwrite()
            .build()
            .unwrap();

        assert_eq!(analysis.output_directory(), "results");
        assert!(analysis.overwrite());
        assert!(!analysis.silent());
        assert!(matches!(analysis.analysis_type(), AnalysisType::Diffusion(_)));
    }

    #[test]
    fn analysis_builder_fail() {
        assert!(Analysis::new().output("results").build().is_err());
    }
}

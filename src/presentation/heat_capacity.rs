// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Results of the calculation of regional heat capacities and their presentation.

use std::io::Write;
use std::path::Path;

use getset::{CopyGetters, Getters};
use serde::Serialize;
use strum_macros::Display;

use crate::composition::SystemSeries;
use crate::errors::WriteError;

use super::{
    format_option, round_serialize_f64, write_csv_rows, write_header, OutputFormat, Presenter,
};

/// Phase of a cluster during a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
pub enum Phase {
    #[serde(rename = "solid")]
    #[strum(serialize = "solid")]
    Solid,
    #[serde(rename = "pre-melting")]
    #[strum(serialize = "pre-melting")]
    PreMelting,
    #[serde(rename = "liquid")]
    #[strum(serialize = "liquid")]
    Liquid,
}

/// Set of runs of a system whose energies are fitted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
pub enum Region {
    #[serde(rename = "solid")]
    #[strum(serialize = "solid")]
    Solid,
    #[serde(rename = "pre-melting")]
    #[strum(serialize = "pre-melting")]
    PreMelting,
    #[serde(rename = "liquid")]
    #[strum(serialize = "liquid")]
    Liquid,
    /// All runs of the system regardless of their phase.
    #[serde(rename = "all")]
    #[strum(serialize = "all")]
    All,
}

impl From<Phase> for Region {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Solid => Region::Solid,
            Phase::PreMelting => Region::PreMelting,
            Phase::Liquid => Region::Liquid,
        }
    }
}

/// How the heat capacity of the support was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupportSource {
    /// Fitted from the energies of the support at this many temperatures.
    Calculated { n_temperatures: usize },
    /// Not enough data for the support, the configured default was used.
    Default,
}

/// A single run with both its energy and Lindemann index known.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct MergedRun {
    #[getset(get = "pub")]
    structure: String,
    /// System the run is assigned to (replicas of `Cv` merged).
    #[getset(get = "pub")]
    system: String,
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get_copy = "pub")]
    run: Option<u32>,
    #[getset(get = "pub")]
    signature: String,
    /// Average energy of the run (in eV).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    energy: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    delta: f64,
    #[getset(get_copy = "pub")]
    phase: Phase,
}

impl MergedRun {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        structure: &str,
        system: &str,
        temperature: u32,
        run: Option<u32>,
        signature: &str,
        energy: f64,
        delta: f64,
        phase: Phase,
    ) -> Self {
        MergedRun {
            structure: structure.to_owned(),
            system: system.to_owned(),
            temperature,
            run,
            signature: signature.to_owned(),
            energy,
            delta,
            phase,
        }
    }
}

/// Heat capacity obtained from a linear fit of energies of a region.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct RegionFit {
    #[getset(get = "pub")]
    system: String,
    #[getset(get_copy = "pub")]
    series: SystemSeries,
    #[getset(get_copy = "pub")]
    region: Region,
    #[getset(get_copy = "pub")]
    n_points: usize,
    #[getset(get_copy = "pub")]
    n_temperatures: usize,
    #[getset(get_copy = "pub")]
    t_min: u32,
    #[getset(get_copy = "pub")]
    t_max: u32,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    mean_delta: f64,
    /// Heat capacity of the cluster and the support (in meV/K).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_total: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_error: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_support: f64,
    /// Heat capacity of the cluster alone (in meV/K).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_cluster: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    r_squared: f64,
}

impl RegionFit {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        system: &str,
        series: SystemSeries,
        region: Region,
        n_points: usize,
        n_temperatures: usize,
        temperature_range: (u32, u32),
        mean_delta: f64,
        cv_total: f64,
        cv_error: f64,
        cv_support: f64,
        r_squared: f64,
    ) -> Self {
        RegionFit {
            system: system.to_owned(),
            series,
            region,
            n_points,
            n_temperatures,
            t_min: temperature_range.0,
            t_max: temperature_range.1,
            mean_delta,
            cv_total,
            cv_error,
            cv_support,
            cv_cluster: cv_total - cv_support,
            r_squared,
        }
    }
}

/// Point of the temperature-dependent heat capacity of a system.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct CurvePoint {
    #[getset(get = "pub")]
    system: String,
    #[getset(get_copy = "pub")]
    temperature: u32,
    /// Mean energy of the runs at this temperature (in eV).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    mean_energy: f64,
    #[getset(get_copy = "pub")]
    n_runs: usize,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_total: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    cv_cluster: f64,
}

impl CurvePoint {
    pub(crate) fn new(
        system: &str,
        temperature: u32,
        mean_energy: f64,
        n_runs: usize,
        cv_total: f64,
        cv_support: f64,
    ) -> Self {
        CurvePoint {
            system: system.to_owned(),
            temperature,
            mean_energy,
            n_runs,
            cv_total,
            cv_cluster: cv_total - cv_support,
        }
    }
}

/// Assignment of the runs of a system into phases.
#[derive(Debug, Clone, Getters)]
pub struct SystemPartition {
    #[getset(get = "pub")]
    system: String,
    /// Description of the method used.
    #[getset(get = "pub")]
    method: String,
    /// Values of the Lindemann index separating the phases.
    #[getset(get = "pub")]
    thresholds: Vec<f64>,
}

impl SystemPartition {
    pub(crate) fn new(system: &str, method: String, thresholds: Vec<f64>) -> Self {
        SystemPartition {
            system: system.to_owned(),
            method,
            thresholds,
        }
    }
}

/// Results of the calculation of regional heat capacities.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct HeatCapacityResults {
    /// Runs used in the analysis with their phases.
    #[getset(get = "pub")]
    merged: Vec<MergedRun>,
    #[getset(get = "pub")]
    regions: Vec<RegionFit>,
    #[getset(get = "pub")]
    curves: Vec<CurvePoint>,
    #[getset(get = "pub")]
    partitions: Vec<SystemPartition>,
    /// Heat capacity of the support (in meV/K).
    #[getset(get_copy = "pub")]
    support_cv: f64,
    #[getset(get_copy = "pub")]
    support_source: SupportSource,
    #[getset(get_copy = "pub")]
    n_energy: usize,
    #[getset(get_copy = "pub")]
    n_lindemann: usize,
    /// Number of runs matched between the energy and Lindemann tables.
    #[getset(get_copy = "pub")]
    n_joined: usize,
    /// Number of runs excluded as outliers.
    #[getset(get_copy = "pub")]
    n_excluded: usize,
    /// Number of runs removed by the IQR filtering.
    #[getset(get_copy = "pub")]
    n_iqr_removed: usize,
}

impl HeatCapacityResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        merged: Vec<MergedRun>,
        regions: Vec<RegionFit>,
        curves: Vec<CurvePoint>,
        partitions: Vec<SystemPartition>,
        support_cv: f64,
        support_source: SupportSource,
        n_energy: usize,
        n_lindemann: usize,
        n_joined: usize,
        n_excluded: usize,
        n_iqr_removed: usize,
    ) -> Self {
        HeatCapacityResults {
            merged,
            regions,
            curves,
            partitions,
            support_cv,
            support_source,
            n_energy,
            n_lindemann,
            n_joined,
            n_excluded,
            n_iqr_removed,
        }
    }

    /// Get the fit of a specific region of a system.
    pub fn region(&self, system: &str, region: Region) -> Option<&RegionFit> {
        self.regions
            .iter()
            .find(|fit| fit.system == system && fit.region == region)
    }

    pub(super) fn write_all(&self, directory: &Path, overwrite: bool) -> Result<(), WriteError> {
        RegionTable(self).write(directory.join("heat_capacity_regions.csv"), overwrite)?;
        CurveTable(self).write(directory.join("heat_capacity_curves.csv"), overwrite)?;
        MergedTable(self).write(directory.join("merged_runs.csv"), overwrite)?;
        HeatCapacityReport(self).write(directory.join("heat_capacity_report.txt"), overwrite)?;
        Ok(())
    }
}

struct RegionTable<'a>(&'a HeatCapacityResults);

impl Presenter for RegionTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "regional heat capacities"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        write_csv_rows(
            writer,
            &self.0.regions,
            &[
                "system",
                "series",
                "region",
                "n_points",
                "n_temperatures",
                "T_min_K",
                "T_max_K",
                "mean_delta",
                "Cv_total_meV_K",
                "Cv_error_meV_K",
                "Cv_support_meV_K",
                "Cv_cluster_meV_K",
                "r_squared",
            ],
        )
    }
}

struct CurveTable<'a>(&'a HeatCapacityResults);

impl Presenter for CurveTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "temperature-dependent heat capacities"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        write_csv_rows(
            writer,
            &self.0.curves,
            &[
                "system",
                "temperature_K",
                "mean_energy_eV",
                "n_runs",
                "Cv_total_meV_K",
                "Cv_cluster_meV_K",
            ],
        )
    }
}

struct MergedTable<'a>(&'a HeatCapacityResults);

impl Presenter for MergedTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "energies and Lindemann indices of the runs"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        write_csv_rows(
            writer,
            &self.0.merged,
            &[
                "structure",
                "system",
                "temperature_K",
                "run",
                "signature",
                "avg_energy_eV",
                "delta",
                "phase",
            ],
        )
    }
}

struct HeatCapacityReport<'a>(&'a HeatCapacityResults);

impl Presenter for HeatCapacityReport<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::TXT
    }

    fn content(&self) -> &str {
        "summary of the heat capacity calculation"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let results = self.0;
        write_header(writer, "Regional heat capacities")?;

        write_result!(writer, "\nSupport\n");
        match results.support_source {
            SupportSource::Calculated { n_temperatures } => write_result!(
                writer,
                "  Cv_support = {:.4} meV/K (fitted from {} temperatures)\n",
                results.support_cv,
                n_temperatures
            ),
            SupportSource::Default => write_result!(
                writer,
                "  Cv_support = {:.4} meV/K (default value)\n",
                results.support_cv
            ),
        }

        write_result!(writer, "\nInput\n");
        write_result!(writer, "  energy records:       {}\n", results.n_energy);
        write_result!(writer, "  Lindemann records:    {}\n", results.n_lindemann);
        write_result!(writer, "  matched runs:         {}\n", results.n_joined);
        write_result!(writer, "  listed as outliers:   {}\n", results.n_excluded);
        write_result!(writer, "  removed by IQR:       {}\n", results.n_iqr_removed);
        write_result!(writer, "  analyzed runs:        {}\n", results.merged.len());

        write_result!(writer, "\nPhase assignment\n");
        for partition in results.partitions.iter() {
            let thresholds = partition
                .thresholds
                .iter()
                .map(|x| format!("{:.4}", x))
                .collect::<Vec<_>>()
                .join(", ");
            write_result!(
                writer,
                "  {:<16} {} [{}]\n",
                partition.system,
                partition.method,
                thresholds
            );
        }

        write_result!(writer, "\nRegional heat capacities (meV/K)\n");
        write_result!(
            writer,
            "  {:<16} {:<12} {:>6} {:>11} {:>10} {:>10} {:>10} {:>8}\n",
            "system",
            "region",
            "runs",
            "T range",
            "Cv_total",
            "error",
            "Cv_cluster",
            "R^2"
        );
        for fit in results.regions.iter() {
            write_result!(
                writer,
                "  {:<16} {:<12} {:>6} {:>11} {:>10.4} {:>10} {:>10.4} {:>8.4}\n",
                fit.system,
                fit.region.to_string(),
                fit.n_points,
                format!("{}-{}", fit.t_min, fit.t_max),
                fit.cv_total,
                format_option(Some(fit.cv_error), 4),
                fit.cv_cluster,
                fit.r_squared
            );
        }

        Ok(())
    }
}

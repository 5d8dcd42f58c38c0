// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Results of the estimation of melting temperatures and their presentation.

use std::io::Write;
use std::path::Path;

use getset::{CopyGetters, Getters};
use serde::Serialize;

use crate::composition::StructureClass;
use crate::errors::WriteError;

use super::{
    format_option, round_serialize_f64, round_serialize_option_f64, sci_serialize_option_f64,
    write_csv_rows, write_header, OutputFormat, Presenter,
};

const TABLE_HEADERS: [&str; 22] = [
    "structure",
    "class",
    "Pt",
    "Sn",
    "O",
    "total_atoms",
    "Sn_fraction",
    "Pt_Sn_ratio",
    "n_temperatures",
    "n_runs",
    "Tm_threshold_K",
    "Tm_threshold_error_K",
    "Tm_transition_K",
    "Tm_transition_error_K",
    "max_slope_1_K",
    "delta_at_transition",
    "Tm_clustering_K",
    "Tm_clustering_error_K",
    "diff_threshold_clustering_K",
    "diff_threshold_transition_K",
    "status",
    "notes",
];

/// Lindemann index of a structure at a single temperature.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct TemperaturePoint {
    temperature: u32,
    mean: f64,
    /// Sample standard deviation. NaN for a single run.
    std: f64,
    count: usize,
}

impl TemperaturePoint {
    pub(crate) fn new(temperature: u32, mean: f64, std: f64, count: usize) -> Self {
        TemperaturePoint {
            temperature,
            mean,
            std,
            count,
        }
    }
}

/// Melting temperatures of a single structure.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct MeltingRow {
    #[getset(get = "pub")]
    pub(crate) structure: String,
    #[getset(get_copy = "pub")]
    pub(crate) class: StructureClass,
    #[getset(get_copy = "pub")]
    pub(crate) pt: u32,
    #[getset(get_copy = "pub")]
    pub(crate) sn: u32,
    #[getset(get_copy = "pub")]
    pub(crate) o: u32,
    #[getset(get_copy = "pub")]
    pub(crate) total_atoms: u32,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) sn_fraction: f64,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) pt_sn_ratio: Option<f64>,
    #[getset(get_copy = "pub")]
    pub(crate) n_temperatures: usize,
    #[getset(get_copy = "pub")]
    pub(crate) n_runs: usize,
    /// Temperature at which the mean Lindemann index crosses the threshold (in K).
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_threshold: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_threshold_error: Option<f64>,
    /// Temperature of the steepest increase of the smoothed Lindemann index (in K).
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_transition: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_transition_error: Option<f64>,
    #[serde(serialize_with = "sci_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) max_slope: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) delta_at_transition: Option<f64>,
    /// Temperature separating the low and high Lindemann index clusters (in K).
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_clustering: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) tm_clustering_error: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) diff_threshold_clustering: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    pub(crate) diff_threshold_transition: Option<f64>,
    /// State of the structure at the threshold method (`melting`, `solid`, `liquid`, `insufficient`).
    #[getset(get = "pub")]
    pub(crate) status: String,
    #[getset(get = "pub")]
    pub(crate) notes: String,
    /// Lindemann index per temperature (ascending).
    #[serde(skip)]
    #[getset(get = "pub")]
    pub(crate) profile: Vec<TemperaturePoint>,
}

/// Results of the estimation of melting temperatures.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct MeltingResults {
    /// Results per structure sorted by the Sn fraction and the number of atoms.
    #[getset(get = "pub")]
    rows: Vec<MeltingRow>,
    #[getset(get_copy = "pub")]
    n_records: usize,
    /// Number of records excluded as outliers.
    #[getset(get_copy = "pub")]
    n_excluded: usize,
    /// Structures skipped because their composition is unknown or they are not selected.
    #[getset(get = "pub")]
    skipped: Vec<String>,
    #[getset(get_copy = "pub")]
    threshold: f64,
    #[getset(get_copy = "pub")]
    min_slope: f64,
    #[getset(get_copy = "pub")]
    smoothing_sigma: f64,
}

impl MeltingResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        rows: Vec<MeltingRow>,
        n_records: usize,
        n_excluded: usize,
        skipped: Vec<String>,
        threshold: f64,
        min_slope: f64,
        smoothing_sigma: f64,
    ) -> Self {
        MeltingResults {
            rows,
            n_records,
            n_excluded,
            skipped,
            threshold,
            min_slope,
            smoothing_sigma,
        }
    }

    /// Get the results for a specific structure.
    pub fn get(&self, structure: &str) -> Option<&MeltingRow> {
        self.rows.iter().find(|row| row.structure == structure)
    }

    pub(super) fn write_all(&self, directory: &Path, overwrite: bool) -> Result<(), WriteError> {
        MeltingTable(self).write(directory.join("melting_point_summary.csv"), overwrite)?;
        MeltingReport(self).write(directory.join("melting_point_report.txt"), overwrite)?;
        Ok(())
    }
}

struct MeltingTable<'a>(&'a MeltingResults);

impl Presenter for MeltingTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "melting temperatures"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        write_csv_rows(writer, &self.0.rows, &TABLE_HEADERS)
    }
}

struct MeltingReport<'a>(&'a MeltingResults);

impl Presenter for MeltingReport<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::TXT
    }

    fn content(&self) -> &str {
        "summary of the melting analysis"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let results = self.0;
        write_header(writer, "Melting temperatures")?;

        write_result!(writer, "\nConfiguration\n");
        write_result!(writer, "  Lindemann threshold:  {}\n", results.threshold);
        write_result!(writer, "  minimal slope:        {:e} 1/K\n", results.min_slope);
        write_result!(writer, "  smoothing sigma:      {}\n", results.smoothing_sigma);

        write_result!(writer, "\nInput\n");
        write_result!(writer, "  Lindemann records:    {}\n", results.n_records);
        write_result!(writer, "  listed as outliers:   {}\n", results.n_excluded);
        write_result!(writer, "  analyzed structures:  {}\n", results.rows.len());
        if !results.skipped.is_empty() {
            write_result!(
                writer,
                "  skipped structures:   {}\n",
                results.skipped.join(", ")
            );
        }

        write_result!(writer, "\nMelting temperatures (K)\n");
        write_result!(
            writer,
            "  {:<16} {:<10} {:>7} {:>7} {:>10} {:>10} {:>10}\n",
            "structure",
            "class",
            "x(Sn)",
            "atoms",
            "threshold",
            "transition",
            "clustering"
        );
        for row in results.rows.iter() {
            write_result!(
                writer,
                "  {:<16} {:<10} {:>7.3} {:>7} {:>10} {:>10} {:>10}\n",
                row.structure,
                row.class.to_string(),
                row.sn_fraction,
                row.total_atoms,
                format_option(row.tm_threshold, 1),
                format_option(row.tm_transition, 1),
                format_option(row.tm_clustering, 1)
            );
        }

        for row in results.rows.iter() {
            write_result!(writer, "\n{} ({})\n", row.structure, row.status);
            if !row.notes.is_empty() {
                write_result!(writer, "  notes: {}\n", row.notes);
            }
            write_result!(
                writer,
                "  {:>8} {:>10} {:>10} {:>6}\n",
                "T (K)",
                "mean",
                "std",
                "runs"
            );
            for point in row.profile.iter() {
                write_result!(
                    writer,
                    "  {:>8} {:>10.4} {:>10} {:>6}\n",
                    point.temperature,
                    point.mean,
                    format_option(Some(point.std), 4),
                    point.count
                );
            }
        }

        Ok(())
    }
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Results of the calculation of ensemble diffusion coefficients and their presentation.

use std::io::Write;
use std::path::Path;

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use serde::Serialize;

use crate::analysis::ensemble::{EnsembleFit, MissingData};
use crate::analysis::statistics::{mean, median};
use crate::errors::WriteError;
use crate::input::{FitRange, OutlierRejection};

use super::{
    create_directory, round_serialize_f64, sci_serialize_f64, write_csv_rows,
    write_header, OutputFormat, Presenter,
};

const TABLE_HEADERS: [&str; 14] = [
    "composition",
    "system",
    "temperature_K",
    "element",
    "D_cm2_s",
    "D_error_cm2_s",
    "slope_A2_ps",
    "intercept_A2",
    "r_squared",
    "n_runs",
    "n_rejected",
    "n_points",
    "fit_start_ps",
    "fit_end_ps",
];

/// Ensemble diffusion coefficient of a single (composition, temperature, element) group.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct DiffusionRow {
    #[getset(get = "pub")]
    composition: String,
    /// Base system (replicas of `Cv` merged).
    #[getset(get = "pub")]
    system: String,
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get = "pub")]
    element: String,
    /// Diffusion coefficient (in cm^2/s).
    #[serde(serialize_with = "sci_serialize_f64")]
    #[getset(get_copy = "pub")]
    coefficient: f64,
    #[serde(serialize_with = "sci_serialize_f64")]
    #[getset(get_copy = "pub")]
    coefficient_error: f64,
    /// Slope of the ensemble msd curve (in Å^2/ps).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    slope: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    intercept: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    r_squared: f64,
    #[getset(get_copy = "pub")]
    n_runs: usize,
    #[getset(get_copy = "pub")]
    n_rejected: usize,
    #[getset(get_copy = "pub")]
    n_points: usize,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    fit_start: f64,
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    fit_end: f64,
}

impl DiffusionRow {
    pub(crate) fn new(
        composition: &str,
        system: &str,
        temperature: u32,
        element: &str,
        ensemble: &EnsembleFit,
    ) -> Self {
        let (fit_start, fit_end) = ensemble.fit_interval();
        DiffusionRow {
            composition: composition.to_owned(),
            system: system.to_owned(),
            temperature,
            element: element.to_owned(),
            coefficient: ensemble.coefficient(),
            coefficient_error: ensemble.coefficient_error(),
            slope: ensemble.fit().slope(),
            intercept: ensemble.fit().intercept(),
            r_squared: ensemble.fit().r_squared(),
            n_runs: ensemble.n_runs(),
            n_rejected: ensemble.rejected().len(),
            n_points: ensemble.fit().n_points(),
            fit_start,
            fit_end,
        }
    }
}

/// Ensemble-averaged msd curve of a single group.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct DiffusionCurve {
    #[getset(get = "pub")]
    composition: String,
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get = "pub")]
    element: String,
    #[getset(get = "pub")]
    ensemble: EnsembleFit,
}

impl DiffusionCurve {
    pub(crate) fn new(
        composition: &str,
        temperature: u32,
        element: &str,
        ensemble: EnsembleFit,
    ) -> Self {
        DiffusionCurve {
            composition: composition.to_owned(),
            temperature,
            element: element.to_owned(),
            ensemble,
        }
    }

    fn filename(&self) -> String {
        format!(
            "msd_{}_{}K_{}.xvg",
            self.composition, self.temperature, self.element
        )
    }
}

/// Results of the calculation of ensemble diffusion coefficients.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct DiffusionResults {
    /// Estimated coefficients sorted by system, temperature and element.
    #[getset(get = "pub")]
    rows: Vec<DiffusionRow>,
    /// Averaged curves (only collected if requested).
    #[getset(get = "pub")]
    curves: Vec<DiffusionCurve>,
    /// Groups for which no estimate could be produced.
    #[getset(get = "pub")]
    missing: Vec<(String, MissingData)>,
    #[getset(get_copy = "pub")]
    n_files: usize,
    /// Number of files excluded because they are listed as outliers.
    #[getset(get_copy = "pub")]
    n_excluded: usize,
    /// Number of files that could not be identified or read.
    #[getset(get_copy = "pub")]
    n_unreadable: usize,
    #[getset(get_copy = "pub")]
    n_groups: usize,
    #[getset(get_copy = "pub")]
    fit_range: FitRange,
    #[getset(get_copy = "pub")]
    r2_threshold: f64,
    #[getset(get = "pub")]
    rejection: Option<OutlierRejection>,
}

impl DiffusionResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        rows: Vec<DiffusionRow>,
        curves: Vec<DiffusionCurve>,
        missing: Vec<(String, MissingData)>,
        n_files: usize,
        n_excluded: usize,
        n_unreadable: usize,
        n_groups: usize,
        fit_range: FitRange,
        r2_threshold: f64,
        rejection: Option<OutlierRejection>,
    ) -> Self {
        DiffusionResults {
            rows,
            curves,
            missing,
            n_files,
            n_excluded,
            n_unreadable,
            n_groups,
            fit_range,
            r2_threshold,
            rejection,
        }
    }

    /// Get the row for a specific group.
    pub fn get(&self, composition: &str, temperature: u32, element: &str) -> Option<&DiffusionRow> {
        self.rows.iter().find(|row| {
            row.composition == composition
                && row.temperature == temperature
                && row.element == element
        })
    }

    pub(super) fn write_all(&self, directory: &Path, overwrite: bool) -> Result<(), WriteError> {
        DiffusionTable(self).write(directory.join("ensemble_D_values.csv"), overwrite)?;
        DiffusionReport(self).write(directory.join("D_calculation_report.txt"), overwrite)?;

        if !self.curves.is_empty() {
            let curve_directory = directory.join("curves");
            create_directory(&curve_directory)?;
            for curve in self.curves.iter() {
                CurveXvg(curve).write(curve_directory.join(curve.filename()), overwrite)?;
            }
        }

        Ok(())
    }
}

struct DiffusionTable<'a>(&'a DiffusionResults);

impl Presenter for DiffusionTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "ensemble diffusion coefficients"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        write_csv_rows(writer, &self.0.rows, &TABLE_HEADERS)
    }
}

struct DiffusionReport<'a>(&'a DiffusionResults);

impl Presenter for DiffusionReport<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::TXT
    }

    fn content(&self) -> &str {
        "summary of the diffusion calculation"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let results = self.0;
        write_header(writer, "Ensemble diffusion coefficients")?;

        write_result!(writer, "\nConfiguration\n");
        write_result!(writer, "  fit range:            {}\n", results.fit_range);
        write_result!(writer, "  R^2 threshold:        {}\n", results.r2_threshold);
        match &results.rejection {
            Some(rejection) => write_result!(
                writer,
                "  outlier rejection:    {} (k = {}, {} fences) on the {}\n",
                rejection.method(),
                rejection.multiplier(),
                rejection.fences(),
                rejection.statistic()
            ),
            None => write_result!(writer, "  outlier rejection:    none\n"),
        }

        write_result!(writer, "\nInput\n");
        write_result!(writer, "  msd files found:      {}\n", results.n_files);
        write_result!(writer, "  listed as outliers:   {}\n", results.n_excluded);
        write_result!(writer, "  unreadable:           {}\n", results.n_unreadable);
        write_result!(writer, "  groups:               {}\n", results.n_groups);
        write_result!(writer, "  estimates:            {}\n", results.rows.len());
        write_result!(writer, "  missing estimates:    {}\n", results.missing.len());
        let rejected: usize = results.rows.iter().map(|r| r.n_rejected).sum();
        write_result!(writer, "  rejected runs:        {}\n", rejected);

        let (good, poor): (Vec<&DiffusionRow>, Vec<&DiffusionRow>) = results
            .rows
            .iter()
            .partition(|r| r.r_squared >= results.r2_threshold);

        write_result!(writer, "\nFit quality\n");
        write_result!(writer, "  R^2 >= {}: {}\n", results.r2_threshold, good.len());
        write_result!(writer, "  R^2 <  {}: {}\n", results.r2_threshold, poor.len());
        for row in poor {
            write_result!(
                writer,
                "    {} {} K {}: R^2 = {:.4}\n",
                row.composition,
                row.temperature,
                row.element,
                row.r_squared
            );
        }

        let mut per_element: IndexMap<&str, Vec<f64>> = IndexMap::new();
        for row in results.rows.iter() {
            per_element
                .entry(row.element.as_str())
                .or_default()
                .push(row.coefficient);
        }
        per_element.sort_keys();

        write_result!(writer, "\nDiffusion coefficients per element (cm^2/s)\n");
        write_result!(
            writer,
            "  {:<8} {:>5} {:>12} {:>12} {:>12} {:>12}\n",
            "element",
            "n",
            "min",
            "max",
            "mean",
            "median"
        );
        for (element, values) in per_element.iter() {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            write_result!(
                writer,
                "  {:<8} {:>5} {:>12.4e} {:>12.4e} {:>12.4e} {:>12.4e}\n",
                element,
                values.len(),
                min,
                max,
                mean(values).unwrap_or(f64::NAN),
                median(values).unwrap_or(f64::NAN)
            );
        }

        if !results.missing.is_empty() {
            write_result!(writer, "\nMissing estimates\n");
            for (group, reason) in results.missing.iter() {
                write_result!(writer, "  {}: {}\n", group, reason);
            }
        }

        Ok(())
    }
}

struct CurveXvg<'a>(&'a DiffusionCurve);

impl Presenter for CurveXvg<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::XVG
    }

    fn content(&self) -> &str {
        "ensemble-averaged msd curve"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let curve = self.0;
        let ensemble = &curve.ensemble;
        let (start, end) = ensemble.fit_interval();
        let error = match ensemble.coefficient_error() {
            x if x.is_finite() => format!("{:.2e}", x),
            _ => String::from("-"),
        };

        write_header(writer, "Ensemble-averaged msd curve")?;
        write_result!(
            writer,
            "# {} at {} K, element {}: {} runs used, {} rejected.\n",
            curve.composition,
            curve.temperature,
            curve.element,
            ensemble.n_runs(),
            ensemble.rejected().len()
        );
        write_result!(
            writer,
            "# D = {:.5e} +- {} cm^2/s from fit over {}-{} ps (R^2 = {:.4}).\n",
            ensemble.coefficient(),
            error,
            start,
            end,
            ensemble.fit().r_squared()
        );
        write_result!(writer, "@    title \"Ensemble MSD\"\n");
        write_result!(writer, "@    xaxis  label \"Time (ps)\"\n");
        write_result!(writer, "@    yaxis  label \"MSD (A^2)\"\n");
        write_result!(writer, "@    s0 legend \"mean\"\n");
        write_result!(writer, "@    s1 legend \"std\"\n");
        write_result!(writer, "@    s2 legend \"fit\"\n");

        for ((t, m), s) in ensemble
            .axis()
            .iter()
            .zip(ensemble.mean().iter())
            .zip(ensemble.std().iter())
        {
            write_result!(
                writer,
                "{:>12.4} {:>14.6} {:>14.6} {:>14.6}\n",
                t,
                m,
                s,
                ensemble.fit().predict(*t)
            );
        }

        Ok(())
    }
}

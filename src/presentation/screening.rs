// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Results of the quality screening of individual runs and their presentation.

use std::io::Write;
use std::path::Path;

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::WriteError;
use crate::input::OutlierRejection;

use super::{
    round_serialize_option_f64, sci_serialize_option_f64, write_csv_rows, write_header,
    OutputFormat, Presenter,
};

const TABLE_HEADERS: [&str; 13] = [
    "group",
    "composition",
    "temperature_K",
    "element",
    "run",
    "gpu",
    "reported_D_cm2_s",
    "fitted_D_cm2_s",
    "r_squared",
    "intercept_A2",
    "filepath",
    "signature",
    "reason",
];

/// Quality of a single run (one msd file).
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct RunQuality {
    /// Group the run was screened in (`<composition>_<T>K_<element>`).
    #[getset(get = "pub")]
    group: String,
    #[getset(get = "pub")]
    composition: String,
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get = "pub")]
    element: String,
    #[getset(get_copy = "pub")]
    run: Option<u32>,
    #[getset(get_copy = "pub")]
    gpu: Option<u32>,
    /// Diffusion coefficient written in the header of the msd file (in cm^2/s).
    #[serde(serialize_with = "sci_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    reported_d: Option<f64>,
    /// Diffusion coefficient obtained by fitting the msd curve (in cm^2/s).
    #[serde(serialize_with = "sci_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    fitted_d: Option<f64>,
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    r_squared: Option<f64>,
    /// Intercept of the fitted line (in Å^2).
    #[serde(serialize_with = "round_serialize_option_f64")]
    #[getset(get_copy = "pub")]
    intercept: Option<f64>,
    #[getset(get = "pub")]
    filepath: String,
    #[getset(get = "pub")]
    signature: Option<String>,
    /// Why the run has been flagged. `None` for runs of good quality.
    #[getset(get = "pub")]
    reason: Option<String>,
}

impl RunQuality {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        composition: &str,
        temperature: u32,
        element: &str,
        run: Option<u32>,
        gpu: Option<u32>,
        reported_d: Option<f64>,
        fitted: Option<(f64, f64, f64)>,
        filepath: String,
        signature: Option<String>,
    ) -> Self {
        RunQuality {
            group: format!("{}_{}K_{}", composition, temperature, element),
            composition: composition.to_owned(),
            temperature,
            element: element.to_owned(),
            run,
            gpu,
            reported_d,
            fitted_d: fitted.map(|(d, _, _)| d),
            r_squared: fitted.map(|(_, r2, _)| r2),
            intercept: fitted.map(|(_, _, intercept)| intercept),
            filepath,
            signature,
            reason: None,
        }
    }

    /// Has the run been flagged?
    #[inline(always)]
    pub fn is_flagged(&self) -> bool {
        self.reason.is_some()
    }

    /// Flag the run. Does nothing if the run is already flagged.
    pub(crate) fn flag(&mut self, reason: impl Into<String>) {
        if self.reason.is_none() {
            self.reason = Some(reason.into());
        }
    }
}

/// Results of the quality screening.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct ScreeningResults {
    /// All screened runs (flagged and good).
    #[getset(get = "pub")]
    runs: Vec<RunQuality>,
    #[getset(get_copy = "pub")]
    n_files: usize,
    /// Number of files that could not be identified or read.
    #[getset(get_copy = "pub")]
    n_skipped: usize,
    #[getset(get_copy = "pub")]
    n_groups: usize,
    /// Number of groups large enough for the outlier detection.
    #[getset(get_copy = "pub")]
    n_tested_groups: usize,
    #[getset(get = "pub")]
    rejection: OutlierRejection,
    #[getset(get_copy = "pub")]
    intercept_max: f64,
    #[getset(get_copy = "pub")]
    d_max: f64,
}

impl ScreeningResults {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        runs: Vec<RunQuality>,
        n_files: usize,
        n_skipped: usize,
        n_groups: usize,
        n_tested_groups: usize,
        rejection: OutlierRejection,
        intercept_max: f64,
        d_max: f64,
    ) -> Self {
        ScreeningResults {
            runs,
            n_files,
            n_skipped,
            n_groups,
            n_tested_groups,
            rejection,
            intercept_max,
            d_max,
        }
    }

    /// Iterate over the flagged runs.
    pub fn flagged(&self) -> impl Iterator<Item = &RunQuality> {
        self.runs.iter().filter(|run| run.is_flagged())
    }

    /// Number of flagged runs.
    pub fn n_flagged(&self) -> usize {
        self.flagged().count()
    }

    pub(super) fn write_all(&self, directory: &Path, overwrite: bool) -> Result<(), WriteError> {
        OutlierTable(self).write(directory.join("run_outliers.csv"), overwrite)?;
        ScreeningReport(self).write(directory.join("run_quality_report.txt"), overwrite)?;
        Ok(())
    }
}

struct OutlierTable<'a>(&'a ScreeningResults);

impl Presenter for OutlierTable<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::CSV
    }

    fn content(&self) -> &str {
        "list of outlier runs"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let flagged: Vec<&RunQuality> = self.0.flagged().collect();
        write_csv_rows(writer, &flagged, &TABLE_HEADERS)
    }
}

struct ScreeningReport<'a>(&'a ScreeningResults);

impl Presenter for ScreeningReport<'_> {
    fn file_format(&self) -> OutputFormat {
        OutputFormat::TXT
    }

    fn content(&self) -> &str {
        "summary of the quality screening"
    }

    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError> {
        let results = self.0;
        write_header(writer, "Quality screening of individual runs")?;

        write_result!(writer, "\nConfiguration\n");
        write_result!(
            writer,
            "  outlier detection:    {} (k = {}, {} fences) on the {}\n",
            results.rejection.method(),
            results.rejection.multiplier(),
            results.rejection.fences(),
            results.rejection.statistic()
        );
        write_result!(
            writer,
            "  minimal group size:   {}\n",
            results.rejection.min_runs()
        );
        write_result!(writer, "  maximal intercept:    {} A^2\n", results.intercept_max);
        write_result!(writer, "  maximal D:            {:e} cm^2/s\n", results.d_max);

        write_result!(writer, "\nInput\n");
        write_result!(writer, "  msd files found:      {}\n", results.n_files);
        write_result!(writer, "  skipped files:        {}\n", results.n_skipped);
        write_result!(writer, "  screened runs:        {}\n", results.runs.len());
        write_result!(writer, "  groups:               {}\n", results.n_groups);
        write_result!(writer, "  tested groups:        {}\n", results.n_tested_groups);

        let mut reasons: IndexMap<&str, usize> = IndexMap::new();
        for run in results.flagged() {
            if let Some(reason) = &run.reason {
                *reasons.entry(reason.as_str()).or_default() += 1;
            }
        }
        reasons.sort_keys();

        write_result!(writer, "\nFlagged runs: {}\n", results.n_flagged());
        for (reason, count) in reasons.iter() {
            write_result!(writer, "  {:<24} {}\n", reason, count);
        }

        let mut groups: IndexMap<&str, Vec<&RunQuality>> = IndexMap::new();
        for run in results.flagged() {
            groups.entry(run.group.as_str()).or_default().push(run);
        }
        groups.sort_keys();

        for (group, runs) in groups.iter() {
            write_result!(writer, "\n{}\n", group);
            for run in runs {
                write_result!(
                    writer,
                    "  {} ({})\n",
                    run.filepath,
                    run.reason.as_deref().unwrap_or_default()
                );
            }
        }

        Ok(())
    }
}

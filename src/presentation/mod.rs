// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains structures and methods for presenting the results of the analysis.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use colored::Colorize;
use serde::{Serialize, Serializer};
use strum_macros::Display;

use crate::errors::WriteError;

macro_rules! write_result {
    ($dst:expr, $($arg:tt)*) => {
        write!($dst, $($arg)*).map_err(WriteError::CouldNotWriteResults)?
    };
}

pub mod diffusion;
pub mod heat_capacity;
pub mod melting;
pub mod screening;

pub use diffusion::{DiffusionCurve, DiffusionResults, DiffusionRow};
pub use heat_capacity::{
    CurvePoint, HeatCapacityResults, MergedRun, Phase, Region, RegionFit, SupportSource,
    SystemPartition,
};
pub use melting::{MeltingResults, MeltingRow, TemperaturePoint};
pub use screening::{RunQuality, ScreeningResults};

/// All supported output file formats.
#[derive(Debug, Clone, Copy, Display)]
#[allow(clippy::upper_case_acronyms)]
pub(crate) enum OutputFormat {
    #[strum(serialize = "csv")]
    CSV,
    #[strum(serialize = "xvg")]
    XVG,
    #[strum(serialize = "txt")]
    TXT,
}

/// Specifies whether a file with the same name existed or not
/// and whether it has been overwritten or backed up.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub(crate) enum FileStatus {
    New,
    Backup,
    Overwrite,
}

impl FileStatus {
    /// Log information about a file and what has been written into it.
    fn info(self, format: OutputFormat, filename: &str, content: &str) {
        match self {
            Self::New => log::info!(
                "Written {} into {} file '{}'.",
                content,
                format.to_string().cyan(),
                filename.cyan()
            ),
            Self::Backup => log::info!(
                "Backed up an already existing file '{}' and saved {}.",
                filename.cyan(),
                content,
            ),
            Self::Overwrite => log::warn!(
                "Overwritten an already existing file '{}' with {}.",
                filename.yellow(),
                content,
            ),
        }
    }
}

/// Trait implemented by all structures writing a single output file.
pub(crate) trait Presenter {
    /// Format of the output file.
    fn file_format(&self) -> OutputFormat;

    /// Short description of the content of the file used for logging.
    fn content(&self) -> &str;

    /// Write the results into an open output file.
    fn write_results(&self, writer: &mut impl Write) -> Result<(), WriteError>;

    /// Create (and potentially back up) an output file, open it and write the results into it.
    fn write(&self, filename: impl AsRef<Path>, overwrite: bool) -> Result<(), WriteError> {
        let file_status = try_backup(&filename, overwrite)?;
        let mut writer = create_and_open(&filename)?;
        self.write_results(&mut writer)?;
        writer.flush().map_err(WriteError::CouldNotWriteResults)?;

        file_status.info(
            self.file_format(),
            &filename.as_ref().to_string_lossy(),
            self.content(),
        );
        Ok(())
    }
}

/// Create and open a file for buffered writing.
#[inline(always)]
fn create_and_open(filename: &impl AsRef<Path>) -> Result<BufWriter<File>, WriteError> {
    let file = File::create(filename.as_ref())
        .map_err(|_| WriteError::CouldNotCreateFile(Box::from(filename.as_ref())))?;

    Ok(BufWriter::new(file))
}

/// Back up an output file, if it is necessary and if it is requested.
#[inline(always)]
fn try_backup(filename: &impl AsRef<Path>, overwrite: bool) -> Result<FileStatus, WriteError> {
    if filename.as_ref().exists() {
        if !overwrite {
            backitup::backup(filename.as_ref())
                .map_err(|_| WriteError::CouldNotBackupFile(Box::from(filename.as_ref())))?;

            Ok(FileStatus::Backup)
        } else {
            Ok(FileStatus::Overwrite)
        }
    } else {
        Ok(FileStatus::New)
    }
}

/// Create a directory (including its parents) if it does not exist.
pub(crate) fn create_directory(path: impl AsRef<Path>) -> Result<(), WriteError> {
    std::fs::create_dir_all(path.as_ref())
        .map_err(|_| WriteError::CouldNotCreateDirectory(Box::from(path.as_ref())))
}

/// Write header of a text output file specifying the version of the program.
pub(crate) fn write_header(writer: &mut impl Write, description: &str) -> Result<(), WriteError> {
    write_result!(
        writer,
        "# {} calculated with 'ensfit v{}'.\n",
        description,
        crate::ENSFIT_VERSION
    );
    Ok(())
}

/// Serialize rows into a csv table with a header line.
pub(crate) fn write_csv_rows<R: Serialize>(
    writer: &mut impl Write,
    rows: &[R],
    headers: &[&str],
) -> Result<(), WriteError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(headers)
        .map_err(WriteError::CouldNotWriteCsv)?;

    for row in rows {
        csv_writer
            .serialize(row)
            .map_err(WriteError::CouldNotWriteCsv)?;
    }

    csv_writer.flush().map_err(WriteError::CouldNotWriteResults)?;
    Ok(())
}

/// Format an optional value for a text report.
pub(crate) fn format_option(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(x) if x.is_finite() => format!("{:.*}", precision, x),
        _ => String::from("-"),
    }
}

/// Serialize a float rounded to four decimal places. Non-finite values are left empty.
#[inline(always)]
pub(crate) fn round_serialize_f64<S>(x: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if x.is_finite() {
        s.serialize_f64((x * 10000.0).round() / 10000.0)
    } else {
        s.serialize_none()
    }
}

#[inline(always)]
pub(crate) fn round_serialize_option_f64<S>(x: &Option<f64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match x {
        Some(value) => round_serialize_f64(value, s),
        None => s.serialize_none(),
    }
}

/// Serialize a float in scientific notation with six significant digits.
/// Non-finite values are left empty.
#[inline(always)]
pub(crate) fn sci_serialize_f64<S>(x: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if x.is_finite() {
        s.serialize_str(&format!("{:.5e}", x))
    } else {
        s.serialize_none()
    }
}

#[inline(always)]
pub(crate) fn sci_serialize_option_f64<S>(x: &Option<f64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match x {
        Some(value) => sci_serialize_f64(value, s),
        None => s.serialize_none(),
    }
}

/// Results of any analysis.
#[derive(Debug, Clone)]
pub enum AnalysisResults {
    Screening(ScreeningResults),
    Diffusion(DiffusionResults),
    HeatCapacity(HeatCapacityResults),
    Melting(MeltingResults),
}

impl AnalysisResults {
    /// Write all output files of the analysis into the output directory.
    /// The directory is created if it does not exist.
    pub fn write(
        &self,
        output_directory: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<(), WriteError> {
        let directory = output_directory.as_ref();
        create_directory(directory)?;

        match self {
            Self::Screening(results) => results.write_all(directory, overwrite),
            Self::Diffusion(results) => results.write_all(directory, overwrite),
            Self::HeatCapacity(results) => results.write_all(directory, overwrite),
            Self::Melting(results) => results.write_all(directory, overwrite),
        }
    }
}

impl From<ScreeningResults> for AnalysisResults {
    fn from(value: ScreeningResults) -> Self {
        AnalysisResults::Screening(value)
    }
}

impl From<DiffusionResults> for AnalysisResults {
    fn from(value: DiffusionResults) -> Self {
        AnalysisResults::Diffusion(value)
    }
}

impl From<HeatCapacityResults> for AnalysisResults {
    fn from(value: HeatCapacityResults) -> Self {
        AnalysisResults::HeatCapacity(value)
    }
}

impl From<MeltingResults> for AnalysisResults {
    fn from(value: MeltingResults) -> Self {
        AnalysisResults::Melting(value)
    }
}

/// Convert a path to string for the output tables.
#[inline(always)]
pub(crate) fn path_to_string(path: &Path) -> String {
    path.to_str()
        .map(str::to_owned)
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Errors that can be returned by the `ensfit` crate.

use std::path::Path;

use colored::{ColoredString, Colorize};
use thiserror::Error;

fn path_to_yellow(path: &Path) -> ColoredString {
    path.to_string_lossy().yellow()
}

/// Errors that can occur inside the application itself.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{}", .0)]
    Config(#[from] ConfigError),

    #[error("{}", .0)]
    Analysis(#[from] AnalysisError),

    #[error("{}", .0)]
    Write(#[from] WriteError),
}

/// Errors that can occur when reading and validating the analysis configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} could not open the configuration file '{}'", "error:".red().bold(), .0.yellow())]
    CouldNotOpenConfig(String),

    #[error("{} could not understand the contents of the configuration file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotParseConfig(String, serde_yaml::Error),

    #[error("{} invalid fit range: {}", "error:".red().bold(), .0.yellow())]
    InvalidFitRange(String),

    #[error("{} outlier multiplier must be positive and finite, not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidMultiplier(f64),

    #[error("{} outlier rejection requires at least '{}' runs per group for the selected fences, not '{}'", "error:".red().bold(), .1.to_string().yellow(), .0.to_string().yellow())]
    InvalidMinRuns(usize, usize),

    #[error("{} at least '2' points are required to fit a line, not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidMinPoints(usize),

    #[error("{} the common time axis must consist of at least '2' points, not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidResample(usize),

    #[error("{} could not compile regular expression '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    InvalidRegex(String, regex::Error),

    #[error("{} solid threshold ('{}') must be positive and lower than the melting threshold ('{}')", "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InvalidThresholds(f64, f64),

    #[error("{} number of phase clusters must be between '2' and '3', not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidClusters(usize),

    #[error("{} R^2 threshold must be in the interval (0, 1], not '{}'", "error:".red().bold(), .0.to_string().yellow())]
    InvalidR2Threshold(f64),

    #[error("{} '{}' must be positive and finite, not '{}'", "error:".red().bold(), .0.yellow(), .1.to_string().yellow())]
    InvalidPositive(String, f64),

    #[error("{} no input directories or files have been specified", "error:".red().bold())]
    NoInputs,
}

/// Errors that can occur when reading an xvg file.
#[derive(Error, Debug)]
pub enum ParseXvgError {
    #[error("{} could not open file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotOpen(Box<Path>),

    #[error("{} could not read line from file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotReadLine(Box<Path>),

    #[error("{} file '{}' contains no data", "error:".red().bold(), path_to_yellow(.0))]
    NoData(Box<Path>),

    #[error("{} time in file '{}' is not monotonic (time '{}' ps follows a later time)", "error:".red().bold(), path_to_yellow(.0), .1.to_string().yellow())]
    UnsortedTime(Box<Path>, f64),
}

/// Errors that can occur when extracting run identity from a path.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("{} path '{}' does not name an msd file ('<run>_msd_<element>.xvg')", "error:".red().bold(), path_to_yellow(.0))]
    NotMsdFile(Box<Path>),

    #[error("{} path '{}' contains no temperature directory ('<T>K')", "error:".red().bold(), path_to_yellow(.0))]
    NoTemperature(Box<Path>),

    #[error("{} path '{}' contains no run identifier ('T<T>.r<run>.gpu<gpu>')", "error:".red().bold(), path_to_yellow(.0))]
    NoRunId(Box<Path>),

    #[error("{} path '{}' is too shallow to contain a composition directory", "error:".red().bold(), path_to_yellow(.0))]
    TooShallow(Box<Path>),
}

/// Errors that can occur when reading a csv table.
#[derive(Error, Debug)]
pub enum ReadCsvError {
    #[error("{} could not open file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotOpen(Box<Path>),

    #[error("{} could not read csv file '{}' ({})", "error:".red().bold(), path_to_yellow(.0), .1)]
    Csv(Box<Path>, csv::Error),

    #[error("{} csv file '{}' has no column '{}'", "error:".red().bold(), path_to_yellow(.0), .1.yellow())]
    MissingColumn(Box<Path>, String),

    #[error("{} invalid file pattern '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    InvalidPattern(String, glob::PatternError),

    #[error("{} no file matches the pattern '{}'", "error:".red().bold(), .0.yellow())]
    NoMatch(String),
}

/// Errors that can occur while performing the analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{} none of the input directories exists ('{}')", "error:".red().bold(), .0.join("', '").yellow())]
    NoInputDirectory(Vec<String>),

    #[error("{} invalid file pattern '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    InvalidPattern(String, glob::PatternError),

    #[error("{}", .0)]
    Table(#[from] ReadCsvError),
}

/// Errors that can occur while writing the results.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{} could not create directory '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotCreateDirectory(Box<Path>),

    #[error("{} could not create file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotCreateFile(Box<Path>),

    #[error("{} could not create a backup for file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotBackupFile(Box<Path>),

    #[error("{} could not write results ({})", "error:".red().bold(), .0)]
    CouldNotWriteResults(std::io::Error),

    #[error("{} could not write csv table ({})", "error:".red().bold(), .0)]
    CouldNotWriteCsv(csv::Error),
}

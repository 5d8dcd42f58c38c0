// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Reading of GROMACS xvg files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::series::TimeSeries;
use crate::errors::ParseXvgError;
use crate::PANIC_MESSAGE;

/// Diffusion coefficient reported by `gmx msd`, e.g. `# D[  Pt] = 0.2585 (+/- 0.7552) (1e-5 cm^2/s)`.
static REPORTED_D: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"D\[\s*(\w+)\s*\]\s*=\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect(PANIC_MESSAGE)
});

/// Unit of the reported coefficient, e.g. `(1e-5 cm^2/s)`.
static REPORTED_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(1e([+-]?\d+)\s*cm").expect(PANIC_MESSAGE));

/// Exponent of the unit of the reported coefficient if not stated otherwise.
const DEFAULT_UNIT_EXPONENT: i32 = -5;

/// Extract the reported diffusion coefficient (in cm^2/s) from a header line.
pub(crate) fn parse_reported_coefficient(line: &str) -> Option<f64> {
    let captures = REPORTED_D.captures(line)?;
    let value: f64 = captures[2].parse().ok()?;

    let exponent = REPORTED_UNIT
        .captures(line)
        .and_then(|c| c[1].parse::<i32>().ok())
        .unwrap_or(DEFAULT_UNIT_EXPONENT);

    Some(value * 10f64.powi(exponent))
}

/// Read the first two columns of an xvg file as a time series.
///
/// Lines starting with `#` or `@` are treated as comments and empty lines are ignored.
/// Lines that do not start with two numbers are skipped.
/// Values of the second column are multiplied by `scale`.
/// The coefficient reported in the header (if any) is stored in the series.
pub fn read_xvg(path: impl AsRef<Path>, scale: f64) -> Result<TimeSeries, ParseXvgError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|_| ParseXvgError::CouldNotOpen(Box::from(path)))?;
    let reader = BufReader::new(file);

    let mut time = Vec::new();
    let mut values = Vec::new();
    let mut reported = None;

    for line in reader.lines() {
        let line = line.map_err(|_| ParseXvgError::CouldNotReadLine(Box::from(path)))?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with('@') {
            if reported.is_none() {
                reported = parse_reported_coefficient(trimmed);
            }
            continue;
        }

        let mut columns = trimmed.split_whitespace();
        let (Some(Ok(t)), Some(Ok(v))) = (
            columns.next().map(str::parse::<f64>),
            columns.next().map(str::parse::<f64>),
        ) else {
            log::debug!(
                "Skipping unparsable line '{}' in file '{}'.",
                trimmed,
                path.display()
            );
            continue;
        };

        if let Some(&last) = time.last() {
            if t < last {
                return Err(ParseXvgError::UnsortedTime(Box::from(path), t));
            }
        }

        time.push(t);
        values.push(v * scale);
    }

    if time.is_empty() {
        return Err(ParseXvgError::NoData(Box::from(path)));
    }

    Ok(TimeSeries::new(time, values).with_reported(reported))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn reported_coefficient() {
        let d =
            parse_reported_coefficient("# D[  Pt] = 0.2585 (+/- 0.7552) (1e-5 cm^2/s)").unwrap();
        assert_relative_eq!(d, 0.2585e-5);

        let d = parse_reported_coefficient("# D[Sn] = 1.5 (+/- 0.1) (1e-6 cm^2/s)").unwrap();
        assert_relative_eq!(d, 1.5e-6);

        let d = parse_reported_coefficient("# D[ O] = -0.02").unwrap();
        assert_relative_eq!(d, -0.02e-5);

        assert!(parse_reported_coefficient("@ title \"Mean Square Displacement\"").is_none());
    }

    #[test]
    fn read_basic() {
        let file = write_temp(
            "# gmx msd\n# D[  Pt] = 0.2585 (+/- 0.7552) (1e-5 cm^2/s)\n@ title \"MSD\"\n@ xaxis label \"Time (ps)\"\n\n0.0 0.0\n10.0 0.5\n20.0   1.0  7.0\n",
        );

        let series = read_xvg(file.path(), 100.0).unwrap();
        assert_eq!(series.len(), 3);
        assert_relative_eq!(series.time()[2], 20.0);
        assert_relative_eq!(series.values()[1], 50.0);
        assert_relative_eq!(series.values()[2], 100.0);
        assert_relative_eq!(series.reported().unwrap(), 0.2585e-5);
    }

    #[test]
    fn read_skips_garbage() {
        let file = write_temp("0.0 0.0\nnot a number\n5.0\n10.0 2.0\n");
        let series = read_xvg(file.path(), 1.0).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.reported().is_none());
    }

    #[test]
    fn read_no_data() {
        let file = write_temp("# only a header\n@ legend \"x\"\n");
        assert!(matches!(
            read_xvg(file.path(), 1.0),
            Err(ParseXvgError::NoData(_))
        ));
    }

    #[test]
    fn read_unsorted() {
        let file = write_temp("0.0 0.0\n10.0 1.0\n5.0 2.0\n");
        assert!(matches!(
            read_xvg(file.path(), 1.0),
            Err(ParseXvgError::UnsortedTime(_, _))
        ));
    }

    #[test]
    fn read_nonexistent() {
        assert!(matches!(
            read_xvg("nonexistent/msd.xvg", 1.0),
            Err(ParseXvgError::CouldNotOpen(_))
        ));
    }
}

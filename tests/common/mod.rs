// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Functions used in various integration tests.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Test utility. Write an msd curve of a single run in the usual directory layout
/// `root/sup/<composition>/<T>K/T<T>.r<run>.gpu0_msd_<element>.xvg`.
///
/// `values` are in Å^2 and are written in nm^2.
/// `reported` is the coefficient written into the header (in 1e-5 cm^2/s).
#[allow(dead_code)]
pub(super) fn write_msd(
    root: &Path,
    composition: &str,
    temperature: u32,
    run: u32,
    element: &str,
    values: &[(f64, f64)],
    reported: Option<f64>,
) -> PathBuf {
    let directory = root
        .join("sup")
        .join(composition)
        .join(format!("{}K", temperature));
    fs::create_dir_all(&directory).unwrap();

    let path = directory.join(format!(
        "T{}.r{}.gpu0_msd_{}.xvg",
        temperature, run, element
    ));
    let mut file = File::create(&path).unwrap();

    writeln!(file, "# This file was created by a test").unwrap();
    writeln!(file, "# gmx msd -type unused").unwrap();
    if let Some(d) = reported {
        writeln!(file, "# D[{:>4}] = {:.4} (+/- 0.0100) (1e-5 cm^2/s)", element, d).unwrap();
    }
    writeln!(file, "@    title \"Mean Square Displacement\"").unwrap();
    writeln!(file, "@    xaxis  label \"Time (ps)\"").unwrap();
    writeln!(file, "@    yaxis  label \"MSD (nm\\S2\\N)\"").unwrap();
    writeln!(file, "@TYPE xy").unwrap();

    for (t, v) in values {
        writeln!(file, "{:>10.3} {:>14.8}", t, v / 100.0).unwrap();
    }

    path
}

/// Test utility. Linear msd curve `slope * t + intercept` (in Å^2) sampled every `dt` ps up to `end`.
#[allow(dead_code)]
pub(super) fn linear_msd(slope: f64, intercept: f64, end: f64, dt: f64) -> Vec<(f64, f64)> {
    let n = (end / dt).round() as usize;
    (0..=n)
        .map(|i| {
            let t = i as f64 * dt;
            (t, slope * t + intercept)
        })
        .collect()
}

/// Test utility. Directory of a run as recorded in the energy and Lindemann tables.
#[allow(dead_code)]
pub(super) fn run_directory(root: &Path, structure: &str, temperature: u32, run: u32) -> String {
    root.join("sup")
        .join(structure)
        .join(format!("T{}.r{}.gpu0", temperature, run))
        .to_string_lossy()
        .into_owned()
}

/// Test utility. Write an energy table with the English headers.
/// Rows are `(structure, temperature, run, average energy)`.
#[allow(dead_code)]
pub(super) fn write_energy_table(
    root: &Path,
    name: &str,
    rows: &[(&str, u32, u32, f64)],
) -> PathBuf {
    let path = root.join(name);
    let mut file = File::create(&path).unwrap();

    writeln!(file, "structure,temp,run_num,avg_energy,std,full_path").unwrap();
    for &(structure, temperature, run, energy) in rows {
        writeln!(
            file,
            "{},{},{},{:.6},0.05,{}",
            structure,
            temperature,
            run,
            energy,
            run_directory(root, structure, temperature, run)
        )
        .unwrap();
    }

    path
}

/// Test utility. Write an energy table in the full English layout with 13 columns,
/// where `path` is relative and `full_path` is absolute.
/// Rows are `(structure, temperature, run, average energy)`.
#[allow(dead_code)]
pub(super) fn write_energy_master(
    root: &Path,
    name: &str,
    rows: &[(&str, u32, u32, f64)],
) -> PathBuf {
    let path = root.join(name);
    let mut file = File::create(&path).unwrap();

    writeln!(
        file,
        "path,structure,temp,run_num,total_steps,sample_steps,avg_energy,std,min,max,sample_interval,skip_steps,full_path"
    )
    .unwrap();
    for &(structure, temperature, run, energy) in rows {
        writeln!(
            file,
            "{}-best/T{}.r{}.gpu0,{},{},{},100000,90000,{:.6},0.05,{:.6},{:.6},10,10000,{}",
            structure,
            temperature,
            run,
            structure,
            temperature,
            run,
            energy,
            energy - 0.5,
            energy + 0.5,
            run_directory(root, structure, temperature, run)
        )
        .unwrap();
    }

    path
}

/// Test utility. Write a table of Lindemann indices.
/// Rows are `(structure, temperature, run, delta)`.
#[allow(dead_code)]
pub(super) fn write_lindemann_table(
    root: &Path,
    name: &str,
    rows: &[(&str, u32, u32, f64)],
) -> PathBuf {
    let path = root.join(name);
    let mut file = File::create(&path).unwrap();

    writeln!(file, "directory,structure,temp,delta").unwrap();
    for &(structure, temperature, run, delta) in rows {
        writeln!(
            file,
            "{},{},{},{:.6}",
            run_directory(root, structure, temperature, run),
            structure,
            temperature,
            delta
        )
        .unwrap();
    }

    path
}

/// Test utility. Read a csv output file into a header and rows of fields.
#[allow(dead_code)]
pub(super) fn read_csv(path: impl AsRef<Path>) -> (Vec<String>, Vec<Vec<String>>) {
    let reader = BufReader::new(File::open(path).unwrap());
    let mut lines = reader
        .lines()
        .map(|line| line.unwrap())
        .filter(|line| !line.starts_with('#'));

    let split = |line: String| -> Vec<String> { line.split(',').map(str::to_owned).collect() };

    let header = split(lines.next().unwrap());
    let rows = lines.map(split).collect();
    (header, rows)
}

/// Test utility. Get a field of a csv row by the name of the column.
#[allow(dead_code)]
pub(super) fn field<'a>(header: &[String], row: &'a [String], name: &str) -> &'a str {
    let index = header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("Column '{}' not found.", name));
    &row[index]
}

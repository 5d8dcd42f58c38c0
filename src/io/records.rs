// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Typed records read from csv tables produced by the simulation workflows.

use std::fs::File;
use std::path::{Path, PathBuf};

use getset::{CopyGetters, Getters};
use hashbrown::HashSet;
use indexmap::IndexMap;

use crate::errors::ReadCsvError;

use super::signature::RunKey;

/// Header marking the localized layout of the energy table.
const LOCALIZED_STRUCTURE_HEADER: &str = "结构";

/// Open a csv file and read its (trimmed) headers.
fn open_csv(path: &Path) -> Result<(csv::Reader<File>, Vec<String>), ReadCsvError> {
    let file = File::open(path).map_err(|_| ReadCsvError::CouldNotOpen(Box::from(path)))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| ReadCsvError::Csv(Box::from(path), e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect();

    Ok((reader, headers))
}

/// Find the index of a column. Names are tried in the order of preference.
fn column(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|n| headers.iter().position(|h| h.eq_ignore_ascii_case(n)))
}

/// Find the index of a mandatory column.
fn require(path: &Path, headers: &[String], names: &[&str]) -> Result<usize, ReadCsvError> {
    column(headers, names)
        .ok_or_else(|| ReadCsvError::MissingColumn(Box::from(path), names[0].to_owned()))
}

/// Parse temperature given either as a number or with a unit suffix (`700K`).
fn parse_temperature(text: &str) -> Option<u32> {
    let value: f64 = text.trim().trim_end_matches(['K', 'k']).trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u32)
    } else {
        None
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// Average energy of a single run.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct EnergyRecord {
    #[getset(get = "pub")]
    structure: String,
    /// Simulation temperature (in K).
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get_copy = "pub")]
    run: Option<u32>,
    /// Average potential energy of the run (in eV).
    #[getset(get_copy = "pub")]
    avg_energy: f64,
    /// Standard deviation of the energy during the run (in eV).
    #[getset(get_copy = "pub")]
    energy_std: f64,
    /// Path to the output of the run.
    #[getset(get = "pub")]
    path: String,
    /// Signature of the run (if it can be derived from the path).
    #[getset(get = "pub")]
    signature: Option<String>,
}

impl EnergyRecord {
    pub fn new(
        structure: &str,
        temperature: u32,
        run: Option<u32>,
        avg_energy: f64,
        energy_std: f64,
        path: &str,
    ) -> Self {
        EnergyRecord {
            structure: structure.to_owned(),
            temperature,
            run,
            avg_energy,
            energy_std,
            path: path.to_owned(),
            signature: RunKey::from_run_path(path)
                .ok()
                .and_then(|key| key.signature()),
        }
    }
}

/// Read the table of average energies of the individual runs.
///
/// Supports the English headers (`structure`, `temp`, `run_num`, `avg_energy`, `std`, `full_path`)
/// as well as the localized layout with 13 positional columns.
/// Rows that cannot be parsed are skipped.
pub fn read_energy_table(path: impl AsRef<Path>) -> Result<Vec<EnergyRecord>, ReadCsvError> {
    let path = path.as_ref();
    let (mut reader, headers) = open_csv(path)?;

    let (structure, temperature, run, energy, std, full_path) =
        if headers.iter().any(|h| h == LOCALIZED_STRUCTURE_HEADER) {
            (1, 2, Some(3), 6, Some(7), 12)
        } else {
            (
                require(path, &headers, &["structure"])?,
                require(path, &headers, &["temp", "temperature", "temp_K"])?,
                column(&headers, &["run_num", "run"]),
                require(path, &headers, &["avg_energy", "energy"])?,
                column(&headers, &["std", "energy_std"]),
                require(path, &headers, &["full_path", "path"])?,
            )
        };

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| ReadCsvError::Csv(Box::from(path), e))?;

        let parsed = (|| {
            Some(EnergyRecord::new(
                row.get(structure)?,
                parse_temperature(row.get(temperature)?)?,
                run.and_then(|i| row.get(i))
                    .and_then(|x| x.parse::<f64>().ok())
                    .map(|x| x as u32),
                parse_float(row.get(energy)?)?,
                std.and_then(|i| row.get(i))
                    .and_then(parse_float)
                    .unwrap_or(f64::NAN),
                row.get(full_path)?,
            ))
        })();

        match parsed {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!(
            "Skipped {} unparsable rows of energy table '{}'.",
            skipped,
            path.display()
        );
    }

    Ok(records)
}

/// Lindemann index of a single run at a single temperature.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct LindemannRecord {
    /// Directory of the run.
    #[getset(get = "pub")]
    directory: String,
    #[getset(get = "pub")]
    structure: String,
    /// Simulation temperature (in K).
    #[getset(get_copy = "pub")]
    temperature: u32,
    #[getset(get_copy = "pub")]
    delta: f64,
    /// Signature of the run (if it can be derived from the directory).
    #[getset(get = "pub")]
    signature: Option<String>,
}

impl LindemannRecord {
    pub fn new(directory: &str, structure: &str, temperature: u32, delta: f64) -> Self {
        LindemannRecord {
            directory: directory.to_owned(),
            structure: structure.to_owned(),
            temperature,
            delta,
            signature: RunKey::from_run_path(directory)
                .ok()
                .and_then(|key| key.signature()),
        }
    }
}

/// Read Lindemann indices from multiple tables.
///
/// Tables are read in the provided order. Records with the same directory, structure and temperature
/// are deduplicated, keeping the last occurrence. Rows that cannot be parsed are skipped.
pub fn read_lindemann_tables(
    paths: &[impl AsRef<Path>],
) -> Result<Vec<LindemannRecord>, ReadCsvError> {
    let mut unique: IndexMap<(String, String, u32), LindemannRecord> = IndexMap::new();

    for path in paths {
        let path = path.as_ref();
        let (mut reader, headers) = open_csv(path)?;

        let directory = require(path, &headers, &["目录", "directory", "dir"])?;
        let structure = require(path, &headers, &["结构", "structure"])?;
        let temperature = require(path, &headers, &["温度(K)", "temp", "temperature"])?;
        let delta = require(path, &headers, &["Lindemann指数", "delta", "lindemann"])?;

        let mut skipped = 0usize;
        for row in reader.records() {
            let row = row.map_err(|e| ReadCsvError::Csv(Box::from(path), e))?;

            let parsed = (|| {
                Some(LindemannRecord::new(
                    row.get(directory)?,
                    row.get(structure)?,
                    parse_temperature(row.get(temperature)?)?,
                    parse_float(row.get(delta)?).filter(|d| d.is_finite())?,
                ))
            })();

            match parsed {
                Some(record) => {
                    let key = (
                        record.directory.clone(),
                        record.structure.clone(),
                        record.temperature,
                    );
                    unique.insert(key, record);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} unparsable rows of Lindemann table '{}'.",
                skipped,
                path.display()
            );
        }
    }

    Ok(unique.into_values().collect())
}

/// Runs marked as outliers by the quality screening.
#[derive(Debug, Clone, Default)]
pub struct OutlierList {
    paths: HashSet<PathBuf>,
    signatures: HashSet<String>,
}

impl OutlierList {
    /// Read the list from a csv table with a `filepath` column and an optional `signature` column.
    /// If the signature is not provided, it is derived from the file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<OutlierList, ReadCsvError> {
        let path = path.as_ref();
        let (mut reader, headers) = open_csv(path)?;

        let filepath = require(path, &headers, &["filepath", "file_path", "path"])?;
        let signature = column(&headers, &["signature"]);

        let mut list = OutlierList::default();
        for row in reader.records() {
            let row = row.map_err(|e| ReadCsvError::Csv(Box::from(path), e))?;
            let Some(file) = row.get(filepath).filter(|x| !x.is_empty()) else {
                continue;
            };

            let sig = signature
                .and_then(|i| row.get(i))
                .filter(|x| !x.is_empty())
                .map(str::to_owned)
                .or_else(|| RunKey::from_msd_path(file).ok().and_then(|k| k.signature()))
                .or_else(|| RunKey::from_run_path(file).ok().and_then(|k| k.signature()));

            list.insert(file, sig);
        }

        Ok(list)
    }

    /// Add a run to the list.
    pub fn insert(&mut self, path: impl AsRef<Path>, signature: Option<String>) {
        let path = path.as_ref();
        if let Ok(canonical) = path.canonicalize() {
            self.paths.insert(canonical);
        }
        self.paths.insert(path.to_path_buf());

        if let Some(sig) = signature {
            self.signatures.insert(sig.to_lowercase());
        }
    }

    /// Is the file listed?
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.paths.contains(path)
            || path
                .canonicalize()
                .map(|c| self.paths.contains(&c))
                .unwrap_or(false)
    }

    /// Is the run with this signature listed?
    pub fn contains_signature(&self, signature: &str) -> bool {
        self.signatures.contains(&signature.to_lowercase())
    }

    /// Number of listed runs.
    pub fn n_signatures(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn temperature_parsing() {
        assert_eq!(parse_temperature("700"), Some(700));
        assert_eq!(parse_temperature("700.0"), Some(700));
        assert_eq!(parse_temperature(" 650K "), Some(650));
        assert_eq!(parse_temperature("hot"), None);
        assert_eq!(parse_temperature("-5"), None);
    }

    #[test]
    fn energy_table_english() {
        let file = write_temp(
            "path,structure,temp,run_num,total_steps,sample_steps,avg_energy,std,min,max,sample_interval,skip_steps,full_path\n\
             x,pt6sn8,700,1,1000,900,-1234.5,0.8,-1236,-1233,10,100,/sim/sup/pt6sn8/T700.r1.gpu0\n\
             x,pt6sn8,broken,1,1000,900,-1234.5,0.8,-1236,-1233,10,100,/sim/sup/pt6sn8/T700.r1.gpu0\n\
             x,sup-1,800,2,1000,900,-5000.25,1.1,-5002,-4999,10,100,/sim/sup/sup-1/T800.r2.gpu1\n",
        );

        let records = read_energy_table(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].structure(), "pt6sn8");
        assert_eq!(records[0].temperature(), 700);
        assert_eq!(records[0].run(), Some(1));
        assert_relative_eq!(records[0].avg_energy(), -1234.5);
        assert_relative_eq!(records[0].energy_std(), 0.8);
        assert_eq!(
            records[0].signature().as_deref(),
            Some("sup/pt6sn8/t700.r1.gpu0")
        );
        assert_eq!(records[1].temperature(), 800);
    }

    #[test]
    fn column_preference() {
        let headers: Vec<String> = ["path", "structure", "full_path"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(column(&headers, &["full_path", "path"]), Some(2));
        assert_eq!(column(&headers, &["file_path", "path"]), Some(0));
        assert_eq!(column(&headers, &["STRUCTURE"]), Some(1));
        assert_eq!(column(&headers, &["temp"]), None);
    }

    #[test]
    fn energy_table_full_path_over_relative() {
        let file = write_temp(
            "path,structure,temp,run_num,total_steps,sample_steps,avg_energy,std,min,max,sample_interval,skip_steps,full_path\n\
             pt8sn8-1-best/T900.r15.gpu0,pt8sn8,900,15,1000,900,-1500.0,0.7,-1502,-1498,10,100,/home/x/run3/sup/pt8sn8/T900.r15.gpu0\n",
        );

        let records = read_energy_table(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path(), "/home/x/run3/sup/pt8sn8/T900.r15.gpu0");
        assert_eq!(
            records[0].signature().as_deref(),
            Some("run3/sup/pt8sn8/t900.r15.gpu0")
        );
    }

    #[test]
    fn energy_table_localized() {
        let file = write_temp(
            "路径,结构,温度,运行,总步数,采样步数,平均能量,标准差,最小,最大,采样间隔,跳过步数,完整路径\n\
             x,Cv-1,600,3,1000,900,-777.0,0.5,-778,-776,10,100,/sim/base/Cv-1/T600.r3.gpu2\n",
        );

        let records = read_energy_table(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].structure(), "Cv-1");
        assert_eq!(records[0].temperature(), 600);
        assert_relative_eq!(records[0].avg_energy(), -777.0);
        assert_eq!(
            records[0].signature().as_deref(),
            Some("base/cv-1/t600.r3.gpu2")
        );
    }

    #[test]
    fn energy_table_missing_column() {
        let file = write_temp("structure,temp\npt6sn8,700\n");
        assert!(matches!(
            read_energy_table(file.path()),
            Err(ReadCsvError::MissingColumn(_, _))
        ));
    }

    #[test]
    fn lindemann_tables_dedup() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("lindemann_master_run_1.csv");
        let second = dir.path().join("lindemann_master_run_2.csv");

        std::fs::write(
            &first,
            "目录,结构,温度(K),Lindemann指数\n\
             /sim/sup/pt6sn8/T700.r1.gpu0,pt6sn8,700,0.05\n\
             /sim/sup/pt6sn8/T900.r1.gpu0,pt6sn8,900,0.20\n",
        )
        .unwrap();
        std::fs::write(
            &second,
            "directory,structure,temp,delta\n\
             /sim/sup/pt6sn8/T700.r1.gpu0,pt6sn8,700,0.07\n\
             /sim/sup/pt6sn8/T800.r1.gpu0,pt6sn8,800,nan\n",
        )
        .unwrap();

        let records = read_lindemann_tables(&[&first, &second]).unwrap();
        assert_eq!(records.len(), 2);

        let at_700 = records.iter().find(|r| r.temperature() == 700).unwrap();
        assert_relative_eq!(at_700.delta(), 0.07);
        assert_eq!(
            at_700.signature().as_deref(),
            Some("sup/pt6sn8/t700.r1.gpu0")
        );
    }

    #[test]
    fn outlier_list() {
        let file = write_temp(
            "group,filepath,signature,reason\n\
             a,data/sup/pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg,,IQR_outlier\n\
             b,data/sup/pt6sn8/700K/T700.r2.gpu0_msd_Pt.xvg,custom/sig,bad_simulation\n",
        );

        let list = OutlierList::from_file(file.path()).unwrap();
        assert!(list.contains_path("data/sup/pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg"));
        assert!(!list.contains_path("data/sup/pt6sn8/700K/T700.r3.gpu0_msd_Pt.xvg"));
        assert!(list.contains_signature("sup/pt6sn8/t700.r1.gpu0"));
        assert!(list.contains_signature("CUSTOM/sig"));
        assert_eq!(list.n_signatures(), 2);
        assert!(!list.is_empty());
    }

    #[test]
    fn outlier_list_nonexistent() {
        assert!(matches!(
            OutlierList::from_file("nonexistent.csv"),
            Err(ReadCsvError::CouldNotOpen(_))
        ));
    }
}

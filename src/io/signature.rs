// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Identification of simulation runs from the paths of their output files.
//!
//! Outputs of the simulations are organized as
//! ```text
//! … [BATCH/] PARENT/COMPOSITION/<T>K/T<T>.r<RUN>.gpu<GPU>_msd_<ELEMENT>.xvg
//! … [BATCH/] PARENT/COMPOSITION/T<T>.r<RUN>.gpu<GPU>[/…]
//! ```
//! where `BATCH` is a directory named `run<N>` located up to three levels above `PARENT`.
//! The signature `[batch/]parent/composition/t<T>.r<RUN>.gpu<GPU>` (lowercase) identifies
//! a single run across all output files (msd curves, energies, Lindemann indices).

use std::fmt::Display;
use std::path::Path;

use getset::{CopyGetters, Getters};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SignatureError;
use crate::PANIC_MESSAGE;

static RUN_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)T(\d+)\.r(\d+)\.gpu(\d+)").expect(PANIC_MESSAGE));
static MSD_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*)_msd_(\w+)\.xvg$").expect(PANIC_MESSAGE));
static TEMPERATURE_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)K$").expect(PANIC_MESSAGE));
static BATCH_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^run\d+$").expect(PANIC_MESSAGE));

/// How many directories above the parent directory are searched for a batch directory.
const BATCH_SEARCH_DEPTH: usize = 3;

/// Identity of a single simulation run (and optionally of an element analyzed in it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct RunKey {
    /// Name of the simulated system.
    #[getset(get = "pub")]
    composition: String,
    /// Simulation temperature (in K).
    #[getset(get_copy = "pub")]
    temperature: u32,
    /// Run identifier in its canonical (lowercase) form, e.g. `t700.r3.gpu0`.
    #[getset(get = "pub")]
    run_id: Option<String>,
    /// Replica number.
    #[getset(get_copy = "pub")]
    run: Option<u32>,
    /// Number of the GPU the run was performed on.
    #[getset(get_copy = "pub")]
    gpu: Option<u32>,
    /// Element the file refers to (msd files only).
    #[getset(get = "pub")]
    element: Option<String>,
    /// Directory containing the composition directory.
    #[getset(get = "pub")]
    parent: Option<String>,
    /// Batch directory (`run<N>`).
    #[getset(get = "pub")]
    batch: Option<String>,
}

/// Normal components of a path as strings.
fn components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(x) => Some(x.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Parse run identifier into (canonical id, temperature, run, gpu).
fn parse_run_id(text: &str) -> Option<(String, u32, u32, u32)> {
    let captures = RUN_ID.captures(text)?;
    Some((
        captures[0].to_lowercase(),
        captures[1].parse().ok()?,
        captures[2].parse().ok()?,
        captures[3].parse().ok()?,
    ))
}

/// Locate the parent and batch directories given the index of the composition directory.
fn locate_ancestors(dirs: &[String], composition_index: usize) -> (Option<String>, Option<String>) {
    let Some(parent_index) = composition_index.checked_sub(1) else {
        return (None, None);
    };

    let batch = (1..=BATCH_SEARCH_DEPTH)
        .filter_map(|level| parent_index.checked_sub(level))
        .map(|i| &dirs[i])
        .find(|dir| BATCH_DIR.is_match(dir))
        .cloned();

    (Some(dirs[parent_index].clone()), batch)
}

impl RunKey {
    /// Identify the run from the path to an msd file.
    ///
    /// Temperature is taken from the nearest `<T>K` directory; the directory above it names
    /// the composition. Files whose names contain no run identifier are accepted
    /// but the resulting key carries no run identity and no signature.
    pub fn from_msd_path(path: impl AsRef<Path>) -> Result<RunKey, SignatureError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .ok_or_else(|| SignatureError::NotMsdFile(Box::from(path)))?;

        let captures = MSD_FILE
            .captures(&file_name)
            .ok_or_else(|| SignatureError::NotMsdFile(Box::from(path)))?;
        let stem = captures[1].to_owned();
        let element = captures[2].to_owned();

        let mut dirs = components(path);
        dirs.pop();

        let (key_index, temperature) = dirs
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, dir)| {
                TEMPERATURE_DIR
                    .captures(dir)
                    .and_then(|c| c[1].parse::<u32>().ok())
                    .map(|t| (i, t))
            })
            .ok_or_else(|| SignatureError::NoTemperature(Box::from(path)))?;

        let composition_index = key_index
            .checked_sub(1)
            .ok_or_else(|| SignatureError::TooShallow(Box::from(path)))?;
        let (parent, batch) = locate_ancestors(&dirs, composition_index);

        let run_info = parse_run_id(&stem);

        Ok(RunKey {
            composition: dirs[composition_index].clone(),
            temperature,
            run_id: run_info.as_ref().map(|(id, _, _, _)| id.clone()),
            run: run_info.as_ref().map(|&(_, _, run, _)| run),
            gpu: run_info.as_ref().map(|&(_, _, _, gpu)| gpu),
            element: Some(element),
            parent,
            batch,
        })
    }

    /// Identify the run from a path to a run directory (or any path inside it).
    ///
    /// The deepest path component containing a run identifier is the run directory;
    /// the directory above it names the composition. Temperature is taken from the run identifier.
    pub fn from_run_path(path: impl AsRef<Path>) -> Result<RunKey, SignatureError> {
        let path = path.as_ref();
        let dirs = components(path);

        let (key_index, (run_id, temperature, run, gpu)) = dirs
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, dir)| parse_run_id(dir).map(|info| (i, info)))
            .ok_or_else(|| SignatureError::NoRunId(Box::from(path)))?;

        let composition_index = key_index
            .checked_sub(1)
            .ok_or_else(|| SignatureError::TooShallow(Box::from(path)))?;
        let (parent, batch) = locate_ancestors(&dirs, composition_index);

        Ok(RunKey {
            composition: dirs[composition_index].clone(),
            temperature,
            run_id: Some(run_id),
            run: Some(run),
            gpu: Some(gpu),
            element: None,
            parent,
            batch,
        })
    }

    /// Signature identifying the run across all its output files.
    /// `None` if the run identifier is unknown.
    pub fn signature(&self) -> Option<String> {
        let run_id = self.run_id.as_ref()?;

        let Some(parent) = &self.parent else {
            return Some(run_id.clone());
        };

        let mut signature = String::new();
        if let Some(batch) = &self.batch {
            signature.push_str(batch);
            signature.push('/');
        }
        signature.push_str(&format!("{}/{}/{}", parent, self.composition, run_id));

        Some(signature.to_lowercase())
    }

    /// Key of the simulation the run belongs to, ignoring the analyzed element.
    pub fn simulation(&self) -> RunKey {
        RunKey {
            element: None,
            ..self.clone()
        }
    }
}

impl Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} K", self.composition, self.temperature)?;
        if let Some(id) = &self.run_id {
            write!(f, " {}", id)?;
        }
        if let Some(element) = &self.element {
            write!(f, " [{}]", element)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msd_path_full() {
        let key = RunKey::from_msd_path(
            "/data/run3/campaign/sup/pt6sn8/700K/T700.r2.gpu1_msd_Pt.xvg",
        )
        .unwrap();

        assert_eq!(key.composition(), "pt6sn8");
        assert_eq!(key.temperature(), 700);
        assert_eq!(key.run(), Some(2));
        assert_eq!(key.gpu(), Some(1));
        assert_eq!(key.element().as_deref(), Some("Pt"));
        assert_eq!(key.parent().as_deref(), Some("sup"));
        assert_eq!(key.batch().as_deref(), Some("run3"));
        assert_eq!(
            key.signature().unwrap(),
            "run3/sup/pt6sn8/t700.r2.gpu1"
        );
    }

    #[test]
    fn msd_path_without_batch() {
        let key = RunKey::from_msd_path("results/Cv-2/900K/T900.r0.gpu0_msd_Sn.xvg").unwrap();
        assert_eq!(key.composition(), "Cv-2");
        assert_eq!(key.temperature(), 900);
        assert!(key.batch().is_none());
        assert_eq!(key.signature().unwrap(), "results/cv-2/t900.r0.gpu0");
    }

    #[test]
    fn msd_path_batch_too_deep() {
        let key = RunKey::from_msd_path("run2/a/b/c/d/pt8sn2/500K/T500.r1.gpu0_msd_O.xvg").unwrap();
        assert!(key.batch().is_none());
        assert_eq!(key.parent().as_deref(), Some("d"));
    }

    #[test]
    fn msd_path_without_run_id() {
        let key = RunKey::from_msd_path("data/pt6sn8/700K/average_msd_Pt.xvg").unwrap();
        assert_eq!(key.temperature(), 700);
        assert!(key.run().is_none());
        assert!(key.signature().is_none());
    }

    #[test]
    fn msd_path_shallow() {
        let key = RunKey::from_msd_path("pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg").unwrap();
        assert!(key.parent().is_none());
        assert_eq!(key.signature().unwrap(), "t700.r1.gpu0");

        assert!(matches!(
            RunKey::from_msd_path("700K/T700.r1.gpu0_msd_Pt.xvg"),
            Err(SignatureError::TooShallow(_))
        ));
    }

    #[test]
    fn msd_path_invalid() {
        assert!(matches!(
            RunKey::from_msd_path("data/pt6sn8/700K/energy.xvg"),
            Err(SignatureError::NotMsdFile(_))
        ));
        assert!(matches!(
            RunKey::from_msd_path("data/pt6sn8/T700.r1.gpu0_msd_Pt.xvg"),
            Err(SignatureError::NoTemperature(_))
        ));
    }

    #[test]
    fn run_path() {
        let key = RunKey::from_run_path("/lammps/run4/campaign/sup/pt6sn8/T700.r2.gpu1/log.lammps")
            .unwrap();
        assert_eq!(key.composition(), "pt6sn8");
        assert_eq!(key.temperature(), 700);
        assert_eq!(key.run(), Some(2));
        assert!(key.element().is_none());
        assert_eq!(
            key.signature().unwrap(),
            "run4/sup/pt6sn8/t700.r2.gpu1"
        );
    }

    #[test]
    fn run_path_matches_msd_path() {
        let msd = RunKey::from_msd_path("gromacs/sup/pt6sn8/700K/T700.r2.gpu1_msd_Sn.xvg").unwrap();
        let run = RunKey::from_run_path("lammps/sup/pt6sn8/T700.r2.GPU1").unwrap();
        assert_eq!(msd.signature(), run.signature());
        assert_eq!(msd.simulation().element(), &None);
    }

    #[test]
    fn run_path_invalid() {
        assert!(matches!(
            RunKey::from_run_path("lammps/sup/pt6sn8/700K"),
            Err(SignatureError::NoRunId(_))
        ));
        assert!(matches!(
            RunKey::from_run_path("T700.r2.gpu1"),
            Err(SignatureError::TooShallow(_))
        ));
    }

    #[test]
    fn display() {
        let key = RunKey::from_msd_path("a/pt6sn8/700K/T700.r2.gpu1_msd_Pt.xvg").unwrap();
        assert_eq!(key.to_string(), "pt6sn8 700 K t700.r2.gpu1 [Pt]");
    }
}

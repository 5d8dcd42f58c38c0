// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Locating input files.

use std::path::{Path, PathBuf};

use glob::Pattern;
use hashbrown::HashSet;

use crate::errors::{AnalysisError, ReadCsvError};

/// Recursively find files matching `pattern` (e.g. `*_msd_*.xvg`) in all input directories.
///
/// Directories that do not exist are reported and skipped; it is an error if none of them exists.
/// Files reachable from several input directories are reported only once.
/// The returned paths are sorted.
pub fn discover_files(
    inputs: &[impl AsRef<Path>],
    pattern: &str,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut existing = Vec::new();
    for dir in inputs {
        if dir.as_ref().is_dir() {
            existing.push(dir.as_ref());
        } else {
            log::warn!(
                "Input directory '{}' does not exist. Skipping.",
                dir.as_ref().display()
            );
        }
    }

    if existing.is_empty() {
        return Err(AnalysisError::NoInputDirectory(
            inputs
                .iter()
                .map(|x| x.as_ref().display().to_string())
                .collect(),
        ));
    }

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for dir in existing {
        let full_pattern = format!(
            "{}/**/{}",
            Pattern::escape(&dir.to_string_lossy()),
            pattern
        );

        let entries = glob::glob(&full_pattern)
            .map_err(|e| AnalysisError::InvalidPattern(full_pattern.clone(), e))?;

        for path in entries.filter_map(Result::ok).filter(|p| p.is_file()) {
            let identity = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(identity) {
                files.push(path);
            }
        }
    }

    files.sort();
    log::info!("Found {} files matching '{}'.", files.len(), pattern);
    Ok(files)
}

/// Expand glob patterns into a sorted list of files. Duplicate files are listed once.
/// It is an error if a pattern is invalid or if no file matches any of the patterns.
pub fn expand_patterns(patterns: &[impl AsRef<str>]) -> Result<Vec<PathBuf>, ReadCsvError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        let entries = glob::glob(pattern)
            .map_err(|e| ReadCsvError::InvalidPattern(pattern.to_owned(), e))?;

        for path in entries.filter_map(Result::ok).filter(|p| p.is_file()) {
            let identity = path.canonicalize().unwrap_or_else(|_| path.clone());
            if seen.insert(identity) {
                files.push(path);
            }
        }
    }

    if files.is_empty() {
        let joined: Vec<&str> = patterns.iter().map(|p| p.as_ref()).collect();
        return Err(ReadCsvError::NoMatch(joined.join(", ")));
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "0 0\n").unwrap();
    }

    #[test]
    fn discover_recursive() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg"));
        touch(&dir.path().join("a/pt6sn8/700K/T700.r1.gpu0_msd_Sn.xvg"));
        touch(&dir.path().join("b/cv/800K/T800.r1.gpu0_msd_O.xvg"));
        touch(&dir.path().join("b/cv/800K/energy.xvg"));

        let files = discover_files(&[dir.path()], "*_msd_*.xvg").unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn discover_overlapping_inputs() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg"));

        let files =
            discover_files(&[dir.path().to_path_buf(), dir.path().join("a")], "*_msd_*.xvg")
                .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn discover_missing_directories() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg"));

        let files = discover_files(
            &[dir.path().join("nonexistent"), dir.path().to_path_buf()],
            "*_msd_*.xvg",
        )
        .unwrap();
        assert_eq!(files.len(), 1);

        assert!(matches!(
            discover_files(&["nonexistent_1", "nonexistent_2"], "*.xvg"),
            Err(AnalysisError::NoInputDirectory(_))
        ));
    }

    #[test]
    fn expand() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("lindemann_master_run_2.csv"));
        touch(&dir.path().join("lindemann_master_run_1.csv"));
        touch(&dir.path().join("other.csv"));

        let pattern = format!("{}/lindemann_master_run_*.csv", dir.path().display());
        let files = expand_patterns(&[pattern.as_str(), pattern.as_str()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("lindemann_master_run_1.csv"));

        let missing = format!("{}/nothing_*.csv", dir.path().display());
        assert!(matches!(
            expand_patterns(&[missing]),
            Err(ReadCsvError::NoMatch(_))
        ));
    }
}

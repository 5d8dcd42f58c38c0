// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains the implementation of the analysis logic.

use colored::Colorize;

use crate::errors::AnalysisError;
use crate::io::OutlierList;
use crate::presentation::AnalysisResults;
use crate::{Analysis, AnalysisType};

pub(crate) mod clustering;
mod diffusion;
pub mod ensemble;
mod heat_capacity;
mod melting;
pub mod regression;
mod screening;
pub mod series;
pub mod statistics;

impl Analysis {
    /// Perform the analysis.
    ///
    /// The results are returned and not written; use `AnalysisResults::write` to save them.
    pub fn run(&self) -> Result<AnalysisResults, AnalysisError> {
        match self.analysis_type() {
            AnalysisType::Screening(params) => {
                screening::screen_runs(self, params).map(AnalysisResults::from)
            }
            AnalysisType::Diffusion(params) => {
                diffusion::calculate_diffusion(self, params).map(AnalysisResults::from)
            }
            AnalysisType::HeatCapacity(params) => {
                heat_capacity::calculate_heat_capacity(self, params).map(AnalysisResults::from)
            }
            AnalysisType::Melting(params) => {
                melting::estimate_melting(self, params).map(AnalysisResults::from)
            }
        }
    }
}

/// Read the list of outlier runs.
/// Returns an empty list if no file is provided or if the lists should be ignored.
pub(super) fn read_outlier_list(
    path: Option<&str>,
    no_filter: bool,
) -> Result<OutlierList, AnalysisError> {
    match (path, no_filter) {
        (Some(path), false) => {
            let list = OutlierList::from_file(path)?;
            log::info!(
                "Read {} outlier runs from '{}'.",
                list.n_signatures(),
                path.cyan()
            );
            Ok(list)
        }
        (Some(path), true) => {
            log::info!("Ignoring the list of outlier runs '{}'.", path.yellow());
            Ok(OutlierList::default())
        }
        (None, _) => Ok(OutlierList::default()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn outlier_list_ignored() {
        let list = read_outlier_list(Some("nonexistent.csv"), true).unwrap();
        assert!(list.is_empty());

        let list = read_outlier_list(None, false).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn outlier_list_read() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "filepath,signature").unwrap();
        writeln!(
            file,
            "/data/sup/pt6sn8/700K/T700.r1.gpu0_msd_Pt.xvg,sup/pt6sn8/t700.r1.gpu0"
        )
        .unwrap();
        file.flush().unwrap();

        let list = read_outlier_list(file.path().to_str(), false).unwrap();
        assert!(list.contains_signature("sup/pt6sn8/t700.r1.gpu0"));
    }

    #[test]
    fn outlier_list_missing() {
        assert!(matches!(
            read_outlier_list(Some("nonexistent.csv"), false),
            Err(AnalysisError::Table(_))
        ));
    }
}

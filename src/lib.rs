// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! # ensfit: Ensemble observables from Pt-Sn(-O) cluster simulations
//!
//! Crate for extracting transport and thermal observables from many independent
//! molecular dynamics runs of supported and gas-phase Pt-Sn(-O) clusters.
//!
//! `ensfit` can
//! - screen individual runs and produce a list of outlier runs,
//! - calculate diffusion coefficients by fitting the ensemble-averaged msd curve of all runs
//!   (instead of averaging diffusion coefficients fitted to individual runs),
//! - calculate heat capacities of solid, pre-melting and liquid regions from average energies,
//! - estimate melting temperatures from Lindemann indices using three independent methods.
//!
//! ## Usage
//!
//! Import the crate in your Rust code:
//!
//! ```rust
//! use ensfit::prelude::*;
//! ```
//!
//! `ensfit` is also available as a command line tool reading a yaml configuration file:
//! ```bash
//! $ ensfit analysis.yaml
//! ```
//!
//! ## Examples
//!
//! Ensemble diffusion coefficients from msd files.
//! ```no_run
//! use ensfit::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // construct the analysis
//!     let analysis = Analysis::new()
//!             .output_directory("results")              // directory for the output files
//!             .analysis_type(DiffusionParams::new()     // analysis to perform
//!                 .input("msd_data")                    // directory with msd files
//!                 .fit_range(FitRange::time(100.0, 900.0)) // fit window (in ps)
//!                 .build()?
//!             )
//!             .build()?;                                // constructing the analysis
//!
//!     // activate colog if you want logging (requires the `colog` crate)
//!     colog::init();
//!
//!     // run the analysis and write the output
//!     let results = analysis.run()?;
//!     results.write(analysis.output_directory(), analysis.overwrite())?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ***
//!
//! Melting temperatures of selected systems.
//! ```no_run
//! use ensfit::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let analysis = Analysis::new()
//!             .analysis_type(MeltingParams::new()
//!                 .lindemann(vec!["lindemann/*.csv".to_owned()]) // tables with Lindemann indices
//!                 .threshold(0.1)                                 // Lindemann criterion
//!                 .build()?
//!             )
//!             .filter(SystemFilter::new(&["pt6sn8", "pt8sn4"], &["sup"])?) // analyze only these systems
//!             .build()?;
//!
//!     let results = analysis.run()?;
//!     if let AnalysisResults::Melting(melting) = &results {
//!         for row in melting.rows() {
//!             println!("{}: {:?}", row.structure(), row.tm_threshold());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Version of the `ensfit` crate.
pub const ENSFIT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Message that should be added to every panic.
pub(crate) const PANIC_MESSAGE: &str =
    "\n\n\n            >>> THIS SHOULD NOT HAVE HAPPENED! PLEASE REPORT THIS ERROR <<<
(open an issue at 'github.com/Ladme/ensfit/issues' or write an e-mail to 'ladmeb@gmail.com')\n\n";

pub mod analysis;
pub mod composition;
pub mod errors;
pub mod input;
pub mod io;
pub mod presentation;
pub mod table;

pub use input::{Analysis, AnalysisType};

/// This module contains re-exported public structures of the `ensfit` crate.
pub mod prelude {
    pub use super::input::{
        analysis::AnalysisBuilder, Analysis, AnalysisType, DiffusionParams, Fences, FitRange,
        HeatCapacityParams, MeltingParams, OutlierMethod, OutlierRejection, Partitioning,
        RunStatistic, ScreeningParams, SystemFilter,
    };

    pub use super::analysis::{
        ensemble::{EnsembleEstimator, EnsembleFit},
        regression::LinearFit,
        series::TimeSeries,
    };

    pub use super::composition::{Composition, StructureClass, SystemSeries};

    pub use super::io::{OutlierList, RunKey};

    pub use super::presentation::{
        AnalysisResults, DiffusionResults, DiffusionRow, HeatCapacityResults, MeltingResults,
        MeltingRow, Phase, Region, RegionFit, RunQuality, ScreeningResults,
    };
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains structures and methods for specifying parameters of the analysis.

pub mod analysis;
pub mod diffusion;
pub mod filter;
pub mod fit_range;
pub mod heat_capacity;
pub mod melting;
pub mod outliers;
pub mod screening;

pub use analysis::{Analysis, AnalysisType};
pub use diffusion::DiffusionParams;
pub use filter::SystemFilter;
pub use fit_range::FitRange;
pub use heat_capacity::{HeatCapacityParams, Partitioning};
pub use melting::MeltingParams;
pub use outliers::{Fences, OutlierMethod, OutlierRejection, RunStatistic};
pub use screening::ScreeningParams;

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains functions for locating and reading the input files.

pub mod discover;
pub mod records;
pub mod signature;
pub mod xvg;

pub use discover::{discover_files, expand_patterns};
pub use records::{
    read_energy_table, read_lindemann_tables, EnergyRecord, LindemannRecord, OutlierList,
};
pub use signature::RunKey;
pub use xvg::read_xvg;

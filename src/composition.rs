// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Compositions and classification of simulated Pt-Sn(-O) systems based on their names.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum_macros::Display;

use crate::PANIC_MESSAGE;

static REPLICA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)(cv)-\d+$").expect(PANIC_MESSAGE));
static CV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^cv(?:-\d+)?$").expect(PANIC_MESSAGE));
static AIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^air(\d)(\d)$").expect(PANIC_MESSAGE));
static PT: Lazy<Regex> = Lazy::new(|| Regex::new(r"pt\s*(\d+)").expect(PANIC_MESSAGE));
static SN: Lazy<Regex> = Lazy::new(|| Regex::new(r"sn\s*(\d+)").expect(PANIC_MESSAGE));
static O: Lazy<Regex> = Lazy::new(|| Regex::new(r"o\s*(\d+)").expect(PANIC_MESSAGE));

static PT8_SNX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^pt8sn\d+(?:$|[^a-z0-9])").expect(PANIC_MESSAGE));
static PT6_SNX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^pt6sn\d+(?:$|[^a-z0-9])").expect(PANIC_MESSAGE));
static PT6: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pt6(?:$|[^a-z0-9])").expect(PANIC_MESSAGE));
static PTX_SNY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^pt\d+sn\d+(?:$|[^a-z0-9])").expect(PANIC_MESSAGE));
static PTX_SNY_OZ: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pt\d+sn\d+o\d+").expect(PANIC_MESSAGE));

/// Composition of the `Cv` reference system (and all its replicas).
const CV_COMPOSITION: Composition = Composition { pt: 6, sn: 8, o: 4 };

/// Get the base name of a system. Replicas `Cv-1`, `Cv-2`, ... are merged into `Cv`.
/// Any other name is returned unchanged.
pub fn base_system(name: &str) -> &str {
    match REPLICA.captures(name).and_then(|c| c.get(1)) {
        Some(base) => base.as_str(),
        None => name,
    }
}

/// Number of atoms of each element in a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Composition {
    pub pt: u32,
    pub sn: u32,
    pub o: u32,
}

impl Composition {
    /// Parse the composition of a cluster from the name of its system.
    /// Returns `None` if the name contains neither platinum nor tin.
    pub fn parse(name: &str) -> Option<Composition> {
        let name = name.trim().to_lowercase();

        if CV.is_match(&name) {
            return Some(CV_COMPOSITION);
        }

        if let Some(captures) = AIR.captures(&name) {
            return Some(Composition {
                pt: captures[1].parse().ok()?,
                sn: captures[2].parse().ok()?,
                o: 0,
            });
        }

        let count = |regex: &Regex| -> u32 {
            regex
                .captures(&name)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(0)
        };

        let composition = Composition {
            pt: count(&PT),
            sn: count(&SN),
            o: count(&O),
        };

        if composition.pt == 0 && composition.sn == 0 {
            None
        } else {
            Some(composition)
        }
    }

    /// Total number of atoms of the cluster.
    #[inline(always)]
    pub fn total_atoms(&self) -> u32 {
        self.pt + self.sn + self.o
    }

    /// Fraction of tin among the metal atoms.
    pub fn sn_fraction(&self) -> f64 {
        self.sn as f64 / (self.pt + self.sn) as f64
    }

    /// Ratio of platinum to tin. `None` if the cluster contains no tin.
    pub fn pt_sn_ratio(&self) -> Option<f64> {
        if self.sn == 0 {
            None
        } else {
            Some(self.pt as f64 / self.sn as f64)
        }
    }
}

impl Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pt{}Sn{}", self.pt, self.sn)?;
        if self.o > 0 {
            write!(f, "O{}", self.o)?;
        }
        Ok(())
    }
}

/// Environment of the simulated cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum StructureClass {
    /// Cluster in vacuum.
    #[serde(rename = "gas-phase")]
    #[strum(serialize = "gas-phase")]
    Air,
    /// Supported cluster containing oxygen.
    #[serde(rename = "oxide")]
    #[strum(serialize = "oxide")]
    Oxide,
    /// Supported metallic cluster.
    #[serde(rename = "supported")]
    #[strum(serialize = "supported")]
    Supported,
}

impl StructureClass {
    /// Classify a system from its name and composition.
    pub fn classify(name: &str, composition: &Composition) -> StructureClass {
        if name.trim().to_lowercase().starts_with("air") {
            StructureClass::Air
        } else if composition.o > 0 {
            StructureClass::Oxide
        } else {
            StructureClass::Supported
        }
    }
}

/// Family of systems used to organize the heat capacity results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
pub enum SystemSeries {
    #[strum(serialize = "Cv")]
    Cv,
    #[strum(serialize = "Pt8SnX")]
    Pt8SnX,
    #[strum(serialize = "Pt6SnX")]
    Pt6SnX,
    #[strum(serialize = "Pt6")]
    Pt6,
    #[strum(serialize = "PtxSny")]
    PtxSny,
    #[strum(serialize = "PtxSnyOz")]
    PtxSnyOz,
    #[strum(serialize = "Other")]
    Other,
}

impl SystemSeries {
    /// Detect the series of a system and its identifier.
    /// All replicas of `Cv` share the identifier `Cv`.
    pub fn detect(name: &str) -> (SystemSeries, String) {
        let lower = name.trim().to_lowercase();

        if CV.is_match(&lower) {
            return (SystemSeries::Cv, String::from("Cv"));
        }

        let series = if PT8_SNX.is_match(&lower) {
            SystemSeries::Pt8SnX
        } else if PT6_SNX.is_match(&lower) {
            SystemSeries::Pt6SnX
        } else if PT6.is_match(&lower) {
            SystemSeries::Pt6
        } else if PTX_SNY.is_match(&lower) {
            SystemSeries::PtxSny
        } else if PTX_SNY_OZ.is_match(&lower) {
            SystemSeries::PtxSnyOz
        } else {
            SystemSeries::Other
        };

        (series, name.trim().to_owned())
    }
}

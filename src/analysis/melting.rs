// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Estimation of melting temperatures from Lindemann indices.
//!
//! Three independent estimates are calculated for every structure:
//! - crossing of a threshold by the mean Lindemann index,
//! - steepest increase of the smoothed Lindemann index,
//! - boundary between two clusters of runs in the (temperature, Lindemann index) plane.

use colored::Colorize;
use hashbrown::HashSet;
use nalgebra::DMatrix;

use crate::composition::{Composition, StructureClass};
use crate::errors::AnalysisError;
use crate::input::{Analysis, MeltingParams};
use crate::io::{expand_patterns, read_lindemann_tables, LindemannRecord};
use crate::presentation::{MeltingResults, MeltingRow, TemperaturePoint};
use crate::table::group_by;

use super::clustering::{k_means, order_clusters, standardize};
use super::read_outlier_list;
use super::statistics::{mean, sample_std};

/// Kernel of the Gaussian filter is truncated at this many standard deviations.
const KERNEL_TRUNCATE: f64 = 4.0;

/// Estimate of the melting temperature from the threshold crossing.
#[derive(Debug, Clone, PartialEq)]
struct ThresholdEstimate {
    tm: Option<f64>,
    error: Option<f64>,
    status: &'static str,
    note: Option<String>,
}

/// Estimate of the melting temperature from the steepest increase of the Lindemann index.
#[derive(Debug, Clone, PartialEq)]
struct TransitionEstimate {
    tm: Option<f64>,
    /// Half of the temperature step containing the steepest increase.
    error: Option<f64>,
    max_slope: f64,
    delta: Option<f64>,
    note: Option<String>,
}

/// Mean, standard deviation and number of runs per temperature (ascending).
fn temperature_profile(records: &[&LindemannRecord]) -> Vec<TemperaturePoint> {
    let mut profile: Vec<TemperaturePoint> = group_by(records.iter(), |r| r.temperature())
        .into_iter()
        .map(|(temperature, members)| {
            let deltas: Vec<f64> = members.iter().map(|r| r.delta()).collect();
            TemperaturePoint::new(
                temperature,
                mean(&deltas).unwrap_or(f64::NAN),
                sample_std(&deltas).unwrap_or(f64::NAN),
                deltas.len(),
            )
        })
        .collect();

    profile.sort_by_key(|p| p.temperature());
    profile
}

/// Melting temperature at which the mean Lindemann index first reaches the threshold.
fn threshold_melting(temperatures: &[f64], means: &[f64], threshold: f64) -> ThresholdEstimate {
    if temperatures.len() < 2 {
        return ThresholdEstimate {
            tm: None,
            error: None,
            status: "insufficient",
            note: Some(String::from("fewer than 2 temperatures")),
        };
    }

    for i in 0..temperatures.len() - 1 {
        let (t1, t2) = (temperatures[i], temperatures[i + 1]);
        let (d1, d2) = (means[i], means[i + 1]);

        if d1 < threshold && d2 >= threshold {
            let tm = if d2 != d1 {
                t1 + (threshold - d1) * (t2 - t1) / (d2 - d1)
            } else {
                0.5 * (t1 + t2)
            };

            return ThresholdEstimate {
                tm: Some(tm),
                error: Some(0.5 * (t2 - t1)),
                status: "melting",
                note: None,
            };
        }
    }

    if means.iter().all(|&d| d < threshold) {
        ThresholdEstimate {
            tm: None,
            error: None,
            status: "solid",
            note: Some(format!("always solid (delta < {})", threshold)),
        }
    } else if means.iter().all(|&d| d >= threshold) {
        ThresholdEstimate {
            tm: Some(temperatures[0]),
            error: None,
            status: "liquid",
            note: Some(format!("melted at lowest temperature ({} K)", temperatures[0])),
        }
    } else {
        ThresholdEstimate {
            tm: None,
            error: None,
            status: "undetermined",
            note: Some(String::from("no upward crossing of the threshold")),
        }
    }
}

/// Gaussian smoothing with reflecting boundaries (`d c b a | a b c d | d c b a`).
fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    let n = values.len();
    if n == 0 || sigma <= 0.0 {
        return values.to_vec();
    }

    let radius = (KERNEL_TRUNCATE * sigma + 0.5) as usize;
    let kernel: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let x = k as f64 - radius as f64;
            (-0.5 * x * x / (sigma * sigma)).exp()
        })
        .collect();
    let norm: f64 = kernel.iter().sum();

    let reflect = |j: isize| -> usize {
        let period = 2 * n as isize;
        let index = j.rem_euclid(period) as usize;
        if index >= n {
            2 * n - 1 - index
        } else {
            index
        }
    };

    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[reflect(i as isize + k as isize - radius as isize)])
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// Melting temperature at the steepest increase of the smoothed Lindemann index.
/// `None` for fewer than three temperatures.
fn transition_melting(
    temperatures: &[f64],
    means: &[f64],
    sigma: f64,
    min_slope: f64,
) -> Option<TransitionEstimate> {
    if temperatures.len() < 3 {
        return None;
    }

    let smoothed = gaussian_smooth(means, sigma);
    let (index, max_slope) = (0..temperatures.len() - 1)
        .map(|i| {
            (
                i,
                (smoothed[i + 1] - smoothed[i]) / (temperatures[i + 1] - temperatures[i]),
            )
        })
        .fold((0, f64::NEG_INFINITY), |best, current| {
            if current.1 > best.1 {
                current
            } else {
                best
            }
        });

    if max_slope < min_slope {
        return Some(TransitionEstimate {
            tm: None,
            error: None,
            max_slope,
            delta: None,
            note: Some(String::from("no significant transition detected")),
        });
    }

    Some(TransitionEstimate {
        tm: Some(0.5 * (temperatures[index] + temperatures[index + 1])),
        error: Some(0.5 * (temperatures[index + 1] - temperatures[index])),
        max_slope,
        delta: Some(0.5 * (smoothed[index] + smoothed[index + 1])),
        note: None,
    })
}

/// Melting temperature at the boundary of two clusters of runs.
/// Returns the temperature and its uncertainty.
fn clustering_melting(runs: &[(u32, f64)]) -> Option<(f64, f64)> {
    let n_temperatures = runs
        .iter()
        .map(|&(t, _)| t)
        .collect::<HashSet<u32>>()
        .len();
    if runs.len() < 2 || n_temperatures < 2 {
        return None;
    }

    let data = DMatrix::from_fn(runs.len(), 2, |i, j| match j {
        0 => runs[i].0 as f64,
        _ => runs[i].1,
    });
    let labels = k_means(&standardize(&data), 2);
    let labels = order_clusters(&data, &labels, 2, 1);

    let low_max = runs
        .iter()
        .zip(labels.iter())
        .filter(|(_, &l)| l == 0)
        .map(|(&(t, _), _)| t)
        .max()?;
    let high_min = runs
        .iter()
        .zip(labels.iter())
        .filter(|(_, &l)| l == 1)
        .map(|(&(t, _), _)| t)
        .min()?;

    let (low_max, high_min) = (low_max as f64, high_min as f64);
    Some((0.5 * (low_max + high_min), 0.5 * (high_min - low_max).abs()))
}

/// Analyze the Lindemann indices of a single structure.
fn analyze_structure(
    structure: &str,
    composition: &Composition,
    records: &[&LindemannRecord],
    params: &MeltingParams,
) -> MeltingRow {
    let profile = temperature_profile(records);
    let temperatures: Vec<f64> = profile.iter().map(|p| p.temperature() as f64).collect();
    let means: Vec<f64> = profile.iter().map(|p| p.mean()).collect();

    let mut notes = Vec::new();

    let threshold = threshold_melting(&temperatures, &means, params.threshold());
    notes.extend(threshold.note.clone());

    let transition = transition_melting(
        &temperatures,
        &means,
        params.smoothing_sigma(),
        params.min_slope(),
    );
    match &transition {
        Some(estimate) => notes.extend(estimate.note.clone()),
        None if temperatures.len() >= 2 => {
            notes.push(String::from("too few temperatures for the transition method"))
        }
        None => (),
    }

    let clustering = if params.clustering() {
        let runs: Vec<(u32, f64)> = records
            .iter()
            .map(|r| (r.temperature(), r.delta()))
            .collect();
        clustering_melting(&runs)
    } else {
        None
    };

    let tm_transition = transition.as_ref().and_then(|t| t.tm);
    let tm_clustering = clustering.map(|(tm, _)| tm);
    let difference = |a: Option<f64>, b: Option<f64>| a.zip(b).map(|(a, b)| a - b);

    MeltingRow {
        structure: structure.to_owned(),
        class: StructureClass::classify(structure, composition),
        pt: composition.pt,
        sn: composition.sn,
        o: composition.o,
        total_atoms: composition.total_atoms(),
        sn_fraction: composition.sn_fraction(),
        pt_sn_ratio: composition.pt_sn_ratio(),
        n_temperatures: profile.len(),
        n_runs: records.len(),
        tm_threshold: threshold.tm,
        tm_threshold_error: threshold.error,
        tm_transition,
        tm_transition_error: transition.as_ref().and_then(|t| t.error),
        max_slope: transition.as_ref().map(|t| t.max_slope),
        delta_at_transition: transition.as_ref().and_then(|t| t.delta),
        tm_clustering,
        tm_clustering_error: clustering.map(|(_, error)| error),
        diff_threshold_clustering: difference(threshold.tm, tm_clustering),
        diff_threshold_transition: difference(threshold.tm, tm_transition),
        status: threshold.status.to_owned(),
        notes: notes.join("; "),
        profile,
    }
}

pub(super) fn estimate_melting(
    analysis: &Analysis,
    params: &MeltingParams,
) -> Result<MeltingResults, AnalysisError> {
    let records = read_lindemann_tables(&expand_patterns(params.lindemann())?)?;
    log::info!(
        "Read {} Lindemann records.",
        records.len().to_string().cyan()
    );

    let outliers = read_outlier_list(params.outliers().as_deref(), analysis.no_filter())?;

    let mut n_excluded = 0;
    let mut kept = Vec::with_capacity(records.len());
    for record in records.iter() {
        let listed = record
            .signature()
            .as_deref()
            .is_some_and(|sig| outliers.contains_signature(sig));
        if listed {
            n_excluded += 1;
        } else {
            kept.push(record);
        }
    }

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (structure, members) in group_by(kept, |r| r.structure().clone()).iter() {
        let Some(composition) = Composition::parse(structure) else {
            log::debug!("Skipping '{}': unknown composition.", structure);
            skipped.push(structure.clone());
            continue;
        };

        if !analysis.filter().matches(structure) {
            skipped.push(structure.clone());
            continue;
        }

        let row = analyze_structure(structure, &composition, members, params);
        log::debug!(
            "{}: Tm (threshold) = {:?}, Tm (transition) = {:?}, Tm (clustering) = {:?}",
            structure,
            row.tm_threshold,
            row.tm_transition,
            row.tm_clustering
        );
        rows.push(row);
    }

    rows.sort_by(|a, b| {
        a.sn_fraction
            .total_cmp(&b.sn_fraction)
            .then(a.total_atoms.cmp(&b.total_atoms))
            .then_with(|| a.structure.cmp(&b.structure))
    });

    let n_estimated = rows.iter().filter(|row| row.tm_threshold.is_some()).count();
    log::info!(
        "Estimated melting temperatures of {} of {} structures.",
        n_estimated.to_string().cyan(),
        rows.len().to_string().cyan()
    );

    Ok(MeltingResults::new(
        rows,
        records.len(),
        n_excluded,
        skipped,
        params.threshold(),
        params.min_slope(),
        params.smoothing_sigma(),
    ))
}

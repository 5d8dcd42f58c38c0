// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Calculation of regional heat capacities.
//!
//! Average energies of the runs are matched with their Lindemann indices,
//! the runs are assigned into phases and the heat capacity of each phase is obtained
//! from the slope of the energy as a function of temperature.

use colored::Colorize;
use hashbrown::HashSet;
use nalgebra::DMatrix;
use regex::Regex;

use crate::composition::SystemSeries;
use crate::errors::AnalysisError;
use crate::input::{Analysis, HeatCapacityParams, OutlierMethod, Partitioning};
use crate::io::{expand_patterns, read_energy_table, read_lindemann_tables, EnergyRecord};
use crate::presentation::{
    CurvePoint, HeatCapacityResults, MergedRun, Phase, Region, RegionFit, SupportSource,
    SystemPartition,
};
use crate::table::{group_by, inner_join};
use crate::PANIC_MESSAGE;

use super::clustering::{cluster_means, k_means, order_clusters, standardize};
use super::read_outlier_list;
use super::regression::LinearFit;
use super::statistics::{mean, Bounds};

/// Conversion of eV/K to meV/K.
const EV_TO_MEV: f64 = 1000.0;
/// IQR multiplier used to filter Lindemann indices.
const DELTA_IQR_FACTOR: f64 = 3.0;
/// Smallest group of runs (same structure and temperature) that is IQR-filtered.
const MIN_IQR_GROUP: usize = 5;
/// Smallest number of runs of a system that is partitioned by k-means.
const MIN_KMEANS_RUNS: usize = 10;

/// Run with a known energy and Lindemann index before the phase assignment.
#[derive(Debug, Clone)]
struct Candidate {
    structure: String,
    system: String,
    series: SystemSeries,
    temperature: u32,
    run: Option<u32>,
    signature: String,
    energy: f64,
    delta: f64,
}

/// Heat capacity of the support in meV/K.
/// Falls back to the default value if the energies are available for fewer than two temperatures.
fn support_heat_capacity(records: &[&EnergyRecord], default: f64) -> (f64, SupportSource) {
    let mut per_temperature: Vec<(u32, Vec<f64>)> = group_by(
        records.iter().filter(|r| r.avg_energy().is_finite()),
        |r| r.temperature(),
    )
    .into_iter()
    .map(|(t, members)| (t, members.iter().map(|r| r.avg_energy()).collect()))
    .collect();
    per_temperature.sort_by_key(|(t, _)| *t);

    if per_temperature.len() < 2 {
        return (default, SupportSource::Default);
    }

    let temperatures: Vec<f64> = per_temperature.iter().map(|(t, _)| *t as f64).collect();
    let energies: Vec<f64> = per_temperature
        .iter()
        .map(|(_, e)| mean(e).unwrap_or(f64::NAN))
        .collect();

    match LinearFit::fit(&temperatures, &energies) {
        Some(fit) => (
            fit.slope() * EV_TO_MEV,
            SupportSource::Calculated {
                n_temperatures: per_temperature.len(),
            },
        ),
        None => (default, SupportSource::Default),
    }
}

/// Temperature-dependent heat capacity (in meV/K) from mean energies at increasing temperatures.
/// Interior points average the slopes to both neighbors; end points use the single available slope.
/// Returns an empty vector for fewer than three temperatures.
fn differential_heat_capacity(temperatures: &[f64], energies: &[f64]) -> Vec<f64> {
    let n = temperatures.len().min(energies.len());
    if n < 3 {
        return Vec::new();
    }

    let slopes: Vec<f64> = (0..n - 1)
        .map(|i| (energies[i + 1] - energies[i]) / (temperatures[i + 1] - temperatures[i]))
        .collect();

    (0..n)
        .map(|i| {
            let slope = if i == 0 {
                slopes[0]
            } else if i == n - 1 {
                slopes[n - 2]
            } else {
                0.5 * (slopes[i - 1] + slopes[i])
            };
            slope * EV_TO_MEV
        })
        .collect()
}

/// Assign phase from fixed thresholds of the Lindemann index.
#[inline]
fn phase_from_thresholds(delta: f64, solid: f64, melting: f64) -> Phase {
    if delta < solid {
        Phase::Solid
    } else if delta < melting {
        Phase::PreMelting
    } else {
        Phase::Liquid
    }
}

/// Remove runs with outlying Lindemann index or energy from groups with the same structure
/// and temperature. Returns the kept runs and the number of removed runs.
fn iqr_filter(candidates: Vec<Candidate>, energy_factor: f64) -> (Vec<Candidate>, usize) {
    let n_before = candidates.len();
    let groups = group_by(candidates, |c| (c.structure.clone(), c.temperature));

    let mut kept = Vec::with_capacity(n_before);
    for (_, members) in groups.into_iter() {
        if members.len() < MIN_IQR_GROUP {
            kept.extend(members);
            continue;
        }

        let deltas: Vec<f64> = members.iter().map(|c| c.delta).collect();
        let energies: Vec<f64> = members.iter().map(|c| c.energy).collect();
        let delta_bounds = Bounds::from_values(&deltas, OutlierMethod::Iqr, DELTA_IQR_FACTOR);
        let energy_bounds = Bounds::from_values(&energies, OutlierMethod::Iqr, energy_factor);

        kept.extend(members.into_iter().filter(|c| {
            delta_bounds.map_or(true, |b| b.contains(c.delta))
                && energy_bounds.map_or(true, |b| b.contains(c.energy))
        }));
    }

    let removed = n_before - kept.len();
    (kept, removed)
}

/// Assign phases to the runs of a single system.
fn assign_phases(
    system: &str,
    runs: &[Candidate],
    params: &HeatCapacityParams,
) -> (Vec<Phase>, SystemPartition) {
    let thresholds = || {
        let phases = runs
            .iter()
            .map(|c| {
                phase_from_thresholds(c.delta, params.solid_threshold(), params.melting_threshold())
            })
            .collect();
        (phases, vec![params.solid_threshold(), params.melting_threshold()])
    };

    match params.partitioning() {
        Partitioning::Thresholds => {
            let (phases, values) = thresholds();
            (
                phases,
                SystemPartition::new(system, String::from("thresholds"), values),
            )
        }
        Partitioning::KMeans { n_clusters } if runs.len() < MIN_KMEANS_RUNS.max(n_clusters) => {
            log::debug!(
                "{}: only {} runs, using fixed thresholds instead of k-means.",
                system,
                runs.len()
            );
            let (phases, values) = thresholds();
            (
                phases,
                SystemPartition::new(
                    system,
                    String::from("thresholds (too few runs for k-means)"),
                    values,
                ),
            )
        }
        Partitioning::KMeans { n_clusters } => {
            let data = DMatrix::from_fn(runs.len(), 2, |i, j| match j {
                0 => runs[i].temperature as f64,
                _ => runs[i].delta,
            });

            let labels = k_means(&standardize(&data), n_clusters);
            let labels = order_clusters(&data, &labels, n_clusters, 1);

            let order: &[Phase] = match n_clusters {
                2 => &[Phase::Solid, Phase::Liquid],
                _ => &[Phase::Solid, Phase::PreMelting, Phase::Liquid],
            };
            let phases = labels.iter().map(|&l| order[l.min(order.len() - 1)]).collect();

            let means: Vec<f64> = cluster_means(&data, &labels, n_clusters, 1)
                .into_iter()
                .flatten()
                .collect();
            let values = means.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

            (
                phases,
                SystemPartition::new(system, format!("k-means ({} clusters)", n_clusters), values),
            )
        }
    }
}

/// Fit the energies of a region. `None` if there is not enough data.
fn fit_region(
    system: &str,
    series: SystemSeries,
    region: Region,
    runs: &[&MergedRun],
    min_points: usize,
    support_cv: f64,
) -> Option<RegionFit> {
    let temperatures: HashSet<u32> = runs.iter().map(|r| r.temperature()).collect();
    if runs.len() < min_points || temperatures.len() < 2 {
        log::debug!(
            "{} ({}): {} runs at {} temperatures, not fitted.",
            system,
            region,
            runs.len(),
            temperatures.len()
        );
        return None;
    }

    let x: Vec<f64> = runs.iter().map(|r| r.temperature() as f64).collect();
    let y: Vec<f64> = runs.iter().map(|r| r.energy()).collect();
    let deltas: Vec<f64> = runs.iter().map(|r| r.delta()).collect();
    let fit = LinearFit::fit(&x, &y)?;

    let t_min = temperatures.iter().copied().min().expect(PANIC_MESSAGE);
    let t_max = temperatures.iter().copied().max().expect(PANIC_MESSAGE);

    Some(RegionFit::new(
        system,
        series,
        region,
        runs.len(),
        temperatures.len(),
        (t_min, t_max),
        mean(&deltas).unwrap_or(f64::NAN),
        fit.slope() * EV_TO_MEV,
        fit.slope_stderr() * EV_TO_MEV,
        support_cv,
        fit.r_squared(),
    ))
}

/// Temperature-dependent heat capacity of a system.
fn system_curve(system: &str, runs: &[&MergedRun], support_cv: f64) -> Vec<CurvePoint> {
    let mut per_temperature: Vec<(u32, Vec<f64>)> = group_by(runs.iter(), |r| r.temperature())
        .into_iter()
        .map(|(t, members)| (t, members.iter().map(|r| r.energy()).collect()))
        .collect();
    per_temperature.sort_by_key(|(t, _)| *t);

    let temperatures: Vec<f64> = per_temperature.iter().map(|(t, _)| *t as f64).collect();
    let energies: Vec<f64> = per_temperature
        .iter()
        .map(|(_, e)| mean(e).unwrap_or(f64::NAN))
        .collect();

    differential_heat_capacity(&temperatures, &energies)
        .into_iter()
        .zip(per_temperature.iter().zip(energies.iter()))
        .map(|(cv, ((t, members), &energy))| {
            CurvePoint::new(system, *t, energy, members.len(), cv, support_cv)
        })
        .collect()
}

/// Select energy records of the support structures.
fn support_records<'a>(
    cluster_table: &'a [EnergyRecord],
    support_table: Option<&'a [EnergyRecord]>,
    pattern: &Regex,
) -> Vec<&'a EnergyRecord> {
    match support_table {
        Some(table) => {
            let matching: Vec<&EnergyRecord> = table
                .iter()
                .filter(|r| pattern.is_match(r.structure()))
                .collect();
            if matching.is_empty() {
                table.iter().collect()
            } else {
                matching
            }
        }
        None => cluster_table
            .iter()
            .filter(|r| pattern.is_match(r.structure()))
            .collect(),
    }
}

pub(super) fn calculate_heat_capacity(
    analysis: &Analysis,
    params: &HeatCapacityParams,
) -> Result<HeatCapacityResults, AnalysisError> {
    let support_pattern = params.support_regex().expect(PANIC_MESSAGE);

    let energies = read_energy_table(params.energy())?;
    log::info!(
        "Read {} energy records from '{}'.",
        energies.len().to_string().cyan(),
        params.energy().cyan()
    );

    let support_table = match params.support_energy() {
        Some(path) => Some(read_energy_table(path)?),
        None => None,
    };

    let support = support_records(&energies, support_table.as_deref(), &support_pattern);
    let (support_cv, support_source) = support_heat_capacity(&support, params.support_cv());
    match support_source {
        SupportSource::Calculated { n_temperatures } => log::info!(
            "Heat capacity of the support: {:.4} meV/K (from {} temperatures).",
            support_cv,
            n_temperatures
        ),
        SupportSource::Default => log::warn!(
            "Not enough data for the support. Using the default heat capacity of {} meV/K.",
            support_cv
        ),
    }

    let clusters: Vec<EnergyRecord> = energies
        .iter()
        .filter(|r| !support_pattern.is_match(r.structure()))
        .cloned()
        .collect();

    let lindemann = read_lindemann_tables(&expand_patterns(params.lindemann())?)?;
    log::info!(
        "Read {} Lindemann records.",
        lindemann.len().to_string().cyan()
    );

    let outliers = read_outlier_list(params.outliers().as_deref(), analysis.no_filter())?;

    let joined = inner_join(
        &clusters,
        &lindemann,
        |e| e.signature().clone(),
        |l| l.signature().clone(),
    );
    if joined.is_empty() {
        log::warn!("No run could be matched between the energy and Lindemann tables.");
    }

    let mut n_excluded = 0;
    let mut candidates = Vec::with_capacity(joined.len());
    for (energy, index) in joined.iter() {
        let Some(signature) = energy.signature() else {
            continue;
        };

        if outliers.contains_signature(signature) || outliers.contains_path(energy.path()) {
            n_excluded += 1;
            continue;
        }

        if !analysis.filter().matches(energy.structure()) || !energy.avg_energy().is_finite() {
            continue;
        }

        let (series, system) = SystemSeries::detect(energy.structure());
        candidates.push(Candidate {
            structure: energy.structure().clone(),
            system,
            series,
            temperature: energy.temperature(),
            run: energy.run(),
            signature: signature.clone(),
            energy: energy.avg_energy(),
            delta: index.delta(),
        });
    }

    let (candidates, n_iqr_removed) = match params.iqr_factor() {
        Some(factor) => iqr_filter(candidates, factor),
        None => (candidates, 0),
    };

    let mut systems = group_by(candidates, |c| c.system.clone());
    systems.sort_by(|name_a, runs_a, name_b, runs_b| {
        (runs_a[0].series, name_a).cmp(&(runs_b[0].series, name_b))
    });

    let mut merged = Vec::new();
    let mut regions = Vec::new();
    let mut curves = Vec::new();
    let mut partitions = Vec::new();

    for (system, runs) in systems.iter() {
        let series = runs[0].series;
        let (phases, partition) = assign_phases(system, runs, params);
        partitions.push(partition);

        let system_runs: Vec<MergedRun> = runs
            .iter()
            .zip(phases)
            .map(|(c, phase)| {
                MergedRun::new(
                    &c.structure,
                    &c.system,
                    c.temperature,
                    c.run,
                    &c.signature,
                    c.energy,
                    c.delta,
                    phase,
                )
            })
            .collect();

        for phase in [Phase::Solid, Phase::PreMelting, Phase::Liquid] {
            let members: Vec<&MergedRun> =
                system_runs.iter().filter(|r| r.phase() == phase).collect();
            if let Some(fit) = fit_region(
                system,
                series,
                Region::from(phase),
                &members,
                params.min_points(),
                support_cv,
            ) {
                regions.push(fit);
            }
        }

        let all: Vec<&MergedRun> = system_runs.iter().collect();
        if let Some(fit) = fit_region(
            system,
            series,
            Region::All,
            &all,
            params.min_points(),
            support_cv,
        ) {
            regions.push(fit);
        }

        curves.extend(system_curve(system, &all, support_cv));
        merged.extend(system_runs);
    }

    log::info!(
        "Calculated {} regional heat capacities for {} systems.",
        regions.len().to_string().cyan(),
        systems.len().to_string().cyan()
    );

    Ok(HeatCapacityResults::new(
        merged,
        regions,
        curves,
        partitions,
        support_cv,
        support_source,
        energies.len(),
        lindemann.len(),
        joined.len(),
        n_excluded,
        n_iqr_removed,
    ))
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Calculation of ensemble diffusion coefficients from msd curves of independent runs.

use std::path::PathBuf;

use colored::Colorize;

use crate::composition::base_system;
use crate::errors::AnalysisError;
use crate::input::{Analysis, DiffusionParams};
use crate::io::{discover_files, read_xvg, RunKey};
use crate::presentation::{DiffusionCurve, DiffusionResults, DiffusionRow};
use crate::table::group_by;

use super::read_outlier_list;

/// Group of runs sharing composition, temperature and element.
type GroupKey = (String, u32, String);

pub(super) fn calculate_diffusion(
    analysis: &Analysis,
    params: &DiffusionParams,
) -> Result<DiffusionResults, AnalysisError> {
    let files = discover_files(params.inputs(), params.pattern())?;
    log::info!(
        "Found {} msd files matching '{}'.",
        files.len().to_string().cyan(),
        params.pattern().cyan()
    );

    let outliers = read_outlier_list(params.outliers().as_deref(), analysis.no_filter())?;

    let mut n_excluded = 0;
    let mut n_unreadable = 0;
    let mut identified: Vec<(RunKey, PathBuf)> = Vec::with_capacity(files.len());

    for file in files.iter() {
        let key = match RunKey::from_msd_path(file) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Skipping msd file: {}", e);
                n_unreadable += 1;
                continue;
            }
        };

        let listed = outliers.contains_path(file)
            || key
                .signature()
                .is_some_and(|sig| outliers.contains_signature(&sig));
        if listed {
            log::debug!("Excluding outlier run '{}'.", file.display());
            n_excluded += 1;
            continue;
        }

        if !analysis.filter().matches(key.composition()) {
            continue;
        }

        identified.push((key, file.clone()));
    }

    let groups = group_by(identified, |(key, _)| -> GroupKey {
        (
            key.composition().clone(),
            key.temperature(),
            key.element().clone().unwrap_or_default(),
        )
    });

    let estimator = params.estimator(analysis.no_filter());
    let mut rows = Vec::new();
    let mut curves = Vec::new();
    let mut missing = Vec::new();

    for ((composition, temperature, element), members) in groups.iter() {
        let mut runs = Vec::with_capacity(members.len());
        for (_, file) in members {
            match read_xvg(file, params.msd_scale()) {
                Ok(series) => runs.push(series),
                Err(e) => {
                    log::warn!("Skipping msd file: {}", e);
                    n_unreadable += 1;
                }
            }
        }

        let label = format!("{} {} K {}", composition, temperature, element);
        match estimator.estimate(&runs) {
            Ok(ensemble) => {
                if !ensemble.rejected().is_empty() {
                    log::debug!(
                        "{}: rejected {} of {} runs.",
                        label,
                        ensemble.rejected().len(),
                        runs.len()
                    );
                }

                rows.push(DiffusionRow::new(
                    composition,
                    base_system(composition),
                    *temperature,
                    element,
                    &ensemble,
                ));

                if params.write_curves() {
                    curves.push(DiffusionCurve::new(
                        composition,
                        *temperature,
                        element,
                        ensemble,
                    ));
                }
            }
            Err(reason) => {
                log::debug!("{}: no estimate ({}).", label, reason);
                missing.push((label, reason));
            }
        }
    }

    rows.sort_by(|a, b| {
        (base_system(a.composition()), a.temperature(), a.element()).cmp(&(
            base_system(b.composition()),
            b.temperature(),
            b.element(),
        ))
    });

    log::info!(
        "Estimated diffusion coefficients for {} of {} groups.",
        rows.len().to_string().cyan(),
        groups.len().to_string().cyan()
    );
    if !missing.is_empty() {
        log::warn!(
            "No diffusion coefficient could be estimated for {} groups.",
            missing.len()
        );
    }

    let poor = rows
        .iter()
        .filter(|row| row.r_squared() < params.r2_threshold())
        .count();
    if poor > 0 {
        log::warn!(
            "{} fits have a coefficient of determination below {}.",
            poor,
            params.r2_threshold()
        );
    }

    Ok(DiffusionResults::new(
        rows,
        curves,
        missing,
        files.len(),
        n_excluded,
        n_unreadable,
        groups.len(),
        params.fit_range(),
        params.r2_threshold(),
        params.rejection().clone().filter(|_| !analysis.no_filter()),
    ))
}

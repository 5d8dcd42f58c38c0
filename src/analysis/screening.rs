// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Quality screening of individual runs.
//!
//! Every run is characterized by its own fit of the msd curve and by the coefficient reported
//! in the header of its msd file. Runs deviating from the other runs of the same group,
//! runs with a large intercept and runs with an implausibly large coefficient are flagged.

use colored::Colorize;
use hashbrown::HashSet;

use crate::errors::AnalysisError;
use crate::input::{Analysis, RunStatistic, ScreeningParams};
use crate::io::{discover_files, read_xvg, RunKey};
use crate::presentation::{RunQuality, ScreeningResults};
use crate::table::group_by;

use super::ensemble::MSD_TO_DIFFUSION;
use super::regression::LinearFit;
use super::series::TimeSeries;
use super::statistics::detect_outliers;

/// Reason assigned to runs sharing a simulation with a flagged run.
const BAD_SIMULATION: &str = "bad_simulation";

/// Summary of a single run used for the screening.
struct ScreenedRun {
    key: RunKey,
    quality: RunQuality,
    /// Value of the statistic tested for outliers.
    statistic: Option<f64>,
}

/// Fit the part of the run selected by the parameters.
/// Returns the diffusion coefficient, the coefficient of determination and the intercept.
fn fit_run(series: &TimeSeries, params: &ScreeningParams) -> Option<(f64, f64, f64)> {
    let range = params.fit_range().select(series.time());
    if range.len() < params.min_points() {
        return None;
    }

    let fit = LinearFit::fit(&series.time()[range.clone()], &series.values()[range])?;
    Some((
        fit.slope() * MSD_TO_DIFFUSION,
        fit.r_squared(),
        fit.intercept(),
    ))
}

pub(super) fn screen_runs(
    analysis: &Analysis,
    params: &ScreeningParams,
) -> Result<ScreeningResults, AnalysisError> {
    let files = discover_files(params.inputs(), params.pattern())?;
    log::info!(
        "Found {} msd files matching '{}'.",
        files.len().to_string().cyan(),
        params.pattern().cyan()
    );

    let rejection = params.rejection();
    let mut n_skipped = 0;
    let mut screened = Vec::with_capacity(files.len());

    for file in files.iter() {
        let key = match RunKey::from_msd_path(file) {
            Ok(key) if key.run_id().is_some() => key,
            Ok(_) => {
                log::warn!(
                    "Skipping msd file '{}': no run identifier in its name.",
                    file.display()
                );
                n_skipped += 1;
                continue;
            }
            Err(e) => {
                log::warn!("Skipping msd file: {}", e);
                n_skipped += 1;
                continue;
            }
        };

        if !analysis.filter().matches(key.composition()) {
            continue;
        }

        let series = match read_xvg(file, params.msd_scale()) {
            Ok(series) => series,
            Err(e) => {
                log::warn!("Skipping msd file: {}", e);
                n_skipped += 1;
                continue;
            }
        };

        let fitted = fit_run(&series, params);
        let statistic = match rejection.statistic() {
            RunStatistic::Reported => series.reported(),
            RunStatistic::Slope => fitted.map(|(d, _, _)| d),
            RunStatistic::FinalValue => series.values().last().copied(),
        }
        .filter(|x| x.is_finite());

        let quality = RunQuality::new(
            key.composition(),
            key.temperature(),
            key.element().as_deref().unwrap_or_default(),
            key.run(),
            key.gpu(),
            series.reported(),
            fitted,
            file.to_string_lossy().into_owned(),
            key.signature(),
        );

        screened.push(ScreenedRun {
            key,
            quality,
            statistic,
        });
    }

    let groups = group_by(0..screened.len(), |&i| screened[i].quality.group().clone());
    let mut n_tested = 0;

    for members in groups.values() {
        let available: Vec<(usize, f64)> = members
            .iter()
            .filter_map(|&i| screened[i].statistic.map(|v| (i, v)))
            .collect();

        if available.len() < rejection.min_runs() {
            continue;
        }
        n_tested += 1;

        let values: Vec<f64> = available.iter().map(|&(_, v)| v).collect();
        let flags = detect_outliers(
            &values,
            rejection.method(),
            rejection.multiplier(),
            rejection.fences(),
        );

        for (&(index, _), outlier) in available.iter().zip(flags) {
            if outlier {
                screened[index]
                    .quality
                    .flag(format!("{}_outlier", rejection.method()));
            }
        }
    }

    for run in screened.iter_mut() {
        if run.quality.is_flagged() {
            continue;
        }

        let mut reasons = Vec::new();
        if run
            .quality
            .intercept()
            .is_some_and(|intercept| intercept > params.intercept_max())
        {
            reasons.push("high_intercept");
        }
        if run.quality.fitted_d().is_some_and(|d| d >= params.d_max()) {
            reasons.push("high_D");
        }

        if !reasons.is_empty() {
            run.quality.flag(reasons.join(";"));
        }
    }

    if params.propagate() {
        let bad: HashSet<RunKey> = screened
            .iter()
            .filter(|run| run.quality.is_flagged())
            .map(|run| run.key.simulation())
            .collect();

        for run in screened.iter_mut() {
            if bad.contains(&run.key.simulation()) {
                run.quality.flag(BAD_SIMULATION);
            }
        }
    }

    let runs: Vec<RunQuality> = screened.into_iter().map(|run| run.quality).collect();
    let n_flagged = runs.iter().filter(|run| run.is_flagged()).count();
    log::info!(
        "Flagged {} of {} runs.",
        n_flagged.to_string().cyan(),
        runs.len().to_string().cyan()
    );

    Ok(ScreeningResults::new(
        runs,
        files.len(),
        n_skipped,
        groups.len(),
        n_tested,
        rejection.clone(),
        params.intercept_max(),
        params.d_max(),
    ))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::input::FitRange;

    #[test]
    fn fit_single_run() {
        let params = ScreeningParams::new().input("data").build().unwrap();
        let time: Vec<f64> = (0..=100).map(|i| i as f64 * 10.0).collect();
        let values: Vec<f64> = time.iter().map(|t| 0.6 * t + 2.0).collect();
        let series = TimeSeries::new(time, values);

        let (d, r2, intercept) = fit_run(&series, &params).unwrap();
        assert_relative_eq!(d, 1e-5, max_relative = 1e-9);
        assert_relative_eq!(r2, 1.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_too_short() {
        let params = ScreeningParams::new()
            .input("data")
            .fit_range(FitRange::fraction(0.1, 0.9))
            .min_points(3)
            .build()
            .unwrap();
        let series = TimeSeries::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        assert!(fit_run(&series, &params).is_none());
    }
}

// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Integration tests of the quality screening of individual runs.

mod common;

use std::path::Path;

use approx::assert_relative_eq;
use ensfit::prelude::*;
use tempfile::TempDir;

use common::{field, linear_msd, read_csv, write_msd};

/// Group of four runs, the fourth one reporting an implausible coefficient,
/// and a small group with a run with a large intercept and a run diffusing too fast.
fn write_runs(data: &Path) {
    let curve = linear_msd(0.6, 0.0, 1000.0, 10.0);

    for (run, reported) in [(1, 1.0), (2, 1.02), (3, 0.98), (4, 50.0)] {
        write_msd(data, "pt6sn8", 700, run, "Pt", &curve, Some(reported));
        write_msd(data, "pt6sn8", 700, run, "Sn", &curve, Some(1.0));
    }

    write_msd(
        data,
        "pt8sn2",
        900,
        1,
        "Pt",
        &linear_msd(0.6, 20.0, 1000.0, 10.0),
        Some(1.0),
    );
    write_msd(
        data,
        "pt8sn2",
        900,
        2,
        "Pt",
        &linear_msd(4.0, 0.0, 1000.0, 10.0),
        Some(6.7),
    );
}

fn unwrap_screening(results: AnalysisResults) -> ScreeningResults {
    match results {
        AnalysisResults::Screening(x) => x,
        _ => panic!("Incorrect results type returned."),
    }
}

fn find<'a>(
    results: &'a ScreeningResults,
    composition: &str,
    element: &str,
    run: u32,
) -> &'a RunQuality {
    results
        .runs()
        .iter()
        .find(|r| r.composition() == composition && r.element() == element && r.run() == Some(run))
        .unwrap()
}

#[test]
fn test_screening_basic() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    write_runs(&data);

    let analysis = Analysis::new()
        .analysis_type(
            ScreeningParams::new()
                .input(data.to_str().unwrap())
                .build()
                .unwrap(),
        )
        .silent()
        .build()
        .unwrap();

    let results = unwrap_screening(analysis.run().unwrap());

    assert_eq!(results.n_files(), 10);
    assert_eq!(results.runs().len(), 10);
    assert_eq!(results.n_groups(), 3);
    assert_eq!(results.n_tested_groups(), 2);
    assert_eq!(results.n_flagged(), 4);

    let outlier = find(&results, "pt6sn8", "Pt", 4);
    assert_eq!(outlier.reason().as_deref(), Some("IQR_outlier"));
    assert_relative_eq!(outlier.reported_d().unwrap(), 50e-5, max_relative = 1e-9);
    assert_relative_eq!(outlier.fitted_d().unwrap(), 1e-5, max_relative = 1e-6);

    // the other element of the same simulation
    let propagated = find(&results, "pt6sn8", "Sn", 4);
    assert_eq!(propagated.reason().as_deref(), Some("bad_simulation"));

    for run in 1..=3 {
        assert!(!find(&results, "pt6sn8", "Pt", run).is_flagged());
        assert!(!find(&results, "pt6sn8", "Sn", run).is_flagged());
    }

    let intercept = find(&results, "pt8sn2", "Pt", 1);
    assert_eq!(intercept.reason().as_deref(), Some("high_intercept"));
    assert_relative_eq!(intercept.intercept().unwrap(), 20.0, epsilon = 1e-4);

    let fast = find(&results, "pt8sn2", "Pt", 2);
    assert_eq!(fast.reason().as_deref(), Some("high_D"));
    assert_eq!(fast.signature().as_deref(), Some("sup/pt8sn2/t900.r2.gpu0"));
}

#[test]
fn test_screening_without_propagation() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    write_runs(&data);

    let analysis = Analysis::new()
        .analysis_type(
            ScreeningParams::new()
                .input(data.to_str().unwrap())
                .propagate(false)
                .build()
                .unwrap(),
        )
        .silent()
        .build()
        .unwrap();

    let results = unwrap_screening(analysis.run().unwrap());
    assert_eq!(results.n_flagged(), 3);
    assert!(!find(&results, "pt6sn8", "Sn", 4).is_flagged());
}

#[test]
fn test_screening_pooled_fences_mask_outlier() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    let curve = linear_msd(0.6, 0.0, 1000.0, 10.0);
    for (run, reported) in [(1, 1.0), (2, 1.0), (3, 100.0)] {
        write_msd(&data, "pt6sn8", 700, run, "Pt", &curve, Some(reported));
    }

    let screen = |fences: Fences| {
        let analysis = Analysis::new()
            .analysis_type(
                ScreeningParams::new()
                    .input(data.to_str().unwrap())
                    .rejection(
                        OutlierRejection::new()
                            .statistic(RunStatistic::Reported)
                            .fences(fences)
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .silent()
            .build()
            .unwrap();
        unwrap_screening(analysis.run().unwrap())
    };

    // the extreme value inflates the pooled IQR enough to hide itself
    assert_eq!(screen(Fences::Pooled).n_flagged(), 0);
    assert_eq!(screen(Fences::LeaveOneOut).n_flagged(), 1);
}

#[test]
fn test_screening_then_diffusion() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    let output = dir.path().join("screening");
    write_runs(&data);

    let screening = Analysis::new()
        .output_directory(output.to_str().unwrap())
        .analysis_type(
            ScreeningParams::new()
                .input(data.to_str().unwrap())
                .build()
                .unwrap(),
        )
        .silent()
        .build()
        .unwrap();

    screening
        .run()
        .unwrap()
        .write(screening.output_directory(), false)
        .unwrap();

    let list = output.join("run_outliers.csv");
    let (header, rows) = read_csv(&list);
    assert_eq!(header.len(), 13);
    assert_eq!(rows.len(), 4);
    assert!(rows
        .iter()
        .any(|row| field(&header, row, "reason") == "high_intercept"));
    assert!(output.join("run_quality_report.txt").is_file());

    let diffusion = Analysis::new()
        .analysis_type(
            DiffusionParams::new()
                .input(data.to_str().unwrap())
                .fit_range(FitRange::time(100.0, 900.0))
                .outliers(list.to_str().unwrap())
                .build()
                .unwrap(),
        )
        .silent()
        .build()
        .unwrap();

    let results = match diffusion.run().unwrap() {
        AnalysisResults::Diffusion(x) => x,
        _ => panic!("Incorrect results type returned."),
    };

    assert_eq!(results.n_excluded(), 4);
    assert_eq!(results.get("pt6sn8", 700, "Pt").unwrap().n_runs(), 3);
    assert_eq!(results.get("pt6sn8", 700, "Sn").unwrap().n_runs(), 3);
    assert!(results.get("pt8sn2", 900, "Pt").is_none());
}

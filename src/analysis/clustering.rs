// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Implementation of k-means clustering used for the identification of phases.

use nalgebra::DMatrix;

use crate::PANIC_MESSAGE;

/// Maximal number of iterations of the k-means algorithm.
const MAX_ITERATIONS: usize = 100;

/// Scale every column of the data to zero mean and unit (population) standard deviation.
/// Constant columns are set to zero.
pub(crate) fn standardize(data: &DMatrix<f64>) -> DMatrix<f64> {
    let mut scaled = data.clone();
    let n = data.nrows() as f64;
    if data.nrows() == 0 {
        return scaled;
    }

    for mut column in scaled.column_iter_mut() {
        let mean = column.sum() / n;
        let variance = column.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        let std = variance.sqrt();

        for x in column.iter_mut() {
            *x = if std > 0.0 { (*x - mean) / std } else { 0.0 };
        }
    }

    scaled
}

/// Squared euclidean distance between a sample and a centroid.
#[inline(always)]
fn squared_distance(
    data: &DMatrix<f64>,
    sample: usize,
    centroids: &DMatrix<f64>,
    cluster: usize,
) -> f64 {
    data.row(sample)
        .iter()
        .zip(centroids.row(cluster).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Cluster the rows of `data` into `k` clusters. Returns cluster label of each row.
///
/// Initial centroids are the samples at evenly spaced ranks of the samples ordered
/// by the sum of their coordinates, so the result is deterministic.
pub(crate) fn k_means(data: &DMatrix<f64>, k: usize) -> Vec<usize> {
    assert!(
        k > 0,
        "FATAL ENSFIT ERROR | clustering::k_means | Number of clusters must be greater than 0. {}",
        PANIC_MESSAGE
    );
    assert!(
        data.nrows() >= k,
        "FATAL ENSFIT ERROR | clustering::k_means | More clusters than data points. {}",
        PANIC_MESSAGE
    );

    let (n_samples, n_features) = (data.nrows(), data.ncols());
    let mut centroids = DMatrix::zeros(k, n_features);
    let mut labels = vec![0; n_samples];
    let mut prev_labels = vec![usize::MAX; n_samples];

    // initialize centroids with samples at evenly spaced ranks
    let mut order: Vec<usize> = (0..n_samples).collect();
    order.sort_by(|&a, &b| data.row(a).sum().total_cmp(&data.row(b).sum()));
    for i in 0..k {
        let sample = order[((2 * i + 1) * n_samples) / (2 * k)];
        for j in 0..n_features {
            centroids[(i, j)] = data[(sample, j)];
        }
    }

    // main optimization loop
    for _ in 0..MAX_ITERATIONS {
        // assign labels
        for (sample, label) in labels.iter_mut().enumerate() {
            let mut best_cluster = 0;
            let mut min_distance = f64::INFINITY;

            for cluster in 0..k {
                let distance = squared_distance(data, sample, &centroids, cluster);
                if distance < min_distance {
                    min_distance = distance;
                    best_cluster = cluster;
                }
            }

            *label = best_cluster;
        }

        // check convergence
        if labels == prev_labels {
            break;
        }

        // update centroids; an empty cluster keeps its previous centroid
        let mut sums = DMatrix::<f64>::zeros(k, n_features);
        let mut counts = vec![0usize; k];
        for (sample, &cluster) in labels.iter().enumerate() {
            for j in 0..n_features {
                sums[(cluster, j)] += data[(sample, j)];
            }
            counts[cluster] += 1;
        }

        for (cluster, &count) in counts.iter().enumerate() {
            if count > 0 {
                for j in 0..n_features {
                    centroids[(cluster, j)] = sums[(cluster, j)] / count as f64;
                }
            }
        }

        prev_labels.clone_from(&labels);
    }

    labels
}

/// Mean of the values in the given column for each cluster. `None` for empty clusters.
pub(crate) fn cluster_means(
    data: &DMatrix<f64>,
    labels: &[usize],
    k: usize,
    column: usize,
) -> Vec<Option<f64>> {
    let mut sums = vec![0.0; k];
    let mut counts = vec![0usize; k];
    for (sample, &label) in labels.iter().enumerate() {
        sums[label] += data[(sample, column)];
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
        .collect()
}

/// Relabel the clusters so that their means in the given column increase with the label.
/// Empty clusters are placed last.
pub(crate) fn order_clusters(
    data: &DMatrix<f64>,
    labels: &[usize],
    k: usize,
    column: usize,
) -> Vec<usize> {
    let means = cluster_means(data, labels, k, column);

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        means[a]
            .unwrap_or(f64::INFINITY)
            .total_cmp(&means[b].unwrap_or(f64::INFINITY))
    });

    let mut new_label = vec![0; k];
    for (rank, &cluster) in order.iter().enumerate() {
        new_label[cluster] = rank;
    }

    labels.iter().map(|&l| new_label[l]).collect()
}

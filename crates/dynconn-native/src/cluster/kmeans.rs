//! K-means clustering
//!
//! Lloyd's algorithm with k-means++ seeding and several restarts, keeping
//! the partition with the lowest inertia. Deterministic for a given seed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use dynconn_core::math::variance;
use dynconn_core::Matrix;

use crate::error::{AnalysisError, AnalysisResult};

/// Result of a k-means fit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Cluster label of every sample, in `0..k`
    pub labels: Vec<usize>,
    /// Cluster centres (k × features)
    pub centroids: Matrix,
    /// Sum of squared distances to the assigned centre
    pub inertia: f64,
    /// Lloyd iterations of the winning run
    pub n_iter: usize,
}

impl ClusterAssignment {
    fn empty(n_features: usize) -> Self {
        Self {
            labels: Vec::new(),
            centroids: Matrix::zeros(0, n_features),
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Number of clusters
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.centroids.rows()
    }
}

/// K-means estimator
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tolerance: f64,
    n_init: usize,
    seed: u64,
}

impl KMeans {
    /// Default maximum Lloyd iterations
    pub const DEFAULT_MAX_ITER: usize = 300;
    /// Default relative centroid-shift tolerance
    pub const DEFAULT_TOLERANCE: f64 = 1e-4;
    /// Default number of restarts
    pub const DEFAULT_N_INIT: usize = 10;

    /// Estimator for `n_clusters` clusters
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for zero clusters.
    pub fn new(n_clusters: usize) -> AnalysisResult<Self> {
        if n_clusters == 0 {
            return Err(AnalysisError::invalid_configuration("k-means needs at least one cluster"));
        }
        Ok(Self {
            n_clusters,
            max_iter: Self::DEFAULT_MAX_ITER,
            tolerance: Self::DEFAULT_TOLERANCE,
            n_init: Self::DEFAULT_N_INIT,
            seed: 0,
        })
    }

    /// Set the RNG seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of restarts (at least one run is always made)
    #[must_use]
    pub fn with_restarts(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set the iteration cap
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Requested cluster count
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Cluster the rows of `data`.
    ///
    /// The cluster count is clamped to the number of samples; zero samples
    /// give an empty assignment.
    #[must_use]
    pub fn fit(&self, data: &Matrix) -> ClusterAssignment {
        let n = data.rows();
        if n == 0 {
            return ClusterAssignment::empty(data.cols());
        }
        let k = self.n_clusters.min(n);

        // Shift tolerance is relative to the mean feature variance
        let mean_variance = if data.cols() == 0 {
            0.0
        } else {
            (0..data.cols()).map(|j| variance(&data.column(j))).sum::<f64>() / data.cols() as f64
        };
        let tol = self.tolerance * mean_variance;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<ClusterAssignment> = None;
        for _ in 0..self.n_init {
            let run = self.lloyd(data, k, tol, &mut rng);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.unwrap_or_else(|| ClusterAssignment::empty(data.cols()))
    }

    fn lloyd(&self, data: &Matrix, k: usize, tol: f64, rng: &mut StdRng) -> ClusterAssignment {
        let mut centroids = plus_plus_init(data, k, rng);
        let mut labels = vec![0; data.rows()];
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;
            assign(data, &centroids, &mut labels);
            let updated = update_centroids(data, &labels, &centroids);
            let shift: f64 = (0..k).map(|c| squared_distance(updated.row(c), centroids.row(c))).sum();
            centroids = updated;
            if shift <= tol {
                break;
            }
        }

        let inertia = assign(data, &centroids, &mut labels);
        ClusterAssignment {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid
fn nearest(point: &[f64], centroids: &Matrix) -> (usize, f64) {
    centroids
        .iter_rows()
        .enumerate()
        .map(|(c, centre)| (c, squared_distance(point, centre)))
        .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best })
}

/// Label every sample with its nearest centroid; returns the inertia
fn assign(data: &Matrix, centroids: &Matrix, labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (i, point) in data.iter_rows().enumerate() {
        let (c, d) = nearest(point, centroids);
        labels[i] = c;
        inertia += d;
    }
    inertia
}

/// k-means++ seeding; falls back to uniform choice when every sample
/// coincides with an existing centre
fn plus_plus_init(data: &Matrix, k: usize, rng: &mut StdRng) -> Matrix {
    let n = data.rows();
    let mut centroids = Matrix::zeros(k, data.cols());
    let first = rng.gen_range(0..n);
    centroids.row_mut(0).copy_from_slice(data.row(first));

    let mut closest: Vec<f64> = data.iter_rows().map(|p| squared_distance(p, data.row(first))).collect();
    for c in 1..k {
        let pick = match WeightedIndex::new(&closest) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        centroids.row_mut(c).copy_from_slice(data.row(pick));
        for (i, p) in data.iter_rows().enumerate() {
            closest[i] = closest[i].min(squared_distance(p, data.row(pick)));
        }
    }
    centroids
}

/// Mean of each cluster; an empty cluster takes the sample farthest from its
/// current centre
fn update_centroids(data: &Matrix, labels: &[usize], previous: &Matrix) -> Matrix {
    let k = previous.rows();
    let dims = data.cols();
    let mut sums = Matrix::zeros(k, dims);
    let mut counts = vec![0usize; k];
    for (point, &label) in data.iter_rows().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums.row_mut(label).iter_mut().zip(point) {
            *s += v;
        }
    }

    let mut distances: Vec<f64> = data
        .iter_rows()
        .zip(labels)
        .map(|(p, &l)| squared_distance(p, previous.row(l)))
        .collect();

    for c in 0..k {
        if counts[c] > 0 {
            let scale = 1.0 / counts[c] as f64;
            for s in sums.row_mut(c) {
                *s *= scale;
            }
        } else {
            let far = distances
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &d)| if d > best.1 { (i, d) } else { best })
                .0;
            sums.row_mut(c).copy_from_slice(data.row(far));
            distances[far] = 0.0;
        }
    }
    sums
}

//! Cost-efficiency threshold selection
//!
//! Sweeps a binarization threshold `k` over a mean synchrony matrix and
//! keeps the `k` that maximizes global efficiency minus connection cost.
//! The cohort threshold is the mean of the per-member optima.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dynconn_core::{mean, sweep, Matrix};

use super::binary::BinaryGraph;
use crate::error::{AnalysisError, AnalysisResult};

/// Binarize the off-diagonal of a synchrony matrix: edge iff value >= `k`.
///
/// The lower triangle is read and mirrored, so the result is symmetric with
/// an empty diagonal.
#[must_use]
pub fn binarize(synchrony: &Matrix, k: f64) -> BinaryGraph {
    let n = synchrony.rows();
    let mut g = BinaryGraph::new(n);
    for i in 0..n {
        for j in 0..i {
            if synchrony[(i, j)] >= k {
                g.add_edge(i, j);
            }
        }
    }
    g
}

/// Mean over nodes of the regional efficiency `Σ_j 1/d_ij / (n - 1)`
#[must_use]
pub fn global_efficiency(graph: &BinaryGraph) -> f64 {
    let n = graph.n_nodes();
    if n < 2 {
        return 0.0;
    }
    let d = graph.distances();
    let regional: Vec<f64> = (0..n)
        .map(|i| {
            let sum: f64 = (0..n)
                .filter(|&j| j != i && d[(i, j)].is_finite())
                .map(|j| 1.0 / d[(i, j)])
                .sum();
            sum / (n - 1) as f64
        })
        .collect();
    mean(&regional)
}

/// Connection cost: density of off-diagonal edges
#[must_use]
pub fn cost(graph: &BinaryGraph) -> f64 {
    graph.density()
}

// ============================================================================
// Sweep
// ============================================================================

/// Half-open threshold sweep `[lower, upper)` with a fixed step
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    /// First threshold
    pub lower: f64,
    /// Exclusive upper bound
    pub upper: f64,
    /// Step between thresholds
    pub step: f64,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self { lower: 0.1, upper: 1.0, step: 0.01 }
    }
}

impl SweepRange {
    /// Check that the sweep yields at least one threshold
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for a non-positive step
    /// or an empty range.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.step > 0.0) || !self.step.is_finite() {
            return Err(AnalysisError::invalid_configuration(format!(
                "threshold sweep step must be positive, got {}",
                self.step
            )));
        }
        if !(self.lower < self.upper) {
            return Err(AnalysisError::invalid_configuration(format!(
                "threshold sweep lower bound {} must be below upper bound {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }

    /// Thresholds in ascending order
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        sweep(self.lower, self.upper, self.step)
    }
}

/// Shared binarization threshold of one configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdValue {
    /// Mean optimal threshold over the cohort
    pub k: f64,
    /// Number of reference subjects
    pub cohort_size: usize,
    /// Optimal threshold of every contributing matrix
    pub member_optima: Vec<f64>,
    /// Sweep used
    pub range: SweepRange,
}

// ============================================================================
// Optimizer
// ============================================================================

/// Finds the cost-efficiency optimal threshold
#[derive(Clone, Copy, Debug)]
pub struct ThresholdOptimizer {
    range: SweepRange,
    thresholds_len: usize,
}

impl ThresholdOptimizer {
    /// Create an optimizer over a validated sweep
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for an invalid sweep.
    pub fn new(range: SweepRange) -> AnalysisResult<Self> {
        range.validate()?;
        let thresholds_len = range.values().len();
        if thresholds_len == 0 {
            return Err(AnalysisError::invalid_configuration("threshold sweep is empty"));
        }
        Ok(Self { range, thresholds_len })
    }

    /// Number of thresholds evaluated per matrix
    pub fn n_thresholds(&self) -> usize {
        self.thresholds_len
    }

    /// Threshold maximizing `E - C` for one mean synchrony matrix.
    ///
    /// The first threshold seeds the optimum and only strict improvements
    /// replace it, so ties keep the smallest `k`.
    #[must_use]
    pub fn optimal_k(&self, mean_synchrony: &Matrix) -> f64 {
        let mut best: Option<(f64, f64)> = None;
        for k in self.range.values() {
            let g = binarize(mean_synchrony, k);
            let score = global_efficiency(&g) - cost(&g);
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((k, score)),
            }
        }
        best.map_or(self.range.lower, |(k, _)| k)
    }

    /// Mean optimal threshold over a reference cohort
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyCohort`] when no matrices are given.
    pub fn cohort_threshold(&self, cohort_size: usize, matrices: &[Matrix]) -> AnalysisResult<ThresholdValue> {
        if cohort_size == 0 || matrices.is_empty() {
            return Err(AnalysisError::EmptyCohort);
        }
        let member_optima: Vec<f64> = matrices.par_iter().map(|m| self.optimal_k(m)).collect();
        let k = mean(&member_optima);
        debug!(k, members = member_optima.len(), "Cohort threshold reduced");
        Ok(ThresholdValue {
            k,
            cohort_size,
            member_optima,
            range: self.range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_synchrony() -> Matrix {
        // {0,1,2} strongly coupled, {3,4,5} strongly coupled, weak bridge 2-3
        let mut m = Matrix::identity(6);
        for i in 0..6 {
            for j in 0..6 {
                if i == j {
                    continue;
                }
                let same = (i < 3) == (j < 3);
                m[(i, j)] = if same { 0.9 } else { 0.2 };
            }
        }
        m[(2, 3)] = 0.5;
        m[(3, 2)] = 0.5;
        m
    }

    #[test]
    fn test_binarize_extremes() {
        let m = two_cluster_synchrony();
        let all = binarize(&m, 0.0);
        assert_eq!(all, BinaryGraph::complete(6));
        let none = binarize(&m, 1.0 + 1e-9);
        assert_eq!(none.n_edges(), 0);
        assert!(binarize(&m, 0.5).to_matrix().is_symmetric(0.0));
    }

    #[test]
    fn test_efficiency_and_cost() {
        let complete = BinaryGraph::complete(4);
        assert!((global_efficiency(&complete) - 1.0).abs() < 1e-12);
        assert!((cost(&complete) - 1.0).abs() < 1e-12);

        // Path 0-1-2: E = (1 + 1/2 + 2 + 1/2 + 1) / (3 * 2)
        let path = BinaryGraph::from_edges(3, &[(0, 1), (1, 2)]);
        assert!((global_efficiency(&path) - 5.0 / 6.0).abs() < 1e-12);

        let empty = BinaryGraph::new(4);
        assert_eq!(global_efficiency(&empty), 0.0);
        assert_eq!(cost(&empty), 0.0);
    }

    #[test]
    fn test_optimal_k_within_range() {
        let optimizer = ThresholdOptimizer::new(SweepRange::default()).unwrap();
        assert_eq!(optimizer.n_thresholds(), 90);
        let k = optimizer.optimal_k(&two_cluster_synchrony());
        assert!((0.1..1.0).contains(&k));
        // Keeping only the bridge and both cliques beats the full graph
        assert!(k > 0.2 && k <= 0.5 + 1e-9, "k = {k}");
    }

    #[test]
    fn test_flat_matrix_keeps_first_threshold() {
        // Every threshold gives the same empty graph, so the seed is kept
        let optimizer = ThresholdOptimizer::new(SweepRange::default()).unwrap();
        let k = optimizer.optimal_k(&Matrix::identity(5));
        assert!((k - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_cohort_threshold_is_mean() {
        let optimizer = ThresholdOptimizer::new(SweepRange { lower: 0.1, upper: 0.5, step: 0.1 }).unwrap();
        let flat = Matrix::identity(4);
        let value = optimizer.cohort_threshold(2, &[flat.clone(), flat]).unwrap();
        assert_eq!(value.cohort_size, 2);
        assert_eq!(value.member_optima.len(), 2);
        assert!((value.k - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cohort_and_invalid_sweep() {
        let optimizer = ThresholdOptimizer::new(SweepRange::default()).unwrap();
        assert!(matches!(optimizer.cohort_threshold(0, &[]), Err(AnalysisError::EmptyCohort)));

        let bad_step = SweepRange { lower: 0.1, upper: 1.0, step: 0.0 };
        assert!(matches!(ThresholdOptimizer::new(bad_step), Err(AnalysisError::InvalidConfiguration { .. })));
        let inverted = SweepRange { lower: 0.9, upper: 0.1, step: 0.01 };
        assert!(ThresholdOptimizer::new(inverted).is_err());
    }
}

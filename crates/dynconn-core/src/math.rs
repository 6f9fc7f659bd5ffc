//! Math utilities for connectivity analysis
//!
//! This module provides:
//! - Lower-triangle mirroring for symmetric pairwise matrices
//! - Population moments (mean, variance, standard deviation)
//! - Z-scoring with an explicit zero-variance outcome
//! - Half-open parameter sweeps

use crate::types::Matrix;

// ============================================================================
// Symmetric Mirroring
// ============================================================================

/// Reflect the lower triangle (diagonal included) onto the upper triangle.
///
/// For a matrix whose upper triangle is zero this equals `M + Mᵗ - diag(M)`.
/// Entries above the diagonal are ignored, so the operation is idempotent and
/// the result is exactly symmetric.
///
/// # Panics
///
/// Panics if `m` is not square.
#[must_use]
pub fn mirror_lower(m: &Matrix) -> Matrix {
    assert!(m.is_square(), "mirror_lower requires a square matrix");
    let n = m.rows();
    let mut out = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let v = m[(i, j)];
            out[(i, j)] = v;
            out[(j, i)] = v;
        }
    }
    out
}

// ============================================================================
// Statistics
// ============================================================================

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n); 0 for an empty slice.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Absolute z-scores `|x - mean| / std`.
///
/// Returns `None` when the values have zero (or non-finite) spread, so callers
/// decide how to skip the series instead of dividing by zero.
#[must_use]
pub fn abs_z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let m = mean(values);
    let s = std_dev(values);
    if !(s > 0.0) || !s.is_finite() {
        return None;
    }
    Some(values.iter().map(|v| ((v - m) / s).abs()).collect())
}

// ============================================================================
// Parameter Sweeps
// ============================================================================

/// Values `lower, lower + step, ...` strictly below `upper`.
///
/// Each value is computed as `lower + i * step` to avoid accumulating rounding
/// error. Returns an empty vector for a non-positive step or empty range.
#[must_use]
pub fn sweep(lower: f64, upper: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !(lower < upper) {
        return Vec::new();
    }
    // Guard against upper bounds that are an exact multiple of step away but
    // land a hair above due to rounding.
    let eps = step * 1e-9;
    (0_u32..)
        .map(|i| lower + f64::from(i) * step)
        .take_while(|k| *k < upper - eps)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_lower_symmetric_and_idempotent() {
        let m = Matrix::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.4, 1.0, 0.0],
            vec![0.7, 0.2, 1.0],
        ])
        .unwrap();

        let once = mirror_lower(&m);
        assert!(once.is_symmetric(0.0));
        assert_eq!(once, once.transpose());
        assert_eq!(once[(0, 2)], 0.7);
        assert_eq!(once.diagonal(), vec![1.0, 1.0, 1.0]);

        let twice = mirror_lower(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mirror_matches_sum_formula_for_lower_triangular() {
        let m = Matrix::from_rows(vec![vec![2.0, 0.0], vec![3.0, 5.0]]).unwrap();
        let mirrored = mirror_lower(&m);
        let t = m.transpose();
        for i in 0..2 {
            for j in 0..2 {
                let diag = if i == j { m[(i, i)] } else { 0.0 };
                assert_eq!(mirrored[(i, j)], m[(i, j)] + t[(i, j)] - diag);
            }
        }
    }

    #[test]
    fn test_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((mean(&values) - 3.0).abs() < 1e-12);
        assert!((variance(&values) - 2.0).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_abs_z_scores() {
        let z = abs_z_scores(&[1.0, 3.0]).unwrap();
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[1] - 1.0).abs() < 1e-12);
        assert!(abs_z_scores(&[2.0, 2.0, 2.0]).is_none());
    }

    #[test]
    fn test_sweep_default_range() {
        let ks = sweep(0.1, 1.0, 0.01);
        assert_eq!(ks.len(), 90);
        assert!((ks[0] - 0.1).abs() < 1e-12);
        assert!(*ks.last().unwrap() < 1.0);
        assert!((ks.last().unwrap() - 0.99).abs() < 1e-9);

        assert!(sweep(0.5, 0.5, 0.1).is_empty());
        assert!(sweep(0.0, 1.0, 0.0).is_empty());
    }
}

//! Pairwise phase synchrony and metastability
//!
//! For every region pair the instantaneous synchrony is the magnitude of the
//! two-oscillator order parameter `|(e^{iθ_i} + e^{iθ_j}) / 2|`. Its time mean
//! gives the pairwise synchrony matrix and its (population) time standard
//! deviation gives the metastability matrix. Only the lower triangle is
//! computed; every output matrix is completed with [`mirror_lower`].

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use dynconn_core::{mean, mirror_lower, std_dev, Matrix};

use super::signal::ComplexSignal;
use crate::error::{AnalysisError, AnalysisResult};

// ============================================================================
// Synchrony Tensor
// ============================================================================

/// R × R × T instantaneous synchrony, stored as one symmetric slice per timepoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynchronyTensor {
    n_regions: usize,
    slices: Vec<Matrix>,
}

impl SynchronyTensor {
    /// Build from per-timepoint slices
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if any slice is not `n_regions` square.
    pub fn new(n_regions: usize, slices: Vec<Matrix>) -> AnalysisResult<Self> {
        if let Some((t, s)) = slices.iter().enumerate().find(|(_, s)| s.shape() != (n_regions, n_regions)) {
            return Err(AnalysisError::invalid_input(format!(
                "synchrony slice {t} has shape {:?}, expected {n_regions}x{n_regions}",
                s.shape()
            )));
        }
        Ok(Self { n_regions, slices })
    }

    /// Number of regions
    #[inline]
    pub fn n_regions(&self) -> usize {
        self.n_regions
    }

    /// Number of timepoints
    #[inline]
    pub fn n_timepoints(&self) -> usize {
        self.slices.len()
    }

    /// Synchrony slice at timepoint `t`
    #[inline]
    pub fn slice(&self, t: usize) -> &Matrix {
        &self.slices[t]
    }

    /// All slices in time order
    pub fn slices(&self) -> &[Matrix] {
        &self.slices
    }

    /// Synchrony time course of one region pair
    #[must_use]
    pub fn pair_series(&self, i: usize, j: usize) -> Vec<f64> {
        self.slices.iter().map(|s| s[(i, j)]).collect()
    }
}

// ============================================================================
// Dynamic Measures
// ============================================================================

/// Everything the synchrony stage produces for one network of one subject
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicMeasures {
    /// Instantaneous pairwise synchrony
    pub tensor: SynchronyTensor,
    /// Time-mean synchrony per pair
    pub mean_synchrony: Matrix,
    /// Time-std synchrony per pair
    pub metastability: Matrix,
    /// Kuramoto order parameter over all regions, per timepoint
    pub global_synchrony: Vec<f64>,
    /// Population std of `global_synchrony`
    pub global_metastability: f64,
    /// Mean synchrony of each region with every other region
    pub regional_synchrony: Vec<f64>,
}

// ============================================================================
// Engine
// ============================================================================

/// Computes [`DynamicMeasures`] from an analytic signal
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseSynchronyEngine;

impl PhaseSynchronyEngine {
    /// Create an engine
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute synchrony, metastability and the global summaries
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for a signal with no regions,
    /// no timepoints or a non-finite sample.
    pub fn compute(&self, signal: &ComplexSignal) -> AnalysisResult<DynamicMeasures> {
        let n = signal.n_regions();
        let t_len = signal.n_timepoints();
        if n == 0 || t_len == 0 {
            return Err(AnalysisError::invalid_input(format!(
                "cannot compute synchrony of a {n}x{t_len} signal"
            )));
        }
        if let Some((r, t)) = first_non_finite(signal) {
            return Err(AnalysisError::invalid_input(format!(
                "region {r} has a non-finite sample at timepoint {t}"
            )));
        }

        let phasors: Vec<Vec<Complex<f64>>> = signal
            .regions()
            .map(|row| row.iter().map(|c| Complex::from_polar(1.0, c.arg())).collect())
            .collect();

        let slices: Vec<Matrix> = (0..t_len)
            .into_par_iter()
            .map(|t| synchrony_slice(&phasors, t))
            .collect();
        let tensor = SynchronyTensor::new(n, slices)?;

        let mut mean_lower = Matrix::zeros(n, n);
        let mut std_lower = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let series = tensor.pair_series(i, j);
                mean_lower[(i, j)] = mean(&series);
                std_lower[(i, j)] = std_dev(&series);
            }
        }
        let mean_synchrony = mirror_lower(&mean_lower);
        let metastability = mirror_lower(&std_lower);

        let global_synchrony: Vec<f64> = (0..t_len)
            .map(|t| {
                let sum: Complex<f64> = phasors.iter().map(|row| row[t]).sum();
                (sum / n as f64).norm().clamp(0.0, 1.0)
            })
            .collect();
        let global_metastability = std_dev(&global_synchrony);
        let regional_synchrony = regional_synchrony(&mean_synchrony);

        Ok(DynamicMeasures {
            tensor,
            mean_synchrony,
            metastability,
            global_synchrony,
            global_metastability,
            regional_synchrony,
        })
    }
}

/// Lower triangle of the order-parameter magnitude at one timepoint, mirrored
fn synchrony_slice(phasors: &[Vec<Complex<f64>>], t: usize) -> Matrix {
    let n = phasors.len();
    let mut lower = Matrix::zeros(n, n);
    for i in 0..n {
        lower[(i, i)] = 1.0;
        for j in 0..i {
            lower[(i, j)] = ((phasors[i][t] + phasors[j][t]) * 0.5).norm().clamp(0.0, 1.0);
        }
    }
    mirror_lower(&lower)
}

fn first_non_finite(signal: &ComplexSignal) -> Option<(usize, usize)> {
    signal.regions().enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|c| !c.re.is_finite() || !c.im.is_finite())
            .map(|t| (r, t))
    })
}

/// Row mean of a pairwise matrix excluding the diagonal
fn regional_synchrony(pairwise: &Matrix) -> Vec<f64> {
    let n = pairwise.rows();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| {
            let off: f64 = pairwise.row(i).iter().enumerate().filter(|(j, _)| *j != i).map(|(_, v)| v).sum();
            off / (n - 1) as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal_from_phases(phases: &[Vec<f64>]) -> ComplexSignal {
        let rows = phases
            .iter()
            .map(|row| row.iter().map(|&p| Complex::from_polar(2.5, p)).collect())
            .collect();
        ComplexSignal::from_rows(rows).unwrap()
    }

    #[test]
    fn test_self_pair_is_one_and_bounds() {
        let phases: Vec<Vec<f64>> = (0..4)
            .map(|r| (0..25).map(|t| 0.3 * t as f64 * (r + 1) as f64).collect())
            .collect();
        let measures = PhaseSynchronyEngine::new().compute(&signal_from_phases(&phases)).unwrap();

        for slice in measures.tensor.slices() {
            assert!(slice.is_symmetric(0.0));
            for i in 0..4 {
                assert_eq!(slice[(i, i)], 1.0);
                for j in 0..4 {
                    assert!((0.0..=1.0).contains(&slice[(i, j)]));
                }
            }
        }
        assert!(measures.mean_synchrony.is_symmetric(0.0));
        assert!(measures.metastability.is_symmetric(0.0));
        assert_eq!(measures.metastability[(2, 2)], 0.0);
    }

    #[test]
    fn test_antiphase_pair_has_zero_synchrony() {
        let phases = vec![vec![0.0; 5], vec![std::f64::consts::PI; 5]];
        let measures = PhaseSynchronyEngine::new().compute(&signal_from_phases(&phases)).unwrap();
        assert!(measures.mean_synchrony[(0, 1)] < 1e-12);
        assert!(measures.global_synchrony.iter().all(|r| *r < 1e-12));
    }

    #[test]
    fn test_quarter_phase_offset() {
        let phases = vec![vec![0.0; 8], vec![std::f64::consts::FRAC_PI_2; 8]];
        let measures = PhaseSynchronyEngine::new().compute(&signal_from_phases(&phases)).unwrap();
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!((measures.mean_synchrony[(1, 0)] - expected).abs() < 1e-12);
        assert!(measures.metastability[(1, 0)] < 1e-12);
        assert!((measures.regional_synchrony[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_metastability_of_drifting_pair() {
        // Relative phase alternates between 0 and pi: synchrony 1, 0, 1, 0 ...
        let phases = vec![vec![0.0; 6], (0..6).map(|t| if t % 2 == 0 { 0.0 } else { std::f64::consts::PI }).collect()];
        let measures = PhaseSynchronyEngine::new().compute(&signal_from_phases(&phases)).unwrap();
        assert!((measures.mean_synchrony[(0, 1)] - 0.5).abs() < 1e-12);
        assert!((measures.metastability[(0, 1)] - 0.5).abs() < 1e-12);
        assert!((measures.global_metastability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_signal_rejected() {
        let empty = ComplexSignal::from_rows(Vec::new()).unwrap();
        assert!(PhaseSynchronyEngine::new().compute(&empty).is_err());
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let phases: Vec<Vec<f64>> = (0..3).map(|r| (0..30).map(|t| 0.2 * (t * (r + 1)) as f64).collect()).collect();
        let mut rows: Vec<Vec<Complex<f64>>> = phases
            .iter()
            .map(|row| row.iter().map(|&p| Complex::from_polar(1.0, p)).collect())
            .collect();
        rows[1][7] = Complex::new(f64::NAN, 0.0);
        let signal = ComplexSignal::from_rows(rows).unwrap();

        let err = PhaseSynchronyEngine::new().compute(&signal).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(err.to_string().contains("region 1"));
    }

    #[test]
    fn test_single_region() {
        let measures = PhaseSynchronyEngine::new().compute(&signal_from_phases(&[vec![0.1, 0.2, 0.3]])).unwrap();
        assert_eq!(measures.regional_synchrony, vec![0.0]);
        assert!(measures.global_synchrony.iter().all(|r| (r - 1.0).abs() < 1e-12));
    }
}

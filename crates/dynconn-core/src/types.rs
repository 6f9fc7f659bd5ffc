//! Core types for dynamic connectivity analysis
//!
//! This module provides the data model shared by every analysis stage:
//! - Dense row-major real matrices
//! - Region-by-time series matrices
//! - Closed enumerations for network grouping, windowing and analysis modes
//! - Frequency bands for phase extraction

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Dense Matrix
// ============================================================================

/// Dense real matrix stored in row-major order.
///
/// # Example
///
/// ```
/// use dynconn_core::types::Matrix;
///
/// let mut m = Matrix::zeros(2, 3);
/// m[(1, 2)] = 4.0;
/// assert_eq!(m.row(1), &[0.0, 0.0, 4.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a matrix filled with zeros
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Create a square identity matrix
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Create a matrix from row-major data
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShapeMismatch`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, CoreError> {
        if data.len() != rows * cols {
            return Err(CoreError::ShapeMismatch {
                expected: (rows, cols),
                got: (data.len() / cols.max(1), cols),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from a list of equally long rows
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RaggedRows`] if the rows differ in length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, CoreError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(CoreError::RaggedRows { row: i, expected: n_cols, got: row.len() });
            }
            data.extend(row);
        }
        Ok(Self { rows: n_rows, cols: n_cols, data })
    }

    /// Number of rows
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as (rows, cols)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether the matrix is square
    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Borrow a row
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Borrow a row mutably
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Copy a column out
    #[must_use]
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    /// Flat row-major view of the data
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume into the flat row-major data
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Transposed copy
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out[(j, i)] = self[(i, j)];
            }
        }
        out
    }

    /// Diagonal entries of a square matrix
    #[must_use]
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.rows.min(self.cols)).map(|i| self[(i, i)]).collect()
    }

    /// Element-wise (Hadamard) product
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShapeMismatch`] if the shapes differ.
    pub fn hadamard(&self, other: &Self) -> Result<Self, CoreError> {
        if self.shape() != other.shape() {
            return Err(CoreError::ShapeMismatch { expected: self.shape(), got: other.shape() });
        }
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a * b).collect();
        Ok(Self { rows: self.rows, cols: self.cols, data })
    }

    /// Check symmetry within an absolute tolerance
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        for i in 0..self.rows {
            for j in 0..i {
                if (self[(i, j)] - self[(j, i)]).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// Largest entry and its position, ignoring the diagonal
    pub fn max_off_diagonal(&self) -> Option<((usize, usize), f64)> {
        let mut best: Option<((usize, usize), f64)> = None;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if i == j {
                    continue;
                }
                let v = self[(i, j)];
                if best.map_or(true, |(_, b)| v > b) {
                    best = Some(((i, j), v));
                }
            }
        }
        best
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

// ============================================================================
// Region x Time Series
// ============================================================================

/// Region-averaged signal, one row per region and one column per timepoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesMatrix {
    data: Matrix,
}

impl TimeSeriesMatrix {
    /// Wrap a matrix, checking that both dimensions are non-zero
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyData`] if there are no regions or no timepoints.
    pub fn new(data: Matrix) -> Result<Self, CoreError> {
        if data.rows() == 0 || data.cols() == 0 {
            return Err(CoreError::EmptyData { rows: data.rows(), cols: data.cols() });
        }
        Ok(Self { data })
    }

    /// Build from per-region rows
    ///
    /// # Errors
    ///
    /// Returns an error for ragged or empty input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, CoreError> {
        Self::new(Matrix::from_rows(rows)?)
    }

    /// Number of regions (R)
    #[inline]
    pub fn n_regions(&self) -> usize {
        self.data.rows()
    }

    /// Number of timepoints (T)
    #[inline]
    pub fn n_timepoints(&self) -> usize {
        self.data.cols()
    }

    /// Signal of one region over time
    #[inline]
    pub fn region(&self, r: usize) -> &[f64] {
        self.data.row(r)
    }
}

// ============================================================================
// Analysis Modes
// ============================================================================

/// How regions are grouped into networks before analysis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// All segmented regions in one network
    FullNetwork,
    /// Regions inside each resting-state sub-network, one analysis per sub-network
    WithinNetwork,
    /// One averaged signal per sub-network, compared against each other
    BetweenNetwork,
}

impl NetworkType {
    /// All variants, in declaration order
    pub const ALL: [Self; 3] = [Self::FullNetwork, Self::WithinNetwork, Self::BetweenNetwork];

    /// Canonical name used on the command line and in artifact paths
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FullNetwork => "full_network",
            Self::WithinNetwork => "within_network",
            Self::BetweenNetwork => "between_network",
        }
    }

    /// Whether this grouping is split into several sub-networks
    #[inline]
    #[must_use]
    pub const fn has_subnetworks(self) -> bool {
        matches!(self, Self::WithinNetwork)
    }
}

/// Whether the analytic signal is smoothed with a sliding window.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    /// Use the analytic signal as is
    NonSliding,
    /// Boxcar-average the analytic signal before synchrony
    Sliding,
}

impl WindowType {
    /// All variants, in declaration order
    pub const ALL: [Self; 2] = [Self::NonSliding, Self::Sliding];

    /// Canonical name used on the command line and in artifact paths
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NonSliding => "non-sliding",
            Self::Sliding => "sliding",
        }
    }
}

/// Which feature set is clustered per subject.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    /// Z-thresholded raw BOLD activation
    #[serde(rename = "BOLD")]
    Bold,
    /// Flattened binary synchrony graphs
    #[serde(rename = "synchrony")]
    Synchrony,
    /// Graph-theoretic metrics of the binary synchrony graphs
    #[serde(rename = "graph_analysis")]
    GraphAnalysis,
}

impl AnalysisType {
    /// All variants, in declaration order
    pub const ALL: [Self; 3] = [Self::Bold, Self::Synchrony, Self::GraphAnalysis];

    /// Canonical name used on the command line and in artifact paths
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bold => "BOLD",
            Self::Synchrony => "synchrony",
            Self::GraphAnalysis => "graph_analysis",
        }
    }

    /// Whether this analysis needs the binarized graph sequence
    #[inline]
    #[must_use]
    pub const fn needs_threshold(self) -> bool {
        !matches!(self, Self::Bold)
    }
}

macro_rules! impl_mode_parsing {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|mode| mode.name() == s)
                    .ok_or_else(|| CoreError::UnknownMode {
                        kind: $kind.to_string(),
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

impl_mode_parsing!(NetworkType, "network type");
impl_mode_parsing!(WindowType, "window type");
impl_mode_parsing!(AnalysisType, "analysis type");

/// Cohort membership of a subject.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectGroup {
    /// Healthy control; part of the threshold reference cohort
    Control,
    /// Any other subject
    #[default]
    Patient,
}

// ============================================================================
// Frequency Band
// ============================================================================

/// Pass-band used for phase extraction, in Hz.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    /// Lower cutoff (Hz)
    pub lower_hz: f64,
    /// Upper cutoff (Hz)
    pub upper_hz: f64,
}

impl FrequencyBand {
    /// Create a band
    #[must_use]
    pub const fn new(lower_hz: f64, upper_hz: f64) -> Self {
        Self { lower_hz, upper_hz }
    }

    /// Check the band against the Nyquist frequency of a sampling interval
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParameter`] unless
    /// `0 <= lower < upper <= 1 / (2 * sampling_interval)`.
    pub fn validate(&self, sampling_interval: f64) -> Result<(), CoreError> {
        if !(sampling_interval > 0.0) {
            return Err(CoreError::invalid_parameter(
                "sampling_interval",
                format!("must be positive, got {sampling_interval}"),
            ));
        }
        let nyquist = 0.5 / sampling_interval;
        if !(self.lower_hz >= 0.0 && self.lower_hz < self.upper_hz && self.upper_hz <= nyquist) {
            return Err(CoreError::invalid_parameter(
                "band",
                format!(
                    "expected 0 <= lower < upper <= {nyquist} Hz, got {}-{} Hz",
                    self.lower_hz, self.upper_hz
                ),
            ));
        }
        Ok(())
    }

    /// Whether a (signed) frequency falls inside the band by magnitude
    #[inline]
    #[must_use]
    pub fn contains(&self, freq_hz: f64) -> bool {
        let f = freq_hz.abs();
        f >= self.lower_hz && f <= self.upper_hz
    }
}

impl Default for FrequencyBand {
    /// 0.04-0.07 Hz, the slow-4 band used for BOLD phase synchrony
    fn default() -> Self {
        Self::new(0.04, 0.07)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_indexing_and_transpose() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 0)], 4.0);

        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t.column(1), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_hadamard() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let mask = Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(a.hadamard(&mask).unwrap().as_slice(), &[0.0, 2.0, 3.0, 0.0]);
        assert!(matches!(a.hadamard(&Matrix::zeros(2, 3)), Err(CoreError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(err, CoreError::RaggedRows { row: 1, expected: 2, got: 1 });
    }

    #[test]
    fn test_time_series_rejects_empty() {
        assert!(TimeSeriesMatrix::from_rows(vec![]).is_err());
        assert!(TimeSeriesMatrix::from_rows(vec![vec![]]).is_err());
    }

    #[test]
    fn test_max_off_diagonal() {
        let m = Matrix::from_rows(vec![
            vec![1.0, 0.2, 0.9],
            vec![0.2, 1.0, 0.3],
            vec![0.9, 0.3, 1.0],
        ])
        .unwrap();
        let ((i, j), v) = m.max_off_diagonal().unwrap();
        assert_eq!((i.min(j), i.max(j)), (0, 2));
        assert!((v - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("within_network".parse::<NetworkType>().unwrap(), NetworkType::WithinNetwork);
        assert_eq!("non-sliding".parse::<WindowType>().unwrap(), WindowType::NonSliding);
        assert_eq!("BOLD".parse::<AnalysisType>().unwrap(), AnalysisType::Bold);

        let err = "pairwise".parse::<AnalysisType>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownMode { .. }));
    }

    #[test]
    fn test_mode_serde_names_match_cli_names() {
        for mode in NetworkType::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.name()));
        }
        for mode in WindowType::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.name()));
        }
        for mode in AnalysisType::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.name()));
        }
    }

    #[test]
    fn test_band_validation() {
        let band = FrequencyBand::default();
        assert!(band.validate(2.0).is_ok());
        assert!(band.validate(0.0).is_err());
        // Nyquist at TR=10s is 0.05 Hz
        assert!(band.validate(10.0).is_err());
        assert!(FrequencyBand::new(0.07, 0.04).validate(2.0).is_err());
        assert!(band.contains(-0.05));
        assert!(!band.contains(0.1));
    }
}

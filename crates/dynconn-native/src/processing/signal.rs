//! Analytic-signal extraction
//!
//! Turns a region-by-time BOLD matrix into a complex analytic signal whose
//! argument is the instantaneous phase of each region:
//!
//! 1. band-pass each region (Fourier or zero-phase Butterworth)
//! 2. subtract each region's own mean (after filtering)
//! 3. Hilbert transform
//! 4. trim [`EDGE_TRIM`] samples from both ends of the time axis

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use dynconn_core::{FrequencyBand, TimeSeriesMatrix};

use super::fft::SpectralFilter;
use super::filters::BandpassFilter;
use crate::error::{AnalysisError, AnalysisResult};

/// Samples dropped at each end of the analytic signal to suppress edge effects
pub const EDGE_TRIM: usize = 10;

/// Complex-valued region-by-time matrix
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexSignal {
    rows: Vec<Vec<Complex<f64>>>,
}

impl ComplexSignal {
    /// Build from per-region rows
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for ragged rows.
    pub fn from_rows(rows: Vec<Vec<Complex<f64>>>) -> AnalysisResult<Self> {
        let t = rows.first().map_or(0, Vec::len);
        if let Some((r, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != t) {
            return Err(AnalysisError::invalid_input(format!(
                "complex signal row {r} has {} samples, expected {t}",
                row.len()
            )));
        }
        Ok(Self { rows })
    }

    /// Number of regions
    #[inline]
    pub fn n_regions(&self) -> usize {
        self.rows.len()
    }

    /// Number of timepoints
    #[inline]
    pub fn n_timepoints(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Samples of one region
    #[inline]
    pub fn region(&self, r: usize) -> &[Complex<f64>] {
        &self.rows[r]
    }

    /// Iterate over region rows
    pub fn regions(&self) -> impl Iterator<Item = &[Complex<f64>]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Band-pass implementation used before the Hilbert transform
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandpassMethod {
    /// Zero every FFT bin outside the band
    #[default]
    Fourier,
    /// Second-order Butterworth high/low-pass pair, run forward and backward
    Butterworth,
}

/// Band-pass + demean + Hilbert + trim
pub struct SignalFilter {
    sampling_interval: f64,
    band: FrequencyBand,
    method: BandpassMethod,
    spectral: SpectralFilter,
}

impl SignalFilter {
    /// Create a filter for a sampling interval (TR, seconds) and pass-band
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if TR is not positive or the
    /// band does not fit below Nyquist.
    pub fn new(sampling_interval: f64, band: FrequencyBand, method: BandpassMethod) -> AnalysisResult<Self> {
        band.validate(sampling_interval)?;
        Ok(Self {
            sampling_interval,
            band,
            method,
            spectral: SpectralFilter::new(),
        })
    }

    /// Band-pass and demean one region
    fn filter_region(&mut self, samples: &[f64]) -> Vec<f64> {
        let mut filtered = match self.method {
            BandpassMethod::Fourier => self.spectral.bandpass(samples, self.sampling_interval, self.band),
            BandpassMethod::Butterworth => {
                let mut bp = BandpassFilter::new(1.0 / self.sampling_interval, self.band.lower_hz, self.band.upper_hz);
                bp.filtfilt(samples)
            }
        };
        let m = dynconn_core::mean(&filtered);
        for v in &mut filtered {
            *v -= m;
        }
        filtered
    }

    /// Compute the trimmed analytic signal of every region
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the series has
    /// `2 * EDGE_TRIM` timepoints or fewer.
    pub fn analytic_signal(&mut self, series: &TimeSeriesMatrix) -> AnalysisResult<ComplexSignal> {
        let t = series.n_timepoints();
        if t <= 2 * EDGE_TRIM {
            return Err(AnalysisError::invalid_input(format!(
                "time series has {t} timepoints, need more than {}",
                2 * EDGE_TRIM
            )));
        }

        let rows = (0..series.n_regions())
            .map(|r| {
                let filtered = self.filter_region(series.region(r));
                let analytic = self.spectral.analytic(&filtered);
                analytic[EDGE_TRIM..t - EDGE_TRIM].to_vec()
            })
            .collect();

        ComplexSignal::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn slow_series(n_regions: usize, n_timepoints: usize, tr: f64) -> TimeSeriesMatrix {
        let rows = (0..n_regions)
            .map(|r| {
                (0..n_timepoints)
                    .map(|i| 100.0 + (2.0 * PI * 0.05 * i as f64 * tr + r as f64).sin())
                    .collect()
            })
            .collect();
        TimeSeriesMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_output_is_trimmed() {
        let mut filter = SignalFilter::new(2.0, FrequencyBand::default(), BandpassMethod::Fourier).unwrap();
        let signal = filter.analytic_signal(&slow_series(3, 100, 2.0)).unwrap();
        assert_eq!(signal.n_regions(), 3);
        assert_eq!(signal.n_timepoints(), 80);
    }

    #[test]
    fn test_rejects_short_series() {
        let mut filter = SignalFilter::new(2.0, FrequencyBand::default(), BandpassMethod::Fourier).unwrap();
        let err = filter.analytic_signal(&slow_series(2, 20, 2.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(filter.analytic_signal(&slow_series(2, 21, 2.0)).is_ok());
    }

    #[test]
    fn test_rejects_non_positive_tr() {
        assert!(SignalFilter::new(0.0, FrequencyBand::default(), BandpassMethod::Fourier).is_err());
        assert!(SignalFilter::new(-2.0, FrequencyBand::default(), BandpassMethod::Butterworth).is_err());
    }

    #[test]
    fn test_filtered_region_is_zero_mean() {
        for method in [BandpassMethod::Fourier, BandpassMethod::Butterworth] {
            let mut filter = SignalFilter::new(2.0, FrequencyBand::default(), method).unwrap();
            let series = slow_series(1, 120, 2.0);
            let filtered = filter.filter_region(series.region(0));
            assert!(dynconn_core::mean(&filtered).abs() < 1e-9);
        }
    }

    #[test]
    fn test_butterworth_path_produces_signal() {
        let mut filter = SignalFilter::new(2.0, FrequencyBand::default(), BandpassMethod::Butterworth).unwrap();
        let signal = filter.analytic_signal(&slow_series(2, 120, 2.0)).unwrap();
        assert_eq!(signal.n_timepoints(), 100);
        assert!(signal.region(0).iter().any(|c| c.norm() > 1e-3));
    }
}

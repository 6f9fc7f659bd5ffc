//! Sliding-window smoothing of complex signals
//!
//! Boxcar moving average over fully overlapping windows only, so the time
//! axis shrinks by `window - 1`.

use rustfft::num_complex::Complex;

use super::signal::ComplexSignal;
use crate::error::{AnalysisError, AnalysisResult};

/// Uniform moving-average smoother
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlidingWindowSmoother {
    window: usize,
}

impl SlidingWindowSmoother {
    /// Create a smoother with window size `window`
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for a zero window.
    pub fn new(window: usize) -> AnalysisResult<Self> {
        if window == 0 {
            return Err(AnalysisError::invalid_input("sliding window size must be at least 1"));
        }
        Ok(Self { window })
    }

    /// Average every region over each full window
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the window is longer than the signal.
    pub fn smooth(&self, signal: &ComplexSignal) -> AnalysisResult<ComplexSignal> {
        let t = signal.n_timepoints();
        if self.window > t {
            return Err(AnalysisError::invalid_input(format!(
                "sliding window of {} exceeds signal length {t}",
                self.window
            )));
        }

        let scale = 1.0 / self.window as f64;
        let rows = signal
            .regions()
            .map(|row| {
                row.windows(self.window)
                    .map(|w| w.iter().sum::<Complex<f64>>() * scale)
                    .collect()
            })
            .collect();

        ComplexSignal::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n_regions: usize, n: usize) -> ComplexSignal {
        let rows = (0..n_regions)
            .map(|r| (0..n).map(|i| Complex::new(i as f64, -(r as f64) * i as f64)).collect())
            .collect();
        ComplexSignal::from_rows(rows).unwrap()
    }

    #[test]
    fn test_window_one_is_identity() {
        let signal = ramp(3, 17);
        let smoothed = SlidingWindowSmoother::new(1).unwrap().smooth(&signal).unwrap();
        assert_eq!(smoothed, signal);
    }

    #[test]
    fn test_output_length() {
        let signal = ramp(2, 30);
        for w in [2, 5, 30] {
            let smoothed = SlidingWindowSmoother::new(w).unwrap().smooth(&signal).unwrap();
            assert_eq!(smoothed.n_timepoints(), 30 - w + 1);
            assert_eq!(smoothed.n_regions(), 2);
        }
    }

    #[test]
    fn test_boxcar_average() {
        let signal = ramp(2, 6);
        let smoothed = SlidingWindowSmoother::new(3).unwrap().smooth(&signal).unwrap();
        // mean of 0,1,2 = 1 ; region 1 imaginary part is -i
        assert!((smoothed.region(0)[0] - Complex::new(1.0, 0.0)).norm() < 1e-12);
        assert!((smoothed.region(1)[3] - Complex::new(4.0, -4.0)).norm() < 1e-12);
    }

    #[test]
    fn test_invalid_windows() {
        assert!(SlidingWindowSmoother::new(0).is_err());
        let err = SlidingWindowSmoother::new(10).unwrap().smooth(&ramp(1, 5)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }
}

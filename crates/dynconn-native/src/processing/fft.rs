//! FFT-based spectral filtering
//!
//! Provides the Fourier (brick-wall) band-pass and the discrete analytic
//! signal (Hilbert transform) used for instantaneous phase extraction.

use rustfft::{num_complex::Complex, FftPlanner};

use dynconn_core::FrequencyBand;

/// FFT-based spectral filter with a reusable planner
pub struct SpectralFilter {
    planner: FftPlanner<f64>,
    buffer: Vec<Complex<f64>>,
}

impl SpectralFilter {
    /// Create a new spectral filter
    #[must_use]
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
        }
    }

    fn load(&mut self, samples: &[f64]) {
        self.buffer.clear();
        self.buffer.extend(samples.iter().map(|&s| Complex::new(s, 0.0)));
    }

    fn forward(&mut self) {
        let fft = self.planner.plan_fft_forward(self.buffer.len());
        fft.process(&mut self.buffer);
    }

    fn inverse(&mut self) {
        let n = self.buffer.len();
        let ifft = self.planner.plan_fft_inverse(n);
        ifft.process(&mut self.buffer);
        let norm = 1.0 / n as f64;
        for c in &mut self.buffer {
            *c *= norm;
        }
    }

    /// Band-pass a real series by zeroing every non-DC bin outside `band`.
    ///
    /// The DC bin is kept, so callers demean afterwards if they need a
    /// zero-mean result.
    pub fn bandpass(&mut self, samples: &[f64], sampling_interval: f64, band: FrequencyBand) -> Vec<f64> {
        if samples.is_empty() {
            return Vec::new();
        }
        self.load(samples);
        self.forward();

        let freqs = fft_frequencies(samples.len(), sampling_interval);
        for (bin, (c, &f)) in self.buffer.iter_mut().zip(&freqs).enumerate() {
            if bin != 0 && !band.contains(f) {
                *c = Complex::new(0.0, 0.0);
            }
        }

        self.inverse();
        self.buffer.iter().map(|c| c.re).collect()
    }

    /// Discrete analytic signal of a real series.
    ///
    /// The real part reproduces the input and the imaginary part is its
    /// Hilbert transform.
    pub fn analytic(&mut self, samples: &[f64]) -> Vec<Complex<f64>> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }
        self.load(samples);
        self.forward();

        for (bin, c) in self.buffer.iter_mut().enumerate() {
            *c *= analytic_gain(bin, n);
        }

        self.inverse();
        self.buffer.clone()
    }
}

impl Default for SpectralFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-sided spectrum weights: DC and Nyquist kept, positive bins doubled,
/// negative bins removed.
fn analytic_gain(bin: usize, n: usize) -> f64 {
    if bin == 0 || (n % 2 == 0 && bin == n / 2) {
        1.0
    } else if bin < (n + 1) / 2 {
        2.0
    } else {
        0.0
    }
}

/// Signed frequency (Hz) of each FFT bin, in standard FFT order
#[must_use]
pub fn fft_frequencies(n: usize, sampling_interval: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * sampling_interval);
    (0..n)
        .map(|i| {
            if i < (n + 1) / 2 {
                i as f64 * scale
            } else {
                -((n - i) as f64) * scale
            }
        })
        .collect()
}

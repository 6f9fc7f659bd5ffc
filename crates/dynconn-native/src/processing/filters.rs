//! Digital filters for slow BOLD oscillations
//!
//! Provides floating-point Butterworth biquads and a zero-phase band-pass
//! built from them. Used as the alternative to the Fourier band-pass when a
//! smooth roll-off is preferred over a brick-wall spectrum.

/// Butterworth IIR filter coefficients (second-order section)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0=1, a1, a2]
    pub a: [f64; 3],
}

/// Second-order biquad filter section (transposed direct form II)
#[derive(Clone, Debug)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    /// State: [z1, z2]
    state: [f64; 2],
}

impl Biquad {
    /// Create a new biquad section with given coefficients
    #[must_use]
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, state: [0.0, 0.0] }
    }

    /// Create a second-order Butterworth lowpass filter
    #[must_use]
    pub fn lowpass(sample_rate: f64, cutoff: f64) -> Self {
        let k = (std::f64::consts::PI * cutoff / sample_rate).tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        Self::new(BiquadCoeffs {
            b: [k2 * norm, 2.0 * k2 * norm, k2 * norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        })
    }

    /// Create a second-order Butterworth highpass filter
    #[must_use]
    pub fn highpass(sample_rate: f64, cutoff: f64) -> Self {
        let k = (std::f64::consts::PI * cutoff / sample_rate).tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        Self::new(BiquadCoeffs {
            b: [norm, -2.0 * norm, norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        })
    }

    /// Coefficients of this section
    #[must_use]
    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Process a single sample
    pub fn filter(&mut self, input: f64) -> f64 {
        let BiquadCoeffs { b, a } = self.coeffs;
        let output = b[0] * input + self.state[0];
        self.state[0] = b[1] * input - a[1] * output + self.state[1];
        self.state[1] = b[2] * input - a[2] * output;
        output
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.state = [0.0, 0.0];
    }
}

/// Butterworth band-pass built from a highpass and a lowpass section
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    lowpass: Biquad,
    highpass: Biquad,
}

impl BandpassFilter {
    /// Create a bandpass filter for a frequency range
    #[must_use]
    pub fn new(sample_rate: f64, low_cutoff: f64, high_cutoff: f64) -> Self {
        Self {
            lowpass: Biquad::lowpass(sample_rate, high_cutoff),
            highpass: Biquad::highpass(sample_rate, low_cutoff),
        }
    }

    /// Process a single sample
    pub fn filter(&mut self, input: f64) -> f64 {
        let hp_out = self.highpass.filter(input);
        self.lowpass.filter(hp_out)
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.lowpass.reset();
        self.highpass.reset();
    }

    /// Zero-phase filtering: run forward, then backward over the reversed output.
    ///
    /// State is reset before each pass, so the call does not depend on
    /// previously filtered samples.
    pub fn filtfilt(&mut self, samples: &[f64]) -> Vec<f64> {
        self.reset();
        let mut out: Vec<f64> = samples.iter().map(|&x| self.filter(x)).collect();

        self.reset();
        out.reverse();
        for v in &mut out {
            *v = self.filter(*v);
        }
        out.reverse();
        self.reset();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq_hz: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut lp = Biquad::lowpass(0.5, 0.07);
        let mut out = 0.0;
        for _ in 0..500 {
            out = lp.filter(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut hp = Biquad::highpass(0.5, 0.04);
        let mut out = 1.0;
        for _ in 0..2000 {
            out = hp.filter(1.0);
        }
        assert!(out.abs() < 1e-3);
    }

    #[test]
    fn test_bandpass_attenuates_out_of_band() {
        let fs = 0.5; // TR = 2 s
        let mut bp = BandpassFilter::new(fs, 0.04, 0.07);

        let in_band = bp.filtfilt(&tone(0.055, fs, 400));
        let above = bp.filtfilt(&tone(0.2, fs, 400));

        // Ignore edges where the zero-phase passes ring in
        let core = 100..300;
        assert!(rms(&in_band[core.clone()]) > 0.25);
        assert!(rms(&above[core]) < 0.1);
    }

    #[test]
    fn test_filtfilt_is_stateless() {
        let mut bp = BandpassFilter::new(0.5, 0.04, 0.07);
        let signal = tone(0.05, 0.5, 64);
        let first = bp.filtfilt(&signal);
        let second = bp.filtfilt(&signal);
        assert_eq!(first, second);
    }
}

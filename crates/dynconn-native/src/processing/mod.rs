//! Signal processing pipelines
//!
//! This module turns region-averaged BOLD series into dynamic synchrony:
//! - [`filters`]: Butterworth biquads and zero-phase band-pass
//! - [`fft`]: Fourier band-pass and analytic signal
//! - [`signal`]: band-pass + demean + Hilbert + edge trim
//! - [`smoothing`]: sliding-window boxcar average
//! - [`synchrony`]: pairwise phase synchrony and metastability

pub mod fft;
pub mod filters;
pub mod signal;
pub mod smoothing;
pub mod synchrony;

pub use signal::{BandpassMethod, ComplexSignal, SignalFilter, EDGE_TRIM};
pub use smoothing::SlidingWindowSmoother;
pub use synchrony::{DynamicMeasures, PhaseSynchronyEngine, SynchronyTensor};

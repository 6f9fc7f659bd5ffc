//! Dynconn Native - Host-side dynamic functional connectivity analysis
//!
//! This crate turns region-averaged BOLD time series into dynamic
//! connectivity summaries:
//! - Phase extraction (band-pass, Hilbert transform, sliding window)
//! - Pairwise phase synchrony and metastability
//! - Cost-efficiency thresholding and binary graph metrics
//! - K-means state clustering and Shannon entropy
//! - A resumable, per-subject parallel batch pipeline
//!
//! # Modules
//!
//! - [`processing`]: Signal processing and synchrony
//! - [`graph`]: Binary graphs, thresholds, null models and metrics
//! - [`cluster`]: Feature matrices, k-means and entropy
//! - [`pipeline`]: Configuration, artifacts and the batch runner

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod cluster;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod processing;

// Re-export key types
pub use error::{AnalysisError, AnalysisResult};
pub use processing::{DynamicMeasures, PhaseSynchronyEngine, SignalFilter, SlidingWindowSmoother, SynchronyTensor};

pub use graph::{GraphMetricsBundle, GraphMetricsEngine, ThresholdOptimizer, ThresholdValue};

pub use cluster::{ClusterEntropyValidator, ClusterReport, EntropyEstimate};

pub use pipeline::{AnalysisConfig, BatchReport, BatchRunner, ConfigOverrides, SubjectManifest};

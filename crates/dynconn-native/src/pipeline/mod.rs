//! Batch pipeline
//!
//! - [`config`]: analysis configuration and overrides
//! - [`manifest`]: subjects and the reference cohort
//! - [`artifacts`]: paths, input parsing, atomic cached JSON artifacts
//! - [`batch`]: the per-subject runner with the threshold barrier

pub mod artifacts;
pub mod batch;
pub mod config;
pub mod manifest;

pub use artifacts::{
    load_or_compute, load_or_compute_stamped, parse_time_series, read_json, read_time_series, write_json_atomic,
    ArtifactLayout, ThresholdStamped,
};
pub use batch::{subject_seed, BatchReport, BatchRunner, SubjectClusterReports, SubjectGraphMetrics, SubjectMeasures};
pub use config::{AnalysisConfig, ConfigOverrides};
pub use manifest::{Subject, SubjectManifest};

//! Binary graph analysis
//!
//! - [`binary`]: adjacency graphs, distances, components, clustering
//! - [`threshold`]: binarization and cost-efficiency threshold selection
//! - [`null_model`]: degree-preserving randomization
//! - [`metrics`]: per-timepoint weight, degree and small-worldness

pub mod binary;
pub mod metrics;
pub mod null_model;
pub mod threshold;

pub use binary::{characteristic_path_length, BinaryGraph, BinaryGraphSequence};
pub use metrics::{ComponentMetrics, Elimination, GraphMetricsBundle, GraphMetricsEngine, MetricKey};
pub use null_model::{randomize_connected, slice_seed, NullModelConfig};
pub use threshold::{binarize, cost, global_efficiency, SweepRange, ThresholdOptimizer, ThresholdValue};

//! State clustering and entropy
//!
//! - [`features`]: feature matrices for each analysis type
//! - [`kmeans`]: k-means++ / Lloyd clustering
//! - [`entropy`]: Shannon entropy of label distributions
//! - [`validator`]: clustering + entropy per feature set

pub mod entropy;
pub mod features;
pub mod kmeans;
pub mod validator;

pub use entropy::{shannon_entropy, EntropyEstimate};
pub use features::{bold_activation, flatten_graphs, graph_metric_features, FeatureSet, DEFAULT_BOLD_THRESHOLD};
pub use kmeans::{ClusterAssignment, KMeans};
pub use validator::{ClusterEntropyValidator, ClusterReport};

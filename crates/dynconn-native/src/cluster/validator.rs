//! Clustering + entropy validation of a feature matrix

use serde::{Deserialize, Serialize};
use tracing::debug;

use dynconn_core::Matrix;

use super::entropy::{shannon_entropy, EntropyEstimate};
use super::features::FeatureSet;
use super::kmeans::{ClusterAssignment, KMeans};
use crate::error::AnalysisResult;

/// K-means partition of one feature set and the entropy of its labels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Feature set that was clustered
    pub feature: FeatureSet,
    /// Samples × features of the input
    pub shape: (usize, usize),
    /// K-means result
    pub assignment: ClusterAssignment,
    /// Entropy of the label distribution
    pub entropy: EntropyEstimate,
}

/// Runs k-means on a feature matrix and scores the label distribution
#[derive(Clone, Copy, Debug)]
pub struct ClusterEntropyValidator {
    kmeans: KMeans,
}

impl ClusterEntropyValidator {
    /// Validator with `n_clusters` clusters, `restarts` k-means runs and a seed
    ///
    /// # Errors
    ///
    /// Returns [`crate::AnalysisError::InvalidConfiguration`] for zero clusters.
    pub fn new(n_clusters: usize, restarts: usize, seed: u64) -> AnalysisResult<Self> {
        let kmeans = KMeans::new(n_clusters)?.with_restarts(restarts).with_seed(seed);
        Ok(Self { kmeans })
    }

    /// Cluster `features` and compute the entropy of the labels
    #[must_use]
    pub fn evaluate(&self, feature: FeatureSet, features: &Matrix) -> ClusterReport {
        let assignment = self.kmeans.fit(features);
        let entropy = shannon_entropy(&assignment.labels);
        debug!(
            feature = feature.name(),
            samples = features.rows(),
            entropy = entropy.entropy,
            "Clustered feature set"
        );
        ClusterReport {
            feature,
            shape: features.shape(),
            assignment,
            entropy,
        }
    }
}

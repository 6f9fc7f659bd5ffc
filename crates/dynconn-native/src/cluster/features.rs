//! Feature matrices for clustering
//!
//! Every builder returns a samples × features [`Matrix`]: thresholded BOLD
//! activation, flattened binary graphs, or one of the graph metrics.

use serde::{Deserialize, Serialize};
use tracing::debug;

use dynconn_core::math::abs_z_scores;
use dynconn_core::{AnalysisType, Matrix, TimeSeriesMatrix};

use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::{BinaryGraphSequence, GraphMetricsBundle};

/// Default |z| above which a region counts as active
pub const DEFAULT_BOLD_THRESHOLD: f64 = 1.3;

/// Feature set a clustering is run on
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Binary |z|-score activation per region (timepoints × regions)
    BoldActivation,
    /// Flattened binary synchrony graph per timepoint
    BinarySynchrony,
    /// Average thresholded synchrony per region
    Weight,
    /// Degree centrality per region
    Degree,
    /// Small-worldness of every record with a defined value
    SmallWorldness,
    /// Flattened path-distance matrix of every full-slice record
    PathDistance,
}

impl FeatureSet {
    /// Stable name used in artifacts and logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BoldActivation => "bold_activation",
            Self::BinarySynchrony => "binary_synchrony",
            Self::Weight => "weight",
            Self::Degree => "degree",
            Self::SmallWorldness => "small_worldness",
            Self::PathDistance => "path_distance",
        }
    }

    /// Feature sets clustered for an analysis type
    #[must_use]
    pub const fn for_analysis(analysis: AnalysisType) -> &'static [Self] {
        match analysis {
            AnalysisType::Bold => &[Self::BoldActivation],
            AnalysisType::Synchrony => &[Self::BinarySynchrony],
            AnalysisType::GraphAnalysis => &[Self::Weight, Self::Degree, Self::SmallWorldness, Self::PathDistance],
        }
    }
}

/// Binary activation states: `1` where `|x - μ| / σ > threshold`.
///
/// Samples are timepoints and features are regions. Regions with zero
/// variance stay all-zero.
#[must_use]
pub fn bold_activation(series: &TimeSeriesMatrix, threshold: f64) -> Matrix {
    let mut active = Matrix::zeros(series.n_timepoints(), series.n_regions());
    for r in 0..series.n_regions() {
        let Some(z) = abs_z_scores(series.region(r)) else {
            debug!(region = r, "Skipping zero-variance region");
            continue;
        };
        for (t, score) in z.into_iter().enumerate() {
            if score > threshold {
                active[(t, r)] = 1.0;
            }
        }
    }
    active
}

/// One row per timepoint holding the row-major flattened adjacency
#[must_use]
pub fn flatten_graphs(graphs: &BinaryGraphSequence) -> Matrix {
    let n = graphs.n_nodes();
    let mut flat = Matrix::zeros(graphs.n_timepoints(), n * n);
    for (t, g) in graphs.slices().iter().enumerate() {
        flat.row_mut(t).copy_from_slice(&g.flatten());
    }
    flat
}

/// Feature matrix of one graph metric
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidConfiguration`] for a feature set that is
/// not a graph metric.
pub fn graph_metric_features(bundle: &GraphMetricsBundle, feature: FeatureSet) -> AnalysisResult<Matrix> {
    match feature {
        FeatureSet::Weight => Ok(bundle.weight.clone()),
        FeatureSet::Degree => Ok(bundle.degree.clone()),
        FeatureSet::SmallWorldness => {
            let values: Vec<f64> = bundle.records.iter().filter_map(|r| r.small_worldness).collect();
            Ok(Matrix::from_vec(values.len(), 1, values)?)
        }
        FeatureSet::PathDistance => {
            let n = bundle.weight.cols();
            let rows: Vec<f64> = bundle
                .full_slice_records()
                .flat_map(|r| r.path_distance.iter().copied())
                .collect();
            Ok(Matrix::from_vec(rows.len() / (n * n).max(1), n * n, rows)?)
        }
        FeatureSet::BoldActivation | FeatureSet::BinarySynchrony => Err(AnalysisError::invalid_configuration(
            format!("{} is not a graph metric", feature.name()),
        )),
    }
}

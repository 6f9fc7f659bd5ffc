//! Per-timepoint graph metrics
//!
//! For every slice of a binary graph sequence this computes regional weight
//! and degree, splits the slice into connected components, and measures
//! transitivity, clustering, characteristic path length and small-worldness
//! against a degree-preserving null model for each non-singleton component.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dynconn_core::Matrix;

use super::binary::{characteristic_path_length, BinaryGraph, BinaryGraphSequence};
use super::null_model::{randomize_connected, slice_seed, NullModelConfig};
use crate::error::{AnalysisError, AnalysisResult};
use crate::processing::SynchronyTensor;

// ============================================================================
// Records
// ============================================================================

/// Identifies one metric record: a whole slice or one of its components
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    /// Timepoint index
    pub timepoint: usize,
    /// Component id, `None` when the slice is a single component
    pub component: Option<usize>,
}

impl MetricKey {
    /// Key for a connected slice
    #[must_use]
    pub fn slice(timepoint: usize) -> Self {
        Self { timepoint, component: None }
    }

    /// Key for one component of a disconnected slice
    #[must_use]
    pub fn component(timepoint: usize, component: usize) -> Self {
        Self { timepoint, component: Some(component) }
    }
}

/// Metrics of one connected (sub)graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    /// Record key
    pub key: MetricKey,
    /// Original node indices, ascending
    pub nodes: Vec<usize>,
    /// Closed / connected triplet ratio
    pub transitivity: f64,
    /// Mean local clustering of the observed graph
    pub clustering: f64,
    /// Mean local clustering of the null model
    pub random_clustering: f64,
    /// Characteristic path length of the observed graph
    pub path_length: f64,
    /// Characteristic path length of the null model
    pub random_path_length: f64,
    /// `(C / C_rand) / (L / L_rand)`; `None` when a denominator is zero
    pub small_worldness: Option<f64>,
    /// Row-major shortest-path matrix over `nodes`
    pub path_distance: Vec<f64>,
}

/// Node dropped from a slice because it formed its own component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elimination {
    /// Timepoint index
    pub timepoint: usize,
    /// Node index
    pub node: usize,
}

/// All graph metrics of one subject network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphMetricsBundle {
    /// Average thresholded synchrony per region (T × R)
    pub weight: Matrix,
    /// Degree centrality per region (T × R)
    pub degree: Matrix,
    /// Records sorted by key
    pub records: Vec<ComponentMetrics>,
    /// Singleton nodes excluded from metric computation
    pub eliminations: Vec<Elimination>,
}

impl GraphMetricsBundle {
    /// Record for `key`, if the slice or component produced one
    #[must_use]
    pub fn get(&self, key: MetricKey) -> Option<&ComponentMetrics> {
        self.records
            .binary_search_by(|r| r.key.cmp(&key))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Records covering an entire slice
    pub fn full_slice_records(&self) -> impl Iterator<Item = &ComponentMetrics> {
        self.records.iter().filter(|r| r.key.component.is_none())
    }

    /// Number of timepoints
    #[must_use]
    pub fn n_timepoints(&self) -> usize {
        self.weight.rows()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Per-timepoint result before assembly
struct SliceMetrics {
    weight: Vec<f64>,
    degree: Vec<f64>,
    records: Vec<ComponentMetrics>,
    eliminations: Vec<Elimination>,
}

/// Computes a [`GraphMetricsBundle`] from a thresholded graph sequence
#[derive(Clone, Copy, Debug)]
pub struct GraphMetricsEngine {
    null_model: NullModelConfig,
}

impl GraphMetricsEngine {
    /// Create an engine with the given null-model settings
    #[must_use]
    pub fn new(null_model: NullModelConfig) -> Self {
        Self { null_model }
    }

    /// Compute metrics for every timepoint in parallel
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the graph sequence and the
    /// synchrony tensor disagree in shape.
    pub fn compute(&self, graphs: &BinaryGraphSequence, tensor: &SynchronyTensor) -> AnalysisResult<GraphMetricsBundle> {
        if graphs.n_timepoints() != tensor.n_timepoints() || graphs.n_nodes() != tensor.n_regions() {
            return Err(AnalysisError::invalid_input(format!(
                "graph sequence {}x{} does not match synchrony tensor {}x{}",
                graphs.n_nodes(),
                graphs.n_timepoints(),
                tensor.n_regions(),
                tensor.n_timepoints()
            )));
        }

        let slices: Vec<SliceMetrics> = (0..graphs.n_timepoints())
            .into_par_iter()
            .map(|t| self.slice_metrics(t, graphs.slice(t), tensor.slice(t)))
            .collect::<AnalysisResult<_>>()?;

        let n = graphs.n_nodes();
        let t_len = slices.len();
        let mut weight = Matrix::zeros(t_len, n);
        let mut degree = Matrix::zeros(t_len, n);
        let mut records = Vec::new();
        let mut eliminations = Vec::new();
        for (t, s) in slices.into_iter().enumerate() {
            weight.row_mut(t).copy_from_slice(&s.weight);
            degree.row_mut(t).copy_from_slice(&s.degree);
            records.extend(s.records);
            eliminations.extend(s.eliminations);
        }
        records.sort_by_key(|r| r.key);

        Ok(GraphMetricsBundle {
            weight,
            degree,
            records,
            eliminations,
        })
    }

    fn slice_metrics(&self, t: usize, graph: &BinaryGraph, synchrony: &Matrix) -> AnalysisResult<SliceMetrics> {
        let n = graph.n_nodes();

        // Column mean of synchrony ⊙ adjacency
        let masked = synchrony.hadamard(&graph.to_matrix())?;
        let weight = (0..n).map(|col| masked.column(col).iter().sum::<f64>() / n as f64).collect();
        let degree = graph.degrees().into_iter().map(|d| d as f64).collect();

        let mut records = Vec::new();
        let mut eliminations = Vec::new();
        let components = graph.components();

        if components.len() == 1 {
            if n >= 2 {
                records.push(self.component_metrics(MetricKey::slice(t), graph.clone(), (0..n).collect()));
            } else {
                eliminations.push(Elimination { timepoint: t, node: 0 });
            }
        } else {
            for (cid, nodes) in components.into_iter().enumerate() {
                if nodes.len() == 1 {
                    debug!(timepoint = t, node = nodes[0], "Eliminated singleton node");
                    eliminations.push(Elimination { timepoint: t, node: nodes[0] });
                    continue;
                }
                let sub = graph.induced_subgraph(&nodes);
                records.push(self.component_metrics(MetricKey::component(t, cid), sub, nodes));
            }
        }

        Ok(SliceMetrics {
            weight,
            degree,
            records,
            eliminations,
        })
    }

    fn component_metrics(&self, key: MetricKey, graph: BinaryGraph, nodes: Vec<usize>) -> ComponentMetrics {
        let seed = slice_seed(self.null_model.seed, key.timepoint, key.component);
        let random = randomize_connected(&graph, self.null_model.iterations, seed);

        let distances = graph.distances();
        let clustering = graph.mean_clustering();
        let random_clustering = random.mean_clustering();
        let path_length = characteristic_path_length(&distances);
        let random_path_length = characteristic_path_length(&random.distances());

        let small_worldness = (random_clustering > 0.0 && random_path_length > 0.0 && path_length > 0.0)
            .then(|| (clustering / random_clustering) / (path_length / random_path_length));

        ComponentMetrics {
            key,
            nodes,
            transitivity: graph.transitivity(),
            clustering,
            random_clustering,
            path_length,
            random_path_length,
            small_worldness,
            path_distance: distances.into_vec(),
        }
    }
}

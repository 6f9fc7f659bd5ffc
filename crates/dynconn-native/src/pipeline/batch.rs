//! Batch runner
//!
//! Runs every subject of a manifest through the analysis in two phases
//! separated by the threshold barrier:
//!
//! 1. **Dynamic measures** (parallel per subject): read, filter, smooth,
//!    compute synchrony; cached as `dynamic_measures.json`.
//! 2. **Threshold**: the reference cohort's mean synchrony matrices are
//!    reduced to one shared threshold, written as `threshold.json`.
//! 3. **Analysis** (parallel per subject): binarize, graph metrics and
//!    clustering; cached as `graph_metrics.json` / `cluster_entropy.json`,
//!    stamped with k* and recomputed when the threshold changes.
//!
//! A failing subject is logged and reported without stopping the batch;
//! configuration errors and an empty reference cohort abort it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dynconn_core::{AnalysisType, Matrix, WindowType};

use super::artifacts::{load_or_compute, load_or_compute_stamped, read_time_series, write_json_atomic, ArtifactLayout};
use super::config::AnalysisConfig;
use super::manifest::{Subject, SubjectManifest};
use crate::cluster::{
    bold_activation, flatten_graphs, graph_metric_features, ClusterEntropyValidator, ClusterReport, FeatureSet,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::{BinaryGraphSequence, GraphMetricsBundle, GraphMetricsEngine, NullModelConfig, ThresholdOptimizer, ThresholdValue};
use crate::processing::{DynamicMeasures, PhaseSynchronyEngine, SignalFilter, SlidingWindowSmoother};

/// Dynamic measures of one subject, keyed by network unit
pub type SubjectMeasures = BTreeMap<String, DynamicMeasures>;

/// Graph metrics of one subject, keyed by network unit
pub type SubjectGraphMetrics = BTreeMap<String, GraphMetricsBundle>;

/// Cluster reports of one subject, keyed by network unit
pub type SubjectClusterReports = BTreeMap<String, Vec<ClusterReport>>;

/// Outcome of a batch
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Shared threshold, when one was needed
    pub threshold: Option<ThresholdValue>,
    /// Subjects that completed
    pub succeeded: Vec<String>,
    /// Subjects that failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    /// Whether subjects were processed and none completed
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// Stable per-subject seed derived from the base seed and the subject id
#[must_use]
pub fn subject_seed(base: u64, subject: &str) -> u64 {
    // FNV-1a
    let hash = subject
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    base ^ hash
}

/// Runs the analysis over a subject manifest
pub struct BatchRunner {
    config: AnalysisConfig,
    layout: ArtifactLayout,
    manifest: SubjectManifest,
}

impl BatchRunner {
    /// Create a runner; the configuration is validated again here
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for an invalid configuration.
    pub fn new(
        config: AnalysisConfig,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        manifest: SubjectManifest,
    ) -> AnalysisResult<Self> {
        config.validate()?;
        let layout = ArtifactLayout::new(input_root, output_root, &config);
        Ok(Self { config, layout, manifest })
    }

    /// Artifact layout in use
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every phase
    ///
    /// # Errors
    ///
    /// Returns fatal errors only: invalid configuration or an empty
    /// reference cohort. Subject failures are collected in the report.
    pub fn run(&self) -> AnalysisResult<BatchReport> {
        let mut report = BatchReport::default();
        let ready = self.measure_all(&mut report)?;

        let threshold = if self.config.analysis_type.needs_threshold() {
            Some(self.reduce_threshold(&ready)?)
        } else {
            None
        };

        info!(
            "Analysing {} subjects ({}, {} clusters)",
            ready.len(),
            self.config.analysis_type,
            self.config.n_clusters
        );
        let k = threshold.as_ref().map(|t| t.k);
        let outcomes: Vec<(&Subject, AnalysisResult<()>)> =
            ready.par_iter().map(|(s, _)| (*s, self.analyse_subject(s, k))).collect();
        for (subject, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    info!("Subject {} done", subject.id);
                    report.succeeded.push(subject.id.clone());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Subject {} failed: {}", subject.id, e);
                    report.failed.push((subject.id.clone(), e.to_string()));
                }
            }
        }

        report.threshold = threshold;
        Ok(report)
    }

    /// Run the dynamic-measure phase and the threshold reduction only
    ///
    /// # Errors
    ///
    /// Same as [`BatchRunner::run`].
    pub fn run_threshold_only(&self) -> AnalysisResult<BatchReport> {
        let mut report = BatchReport::default();
        let ready = self.measure_all(&mut report)?;
        report.threshold = Some(self.reduce_threshold(&ready)?);
        report.succeeded = ready.iter().map(|(s, _)| s.id.clone()).collect();
        Ok(report)
    }

    /// Phase 1: dynamic measures for every subject. Returns the subjects that
    /// succeeded with their mean synchrony matrices; failures go to `report`.
    fn measure_all(&self, report: &mut BatchReport) -> AnalysisResult<Vec<(&Subject, Vec<Matrix>)>> {
        info!(
            "Computing dynamic measures for {} subjects ({} / {})",
            self.manifest.len(),
            self.config.network_type,
            self.config.window_type
        );
        let outcomes: Vec<(&Subject, AnalysisResult<SubjectMeasures>)> = self
            .manifest
            .subjects()
            .par_iter()
            .map(|s| (s, self.dynamic_measures(s)))
            .collect();

        let mut ready = Vec::new();
        for (subject, outcome) in outcomes {
            match outcome {
                Ok(measures) => {
                    let means = measures.into_values().map(|m| m.mean_synchrony).collect();
                    ready.push((subject, means));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Subject {} failed: {}", subject.id, e);
                    report.failed.push((subject.id.clone(), e.to_string()));
                }
            }
        }
        Ok(ready)
    }

    /// Phase 2: reduce the reference cohort to one threshold and persist it
    fn reduce_threshold(&self, ready: &[(&Subject, Vec<Matrix>)]) -> AnalysisResult<ThresholdValue> {
        let reference: Vec<&(&Subject, Vec<Matrix>)> = ready.iter().filter(|(s, _)| s.is_reference()).collect();
        let matrices: Vec<Matrix> = reference.iter().flat_map(|(_, m)| m.iter().cloned()).collect();
        info!(
            "Optimizing threshold over {} reference subjects ({} matrices)",
            reference.len(),
            matrices.len()
        );

        let optimizer = ThresholdOptimizer::new(self.config.sweep)?;
        let value = optimizer.cohort_threshold(reference.len(), &matrices)?;
        write_json_atomic(&self.layout.threshold_path(), &value)?;
        info!("Threshold k* = {:.4}", value.k);
        Ok(value)
    }

    /// Filtered, optionally smoothed synchrony of every network unit (cached)
    ///
    /// # Errors
    ///
    /// Returns the first per-unit failure.
    pub fn dynamic_measures(&self, subject: &Subject) -> AnalysisResult<SubjectMeasures> {
        load_or_compute(&self.layout.dynamic_measures_path(&subject.id), || {
            let mut filter = SignalFilter::new(self.config.sampling_interval, self.config.band, self.config.bandpass)?;
            let smoother = match self.config.window_type {
                WindowType::Sliding => Some(SlidingWindowSmoother::new(self.config.window_size)?),
                WindowType::NonSliding => None,
            };
            let engine = PhaseSynchronyEngine::new();

            let mut measures = SubjectMeasures::new();
            for unit in self.config.network_units() {
                debug!("Subject {}: {}", subject.id, unit);
                let series = read_time_series(&self.layout.input_path(&subject.id, &unit))?;
                self.check_length(series.n_timepoints(), &unit)?;

                let mut signal = filter.analytic_signal(&series)?;
                if let Some(smoother) = &smoother {
                    signal = smoother.smooth(&signal)?;
                }
                measures.insert(unit, engine.compute(&signal)?);
            }
            Ok(measures)
        })
    }

    fn check_length(&self, found: usize, unit: &str) -> AnalysisResult<()> {
        match self.config.n_timepoints {
            Some(expected) if expected != found => Err(AnalysisError::invalid_input(format!(
                "{unit} has {found} timepoints, expected {expected}"
            ))),
            _ => Ok(()),
        }
    }

    /// Phase 3 for one subject: features, clustering and entropy (cached)
    fn analyse_subject(&self, subject: &Subject, k: Option<f64>) -> AnalysisResult<()> {
        let seed = subject_seed(self.config.seed, &subject.id);
        let validator = ClusterEntropyValidator::new(self.config.n_clusters, self.config.kmeans_restarts, seed)?;

        load_or_compute_stamped(&self.layout.cluster_entropy_path(&subject.id), k, || {
            let mut reports = SubjectClusterReports::new();
            match self.config.analysis_type {
                AnalysisType::Bold => {
                    for unit in self.config.network_units() {
                        let series = read_time_series(&self.layout.input_path(&subject.id, &unit))?;
                        let features = bold_activation(&series, self.config.bold_threshold);
                        reports.insert(unit, vec![validator.evaluate(FeatureSet::BoldActivation, &features)]);
                    }
                }
                AnalysisType::Synchrony => {
                    let k = require_threshold(k)?;
                    for (unit, measures) in self.dynamic_measures(subject)? {
                        let graphs = BinaryGraphSequence::from_tensor(&measures.tensor, k);
                        let features = flatten_graphs(&graphs);
                        reports.insert(unit, vec![validator.evaluate(FeatureSet::BinarySynchrony, &features)]);
                    }
                }
                AnalysisType::GraphAnalysis => {
                    let k = require_threshold(k)?;
                    let metrics = self.graph_metrics(subject, k, seed)?;
                    for (unit, bundle) in metrics {
                        let unit_reports = FeatureSet::for_analysis(AnalysisType::GraphAnalysis)
                            .iter()
                            .map(|&f| Ok(validator.evaluate(f, &graph_metric_features(&bundle, f)?)))
                            .collect::<AnalysisResult<Vec<_>>>()?;
                        reports.insert(unit, unit_reports);
                    }
                }
            }
            Ok(reports)
        })
        .map(|_: SubjectClusterReports| ())
    }

    /// Graph metrics of every network unit (cached per threshold)
    ///
    /// # Errors
    ///
    /// Propagates failures of the dynamic measures or the metrics engine.
    pub fn graph_metrics(&self, subject: &Subject, k: f64, seed: u64) -> AnalysisResult<SubjectGraphMetrics> {
        load_or_compute_stamped(&self.layout.graph_metrics_path(&subject.id), Some(k), || {
            let engine = GraphMetricsEngine::new(NullModelConfig {
                iterations: self.config.rand_ind,
                seed,
            });
            self.dynamic_measures(subject)?
                .into_iter()
                .map(|(unit, measures)| {
                    let graphs = BinaryGraphSequence::from_tensor(&measures.tensor, k);
                    let bundle = engine.compute(&graphs, &measures.tensor)?;
                    debug!(
                        "Subject {} {}: {} records, {} eliminated nodes",
                        subject.id,
                        unit,
                        bundle.records.len(),
                        bundle.eliminations.len()
                    );
                    Ok((unit, bundle))
                })
                .collect()
        })
    }
}

fn require_threshold(k: Option<f64>) -> AnalysisResult<f64> {
    k.ok_or_else(|| AnalysisError::invalid_configuration("analysis needs a threshold but none was computed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_seed_is_stable_and_distinct() {
        assert_eq!(subject_seed(3, "sub-01"), subject_seed(3, "sub-01"));
        assert_ne!(subject_seed(3, "sub-01"), subject_seed(3, "sub-02"));
        assert_ne!(subject_seed(3, "sub-01"), subject_seed(4, "sub-01"));
    }

    #[test]
    fn test_all_failed() {
        let mut report = BatchReport::default();
        assert!(!report.all_failed());
        report.failed.push(("s1".to_string(), "boom".to_string()));
        assert!(report.all_failed());
        report.succeeded.push("s2".to_string());
        assert!(!report.all_failed());
    }
}

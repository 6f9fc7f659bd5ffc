//! On-disk layout, input parsing and atomic JSON artifacts
//!
//! ```text
//! <input>/<subject>/<network unit>.txt
//! <output>/<network>/<window>/threshold.json
//! <output>/<network>/<window>/<subject>/dynamic_measures.json
//! <output>/<network>/<window>/<subject>/<analysis>/nclusters_<K>/rand_ind_<r>/graph_metrics.json
//! <output>/<network>/<window>/<subject>/<analysis>/nclusters_<K>/rand_ind_<r>/cluster_entropy.json
//! ```
//!
//! Artifacts are written to a sibling `.tmp` file and renamed into place, so
//! an artifact either exists completely or not at all. Existing artifacts are
//! reused instead of recomputed. Artifacts downstream of the threshold carry
//! the k* they were computed with and are recomputed when it changes.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dynconn_core::{Matrix, TimeSeriesMatrix};

use super::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Artifact paths for one (network type, window type) configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLayout {
    input_root: PathBuf,
    config_root: PathBuf,
    analysis_suffix: PathBuf,
}

impl ArtifactLayout {
    /// Layout for `config` under the given input and output roots
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, config: &AnalysisConfig) -> Self {
        let config_root = output_root
            .into()
            .join(config.network_type.name())
            .join(config.window_type.name());
        let analysis_suffix = PathBuf::from(config.analysis_type.name())
            .join(format!("nclusters_{}", config.n_clusters))
            .join(format!("rand_ind_{}", config.rand_ind));
        Self {
            input_root: input_root.into(),
            config_root,
            analysis_suffix,
        }
    }

    /// Shared threshold of the configuration
    #[must_use]
    pub fn threshold_path(&self) -> PathBuf {
        self.config_root.join("threshold.json")
    }

    /// Output directory of one subject
    #[must_use]
    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.config_root.join(subject)
    }

    /// Cached synchrony measures of one subject
    #[must_use]
    pub fn dynamic_measures_path(&self, subject: &str) -> PathBuf {
        self.subject_dir(subject).join("dynamic_measures.json")
    }

    /// Directory of the clustering run
    #[must_use]
    pub fn analysis_dir(&self, subject: &str) -> PathBuf {
        self.subject_dir(subject).join(&self.analysis_suffix)
    }

    /// Cached graph metrics of one subject
    #[must_use]
    pub fn graph_metrics_path(&self, subject: &str) -> PathBuf {
        self.analysis_dir(subject).join("graph_metrics.json")
    }

    /// Cluster reports of one subject
    #[must_use]
    pub fn cluster_entropy_path(&self, subject: &str) -> PathBuf {
        self.analysis_dir(subject).join("cluster_entropy.json")
    }

    /// Input time series of one network unit
    #[must_use]
    pub fn input_path(&self, subject: &str, unit: &str) -> PathBuf {
        self.input_root.join(subject).join(format!("{unit}.txt"))
    }
}

// ============================================================================
// Time Series Input
// ============================================================================

/// Parse whitespace-delimited rows (regions) of floats (timepoints)
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidInput`] for unparsable or non-finite
/// values, ragged rows or an empty table.
pub fn parse_time_series(text: &str) -> AnalysisResult<TimeSeriesMatrix> {
    let rows = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            line.split_whitespace()
                .map(|tok| {
                    let value = tok.parse::<f64>().map_err(|e| {
                        AnalysisError::invalid_input(format!("line {}: cannot parse `{tok}`: {e}", n + 1))
                    })?;
                    if value.is_finite() {
                        Ok(value)
                    } else {
                        Err(AnalysisError::invalid_input(format!("line {}: non-finite value `{tok}`", n + 1)))
                    }
                })
                .collect::<AnalysisResult<Vec<f64>>>()
        })
        .collect::<AnalysisResult<Vec<Vec<f64>>>>()?;
    Ok(TimeSeriesMatrix::new(Matrix::from_rows(rows)?)?)
}

/// Read a subject's time series file
///
/// # Errors
///
/// Returns [`AnalysisError::MissingArtifact`] if the file does not exist,
/// [`AnalysisError::Io`] for other read failures and
/// [`AnalysisError::InvalidInput`] for malformed content.
pub fn read_time_series(path: &Path) -> AnalysisResult<TimeSeriesMatrix> {
    let text = fs::read_to_string(path).map_err(|e| missing_or_io(path, e))?;
    parse_time_series(&text).map_err(|e| match e {
        AnalysisError::InvalidInput { reason } => {
            AnalysisError::invalid_input(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}

fn missing_or_io(path: &Path, err: io::Error) -> AnalysisError {
    if err.kind() == io::ErrorKind::NotFound {
        AnalysisError::MissingArtifact { path: path.to_path_buf() }
    } else {
        AnalysisError::io(path, err)
    }
}

// ============================================================================
// JSON Artifacts
// ============================================================================

/// Serialize `value` to `path` through a temporary sibling file
///
/// # Errors
///
/// Returns [`AnalysisError::Io`] or [`AnalysisError::Serialization`] on
/// failure; the temporary file is removed and `path` is left untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> AnalysisResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    let result = write_then_rename(&tmp, path, value);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename<T: Serialize>(tmp: &Path, path: &Path, value: &T) -> AnalysisResult<()> {
    let file = File::create(tmp).map_err(|e| AnalysisError::io(tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(|e| AnalysisError::io(tmp, e))?;
    drop(writer);
    fs::rename(tmp, path).map_err(|e| AnalysisError::io(path, e))
}

/// Deserialize a JSON artifact
///
/// # Errors
///
/// Returns [`AnalysisError::MissingArtifact`] if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AnalysisResult<T> {
    let file = File::open(path).map_err(|e| missing_or_io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Return the cached artifact at `path`, or compute, store and return it
///
/// # Errors
///
/// Propagates errors from `compute`, reading or writing.
pub fn load_or_compute<T, F>(path: &Path, compute: F) -> AnalysisResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> AnalysisResult<T>,
{
    if path.is_file() {
        debug!("Cache hit: {}", path.display());
        return read_json(path);
    }
    let value = compute()?;
    write_json_atomic(path, &value)?;
    Ok(value)
}

/// Artifact tagged with the threshold it was computed with
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStamped<T> {
    /// k* used, `None` for analyses without a threshold
    pub threshold: Option<f64>,
    /// Artifact content
    pub value: T,
}

/// [`load_or_compute`] for artifacts that depend on the threshold `k`.
///
/// A cached artifact stamped with a different threshold is recomputed and
/// overwritten.
///
/// # Errors
///
/// Propagates errors from `compute`, reading or writing.
pub fn load_or_compute_stamped<T, F>(path: &Path, k: Option<f64>, compute: F) -> AnalysisResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> AnalysisResult<T>,
{
    if path.is_file() {
        let cached: ThresholdStamped<T> = read_json(path)?;
        if cached.threshold.map(f64::to_bits) == k.map(f64::to_bits) {
            debug!("Cache hit: {}", path.display());
            return Ok(cached.value);
        }
        info!(
            "Threshold changed for {} ({:?} -> {:?}), recomputing",
            path.display(),
            cached.threshold,
            k
        );
    }
    let stamped = ThresholdStamped { threshold: k, value: compute()? };
    write_json_atomic(path, &stamped)?;
    Ok(stamped.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynconn_core::{AnalysisType, NetworkType, WindowType};
    use std::cell::Cell;

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(NetworkType::FullNetwork, WindowType::Sliding, AnalysisType::Synchrony, 5, 3)
    }

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::new("/in", "/out", &config());
        assert_eq!(layout.threshold_path(), PathBuf::from("/out/full_network/sliding/threshold.json"));
        assert_eq!(
            layout.dynamic_measures_path("s1"),
            PathBuf::from("/out/full_network/sliding/s1/dynamic_measures.json")
        );
        assert_eq!(
            layout.cluster_entropy_path("s1"),
            PathBuf::from("/out/full_network/sliding/s1/synchrony/nclusters_5/rand_ind_3/cluster_entropy.json")
        );
        assert_eq!(layout.input_path("s1", "full_network"), PathBuf::from("/in/s1/full_network.txt"));
    }

    #[test]
    fn test_parse_time_series() {
        let ts = parse_time_series("1.0 2.5e0 -3\n\n4 5 6.0E-1\n").unwrap();
        assert_eq!(ts.n_regions(), 2);
        assert_eq!(ts.n_timepoints(), 3);
        assert_eq!(ts.region(1), &[4.0, 5.0, 0.6]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_time_series("1 2\n3"), Err(AnalysisError::InvalidInput { .. })));
        assert!(matches!(parse_time_series("1 x"), Err(AnalysisError::InvalidInput { .. })));
        assert!(matches!(parse_time_series("  \n"), Err(AnalysisError::InvalidInput { .. })));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for text in ["1.0 NaN 3.0\n4.0 5.0 6.0", "1.0 2.0\n4.0 inf", "nan 1", "-infinity 2"] {
            let err = parse_time_series(text).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidInput { .. }), "{text}");
            assert!(err.to_string().contains("non-finite"));
        }
    }

    #[test]
    fn test_missing_input_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_time_series(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingArtifact { .. }));
    }

    #[test]
    fn test_atomic_write_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/value.json");
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(vec![1.0, 2.0])
        };

        let first: Vec<f64> = load_or_compute(&path, compute).unwrap();
        let second: Vec<f64> = load_or_compute(&path, compute).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_stamped_cache_recomputes_on_new_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        assert_eq!(load_or_compute_stamped(&path, Some(0.42), compute).unwrap(), 1);
        assert_eq!(load_or_compute_stamped(&path, Some(0.42), compute).unwrap(), 1);
        assert_eq!(calls.get(), 1);

        assert_eq!(load_or_compute_stamped(&path, Some(0.37), compute).unwrap(), 2);
        let stored: ThresholdStamped<i32> = read_json(&path).unwrap();
        assert_eq!(stored, ThresholdStamped { threshold: Some(0.37), value: 2 });

        assert_eq!(load_or_compute_stamped(&path, None, compute).unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_failed_compute_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");
        let result: AnalysisResult<Vec<f64>> =
            load_or_compute(&path, || Err(AnalysisError::invalid_input("bad subject")));
        assert!(result.is_err());
        assert!(!path.exists());
    }
}

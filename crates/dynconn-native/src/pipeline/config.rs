//! Analysis configuration
//!
//! A run is described by an [`AnalysisConfig`]. It is assembled from an
//! optional JSON file and command-line values, both captured as
//! [`ConfigOverrides`], and validated before any subject is touched so
//! configuration mistakes abort the run immediately.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dynconn_core::{AnalysisType, FrequencyBand, NetworkType, WindowType};

use crate::cluster::DEFAULT_BOLD_THRESHOLD;
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::SweepRange;
use crate::processing::BandpassMethod;

/// Default sliding-window length in samples
pub const DEFAULT_WINDOW_SIZE: usize = 20;
/// Default number of within-network sub-networks
pub const DEFAULT_N_NETWORKS: usize = 10;
/// Default repetition time in seconds
pub const DEFAULT_SAMPLING_INTERVAL: f64 = 2.0;
/// Default number of k-means restarts
pub const DEFAULT_KMEANS_RESTARTS: usize = 10;

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_n_networks() -> usize {
    DEFAULT_N_NETWORKS
}

fn default_sampling_interval() -> f64 {
    DEFAULT_SAMPLING_INTERVAL
}

fn default_bold_threshold() -> f64 {
    DEFAULT_BOLD_THRESHOLD
}

fn default_kmeans_restarts() -> usize {
    DEFAULT_KMEANS_RESTARTS
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Fully resolved, validated analysis configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Region grouping
    pub network_type: NetworkType,
    /// Sliding-window smoothing on or off
    pub window_type: WindowType,
    /// Feature set to cluster
    pub analysis_type: AnalysisType,
    /// Number of k-means clusters
    pub n_clusters: usize,
    /// Null-model rewiring iterations per edge
    pub rand_ind: usize,
    /// Base RNG seed
    #[serde(default)]
    pub seed: u64,
    /// Sliding-window length (sliding window type only)
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Expected timepoints per input file
    #[serde(default)]
    pub n_timepoints: Option<usize>,
    /// Sub-network count (within_network only)
    #[serde(default = "default_n_networks")]
    pub n_networks: usize,
    /// Repetition time in seconds
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: f64,
    /// Phase-extraction pass-band
    #[serde(default)]
    pub band: FrequencyBand,
    /// Band-pass implementation
    #[serde(default)]
    pub bandpass: BandpassMethod,
    /// Threshold sweep
    #[serde(default)]
    pub sweep: SweepRange,
    /// |z| activation threshold for BOLD features
    #[serde(default = "default_bold_threshold")]
    pub bold_threshold: f64,
    /// k-means restarts
    #[serde(default = "default_kmeans_restarts")]
    pub kmeans_restarts: usize,
}

impl AnalysisConfig {
    /// Configuration with required fields set and every default applied
    #[must_use]
    pub fn new(
        network_type: NetworkType,
        window_type: WindowType,
        analysis_type: AnalysisType,
        n_clusters: usize,
        rand_ind: usize,
    ) -> Self {
        Self {
            network_type,
            window_type,
            analysis_type,
            n_clusters,
            rand_ind,
            seed: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            n_timepoints: None,
            n_networks: DEFAULT_N_NETWORKS,
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            band: FrequencyBand::default(),
            bandpass: BandpassMethod::default(),
            sweep: SweepRange::default(),
            bold_threshold: DEFAULT_BOLD_THRESHOLD,
            kmeans_restarts: DEFAULT_KMEANS_RESTARTS,
        }
    }

    /// Load a complete configuration from a JSON file and validate it
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for unreadable,
    /// malformed or invalid configurations.
    pub fn load<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::invalid_configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::invalid_configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge overrides onto an optional base file and validate
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] for unknown mode
    /// strings, missing required values or invalid parameters.
    pub fn resolve(overrides: ConfigOverrides) -> AnalysisResult<Self> {
        fn required<T>(value: Option<T>, name: &str) -> AnalysisResult<T> {
            value.ok_or_else(|| AnalysisError::invalid_configuration(format!("missing required setting `{name}`")))
        }

        let network_type: NetworkType = required(overrides.network_type, "network_type")?.parse()?;
        let window_type: WindowType = required(overrides.window_type, "window_type")?.parse()?;
        let analysis_type: AnalysisType = required(overrides.analysis_type, "analysis_type")?.parse()?;
        let n_clusters = required(overrides.n_clusters, "n_clusters")?;
        let rand_ind = required(overrides.rand_ind, "rand_ind")?;

        let mut config = Self::new(network_type, window_type, analysis_type, n_clusters, rand_ind);
        if let Some(v) = overrides.seed {
            config.seed = v;
        }
        if let Some(v) = overrides.window_size {
            config.window_size = v;
        }
        if overrides.n_timepoints.is_some() {
            config.n_timepoints = overrides.n_timepoints;
        }
        if let Some(v) = overrides.n_networks {
            config.n_networks = v;
        }
        if let Some(v) = overrides.sampling_interval {
            config.sampling_interval = v;
        }
        if let Some(v) = overrides.band {
            config.band = v;
        }
        if let Some(v) = overrides.bandpass {
            config.bandpass = v;
        }
        if let Some(v) = overrides.sweep {
            config.sweep = v;
        }
        if let Some(v) = overrides.bold_threshold {
            config.bold_threshold = v;
        }
        if let Some(v) = overrides.kmeans_restarts {
            config.kmeans_restarts = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every parameter
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] describing the first
    /// invalid setting.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.n_clusters == 0 {
            return Err(AnalysisError::invalid_configuration("n_clusters must be at least 1"));
        }
        if self.window_type == WindowType::Sliding && self.window_size == 0 {
            return Err(AnalysisError::invalid_configuration("window_size must be at least 1"));
        }
        if self.network_type.has_subnetworks() && self.n_networks == 0 {
            return Err(AnalysisError::invalid_configuration(format!(
                "{} needs n_networks >= 1",
                self.network_type
            )));
        }
        self.band
            .validate(self.sampling_interval)
            .map_err(|e| AnalysisError::invalid_configuration(e.to_string()))?;
        self.sweep.validate()?;
        if !self.bold_threshold.is_finite() {
            return Err(AnalysisError::invalid_configuration("bold_threshold must be finite"));
        }
        if self.kmeans_restarts == 0 {
            return Err(AnalysisError::invalid_configuration("kmeans_restarts must be at least 1"));
        }
        Ok(())
    }

    /// Input file stems of every network unit, e.g. `within_network_3`
    #[must_use]
    pub fn network_units(&self) -> Vec<String> {
        match self.network_type {
            NetworkType::WithinNetwork => (0..self.n_networks)
                .map(|i| format!("{}_{i}", self.network_type.name()))
                .collect(),
            NetworkType::FullNetwork | NetworkType::BetweenNetwork => vec![self.network_type.name().to_string()],
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Partial configuration from a file or the command line.
///
/// Mode fields stay strings until [`AnalysisConfig::resolve`] parses them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    /// `full_network`, `within_network` or `between_network`
    pub network_type: Option<String>,
    /// `non-sliding` or `sliding`
    pub window_type: Option<String>,
    /// `BOLD`, `synchrony` or `graph_analysis`
    pub analysis_type: Option<String>,
    /// Number of k-means clusters
    pub n_clusters: Option<usize>,
    /// Null-model rewiring iterations
    pub rand_ind: Option<usize>,
    /// Base RNG seed
    pub seed: Option<u64>,
    /// Sliding-window length
    pub window_size: Option<usize>,
    /// Expected timepoints per input file
    pub n_timepoints: Option<usize>,
    /// Sub-network count
    pub n_networks: Option<usize>,
    /// Repetition time in seconds
    pub sampling_interval: Option<f64>,
    /// Phase-extraction pass-band
    pub band: Option<FrequencyBand>,
    /// Band-pass implementation
    pub bandpass: Option<BandpassMethod>,
    /// Threshold sweep
    pub sweep: Option<SweepRange>,
    /// |z| activation threshold
    pub bold_threshold: Option<f64>,
    /// k-means restarts
    pub kmeans_restarts: Option<usize>,
}

impl ConfigOverrides {
    /// Read a (possibly partial) JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfiguration`] if the file cannot be
    /// read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::invalid_configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| AnalysisError::invalid_configuration(format!("cannot parse {}: {e}", path.display())))
    }

    /// Layer `other` on top of `self`; values set in `other` win
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            network_type: other.network_type.or(self.network_type),
            window_type: other.window_type.or(self.window_type),
            analysis_type: other.analysis_type.or(self.analysis_type),
            n_clusters: other.n_clusters.or(self.n_clusters),
            rand_ind: other.rand_ind.or(self.rand_ind),
            seed: other.seed.or(self.seed),
            window_size: other.window_size.or(self.window_size),
            n_timepoints: other.n_timepoints.or(self.n_timepoints),
            n_networks: other.n_networks.or(self.n_networks),
            sampling_interval: other.sampling_interval.or(self.sampling_interval),
            band: other.band.or(self.band),
            bandpass: other.bandpass.or(self.bandpass),
            sweep: other.sweep.or(self.sweep),
            bold_threshold: other.bold_threshold.or(self.bold_threshold),
            kmeans_restarts: other.kmeans_restarts.or(self.kmeans_restarts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConfigOverrides {
        ConfigOverrides {
            network_type: Some("full_network".to_string()),
            window_type: Some("sliding".to_string()),
            analysis_type: Some("graph_analysis".to_string()),
            n_clusters: Some(4),
            rand_ind: Some(2),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let config = AnalysisConfig::resolve(minimal()).unwrap();
        assert_eq!(config.network_type, NetworkType::FullNetwork);
        assert_eq!(config.window_type, WindowType::Sliding);
        assert_eq!(config.analysis_type, AnalysisType::GraphAnalysis);
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.sweep, SweepRange::default());
        assert_eq!(config.bandpass, BandpassMethod::Fourier);
        assert_eq!(config.network_units(), vec!["full_network".to_string()]);
    }

    #[test]
    fn test_unknown_mode_is_configuration_error() {
        let overrides = ConfigOverrides {
            network_type: Some("whole_brain".to_string()),
            ..minimal()
        };
        let err = AnalysisConfig::resolve(overrides).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfiguration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_required_setting() {
        let overrides = ConfigOverrides { n_clusters: None, ..minimal() };
        let err = AnalysisConfig::resolve(overrides).unwrap_err();
        assert!(err.to_string().contains("n_clusters"));
    }

    #[test]
    fn test_invalid_parameters() {
        let zero_networks = ConfigOverrides {
            network_type: Some("within_network".to_string()),
            n_networks: Some(0),
            ..minimal()
        };
        assert!(AnalysisConfig::resolve(zero_networks).is_err());

        let bad_tr = ConfigOverrides { sampling_interval: Some(0.0), ..minimal() };
        assert!(AnalysisConfig::resolve(bad_tr).is_err());

        let bad_sweep = ConfigOverrides {
            sweep: Some(SweepRange { lower: 0.5, upper: 0.5, step: 0.01 }),
            ..minimal()
        };
        assert!(AnalysisConfig::resolve(bad_sweep).is_err());
    }

    #[test]
    fn test_within_network_units() {
        let overrides = ConfigOverrides {
            network_type: Some("within_network".to_string()),
            n_networks: Some(3),
            ..minimal()
        };
        let config = AnalysisConfig::resolve(overrides).unwrap();
        assert_eq!(
            config.network_units(),
            vec!["within_network_0", "within_network_1", "within_network_2"]
        );
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let file = ConfigOverrides { seed: Some(1), window_size: Some(10), ..minimal() };
        let cli = ConfigOverrides { seed: Some(9), ..ConfigOverrides::default() };
        let merged = file.merge(cli);
        assert_eq!(merged.seed, Some(9));
        assert_eq!(merged.window_size, Some(10));
        assert_eq!(merged.n_clusters, Some(4));
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let json = r#"{"network_type":"between_network","window_type":"non-sliding","analysis_type":"BOLD","n_clusters":3,"rand_ind":1}"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis_type, AnalysisType::Bold);
        assert_eq!(config.kmeans_restarts, DEFAULT_KMEANS_RESTARTS);
        assert!(config.validate().is_ok());
    }
}

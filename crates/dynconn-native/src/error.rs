//! Error Types for Native Analysis
//!
//! Error taxonomy for the analysis engine and batch pipeline using `thiserror`.

use std::path::PathBuf;

use dynconn_core::CoreError;
use thiserror::Error;

/// Analysis error types
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Unrecognized mode or inconsistent configuration; fatal for the whole run
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// Malformed, too short or otherwise unusable input data
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What is wrong with the input
        reason: String,
    },

    /// Threshold optimization requested without reference subjects
    #[error("Threshold optimization requested with an empty reference cohort")]
    EmptyCohort,

    /// Expected upstream file is absent
    #[error("Missing artifact: {}", path.display())]
    MissingArtifact {
        /// Path that was expected to exist
        path: PathBuf,
    },

    /// Filesystem failure while reading or writing an artifact
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Artifact (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Shorthand for [`AnalysisError::InvalidInput`]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput { reason: reason.into() }
    }

    /// Shorthand for [`AnalysisError::InvalidConfiguration`]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }

    /// Attach a path to an IO error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Whether the error must abort the whole batch rather than one subject
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. } | Self::EmptyCohort)
    }
}

impl From<CoreError> for AnalysisError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownMode { .. } => Self::InvalidConfiguration { reason: err.to_string() },
            _ => Self::InvalidInput { reason: err.to_string() },
        }
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let mode = CoreError::UnknownMode {
            kind: "network type".to_string(),
            value: "x".to_string(),
        };
        let err: AnalysisError = mode.into();
        assert!(matches!(err, AnalysisError::InvalidConfiguration { .. }));
        assert!(err.is_fatal());

        let shape = CoreError::EmptyData { rows: 0, cols: 3 };
        let err: AnalysisError = shape.into();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_artifact_message() {
        let err = AnalysisError::MissingArtifact { path: PathBuf::from("/data/sub-01/full_network.txt") };
        assert_eq!(err.to_string(), "Missing artifact: /data/sub-01/full_network.txt");
    }
}

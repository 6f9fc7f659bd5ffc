//! Error types for the dynconn data model
//!
//! Errors raised while constructing or validating matrices, time series and
//! analysis modes. Every variant carries enough context to identify the
//! offending value without a backtrace.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Data Model Errors
// ============================================================================

/// Errors from data-model construction and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoreError {
    /// Matrix or time series has a zero dimension
    EmptyData {
        /// Number of rows supplied
        rows: usize,
        /// Number of columns supplied
        cols: usize,
    },
    /// A row has a different length than the first row
    RaggedRows {
        /// Index of the offending row
        row: usize,
        /// Length of the first row
        expected: usize,
        /// Length of the offending row
        got: usize,
    },
    /// Two operands have incompatible shapes
    ShapeMismatch {
        /// Expected shape (rows, cols)
        expected: (usize, usize),
        /// Shape that was supplied
        got: (usize, usize),
    },
    /// A mode string did not match any known variant
    UnknownMode {
        /// Mode family (network type, window type, ...)
        kind: String,
        /// The unrecognized value
        value: String,
    },
    /// A numeric parameter is outside its valid range
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Description of the constraint that was violated
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyData { rows, cols } => {
                write!(f, "Empty data: {rows}x{cols} has a zero dimension")
            }
            Self::RaggedRows { row, expected, got } => {
                write!(f, "Ragged rows: row {row} has {got} columns, expected {expected}")
            }
            Self::ShapeMismatch { expected, got } => {
                write!(
                    f,
                    "Shape mismatch: expected {}x{}, got {}x{}",
                    expected.0, expected.1, got.0, got.1
                )
            }
            Self::UnknownMode { kind, value } => {
                write!(f, "Unrecognised {kind}: {value}")
            }
            Self::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CoreError::RaggedRows { row: 2, expected: 10, got: 9 };
        assert_eq!(err.to_string(), "Ragged rows: row 2 has 9 columns, expected 10");

        let err = CoreError::UnknownMode {
            kind: "network type".to_string(),
            value: "half_network".to_string(),
        };
        assert_eq!(err.to_string(), "Unrecognised network type: half_network");
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = CoreError::invalid_parameter("window_size", "must be >= 1");
        let json = serde_json::to_string(&err).unwrap();
        let back: CoreError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}

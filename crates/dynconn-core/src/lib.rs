//! Dynconn Core - shared data model for dynamic connectivity analysis
//!
//! This crate provides the foundational types, error definitions and math
//! helpers used by every stage of the dynamic functional-connectivity engine.
//!
//! # Modules
//!
//! - [`types`]: Dense matrices, time series, analysis modes and frequency bands
//! - [`error`]: Error type for data-model validation
//! - [`math`]: Mirroring, moments, z-scores and sweep ranges
//!
//! # Example
//!
//! ```rust
//! use dynconn_core::types::{Matrix, TimeSeriesMatrix};
//!
//! let series = TimeSeriesMatrix::from_rows(vec![
//!     vec![1.0, 2.0, 3.0],
//!     vec![0.5, 0.0, -0.5],
//! ])
//! .unwrap();
//!
//! assert_eq!(series.n_regions(), 2);
//! assert_eq!(series.n_timepoints(), 3);
//!
//! let identity = Matrix::identity(3);
//! assert!(identity.is_symmetric(0.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod error;
pub mod math;
pub mod types;

// Re-export commonly used types at crate root
pub use error::CoreError;
pub use math::{mean, mirror_lower, std_dev, sweep};
pub use types::{
    AnalysisType, FrequencyBand, Matrix, NetworkType, SubjectGroup, TimeSeriesMatrix, WindowType,
};

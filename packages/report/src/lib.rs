#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! End-to-end forecast assessment.
//!
//! [`assess`] takes the raw (or transport-encoded) forecast text, the
//! administrative region sets and an [`EngineConfig`], and returns an
//! [`Assessment`]: the normalized track, the [`Report`] identity, per-level
//! distance records, the uncertainty cone and the closest pass. The
//! [`export`] module persists an assessment for downstream notification and
//! plotting collaborators.

pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;

pub use config::EngineConfig;
pub use pipeline::{Assessment, assess, assess_track};
pub use report::{ClosestPass, Report};

/// Errors that can occur while assessing a forecast or writing its outputs.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Forecast decoding or normalization failed.
    #[error("Forecast error: {0}")]
    Forecast(#[from] cyclone_watch_forecast::ForecastError),

    /// Distance or cone computation failed.
    #[error("Spatial error: {0}")]
    Spatial(#[from] cyclone_watch_spatial::SpatialError),

    /// Configuration could not be parsed or is inconsistent.
    #[error("Config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (config read or output write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

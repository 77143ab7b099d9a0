#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Raw forecast ingestion for the cyclone-watch engine.
//!
//! Forecasts arrive as the CSV export of the RSMC forecasting software,
//! usually wrapped in a padding-stripped base64 string by the automation
//! that triggers a run. [`transport`] undoes that wrapping, [`normalize`]
//! turns the table into a typed [`ForecastTrack`], and [`export`] writes
//! the normalized table back out for archiving.

pub mod export;
pub mod normalize;
pub mod transport;

pub use cyclone_watch_forecast_models::ForecastTrack;
pub use normalize::{parse_forecast, parse_forecast_str};
pub use transport::{decode_forecast_text, encode_forecast_text};

/// Errors that can occur while decoding or normalizing a forecast.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// The transport encoding could not be reversed.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },

    /// The forecast table is missing required content or holds a value that
    /// cannot be read.
    #[error("Malformed forecast: {message} (field `{field}`{})", row_suffix(.row))]
    MalformedForecast {
        /// Preamble token or column the problem was found in.
        field: String,
        /// Zero-based data row index (after the units row is dropped), if
        /// the problem is tied to a row.
        row: Option<usize>,
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error (stream read or file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ForecastError {
    pub(crate) fn malformed(
        field: impl Into<String>,
        row: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedForecast {
            field: field.into(),
            row,
            message: message.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn row_suffix(row: &Option<usize>) -> String {
    row.map(|row| format!(", row {row}")).unwrap_or_default()
}

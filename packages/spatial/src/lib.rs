#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial risk computations for a normalized forecast track.
//!
//! Administrative boundaries are loaded from `GeoJSON` into [`RegionSet`]s,
//! projected once into PDC Mercator, and compared against the forecast
//! track to produce per-region distance records ([`distance`]). The
//! [`cone`] module resamples the official forecast window and unions the
//! buffered positions into the uncertainty cone.

pub mod boundaries;
pub mod cone;
pub mod distance;
pub mod projection;

pub use boundaries::{AdministrativeRegion, RegionSet};
pub use cone::UncertaintyCone;
pub use projection::PlanarProjection;

/// Errors that can occur during spatial computations.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// No forecast point survived a lead-time filter.
    #[error("No forecast points within {window_hours} hours of lead time")]
    EmptyTrack {
        /// Lead-time window that was applied.
        window_hours: i64,
    },

    /// A region or track geometry is empty or unusable.
    #[error("Geometry error: {message}")]
    Geometry {
        /// Description of what went wrong.
        message: String,
    },

    /// The resampling cadence is not a positive duration.
    #[error("Invalid resample interval: {minutes} minutes")]
    InvalidInterval {
        /// Interval that was requested.
        minutes: i64,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// I/O error (boundary file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpatialError {
    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }
}

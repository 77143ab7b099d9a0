//! Report identity and the closest pass of a forecast.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cyclone_watch_forecast_models::{ForecastTrack, WindCategory};
use cyclone_watch_spatial_models::{DistanceRecord, LevelDistances};
use serde::{Deserialize, Serialize};

/// Identity of one forecast run: which cyclone, and when the forecast was
/// issued. Every presentation string is derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "cyclone")]
    cyclone_label: String,
    #[serde(rename = "publicationTime")]
    publication_time_utc: DateTime<Utc>,
}

impl Report {
    /// Builds the report for `track`.
    #[must_use]
    pub fn from_track(track: &ForecastTrack) -> Self {
        Self {
            cyclone_label: track.identifier(),
            publication_time_utc: track.base_time(),
        }
    }

    /// Cyclone name and season, e.g. `Lola 2023/2024`.
    #[must_use]
    pub fn cyclone_label(&self) -> &str {
        &self.cyclone_label
    }

    /// Forecast base time.
    #[must_use]
    pub const fn publication_time_utc(&self) -> DateTime<Utc> {
        self.publication_time_utc
    }

    /// Cyclone name without the season.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.cyclone_label
            .split_whitespace()
            .next()
            .unwrap_or(&self.cyclone_label)
    }

    /// ISO 8601 publication time at minute precision, e.g.
    /// `2024-02-10T06:00+00:00`.
    #[must_use]
    pub fn publication_time(&self) -> String {
        self.publication_time_utc
            .format("%Y-%m-%dT%H:%M%:z")
            .to_string()
    }

    /// Filename-safe UTC stamp, e.g. `2024-02-10T0600Z`.
    #[must_use]
    pub fn file_stamp(&self) -> String {
        self.publication_time_utc
            .format("%Y-%m-%dT%H%MZ")
            .to_string()
    }

    /// Publication date in `zone`, e.g. `2024-02-10`.
    #[must_use]
    pub fn local_date(&self, zone: Tz) -> String {
        self.publication_time_utc
            .with_timezone(&zone)
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Publication time of day in `zone`, e.g. `17:00`.
    #[must_use]
    pub fn local_time(&self, zone: Tz) -> String {
        self.publication_time_utc
            .with_timezone(&zone)
            .format("%H:%M")
            .to_string()
    }
}

/// The region the forecast track passes closest to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestPass {
    /// Region code.
    pub region_id: String,
    /// Region name.
    pub region_name: String,
    /// Distance from the track path in kilometres.
    pub distance_km: u32,
    /// Uncertainty radius at the closest point in kilometres.
    pub uncertainty_km: Option<u32>,
    /// Wind category at the closest point.
    pub category: Option<WindCategory>,
    /// Lead time of the closest point.
    pub hours_to_closest: i64,
}

impl ClosestPass {
    /// Picks the minimum-distance record. Equal distances resolve to the
    /// smaller lead time, then to the earlier record.
    ///
    /// Returns `None` when `distances` holds no records.
    #[must_use]
    pub fn from_records(distances: &LevelDistances) -> Option<Self> {
        distances.closest().map(Self::from)
    }

    /// Whether the pass comes within `threshold_km` of the region.
    #[must_use]
    pub const fn is_within(&self, threshold_km: u32) -> bool {
        self.distance_km <= threshold_km
    }
}

impl From<&DistanceRecord> for ClosestPass {
    fn from(record: &DistanceRecord) -> Self {
        Self {
            region_id: record.region_id.clone(),
            region_name: record.region_name.clone(),
            distance_km: record.distance_km,
            uncertainty_km: record.uncertainty_km,
            category: record.category,
            hours_to_closest: record.hours_to_closest,
        }
    }
}

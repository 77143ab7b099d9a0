#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forecast track types shared across the cyclone-watch engine.
//!
//! A [`ForecastTrack`] is the normalized form of a single RSMC forecast
//! table: the cyclone identity, the publication instant and an ordered list
//! of [`ForecastPoint`]s. Lead times and the season label are derived from
//! the publication instant and never stored on their own.

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Days subtracted from a date before taking its year as the season start.
///
/// July 1 is roughly the 182nd day of the year, so this shifts the season
/// boundary from January 1 to July 1.
pub const SEASON_SHIFT_DAYS: i64 = 182;

/// Australian-scale tropical cyclone category.
///
/// `L` covers systems below category 1 (lows and depressions).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum WindCategory {
    /// Below category 1
    #[strum(serialize = "L")]
    L = 0,
    /// Category 1
    #[strum(serialize = "1")]
    One = 1,
    /// Category 2
    #[strum(serialize = "2")]
    Two = 2,
    /// Category 3
    #[strum(serialize = "3")]
    Three = 3,
    /// Category 4
    #[strum(serialize = "4")]
    Four = 4,
    /// Category 5
    #[strum(serialize = "5")]
    Five = 5,
}

impl WindCategory {
    /// Returns the numeric value of this category.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a category from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 0-5.
    pub const fn from_value(value: u8) -> Result<Self, InvalidCategoryError> {
        match value {
            0 => Ok(Self::L),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            _ => Err(InvalidCategoryError { value }),
        }
    }

    /// Returns all categories from weakest to strongest.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::L,
            Self::One,
            Self::Two,
            Self::Three,
            Self::Four,
            Self::Five,
        ]
    }
}

impl From<WindCategory> for u8 {
    fn from(category: WindCategory) -> Self {
        category.value()
    }
}

impl TryFrom<u8> for WindCategory {
    type Error = InvalidCategoryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Error returned when a numeric value is not a valid [`WindCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCategoryError {
    /// The rejected value.
    pub value: u8,
}

impl std::fmt::Display for InvalidCategoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid wind category {}: expected 0-5", self.value)
    }
}

impl std::error::Error for InvalidCategoryError {}

/// A cyclone season running from July 1 of `start_year` to June 30 of the
/// following year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Season {
    /// Calendar year in which the season starts.
    pub start_year: i32,
}

impl Season {
    /// Derives the season containing `instant`.
    #[must_use]
    pub fn containing(instant: DateTime<Utc>) -> Self {
        let shifted = instant - TimeDelta::days(SEASON_SHIFT_DAYS);
        Self {
            start_year: shifted.year(),
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.start_year, self.start_year + 1)
    }
}

/// A single vertex of a forecast track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// Forecast valid time (UTC, second precision).
    pub time: DateTime<Utc>,
    /// Latitude in degrees (WGS84).
    pub latitude: f64,
    /// Longitude in degrees (WGS84).
    pub longitude: f64,
    /// Wind category. `None` when the source cell could not be read as a
    /// category; blank cells are already mapped to [`WindCategory::L`].
    pub category: Option<WindCategory>,
    /// Radius of the uncertainty circle in kilometres, if provided.
    pub uncertainty_radius_km: Option<f64>,
}

/// Error returned when track points are not in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedTrackError {
    /// Index of the first point whose time precedes its predecessor.
    pub index: usize,
}

impl std::fmt::Display for UnorderedTrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "forecast point {} is earlier than the point before it",
            self.index
        )
    }
}

impl std::error::Error for UnorderedTrackError {}

/// A normalized forecast track.
///
/// Immutable once constructed. Points are guaranteed to be non-decreasing in
/// time. Deserialization goes through [`ForecastTrack::new`], so the ordering
/// check applies and the season is always recomputed from the base time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawForecastTrack")]
pub struct ForecastTrack {
    cyclone_name: String,
    base_time: DateTime<Utc>,
    season: Season,
    points: Vec<ForecastPoint>,
}

/// Serialized form of a [`ForecastTrack`]. A serialized `season` is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawForecastTrack {
    cyclone_name: String,
    base_time: DateTime<Utc>,
    points: Vec<ForecastPoint>,
}

impl TryFrom<RawForecastTrack> for ForecastTrack {
    type Error = UnorderedTrackError;

    fn try_from(raw: RawForecastTrack) -> Result<Self, Self::Error> {
        Self::new(raw.cyclone_name, raw.base_time, raw.points)
    }
}

impl ForecastTrack {
    /// Builds a track, deriving the season from `base_time`.
    ///
    /// # Errors
    ///
    /// Returns [`UnorderedTrackError`] if any point is earlier than the one
    /// preceding it.
    pub fn new(
        cyclone_name: impl Into<String>,
        base_time: DateTime<Utc>,
        points: Vec<ForecastPoint>,
    ) -> Result<Self, UnorderedTrackError> {
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[1].time < pair[0].time)
        {
            return Err(UnorderedTrackError { index: index + 1 });
        }

        Ok(Self {
            cyclone_name: cyclone_name.into(),
            base_time,
            season: Season::containing(base_time),
            points,
        })
    }

    /// Title-cased cyclone name.
    #[must_use]
    pub fn cyclone_name(&self) -> &str {
        &self.cyclone_name
    }

    /// Forecast publication instant.
    #[must_use]
    pub const fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    /// Season the forecast was published in.
    #[must_use]
    pub const fn season(&self) -> Season {
        self.season
    }

    /// All points in time order.
    #[must_use]
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Composite identifier, e.g. `"Tino 2019/2020"`.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{} {}", self.cyclone_name, self.season)
    }

    /// Whole hours from the base time to `point`, truncated towards zero.
    #[must_use]
    pub fn lead_time_hours(&self, point: &ForecastPoint) -> i64 {
        lead_time_hours(self.base_time, point.time)
    }

    /// Points whose lead time does not exceed `max_hours`, in time order.
    pub fn within_lead_time(&self, max_hours: i64) -> impl Iterator<Item = &ForecastPoint> {
        self.points
            .iter()
            .filter(move |point| self.lead_time_hours(point) <= max_hours)
    }
}

/// Whole hours between `base_time` and `time`, truncated towards zero, so a
/// point 30 minutes before the base time has a lead time of 0.
#[must_use]
pub fn lead_time_hours(base_time: DateTime<Utc>, time: DateTime<Utc>) -> i64 {
    (time - base_time).num_seconds() / 3600
}

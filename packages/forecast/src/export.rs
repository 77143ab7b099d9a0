//! Writes a normalized track back out as a flat CSV table, one row per
//! forecast point, with the derived columns filled in.

use std::io::Write;

use chrono::{DateTime, Utc};
use cyclone_watch_forecast_models::ForecastTrack;
use serde::Serialize;

use crate::ForecastError;

#[derive(Serialize)]
struct TrackRow<'a> {
    forecast_time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    category: Option<u8>,
    uncertainty_km: Option<f64>,
    cyclone_name: &'a str,
    base_time: DateTime<Utc>,
    season: &'a str,
    name_season: &'a str,
    leadtime: i64,
}

/// Writes every point of `track` as a CSV row.
///
/// # Errors
///
/// Returns [`ForecastError::Csv`] or [`ForecastError::Io`] if writing fails.
pub fn write_track_csv<W: Write>(track: &ForecastTrack, writer: W) -> Result<(), ForecastError> {
    let season = track.season().to_string();
    let name_season = track.identifier();

    let mut csv_writer = csv::Writer::from_writer(writer);
    for point in track.points() {
        csv_writer.serialize(TrackRow {
            forecast_time: point.time,
            latitude: point.latitude,
            longitude: point.longitude,
            category: point.category.map(u8::from),
            uncertainty_km: point.uncertainty_radius_km,
            cyclone_name: track.cyclone_name(),
            base_time: track.base_time(),
            season: &season,
            name_season: &name_season,
            leadtime: track.lead_time_hours(point),
        })?;
    }
    csv_writer.flush()?;

    Ok(())
}

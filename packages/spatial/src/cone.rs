//! Uncertainty cone construction.
//!
//! The official forecast window is resampled onto a fixed cadence by linear
//! interpolation in time, each resampled position is buffered by its
//! interpolated uncertainty radius, and the circles are unioned into one
//! (possibly multi-part) polygon.

use std::f64::consts::TAU;

use chrono::{DateTime, TimeDelta, Utc};
use cyclone_watch_forecast_models::{ForecastPoint, ForecastTrack};
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::SpatialError;
use crate::projection::PlanarProjection;

/// Number of vertices used to approximate each buffer circle.
pub const CIRCLE_SEGMENTS: usize = 64;

/// One resampled position along the official forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConeSample {
    /// Sample time.
    pub time: DateTime<Utc>,
    /// Interpolated latitude in degrees.
    pub latitude: f64,
    /// Interpolated longitude in degrees. May leave `[-180, 180]` when the
    /// track crosses the antimeridian.
    pub longitude: f64,
    /// Interpolated uncertainty radius in kilometres.
    pub radius_km: f64,
}

/// Union of the buffered resampled positions, in planar metres.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyCone {
    samples: Vec<ConeSample>,
    planar: MultiPolygon<f64>,
}

impl UncertaintyCone {
    /// Samples the cone was built from.
    #[must_use]
    pub fn samples(&self) -> &[ConeSample] {
        &self.samples
    }

    /// Cone geometry in planar metres.
    #[must_use]
    pub const fn planar(&self) -> &MultiPolygon<f64> {
        &self.planar
    }

    /// Cone geometry in longitude/latitude degrees.
    #[must_use]
    pub fn to_geographic(&self, projection: &PlanarProjection) -> MultiPolygon<f64> {
        projection.unproject_multi_polygon(&self.planar)
    }

    /// Planar area in square kilometres.
    #[must_use]
    pub fn area_km2(&self) -> f64 {
        self.planar.unsigned_area() / 1_000_000.0
    }
}

/// Builds the uncertainty cone for the points of `track` within
/// `official_window_hours` of lead time.
///
/// # Errors
///
/// Returns [`SpatialError::EmptyTrack`] if no point falls in the window,
/// [`SpatialError::InvalidInterval`] if `interval` is not positive, or
/// [`SpatialError::Geometry`] if no point carries an uncertainty radius or
/// every radius is zero.
pub fn uncertainty_cone(
    track: &ForecastTrack,
    projection: &PlanarProjection,
    official_window_hours: i64,
    interval: TimeDelta,
) -> Result<UncertaintyCone, SpatialError> {
    let official: Vec<&ForecastPoint> = track.within_lead_time(official_window_hours).collect();
    if official.is_empty() {
        return Err(SpatialError::EmptyTrack {
            window_hours: official_window_hours,
        });
    }

    let samples = resample(&official, interval)?;
    let cone = buffer_samples(samples, projection)?;

    log::info!(
        "Built uncertainty cone from {} samples ({:.0} km2)",
        cone.samples.len(),
        cone.area_km2()
    );

    Ok(cone)
}

/// Resamples time-ordered points onto a cadence of `interval` starting at
/// the first point. The last point's time is always the final sample, and
/// no sample falls outside the first and last point times.
///
/// A single point yields a single sample.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidInterval`] if `interval` is not positive,
/// or [`SpatialError::Geometry`] if `points` is empty or no point carries
/// an uncertainty radius.
pub fn resample(
    points: &[&ForecastPoint],
    interval: TimeDelta,
) -> Result<Vec<ConeSample>, SpatialError> {
    if interval <= TimeDelta::zero() {
        return Err(SpatialError::InvalidInterval {
            minutes: interval.num_minutes(),
        });
    }

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(SpatialError::geometry("no points to resample"));
    };
    let origin = first.time;
    let offset = |time: DateTime<Utc>| (time - origin).num_seconds();

    let latitudes: Vec<(i64, f64)> = points.iter().map(|p| (offset(p.time), p.latitude)).collect();
    let longitudes = unwrapped_longitudes(points, &offset);
    let radii: Vec<(i64, f64)> = points
        .iter()
        .filter_map(|p| p.uncertainty_radius_km.map(|r| (offset(p.time), r)))
        .collect();

    if radii.is_empty() {
        return Err(SpatialError::geometry(
            "no point in the official window has an uncertainty radius",
        ));
    }

    let mut times = Vec::new();
    let mut time = origin;
    while time < last.time {
        times.push(time);
        time += interval;
    }
    times.push(last.time);

    Ok(times
        .into_iter()
        .map(|time| {
            let t = offset(time);
            ConeSample {
                time,
                latitude: interpolate(&latitudes, t),
                longitude: interpolate(&longitudes, t),
                radius_km: interpolate(&radii, t),
            }
        })
        .collect())
}

/// Longitudes shifted by whole turns so consecutive points never differ by
/// more than 180°, keeping interpolation continuous across the antimeridian.
fn unwrapped_longitudes(
    points: &[&ForecastPoint],
    offset: impl Fn(DateTime<Utc>) -> i64,
) -> Vec<(i64, f64)> {
    let mut out: Vec<(i64, f64)> = Vec::with_capacity(points.len());
    for point in points {
        let mut longitude = point.longitude;
        if let Some(&(_, previous)) = out.last() {
            longitude -= 360.0 * ((longitude - previous) / 360.0).round();
        }
        out.push((offset(point.time), longitude));
    }
    out
}

/// Linear interpolation over a time-sorted series. Times before the first
/// or after the last entry take that entry's value. Where several entries
/// share a time, the last of them wins.
#[allow(clippy::cast_precision_loss)]
fn interpolate(series: &[(i64, f64)], t: i64) -> f64 {
    let after = series.partition_point(|&(time, _)| time <= t);
    if after == 0 {
        return series[0].1;
    }
    if after == series.len() {
        return series[after - 1].1;
    }

    let (t0, v0) = series[after - 1];
    let (t1, v1) = series[after];
    let fraction = (t - t0) as f64 / (t1 - t0) as f64;
    (v1 - v0).mul_add(fraction, v0)
}

fn buffer_samples(
    samples: Vec<ConeSample>,
    projection: &PlanarProjection,
) -> Result<UncertaintyCone, SpatialError> {
    let mut planar = MultiPolygon::new(Vec::new());

    for sample in &samples {
        if sample.radius_km <= 0.0 {
            continue;
        }
        let centre = projection.project_lon_lat(sample.longitude, sample.latitude).0;
        let circle = MultiPolygon::new(vec![circle(centre, sample.radius_km * 1000.0)]);
        planar = planar.union(&circle);
    }

    if planar.0.is_empty() {
        return Err(SpatialError::geometry(
            "every uncertainty radius in the official window is zero",
        ));
    }

    Ok(UncertaintyCone { samples, planar })
}

#[allow(clippy::cast_precision_loss)]
fn circle(centre: Coord<f64>, radius_m: f64) -> Polygon<f64> {
    let ring: LineString<f64> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let theta = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            Coord {
                x: radius_m.mul_add(theta.cos(), centre.x),
                y: radius_m.mul_add(theta.sin(), centre.y),
            }
        })
        .collect();
    Polygon::new(ring, Vec::new())
}

//! Minimum distance from a forecast track to administrative regions.
//!
//! The distance for a region is measured from the whole track path (a line
//! through every point within the analysis window), so a track passing over
//! a region reports zero. The uncertainty and category attributed to the
//! region come from the single track point closest to it. That point is a
//! proxy for the closest approach, not an interpolated position on the path.

use cyclone_watch_forecast_models::{ForecastPoint, ForecastTrack};
use cyclone_watch_spatial_models::{DistanceRecord, LevelDistances};
use geo::{Distance, Euclidean, Geometry, LineString};

use crate::SpatialError;
use crate::boundaries::{ProjectedRegion, RegionSet};
use crate::projection::PlanarProjection;

/// A track point paired with its planar position.
struct PlanarPoint<'a> {
    point: &'a ForecastPoint,
    lead_time_hours: i64,
    planar: Geometry<f64>,
}

/// Computes one [`DistanceRecord`] per region in `regions`, sorted by
/// ascending distance.
///
/// Only points with a lead time of at most `analysis_window_hours` take
/// part. When several points are equally close to a region, the earliest
/// one supplies the uncertainty and category.
///
/// # Errors
///
/// Returns [`SpatialError::Geometry`] if `regions` is empty, or
/// [`SpatialError::EmptyTrack`] if no point falls within the window.
pub fn region_distances(
    track: &ForecastTrack,
    regions: &RegionSet,
    projection: &PlanarProjection,
    analysis_window_hours: i64,
) -> Result<LevelDistances, SpatialError> {
    if regions.is_empty() {
        return Err(SpatialError::geometry(format!(
            "no {} regions to measure against",
            regions.level()
        )));
    }

    let points: Vec<PlanarPoint<'_>> = track
        .within_lead_time(analysis_window_hours)
        .map(|point| PlanarPoint {
            point,
            lead_time_hours: track.lead_time_hours(point),
            planar: Geometry::Point(projection.project_lon_lat(point.longitude, point.latitude)),
        })
        .collect();

    let path = track_path(&points).ok_or(SpatialError::EmptyTrack {
        window_hours: analysis_window_hours,
    })?;

    let mut records: Vec<DistanceRecord> = regions
        .regions()
        .iter()
        .map(|region| region_record(&path, &points, region))
        .collect();

    records.sort_by_key(|record| record.distance_km);

    log::info!(
        "Measured {} {} regions against {} track points",
        records.len(),
        regions.level(),
        points.len()
    );

    Ok(LevelDistances {
        level: regions.level(),
        records,
    })
}

/// Runs [`region_distances`] for every region set, in the order given.
///
/// # Errors
///
/// Returns [`SpatialError::Geometry`] if `levels` is empty, or the first
/// error produced by any level.
pub fn distances_by_level(
    track: &ForecastTrack,
    levels: &[RegionSet],
    projection: &PlanarProjection,
    analysis_window_hours: i64,
) -> Result<Vec<LevelDistances>, SpatialError> {
    if levels.is_empty() {
        return Err(SpatialError::geometry(
            "no administrative levels to measure against",
        ));
    }

    levels
        .iter()
        .map(|regions| region_distances(track, regions, projection, analysis_window_hours))
        .collect()
}

/// Builds the track path through the points in time order. A single point
/// stays a point; no points yields `None`.
fn track_path(points: &[PlanarPoint<'_>]) -> Option<Geometry<f64>> {
    match points {
        [] => None,
        [only] => Some(only.planar.clone()),
        _ => {
            let line: LineString<f64> = points
                .iter()
                .filter_map(|p| match &p.planar {
                    Geometry::Point(point) => Some(point.0),
                    _ => None,
                })
                .collect();
            Some(Geometry::LineString(line))
        }
    }
}

fn region_record(
    path: &Geometry<f64>,
    points: &[PlanarPoint<'_>],
    region: &ProjectedRegion,
) -> DistanceRecord {
    let distance_m = Euclidean.distance(path, &region.planar);

    let mut closest = &points[0];
    let mut closest_m = Euclidean.distance(&closest.planar, &region.planar);
    for candidate in &points[1..] {
        let candidate_m = Euclidean.distance(&candidate.planar, &region.planar);
        if candidate_m < closest_m {
            closest = candidate;
            closest_m = candidate_m;
        }
    }

    log::debug!(
        "{} ({}): path {:.1} km, closest point at +{}h {:.1} km",
        region.region.pcode,
        region.region.name,
        distance_m / 1000.0,
        closest.lead_time_hours,
        closest_m / 1000.0
    );

    DistanceRecord {
        region_id: region.region.pcode.clone(),
        region_name: region.region.name.clone(),
        parent_id: region.region.parent_pcode.clone(),
        parent_name: region.region.parent_name.clone(),
        distance_km: round_km(distance_m / 1000.0),
        uncertainty_km: closest.point.uncertainty_radius_km.map(round_km),
        category: closest.point.category,
        hours_to_closest: closest.lead_time_hours,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_km(km: f64) -> u32 {
    km.max(0.0).round() as u32
}

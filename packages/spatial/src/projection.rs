//! Planar projection used for all metric arithmetic.
//!
//! Distances and buffers are computed in PDC Mercator (EPSG:3832): an
//! ellipsoidal Mercator on WGS84 with its central meridian at 150°E, so the
//! south-west Pacific and the antimeridian sit in one continuous plane.
//! Coordinates in degrees are never compared against metric values.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, MapCoords, MultiPolygon, Point};

/// WGS84 semi-major axis in metres.
pub const WGS84_SEMI_MAJOR_M: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Central meridian of PDC Mercator in degrees.
pub const PDC_CENTRAL_MERIDIAN: f64 = 150.0;

/// Latitudes beyond this magnitude are rejected before projecting.
pub const MAX_LATITUDE: f64 = 85.0;

const INVERSE_TOLERANCE: f64 = 1e-12;
const INVERSE_MAX_ITERATIONS: usize = 15;

/// Ellipsoidal Mercator projection with a configurable central meridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarProjection {
    /// Central meridian in degrees.
    central_meridian: f64,
    /// Semi-major axis in metres.
    a: f64,
    /// First eccentricity.
    e: f64,
}

impl Default for PlanarProjection {
    fn default() -> Self {
        Self::pdc_mercator()
    }
}

impl PlanarProjection {
    /// PDC Mercator (EPSG:3832).
    #[must_use]
    pub fn pdc_mercator() -> Self {
        Self::with_central_meridian(PDC_CENTRAL_MERIDIAN)
    }

    /// WGS84 Mercator centred on `central_meridian` degrees.
    #[must_use]
    pub fn with_central_meridian(central_meridian: f64) -> Self {
        let f = WGS84_FLATTENING;
        Self {
            central_meridian,
            a: WGS84_SEMI_MAJOR_M,
            e: f.mul_add(-f, 2.0 * f).sqrt(),
        }
    }

    /// Central meridian in degrees.
    #[must_use]
    pub const fn central_meridian(&self) -> f64 {
        self.central_meridian
    }

    /// Projects a geographic coordinate (`x` = longitude, `y` = latitude, in
    /// degrees) to metres.
    ///
    /// Longitudes are wrapped relative to the central meridian, so `-179.0`
    /// and `181.0` project to the same `x`.
    #[must_use]
    pub fn project(&self, geographic: Coord<f64>) -> Coord<f64> {
        let dlon = (geographic.x - self.central_meridian + 180.0).rem_euclid(360.0) - 180.0;
        let phi = geographic.y.to_radians();
        let es = self.e * phi.sin();

        let y = self.a
            * ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).ln();

        Coord {
            x: self.a * dlon.to_radians(),
            y,
        }
    }

    /// Inverse of [`Self::project`]. Longitudes come back in
    /// `[central_meridian - 180, central_meridian + 180)`.
    #[must_use]
    pub fn unproject(&self, planar: Coord<f64>) -> Coord<f64> {
        let t = (-planar.y / self.a).exp();
        let mut phi = 2.0f64.mul_add(-t.atan(), FRAC_PI_2);

        for _ in 0..INVERSE_MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next = 2.0f64.mul_add(
                -(t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan(),
                FRAC_PI_2,
            );
            let converged = (next - phi).abs() < INVERSE_TOLERANCE;
            phi = next;
            if converged {
                break;
            }
        }

        let dlon = ((planar.x / self.a).to_degrees() + 180.0).rem_euclid(360.0) - 180.0;

        Coord {
            x: self.central_meridian + dlon,
            y: phi.to_degrees(),
        }
    }

    /// Projects a longitude/latitude pair into a planar point.
    #[must_use]
    pub fn project_lon_lat(&self, longitude: f64, latitude: f64) -> Point<f64> {
        Point(self.project(Coord {
            x: longitude,
            y: latitude,
        }))
    }

    /// Projects every coordinate of a geographic multi-polygon.
    #[must_use]
    pub fn project_multi_polygon(&self, geographic: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geographic.map_coords(|c| self.project(c))
    }

    /// Unprojects every coordinate of a planar multi-polygon.
    #[must_use]
    pub fn unproject_multi_polygon(&self, planar: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        planar.map_coords(|c| self.unproject(c))
    }
}

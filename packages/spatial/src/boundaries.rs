//! Administrative boundary loading and projection.
//!
//! Boundaries come in as `GeoJSON` feature collections in geographic
//! coordinates. Each feature becomes an [`AdministrativeRegion`]; a whole
//! level is then projected once into a [`RegionSet`] that the distance
//! engine can reuse across runs.

use std::path::Path;

use cyclone_watch_spatial_models::AdminLevel;
use geo::{BoundingRect, CoordsIter, Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};

use crate::SpatialError;
use crate::projection::{MAX_LATITUDE, PlanarProjection};

/// A named administrative boundary in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct AdministrativeRegion {
    /// Hierarchical region code (`ADM{n}_PCODE`).
    pub pcode: String,
    /// English region name (`ADM{n}_EN`).
    pub name: String,
    /// Code of the containing region, for nested levels.
    pub parent_pcode: Option<String>,
    /// Name of the containing region, for nested levels.
    pub parent_name: Option<String>,
    /// Boundary in longitude/latitude degrees.
    pub geometry: MultiPolygon<f64>,
}

/// A region prepared for metric computations.
#[derive(Debug, Clone)]
pub struct ProjectedRegion {
    /// The source region.
    pub region: AdministrativeRegion,
    /// The boundary in planar metres.
    pub planar: Geometry<f64>,
}

/// All regions of one administrative level, projected into the planar CRS.
///
/// Immutable once built and safe to share between concurrent runs.
#[derive(Debug, Clone)]
pub struct RegionSet {
    level: AdminLevel,
    regions: Vec<ProjectedRegion>,
}

impl RegionSet {
    /// Projects `regions` into the planar CRS.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Geometry`] if a region has no polygons, or
    /// has a coordinate that is not finite or lies beyond the projectable
    /// latitude range.
    pub fn new(
        level: AdminLevel,
        regions: Vec<AdministrativeRegion>,
        projection: &PlanarProjection,
    ) -> Result<Self, SpatialError> {
        let regions = regions
            .into_iter()
            .map(|region| {
                validate_geometry(&region)?;
                let planar = Geometry::MultiPolygon(projection.project_multi_polygon(&region.geometry));
                Ok(ProjectedRegion { region, planar })
            })
            .collect::<Result<Vec<_>, SpatialError>>()?;

        log::info!("Projected {} {level} regions", regions.len());

        Ok(Self { level, regions })
    }

    /// Parses a `GeoJSON` document and projects its regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or a feature lacks
    /// a code, a name or a polygon geometry.
    pub fn from_geojson_str(
        level: AdminLevel,
        geojson_str: &str,
        projection: &PlanarProjection,
    ) -> Result<Self, SpatialError> {
        Self::new(level, parse_regions(geojson_str, level)?, projection)
    }

    /// Reads a `GeoJSON` file and projects its regions.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Io`] if the file cannot be read, or any
    /// error from [`Self::from_geojson_str`].
    pub fn read(
        level: AdminLevel,
        path: &Path,
        projection: &PlanarProjection,
    ) -> Result<Self, SpatialError> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Read {level} boundaries from {}", path.display());
        Self::from_geojson_str(level, &text, projection)
    }

    /// Administrative level of every region in the set.
    #[must_use]
    pub const fn level(&self) -> AdminLevel {
        self.level
    }

    /// Projected regions in input order.
    #[must_use]
    pub fn regions(&self) -> &[ProjectedRegion] {
        &self.regions
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the set holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn validate_geometry(region: &AdministrativeRegion) -> Result<(), SpatialError> {
    if region.geometry.bounding_rect().is_none() {
        return Err(SpatialError::geometry(format!(
            "region {} has an empty geometry",
            region.pcode
        )));
    }

    let out_of_range = region
        .geometry
        .coords_iter()
        .find(|c| !c.x.is_finite() || !c.y.is_finite() || c.y.abs() > MAX_LATITUDE);

    if let Some(coord) = out_of_range {
        return Err(SpatialError::geometry(format!(
            "region {} has unprojectable coordinate ({}, {})",
            region.pcode, coord.x, coord.y
        )));
    }

    Ok(())
}

/// Parses every feature of a `GeoJSON` document into a region of `level`.
///
/// Accepts a feature collection or a single feature.
///
/// # Errors
///
/// Returns [`SpatialError::GeoJson`] if the document is not valid
/// `GeoJSON`, or [`SpatialError::Geometry`] if it holds a bare geometry or a
/// feature lacks a code, a name or a polygon geometry.
pub fn parse_regions(
    geojson_str: &str,
    level: AdminLevel,
) -> Result<Vec<AdministrativeRegion>, SpatialError> {
    let features = match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(SpatialError::geometry(
                "expected a feature collection, found a bare geometry",
            ));
        }
    };

    features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| parse_region(feature, level, index))
        .collect()
}

fn parse_region(
    feature: Feature,
    level: AdminLevel,
    index: usize,
) -> Result<AdministrativeRegion, SpatialError> {
    let pcode_key = level.pcode_property();
    let name_key = level.name_property();

    let pcode = property_string(&feature, &pcode_key).ok_or_else(|| {
        SpatialError::geometry(format!("feature {index} has no {pcode_key} property"))
    })?;
    let name = property_string(&feature, &name_key).ok_or_else(|| {
        SpatialError::geometry(format!("feature {index} ({pcode}) has no {name_key} property"))
    })?;

    let (parent_pcode, parent_name) = level.parent().map_or((None, None), |parent| {
        (
            property_string(&feature, &parent.pcode_property()),
            property_string(&feature, &parent.name_property()),
        )
    });

    let geometry = feature
        .geometry
        .and_then(to_multi_polygon)
        .ok_or_else(|| {
            SpatialError::geometry(format!("feature {index} ({pcode}) has no polygon geometry"))
        })?;

    Ok(AdministrativeRegion {
        pcode,
        name,
        parent_pcode,
        parent_name,
        geometry,
    })
}

fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multi_polygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADM2: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "ADM1_PCODE": "VU05", "ADM1_EN": "Shefa",
                    "ADM2_PCODE": "VU0501", "ADM2_EN": "Efate"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[168.1, -17.8], [168.6, -17.8], [168.6, -17.5], [168.1, -17.5], [168.1, -17.8]]]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "ADM1_PCODE": "VU06", "ADM1_EN": "Tafea",
                    "ADM2_PCODE": "VU0601", "ADM2_EN": "Tanna"
                },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[169.2, -19.7], [169.5, -19.7], [169.5, -19.4], [169.2, -19.4], [169.2, -19.7]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_nested_level_with_parents() {
        let regions = parse_regions(ADM2, AdminLevel::Adm2).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].pcode, "VU0501");
        assert_eq!(regions[0].name, "Efate");
        assert_eq!(regions[0].parent_pcode.as_deref(), Some("VU05"));
        assert_eq!(regions[1].parent_name.as_deref(), Some("Tafea"));
        assert_eq!(regions[1].geometry.0.len(), 1);
    }

    #[test]
    fn coarse_level_has_no_parent() {
        let regions = parse_regions(ADM2, AdminLevel::Adm1).unwrap();
        assert_eq!(regions[0].pcode, "VU05");
        assert_eq!(regions[0].parent_pcode, None);
    }

    #[test]
    fn missing_code_property_is_geometry_error() {
        let err =
            parse_regions(&ADM2.replace("ADM2_PCODE", "CODE"), AdminLevel::Adm2).unwrap_err();
        assert!(err.to_string().contains("ADM2_PCODE"), "{err}");
    }

    #[test]
    fn point_geometry_is_rejected() {
        let doc = r#"{"type": "Feature", "properties": {"ADM1_PCODE": "VU01", "ADM1_EN": "Torba"},
            "geometry": {"type": "Point", "coordinates": [167.5, -13.8]}}"#;
        assert!(matches!(
            parse_regions(doc, AdminLevel::Adm1),
            Err(SpatialError::Geometry { .. })
        ));
    }

    #[test]
    fn invalid_json_is_geojson_error() {
        assert!(matches!(
            parse_regions("{not json", AdminLevel::Adm1),
            Err(SpatialError::GeoJson(_))
        ));
    }

    #[test]
    fn region_set_projects_every_region() {
        let set =
            RegionSet::from_geojson_str(AdminLevel::Adm2, ADM2, &PlanarProjection::pdc_mercator())
                .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.level(), AdminLevel::Adm2);
        let rect = set.regions()[0].planar.bounding_rect().unwrap();
        // Efate sits roughly 18° east of the central meridian.
        assert!(rect.min().x > 2_000_000.0 && rect.max().x < 2_100_000.0, "{rect:?}");
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let region = AdministrativeRegion {
            pcode: "VU01".to_string(),
            name: "Torba".to_string(),
            parent_pcode: None,
            parent_name: None,
            geometry: MultiPolygon(Vec::new()),
        };
        let err = RegionSet::new(
            AdminLevel::Adm1,
            vec![region],
            &PlanarProjection::pdc_mercator(),
        )
        .unwrap_err();
        assert!(matches!(err, SpatialError::Geometry { .. }));
    }
}

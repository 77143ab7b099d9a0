//! Output writers for an [`Assessment`].
//!
//! Every file name carries the report's UTC file stamp:
//!
//! | File | Content |
//! |---|---|
//! | `forecast_{stamp}.csv` | normalized track |
//! | `distances_adm{n}_{stamp}.csv` | distance records per level |
//! | `cone_{stamp}.geojson` | uncertainty cone and official track |
//! | `report_{stamp}.json` | report identity and closest pass |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use cyclone_watch_forecast::export::write_track_csv;
use cyclone_watch_spatial::PlanarProjection;
use cyclone_watch_spatial_models::{AdminLevel, LevelDistances};
use geo::LineString;
use geojson::{Feature, FeatureCollection, JsonObject};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::pipeline::Assessment;
use crate::report::ClosestPass;
use crate::ReportError;

/// Writes one CSV row per distance record.
///
/// Level 1 tables start with `ADM1_PCODE,ADM1_EN`; level 2 tables carry the
/// parent columns first, then `ADM2_PCODE,ADM2_EN`. Categories print as `L`
/// or a digit, missing values as empty cells.
///
/// # Errors
///
/// Returns [`ReportError::Csv`] or [`ReportError::Io`] if writing fails.
pub fn write_distances_csv<W: Write>(
    distances: &LevelDistances,
    writer: W,
) -> Result<(), ReportError> {
    let level = distances.level;
    let mut header = Vec::new();
    if let Some(parent) = level.parent() {
        header.extend([parent.pcode_property(), parent.name_property()]);
    }
    header.extend([level.pcode_property(), level.name_property()]);
    header.extend(
        ["distance_km", "uncertainty_km", "category", "hours_to_closest"].map(String::from),
    );

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&header)?;

    for record in &distances.records {
        let mut row = Vec::with_capacity(header.len());
        if level.parent().is_some() {
            row.push(record.parent_id.clone().unwrap_or_default());
            row.push(record.parent_name.clone().unwrap_or_default());
        }
        row.push(record.region_id.clone());
        row.push(record.region_name.clone());
        row.push(record.distance_km.to_string());
        row.push(
            record
                .uncertainty_km
                .map(|km| km.to_string())
                .unwrap_or_default(),
        );
        row.push(record.category.map(|c| c.to_string()).unwrap_or_default());
        row.push(record.hours_to_closest.to_string());
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Builds a feature collection holding the cone and the official track, both
/// in longitude/latitude degrees.
#[must_use]
pub fn cone_feature_collection(
    assessment: &Assessment,
    projection: &PlanarProjection,
    official_window_hours: i64,
) -> FeatureCollection {
    let report = &assessment.report;

    let mut cone_properties = JsonObject::new();
    cone_properties.insert("kind".to_string(), "cone".into());
    cone_properties.insert("cyclone".to_string(), report.cyclone_label().into());
    cone_properties.insert("publicationTime".to_string(), report.publication_time().into());
    cone_properties.insert("officialWindowHours".to_string(), official_window_hours.into());
    cone_properties.insert("areaKm2".to_string(), assessment.cone.area_km2().into());

    let track: LineString<f64> = assessment
        .track
        .within_lead_time(official_window_hours)
        .map(|p| (p.longitude, p.latitude))
        .collect();
    let mut track_properties = JsonObject::new();
    track_properties.insert("kind".to_string(), "track".into());
    track_properties.insert("cyclone".to_string(), report.cyclone_label().into());

    let cone_geometry = assessment.cone.to_geographic(projection);

    FeatureCollection {
        bbox: None,
        features: vec![
            feature(geojson::Value::from(&cone_geometry), cone_properties),
            feature(geojson::Value::from(&track), track_properties),
        ],
        foreign_members: None,
    }
}

fn feature(value: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Report summary consumed by notification collaborators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<'a> {
    /// Cyclone name and season.
    pub cyclone: &'a str,
    /// Cyclone name alone.
    pub display_name: &'a str,
    /// ISO publication time at minute precision.
    pub publication_time: String,
    /// Filename-safe UTC stamp.
    pub file_stamp: String,
    /// IANA zone of the local strings.
    pub time_zone: &'a str,
    /// Publication date in the local zone.
    pub local_date: String,
    /// Publication time of day in the local zone.
    pub local_time: String,
    /// Closest pass over the canonical level.
    pub closest_pass: Option<&'a ClosestPass>,
}

impl<'a> ReportDocument<'a> {
    /// Builds the summary for `assessment` with local strings in `zone`.
    #[must_use]
    pub fn new(assessment: &'a Assessment, zone: Tz) -> Self {
        let report = &assessment.report;
        Self {
            cyclone: report.cyclone_label(),
            display_name: report.display_name(),
            publication_time: report.publication_time(),
            file_stamp: report.file_stamp(),
            time_zone: zone.name(),
            local_date: report.local_date(zone),
            local_time: report.local_time(zone),
            closest_pass: assessment.closest_pass.as_ref(),
        }
    }
}

/// Writes every output of `assessment` into `dir`, creating it if needed.
/// Returns the written paths in write order.
///
/// Each file is written to a `.tmp` sibling first and renamed into place.
///
/// # Errors
///
/// Returns [`ReportError::Io`], [`ReportError::Csv`] or
/// [`ReportError::Json`] if any file cannot be written.
pub fn write_outputs(
    assessment: &Assessment,
    config: &EngineConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(dir)?;
    let stamp = assessment.report.file_stamp();
    let mut written = Vec::new();

    written.push(write_file(dir, &format!("forecast_{stamp}.csv"), |w| {
        Ok(write_track_csv(&assessment.track, w)?)
    })?);

    for distances in &assessment.distances {
        let name = distances_file_name(distances.level, &stamp);
        written.push(write_file(dir, &name, |w| write_distances_csv(distances, w))?);
    }

    let projection = PlanarProjection::pdc_mercator();
    let cone = cone_feature_collection(assessment, &projection, config.official_window_hours);
    written.push(write_file(dir, &format!("cone_{stamp}.geojson"), |w| {
        serde_json::to_writer(w, &cone)?;
        Ok(())
    })?);

    let document = ReportDocument::new(assessment, config.local_time_zone);
    written.push(write_file(dir, &format!("report_{stamp}.json"), |w| {
        serde_json::to_writer_pretty(w, &document)?;
        Ok(())
    })?);

    log::info!("Wrote {} outputs to {}", written.len(), dir.display());

    Ok(written)
}

/// `distances_adm{n}_{stamp}.csv`
#[must_use]
pub fn distances_file_name(level: AdminLevel, stamp: &str) -> String {
    format!("distances_adm{}_{stamp}.csv", level.number())
}

fn write_file(
    dir: &Path,
    name: &str,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<(), ReportError>,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(name);
    let tmp_path = dir.join(format!("{name}.tmp"));

    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp_path, &path)?;
    log::debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use cyclone_watch_forecast_models::WindCategory;
    use cyclone_watch_spatial_models::DistanceRecord;
    use geojson::GeoJson;

    use super::*;
    use crate::pipeline::tests::lola;

    fn adm2() -> LevelDistances {
        LevelDistances {
            level: AdminLevel::Adm2,
            records: vec![
                DistanceRecord {
                    region_id: "VU0501".to_string(),
                    region_name: "Efate".to_string(),
                    parent_id: Some("VU05".to_string()),
                    parent_name: Some("Shefa".to_string()),
                    distance_km: 0,
                    uncertainty_km: Some(120),
                    category: Some(WindCategory::L),
                    hours_to_closest: 48,
                },
                DistanceRecord {
                    region_id: "VU0601".to_string(),
                    region_name: "Tanna".to_string(),
                    parent_id: Some("VU06".to_string()),
                    parent_name: Some("Tafea".to_string()),
                    distance_km: 84,
                    uncertainty_km: None,
                    category: None,
                    hours_to_closest: 60,
                },
            ],
        }
    }

    #[test]
    fn distances_csv_has_parent_columns() {
        let mut out = Vec::new();
        write_distances_csv(&adm2(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ADM1_PCODE,ADM1_EN,ADM2_PCODE,ADM2_EN,distance_km,uncertainty_km,category,hours_to_closest",
                "VU05,Shefa,VU0501,Efate,0,120,L,48",
                "VU06,Tafea,VU0601,Tanna,84,,,60",
            ]
        );
    }

    #[test]
    fn file_names_carry_level_and_stamp() {
        assert_eq!(
            distances_file_name(AdminLevel::Adm1, "2024-02-10T0600Z"),
            "distances_adm1_2024-02-10T0600Z.csv"
        );
    }

    #[test]
    fn cone_collection_is_geographic() {
        let assessment = lola();
        let collection =
            cone_feature_collection(&assessment, &PlanarProjection::pdc_mercator(), 72);
        assert_eq!(collection.features.len(), 2);

        let text = GeoJson::FeatureCollection(collection).to_string();
        let parsed: GeoJson = text.parse().unwrap();
        let GeoJson::FeatureCollection(parsed) = parsed else {
            panic!("expected a feature collection");
        };
        let cone = &parsed.features[0];
        assert_eq!(cone.property("kind").and_then(|v| v.as_str()), Some("cone"));

        let geometry: geo::Geometry<f64> = cone.geometry.clone().unwrap().try_into().unwrap();
        let rect = geo::BoundingRect::bounding_rect(&geometry).unwrap();
        assert!(rect.min().x > 165.0 && rect.max().x < 175.0, "{rect:?}");
        assert!(rect.min().y > -25.0 && rect.max().y < -10.0, "{rect:?}");
    }

    #[test]
    fn report_document_uses_configured_zone() {
        let assessment = lola();
        let document = ReportDocument::new(&assessment, chrono_tz::Pacific::Efate);
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["cyclone"], "Lola 2023/2024");
        assert_eq!(json["displayName"], "Lola");
        assert_eq!(json["publicationTime"], "2024-02-10T06:00+00:00");
        assert_eq!(json["timeZone"], "Pacific/Efate");
        assert_eq!(json["localTime"], "17:00");
        assert_eq!(json["closestPass"]["regionId"], "VU05");
        assert_eq!(json["closestPass"]["category"], 3);
    }

    #[test]
    fn writes_every_output() {
        let tmp = std::env::temp_dir().join("cyclone_watch_report_outputs");
        let _ = std::fs::remove_dir_all(&tmp);

        let assessment = lola();
        let written = write_outputs(&assessment, &EngineConfig::default(), &tmp).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "forecast_2024-02-10T0600Z.csv",
                "distances_adm1_2024-02-10T0600Z.csv",
                "distances_adm2_2024-02-10T0600Z.csv",
                "cone_2024-02-10T0600Z.geojson",
                "report_2024-02-10T0600Z.json",
            ]
        );
        assert!(written.iter().all(|p| p.exists()));
        assert!(!tmp.join("report_2024-02-10T0600Z.json.tmp").exists());

        let adm1 = std::fs::read_to_string(&written[1]).unwrap();
        assert!(adm1.lines().nth(1).unwrap().starts_with("VU05,Shefa,0,120,3,48"));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

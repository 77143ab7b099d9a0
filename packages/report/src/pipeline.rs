//! Assessment pipeline: decode, normalize, measure, build the cone, report.

use cyclone_watch_forecast::{decode_forecast_text, parse_forecast};
use cyclone_watch_forecast_models::ForecastTrack;
use cyclone_watch_spatial::cone::uncertainty_cone;
use cyclone_watch_spatial::distance::distances_by_level;
use cyclone_watch_spatial::{PlanarProjection, RegionSet, UncertaintyCone};
use cyclone_watch_spatial_models::{AdminLevel, LevelDistances};

use crate::config::EngineConfig;
use crate::report::{ClosestPass, Report};
use crate::ReportError;

/// Everything one forecast run produces.
#[derive(Debug, Clone)]
pub struct Assessment {
    /// Normalized forecast track.
    pub track: ForecastTrack,
    /// Cyclone identity and publication time.
    pub report: Report,
    /// Distance records per administrative level, in the order the region
    /// sets were given.
    pub distances: Vec<LevelDistances>,
    /// Uncertainty cone over the official window.
    pub cone: UncertaintyCone,
    /// Closest pass over the canonical level.
    pub closest_pass: Option<ClosestPass>,
}

impl Assessment {
    /// Distance records for `level`, if that level was assessed.
    #[must_use]
    pub fn level(&self, level: AdminLevel) -> Option<&LevelDistances> {
        self.distances.iter().find(|d| d.level == level)
    }
}

/// Assesses a transport-encoded forecast against `regions`.
///
/// # Errors
///
/// Returns [`ReportError::Config`] if `config` is invalid,
/// [`ReportError::Forecast`] if the text cannot be decoded or normalized,
/// or [`ReportError::Spatial`] if distances or the cone cannot be computed.
pub fn assess(
    encoded: &str,
    regions: &[RegionSet],
    config: &EngineConfig,
) -> Result<Assessment, ReportError> {
    let track = parse_forecast(decode_forecast_text(encoded)?)?;
    assess_track(track, regions, config)
}

/// Assesses an already normalized track against `regions`.
///
/// Distances use every point within the analysis window; the cone uses the
/// official window. The closest pass is taken from the level 1 records, or
/// from the first region set when no level 1 set is given.
///
/// # Errors
///
/// Returns [`ReportError::Config`] if `config` is invalid, or
/// [`ReportError::Spatial`] if `regions` is empty or distances or the cone
/// cannot be computed.
pub fn assess_track(
    track: ForecastTrack,
    regions: &[RegionSet],
    config: &EngineConfig,
) -> Result<Assessment, ReportError> {
    config.validate()?;

    let projection = PlanarProjection::pdc_mercator();
    let report = Report::from_track(&track);
    log::info!(
        "Assessing {} issued {}",
        report.cyclone_label(),
        report.publication_time()
    );

    let distances = distances_by_level(
        &track,
        regions,
        &projection,
        config.analysis_window_hours,
    )?;

    let cone = uncertainty_cone(
        &track,
        &projection,
        config.official_window_hours,
        config.resample_interval()?,
    )?;

    let canonical = distances
        .iter()
        .find(|d| d.level == AdminLevel::Adm1)
        .or_else(|| distances.first());
    let closest_pass = canonical.and_then(ClosestPass::from_records);

    if let Some(pass) = &closest_pass {
        log::info!(
            "Closest pass: {} ({}) at {} km in {} hours",
            pass.region_name,
            pass.region_id,
            pass.distance_km,
            pass.hours_to_closest
        );
    } else {
        log::warn!("No regions assessed for {}", report.cyclone_label());
    }

    Ok(Assessment {
        track,
        report,
        distances,
        cone,
        closest_pass,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use cyclone_watch_forecast::encode_forecast_text;
    use cyclone_watch_forecast_models::WindCategory;
    use cyclone_watch_spatial::SpatialError;

    use super::*;

    pub(crate) const FORECAST: &str = include_str!("../../forecast/fixtures/forecast_lola.csv");

    pub(crate) const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "ADM1_PCODE": "VU06", "ADM1_EN": "Tafea",
                    "ADM2_PCODE": "VU0601", "ADM2_EN": "Tanna"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[169.2, -19.7], [169.5, -19.7], [169.5, -19.4], [169.2, -19.4], [169.2, -19.7]]]
                }
            },
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
            }
        ]
    }"#;

    pub(crate) fn region_sets() -> Vec<RegionSet> {
        let projection = PlanarProjection::pdc_mercator();
        [AdminLevel::Adm1, AdminLevel::Adm2]
            .into_iter()
            .map(|level| RegionSet::from_geojson_str(level, BOUNDARIES, &projection).unwrap())
            .collect()
    }

    pub(crate) fn lola() -> Assessment {
        assess(
            &encode_forecast_text(FORECAST),
            &region_sets(),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn assesses_encoded_forecast_end_to_end() {
        let assessment = lola();

        assert_eq!(assessment.report.cyclone_label(), "Lola 2023/2024");
        assert_eq!(assessment.track.points().len(), 13);
        assert_eq!(assessment.distances.len(), 2);

        let adm1 = assessment.level(AdminLevel::Adm1).unwrap();
        let ids: Vec<&str> = adm1.records.iter().map(|r| r.region_id.as_str()).collect();
        assert_eq!(ids, vec!["VU05", "VU06"]);

        let shefa = &adm1.records[0];
        assert_eq!(shefa.distance_km, 0);
        assert_eq!(shefa.hours_to_closest, 48);
        assert_eq!(shefa.uncertainty_km, Some(120));
        assert_eq!(shefa.category, Some(WindCategory::Three));
        assert!(adm1.records[1].distance_km > 0);

        let adm2 = assessment.level(AdminLevel::Adm2).unwrap();
        assert_eq!(adm2.records[0].region_id, "VU0501");
        assert_eq!(adm2.records[0].parent_id.as_deref(), Some("VU05"));

        let pass = assessment.closest_pass.unwrap();
        assert_eq!(pass.region_id, "VU05");
        assert_eq!(pass.distance_km, 0);
    }

    #[test]
    fn cone_covers_official_window_only() {
        let assessment = lola();
        let samples = assessment.cone.samples();
        assert_eq!(samples.len(), 72 * 4 + 1);
        assert_eq!(
            samples.last().unwrap().time,
            assessment.track.base_time() + chrono::TimeDelta::hours(72)
        );
        assert!(assessment.cone.area_km2() > 0.0);
    }

    #[test]
    fn raw_track_matches_encoded() {
        let track = cyclone_watch_forecast::parse_forecast_str(FORECAST).unwrap();
        let direct = assess_track(track, &region_sets(), &EngineConfig::default()).unwrap();
        assert_eq!(direct.distances, lola().distances);
    }

    #[test]
    fn no_region_sets_is_rejected() {
        let track = cyclone_watch_forecast::parse_forecast_str(FORECAST).unwrap();
        let err = assess_track(track, &[], &EngineConfig::default()).unwrap_err();
        assert!(
            matches!(err, ReportError::Spatial(SpatialError::Geometry { .. })),
            "{err}"
        );
    }

    #[test]
    fn empty_region_set_is_rejected() {
        let track = cyclone_watch_forecast::parse_forecast_str(FORECAST).unwrap();
        let empty = RegionSet::new(
            AdminLevel::Adm1,
            Vec::new(),
            &PlanarProjection::pdc_mercator(),
        )
        .unwrap();
        let err = assess_track(track, &[empty], &EngineConfig::default()).unwrap_err();
        assert!(
            matches!(err, ReportError::Spatial(SpatialError::Geometry { .. })),
            "{err}"
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let config = EngineConfig {
            official_window_hours: 0,
            ..EngineConfig::default()
        };
        let track = cyclone_watch_forecast::parse_forecast_str(FORECAST).unwrap();
        assert!(matches!(
            assess_track(track, &region_sets(), &config),
            Err(ReportError::Config { .. })
        ));
    }

    #[test]
    fn undecodable_text_is_forecast_error() {
        let err = assess("A", &region_sets(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ReportError::Forecast(_)), "{err}");
    }
}

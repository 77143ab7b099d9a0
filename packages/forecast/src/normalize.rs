//! Normalizes a raw RSMC forecast table into a [`ForecastTrack`].
//!
//! The export has two parts. A short preamble carries the publication time
//! (`baseTime=...` on line 1) and the storm name (`CycloneName=...` on line
//! 3). The point table starts on line 7 with a header row, followed by a
//! units row that carries no data and is discarded.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Utc};
use cyclone_watch_forecast_models::{ForecastPoint, ForecastTrack, WindCategory};

use crate::ForecastError;

/// Number of lines preceding the table header.
const BODY_START_LINE: usize = 6;

const BASE_TIME_TOKEN: &str = "baseTime=";
const CYCLONE_NAME_TOKEN: &str = "CycloneName=";

/// Reads and normalizes a forecast table from any reader.
///
/// # Errors
///
/// Returns [`ForecastError::Io`] if the stream cannot be read, or any error
/// from [`parse_forecast_str`].
pub fn parse_forecast<R: Read>(mut reader: R) -> Result<ForecastTrack, ForecastError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_forecast_str(&text)
}

/// Normalizes a forecast table held in memory.
///
/// # Errors
///
/// Returns [`ForecastError::MalformedForecast`] if a preamble token or a
/// required column is missing, the table has no data rows, a time or
/// coordinate cannot be read, or the rows are not in time order.
pub fn parse_forecast_str(text: &str) -> Result<ForecastTrack, ForecastError> {
    let lines: Vec<&str> = text.lines().collect();

    let base_time = parse_base_time(lines.first().copied().unwrap_or_default())?;
    let cyclone_name = parse_cyclone_name(lines.get(2).copied().unwrap_or_default())?;

    let body = lines.get(BODY_START_LINE..).unwrap_or_default().join("\n");
    let points = parse_points(&body)?;

    let track = ForecastTrack::new(cyclone_name, base_time, points)
        .map_err(|e| ForecastError::malformed("Time", Some(e.index), e.to_string()))?;

    log::info!(
        "Parsed forecast for {} published {} ({} points)",
        track.identifier(),
        track.base_time(),
        track.points().len()
    );

    Ok(track)
}

fn find_token<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    line.split(',')
        .map(|cell| cell.trim().trim_start_matches('#').trim())
        .find_map(|cell| cell.strip_prefix(token))
        .map(str::trim)
}

fn parse_base_time(line: &str) -> Result<DateTime<Utc>, ForecastError> {
    let raw = find_token(line, BASE_TIME_TOKEN).ok_or_else(|| {
        ForecastError::malformed(
            BASE_TIME_TOKEN,
            None,
            "preamble line 1 has no baseTime= token",
        )
    })?;

    parse_utc(raw).ok_or_else(|| {
        ForecastError::malformed(
            BASE_TIME_TOKEN,
            None,
            format!("cannot parse base time '{raw}'"),
        )
    })
}

fn parse_cyclone_name(line: &str) -> Result<String, ForecastError> {
    let raw = find_token(line, CYCLONE_NAME_TOKEN)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ForecastError::malformed(
                CYCLONE_NAME_TOKEN,
                None,
                "preamble line 3 has no CycloneName= token",
            )
        })?;

    Ok(title_case(raw))
}

/// Upper-cases the first letter of each word and lower-cases the rest.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a UTC timestamp. The export writes `Z`-suffixed ISO 8601, but
/// naive timestamps are accepted as UTC as well.
fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Column positions resolved from the table header.
struct Columns {
    time: usize,
    latitude: usize,
    longitude: usize,
    category: Option<usize>,
    uncertainty: Option<usize>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Result<Self, ForecastError> {
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str, found: Option<usize>| {
            found.ok_or_else(|| {
                ForecastError::malformed(name, None, "required column is missing from the header")
            })
        };

        let time = header
            .iter()
            .position(|h| h.trim().to_ascii_lowercase().starts_with("time"));

        Ok(Self {
            time: required("Time", time)?,
            latitude: required("Latitude", position("Latitude"))?,
            longitude: required("Longitude", position("Longitude"))?,
            category: position("Category"),
            uncertainty: position("Uncertainty"),
        })
    }
}

fn parse_points(body: &str) -> Result<Vec<ForecastPoint>, ForecastError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns = Columns::from_header(reader.headers()?)?;

    let mut points = Vec::new();
    // The first record after the header is the units row.
    for (row, record) in reader.records().skip(1).enumerate() {
        points.push(parse_point(&record?, &columns, row)?);
    }

    if points.is_empty() {
        return Err(ForecastError::malformed(
            "Time",
            None,
            "forecast table has no data rows",
        ));
    }

    Ok(points)
}

fn parse_point(
    record: &csv::StringRecord,
    columns: &Columns,
    row: usize,
) -> Result<ForecastPoint, ForecastError> {
    let cell = |index: usize| record.get(index).map(str::trim).unwrap_or_default();

    let raw_time = cell(columns.time);
    let time = parse_utc(raw_time).ok_or_else(|| {
        ForecastError::malformed("Time", Some(row), format!("cannot parse time '{raw_time}'"))
    })?;

    let latitude = parse_coordinate(cell(columns.latitude), "Latitude", row, 90.0)?;
    let longitude = parse_coordinate(cell(columns.longitude), "Longitude", row, 360.0)?;

    let category = parse_category(columns.category.map_or("", cell), row);

    let uncertainty_radius_km = match columns.uncertainty.map(cell) {
        Some(raw) if !is_missing(raw) => Some(parse_radius(raw, row)?),
        _ => None,
    };

    Ok(ForecastPoint {
        time,
        latitude,
        longitude,
        category,
        uncertainty_radius_km,
    })
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("nan")
}

fn parse_coordinate(raw: &str, field: &str, row: usize, limit: f64) -> Result<f64, ForecastError> {
    let value: f64 = raw.parse().map_err(|_| {
        ForecastError::malformed(field, Some(row), format!("cannot parse coordinate '{raw}'"))
    })?;

    if !value.is_finite() || value.abs() > limit {
        return Err(ForecastError::malformed(
            field,
            Some(row),
            format!("coordinate {value} is out of range"),
        ));
    }

    Ok(value)
}

fn parse_radius(raw: &str, row: usize) -> Result<f64, ForecastError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(ForecastError::malformed(
            "Uncertainty",
            Some(row),
            format!("'{raw}' is not a non-negative radius"),
        )),
    }
}

/// Blank categories mean the system is below category 1. Values that are
/// present but unreadable are kept as `None` rather than failing the parse.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_category(raw: &str, row: usize) -> Option<WindCategory> {
    if is_missing(raw) {
        return Some(WindCategory::L);
    }

    let parsed = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && (0.0..=5.0).contains(v))
        .and_then(|v| WindCategory::from_value(v as u8).ok());

    if parsed.is_none() {
        log::warn!("Row {row}: leaving unreadable category '{raw}' uncast");
    }

    parsed
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const LOLA: &str = include_str!("../fixtures/forecast_lola.csv");

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(
            "# header,baseTime=2024-02-10T06:00:00Z\n# Agency=FMS\n# CycloneName=TINO\n#\n#\n#\n\
             Time[fmt=yyyy-MM-dd'T'HH:mm:ss'Z'],Latitude,Longitude,Category,Uncertainty\n\
             ,deg,deg,,km\n",
        );
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn parses_fixture_preamble() {
        let track = parse_forecast_str(LOLA).unwrap();
        assert_eq!(track.cyclone_name(), "Lola");
        assert_eq!(
            track.base_time(),
            Utc.with_ymd_and_hms(2024, 2, 10, 6, 0, 0).unwrap()
        );
        assert_eq!(track.season().to_string(), "2023/2024");
        assert_eq!(track.identifier(), "Lola 2023/2024");
    }

    #[test]
    fn parses_fixture_points() {
        let track = parse_forecast_str(LOLA).unwrap();
        assert_eq!(track.points().len(), 13);

        let first = &track.points()[0];
        assert!((first.latitude - -13.0).abs() < f64::EPSILON);
        assert!((first.longitude - 170.5).abs() < f64::EPSILON);
        assert_eq!(first.category, Some(WindCategory::Two));
        assert_eq!(first.uncertainty_radius_km, Some(20.0));

        // Trailing rows have blank categories.
        assert_eq!(track.points()[12].category, Some(WindCategory::L));
    }

    #[test]
    fn lead_times_are_monotonic_hours() {
        let track = parse_forecast_str(LOLA).unwrap();
        let lead_times: Vec<i64> = track
            .points()
            .iter()
            .map(|p| track.lead_time_hours(p))
            .collect();
        assert_eq!(
            lead_times,
            vec![0, 6, 12, 18, 24, 36, 48, 60, 72, 84, 96, 108, 120]
        );
        assert!(lead_times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reads_from_decoded_stream() {
        let stream = crate::decode_forecast_text(&crate::encode_forecast_text(LOLA)).unwrap();
        let track = parse_forecast(stream).unwrap();
        assert_eq!(track.points().len(), 13);
    }

    #[test]
    fn missing_base_time_names_token() {
        let text = LOLA.replacen("baseTime=", "issued=", 1);
        match parse_forecast_str(&text).unwrap_err() {
            ForecastError::MalformedForecast { field, row, .. } => {
                assert_eq!(field, "baseTime=");
                assert_eq!(row, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_cyclone_name_is_malformed() {
        let text = LOLA.replacen("CycloneName=LOLA", "Storm=LOLA", 1);
        match parse_forecast_str(&text).unwrap_err() {
            ForecastError::MalformedForecast { field, .. } => assert_eq!(field, "CycloneName="),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn units_row_only_is_malformed() {
        let err = parse_forecast_str(&table(&[])).unwrap_err();
        assert!(err.to_string().contains("no data rows"), "{err}");
    }

    #[test]
    fn bad_latitude_reports_row() {
        let text = table(&[
            "2024-02-10T06:00:00Z,-13.0,170.5,2,20",
            "2024-02-10T12:00:00Z,south,170.0,2,35",
        ]);
        match parse_forecast_str(&text).unwrap_err() {
            ForecastError::MalformedForecast { field, row, .. } => {
                assert_eq!(field, "Latitude");
                assert_eq!(row, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tolerates_unreadable_category() {
        let text = table(&[
            "2024-02-10T06:00:00Z,-13.0,170.5,3.0,20",
            "2024-02-10T12:00:00Z,-13.6,170.0,TD,35",
            "2024-02-10T18:00:00Z,-14.2,169.6,,",
        ]);
        let track = parse_forecast_str(&text).unwrap();
        let categories: Vec<_> = track.points().iter().map(|p| p.category).collect();
        assert_eq!(
            categories,
            vec![Some(WindCategory::Three), None, Some(WindCategory::L)]
        );
        assert_eq!(track.points()[2].uncertainty_radius_km, None);
        assert_eq!(track.cyclone_name(), "Tino");
    }

    #[test]
    fn rejects_rows_out_of_order() {
        let text = table(&[
            "2024-02-10T12:00:00Z,-13.0,170.5,2,20",
            "2024-02-10T06:00:00Z,-13.6,170.0,2,35",
        ]);
        match parse_forecast_str(&text).unwrap_err() {
            ForecastError::MalformedForecast { row, .. } => assert_eq!(row, Some(1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_uncertainty() {
        let text = table(&["2024-02-10T06:00:00Z,-13.0,170.5,2,-5"]);
        assert!(matches!(
            parse_forecast_str(&text),
            Err(ForecastError::MalformedForecast { .. })
        ));
    }

    #[test]
    fn title_cases_multi_word_names() {
        assert_eq!(title_case("HAROLD"), "Harold");
        assert_eq!(title_case("  tc  yasa "), "Tc Yasa");
    }
}

//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! local_time_zone = "Pacific/Efate"
//! official_window_hours = 72
//! analysis_window_hours = 120
//! resample_interval_minutes = 15
//! ```

use std::path::Path;

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ReportError;

/// Zone used for the local date and time shown in reports.
pub const DEFAULT_LOCAL_TIME_ZONE: Tz = chrono_tz::Pacific::Efate;

/// Lead time covered by the official forecast and the uncertainty cone.
pub const DEFAULT_OFFICIAL_WINDOW_HOURS: i64 = 72;

/// Lead time considered when measuring distances to regions.
pub const DEFAULT_ANALYSIS_WINDOW_HOURS: i64 = 120;

/// Cadence the official window is resampled onto for the cone.
pub const DEFAULT_RESAMPLE_INTERVAL_MINUTES: i64 = 15;

/// Tunable parameters of an assessment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// IANA zone for the report's local date and time.
    pub local_time_zone: Tz,
    /// Maximum lead time, in hours, of the points used for the cone.
    pub official_window_hours: i64,
    /// Maximum lead time, in hours, of the points used for distances.
    pub analysis_window_hours: i64,
    /// Cone resampling cadence in minutes.
    pub resample_interval_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_time_zone: DEFAULT_LOCAL_TIME_ZONE,
            official_window_hours: DEFAULT_OFFICIAL_WINDOW_HOURS,
            analysis_window_hours: DEFAULT_ANALYSIS_WINDOW_HOURS,
            resample_interval_minutes: DEFAULT_RESAMPLE_INTERVAL_MINUTES,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the document cannot be parsed or
    /// fails [`Self::validate`].
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ReportError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ReportError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be read, or any error
    /// from [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Checks that every window and the interval are positive, that the
    /// interval is representable, and that the official window fits inside
    /// the analysis window.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.official_window_hours <= 0 {
            return Err(ReportError::config(format!(
                "official_window_hours must be positive, got {}",
                self.official_window_hours
            )));
        }
        if self.analysis_window_hours <= 0 {
            return Err(ReportError::config(format!(
                "analysis_window_hours must be positive, got {}",
                self.analysis_window_hours
            )));
        }
        if self.resample_interval_minutes <= 0 {
            return Err(ReportError::config(format!(
                "resample_interval_minutes must be positive, got {}",
                self.resample_interval_minutes
            )));
        }
        self.resample_interval()?;
        if self.official_window_hours > self.analysis_window_hours {
            return Err(ReportError::config(format!(
                "official_window_hours ({}) exceeds analysis_window_hours ({})",
                self.official_window_hours, self.analysis_window_hours
            )));
        }
        Ok(())
    }

    /// Cone resampling cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if the interval does not fit in a
    /// [`TimeDelta`].
    pub fn resample_interval(&self) -> Result<TimeDelta, ReportError> {
        TimeDelta::try_minutes(self.resample_interval_minutes).ok_or_else(|| {
            ReportError::config(format!(
                "resample_interval_minutes {} is out of range",
                self.resample_interval_minutes
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.local_time_zone, chrono_tz::Pacific::Efate);
        assert_eq!(config.resample_interval().unwrap(), TimeDelta::minutes(15));
    }

    #[test]
    fn overrides_individual_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
            local_time_zone = "Pacific/Fiji"
            official_window_hours = 48
            "#,
        )
        .unwrap();
        assert_eq!(config.local_time_zone, chrono_tz::Pacific::Fiji);
        assert_eq!(config.official_window_hours, 48);
        assert_eq!(config.analysis_window_hours, 120);
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = EngineConfig::from_toml_str(r#"local_time_zone = "Pacific/Nowhere""#)
            .unwrap_err();
        assert!(matches!(err, ReportError::Config { .. }), "{err}");
    }

    #[test]
    fn rejects_unknown_field() {
        assert!(EngineConfig::from_toml_str("official_window = 72").is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let err = EngineConfig::from_toml_str("resample_interval_minutes = 0").unwrap_err();
        assert!(err.to_string().contains("resample_interval_minutes"), "{err}");
    }

    #[test]
    fn rejects_interval_too_large_to_represent() {
        let toml = format!("resample_interval_minutes = {}", i64::MAX);
        let err = EngineConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");

        let config = EngineConfig {
            resample_interval_minutes: i64::MAX,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.resample_interval(),
            Err(ReportError::Config { .. })
        ));
    }

    #[test]
    fn rejects_official_window_beyond_analysis() {
        let err = EngineConfig::from_toml_str(
            "official_window_hours = 96\nanalysis_window_hours = 72",
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
    }
}

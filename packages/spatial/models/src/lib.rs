#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative region and distance result types.
//!
//! Regions follow the COD-AB boundary conventions: every feature carries an
//! `ADM{n}_PCODE` and `ADM{n}_EN` property, and level 2 features also carry
//! their level 1 parent. Distance results are plain rows that can be
//! written straight to CSV.

use cyclone_watch_forecast_models::WindCategory;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Administrative nesting level of a boundary set.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AdminLevel {
    /// Coarse level (provinces).
    Adm1,
    /// Fine level nested within [`AdminLevel::Adm1`] (islands, area councils).
    Adm2,
}

impl AdminLevel {
    /// Numeric level as used in COD-AB property names.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Adm1 => 1,
            Self::Adm2 => 2,
        }
    }

    /// Level containing this one, if any.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Adm1 => None,
            Self::Adm2 => Some(Self::Adm1),
        }
    }

    /// Property holding the region code, e.g. `ADM1_PCODE`.
    #[must_use]
    pub fn pcode_property(self) -> String {
        format!("ADM{}_PCODE", self.number())
    }

    /// Property holding the English region name, e.g. `ADM1_EN`.
    #[must_use]
    pub fn name_property(self) -> String {
        format!("ADM{}_EN", self.number())
    }
}

/// Distance from a forecast track to one administrative region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceRecord {
    /// Region code (`ADM{n}_PCODE`).
    pub region_id: String,
    /// Region name (`ADM{n}_EN`).
    pub region_name: String,
    /// Code of the containing region, for nested levels.
    pub parent_id: Option<String>,
    /// Name of the containing region, for nested levels.
    pub parent_name: Option<String>,
    /// Minimum distance from the track path to the region, rounded to the
    /// nearest kilometre. Zero when the path crosses the region.
    pub distance_km: u32,
    /// Uncertainty radius of the track point closest to the region, rounded
    /// to the nearest kilometre.
    pub uncertainty_km: Option<u32>,
    /// Wind category of the track point closest to the region.
    pub category: Option<WindCategory>,
    /// Lead time of the track point closest to the region.
    pub hours_to_closest: i64,
}

/// Distance records for every region of one administrative level, sorted by
/// ascending distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDistances {
    /// Level the records belong to.
    pub level: AdminLevel,
    /// One record per region.
    pub records: Vec<DistanceRecord>,
}

impl LevelDistances {
    /// The record with the smallest distance. Equal distances resolve to the
    /// smaller lead time, then to the earlier record.
    #[must_use]
    pub fn closest(&self) -> Option<&DistanceRecord> {
        self.records
            .iter()
            .min_by_key(|record| (record.distance_km, record.hours_to_closest))
    }
}

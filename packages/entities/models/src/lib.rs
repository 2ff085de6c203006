#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street light asset, supplier, maintenance, and enrichment record types.
//!
//! This crate defines the entities produced by one generation run and the
//! categorical vocabularies they draw from. String forms of every enum match
//! the column values expected by the `streetlights` database schema.

use chrono::{NaiveDate, NaiveDateTime};
use geo::{Point, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Operational status of a street light.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LightStatus {
    /// Working normally.
    Operational,
    /// Working but flagged for service.
    MaintenanceRequired,
    /// Not working.
    Faulty,
}

impl LightStatus {
    /// Target share of each status across a generated population.
    ///
    /// Individual lights draw independently, so realized counts only
    /// approximate these weights.
    #[must_use]
    pub const fn target_weight(self) -> f64 {
        match self {
            Self::Operational => 0.85,
            Self::MaintenanceRequired => 0.10,
            Self::Faulty => 0.05,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Operational, Self::MaintenanceRequired, Self::Faulty]
    }
}

/// Lamp wattage rating.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Wattage {
    /// 100 W fixture
    #[strum(serialize = "100")]
    W100,
    /// 150 W fixture
    #[strum(serialize = "150")]
    W150,
    /// 200 W fixture
    #[strum(serialize = "200")]
    W200,
}

impl Wattage {
    /// Returns the rating in watts.
    #[must_use]
    pub const fn watts(self) -> u16 {
        match self {
            Self::W100 => 100,
            Self::W150 => 150,
            Self::W200 => 200,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::W100, Self::W150, Self::W200]
    }
}

/// Lamp technology a supplier services.
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
pub enum Specialization {
    /// LED fixtures only
    #[serde(rename = "LED")]
    #[strum(serialize = "LED")]
    Led,
    /// High-pressure sodium vapor fixtures only
    #[serde(rename = "Sodium Vapor")]
    #[strum(serialize = "Sodium Vapor")]
    SodiumVapor,
    /// Any fixture type
    #[serde(rename = "All")]
    #[strum(serialize = "All")]
    All,
}

impl Specialization {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Led, Self::SodiumVapor, Self::All]
    }
}

/// Category of a reported maintenance issue.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueType {
    /// Lamp burnt out, flickering, or dim
    BulbFailure,
    /// Cabling, junction box, or connection faults
    Wiring,
    /// Structural damage to the pole or bracket
    PoleDamage,
    /// Upstream supply, voltage, or breaker problems
    PowerSupply,
    /// Photo, motion, or controller faults
    SensorFailure,
}

impl IssueType {
    /// Relative frequency of each issue type in generated history.
    ///
    /// Bulb failures dominate at half of all requests.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::BulbFailure => 50,
            Self::Wiring => 20,
            Self::PoleDamage | Self::PowerSupply | Self::SensorFailure => 10,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::BulbFailure,
            Self::Wiring,
            Self::PoleDamage,
            Self::PowerSupply,
            Self::SensorFailure,
        ]
    }
}

/// Season bucket used for risk bands and description templates.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Season {
    /// June through September
    Monsoon,
    /// March through May
    Summer,
    /// October through February
    Winter,
}

impl Season {
    /// Maps a calendar month (1-12) to its season bucket.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            6..=9 => Self::Monsoon,
            3..=5 => Self::Summer,
            _ => Self::Winter,
        }
    }

    /// Relative failure frequency used when seasonal weighting is enabled.
    #[must_use]
    pub const fn failure_weight(self) -> f64 {
        match self {
            Self::Monsoon => 3.0,
            Self::Summer => 2.0,
            Self::Winter => 1.0,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Monsoon, Self::Summer, Self::Winter]
    }
}

/// Density-based settlement classification of a neighborhood.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UrbanClassification {
    /// Dense core areas
    Urban,
    /// Mid-density residential areas
    Suburban,
    /// Sparse outskirts
    Rural,
}

impl UrbanClassification {
    /// Lower density bound (people per km²) for an urban classification.
    pub const URBAN_MIN_DENSITY: f64 = 12_000.0;

    /// Lower density bound (people per km²) for a suburban classification.
    pub const SUBURBAN_MIN_DENSITY: f64 = 5_000.0;

    /// Classifies a population density.
    #[must_use]
    pub fn from_density(people_per_sq_km: f64) -> Self {
        if people_per_sq_km >= Self::URBAN_MIN_DENSITY {
            Self::Urban
        } else if people_per_sq_km >= Self::SUBURBAN_MIN_DENSITY {
            Self::Suburban
        } else {
            Self::Rural
        }
    }
}

/// Power distribution zone feeding a light.
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
pub enum GridZone {
    A,
    B,
    C,
    D,
    E,
}

impl GridZone {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::C, Self::D, Self::E]
    }
}

/// A named polygonal district of the demo city.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    /// Unique identifier (e.g. `NBH-001`).
    pub id: String,
    /// Unique human-readable name.
    pub name: String,
    /// Resident count.
    pub population: u32,
    /// Closed, simple boundary ring in lon/lat coordinates.
    pub boundary: Polygon<f64>,
}

/// A single street light asset.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetLight {
    /// Unique identifier (e.g. `SL-0001`).
    pub id: String,
    /// Position in lon/lat coordinates.
    pub location: Point<f64>,
    /// Current operational status.
    pub status: LightStatus,
    /// Fixture rating.
    pub wattage: Wattage,
    /// Date the light was commissioned.
    pub installation_date: NaiveDate,
    /// Most recent service visit, never before installation.
    pub last_maintenance: NaiveDateTime,
    /// Neighborhood whose boundary contains `location`.
    pub neighborhood_id: String,
}

/// A maintenance contractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Supplier {
    /// Unique identifier (e.g. `SUP-001`).
    pub id: String,
    /// Fictitious company name.
    pub name: String,
    /// Fictional phone number.
    pub contact_phone: String,
    /// Address on a reserved example domain.
    pub contact_email: String,
    /// Depot position in lon/lat coordinates.
    pub location: Point<f64>,
    /// Maximum service distance.
    pub service_radius_km: f64,
    /// Mean time to reach a site.
    pub avg_response_hours: f64,
    /// Fixture technology serviced.
    pub specialization: Specialization,
}

/// A historical maintenance ticket against a light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceRequest {
    /// Unique identifier (e.g. `REQ-0001`).
    pub id: String,
    /// Light the issue was reported against.
    pub light_id: String,
    /// When the issue was reported.
    pub reported_at: NaiveDateTime,
    /// When the ticket was closed, `None` while open.
    pub resolved_at: Option<NaiveDateTime>,
    /// Issue category.
    pub issue_type: IssueType,
    /// Free-text report.
    pub description: String,
}

impl MaintenanceRequest {
    /// Season bucket implied by the report month.
    #[must_use]
    pub fn season(&self) -> Season {
        use chrono::Datelike as _;

        Season::from_month(self.reported_at.month())
    }

    /// Whether the ticket is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Seasonal weather exposure and failure risk for one light.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherEnrichment {
    pub light_id: String,
    pub season: Season,
    /// Mean temperature in °C.
    pub avg_temperature_c: f64,
    /// Seasonal rainfall in millimetres.
    pub rainfall_mm: f64,
    /// Failure risk in `[0, 1]`.
    pub failure_risk_score: f64,
    pub predicted_failure_date: NaiveDate,
}

/// Demographic context for one neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicsEnrichment {
    pub neighborhood_id: String,
    /// People per km².
    pub population_density: f64,
    pub urban_classification: UrbanClassification,
}

/// Power grid context for one light.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerGridEnrichment {
    pub light_id: String,
    pub grid_zone: GridZone,
    /// Mean feeder load as a percentage of capacity.
    pub avg_load_percent: f64,
    /// Number of recorded outages.
    pub outage_history_count: u32,
}

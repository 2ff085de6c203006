//! Generation profiles.
//!
//! A profile fixes record counts, the city region, an optional seed and
//! reference time, and per-generator knobs. Two profiles ship embedded in
//! the binary (`full` and `sample`); any other profile can be loaded from a
//! TOML file with the same shape.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use streetlights_spatial::BoundingRegion;

use crate::GenerateError;

/// Smallest population a neighborhood may be given.
pub const POPULATION_FLOOR: u32 = 50_000;

/// Largest population a neighborhood may be given.
pub const POPULATION_CEILING: u32 = 200_000;

/// Embedded profile definitions.
const PROFILE_TOMLS: &[(&str, &str)] = &[
    ("full", include_str!("../profiles/full.toml")),
    ("sample", include_str!("../profiles/sample.toml")),
];

/// Complete configuration for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Profile name, recorded in the manifest.
    pub name: String,
    /// Prefix prepended to every output file name (e.g. `sample_`).
    #[serde(default)]
    pub file_prefix: String,
    /// RNG seed. Without one the run draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// The run's notion of "now". Defaults to midnight UTC of the current
    /// day when unset.
    #[serde(default)]
    pub reference_time: Option<NaiveDateTime>,
    /// City bounding box.
    #[serde(default)]
    pub region: BoundingRegion,
    /// Records to generate per entity type.
    pub counts: Counts,
    #[serde(default)]
    pub neighborhoods: NeighborhoodSettings,
    #[serde(default)]
    pub street_lights: StreetLightSettings,
    #[serde(default)]
    pub maintenance: MaintenanceSettings,
}

/// Record counts per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Counts {
    pub neighborhoods: usize,
    pub street_lights: usize,
    pub suppliers: usize,
    pub maintenance_requests: usize,
}

/// Neighborhood polygon and population settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeighborhoodSettings {
    /// Distinct vertices per boundary ring.
    pub vertices: usize,
    pub population_min: u32,
    pub population_max: u32,
    /// Candidate rings tried per neighborhood before giving up.
    pub max_polygon_attempts: u32,
}

impl Default for NeighborhoodSettings {
    fn default() -> Self {
        Self {
            vertices: 8,
            population_min: POPULATION_FLOOR,
            population_max: POPULATION_CEILING,
            max_polygon_attempts: 25,
        }
    }
}

/// Street light placement and asset-date settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreetLightSettings {
    /// Rejection-sampling budget per light before the centroid fallback.
    pub max_point_retries: u32,
    /// Earliest installation date.
    pub installation_start: NaiveDate,
    /// Latest installation date (also capped at the reference date).
    pub installation_end: NaiveDate,
}

impl Default for StreetLightSettings {
    fn default() -> Self {
        Self {
            max_point_retries: 100,
            installation_start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            installation_end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
        }
    }
}

/// Maintenance history settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceSettings {
    /// Fraction of requests left open (no `resolved_at`).
    pub open_ratio: f64,
    /// Length of the trailing report window ending at the reference time.
    pub window_days: u32,
    /// Bias report dates toward monsoon (x3) and summer (x2) months.
    pub seasonal_weighting: bool,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            open_ratio: 0.05,
            window_days: 365,
            seasonal_weighting: false,
        }
    }
}

impl GeneratorConfig {
    /// Loads one of the embedded profiles by name.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] for an unknown name, or a TOML
    /// error if the embedded definition fails to parse.
    pub fn profile(name: &str) -> Result<Self, GenerateError> {
        let (_, toml_str) = PROFILE_TOMLS
            .iter()
            .find(|(id, _)| *id == name)
            .ok_or_else(|| {
                GenerateError::Config(format!(
                    "unknown profile '{name}' (available: {})",
                    profile_names().join(", ")
                ))
            })?;
        Ok(toml::from_str(toml_str)?)
    }

    /// Loads a profile from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or a TOML error if
    /// it does not match the profile schema.
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Rejects configurations that cannot produce a valid dataset.
    ///
    /// Called before any generation begins.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] describing the first problem.
    pub fn validate(&self) -> Result<(), GenerateError> {
        self.region
            .validate()
            .map_err(|e| GenerateError::Config(e.to_string()))?;

        let counts = [
            ("neighborhoods", self.counts.neighborhoods),
            ("street_lights", self.counts.street_lights),
            ("suppliers", self.counts.suppliers),
            ("maintenance_requests", self.counts.maintenance_requests),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, n)| *n == 0) {
            return Err(GenerateError::Config(format!(
                "counts.{name} must be greater than zero"
            )));
        }

        let nbhd = &self.neighborhoods;
        if nbhd.vertices < 3 {
            return Err(GenerateError::Config(format!(
                "neighborhoods.vertices must be at least 3, got {}",
                nbhd.vertices
            )));
        }
        if nbhd.population_min > nbhd.population_max
            || nbhd.population_min < POPULATION_FLOOR
            || nbhd.population_max > POPULATION_CEILING
        {
            return Err(GenerateError::Config(format!(
                "neighborhood population range {}..={} must lie within {POPULATION_FLOOR}..={POPULATION_CEILING}",
                nbhd.population_min, nbhd.population_max
            )));
        }
        if nbhd.max_polygon_attempts == 0 {
            return Err(GenerateError::Config(
                "neighborhoods.max_polygon_attempts must be greater than zero".to_string(),
            ));
        }

        let lights = &self.street_lights;
        if lights.installation_start > lights.installation_end {
            return Err(GenerateError::Config(format!(
                "street_lights.installation_start {} is after installation_end {}",
                lights.installation_start, lights.installation_end
            )));
        }
        if let Some(now) = self.reference_time {
            if lights.installation_start > now.date() {
                return Err(GenerateError::Config(format!(
                    "street_lights.installation_start {} is after the reference time {now}",
                    lights.installation_start
                )));
            }
        }

        let maint = &self.maintenance;
        if !(0.0..=1.0).contains(&maint.open_ratio) {
            return Err(GenerateError::Config(format!(
                "maintenance.open_ratio must be within [0, 1], got {}",
                maint.open_ratio
            )));
        }
        if maint.window_days == 0 {
            return Err(GenerateError::Config(
                "maintenance.window_days must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Names of the embedded profiles.
#[must_use]
pub fn profile_names() -> Vec<&'static str> {
    PROFILE_TOMLS.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_profiles_parse_and_validate() {
        for name in profile_names() {
            let config = GeneratorConfig::profile(name).unwrap();
            assert_eq!(config.name, name);
            config.validate().unwrap();
        }
    }

    #[test]
    fn sample_profile_is_small_and_prefixed() {
        let sample = GeneratorConfig::profile("sample").unwrap();
        let full = GeneratorConfig::profile("full").unwrap();
        assert_eq!(sample.file_prefix, "sample_");
        assert!(full.file_prefix.is_empty());
        assert!(sample.counts.street_lights < full.counts.street_lights);
        assert!(sample.counts.maintenance_requests < full.counts.maintenance_requests);
    }

    #[test]
    fn embedded_profiles_report_uniformly_over_the_window() {
        for name in profile_names() {
            let config = GeneratorConfig::profile(name).unwrap();
            assert!(!config.maintenance.seasonal_weighting, "{name}");
        }
    }

    #[test]
    fn unknown_profile_is_config_error() {
        assert!(matches!(
            GeneratorConfig::profile("huge"),
            Err(GenerateError::Config(_))
        ));
    }

    #[test]
    fn zero_count_fails_fast() {
        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.counts.street_lights = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("street_lights"), "{err}");
    }

    #[test]
    fn degenerate_region_fails_fast() {
        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.region.max_lat = config.region.min_lat;
        assert!(matches!(config.validate(), Err(GenerateError::Config(_))));
    }

    #[test]
    fn out_of_range_settings_fail_fast() {
        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.maintenance.open_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.neighborhoods.population_max = 500_000;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.neighborhoods.vertices = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_user_profile_with_defaults() {
        let config: GeneratorConfig = toml::from_str(
            r#"
            name = "custom"
            seed = 7
            reference_time = "2025-06-01T00:00:00"

            [counts]
            neighborhoods = 3
            street_lights = 30
            suppliers = 2
            maintenance_requests = 12

            [maintenance]
            open_ratio = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.region, BoundingRegion::default());
        assert_eq!(config.neighborhoods, NeighborhoodSettings::default());
        assert_eq!(config.maintenance.window_days, 365);
        assert!((config.maintenance.open_ratio - 0.2).abs() < f64::EPSILON);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<GeneratorConfig, _> = toml::from_str(
            r#"
            name = "typo"
            [counts]
            neighborhoods = 1
            street_lights = 1
            suppliers = 1
            maintenance_requests = 1
            lamps = 4
            "#,
        );
        assert!(result.is_err());
    }
}

//! Pipeline context threaded through every generation stage.

use chrono::{NaiveDateTime, Timelike as _, Utc};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use streetlights_entity_models::{
    DemographicsEnrichment, MaintenanceRequest, Neighborhood, PowerGridEnrichment, StreetLight,
    Supplier, WeatherEnrichment,
};

use crate::{GenerateError, GeneratorConfig, Stage};
use crate::{enrichment, maintenance, neighborhoods, street_lights, suppliers};

/// Configuration, randomness, and the entity sets produced so far in one run.
///
/// Stages only read the sets of upstream stages and replace their own.
pub struct PipelineContext {
    config: GeneratorConfig,
    reference_time: NaiveDateTime,
    rng: StdRng,
    pub neighborhoods: Vec<Neighborhood>,
    pub street_lights: Vec<StreetLight>,
    pub suppliers: Vec<Supplier>,
    pub maintenance_requests: Vec<MaintenanceRequest>,
    pub weather: Vec<WeatherEnrichment>,
    pub demographics: Vec<DemographicsEnrichment>,
    pub power_grid: Vec<PowerGridEnrichment>,
}

impl PipelineContext {
    /// Validates `config` and seeds the run's RNG.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] if the configuration is rejected.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        config.validate()?;

        let reference_time = config
            .reference_time
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(default_reference_time);

        let rng = match config.seed {
            Some(seed) => {
                log::info!("Seeding RNG with {seed}");
                StdRng::seed_from_u64(seed)
            }
            None => {
                log::info!("No seed configured, output will not be reproducible");
                StdRng::from_entropy()
            }
        };

        log::debug!("Reference time for this run: {reference_time}");

        Ok(Self {
            config,
            reference_time,
            rng,
            neighborhoods: Vec::new(),
            street_lights: Vec::new(),
            suppliers: Vec::new(),
            maintenance_requests: Vec::new(),
            weather: Vec::new(),
            demographics: Vec::new(),
            power_grid: Vec::new(),
        })
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The run's "now"; nothing generated lies after it.
    #[must_use]
    pub const fn reference_time(&self) -> NaiveDateTime {
        self.reference_time
    }

    /// Generates the neighborhood set.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-degenerate boundary cannot be produced.
    pub fn generate_neighborhoods(&mut self) -> Result<(), GenerateError> {
        self.neighborhoods = neighborhoods::generate(
            &mut self.rng,
            &self.config.region,
            &self.config.neighborhoods,
            self.config.counts.neighborhoods,
        )?;
        Ok(())
    }

    /// Generates street lights inside the current neighborhood set.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no neighborhoods or a light cannot be
    /// placed inside its neighborhood.
    pub fn generate_street_lights(&mut self) -> Result<(), GenerateError> {
        require(!self.neighborhoods.is_empty(), Stage::StreetLights, "neighborhoods")?;
        self.street_lights = street_lights::generate(
            &mut self.rng,
            &self.neighborhoods,
            &self.config.street_lights,
            self.config.counts.street_lights,
            self.reference_time,
        )?;
        Ok(())
    }

    /// Generates suppliers across the region.
    pub fn generate_suppliers(&mut self) {
        self.suppliers = suppliers::generate(
            &mut self.rng,
            &self.config.region,
            self.config.counts.suppliers,
        );
    }

    /// Generates maintenance history against the current light set.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no street lights.
    pub fn generate_maintenance(&mut self) -> Result<(), GenerateError> {
        require(!self.street_lights.is_empty(), Stage::Maintenance, "street lights")?;
        self.maintenance_requests = maintenance::generate(
            &mut self.rng,
            &self.street_lights,
            &self.config.maintenance,
            self.config.counts.maintenance_requests,
            self.reference_time,
        )?;
        Ok(())
    }

    /// Generates the weather, demographics, and power grid tables.
    ///
    /// # Errors
    ///
    /// Returns an error if either upstream set is empty.
    pub fn generate_enrichment(&mut self) -> Result<(), GenerateError> {
        require(!self.street_lights.is_empty(), Stage::Enrichment, "street lights")?;
        require(!self.neighborhoods.is_empty(), Stage::Enrichment, "neighborhoods")?;

        let today = self.reference_time.date();
        self.weather = enrichment::weather(&mut self.rng, &self.street_lights, today);
        self.demographics = enrichment::demographics(&mut self.rng, &self.neighborhoods);
        self.power_grid = enrichment::power_grid(&mut self.rng, &self.street_lights);
        Ok(())
    }
}

/// Midnight UTC of the current day.
///
/// Truncating to the day keeps seeded runs made on the same day identical.
fn default_reference_time() -> NaiveDateTime {
    let today = Utc::now().date_naive();
    today.and_time(chrono::NaiveTime::MIN)
}

fn require(present: bool, stage: Stage, what: &str) -> Result<(), GenerateError> {
    if present {
        Ok(())
    } else {
        Err(GenerateError::invariant(
            stage,
            format!("no {what} available to reference"),
        ))
    }
}

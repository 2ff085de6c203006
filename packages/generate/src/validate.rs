//! Whole-dataset invariant checks run before anything is written.
//!
//! Every check returns the first violation it finds as a
//! [`GenerateError::Invariant`] naming the table and record.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDateTime, NaiveTime};
use geo::{Area as _, Contains as _};
use streetlights_entity_models::{
    DemographicsEnrichment, MaintenanceRequest, Neighborhood, PowerGridEnrichment, Season,
    StreetLight, Supplier, UrbanClassification, WeatherEnrichment,
};
use streetlights_spatial::{BoundingRegion, is_simple};

use crate::config::{POPULATION_CEILING, POPULATION_FLOOR};
use crate::enrichment::risk_in_band;
use crate::{GenerateError, PipelineContext, Stage};

fn violation(table: &str, id: &str, message: impl std::fmt::Display) -> GenerateError {
    GenerateError::invariant(Stage::Validation, format!("{table} {id}: {message}"))
}

fn unique<'a>(
    table: &str,
    field: &str,
    values: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeSet<&'a str>, GenerateError> {
    let mut seen = BTreeSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(violation(table, value, format!("duplicate {field}")));
        }
    }
    Ok(seen)
}

/// Unique ids and names, population range, and boundary shape.
///
/// # Errors
///
/// Returns the first violation found.
pub fn neighborhoods(neighborhoods: &[Neighborhood]) -> Result<(), GenerateError> {
    const TABLE: &str = "neighborhoods";
    unique(TABLE, "neighborhood_id", neighborhoods.iter().map(|n| n.id.as_str()))?;
    unique(TABLE, "name", neighborhoods.iter().map(|n| n.name.as_str()))?;

    for n in neighborhoods {
        if !(POPULATION_FLOOR..=POPULATION_CEILING).contains(&n.population) {
            return Err(violation(TABLE, &n.id, format!("population {}", n.population)));
        }
        let ring = &n.boundary.exterior().0;
        if ring.len() < 4 || ring.first() != ring.last() {
            return Err(violation(TABLE, &n.id, "boundary ring is not closed"));
        }
        if !is_simple(&n.boundary) {
            return Err(violation(TABLE, &n.id, "boundary self-intersects"));
        }
        if n.boundary.unsigned_area() <= 0.0 {
            return Err(violation(TABLE, &n.id, "boundary has zero area"));
        }
    }
    Ok(())
}

/// Containment, neighborhood references, and asset dates.
///
/// # Errors
///
/// Returns the first violation found.
pub fn street_lights(
    lights: &[StreetLight],
    neighborhoods: &[Neighborhood],
    now: NaiveDateTime,
) -> Result<(), GenerateError> {
    const TABLE: &str = "street_lights";
    unique(TABLE, "light_id", lights.iter().map(|l| l.id.as_str()))?;

    let by_id: BTreeMap<&str, &Neighborhood> =
        neighborhoods.iter().map(|n| (n.id.as_str(), n)).collect();

    for light in lights {
        let Some(nbhd) = by_id.get(light.neighborhood_id.as_str()) else {
            return Err(violation(
                TABLE,
                &light.id,
                format!("unknown neighborhood {}", light.neighborhood_id),
            ));
        };
        if !nbhd.boundary.contains(&light.location) {
            return Err(violation(
                TABLE,
                &light.id,
                format!("location is outside {}", nbhd.id),
            ));
        }
        if light.installation_date > now.date() {
            return Err(violation(TABLE, &light.id, "installed in the future"));
        }
        if light.last_maintenance < light.installation_date.and_time(NaiveTime::MIN) {
            return Err(violation(TABLE, &light.id, "maintained before installation"));
        }
        if light.last_maintenance > now {
            return Err(violation(TABLE, &light.id, "maintained in the future"));
        }
    }
    Ok(())
}

/// Unique ids and names, numeric ranges, and depot placement.
///
/// # Errors
///
/// Returns the first violation found.
pub fn suppliers(suppliers: &[Supplier], region: &BoundingRegion) -> Result<(), GenerateError> {
    const TABLE: &str = "suppliers";
    unique(TABLE, "supplier_id", suppliers.iter().map(|s| s.id.as_str()))?;
    unique(TABLE, "name", suppliers.iter().map(|s| s.name.as_str()))?;

    for s in suppliers {
        if !(5.0..=15.0).contains(&s.service_radius_km) {
            return Err(violation(TABLE, &s.id, "service radius out of range"));
        }
        if !(2.0..=8.0).contains(&s.avg_response_hours) {
            return Err(violation(TABLE, &s.id, "response hours out of range"));
        }
        if !region.contains(s.location) {
            return Err(violation(TABLE, &s.id, "depot outside the region"));
        }
    }
    Ok(())
}

/// Light references and report/resolution ordering.
///
/// # Errors
///
/// Returns the first violation found.
pub fn maintenance(
    requests: &[MaintenanceRequest],
    lights: &[StreetLight],
    now: NaiveDateTime,
) -> Result<(), GenerateError> {
    const TABLE: &str = "maintenance_requests";
    unique(TABLE, "request_id", requests.iter().map(|r| r.id.as_str()))?;
    let light_ids: BTreeSet<&str> = lights.iter().map(|l| l.id.as_str()).collect();

    for r in requests {
        if !light_ids.contains(r.light_id.as_str()) {
            return Err(violation(TABLE, &r.id, format!("unknown light {}", r.light_id)));
        }
        if r.reported_at > now {
            return Err(violation(TABLE, &r.id, "reported in the future"));
        }
        if let Some(resolved) = r.resolved_at {
            if resolved < r.reported_at {
                return Err(violation(TABLE, &r.id, "resolved before it was reported"));
            }
            if resolved > now {
                return Err(violation(TABLE, &r.id, "resolved in the future"));
            }
        }
    }
    Ok(())
}

/// One row per light and season, risk bands, and references.
///
/// # Errors
///
/// Returns the first violation found.
pub fn weather(rows: &[WeatherEnrichment], lights: &[StreetLight]) -> Result<(), GenerateError> {
    const TABLE: &str = "weather_enrichment";
    let mut seasons: BTreeMap<&str, BTreeSet<Season>> =
        lights.iter().map(|l| (l.id.as_str(), BTreeSet::new())).collect();

    for row in rows {
        let Some(seen) = seasons.get_mut(row.light_id.as_str()) else {
            return Err(violation(TABLE, &row.light_id, "unknown light"));
        };
        if !seen.insert(row.season) {
            return Err(violation(
                TABLE,
                &row.light_id,
                format!("duplicate {} row", row.season),
            ));
        }
        if !risk_in_band(row.season, row.failure_risk_score) {
            return Err(violation(
                TABLE,
                &row.light_id,
                format!(
                    "{} risk {} outside its band",
                    row.season, row.failure_risk_score
                ),
            ));
        }
    }

    if let Some((id, _)) = seasons
        .iter()
        .find(|(_, seen)| seen.len() != Season::all().len())
    {
        return Err(violation(TABLE, id, "missing seasonal rows"));
    }
    Ok(())
}

/// One row per neighborhood with a consistent classification.
///
/// # Errors
///
/// Returns the first violation found.
pub fn demographics(
    rows: &[DemographicsEnrichment],
    neighborhoods: &[Neighborhood],
) -> Result<(), GenerateError> {
    const TABLE: &str = "demographics_enrichment";
    let covered = unique(TABLE, "neighborhood_id", rows.iter().map(|r| r.neighborhood_id.as_str()))?;
    let expected: BTreeSet<&str> = neighborhoods.iter().map(|n| n.id.as_str()).collect();
    if let Some(id) = expected.symmetric_difference(&covered).next() {
        return Err(violation(TABLE, id, "row count does not match neighborhoods"));
    }

    for row in rows {
        if !(1_000.0..=20_000.0).contains(&row.population_density) {
            return Err(violation(TABLE, &row.neighborhood_id, "density out of range"));
        }
        if row.urban_classification != UrbanClassification::from_density(row.population_density) {
            return Err(violation(
                TABLE,
                &row.neighborhood_id,
                "classification disagrees with density",
            ));
        }
    }
    Ok(())
}

/// One row per light with load and outage ranges.
///
/// # Errors
///
/// Returns the first violation found.
pub fn power_grid(rows: &[PowerGridEnrichment], lights: &[StreetLight]) -> Result<(), GenerateError> {
    const TABLE: &str = "power_grid_enrichment";
    let covered = unique(TABLE, "light_id", rows.iter().map(|r| r.light_id.as_str()))?;
    let expected: BTreeSet<&str> = lights.iter().map(|l| l.id.as_str()).collect();
    if let Some(id) = expected.symmetric_difference(&covered).next() {
        return Err(violation(TABLE, id, "row count does not match street lights"));
    }

    for row in rows {
        if !(60.0..=95.0).contains(&row.avg_load_percent) {
            return Err(violation(TABLE, &row.light_id, "load out of range"));
        }
        if row.outage_history_count > 5 {
            return Err(violation(TABLE, &row.light_id, "outage count out of range"));
        }
    }
    Ok(())
}

/// Runs every check over the sets held by `ctx`.
///
/// Tables that were not generated in this run (empty sets) are skipped.
///
/// # Errors
///
/// Returns the first violation found.
pub fn dataset(ctx: &PipelineContext) -> Result<(), GenerateError> {
    let now = ctx.reference_time();
    neighborhoods(&ctx.neighborhoods)?;
    street_lights(&ctx.street_lights, &ctx.neighborhoods, now)?;
    suppliers(&ctx.suppliers, &ctx.config().region)?;
    maintenance(&ctx.maintenance_requests, &ctx.street_lights, now)?;
    if !ctx.weather.is_empty() {
        weather(&ctx.weather, &ctx.street_lights)?;
    }
    if !ctx.demographics.is_empty() {
        demographics(&ctx.demographics, &ctx.neighborhoods)?;
    }
    if !ctx.power_grid.is_empty() {
        power_grid(&ctx.power_grid, &ctx.street_lights)?;
    }
    log::info!("Dataset passed validation");
    Ok(())
}

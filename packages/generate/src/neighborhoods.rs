//! Neighborhood generator.
//!
//! Lays the region out as a grid with one cell per neighborhood and draws a
//! star-shaped boundary inside each cell, so boundaries never overlap.
//! Cells are shuffled first so neighborhood ids do not follow a visible
//! row-major sweep across the map.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom as _;
use streetlights_entity_models::Neighborhood;
use streetlights_spatial::{BoundingRegion, sample_star_polygon};

use crate::config::NeighborhoodSettings;
use crate::{GenerateError, Stage};

/// Locality names used as the base of every neighborhood name.
const BASE_NAMES: &[&str] = &[
    "Koramangala",
    "Indiranagar",
    "Whitefield",
    "Jayanagar",
    "Malleshwaram",
    "HSR Layout",
    "Electronic City",
    "Hebbal",
    "Yelahanka",
    "BTM Layout",
    "Banashankari",
    "Rajajinagar",
    "Marathahalli",
    "JP Nagar",
    "Basavanagudi",
    "Sadashivanagar",
    "Frazer Town",
    "Ulsoor",
    "Bellandur",
    "Sarjapur",
    "Vijayanagar",
    "RT Nagar",
    "Domlur",
    "Kengeri",
];

/// Returns the `index`-th unique neighborhood name.
///
/// The first pass uses the base names as-is; later passes append
/// `Phase 2`, `Phase 3`, and so on.
#[must_use]
pub fn neighborhood_name(index: usize) -> String {
    let base = BASE_NAMES[index % BASE_NAMES.len()];
    match index / BASE_NAMES.len() {
        0 => base.to_string(),
        round => format!("{base} Phase {}", round + 1),
    }
}

/// Formats a neighborhood id such as `NBH-007`.
#[must_use]
pub fn neighborhood_id(index: usize) -> String {
    format!("NBH-{:03}", index + 1)
}

/// Generates `count` neighborhoods inside `region`.
///
/// # Errors
///
/// Returns [`GenerateError::Spatial`] if a cell cannot produce a simple,
/// non-zero-area boundary within the attempt budget, or
/// [`GenerateError::Invariant`] if a name collision slips through.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    region: &BoundingRegion,
    settings: &NeighborhoodSettings,
    count: usize,
) -> Result<Vec<Neighborhood>, GenerateError> {
    let mut cells = region.grid_cells(count);
    cells.shuffle(rng);

    let mut names = BTreeSet::new();
    let mut neighborhoods = Vec::with_capacity(count);

    for (i, cell) in cells.iter().enumerate() {
        let boundary = sample_star_polygon(
            rng,
            cell,
            settings.vertices,
            settings.max_polygon_attempts,
        )
        .map_err(|source| GenerateError::Spatial {
            stage: Stage::Neighborhoods,
            source,
        })?;

        let name = neighborhood_name(i);
        if !names.insert(name.clone()) {
            return Err(GenerateError::invariant(
                Stage::Neighborhoods,
                format!("duplicate neighborhood name '{name}'"),
            ));
        }

        neighborhoods.push(Neighborhood {
            id: neighborhood_id(i),
            name,
            population: rng.gen_range(settings.population_min..=settings.population_max),
            boundary,
        });
    }

    log::info!("Generated {} neighborhoods", neighborhoods.len());
    Ok(neighborhoods)
}

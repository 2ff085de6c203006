//! Street light generator.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::seq::SliceRandom as _;
use streetlights_entity_models::{LightStatus, Neighborhood, StreetLight, Wattage};
use streetlights_spatial::sample_point_in_polygon;

use crate::config::StreetLightSettings;
use crate::{GenerateError, Stage};

/// Formats a street light id such as `SL-0042`.
#[must_use]
pub fn light_id(index: usize) -> String {
    format!("SL-{:04}", index + 1)
}

/// Generates `count` street lights, each inside a randomly chosen
/// neighborhood.
///
/// Positions come from bounded rejection sampling with a centroid fallback.
/// Status is an independent weighted draw per light, so realized shares
/// only approximate [`LightStatus::target_weight`]. Some neighborhoods may
/// receive no lights at all.
///
/// # Errors
///
/// Returns [`GenerateError::Spatial`] if a light cannot be placed inside
/// its neighborhood even with the fallback, or [`GenerateError::Invariant`]
/// if `neighborhoods` is empty.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    neighborhoods: &[Neighborhood],
    settings: &StreetLightSettings,
    count: usize,
    now: NaiveDateTime,
) -> Result<Vec<StreetLight>, GenerateError> {
    let status_weights = LightStatus::all().iter().map(|s| s.target_weight());
    let status_dist = WeightedIndex::new(status_weights)
        .map_err(|e| GenerateError::invariant(Stage::StreetLights, e.to_string()))?;

    let install_end = settings.installation_end.min(now.date());
    let mut lights = Vec::with_capacity(count);
    let mut fallbacks = 0usize;

    for i in 0..count {
        let id = light_id(i);
        let neighborhood = neighborhoods.choose(rng).ok_or_else(|| {
            GenerateError::invariant(Stage::StreetLights, "no neighborhoods to place lights in")
        })?;

        let sample = sample_point_in_polygon(rng, &neighborhood.boundary, settings.max_point_retries)
            .map_err(|source| GenerateError::Spatial {
                stage: Stage::StreetLights,
                source,
            })?;
        if sample.used_fallback {
            fallbacks += 1;
            log::warn!(
                "{id}: no interior sample in {} after {} retries, using centroid",
                neighborhood.id,
                settings.max_point_retries
            );
        }

        let installation_date = sample_date(rng, settings.installation_start, install_end);
        let last_maintenance = sample_timestamp_between(
            rng,
            installation_date.and_time(NaiveTime::MIN),
            now,
        );

        lights.push(StreetLight {
            id,
            location: sample.point,
            status: LightStatus::all()[status_dist.sample(rng)],
            wattage: *Wattage::all().choose(rng).unwrap_or(&Wattage::W150),
            installation_date,
            last_maintenance,
            neighborhood_id: neighborhood.id.clone(),
        });
    }

    if fallbacks > 0 {
        log::warn!("{fallbacks} street lights placed at neighborhood centroids");
    }
    log::info!("Generated {} street lights", lights.len());
    Ok(lights)
}

/// Uniform calendar date in `[start, end]`; returns `start` if the range is
/// empty.
pub fn sample_date<R: Rng + ?Sized>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let span = (end - start).num_days();
    if span <= 0 {
        return start;
    }
    start + Duration::days(rng.gen_range(0..=span))
}

/// Uniform whole-second timestamp in `[start, end]`; returns `start` if
/// the range is empty.
pub fn sample_timestamp_between<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> NaiveDateTime {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return start;
    }
    start + Duration::seconds(rng.gen_range(0..=span))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::Contains as _;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;
    use streetlights_spatial::BoundingRegion;

    use super::*;
    use crate::config::NeighborhoodSettings;
    use crate::neighborhoods;

    fn reference_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn setup(nbhd_count: usize, light_count: usize, seed: u64) -> (Vec<Neighborhood>, Vec<StreetLight>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let nbhds = neighborhoods::generate(
            &mut rng,
            &BoundingRegion::default(),
            &NeighborhoodSettings::default(),
            nbhd_count,
        )
        .unwrap();
        let lights = generate(
            &mut rng,
            &nbhds,
            &StreetLightSettings::default(),
            light_count,
            reference_time(),
        )
        .unwrap();
        (nbhds, lights)
    }

    #[test]
    fn every_light_is_inside_its_neighborhood() {
        let (nbhds, lights) = setup(5, 50, 42);
        assert_eq!(lights.len(), 50);
        for light in &lights {
            let nbhd = nbhds
                .iter()
                .find(|n| n.id == light.neighborhood_id)
                .expect("light references a generated neighborhood");
            assert!(
                nbhd.boundary.contains(&light.location),
                "{} at {:?} is outside {}",
                light.id,
                light.location,
                nbhd.id
            );
        }
    }

    #[test]
    fn dates_are_ordered_and_not_in_the_future() {
        let (_, lights) = setup(5, 200, 7);
        let now = reference_time();
        for light in &lights {
            assert!(light.installation_date <= now.date());
            assert!(light.installation_date >= StreetLightSettings::default().installation_start);
            assert!(light.last_maintenance >= light.installation_date.and_time(NaiveTime::MIN));
            assert!(light.last_maintenance <= now);
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn status_distribution_tracks_targets() {
        let (_, lights) = setup(8, 4_000, 2024);
        let mut counts: BTreeMap<LightStatus, usize> = BTreeMap::new();
        for light in &lights {
            *counts.entry(light.status).or_default() += 1;
        }

        for status in LightStatus::all() {
            let share = *counts.get(status).unwrap_or(&0) as f64 / lights.len() as f64;
            assert!(
                (share - status.target_weight()).abs() <= 0.05,
                "{status} share {share:.3} too far from {}",
                status.target_weight()
            );
        }
    }

    #[test]
    fn all_wattages_appear() {
        let (_, lights) = setup(3, 300, 1);
        for w in Wattage::all() {
            assert!(lights.iter().any(|l| l.wattage == *w), "missing {w}");
        }
    }

    #[test]
    fn installation_range_is_capped_at_reference_date() {
        let mut rng = StdRng::seed_from_u64(3);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let cap = reference_time().date();
        for _ in 0..500 {
            let d = sample_date(&mut rng, start, end.min(cap));
            assert!(d >= start && d <= cap);
        }
        assert_eq!(sample_date(&mut rng, cap, start), cap);
    }
}

//! Enrichment tables derived from the light and neighborhood sets.
//!
//! Weather exposure and failure risk per light and season, demographics per
//! neighborhood, and power grid context per light.

use std::ops::Range;

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom as _;
use streetlights_entity_models::{
    DemographicsEnrichment, GridZone, Neighborhood, PowerGridEnrichment, Season, StreetLight,
    UrbanClassification, WeatherEnrichment,
};

/// Horizon for a brand-new light with zero risk.
const FAILURE_HORIZON_DAYS: f64 = 730.0;

/// Age at which a light reaches the minimum age factor.
const SERVICE_LIFE_YEARS: f64 = 20.0;

const MIN_AGE_FACTOR: f64 = 0.25;

/// Seasonal climate and risk ranges.
struct SeasonProfile {
    temperature_c: Range<f64>,
    rainfall_mm: Range<f64>,
    /// Inclusive upper bound only for monsoon.
    risk: (f64, f64, bool),
}

const fn season_profile(season: Season) -> SeasonProfile {
    match season {
        Season::Monsoon => SeasonProfile {
            temperature_c: 22.0..28.0,
            rainfall_mm: 150.0..300.0,
            risk: (0.60, 0.95, true),
        },
        Season::Summer => SeasonProfile {
            temperature_c: 28.0..38.0,
            rainfall_mm: 20.0..80.0,
            risk: (0.35, 0.60, false),
        },
        Season::Winter => SeasonProfile {
            temperature_c: 15.0..25.0,
            rainfall_mm: 0.0..20.0,
            risk: (0.05, 0.35, false),
        },
    }
}

/// Returns the allowed risk band for `season` as `(low, high, high_inclusive)`.
#[must_use]
pub const fn risk_band(season: Season) -> (f64, f64, bool) {
    season_profile(season).risk
}

/// Whether `risk` lies inside the band for `season`.
#[must_use]
pub fn risk_in_band(season: Season, risk: f64) -> bool {
    let (low, high, inclusive) = risk_band(season);
    risk >= low && if inclusive { risk <= high } else { risk < high }
}

/// Produces one row per light per season.
pub fn weather<R: Rng + ?Sized>(
    rng: &mut R,
    lights: &[StreetLight],
    today: NaiveDate,
) -> Vec<WeatherEnrichment> {
    let mut rows = Vec::with_capacity(lights.len() * Season::all().len());

    for light in lights {
        for season in Season::all() {
            let profile = season_profile(*season);
            let (low, high, inclusive) = profile.risk;
            let raw = if inclusive {
                rng.gen_range(low..=high)
            } else {
                rng.gen_range(low..high)
            };
            let failure_risk_score = floor_to(raw, 4);

            rows.push(WeatherEnrichment {
                light_id: light.id.clone(),
                season: *season,
                avg_temperature_c: floor_to(rng.gen_range(profile.temperature_c.clone()), 1),
                rainfall_mm: floor_to(rng.gen_range(profile.rainfall_mm.clone()), 1),
                failure_risk_score,
                predicted_failure_date: predicted_failure_date(
                    today,
                    failure_risk_score,
                    light.installation_date,
                ),
            });
        }
    }

    log::info!("Generated {} weather enrichment rows", rows.len());
    rows
}

/// Estimated failure date for a light.
///
/// `today + max(1, round(730 * (1 - risk) * age_factor))` days, where the
/// age factor falls linearly from 1 for a new light to 0.25 at 15 years and
/// beyond. Higher risk or an older light gives an earlier date.
#[must_use]
pub fn predicted_failure_date(today: NaiveDate, risk: f64, installed: NaiveDate) -> NaiveDate {
    #[allow(clippy::cast_precision_loss)]
    let age_years = (today - installed).num_days().max(0) as f64 / 365.25;
    let age_factor = (1.0 - age_years / SERVICE_LIFE_YEARS).clamp(MIN_AGE_FACTOR, 1.0);

    #[allow(clippy::cast_possible_truncation)]
    let days = (FAILURE_HORIZON_DAYS * (1.0 - risk.clamp(0.0, 1.0)) * age_factor).round() as i64;

    today + Duration::days(days.max(1))
}

/// Produces one row per neighborhood.
pub fn demographics<R: Rng + ?Sized>(
    rng: &mut R,
    neighborhoods: &[Neighborhood],
) -> Vec<DemographicsEnrichment> {
    let rows: Vec<_> = neighborhoods
        .iter()
        .map(|n| {
            let population_density = floor_to(rng.gen_range(1_000.0..=20_000.0), 2);
            DemographicsEnrichment {
                neighborhood_id: n.id.clone(),
                population_density,
                urban_classification: UrbanClassification::from_density(population_density),
            }
        })
        .collect();

    log::info!("Generated {} demographics enrichment rows", rows.len());
    rows
}

/// Produces one row per light.
pub fn power_grid<R: Rng + ?Sized>(
    rng: &mut R,
    lights: &[StreetLight],
) -> Vec<PowerGridEnrichment> {
    let rows: Vec<_> = lights
        .iter()
        .map(|light| PowerGridEnrichment {
            light_id: light.id.clone(),
            grid_zone: *GridZone::all().choose(rng).unwrap_or(&GridZone::A),
            avg_load_percent: floor_to(rng.gen_range(60.0..=95.0), 2),
            outage_history_count: rng.gen_range(0..=5),
        })
        .collect();

    log::info!("Generated {} power grid enrichment rows", rows.len());
    rows
}

/// Truncates toward negative infinity at `decimals` places, which keeps
/// half-open upper bounds exclusive.
fn floor_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).floor() / scale
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::{Point, polygon};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;
    use streetlights_entity_models::{LightStatus, Wattage};

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn lights(n: usize) -> Vec<StreetLight> {
        (0..n)
            .map(|i| StreetLight {
                id: format!("SL-{:04}", i + 1),
                location: Point::new(77.6, 12.97),
                status: LightStatus::Operational,
                wattage: Wattage::W100,
                installation_date: NaiveDate::from_ymd_opt(2016 + i32::try_from(i % 8).unwrap(), 3, 1).unwrap(),
                last_maintenance: today().and_hms_opt(0, 0, 0).unwrap(),
                neighborhood_id: "NBH-001".to_string(),
            })
            .collect()
    }

    #[test]
    fn three_weather_rows_per_light_within_bands() {
        let mut rng = StdRng::seed_from_u64(21);
        let lights = lights(40);
        let rows = weather(&mut rng, &lights, today());
        assert_eq!(rows.len(), 120);

        let mut per_light: BTreeMap<&str, Vec<Season>> = BTreeMap::new();
        for row in &rows {
            per_light.entry(&row.light_id).or_default().push(row.season);
            assert!(
                risk_in_band(row.season, row.failure_risk_score),
                "{} {} risk {}",
                row.light_id,
                row.season,
                row.failure_risk_score
            );
            assert!(row.predicted_failure_date > today());
            assert!(row.rainfall_mm >= 0.0);
        }
        assert_eq!(per_light.len(), 40);
        for seasons in per_light.values() {
            assert_eq!(seasons, &Season::all().to_vec());
        }
    }

    #[test]
    fn predicted_date_moves_earlier_with_risk_and_age() {
        let new_light = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let old_light = NaiveDate::from_ymd_opt(2010, 6, 15).unwrap();

        let low = predicted_failure_date(today(), 0.1, new_light);
        let high = predicted_failure_date(today(), 0.9, new_light);
        assert!(high < low);

        let old = predicted_failure_date(today(), 0.5, old_light);
        let new = predicted_failure_date(today(), 0.5, new_light);
        assert!(old < new);

        assert_eq!(
            predicted_failure_date(today(), 1.0, old_light),
            today() + Duration::days(1)
        );
    }

    #[test]
    fn demographics_classification_matches_density() {
        let mut rng = StdRng::seed_from_u64(4);
        let nbhds: Vec<Neighborhood> = (0..30)
            .map(|i| Neighborhood {
                id: format!("NBH-{:03}", i + 1),
                name: format!("N{i}"),
                population: 60_000,
                boundary: polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)],
            })
            .collect();
        let rows = demographics(&mut rng, &nbhds);
        assert_eq!(rows.len(), 30);
        for row in rows {
            assert!((1_000.0..=20_000.0).contains(&row.population_density));
            assert_eq!(
                row.urban_classification,
                UrbanClassification::from_density(row.population_density)
            );
        }
    }

    #[test]
    fn power_grid_rows_in_range() {
        let mut rng = StdRng::seed_from_u64(6);
        let rows = power_grid(&mut rng, &lights(100));
        assert_eq!(rows.len(), 100);
        for row in rows {
            assert!((60.0..=95.0).contains(&row.avg_load_percent));
            assert!(row.outage_history_count <= 5);
        }
    }
}

//! Maintenance history generator.

use chrono::{Datelike as _, Duration, NaiveDateTime};
use rand::Rng;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::seq::SliceRandom as _;
use streetlights_entity_models::{IssueType, MaintenanceRequest, Season, StreetLight};

use crate::config::MaintenanceSettings;
use crate::{GenerateError, Stage, templates};

/// Relative weights of a 1..=7 day resolution time.
const RESOLUTION_DAY_WEIGHTS: [u32; 7] = [10, 20, 30, 20, 10, 5, 5];

/// Draws per request before seasonal acceptance takes the last candidate.
const MAX_SEASONAL_DRAWS: u32 = 32;

/// Formats a request id such as `REQ-0012`.
#[must_use]
pub fn request_id(index: usize) -> String {
    format!("REQ-{:04}", index + 1)
}

/// Generates `count` maintenance requests against `lights`.
///
/// Report times fall in the trailing `window_days` before `now`. Requests
/// are sorted by report time before ids are assigned, so `REQ-0001` is the
/// oldest ticket.
///
/// # Errors
///
/// Returns [`GenerateError::Invariant`] if `lights` is empty or the
/// issue weights are unusable.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    lights: &[StreetLight],
    settings: &MaintenanceSettings,
    count: usize,
    now: NaiveDateTime,
) -> Result<Vec<MaintenanceRequest>, GenerateError> {
    if lights.is_empty() {
        return Err(GenerateError::invariant(
            Stage::Maintenance,
            "no street lights to report against",
        ));
    }

    let issue_dist = WeightedIndex::new(IssueType::all().iter().map(|t| t.weight()))
        .map_err(|e| GenerateError::invariant(Stage::Maintenance, e.to_string()))?;
    let days_dist = WeightedIndex::new(RESOLUTION_DAY_WEIGHTS)
        .map_err(|e| GenerateError::invariant(Stage::Maintenance, e.to_string()))?;

    let window_start = now - Duration::days(i64::from(settings.window_days));
    let window_secs = (now - window_start).num_seconds();

    let mut reported: Vec<NaiveDateTime> = (0..count)
        .map(|_| sample_reported_at(rng, window_start, window_secs, settings.seasonal_weighting))
        .collect();
    reported.sort_unstable();

    let mut requests = Vec::with_capacity(count);
    for (i, reported_at) in reported.into_iter().enumerate() {
        let light = lights.choose(rng).ok_or_else(|| {
            GenerateError::invariant(Stage::Maintenance, "no street lights to report against")
        })?;
        let issue_type = IssueType::all()[issue_dist.sample(rng)];
        let season = Season::from_month(reported_at.month());
        let description = templates::describe(rng, issue_type, season);

        let resolved_at = if rng.gen_bool(settings.open_ratio) {
            None
        } else {
            let days = i64::try_from(days_dist.sample(rng) + 1).unwrap_or(1);
            let hours = rng.gen_range(1..=8);
            let resolved = reported_at + Duration::days(days) + Duration::hours(hours);
            Some(if resolved <= now {
                resolved
            } else {
                resolve_before(rng, reported_at, now)
            })
        };

        requests.push(MaintenanceRequest {
            id: request_id(i),
            light_id: light.id.clone(),
            reported_at,
            resolved_at,
            issue_type,
            description,
        });
    }

    let open = requests.iter().filter(|r| r.is_open()).count();
    log::info!(
        "Generated {} maintenance requests ({open} open)",
        requests.len()
    );
    Ok(requests)
}

/// Draws a resolution time in `(reported_at, now]` for tickets reported too
/// recently for the usual 1..=7 day delay to fit.
fn resolve_before<R: Rng + ?Sized>(
    rng: &mut R,
    reported_at: NaiveDateTime,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let available = (now - reported_at).num_seconds();
    if available < 1 {
        return reported_at;
    }
    reported_at + Duration::seconds(rng.gen_range(1..=available))
}

/// Draws a report time in `[start, start + window_secs)`.
///
/// With seasonal weighting each candidate is accepted with probability
/// proportional to its season's failure weight; after
/// [`MAX_SEASONAL_DRAWS`] rejections the last candidate is kept.
fn sample_reported_at<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDateTime,
    window_secs: i64,
    seasonal_weighting: bool,
) -> NaiveDateTime {
    let max_weight = Season::Monsoon.failure_weight();
    let mut candidate = start;

    for _ in 0..MAX_SEASONAL_DRAWS {
        candidate = start + Duration::seconds(rng.gen_range(0..window_secs.max(1)));
        if !seasonal_weighting {
            break;
        }
        let weight = Season::from_month(candidate.month()).failure_weight();
        if rng.gen_bool(weight / max_weight) {
            break;
        }
    }

    candidate
}

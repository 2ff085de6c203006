//! End-of-run statistics.

use std::collections::BTreeMap;

use streetlights_entity_models::{IssueType, LightStatus, Season};

use crate::PipelineContext;

/// Counts and distributions of one generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub neighborhoods: usize,
    pub street_lights: usize,
    pub suppliers: usize,
    pub maintenance_requests: usize,
    pub weather_rows: usize,
    pub demographics_rows: usize,
    pub power_grid_rows: usize,
    pub status_counts: BTreeMap<LightStatus, usize>,
    pub open_requests: usize,
    pub requests_by_season: BTreeMap<Season, usize>,
    pub requests_by_issue: BTreeMap<IssueType, usize>,
    /// Neighborhoods that ended up with no lights.
    pub empty_neighborhoods: usize,
}

impl RunSummary {
    /// Tallies the sets currently held by `ctx`.
    #[must_use]
    pub fn from_context(ctx: &PipelineContext) -> Self {
        let mut summary = Self {
            neighborhoods: ctx.neighborhoods.len(),
            street_lights: ctx.street_lights.len(),
            suppliers: ctx.suppliers.len(),
            maintenance_requests: ctx.maintenance_requests.len(),
            weather_rows: ctx.weather.len(),
            demographics_rows: ctx.demographics.len(),
            power_grid_rows: ctx.power_grid.len(),
            ..Self::default()
        };

        for light in &ctx.street_lights {
            *summary.status_counts.entry(light.status).or_default() += 1;
        }
        for request in &ctx.maintenance_requests {
            if request.is_open() {
                summary.open_requests += 1;
            }
            *summary.requests_by_season.entry(request.season()).or_default() += 1;
            *summary
                .requests_by_issue
                .entry(request.issue_type)
                .or_default() += 1;
        }
        summary.empty_neighborhoods = ctx
            .neighborhoods
            .iter()
            .filter(|n| !ctx.street_lights.iter().any(|l| l.neighborhood_id == n.id))
            .count();

        summary
    }

    /// Requests with a resolution timestamp.
    #[must_use]
    pub const fn resolved_requests(&self) -> usize {
        self.maintenance_requests - self.open_requests
    }

    /// Writes the summary to the log at info level.
    pub fn log(&self) {
        log::info!("=== Generation summary ===");
        log::info!("  neighborhoods:         {}", self.neighborhoods);
        log::info!("  street lights:         {}", self.street_lights);
        log::info!("  suppliers:             {}", self.suppliers);
        log::info!("  maintenance requests:  {}", self.maintenance_requests);
        log::info!("  weather rows:          {}", self.weather_rows);
        log::info!("  demographics rows:     {}", self.demographics_rows);
        log::info!("  power grid rows:       {}", self.power_grid_rows);

        if self.street_lights > 0 {
            for (status, count) in &self.status_counts {
                #[allow(clippy::cast_precision_loss)]
                let pct = *count as f64 * 100.0 / self.street_lights as f64;
                log::info!("  {status:<22} {count:>6} ({pct:.1}%)");
            }
        }
        if self.empty_neighborhoods > 0 {
            log::info!(
                "  {} neighborhoods have no street lights",
                self.empty_neighborhoods
            );
        }

        if self.maintenance_requests > 0 {
            log::info!(
                "  requests open/resolved: {}/{}",
                self.open_requests,
                self.resolved_requests()
            );
            for (season, count) in &self.requests_by_season {
                log::info!("  {season:<22} {count:>6}");
            }
            let mut issues: Vec<_> = self.requests_by_issue.iter().collect();
            issues.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (issue, count) in issues {
                log::info!("  {issue:<22} {count:>6}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorConfig;

    #[test]
    fn tallies_a_generated_sample() {
        let mut config = GeneratorConfig::profile("sample").unwrap();
        config.seed = Some(12);
        let mut ctx = PipelineContext::new(config).unwrap();
        ctx.generate_neighborhoods().unwrap();
        ctx.generate_street_lights().unwrap();
        ctx.generate_maintenance().unwrap();

        let summary = RunSummary::from_context(&ctx);
        assert_eq!(summary.neighborhoods, 5);
        assert_eq!(summary.street_lights, 10);
        assert_eq!(summary.status_counts.values().sum::<usize>(), 10);
        assert_eq!(summary.requests_by_season.values().sum::<usize>(), 10);
        assert_eq!(summary.requests_by_issue.values().sum::<usize>(), 10);
        assert_eq!(
            summary.open_requests + summary.resolved_requests(),
            summary.maintenance_requests
        );
        assert_eq!(summary.weather_rows, 0);
        summary.log();
    }
}

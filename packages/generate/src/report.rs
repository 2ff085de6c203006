//! Supplier coverage report over an exported dataset.

use std::collections::BTreeMap;

use geo::{Centroid as _, Point};
use streetlights_entity_models::{Neighborhood, StreetLight, Supplier};
use streetlights_spatial::{NeighborhoodIndex, SupplierIndex, haversine_km, round_coord};

/// Distance bands, in kilometres, used to bucket lights by their nearest
/// supplier.
pub const NEAR_KM: f64 = 5.0;
pub const FAR_KM: f64 = 10.0;

/// Coverage of one neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodCoverage {
    pub neighborhood_id: String,
    pub name: String,
    pub light_count: usize,
    /// Lights whose position falls inside the boundary, looked up through
    /// the spatial index rather than the stored foreign key.
    pub lights_inside: usize,
    pub nearest_supplier_id: Option<String>,
    pub nearest_supplier_km: Option<f64>,
}

/// How well the supplier network covers the light population.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub total_lights: usize,
    pub within_near: usize,
    pub within_far: usize,
    pub beyond_far: usize,
    /// Mean distance from each light to its nearest supplier.
    pub avg_nearest_km: f64,
    /// Lights farther from their nearest supplier than its service radius.
    pub outside_service_radius: usize,
    pub neighborhoods: Vec<NeighborhoodCoverage>,
}

impl CoverageReport {
    /// Builds the report from the three upstream tables.
    #[must_use]
    pub fn build(
        neighborhoods: &[Neighborhood],
        lights: &[StreetLight],
        suppliers: &[Supplier],
    ) -> Self {
        let locations: Vec<Point<f64>> = suppliers.iter().map(|s| s.location).collect();
        let supplier_index = SupplierIndex::build(&locations);
        let neighborhood_index =
            NeighborhoodIndex::build(neighborhoods.iter().map(|n| (n.id.as_str(), &n.boundary)));

        let nearest = |point: Point<f64>| {
            supplier_index
                .nearest(point)
                .map(|i| (&suppliers[i], haversine_km(point, suppliers[i].location)))
        };

        let mut report = Self {
            total_lights: lights.len(),
            within_near: 0,
            within_far: 0,
            beyond_far: 0,
            avg_nearest_km: 0.0,
            outside_service_radius: 0,
            neighborhoods: Vec::with_capacity(neighborhoods.len()),
        };

        let mut total_km = 0.0;
        let mut by_fk: BTreeMap<&str, usize> = BTreeMap::new();
        let mut by_lookup: BTreeMap<&str, usize> = BTreeMap::new();

        for light in lights {
            *by_fk.entry(light.neighborhood_id.as_str()).or_default() += 1;
            if let Some(id) = neighborhood_index.lookup(light.location) {
                *by_lookup.entry(id).or_default() += 1;
            }

            let Some((supplier, km)) = nearest(light.location) else {
                continue;
            };
            total_km += km;
            if km <= NEAR_KM {
                report.within_near += 1;
            } else if km <= FAR_KM {
                report.within_far += 1;
            } else {
                report.beyond_far += 1;
            }
            if km > supplier.service_radius_km {
                report.outside_service_radius += 1;
            }
        }

        if !lights.is_empty() && !suppliers.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let avg = total_km / lights.len() as f64;
            report.avg_nearest_km = avg;
        }

        for n in neighborhoods {
            let centroid = n
                .boundary
                .centroid()
                .map(|c| Point::new(round_coord(c.x()), round_coord(c.y())));
            let closest = centroid.and_then(nearest);
            report.neighborhoods.push(NeighborhoodCoverage {
                neighborhood_id: n.id.clone(),
                name: n.name.clone(),
                light_count: by_fk.get(n.id.as_str()).copied().unwrap_or(0),
                lights_inside: by_lookup.get(n.id.as_str()).copied().unwrap_or(0),
                nearest_supplier_id: closest.map(|(s, _)| s.id.clone()),
                nearest_supplier_km: closest.map(|(_, km)| km),
            });
        }

        report
    }

    /// Prints the report as aligned text tables.
    pub fn print(&self) {
        println!("Supplier coverage for {} street lights", self.total_lights);
        println!("  within {NEAR_KM:.0} km:   {:>6}", self.within_near);
        println!("  within {FAR_KM:.0} km:  {:>6}", self.within_far);
        println!("  beyond {FAR_KM:.0} km:  {:>6}", self.beyond_far);
        println!("  average nearest: {:.2} km", self.avg_nearest_km);
        println!(
            "  outside nearest supplier's service radius: {}",
            self.outside_service_radius
        );
        println!();
        println!(
            "{:<10} {:<28} {:>7} {:<9} {:>8}",
            "ID", "NAME", "LIGHTS", "SUPPLIER", "KM"
        );
        for n in &self.neighborhoods {
            println!(
                "{:<10} {:<28} {:>7} {:<9} {:>8}",
                n.neighborhood_id,
                n.name,
                n.light_count,
                n.nearest_supplier_id.as_deref().unwrap_or("-"),
                n.nearest_supplier_km
                    .map_or_else(|| "-".to_string(), |km| format!("{km:.2}")),
            );
        }
    }
}

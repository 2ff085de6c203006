//! Maintenance supplier generator.
//!
//! Every supplier is fictitious: names carry a `(Fictitious)` suffix, phone
//! numbers sit in the `555` block, and email addresses use the reserved
//! `.example` top-level domain.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom as _;
use streetlights_entity_models::{Specialization, Supplier};
use streetlights_spatial::BoundingRegion;

const NAME_ADJECTIVES: &[&str] = &[
    "Bright", "Rapid", "Civic", "Metro", "Garden", "Silver", "Lakeside", "Deccan", "Evergreen",
    "Prime", "Northstar", "Sunrise",
];

const NAME_NOUNS: &[&str] = &[
    "Beacon", "Lamp", "Lumen", "Grid", "Circuit", "Pole", "Arc", "Glow", "Spark", "Current",
];

/// Formats a supplier id such as `SUP-003`.
#[must_use]
pub fn supplier_id(index: usize) -> String {
    format!("SUP-{:03}", index + 1)
}

/// Generates `count` suppliers with depots placed uniformly in `region`.
#[must_use]
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    region: &BoundingRegion,
    count: usize,
) -> Vec<Supplier> {
    let names = unique_names(rng, count);
    let mut suppliers = Vec::with_capacity(count);

    for (i, name) in names.into_iter().enumerate() {
        let slug = email_slug(&name);
        suppliers.push(Supplier {
            id: supplier_id(i),
            contact_phone: format!(
                "+91-80-555{}-{:04}",
                rng.gen_range(0..10),
                rng.gen_range(0..10_000)
            ),
            contact_email: format!("service@{slug}.example"),
            name,
            location: region.sample_point(rng),
            service_radius_km: round2(rng.gen_range(5.0..=15.0)),
            avg_response_hours: round2(rng.gen_range(2.0..=8.0)),
            specialization: *Specialization::all()
                .choose(rng)
                .unwrap_or(&Specialization::All),
        });
    }

    log::info!("Generated {} suppliers", suppliers.len());
    suppliers
}

/// Draws `count` distinct company names.
///
/// Random adjective/noun pairs are tried first; once the pair space runs
/// out, names are numbered branches so the result is always unique.
fn unique_names<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    let mut pairs: Vec<(&str, &str)> = NAME_ADJECTIVES
        .iter()
        .flat_map(|adj| NAME_NOUNS.iter().map(move |noun| (*adj, *noun)))
        .collect();
    pairs.shuffle(rng);

    let mut seen = BTreeSet::new();
    let mut names = Vec::with_capacity(count);
    for i in 0..count {
        let (adj, noun) = pairs[i % pairs.len()];
        let name = match i / pairs.len() {
            0 => format!("{adj} {noun} Lighting Services (Fictitious)"),
            round => format!("{adj} {noun} Lighting Services Branch {} (Fictitious)", round + 1),
        };
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    names
}

fn email_slug(name: &str) -> String {
    name.trim_end_matches(" (Fictitious)")
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

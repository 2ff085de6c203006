//! Neighborhood polygon construction and point-in-polygon sampling.

use std::f64::consts::TAU;

use geo::{Area as _, BoundingRect as _, Centroid as _, Contains as _, Coord, Intersects as _};
use geo::{Line, LineString, Point, Polygon, Rect};
use rand::Rng;

use crate::{SpatialError, round_coord, sample_in_rect};

/// Smallest accepted polygon area in square degrees (~1 m²).
const MIN_AREA: f64 = 1e-10;

/// Builds a closed, simple, star-shaped polygon inside `cell`.
///
/// Vertices are placed at strictly increasing angles around a jittered
/// center with jittered radii, which keeps the ring non-self-intersecting by
/// construction. Every candidate is still checked for area and simplicity
/// and resampled up to `max_attempts` times.
///
/// # Errors
///
/// Returns [`SpatialError::DegeneratePolygon`] if `vertices < 3` or no
/// candidate passes within `max_attempts`.
pub fn sample_star_polygon<R: Rng + ?Sized>(
    rng: &mut R,
    cell: &Rect<f64>,
    vertices: usize,
    max_attempts: u32,
) -> Result<Polygon<f64>, SpatialError> {
    if vertices < 3 {
        return Err(SpatialError::DegeneratePolygon { attempts: 0 });
    }

    let half_w = cell.width() / 2.0;
    let half_h = cell.height() / 2.0;
    let cell_center = cell.center();

    #[allow(clippy::cast_precision_loss)]
    let step = TAU / vertices as f64;

    for attempt in 1..=max_attempts {
        let center = Coord {
            x: rng.gen_range(-0.05..=0.05f64).mul_add(half_w, cell_center.x),
            y: rng.gen_range(-0.05..=0.05f64).mul_add(half_h, cell_center.y),
        };
        let start = rng.gen_range(0.0..step);

        let mut coords = Vec::with_capacity(vertices + 1);
        for i in 0..vertices {
            #[allow(clippy::cast_precision_loss)]
            let angle = rng
                .gen_range(-0.3..=0.3f64)
                .mul_add(step, (i as f64).mul_add(step, start));
            let radius = rng.gen_range(0.55..=0.9f64);
            coords.push(Coord {
                x: round_coord((radius * half_w).mul_add(angle.cos(), center.x)),
                y: round_coord((radius * half_h).mul_add(angle.sin(), center.y)),
            });
        }

        // `Polygon::new` closes the ring.
        let polygon = Polygon::new(LineString::from(coords), vec![]);

        if polygon.unsigned_area() > MIN_AREA && is_simple(&polygon) {
            return Ok(polygon);
        }

        log::debug!("Rejected degenerate polygon candidate {attempt}/{max_attempts}");
    }

    Err(SpatialError::DegeneratePolygon {
        attempts: max_attempts,
    })
}

/// Whether the exterior ring is closed, has at least three distinct
/// vertices, and no two non-adjacent edges touch.
#[must_use]
pub fn is_simple(polygon: &Polygon<f64>) -> bool {
    let ring = polygon.exterior();
    if !ring.is_closed() {
        return false;
    }

    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();
    if n < 3 {
        return false;
    }

    if edges.iter().any(|e| e.start == e.end) {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if !adjacent && edges[i].intersects(&edges[j]) {
                return false;
            }
        }
    }

    true
}

/// A point drawn inside a polygon, with a flag recording whether the
/// centroid fallback was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    pub point: Point<f64>,
    pub used_fallback: bool,
}

/// Draws a point strictly inside `polygon` by rejection sampling over its
/// bounding box.
///
/// After `max_retries` rejected draws the (rounded) centroid is used
/// instead, provided it lies inside the polygon.
///
/// # Errors
///
/// Returns [`SpatialError::NoInteriorPoint`] if the polygon has no bounding
/// box or neither sampling nor the centroid yields an interior point.
pub fn sample_point_in_polygon<R: Rng + ?Sized>(
    rng: &mut R,
    polygon: &Polygon<f64>,
    max_retries: u32,
) -> Result<PointSample, SpatialError> {
    let Some(bbox) = polygon.bounding_rect() else {
        return Err(SpatialError::NoInteriorPoint { retries: 0 });
    };

    for _ in 0..max_retries {
        let point = sample_in_rect(rng, &bbox);
        if polygon.contains(&point) {
            return Ok(PointSample {
                point,
                used_fallback: false,
            });
        }
    }

    polygon
        .centroid()
        .map(|c| Point::new(round_coord(c.x()), round_coord(c.y())))
        .filter(|c| polygon.contains(c))
        .map(|point| PointSample {
            point,
            used_fallback: true,
        })
        .ok_or(SpatialError::NoInteriorPoint {
            retries: max_retries,
        })
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;
    use crate::BoundingRegion;

    #[test]
    fn star_polygons_are_simple_closed_and_inside_cell() {
        let mut rng = StdRng::seed_from_u64(42);
        for cell in BoundingRegion::default().grid_cells(12) {
            let poly = sample_star_polygon(&mut rng, &cell, 8, 10).unwrap();
            assert!(is_simple(&poly));
            assert!(poly.exterior().is_closed());
            assert_eq!(poly.exterior().0.len(), 9);
            assert!(poly.unsigned_area() > MIN_AREA);

            let bbox = poly.bounding_rect().unwrap();
            assert!(bbox.min().x >= cell.min().x && bbox.max().x <= cell.max().x);
            assert!(bbox.min().y >= cell.min().y && bbox.max().y <= cell.max().y);
        }
    }

    #[test]
    fn too_few_vertices_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(1);
        let cell = BoundingRegion::default().rect();
        assert!(matches!(
            sample_star_polygon(&mut rng, &cell, 2, 5),
            Err(SpatialError::DegeneratePolygon { .. })
        ));
    }

    #[test]
    fn detects_bow_tie() {
        let bow_tie = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 1.0),
        ];
        assert!(!is_simple(&bow_tie));

        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        assert!(is_simple(&square));
    }

    #[test]
    fn sampled_points_fall_inside_polygon() {
        let mut rng = StdRng::seed_from_u64(3);
        let cell = BoundingRegion::default().grid_cells(4)[0];
        let poly = sample_star_polygon(&mut rng, &cell, 6, 10).unwrap();
        for _ in 0..500 {
            let sample = sample_point_in_polygon(&mut rng, &poly, 100).unwrap();
            assert!(poly.contains(&sample.point));
        }
    }

    #[test]
    fn zero_retries_falls_back_to_centroid() {
        let mut rng = StdRng::seed_from_u64(9);
        let square = polygon![
            (x: 77.5, y: 12.9),
            (x: 77.6, y: 12.9),
            (x: 77.6, y: 13.0),
            (x: 77.5, y: 13.0),
        ];
        let sample = sample_point_in_polygon(&mut rng, &square, 0).unwrap();
        assert!(sample.used_fallback);
        assert!((sample.point.x() - 77.55).abs() < 1e-6);
        assert!((sample.point.y() - 12.95).abs() < 1e-6);
    }

    #[test]
    fn concave_polygon_without_interior_centroid_fails_after_retries() {
        // A thin "C" whose centroid sits in the notch.
        let c_shape = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 9.0),
            (x: 10.0, y: 9.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            sample_point_in_polygon(&mut rng, &c_shape, 0),
            Err(SpatialError::NoInteriorPoint { retries: 0 })
        ));
    }
}

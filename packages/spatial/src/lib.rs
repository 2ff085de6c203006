#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic domain for the street lights demo city.
//!
//! Provides the fixed bounding region, uniform samplers for points and
//! star-shaped neighborhood polygons, point-in-polygon sampling with a
//! bounded retry budget, WKT encoding for the database loader, and R-tree
//! indexes used to attribute points to neighborhoods and find the nearest
//! supplier.
//!
//! All coordinates are `(x = longitude, y = latitude)` and are rounded to
//! [`COORD_DECIMALS`] places as they are produced, so that a containment
//! check made in memory gives the same answer after a WKT round trip.

pub mod index;
pub mod polygon;
pub mod wkt;

use geo::{Coord, Distance as _, Haversine, Point, Rect};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use index::{NeighborhoodIndex, SupplierIndex};
pub use polygon::{PointSample, is_simple, sample_point_in_polygon, sample_star_polygon};

/// Decimal places kept for every generated coordinate (~0.1 m).
pub const COORD_DECIMALS: i32 = 6;

/// Errors produced by the geographic domain.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The bounding region is empty, inverted, or outside valid lat/lon.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// No simple, non-zero-area polygon could be produced.
    #[error("Degenerate polygon after {attempts} attempts")]
    DegeneratePolygon {
        /// Number of candidate rings rejected.
        attempts: u32,
    },

    /// Neither rejection sampling nor the centroid produced an interior point.
    #[error("No interior point found after {retries} retries and centroid fallback")]
    NoInteriorPoint {
        /// Number of rejected samples.
        retries: u32,
    },

    /// WKT text could not be parsed.
    #[error("WKT error: {0}")]
    Wkt(String),
}

/// Latitude/longitude box enclosing the demo city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingRegion {
    /// Greater Bengaluru.
    fn default() -> Self {
        Self {
            min_lat: 12.85,
            max_lat: 13.10,
            min_lon: 77.45,
            max_lon: 77.75,
        }
    }
}

impl BoundingRegion {
    /// Checks that the box is finite, non-empty, and within lat/lon limits.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidRegion`] describing the first problem.
    pub fn validate(&self) -> Result<(), SpatialError> {
        let values = [self.min_lat, self.max_lat, self.min_lon, self.max_lon];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SpatialError::InvalidRegion(
                "bounds must be finite numbers".to_string(),
            ));
        }
        if self.min_lat >= self.max_lat {
            return Err(SpatialError::InvalidRegion(format!(
                "min_lat {} must be below max_lat {}",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon >= self.max_lon {
            return Err(SpatialError::InvalidRegion(format!(
                "min_lon {} must be below max_lon {}",
                self.min_lon, self.max_lon
            )));
        }
        if self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err(SpatialError::InvalidRegion(
                "latitude must be within [-90, 90]".to_string(),
            ));
        }
        if self.min_lon < -180.0 || self.max_lon > 180.0 {
            return Err(SpatialError::InvalidRegion(
                "longitude must be within [-180, 180]".to_string(),
            ));
        }
        Ok(())
    }

    /// The region as a `geo` rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
        )
    }

    /// Whether `point` lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, point: Point<f64>) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.x())
            && (self.min_lat..=self.max_lat).contains(&point.y())
    }

    /// Draws a uniformly distributed point inside the box.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point<f64> {
        sample_in_rect(rng, &self.rect())
    }

    /// Splits the box into a near-square grid and returns the first `n`
    /// cells in row-major order.
    ///
    /// Placing one polygon per cell keeps neighborhoods spread over the
    /// whole region instead of piling onto each other.
    #[must_use]
    pub fn grid_cells(&self, n: usize) -> Vec<Rect<f64>> {
        if n == 0 {
            return Vec::new();
        }

        let width = self.max_lon - self.min_lon;
        let height = self.max_lat - self.min_lat;

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let cols = ((n as f64 * width / height).sqrt().ceil() as usize).clamp(1, n);
        let rows = n.div_ceil(cols);

        #[allow(clippy::cast_precision_loss)]
        let (cell_w, cell_h) = (width / cols as f64, height / rows as f64);

        (0..n)
            .map(|i| {
                let (row, col) = (i / cols, i % cols);
                #[allow(clippy::cast_precision_loss)]
                let min = Coord {
                    x: (col as f64).mul_add(cell_w, self.min_lon),
                    y: (row as f64).mul_add(cell_h, self.min_lat),
                };
                Rect::new(
                    min,
                    Coord {
                        x: min.x + cell_w,
                        y: min.y + cell_h,
                    },
                )
            })
            .collect()
    }
}

/// Draws a uniformly distributed, rounded point inside `rect`.
pub fn sample_in_rect<R: Rng + ?Sized>(rng: &mut R, rect: &Rect<f64>) -> Point<f64> {
    let (min, max) = (rect.min(), rect.max());
    let x = if max.x > min.x {
        rng.gen_range(min.x..max.x)
    } else {
        min.x
    };
    let y = if max.y > min.y {
        rng.gen_range(min.y..max.y)
    } else {
        min.y
    };
    Point::new(round_coord(x), round_coord(y))
}

/// Rounds a coordinate to [`COORD_DECIMALS`] places.
#[must_use]
pub fn round_coord(value: f64) -> f64 {
    let scale = 10f64.powi(COORD_DECIMALS);
    (value * scale).round() / scale
}

/// Great-circle distance between two lon/lat points in kilometres.
#[must_use]
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b) / 1000.0
}

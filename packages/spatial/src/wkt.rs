//! Well-known text encoding for the geometry columns.
//!
//! Only the two shapes the dataset uses are supported: `POINT(lon lat)` and
//! single-ring `POLYGON((lon lat, ...))`. Output uses [`COORD_DECIMALS`]
//! fixed decimals so the same geometry always serializes to the same bytes.

use std::fmt::Write as _;

use geo::{Coord, LineString, Point, Polygon};

use crate::{COORD_DECIMALS, SpatialError};

#[allow(clippy::cast_sign_loss)]
const PRECISION: usize = COORD_DECIMALS as usize;

/// Encodes a point as `POINT(lon lat)`.
#[must_use]
pub fn point_to_wkt(point: Point<f64>) -> String {
    format!(
        "POINT({:.prec$} {:.prec$})",
        point.x(),
        point.y(),
        prec = PRECISION
    )
}

/// Encodes the exterior ring of a polygon as `POLYGON((lon lat, ...))`.
///
/// The ring is written closed (first vertex repeated last).
#[must_use]
pub fn polygon_to_wkt(polygon: &Polygon<f64>) -> String {
    let mut out = String::from("POLYGON((");
    for (i, c) in polygon.exterior().coords().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{:.prec$} {:.prec$}", c.x, c.y, prec = PRECISION);
    }
    out.push_str("))");
    out
}

/// Parses `POINT(lon lat)`.
///
/// # Errors
///
/// Returns [`SpatialError::Wkt`] if the text is not a 2D point.
pub fn point_from_wkt(text: &str) -> Result<Point<f64>, SpatialError> {
    let body = strip_tag(text, "POINT")?;
    let body = strip_parens(body, text)?;
    let coord = parse_coord(body)?;
    Ok(Point::from(coord))
}

/// Parses a single-ring `POLYGON((lon lat, ...))`.
///
/// # Errors
///
/// Returns [`SpatialError::Wkt`] if the text is not a polygon, has interior
/// rings, or has fewer than four coordinates.
pub fn polygon_from_wkt(text: &str) -> Result<Polygon<f64>, SpatialError> {
    let body = strip_tag(text, "POLYGON")?;
    let ring = strip_parens(strip_parens(body, text)?, text)?;

    if ring.contains('(') || ring.contains(')') {
        return Err(SpatialError::Wkt(format!(
            "interior rings are not supported: {text}"
        )));
    }

    let coords = ring
        .split(',')
        .map(parse_coord)
        .collect::<Result<Vec<_>, _>>()?;

    if coords.len() < 4 {
        return Err(SpatialError::Wkt(format!(
            "polygon ring needs at least 4 coordinates, found {}",
            coords.len()
        )));
    }

    Ok(Polygon::new(LineString::from(coords), vec![]))
}

fn strip_tag<'a>(text: &'a str, tag: &str) -> Result<&'a str, SpatialError> {
    let trimmed = text.trim();
    trimmed
        .get(..tag.len())
        .filter(|head| head.eq_ignore_ascii_case(tag))
        .map(|_| trimmed[tag.len()..].trim_start())
        .ok_or_else(|| SpatialError::Wkt(format!("expected {tag}: {text}")))
}

fn strip_parens<'a>(body: &'a str, original: &str) -> Result<&'a str, SpatialError> {
    body.trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| SpatialError::Wkt(format!("unbalanced parentheses: {original}")))
}

fn parse_coord(pair: &str) -> Result<Coord<f64>, SpatialError> {
    let mut parts = pair.split_whitespace();
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SpatialError::Wkt(format!("expected 'lon lat', got '{pair}'")));
    };

    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| SpatialError::Wkt(format!("invalid number '{s}': {e}")))
    };

    Ok(Coord {
        x: parse(x)?,
        y: parse(y)?,
    })
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn writes_fixed_precision_point() {
        assert_eq!(
            point_to_wkt(Point::new(77.5946, 12.9716)),
            "POINT(77.594600 12.971600)"
        );
    }

    #[test]
    fn writes_closed_polygon_ring() {
        let square = polygon![
            (x: 77.5, y: 12.9),
            (x: 77.6, y: 12.9),
            (x: 77.6, y: 13.0),
            (x: 77.5, y: 13.0),
        ];
        assert_eq!(
            polygon_to_wkt(&square),
            "POLYGON((77.500000 12.900000, 77.600000 12.900000, 77.600000 13.000000, \
             77.500000 13.000000, 77.500000 12.900000))"
        );
    }

    #[test]
    fn reads_back_what_it_writes() {
        let square = polygon![
            (x: 77.512_345, y: 12.9),
            (x: 77.6, y: 12.912_345),
            (x: 77.6, y: 13.0),
        ];
        let parsed = polygon_from_wkt(&polygon_to_wkt(&square)).unwrap();
        assert_eq!(parsed, square);

        let point = Point::new(77.123_456, 12.654_321);
        assert_eq!(point_from_wkt(&point_to_wkt(point)).unwrap(), point);
    }

    #[test]
    fn accepts_loose_spacing_and_case() {
        let p = point_from_wkt("  point ( 77.1 12.2 ) ").unwrap();
        assert!((p.x() - 77.1).abs() < 1e-12);
        assert!((p.y() - 12.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(point_from_wkt("POINT(77.1)").is_err());
        assert!(point_from_wkt("LINESTRING(0 0, 1 1)").is_err());
        assert!(polygon_from_wkt("POLYGON((0 0, 1 0, 0 0))").is_err());
        assert!(polygon_from_wkt("POLYGON((0 0, 1 0, 1 1, 0 0), (0 0, 1 1, 0 1, 0 0))").is_err());
        assert!(polygon_from_wkt("POLYGON((0 0, 1 0, 1 1, 0 0)").is_err());
    }
}

//! Geographic primitives: points, closed boundary rings and their GeoJSON form.

use geo::{ChamberlainDuquetteArea, Coord, Intersects, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hectares to acres.
pub const ACRES_PER_HECTARE: f64 = 2.47105;

/// A WGS84 position in degrees, longitude first as in GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    fn position(self) -> geojson::Position {
        vec![self.lng, self.lat]
    }
}

impl From<Point> for Coord<f64> {
    fn from(p: Point) -> Self {
        Coord { x: p.lng, y: p.lat }
    }
}

impl From<[f64; 2]> for Point {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

/// Area of a boundary in both units the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaMetrics {
    pub area_hectares: f64,
    pub area_acres: f64,
}

impl AreaMetrics {
    pub fn from_hectares(area_hectares: f64) -> Self {
        Self {
            area_hectares,
            area_acres: area_hectares * ACRES_PER_HECTARE,
        }
    }
}

/// A closed ring of at least three vertices; the last point repeats the first.
///
/// Simplicity (no self-intersection) is not guaranteed by construction, see
/// [`Boundary::is_simple`].
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    ring: Vec<Point>,
}

impl Boundary {
    /// Builds a boundary from an open or already closed vertex list.
    ///
    /// # Errors
    ///
    /// [`Error::InsufficientVertices`] when fewer than three vertices remain
    /// once the closing point is ignored.
    pub fn from_vertices(mut vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self::close(vertices)
    }

    /// Closes `vertices` into a ring by appending the first vertex again,
    /// whatever the last vertex is.
    pub(crate) fn close(mut vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::InsufficientVertices {
                count: vertices.len(),
            });
        }
        let first = vertices[0];
        vertices.push(first);
        Ok(Self { ring: vertices })
    }

    /// The closed ring, first point repeated at the end.
    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    /// Number of vertices without the closing point.
    pub fn vertex_count(&self) -> usize {
        self.ring.len() - 1
    }

    fn edges(&self) -> Vec<Line<f64>> {
        self.ring
            .windows(2)
            .map(|w| Line::new(Coord::from(w[0]), Coord::from(w[1])))
            .collect()
    }

    /// `true` when the ring has at least three distinct vertices and no two
    /// non-adjacent edges touch.
    pub fn is_simple(&self) -> bool {
        let vertices = &self.ring[..self.vertex_count()];
        let distinct = vertices
            .iter()
            .enumerate()
            .filter(|(i, p)| !vertices[..*i].contains(p))
            .count();
        if distinct < 3 {
            return false;
        }

        let edges = self.edges();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 2)..n {
                // first and last edge share the closing vertex
                if i == 0 && j == n - 1 {
                    continue;
                }
                if edges[i].intersects(&edges[j]) {
                    return false;
                }
            }
        }
        true
    }

    /// Client-side area estimate on a spherical earth, shown before the
    /// backend's own figure is available.
    pub fn area_preview(&self) -> AreaMetrics {
        let square_metres = self.to_polygon().chamberlain_duquette_unsigned_area();
        AreaMetrics::from_hectares(square_metres / 10_000.0)
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.ring.iter().copied().map(Coord::from).collect();
        Polygon::new(exterior, vec![])
    }

    /// GeoJSON Polygon geometry with a single closed exterior ring.
    pub fn to_geojson(&self) -> geojson::Geometry {
        let ring = self.ring.iter().map(|p| p.position()).collect();
        geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))
    }

    /// Reads the exterior ring of a GeoJSON Polygon.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for non-polygon geometries or malformed
    /// positions, [`Error::InsufficientVertices`] for degenerate rings.
    pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Self> {
        let geojson::Value::Polygon(rings) = &geometry.value else {
            return Err(Error::InvalidInput(
                "boundary geometry must be a Polygon".to_string(),
            ));
        };
        let exterior = rings
            .first()
            .ok_or_else(|| Error::InvalidInput("polygon has no exterior ring".to_string()))?;
        let vertices = exterior
            .iter()
            .map(|pos| match pos.as_slice() {
                [lng, lat, ..] => Ok(Point::new(*lng, *lat)),
                _ => Err(Error::InvalidInput(format!("invalid position {pos:?}"))),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_vertices(vertices)
    }
}

/// Parses `"lng,lat;lng,lat;..."` as typed on the command line.
///
/// # Errors
///
/// [`Error::InvalidInput`] when a pair is not two numbers.
pub fn parse_coordinate_list(input: &str) -> Result<Vec<Point>> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.split(',').map(|s| s.trim().parse::<f64>());
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(lng)), Some(Ok(lat)), None) => Ok(Point::new(lng, lat)),
                _ => Err(Error::InvalidInput(format!(
                    "expected `lng,lat`, got `{pair}`"
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_close_appends_first_point() {
        let b = Boundary::close(square()).unwrap();
        assert_eq!(b.ring().len(), 5);
        assert_eq!(b.ring().first(), b.ring().last());
        assert_eq!(b.vertex_count(), 4);
    }

    #[test]
    fn test_from_vertices_does_not_double_close() {
        let mut closed = square();
        closed.push(Point::new(0.0, 0.0));
        let b = Boundary::from_vertices(closed).unwrap();
        assert_eq!(b.ring().len(), 5);
    }

    #[test]
    fn test_too_few_vertices() {
        let err = Boundary::from_vertices(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientVertices { count: 2 }));
    }

    #[test]
    fn test_square_is_simple() {
        assert!(Boundary::close(square()).unwrap().is_simple());
    }

    #[test]
    fn test_bow_tie_is_not_simple() {
        let bow_tie = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(!Boundary::close(bow_tie).unwrap().is_simple());
    }

    #[test]
    fn test_repeated_vertices_are_not_simple() {
        let repeated = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        assert!(!Boundary::close(repeated).unwrap().is_simple());
    }

    #[test]
    fn test_geojson_encoding_is_closed_lng_lat() {
        let b = Boundary::close(vec![
            Point::new(10.0, 45.0),
            Point::new(10.0, 45.1),
            Point::new(10.1, 45.1),
        ])
        .unwrap();
        let value = serde_json::to_value(b.to_geojson()).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(
            value["coordinates"],
            serde_json::json!([[[10.0, 45.0], [10.0, 45.1], [10.1, 45.1], [10.0, 45.0]]])
        );
    }

    #[test]
    fn test_geojson_round_trip_keeps_vertices() {
        let b = Boundary::close(square()).unwrap();
        let back = Boundary::from_geojson(&b.to_geojson()).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_area_preview_small_square() {
        // 0.01° square at the equator is roughly 1.11 km per side
        let b = Boundary::close(vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.01),
            Point::new(0.01, 0.01),
            Point::new(0.01, 0.0),
        ])
        .unwrap();
        let area = b.area_preview();
        assert!((area.area_hectares - 123.6).abs() < 2.0, "{area:?}");
        assert!((area.area_acres - area.area_hectares * ACRES_PER_HECTARE).abs() < 1e-9);
    }

    #[test]
    fn test_parse_coordinate_list() {
        let pts = parse_coordinate_list("0,0; 0,1 ;1,1;").unwrap();
        assert_eq!(
            pts,
            vec![Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)]
        );
        assert!(parse_coordinate_list("0,0;abc").is_err());
        assert!(parse_coordinate_list("0,0,0").is_err());
    }
}

// Planar and great-circle helpers over (latitude, longitude) vertices
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub latitude: f64,
    pub longitude: f64,
}

impl Vertex {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeometryError> {
        let vertex = Self {
            latitude,
            longitude,
        };
        vertex.validate()?;
        Ok(vertex)
    }

    /// Rejects NaN as well as out-of-range values.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeometryError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeometryError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Arithmetic mean of each coordinate. `None` for an empty slice.
pub fn centroid(vertices: &[Vertex]) -> Option<Vertex> {
    if vertices.is_empty() {
        return None;
    }

    let n = vertices.len() as f64;
    let latitude = vertices.iter().map(|v| v.latitude).sum::<f64>() / n;
    let longitude = vertices.iter().map(|v| v.longitude).sum::<f64>() / n;

    Some(Vertex {
        latitude,
        longitude,
    })
}

/// Latitude/longitude extrema. `None` for an empty slice.
pub fn bounding_box(vertices: &[Vertex]) -> Option<BoundingBox> {
    if vertices.is_empty() {
        return None;
    }

    let bbox = vertices.iter().fold(
        BoundingBox {
            north: f64::NEG_INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            west: f64::INFINITY,
        },
        |acc, v| BoundingBox {
            north: acc.north.max(v.latitude),
            south: acc.south.min(v.latitude),
            east: acc.east.max(v.longitude),
            west: acc.west.min(v.longitude),
        },
    );

    Some(bbox)
}

/// Shoelace area in squared degrees. This is planar, not geodesic, so it is
/// only meaningful for small regions.
pub fn area(vertices: &[Vertex]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let n = vertices.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.latitude * b.longitude - b.latitude * a.longitude
        })
        .sum();

    twice_signed.abs() / 2.0
}

/// Even-odd ray casting. Points exactly on an edge may land either way.
pub fn point_in_polygon(point: Vertex, polygon: &[Vertex]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (x, y) = (point.latitude, point.longitude);
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].latitude, polygon[i].longitude);
        let (xj, yj) = (polygon[j].latitude, polygon[j].longitude);

        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Great-circle distance in kilometres.
pub fn haversine_distance(p1: Vertex, p2: Vertex) -> f64 {
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lng = (p2.longitude - p1.longitude).to_radians();

    // Rounding can push `a` just past 1.0 for near-antipodal points.
    let a = ((d_lat / 2.0).sin().powi(2)
        + p1.latitude.to_radians().cos()
            * p2.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Length of the closed ring, including the edge back to the first vertex.
pub fn perimeter_km(vertices: &[Vertex]) -> f64 {
    if vertices.len() < 2 {
        return 0.0;
    }

    let n = vertices.len();
    (0..n)
        .map(|i| haversine_distance(vertices[i], vertices[(i + 1) % n]))
        .sum()
}

/// Formats as `52.5280°N, 13.4100°E`.
pub fn format_coordinates(vertex: Vertex) -> String {
    let lat_dir = if vertex.latitude >= 0.0 { 'N' } else { 'S' };
    let lng_dir = if vertex.longitude >= 0.0 { 'E' } else { 'W' };

    format!(
        "{:.4}°{}, {:.4}°{}",
        vertex.latitude.abs(),
        lat_dir,
        vertex.longitude.abs(),
        lng_dir
    )
}

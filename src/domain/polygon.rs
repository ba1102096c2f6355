// Finished polygon domain model
use super::geometry::{self, BoundingBox, Vertex};
use serde::Serialize;

pub const MIN_VERTICES: usize = 3;
pub const MAX_VERTICES: usize = 12;

/// A finalized polygon. Vertices, centroid and bounding box are fixed at
/// construction; only the color may change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    id: String,
    vertices: Vec<Vertex>,
    data_source: String,
    color: String,
    centroid: Vertex,
    bounding_box: BoundingBox,
    is_complete: bool,
}

impl Polygon {
    /// Returns `None` unless the vertex count is within
    /// `MIN_VERTICES..=MAX_VERTICES`.
    pub fn finish(
        id: String,
        vertices: Vec<Vertex>,
        data_source: String,
        color: String,
    ) -> Option<Self> {
        if !(MIN_VERTICES..=MAX_VERTICES).contains(&vertices.len()) {
            return None;
        }

        let centroid = geometry::centroid(&vertices)?;
        let bounding_box = geometry::bounding_box(&vertices)?;

        Some(Self {
            id,
            vertices,
            data_source,
            color,
            centroid,
            bounding_box,
            is_complete: true,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: String) {
        self.color = color;
    }

    pub fn centroid(&self) -> Vertex {
        self.centroid
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn contains(&self, point: Vertex) -> bool {
        geometry::point_in_polygon(point, &self.vertices)
    }
}

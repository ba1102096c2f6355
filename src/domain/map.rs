// Map widget contract: inbound events and the outbound render snapshot
use super::geometry::{self, BoundingBox, Vertex};
use super::polygon::Polygon;
use serde::{Deserialize, Serialize};

pub const MAX_ZOOM: u8 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: Vertex,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    VertexClick {
        latitude: f64,
        longitude: f64,
    },
    ViewChange {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        zoom: Option<u8>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PolygonView {
    pub id: String,
    pub data_source: String,
    pub color: String,
    pub vertices: Vec<Vertex>,
    pub centroid: Vertex,
    pub centroid_label: String,
    pub bounding_box: BoundingBox,
    pub area: f64,
    pub perimeter_km: f64,
    pub is_complete: bool,
}

impl From<&Polygon> for PolygonView {
    fn from(polygon: &Polygon) -> Self {
        Self {
            id: polygon.id().to_string(),
            data_source: polygon.data_source().to_string(),
            color: polygon.color().to_string(),
            vertices: polygon.vertices().to_vec(),
            centroid: polygon.centroid(),
            centroid_label: geometry::format_coordinates(polygon.centroid()),
            bounding_box: polygon.bounding_box(),
            area: geometry::area(polygon.vertices()),
            perimeter_km: geometry::perimeter_km(polygon.vertices()),
            is_complete: polygon.is_complete(),
        }
    }
}

/// Everything the map widget needs to redraw.
#[derive(Debug, Clone, Serialize)]
pub struct MapScene {
    pub view: MapView,
    pub is_loading: bool,
    pub is_drawing: bool,
    pub drawing_vertices: Vec<Vertex>,
    pub polygons: Vec<PolygonView>,
}

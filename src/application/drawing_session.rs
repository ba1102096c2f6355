// Drawing session - Accumulates clicked vertices until a polygon is finished
use crate::domain::geometry::{GeometryError, Vertex};
use crate::domain::polygon::{MAX_VERTICES, MIN_VERTICES};
use serde::Serialize;
use thiserror::Error;

/// A click within this planar distance (degrees) of the first vertex closes
/// the ring.
pub const CLOSE_RADIUS_DEGREES: f64 = 0.01;

#[derive(Debug, Error, PartialEq)]
pub enum DrawingError {
    #[error("no drawing session is active")]
    NotDrawing,
    #[error("polygon already has the maximum of {max} vertices")]
    CapacityReached { max: usize },
    #[error("invalid vertex: {0}")]
    InvalidVertex(#[from] GeometryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

/// Read-only view of a session handed to the map widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingSnapshot {
    pub state: SessionState,
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    state: SessionState,
    vertices: Vec<Vertex>,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn snapshot(&self) -> DrawingSnapshot {
        DrawingSnapshot {
            state: self.state(),
            vertices: self.vertices.clone(),
        }
    }

    /// Enters `Active`, discarding anything left over from an earlier session.
    pub fn start(&mut self) {
        self.state = SessionState::Active;
        self.vertices.clear();
    }

    /// Appends a vertex, returning the new vertex count.
    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<usize, DrawingError> {
        if !self.is_active() {
            return Err(DrawingError::NotDrawing);
        }
        vertex.validate()?;
        if self.vertices.len() >= MAX_VERTICES {
            return Err(DrawingError::CapacityReached { max: MAX_VERTICES });
        }

        self.vertices.push(vertex);
        Ok(self.vertices.len())
    }

    /// True once the ring has at least `MIN_VERTICES` vertices and either
    /// the last one landed within `CLOSE_RADIUS_DEGREES` of the first or
    /// the session is full.
    pub fn closes_ring(&self) -> bool {
        if !self.is_active() || self.vertices.len() < MIN_VERTICES {
            return false;
        }
        if self.vertices.len() >= MAX_VERTICES {
            return true;
        }

        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) => {
                let d_lat = last.latitude - first.latitude;
                let d_lng = last.longitude - first.longitude;
                (d_lat * d_lat + d_lng * d_lng).sqrt() < CLOSE_RADIUS_DEGREES
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Hands back the accumulated ring and resets to `Idle`.
    ///
    /// With fewer than `MIN_VERTICES` vertices (or while idle) nothing
    /// happens: the session keeps its state and vertices.
    pub fn finish(&mut self) -> Option<Vec<Vertex>> {
        if !self.is_active() || self.vertices.len() < MIN_VERTICES {
            return None;
        }

        let vertices = std::mem::take(&mut self.vertices);
        self.state = SessionState::Idle;
        Some(vertices)
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.vertices.clear();
    }
}

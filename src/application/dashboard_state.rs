// Dashboard state - Single owner of everything the dashboard shows
//
// Every mutation goes through a method here; callers never patch fields.
use crate::application::data_source_registry::{DataSourceRegistry, RegistryError};
use crate::application::drawing_session::{DrawingError, DrawingSession};
use crate::application::series_repository::SeriesQuery;
use crate::domain::color_rule::ColorRule;
use crate::domain::data_source::DataSource;
use crate::domain::geometry::{self, GeometryError, Vertex};
use crate::domain::map::{MapEvent, MapScene, MapView, PolygonView, MAX_ZOOM};
use crate::domain::polygon::Polygon;
use crate::domain::time_range::{InvalidTimeRange, TimeRange};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Used when no rule of the drawing source can color a new polygon.
pub const DEFAULT_POLYGON_COLOR: &str = "#3b82f6";

#[derive(Debug, Error, PartialEq)]
pub enum DashboardError {
    #[error(transparent)]
    Drawing(#[from] DrawingError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    TimeRange(#[from] InvalidTimeRange),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("unknown polygon {0}")]
    UnknownPolygon(String),
    #[error("zoom {0} exceeds maximum of {max}", max = MAX_ZOOM)]
    InvalidZoom(u8),
}

/// What a map event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEventOutcome {
    Ignored,
    VertexAdded,
    /// The click closed the ring; the caller should finish the polygon.
    RingClosed,
    ViewChanged,
}

/// A ring taken out of the drawing session, waiting for its color.
#[derive(Debug, Clone)]
pub struct PendingPolygon {
    pub id: String,
    pub vertices: Vec<Vertex>,
    pub data_source: String,
    pub rules: Vec<ColorRule>,
    pub fallback_color: String,
    /// `None` when no source is active for drawing.
    pub query: Option<SeriesQuery>,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    time_range: TimeRange,
    range_mode: bool,
    polygons: Vec<Polygon>,
    registry: DataSourceRegistry,
    session: DrawingSession,
    view: MapView,
    map_loading: bool,
    polygon_seq: u64,
}

impl DashboardState {
    pub fn new(registry: DataSourceRegistry, time_range: TimeRange, view: MapView) -> Self {
        Self {
            time_range,
            range_mode: false,
            polygons: Vec::new(),
            registry,
            session: DrawingSession::new(),
            view,
            map_loading: true,
            polygon_seq: 0,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn range_mode(&self) -> bool {
        self.range_mode
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn registry(&self) -> &DataSourceRegistry {
        &self.registry
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn set_time_range(&mut self, time_range: TimeRange) -> Result<(), DashboardError> {
        time_range.validate()?;
        self.time_range = time_range;
        Ok(())
    }

    pub fn set_range_mode(&mut self, range_mode: bool) {
        self.range_mode = range_mode;
    }

    pub fn add_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn remove_polygon(&mut self, id: &str) -> Result<Polygon, DashboardError> {
        let index = self
            .polygons
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| DashboardError::UnknownPolygon(id.to_string()))?;
        Ok(self.polygons.remove(index))
    }

    pub fn update_polygon_color(
        &mut self,
        id: &str,
        color: String,
    ) -> Result<&Polygon, DashboardError> {
        let polygon = self
            .polygons
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| DashboardError::UnknownPolygon(id.to_string()))?;
        polygon.set_color(color);
        Ok(&*polygon)
    }

    /// Finished polygons containing `point`, in insertion order.
    pub fn polygons_at(&self, point: Vertex) -> Vec<&Polygon> {
        self.polygons.iter().filter(|p| p.contains(point)).collect()
    }

    pub fn select_data_source(&mut self, id: &str) -> Result<(), DashboardError> {
        Ok(self.registry.select(id)?)
    }

    pub fn toggle_data_source(&mut self, id: &str) -> Result<&DataSource, DashboardError> {
        Ok(self.registry.toggle(id)?)
    }

    pub fn replace_color_rules(
        &mut self,
        id: &str,
        rules: Vec<ColorRule>,
    ) -> Result<&DataSource, DashboardError> {
        Ok(self.registry.replace_rules(id, rules)?)
    }

    pub fn replace_data_source(
        &mut self,
        source: DataSource,
    ) -> Result<&DataSource, DashboardError> {
        Ok(self.registry.replace(source)?)
    }

    pub fn set_map_center(&mut self, center: Vertex) -> Result<(), DashboardError> {
        center.validate()?;
        self.view.center = center;
        Ok(())
    }

    pub fn set_map_zoom(&mut self, zoom: u8) -> Result<(), DashboardError> {
        if zoom > MAX_ZOOM {
            return Err(DashboardError::InvalidZoom(zoom));
        }
        self.view.zoom = zoom;
        Ok(())
    }

    pub fn set_map_loading(&mut self, loading: bool) {
        self.map_loading = loading;
    }

    pub fn start_drawing(&mut self) {
        self.session.start();
    }

    pub fn add_drawing_vertex(&mut self, vertex: Vertex) -> Result<usize, DashboardError> {
        let count = self.session.add_vertex(vertex).inspect_err(|e| {
            tracing::debug!("Rejected drawing vertex {:?}: {}", vertex, e);
        })?;
        Ok(count)
    }

    pub fn cancel_drawing(&mut self) {
        self.session.cancel();
    }

    /// Takes the ring out of the drawing session and snapshots what is needed
    /// to color it. Returns `None`, leaving the session untouched, when the
    /// session cannot finish yet.
    pub fn begin_finish(&mut self, now: DateTime<Utc>) -> Option<PendingPolygon> {
        let Some(vertices) = self.session.finish() else {
            tracing::debug!(
                "Ignoring finish with {} vertices (active: {})",
                self.session.vertices().len(),
                self.session.is_active()
            );
            return None;
        };

        let centroid = geometry::centroid(&vertices)?;
        let id = format!("polygon-{}-{}", now.timestamp_millis(), self.polygon_seq);
        self.polygon_seq += 1;

        let (rules, fallback_color, query) = match self.registry.active_for_drawing() {
            Some(source) => {
                let (start_date, end_date) = self.time_range.fetch_window(self.range_mode);
                let query = SeriesQuery {
                    endpoint: source.api_endpoint.clone(),
                    field: source.field.clone(),
                    latitude: centroid.latitude,
                    longitude: centroid.longitude,
                    start_date,
                    end_date,
                };
                (
                    source.color_rules.clone(),
                    source
                        .fallback_color()
                        .unwrap_or(DEFAULT_POLYGON_COLOR)
                        .to_string(),
                    Some(query),
                )
            }
            None => (Vec::new(), DEFAULT_POLYGON_COLOR.to_string(), None),
        };

        Some(PendingPolygon {
            id,
            vertices,
            data_source: self.registry.selected_id().to_string(),
            rules,
            fallback_color,
            query,
        })
    }

    /// Builds the polygon from a pending ring and appends it.
    pub fn complete_polygon(&mut self, pending: PendingPolygon, color: String) -> Option<&Polygon> {
        let polygon = Polygon::finish(pending.id, pending.vertices, pending.data_source, color)?;
        tracing::info!(
            "Added polygon {} with color {} for source {}",
            polygon.id(),
            polygon.color(),
            polygon.data_source()
        );
        self.add_polygon(polygon);
        self.polygons.last()
    }

    pub fn apply_map_event(
        &mut self,
        event: MapEvent,
    ) -> Result<MapEventOutcome, DashboardError> {
        match event {
            MapEvent::VertexClick {
                latitude,
                longitude,
            } => {
                if !self.session.is_active() {
                    tracing::debug!("Ignoring map click while not drawing");
                    return Ok(MapEventOutcome::Ignored);
                }
                self.add_drawing_vertex(Vertex::new(latitude, longitude)?)?;
                if self.session.closes_ring() {
                    return Ok(MapEventOutcome::RingClosed);
                }
                Ok(MapEventOutcome::VertexAdded)
            }
            MapEvent::ViewChange {
                latitude,
                longitude,
                zoom,
            } => {
                self.set_map_center(Vertex::new(latitude, longitude)?)?;
                if let Some(zoom) = zoom {
                    self.set_map_zoom(zoom)?;
                }
                Ok(MapEventOutcome::ViewChanged)
            }
        }
    }

    pub fn scene(&self) -> MapScene {
        MapScene {
            view: self.view,
            is_loading: self.map_loading,
            is_drawing: self.session.is_active(),
            drawing_vertices: self.session.vertices().to_vec(),
            polygons: self.polygons.iter().map(PolygonView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::color_rule::RuleOperator;
    use chrono::TimeZone;

    fn weather_source(is_active: bool) -> DataSource {
        DataSource {
            id: "weather".to_string(),
            name: "Weather".to_string(),
            field: "temperature_2m".to_string(),
            field_description: String::new(),
            color_rules: vec![
                ColorRule::new(RuleOperator::LessThan, 10.0, "#3b82f6", "< 10"),
                ColorRule::new(RuleOperator::GreaterOrEqual, 10.0, "#ef4444", ">= 10"),
            ],
            api_endpoint: "http://localhost/archive".to_string(),
            is_active,
            is_required: false,
        }
    }

    fn state_with(source: DataSource) -> DashboardState {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        DashboardState::new(
            DataSourceRegistry::new(vec![source], "weather".to_string()),
            TimeRange::around(now, 15),
            MapView {
                center: Vertex {
                    latitude: 52.528,
                    longitude: 13.41,
                },
                zoom: 10,
            },
        )
    }

    fn draw_triangle(state: &mut DashboardState) {
        state.start_drawing();
        for (lat, lng) in [(0.0, 0.0), (0.0, 3.0), (3.0, 0.0)] {
            state.add_drawing_vertex(Vertex::new(lat, lng).unwrap()).unwrap();
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_begin_finish_snapshots_active_source() {
        let mut state = state_with(weather_source(true));
        draw_triangle(&mut state);

        let pending = state.begin_finish(now()).unwrap();
        assert!(pending.id.starts_with("polygon-"));
        assert_eq!(pending.data_source, "weather");
        assert_eq!(pending.fallback_color, "#3b82f6");
        assert_eq!(pending.rules.len(), 2);

        let query = pending.query.unwrap();
        assert_eq!(query.field, "temperature_2m");
        assert_eq!(query.latitude, 1.0);
        assert_eq!(query.longitude, 1.0);
        assert_eq!(query.start_date, "2024-06-15");
        assert_eq!(query.end_date, "2024-06-15");

        assert!(!state.session().is_active());
        assert!(state.session().vertices().is_empty());
    }

    #[test]
    fn test_begin_finish_without_active_source_skips_query() {
        let mut state = state_with(weather_source(false));
        draw_triangle(&mut state);

        let pending = state.begin_finish(now()).unwrap();
        assert!(pending.query.is_none());
        assert_eq!(pending.fallback_color, DEFAULT_POLYGON_COLOR);
    }

    #[test]
    fn test_range_mode_widens_fetch_window() {
        let mut state = state_with(weather_source(true));
        state.set_range_mode(true);
        draw_triangle(&mut state);

        let query = state.begin_finish(now()).unwrap().query.unwrap();
        assert_eq!(query.start_date, "2024-05-31");
        assert_eq!(query.end_date, "2024-06-30");
    }

    #[test]
    fn test_polygon_ids_are_unique_within_a_millisecond() {
        let mut state = state_with(weather_source(true));
        draw_triangle(&mut state);
        let first = state.begin_finish(now()).unwrap();
        draw_triangle(&mut state);
        let second = state.begin_finish(now()).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_complete_remove_and_recolor() {
        let mut state = state_with(weather_source(true));
        draw_triangle(&mut state);
        let pending = state.begin_finish(now()).unwrap();
        let id = state
            .complete_polygon(pending, "#ef4444".to_string())
            .unwrap()
            .id()
            .to_string();

        assert_eq!(state.polygons().len(), 1);
        assert_eq!(state.polygons_at(Vertex::new(0.5, 0.5).unwrap()).len(), 1);
        assert!(state.polygons_at(Vertex::new(5.0, 5.0).unwrap()).is_empty());

        let recolored = state.update_polygon_color(&id, "#000000".to_string()).unwrap();
        assert_eq!(recolored.color(), "#000000");

        state.remove_polygon(&id).unwrap();
        assert!(state.polygons().is_empty());
        assert_eq!(
            state.remove_polygon(&id).unwrap_err(),
            DashboardError::UnknownPolygon(id)
        );
    }

    #[test]
    fn test_set_time_range_rejects_inverted_range() {
        let mut state = state_with(weather_source(true));
        let before = state.time_range();
        let inverted = TimeRange {
            start: before.end,
            end: before.start,
            current: before.current,
        };
        assert!(matches!(
            state.set_time_range(inverted),
            Err(DashboardError::TimeRange(_))
        ));
        assert_eq!(state.time_range(), before);
    }

    fn click(latitude: f64, longitude: f64) -> MapEvent {
        MapEvent::VertexClick {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_map_events() {
        let mut state = state_with(weather_source(true));

        assert_eq!(
            state.apply_map_event(click(1.0, 1.0)),
            Ok(MapEventOutcome::Ignored)
        );
        assert!(state.session().vertices().is_empty());

        state.start_drawing();
        assert_eq!(
            state.apply_map_event(click(1.0, 1.0)),
            Ok(MapEventOutcome::VertexAdded)
        );
        assert_eq!(state.session().vertices().len(), 1);

        assert_eq!(
            state.apply_map_event(MapEvent::ViewChange {
                latitude: 48.0,
                longitude: 2.0,
                zoom: Some(12),
            }),
            Ok(MapEventOutcome::ViewChanged)
        );
        assert_eq!(state.view().center.latitude, 48.0);
        assert_eq!(state.view().zoom, 12);

        assert_eq!(
            state.apply_map_event(MapEvent::ViewChange {
                latitude: 48.0,
                longitude: 2.0,
                zoom: Some(30),
            }),
            Err(DashboardError::InvalidZoom(30))
        );
    }

    #[test]
    fn test_click_near_start_closes_ring() {
        let mut state = state_with(weather_source(true));
        state.start_drawing();
        for (lat, lng) in [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
            assert_eq!(
                state.apply_map_event(click(lat, lng)),
                Ok(MapEventOutcome::VertexAdded)
            );
        }
        assert_eq!(
            state.apply_map_event(click(0.004, 0.004)),
            Ok(MapEventOutcome::RingClosed)
        );
    }

    #[test]
    fn test_twelfth_click_closes_ring() {
        let mut state = state_with(weather_source(true));
        state.start_drawing();
        for i in 0..11 {
            assert_eq!(
                state.apply_map_event(click(i as f64, 2.0 * i as f64)),
                Ok(MapEventOutcome::VertexAdded)
            );
        }
        assert_eq!(
            state.apply_map_event(click(40.0, 50.0)),
            Ok(MapEventOutcome::RingClosed)
        );
    }

    #[test]
    fn test_scene_reflects_state() {
        let mut state = state_with(weather_source(true));
        state.set_map_loading(false);
        state.start_drawing();
        state.add_drawing_vertex(Vertex::new(1.0, 2.0).unwrap()).unwrap();

        let scene = state.scene();
        assert!(!scene.is_loading);
        assert!(scene.is_drawing);
        assert_eq!(scene.drawing_vertices.len(), 1);
        assert!(scene.polygons.is_empty());
        assert_eq!(scene.view.zoom, 10);
    }
}

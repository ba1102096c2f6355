// Dashboard service - Use cases driven by the map widget and the sidebar
use crate::application::dashboard_state::{
    DashboardError, DashboardState, MapEventOutcome, PendingPolygon,
};
use crate::application::drawing_session::DrawingSnapshot;
use crate::application::series_repository::SeriesRepository;
use crate::domain::color_rule::{evaluate_color, ColorRule};
use crate::domain::data_source::DataSource;
use crate::domain::geometry::Vertex;
use crate::domain::map::{MapEvent, MapScene, PolygonView};
use crate::domain::polygon::Polygon;
use crate::domain::telemetry::mean_value;
use crate::domain::time_range::TimeRange;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct DashboardService {
    state: Arc<RwLock<DashboardState>>,
    repository: Arc<dyn SeriesRepository>,
}

impl DashboardService {
    pub fn new(state: DashboardState, repository: Arc<dyn SeriesRepository>) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            repository,
        }
    }

    pub async fn list_data_sources(&self) -> (String, Vec<DataSource>) {
        let state = self.state.read().await;
        let registry = state.registry();
        (registry.selected_id().to_string(), registry.list().to_vec())
    }

    pub async fn select_data_source(&self, id: &str) -> Result<(), DashboardError> {
        self.state.write().await.select_data_source(id)
    }

    pub async fn toggle_data_source(&self, id: &str) -> Result<DataSource, DashboardError> {
        let mut state = self.state.write().await;
        state.toggle_data_source(id).cloned()
    }

    pub async fn replace_color_rules(
        &self,
        id: &str,
        rules: Vec<ColorRule>,
    ) -> Result<DataSource, DashboardError> {
        let mut state = self.state.write().await;
        state.replace_color_rules(id, rules).cloned()
    }

    pub async fn replace_data_source(
        &self,
        source: DataSource,
    ) -> Result<DataSource, DashboardError> {
        let mut state = self.state.write().await;
        state.replace_data_source(source).cloned()
    }

    pub async fn time_range(&self) -> (TimeRange, bool) {
        let state = self.state.read().await;
        (state.time_range(), state.range_mode())
    }

    pub async fn set_time_range(&self, time_range: TimeRange) -> Result<(), DashboardError> {
        self.state.write().await.set_time_range(time_range)
    }

    pub async fn set_range_mode(&self, range_mode: bool) {
        self.state.write().await.set_range_mode(range_mode);
    }

    pub async fn drawing(&self) -> DrawingSnapshot {
        self.state.read().await.session().snapshot()
    }

    pub async fn start_drawing(&self) -> DrawingSnapshot {
        let mut state = self.state.write().await;
        state.start_drawing();
        state.session().snapshot()
    }

    pub async fn add_drawing_vertex(
        &self,
        vertex: Vertex,
    ) -> Result<DrawingSnapshot, DashboardError> {
        let mut state = self.state.write().await;
        state.add_drawing_vertex(vertex)?;
        Ok(state.session().snapshot())
    }

    pub async fn cancel_drawing(&self) -> DrawingSnapshot {
        let mut state = self.state.write().await;
        state.cancel_drawing();
        state.session().snapshot()
    }

    /// Finishes the current drawing session.
    ///
    /// Returns `None` when the session has fewer than three vertices. The
    /// state lock is released while the reading is fetched, so overlapping
    /// finishes append their polygons in completion order.
    pub async fn finish_polygon(&self) -> Option<Polygon> {
        let pending = self.state.write().await.begin_finish(Utc::now())?;
        self.complete_pending(pending).await
    }

    async fn complete_pending(&self, pending: PendingPolygon) -> Option<Polygon> {
        let color = self.resolve_color(&pending).await;

        let mut state = self.state.write().await;
        state.complete_polygon(pending, color).cloned()
    }

    /// Mean reading at the centroid mapped through the source's rules.
    /// Fetch failures and empty series fall back to the source's first rule
    /// color and never fail the finish.
    async fn resolve_color(&self, pending: &PendingPolygon) -> String {
        let Some(query) = &pending.query else {
            tracing::warn!(
                "No active data source {} for polygon {}, using fallback color",
                pending.data_source,
                pending.id
            );
            return pending.fallback_color.clone();
        };

        match self.repository.fetch_series(query).await {
            Ok(points) => match mean_value(&points) {
                Some(mean) => {
                    let span_ms = match (points.first(), points.last()) {
                        (Some(first), Some(last)) => last.time_ms - first.time_ms,
                        _ => 0,
                    };
                    tracing::debug!(
                        "Polygon {} mean {} = {} over {} points spanning {}h",
                        pending.id,
                        query.field,
                        mean,
                        points.len(),
                        span_ms / 3_600_000
                    );
                    evaluate_color(mean, &pending.rules)
                }
                None => {
                    tracing::warn!(
                        "Empty {} series for polygon {}, using fallback color",
                        query.field,
                        pending.id
                    );
                    pending.fallback_color.clone()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Error fetching {} for polygon {}: {:#}",
                    query.field,
                    pending.id,
                    e
                );
                pending.fallback_color.clone()
            }
        }
    }

    pub async fn list_polygons(&self) -> Vec<PolygonView> {
        let state = self.state.read().await;
        state.polygons().iter().map(PolygonView::from).collect()
    }

    pub async fn polygons_at(&self, point: Vertex) -> Vec<String> {
        let state = self.state.read().await;
        state
            .polygons_at(point)
            .into_iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    pub async fn update_polygon_color(
        &self,
        id: &str,
        color: String,
    ) -> Result<PolygonView, DashboardError> {
        let mut state = self.state.write().await;
        state.update_polygon_color(id, color).map(PolygonView::from)
    }

    pub async fn remove_polygon(&self, id: &str) -> Result<(), DashboardError> {
        let removed = self.state.write().await.remove_polygon(id)?;
        tracing::info!("Removed polygon {}", removed.id());
        Ok(())
    }

    /// Applies a map event. A click that closes the ring finishes the
    /// polygon through the same fetch and color path as `finish_polygon`
    /// and returns it.
    pub async fn apply_map_event(
        &self,
        event: MapEvent,
    ) -> Result<Option<Polygon>, DashboardError> {
        let pending = {
            let mut state = self.state.write().await;
            match state.apply_map_event(event)? {
                MapEventOutcome::RingClosed => state.begin_finish(Utc::now()),
                _ => None,
            }
        };

        match pending {
            Some(pending) => Ok(self.complete_pending(pending).await),
            None => Ok(None),
        }
    }

    pub async fn set_map_loading(&self, loading: bool) {
        self.state.write().await.set_map_loading(loading);
    }

    pub async fn scene(&self) -> MapScene {
        self.state.read().await.scene()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::data_source_registry::DataSourceRegistry;
    use crate::application::drawing_session::{DrawingError, SessionState};
    use crate::application::series_repository::SeriesQuery;
    use crate::domain::color_rule::RuleOperator;
    use crate::domain::map::MapView;
    use crate::domain::telemetry::TimeSeriesPoint;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Reply {
        Values(Vec<f64>),
        Failure,
    }

    struct StubRepository {
        reply: Reply,
        queries: Mutex<Vec<SeriesQuery>>,
    }

    impl StubRepository {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SeriesRepository for StubRepository {
        async fn fetch_series(&self, query: &SeriesQuery) -> anyhow::Result<Vec<TimeSeriesPoint>> {
            self.queries.lock().unwrap().push(query.clone());
            match &self.reply {
                Reply::Values(values) => Ok(values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| TimeSeriesPoint::new(i as i64, *v))
                    .collect()),
                Reply::Failure => anyhow::bail!("upstream unavailable"),
            }
        }
    }

    fn weather_source() -> DataSource {
        DataSource {
            id: "open-meteo-weather".to_string(),
            name: "Open-Meteo Weather".to_string(),
            field: "temperature_2m".to_string(),
            field_description: String::new(),
            color_rules: vec![
                ColorRule::new(RuleOperator::LessThan, 10.0, "#3b82f6", "< 10"),
                ColorRule::new(RuleOperator::LessThan, 25.0, "#f59e0b", "< 25"),
                ColorRule::new(RuleOperator::GreaterOrEqual, 25.0, "#ef4444", ">= 25"),
            ],
            api_endpoint: "http://localhost/archive".to_string(),
            is_active: true,
            is_required: true,
        }
    }

    fn service(repository: Arc<StubRepository>) -> DashboardService {
        let state = DashboardState::new(
            DataSourceRegistry::new(vec![weather_source()], "open-meteo-weather".to_string()),
            TimeRange::around(Utc::now(), 15),
            MapView {
                center: Vertex {
                    latitude: 52.528,
                    longitude: 13.41,
                },
                zoom: 10,
            },
        );
        DashboardService::new(state, repository)
    }

    async fn add(service: &DashboardService, latitude: f64, longitude: f64) {
        service
            .add_drawing_vertex(Vertex::new(latitude, longitude).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_finish_with_two_vertices_appends_nothing() {
        let repository = StubRepository::new(Reply::Values(vec![20.0]));
        let service = service(repository.clone());
        service.start_drawing().await;
        add(&service, 0.0, 0.0).await;
        add(&service, 1.0, 1.0).await;

        assert!(service.finish_polygon().await.is_none());
        assert!(service.list_polygons().await.is_empty());
        assert!(repository.queries.lock().unwrap().is_empty());

        let drawing = service.drawing().await;
        assert_eq!(drawing.state, SessionState::Active);
        assert_eq!(drawing.vertices.len(), 2);
    }

    #[tokio::test]
    async fn test_finish_appends_colored_polygon() {
        let repository = StubRepository::new(Reply::Values(vec![26.0, 30.0, 28.0]));
        let service = service(repository.clone());
        service.start_drawing().await;
        add(&service, 52.0, 13.0).await;
        add(&service, 52.0, 14.0).await;
        add(&service, 53.0, 13.5).await;

        let polygon = service.finish_polygon().await.unwrap();
        assert!(polygon.is_complete());
        assert_eq!(polygon.color(), "#ef4444");
        assert_eq!(polygon.data_source(), "open-meteo-weather");
        assert!((polygon.centroid().latitude - 157.0 / 3.0).abs() < 1e-9);
        assert!((polygon.centroid().longitude - 13.5).abs() < 1e-9);

        assert_eq!(service.list_polygons().await.len(), 1);
        let scene = service.scene().await;
        assert!(!scene.is_drawing);
        assert!(scene.drawing_vertices.is_empty());

        let queries = repository.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].field, "temperature_2m");
        assert!((queries[0].latitude - 157.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_first_rule_color() {
        let service = service(StubRepository::new(Reply::Failure));
        service.start_drawing().await;
        add(&service, 0.0, 0.0).await;
        add(&service, 0.0, 1.0).await;
        add(&service, 1.0, 0.0).await;

        let polygon = service.finish_polygon().await.unwrap();
        assert_eq!(polygon.color(), "#3b82f6");
    }

    #[tokio::test]
    async fn test_empty_series_falls_back_to_first_rule_color() {
        let service = service(StubRepository::new(Reply::Values(Vec::new())));
        service.start_drawing().await;
        add(&service, 0.0, 0.0).await;
        add(&service, 0.0, 1.0).await;
        add(&service, 1.0, 0.0).await;

        let polygon = service.finish_polygon().await.unwrap();
        assert_eq!(polygon.color(), "#3b82f6");
        assert_eq!(service.list_polygons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_thirteenth_vertex_rejected() {
        let service = service(StubRepository::new(Reply::Values(vec![1.0])));
        service.start_drawing().await;
        for i in 0..12 {
            add(&service, i as f64, 0.0).await;
        }

        let result = service
            .add_drawing_vertex(Vertex::new(40.0, 0.0).unwrap())
            .await;
        assert_eq!(
            result,
            Err(DashboardError::Drawing(DrawingError::CapacityReached { max: 12 }))
        );
        assert_eq!(service.scene().await.drawing_vertices.len(), 12);
    }

    #[tokio::test]
    async fn test_required_source_stays_active() {
        let service = service(StubRepository::new(Reply::Values(vec![1.0])));
        let source = service.toggle_data_source("open-meteo-weather").await.unwrap();
        assert!(source.is_active);

        let (_, sources) = service.list_data_sources().await;
        assert!(sources[0].is_active);
    }

    async fn click(
        service: &DashboardService,
        latitude: f64,
        longitude: f64,
    ) -> Option<Polygon> {
        service
            .apply_map_event(MapEvent::VertexClick {
                latitude,
                longitude,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_click_near_start_finishes_polygon() {
        let repository = StubRepository::new(Reply::Values(vec![12.0, 18.0]));
        let service = service(repository.clone());
        service.start_drawing().await;
        assert!(click(&service, 52.0, 13.0).await.is_none());
        assert!(click(&service, 52.0, 14.0).await.is_none());
        assert!(click(&service, 53.0, 13.5).await.is_none());

        let polygon = click(&service, 52.005, 13.005).await.unwrap();
        assert_eq!(polygon.vertices().len(), 4);
        assert_eq!(polygon.color(), "#f59e0b");
        assert_eq!(repository.queries.lock().unwrap().len(), 1);

        let drawing = service.drawing().await;
        assert_eq!(drawing.state, SessionState::Idle);
        assert!(drawing.vertices.is_empty());
        assert_eq!(service.list_polygons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_twelfth_click_finishes_polygon() {
        let service = service(StubRepository::new(Reply::Failure));
        service.start_drawing().await;
        for i in 0..11 {
            assert!(click(&service, i as f64, 2.0 * i as f64).await.is_none());
        }

        let polygon = click(&service, 40.0, 50.0).await.unwrap();
        assert_eq!(polygon.vertices().len(), 12);
        assert_eq!(polygon.color(), "#3b82f6");
        assert_eq!(service.drawing().await.state, SessionState::Idle);

        // The next click lands in an idle session instead of hitting the cap.
        assert!(click(&service, 1.0, 1.0).await.is_none());
        assert_eq!(service.list_polygons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_polygon() {
        let service = service(StubRepository::new(Reply::Values(vec![5.0])));
        service.start_drawing().await;
        add(&service, 0.0, 0.0).await;
        add(&service, 0.0, 1.0).await;
        add(&service, 1.0, 0.0).await;
        let polygon = service.finish_polygon().await.unwrap();
        assert_eq!(polygon.color(), "#3b82f6");

        assert_eq!(
            service.polygons_at(Vertex::new(0.2, 0.2).unwrap()).await,
            vec![polygon.id().to_string()]
        );
        service.remove_polygon(polygon.id()).await.unwrap();
        assert!(service.list_polygons().await.is_empty());
        assert!(service.remove_polygon(polygon.id()).await.is_err());
    }
}

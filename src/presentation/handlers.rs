// HTTP request handlers
use crate::application::dashboard_state::DashboardError;
use crate::application::data_source_registry::RegistryError;
use crate::application::drawing_session::{DrawingError, DrawingSnapshot};
use crate::domain::color_rule::ColorRule;
use crate::domain::data_source::DataSource;
use crate::domain::geometry::Vertex;
use crate::domain::map::{MapEvent, MapScene, PolygonView};
use crate::domain::time_range::TimeRange;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(error: DashboardError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DashboardError::Registry(RegistryError::UnknownSource(_))
            | DashboardError::UnknownPolygon(_) => StatusCode::NOT_FOUND,
            DashboardError::Drawing(DrawingError::NotDrawing)
            | DashboardError::Drawing(DrawingError::CapacityReached { .. }) => StatusCode::CONFLICT,
            DashboardError::Drawing(DrawingError::InvalidVertex(_))
            | DashboardError::Geometry(_)
            | DashboardError::TimeRange(_)
            | DashboardError::InvalidZoom(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        tracing::debug!("Request rejected with {}: {}", status, self.0);
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
pub struct DataSourcesResponse {
    pub selected: String,
    pub data_sources: Vec<DataSource>,
}

#[derive(Serialize)]
pub struct TimeRangeResponse {
    pub time_range: TimeRange,
    pub range_mode: bool,
}

#[derive(Deserialize)]
pub struct TimeRangeRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub current: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct RangeModeRequest {
    pub range_mode: bool,
}

#[derive(Deserialize)]
pub struct ColorRequest {
    pub color: String,
}

#[derive(Deserialize)]
pub struct LoadingRequest {
    pub loading: bool,
}

#[derive(Deserialize)]
pub struct PointQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_data_sources(State(state): State<Arc<AppState>>) -> Json<DataSourcesResponse> {
    let (selected, data_sources) = state.dashboard_service.list_data_sources().await;
    Json(DataSourcesResponse {
        selected,
        data_sources,
    })
}

/// Replace a data source wholesale; the path id wins over the body id.
pub async fn replace_data_source(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mut source): Json<DataSource>,
) -> Result<Json<DataSource>, ApiError> {
    source.id = id;
    Ok(Json(state.dashboard_service.replace_data_source(source).await?))
}

pub async fn replace_color_rules(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(rules): Json<Vec<ColorRule>>,
) -> Result<Json<DataSource>, ApiError> {
    Ok(Json(
        state
            .dashboard_service
            .replace_color_rules(&id, rules)
            .await?,
    ))
}

pub async fn toggle_data_source(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataSource>, ApiError> {
    Ok(Json(state.dashboard_service.toggle_data_source(&id).await?))
}

pub async fn select_data_source(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.dashboard_service.select_data_source(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_time_range(State(state): State<Arc<AppState>>) -> Json<TimeRangeResponse> {
    let (time_range, range_mode) = state.dashboard_service.time_range().await;
    Json(TimeRangeResponse {
        time_range,
        range_mode,
    })
}

pub async fn set_time_range(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TimeRangeRequest>,
) -> Result<StatusCode, ApiError> {
    let time_range = TimeRange::new(request.start, request.end, request.current)
        .map_err(DashboardError::from)?;
    state.dashboard_service.set_time_range(time_range).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_range_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RangeModeRequest>,
) -> StatusCode {
    state
        .dashboard_service
        .set_range_mode(request.range_mode)
        .await;
    StatusCode::NO_CONTENT
}

pub async fn get_drawing(State(state): State<Arc<AppState>>) -> Json<DrawingSnapshot> {
    Json(state.dashboard_service.drawing().await)
}

pub async fn start_drawing(State(state): State<Arc<AppState>>) -> Json<DrawingSnapshot> {
    Json(state.dashboard_service.start_drawing().await)
}

pub async fn add_drawing_vertex(
    State(state): State<Arc<AppState>>,
    Json(vertex): Json<Vertex>,
) -> Result<Json<DrawingSnapshot>, ApiError> {
    Ok(Json(state.dashboard_service.add_drawing_vertex(vertex).await?))
}

pub async fn cancel_drawing(State(state): State<Arc<AppState>>) -> Json<DrawingSnapshot> {
    Json(state.dashboard_service.cancel_drawing().await)
}

/// 201 with the new polygon, or 204 when the session is not ready to finish.
pub async fn finish_drawing(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard_service.finish_polygon().await {
        Some(polygon) => (StatusCode::CREATED, Json(PolygonView::from(&polygon))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn list_polygons(State(state): State<Arc<AppState>>) -> Json<Vec<PolygonView>> {
    Json(state.dashboard_service.list_polygons().await)
}

/// Ids of polygons containing the given point
pub async fn polygons_at(
    Query(point): Query<PointQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let point = Vertex::new(point.latitude, point.longitude).map_err(DashboardError::from)?;
    Ok(Json(state.dashboard_service.polygons_at(point).await))
}

pub async fn update_polygon_color(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ColorRequest>,
) -> Result<Json<PolygonView>, ApiError> {
    Ok(Json(
        state
            .dashboard_service
            .update_polygon_color(&id, request.color)
            .await?,
    ))
}

pub async fn remove_polygon(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.dashboard_service.remove_polygon(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn map_scene(State(state): State<Arc<AppState>>) -> Json<MapScene> {
    Json(state.dashboard_service.scene().await)
}

/// 201 with the polygon when the click closed the ring, otherwise 204.
pub async fn map_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MapEvent>,
) -> Result<Response, ApiError> {
    let response = match state.dashboard_service.apply_map_event(event).await? {
        Some(polygon) => (StatusCode::CREATED, Json(PolygonView::from(&polygon))).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

pub async fn set_map_loading(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadingRequest>,
) -> StatusCode {
    state
        .dashboard_service
        .set_map_loading(request.loading)
        .await;
    StatusCode::NO_CONTENT
}

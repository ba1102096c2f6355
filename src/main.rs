// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::dashboard_state::DashboardState;
use crate::application::data_source_registry::DataSourceRegistry;
use crate::domain::geometry::Vertex;
use crate::domain::map::MapView;
use crate::domain::time_range::TimeRange;
use crate::infrastructure::config::{load_dashboard_config, load_data_sources_config};
use crate::infrastructure::open_meteo_repository::OpenMeteoRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_drawing_vertex, cancel_drawing, finish_drawing, get_drawing, get_time_range,
    health_check, list_data_sources, list_polygons, map_event, map_scene, polygons_at,
    remove_polygon, replace_color_rules, replace_data_source, select_data_source,
    set_map_loading, set_range_mode, set_time_range, start_drawing, toggle_data_source,
    update_polygon_color,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let dashboard_config = load_dashboard_config()?;
    let data_sources_config = load_data_sources_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(OpenMeteoRepository::new(dashboard_config.fetch.timeout())?);

    // Seed dashboard state
    let registry = DataSourceRegistry::new(
        data_sources_config.data_sources,
        data_sources_config.selected,
    );
    let center = Vertex::new(
        dashboard_config.map.center_latitude,
        dashboard_config.map.center_longitude,
    )
    .context("Invalid map center in config")?;
    let state = DashboardState::new(
        registry,
        TimeRange::around(Utc::now(), dashboard_config.time_range.half_width_days),
        MapView {
            center,
            zoom: dashboard_config.map.zoom,
        },
    );

    // Create services (application layer)
    let dashboard_service = DashboardService::new(state, repository);

    // Create application state
    let state = Arc::new(AppState { dashboard_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/data-sources", get(list_data_sources))
        .route("/data-sources/:id", put(replace_data_source))
        .route("/data-sources/:id/rules", put(replace_color_rules))
        .route("/data-sources/:id/toggle", post(toggle_data_source))
        .route("/data-sources/:id/select", post(select_data_source))
        .route("/time-range", get(get_time_range).put(set_time_range))
        .route("/time-range/mode", put(set_range_mode))
        .route("/drawing", get(get_drawing))
        .route("/drawing/start", post(start_drawing))
        .route("/drawing/vertices", post(add_drawing_vertex))
        .route("/drawing/cancel", post(cancel_drawing))
        .route("/drawing/finish", post(finish_drawing))
        .route("/polygons", get(list_polygons))
        .route("/polygons/at", get(polygons_at))
        .route("/polygons/:id", delete(remove_polygon))
        .route("/polygons/:id/color", put(update_polygon_color))
        .route("/map/scene", get(map_scene))
        .route("/map/events", post(map_event))
        .route("/map/loading", put(set_map_loading))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = dashboard_config
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid server address {}", dashboard_config.server.addr))?;
    tracing::info!("Starting polygon-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

// Application layer - Use cases and state transitions
pub mod dashboard_service;
pub mod dashboard_state;
pub mod data_source_registry;
pub mod drawing_session;
pub mod series_repository;

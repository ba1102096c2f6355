// Presentation layer - HTTP surface for the dashboard front end
pub mod app_state;
pub mod handlers;

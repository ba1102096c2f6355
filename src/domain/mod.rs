// Domain layer - Pure models and calculations
pub mod color_rule;
pub mod data_source;
pub mod geometry;
pub mod map;
pub mod polygon;
pub mod telemetry;
pub mod time_range;

use crate::domain::data_source::DataSource;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    pub map: MapSettings,
    #[serde(default)]
    pub time_range: TimeRangeSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub addr: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FetchSettings {
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl FetchSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapSettings {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeRangeSettings {
    pub half_width_days: i64,
}

impl Default for TimeRangeSettings {
    fn default() -> Self {
        Self {
            half_width_days: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSourcesConfig {
    pub selected: String,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_data_sources_config() -> anyhow::Result<DataSourcesConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/data_sources"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

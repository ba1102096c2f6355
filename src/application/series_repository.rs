// Repository trait for the external time-series fetch
use crate::domain::telemetry::TimeSeriesPoint;
use async_trait::async_trait;

/// Everything needed to ask an upstream for one field at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub endpoint: String,
    pub field: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
}

#[async_trait]
pub trait SeriesRepository: Send + Sync {
    /// Fetch the series for `query.field`. A single attempt; no retries.
    async fn fetch_series(&self, query: &SeriesQuery) -> anyhow::Result<Vec<TimeSeriesPoint>>;
}

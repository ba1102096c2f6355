// Open-Meteo archive repository implementation
use crate::application::series_repository::{SeriesQuery, SeriesRepository};
use crate::domain::telemetry::TimeSeriesPoint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone)]
pub struct OpenMeteoRepository {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    #[serde(flatten)]
    fields: HashMap<String, serde_json::Value>,
}

impl OpenMeteoRepository {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    fn build_query_url(query: &SeriesQuery) -> String {
        let separator = if query.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}latitude={}&longitude={}&start_date={}&end_date={}&hourly={}",
            query.endpoint,
            separator,
            query.latitude,
            query.longitude,
            urlencoding::encode(&query.start_date),
            urlencoding::encode(&query.end_date),
            urlencoding::encode(&query.field)
        )
    }

    async fn execute_query(&self, query: &SeriesQuery) -> Result<ArchiveResponse> {
        let url = Self::build_query_url(query);
        tracing::debug!("Fetching series: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", query.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Series query failed with status {}: {}", status, body);
        }

        response
            .json::<ArchiveResponse>()
            .await
            .context("Failed to parse archive response")
    }

    /// Zips `hourly.time` with `hourly.<field>`, dropping null samples and
    /// unparseable timestamps.
    fn parse_hourly_series(response: ArchiveResponse, field: &str) -> Result<Vec<TimeSeriesPoint>> {
        let Some(hourly) = response.hourly else {
            return Ok(Vec::new());
        };

        let values = hourly
            .fields
            .get(field)
            .and_then(|v| v.as_array())
            .with_context(|| format!("Field {} missing from hourly data", field))?;

        let points = hourly
            .time
            .iter()
            .zip(values)
            .filter_map(|(time, value)| {
                let value = value.as_f64()?;
                let time = NaiveDateTime::parse_from_str(time, HOURLY_TIME_FORMAT).ok()?;
                Some(TimeSeriesPoint::new(time.and_utc().timestamp_millis(), value))
            })
            .collect();

        Ok(points)
    }
}

#[async_trait]
impl SeriesRepository for OpenMeteoRepository {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<Vec<TimeSeriesPoint>> {
        let response = self.execute_query(query).await?;
        let points = Self::parse_hourly_series(response, &query.field)?;
        tracing::debug!(
            "Got {} {} points at ({}, {})",
            points.len(),
            query.field,
            query.latitude,
            query.longitude
        );
        Ok(points)
    }
}

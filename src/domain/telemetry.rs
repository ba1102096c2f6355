// Time series returned by the external data fetch

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Arithmetic mean of the series, `None` when it is empty.
pub fn mean_value(points: &[TimeSeriesPoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64)
}

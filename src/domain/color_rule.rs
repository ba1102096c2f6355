// Threshold rules mapping a scalar reading to a display color
use serde::{Deserialize, Serialize};

/// Returned when no rule applies. Kept apart from every rule color so callers
/// can tell "unmatched" from a real match.
pub const UNMATCHED_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
}

impl RuleOperator {
    pub fn test(self, value: f64, threshold: f64) -> bool {
        match self {
            RuleOperator::LessThan => value < threshold,
            RuleOperator::LessOrEqual => value <= threshold,
            RuleOperator::Equal => value == threshold,
            RuleOperator::GreaterOrEqual => value >= threshold,
            RuleOperator::GreaterThan => value > threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub operator: RuleOperator,
    pub threshold: f64,
    pub color: String,
    #[serde(default)]
    pub label: String,
}

impl ColorRule {
    pub fn new(operator: RuleOperator, threshold: f64, color: &str, label: &str) -> Self {
        Self {
            operator,
            threshold,
            color: color.to_string(),
            label: label.to_string(),
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        self.operator.test(value, self.threshold)
    }
}

/// First rule, in ascending threshold order, whose test passes.
///
/// The sort is stable, so rules sharing a threshold are tried in the order
/// they were authored.
pub fn matching_rule(value: f64, rules: &[ColorRule]) -> Option<&ColorRule> {
    let mut sorted: Vec<&ColorRule> = rules.iter().collect();
    sorted.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
    sorted.into_iter().find(|rule| rule.matches(value))
}

pub fn evaluate_color(value: f64, rules: &[ColorRule]) -> String {
    matching_rule(value, rules)
        .map(|rule| rule.color.clone())
        .unwrap_or_else(|| UNMATCHED_COLOR.to_string())
}

// Data source domain model
use super::color_rule::ColorRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub field: String,
    #[serde(default)]
    pub field_description: String,
    #[serde(default)]
    pub color_rules: Vec<ColorRule>,
    pub api_endpoint: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_required: bool,
}

impl DataSource {
    /// Required sources may never be switched off once active.
    pub fn can_deactivate(&self) -> bool {
        !(self.is_required && self.is_active)
    }

    /// Color given to a polygon whose reading could not be resolved.
    pub fn fallback_color(&self) -> Option<&str> {
        self.color_rules.first().map(|rule| rule.color.as_str())
    }
}

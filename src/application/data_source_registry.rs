// Data source registry - In-memory catalogue of sources and their color rules
use crate::domain::color_rule::ColorRule;
use crate::domain::data_source::DataSource;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown data source {0}")]
    UnknownSource(String),
}

#[derive(Debug, Clone)]
pub struct DataSourceRegistry {
    sources: Vec<DataSource>,
    selected: String,
}

impl DataSourceRegistry {
    /// `selected` is not checked against `sources`; a dangling selection just
    /// means nothing is active for drawing.
    pub fn new(sources: Vec<DataSource>, selected: String) -> Self {
        Self { sources, selected }
    }

    pub fn list(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn selected_id(&self) -> &str {
        &self.selected
    }

    /// The selected source, provided it is switched on.
    pub fn active_for_drawing(&self) -> Option<&DataSource> {
        self.get(&self.selected).filter(|s| s.is_active)
    }

    pub fn select(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.get(id).is_none() {
            return Err(RegistryError::UnknownSource(id.to_string()));
        }
        self.selected = id.to_string();
        Ok(())
    }

    /// Flips `is_active`. A required source that is currently on stays on.
    pub fn toggle(&mut self, id: &str) -> Result<&DataSource, RegistryError> {
        let index = self.index_of(id)?;
        let current = &self.sources[index];

        if !current.can_deactivate() {
            tracing::warn!("Refusing to deactivate required data source {}", id);
            return Ok(&self.sources[index]);
        }

        let updated = DataSource {
            is_active: !current.is_active,
            ..current.clone()
        };
        self.sources[index] = updated;
        Ok(&self.sources[index])
    }

    pub fn replace_rules(
        &mut self,
        id: &str,
        rules: Vec<ColorRule>,
    ) -> Result<&DataSource, RegistryError> {
        let index = self.index_of(id)?;
        let updated = DataSource {
            color_rules: rules,
            ..self.sources[index].clone()
        };
        self.sources[index] = updated;
        Ok(&self.sources[index])
    }

    /// Whole-value replacement keyed by `source.id`. The required flag and an
    /// active required source survive the replacement.
    pub fn replace(&mut self, mut source: DataSource) -> Result<&DataSource, RegistryError> {
        let index = self.index_of(&source.id)?;
        let current = &self.sources[index];

        if current.is_required {
            source.is_required = true;
            if current.is_active && !source.is_active {
                tracing::warn!(
                    "Keeping required data source {} active during replacement",
                    source.id
                );
                source.is_active = true;
            }
        }

        self.sources[index] = source;
        Ok(&self.sources[index])
    }

    fn index_of(&self, id: &str) -> Result<usize, RegistryError> {
        self.sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RegistryError::UnknownSource(id.to_string()))
    }
}

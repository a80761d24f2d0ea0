use serde::{Deserialize, Serialize};

/// Mapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Cache resolved entity metadata per type
    pub cache_metadata: bool,

    /// Log a warning when a column subset names a column no field maps to
    pub warn_on_unknown_columns: bool,
}

impl MapperConfig {
    /// Create a configuration with the defaults
    pub fn new() -> Self {
        Self {
            cache_metadata: true,
            warn_on_unknown_columns: true,
        }
    }

    /// Enable or disable the metadata cache
    pub fn cache_metadata(mut self, enabled: bool) -> Self {
        self.cache_metadata = enabled;
        self
    }

    /// Enable or disable warnings for unknown subset columns
    pub fn warn_on_unknown_columns(mut self, enabled: bool) -> Self {
        self.warn_on_unknown_columns = enabled;
        self
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Entity type column conventions.

use serde::{Deserialize, Serialize};

/// Column conventions of the entity type a batch belongs to.
///
/// Batches are keyed by entity id and timestamp; functions that need the time
/// axis (the shift calendar) read the column name from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// Logical entity type name (e.g., "robot").
    #[serde(default = "default_name")]
    pub name: String,
    /// Name of the timestamp column.
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    /// Name of the entity id column.
    #[serde(default = "default_entity_id_column")]
    pub entity_id_column: String,
}

impl EntityType {
    /// Create an entity type with default column names.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the timestamp column name.
    #[must_use]
    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = column.into();
        self
    }

    /// Set the entity id column name.
    #[must_use]
    pub fn with_entity_id_column(mut self, column: impl Into<String>) -> Self {
        self.entity_id_column = column.into();
        self
    }
}

impl Default for EntityType {
    fn default() -> Self {
        Self {
            name: default_name(),
            timestamp_column: default_timestamp_column(),
            entity_id_column: default_entity_id_column(),
        }
    }
}

fn default_name() -> String {
    "entity".to_string()
}

fn default_timestamp_column() -> String {
    "evt_timestamp".to_string()
}

fn default_entity_id_column() -> String {
    "deviceid".to_string()
}

//! Catalog metadata declared by each function.
//!
//! The external catalog reads this to register a function: which logical
//! parameters it takes, which of them are constants rather than per-row data,
//! what it outputs, and how outputs should be classified.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Broad classification of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCategory {
    /// Produces derived columns.
    Transformer,
    /// Produces detection signals (alerts).
    Event,
}

impl FunctionCategory {
    /// Returns a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Transformer => "Transformer",
            Self::Event => "Event",
        }
    }
}

/// Tag attached to a function or one of its output items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemTag {
    /// Alert/event-type function or output.
    Event,
    /// Dimension-like (non-measure) output.
    Dimension,
}

impl ItemTag {
    /// The tag as the catalog spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "EVENT",
            Self::Dimension => "DIMENSION",
        }
    }
}

/// Static registration metadata for a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Catalog name (e.g., "AlertHighValue").
    pub name: String,
    /// One-line description shown in the catalog.
    pub description: String,
    pub category: FunctionCategory,
    /// Function-level tags.
    #[serde(default)]
    pub tags: Vec<ItemTag>,
    /// Logical input parameter names.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// The subset of `inputs` that are constants rather than data items.
    #[serde(default)]
    pub constants: Vec<String>,
    /// Inputs that may be omitted.
    #[serde(default)]
    pub optional_items: Vec<String>,
    /// Logical output parameter names.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Tags per output parameter.
    #[serde(default)]
    pub item_tags: BTreeMap<String, Vec<ItemTag>>,
}

impl FunctionMetadata {
    /// Create metadata with no parameters.
    pub fn new(
        name: impl Into<String>,
        category: FunctionCategory,
        description: impl Into<String>,
    ) -> Self {
        let tags = match category {
            FunctionCategory::Event => vec![ItemTag::Event],
            FunctionCategory::Transformer => Vec::new(),
        };
        Self {
            name: name.into(),
            description: description.into(),
            category,
            tags,
            inputs: Vec::new(),
            constants: Vec::new(),
            optional_items: Vec::new(),
            outputs: Vec::new(),
            item_tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_inputs(mut self, names: &[&str]) -> Self {
        self.inputs = to_strings(names);
        self
    }

    #[must_use]
    pub fn with_constants(mut self, names: &[&str]) -> Self {
        self.constants = to_strings(names);
        self
    }

    #[must_use]
    pub fn with_optional_items(mut self, names: &[&str]) -> Self {
        self.optional_items = to_strings(names);
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, names: &[&str]) -> Self {
        self.outputs = to_strings(names);
        self
    }

    /// Tag an output item.
    #[must_use]
    pub fn with_item_tag(mut self, item: &str, tag: ItemTag) -> Self {
        let tags = self.item_tags.entry(item.to_string()).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        self
    }

    /// Whether the catalog should treat this function as an alert/event.
    pub fn is_event(&self) -> bool {
        self.tags.contains(&ItemTag::Event)
    }

    /// Inputs that refer to per-row data rather than constants.
    pub fn data_inputs(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|name| !self.constants.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Tags declared for an output item.
    pub fn tags_for(&self, item: &str) -> &[ItemTag] {
        self.item_tags.get(item).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_category_carries_event_tag() {
        let meta = FunctionMetadata::new("AlertExpression", FunctionCategory::Event, "alert")
            .with_inputs(&["input_items", "expression"])
            .with_constants(&["expression"])
            .with_outputs(&["alert_name"]);

        assert!(meta.is_event());
        assert_eq!(meta.data_inputs(), vec!["input_items"]);
    }

    #[test]
    fn item_tags_are_deduplicated() {
        let meta = FunctionMetadata::new("ShiftCalendar", FunctionCategory::Transformer, "")
            .with_item_tag("shift_id", ItemTag::Dimension)
            .with_item_tag("shift_id", ItemTag::Dimension);

        assert!(!meta.is_event());
        assert_eq!(meta.tags_for("shift_id"), &[ItemTag::Dimension]);
        assert!(meta.tags_for("shift_end_date").is_empty());
    }

    #[test]
    fn serializes_tags_in_catalog_spelling() {
        let meta = FunctionMetadata::new("AlertLowValue", FunctionCategory::Event, "");
        let json = serde_json::to_value(&meta).expect("serialize metadata");
        assert_eq!(json["tags"][0], "EVENT");
        assert_eq!(json["category"], "event");
    }
}

//! View input scrubbing
//!
//! Replaces the values of sensitive view-event fields with a redaction
//! marker before the event enters the buffer. Field names match
//! case-insensitively at any depth of the body. Values are replaced, never
//! removed, so the body keeps its shape.

use std::collections::{BTreeSet, HashSet};

use crashlens_core::domain::{DynamicRecord, ValueNode};

/// Replacement written over scrubbed values.
pub const SCRUBBED_MARKER: &str = "[scrubbed]";

/// Scrubs configured field names from records.
#[derive(Debug, Clone, Default)]
pub struct Scrubber {
    enabled: bool,
    fields: HashSet<String>,
}

impl Scrubber {
    pub fn new(enabled: bool, fields: &BTreeSet<String>) -> Self {
        Self {
            enabled,
            fields: fields.iter().map(|f| f.trim().to_lowercase()).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.fields.is_empty()
    }

    fn matches(&self, key: &str) -> bool {
        self.fields.contains(&key.to_lowercase())
    }

    /// Scrubs `record`, returning it with the number of replaced values.
    pub fn scrub(&self, record: DynamicRecord) -> (DynamicRecord, usize) {
        if !self.is_active() {
            return (record, 0);
        }
        let mut root = record.into_value();
        let count = self.scrub_node(&mut root);
        // Replacing values with strings keeps the tree transferable.
        (DynamicRecord::from_value(root).unwrap_or_default(), count)
    }

    fn scrub_node(&self, node: &mut ValueNode) -> usize {
        match node {
            ValueNode::Object(map) => map
                .iter_mut()
                .map(|(key, value)| {
                    if self.matches(key) {
                        *value = ValueNode::String(SCRUBBED_MARKER.to_string());
                        1
                    } else {
                        self.scrub_node(value)
                    }
                })
                .sum(),
            ValueNode::Array(items) => items.iter_mut().map(|item| self.scrub_node(item)).sum(),
            _ => 0,
        }
    }
}

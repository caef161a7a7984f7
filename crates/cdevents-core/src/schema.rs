//! Schema association for event types.
//!
//! Validation itself is left to an external JSON-Schema validator; this
//! module only names each event type's schema and looks up its text.

use std::collections::HashMap;

use crate::type_id::{TypeIdentifier, UNDEFINED_PREDICATE, UNDEFINED_SUBJECT};

/// Version of the event specification produced by this crate.
pub const SPEC_VERSION: &str = "0.4.1";

pub const SCHEMA_BASE_URL: &str = "https://cdevents.dev";

/// `<base>/<spec_version>/schema/<subject>-<predicate>-event`
pub fn schema_url(spec_version: &str, event_type: &TypeIdentifier) -> String {
    let subject = if event_type.subject.is_empty() {
        UNDEFINED_SUBJECT
    } else {
        event_type.subject.as_str()
    };
    let predicate = if event_type.predicate.is_empty() {
        UNDEFINED_PREDICATE
    } else {
        event_type.predicate.as_str()
    };
    format!("{SCHEMA_BASE_URL}/{spec_version}/schema/{subject}-{predicate}-event")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub url: String,
    pub text: String,
}

/// Source of schema text keyed by event type.
pub trait SchemaSource {
    fn schema_for(&self, event_type: &TypeIdentifier) -> Option<&SchemaEntry>;
}

/// In-memory schema source, filled once and then only read.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register schema text under the default schema URL for `event_type`.
    pub fn register(&mut self, event_type: &TypeIdentifier, text: impl Into<String>) {
        let url = schema_url(SPEC_VERSION, event_type);
        self.register_with_url(event_type, url, text);
    }

    pub fn register_with_url(
        &mut self,
        event_type: &TypeIdentifier,
        url: impl Into<String>,
        text: impl Into<String>,
    ) {
        let key = event_type.to_string();
        tracing::debug!(event_type = %key, "registered schema");
        self.entries.insert(
            key,
            SchemaEntry {
                url: url.into(),
                text: text.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaSource for SchemaRegistry {
    fn schema_for(&self, event_type: &TypeIdentifier) -> Option<&SchemaEntry> {
        self.entries.get(&event_type.to_string())
    }
}

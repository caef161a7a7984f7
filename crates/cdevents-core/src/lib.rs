//! Typed, versioned continuous-delivery events.
//!
//! Producers build a [`CDEvent`] for a concrete content type and serialize
//! it; consumers parse arbitrary JSON into a [`RawEvent`] and narrow it,
//! either directly with [`RawEvent::into_typed`] or through
//! [`BuiltinEvent::from_raw`].
//!
//! ```
//! use cdevents_core::catalog::PipelineRunQueued;
//! use cdevents_core::{BuiltinEvent, CDEvent, EventReference, Link};
//!
//! let mut event = CDEvent::<PipelineRunQueued>::new();
//! event.set_source("/ci/pipelines");
//! event.set_subject_id("run-42");
//! event.add_link(Link::path(EventReference::new("previous-event-id")));
//!
//! let json = event.to_json().unwrap();
//! let parsed = BuiltinEvent::from_json(&json).unwrap();
//! assert!(matches!(parsed, BuiltinEvent::PipelineRunQueued(_)));
//! ```

pub mod catalog;
pub mod custom_data;
pub mod error;
pub mod event;
pub mod links;
pub mod schema;
pub mod type_id;

pub use catalog::BuiltinEvent;
pub use custom_data::{CustomData, CustomDataPayload};
pub use error::{Error, Result};
pub use event::{CDEvent, Context, EventContent, RawEvent, Subject};
pub use links::{EventReference, Link, LinkSet, LinkType, Tags};
pub use schema::{SPEC_VERSION, SchemaEntry, SchemaRegistry, SchemaSource};
pub use type_id::TypeIdentifier;

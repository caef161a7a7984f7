//! Event envelope and the contract event types plug into.
//!
//! Every event serializes as:
//!
//! ```json
//! {
//!   "context": {"version": "0.4.1", "id": "...", "source": "...", "type": "dev.cdevents.pipelinerun.queued.0.2.0", "timestamp": "...", "links": [...]},
//!   "subject": {"id": "...", "source": "...", "type": "pipelineRun", "content": {...}},
//!   "customData": ...,
//!   "customDataContentType": "..."
//! }
//! ```
//!
//! An event type only supplies its identity (see [`EventContent`]) and a
//! content struct. The envelope's `type`, `links` and custom data fields go
//! through the codecs in [`crate::type_id`], [`crate::links`] and
//! [`crate::custom_data`]; the content struct uses plain serde.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::custom_data::{CustomData, CustomDataPayload};
use crate::error::{Error, Result};
use crate::links::{Link, LinkSet};
use crate::schema::{self, SPEC_VERSION, SchemaEntry, SchemaSource};
use crate::type_id::TypeIdentifier;

/// Implemented by the content struct of every concrete event type.
pub trait EventContent: Serialize + DeserializeOwned + Clone + fmt::Debug + Default {
    /// Subject segment of the event type (e.g. "pipelinerun").
    const SUBJECT: &'static str;
    /// Predicate segment of the event type (e.g. "queued").
    const PREDICATE: &'static str;
    /// Version of the event type.
    const VERSION: &'static str;
    /// Value of `subject.type` (e.g. "pipelineRun").
    const SUBJECT_TYPE: &'static str;

    fn event_type() -> TypeIdentifier {
        TypeIdentifier::new(Self::SUBJECT, Self::PREDICATE, Self::VERSION)
    }

    fn schema_url() -> String {
        schema::schema_url(SPEC_VERSION, &Self::event_type())
    }
}

/// Envelope metadata shared by all events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Spec version the event conforms to.
    pub version: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: TypeIdentifier,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinkSet>,
}

/// What the event is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject<C> {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", default)]
    pub subject_type: String,
    pub content: C,
}

/// A complete event with content of type `C`.
#[derive(Debug, Clone, PartialEq)]
pub struct CDEvent<C> {
    context: Context,
    subject: Subject<C>,
    custom_data: CustomData,
}

/// An event whose content has not been narrowed to a concrete type.
pub type RawEvent = CDEvent<Value>;

impl<C: EventContent> CDEvent<C> {
    /// New event with a random id, the current time and `C`'s type.
    pub fn new() -> Self {
        Self::from_parts(C::event_type(), C::SUBJECT_TYPE, C::default())
    }

    /// Parse an event of type `C`. The incoming type must be compatible
    /// with `C::event_type()`.
    pub fn from_json(json: &str) -> Result<Self> {
        RawEvent::parse(json)?.into_typed()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        RawEvent::parse_value(value)?.into_typed()
    }

    pub fn schema_url(&self) -> String {
        C::schema_url()
    }
}

impl<C: EventContent> Default for CDEvent<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl RawEvent {
    /// New untyped event, e.g. for a custom-namespace type.
    pub fn with_type(event_type: TypeIdentifier, subject_type: impl Into<String>) -> Self {
        Self::from_parts(event_type, subject_type, Value::Object(Default::default()))
    }

    /// Parse any event, standard or custom, without narrowing its content.
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::parse_value(value)
    }

    pub fn parse_value(value: Value) -> Result<Self> {
        require_object(&value, "an event object")?;
        if let Value::Object(fields) = &value {
            if let Some(context) = fields.get("context") {
                require_object(context, "a context object")?;
            }
            if let Some(subject) = fields.get("subject") {
                require_object(subject, "a subject object")?;
            }
        }
        let wire: WireEnvelope = serde_json::from_value(value)?;
        let WireContext {
            version,
            id,
            source,
            event_type,
            timestamp,
            schema_uri,
            chain_id,
            links,
        } = wire.context;

        let event_type = TypeIdentifier::parse(event_type.as_deref().unwrap_or_default())?;
        let links = links.map(LinkSet::from_value).transpose()?;
        let custom_data =
            CustomData::decode(wire.custom_data_content_type.as_deref(), wire.custom_data)?;

        tracing::debug!(event_type = %event_type, id = %id, "decoded event");

        Ok(Self {
            context: Context {
                version,
                id,
                source,
                event_type,
                timestamp,
                schema_uri,
                chain_id,
                links,
            },
            subject: wire.subject,
            custom_data,
        })
    }

    /// Narrow the content to `C`.
    pub fn into_typed<C: EventContent>(self) -> Result<CDEvent<C>> {
        let expected = C::event_type();
        if !expected.is_compatible(&self.context.event_type) {
            tracing::debug!(
                expected = %expected,
                found = %self.context.event_type,
                "incompatible event type"
            );
            return Err(Error::IncompatibleEventType {
                expected: expected.to_string(),
                found: self.context.event_type.to_string(),
            });
        }
        let content = C::deserialize(self.subject.content)?;
        Ok(CDEvent {
            context: self.context,
            subject: Subject {
                id: self.subject.id,
                source: self.subject.source,
                subject_type: self.subject.subject_type,
                content,
            },
            custom_data: self.custom_data,
        })
    }
}

impl<C> CDEvent<C> {
    fn from_parts(event_type: TypeIdentifier, subject_type: impl Into<String>, content: C) -> Self {
        Self {
            context: Context {
                version: SPEC_VERSION.to_string(),
                id: Uuid::new_v4().to_string(),
                source: String::new(),
                event_type,
                timestamp: Utc::now(),
                schema_uri: None,
                chain_id: None,
                links: None,
            },
            subject: Subject {
                id: String::new(),
                source: None,
                subject_type: subject_type.into(),
                content,
            },
            custom_data: CustomData::default(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn subject(&self) -> &Subject<C> {
        &self.subject
    }

    pub fn event_type(&self) -> &TypeIdentifier {
        &self.context.event_type
    }

    pub fn spec_version(&self) -> &str {
        &self.context.version
    }

    pub fn id(&self) -> &str {
        &self.context.id
    }

    pub fn source(&self) -> &str {
        &self.context.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.context.timestamp
    }

    pub fn chain_id(&self) -> Option<&str> {
        self.context.chain_id.as_deref()
    }

    pub fn schema_uri(&self) -> Option<&str> {
        self.context.schema_uri.as_deref()
    }

    pub fn links(&self) -> Option<&LinkSet> {
        self.context.links.as_ref()
    }

    pub fn subject_id(&self) -> &str {
        &self.subject.id
    }

    pub fn subject_source(&self) -> Option<&str> {
        self.subject.source.as_deref()
    }

    pub fn content(&self) -> &C {
        &self.subject.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.subject.content
    }

    pub fn into_content(self) -> C {
        self.subject.content
    }

    pub fn custom_data(&self) -> &CustomData {
        &self.custom_data
    }

    /// Decode structured custom data into `T`.
    pub fn custom_data_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.custom_data.decode_as()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.context.id = id.into();
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.context.source = source.into();
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.context.timestamp = timestamp;
    }

    pub fn set_chain_id(&mut self, chain_id: impl Into<String>) {
        self.context.chain_id = Some(chain_id.into());
    }

    pub fn set_schema_uri(&mut self, schema_uri: impl Into<String>) {
        self.context.schema_uri = Some(schema_uri.into());
    }

    pub fn set_subject_id(&mut self, id: impl Into<String>) {
        self.subject.id = id.into();
    }

    pub fn set_subject_source(&mut self, source: impl Into<String>) {
        self.subject.source = Some(source.into());
    }

    pub fn set_content(&mut self, content: C) {
        self.subject.content = content;
    }

    /// Append a link, creating the link set on first use.
    pub fn add_link(&mut self, link: Link) {
        self.context.links.get_or_insert_with(LinkSet::new).push(link);
    }

    pub fn set_links(&mut self, links: LinkSet) {
        self.context.links = Some(links);
    }

    pub fn set_custom_data(&mut self, custom_data: CustomData) {
        self.custom_data = custom_data;
    }

    /// Attach custom data after checking it against `content_type`.
    pub fn set_custom_data_payload(
        &mut self,
        content_type: impl Into<String>,
        payload: CustomDataPayload,
    ) -> Result<()> {
        self.custom_data = CustomData::new(content_type, payload)?;
        Ok(())
    }

    /// Schema URL and text for an external validator, looked up by the
    /// event's own type.
    pub fn schema_data<'a, S: SchemaSource>(&self, source: &'a S) -> Option<&'a SchemaEntry> {
        source.schema_for(&self.context.event_type)
    }
}

impl<C: Serialize> CDEvent<C> {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Erase the content type.
    pub fn into_raw(self) -> Result<RawEvent> {
        let content = serde_json::to_value(&self.subject.content)?;
        Ok(CDEvent {
            context: self.context,
            subject: Subject {
                id: self.subject.id,
                source: self.subject.source,
                subject_type: self.subject.subject_type,
                content,
            },
            custom_data: self.custom_data,
        })
    }
}

impl<C: Serialize> Serialize for CDEvent<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireEnvelopeRef {
            context: &self.context,
            subject: &self.subject,
            custom_data: self.custom_data.encoded_value(),
            custom_data_content_type: self.custom_data.wire_content_type(),
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelopeRef<'a, C> {
    context: &'a Context,
    subject: &'a Subject<C>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_data_content_type: Option<&'a str>,
}

// Derived struct decoders also accept positional arrays.
fn require_object(value: &Value, expected: &'static str) -> Result<()> {
    use serde::de::{Error as _, Unexpected};

    let unexpected = match value {
        Value::Object(_) => return Ok(()),
        Value::Array(_) => Unexpected::Seq,
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
    };
    Err(Error::MalformedInput(serde_json::Error::invalid_type(unexpected, &expected)))
}

// Decoded in two stages so the codec errors keep their kind instead of
// being folded into a generic serde error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    context: WireContext,
    subject: Subject<Value>,
    #[serde(default)]
    custom_data: Option<Value>,
    #[serde(default)]
    custom_data_content_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContext {
    version: String,
    id: String,
    source: String,
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    schema_uri: Option<String>,
    #[serde(default)]
    chain_id: Option<String>,
    #[serde(default)]
    links: Option<Value>,
}

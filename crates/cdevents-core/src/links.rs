//! Links between events.
//!
//! On the wire `context.links` is a JSON array whose elements take one of
//! three shapes, selected by the `linkType` discriminator:
//!
//! ```json
//! [
//!   {"linkType": "PATH", "from": {"contextId": "a"}},
//!   {"linkType": "END", "from": {"contextId": "b"}, "tags": {"k": "v"}},
//!   {"linkType": "RELATION", "target": {"contextId": "c"}, "linkKind": "depends"}
//! ]
//! ```
//!
//! Decoding peeks the discriminator first and then decodes the element as
//! exactly that shape. Fields belonging to another shape are rejected, and
//! one bad element fails the whole array.

use std::collections::BTreeMap;

use serde::de::{Error as _, IgnoredAny};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Free-form annotations attached to a link.
pub type Tags = BTreeMap<String, String>;

/// Discriminator values of the `linkType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Path,
    End,
    Relation,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Path => "PATH",
            LinkType::End => "END",
            LinkType::Relation => "RELATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PATH" => Some(LinkType::Path),
            "END" => Some(LinkType::End),
            "RELATION" => Some(LinkType::Relation),
            _ => None,
        }
    }
}

/// Reference to another event by its context id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventReference {
    pub context_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_source: Option<String>,
}

impl EventReference {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
            context_source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.context_source = Some(source.into());
        self
    }
}

/// A single link record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// A causal step: this event follows `from`.
    Path { from: EventReference, tags: Tags },
    /// Terminates the chain that `from` belongs to.
    End { from: EventReference, tags: Tags },
    /// A named, non-causal relation to `target`.
    Relation {
        target: EventReference,
        link_kind: String,
        tags: Tags,
    },
}

impl Link {
    pub fn path(from: EventReference) -> Self {
        Link::Path {
            from,
            tags: Tags::new(),
        }
    }

    pub fn end(from: EventReference) -> Self {
        Link::End {
            from,
            tags: Tags::new(),
        }
    }

    pub fn relation(target: EventReference, link_kind: impl Into<String>) -> Self {
        Link::Relation {
            target,
            link_kind: link_kind.into(),
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags_mut().insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        *self.tags_mut() = tags;
        self
    }

    pub fn link_type(&self) -> LinkType {
        match self {
            Link::Path { .. } => LinkType::Path,
            Link::End { .. } => LinkType::End,
            Link::Relation { .. } => LinkType::Relation,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Link::Path { tags, .. } | Link::End { tags, .. } | Link::Relation { tags, .. } => tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Link::Path { tags, .. } | Link::End { tags, .. } | Link::Relation { tags, .. } => tags,
        }
    }

    /// Decode one array element.
    pub fn from_value(value: Value) -> Result<Self> {
        let discriminator = Discriminator::deserialize(&value)?;
        let link_type = match discriminator.link_type {
            Some(Value::String(s)) => LinkType::parse(&s).ok_or(Error::UnknownLinkType(s))?,
            Some(other) => return Err(Error::UnknownLinkType(other.to_string())),
            None => return Err(Error::UnknownLinkType("<missing>".to_string())),
        };

        let link = match link_type {
            LinkType::Path => {
                let wire: FromWire = serde_json::from_value(value)?;
                Link::Path {
                    from: wire.from,
                    tags: wire.tags.unwrap_or_default(),
                }
            }
            LinkType::End => {
                let wire: FromWire = serde_json::from_value(value)?;
                Link::End {
                    from: wire.from,
                    tags: wire.tags.unwrap_or_default(),
                }
            }
            LinkType::Relation => {
                let wire: RelationWire = serde_json::from_value(value)?;
                Link::Relation {
                    target: wire.target,
                    link_kind: wire.link_kind,
                    tags: wire.tags.unwrap_or_default(),
                }
            }
        };
        Ok(link)
    }
}

#[derive(Deserialize)]
struct Discriminator {
    #[serde(rename = "linkType")]
    link_type: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FromWire {
    #[serde(rename = "linkType")]
    _link_type: IgnoredAny,
    from: EventReference,
    #[serde(default)]
    tags: Option<Tags>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RelationWire {
    #[serde(rename = "linkType")]
    _link_type: IgnoredAny,
    target: EventReference,
    link_kind: String,
    #[serde(default)]
    tags: Option<Tags>,
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let tags = self.tags();
        let fields = match self {
            Link::Relation { .. } => 3,
            _ => 2,
        } + usize::from(!tags.is_empty());

        let mut map = serializer.serialize_map(Some(fields))?;
        map.serialize_entry("linkType", self.link_type().as_str())?;
        match self {
            Link::Path { from, .. } | Link::End { from, .. } => {
                map.serialize_entry("from", from)?;
            }
            Link::Relation {
                target, link_kind, ..
            } => {
                map.serialize_entry("target", target)?;
                map.serialize_entry("linkKind", link_kind)?;
            }
        }
        // Omitted rather than null: schemas mark tags optional but not nullable.
        if !tags.is_empty() {
            map.serialize_entry("tags", tags)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Link::from_value(value).map_err(D::Error::custom)
    }
}

/// Ordered, append-only sequence of links. Order is significant and
/// duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkSet(Vec<Link>);

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: Link) {
        self.0.push(link);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Link] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Link> {
        self.0
    }

    /// Decode a JSON array of links. All elements must decode or the whole
    /// call fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let elements: Vec<Value> = serde_json::from_str(json)?;
        Self::from_elements(elements)
    }

    /// Decode an already-parsed JSON array of links.
    pub fn from_value(value: Value) -> Result<Self> {
        let elements: Vec<Value> = serde_json::from_value(value)?;
        Self::from_elements(elements)
    }

    fn from_elements(elements: Vec<Value>) -> Result<Self> {
        elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                Link::from_value(element).inspect_err(|e| {
                    tracing::debug!(index, error = %e, "rejected link");
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(LinkSet)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<'de> Deserialize<'de> for LinkSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        LinkSet::from_value(value).map_err(D::Error::custom)
    }
}

impl From<Vec<Link>> for LinkSet {
    fn from(links: Vec<Link>) -> Self {
        LinkSet(links)
    }
}

impl FromIterator<Link> for LinkSet {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        LinkSet(iter.into_iter().collect())
    }
}

impl Extend<Link> for LinkSet {
    fn extend<I: IntoIterator<Item = Link>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for LinkSet {
    type Item = Link;
    type IntoIter = std::vec::IntoIter<Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_mixed_links_in_order() {
        let json = r#"[
            {"linkType": "PATH", "from": {"contextId": "id1"}},
            {"linkType": "RELATION", "target": {"contextId": "id3"}, "linkKind": "depends"}
        ]"#;
        let links = LinkSet::from_json(json).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links.as_slice()[0], Link::path(EventReference::new("id1")));
        assert_eq!(
            links.as_slice()[1],
            Link::relation(EventReference::new("id3"), "depends")
        );
    }

    #[test]
    fn test_decode_end_with_tags_and_source() {
        let json = r#"[{"linkType": "END", "from": {"contextId": "id2", "contextSource": "/ci"}, "tags": {"reason": "done"}}]"#;
        let links = LinkSet::from_json(json).unwrap();
        let expected = Link::end(EventReference::new("id2").with_source("/ci")).with_tag("reason", "done");
        assert_eq!(links.as_slice(), &[expected]);
    }

    #[test]
    fn test_decode_empty_array() {
        let links = LinkSet::from_json("[]").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_decode_null_tags() {
        let links = LinkSet::from_json(r#"[{"linkType": "PATH", "from": {"contextId": "a"}, "tags": null}]"#).unwrap();
        assert!(links.as_slice()[0].tags().is_empty());
    }

    #[test]
    fn test_unknown_link_type_aborts_whole_array() {
        let json = r#"[
            {"linkType": "PATH", "from": {"contextId": "id1"}},
            {"linkType": "BOGUS", "from": {"contextId": "id2"}}
        ]"#;
        match LinkSet::from_json(json) {
            Err(Error::UnknownLinkType(found)) => assert_eq!(found, "BOGUS"),
            other => panic!("expected UnknownLinkType, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_discriminator() {
        let err = LinkSet::from_json(r#"[{"from": {"contextId": "id1"}}]"#).unwrap_err();
        assert!(matches!(err, Error::UnknownLinkType(_)));

        let err = LinkSet::from_json(r#"[{"linkType": 7, "from": {"contextId": "id1"}}]"#).unwrap_err();
        match err {
            Error::UnknownLinkType(found) => assert_eq!(found, "7"),
            other => panic!("expected UnknownLinkType, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_variant_fields_rejected() {
        let json = r#"[{"linkType": "PATH", "from": {"contextId": "a"}, "linkKind": "depends"}]"#;
        assert!(matches!(LinkSet::from_json(json), Err(Error::MalformedInput(_))));

        let json = r#"[{"linkType": "RELATION", "from": {"contextId": "a"}, "linkKind": "depends"}]"#;
        assert!(matches!(LinkSet::from_json(json), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(LinkSet::from_json("[{"), Err(Error::MalformedInput(_))));
        assert!(matches!(LinkSet::from_json(r#"{"linkType": "PATH"}"#), Err(Error::MalformedInput(_))));
        assert!(matches!(LinkSet::from_json(r#"["PATH"]"#), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_encode_omits_empty_tags() {
        let links: LinkSet = vec![
            Link::path(EventReference::new("a")),
            Link::relation(EventReference::new("b"), "artifact").with_tag("env", "prod"),
        ]
        .into();
        assert_eq!(
            links.to_value().unwrap(),
            json!([
                {"linkType": "PATH", "from": {"contextId": "a"}},
                {"linkType": "RELATION", "target": {"contextId": "b"}, "linkKind": "artifact", "tags": {"env": "prod"}}
            ])
        );
    }

    #[test]
    fn test_encode_decode_preserves_order_and_duplicates() {
        let mut links = LinkSet::new();
        links.push(Link::path(EventReference::new("a")));
        links.push(Link::path(EventReference::new("a")));
        links.push(Link::end(EventReference::new("b").with_source("/src")).with_tag("k", "v"));
        links.push(Link::relation(EventReference::new("c"), "causes"));

        let decoded = LinkSet::from_json(&links.to_json().unwrap()).unwrap();
        assert_eq!(decoded, links);
    }

    #[test]
    fn test_serde_nesting() {
        #[derive(Deserialize)]
        struct Holder {
            links: LinkSet,
        }
        let holder: Holder =
            serde_json::from_str(r#"{"links": [{"linkType": "END", "from": {"contextId": "z"}}]}"#).unwrap();
        assert_eq!(holder.links.as_slice()[0].link_type(), LinkType::End);

        let err = serde_json::from_str::<Holder>(r#"{"links": [{"linkType": "NOPE"}]}"#);
        assert!(err.is_err());
    }
}

//! Event type identifiers.
//!
//! A type identifier names what an event is about and which lifecycle step
//! it reports, using the dotted form
//! `<root>.<subject>.<predicate>.<version>`:
//!
//! - `dev.cdevents.pipelinerun.queued.0.2.0`
//! - `dev.cdeventsx.mytool-build.finished.1.0.0` (custom namespace `mytool`)
//!
//! Formatting is lenient and renders placeholders for missing fields so a
//! half-built identifier can still be logged. Parsing is strict.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Root of the standard event catalog.
pub const CDEVENTS_ROOT: &str = "dev.cdevents";
/// Root of producer-defined event types.
pub const CUSTOM_ROOT: &str = "dev.cdeventsx";

pub const UNDEFINED_SUBJECT: &str = "<undefined-subject>";
pub const UNDEFINED_PREDICATE: &str = "<undefined-predicate>";
pub const UNDEFINED_VERSION: &str = "<undefined-version>";

const NAMESPACE_SEPARATOR: char = '-';

/// Structured form of an event type string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeIdentifier {
    /// Producer namespace; `None` (or empty) for the standard catalog.
    pub custom_namespace: Option<String>,
    /// Kind of thing the event is about (e.g. "pipelinerun").
    pub subject: String,
    /// Lifecycle action reported (e.g. "finished").
    pub predicate: String,
    /// `MAJOR.MINOR.PATCH` version of the event type.
    pub version: String,
}

impl TypeIdentifier {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            custom_namespace: None,
            subject: subject.into(),
            predicate: predicate.into(),
            version: version.into(),
        }
    }

    /// Move the identifier into a custom namespace. An empty namespace
    /// leaves it in the standard catalog.
    pub fn with_custom_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.custom_namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// The custom namespace, treating an empty one as absent.
    pub fn custom_namespace(&self) -> Option<&str> {
        self.custom_namespace.as_deref().filter(|namespace| !namespace.is_empty())
    }

    pub fn is_custom(&self) -> bool {
        self.custom_namespace().is_some()
    }

    /// `dev.cdevents` or `dev.cdeventsx`.
    pub fn root(&self) -> &'static str {
        if self.is_custom() {
            CUSTOM_ROOT
        } else {
            CDEVENTS_ROOT
        }
    }

    /// Subject qualified with the custom namespace, if any.
    pub fn fq_subject(&self) -> String {
        let subject = non_empty_or(&self.subject, UNDEFINED_SUBJECT);
        match self.custom_namespace() {
            Some(namespace) => format!("{namespace}{NAMESPACE_SEPARATOR}{subject}"),
            None => subject.to_string(),
        }
    }

    /// Type string without the trailing version segment.
    pub fn unversioned(&self) -> String {
        format!(
            "{}.{}.{}",
            self.root(),
            self.fq_subject(),
            non_empty_or(&self.predicate, UNDEFINED_PREDICATE)
        )
    }

    /// Compact `<subject>_<predicate>` key. Empty unless both subject and
    /// predicate are set.
    pub fn short_name(&self) -> String {
        if self.subject.is_empty() || self.predicate.is_empty() {
            return String::new();
        }
        format!("{}_{}", self.fq_subject(), self.predicate)
    }

    /// Numeric major version, when the version string starts with one.
    pub fn major_version(&self) -> Option<u64> {
        self.version.split('.').next()?.parse().ok()
    }

    /// Whether an event of type `other` can be read as `self`.
    ///
    /// Namespace, subject and predicate must match exactly. Versions are
    /// compatible when their majors match, or when either major is `0`.
    pub fn is_compatible(&self, other: &TypeIdentifier) -> bool {
        if self.custom_namespace() != other.custom_namespace()
            || self.subject != other.subject
            || self.predicate != other.predicate
        {
            return false;
        }
        match (self.major_version(), other.major_version()) {
            (Some(0), Some(_)) | (Some(_), Some(0)) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Parse a dotted type string. Empty input yields the zero value.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let reject = |reason: &'static str| {
            tracing::debug!(value = %s, reason, "rejected event type");
            Error::format(s, reason)
        };

        let tokens: Vec<&str> = s.split('.').collect();
        if tokens.len() < 2 {
            return Err(reject("unrecognized root"));
        }
        let custom = match (tokens[0], tokens[1]) {
            ("dev", "cdevents") => false,
            ("dev", "cdeventsx") => true,
            _ => return Err(reject("unrecognized root")),
        };

        let rest = &tokens[2..];
        if rest.len() < 4 {
            return Err(reject("expected <subject>.<predicate>.<version> after the root"));
        }

        let (custom_namespace, subject) = if custom {
            let (namespace, subject) = rest[0]
                .split_once(NAMESPACE_SEPARATOR)
                .ok_or_else(|| reject("custom subject is missing the namespace separator"))?;
            if namespace.is_empty() {
                return Err(reject("custom namespace is empty"));
            }
            (Some(namespace.to_string()), subject)
        } else {
            (None, rest[0])
        };

        if subject.is_empty() {
            return Err(reject("subject is empty"));
        }
        if rest[1].is_empty() {
            return Err(reject("predicate is empty"));
        }

        Ok(Self {
            custom_namespace,
            subject: subject.to_string(),
            predicate: rest[1].to_string(),
            version: rest[2..].join("."),
        })
    }
}

fn non_empty_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.unversioned(),
            non_empty_or(&self.version, UNDEFINED_VERSION)
        )
    }
}

impl FromStr for TypeIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TypeIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => Self::parse(&s).map_err(D::Error::custom),
            None => Ok(Self::default()),
        }
    }
}

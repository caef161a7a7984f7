use thiserror::Error;

/// Errors raised by the event codecs.
///
/// Every variant is a local, synchronous failure. Nothing here is retried
/// or swallowed by the library; callers decide whether to reject, log, or
/// substitute a value.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed event type string.
    #[error("invalid event type `{value}`: {reason}")]
    Format { value: String, reason: &'static str },

    /// A `links` element carried a missing or unrecognized `linkType`.
    #[error("unknown link type `{0}`")]
    UnknownLinkType(String),

    /// Syntax or structural error reported by the JSON parser.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] serde_json::Error),

    /// Non-JSON content type declared without any custom data.
    #[error("custom data is required for content type `{content_type}`")]
    MissingPayload { content_type: String },

    /// JSON content type paired with a bare string value.
    #[error("custom data with content type `{content_type}` must be a structured JSON value, not a string")]
    UnexpectedStringPayload { content_type: String },

    /// Binary custom data was not valid base64.
    #[error("custom data with content type `{content_type}` is not valid base64: {source}")]
    InvalidEncoding {
        content_type: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Payload shape not allowed for the declared content type.
    #[error("custom data shape does not match content type `{content_type}`")]
    TypeMismatch { content_type: String },

    /// Structured custom data could not be decoded into the requested type.
    #[error("custom data does not match the requested shape: {0}")]
    ShapeMismatch(#[source] serde_json::Error),

    /// `decode_as` called on empty or binary custom data.
    #[error("custom data is not structured JSON")]
    NotStructured,

    /// Incoming event type cannot be read as the requested event.
    #[error("event type `{found}` is not compatible with `{expected}`")]
    IncompatibleEventType { expected: String, found: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format(value: &str, reason: &'static str) -> Self {
        Error::Format {
            value: value.to_string(),
            reason,
        }
    }
}

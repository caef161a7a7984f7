//! Free-form custom data attached to an event.
//!
//! Custom data travels as two sibling fields, `customData` and
//! `customDataContentType`. The content type alone decides the legal wire
//! shape: JSON media types (or no content type) carry a structured JSON
//! value, every other media type carries opaque bytes as a base64 string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether `content_type` declares JSON. An empty content type means JSON.
///
/// Parameters (`; charset=utf-8`) are ignored and the comparison is
/// case-insensitive; `*/json` and `*+json` both match.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || essence.ends_with("/json") || essence.ends_with("+json")
}

/// Decoded custom data value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CustomDataPayload {
    #[default]
    Empty,
    /// Structured JSON value (object, array or scalar).
    Json(Value),
    /// Opaque bytes, base64 on the wire.
    Binary(Vec<u8>),
}

impl CustomDataPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CustomDataPayload::Empty => "empty",
            CustomDataPayload::Json(_) => "json",
            CustomDataPayload::Binary(_) => "binary",
        }
    }
}

/// Producer-side guard run before custom data is attached to an event.
///
/// Rejects the combinations that a consumer would refuse to decode, so the
/// mistake surfaces where it was made.
pub fn validate_before_set(content_type: &str, payload: &CustomDataPayload) -> Result<()> {
    let json = is_json_content_type(content_type);
    match payload {
        CustomDataPayload::Empty if !json => Err(Error::MissingPayload {
            content_type: content_type.to_string(),
        }),
        CustomDataPayload::Json(Value::String(_)) if json => Err(Error::UnexpectedStringPayload {
            content_type: content_type.to_string(),
        }),
        CustomDataPayload::Json(_) if !json => Err(Error::TypeMismatch {
            content_type: content_type.to_string(),
        }),
        CustomDataPayload::Binary(_) if json => Err(Error::TypeMismatch {
            content_type: content_type.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Custom data together with its declared content type.
///
/// Values built through the constructors always satisfy
/// [`validate_before_set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomData {
    content_type: String,
    payload: CustomDataPayload,
}

impl CustomData {
    /// A JSON `null` payload is stored as [`CustomDataPayload::Empty`], the
    /// same value it decodes to.
    pub fn new(content_type: impl Into<String>, payload: CustomDataPayload) -> Result<Self> {
        let content_type = content_type.into();
        validate_before_set(&content_type, &payload)?;
        let payload = match payload {
            CustomDataPayload::Json(Value::Null) => CustomDataPayload::Empty,
            payload => payload,
        };
        Ok(Self {
            content_type,
            payload,
        })
    }

    /// Structured data under `application/json`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        Self::new(JSON_CONTENT_TYPE, CustomDataPayload::Json(value))
    }

    /// Opaque bytes under a non-JSON content type.
    pub fn binary(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(content_type, CustomDataPayload::Binary(bytes.into()))
    }

    /// Decode the wire fields. `raw` is the already-parsed `customData`
    /// value; `None` and JSON `null` both mean absent.
    pub fn decode(content_type: Option<&str>, raw: Option<Value>) -> Result<Self> {
        let content_type = content_type.unwrap_or_default().to_string();
        let json = is_json_content_type(&content_type);

        let payload = match raw {
            None | Some(Value::Null) if json => CustomDataPayload::Empty,
            None | Some(Value::Null) => return Err(Error::MissingPayload { content_type }),
            Some(Value::String(_)) if json => {
                return Err(Error::UnexpectedStringPayload { content_type });
            }
            Some(value) if json => CustomDataPayload::Json(value),
            Some(Value::String(encoded)) => match STANDARD.decode(encoded.as_bytes()) {
                Ok(bytes) => CustomDataPayload::Binary(bytes),
                Err(source) => {
                    tracing::debug!(content_type = %content_type, error = %source, "rejected custom data");
                    return Err(Error::InvalidEncoding {
                        content_type,
                        source,
                    });
                }
            },
            Some(_) => return Err(Error::TypeMismatch { content_type }),
        };

        Ok(Self {
            content_type,
            payload,
        })
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn payload(&self) -> &CustomDataPayload {
        &self.payload
    }

    pub fn into_payload(self) -> CustomDataPayload {
        self.payload
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.payload, CustomDataPayload::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match &self.payload {
            CustomDataPayload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            CustomDataPayload::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Decode structured custom data into `T`.
    pub fn decode_as<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.payload {
            CustomDataPayload::Json(value) => T::deserialize(value).map_err(Error::ShapeMismatch),
            CustomDataPayload::Empty | CustomDataPayload::Binary(_) => Err(Error::NotStructured),
        }
    }

    /// Wire value for `customData`; `None` when the field is omitted.
    pub fn encoded_value(&self) -> Option<Value> {
        match &self.payload {
            CustomDataPayload::Empty => None,
            CustomDataPayload::Json(value) => Some(value.clone()),
            CustomDataPayload::Binary(bytes) => Some(Value::String(STANDARD.encode(bytes))),
        }
    }

    /// Wire value for `customDataContentType`; `None` when empty.
    pub fn wire_content_type(&self) -> Option<&str> {
        (!self.content_type.is_empty()).then_some(self.content_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type(""));
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/cloudevents+json"));
        assert!(is_json_content_type("text/json"));
        assert!(!is_json_content_type("application/octet-stream"));
        assert!(!is_json_content_type("application/xml"));
        assert!(!is_json_content_type("application/jsonl"));
    }

    #[test]
    fn test_decode_base64_binary() {
        let data = CustomData::decode(Some("application/octet-stream"), Some(json!("SGVsbG8gV29ybGQ="))).unwrap();
        assert_eq!(data.as_bytes(), Some(&b"Hello World"[..]));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = CustomData::decode(Some("application/octet-stream"), Some(json!("not-valid-base64!!!"))).unwrap_err();
        assert!(matches!(err, Error::InvalidEncoding { .. }));
    }

    #[test]
    fn test_decode_string_under_json_type() {
        let err = CustomData::decode(Some("application/json"), Some(json!("string-data"))).unwrap_err();
        assert!(matches!(err, Error::UnexpectedStringPayload { .. }));

        let err = CustomData::decode(None, Some(json!("string-data"))).unwrap_err();
        assert!(matches!(err, Error::UnexpectedStringPayload { .. }));
    }

    #[test]
    fn test_decode_absent() {
        let data = CustomData::decode(Some(""), None).unwrap();
        assert!(data.is_empty());

        let data = CustomData::decode(None, Some(Value::Null)).unwrap();
        assert!(data.is_empty());

        let err = CustomData::decode(Some("application/xml"), None).unwrap_err();
        assert!(matches!(err, Error::MissingPayload { .. }));
    }

    #[test]
    fn test_decode_structured() {
        for raw in [json!({"a": 1}), json!([1, 2]), json!(42), json!(true)] {
            let data = CustomData::decode(Some("application/json"), Some(raw.clone())).unwrap();
            assert_eq!(data.as_json(), Some(&raw));
        }
    }

    #[test]
    fn test_decode_structured_under_binary_type() {
        let err = CustomData::decode(Some("application/octet-stream"), Some(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Build {
            number: u32,
        }

        let data = CustomData::json(&json!({"number": 7})).unwrap();
        assert_eq!(data.decode_as::<Build>().unwrap(), Build { number: 7 });

        let data = CustomData::json(&json!({"number": "seven"})).unwrap();
        assert!(matches!(data.decode_as::<Build>(), Err(Error::ShapeMismatch(_))));

        let data = CustomData::binary("application/octet-stream", b"raw".to_vec()).unwrap();
        assert!(matches!(data.decode_as::<Build>(), Err(Error::NotStructured)));
        assert!(matches!(CustomData::default().decode_as::<Build>(), Err(Error::NotStructured)));
    }

    #[test]
    fn test_validate_before_set() {
        assert!(validate_before_set("", &CustomDataPayload::Empty).is_ok());
        assert!(validate_before_set("application/json", &CustomDataPayload::Json(json!({}))).is_ok());
        assert!(validate_before_set("image/png", &CustomDataPayload::Binary(vec![1, 2])).is_ok());

        assert!(matches!(
            validate_before_set("application/json", &CustomDataPayload::Binary(vec![1])),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            validate_before_set("application/xml", &CustomDataPayload::Json(json!({"a": 1}))),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            validate_before_set("application/xml", &CustomDataPayload::Empty),
            Err(Error::MissingPayload { .. })
        ));
        assert!(matches!(
            validate_before_set("", &CustomDataPayload::Json(json!("text"))),
            Err(Error::UnexpectedStringPayload { .. })
        ));
    }

    #[test]
    fn test_null_json_payload_is_empty() {
        let data = CustomData::new("application/json", CustomDataPayload::Json(Value::Null)).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.content_type(), "application/json");
        assert_eq!(data.encoded_value(), None);

        assert!(CustomData::json(&()).unwrap().is_empty());
        assert!(matches!(
            CustomData::new("application/xml", CustomDataPayload::Json(Value::Null)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_encode() {
        let data = CustomData::binary("application/octet-stream", b"Hello World".to_vec()).unwrap();
        assert_eq!(data.encoded_value(), Some(json!("SGVsbG8gV29ybGQ=")));
        assert_eq!(data.wire_content_type(), Some("application/octet-stream"));

        let empty = CustomData::default();
        assert_eq!(empty.encoded_value(), None);
        assert_eq!(empty.wire_content_type(), None);
    }

    #[test]
    fn test_encode_decode_is_lossless() {
        let samples = [
            CustomData::default(),
            CustomData::json(&json!({"nested": {"list": [1, "two", null]}})).unwrap(),
            CustomData::new("", CustomDataPayload::Json(json!([1, 2, 3]))).unwrap(),
            CustomData::binary("application/octet-stream", vec![0u8, 255, 10, 13]).unwrap(),
            CustomData::binary("text/plain", Vec::new()).unwrap(),
            CustomData::json(&()).unwrap(),
            CustomData::new("application/json", CustomDataPayload::Json(Value::Null)).unwrap(),
        ];
        for data in samples {
            let decoded = CustomData::decode(data.wire_content_type(), data.encoded_value()).unwrap();
            assert_eq!(decoded, data);
        }
    }
}

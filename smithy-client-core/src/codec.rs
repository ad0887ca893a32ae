//! Payload codecs.
//!
//! This module provides the [`Codec`] trait used by protocols to encode
//! structured bodies, and [`JsonCodec`], a schema-directed JSON codec:
//! - member names honour `jsonName`
//! - timestamps default to epoch seconds unless `timestampFormat` says otherwise
//! - blobs are base64 strings
//! - non-finite floats are the strings `NaN`, `Infinity` and `-Infinity`
//! - unknown members are ignored when decoding

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::{Map, Number, Value};

use crate::document::Document;
use crate::error::CodecError;
use crate::schema::{Schema, ShapeType, Trait};
use crate::time::{self, TimestampFormat};

/// Codec trait for structured payloads.
///
/// # Example
///
/// ```ignore
/// use smithy_client_core::{Codec, CodecError, Document, Schema};
/// use bytes::Bytes;
///
/// struct CborCodec;
///
/// impl Codec for CborCodec {
///     fn media_type(&self) -> &'static str { "application/cbor" }
///
///     fn serialize(&self, schema: &Schema, document: &Document) -> Result<Bytes, CodecError> {
///         // ... encode
///     }
///
///     fn deserialize(&self, schema: &Schema, bytes: &[u8]) -> Result<Document, CodecError> {
///         // ... decode
///     }
/// }
/// ```
pub trait Codec: Send + Sync + 'static {
    /// Content type of encoded payloads (e.g. "application/json").
    fn media_type(&self) -> &'static str;

    /// Encode a document described by `schema`.
    fn serialize(&self, schema: &Schema, document: &Document) -> Result<Bytes, CodecError>;

    /// Decode a document described by `schema`.
    fn deserialize(&self, schema: &Schema, bytes: &[u8]) -> Result<Document, CodecError>;
}

/// A boxed codec for type-erased storage.
#[derive(Clone)]
pub struct BoxedCodec(Arc<dyn Codec>);

impl BoxedCodec {
    pub fn new<C: Codec>(codec: C) -> Self {
        BoxedCodec(Arc::new(codec))
    }

    pub fn media_type(&self) -> &'static str {
        self.0.media_type()
    }

    pub fn serialize(&self, schema: &Schema, document: &Document) -> Result<Bytes, CodecError> {
        self.0.serialize(schema, document)
    }

    pub fn deserialize(&self, schema: &Schema, bytes: &[u8]) -> Result<Document, CodecError> {
        self.0.deserialize(schema, bytes)
    }
}

impl fmt::Debug for BoxedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxedCodec")
            .field(&self.media_type())
            .finish()
    }
}

/// Schema-directed JSON codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec {
    default_timestamp_format: Option<TimestampFormat>,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the timestamp format used when a member has no explicit format.
    #[must_use]
    pub fn with_default_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.default_timestamp_format = Some(format);
        self
    }

    fn timestamp_format(&self, explicit: Option<TimestampFormat>) -> TimestampFormat {
        explicit
            .or(self.default_timestamp_format)
            .unwrap_or(TimestampFormat::EpochSeconds)
    }

    fn write(
        &self,
        schema: &Schema,
        format: Option<TimestampFormat>,
        document: &Document,
    ) -> Result<Value, CodecError> {
        let value = match (schema.shape_type(), document) {
            (_, Document::Null) => Value::Null,
            (ShapeType::Structure | ShapeType::Union, Document::Structure(members)) => {
                let mut object = Map::new();
                for member in schema.members() {
                    let Some(value) = members.get(member.name()).filter(|v| !v.is_null()) else {
                        continue;
                    };
                    object.insert(
                        member.json_name().to_string(),
                        self.write(member.target(), member.timestamp_format(), value)?,
                    );
                }
                Value::Object(object)
            }
            (ShapeType::List, Document::List(items)) => {
                let Some(element) = schema.list_member() else {
                    return Ok(write_untyped(document));
                };
                let values = items
                    .iter()
                    .map(|item| self.write(element.target(), element.timestamp_format(), item))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(values)
            }
            (ShapeType::Map, Document::Map(entries) | Document::Structure(entries)) => {
                let Some(value_member) = schema.map_value() else {
                    return Ok(write_untyped(document));
                };
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(
                        key.clone(),
                        self.write(value_member.target(), value_member.timestamp_format(), value)?,
                    );
                }
                Value::Object(object)
            }
            (ShapeType::Timestamp, Document::Timestamp(ts)) => {
                let explicit = format.or_else(|| {
                    schema.find_trait(|t| match t {
                        Trait::TimestampFormat(f) => Some(*f),
                        _ => None,
                    })
                });
                match self.timestamp_format(explicit) {
                    TimestampFormat::EpochSeconds => write_float(time::to_epoch_seconds(ts)),
                    other => Value::String(other.format(ts)),
                }
            }
            (_, Document::Blob(bytes)) => Value::String(STANDARD.encode(bytes)),
            (ShapeType::Float | ShapeType::Double, Document::Float(f)) => write_float(*f),
            (ShapeType::Float | ShapeType::Double, Document::Integer(i)) => write_float(*i as f64),
            _ => write_untyped(document),
        };
        Ok(value)
    }

    fn read(
        &self,
        schema: &Schema,
        format: Option<TimestampFormat>,
        value: &Value,
    ) -> Result<Document, CodecError> {
        if value.is_null() {
            return Ok(Document::Null);
        }
        let mismatch = |expected: &str| {
            CodecError::Deserialize(format!(
                "expected {expected} for `{}`, found {}",
                schema.id(),
                json_type_name(value)
            ))
        };
        let document = match schema.shape_type() {
            ShapeType::Structure | ShapeType::Union => {
                let object = value.as_object().ok_or_else(|| mismatch("object"))?;
                let mut members = BTreeMap::new();
                for member in schema.members() {
                    let Some(field) = object.get(member.json_name()) else {
                        continue;
                    };
                    let decoded = self.read(member.target(), member.timestamp_format(), field)?;
                    if !decoded.is_null() {
                        members.insert(member.name().to_string(), decoded);
                    }
                }
                Document::Structure(members)
            }
            ShapeType::List => {
                let items = value.as_array().ok_or_else(|| mismatch("array"))?;
                match schema.list_member() {
                    Some(element) => Document::List(
                        items
                            .iter()
                            .map(|item| {
                                self.read(element.target(), element.timestamp_format(), item)
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    None => read_untyped(value),
                }
            }
            ShapeType::Map => {
                let object = value.as_object().ok_or_else(|| mismatch("object"))?;
                match schema.map_value() {
                    Some(value_member) => {
                        let mut entries = BTreeMap::new();
                        for (key, entry) in object {
                            entries.insert(
                                key.clone(),
                                self.read(
                                    value_member.target(),
                                    value_member.timestamp_format(),
                                    entry,
                                )?,
                            );
                        }
                        Document::Map(entries)
                    }
                    None => read_untyped(value),
                }
            }
            ShapeType::Timestamp => {
                let explicit = format.or_else(|| {
                    schema.find_trait(|t| match t {
                        Trait::TimestampFormat(f) => Some(*f),
                        _ => None,
                    })
                });
                let ts = match value {
                    Value::Number(n) => n.as_f64().and_then(time::from_epoch_seconds),
                    Value::String(s) => self.timestamp_format(explicit).parse(s).ok(),
                    _ => None,
                };
                Document::Timestamp(ts.ok_or_else(|| mismatch("timestamp"))?)
            }
            ShapeType::Blob => {
                let encoded = value.as_str().ok_or_else(|| mismatch("base64 string"))?;
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| CodecError::Deserialize(format!("invalid base64: {e}")))?;
                Document::Blob(Bytes::from(bytes))
            }
            ShapeType::Boolean => Document::Boolean(value.as_bool().ok_or_else(|| mismatch("boolean"))?),
            ShapeType::String | ShapeType::Enum => {
                Document::String(value.as_str().ok_or_else(|| mismatch("string"))?.to_string())
            }
            ShapeType::Byte
            | ShapeType::Short
            | ShapeType::Integer
            | ShapeType::Long
            | ShapeType::IntEnum => Document::Integer(value.as_i64().ok_or_else(|| mismatch("integer"))?),
            ShapeType::Float | ShapeType::Double => match value {
                Value::Number(n) => Document::Float(n.as_f64().ok_or_else(|| mismatch("number"))?),
                Value::String(s) => Document::Float(match s.as_str() {
                    "NaN" => f64::NAN,
                    "Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    _ => return Err(mismatch("number")),
                }),
                _ => return Err(mismatch("number")),
            },
            ShapeType::Document => read_untyped(value),
        };
        Ok(document)
    }
}

impl Codec for JsonCodec {
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize(&self, schema: &Schema, document: &Document) -> Result<Bytes, CodecError> {
        let value = self.write(schema, None, document)?;
        serde_json::to_vec(&value)
            .map(Bytes::from)
            .map_err(|e| CodecError::Serialize(e.to_string()))
    }

    fn deserialize(&self, schema: &Schema, bytes: &[u8]) -> Result<Document, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(match schema.shape_type() {
                ShapeType::Structure | ShapeType::Union => Document::structure(),
                _ => Document::Null,
            });
        }
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))?;
        self.read(schema, None, &value)
    }
}

fn write_float(f: f64) -> Value {
    if f.is_nan() {
        Value::String("NaN".into())
    } else if f == f64::INFINITY {
        Value::String("Infinity".into())
    } else if f == f64::NEG_INFINITY {
        Value::String("-Infinity".into())
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

fn write_untyped(document: &Document) -> Value {
    match document {
        Document::Null => Value::Null,
        Document::Boolean(b) => Value::Bool(*b),
        Document::Integer(i) => Value::Number((*i).into()),
        Document::Float(f) => write_float(*f),
        Document::String(s) => Value::String(s.clone()),
        Document::Blob(b) => Value::String(STANDARD.encode(b)),
        Document::Timestamp(ts) => write_float(time::to_epoch_seconds(ts)),
        Document::List(items) => Value::Array(items.iter().map(write_untyped).collect()),
        Document::Map(entries) | Document::Structure(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), write_untyped(v)))
                .collect(),
        ),
    }
}

fn read_untyped(value: &Value) -> Document {
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Document::Integer(i),
            None => Document::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Document::String(s.clone()),
        Value::Array(items) => Document::List(items.iter().map(read_untyped).collect()),
        Value::Object(object) => Document::Map(
            object
                .iter()
                .map(|(k, v)| (k.clone(), read_untyped(v)))
                .collect(),
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

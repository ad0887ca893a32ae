//! Shape schemas.
//!
//! A [`Schema`] describes one shape of a service model: its [`ShapeId`], its
//! [`ShapeType`], the [`Trait`]s applied to it and, for aggregates, its
//! [`Member`]s. Generated code builds these once and hands out `Arc<Schema>`
//! references. The runtime only inspects the traits listed in [`Trait`].

use std::fmt;
use std::sync::Arc;

use crate::time::TimestampFormat;

/// Absolute shape identifier, `namespace#Name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    namespace: String,
    name: String,
}

impl ShapeId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `namespace#Name`. Returns `None` when the `#` separator is missing.
    pub fn parse(absolute: &str) -> Option<Self> {
        let (namespace, name) = absolute.split_once('#')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}

/// Kind of a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Blob,
    Boolean,
    String,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Timestamp,
    Document,
    Enum,
    IntEnum,
    List,
    Map,
    Structure,
    Union,
}

impl ShapeType {
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ShapeType::List | ShapeType::Map | ShapeType::Structure | ShapeType::Union
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Blob => "blob",
            ShapeType::Boolean => "boolean",
            ShapeType::String => "string",
            ShapeType::Byte => "byte",
            ShapeType::Short => "short",
            ShapeType::Integer => "integer",
            ShapeType::Long => "long",
            ShapeType::Float => "float",
            ShapeType::Double => "double",
            ShapeType::Timestamp => "timestamp",
            ShapeType::Document => "document",
            ShapeType::Enum => "enum",
            ShapeType::IntEnum => "intEnum",
            ShapeType::List => "list",
            ShapeType::Map => "map",
            ShapeType::Structure => "structure",
            ShapeType::Union => "union",
        }
    }
}

/// Value of the `error` trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorFault {
    Client,
    Server,
}

/// Value of the `http` trait applied to an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpTrait {
    pub method: http::Method,
    pub uri: String,
    pub code: u16,
}

impl HttpTrait {
    pub fn new(method: http::Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            code: 200,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }
}

/// Traits the runtime understands.
#[derive(Clone, Debug, PartialEq)]
pub enum Trait {
    HttpLabel,
    HttpQuery(String),
    HttpQueryParams,
    HttpHeader(String),
    HttpPrefixHeaders(String),
    HttpPayload,
    HttpResponseCode,
    HttpError(u16),
    Error(ErrorFault),
    Retryable { throttling: bool },
    Http(HttpTrait),
    ReadOnly,
    Idempotent,
    IdempotencyToken,
    Required,
    TimestampFormat(TimestampFormat),
    MediaType(String),
    JsonName(String),
    Streaming,
    Sensitive,
}

/// A member of an aggregate shape.
#[derive(Clone, Debug)]
pub struct Member {
    name: String,
    target: Arc<Schema>,
    traits: Vec<Trait>,
}

impl Member {
    pub fn new(name: impl Into<String>, target: Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            target,
            traits: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trait(mut self, t: Trait) -> Self {
        self.traits.push(t);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Arc<Schema> {
        &self.target
    }

    pub fn shape_type(&self) -> ShapeType {
        self.target.shape_type
    }

    /// Traits applied directly to the member.
    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    /// Find a trait on the member, falling back to the target shape.
    pub fn find_trait<T>(&self, f: impl Fn(&Trait) -> Option<T>) -> Option<T> {
        self.traits
            .iter()
            .find_map(&f)
            .or_else(|| self.target.traits.iter().find_map(&f))
    }

    pub fn has_trait(&self, f: impl Fn(&Trait) -> bool) -> bool {
        self.find_trait(|t| f(t).then_some(())).is_some()
    }

    /// Member name used in JSON bodies.
    pub fn json_name(&self) -> &str {
        self.traits
            .iter()
            .find_map(|t| match t {
                Trait::JsonName(name) => Some(name.as_str()),
                _ => None,
            })
            .unwrap_or(&self.name)
    }

    /// Explicit timestamp format, if any.
    pub fn timestamp_format(&self) -> Option<TimestampFormat> {
        self.find_trait(|t| match t {
            Trait::TimestampFormat(format) => Some(*format),
            _ => None,
        })
    }

    /// Media type of a string or blob member, if any.
    pub fn media_type(&self) -> Option<&str> {
        self.traits
            .iter()
            .chain(self.target.traits.iter())
            .find_map(|t| match t {
                Trait::MediaType(media_type) => Some(media_type.as_str()),
                _ => None,
            })
    }

    pub fn is_required(&self) -> bool {
        self.has_trait(|t| matches!(t, Trait::Required))
    }
}

/// Schema of a single shape.
#[derive(Clone, Debug)]
pub struct Schema {
    id: ShapeId,
    shape_type: ShapeType,
    traits: Vec<Trait>,
    members: Vec<Member>,
}

impl Schema {
    pub fn builder(id: ShapeId, shape_type: ShapeType) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                id,
                shape_type,
                traits: Vec::new(),
                members: Vec::new(),
            },
        }
    }

    /// Schema for a simple shape from the `smithy.api` prelude.
    pub fn prelude(shape_type: ShapeType) -> Arc<Schema> {
        let name = match shape_type {
            ShapeType::Blob => "Blob",
            ShapeType::Boolean => "Boolean",
            ShapeType::String => "String",
            ShapeType::Byte => "Byte",
            ShapeType::Short => "Short",
            ShapeType::Integer => "Integer",
            ShapeType::Long => "Long",
            ShapeType::Float => "Float",
            ShapeType::Double => "Double",
            ShapeType::Timestamp => "Timestamp",
            ShapeType::Document => "Document",
            _ => "Unit",
        };
        Arc::new(Schema::builder(ShapeId::new("smithy.api", name), shape_type).build())
    }

    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// The element member of a list (`member`).
    pub fn list_member(&self) -> Option<&Member> {
        self.member("member")
    }

    /// The value member of a map (`value`).
    pub fn map_value(&self) -> Option<&Member> {
        self.member("value")
    }

    pub fn find_trait<T>(&self, f: impl Fn(&Trait) -> Option<T>) -> Option<T> {
        self.traits.iter().find_map(f)
    }

    pub fn has_trait(&self, f: impl Fn(&Trait) -> bool) -> bool {
        self.traits.iter().any(f)
    }

    /// Value of the `error` trait.
    pub fn error_fault(&self) -> Option<ErrorFault> {
        self.find_trait(|t| match t {
            Trait::Error(fault) => Some(*fault),
            _ => None,
        })
    }

    /// Value of the `retryable` trait, as the throttling flag.
    pub fn retryable(&self) -> Option<bool> {
        self.find_trait(|t| match t {
            Trait::Retryable { throttling } => Some(*throttling),
            _ => None,
        })
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    #[must_use]
    pub fn with_trait(mut self, t: Trait) -> Self {
        self.schema.traits.push(t);
        self
    }

    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.schema.members.push(member);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_id_parse_and_display() {
        let id = ShapeId::parse("smithy.example#CreateSprocket").unwrap();
        assert_eq!(id.namespace(), "smithy.example");
        assert_eq!(id.name(), "CreateSprocket");
        assert_eq!(id.to_string(), "smithy.example#CreateSprocket");
        assert!(ShapeId::parse("NoNamespace").is_none());
        assert!(ShapeId::parse("#Name").is_none());
    }

    #[test]
    fn test_member_trait_falls_back_to_target() {
        let target = Schema::builder(ShapeId::new("ex", "Json"), ShapeType::String)
            .with_trait(Trait::MediaType("application/json".into()))
            .build_arc();
        let member = Member::new("payload", target).with_trait(Trait::HttpHeader("x-json".into()));
        assert_eq!(member.media_type(), Some("application/json"));
        assert_eq!(member.json_name(), "payload");
    }

    #[test]
    fn test_json_name_override() {
        let member = Member::new("itemId", Schema::prelude(ShapeType::String))
            .with_trait(Trait::JsonName("item_id".into()));
        assert_eq!(member.json_name(), "item_id");
    }

    #[test]
    fn test_error_traits() {
        let schema = Schema::builder(ShapeId::new("ex", "Throttled"), ShapeType::Structure)
            .with_trait(Trait::Error(ErrorFault::Client))
            .with_trait(Trait::Retryable { throttling: true })
            .build();
        assert_eq!(schema.error_fault(), Some(ErrorFault::Client));
        assert_eq!(schema.retryable(), Some(true));
    }
}

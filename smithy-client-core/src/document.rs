//! The dynamic value model.
//!
//! Protocols never see generated types directly. Inputs are converted into a
//! [`Document`] through the [`Shape`] trait, serialized member by member under
//! the guidance of a [`Schema`], and outputs travel the same way back.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::DocumentError;
use crate::schema::Schema;

/// A dynamically typed shape value.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Blob(Bytes),
    Timestamp(DateTime<Utc>),
    List(Vec<Document>),
    Map(BTreeMap<String, Document>),
    Structure(BTreeMap<String, Document>),
}

impl Document {
    /// An empty structure.
    pub fn structure() -> Self {
        Document::Structure(BTreeMap::new())
    }

    /// Builder-style member insertion. Non-structures are left untouched.
    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Document>) -> Self {
        self.set_member(name, value);
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Boolean(_) => "boolean",
            Document::Integer(_) => "integer",
            Document::Float(_) => "float",
            Document::String(_) => "string",
            Document::Blob(_) => "blob",
            Document::Timestamp(_) => "timestamp",
            Document::List(_) => "list",
            Document::Map(_) => "map",
            Document::Structure(_) => "structure",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Document::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Document::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Document::Float(f) => Some(*f),
            Document::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Bytes> {
        match self {
            Document::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Document::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Document]> {
        match self {
            Document::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map or structure.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Document>> {
        match self {
            Document::Map(entries) | Document::Structure(entries) => Some(entries),
            _ => None,
        }
    }

    /// A structure member. Null members are reported as absent.
    pub fn member(&self, name: &str) -> Option<&Document> {
        match self {
            Document::Structure(members) => members.get(name).filter(|d| !d.is_null()),
            _ => None,
        }
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut Document> {
        match self {
            Document::Structure(members) => members.get_mut(name),
            _ => None,
        }
    }

    pub fn set_member(&mut self, name: impl Into<String>, value: impl Into<Document>) {
        if let Document::Structure(members) = self {
            members.insert(name.into(), value.into());
        }
    }

    pub fn remove_member(&mut self, name: &str) -> Option<Document> {
        match self {
            Document::Structure(members) => members.remove(name),
            _ => None,
        }
    }

    /// Look up a string member, failing if it is absent or not a string.
    pub fn expect_str(&self, name: &str) -> Result<&str, DocumentError> {
        match self.member(name) {
            Some(Document::String(s)) => Ok(s),
            Some(other) => Err(DocumentError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
            None => Err(DocumentError::MissingMember(name.to_string())),
        }
    }

    /// Look up an optional string member.
    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, DocumentError> {
        match self.member(name) {
            None => Ok(None),
            Some(_) => self.expect_str(name).map(Some),
        }
    }

    /// Fail unless the document is a structure.
    pub fn expect_structure(&self) -> Result<&BTreeMap<String, Document>, DocumentError> {
        match self {
            Document::Structure(members) => Ok(members),
            other => Err(DocumentError::TypeMismatch {
                expected: "structure",
                found: other.type_name(),
            }),
        }
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Boolean(value)
    }
}

impl From<i32> for Document {
    fn from(value: i32) -> Self {
        Document::Integer(value.into())
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Integer(value)
    }
}

impl From<f64> for Document {
    fn from(value: f64) -> Self {
        Document::Float(value)
    }
}

impl From<Bytes> for Document {
    fn from(value: Bytes) -> Self {
        Document::Blob(value)
    }
}

impl From<DateTime<Utc>> for Document {
    fn from(value: DateTime<Utc>) -> Self {
        Document::Timestamp(value)
    }
}

impl<T: Into<Document>> From<Vec<T>> for Document {
    fn from(values: Vec<T>) -> Self {
        Document::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Document>> From<Option<T>> for Document {
    fn from(value: Option<T>) -> Self {
        value.map_or(Document::Null, Into::into)
    }
}

/// A typed shape that can be converted to and from a [`Document`].
///
/// Generated input, output and error types implement this trait.
pub trait Shape: Sized + Send + Sync + 'static {
    /// Schema describing the shape.
    fn schema() -> Arc<Schema>;

    fn to_document(&self) -> Document;

    fn from_document(document: &Document) -> Result<Self, DocumentError>;
}

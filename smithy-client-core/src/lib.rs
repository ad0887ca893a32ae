//! Core types for the smithy-client runtime.
//!
//! This crate provides the protocol-agnostic building blocks shared by the
//! client pipeline and by generated shape code:
//!
//! - [`context`]: Typed, identity-keyed property bags ([`Context`], [`Key`])
//! - [`schema`]: Shape schemas and the traits the runtime inspects
//! - [`document`]: The dynamic [`Document`] value model and the [`Shape`] trait
//! - [`codec`]: Payload codecs ([`Codec`], [`JsonCodec`])
//! - [`operation`]: Operation schemas and the modeled error registry
//! - [`time`]: Timestamp formats used on the wire
//! - [`error`]: Fault classification and retry metadata

pub mod codec;
pub mod context;
pub mod document;
pub mod error;
pub mod operation;
pub mod schema;
pub mod time;

pub use codec::{BoxedCodec, Codec, JsonCodec};
pub use context::{Context, ContextView, FrozenContext, Key};
pub use document::{Document, Shape};
pub use error::{CodecError, ContextError, DocumentError, Fault, RetryInfo, RetrySafety};
pub use operation::{ApiOperation, OperationSchema, OperationSchemaBuilder, TypeRegistry};
pub use schema::{
    ErrorFault, HttpTrait, Member, Schema, SchemaBuilder, ShapeId, ShapeType, Trait,
};
pub use time::TimestampFormat;

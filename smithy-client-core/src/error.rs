//! Error classification shared by every protocol.
//!
//! This module provides:
//! - [`Fault`]: Who is to blame for a failure
//! - [`RetrySafety`] and [`RetryInfo`]: Retry metadata attached to call errors
//! - [`ContextError`], [`DocumentError`], [`CodecError`], [`TimestampError`]:
//!   failures of the core building blocks

use std::time::Duration;

/// The party responsible for an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The request was invalid (typically 4xx).
    Client,
    /// The service failed (typically 5xx).
    Server,
    /// Neither side can be blamed with certainty.
    #[default]
    Other,
}

impl Fault {
    /// Classify an HTTP status code by its class.
    ///
    /// ```
    /// use smithy_client_core::Fault;
    ///
    /// assert_eq!(Fault::from_status(404), Fault::Client);
    /// assert_eq!(Fault::from_status(503), Fault::Server);
    /// assert_eq!(Fault::from_status(302), Fault::Other);
    /// ```
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Fault::Client,
            500..=599 => Fault::Server,
            _ => Fault::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Fault::Client => "client",
            Fault::Server => "server",
            Fault::Other => "other",
        }
    }
}

/// Whether it is safe to retry a failed request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RetrySafety {
    /// The request can be retried.
    Yes,
    /// The request must not be retried.
    No,
    /// Undetermined. Later classification stages may still decide.
    #[default]
    Maybe,
}

/// Retry metadata carried by every call error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryInfo {
    pub safety: RetrySafety,
    pub throttle: bool,
    pub retry_after: Option<Duration>,
}

impl RetryInfo {
    /// Retry metadata for an error known to be retryable.
    pub fn retryable(throttle: bool) -> Self {
        Self {
            safety: RetrySafety::Yes,
            throttle,
            retry_after: None,
        }
    }

    /// Retry metadata for an error that must never be retried.
    pub fn not_retryable() -> Self {
        Self {
            safety: RetrySafety::No,
            throttle: false,
            retry_after: None,
        }
    }
}

/// Errors from [`Context`](crate::Context) lookups.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no value found in context for key `{key}`")]
    NotFound { key: &'static str },
}

/// Errors converting between [`Document`](crate::Document) and typed shapes.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required member `{0}`")]
    MissingMember(String),
    #[error("invalid value for `{member}`: {message}")]
    InvalidValue { member: String, message: String },
}

impl DocumentError {
    pub fn invalid(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            member: member.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by a [`Codec`](crate::Codec).
#[derive(Clone, Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to serialize: {0}")]
    Serialize(String),
    #[error("failed to deserialize: {0}")]
    Deserialize(String),
}

impl From<DocumentError> for CodecError {
    fn from(err: DocumentError) -> Self {
        CodecError::Deserialize(err.to_string())
    }
}

/// Errors parsing a timestamp in one of the wire formats.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid {format} timestamp `{value}`")]
pub struct TimestampError {
    pub format: &'static str,
    pub value: String,
}

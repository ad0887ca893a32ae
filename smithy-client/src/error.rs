//! Client call error types.
//!
//! This module provides [`ClientError`], the error returned by every client call.
//! A `ClientError` pairs an [`ErrorKind`] with the retry and fault metadata that
//! retry classification plugins refine while an attempt completes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use smithy_client_core::{
    CodecError, Document, DocumentError, ErrorFault, Fault, RetryInfo, RetrySafety, Schema, Shape,
    ShapeId,
};

use crate::auth::IdentityError;

/// A call failure.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{kind}")]
pub struct ClientError {
    kind: ErrorKind,
    fault: Fault,
    retry: RetryInfo,
}

/// What went wrong during a call.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ErrorKind {
    /// An error shape declared by the operation.
    #[error("{0}")]
    Modeled(ModeledError),

    /// An error response that did not match any modeled error.
    #[error("service error (status {status}): {message}")]
    Service {
        status: u16,
        error_id: Option<String>,
        message: String,
    },

    /// Connection-level failure (refused, reset, TLS, etc.).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// No auth scheme option could be used.
    #[error(transparent)]
    Auth(AuthResolutionError),

    /// Identity resolution failed in a way that must not fall through to
    /// another auth scheme.
    #[error(transparent)]
    Identity(IdentityError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The retry strategy refused to start the call.
    #[error("retry token acquisition failed: {0}")]
    RetryTokenAcquisition(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    /// An interceptor hook aborted the call.
    #[error("interceptor error: {0}")]
    Interceptor(String),
}

impl ClientError {
    /// Create an error of the given kind with no fault and undetermined retry safety.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            fault: Fault::Other,
            retry: RetryInfo::default(),
        }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Transport {
            message: message.into(),
            source: None,
        })
    }

    /// Transport error that keeps the underlying cause.
    pub fn transport_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(ErrorKind::Transport {
            message: message.into(),
            source: Some(Arc::new(source)),
        })
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(ErrorKind::Timeout(after))
    }

    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Serialization(message.into())).with_fault(Fault::Client)
    }

    pub fn deserialization<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Deserialization(message.into()))
    }

    pub fn retry_token_acquisition<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::RetryTokenAcquisition(message.into()))
    }

    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Unsupported(message.into()))
    }

    pub fn illegal_state<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::IllegalState(message.into()))
    }

    pub fn interceptor<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Interceptor(message.into()))
    }

    /// Unmodeled service error. The fault follows the status class.
    pub fn service<S: Into<String>>(status: u16, error_id: Option<String>, message: S) -> Self {
        Self::new(ErrorKind::Service {
            status,
            error_id,
            message: message.into(),
        })
        .with_fault(Fault::from_status(status))
    }

    /// Modeled error. The fault comes from the `error` trait, falling back
    /// to the status class.
    pub fn modeled(error: ModeledError) -> Self {
        let fault = match error.schema.error_fault() {
            Some(ErrorFault::Client) => Fault::Client,
            Some(ErrorFault::Server) => Fault::Server,
            None => Fault::from_status(error.status),
        };
        Self::new(ErrorKind::Modeled(error)).with_fault(fault)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn fault(&self) -> Fault {
        self.fault
    }

    #[must_use]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    pub fn retry_info(&self) -> &RetryInfo {
        &self.retry
    }

    pub fn retry_safety(&self) -> RetrySafety {
        self.retry.safety
    }

    /// Returns true only when classification decided the request can be retried.
    pub fn is_retry_safe(&self) -> bool {
        self.retry.safety == RetrySafety::Yes
    }

    pub fn is_throttle(&self) -> bool {
        self.retry.throttle
    }

    /// Server-suggested delay before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry.retry_after
    }

    pub fn set_retry_safety(&mut self, safety: RetrySafety) {
        self.retry.safety = safety;
    }

    pub fn set_throttle(&mut self, throttle: bool) {
        self.retry.throttle = throttle;
    }

    pub fn set_retry_after(&mut self, delay: Option<Duration>) {
        self.retry.retry_after = delay;
    }

    /// HTTP status of the error response, if the error came from one.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Modeled(e) => Some(e.status),
            ErrorKind::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The modeled error, if this error matched one.
    pub fn as_modeled(&self) -> Option<&ModeledError> {
        match &self.kind {
            ErrorKind::Modeled(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout(_))
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Serialize(msg) => ClientError::serialization(msg),
            CodecError::Deserialize(msg) => ClientError::deserialization(msg),
        }
    }
}

impl From<IdentityError> for ClientError {
    fn from(err: IdentityError) -> Self {
        ClientError::new(ErrorKind::Identity(err))
    }
}

impl From<AuthResolutionError> for ClientError {
    fn from(err: AuthResolutionError) -> Self {
        ClientError::new(ErrorKind::Auth(err)).with_fault(Fault::Client)
    }
}

/// A deserialized modeled error.
#[derive(Clone, Debug)]
pub struct ModeledError {
    schema: Arc<Schema>,
    document: Document,
    status: u16,
}

impl ModeledError {
    pub fn new(schema: Arc<Schema>, document: Document, status: u16) -> Self {
        Self {
            schema,
            document,
            status,
        }
    }

    pub fn id(&self) -> &ShapeId {
        self.schema.id()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The `message` member, matched case-insensitively.
    pub fn message(&self) -> Option<&str> {
        self.document
            .as_map()?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("message"))
            .and_then(|(_, value)| value.as_str())
    }

    /// Convert into the generated error type.
    pub fn to_shape<T: Shape>(&self) -> Result<T, DocumentError> {
        T::from_document(&self.document)
    }
}

impl fmt::Display for ModeledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.schema.id(), message),
            None => write!(f, "{}", self.schema.id()),
        }
    }
}

/// Why an auth scheme option was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOptionFailure {
    pub scheme_id: ShapeId,
    pub reason: String,
}

/// None of the resolved auth scheme options could be used.
#[derive(Clone, Debug, Default, thiserror::Error)]
pub struct AuthResolutionError {
    failures: Vec<AuthOptionFailure>,
}

impl AuthResolutionError {
    pub fn new(failures: Vec<AuthOptionFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[AuthOptionFailure] {
        &self.failures
    }
}

impl fmt::Display for AuthResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no auth scheme options were resolved");
        }
        write!(f, "no usable auth scheme:")?;
        for failure in &self.failures {
            write!(f, " [{}: {}]", failure.scheme_id, failure.reason)?;
        }
        Ok(())
    }
}

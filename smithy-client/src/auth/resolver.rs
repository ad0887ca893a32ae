//! Identity resolvers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use smithy_client_core::Context;

use super::identity::{Identity, IdentityType};

/// Identity resolution failure.
///
/// Recoverable failures let the auth resolver move on to the next scheme
/// option; fatal ones abort the call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The resolver had nothing to offer.
    #[error("identity not found: {0}")]
    NotFound(String),

    /// The resolved identity is already past its expiration.
    #[error("identity expired")]
    Expired,

    #[error("identity resolution failed: {0}")]
    Fatal(String),
}

impl IdentityError {
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        IdentityError::NotFound(message.into())
    }

    pub fn fatal<S: Into<String>>(message: S) -> Self {
        IdentityError::Fatal(message.into())
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, IdentityError::Fatal(_))
    }
}

/// Produces identities of a single [`IdentityType`].
#[async_trait]
pub trait IdentityResolver: Send + Sync + fmt::Debug {
    fn identity_type(&self) -> IdentityType;

    async fn resolve_identity(&self, properties: &Context) -> Result<Identity, IdentityError>;
}

/// Shared identity resolver handle.
pub type SharedIdentityResolver = Arc<dyn IdentityResolver>;

/// Always returns the same identity.
#[derive(Clone, Debug)]
pub struct StaticIdentityResolver {
    identity: Identity,
}

impl StaticIdentityResolver {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn anonymous() -> Self {
        Self::new(Identity::Anonymous)
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    fn identity_type(&self) -> IdentityType {
        self.identity.identity_type()
    }

    async fn resolve_identity(&self, _properties: &Context) -> Result<Identity, IdentityError> {
        if self.identity.is_expired(Utc::now()) {
            return Err(IdentityError::Expired);
        }
        Ok(self.identity.clone())
    }
}

#[derive(Clone, Debug)]
enum EnvSource {
    ApiKey(String),
    Token(String),
    Login { username: String, password: String },
}

/// Reads identities from environment variables at resolution time.
#[derive(Clone, Debug)]
pub struct EnvironmentIdentityResolver {
    source: EnvSource,
}

impl EnvironmentIdentityResolver {
    pub fn api_key(var: impl Into<String>) -> Self {
        Self {
            source: EnvSource::ApiKey(var.into()),
        }
    }

    pub fn token(var: impl Into<String>) -> Self {
        Self {
            source: EnvSource::Token(var.into()),
        }
    }

    pub fn login(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            source: EnvSource::Login {
                username: username_var.into(),
                password: password_var.into(),
            },
        }
    }
}

fn read_var(name: &str) -> Result<String, IdentityError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) | Err(std::env::VarError::NotPresent) => Err(IdentityError::not_found(format!(
            "environment variable {name} is not set"
        ))),
        Err(std::env::VarError::NotUnicode(_)) => Err(IdentityError::fatal(format!(
            "environment variable {name} is not valid unicode"
        ))),
    }
}

#[async_trait]
impl IdentityResolver for EnvironmentIdentityResolver {
    fn identity_type(&self) -> IdentityType {
        match self.source {
            EnvSource::ApiKey(_) => IdentityType::ApiKey,
            EnvSource::Token(_) => IdentityType::Token,
            EnvSource::Login { .. } => IdentityType::Login,
        }
    }

    async fn resolve_identity(&self, _properties: &Context) -> Result<Identity, IdentityError> {
        match &self.source {
            EnvSource::ApiKey(var) => read_var(var).map(Identity::api_key),
            EnvSource::Token(var) => read_var(var).map(Identity::token),
            EnvSource::Login { username, password } => {
                Ok(Identity::login(read_var(username)?, read_var(password)?))
            }
        }
    }
}

/// Tries each resolver in order and returns the first identity found.
///
/// Recoverable failures fall through to the next resolver. Fatal failures
/// stop the chain. When every resolver fails, the last failure is returned.
#[derive(Clone, Debug)]
pub struct IdentityResolverChain {
    identity_type: IdentityType,
    resolvers: Vec<SharedIdentityResolver>,
}

impl IdentityResolverChain {
    pub fn new(identity_type: IdentityType) -> Self {
        Self {
            identity_type,
            resolvers: Vec::new(),
        }
    }

    /// Append a resolver. Resolvers of another identity type are ignored.
    #[must_use]
    pub fn with(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.push(Arc::new(resolver));
        self
    }

    pub fn push(&mut self, resolver: SharedIdentityResolver) {
        if resolver.identity_type() == self.identity_type {
            self.resolvers.push(resolver);
        }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for IdentityResolverChain {
    fn identity_type(&self) -> IdentityType {
        self.identity_type
    }

    async fn resolve_identity(&self, properties: &Context) -> Result<Identity, IdentityError> {
        let mut last = IdentityError::not_found("identity resolver chain is empty");
        for resolver in &self.resolvers {
            match resolver.resolve_identity(properties).await {
                Ok(identity) => return Ok(identity),
                Err(e) if e.is_recoverable() => last = e,
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }
}

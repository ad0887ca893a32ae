//! Identities presented to signers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credential material that never appears in formatted output.
///
/// The backing buffer is zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read-only access to the secret value.
    ///
    /// Callers must not log or persist the returned slice.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// The kind of identity a resolver produces and a scheme consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityType {
    Anonymous,
    ApiKey,
    Login,
    Token,
    Custom(&'static str),
}

/// A resolved identity.
#[derive(Clone, Debug)]
pub enum Identity {
    Anonymous,
    ApiKey(ApiKeyIdentity),
    Login(LoginIdentity),
    Token(TokenIdentity),
    Custom(CustomIdentity),
}

impl Identity {
    pub fn api_key(key: impl Into<String>) -> Self {
        Identity::ApiKey(ApiKeyIdentity::new(key))
    }

    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Identity::Login(LoginIdentity::new(username, password))
    }

    pub fn token(token: impl Into<String>) -> Self {
        Identity::Token(TokenIdentity::new(token))
    }

    pub fn identity_type(&self) -> IdentityType {
        match self {
            Identity::Anonymous => IdentityType::Anonymous,
            Identity::ApiKey(_) => IdentityType::ApiKey,
            Identity::Login(_) => IdentityType::Login,
            Identity::Token(_) => IdentityType::Token,
            Identity::Custom(custom) => IdentityType::Custom(custom.type_name),
        }
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            Identity::Anonymous => None,
            Identity::ApiKey(id) => id.expiration,
            Identity::Login(id) => id.expiration,
            Identity::Token(id) => id.expiration,
            Identity::Custom(id) => id.expiration,
        }
    }

    /// True once the expiration, if any, is at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration().is_some_and(|exp| exp <= now)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiKeyIdentity {
    key: Secret,
    expiration: Option<DateTime<Utc>>,
}

impl ApiKeyIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Secret::new(key),
            expiration: None,
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn key(&self) -> &Secret {
        &self.key
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoginIdentity {
    username: String,
    password: Secret,
    expiration: Option<DateTime<Utc>>,
}

impl LoginIdentity {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password),
            expiration: None,
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Secret {
        &self.password
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenIdentity {
    token: Secret,
    expiration: Option<DateTime<Utc>>,
}

impl TokenIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token),
            expiration: None,
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn token(&self) -> &Secret {
        &self.token
    }
}

/// Identity produced by a custom resolver for a custom auth scheme.
#[derive(Clone)]
pub struct CustomIdentity {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    expiration: Option<DateTime<Utc>>,
}

impl CustomIdentity {
    pub fn new<T: Any + Send + Sync>(type_name: &'static str, value: T) -> Self {
        Self {
            type_name,
            value: Arc::new(value),
            expiration: None,
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for CustomIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomIdentity")
            .field("type_name", &self.type_name)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

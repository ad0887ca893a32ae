//! Auth schemes and auth scheme resolution.

use std::fmt;
use std::sync::{Arc, LazyLock};

use smithy_client_core::{Context, ShapeId};

use super::resolver::{SharedIdentityResolver, StaticIdentityResolver};
use super::signer::{
    API_KEY_LOCATION, API_KEY_NAME, API_KEY_SCHEME, ApiKeyLocation, HttpApiKeySigner,
    HttpBasicSigner, HttpBearerSigner, HttpDigestSigner, NullSigner, Signer,
};
use super::identity::IdentityType;

pub static NO_AUTH_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::new("smithy.api", "noAuth"));
pub static HTTP_API_KEY_AUTH_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::new("smithy.api", "httpApiKeyAuth"));
pub static HTTP_BASIC_AUTH_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::new("smithy.api", "httpBasicAuth"));
pub static HTTP_BEARER_AUTH_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::new("smithy.api", "httpBearerAuth"));
pub static HTTP_DIGEST_AUTH_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::new("smithy.api", "httpDigestAuth"));

/// Settings of the `httpApiKeyAuth` trait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpApiKeyAuth {
    pub name: String,
    pub location: ApiKeyLocation,
    pub scheme: Option<String>,
}

impl HttpApiKeyAuth {
    pub fn header(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ApiKeyLocation::Header,
            scheme: None,
        }
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ApiKeyLocation::Query,
            scheme: None,
        }
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

/// A scheme the client knows how to sign with, beyond the built-in ones.
pub trait CustomAuthScheme: Send + Sync + fmt::Debug {
    fn scheme_id(&self) -> ShapeId;

    fn identity_type(&self) -> IdentityType;

    fn signer(&self) -> Arc<dyn Signer>;

    fn identity_properties(&self) -> Context {
        Context::new()
    }

    fn signer_properties(&self) -> Context {
        Context::new()
    }
}

/// An auth scheme supported by a client.
#[derive(Clone, Debug)]
pub enum AuthScheme {
    /// Sends requests unsigned with an anonymous identity.
    NoAuth,
    HttpApiKey(HttpApiKeyAuth),
    HttpBasic,
    HttpBearer,
    /// Recognized so that it can be skipped in favor of another option.
    HttpDigest,
    Custom(Arc<dyn CustomAuthScheme>),
}

impl AuthScheme {
    pub fn custom(scheme: impl CustomAuthScheme + 'static) -> Self {
        AuthScheme::Custom(Arc::new(scheme))
    }

    pub fn scheme_id(&self) -> ShapeId {
        match self {
            AuthScheme::NoAuth => NO_AUTH_ID.clone(),
            AuthScheme::HttpApiKey(_) => HTTP_API_KEY_AUTH_ID.clone(),
            AuthScheme::HttpBasic => HTTP_BASIC_AUTH_ID.clone(),
            AuthScheme::HttpBearer => HTTP_BEARER_AUTH_ID.clone(),
            AuthScheme::HttpDigest => HTTP_DIGEST_AUTH_ID.clone(),
            AuthScheme::Custom(custom) => custom.scheme_id(),
        }
    }

    pub fn identity_type(&self) -> IdentityType {
        match self {
            AuthScheme::NoAuth => IdentityType::Anonymous,
            AuthScheme::HttpApiKey(_) => IdentityType::ApiKey,
            AuthScheme::HttpBasic | AuthScheme::HttpDigest => IdentityType::Login,
            AuthScheme::HttpBearer => IdentityType::Token,
            AuthScheme::Custom(custom) => custom.identity_type(),
        }
    }

    /// Pick the resolver for this scheme's identity type.
    ///
    /// `NoAuth` always resolves to an anonymous identity and never consults
    /// the configured resolvers.
    pub fn identity_resolver(
        &self,
        resolvers: &[SharedIdentityResolver],
    ) -> Option<SharedIdentityResolver> {
        if matches!(self, AuthScheme::NoAuth) {
            return Some(Arc::new(StaticIdentityResolver::anonymous()));
        }
        let wanted = self.identity_type();
        resolvers
            .iter()
            .find(|r| r.identity_type() == wanted)
            .cloned()
    }

    pub fn signer(&self) -> Arc<dyn Signer> {
        match self {
            AuthScheme::NoAuth => Arc::new(NullSigner),
            AuthScheme::HttpApiKey(_) => Arc::new(HttpApiKeySigner),
            AuthScheme::HttpBasic => Arc::new(HttpBasicSigner),
            AuthScheme::HttpBearer => Arc::new(HttpBearerSigner),
            AuthScheme::HttpDigest => Arc::new(HttpDigestSigner),
            AuthScheme::Custom(custom) => custom.signer(),
        }
    }

    /// Default identity properties, lowest layer before option overrides.
    pub fn identity_properties(&self) -> Context {
        match self {
            AuthScheme::Custom(custom) => custom.identity_properties(),
            _ => Context::new(),
        }
    }

    /// Default signer properties, lowest layer before option overrides.
    pub fn signer_properties(&self) -> Context {
        match self {
            AuthScheme::HttpApiKey(settings) => {
                let mut props = Context::new()
                    .with(&API_KEY_NAME, settings.name.clone())
                    .with(&API_KEY_LOCATION, settings.location);
                if let Some(scheme) = &settings.scheme {
                    props.put(&API_KEY_SCHEME, scheme.clone());
                }
                props
            }
            AuthScheme::Custom(custom) => custom.signer_properties(),
            _ => Context::new(),
        }
    }
}

/// One candidate auth scheme for a call, with property overrides.
#[derive(Clone, Debug)]
pub struct AuthSchemeOption {
    pub scheme_id: ShapeId,
    pub identity_properties: Context,
    pub signer_properties: Context,
}

impl AuthSchemeOption {
    pub fn new(scheme_id: ShapeId) -> Self {
        Self {
            scheme_id,
            identity_properties: Context::new(),
            signer_properties: Context::new(),
        }
    }

    #[must_use]
    pub fn with_identity_properties(mut self, properties: Context) -> Self {
        self.identity_properties = properties;
        self
    }

    #[must_use]
    pub fn with_signer_properties(mut self, properties: Context) -> Self {
        self.signer_properties = properties;
        self
    }
}

/// Inputs to auth scheme resolution.
#[derive(Clone, Copy, Debug)]
pub struct AuthSchemeParams<'a> {
    pub protocol_id: &'a ShapeId,
    pub operation_name: &'a str,
    /// Schemes the operation supports, in model priority order.
    pub operation_auth_schemes: &'a [ShapeId],
    pub properties: &'a Context,
}

/// Custom auth scheme resolution logic.
pub trait ResolveAuthSchemes: Send + Sync {
    fn resolve(&self, params: &AuthSchemeParams<'_>) -> Vec<AuthSchemeOption>;
}

impl<F> ResolveAuthSchemes for F
where
    F: Fn(&AuthSchemeParams<'_>) -> Vec<AuthSchemeOption> + Send + Sync,
{
    fn resolve(&self, params: &AuthSchemeParams<'_>) -> Vec<AuthSchemeOption> {
        self(params)
    }
}

/// Produces the prioritized auth scheme options for a call.
#[derive(Clone, Default)]
pub enum AuthSchemeResolver {
    /// Always `[noAuth]`.
    NoAuth,
    /// The operation's modeled schemes in order, or `[noAuth]` when it has none.
    #[default]
    Default,
    Custom(Arc<dyn ResolveAuthSchemes>),
}

impl AuthSchemeResolver {
    pub const NO_AUTH: AuthSchemeResolver = AuthSchemeResolver::NoAuth;
    pub const DEFAULT: AuthSchemeResolver = AuthSchemeResolver::Default;

    pub fn custom(resolver: impl ResolveAuthSchemes + 'static) -> Self {
        AuthSchemeResolver::Custom(Arc::new(resolver))
    }

    pub fn resolve(&self, params: &AuthSchemeParams<'_>) -> Vec<AuthSchemeOption> {
        match self {
            AuthSchemeResolver::NoAuth => vec![AuthSchemeOption::new(NO_AUTH_ID.clone())],
            AuthSchemeResolver::Default => {
                if params.operation_auth_schemes.is_empty() {
                    return vec![AuthSchemeOption::new(NO_AUTH_ID.clone())];
                }
                params
                    .operation_auth_schemes
                    .iter()
                    .cloned()
                    .map(AuthSchemeOption::new)
                    .collect()
            }
            AuthSchemeResolver::Custom(resolver) => resolver.resolve(params),
        }
    }
}

impl fmt::Debug for AuthSchemeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSchemeResolver::NoAuth => f.write_str("AuthSchemeResolver::NoAuth"),
            AuthSchemeResolver::Default => f.write_str("AuthSchemeResolver::Default"),
            AuthSchemeResolver::Custom(_) => f.write_str("AuthSchemeResolver::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Identity;

    fn params<'a>(schemes: &'a [ShapeId], protocol: &'a ShapeId, props: &'a Context) -> AuthSchemeParams<'a> {
        AuthSchemeParams {
            protocol_id: protocol,
            operation_name: "GetThing",
            operation_auth_schemes: schemes,
            properties: props,
        }
    }

    #[test]
    fn test_default_resolver_uses_operation_schemes() {
        let protocol = ShapeId::new("aws.protocols", "restJson1");
        let props = Context::new();
        let schemes = [HTTP_BEARER_AUTH_ID.clone(), HTTP_API_KEY_AUTH_ID.clone()];
        let options = AuthSchemeResolver::DEFAULT.resolve(&params(&schemes, &protocol, &props));
        let ids: Vec<_> = options.iter().map(|o| o.scheme_id.to_string()).collect();
        assert_eq!(ids, ["smithy.api#httpBearerAuth", "smithy.api#httpApiKeyAuth"]);

        let options = AuthSchemeResolver::DEFAULT.resolve(&params(&[], &protocol, &props));
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].scheme_id, *NO_AUTH_ID);
    }

    #[test]
    fn test_no_auth_resolver_ignores_operation() {
        let protocol = ShapeId::new("aws.protocols", "restJson1");
        let props = Context::new();
        let schemes = [HTTP_BEARER_AUTH_ID.clone()];
        let options = AuthSchemeResolver::NO_AUTH.resolve(&params(&schemes, &protocol, &props));
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].scheme_id, *NO_AUTH_ID);
    }

    #[test]
    fn test_custom_resolver_closure() {
        let resolver = AuthSchemeResolver::custom(|p: &AuthSchemeParams<'_>| {
            vec![AuthSchemeOption::new(ShapeId::new("custom", p.operation_name))]
        });
        let protocol = ShapeId::new("aws.protocols", "restJson1");
        let props = Context::new();
        let options = resolver.resolve(&params(&[], &protocol, &props));
        assert_eq!(options[0].scheme_id.to_string(), "custom#GetThing");
    }

    #[test]
    fn test_identity_resolver_lookup() {
        let resolvers: Vec<SharedIdentityResolver> = vec![Arc::new(StaticIdentityResolver::new(
            Identity::token("t"),
        ))];
        assert!(AuthScheme::HttpBearer.identity_resolver(&resolvers).is_some());
        assert!(AuthScheme::HttpBasic.identity_resolver(&resolvers).is_none());
        assert!(AuthScheme::NoAuth.identity_resolver(&[]).is_some());
    }

    #[test]
    fn test_api_key_signer_properties() {
        let scheme = AuthScheme::HttpApiKey(HttpApiKeyAuth::query("key").with_scheme("ApiKey"));
        let props = scheme.signer_properties();
        assert_eq!(props.get(&API_KEY_NAME).map(String::as_str), Some("key"));
        assert_eq!(props.get(&API_KEY_LOCATION), Some(&ApiKeyLocation::Query));
        assert_eq!(props.get(&API_KEY_SCHEME).map(String::as_str), Some("ApiKey"));
    }
}

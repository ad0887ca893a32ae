//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::fmt;
use std::sync::Arc;

use smithy_client_core::{Context, Key};

use crate::auth::{
    AuthScheme, AuthSchemeResolver, IdentityResolver, SharedIdentityResolver,
};
use crate::client::Client;
use crate::config::{
    ClientConfig, ClientInterceptor, ClientPlugin, RetryPolicy, RetryStrategy,
    StandardRetryStrategy,
};
use crate::endpoint::{Endpoint, EndpointResolver, StaticEndpointResolver};
use crate::error::ClientError;
use crate::plugins::DefaultPlugin;
use crate::protocol::{ClientProtocol, HttpBindingProtocol};
use crate::transport::{ClientTransport, HyperTransport};

/// Builder for a [`Client`] or a bare [`ClientConfig`].
///
/// Plugins are applied when building, in a fixed order regardless of the
/// order the builder methods were called in:
///
/// 1. [`DefaultPlugin`] and the plugins it applies
/// 2. plugins contributed by the protocol
/// 3. plugins contributed by the transport
/// 4. plugins added with [`add_plugin`](Self::add_plugin), in insertion order
///
/// # Example
///
/// ```ignore
/// use smithy_client::{Client, Endpoint, RetryPolicy};
///
/// let client = Client::builder()
///     .endpoint(Endpoint::parse("https://api.example.com")?)
///     .retry_policy(RetryPolicy::aggressive())
///     .build()?;
/// ```
#[derive(Clone, Default)]
pub struct ClientBuilder {
    pub(crate) transport: Option<Arc<dyn ClientTransport>>,
    pub(crate) protocol: Option<Arc<dyn ClientProtocol>>,
    pub(crate) endpoint_resolver: Option<Arc<dyn EndpointResolver>>,
    pub(crate) interceptors: Vec<Arc<dyn ClientInterceptor>>,
    pub(crate) auth_schemes: Vec<AuthScheme>,
    pub(crate) auth_scheme_resolver: Option<AuthSchemeResolver>,
    pub(crate) identity_resolvers: Vec<SharedIdentityResolver>,
    pub(crate) context: Context,
    pub(crate) retry_strategy: Option<Arc<dyn RetryStrategy>>,
    pub(crate) retry_scope: Option<String>,
    pub(crate) plugins: Vec<Arc<dyn ClientPlugin>>,
    pub(crate) applied_plugins: Vec<&'static str>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default: [`HyperTransport`] with default settings.
    pub fn transport(mut self, transport: impl ClientTransport + 'static) -> Self {
        self.set_transport(Arc::new(transport));
        self
    }

    /// Default: [`HttpBindingProtocol::rest_json`].
    pub fn protocol(mut self, protocol: impl ClientProtocol + 'static) -> Self {
        self.set_protocol(Arc::new(protocol));
        self
    }

    pub fn endpoint_resolver(mut self, resolver: impl EndpointResolver + 'static) -> Self {
        self.set_endpoint_resolver(Arc::new(resolver));
        self
    }

    /// Send every call to a fixed endpoint.
    pub fn endpoint(self, endpoint: Endpoint) -> Self {
        self.endpoint_resolver(StaticEndpointResolver::new(endpoint))
    }

    pub fn add_interceptor(mut self, interceptor: impl ClientInterceptor + 'static) -> Self {
        self.push_interceptor(Arc::new(interceptor));
        self
    }

    /// Support an auth scheme. A scheme with the same id is replaced.
    pub fn add_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.push_auth_scheme(scheme);
        self
    }

    /// Default: [`AuthSchemeResolver::DEFAULT`].
    pub fn auth_scheme_resolver(mut self, resolver: AuthSchemeResolver) -> Self {
        self.set_auth_scheme_resolver(resolver);
        self
    }

    pub fn add_identity_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.push_identity_resolver(Arc::new(resolver));
        self
    }

    pub fn put_context<T: Send + Sync + 'static>(mut self, key: &Key<T>, value: T) -> Self {
        self.context.put(key, value);
        self
    }

    /// Default: [`StandardRetryStrategy`] with [`RetryPolicy::default`].
    pub fn retry_strategy(mut self, strategy: impl RetryStrategy + 'static) -> Self {
        self.set_retry_strategy(Arc::new(strategy));
        self
    }

    /// Use a [`StandardRetryStrategy`] with the given policy.
    pub fn retry_policy(self, policy: RetryPolicy) -> Self {
        self.retry_strategy(StandardRetryStrategy::new(policy))
    }

    pub fn retry_scope(mut self, scope: impl Into<String>) -> Self {
        self.retry_scope = Some(scope.into());
        self
    }

    pub fn add_plugin(mut self, plugin: impl ClientPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn set_transport(&mut self, transport: Arc<dyn ClientTransport>) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    pub fn set_protocol(&mut self, protocol: Arc<dyn ClientProtocol>) -> &mut Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn set_endpoint_resolver(&mut self, resolver: Arc<dyn EndpointResolver>) -> &mut Self {
        self.endpoint_resolver = Some(resolver);
        self
    }

    pub fn push_interceptor(&mut self, interceptor: Arc<dyn ClientInterceptor>) -> &mut Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn push_auth_scheme(&mut self, scheme: AuthScheme) -> &mut Self {
        let id = scheme.scheme_id();
        match self.auth_schemes.iter_mut().find(|s| s.scheme_id() == id) {
            Some(existing) => *existing = scheme,
            None => self.auth_schemes.push(scheme),
        }
        self
    }

    pub fn set_auth_scheme_resolver(&mut self, resolver: AuthSchemeResolver) -> &mut Self {
        self.auth_scheme_resolver = Some(resolver);
        self
    }

    pub fn push_identity_resolver(&mut self, resolver: SharedIdentityResolver) -> &mut Self {
        self.identity_resolvers.push(resolver);
        self
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn set_retry_strategy(&mut self, strategy: Arc<dyn RetryStrategy>) -> &mut Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Apply `plugin` now unless a plugin with the same name was already applied.
    ///
    /// Returns whether the plugin ran.
    pub fn apply_plugin(&mut self, plugin: &dyn ClientPlugin) -> bool {
        let name = plugin.name();
        if self.applied_plugins.contains(&name) {
            return false;
        }
        self.applied_plugins.push(name);
        plugin.configure_client(self);
        true
    }

    /// Names of the plugins applied so far, in application order.
    pub fn applied_plugins(&self) -> &[&'static str] {
        &self.applied_plugins
    }

    pub fn build(self) -> Result<Client, ClientBuildError> {
        Ok(Client::from_config(self.build_config()?))
    }

    /// Apply pending plugins and freeze the configuration.
    pub fn build_config(mut self) -> Result<ClientConfig, ClientBuildError> {
        self.apply_plugin(&DefaultPlugin);

        let protocol = match self.protocol.clone() {
            Some(protocol) => protocol,
            None => {
                let protocol: Arc<dyn ClientProtocol> = Arc::new(HttpBindingProtocol::rest_json());
                self.protocol = Some(protocol.clone());
                protocol
            }
        };
        for plugin in protocol.plugins() {
            self.apply_plugin(plugin.as_ref());
        }

        let transport = match self.transport.clone() {
            Some(transport) => transport,
            None => {
                let transport: Arc<dyn ClientTransport> = Arc::new(HyperTransport::new()?);
                self.transport = Some(transport.clone());
                transport
            }
        };
        for plugin in transport.plugins() {
            self.apply_plugin(plugin.as_ref());
        }

        for plugin in self.plugins.clone() {
            self.apply_plugin(plugin.as_ref());
        }

        let endpoint_resolver = self
            .endpoint_resolver
            .clone()
            .ok_or(ClientBuildError::MissingEndpointResolver)?;

        // noAuth is always supported and always first
        self.auth_schemes
            .retain(|s| !matches!(s, AuthScheme::NoAuth));
        self.auth_schemes.insert(0, AuthScheme::NoAuth);

        Ok(ClientConfig {
            transport: self.transport.unwrap_or(transport),
            protocol: self.protocol.unwrap_or(protocol),
            endpoint_resolver,
            interceptors: self.interceptors,
            auth_schemes: self.auth_schemes,
            auth_scheme_resolver: self.auth_scheme_resolver.unwrap_or_default(),
            identity_resolvers: self.identity_resolvers,
            context: self.context,
            retry_strategy: self
                .retry_strategy
                .unwrap_or_else(|| Arc::new(StandardRetryStrategy::default())),
            retry_scope: self.retry_scope,
            plugins: self.plugins,
            applied_plugins: self.applied_plugins,
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("transport", &self.transport)
            .field("protocol", &self.protocol)
            .field("endpoint_resolver", &self.endpoint_resolver)
            .field("interceptor_count", &self.interceptors.len())
            .field("auth_schemes", &self.auth_schemes)
            .field("auth_scheme_resolver", &self.auth_scheme_resolver)
            .field("identity_resolvers", &self.identity_resolvers)
            .field("context", &self.context)
            .field("retry_strategy", &self.retry_strategy)
            .field("retry_scope", &self.retry_scope)
            .field("plugin_count", &self.plugins.len())
            .field("applied_plugins", &self.applied_plugins)
            .finish()
    }
}

/// Error type for client building failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("an endpoint or endpoint resolver is required")]
    MissingEndpointResolver,

    /// Failed to set up TLS for the default transport.
    #[error("failed to configure TLS: {0}")]
    Tls(String),
}

impl From<ClientBuildError> for ClientError {
    fn from(err: ClientBuildError) -> Self {
        ClientError::illegal_state(err.to_string())
    }
}

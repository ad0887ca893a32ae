//! Frozen client configuration.

use std::fmt;
use std::sync::Arc;

use smithy_client_core::Context;

use super::interceptor::ClientInterceptor;
use super::options::RequestOverrideConfig;
use super::plugin::ClientPlugin;
use super::retry::RetryStrategy;
use crate::auth::{AuthScheme, AuthSchemeResolver, SharedIdentityResolver};
use crate::builder::{ClientBuildError, ClientBuilder};
use crate::endpoint::EndpointResolver;
use crate::protocol::ClientProtocol;
use crate::transport::ClientTransport;

/// Everything a client needs to make calls.
///
/// Built by [`ClientBuilder::build_config`]. Immutable once built; derive a
/// changed copy with [`to_builder`](Self::to_builder) or
/// [`with_request_override`](Self::with_request_override).
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) transport: Arc<dyn ClientTransport>,
    pub(crate) protocol: Arc<dyn ClientProtocol>,
    pub(crate) endpoint_resolver: Arc<dyn EndpointResolver>,
    pub(crate) interceptors: Vec<Arc<dyn ClientInterceptor>>,
    pub(crate) auth_schemes: Vec<AuthScheme>,
    pub(crate) auth_scheme_resolver: AuthSchemeResolver,
    pub(crate) identity_resolvers: Vec<SharedIdentityResolver>,
    pub(crate) context: Context,
    pub(crate) retry_strategy: Arc<dyn RetryStrategy>,
    pub(crate) retry_scope: Option<String>,
    pub(crate) plugins: Vec<Arc<dyn ClientPlugin>>,
    pub(crate) applied_plugins: Vec<&'static str>,
}

impl ClientConfig {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn transport(&self) -> &Arc<dyn ClientTransport> {
        &self.transport
    }

    pub fn protocol(&self) -> &Arc<dyn ClientProtocol> {
        &self.protocol
    }

    pub fn endpoint_resolver(&self) -> &Arc<dyn EndpointResolver> {
        &self.endpoint_resolver
    }

    pub fn interceptors(&self) -> &[Arc<dyn ClientInterceptor>] {
        &self.interceptors
    }

    /// Supported auth schemes. `noAuth` is always first.
    pub fn auth_schemes(&self) -> &[AuthScheme] {
        &self.auth_schemes
    }

    pub fn auth_scheme_resolver(&self) -> &AuthSchemeResolver {
        &self.auth_scheme_resolver
    }

    pub fn identity_resolvers(&self) -> &[SharedIdentityResolver] {
        &self.identity_resolvers
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn retry_strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.retry_strategy
    }

    pub fn retry_scope(&self) -> Option<&str> {
        self.retry_scope.as_deref()
    }

    /// Plugins added by the user, in insertion order.
    pub fn plugins(&self) -> &[Arc<dyn ClientPlugin>] {
        &self.plugins
    }

    /// Names of every plugin applied, in application order.
    pub fn applied_plugins(&self) -> &[&'static str] {
        &self.applied_plugins
    }

    /// A builder holding this configuration.
    ///
    /// Plugins already applied are remembered, so building again does not
    /// apply them twice.
    pub fn to_builder(&self) -> ClientBuilder {
        ClientBuilder {
            transport: Some(self.transport.clone()),
            protocol: Some(self.protocol.clone()),
            endpoint_resolver: Some(self.endpoint_resolver.clone()),
            interceptors: self.interceptors.clone(),
            auth_schemes: self.auth_schemes.clone(),
            auth_scheme_resolver: Some(self.auth_scheme_resolver.clone()),
            identity_resolvers: self.identity_resolvers.clone(),
            context: self.context.clone(),
            retry_strategy: Some(self.retry_strategy.clone()),
            retry_scope: self.retry_scope.clone(),
            plugins: self.plugins.clone(),
            applied_plugins: self.applied_plugins.clone(),
        }
    }

    /// A new configuration with `overrides` merged in. `self` is unchanged.
    ///
    /// See [`RequestOverrideConfig`] for the per-field merge rules.
    pub fn with_request_override(
        &self,
        overrides: &RequestOverrideConfig,
    ) -> Result<ClientConfig, ClientBuildError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }

        let mut builder = self.to_builder();
        if let Some(transport) = &overrides.transport {
            builder.transport = Some(transport.clone());
        }
        if let Some(protocol) = &overrides.protocol {
            builder.protocol = Some(protocol.clone());
        }
        if let Some(resolver) = &overrides.endpoint_resolver {
            builder.endpoint_resolver = Some(resolver.clone());
        }
        builder
            .interceptors
            .extend(overrides.interceptors.iter().cloned());
        for scheme in &overrides.auth_schemes {
            builder.push_auth_scheme(scheme.clone());
        }
        if let Some(resolver) = &overrides.auth_scheme_resolver {
            builder.auth_scheme_resolver = Some(resolver.clone());
        }
        if !overrides.identity_resolvers.is_empty() {
            let mut resolvers = overrides.identity_resolvers.clone();
            resolvers.append(&mut builder.identity_resolvers);
            builder.identity_resolvers = resolvers;
        }
        overrides.context.copy_to(&mut builder.context);
        if let Some(strategy) = &overrides.retry_strategy {
            builder.retry_strategy = Some(strategy.clone());
        }
        if let Some(scope) = &overrides.retry_scope {
            builder.retry_scope = Some(scope.clone());
        }
        builder.plugins.extend(overrides.plugins.iter().cloned());

        builder.build_config()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
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
            .field("applied_plugins", &self.applied_plugins)
            .finish_non_exhaustive()
    }
}

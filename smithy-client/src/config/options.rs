//! Per-call configuration overrides.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use smithy_client_core::{Context, Key};

use super::interceptor::{ClientInterceptor, HeaderInterceptor};
use super::plugin::ClientPlugin;
use super::retry::RetryStrategy;
use crate::auth::{AuthScheme, AuthSchemeResolver, IdentityResolver, SharedIdentityResolver};
use crate::call_context::{API_CALL_ATTEMPT_TIMEOUT, API_CALL_TIMEOUT};
use crate::endpoint::{Endpoint, EndpointResolver, StaticEndpointResolver};
use crate::protocol::ClientProtocol;
use crate::transport::ClientTransport;

/// Configuration that differs from the client's for a single call.
///
/// Merged into the client configuration per field:
/// - single-valued components (transport, protocol, resolvers, retry strategy) replace the client's
/// - interceptors run after the client's
/// - auth schemes replace a client scheme with the same id, else are added
/// - identity resolvers take precedence over the client's
/// - context values are layered on top of the client's
/// - plugins are applied unless the client already applied one of the same name
///
/// # Example
///
/// ```ignore
/// use smithy_client::RequestOverrideConfig;
/// use std::time::Duration;
///
/// let options = RequestOverrideConfig::new()
///     .timeout(Duration::from_secs(5))
///     .try_header("x-request-id", "abc-123")
///     .unwrap();
///
/// let output = client.call_with_options(&GetThing, &input, options).await?;
/// ```
#[derive(Clone, Default)]
pub struct RequestOverrideConfig {
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
}

impl RequestOverrideConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, transport: impl ClientTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn protocol(mut self, protocol: impl ClientProtocol + 'static) -> Self {
        self.protocol = Some(Arc::new(protocol));
        self
    }

    pub fn endpoint_resolver(mut self, resolver: impl EndpointResolver + 'static) -> Self {
        self.endpoint_resolver = Some(Arc::new(resolver));
        self
    }

    /// Send this call to a fixed endpoint.
    pub fn endpoint(self, endpoint: Endpoint) -> Self {
        self.endpoint_resolver(StaticEndpointResolver::new(endpoint))
    }

    pub fn add_interceptor(mut self, interceptor: impl ClientInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn add_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_schemes.push(scheme);
        self
    }

    pub fn auth_scheme_resolver(mut self, resolver: AuthSchemeResolver) -> Self {
        self.auth_scheme_resolver = Some(resolver);
        self
    }

    pub fn add_identity_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.identity_resolvers.push(Arc::new(resolver));
        self
    }

    pub fn put_context<T: Send + Sync + 'static>(mut self, key: &Key<T>, value: T) -> Self {
        self.context.put(key, value);
        self
    }

    pub fn retry_strategy(mut self, strategy: impl RetryStrategy + 'static) -> Self {
        self.retry_strategy = Some(Arc::new(strategy));
        self
    }

    pub fn retry_scope(mut self, scope: impl Into<String>) -> Self {
        self.retry_scope = Some(scope.into());
        self
    }

    pub fn add_plugin(mut self, plugin: impl ClientPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Bound the whole call, retries included.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.put_context(&API_CALL_TIMEOUT, timeout)
    }

    /// Bound each transmit.
    pub fn attempt_timeout(self, timeout: Duration) -> Self {
        self.put_context(&API_CALL_ATTEMPT_TIMEOUT, timeout)
    }

    /// Set a header on this call's requests.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header(self, name: &str, value: &str) -> Option<Self> {
        let interceptor = HeaderInterceptor::new(name, value).ok()?;
        Some(self.add_interceptor(interceptor))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.context.get(&API_CALL_TIMEOUT).copied()
    }

    /// True when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.transport.is_none()
            && self.protocol.is_none()
            && self.endpoint_resolver.is_none()
            && self.interceptors.is_empty()
            && self.auth_schemes.is_empty()
            && self.auth_scheme_resolver.is_none()
            && self.identity_resolvers.is_empty()
            && self.context.is_empty()
            && self.retry_strategy.is_none()
            && self.retry_scope.is_none()
            && self.plugins.is_empty()
    }
}

impl fmt::Debug for RequestOverrideConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOverrideConfig")
            .field("transport", &self.transport)
            .field("protocol", &self.protocol)
            .field("endpoint_resolver", &self.endpoint_resolver)
            .field("interceptors", &self.interceptors.len())
            .field("auth_schemes", &self.auth_schemes)
            .field("auth_scheme_resolver", &self.auth_scheme_resolver)
            .field("identity_resolvers", &self.identity_resolvers)
            .field("context", &self.context)
            .field("retry_strategy", &self.retry_strategy)
            .field("retry_scope", &self.retry_scope)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(RequestOverrideConfig::new().is_empty());
    }

    #[test]
    fn test_timeouts_go_to_context() {
        let options = RequestOverrideConfig::new()
            .timeout(Duration::from_secs(30))
            .attempt_timeout(Duration::from_secs(5));
        assert_eq!(options.get_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            options.context().get(&API_CALL_ATTEMPT_TIMEOUT),
            Some(&Duration::from_secs(5))
        );
        assert!(!options.is_empty());
    }

    #[test]
    fn test_try_header() {
        let options = RequestOverrideConfig::new()
            .try_header("x-request-id", "abc-123")
            .unwrap();
        assert_eq!(options.interceptors.len(), 1);
        assert!(
            RequestOverrideConfig::new()
                .try_header("bad header", "v")
                .is_none()
        );
    }
}

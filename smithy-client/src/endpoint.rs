//! Endpoint resolution.

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use http::{HeaderMap, Uri};
use smithy_client_core::{Context, Document, Key, OperationSchema, ShapeId};

use crate::error::ClientError;

/// Endpoint attribute: headers merged into every request sent to the endpoint.
pub static HEADERS: LazyLock<Key<HeaderMap>> = LazyLock::new(|| Key::new("endpoint_headers"));

/// Per-endpoint override of an auth scheme's properties.
#[derive(Clone, Debug)]
pub struct EndpointAuthScheme {
    scheme_id: ShapeId,
    attributes: Context,
}

impl EndpointAuthScheme {
    pub fn new(scheme_id: ShapeId, attributes: Context) -> Self {
        Self {
            scheme_id,
            attributes,
        }
    }

    pub fn scheme_id(&self) -> &ShapeId {
        &self.scheme_id
    }

    pub fn attributes(&self) -> &Context {
        &self.attributes
    }
}

/// Where to send a request.
#[derive(Clone, Debug)]
pub struct Endpoint {
    uri: Uri,
    auth_schemes: Vec<EndpointAuthScheme>,
    attributes: Context,
}

impl Endpoint {
    pub fn builder(uri: Uri) -> EndpointBuilder {
        EndpointBuilder {
            endpoint: Endpoint {
                uri,
                auth_schemes: Vec::new(),
                attributes: Context::new(),
            },
        }
    }

    /// Parse an absolute URI such as `https://example.com/base`.
    pub fn parse(uri: &str) -> Result<Endpoint, ClientError> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| ClientError::illegal_state(format!("invalid endpoint `{uri}`: {e}")))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(ClientError::illegal_state(format!(
                "endpoint `{uri}` must be absolute"
            )));
        }
        Ok(Endpoint::builder(uri).build())
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn auth_schemes(&self) -> &[EndpointAuthScheme] {
        &self.auth_schemes
    }

    /// The endpoint's override for `scheme_id`, if any.
    pub fn auth_scheme(&self, scheme_id: &ShapeId) -> Option<&EndpointAuthScheme> {
        self.auth_schemes
            .iter()
            .find(|s| s.scheme_id() == scheme_id)
    }

    pub fn attributes(&self) -> &Context {
        &self.attributes
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.attributes.get(&HEADERS)
    }
}

/// Builder for [`Endpoint`].
#[derive(Debug)]
pub struct EndpointBuilder {
    endpoint: Endpoint,
}

impl EndpointBuilder {
    #[must_use]
    pub fn auth_scheme(mut self, scheme: EndpointAuthScheme) -> Self {
        self.endpoint.auth_schemes.push(scheme);
        self
    }

    #[must_use]
    pub fn attribute<T: Send + Sync + 'static>(mut self, key: &Key<T>, value: T) -> Self {
        self.endpoint.attributes.put(key, value);
        self
    }

    #[must_use]
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.attribute(&HEADERS, headers)
    }

    pub fn build(self) -> Endpoint {
        self.endpoint
    }
}

/// Inputs to endpoint resolution.
#[derive(Clone, Copy, Debug)]
pub struct EndpointResolverParams<'a> {
    pub operation: &'a OperationSchema,
    pub input: &'a Document,
    pub properties: &'a Context,
}

/// Resolves the endpoint for each attempt.
#[async_trait]
pub trait EndpointResolver: Send + Sync + fmt::Debug {
    async fn resolve_endpoint(
        &self,
        params: EndpointResolverParams<'_>,
    ) -> Result<Endpoint, ClientError>;
}

/// Returns the same endpoint for every call.
#[derive(Clone, Debug)]
pub struct StaticEndpointResolver {
    endpoint: Endpoint,
}

impl StaticEndpointResolver {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl EndpointResolver for StaticEndpointResolver {
    async fn resolve_endpoint(
        &self,
        _params: EndpointResolverParams<'_>,
    ) -> Result<Endpoint, ClientError> {
        Ok(self.endpoint.clone())
    }
}

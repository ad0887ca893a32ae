//! Request signers for the built-in auth schemes.

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use base64::Engine;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::uri::{PathAndQuery, Uri};
use smithy_client_core::{Context, Key};

use super::identity::Identity;
use crate::error::ClientError;
use crate::transport::HttpRequest;

/// Where an API key is placed on the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Header or query parameter name carrying the API key.
pub static API_KEY_NAME: LazyLock<Key<String>> = LazyLock::new(|| Key::new("api_key_name"));

pub static API_KEY_LOCATION: LazyLock<Key<ApiKeyLocation>> =
    LazyLock::new(|| Key::new("api_key_location"));

/// Optional scheme prefix written before a header API key, e.g. `Bearer`.
pub static API_KEY_SCHEME: LazyLock<Key<String>> = LazyLock::new(|| Key::new("api_key_scheme"));

/// Applies an identity to an outgoing request.
#[async_trait]
pub trait Signer: Send + Sync + fmt::Debug {
    async fn sign(
        &self,
        request: HttpRequest,
        identity: &Identity,
        properties: &Context,
    ) -> Result<HttpRequest, ClientError>;
}

/// Leaves requests untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSigner;

#[async_trait]
impl Signer for NullSigner {
    async fn sign(
        &self,
        request: HttpRequest,
        _identity: &Identity,
        _properties: &Context,
    ) -> Result<HttpRequest, ClientError> {
        Ok(request)
    }
}

fn sensitive_value(value: &str) -> Result<HeaderValue, ClientError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| ClientError::illegal_state(format!("invalid credential header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn wrong_identity(scheme: &str, identity: &Identity) -> ClientError {
    ClientError::illegal_state(format!(
        "{scheme} signer cannot use a {:?} identity",
        identity.identity_type()
    ))
}

/// Places an API key in a header or query parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpApiKeySigner;

#[async_trait]
impl Signer for HttpApiKeySigner {
    async fn sign(
        &self,
        mut request: HttpRequest,
        identity: &Identity,
        properties: &Context,
    ) -> Result<HttpRequest, ClientError> {
        let Identity::ApiKey(api_key) = identity else {
            return Err(wrong_identity("httpApiKeyAuth", identity));
        };
        let name = properties
            .get(&API_KEY_NAME)
            .ok_or_else(|| ClientError::illegal_state("httpApiKeyAuth requires a key name"))?;
        let location = properties
            .get(&API_KEY_LOCATION)
            .copied()
            .unwrap_or(ApiKeyLocation::Header);
        let key = api_key.key().expose();

        match location {
            ApiKeyLocation::Header => {
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    ClientError::illegal_state(format!("invalid api key header name: {e}"))
                })?;
                let value = match properties.get(&API_KEY_SCHEME) {
                    Some(scheme) => sensitive_value(&format!("{scheme} {key}"))?,
                    None => sensitive_value(key)?,
                };
                if request.headers().contains_key(&header) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(header = %header, "replacing existing header with api key");
                }
                request.headers_mut().insert(header, value);
            }
            ApiKeyLocation::Query => {
                let uri = with_query_param(request.uri(), name, key)?;
                *request.uri_mut() = uri;
            }
        }
        Ok(request)
    }
}

/// Rebuild `uri` with `name` set to `value`, dropping any existing parameter
/// of the same name.
fn with_query_param(uri: &Uri, name: &str, value: &str) -> Result<Uri, ClientError> {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            urlencoding::decode(key).map_or(true, |k| k != name)
        })
        .collect();
    let added = format!(
        "{}={}",
        urlencoding::encode(name),
        urlencoding::encode(value)
    );
    pairs.push(&added);

    let path_and_query = format!("{}?{}", uri.path(), pairs.join("&"));
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| ClientError::illegal_state(format!("invalid query: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| ClientError::illegal_state(format!("invalid uri: {e}")))
}

/// `Authorization: Basic base64(username:password)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpBasicSigner;

#[async_trait]
impl Signer for HttpBasicSigner {
    async fn sign(
        &self,
        mut request: HttpRequest,
        identity: &Identity,
        _properties: &Context,
    ) -> Result<HttpRequest, ClientError> {
        let Identity::Login(login) = identity else {
            return Err(wrong_identity("httpBasicAuth", identity));
        };
        let credentials = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            login.username(),
            login.password().expose()
        ));
        request
            .headers_mut()
            .insert(AUTHORIZATION, sensitive_value(&format!("Basic {credentials}"))?);
        Ok(request)
    }
}

/// `Authorization: Bearer <token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpBearerSigner;

#[async_trait]
impl Signer for HttpBearerSigner {
    async fn sign(
        &self,
        mut request: HttpRequest,
        identity: &Identity,
        _properties: &Context,
    ) -> Result<HttpRequest, ClientError> {
        let Identity::Token(token) = identity else {
            return Err(wrong_identity("httpBearerAuth", identity));
        };
        request.headers_mut().insert(
            AUTHORIZATION,
            sensitive_value(&format!("Bearer {}", token.token().expose()))?,
        );
        Ok(request)
    }
}

/// Digest auth needs a server challenge round trip, which the client does not perform.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpDigestSigner;

#[async_trait]
impl Signer for HttpDigestSigner {
    async fn sign(
        &self,
        _request: HttpRequest,
        _identity: &Identity,
        _properties: &Context,
    ) -> Result<HttpRequest, ClientError> {
        Err(ClientError::unsupported("httpDigestAuth signing is not supported"))
    }
}

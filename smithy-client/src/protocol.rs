//! Client protocols.
//!
//! A [`ClientProtocol`] turns an operation input into an HTTP request and an
//! HTTP response back into an output document or an error. The pipeline
//! drives it once per attempt:
//!
//! 1. [`create_request`](ClientProtocol::create_request) with a path-only URI
//! 2. [`set_service_endpoint`](ClientProtocol::set_service_endpoint) once the
//!    endpoint is resolved
//! 3. [`deserialize_response`](ClientProtocol::deserialize_response) after the
//!    exchange

pub mod binding;
mod deserializer;
pub mod error_parser;
pub mod event_stream;
pub mod headers;
mod http_binding;
mod serializer;
pub mod uri;

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Uri};
use smithy_client_core::{Context, Document, OperationSchema, ShapeId};

use crate::config::ClientPlugin;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::transport::{HttpRequest, HttpResponse};

pub use binding::{Binding, BindingMatcher, Direction};
pub use error_parser::ErrorIdSource;
pub use http_binding::HttpBindingProtocol;

/// Serializes requests and deserializes responses for one wire protocol.
pub trait ClientProtocol: Send + Sync + fmt::Debug {
    /// Shape id of the protocol trait, e.g. `aws.protocols#restJson1`.
    fn id(&self) -> &ShapeId;

    fn create_request(
        &self,
        operation: &OperationSchema,
        input: &Document,
        context: &Context,
    ) -> Result<HttpRequest, ClientError>;

    /// Point a request at the resolved endpoint: its scheme, authority and
    /// base path are prepended, and its `HEADERS` attribute replaces any
    /// request headers of the same name.
    fn set_service_endpoint(
        &self,
        request: HttpRequest,
        endpoint: &Endpoint,
    ) -> Result<HttpRequest, ClientError> {
        apply_endpoint(request, endpoint)
    }

    /// Decode a response. Non-2xx responses produce an error.
    fn deserialize_response(
        &self,
        operation: &OperationSchema,
        context: &Context,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<Document, ClientError>;

    /// Plugins applied to every client using this protocol.
    fn plugins(&self) -> Vec<Arc<dyn ClientPlugin>> {
        Vec::new()
    }
}

/// Merge an endpoint into a request with a path-only URI.
pub fn apply_endpoint(request: HttpRequest, endpoint: &Endpoint) -> Result<HttpRequest, ClientError> {
    let (mut parts, body) = request.into_parts();
    let base = endpoint.uri();

    let mut target = base.path().trim_end_matches('/').to_string();
    match parts.uri.path_and_query() {
        Some(pq) => target.push_str(pq.as_str()),
        None => target.push('/'),
    }
    if let Some(query) = base.query() {
        target.push(if target.contains('?') { '&' } else { '?' });
        target.push_str(query);
    }

    let mut uri = Uri::builder().path_and_query(target);
    if let Some(scheme) = base.scheme() {
        uri = uri.scheme(scheme.clone());
    }
    if let Some(authority) = base.authority() {
        uri = uri.authority(authority.clone());
    }
    parts.uri = uri
        .build()
        .map_err(|e| ClientError::illegal_state(format!("invalid endpoint URI: {e}")))?;

    if let Some(headers) = endpoint.headers() {
        merge_headers(&mut parts.headers, headers);
    }
    Ok(HttpRequest::from_parts(parts, body))
}

fn merge_headers(target: &mut HeaderMap, extra: &HeaderMap) {
    for name in extra.keys() {
        target.remove(name);
        for value in extra.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::HeaderValue;

    fn request(uri: &str) -> HttpRequest {
        http::Request::builder()
            .uri(uri)
            .header("x-trace", "request")
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_apply_endpoint_joins_base_path() {
        let endpoint = Endpoint::parse("https://api.example.com/v1/").unwrap();
        let req = apply_endpoint(request("/things/1?a=b"), &endpoint).unwrap();
        assert_eq!(req.uri().to_string(), "https://api.example.com/v1/things/1?a=b");
    }

    #[test]
    fn test_apply_endpoint_keeps_endpoint_query() {
        let endpoint = Endpoint::parse("http://localhost:8080/?region=west").unwrap();
        let req = apply_endpoint(request("/things"), &endpoint).unwrap();
        assert_eq!(req.uri().to_string(), "http://localhost:8080/things?region=west");
    }

    #[test]
    fn test_apply_endpoint_headers_replace() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("endpoint"));
        headers.append("x-extra", HeaderValue::from_static("1"));
        headers.append("x-extra", HeaderValue::from_static("2"));
        let endpoint = Endpoint::builder(Uri::from_static("https://api.example.com"))
            .headers(headers)
            .build();
        let req = apply_endpoint(request("/"), &endpoint).unwrap();
        assert_eq!(req.headers()["x-trace"], "endpoint");
        assert_eq!(req.headers().get_all("x-extra").iter().count(), 2);
    }
}

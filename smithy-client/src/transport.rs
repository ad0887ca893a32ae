//! Sending serialized requests.
//!
//! The pipeline hands each signed, fully buffered [`HttpRequest`] to a
//! [`ClientTransport`] and gets the buffered [`HttpResponse`] back. Transports
//! may also contribute [`ClientPlugin`]s to every client they are installed on.
//!
//! [`HyperTransport`] is the default: pooled HTTP/1.1 and HTTP/2 with rustls.
//! Which crypto provider and root store it uses is picked with the `tls-*`
//! cargo features; `tls` turns on ring with the system roots.
//!
//! ```ignore
//! use smithy_client::transport::HyperTransport;
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_max_idle_per_host(8)
//!     .h2_keep_alive_interval(Duration::from_secs(30))
//!     .build()?;
//! ```

mod connector;
mod hyper;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use smithy_client_core::Context;

use crate::config::ClientPlugin;
use crate::error::ClientError;

pub use connector::{
    InsecureCertVerifier, build_https_connector, has_tls_support, insecure_tls_config,
};

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub use connector::default_tls_config;

pub use hyper::{HyperTransport, HyperTransportBuilder};

pub use rustls::ClientConfig as TlsClientConfig;

/// A fully buffered HTTP request.
pub type HttpRequest = http::Request<Bytes>;

/// A fully buffered HTTP response.
pub type HttpResponse = http::Response<Bytes>;

/// Sends serialized requests to a service.
#[async_trait]
pub trait ClientTransport: Send + Sync + fmt::Debug {
    /// Send `request`, honoring any attempt timeout found in `context`.
    async fn send(&self, context: &Context, request: HttpRequest)
    -> Result<HttpResponse, ClientError>;

    /// Plugins applied to every client using this transport.
    fn plugins(&self) -> Vec<Arc<dyn ClientPlugin>> {
        Vec::new()
    }
}

/// Copy a buffered request. Extensions are not carried over.
pub fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut copy = http::Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

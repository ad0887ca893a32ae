//! [`ClientTransport`] over hyper_util's pooled legacy client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Builder as PoolBuilder, Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use smithy_client_core::Context;

use super::connector::{build_https_connector, insecure_tls_config};
use super::{ClientTransport, HttpRequest, HttpResponse, TlsClientConfig};
use crate::builder::ClientBuildError;
use crate::call_context::API_CALL_ATTEMPT_TIMEOUT;
use crate::error::ClientError;

/// Sends buffered requests over pooled HTTP/1.1 or HTTP/2 connections.
///
/// Clones share one connection pool. An `API_CALL_ATTEMPT_TIMEOUT` in the
/// call context bounds each exchange, body read included.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Transport with TLS roots from the enabled features and default pooling.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let (parts, body) = self
            .client
            .request(request.map(Full::new))
            .await
            .map_err(|e| ClientError::transport_with_source(format!("send failed: {e}"), e))?
            .into_parts();
        let collected = body.collect().await.map_err(|e| {
            ClientError::transport_with_source(format!("reading response body failed: {e}"), e)
        })?;
        Ok(HttpResponse::from_parts(parts, collected.to_bytes()))
    }
}

#[async_trait]
impl ClientTransport for HyperTransport {
    async fn send(
        &self,
        context: &Context,
        request: HttpRequest,
    ) -> Result<HttpResponse, ClientError> {
        let Some(&limit) = context.get(&API_CALL_ATTEMPT_TIMEOUT) else {
            return self.round_trip(request).await;
        };
        tokio::time::timeout(limit, self.round_trip(request))
            .await
            .unwrap_or_else(|_| Err(ClientError::timeout(limit)))
    }
}

/// How server certificates are checked.
#[derive(Debug, Default)]
enum TlsMode {
    /// Roots chosen by cargo features.
    #[default]
    FeatureRoots,
    Custom(TlsClientConfig),
    AcceptInvalid,
}

impl TlsMode {
    fn into_config(self) -> Result<Option<TlsClientConfig>, ClientBuildError> {
        match self {
            Self::FeatureRoots => Ok(None),
            Self::Custom(config) => Ok(Some(config)),
            Self::AcceptInvalid => insecure_tls_config().map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PoolSettings {
    idle_timeout: Option<Duration>,
    max_idle_per_host: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(90)),
            max_idle_per_host: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Http2Settings {
    only: bool,
    stream_window: Option<u32>,
    connection_window: Option<u32>,
    keep_alive_interval: Option<Duration>,
    keep_alive_timeout: Option<Duration>,
}

impl Http2Settings {
    fn apply(&self, builder: &mut PoolBuilder) {
        builder.http2_only(self.only);
        if let Some(size) = self.stream_window {
            builder.http2_initial_stream_window_size(size);
        }
        if let Some(size) = self.connection_window {
            builder.http2_initial_connection_window_size(size);
        }
        if let Some(interval) = self.keep_alive_interval {
            builder.http2_keep_alive_interval(interval);
        }
        if let Some(timeout) = self.keep_alive_timeout {
            builder.http2_keep_alive_timeout(timeout);
        }
    }
}

/// Builder for [`HyperTransport`].
#[derive(Debug, Default)]
pub struct HyperTransportBuilder {
    tls: TlsMode,
    pool: PoolSettings,
    http2: Http2Settings,
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust roots and client certificates from `config` instead of the
    /// feature defaults.
    pub fn tls_config(mut self, config: TlsClientConfig) -> Self {
        self.tls = TlsMode::Custom(config);
        self
    }

    /// Accept any server certificate. Never use against production services.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.tls = TlsMode::AcceptInvalid;
        self
    }

    /// Speak HTTP/2 without negotiation (prior knowledge).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2.only = enabled;
        self
    }

    /// Drop pooled connections idle for longer than `timeout`. Default 90s.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool.idle_timeout = Some(timeout);
        self
    }

    /// Keep idle connections until the server closes them.
    pub fn pool_idle_timeout_none(mut self) -> Self {
        self.pool.idle_timeout = None;
        self
    }

    /// Default 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool.max_idle_per_host = max;
        self
    }

    pub fn h2_initial_stream_window_size(mut self, size: u32) -> Self {
        self.http2.stream_window = Some(size);
        self
    }

    pub fn h2_initial_connection_window_size(mut self, size: u32) -> Self {
        self.http2.connection_window = Some(size);
        self
    }

    pub fn h2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.http2.keep_alive_interval = Some(interval);
        self
    }

    /// Ignored unless a keep-alive interval is set.
    pub fn h2_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.http2.keep_alive_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let connector = build_https_connector(self.tls.into_config()?)?;

        let mut builder = Client::builder(TokioExecutor::new());
        // idle expiry needs a timer
        builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool.idle_timeout)
            .pool_max_idle_per_host(self.pool.max_idle_per_host);
        self.http2.apply(&mut builder);

        Ok(HyperTransport {
            client: builder.build(connector),
            http2_only: self.http2.only,
        })
    }
}

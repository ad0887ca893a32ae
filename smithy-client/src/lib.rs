//! Client runtime for Smithy modeled services.
//!
//! This crate executes modeled operations against remote services. Calls are
//! described by an [`OperationSchema`](smithy_client_core::OperationSchema)
//! and a [`Document`](smithy_client_core::Document) input, and run through a
//! fixed pipeline of interceptor hooks, endpoint resolution, auth selection,
//! signing, transmission, deserialization and retries.
//!
//! ## Features
//!
//! - Typed calls through [`ApiOperation`](smithy_client_core::ApiOperation)
//!   or dynamic calls with documents
//! - HTTP binding protocols with labels, query strings, headers, payloads
//!   and response codes ([`HttpBindingProtocol`])
//! - Modeled error resolution from `X-Amzn-Errortype` or the error body
//! - Auth schemes: `noAuth`, API key, basic, bearer, and custom schemes
//! - Retry strategies with exponential backoff, `Retry-After` support and
//!   modeled retry traits
//! - Idempotency token injection
//! - Interceptors and plugins
//!
//! ## Example
//!
//! ```ignore
//! use smithy_client::{Client, Endpoint};
//!
//! let client = Client::builder()
//!     .endpoint(Endpoint::parse("https://sprockets.example.com")?)
//!     .build()?;
//!
//! let output = client
//!     .call(&CreateSprocket, &CreateSprocketInput { name: "gear".into(), token: None })
//!     .await?;
//! println!("created {}", output.id);
//! ```
//!
//! ## Dynamic Calls
//!
//! Operations can be called without generated types by passing a document:
//!
//! ```ignore
//! use smithy_client::RequestOverrideConfig;
//! use smithy_client_core::Document;
//!
//! let input = Document::structure().with_member("id", "s-1");
//! let response = client
//!     .call_document(&get_sprocket_schema, input, RequestOverrideConfig::new())
//!     .await?;
//! println!("status: {}", response.metadata().status());
//! ```
//!
//! ## Feature Flags
//!
//! ### TLS
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls` (default) | `tls-ring` + `tls-native-roots` | |
//! | `tls-ring` | ring crypto provider | `rustls/ring` |
//! | `tls-aws-lc` | aws-lc-rs crypto provider | `rustls/aws-lc-rs` |
//! | `tls-native-roots` | System root certificates | `rustls-native-certs` |
//! | `tls-webpki-roots` | Bundled Mozilla roots | `webpki-roots` |
//!
//! ### Observability
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tracing` (default) | Spans for calls, debug events for retries and auth | `tracing` |
//!
//! When enabled, each call creates a `smithy.call` span with:
//! - `rpc.service`: Service shape id
//! - `rpc.method`: Operation name
//! - `rpc.protocol`: Protocol shape id (e.g., "aws.protocols#restJson1")
//! - `otel.kind`: "client"
//!
//! ## Retries
//!
//! Every client has a [`RetryStrategy`]. The default is a
//! [`StandardRetryStrategy`] over [`RetryPolicy::default()`]:
//!
//! ```ignore
//! use smithy_client::{Client, RetryPolicy};
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .endpoint(endpoint)
//!     .retry_policy(
//!         RetryPolicy::new()
//!             .max_retries(5)
//!             .base_delay(Duration::from_millis(100)),
//!     )
//!     .build()?;
//! ```
//!
//! An attempt is retried only when its error is marked retry-safe. Errors are
//! classified by:
//! - the `@retryable` trait of a modeled error
//! - failures of `@readonly` or `@idempotent` operations that are not the
//!   client's fault, transport failures included
//! - `Retry-After`, 429 and 503 responses (throttling)
//! - 5xx responses of calls that sent an idempotency token
//!
//! Use [`ClientError::is_retry_safe()`] and [`ErrorKind`] to inspect errors:
//!
//! ```ignore
//! use smithy_client::ErrorKind;
//!
//! match client.call(&GetSprocket, &input).await {
//!     Ok(output) => println!("{output:?}"),
//!     Err(e) if e.is_throttle() => eprintln!("throttled, retry after {:?}", e.retry_after()),
//!     Err(e) => match e.kind() {
//!         ErrorKind::Modeled(m) => eprintln!("{}: {:?}", m.id(), m.message()),
//!         other => eprintln!("{other}"),
//!     },
//! }
//! ```
//!
//! ## Per-Call Options
//!
//! For per-call customization, use [`RequestOverrideConfig`]:
//!
//! ```ignore
//! use smithy_client::{HeaderInterceptor, RequestOverrideConfig};
//! use std::time::Duration;
//!
//! let options = RequestOverrideConfig::new()
//!     .timeout(Duration::from_secs(5))
//!     .add_interceptor(HeaderInterceptor::from_static("x-request-id", "abc-123"));
//!
//! let output = client.call_with_options(&GetSprocket, &input, options).await?;
//! ```

pub mod auth;
mod builder;
pub mod call_context;
mod client;
pub mod config;
pub mod endpoint;
mod error;
mod pipeline;
pub mod plugins;
pub mod protocol;
mod response;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder};
pub use client::Client;
pub use config::{
    AttemptInfo, ClientConfig, ClientInterceptor, ClientPlugin, ExponentialBackoff,
    HeaderInterceptor, HookContext, RequestOverrideConfig, RetryPolicy, RetryStrategy,
    StandardRetryStrategy,
};
pub use endpoint::{Endpoint, EndpointResolver, StaticEndpointResolver};
pub use error::{AuthOptionFailure, AuthResolutionError, ClientError, ErrorKind, ModeledError};
pub use protocol::{ClientProtocol, HttpBindingProtocol};
pub use response::{ApiResponse, ResponseMetadata};
pub use transport::{ClientTransport, HttpRequest, HttpResponse, HyperTransport};

// Re-export core types commonly used alongside the client
pub use smithy_client_core::{
    ApiOperation, Context, Document, Fault, Key, OperationSchema, RetrySafety, Schema, Shape,
    ShapeId,
};

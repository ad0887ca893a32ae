//! Client configuration: retry strategies, interceptors, plugins and
//! per-call overrides.

mod client_config;
mod interceptor;
mod options;
mod plugin;
mod retry;

pub use client_config::ClientConfig;
pub use interceptor::{AttemptInfo, ClientInterceptor, HeaderInterceptor, HookContext};
pub use options::RequestOverrideConfig;
pub use plugin::ClientPlugin;
pub use retry::{
    AcquireInitialRetryTokenRequest, AcquireInitialRetryTokenResponse, ExponentialBackoff,
    RecordSuccessRequest, RefreshRetryTokenRequest, RefreshRetryTokenResponse, RetryPolicy,
    RetryStrategy, RetryToken, StandardRetryStrategy, TokenAcquisitionFailed, defaults,
};

//! Well-known context keys read and written during a call.

use std::sync::LazyLock;
use std::time::Duration;

use smithy_client_core::{Key, ShapeId};

/// Upper bound on the whole call, including every retry and backoff sleep.
pub static API_CALL_TIMEOUT: LazyLock<Key<Duration>> =
    LazyLock::new(|| Key::new("api_call_timeout"));

/// Upper bound on a single transmit of a request.
pub static API_CALL_ATTEMPT_TIMEOUT: LazyLock<Key<Duration>> =
    LazyLock::new(|| Key::new("api_call_attempt_timeout"));

/// One-based attempt number, present on each attempt's context.
pub static RETRY_ATTEMPT: LazyLock<Key<u32>> = LazyLock::new(|| Key::new("retry_attempt"));

/// Id of the auth scheme chosen for the current attempt.
pub static SELECTED_AUTH_SCHEME: LazyLock<Key<ShapeId>> =
    LazyLock::new(|| Key::new("selected_auth_scheme"));

/// The idempotency token sent with the call, when the operation has one.
pub static IDEMPOTENCY_TOKEN: LazyLock<Key<String>> =
    LazyLock::new(|| Key::new("idempotency_token"));

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime};

use http::HeaderMap;
use http::header::{DATE, RETRY_AFTER};
use smithy_client_core::{Document, Key, RetrySafety};

use crate::builder::ClientBuilder;
use crate::call_context::IDEMPOTENCY_TOKEN;
use crate::config::{AttemptInfo, ClientInterceptor, ClientPlugin, HookContext};
use crate::error::ClientError;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock used to turn an HTTP-date `Retry-After` into a delay when the
/// response carries no `Date` header. Defaults to [`SystemClock`].
pub static CLOCK: LazyLock<Key<Arc<dyn Clock>>> = LazyLock::new(|| Key::new("clock"));

/// Classifies failed HTTP exchanges from the response.
///
/// In order:
/// 1. a parseable `Retry-After` makes the error a retryable throttle with
///    that delay
/// 2. a 429 or 503 status makes it a retryable throttle
/// 3. an error whose retry safety is still undetermined is retryable only
///    for a 5xx status on a call that sent an idempotency token
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpRetryInfoPlugin;

impl ClientPlugin for HttpRetryInfoPlugin {
    fn configure_client(&self, builder: &mut ClientBuilder) {
        builder.push_interceptor(Arc::new(HttpRetryInfoInterceptor));
    }
}

#[derive(Debug)]
struct HttpRetryInfoInterceptor;

impl ClientInterceptor for HttpRetryInfoInterceptor {
    fn modify_before_attempt_completion(
        &self,
        ctx: &HookContext<'_>,
        attempt: &AttemptInfo<'_>,
        result: Result<Document, ClientError>,
    ) -> Result<Document, ClientError> {
        let mut error = match result {
            Ok(output) => return Ok(output),
            Err(error) => error,
        };
        let Some(response) = attempt.response else {
            return Err(error);
        };
        let status = response.status().as_u16();

        let now = match ctx.context.get(&CLOCK) {
            Some(clock) => clock.now(),
            None => SystemTime::now(),
        };
        if let Some(delay) = parse_retry_after(response.headers(), now) {
            error.set_retry_safety(RetrySafety::Yes);
            error.set_throttle(true);
            error.set_retry_after(Some(delay));
        } else if status == 429 || status == 503 {
            error.set_retry_safety(RetrySafety::Yes);
            error.set_throttle(true);
        } else if error.retry_safety() == RetrySafety::Maybe {
            let token_sent = ctx.context.contains(&IDEMPOTENCY_TOKEN);
            if (500..600).contains(&status) && token_sent {
                error.set_retry_safety(RetrySafety::Yes);
            } else {
                error.set_retry_safety(RetrySafety::No);
            }
        }
        Err(error)
    }
}

/// Parse `Retry-After` as delay seconds or an HTTP-date.
///
/// An HTTP-date is measured against the response's `Date` header when
/// present, so clock skew between client and server does not matter, and
/// against `now` otherwise. A date in the past yields a zero delay.
pub fn parse_retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<i64>() {
        return u64::try_from(seconds).ok().map(Duration::from_secs);
    }

    let retry_at = httpdate::parse_http_date(value).ok()?;
    let reference = headers
        .get(DATE)
        .and_then(|d| d.to_str().ok())
        .and_then(|d| httpdate::parse_http_date(d.trim()).ok())
        .unwrap_or(now);
    Some(retry_at.duration_since(reference).unwrap_or(Duration::ZERO))
}

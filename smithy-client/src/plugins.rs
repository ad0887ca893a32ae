//! Built-in client plugins.

mod default;
mod http_retry;
mod idempotency;
mod model_retry;

pub use default::DefaultPlugin;
pub use http_retry::{CLOCK, Clock, HttpRetryInfoPlugin, SystemClock, parse_retry_after};
pub use idempotency::InjectIdempotencyTokenPlugin;
pub use model_retry::ApplyModelRetryInfoPlugin;

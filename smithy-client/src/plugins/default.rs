use crate::builder::ClientBuilder;
use crate::config::ClientPlugin;

use super::{ApplyModelRetryInfoPlugin, InjectIdempotencyTokenPlugin};

/// Applied first on every client. Adds model-driven retry classification
/// and idempotency token injection.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPlugin;

impl ClientPlugin for DefaultPlugin {
    fn configure_client(&self, builder: &mut ClientBuilder) {
        builder.apply_plugin(&ApplyModelRetryInfoPlugin);
        builder.apply_plugin(&InjectIdempotencyTokenPlugin);
    }
}

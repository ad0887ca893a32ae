use std::sync::Arc;

use smithy_client_core::Document;

use crate::builder::ClientBuilder;
use crate::config::{ClientInterceptor, ClientPlugin, HookContext};
use crate::error::ClientError;

/// Fills in the operation's idempotency token member with a random UUID
/// when the caller left it absent or empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct InjectIdempotencyTokenPlugin;

impl ClientPlugin for InjectIdempotencyTokenPlugin {
    fn configure_client(&self, builder: &mut ClientBuilder) {
        builder.push_interceptor(Arc::new(IdempotencyTokenInterceptor));
    }
}

#[derive(Debug)]
struct IdempotencyTokenInterceptor;

impl ClientInterceptor for IdempotencyTokenInterceptor {
    fn modify_before_serialization(
        &self,
        ctx: &HookContext<'_>,
        mut input: Document,
    ) -> Result<Document, ClientError> {
        let Some(member) = ctx.operation.idempotency_token_member() else {
            return Ok(input);
        };
        let missing = match input.member(member) {
            None => true,
            Some(value) => value.as_str().is_some_and(str::is_empty),
        };
        if missing {
            let token = uuid::Uuid::new_v4().to_string();
            #[cfg(feature = "tracing")]
            tracing::debug!(member, "injecting idempotency token");
            input.set_member(member, token);
        }
        Ok(input)
    }
}

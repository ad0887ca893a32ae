use std::sync::Arc;

use smithy_client_core::{Document, Fault, RetrySafety};

use crate::builder::ClientBuilder;
use crate::config::{AttemptInfo, ClientInterceptor, ClientPlugin, HookContext};
use crate::error::ClientError;

/// Classifies errors from what the model says about them.
///
/// Only errors whose retry safety is still undetermined are touched:
/// - a modeled error with the `retryable` trait becomes retryable, throttling
///   per the trait
/// - otherwise, a failure of a `readOnly` or `idempotent` operation that is
///   not the client's fault becomes retryable
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyModelRetryInfoPlugin;

impl ClientPlugin for ApplyModelRetryInfoPlugin {
    fn configure_client(&self, builder: &mut ClientBuilder) {
        builder.push_interceptor(Arc::new(ModelRetryInfoInterceptor));
    }
}

#[derive(Debug)]
struct ModelRetryInfoInterceptor;

impl ClientInterceptor for ModelRetryInfoInterceptor {
    fn modify_before_attempt_completion(
        &self,
        ctx: &HookContext<'_>,
        _attempt: &AttemptInfo<'_>,
        result: Result<Document, ClientError>,
    ) -> Result<Document, ClientError> {
        let mut error = match result {
            Ok(output) => return Ok(output),
            Err(error) => error,
        };
        if error.retry_safety() != RetrySafety::Maybe {
            return Err(error);
        }

        if let Some(throttling) = error.as_modeled().and_then(|m| m.schema().retryable()) {
            error.set_retry_safety(RetrySafety::Yes);
            error.set_throttle(throttling);
        } else if (ctx.operation.is_read_only() || ctx.operation.is_idempotent())
            && error.fault() != Fault::Client
        {
            error.set_retry_safety(RetrySafety::Yes);
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModeledError;
    use smithy_client_core::{
        Context, ErrorFault, OperationSchema, Schema, ShapeId, ShapeType, Trait,
    };

    fn operation(traits: &[Trait]) -> OperationSchema {
        let mut builder = OperationSchema::builder(
            ShapeId::new("ex", "GetThing"),
            ShapeId::new("ex", "Service"),
            Schema::prelude(ShapeType::Structure),
            Schema::prelude(ShapeType::Structure),
        );
        for t in traits {
            builder = builder.with_trait(t.clone());
        }
        builder.build()
    }

    fn classify(op: &OperationSchema, error: ClientError) -> ClientError {
        let context = Context::new();
        let input = Document::structure();
        let ctx = HookContext {
            operation: op,
            context: &context,
        };
        let attempt = AttemptInfo {
            attempt: 1,
            input: &input,
            request: None,
            response: None,
        };
        ModelRetryInfoInterceptor
            .modify_before_attempt_completion(&ctx, &attempt, Err(error))
            .unwrap_err()
    }

    #[test]
    fn test_retryable_trait_marks_throttle() {
        let schema = Schema::builder(ShapeId::new("ex", "SlowDown"), ShapeType::Structure)
            .with_trait(Trait::Error(ErrorFault::Client))
            .with_trait(Trait::Retryable { throttling: true })
            .build_arc();
        let error = ClientError::modeled(ModeledError::new(schema, Document::structure(), 400));
        let error = classify(&operation(&[]), error);
        assert!(error.is_retry_safe());
        assert!(error.is_throttle());
    }

    #[test]
    fn test_read_only_server_error_is_retryable() {
        let error = classify(
            &operation(&[Trait::ReadOnly]),
            ClientError::service(500, None, "boom"),
        );
        assert!(error.is_retry_safe());
        assert!(!error.is_throttle());
    }

    #[test]
    fn test_read_only_client_error_is_left_alone() {
        let error = classify(
            &operation(&[Trait::ReadOnly]),
            ClientError::service(400, None, "bad"),
        );
        assert_eq!(error.retry_safety(), RetrySafety::Maybe);
    }

    #[test]
    fn test_decided_errors_are_not_reclassified() {
        let mut error = ClientError::service(500, None, "boom");
        error.set_retry_safety(RetrySafety::No);
        let error = classify(&operation(&[Trait::Idempotent]), error);
        assert_eq!(error.retry_safety(), RetrySafety::No);
    }
}

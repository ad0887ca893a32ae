//! Call interceptors.
//!
//! Interceptors observe and rewrite a call at fixed points of the pipeline:
//!
//! | hook | when | may |
//! |------|------|-----|
//! | `modify_before_call` | before anything else | return config overrides |
//! | `read_before_execution` | start of execution | abort |
//! | `modify_before_serialization` | before the input is serialized | replace the input |
//! | `read_before_serialization` | after input rewrites | abort |
//! | `modify_before_signing` | per attempt, before signing | replace the request |
//! | `modify_before_transmit` | per attempt, after signing | replace the request |
//! | `read_before_transmit` | per attempt | abort |
//! | `read_after_transmit` | per attempt, response received | abort |
//! | `modify_before_attempt_completion` | per attempt | replace the result |
//! | `read_after_attempt` | per attempt | observe |
//! | `modify_before_completion` | end of call | replace the result |
//! | `read_after_execution` | end of call | observe |
//!
//! Modify hooks are chained: each interceptor receives what the previous one
//! returned, in registration order.
//!
//! # Example
//!
//! ```ignore
//! use smithy_client::{Client, HeaderInterceptor};
//!
//! let client = Client::builder()
//!     .endpoint("https://api.example.com")?
//!     .add_interceptor(HeaderInterceptor::new("x-client", "inventory-cli")?)
//!     .build()?;
//! ```

use http::{HeaderName, HeaderValue};
use smithy_client_core::{Context, Document, OperationSchema};

use super::options::RequestOverrideConfig;
use crate::error::ClientError;
use crate::transport::{HttpRequest, HttpResponse};

/// What every hook can see about the call.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub operation: &'a OperationSchema,
    pub context: &'a Context,
}

/// State of a finished attempt.
#[derive(Clone, Copy, Debug)]
pub struct AttemptInfo<'a> {
    /// One-based attempt number.
    pub attempt: u32,
    pub input: &'a Document,
    /// The request as transmitted, if the attempt got that far.
    pub request: Option<&'a HttpRequest>,
    pub response: Option<&'a HttpResponse>,
}

/// Hooks into the call pipeline. Every hook defaults to a no-op.
pub trait ClientInterceptor: Send + Sync {
    fn modify_before_call(
        &self,
        ctx: &HookContext<'_>,
        input: &Document,
    ) -> Option<RequestOverrideConfig> {
        let _ = (ctx, input);
        None
    }

    fn read_before_execution(
        &self,
        ctx: &HookContext<'_>,
        input: &Document,
    ) -> Result<(), ClientError> {
        let _ = (ctx, input);
        Ok(())
    }

    fn modify_before_serialization(
        &self,
        ctx: &HookContext<'_>,
        input: Document,
    ) -> Result<Document, ClientError> {
        let _ = ctx;
        Ok(input)
    }

    fn read_before_serialization(
        &self,
        ctx: &HookContext<'_>,
        input: &Document,
    ) -> Result<(), ClientError> {
        let _ = (ctx, input);
        Ok(())
    }

    fn modify_before_signing(
        &self,
        ctx: &HookContext<'_>,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        let _ = ctx;
        Ok(request)
    }

    fn modify_before_transmit(
        &self,
        ctx: &HookContext<'_>,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        let _ = ctx;
        Ok(request)
    }

    fn read_before_transmit(
        &self,
        ctx: &HookContext<'_>,
        request: &HttpRequest,
    ) -> Result<(), ClientError> {
        let _ = (ctx, request);
        Ok(())
    }

    fn read_after_transmit(
        &self,
        ctx: &HookContext<'_>,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<(), ClientError> {
        let _ = (ctx, request, response);
        Ok(())
    }

    /// Last chance to reclassify or replace the attempt's outcome before the
    /// retry decision.
    fn modify_before_attempt_completion(
        &self,
        ctx: &HookContext<'_>,
        attempt: &AttemptInfo<'_>,
        result: Result<Document, ClientError>,
    ) -> Result<Document, ClientError> {
        let _ = (ctx, attempt);
        result
    }

    fn read_after_attempt(
        &self,
        ctx: &HookContext<'_>,
        attempt: &AttemptInfo<'_>,
        result: &Result<Document, ClientError>,
    ) {
        let _ = (ctx, attempt, result);
    }

    fn modify_before_completion(
        &self,
        ctx: &HookContext<'_>,
        result: Result<Document, ClientError>,
    ) -> Result<Document, ClientError> {
        let _ = ctx;
        result
    }

    fn read_after_execution(&self, ctx: &HookContext<'_>, result: &Result<Document, ClientError>) {
        let _ = (ctx, result);
    }
}

/// Sets a header on every transmitted request.
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    pub fn new(name: &str, value: &str) -> Result<Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::illegal_state(format!("invalid header name: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::illegal_state(format!("invalid header value: {e}")))?;
        Ok(Self { name, value })
    }

    pub fn from_static(name: &'static str, value: &'static str) -> Self {
        Self {
            name: HeaderName::from_static(name),
            value: HeaderValue::from_static(value),
        }
    }
}

impl ClientInterceptor for HeaderInterceptor {
    fn modify_before_transmit(
        &self,
        _ctx: &HookContext<'_>,
        mut request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use smithy_client_core::{Schema, ShapeId, ShapeType};

    fn operation() -> OperationSchema {
        OperationSchema::builder(
            ShapeId::new("ex", "Ping"),
            ShapeId::new("ex", "Service"),
            Schema::prelude(ShapeType::Structure),
            Schema::prelude(ShapeType::Structure),
        )
        .build()
    }

    #[test]
    fn test_header_interceptor() {
        let op = operation();
        let context = Context::new();
        let ctx = HookContext {
            operation: &op,
            context: &context,
        };
        let interceptor = HeaderInterceptor::new("x-trace-id", "abc").unwrap();
        let request = http::Request::builder()
            .uri("/")
            .header("x-trace-id", "old")
            .body(Bytes::new())
            .unwrap();
        let request = interceptor.modify_before_transmit(&ctx, request).unwrap();
        assert_eq!(request.headers()["x-trace-id"], "abc");
        assert_eq!(request.headers().get_all("x-trace-id").iter().count(), 1);
    }

    #[test]
    fn test_invalid_header_rejected() {
        assert!(HeaderInterceptor::new("bad header", "v").is_err());
        assert!(HeaderInterceptor::new("x-ok", "bad\nvalue").is_err());
    }

    #[test]
    fn test_default_hooks_pass_through() {
        struct Noop;
        impl ClientInterceptor for Noop {}

        let op = operation();
        let context = Context::new();
        let ctx = HookContext {
            operation: &op,
            context: &context,
        };
        let input = Document::structure().with_member("id", "1");
        assert!(Noop.modify_before_call(&ctx, &input).is_none());
        let out = Noop.modify_before_serialization(&ctx, input.clone()).unwrap();
        assert_eq!(out, input);
        let attempt = AttemptInfo {
            attempt: 1,
            input: &input,
            request: None,
            response: None,
        };
        let result = Noop.modify_before_attempt_completion(
            &ctx,
            &attempt,
            Err(ClientError::transport("reset")),
        );
        assert!(result.is_err());
    }
}

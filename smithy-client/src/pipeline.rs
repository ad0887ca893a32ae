//! The call pipeline.
//!
//! One logical call runs as:
//!
//! ```text
//! overrides -> modify_before_call -> read_before_execution
//!   -> modify_before_serialization -> read_before_serialization
//!   -> acquire retry token
//!   -> attempt loop:
//!        endpoint -> auth -> serialize -> sign -> transmit -> deserialize
//!        -> modify_before_attempt_completion -> read_after_attempt
//!        -> record success | refresh token and retry | stop
//!   -> modify_before_completion -> read_after_execution
//! ```
//!
//! Interceptor hooks run in registration order. Modify hooks are folded: each
//! interceptor receives what the previous one returned.
//!
//! `modify_before_call` walks the interceptors configured when the call
//! starts. Interceptors added by an override returned from that hook join the
//! call at `read_before_execution`.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use smithy_client_core::{Context, Document, OperationSchema, ShapeId};

use crate::auth::{AuthSchemeParams, Identity, Signer};
use crate::call_context::{API_CALL_TIMEOUT, IDEMPOTENCY_TOKEN, RETRY_ATTEMPT, SELECTED_AUTH_SCHEME};
use crate::config::{
    AcquireInitialRetryTokenRequest, AttemptInfo, ClientConfig, HookContext, RecordSuccessRequest,
    RefreshRetryTokenRequest, RequestOverrideConfig,
};
use crate::endpoint::{Endpoint, EndpointAuthScheme, EndpointResolverParams};
use crate::error::{AuthOptionFailure, AuthResolutionError, ClientError};
use crate::response::ResponseMetadata;
use crate::transport::{HttpRequest, HttpResponse, clone_request};

/// Run one call to completion.
pub(crate) async fn invoke(
    base: &ClientConfig,
    operation: &OperationSchema,
    input: Document,
    overrides: RequestOverrideConfig,
) -> Result<(Document, ResponseMetadata), ClientError> {
    let mut config = Cow::Borrowed(base);
    if !overrides.is_empty() {
        config = Cow::Owned(base.with_request_override(&overrides)?);
    }

    // Values set per call sit above every other property layer during auth.
    let mut call_properties = overrides.context().modifiable_copy();
    // later overrides may change the list; this phase keeps the starting one
    let interceptors = config.interceptors().to_vec();
    for interceptor in &interceptors {
        let hook = HookContext {
            operation,
            context: config.context(),
        };
        if let Some(change) = interceptor.modify_before_call(&hook, &input) {
            change.context().copy_to(&mut call_properties);
            config = Cow::Owned(config.with_request_override(&change)?);
        }
    }

    let mut context = config.context().modifiable_copy();
    let mut metadata = None;

    let execution = execute(
        &config,
        operation,
        input,
        &mut context,
        &call_properties,
        &mut metadata,
    );
    let result = match context_timeout(config.context()) {
        Some(limit) => match tokio::time::timeout(limit, execution).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::timeout(limit)),
        },
        None => execution.await,
    };

    let hook = HookContext {
        operation,
        context: &context,
    };
    let mut result = result;
    for interceptor in config.interceptors() {
        result = interceptor.modify_before_completion(&hook, result);
    }
    for interceptor in config.interceptors() {
        interceptor.read_after_execution(&hook, &result);
    }

    result.map(|output| (output, metadata.unwrap_or_default()))
}

fn context_timeout(context: &Context) -> Option<Duration> {
    context.get(&API_CALL_TIMEOUT).copied()
}

async fn execute(
    config: &ClientConfig,
    operation: &OperationSchema,
    input: Document,
    context: &mut Context,
    call_properties: &Context,
    metadata: &mut Option<ResponseMetadata>,
) -> Result<Document, ClientError> {
    let interceptors = config.interceptors();

    let hook = HookContext { operation, context };
    for interceptor in interceptors {
        interceptor.read_before_execution(&hook, &input)?;
    }
    let mut input = input;
    for interceptor in interceptors {
        input = interceptor.modify_before_serialization(&hook, input)?;
    }

    if let Some(token) = operation
        .idempotency_token_member()
        .and_then(|member| input.member(member))
        .and_then(Document::as_str)
        .filter(|token| !token.is_empty())
    {
        context.put(&IDEMPOTENCY_TOKEN, token.to_string());
    }

    let hook = HookContext { operation, context };
    for interceptor in interceptors {
        interceptor.read_before_serialization(&hook, &input)?;
    }

    let strategy = config.retry_strategy();
    let acquired = strategy
        .acquire_initial_token(AcquireInitialRetryTokenRequest {
            scope: config.retry_scope().map(str::to_string),
        })
        .map_err(|e| ClientError::retry_token_acquisition(e.0))?;
    let mut token = acquired.token;
    sleep(acquired.delay).await;

    let max_attempts = strategy.max_attempts().max(1);
    let mut attempt = 1;
    loop {
        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, "starting attempt");
        let mut attempt_context = context.modifiable_copy();
        attempt_context.put(&RETRY_ATTEMPT, attempt);

        let result = run_attempt(
            config,
            operation,
            &input,
            &mut attempt_context,
            call_properties,
            attempt,
            metadata,
        )
        .await;

        match result {
            Ok(output) => {
                strategy.record_success(RecordSuccessRequest { token });
                return Ok(output);
            }
            Err(error) if error.is_retry_safe() && attempt < max_attempts => {
                let refreshed = strategy.refresh_retry_token(RefreshRetryTokenRequest {
                    token,
                    error: &error,
                    suggested_delay: error.retry_after(),
                });
                match refreshed {
                    Ok(refreshed) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            attempt,
                            delay_ms = refreshed.delay.as_millis() as u64,
                            throttle = error.is_throttle(),
                            error = %error,
                            "retrying call"
                        );
                        token = refreshed.token;
                        sleep(refreshed.delay).await;
                        attempt += 1;
                    }
                    Err(_reason) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt, reason = %_reason, "retry token not refreshed");
                        return Err(error);
                    }
                }
            }
            Err(error) => return Err(error),
        }
    }
}

async fn run_attempt(
    config: &ClientConfig,
    operation: &OperationSchema,
    input: &Document,
    context: &mut Context,
    call_properties: &Context,
    attempt: u32,
    metadata: &mut Option<ResponseMetadata>,
) -> Result<Document, ClientError> {
    let mut sent = None;
    let mut received = None;
    let mut result = transmit(
        config,
        operation,
        input,
        context,
        call_properties,
        &mut sent,
        &mut received,
    )
    .await;

    if let Some(response) = &received {
        *metadata = Some(ResponseMetadata::new(
            response.status(),
            response.headers().clone(),
        ));
    }

    let hook = HookContext { operation, context };
    let info = AttemptInfo {
        attempt,
        input,
        request: sent.as_ref(),
        response: received.as_ref(),
    };
    for interceptor in config.interceptors() {
        result = interceptor.modify_before_attempt_completion(&hook, &info, result);
    }
    for interceptor in config.interceptors() {
        interceptor.read_after_attempt(&hook, &info, &result);
    }
    result
}

async fn transmit(
    config: &ClientConfig,
    operation: &OperationSchema,
    input: &Document,
    context: &mut Context,
    call_properties: &Context,
    sent: &mut Option<HttpRequest>,
    received: &mut Option<HttpResponse>,
) -> Result<Document, ClientError> {
    let interceptors = config.interceptors();
    let protocol = config.protocol();

    let endpoint = config
        .endpoint_resolver()
        .resolve_endpoint(EndpointResolverParams {
            operation,
            input,
            properties: context,
        })
        .await?;
    #[cfg(feature = "tracing")]
    tracing::debug!(endpoint = %endpoint.uri(), "resolved endpoint");
    let auth = select_auth(config, operation, &endpoint, context, call_properties).await?;
    context.put(&SELECTED_AUTH_SCHEME, auth.scheme_id.clone());

    let hook = HookContext { operation, context };
    let request = protocol.create_request(operation, input, context)?;
    let mut request = protocol.set_service_endpoint(request, &endpoint)?;
    for interceptor in interceptors {
        request = interceptor.modify_before_signing(&hook, request)?;
    }
    let mut request = auth
        .signer
        .sign(request, &auth.identity, &auth.signer_properties)
        .await?;
    for interceptor in interceptors {
        request = interceptor.modify_before_transmit(&hook, request)?;
    }
    for interceptor in interceptors {
        interceptor.read_before_transmit(&hook, &request)?;
    }

    let request_copy = sent.insert(clone_request(&request));
    let response = received.insert(config.transport().send(context, request).await?);
    for interceptor in interceptors {
        interceptor.read_after_transmit(&hook, request_copy, response)?;
    }
    protocol.deserialize_response(operation, context, request_copy, response)
}

struct SelectedAuth {
    scheme_id: ShapeId,
    identity: Identity,
    signer: Arc<dyn Signer>,
    signer_properties: Context,
}

/// Walk the resolved auth scheme options and take the first one the client
/// supports and can resolve an identity for.
///
/// Properties are layered, later layers winning: the call context, the
/// scheme defaults, the option, the endpoint's auth scheme attributes, then
/// per-call overrides.
async fn select_auth(
    config: &ClientConfig,
    operation: &OperationSchema,
    endpoint: &Endpoint,
    context: &Context,
    call_properties: &Context,
) -> Result<SelectedAuth, ClientError> {
    let options = config.auth_scheme_resolver().resolve(&AuthSchemeParams {
        protocol_id: config.protocol().id(),
        operation_name: operation.name(),
        operation_auth_schemes: operation.auth_schemes(),
        properties: context,
    });

    let mut failures = Vec::new();
    for option in options {
        let Some(scheme) = config
            .auth_schemes()
            .iter()
            .find(|s| s.scheme_id() == option.scheme_id)
        else {
            failures.push(AuthOptionFailure {
                scheme_id: option.scheme_id,
                reason: "scheme not supported by client".to_string(),
            });
            continue;
        };
        let Some(resolver) = scheme.identity_resolver(config.identity_resolvers()) else {
            failures.push(AuthOptionFailure {
                scheme_id: option.scheme_id,
                reason: format!("no identity resolver for {:?} identities", scheme.identity_type()),
            });
            continue;
        };

        let endpoint_attributes = endpoint
            .auth_scheme(&option.scheme_id)
            .map(EndpointAuthScheme::attributes);
        let identity_properties = layered(
            context,
            &scheme.identity_properties(),
            &option.identity_properties,
            endpoint_attributes,
            call_properties,
        );
        let signer_properties = layered(
            context,
            &scheme.signer_properties(),
            &option.signer_properties,
            endpoint_attributes,
            call_properties,
        );

        match resolver.resolve_identity(&identity_properties).await {
            Ok(identity) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scheme = %option.scheme_id, "selected auth scheme");
                return Ok(SelectedAuth {
                    scheme_id: option.scheme_id,
                    identity,
                    signer: scheme.signer(),
                    signer_properties,
                });
            }
            Err(err) if err.is_recoverable() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(scheme = %option.scheme_id, reason = %err, "skipping auth scheme");
                failures.push(AuthOptionFailure {
                    scheme_id: option.scheme_id,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(AuthResolutionError::new(failures).into())
}

fn layered(
    base: &Context,
    scheme: &Context,
    option: &Context,
    endpoint: Option<&Context>,
    call: &Context,
) -> Context {
    let mut properties = base.modifiable_copy();
    scheme.copy_to(&mut properties);
    option.copy_to(&mut properties);
    if let Some(endpoint) = endpoint {
        endpoint.copy_to(&mut properties);
    }
    call.copy_to(&mut properties);
    properties
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

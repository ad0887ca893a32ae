//! The client.

use std::sync::Arc;

use smithy_client_core::{ApiOperation, Document, OperationSchema, Shape};
#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::builder::ClientBuilder;
use crate::config::{ClientConfig, RequestOverrideConfig};
use crate::error::ClientError;
use crate::pipeline;
use crate::response::ApiResponse;

/// Calls operations of a modeled service.
///
/// Cheap to clone; clones share the same frozen configuration.
///
/// # Example
///
/// ```ignore
/// use smithy_client::{Client, Endpoint};
///
/// let client = Client::builder()
///     .endpoint(Endpoint::parse("https://api.example.com")?)
///     .build()?;
///
/// let output = client.call(&GetSprocket, &GetSprocketInput { id: "s-1".into() }).await?;
/// println!("{}", output.name);
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call an operation and return its output.
    pub async fn call<O: ApiOperation>(
        &self,
        operation: &O,
        input: &O::Input,
    ) -> Result<O::Output, ClientError> {
        self.call_with_response(operation, input, RequestOverrideConfig::new())
            .await
            .map(ApiResponse::into_inner)
    }

    /// Call an operation with per-call configuration overrides.
    pub async fn call_with_options<O: ApiOperation>(
        &self,
        operation: &O,
        input: &O::Input,
        options: RequestOverrideConfig,
    ) -> Result<O::Output, ClientError> {
        self.call_with_response(operation, input, options)
            .await
            .map(ApiResponse::into_inner)
    }

    /// Call an operation and keep the response metadata.
    pub async fn call_with_response<O: ApiOperation>(
        &self,
        operation: &O,
        input: &O::Input,
        options: RequestOverrideConfig,
    ) -> Result<ApiResponse<O::Output>, ClientError> {
        let response = self
            .call_document(operation.schema(), input.to_document(), options)
            .await?;
        let (document, metadata) = response.into_parts();
        let output = O::Output::from_document(&document)
            .map_err(|e| ClientError::deserialization(e.to_string()))?;
        Ok(ApiResponse::new(output, metadata))
    }

    /// Call an operation with a dynamic input document.
    pub async fn call_document(
        &self,
        operation: &OperationSchema,
        input: Document,
        options: RequestOverrideConfig,
    ) -> Result<ApiResponse<Document>, ClientError> {
        let call = async {
            let (output, metadata) =
                pipeline::invoke(&self.config, operation, input, options).await?;
            Ok(ApiResponse::new(output, metadata))
        };

        #[cfg(feature = "tracing")]
        let call = call.instrument(info_span!(
            "smithy.call",
            rpc.service = %operation.service(),
            rpc.method = operation.name(),
            rpc.protocol = %self.config.protocol().id(),
            otel.kind = "client",
        ));

        call.await
    }
}

use std::sync::Arc;

use smithy_client_core::{
    BoxedCodec, Codec, Context, Document, JsonCodec, OperationSchema, ShapeId,
};

use super::ClientProtocol;
use super::deserializer::deserialize_response;
use super::error_parser::{ErrorIdSource, parse_error_response};
use super::serializer::serialize_request;
use crate::config::ClientPlugin;
use crate::error::ClientError;
use crate::plugins::HttpRetryInfoPlugin;
use crate::transport::{HttpRequest, HttpResponse};

/// A protocol that binds members to HTTP message locations and encodes the
/// rest of the body with a codec.
///
/// # Example
///
/// ```ignore
/// use smithy_client::HttpBindingProtocol;
///
/// let protocol = HttpBindingProtocol::rest_json();
/// assert_eq!(protocol.id().to_string(), "aws.protocols#restJson1");
/// ```
#[derive(Clone, Debug)]
pub struct HttpBindingProtocol {
    id: ShapeId,
    codec: BoxedCodec,
    error_id_source: ErrorIdSource,
}

impl HttpBindingProtocol {
    pub fn new(id: ShapeId, codec: impl Codec) -> Self {
        Self {
            id,
            codec: BoxedCodec::new(codec),
            error_id_source: ErrorIdSource::default(),
        }
    }

    /// `aws.protocols#restJson1`.
    pub fn rest_json() -> Self {
        Self::new(ShapeId::new("aws.protocols", "restJson1"), JsonCodec::new())
            .with_error_id_source(ErrorIdSource::HeaderThenJsonBody)
    }

    #[must_use]
    pub fn with_error_id_source(mut self, source: ErrorIdSource) -> Self {
        self.error_id_source = source;
        self
    }

    pub fn codec(&self) -> &BoxedCodec {
        &self.codec
    }

    pub fn error_id_source(&self) -> ErrorIdSource {
        self.error_id_source
    }
}

impl ClientProtocol for HttpBindingProtocol {
    fn id(&self) -> &ShapeId {
        &self.id
    }

    fn create_request(
        &self,
        operation: &OperationSchema,
        input: &Document,
        _context: &Context,
    ) -> Result<HttpRequest, ClientError> {
        serialize_request(&self.codec, operation, input)
    }

    fn deserialize_response(
        &self,
        operation: &OperationSchema,
        _context: &Context,
        _request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<Document, ClientError> {
        if response.status().is_success() {
            deserialize_response(&self.codec, operation.output(), response)
        } else {
            Err(parse_error_response(
                &self.codec,
                self.error_id_source,
                operation,
                response,
            ))
        }
    }

    fn plugins(&self) -> Vec<Arc<dyn ClientPlugin>> {
        vec![Arc::new(HttpRetryInfoPlugin)]
    }
}

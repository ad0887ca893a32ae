//! Error response parsing for HTTP binding protocols.
//!
//! Turns a non-2xx response into a [`ClientError`]. The error shape id is
//! taken from the `X-Amzn-Errortype` header or, for JSON protocols, from the
//! `__type` or `code` body field. Ids are sanitized before lookup:
//! ```text
//! aws.protocoltests#FooError:http://internal.amazon.com/  ->  aws.protocoltests#FooError
//! ```
//! Known ids are deserialized into the modeled error. Everything else becomes
//! a service error carrying a bounded dump of the response.

use std::fmt::Write;
use std::sync::Arc;

use serde::Deserialize;
use smithy_client_core::{BoxedCodec, OperationSchema, Schema};

use super::deserializer::deserialize_response;
use crate::error::{ClientError, ModeledError};
use crate::transport::HttpResponse;

pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Upper bound on the diagnostic dump of an unmodeled error response.
const MAX_DUMP_BYTES: usize = 16 * 1024;

/// Where the error shape id of a response is found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorIdSource {
    /// Only the `X-Amzn-Errortype` header.
    #[default]
    Header,
    /// The header, then a `__type` or `code` field of a JSON body.
    HeaderThenJsonBody,
}

/// JSON fields of an error body.
#[derive(Deserialize)]
struct ErrorBodyJson {
    #[serde(rename = "__type", default)]
    type_name: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "Message", alias = "errorMessage")]
    message: Option<String>,
}

/// Parse an error response for an operation.
pub(crate) fn parse_error_response(
    codec: &BoxedCodec,
    source: ErrorIdSource,
    operation: &OperationSchema,
    response: &HttpResponse,
) -> ClientError {
    let status = response.status().as_u16();
    let body_json = match source {
        ErrorIdSource::HeaderThenJsonBody => {
            serde_json::from_slice::<ErrorBodyJson>(response.body()).ok()
        }
        ErrorIdSource::Header => None,
    };

    let error_id = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            body_json
                .as_ref()
                .and_then(|b| b.type_name.clone().or_else(|| b.code.clone()))
        })
        .map(|id| sanitize_error_id(&id).to_string())
        .filter(|id| !id.is_empty());

    if let Some(schema) = error_id.as_deref().and_then(|id| lookup(operation, id)) {
        match deserialize_response(codec, schema, response) {
            Ok(document) => {
                return ClientError::modeled(ModeledError::new(schema.clone(), document, status));
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error_id = %schema.id(), error = %_err, "failed to deserialize modeled error");
            }
        }
    }

    let summary = body_json
        .and_then(|b| b.message)
        .or_else(|| {
            response
                .status()
                .canonical_reason()
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown error".to_string());
    ClientError::service(
        status,
        error_id,
        format!("{summary}\n{}", diagnostic_dump(response)),
    )
}

/// Strip the namespace URI suffix some services append after a colon.
pub fn sanitize_error_id(id: &str) -> &str {
    id.split(':').next().unwrap_or(id).trim()
}

fn lookup<'a>(operation: &'a OperationSchema, id: &str) -> Option<&'a Arc<Schema>> {
    let registry = operation.errors();
    registry.lookup(id).or_else(|| {
        let name = id.rsplit_once('#').map(|(_, name)| name)?;
        registry.lookup(name)
    })
}

/// Status line, headers and body, truncated to [`MAX_DUMP_BYTES`].
fn diagnostic_dump(response: &HttpResponse) -> String {
    let mut dump = String::new();
    let _ = writeln!(dump, "HTTP {}", response.status());
    for (name, value) in response.headers() {
        if value.is_sensitive() {
            let _ = writeln!(dump, "{name}: [REDACTED]");
        } else {
            let _ = writeln!(dump, "{name}: {}", String::from_utf8_lossy(value.as_bytes()));
        }
    }
    dump.push('\n');
    dump.push_str(&String::from_utf8_lossy(response.body()));

    if dump.len() > MAX_DUMP_BYTES {
        let mut end = MAX_DUMP_BYTES;
        while !dump.is_char_boundary(end) {
            end -= 1;
        }
        dump.truncate(end);
        dump.push_str("...");
    }
    dump
}

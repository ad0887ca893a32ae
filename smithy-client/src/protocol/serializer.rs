//! Request serialization for HTTP binding protocols.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use smithy_client_core::{BoxedCodec, Document, Member, OperationSchema, ShapeType, TimestampFormat};

use super::binding::{Binding, BindingMatcher, is_event_stream};
use super::event_stream::{self, EVENT_STREAM_CONTENT_TYPE};
use super::headers;
use super::uri::UriPattern;
use crate::error::ClientError;
use crate::transport::HttpRequest;

/// Build the HTTP request for an operation input. The URI carries only the
/// path and query; the endpoint is applied later.
pub(crate) fn serialize_request(
    codec: &BoxedCodec,
    operation: &OperationSchema,
    input: &Document,
) -> Result<HttpRequest, ClientError> {
    let http = operation.http().ok_or_else(|| {
        ClientError::illegal_state(format!("operation `{}` has no http trait", operation.id()))
    })?;
    let pattern = UriPattern::parse(&http.uri)?;
    let matcher = BindingMatcher::for_request(operation.input());

    let mut labels = HashMap::new();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut query_params: Vec<(String, String)> = Vec::new();
    let mut header_map = HeaderMap::new();
    let mut body_members = BTreeMap::new();
    let mut payload = None;

    for (member, binding) in matcher.members() {
        let Some(value) = input.member(member.name()) else {
            continue;
        };
        match binding {
            Binding::Label => {
                let format = member.timestamp_format().unwrap_or(TimestampFormat::DateTime);
                labels.insert(member.name(), scalar_to_string(member.name(), value, format)?);
            }
            Binding::Query(name) => {
                let (items, format) = match value {
                    Document::List(items) => (items.as_slice(), list_timestamp_format(member)),
                    single => (std::slice::from_ref(single), member.timestamp_format()),
                };
                let format = format.unwrap_or(TimestampFormat::DateTime);
                for item in items {
                    query.push((name.clone(), scalar_to_string(member.name(), item, format)?));
                }
            }
            Binding::QueryParams => {
                let entries = value.as_map().ok_or_else(|| expected_map(member))?;
                for (key, entry) in entries {
                    let items = match entry {
                        Document::List(items) => items.as_slice(),
                        single => std::slice::from_ref(single),
                    };
                    for item in items {
                        let rendered =
                            scalar_to_string(member.name(), item, TimestampFormat::DateTime)?;
                        query_params.push((key.clone(), rendered));
                    }
                }
            }
            Binding::Header(name) => {
                let rendered = header_string(member, value)?;
                header_map.insert(header_name(name)?, header_value(member, &rendered)?);
            }
            Binding::PrefixHeaders(prefix) => {
                let entries = value.as_map().ok_or_else(|| expected_map(member))?;
                for (key, entry) in entries {
                    let rendered =
                        scalar_to_string(member.name(), entry, TimestampFormat::HttpDate)?;
                    header_map.insert(
                        header_name(&format!("{prefix}{key}"))?,
                        header_value(member, &rendered)?,
                    );
                }
            }
            Binding::Payload => payload = Some(serialize_payload(codec, member, value)?),
            Binding::Body => {
                body_members.insert(member.name().to_string(), value.clone());
            }
            Binding::Status => {}
        }
    }

    // explicitly bound query members win over the query params map
    query_params.retain(|(key, _)| !query.iter().any(|(k, _)| k == key));
    query.extend(query_params);

    let mut target = pattern.expand(&labels)?;
    let mut pairs: Vec<String> = pattern
        .literal_query()
        .iter()
        .map(|(k, v)| match v {
            Some(v) => format!("{k}={v}"),
            None => k.clone(),
        })
        .collect();
    pairs.extend(
        query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))),
    );
    if !pairs.is_empty() {
        target.push('?');
        target.push_str(&pairs.join("&"));
    }

    let body = match payload {
        Some((bytes, content_type)) => {
            header_map.insert(CONTENT_TYPE, header_value_str(&content_type)?);
            bytes
        }
        None if matcher.has_body() => {
            header_map.insert(CONTENT_TYPE, header_value_str(codec.media_type())?);
            codec.serialize(matcher.schema(), &Document::Structure(body_members))?
        }
        None => Bytes::new(),
    };

    let mut request = http::Request::builder()
        .method(http.method.clone())
        .uri(target)
        .body(body)
        .map_err(|e| ClientError::serialization(format!("invalid request: {e}")))?;
    *request.headers_mut() = header_map;
    Ok(request)
}

fn serialize_payload(
    codec: &BoxedCodec,
    member: &Member,
    value: &Document,
) -> Result<(Bytes, String), ClientError> {
    if is_event_stream(member) {
        let events = value.as_list().ok_or_else(|| {
            ClientError::serialization(format!("event stream `{}` must be a list", member.name()))
        })?;
        let bytes = event_stream::encode_events(codec, member.target(), events)?;
        return Ok((bytes, EVENT_STREAM_CONTENT_TYPE.to_string()));
    }
    let media_type = member.media_type().map(str::to_string);
    match (member.shape_type(), value) {
        (ShapeType::Structure | ShapeType::Union | ShapeType::Document, _) => Ok((
            codec.serialize(member.target(), value)?,
            codec.media_type().to_string(),
        )),
        (ShapeType::Blob, Document::Blob(bytes)) => Ok((
            bytes.clone(),
            media_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        )),
        (ShapeType::String | ShapeType::Enum, Document::String(s)) => Ok((
            Bytes::from(s.clone()),
            media_type.unwrap_or_else(|| "text/plain".to_string()),
        )),
        (shape_type, other) => Err(ClientError::serialization(format!(
            "cannot bind {} value of {} member `{}` to the payload",
            other.type_name(),
            shape_type.as_str(),
            member.name()
        ))),
    }
}

/// Header text for a member. Lists are joined with commas; HTTP-dates are
/// left unquoted.
fn header_string(member: &Member, value: &Document) -> Result<String, ClientError> {
    if let Some(items) = value.as_list() {
        let format = list_timestamp_format(member).unwrap_or(TimestampFormat::HttpDate);
        let media = member
            .target()
            .list_member()
            .and_then(Member::media_type)
            .is_some();
        let rendered = items
            .iter()
            .map(|item| {
                let text = scalar_to_string(member.name(), item, format)?;
                Ok(if media && item.as_str().is_some() {
                    STANDARD.encode(text)
                } else {
                    text
                })
            })
            .collect::<Result<Vec<_>, ClientError>>()?;
        let dates = format == TimestampFormat::HttpDate
            && items.iter().all(|item| item.as_timestamp().is_some());
        return Ok(if dates {
            rendered.join(", ")
        } else {
            headers::join_list(rendered.iter().map(String::as_str))
        });
    }

    let format = member.timestamp_format().unwrap_or(TimestampFormat::HttpDate);
    let rendered = scalar_to_string(member.name(), value, format)?;
    if member.media_type().is_some() && value.as_str().is_some() {
        return Ok(STANDARD.encode(rendered));
    }
    Ok(rendered)
}

/// Timestamp format of a list member's items.
pub(crate) fn list_timestamp_format(member: &Member) -> Option<TimestampFormat> {
    member.timestamp_format().or_else(|| {
        member
            .target()
            .list_member()
            .and_then(Member::timestamp_format)
    })
}

/// Render a scalar value as text.
pub(crate) fn scalar_to_string(
    member: &str,
    value: &Document,
    format: TimestampFormat,
) -> Result<String, ClientError> {
    match value {
        Document::String(s) => Ok(s.clone()),
        Document::Boolean(b) => Ok(b.to_string()),
        Document::Integer(i) => Ok(i.to_string()),
        Document::Float(f) if f.is_nan() => Ok("NaN".to_string()),
        Document::Float(f) if *f == f64::INFINITY => Ok("Infinity".to_string()),
        Document::Float(f) if *f == f64::NEG_INFINITY => Ok("-Infinity".to_string()),
        Document::Float(f) => Ok(f.to_string()),
        Document::Timestamp(ts) => Ok(format.format(ts)),
        Document::Blob(bytes) => Ok(STANDARD.encode(bytes)),
        other => Err(ClientError::serialization(format!(
            "member `{member}` is a {}, which cannot be bound outside the body",
            other.type_name()
        ))),
    }
}

fn expected_map(member: &Member) -> ClientError {
    ClientError::serialization(format!("member `{}` must be a map", member.name()))
}

fn header_name(name: &str) -> Result<HeaderName, ClientError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::serialization(format!("invalid header name `{name}`: {e}")))
}

fn header_value(member: &Member, value: &str) -> Result<HeaderValue, ClientError> {
    let mut value = header_value_str(value)?;
    if member.has_trait(|t| matches!(t, smithy_client_core::Trait::Sensitive)) {
        value.set_sensitive(true);
    }
    Ok(value)
}

fn header_value_str(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::serialization(format!("invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use smithy_client_core::{HttpTrait, JsonCodec, Schema, ShapeId, Trait};
    use std::sync::Arc;

    fn string_list() -> Arc<Schema> {
        Schema::builder(ShapeId::new("ex", "StringList"), ShapeType::List)
            .member(Member::new("member", Schema::prelude(ShapeType::String)))
            .build_arc()
    }

    fn string_map() -> Arc<Schema> {
        Schema::builder(ShapeId::new("ex", "StringMap"), ShapeType::Map)
            .member(Member::new("key", Schema::prelude(ShapeType::String)))
            .member(Member::new("value", Schema::prelude(ShapeType::String)))
            .build_arc()
    }

    fn operation(input: Arc<Schema>, uri: &str) -> OperationSchema {
        OperationSchema::builder(
            ShapeId::new("ex", "PutThing"),
            ShapeId::new("ex", "Service"),
            input,
            Schema::prelude(ShapeType::Structure),
        )
        .with_trait(Trait::Http(HttpTrait::new(http::Method::PUT, uri)))
        .build()
    }

    fn codec() -> BoxedCodec {
        BoxedCodec::new(JsonCodec::new())
    }

    #[test]
    fn test_bindings_land_in_place() {
        let input = Schema::builder(ShapeId::new("ex", "PutThingInput"), ShapeType::Structure)
            .member(
                Member::new("id", Schema::prelude(ShapeType::String)).with_trait(Trait::HttpLabel),
            )
            .member(
                Member::new("tags", string_list()).with_trait(Trait::HttpQuery("tag".into())),
            )
            .member(Member::new("extra", string_map()).with_trait(Trait::HttpQueryParams))
            .member(
                Member::new("token", Schema::prelude(ShapeType::String))
                    .with_trait(Trait::HttpHeader("X-Token".into())),
            )
            .member(
                Member::new("meta", string_map())
                    .with_trait(Trait::HttpPrefixHeaders("x-meta-".into())),
            )
            .member(Member::new("name", Schema::prelude(ShapeType::String)))
            .build_arc();
        let op = operation(input, "/things/{id}?mode=fast");

        let mut extra = BTreeMap::new();
        extra.insert("tag".to_string(), Document::from("ignored"));
        extra.insert("page".to_string(), Document::from("2"));
        let mut meta = BTreeMap::new();
        meta.insert("color".to_string(), Document::from("blue"));
        let doc = Document::structure()
            .with_member("id", "a b")
            .with_member("tags", vec!["x", "y"])
            .with_member("extra", Document::Map(extra))
            .with_member("token", "t-1")
            .with_member("meta", Document::Map(meta))
            .with_member("name", "widget");

        let request = serialize_request(&codec(), &op, &doc).unwrap();
        assert_eq!(*request.method(), http::Method::PUT);
        assert_eq!(
            request.uri().to_string(),
            "/things/a%20b?mode=fast&tag=x&tag=y&page=2"
        );
        assert_eq!(request.headers()["x-token"], "t-1");
        assert_eq!(request.headers()["x-meta-color"], "blue");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().as_ref(), br#"{"name":"widget"}"#);
    }

    #[test]
    fn test_header_lists_and_dates() {
        let dates = Schema::builder(ShapeId::new("ex", "Dates"), ShapeType::List)
            .member(Member::new("member", Schema::prelude(ShapeType::Timestamp)))
            .build_arc();
        let input = Schema::builder(ShapeId::new("ex", "Input"), ShapeType::Structure)
            .member(Member::new("names", string_list()).with_trait(Trait::HttpHeader("x-names".into())))
            .member(Member::new("dates", dates).with_trait(Trait::HttpHeader("x-dates".into())))
            .member(
                Member::new("json", Schema::prelude(ShapeType::String))
                    .with_trait(Trait::HttpHeader("x-json".into()))
                    .with_trait(Trait::MediaType("application/json".into())),
            )
            .build_arc();
        let op = operation(input, "/");
        let ts = Utc.with_ymd_and_hms(2019, 12, 16, 23, 48, 18).unwrap();
        let doc = Document::structure()
            .with_member("names", vec!["a", "b,c"])
            .with_member("dates", vec![ts, ts])
            .with_member("json", "{}");

        let request = serialize_request(&codec(), &op, &doc).unwrap();
        assert_eq!(request.headers()["x-names"], r#"a, "b,c""#);
        assert_eq!(
            request.headers()["x-dates"],
            "Mon, 16 Dec 2019 23:48:18 GMT, Mon, 16 Dec 2019 23:48:18 GMT"
        );
        assert_eq!(request.headers()["x-json"], "e30=");
        assert!(request.body().is_empty());
        assert!(request.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_blob_payload() {
        let input = Schema::builder(ShapeId::new("ex", "Upload"), ShapeType::Structure)
            .member(
                Member::new("data", Schema::prelude(ShapeType::Blob)).with_trait(Trait::HttpPayload),
            )
            .build_arc();
        let op = operation(input, "/upload");
        let doc = Document::structure().with_member("data", Bytes::from_static(b"raw"));
        let request = serialize_request(&codec(), &op, &doc).unwrap();
        assert_eq!(request.body().as_ref(), b"raw");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/octet-stream");
    }

    #[test]
    fn test_missing_label_fails() {
        let input = Schema::builder(ShapeId::new("ex", "GetInput"), ShapeType::Structure)
            .member(
                Member::new("id", Schema::prelude(ShapeType::String)).with_trait(Trait::HttpLabel),
            )
            .build_arc();
        let op = operation(input, "/things/{id}");
        let err = serialize_request(&codec(), &op, &Document::structure()).unwrap_err();
        assert!(err.to_string().contains("label `id`"));
    }

    #[test]
    fn test_operation_without_http_trait() {
        let op = OperationSchema::builder(
            ShapeId::new("ex", "Bare"),
            ShapeId::new("ex", "Service"),
            Schema::prelude(ShapeType::Structure),
            Schema::prelude(ShapeType::Structure),
        )
        .build();
        assert!(serialize_request(&codec(), &op, &Document::structure()).is_err());
    }
}

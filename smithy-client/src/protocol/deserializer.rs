//! Response deserialization for HTTP binding protocols.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use smithy_client_core::{BoxedCodec, Document, Member, Schema, ShapeType, TimestampFormat};

use super::binding::{Binding, BindingMatcher, is_event_stream};
use super::event_stream;
use super::headers;
use super::serializer::list_timestamp_format;
use crate::error::ClientError;
use crate::transport::HttpResponse;

/// Read an output or error structure from a response.
pub(crate) fn deserialize_response(
    codec: &BoxedCodec,
    schema: &Arc<Schema>,
    response: &HttpResponse,
) -> Result<Document, ClientError> {
    let matcher = BindingMatcher::for_response(schema);

    let mut members = BTreeMap::new();
    if matcher.has_body() {
        if let Document::Structure(decoded) = codec.deserialize(schema, response.body())? {
            members = decoded;
        }
        for (member, binding) in matcher.members() {
            if *binding != Binding::Body {
                members.remove(member.name());
            }
        }
    }
    let mut document = Document::Structure(members);

    for (member, binding) in matcher.members() {
        let value = match binding {
            Binding::Header(name) => read_header(member, response.headers(), name)?,
            Binding::PrefixHeaders(prefix) => read_prefix_headers(response.headers(), prefix)?,
            Binding::Status => Some(Document::Integer(response.status().as_u16().into())),
            Binding::Payload => read_payload(codec, member, response.body())?,
            Binding::Body | Binding::Label | Binding::Query(_) | Binding::QueryParams => None,
        };
        if let Some(value) = value {
            document.set_member(member.name(), value);
        }
    }
    Ok(document)
}

fn read_header(
    member: &Member,
    headers: &HeaderMap,
    name: &str,
) -> Result<Option<Document>, ClientError> {
    let values = headers
        .get_all(name)
        .iter()
        .map(|v| v.to_str().map_err(|_| non_ascii(name)))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Ok(None);
    }
    let raw = values.join(", ");

    if member.shape_type() != ShapeType::List {
        let format = member.timestamp_format();
        let media = member.media_type().is_some();
        return parse_scalar(member.target(), format, media, &raw).map(Some);
    }

    let element = member.target().list_member().ok_or_else(|| {
        ClientError::deserialization(format!("list `{}` has no member schema", member.name()))
    })?;
    let format = list_timestamp_format(member);
    let items = if element.shape_type() == ShapeType::Timestamp
        && format.unwrap_or(TimestampFormat::HttpDate) == TimestampFormat::HttpDate
    {
        headers::split_http_date_list(&raw)
    } else {
        headers::split_list(&raw)?
    };
    let media = element.media_type().is_some();
    items
        .iter()
        .map(|item| parse_scalar(element.target(), format, media, item))
        .collect::<Result<Vec<_>, _>>()
        .map(|list| Some(Document::List(list)))
}

fn read_prefix_headers(headers: &HeaderMap, prefix: &str) -> Result<Option<Document>, ClientError> {
    let mut entries = BTreeMap::new();
    for (name, value) in headers {
        if let Some(suffix) = name.as_str().strip_prefix(prefix) {
            let value = value.to_str().map_err(|_| non_ascii(name.as_str()))?;
            entries.insert(suffix.to_string(), Document::String(value.to_string()));
        }
    }
    Ok((!entries.is_empty()).then_some(Document::Map(entries)))
}

fn read_payload(
    codec: &BoxedCodec,
    member: &Member,
    body: &bytes::Bytes,
) -> Result<Option<Document>, ClientError> {
    if is_event_stream(member) {
        let events = event_stream::decode_events(codec, member.target(), body)?;
        return Ok(Some(Document::List(events)));
    }
    if body.is_empty() {
        return Ok(None);
    }
    let document = match member.shape_type() {
        ShapeType::Structure | ShapeType::Union | ShapeType::Document => {
            codec.deserialize(member.target(), body)?
        }
        ShapeType::Blob => Document::Blob(body.clone()),
        ShapeType::String | ShapeType::Enum => Document::String(
            String::from_utf8(body.to_vec())
                .map_err(|_| ClientError::deserialization("payload is not valid UTF-8"))?,
        ),
        other => {
            return Err(ClientError::deserialization(format!(
                "{} member `{}` cannot be bound to the payload",
                other.as_str(),
                member.name()
            )));
        }
    };
    Ok(Some(document))
}

/// Parse header text into a scalar of the target's type.
fn parse_scalar(
    target: &Schema,
    format: Option<TimestampFormat>,
    media: bool,
    raw: &str,
) -> Result<Document, ClientError> {
    // string items keep surrounding whitespace; quoting already preserved it
    let text = raw;
    let raw = raw.trim();
    let invalid = || {
        ClientError::deserialization(format!(
            "invalid {} header value `{raw}`",
            target.shape_type().as_str()
        ))
    };
    let document = match target.shape_type() {
        ShapeType::String | ShapeType::Enum if media => {
            let bytes = STANDARD.decode(raw).map_err(|_| invalid())?;
            Document::String(String::from_utf8(bytes).map_err(|_| invalid())?)
        }
        ShapeType::String | ShapeType::Enum => Document::String(text.to_string()),
        ShapeType::Boolean => Document::Boolean(raw.parse().map_err(|_| invalid())?),
        ShapeType::Byte
        | ShapeType::Short
        | ShapeType::Integer
        | ShapeType::Long
        | ShapeType::IntEnum => Document::Integer(raw.parse().map_err(|_| invalid())?),
        ShapeType::Float | ShapeType::Double => Document::Float(match raw {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => raw.parse().map_err(|_| invalid())?,
        }),
        ShapeType::Timestamp => Document::Timestamp(
            format
                .unwrap_or(TimestampFormat::HttpDate)
                .parse(raw)
                .map_err(|e| ClientError::deserialization(e.to_string()))?,
        ),
        ShapeType::Blob => Document::Blob(STANDARD.decode(raw).map_err(|_| invalid())?.into()),
        _ => return Err(invalid()),
    };
    Ok(document)
}

fn non_ascii(name: &str) -> ClientError {
    ClientError::deserialization(format!("header `{name}` is not visible ASCII"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use smithy_client_core::{JsonCodec, ShapeId, Trait};

    fn codec() -> BoxedCodec {
        BoxedCodec::new(JsonCodec::new())
    }

    fn output_schema() -> Arc<Schema> {
        let names = Schema::builder(ShapeId::new("ex", "Names"), ShapeType::List)
            .member(Member::new("member", Schema::prelude(ShapeType::String)))
            .build_arc();
        let dates = Schema::builder(ShapeId::new("ex", "Dates"), ShapeType::List)
            .member(Member::new("member", Schema::prelude(ShapeType::Timestamp)))
            .build_arc();
        let meta = Schema::builder(ShapeId::new("ex", "Meta"), ShapeType::Map)
            .member(Member::new("key", Schema::prelude(ShapeType::String)))
            .member(Member::new("value", Schema::prelude(ShapeType::String)))
            .build_arc();
        Schema::builder(ShapeId::new("ex", "GetThingOutput"), ShapeType::Structure)
            .member(
                Member::new("count", Schema::prelude(ShapeType::Integer))
                    .with_trait(Trait::HttpHeader("x-count".into())),
            )
            .member(Member::new("names", names).with_trait(Trait::HttpHeader("x-names".into())))
            .member(Member::new("dates", dates).with_trait(Trait::HttpHeader("x-dates".into())))
            .member(Member::new("meta", meta).with_trait(Trait::HttpPrefixHeaders("x-meta-".into())))
            .member(
                Member::new("code", Schema::prelude(ShapeType::Integer))
                    .with_trait(Trait::HttpResponseCode),
            )
            .member(Member::new("name", Schema::prelude(ShapeType::String)))
            .build_arc()
    }

    #[test]
    fn test_members_read_from_their_bindings() {
        let response = http::Response::builder()
            .status(201)
            .header("x-count", "3")
            .header("x-names", r#"a, "b,c""#)
            .header("x-dates", "Mon, 16 Dec 2019 23:48:18 GMT, Tue, 17 Dec 2019 23:48:18 GMT")
            .header("x-meta-color", "blue")
            .body(Bytes::from_static(br#"{"name":"widget","count":99}"#))
            .unwrap();
        let doc = deserialize_response(&codec(), &output_schema(), &response).unwrap();

        assert_eq!(doc.member("count"), Some(&Document::Integer(3)));
        assert_eq!(doc.member("names"), Some(&Document::from(vec!["a", "b,c"])));
        let first = Utc.with_ymd_and_hms(2019, 12, 16, 23, 48, 18).unwrap();
        let second = Utc.with_ymd_and_hms(2019, 12, 17, 23, 48, 18).unwrap();
        assert_eq!(doc.member("dates"), Some(&Document::from(vec![first, second])));
        assert_eq!(
            doc.member("meta")
                .and_then(Document::as_map)
                .and_then(|m| m.get("color")),
            Some(&Document::from("blue"))
        );
        assert_eq!(doc.member("code"), Some(&Document::Integer(201)));
        assert_eq!(doc.expect_str("name").unwrap(), "widget");
    }

    #[test]
    fn test_repeated_header_lines_are_joined() {
        let response = http::Response::builder()
            .header("x-names", "a")
            .header("x-names", "b")
            .body(Bytes::new())
            .unwrap();
        let doc = deserialize_response(&codec(), &output_schema(), &response).unwrap();
        assert_eq!(doc.member("names"), Some(&Document::from(vec!["a", "b"])));
    }

    #[test]
    fn test_invalid_header_value() {
        let response = http::Response::builder()
            .header("x-count", "three")
            .body(Bytes::new())
            .unwrap();
        let err = deserialize_response(&codec(), &output_schema(), &response).unwrap_err();
        assert!(err.to_string().contains("`three`"));
    }

    #[test]
    fn test_string_payload() {
        let schema = Schema::builder(ShapeId::new("ex", "TextOutput"), ShapeType::Structure)
            .member(
                Member::new("text", Schema::prelude(ShapeType::String))
                    .with_trait(Trait::HttpPayload),
            )
            .build_arc();
        let response = http::Response::builder()
            .body(Bytes::from_static(b"hello"))
            .unwrap();
        let doc = deserialize_response(&codec(), &schema, &response).unwrap();
        assert_eq!(doc.expect_str("text").unwrap(), "hello");
    }
}

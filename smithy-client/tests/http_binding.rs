mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use common::{
    GET_SPROCKET, MockTransport, NAMESPACE, SPROCKET_NOT_FOUND, builder, client, response,
    service_id,
};
use smithy_client::protocol::{Binding, BindingMatcher};
use smithy_client::{
    Document, Endpoint, ErrorKind, Fault, OperationSchema, RequestOverrideConfig, Schema, ShapeId,
};
use smithy_client_core::{HttpTrait, Member, ShapeType, TimestampFormat, Trait};

static HEADERS_SHAPE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let strings = Schema::builder(ShapeId::new(NAMESPACE, "Strings"), ShapeType::List)
        .member(Member::new("member", Schema::prelude(ShapeType::String)))
        .build_arc();
    let dates = Schema::builder(ShapeId::new(NAMESPACE, "Dates"), ShapeType::List)
        .member(Member::new("member", Schema::prelude(ShapeType::Timestamp)))
        .build_arc();
    let meta = Schema::builder(ShapeId::new(NAMESPACE, "Meta"), ShapeType::Map)
        .member(Member::new("key", Schema::prelude(ShapeType::String)))
        .member(Member::new("value", Schema::prelude(ShapeType::String)))
        .build_arc();
    Schema::builder(ShapeId::new(NAMESPACE, "HeaderBag"), ShapeType::Structure)
        .member(Member::new("tags", strings).with_trait(Trait::HttpHeader("X-Tags".into())))
        .member(Member::new("seen", dates).with_trait(Trait::HttpHeader("x-seen".into())))
        .member(
            Member::new("count", Schema::prelude(ShapeType::Integer))
                .with_trait(Trait::HttpHeader("x-count".into())),
        )
        .member(
            Member::new("enabled", Schema::prelude(ShapeType::Boolean))
                .with_trait(Trait::HttpHeader("x-enabled".into())),
        )
        .member(Member::new("meta", meta).with_trait(Trait::HttpPrefixHeaders("x-meta-".into())))
        .build_arc()
});

static ECHO_HEADERS: LazyLock<OperationSchema> = LazyLock::new(|| {
    OperationSchema::builder(
        ShapeId::new(NAMESPACE, "EchoHeaders"),
        service_id(),
        HEADERS_SHAPE.clone(),
        HEADERS_SHAPE.clone(),
    )
    .with_trait(Trait::Http(HttpTrait::new(http::Method::POST, "/echo")))
    .build()
});

#[tokio::test]
async fn header_bindings_round_trip() {
    let transport = MockTransport::echo_headers();
    let client = client(&transport);
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 5).unwrap();
    let mut meta = BTreeMap::new();
    meta.insert("owner".to_string(), Document::from("ops"));
    meta.insert("zone".to_string(), Document::from("west"));
    let input = Document::structure()
        .with_member("tags", vec!["plain", "with,comma", r#"with"quote"#])
        .with_member("seen", vec![first, second])
        .with_member("count", 3)
        .with_member("enabled", true)
        .with_member("meta", Document::Map(meta.clone()));

    let output = client
        .call_document(&ECHO_HEADERS, input.clone(), RequestOverrideConfig::new())
        .await
        .unwrap();

    let sent = transport.last_request();
    assert_eq!(
        sent.headers()["x-tags"],
        r#"plain, "with,comma", "with\"quote""#
    );
    assert_eq!(
        sent.headers()["x-seen"],
        "Mon, 01 Jan 2024 00:00:00 GMT, Thu, 29 Feb 2024 12:30:05 GMT"
    );
    assert_eq!(sent.headers()["x-meta-owner"], "ops");
    assert!(sent.body().is_empty());

    for member in ["tags", "seen", "count", "enabled"] {
        assert_eq!(output.member(member), input.member(member), "member {member}");
    }
    assert_eq!(output.member("meta"), Some(&Document::Map(meta)));
}

fn list_of(name: &str, element: Member) -> Arc<Schema> {
    Schema::builder(ShapeId::new(NAMESPACE, name), ShapeType::List)
        .member(element)
        .build_arc()
}

static EDGE_LISTS: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let strings = list_of(
        "Words",
        Member::new("member", Schema::prelude(ShapeType::String)),
    );
    let documents = list_of(
        "JsonDocs",
        Member::new("member", Schema::prelude(ShapeType::String))
            .with_trait(Trait::MediaType("application/json".into())),
    );
    let instants = list_of(
        "Instants",
        Member::new("member", Schema::prelude(ShapeType::Timestamp)),
    );
    let header = |name: &str, target: &Arc<Schema>, wire: &str| {
        Member::new(name, target.clone()).with_trait(Trait::HttpHeader(wire.into()))
    };
    Schema::builder(ShapeId::new(NAMESPACE, "EdgeLists"), ShapeType::Structure)
        .member(header("blanks", &strings, "x-blanks"))
        .member(header("empty", &strings, "x-empty"))
        .member(header("docs", &documents, "x-docs"))
        .member(
            header("epochs", &instants, "x-epochs")
                .with_trait(Trait::TimestampFormat(TimestampFormat::EpochSeconds)),
        )
        .member(
            header("stamps", &instants, "x-stamps")
                .with_trait(Trait::TimestampFormat(TimestampFormat::DateTime)),
        )
        .build_arc()
});

static ECHO_EDGE_LISTS: LazyLock<OperationSchema> = LazyLock::new(|| {
    OperationSchema::builder(
        ShapeId::new(NAMESPACE, "EchoEdgeLists"),
        service_id(),
        EDGE_LISTS.clone(),
        EDGE_LISTS.clone(),
    )
    .with_trait(Trait::Http(HttpTrait::new(http::Method::POST, "/echo/lists")))
    .build()
});

#[tokio::test]
async fn header_lists_round_trip_edge_values() {
    let transport = MockTransport::echo_headers();
    let client = client(&transport);
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let second = Utc.timestamp_millis_opt(1_709_209_805_500).unwrap();
    let input = Document::structure()
        .with_member("blanks", vec!["a", "", " ", "b"])
        .with_member("empty", Document::List(Vec::new()))
        .with_member("docs", vec!["{}", "[]"])
        .with_member("epochs", vec![first, second])
        .with_member("stamps", vec![first, second]);

    let output = client
        .call_document(&ECHO_EDGE_LISTS, input.clone(), RequestOverrideConfig::new())
        .await
        .unwrap();

    let sent = transport.last_request();
    assert_eq!(sent.headers()["x-blanks"], r#"a, "", " ", b"#);
    assert_eq!(sent.headers()["x-docs"], "e30=, W10=");
    assert_eq!(sent.headers()["x-epochs"], "1704067200, 1709209805.5");
    assert_eq!(
        sent.headers()["x-stamps"],
        "2024-01-01T00:00:00Z, 2024-02-29T12:30:05.500Z"
    );
    for member in ["blanks", "empty", "docs", "epochs", "stamps"] {
        assert_eq!(output.member(member), input.member(member), "member {member}");
    }
}

#[tokio::test]
async fn labels_and_query_land_under_the_endpoint_path() {
    let transport = MockTransport::new();
    transport.push(
        http::Response::builder()
            .status(200)
            .header("etag", "\"v1\"")
            .body(Bytes::from_static(br#"{"name":"gear"}"#))
            .unwrap(),
    );
    let client = builder(&transport)
        .endpoint(Endpoint::parse("https://api.example.com/v1").unwrap())
        .build()
        .unwrap();

    let response = client
        .call_document(
            &GET_SPROCKET,
            Document::structure()
                .with_member("id", "big sprocket")
                .with_member("verbose", true),
            RequestOverrideConfig::new(),
        )
        .await
        .unwrap();

    let sent = transport.last_request();
    assert_eq!(sent.method(), http::Method::GET);
    assert_eq!(
        sent.uri().to_string(),
        "https://api.example.com/v1/sprockets/big%20sprocket?verbose=true"
    );
    assert_eq!(response.expect_str("name").unwrap(), "gear");
    assert_eq!(response.expect_str("etag").unwrap(), "\"v1\"");
    assert_eq!(response.metadata().header("etag"), Some("\"v1\""));
}

#[tokio::test]
async fn modeled_error_is_resolved_from_the_header() {
    let transport = MockTransport::new();
    transport.push(
        http::Response::builder()
            .status(404)
            .header("x-amzn-errortype", "smithy.example#SprocketNotFound:http://internal/")
            .body(Bytes::from_static(br#"{"message":"no sprocket s-9"}"#))
            .unwrap(),
    );
    let client = client(&transport);

    let err = client
        .call_document(
            &GET_SPROCKET,
            Document::structure().with_member("id", "s-9"),
            RequestOverrideConfig::new(),
        )
        .await
        .unwrap_err();

    let ErrorKind::Modeled(modeled) = err.kind() else {
        panic!("expected a modeled error, got {err:?}");
    };
    assert_eq!(modeled.id(), SPROCKET_NOT_FOUND.id());
    assert_eq!(modeled.message(), Some("no sprocket s-9"));
    assert_eq!(err.fault(), Fault::Client);
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn unknown_error_keeps_a_diagnostic_dump() {
    let transport = MockTransport::new();
    transport.push(response(418, r#"{"message":"short and stout"}"#));
    let client = client(&transport);

    let err = client
        .call_document(
            &GET_SPROCKET,
            Document::structure().with_member("id", "s-1"),
            RequestOverrideConfig::new(),
        )
        .await
        .unwrap_err();

    let ErrorKind::Service {
        status, message, ..
    } = err.kind()
    else {
        panic!("expected a service error, got {err:?}");
    };
    assert_eq!(*status, 418);
    assert!(message.starts_with("short and stout"));
    assert!(message.contains("content-type: application/json"));
    assert_eq!(err.fault(), Fault::Client);
}

#[test]
fn bindings_are_classified_from_member_traits() {
    let matcher = BindingMatcher::for_request(GET_SPROCKET.input());
    assert_eq!(matcher.binding("id"), Some(&Binding::Label));
    assert_eq!(
        matcher.binding("verbose"),
        Some(&Binding::Query("verbose".into()))
    );

    let matcher = BindingMatcher::for_response(&HEADERS_SHAPE);
    assert_eq!(matcher.binding("tags"), Some(&Binding::Header("x-tags".into())));
    assert_eq!(
        matcher.binding("meta"),
        Some(&Binding::PrefixHeaders("x-meta-".into()))
    );
    assert!(!matcher.has_body());

    // computed once per schema
    assert!(Arc::ptr_eq(
        &BindingMatcher::for_response(&HEADERS_SHAPE),
        &matcher
    ));
}

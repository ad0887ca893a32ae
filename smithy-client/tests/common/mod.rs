//! Shared fixtures: an in-memory transport and a small sprocket service model.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use smithy_client::{
    ApiOperation, Client, ClientBuilder, ClientError, ClientTransport, Context, Document,
    Endpoint, HttpRequest, HttpResponse, OperationSchema, Schema, Shape, ShapeId,
};
use smithy_client_core::{DocumentError, ErrorFault, HttpTrait, Member, ShapeType, Trait};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync;

#[derive(Default)]
struct MockState {
    queued: VecDeque<Result<HttpResponse, ClientError>>,
    requests: Vec<HttpRequest>,
}

/// Records every request and replays canned responses in order. Once the
/// queue is drained, the fallback responder answers.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    fallback: Arc<Responder>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::replying(|_| Err(ClientError::transport("no canned response left")))
    }

    pub fn replying(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::default(),
            fallback: Arc::new(responder),
        }
    }

    /// Answer every request with its own headers and a 200.
    pub fn echo_headers() -> Self {
        Self::replying(|request| {
            let mut response = http::Response::new(Bytes::new());
            *response.headers_mut() = request.headers().clone();
            Ok(response)
        })
    }

    pub fn push(&self, response: HttpResponse) -> &Self {
        self.state.lock().unwrap().queued.push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: ClientError) -> &Self {
        self.state.lock().unwrap().queued.push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(smithy_client::transport::clone_request)
            .collect()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClientTransport for MockTransport {
    async fn send(
        &self,
        _context: &Context,
        request: HttpRequest,
    ) -> Result<HttpResponse, ClientError> {
        let queued = {
            let mut state = self.state.lock().unwrap();
            state
                .requests
                .push(smithy_client::transport::clone_request(&request));
            state.queued.pop_front()
        };
        match queued {
            Some(result) => result,
            None => (self.fallback)(&request),
        }
    }
}

pub fn response(status: u16, body: &'static str) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
}

pub fn builder(transport: &MockTransport) -> ClientBuilder {
    Client::builder()
        .transport(transport.clone())
        .endpoint(Endpoint::parse("https://sprockets.example.com").unwrap())
}

pub fn client(transport: &MockTransport) -> Client {
    builder(transport).build().unwrap()
}

pub const NAMESPACE: &str = "smithy.example";

pub fn service_id() -> ShapeId {
    ShapeId::new(NAMESPACE, "SprocketService")
}

fn string() -> Arc<Schema> {
    Schema::prelude(ShapeType::String)
}

pub static SPROCKET_NOT_FOUND: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder(ShapeId::new(NAMESPACE, "SprocketNotFound"), ShapeType::Structure)
        .with_trait(Trait::Error(ErrorFault::Client))
        .with_trait(Trait::HttpError(404))
        .member(Member::new("message", string()))
        .build_arc()
});

pub static SLOW_DOWN: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder(ShapeId::new(NAMESPACE, "SlowDown"), ShapeType::Structure)
        .with_trait(Trait::Error(ErrorFault::Client))
        .with_trait(Trait::HttpError(429))
        .with_trait(Trait::Retryable { throttling: true })
        .member(Member::new("message", string()))
        .build_arc()
});

static CREATE_SPROCKET_INPUT: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder(ShapeId::new(NAMESPACE, "CreateSprocketInput"), ShapeType::Structure)
        .member(Member::new("name", string()))
        .member(
            Member::new("token", string())
                .with_trait(Trait::HttpHeader("x-token".into()))
                .with_trait(Trait::IdempotencyToken),
        )
        .build_arc()
});

static CREATE_SPROCKET_OUTPUT: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder(ShapeId::new(NAMESPACE, "CreateSprocketOutput"), ShapeType::Structure)
        .member(Member::new("id", string()))
        .build_arc()
});

static CREATE_SPROCKET: LazyLock<OperationSchema> = LazyLock::new(|| {
    OperationSchema::builder(
        ShapeId::new(NAMESPACE, "CreateSprocket"),
        service_id(),
        CREATE_SPROCKET_INPUT.clone(),
        CREATE_SPROCKET_OUTPUT.clone(),
    )
    .with_trait(Trait::Http(
        HttpTrait::new(http::Method::POST, "/sprockets").with_code(201),
    ))
    .error(SLOW_DOWN.clone())
    .build()
});

/// `POST /sprockets`, with an idempotency token bound to `x-token`.
pub struct CreateSprocket;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateSprocketInput {
    pub name: String,
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateSprocketOutput {
    pub id: String,
}

impl Shape for CreateSprocketInput {
    fn schema() -> Arc<Schema> {
        CREATE_SPROCKET_INPUT.clone()
    }

    fn to_document(&self) -> Document {
        Document::structure()
            .with_member("name", self.name.as_str())
            .with_member("token", self.token.clone())
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(Self {
            name: document.expect_str("name")?.to_string(),
            token: document.optional_str("token")?.map(str::to_string),
        })
    }
}

impl Shape for CreateSprocketOutput {
    fn schema() -> Arc<Schema> {
        CREATE_SPROCKET_OUTPUT.clone()
    }

    fn to_document(&self) -> Document {
        Document::structure().with_member("id", self.id.as_str())
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(Self {
            id: document.expect_str("id")?.to_string(),
        })
    }
}

impl ApiOperation for CreateSprocket {
    type Input = CreateSprocketInput;
    type Output = CreateSprocketOutput;

    fn schema(&self) -> &OperationSchema {
        &CREATE_SPROCKET
    }
}

/// `GET /sprockets/{id}`, read-only.
pub static GET_SPROCKET: LazyLock<OperationSchema> = LazyLock::new(|| {
    let input = Schema::builder(ShapeId::new(NAMESPACE, "GetSprocketInput"), ShapeType::Structure)
        .member(Member::new("id", string()).with_trait(Trait::HttpLabel))
        .member(
            Member::new("verbose", Schema::prelude(ShapeType::Boolean))
                .with_trait(Trait::HttpQuery("verbose".into())),
        )
        .build_arc();
    let output = Schema::builder(ShapeId::new(NAMESPACE, "GetSprocketOutput"), ShapeType::Structure)
        .member(Member::new("name", string()))
        .member(Member::new("etag", string()).with_trait(Trait::HttpHeader("etag".into())))
        .build_arc();
    OperationSchema::builder(
        ShapeId::new(NAMESPACE, "GetSprocket"),
        service_id(),
        input,
        output,
    )
    .with_trait(Trait::Http(HttpTrait::new(http::Method::GET, "/sprockets/{id}")))
    .with_trait(Trait::ReadOnly)
    .error(SPROCKET_NOT_FOUND.clone())
    .build()
});

/// `POST /sprockets/{id}/spin`, with no retry hints of its own.
pub static SPIN_SPROCKET: LazyLock<OperationSchema> = LazyLock::new(|| {
    let input = Schema::builder(ShapeId::new(NAMESPACE, "SpinSprocketInput"), ShapeType::Structure)
        .member(Member::new("id", string()).with_trait(Trait::HttpLabel))
        .build_arc();
    OperationSchema::builder(
        ShapeId::new(NAMESPACE, "SpinSprocket"),
        service_id(),
        input,
        Schema::prelude(ShapeType::Structure),
    )
    .with_trait(Trait::Http(HttpTrait::new(http::Method::POST, "/sprockets/{id}/spin")))
    .error(SLOW_DOWN.clone())
    .build()
});

pub fn spin_input() -> Document {
    Document::structure().with_member("id", "s-1")
}

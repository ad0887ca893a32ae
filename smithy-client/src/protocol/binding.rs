//! HTTP binding classification.
//!
//! Every member of an input, output or error structure is bound to exactly
//! one location of the HTTP message. The classification only depends on the
//! schema, so it is computed once per schema and direction and cached.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use smithy_client_core::{ErrorFault, Member, Schema, ShapeType, Trait};

/// Where a member lives in an HTTP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    /// Interpolated into the URI path.
    Label,
    /// A named query string parameter.
    Query(String),
    /// A map spread over the query string.
    QueryParams,
    /// A named header.
    Header(String),
    /// A map spread over headers sharing a prefix.
    PrefixHeaders(String),
    /// The entire message body.
    Payload,
    /// A member of the codec-encoded body.
    Body,
    /// The response status code.
    Status,
}

/// Which message a schema describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Binding {
    /// Classify a member. Only traits applied to the member itself count.
    pub fn classify(member: &Member, direction: Direction) -> Binding {
        let traits = member.traits();
        let find = |f: fn(&Trait) -> Option<Binding>| traits.iter().find_map(f);

        let explicit = match direction {
            Direction::Request => find(|t| matches!(t, Trait::HttpLabel).then_some(Binding::Label))
                .or_else(|| {
                    find(|t| match t {
                        Trait::HttpQuery(name) => Some(Binding::Query(name.clone())),
                        _ => None,
                    })
                })
                .or_else(|| {
                    find(|t| matches!(t, Trait::HttpQueryParams).then_some(Binding::QueryParams))
                }),
            Direction::Response => find(|t| {
                matches!(t, Trait::HttpResponseCode).then_some(Binding::Status)
            }),
        };

        explicit
            .or_else(|| {
                find(|t| match t {
                    Trait::HttpHeader(name) => Some(Binding::Header(name.to_ascii_lowercase())),
                    _ => None,
                })
            })
            .or_else(|| {
                find(|t| match t {
                    Trait::HttpPrefixHeaders(prefix) => {
                        Some(Binding::PrefixHeaders(prefix.to_ascii_lowercase()))
                    }
                    _ => None,
                })
            })
            .or_else(|| find(|t| matches!(t, Trait::HttpPayload).then_some(Binding::Payload)))
            .unwrap_or(Binding::Body)
    }
}

/// Per-member bindings of one structure.
#[derive(Debug)]
pub struct BindingMatcher {
    schema: Arc<Schema>,
    direction: Direction,
    bindings: Vec<Binding>,
    response_status: u16,
    has_body: bool,
    payload: Option<usize>,
}

static MATCHERS: LazyLock<DashMap<(usize, Direction), Arc<BindingMatcher>>> =
    LazyLock::new(DashMap::new);

impl BindingMatcher {
    /// Bindings of an input structure.
    pub fn for_request(schema: &Arc<Schema>) -> Arc<BindingMatcher> {
        Self::cached(schema, Direction::Request)
    }

    /// Bindings of an output or error structure.
    pub fn for_response(schema: &Arc<Schema>) -> Arc<BindingMatcher> {
        Self::cached(schema, Direction::Response)
    }

    // Keyed by allocation; the cached matcher holds the schema so the address
    // cannot be reused while the entry exists.
    fn cached(schema: &Arc<Schema>, direction: Direction) -> Arc<BindingMatcher> {
        let key = (Arc::as_ptr(schema) as usize, direction);
        if let Some(matcher) = MATCHERS.get(&key) {
            return matcher.clone();
        }
        prune_unreachable();
        MATCHERS
            .entry(key)
            .or_insert_with(|| Arc::new(Self::new(schema.clone(), direction)))
            .clone()
    }

    /// Classify without consulting the cache.
    pub fn new(schema: Arc<Schema>, direction: Direction) -> Self {
        let bindings: Vec<Binding> = schema
            .members()
            .iter()
            .map(|m| Binding::classify(m, direction))
            .collect();
        let has_body = bindings.iter().any(|b| *b == Binding::Body);
        let payload = bindings.iter().position(|b| *b == Binding::Payload);
        let response_status = response_status(&schema);
        Self {
            schema,
            direction,
            bindings,
            response_status,
            has_body,
            payload,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Bindings in member order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Members paired with their bindings.
    pub fn members(&self) -> impl Iterator<Item = (&Member, &Binding)> {
        self.schema.members().iter().zip(self.bindings.iter())
    }

    pub fn binding(&self, member: &str) -> Option<&Binding> {
        self.schema
            .members()
            .iter()
            .position(|m| m.name() == member)
            .map(|i| &self.bindings[i])
    }

    /// Status code a response of this shape carries: `httpError`, else the
    /// `error` trait default (400 or 500), else 200.
    pub fn response_status(&self) -> u16 {
        self.response_status
    }

    /// Whether any member is encoded in the codec body.
    pub fn has_body(&self) -> bool {
        self.has_body
    }

    /// The member bound to the whole payload.
    pub fn payload_member(&self) -> Option<&Member> {
        self.payload.map(|i| &self.schema.members()[i])
    }
}

/// Drop matchers whose schema is only kept alive by the cache itself, so
/// schemas built per call do not accumulate.
fn prune_unreachable() {
    let mut cached_refs: HashMap<usize, usize> = HashMap::new();
    for entry in MATCHERS.iter() {
        *cached_refs.entry(entry.key().0).or_default() += 1;
    }
    MATCHERS.retain(|(ptr, _), matcher| {
        Arc::strong_count(matcher) > 1
            || Arc::strong_count(&matcher.schema) > cached_refs.get(ptr).copied().unwrap_or(0)
    });
}

fn response_status(schema: &Schema) -> u16 {
    schema
        .find_trait(|t| match t {
            Trait::HttpError(code) => Some(*code),
            _ => None,
        })
        .or_else(|| {
            schema.error_fault().map(|fault| match fault {
                ErrorFault::Client => 400,
                ErrorFault::Server => 500,
            })
        })
        .unwrap_or(200)
}

/// Whether a payload member carries an event stream.
pub(crate) fn is_event_stream(member: &Member) -> bool {
    member.shape_type() == ShapeType::Union && member.has_trait(|t| matches!(t, Trait::Streaming))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_client_core::ShapeId;

    fn string_member(name: &str, traits: &[Trait]) -> Member {
        traits.iter().fold(
            Member::new(name, Schema::prelude(ShapeType::String)),
            |m, t| m.with_trait(t.clone()),
        )
    }

    #[test]
    fn test_classification_is_exhaustive() {
        let cases = [
            (vec![Trait::HttpLabel], Binding::Label, Binding::Body),
            (
                vec![Trait::HttpQuery("q".into())],
                Binding::Query("q".into()),
                Binding::Body,
            ),
            (vec![Trait::HttpQueryParams], Binding::QueryParams, Binding::Body),
            (
                vec![Trait::HttpHeader("X-Token".into())],
                Binding::Header("x-token".into()),
                Binding::Header("x-token".into()),
            ),
            (
                vec![Trait::HttpPrefixHeaders("X-Meta-".into())],
                Binding::PrefixHeaders("x-meta-".into()),
                Binding::PrefixHeaders("x-meta-".into()),
            ),
            (vec![Trait::HttpPayload], Binding::Payload, Binding::Payload),
            (vec![Trait::HttpResponseCode], Binding::Body, Binding::Status),
            (vec![Trait::Required], Binding::Body, Binding::Body),
            (vec![], Binding::Body, Binding::Body),
        ];
        for (traits, request, response) in cases {
            let member = string_member("m", &traits);
            assert_eq!(Binding::classify(&member, Direction::Request), request);
            assert_eq!(Binding::classify(&member, Direction::Response), response);
        }
    }

    #[test]
    fn test_target_traits_do_not_bind() {
        let target = Schema::builder(ShapeId::new("ex", "Token"), ShapeType::String)
            .with_trait(Trait::HttpHeader("x-token".into()))
            .build_arc();
        let member = Member::new("token", target);
        assert_eq!(Binding::classify(&member, Direction::Request), Binding::Body);
    }

    #[test]
    fn test_matcher_is_cached_per_direction() {
        let schema = Schema::builder(ShapeId::new("ex", "Input"), ShapeType::Structure)
            .member(string_member("id", &[Trait::HttpLabel]))
            .member(string_member("name", &[]))
            .build_arc();
        let a = BindingMatcher::for_request(&schema);
        let b = BindingMatcher::for_request(&schema);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.has_body());
        assert_eq!(a.binding("id"), Some(&Binding::Label));

        let response = BindingMatcher::for_response(&schema);
        assert!(!Arc::ptr_eq(&a, &response));
        assert_eq!(response.binding("id"), Some(&Binding::Body));
    }

    #[test]
    fn test_cache_releases_dropped_schemas() {
        let transient = Schema::builder(ShapeId::new("ex", "Transient"), ShapeType::Structure)
            .member(string_member("name", &[]))
            .build_arc();
        let weak = Arc::downgrade(&transient);
        drop(BindingMatcher::for_request(&transient));
        drop(BindingMatcher::for_response(&transient));
        drop(transient);

        // a miss for another schema sweeps unreachable entries
        let kept = Schema::builder(ShapeId::new("ex", "Kept"), ShapeType::Structure).build_arc();
        let matcher = BindingMatcher::for_request(&kept);
        assert!(weak.upgrade().is_none());
        assert!(Arc::ptr_eq(&matcher, &BindingMatcher::for_request(&kept)));
    }

    #[test]
    fn test_response_status() {
        let not_found = Schema::builder(ShapeId::new("ex", "NotFound"), ShapeType::Structure)
            .with_trait(Trait::Error(ErrorFault::Client))
            .with_trait(Trait::HttpError(404))
            .build_arc();
        let internal = Schema::builder(ShapeId::new("ex", "Internal"), ShapeType::Structure)
            .with_trait(Trait::Error(ErrorFault::Server))
            .build_arc();
        let bad = Schema::builder(ShapeId::new("ex", "Bad"), ShapeType::Structure)
            .with_trait(Trait::Error(ErrorFault::Client))
            .build_arc();
        let output = Schema::builder(ShapeId::new("ex", "Output"), ShapeType::Structure).build_arc();
        assert_eq!(BindingMatcher::for_response(&not_found).response_status(), 404);
        assert_eq!(BindingMatcher::for_response(&internal).response_status(), 500);
        assert_eq!(BindingMatcher::for_response(&bad).response_status(), 400);
        assert_eq!(BindingMatcher::for_response(&output).response_status(), 200);
    }

    #[test]
    fn test_payload_member_excludes_body() {
        let schema = Schema::builder(ShapeId::new("ex", "Upload"), ShapeType::Structure)
            .member(
                Member::new("data", Schema::prelude(ShapeType::Blob)).with_trait(Trait::HttpPayload),
            )
            .member(string_member("kind", &[Trait::HttpHeader("x-kind".into())]))
            .build_arc();
        let matcher = BindingMatcher::new(schema, Direction::Request);
        assert!(!matcher.has_body());
        assert_eq!(matcher.payload_member().map(Member::name), Some("data"));
    }
}

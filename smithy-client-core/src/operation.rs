//! Operation schemas.

use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Shape;
use crate::schema::{HttpTrait, Schema, ShapeId, Trait};

/// Registry of modeled error schemas for an operation.
///
/// Errors can be looked up by absolute shape id or by bare name, since some
/// protocols only transmit the latter.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    by_id: HashMap<ShapeId, Arc<Schema>>,
    by_name: HashMap<String, Arc<Schema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Arc<Schema>) {
        self.by_name
            .insert(schema.id().name().to_string(), schema.clone());
        self.by_id.insert(schema.id().clone(), schema);
    }

    #[must_use]
    pub fn with(mut self, schema: Arc<Schema>) -> Self {
        self.register(schema);
        self
    }

    /// Look up an error schema by `namespace#Name` or `Name`.
    pub fn lookup(&self, error_id: &str) -> Option<&Arc<Schema>> {
        match ShapeId::parse(error_id) {
            Some(id) => self.by_id.get(&id),
            None => self.by_name.get(error_id),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Everything the runtime needs to know about an operation.
#[derive(Clone, Debug)]
pub struct OperationSchema {
    id: ShapeId,
    service: ShapeId,
    input: Arc<Schema>,
    output: Arc<Schema>,
    traits: Vec<Trait>,
    auth_schemes: Vec<ShapeId>,
    errors: TypeRegistry,
}

impl OperationSchema {
    pub fn builder(
        id: ShapeId,
        service: ShapeId,
        input: Arc<Schema>,
        output: Arc<Schema>,
    ) -> OperationSchemaBuilder {
        OperationSchemaBuilder {
            schema: OperationSchema {
                id,
                service,
                input,
                output,
                traits: Vec::new(),
                auth_schemes: Vec::new(),
                errors: TypeRegistry::new(),
            },
        }
    }

    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Operation name, without namespace.
    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn service(&self) -> &ShapeId {
        &self.service
    }

    pub fn input(&self) -> &Arc<Schema> {
        &self.input
    }

    pub fn output(&self) -> &Arc<Schema> {
        &self.output
    }

    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    /// Auth schemes the operation supports, in priority order.
    pub fn auth_schemes(&self) -> &[ShapeId] {
        &self.auth_schemes
    }

    pub fn errors(&self) -> &TypeRegistry {
        &self.errors
    }

    pub fn http(&self) -> Option<&HttpTrait> {
        self.traits.iter().find_map(|t| match t {
            Trait::Http(http) => Some(http),
            _ => None,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.traits.iter().any(|t| matches!(t, Trait::ReadOnly))
    }

    pub fn is_idempotent(&self) -> bool {
        self.traits.iter().any(|t| matches!(t, Trait::Idempotent))
    }

    /// Name of the input member marked with `idempotencyToken`, if any.
    pub fn idempotency_token_member(&self) -> Option<&str> {
        self.input
            .members()
            .iter()
            .find(|m| m.traits().iter().any(|t| matches!(t, Trait::IdempotencyToken)))
            .map(|m| m.name())
    }
}

/// Builder for [`OperationSchema`].
#[derive(Debug)]
pub struct OperationSchemaBuilder {
    schema: OperationSchema,
}

impl OperationSchemaBuilder {
    #[must_use]
    pub fn with_trait(mut self, t: Trait) -> Self {
        self.schema.traits.push(t);
        self
    }

    #[must_use]
    pub fn auth_scheme(mut self, scheme_id: ShapeId) -> Self {
        self.schema.auth_schemes.push(scheme_id);
        self
    }

    #[must_use]
    pub fn error(mut self, schema: Arc<Schema>) -> Self {
        self.schema.errors.register(schema);
        self
    }

    pub fn build(self) -> OperationSchema {
        self.schema
    }
}

/// A modeled operation binding typed input and output shapes to its schema.
pub trait ApiOperation: Send + Sync {
    type Input: Shape;
    type Output: Shape;

    fn schema(&self) -> &OperationSchema;
}

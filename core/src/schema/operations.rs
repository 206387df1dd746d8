use rustc_hash::FxHashMap;

use crate::schema::{
    EndpointTrait, EventHeaderTrait, EventPayloadTrait, HttpTrait, IdempotencyTokenTrait,
    SchemaRef, ShapeId, ShapeType, StreamingTrait,
};
use crate::serde::ShapeDeserializer;
use crate::{SerdeError, ServiceError};

/// Deserialization hook for a modeled error shape.
pub type ErrorDeserializeFn =
    fn(&mut dyn ShapeDeserializer) -> Result<Box<dyn ServiceError>, SerdeError>;

/// Maps error shape IDs to the deserializers of their generated types.
///
/// Protocols use this registry to surface modeled errors found on the wire
/// as typed errors.
#[derive(Debug, Default, Clone)]
pub struct ErrorRegistry {
    entries: FxHashMap<ShapeId, ErrorDeserializeFn>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_error(mut self, id: impl Into<ShapeId>, deserialize: ErrorDeserializeFn) -> Self {
        self.entries.insert(id.into(), deserialize);
        self
    }

    #[must_use]
    pub fn get(&self, id: &ShapeId) -> Option<ErrorDeserializeFn> {
        self.entries.get(id).copied()
    }

    /// Look an error up by shape name alone.
    ///
    /// Some services send bare error codes with no namespace, so protocols
    /// fall back to name matching when the full ID misses.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<ErrorDeserializeFn> {
        self.entries
            .iter()
            .find(|(id, _)| id.name == name)
            .map(|(_, deserialize)| *deserialize)
    }
}

/// Frozen description of a generated operation.
///
/// Bundles the operation schema with its input and output schemas, the
/// registry of modeled errors, and the auth schemes the operation may use.
#[derive(Debug, Clone)]
pub struct ApiOperation {
    pub schema: SchemaRef,
    pub input: SchemaRef,
    pub output: SchemaRef,
    pub error_registry: ErrorRegistry,
    pub effective_auth_schemes: Vec<ShapeId>,
}

impl ApiOperation {
    pub fn new(schema: SchemaRef, input: SchemaRef, output: SchemaRef) -> Self {
        ApiOperation {
            schema,
            input,
            output,
            error_registry: ErrorRegistry::new(),
            effective_auth_schemes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_error_registry(mut self, registry: ErrorRegistry) -> Self {
        self.error_registry = registry;
        self
    }

    #[must_use]
    pub fn with_auth_schemes(mut self, schemes: Vec<ShapeId>) -> Self {
        self.effective_auth_schemes = schemes;
        self
    }

    /// The name of the operation as defined in the model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.id().name
    }

    /// The operation's `http` trait, if the operation has HTTP bindings.
    #[must_use]
    pub fn http_trait(&self) -> Option<&HttpTrait> {
        self.schema.get_trait_as::<HttpTrait>()
    }

    /// The operation's `endpoint` trait, if a host prefix is modeled.
    #[must_use]
    pub fn endpoint_trait(&self) -> Option<&EndpointTrait> {
        self.schema.get_trait_as::<EndpointTrait>()
    }

    /// The input member carrying an idempotency token, if modeled.
    #[must_use]
    pub fn idempotency_token_member(&self) -> Option<&SchemaRef> {
        self.input
            .members()
            .values()
            .find(|member| member.contains_type::<IdempotencyTokenTrait>())
    }

    /// The input member carrying the operation's input event stream.
    #[must_use]
    pub fn input_stream_member(&self) -> Option<&SchemaRef> {
        streaming_union_member(&self.input)
    }

    /// The output member carrying the operation's output event stream.
    #[must_use]
    pub fn output_stream_member(&self) -> Option<&SchemaRef> {
        streaming_union_member(&self.output)
    }

    /// Helper for event unions: the member carrying the event payload.
    #[must_use]
    pub fn event_payload_member(event_schema: &SchemaRef) -> Option<&SchemaRef> {
        event_schema
            .members()
            .values()
            .find(|member| member.contains_type::<EventPayloadTrait>())
    }

    /// Helper for event unions: the members bound to event headers.
    pub fn event_header_members(event_schema: &SchemaRef) -> impl Iterator<Item = &SchemaRef> {
        event_schema
            .members()
            .values()
            .filter(|member| member.contains_type::<EventHeaderTrait>())
    }
}

fn streaming_union_member(schema: &SchemaRef) -> Option<&SchemaRef> {
    schema.members().values().find(|member| {
        member.contains_type::<StreamingTrait>() && member.shape_type() == &ShapeType::Union
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::schema::prelude::STRING;
    use crate::traits;

    #[test]
    fn finds_idempotency_token_member() {
        let input = Schema::structure_builder("test#Input", traits![])
            .put_member("token", &STRING, traits![IdempotencyTokenTrait])
            .put_member("name", &STRING, traits![])
            .build();
        let operation = ApiOperation::new(
            Schema::create_operation("test#Operation", traits![]),
            input,
            Schema::structure_builder("test#Output", traits![]).build(),
        );
        let member = operation.idempotency_token_member().unwrap();
        assert_eq!(member.member_name(), Some("token"));
    }

    #[test]
    fn finds_streaming_members() {
        let events = Schema::union_builder("test#Events", traits![])
            .put_member("message", &STRING, traits![])
            .build();
        let input = Schema::structure_builder("test#Input", traits![])
            .put_member("events", &events, traits![StreamingTrait])
            .build();
        let operation = ApiOperation::new(
            Schema::create_operation("test#Operation", traits![]),
            input,
            Schema::structure_builder("test#Output", traits![]).build(),
        );
        assert!(operation.input_stream_member().is_some());
        assert!(operation.output_stream_member().is_none());
    }
}

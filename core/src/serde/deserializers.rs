//! Deserialization visitors driven by runtime schemas.
//!
//! A [`ShapeDeserializer`] is the mirror image of
//! [`crate::serde::ShapeSerializer`]: scoped readers invoke a consumer once
//! per member, element, or entry present in the source, in document order.
//! The struct consumer receives the member schema so generated code can
//! dispatch on [`crate::schema::Schema::expect_member_index`] instead of
//! comparing member names.

use crate::schema::{Document, SchemaRef};
use crate::transport::Body;
use crate::{BigDecimal, BigInt, Bytes, SerdeError, Timestamp};

/// Consumer invoked once per struct member present in the source.
pub type StructConsumer<'a> =
    &'a mut dyn FnMut(&SchemaRef, &mut dyn ShapeDeserializer) -> Result<(), SerdeError>;

/// Consumer invoked once per list element present in the source.
pub type ListConsumer<'a> =
    &'a mut dyn FnMut(&mut dyn ShapeDeserializer) -> Result<(), SerdeError>;

/// Consumer invoked once per map entry present in the source.
pub type MapConsumer<'a> =
    &'a mut dyn FnMut(&str, &mut dyn ShapeDeserializer) -> Result<(), SerdeError>;

/// Visitor for deserializing shapes based on the Smithy data model.
#[allow(unused_variables)]
pub trait ShapeDeserializer {
    /// Read a structure, invoking the consumer for each member present.
    fn read_struct(
        &mut self,
        schema: &SchemaRef,
        consumer: StructConsumer<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "read_struct"))
    }

    /// Read a list, invoking the consumer for each element present.
    fn read_list(
        &mut self,
        schema: &SchemaRef,
        consumer: ListConsumer<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "read_list"))
    }

    /// Read a map, invoking the consumer for each entry present.
    fn read_map(
        &mut self,
        schema: &SchemaRef,
        consumer: MapConsumer<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "read_map"))
    }

    fn read_boolean(&mut self, schema: &SchemaRef) -> Result<bool, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_boolean"))
    }

    fn read_byte(&mut self, schema: &SchemaRef) -> Result<i8, SerdeError> {
        let value = self.read_long(schema)?;
        i8::try_from(value)
            .map_err(|_| SerdeError::expectation(format!("value {value} out of range for byte")))
    }

    fn read_short(&mut self, schema: &SchemaRef) -> Result<i16, SerdeError> {
        let value = self.read_long(schema)?;
        i16::try_from(value)
            .map_err(|_| SerdeError::expectation(format!("value {value} out of range for short")))
    }

    fn read_integer(&mut self, schema: &SchemaRef) -> Result<i32, SerdeError> {
        let value = self.read_long(schema)?;
        i32::try_from(value)
            .map_err(|_| SerdeError::expectation(format!("value {value} out of range for integer")))
    }

    fn read_long(&mut self, schema: &SchemaRef) -> Result<i64, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_long"))
    }

    fn read_float(&mut self, schema: &SchemaRef) -> Result<f32, SerdeError> {
        Ok(self.read_double(schema)? as f32)
    }

    fn read_double(&mut self, schema: &SchemaRef) -> Result<f64, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_double"))
    }

    fn read_big_integer(&mut self, schema: &SchemaRef) -> Result<BigInt, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_big_integer"))
    }

    fn read_big_decimal(&mut self, schema: &SchemaRef) -> Result<BigDecimal, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_big_decimal"))
    }

    fn read_string(&mut self, schema: &SchemaRef) -> Result<String, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_string"))
    }

    fn read_blob(&mut self, schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_blob"))
    }

    fn read_timestamp(&mut self, schema: &SchemaRef) -> Result<Timestamp, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_timestamp"))
    }

    fn read_document(&mut self, schema: &SchemaRef) -> Result<Document, SerdeError> {
        Err(SerdeError::unexpected(schema, "read_document"))
    }

    /// Read a streaming payload bound to the transport message body.
    fn read_data_stream(&mut self, schema: &SchemaRef) -> Result<Body, SerdeError> {
        Err(SerdeError::UnsupportedStream)
    }

    /// Peek at the next value to determine if it is null without consuming it.
    fn is_null(&mut self) -> bool {
        false
    }

    /// Consume a null value. Only makes sense after [`Self::is_null`].
    fn read_null(&mut self) -> Result<(), SerdeError> {
        Err(SerdeError::expectation("expected a null value"))
    }
}

/// Contract satisfied by generated shapes that can deserialize themselves.
pub trait DeserializeShape: Sized {
    /// Materialize the shape from the given deserializer.
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError>;
}

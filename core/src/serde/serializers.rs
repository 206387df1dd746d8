//! Serialization visitors driven by runtime schemas.
//!
//! A [`ShapeSerializer`] exposes one writer per Smithy data-model type plus
//! scoped writers for structures, lists, and maps. Scoped writers take a
//! closure so that the scope is closed on every exit path, including error
//! paths; no partial writes leak into the output sink.
//!
//! Writers a sink does not support fail with an `unexpected schema` error
//! by default, so location-specific serializers (headers, query params,
//! path labels) only implement the writers that are valid for them. The
//! integer-family writers funnel into [`ShapeSerializer::write_long`] and
//! [`ShapeSerializer::write_float`] funnels into
//! [`ShapeSerializer::write_double`], so full codecs only override the
//! funnel points when one representation suffices.

use crate::schema::{Document, SchemaRef};
use crate::transport::Body;
use crate::{BigDecimal, BigInt, Bytes, SerdeError, Timestamp};

/// Closure writing the contents of a struct or list scope.
pub type ScopeWriter<'a> = &'a mut dyn FnMut(&mut dyn ShapeSerializer) -> Result<(), SerdeError>;

/// Closure writing the entries of a map scope.
pub type MapScopeWriter<'a> = &'a mut dyn FnMut(&mut dyn MapSerializer) -> Result<(), SerdeError>;

/// Closure writing a single value, used for map entry values.
pub type ValueWriter<'a> = &'a mut dyn FnMut(&mut dyn ShapeSerializer) -> Result<(), SerdeError>;

/// Visitor for serializing shapes based on the Smithy data model.
#[allow(unused_variables)]
pub trait ShapeSerializer {
    /// Open a structure scope and write its members through the closure.
    ///
    /// The serializer handed to the closure is responsible for writing out
    /// member names and any data needed between members.
    fn write_struct(
        &mut self,
        schema: &SchemaRef,
        members: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_struct"))
    }

    /// Open a list scope and write its elements through the closure.
    fn write_list(
        &mut self,
        schema: &SchemaRef,
        size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_list"))
    }

    /// Open a map scope and write its entries through the closure.
    fn write_map(
        &mut self,
        schema: &SchemaRef,
        size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_map"))
    }

    fn write_null(&mut self, schema: &SchemaRef) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_null"))
    }

    fn write_boolean(&mut self, schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_boolean"))
    }

    fn write_byte(&mut self, schema: &SchemaRef, value: i8) -> Result<(), SerdeError> {
        self.write_long(schema, i64::from(value))
    }

    fn write_short(&mut self, schema: &SchemaRef, value: i16) -> Result<(), SerdeError> {
        self.write_long(schema, i64::from(value))
    }

    fn write_integer(&mut self, schema: &SchemaRef, value: i32) -> Result<(), SerdeError> {
        self.write_long(schema, i64::from(value))
    }

    fn write_long(&mut self, schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_long"))
    }

    fn write_float(&mut self, schema: &SchemaRef, value: f32) -> Result<(), SerdeError> {
        self.write_double(schema, f64::from(value))
    }

    fn write_double(&mut self, schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_double"))
    }

    fn write_big_integer(&mut self, schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_big_integer"))
    }

    fn write_big_decimal(
        &mut self,
        schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_big_decimal"))
    }

    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_string"))
    }

    fn write_blob(&mut self, schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_blob"))
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_timestamp"))
    }

    fn write_document(&mut self, schema: &SchemaRef, value: &Document) -> Result<(), SerdeError> {
        Err(SerdeError::unexpected(schema, "write_document"))
    }

    /// Write a data stream to the output.
    ///
    /// Streaming values MUST NOT be read by this method; they are bound to
    /// the request or response and read by the transport. Data streams are
    /// only supported at the top-level input and output of operations.
    fn write_data_stream(&mut self, schema: &SchemaRef, value: Body) -> Result<(), SerdeError> {
        Err(SerdeError::UnsupportedStream)
    }

    /// Flush the underlying sink.
    fn flush(&mut self) -> Result<(), SerdeError> {
        Ok(())
    }
}

/// Visitor for serializing map entries.
///
/// Responsible for writing any data needed between keys and values as well
/// as any data needed between entries.
pub trait MapSerializer {
    /// Write a single map entry.
    fn entry(&mut self, key: &str, value: ValueWriter<'_>) -> Result<(), SerdeError>;
}

/// Hooks run around every write of an [`InterceptingSerializer`].
///
/// `before` picks the delegate for a schema; `after` runs once the value
/// has been written. The HTTP binding layer uses this to route members to
/// binding-location serializers; format codecs use it to write member keys
/// and separators.
#[allow(unused_variables)]
pub trait SerializerInterceptor {
    fn before(&mut self, schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError>;

    fn after(&mut self, schema: &SchemaRef) -> Result<(), SerdeError> {
        Ok(())
    }
}

/// Decorates another serializer with before/after hooks around every
/// write.
pub struct InterceptingSerializer<I> {
    interceptor: I,
}

impl<I: SerializerInterceptor> InterceptingSerializer<I> {
    pub fn new(interceptor: I) -> Self {
        InterceptingSerializer { interceptor }
    }

    pub fn into_inner(self) -> I {
        self.interceptor
    }

    fn before(&mut self, schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        self.interceptor.before(schema)
    }

    fn after(&mut self, schema: &SchemaRef) -> Result<(), SerdeError> {
        self.interceptor.after(schema)
    }
}

impl<I: SerializerInterceptor> ShapeSerializer for InterceptingSerializer<I> {
    fn write_struct(
        &mut self,
        schema: &SchemaRef,
        members: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.before(schema)?.write_struct(schema, members)?;
        self.after(schema)
    }

    fn write_list(
        &mut self,
        schema: &SchemaRef,
        size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.before(schema)?.write_list(schema, size, elements)?;
        self.after(schema)
    }

    fn write_map(
        &mut self,
        schema: &SchemaRef,
        size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.before(schema)?.write_map(schema, size, entries)?;
        self.after(schema)
    }

    fn write_null(&mut self, schema: &SchemaRef) -> Result<(), SerdeError> {
        self.before(schema)?.write_null(schema)?;
        self.after(schema)
    }

    fn write_boolean(&mut self, schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        self.before(schema)?.write_boolean(schema, value)?;
        self.after(schema)
    }

    fn write_byte(&mut self, schema: &SchemaRef, value: i8) -> Result<(), SerdeError> {
        self.before(schema)?.write_byte(schema, value)?;
        self.after(schema)
    }

    fn write_short(&mut self, schema: &SchemaRef, value: i16) -> Result<(), SerdeError> {
        self.before(schema)?.write_short(schema, value)?;
        self.after(schema)
    }

    fn write_integer(&mut self, schema: &SchemaRef, value: i32) -> Result<(), SerdeError> {
        self.before(schema)?.write_integer(schema, value)?;
        self.after(schema)
    }

    fn write_long(&mut self, schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        self.before(schema)?.write_long(schema, value)?;
        self.after(schema)
    }

    fn write_float(&mut self, schema: &SchemaRef, value: f32) -> Result<(), SerdeError> {
        self.before(schema)?.write_float(schema, value)?;
        self.after(schema)
    }

    fn write_double(&mut self, schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        self.before(schema)?.write_double(schema, value)?;
        self.after(schema)
    }

    fn write_big_integer(&mut self, schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        self.before(schema)?.write_big_integer(schema, value)?;
        self.after(schema)
    }

    fn write_big_decimal(
        &mut self,
        schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        self.before(schema)?.write_big_decimal(schema, value)?;
        self.after(schema)
    }

    fn write_string(&mut self, schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        self.before(schema)?.write_string(schema, value)?;
        self.after(schema)
    }

    fn write_blob(&mut self, schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        self.before(schema)?.write_blob(schema, value)?;
        self.after(schema)
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        self.before(schema)?.write_timestamp(schema, value)?;
        self.after(schema)
    }

    fn write_document(&mut self, schema: &SchemaRef, value: &Document) -> Result<(), SerdeError> {
        self.before(schema)?.write_document(schema, value)?;
        self.after(schema)
    }

    fn write_data_stream(&mut self, schema: &SchemaRef, value: Body) -> Result<(), SerdeError> {
        self.before(schema)?.write_data_stream(schema, value)?;
        self.after(schema)
    }
}

/// Contract satisfied by generated shapes that can serialize themselves.
pub trait SerializeShape {
    /// Schema of this shape.
    fn schema(&self) -> &SchemaRef;

    /// Serialize the state of the shape into the given serializer.
    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError>;
}

/// Contract satisfied by generated structures and unions.
pub trait SerializeStruct: SerializeShape {
    /// Serialize the members of the shape into the given serializer.
    fn serialize_members(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError>;

    /// Serialize the whole shape as a struct scope.
    fn serialize_struct(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError>
    where
        Self: Sized,
    {
        serializer.write_struct(self.schema(), &mut |members| self.serialize_members(members))
    }
}

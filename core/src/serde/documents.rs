//! Conversion between typed shapes and protocol-agnostic documents.
//!
//! [`Document::from_shape`] runs a document-producing serializer over a
//! typed shape; [`Document::as_shape`] runs a document-consuming
//! deserializer to materialize a typed shape from untyped content.

use crate::schema::{Document, DocumentValue, NumberFloat, NumberInteger, NumberValue, SchemaRef};
use crate::schema::ShapeType;
use crate::serde::{
    DeserializeShape, InterceptingSerializer, ListConsumer, MapConsumer, MapScopeWriter,
    MapSerializer, ScopeWriter, SerializeShape, SerializerInterceptor, ShapeDeserializer,
    ShapeSerializer, StructConsumer, ValueWriter,
};
use crate::{BigDecimal, BigInt, Bytes, FxIndexMap, SerdeError, Timestamp};

impl Document {
    /// Build a document equivalent to the shape's serialized form.
    pub fn from_shape<S: SerializeShape>(shape: &S) -> Result<Document, SerdeError> {
        let mut serializer = DocumentSerializer::new();
        shape.serialize(&mut serializer)?;
        Ok(Document::new(shape.schema().clone(), serializer.take()))
    }

    /// Materialize a typed shape from this document.
    pub fn as_shape<T: DeserializeShape>(&self) -> Result<T, SerdeError> {
        let mut deserializer = DocumentDeserializer::new(&self.value);
        T::deserialize(&mut deserializer)
    }
}

/// A [`ShapeSerializer`] that captures writes as document values.
#[derive(Default)]
pub struct DocumentSerializer {
    result: Option<DocumentValue>,
}

impl DocumentSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the captured value, defaulting to null when nothing was written.
    pub fn take(&mut self) -> DocumentValue {
        self.result.take().unwrap_or_default()
    }
}

impl ShapeSerializer for DocumentSerializer {
    fn write_struct(
        &mut self,
        _schema: &SchemaRef,
        members: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let mut map = FxIndexMap::default();
        let mut member_serializer = InterceptingSerializer::new(DocumentMemberSerializer {
            map: &mut map,
            inner: DocumentSerializer::new(),
        });
        members(&mut member_serializer)?;
        self.result = Some(DocumentValue::Map(map));
        Ok(())
    }

    fn write_list(
        &mut self,
        _schema: &SchemaRef,
        size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let mut list = Vec::with_capacity(size);
        let mut element_serializer = InterceptingSerializer::new(DocumentElementSerializer {
            list: &mut list,
            inner: DocumentSerializer::new(),
        });
        elements(&mut element_serializer)?;
        self.result = Some(DocumentValue::List(list));
        Ok(())
    }

    fn write_map(
        &mut self,
        _schema: &SchemaRef,
        size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        let mut entry_serializer = DocumentMapSerializer {
            map: FxIndexMap::with_capacity_and_hasher(size, rustc_hash::FxBuildHasher),
        };
        entries(&mut entry_serializer)?;
        self.result = Some(DocumentValue::Map(entry_serializer.map));
        Ok(())
    }

    fn write_null(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Null);
        Ok(())
    }

    fn write_boolean(&mut self, _schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Boolean(value));
        Ok(())
    }

    fn write_byte(&mut self, _schema: &SchemaRef, value: i8) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Number(NumberValue::Integer(
            NumberInteger::Byte(value),
        )));
        Ok(())
    }

    fn write_short(&mut self, _schema: &SchemaRef, value: i16) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Number(NumberValue::Integer(
            NumberInteger::Short(value),
        )));
        Ok(())
    }

    fn write_integer(&mut self, _schema: &SchemaRef, value: i32) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::integer(value));
        Ok(())
    }

    fn write_long(&mut self, _schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::long(value));
        Ok(())
    }

    fn write_float(&mut self, _schema: &SchemaRef, value: f32) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Number(NumberValue::Float(
            NumberFloat::Float(value),
        )));
        Ok(())
    }

    fn write_double(&mut self, _schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::double(value));
        Ok(())
    }

    fn write_big_integer(
        &mut self,
        _schema: &SchemaRef,
        value: &BigInt,
    ) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Number(NumberValue::Integer(
            NumberInteger::BigInt(value.clone()),
        )));
        Ok(())
    }

    fn write_big_decimal(
        &mut self,
        _schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Number(NumberValue::Float(
            NumberFloat::BigDecimal(value.clone()),
        )));
        Ok(())
    }

    fn write_string(&mut self, _schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::String(value.to_string()));
        Ok(())
    }

    fn write_blob(&mut self, _schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Blob(value.clone()));
        Ok(())
    }

    fn write_timestamp(&mut self, _schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        self.result = Some(DocumentValue::Timestamp(*value));
        Ok(())
    }

    fn write_document(&mut self, _schema: &SchemaRef, value: &Document) -> Result<(), SerdeError> {
        self.result = Some(value.value().clone());
        Ok(())
    }
}

/// Captures struct members into a map keyed by member name.
struct DocumentMemberSerializer<'a> {
    map: &'a mut FxIndexMap<String, DocumentValue>,
    inner: DocumentSerializer,
}

impl SerializerInterceptor for DocumentMemberSerializer<'_> {
    fn before(&mut self, _schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        Ok(&mut self.inner)
    }

    fn after(&mut self, schema: &SchemaRef) -> Result<(), SerdeError> {
        let name = schema.expect_member_name()?.to_string();
        self.map.insert(name, self.inner.take());
        Ok(())
    }
}

/// Captures list elements in order.
struct DocumentElementSerializer<'a> {
    list: &'a mut Vec<DocumentValue>,
    inner: DocumentSerializer,
}

impl SerializerInterceptor for DocumentElementSerializer<'_> {
    fn before(&mut self, _schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        Ok(&mut self.inner)
    }

    fn after(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        self.list.push(self.inner.take());
        Ok(())
    }
}

/// Captures map entries keyed by entry key.
struct DocumentMapSerializer {
    map: FxIndexMap<String, DocumentValue>,
}

impl MapSerializer for DocumentMapSerializer {
    fn entry(&mut self, key: &str, value: ValueWriter<'_>) -> Result<(), SerdeError> {
        let mut inner = DocumentSerializer::new();
        value(&mut inner)?;
        self.map.insert(key.to_string(), inner.take());
        Ok(())
    }
}

/// A [`ShapeDeserializer`] reading from a document value tree.
pub struct DocumentDeserializer<'a> {
    value: &'a DocumentValue,
}

impl<'a> DocumentDeserializer<'a> {
    pub fn new(value: &'a DocumentValue) -> Self {
        DocumentDeserializer { value }
    }

    fn mismatch(&self, expected: &'static str) -> SerdeError {
        SerdeError::expectation(format!("expected a {expected} document value"))
    }
}

impl ShapeDeserializer for DocumentDeserializer<'_> {
    fn read_struct(
        &mut self,
        schema: &SchemaRef,
        consumer: StructConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let DocumentValue::Map(map) = self.value else {
            return Err(self.mismatch("map"));
        };
        for (name, value) in map {
            // Unknown members are skipped rather than failing the read.
            if let Some(member) = schema.get_member(name) {
                consumer(member, &mut DocumentDeserializer::new(value))?;
            }
        }
        Ok(())
    }

    fn read_list(
        &mut self,
        _schema: &SchemaRef,
        consumer: ListConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let DocumentValue::List(values) = self.value else {
            return Err(self.mismatch("list"));
        };
        for value in values {
            consumer(&mut DocumentDeserializer::new(value))?;
        }
        Ok(())
    }

    fn read_map(
        &mut self,
        _schema: &SchemaRef,
        consumer: MapConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let DocumentValue::Map(map) = self.value else {
            return Err(self.mismatch("map"));
        };
        for (key, value) in map {
            consumer(key, &mut DocumentDeserializer::new(value))?;
        }
        Ok(())
    }

    fn read_boolean(&mut self, _schema: &SchemaRef) -> Result<bool, SerdeError> {
        match self.value {
            DocumentValue::Boolean(value) => Ok(*value),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn read_long(&mut self, _schema: &SchemaRef) -> Result<i64, SerdeError> {
        match self.value {
            DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
                NumberInteger::Byte(v) => Ok(i64::from(*v)),
                NumberInteger::Short(v) => Ok(i64::from(*v)),
                NumberInteger::Integer(v) => Ok(i64::from(*v)),
                NumberInteger::Long(v) => Ok(*v),
                NumberInteger::BigInt(v) => i64::try_from(v.clone())
                    .map_err(|_| self.mismatch("64-bit representable integer")),
            },
            _ => Err(self.mismatch("integer")),
        }
    }

    fn read_double(&mut self, _schema: &SchemaRef) -> Result<f64, SerdeError> {
        match self.value {
            DocumentValue::Number(NumberValue::Float(nf)) => match nf {
                NumberFloat::Float(v) => Ok(f64::from(*v)),
                NumberFloat::Double(v) => Ok(*v),
                NumberFloat::BigDecimal(_) => Err(self.mismatch("64-bit representable float")),
            },
            _ => Err(self.mismatch("float")),
        }
    }

    fn read_big_integer(&mut self, _schema: &SchemaRef) -> Result<BigInt, SerdeError> {
        match self.value {
            DocumentValue::Number(NumberValue::Integer(NumberInteger::BigInt(v))) => Ok(v.clone()),
            DocumentValue::Number(NumberValue::Integer(_)) => {
                self.read_long(_schema).map(BigInt::from)
            }
            _ => Err(self.mismatch("big integer")),
        }
    }

    fn read_big_decimal(&mut self, _schema: &SchemaRef) -> Result<BigDecimal, SerdeError> {
        match self.value {
            DocumentValue::Number(NumberValue::Float(NumberFloat::BigDecimal(v))) => Ok(v.clone()),
            _ => Err(self.mismatch("big decimal")),
        }
    }

    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        match self.value {
            DocumentValue::String(value) => Ok(value.clone()),
            _ => Err(self.mismatch("string")),
        }
    }

    fn read_blob(&mut self, _schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        match self.value {
            DocumentValue::Blob(value) => Ok(value.clone()),
            _ => Err(self.mismatch("blob")),
        }
    }

    fn read_timestamp(&mut self, _schema: &SchemaRef) -> Result<Timestamp, SerdeError> {
        match self.value {
            DocumentValue::Timestamp(value) => Ok(*value),
            _ => Err(self.mismatch("timestamp")),
        }
    }

    fn read_document(&mut self, schema: &SchemaRef) -> Result<Document, SerdeError> {
        Ok(Document::new(schema.clone(), self.value.clone()))
    }

    fn is_null(&mut self) -> bool {
        matches!(self.value, DocumentValue::Null)
    }

    fn read_null(&mut self) -> Result<(), SerdeError> {
        match self.value {
            DocumentValue::Null => Ok(()),
            _ => Err(self.mismatch("null")),
        }
    }
}

impl SerializeShape for Document {
    fn schema(&self) -> &SchemaRef {
        Document::schema(self)
    }

    /// Serialization dispatches on the document's own shape type; only a
    /// document of DOCUMENT type is emitted via `write_document`.
    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        serialize_value(self.schema(), self.value(), serializer)
    }
}

fn serialize_value(
    schema: &SchemaRef,
    value: &DocumentValue,
    serializer: &mut dyn ShapeSerializer,
) -> Result<(), SerdeError> {
    match schema.shape_type() {
        ShapeType::Document => {
            serializer.write_document(schema, &Document::new(schema.clone(), value.clone()))
        }
        ShapeType::Structure | ShapeType::Union => {
            let DocumentValue::Map(map) = value else {
                return Err(SerdeError::expectation("structure documents must be maps"));
            };
            serializer.write_struct(schema, &mut |members| {
                for (name, member_value) in map {
                    let Some(member) = schema.get_member(name) else {
                        continue;
                    };
                    serialize_value(member, member_value, members)?;
                }
                Ok(())
            })
        }
        ShapeType::List => {
            let DocumentValue::List(values) = value else {
                return Err(SerdeError::expectation("list documents must be lists"));
            };
            let member = schema
                .get_member("member")
                .ok_or_else(|| SerdeError::expectation("list schema missing `member`"))?
                .clone();
            serializer.write_list(schema, values.len(), &mut |elements| {
                for element in values {
                    serialize_value(&member, element, elements)?;
                }
                Ok(())
            })
        }
        ShapeType::Map => {
            let DocumentValue::Map(map) = value else {
                return Err(SerdeError::expectation("map documents must be maps"));
            };
            let value_member = schema
                .get_member("value")
                .ok_or_else(|| SerdeError::expectation("map schema missing `value`"))?
                .clone();
            serializer.write_map(schema, map.len(), &mut |entries| {
                for (key, entry_value) in map {
                    entries.entry(key, &mut |value_serializer| {
                        serialize_value(&value_member, entry_value, value_serializer)
                    })?;
                }
                Ok(())
            })
        }
        _ => serialize_scalar(schema, value, serializer),
    }
}

fn serialize_scalar(
    schema: &SchemaRef,
    value: &DocumentValue,
    serializer: &mut dyn ShapeSerializer,
) -> Result<(), SerdeError> {
    match value {
        DocumentValue::Null => serializer.write_null(schema),
        DocumentValue::Boolean(v) => serializer.write_boolean(schema, *v),
        DocumentValue::Blob(v) => serializer.write_blob(schema, v),
        DocumentValue::String(v) => serializer.write_string(schema, v),
        DocumentValue::Timestamp(v) => serializer.write_timestamp(schema, v),
        DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
            NumberInteger::Byte(v) => serializer.write_byte(schema, *v),
            NumberInteger::Short(v) => serializer.write_short(schema, *v),
            NumberInteger::Integer(v) => serializer.write_integer(schema, *v),
            NumberInteger::Long(v) => serializer.write_long(schema, *v),
            NumberInteger::BigInt(v) => serializer.write_big_integer(schema, v),
        },
        DocumentValue::Number(NumberValue::Float(nf)) => match nf {
            NumberFloat::Float(v) => serializer.write_float(schema, *v),
            NumberFloat::Double(v) => serializer.write_double(schema, *v),
            NumberFloat::BigDecimal(v) => serializer.write_big_decimal(schema, v),
        },
        DocumentValue::List(_) | DocumentValue::Map(_) => Err(SerdeError::expectation(
            "aggregate document value with scalar schema",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::prelude::{INTEGER, STRING};
    use crate::schema::{Schema, ShapeId};
    use crate::traits;

    struct Person {
        name: String,
        age: i32,
    }

    fn person_schema() -> SchemaRef {
        Schema::structure_builder(ShapeId::from("test#Person"), traits![])
            .put_member("name", &STRING, traits![])
            .put_member("age", &INTEGER, traits![])
            .build()
    }

    impl SerializeShape for Person {
        fn schema(&self) -> &SchemaRef {
            static SCHEMA: std::sync::LazyLock<SchemaRef> =
                std::sync::LazyLock::new(person_schema);
            &SCHEMA
        }

        fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
            let schema = self.schema().clone();
            serializer.write_struct(&schema, &mut |members| {
                members.write_string(schema.expect_member("name"), &self.name)?;
                members.write_integer(schema.expect_member("age"), self.age)?;
                Ok(())
            })
        }
    }

    impl DeserializeShape for Person {
        fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
            static SCHEMA: std::sync::LazyLock<SchemaRef> =
                std::sync::LazyLock::new(person_schema);
            let mut name = None;
            let mut age = None;
            deserializer.read_struct(&SCHEMA, &mut |member, de| {
                match member.expect_member_index()? {
                    0 => name = Some(de.read_string(member)?),
                    1 => age = Some(de.read_integer(member)?),
                    _ => {}
                }
                Ok(())
            })?;
            Ok(Person {
                name: name.ok_or_else(|| SerdeError::expectation("missing `name`"))?,
                age: age.ok_or_else(|| SerdeError::expectation("missing `age`"))?,
            })
        }
    }

    #[test]
    fn document_round_trip() {
        let person = Person {
            name: "Pat".into(),
            age: 27,
        };
        let document = Document::from_shape(&person).unwrap();
        assert_eq!(
            document.get_member("name").unwrap().as_string(),
            Some("Pat")
        );

        let decoded: Person = document.as_shape().unwrap();
        assert_eq!(decoded.name, "Pat");
        assert_eq!(decoded.age, 27);

        // Round-tripping through the typed shape reproduces the document.
        let document_again = Document::from_shape(&decoded).unwrap();
        assert_eq!(document, document_again);
    }

    #[test]
    fn document_serialize_dispatches_on_shape_type() {
        let person = Person {
            name: "Pat".into(),
            age: 27,
        };
        let document = Document::from_shape(&person).unwrap();
        let mut serializer = DocumentSerializer::new();
        document.serialize(&mut serializer).unwrap();
        assert_eq!(serializer.take(), document.value().clone());
    }
}

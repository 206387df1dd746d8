//! JSON deserialization over a parsed value tree.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use smithy_rt_core::schema::{
    Document, DocumentValue, JsonNameTrait, SchemaRef, TimestampFormatTrait,
};
use smithy_rt_core::serde::{ListConsumer, MapConsumer, ShapeDeserializer, StructConsumer};
use smithy_rt_core::types::TimestampFormat;
use smithy_rt_core::{BigDecimal, BigInt, Bytes, FxIndexMap, SerdeError, Timestamp};

use crate::serialization::DEFAULT_TIMESTAMP_FORMAT;

/// Owns the parsed document and hands out borrowing walkers.
pub struct JsonRootDeserializer {
    root: Value,
}

impl JsonRootDeserializer {
    pub fn parse(source: &[u8]) -> Result<Self, SerdeError> {
        let root = serde_json::from_slice(source)
            .map_err(|e| SerdeError::Deserialization(format!("invalid JSON document: {e}")))?;
        Ok(JsonRootDeserializer { root })
    }
}

/// Walks a borrowed JSON value.
pub struct JsonDeserializer<'a> {
    value: &'a Value,
}

impl<'a> JsonDeserializer<'a> {
    pub fn new(value: &'a Value) -> Self {
        JsonDeserializer { value }
    }

    fn mismatch(&self, expected: &'static str) -> SerdeError {
        SerdeError::Deserialization(format!("expected a JSON {expected}, found: {}", self.value))
    }
}

/// Find the member matching a JSON object key by jsonName or member name.
fn match_member<'s>(schema: &'s SchemaRef, key: &str) -> Option<&'s SchemaRef> {
    schema.members().values().find(|member| {
        match member.get_trait_as::<JsonNameTrait>() {
            Some(json_name) => json_name.name() == key,
            None => member.member_name() == Some(key),
        }
    })
}

impl ShapeDeserializer for JsonDeserializer<'_> {
    fn read_struct(
        &mut self,
        schema: &SchemaRef,
        consumer: StructConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let Value::Object(map) = self.value else {
            return Err(self.mismatch("object"));
        };
        for (key, value) in map {
            // Unknown members are skipped rather than failing the read.
            if let Some(member) = match_member(schema, key) {
                consumer(member, &mut JsonDeserializer::new(value))?;
            }
        }
        Ok(())
    }

    fn read_list(
        &mut self,
        _schema: &SchemaRef,
        consumer: ListConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let Value::Array(values) = self.value else {
            return Err(self.mismatch("array"));
        };
        for value in values {
            consumer(&mut JsonDeserializer::new(value))?;
        }
        Ok(())
    }

    fn read_map(
        &mut self,
        _schema: &SchemaRef,
        consumer: MapConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let Value::Object(map) = self.value else {
            return Err(self.mismatch("object"));
        };
        for (key, value) in map {
            consumer(key, &mut JsonDeserializer::new(value))?;
        }
        Ok(())
    }

    fn read_boolean(&mut self, _schema: &SchemaRef) -> Result<bool, SerdeError> {
        self.value.as_bool().ok_or_else(|| self.mismatch("boolean"))
    }

    fn read_long(&mut self, _schema: &SchemaRef) -> Result<i64, SerdeError> {
        self.value.as_i64().ok_or_else(|| self.mismatch("integer"))
    }

    fn read_double(&mut self, _schema: &SchemaRef) -> Result<f64, SerdeError> {
        if let Some(value) = self.value.as_f64() {
            return Ok(value);
        }
        // Non-finite floats arrive as strings.
        match self.value.as_str() {
            Some("NaN") => Ok(f64::NAN),
            Some("Infinity") => Ok(f64::INFINITY),
            Some("-Infinity") => Ok(f64::NEG_INFINITY),
            _ => Err(self.mismatch("number")),
        }
    }

    fn read_big_integer(&mut self, _schema: &SchemaRef) -> Result<BigInt, SerdeError> {
        if let Some(value) = self.value.as_i64() {
            return Ok(BigInt::from(value));
        }
        match self.value {
            Value::Number(number) => number
                .to_string()
                .parse()
                .map_err(|_| self.mismatch("integer")),
            _ => Err(self.mismatch("integer")),
        }
    }

    fn read_big_decimal(&mut self, _schema: &SchemaRef) -> Result<BigDecimal, SerdeError> {
        match self.value {
            Value::Number(number) => number
                .to_string()
                .parse()
                .map_err(|_| self.mismatch("number")),
            Value::String(value) => value.parse().map_err(|_| self.mismatch("number")),
            _ => Err(self.mismatch("number")),
        }
    }

    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        self.value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch("string"))
    }

    fn read_blob(&mut self, _schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        let encoded = self.value.as_str().ok_or_else(|| self.mismatch("string"))?;
        BASE64
            .decode(encoded)
            .map(Bytes::from)
            .map_err(|e| SerdeError::Deserialization(format!("invalid base64 blob: {e}")))
    }

    fn read_timestamp(&mut self, schema: &SchemaRef) -> Result<Timestamp, SerdeError> {
        let format = schema
            .get_trait_as::<TimestampFormatTrait>()
            .map_or(DEFAULT_TIMESTAMP_FORMAT, |t| t.format);
        match (format, self.value) {
            (TimestampFormat::EpochSeconds, Value::Number(number)) => {
                let seconds = number.as_f64().ok_or_else(|| self.mismatch("number"))?;
                format.deserialize_epoch_seconds(seconds)
            }
            (_, Value::String(value)) => format.deserialize(value),
            _ => Err(self.mismatch("timestamp")),
        }
    }

    fn read_document(&mut self, schema: &SchemaRef) -> Result<Document, SerdeError> {
        Ok(Document::new(schema.clone(), json_to_document(self.value)))
    }

    fn is_null(&mut self) -> bool {
        self.value.is_null()
    }

    fn read_null(&mut self) -> Result<(), SerdeError> {
        if self.value.is_null() {
            Ok(())
        } else {
            Err(self.mismatch("null"))
        }
    }
}

fn json_to_document(value: &Value) -> DocumentValue {
    match value {
        Value::Null => DocumentValue::Null,
        Value::Bool(v) => DocumentValue::Boolean(*v),
        Value::Number(number) => number.as_i64().map_or_else(
            || DocumentValue::double(number.as_f64().unwrap_or(f64::NAN)),
            DocumentValue::long,
        ),
        Value::String(v) => DocumentValue::String(v.clone()),
        Value::Array(values) => DocumentValue::List(values.iter().map(json_to_document).collect()),
        Value::Object(map) => {
            let mut result = FxIndexMap::default();
            for (key, value) in map {
                result.insert(key.clone(), json_to_document(value));
            }
            DocumentValue::Map(result)
        }
    }
}

macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        JsonDeserializer::new(&$self.root).$method($($arg),*)
    };
}

impl ShapeDeserializer for JsonRootDeserializer {
    fn read_struct(
        &mut self,
        schema: &SchemaRef,
        consumer: StructConsumer<'_>,
    ) -> Result<(), SerdeError> {
        delegate!(self, read_struct, schema, consumer)
    }

    fn read_list(
        &mut self,
        schema: &SchemaRef,
        consumer: ListConsumer<'_>,
    ) -> Result<(), SerdeError> {
        delegate!(self, read_list, schema, consumer)
    }

    fn read_map(
        &mut self,
        schema: &SchemaRef,
        consumer: MapConsumer<'_>,
    ) -> Result<(), SerdeError> {
        delegate!(self, read_map, schema, consumer)
    }

    fn read_boolean(&mut self, schema: &SchemaRef) -> Result<bool, SerdeError> {
        delegate!(self, read_boolean, schema)
    }

    fn read_long(&mut self, schema: &SchemaRef) -> Result<i64, SerdeError> {
        delegate!(self, read_long, schema)
    }

    fn read_double(&mut self, schema: &SchemaRef) -> Result<f64, SerdeError> {
        delegate!(self, read_double, schema)
    }

    fn read_big_integer(&mut self, schema: &SchemaRef) -> Result<BigInt, SerdeError> {
        delegate!(self, read_big_integer, schema)
    }

    fn read_big_decimal(&mut self, schema: &SchemaRef) -> Result<BigDecimal, SerdeError> {
        delegate!(self, read_big_decimal, schema)
    }

    fn read_string(&mut self, schema: &SchemaRef) -> Result<String, SerdeError> {
        delegate!(self, read_string, schema)
    }

    fn read_blob(&mut self, schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        delegate!(self, read_blob, schema)
    }

    fn read_timestamp(&mut self, schema: &SchemaRef) -> Result<Timestamp, SerdeError> {
        delegate!(self, read_timestamp, schema)
    }

    fn read_document(&mut self, schema: &SchemaRef) -> Result<Document, SerdeError> {
        delegate!(self, read_document, schema)
    }

    fn is_null(&mut self) -> bool {
        self.root.is_null()
    }

    fn read_null(&mut self) -> Result<(), SerdeError> {
        delegate!(self, read_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_rt_core::schema::Schema;
    use smithy_rt_core::schema::prelude::{INTEGER, STRING};
    use smithy_rt_core::traits;

    #[test]
    fn reads_struct_members_by_index() {
        let schema = Schema::structure_builder("test#Shape", traits![])
            .put_member("name", &STRING, traits![])
            .put_member("age", &INTEGER, traits![JsonNameTrait::new("years")])
            .build();
        let mut deserializer =
            JsonRootDeserializer::parse(br#"{"name":"Pat","years":27,"unknown":true}"#).unwrap();

        let mut name = None;
        let mut age = None;
        deserializer
            .read_struct(&schema, &mut |member, de| {
                match member.expect_member_index()? {
                    0 => name = Some(de.read_string(member)?),
                    1 => age = Some(de.read_integer(member)?),
                    _ => {}
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(name.as_deref(), Some("Pat"));
        assert_eq!(age, Some(27));
    }

    #[test]
    fn reads_non_finite_floats() {
        let mut deserializer = JsonRootDeserializer::parse(br#""NaN""#).unwrap();
        assert!(deserializer.read_double(&INTEGER).unwrap().is_nan());
    }

    #[test]
    fn null_detection() {
        let mut deserializer = JsonRootDeserializer::parse(b"null").unwrap();
        assert!(deserializer.is_null());
        deserializer.read_null().unwrap();
    }
}

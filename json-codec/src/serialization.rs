//! Incremental JSON serialization driven by schemas.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use smithy_rt_core::schema::{
    Document, DocumentValue, JsonNameTrait, NumberFloat, NumberInteger, NumberValue, SchemaRef,
    TimestampFormatTrait,
};
use smithy_rt_core::serde::{
    InterceptingSerializer, MapScopeWriter, MapSerializer, ScopeWriter, SerializerInterceptor,
    ShapeSerializer, ValueWriter,
};
use smithy_rt_core::types::TimestampFormat;
use smithy_rt_core::{BigDecimal, BigInt, Bytes, SerdeError, Timestamp};

/// The default timestamp format for JSON protocols.
pub(crate) const DEFAULT_TIMESTAMP_FORMAT: TimestampFormat = TimestampFormat::EpochSeconds;

/// A [`ShapeSerializer`] writing JSON incrementally into a byte sink.
pub struct JsonSerializer<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> JsonSerializer<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        JsonSerializer { out }
    }
}

impl ShapeSerializer for JsonSerializer<'_> {
    fn write_struct(
        &mut self,
        _schema: &SchemaRef,
        members: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.out.push(b'{');
        let mut member_serializer = InterceptingSerializer::new(JsonMemberSerializer {
            inner: JsonSerializer { out: &mut *self.out },
            first: true,
        });
        members(&mut member_serializer)?;
        self.out.push(b'}');
        Ok(())
    }

    fn write_list(
        &mut self,
        _schema: &SchemaRef,
        _size: usize,
        elements: ScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.out.push(b'[');
        let mut element_serializer = InterceptingSerializer::new(JsonElementSerializer {
            inner: JsonSerializer { out: &mut *self.out },
            first: true,
        });
        elements(&mut element_serializer)?;
        self.out.push(b']');
        Ok(())
    }

    fn write_map(
        &mut self,
        _schema: &SchemaRef,
        _size: usize,
        entries: MapScopeWriter<'_>,
    ) -> Result<(), SerdeError> {
        self.out.push(b'{');
        let mut entry_serializer = JsonMapSerializer {
            out: &mut *self.out,
            first: true,
        };
        entries(&mut entry_serializer)?;
        self.out.push(b'}');
        Ok(())
    }

    fn write_null(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        self.out.extend_from_slice(b"null");
        Ok(())
    }

    fn write_boolean(&mut self, _schema: &SchemaRef, value: bool) -> Result<(), SerdeError> {
        self.out
            .extend_from_slice(if value { b"true".as_slice() } else { b"false" });
        Ok(())
    }

    fn write_long(&mut self, _schema: &SchemaRef, value: i64) -> Result<(), SerdeError> {
        self.out
            .extend_from_slice(itoa::Buffer::new().format(value).as_bytes());
        Ok(())
    }

    fn write_double(&mut self, _schema: &SchemaRef, value: f64) -> Result<(), SerdeError> {
        // Non-finite floats have no JSON number form; they are carried as
        // the strings used by AWS JSON protocols.
        if value.is_nan() {
            write_json_string(self.out, "NaN");
        } else if value.is_infinite() {
            write_json_string(self.out, if value > 0.0 { "Infinity" } else { "-Infinity" });
        } else {
            self.out
                .extend_from_slice(ryu::Buffer::new().format(value).as_bytes());
        }
        Ok(())
    }

    fn write_big_integer(&mut self, _schema: &SchemaRef, value: &BigInt) -> Result<(), SerdeError> {
        self.out.extend_from_slice(value.to_string().as_bytes());
        Ok(())
    }

    fn write_big_decimal(
        &mut self,
        _schema: &SchemaRef,
        value: &BigDecimal,
    ) -> Result<(), SerdeError> {
        self.out.extend_from_slice(value.to_string().as_bytes());
        Ok(())
    }

    fn write_string(&mut self, _schema: &SchemaRef, value: &str) -> Result<(), SerdeError> {
        write_json_string(self.out, value);
        Ok(())
    }

    fn write_blob(&mut self, _schema: &SchemaRef, value: &Bytes) -> Result<(), SerdeError> {
        write_json_string(self.out, &BASE64.encode(value));
        Ok(())
    }

    fn write_timestamp(&mut self, schema: &SchemaRef, value: &Timestamp) -> Result<(), SerdeError> {
        let format = schema
            .get_trait_as::<TimestampFormatTrait>()
            .map_or(DEFAULT_TIMESTAMP_FORMAT, |t| t.format);
        match format {
            TimestampFormat::EpochSeconds => self
                .out
                .extend_from_slice(format.serialize(value).as_bytes()),
            _ => write_json_string(self.out, &format.serialize(value)),
        }
        Ok(())
    }

    fn write_document(&mut self, _schema: &SchemaRef, value: &Document) -> Result<(), SerdeError> {
        write_document_value(self.out, value.value())
    }
}

/// Writes member keys and separators around member values.
struct JsonMemberSerializer<'a> {
    inner: JsonSerializer<'a>,
    first: bool,
}

impl SerializerInterceptor for JsonMemberSerializer<'_> {
    fn before(&mut self, schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        if !self.first {
            self.inner.out.push(b',');
        }
        self.first = false;
        let name = match schema.get_trait_as::<JsonNameTrait>() {
            Some(json_name) => json_name.name(),
            None => schema.expect_member_name()?,
        };
        write_json_string(self.inner.out, name);
        self.inner.out.push(b':');
        Ok(&mut self.inner)
    }

    fn after(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        Ok(())
    }
}

/// Writes separators between list elements.
struct JsonElementSerializer<'a> {
    inner: JsonSerializer<'a>,
    first: bool,
}

impl SerializerInterceptor for JsonElementSerializer<'_> {
    fn before(&mut self, _schema: &SchemaRef) -> Result<&mut dyn ShapeSerializer, SerdeError> {
        if !self.first {
            self.inner.out.push(b',');
        }
        self.first = false;
        Ok(&mut self.inner)
    }

    fn after(&mut self, _schema: &SchemaRef) -> Result<(), SerdeError> {
        Ok(())
    }
}

/// Writes map entries as JSON object members.
struct JsonMapSerializer<'a> {
    out: &'a mut Vec<u8>,
    first: bool,
}

impl MapSerializer for JsonMapSerializer<'_> {
    fn entry(&mut self, key: &str, value: ValueWriter<'_>) -> Result<(), SerdeError> {
        if !self.first {
            self.out.push(b',');
        }
        self.first = false;
        write_json_string(self.out, key);
        self.out.push(b':');
        value(&mut JsonSerializer { out: &mut *self.out })
    }
}

/// Write an untyped document value as raw JSON.
fn write_document_value(out: &mut Vec<u8>, value: &DocumentValue) -> Result<(), SerdeError> {
    match value {
        DocumentValue::Null => out.extend_from_slice(b"null"),
        DocumentValue::Boolean(v) => {
            out.extend_from_slice(if *v { b"true".as_slice() } else { b"false" })
        }
        DocumentValue::String(v) => write_json_string(out, v),
        DocumentValue::Blob(v) => write_json_string(out, &BASE64.encode(v)),
        DocumentValue::Timestamp(v) => {
            out.extend_from_slice(DEFAULT_TIMESTAMP_FORMAT.serialize(v).as_bytes())
        }
        DocumentValue::Number(NumberValue::Integer(ni)) => match ni {
            NumberInteger::Byte(v) => out.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes()),
            NumberInteger::Short(v) => {
                out.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes())
            }
            NumberInteger::Integer(v) => {
                out.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes())
            }
            NumberInteger::Long(v) => {
                out.extend_from_slice(itoa::Buffer::new().format(*v).as_bytes())
            }
            NumberInteger::BigInt(v) => out.extend_from_slice(v.to_string().as_bytes()),
        },
        DocumentValue::Number(NumberValue::Float(nf)) => match nf {
            NumberFloat::Float(v) => {
                out.extend_from_slice(ryu::Buffer::new().format(f64::from(*v)).as_bytes())
            }
            NumberFloat::Double(v) => {
                out.extend_from_slice(ryu::Buffer::new().format(*v).as_bytes())
            }
            NumberFloat::BigDecimal(v) => out.extend_from_slice(v.to_string().as_bytes()),
        },
        DocumentValue::List(values) => {
            out.push(b'[');
            for (idx, element) in values.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_document_value(out, element)?;
            }
            out.push(b']');
        }
        DocumentValue::Map(map) => {
            out.push(b'{');
            for (idx, (key, element)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_json_string(out, key);
                out.push(b':');
                write_document_value(out, element)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Write a JSON string literal with escaping.
fn write_json_string(out: &mut Vec<u8>, value: &str) {
    out.push(b'"');
    for ch in value.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            ch if (ch as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", ch as u32).as_bytes());
            }
            ch => {
                let mut buffer = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
            }
        }
    }
    out.push(b'"');
}

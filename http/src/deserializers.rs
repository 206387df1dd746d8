//! Binds HTTP responses back onto deserializable shapes.
//!
//! The mirror of the request serializer: status, headers, and prefix
//! header groups are delivered first, then the remaining members are read
//! from the structured body through the payload codec, or from the raw
//! payload member directly.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

use smithy_rt_core::codecs::Codec;
use smithy_rt_core::schema::{
    HttpHeaderTrait, HttpPayloadTrait, HttpPrefixHeadersTrait, HttpResponseCodeTrait, SchemaRef,
    ShapeType, StreamingTrait, TimestampFormatTrait,
};
use smithy_rt_core::serde::{ListConsumer, MapConsumer, ShapeDeserializer, StructConsumer};
use smithy_rt_core::transport::{Body, Response};
use smithy_rt_core::types::TimestampFormat;
use smithy_rt_core::{BigDecimal, BigInt, SerdeError, Timestamp};

use crate::utils::split_header;

/// Binds an HTTP response to a deserializable shape.
pub struct HttpResponseDeserializer<'a> {
    payload_codec: &'a dyn Codec,
    response: &'a mut Response,
    /// The collected body for structured or raw reads. `None` when the
    /// body is left streaming for a streaming payload member.
    body: Option<Bytes>,
}

impl<'a> HttpResponseDeserializer<'a> {
    pub fn new(
        payload_codec: &'a dyn Codec,
        response: &'a mut Response,
        body: Option<Bytes>,
    ) -> Self {
        HttpResponseDeserializer {
            payload_codec,
            response,
            body,
        }
    }
}

impl ShapeDeserializer for HttpResponseDeserializer<'_> {
    fn read_struct(
        &mut self,
        schema: &SchemaRef,
        consumer: StructConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let mut has_body_members = false;

        for member in schema.members().values() {
            if let Some(header_trait) = member.get_trait_as::<HttpHeaderTrait>() {
                if let Some(field) = self.response.fields.get(&header_trait.key) {
                    let mut deserializer = HeaderDeserializer {
                        value: field.as_string(),
                    };
                    consumer(member, &mut deserializer)?;
                }
            } else if let Some(prefix_trait) = member.get_trait_as::<HttpPrefixHeadersTrait>() {
                let mut deserializer = PrefixHeadersDeserializer {
                    prefix: prefix_trait.prefix.clone(),
                    entries: self
                        .response
                        .fields
                        .iter()
                        .filter(|field| {
                            field.name().len() >= prefix_trait.prefix.len()
                                && field.name()[..prefix_trait.prefix.len()]
                                    .eq_ignore_ascii_case(&prefix_trait.prefix)
                        })
                        .map(|field| {
                            (
                                field.name()[prefix_trait.prefix.len()..].to_string(),
                                field.as_string(),
                            )
                        })
                        .collect(),
                };
                consumer(member, &mut deserializer)?;
            } else if member.contains_type::<HttpResponseCodeTrait>() {
                let mut deserializer = ResponseCodeDeserializer {
                    status: self.response.status,
                };
                consumer(member, &mut deserializer)?;
            } else if member.contains_type::<HttpPayloadTrait>() {
                if member.contains_type::<StreamingTrait>()
                    && member.shape_type() == &ShapeType::Blob
                {
                    let mut deserializer = StreamingPayloadDeserializer {
                        body: Some(std::mem::take(&mut self.response.body)),
                    };
                    consumer(member, &mut deserializer)?;
                } else if matches!(member.shape_type(), ShapeType::Blob | ShapeType::String) {
                    let mut deserializer = RawPayloadDeserializer {
                        body: self.body.clone().unwrap_or_default(),
                    };
                    consumer(member, &mut deserializer)?;
                } else {
                    let body = self.body.clone().unwrap_or_default();
                    if !body.is_empty() {
                        let mut deserializer = self.payload_codec.create_deserializer(&body)?;
                        consumer(member, deserializer.as_mut())?;
                    }
                }
            } else {
                has_body_members = true;
            }
        }

        // The remaining members live in the structured body; delegate the
        // whole struct read to the payload codec, which skips the members
        // already delivered above.
        if has_body_members {
            let body = self.body.clone().unwrap_or_default();
            if !body.is_empty() {
                let mut deserializer = self.payload_codec.create_deserializer(&body)?;
                deserializer.read_struct(schema, consumer)?;
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &'static str) -> Result<T, SerdeError> {
    value
        .trim()
        .parse()
        .map_err(|_| SerdeError::Deserialization(format!("invalid {what}: `{value}`")))
}

/// Reads a single header value as any scalar type.
struct HeaderDeserializer {
    value: String,
}

impl ShapeDeserializer for HeaderDeserializer {
    fn read_list(
        &mut self,
        schema: &SchemaRef,
        consumer: ListConsumer<'_>,
    ) -> Result<(), SerdeError> {
        let handle_dates = schema
            .get_member("member")
            .is_some_and(|member| {
                member.shape_type() == &ShapeType::Timestamp
                    && member
                        .get_trait_as::<TimestampFormatTrait>()
                        .is_none_or(|t| t.format == TimestampFormat::HttpDate)
            });
        for element in split_header(&self.value, handle_dates)? {
            let mut deserializer = HeaderDeserializer { value: element };
            consumer(&mut deserializer)?;
        }
        Ok(())
    }

    fn read_boolean(&mut self, _schema: &SchemaRef) -> Result<bool, SerdeError> {
        match self.value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(SerdeError::Deserialization(format!(
                "invalid boolean header: `{other}`"
            ))),
        }
    }

    fn read_long(&mut self, _schema: &SchemaRef) -> Result<i64, SerdeError> {
        parse_number(&self.value, "integer header")
    }

    fn read_double(&mut self, _schema: &SchemaRef) -> Result<f64, SerdeError> {
        parse_number(&self.value, "float header")
    }

    fn read_big_integer(&mut self, _schema: &SchemaRef) -> Result<BigInt, SerdeError> {
        parse_number(&self.value, "big integer header")
    }

    fn read_big_decimal(&mut self, _schema: &SchemaRef) -> Result<BigDecimal, SerdeError> {
        parse_number(&self.value, "big decimal header")
    }

    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        Ok(self.value.clone())
    }

    fn read_blob(&mut self, _schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        BASE64
            .decode(self.value.trim())
            .map(Bytes::from)
            .map_err(|e| SerdeError::Deserialization(format!("invalid base64 header: {e}")))
    }

    fn read_timestamp(&mut self, schema: &SchemaRef) -> Result<Timestamp, SerdeError> {
        let format = schema
            .get_trait_as::<TimestampFormatTrait>()
            .map_or(TimestampFormat::HttpDate, |t| t.format);
        format.deserialize(self.value.trim())
    }
}

/// Reads a prefix-header group as a string map.
struct PrefixHeadersDeserializer {
    prefix: String,
    entries: Vec<(String, String)>,
}

impl ShapeDeserializer for PrefixHeadersDeserializer {
    fn read_map(
        &mut self,
        _schema: &SchemaRef,
        consumer: MapConsumer<'_>,
    ) -> Result<(), SerdeError> {
        for (key, value) in &self.entries {
            let mut deserializer = HeaderDeserializer {
                value: value.clone(),
            };
            consumer(key, &mut deserializer)?;
        }
        Ok(())
    }

    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        Err(SerdeError::expectation(format!(
            "prefix headers `{}` bind to a map",
            self.prefix
        )))
    }
}

/// Reads the response status code into the bound member.
struct ResponseCodeDeserializer {
    status: u16,
}

impl ShapeDeserializer for ResponseCodeDeserializer {
    fn read_long(&mut self, _schema: &SchemaRef) -> Result<i64, SerdeError> {
        Ok(i64::from(self.status))
    }
}

/// Reads the collected body as a raw string or blob payload.
struct RawPayloadDeserializer {
    body: Bytes,
}

impl ShapeDeserializer for RawPayloadDeserializer {
    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| SerdeError::Deserialization(format!("payload is not valid UTF-8: {e}")))
    }

    fn read_blob(&mut self, _schema: &SchemaRef) -> Result<Bytes, SerdeError> {
        Ok(self.body.clone())
    }
}

/// Hands the (still streaming) response body to a streaming payload member.
struct StreamingPayloadDeserializer {
    body: Option<Body>,
}

impl ShapeDeserializer for StreamingPayloadDeserializer {
    fn read_data_stream(&mut self, _schema: &SchemaRef) -> Result<Body, SerdeError> {
        self.body
            .take()
            .ok_or_else(|| SerdeError::expectation("streaming payload was already consumed"))
    }
}

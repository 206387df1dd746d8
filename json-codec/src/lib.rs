//! JSON payload codec for smithy-rt.
//!
//! Implements the core [`Codec`] contract for `application/json`: an
//! incremental schema-driven writer and a value-tree reader.

mod deserialization;
mod serialization;

pub use deserialization::{JsonDeserializer, JsonRootDeserializer};
pub use serialization::JsonSerializer;

use smithy_rt_core::SerdeError;
use smithy_rt_core::codecs::Codec;
use smithy_rt_core::serde::{ShapeDeserializer, ShapeSerializer};

/// The `application/json` payload codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn create_serializer<'a>(&self, sink: &'a mut Vec<u8>) -> Box<dyn ShapeSerializer + 'a> {
        Box::new(JsonSerializer::new(sink))
    }

    fn create_deserializer<'a>(
        &self,
        source: &'a [u8],
    ) -> Result<Box<dyn ShapeDeserializer + 'a>, SerdeError> {
        Ok(Box::new(JsonRootDeserializer::parse(source)?))
    }
}

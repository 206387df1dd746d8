//! The payload codec contract consumed by binding layers.

use crate::SerdeError;
use crate::serde::{ShapeDeserializer, ShapeSerializer};

/// A payload format, such as JSON or CBOR.
///
/// The core does not ship codec implementations; a binding layer consumes
/// any codec satisfying this contract to serialize structured payloads.
pub trait Codec: Send + Sync {
    /// The media type produced and consumed by this codec.
    fn media_type(&self) -> &'static str;

    /// Create a serializer writing the codec's format into `sink`.
    fn create_serializer<'a>(&self, sink: &'a mut Vec<u8>) -> Box<dyn ShapeSerializer + 'a>;

    /// Create a deserializer reading the codec's format from `source`.
    fn create_deserializer<'a>(
        &self,
        source: &'a [u8],
    ) -> Result<Box<dyn ShapeDeserializer + 'a>, SerdeError>;
}

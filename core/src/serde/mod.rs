//! Schema-driven serialization and deserialization visitors.

pub mod deserializers;
pub use deserializers::*;

mod documents;
pub use documents::{DocumentDeserializer, DocumentSerializer};

pub mod serializers;
pub use serializers::*;

pub use deserializers as de;
pub use serializers as se;

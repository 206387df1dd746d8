//! Runtime schemas describing generated Smithy shapes.

/// Core Smithy shape and trait definitions
pub mod prelude;

mod traits;
pub use traits::*;

pub mod documents;
pub use documents::{Document, DocumentValue, NumberFloat, NumberInteger, NumberValue};

mod shapes;
pub use shapes::*;

mod schemas;
pub use schemas::*;

mod operations;
pub use operations::*;

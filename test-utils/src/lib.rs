//! Test utilities and common test schemas + shapes.
//!
//! The shapes here are written long-hand in the style code generation
//! produces: schema statics, plain structs, and serialize/deserialize
//! implementations that dispatch on member indexes.

mod chat;
mod weather;

pub use chat::*;
pub use weather::*;

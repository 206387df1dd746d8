//! HTTP binding support for smithy-rt.
//!
//! Projects shape members onto HTTP headers, query params, path labels,
//! host prefixes, status codes, and payloads, and glues the result onto
//! the core request pipeline as a [`protocol::HttpBindingProtocol`].

pub mod apikey;
pub mod deserializers;
pub mod events;
pub mod pattern;
pub mod protocol;
pub mod serializers;
pub mod utils;

pub use pattern::PathPattern;
pub use protocol::HttpBindingProtocol;

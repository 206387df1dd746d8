//! Core runtime for Smithy-modeled service clients.
//!
//! This crate contains the protocol-agnostic machinery that generated
//! clients plug into: runtime [`schema`]s describing every shape in the
//! Smithy data model, the [`serde`] visitor traits driven by those
//! schemas, protocol-agnostic [`schema::documents`], transport-agnostic
//! request/response types, and the [`client`] request pipeline with its
//! interceptor, retry, auth, and endpoint machinery.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

mod error;
mod macros;

pub mod auth;
pub mod client;
pub mod codecs;
pub mod endpoints;
pub mod eventstream;
pub mod identity;
pub mod interceptors;
pub mod retries;
pub mod schema;
pub mod serde;
pub mod transport;
pub mod types;
pub mod utils;

pub use error::{ClientError, ErrorFault, SerdeError, ServiceError, TransportErrorKind};

// Re-export
pub use bigdecimal::BigDecimal;
pub use bytes::Bytes;
pub use indexmap::IndexMap as OrderedMap;
pub use num_bigint::BigInt;

/// Cheaply cloneable shared reference used throughout the runtime.
pub type Ref<T> = Arc<T>;

/// UTC timestamp type used by the Smithy data model.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Insertion-ordered map with a fast, non-cryptographic hasher.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Insertion-ordered set with a fast, non-cryptographic hasher.
pub type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

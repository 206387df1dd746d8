//! AWS Signature Version 4 signing.
//!
//! Implements canonical request construction, the derived-key HMAC chain,
//! the request signer, and the chained event-stream signer, plus the auth
//! scheme that wires them into the request pipeline.

mod canonical;
mod events;
mod identity;
mod scheme;
mod signer;

pub use canonical::{EMPTY_SHA256_HASH, UNSIGNED_PAYLOAD, remove_dot_segments};
pub use events::{EncodeEventHeaders, EventHeader, EventHeaderValue, EventMessage, EventSigner};
pub use identity::AwsCredentialsIdentity;
pub use scheme::{EVENT_SIGNER, SIGNING_PROPERTIES, SIGV4_SCHEME_ID, SigV4AuthScheme};
pub use signer::{SigV4Signer, SigV4SigningProperties, SignedRequest, SigningError};

//! Transport-agnostic request and response types.
//!
//! The core depends only on a transport's `send(request) -> response`
//! contract; the types here are the messages that flow across that seam.

mod body;
pub use body::*;

mod fields;
pub use fields::*;

mod uri;
pub use uri::*;

use crate::types::TypedProperties;

/// A transport request bound for an [`Endpoint`].
#[derive(Debug)]
pub struct Request {
    pub destination: Uri,
    pub method: String,
    pub fields: Fields,
    pub body: Body,
}

impl Request {
    pub fn new(method: impl Into<String>, destination: Uri) -> Self {
        Request {
            destination,
            method: method.into(),
            fields: Fields::new(),
            body: Body::empty(),
        }
    }

    /// Clone the request for retry isolation.
    ///
    /// Fields and the destination are cheap copies; returns `None` when the
    /// body is streaming and cannot be duplicated.
    #[must_use]
    pub fn try_clone(&self) -> Option<Request> {
        Some(Request {
            destination: self.destination.clone(),
            method: self.method.clone(),
            fields: self.fields.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Clone everything but the body.
    #[must_use]
    pub fn clone_without_body(&self) -> Request {
        Request {
            destination: self.destination.clone(),
            method: self.method.clone(),
            fields: self.fields.clone(),
            body: Body::empty(),
        }
    }
}

/// A transport response.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub fields: Fields,
    pub body: Body,
    pub reason: Option<String>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            fields: Fields::new(),
            body: Body::empty(),
            reason: None,
        }
    }
}

/// A resolved service endpoint.
///
/// Properties may carry transport hints such as extra headers or auth
/// scope overrides.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub uri: Uri,
    pub properties: TypedProperties,
}

impl Endpoint {
    pub fn new(uri: Uri) -> Self {
        Endpoint {
            uri,
            properties: TypedProperties::new(),
        }
    }
}

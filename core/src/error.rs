use std::time::Duration;

use thiserror::Error;

use crate::schema::{Schema, ShapeId};

/// Errors raised while serializing or deserializing shapes.
#[derive(Error, Debug)]
pub enum SerdeError {
    #[error("failed to serialize shape: {0}")]
    Serialization(String),
    #[error("failed to deserialize shape: {0}")]
    Deserialization(String),
    #[error("expectation not met: {0}")]
    ExpectationNotMet(String),
    #[error("schema `{schema}` is not supported by `{operation}`")]
    UnexpectedSchema {
        schema: ShapeId,
        operation: &'static str,
    },
    #[error("data streaming is not supported by this serializer")]
    UnsupportedStream,
}

impl SerdeError {
    /// Error for a write or read driven by a schema the sink cannot handle.
    pub fn unexpected(schema: &Schema, operation: &'static str) -> Self {
        SerdeError::UnexpectedSchema {
            schema: schema.id().clone(),
            operation,
        }
    }

    pub fn expectation(message: impl Into<String>) -> Self {
        SerdeError::ExpectationNotMet(message.into())
    }
}

/// Fault attribution for errors returned by a service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFault {
    Client,
    Server,
    Unknown,
}

/// Classification of transport-level failures used by retry strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection resets, timeouts, and other transient conditions.
    Transient,
    /// The service asked the client to slow down.
    Throttling,
    /// The service failed to handle an otherwise valid request.
    ServerError,
    /// The request was rejected and will not succeed if repeated.
    ClientError,
}

/// A modeled error shape returned by a service.
///
/// Generated error types implement this trait so the pipeline can surface
/// them as typed errors and feed their retry metadata to the retry
/// strategy.
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    /// The shape ID of the modeled error.
    fn shape_id(&self) -> &ShapeId;

    /// Whether the service or the caller is at fault.
    fn fault(&self) -> ErrorFault;

    /// True if retrying the operation cannot cause duplicated side effects.
    fn is_retry_safe(&self) -> bool {
        false
    }

    /// Service-provided hint for how long to wait before retrying.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Errors surfaced by the request pipeline.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Serde(#[from] SerdeError),
    #[error("failed to resolve an endpoint: {0}")]
    EndpointResolution(String),
    #[error("failed to resolve an identity: {0}")]
    Identity(String),
    #[error("failed to sign the request: {0}")]
    Auth(String),
    #[error("transport failure ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
        is_timeout: bool,
        retry_after: Option<Duration>,
    },
    /// A modeled error found in the operation's error registry.
    #[error("{0}")]
    Modeled(Box<dyn ServiceError>),
    /// An error response that did not match any modeled error.
    #[error("service returned error `{code}` ({fault:?}): {message}")]
    Call {
        fault: ErrorFault,
        code: String,
        message: String,
    },
    #[error("no further retry attempts allowed: {message}")]
    Retry { message: String },
    #[error("invalid client configuration: {0}")]
    Config(String),
    #[error("interceptor failed: {0}")]
    Interceptor(String),
    /// A background pipeline task died before producing a response.
    #[error("execution interrupted: {0}")]
    Interrupted(String),
}

impl ClientError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        ClientError::Transport {
            kind,
            message: message.into(),
            is_timeout: false,
            retry_after: None,
        }
    }

    /// True if the retry strategy may attempt the call again.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            ClientError::Transport { kind, .. } => matches!(
                kind,
                TransportErrorKind::Transient | TransportErrorKind::Throttling
            ),
            ClientError::Modeled(err) => err.is_retry_safe(),
            _ => false,
        }
    }

    /// Service-provided hint overriding the computed backoff delay.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::Transport { retry_after, .. } => *retry_after,
            ClientError::Modeled(err) => err.retry_after(),
            _ => None,
        }
    }

    /// True if the failure was a timeout, which consumes more retry quota.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport { is_timeout: true, .. })
    }

    pub fn fault(&self) -> ErrorFault {
        match self {
            ClientError::Transport { kind, .. } => match kind {
                TransportErrorKind::ClientError => ErrorFault::Client,
                TransportErrorKind::ServerError => ErrorFault::Server,
                _ => ErrorFault::Unknown,
            },
            ClientError::Modeled(err) => err.fault(),
            ClientError::Call { fault, .. } => *fault,
            ClientError::Serde(_)
            | ClientError::EndpointResolution(_)
            | ClientError::Identity(_)
            | ClientError::Auth(_)
            | ClientError::Config(_) => ErrorFault::Client,
            _ => ErrorFault::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_retry_classification() {
        let transient = ClientError::transport(TransportErrorKind::Transient, "reset");
        assert!(transient.is_retry_safe());
        let throttle = ClientError::transport(TransportErrorKind::Throttling, "slow down");
        assert!(throttle.is_retry_safe());
        let client = ClientError::transport(TransportErrorKind::ClientError, "bad request");
        assert!(!client.is_retry_safe());
        assert_eq!(client.fault(), ErrorFault::Client);
    }

    #[test]
    fn retry_after_hint() {
        let err = ClientError::Transport {
            kind: TransportErrorKind::Throttling,
            message: "slow down".into(),
            is_timeout: false,
            retry_after: Some(Duration::from_millis(250)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_millis(250)));
    }
}

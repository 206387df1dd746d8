use std::fmt::{self, Debug, Formatter};
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Boxed byte stream used for streaming message bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + Sync>>;

/// The body of a transport request or response.
///
/// Bodies are either absent, fully buffered bytes, or a byte stream read by
/// the transport. In-memory bodies can be re-read freely; streaming bodies
/// are consumed once and are replaced with a buffered body when a consumer
/// (such as a payload-signing signer) must materialize them.
#[derive(Default)]
pub enum Body {
    #[default]
    None,
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Body {
    #[must_use]
    pub fn empty() -> Self {
        Body::None
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + Sync + 'static,
    {
        Body::Stream(Box::pin(stream))
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// The buffered contents, if the body is in memory.
    #[must_use]
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Cheap clone for in-memory bodies. Streaming bodies cannot be cloned.
    #[must_use]
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Body::None => Some(Body::None),
            Body::Bytes(bytes) => Some(Body::Bytes(bytes.clone())),
            Body::Stream(_) => None,
        }
    }

    /// Read the entire body into memory.
    ///
    /// Streaming bodies are drained into a buffer and the body is replaced
    /// with the buffered form, so later readers observe the same content.
    pub async fn collect(&mut self) -> Result<Bytes, io::Error> {
        match self {
            Body::None => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes.clone()),
            Body::Stream(stream) => {
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                let bytes = buffer.freeze();
                *self = Body::Bytes(bytes.clone());
                Ok(bytes)
            }
        }
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Body::None => write!(f, "Body::None"),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream(_) => write!(f, "Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Body::Bytes(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(value))
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(value.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_buffers_streams_once() {
        let chunks = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let mut body = Body::from_stream(futures::stream::iter(chunks));
        assert!(body.is_streaming());

        let bytes = body.collect().await.unwrap();
        assert_eq!(&bytes[..], b"hello world");

        // The stream was drained into a buffer and replaced.
        assert!(!body.is_streaming());
        let again = body.collect().await.unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn streaming_bodies_cannot_be_cloned() {
        let body = Body::from_stream(futures::stream::empty());
        assert!(body.try_clone().is_none());
        assert!(Body::from("abc").try_clone().is_some());
    }
}

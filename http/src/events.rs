//! Event-stream plumbing over transport message bodies.
//!
//! The frame byte format is owned by an external event codec; these types
//! carry codec-produced frames across a channel-backed request body and
//! pull frames back out of a response body.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use smithy_rt_core::codecs::Codec;
use smithy_rt_core::eventstream::{EventPublisher, EventReceiver};
use smithy_rt_core::serde::{DeserializeShape, SerializeShape};
use smithy_rt_core::transport::Body;
use smithy_rt_core::types::{PropertyKey, TypedProperties};
use smithy_rt_core::{ClientError, Ref};

/// Channel chunk type carried by event-stream request bodies.
pub type BodyChunk = Result<Bytes, std::io::Error>;

/// The sending half of an event-stream request body.
///
/// The binding protocol stores this in the call context when it replaces
/// the request body with a channel-backed stream. The slot is take-once:
/// the publisher removes the sender when it is created, so the context
/// clones held by the pipeline do not keep the body stream open after the
/// publisher closes.
pub const EVENT_BODY_SENDER: PropertyKey<Mutex<Option<mpsc::Sender<BodyChunk>>>> =
    PropertyKey::new("event_body_sender");

/// Wraps codec-serialized event payloads into wire frames.
///
/// Implementations own the frame format (message type, event type, and
/// content-type headers) and may sign frames using state found in the call
/// context, such as a chained event signer.
pub trait EventFrameEncoder: Send + Sync {
    fn encode_frame(
        &self,
        payload: &[u8],
        context: &TypedProperties,
    ) -> Result<Bytes, ClientError>;
}

/// Splits complete frames off the front of a response byte stream and
/// returns their codec-encoded payloads.
pub trait EventFrameDecoder: Send + Sync {
    /// Remove and return the next complete frame payload, or `None` when
    /// the buffer does not yet hold a complete frame.
    fn decode_frame(&self, buffer: &mut BytesMut) -> Result<Option<Bytes>, ClientError>;
}

/// Publishes events by serializing them through the payload codec and
/// writing encoded frames into the request body channel.
pub struct ChannelEventPublisher<C> {
    codec: Ref<C>,
    encoder: Ref<dyn EventFrameEncoder>,
    context: TypedProperties,
    sender: Option<mpsc::Sender<BodyChunk>>,
}

impl<C: Codec> ChannelEventPublisher<C> {
    pub fn new(
        codec: Ref<C>,
        encoder: Ref<dyn EventFrameEncoder>,
        context: TypedProperties,
        sender: mpsc::Sender<BodyChunk>,
    ) -> Self {
        ChannelEventPublisher {
            codec,
            encoder,
            context,
            sender: Some(sender),
        }
    }
}

#[async_trait]
impl<E, C> EventPublisher<E> for ChannelEventPublisher<C>
where
    E: SerializeShape + Send + 'static,
    C: Codec + 'static,
{
    async fn send(&mut self, event: E) -> Result<(), ClientError> {
        let Some(sender) = &self.sender else {
            return Err(ClientError::Interrupted(
                "the event stream is closed".to_string(),
            ));
        };
        let mut payload = Vec::new();
        {
            let mut serializer = self.codec.create_serializer(&mut payload);
            event.serialize(serializer.as_mut())?;
            serializer.flush()?;
        }
        let frame = self.encoder.encode_frame(&payload, &self.context)?;
        sender
            .send(Ok(frame))
            .await
            .map_err(|_| ClientError::Interrupted("the transport closed the stream".to_string()))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        // Dropping the sender ends the body stream; closing twice is a
        // no-op.
        self.sender.take();
        Ok(())
    }
}

/// Receives events by splitting frames off the response body and
/// deserializing their payloads through the payload codec.
pub struct ChannelEventReceiver<C> {
    codec: Ref<C>,
    decoder: Ref<dyn EventFrameDecoder>,
    body: Body,
    buffer: BytesMut,
    closed: bool,
}

impl<C: Codec> ChannelEventReceiver<C> {
    pub fn new(codec: Ref<C>, decoder: Ref<dyn EventFrameDecoder>, body: Body) -> Self {
        ChannelEventReceiver {
            codec,
            decoder,
            body,
            buffer: BytesMut::new(),
            closed: false,
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        match &mut self.body {
            Body::None => Ok(None),
            Body::Bytes(bytes) => {
                let chunk = bytes.clone();
                self.body = Body::None;
                if chunk.is_empty() { Ok(None) } else { Ok(Some(chunk)) }
            }
            Body::Stream(stream) => match stream.next().await {
                Some(Ok(chunk)) => Ok(Some(chunk)),
                Some(Err(error)) => Err(ClientError::Interrupted(format!(
                    "event stream read failed: {error}"
                ))),
                None => Ok(None),
            },
        }
    }
}

#[async_trait]
impl<E, C> EventReceiver<E> for ChannelEventReceiver<C>
where
    E: DeserializeShape + Send + 'static,
    C: Codec + 'static,
{
    async fn receive(&mut self) -> Result<Option<E>, ClientError> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some(frame) = self.decoder.decode_frame(&mut self.buffer)? {
                let mut deserializer = self.codec.create_deserializer(&frame)?;
                return Ok(Some(E::deserialize(deserializer.as_mut())?));
            }
            match self.next_chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => {
                    if !self.buffer.is_empty() {
                        return Err(ClientError::Interrupted(
                            "event stream ended mid-frame".to_string(),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closed = true;
        self.body = Body::None;
        Ok(())
    }
}

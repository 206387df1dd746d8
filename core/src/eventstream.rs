//! Event stream handles returned by streaming operations.
//!
//! An event stream is a framed, in-order, optionally signed sequence of
//! messages carried in a request or response body. Streaming operations
//! return one of the wrappers here: publishers push events to the service,
//! receivers pull events from it, and duplex streams do both over the same
//! connection.

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::serde::{DeserializeShape, SerializeShape};
use crate::ClientError;

/// Sends events to the service over an open stream.
#[async_trait]
pub trait EventPublisher<E: SerializeShape + Send>: Send {
    /// Send an event to the service.
    async fn send(&mut self, event: E) -> Result<(), ClientError>;

    /// Close the stream. Closing an already-closed stream is a no-op.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Receives events from the service over an open stream.
#[async_trait]
pub trait EventReceiver<E: DeserializeShape + Send>: Send {
    /// Receive the next event, or `None` once the stream has ended.
    async fn receive(&mut self) -> Result<Option<E>, ClientError>;

    /// Close the stream. Closing an already-closed stream is a no-op.
    async fn close(&mut self) -> Result<(), ClientError>;
}

async fn join_output<T>(handle: JoinHandle<Result<T, ClientError>>) -> Result<T, ClientError> {
    handle
        .await
        .map_err(|e| ClientError::Interrupted(e.to_string()))?
}

/// An event stream that streams messages to the service.
///
/// The stream is returned as soon as the input side is ready to send
/// events, which may be before the service's initial response has been
/// received.
pub struct InputEventStream<E: SerializeShape + Send, O> {
    /// The publisher used to send events to the service.
    pub input_stream: Box<dyn EventPublisher<E>>,
    output_future: Option<JoinHandle<Result<O, ClientError>>>,
    output: Option<O>,
}

impl<E: SerializeShape + Send, O> InputEventStream<E, O> {
    pub fn new(
        input_stream: Box<dyn EventPublisher<E>>,
        output_future: JoinHandle<Result<O, ClientError>>,
    ) -> Self {
        InputEventStream {
            input_stream,
            output_future: Some(output_future),
            output: None,
        }
    }

    /// Await the operation's initial response.
    ///
    /// The response is cached, so this may be called repeatedly once it
    /// has resolved successfully.
    pub async fn await_output(&mut self) -> Result<&O, ClientError> {
        if self.output.is_none() {
            let handle = self.output_future.take().ok_or_else(|| {
                ClientError::Interrupted("initial response already failed".to_string())
            })?;
            self.output = Some(join_output(handle).await?);
        }
        Ok(self.output.as_ref().expect("output was just cached"))
    }

    /// Close the event stream.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.input_stream.close().await
    }
}

/// An event stream that streams messages from the service.
///
/// The initial response is always available before any events.
pub struct OutputEventStream<E: DeserializeShape + Send, O> {
    /// The receiver consuming events from the service.
    pub output_stream: Box<dyn EventReceiver<E>>,
    /// The service's initial response.
    pub output: O,
}

impl<E: DeserializeShape + Send, O> OutputEventStream<E, O> {
    pub fn new(output_stream: Box<dyn EventReceiver<E>>, output: O) -> Self {
        OutputEventStream {
            output_stream,
            output,
        }
    }

    /// Close the event stream.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.output_stream.close().await
    }
}

/// An event stream that both sends and receives messages.
pub struct DuplexEventStream<IE, OE, O>
where
    IE: SerializeShape + Send,
    OE: DeserializeShape + Send,
{
    /// The publisher used to send events to the service.
    pub input_stream: Box<dyn EventPublisher<IE>>,
    output_future: Option<JoinHandle<Result<(O, Box<dyn EventReceiver<OE>>), ClientError>>>,
    /// The receiver consuming events from the service.
    ///
    /// `None` until [`DuplexEventStream::await_output`] has resolved.
    pub output_stream: Option<Box<dyn EventReceiver<OE>>>,
    output: Option<O>,
}

impl<IE, OE, O> DuplexEventStream<IE, OE, O>
where
    IE: SerializeShape + Send,
    OE: DeserializeShape + Send,
{
    pub fn new(
        input_stream: Box<dyn EventPublisher<IE>>,
        output_future: JoinHandle<Result<(O, Box<dyn EventReceiver<OE>>), ClientError>>,
    ) -> Self {
        DuplexEventStream {
            input_stream,
            output_future: Some(output_future),
            output_stream: None,
            output: None,
        }
    }

    /// Await the initial response and the output stream.
    ///
    /// Both are cached on this stream once resolved; the initial response
    /// will always be available before any output events.
    pub async fn await_output(
        &mut self,
    ) -> Result<(&O, &mut Box<dyn EventReceiver<OE>>), ClientError> {
        if self.output.is_none() {
            let handle = self.output_future.take().ok_or_else(|| {
                ClientError::Interrupted("initial response already failed".to_string())
            })?;
            let (output, receiver) = join_output(handle).await?;
            self.output = Some(output);
            self.output_stream = Some(receiver);
        }
        Ok((
            self.output.as_ref().expect("output was just cached"),
            self.output_stream
                .as_mut()
                .expect("output stream was just cached"),
        ))
    }

    /// Close the event stream. This closes both directions.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.input_stream.close().await?;
        if self.output_stream.is_none() && self.output_future.is_some() {
            // Resolve the output side so it can be shut down too.
            let _ = self.await_output().await;
        }
        if let Some(receiver) = self.output_stream.as_mut() {
            receiver.close().await?;
        }
        Ok(())
    }
}

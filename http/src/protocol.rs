//! The HTTP binding client protocol.
//!
//! Glues the binding serializer and deserializer onto the pipeline's
//! [`ClientProtocol`] contract for any payload codec.

use std::sync::LazyLock;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use smithy_rt_core::client::ClientProtocol;
use smithy_rt_core::codecs::Codec;
use smithy_rt_core::eventstream::{EventPublisher, EventReceiver};
use smithy_rt_core::schema::{ApiOperation, ShapeId, ShapeType, StreamingTrait};
use smithy_rt_core::serde::{DeserializeShape, SerializeShape};
use smithy_rt_core::transport::{Body, Endpoint, Fields, Request, Response, Uri};
use smithy_rt_core::types::{PropertyKey, TypedProperties};
use smithy_rt_core::{ClientError, ErrorFault, Ref, SerdeError};

use crate::deserializers::HttpResponseDeserializer;
use crate::events::{
    ChannelEventPublisher, ChannelEventReceiver, EVENT_BODY_SENDER, EventFrameDecoder,
    EventFrameEncoder,
};
use crate::serializers::HttpRequestSerializer;

static HTTP_BINDING_PROTOCOL_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::from("smithy.protocols#httpBinding"));

/// Extra fields a resolved endpoint may ask to be merged into requests.
pub const ENDPOINT_FIELDS: PropertyKey<Fields> = PropertyKey::new("endpoint_fields");

const REST_JSON_CODE_HEADER: &str = "x-amzn-errortype";
const REST_JSON_CODE_KEYS: [&str; 2] = ["__type", "code"];
const REST_JSON_MESSAGE_KEYS: [&str; 3] = ["message", "errormessage", "error_message"];

/// Buffered frames allowed in an event-stream request body before
/// publishers are backpressured.
const EVENT_CHANNEL_DEPTH: usize = 16;

/// An HTTP client protocol over a payload codec.
pub struct HttpBindingProtocol<C> {
    codec: Ref<C>,
    frame_encoder: Option<Ref<dyn EventFrameEncoder>>,
    frame_decoder: Option<Ref<dyn EventFrameDecoder>>,
}

impl<C: Codec> HttpBindingProtocol<C> {
    pub fn new(codec: C) -> Self {
        HttpBindingProtocol {
            codec: Ref::new(codec),
            frame_encoder: None,
            frame_decoder: None,
        }
    }

    /// Attach the external event frame codec for streaming operations.
    #[must_use]
    pub fn with_event_frames(
        mut self,
        encoder: Ref<dyn EventFrameEncoder>,
        decoder: Ref<dyn EventFrameDecoder>,
    ) -> Self {
        self.frame_encoder = Some(encoder);
        self.frame_decoder = Some(decoder);
        self
    }

    /// True when the response body must stay streaming for the caller.
    fn output_is_streaming(operation: &ApiOperation) -> bool {
        if operation.output_stream_member().is_some() {
            return true;
        }
        operation.output.members().values().any(|member| {
            member.contains_type::<StreamingTrait>() && member.shape_type() == &ShapeType::Blob
        })
    }

    async fn deserialize_error(
        &self,
        operation: &ApiOperation,
        response: &mut Response,
    ) -> ClientError {
        let body = match response.body.collect().await {
            Ok(body) => body,
            Err(error) => {
                return ClientError::transport(
                    smithy_rt_core::TransportErrorKind::Transient,
                    format!("failed to read error response body: {error}"),
                );
            }
        };

        let info = parse_error_info(response, &body);
        debug!(code = info.code, "deserializing error response");

        if let Some(deserialize) = operation.error_registry.get_by_name(&info.code) {
            match self.codec.create_deserializer(&body) {
                Ok(mut deserializer) => match deserialize(deserializer.as_mut()) {
                    Ok(error) => return ClientError::Modeled(error),
                    Err(error) => return ClientError::Serde(error),
                },
                Err(error) => return ClientError::Serde(error),
            }
        }

        ClientError::Call {
            fault: fault_for_status(response.status),
            code: info.code,
            message: info.message,
        }
    }
}

impl<C: Codec + 'static> ClientProtocol for HttpBindingProtocol<C> {
    fn id(&self) -> &ShapeId {
        &HTTP_BINDING_PROTOCOL_ID
    }

    fn serialize_request(
        &self,
        operation: &ApiOperation,
        input: &dyn SerializeShape,
        _endpoint: &Uri,
        context: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        let http_trait = operation.http_trait().ok_or_else(|| {
            ClientError::Config(format!(
                "operation `{}` has no http binding",
                operation.name()
            ))
        })?;
        let mut serializer =
            HttpRequestSerializer::new(self.codec.as_ref(), http_trait, operation.endpoint_trait());
        input.serialize(&mut serializer)?;
        let mut request = serializer.result.take().ok_or_else(|| {
            ClientError::Serde(SerdeError::Serialization(
                "operation input did not serialize a structure".to_string(),
            ))
        })?;

        // Input event streams publish through a channel-backed body; the
        // sender is left in the call context for the event publisher.
        if operation.input_stream_member().is_some() {
            let (sender, mut receiver) = mpsc::channel(EVENT_CHANNEL_DEPTH);
            request.body = Body::from_stream(futures::stream::poll_fn(move |cx| {
                receiver.poll_recv(cx)
            }));
            context.insert(&EVENT_BODY_SENDER, parking_lot::Mutex::new(Some(sender)));
        }
        Ok(request)
    }

    fn set_service_endpoint(
        &self,
        mut request: Request,
        endpoint: &Endpoint,
    ) -> Result<Request, ClientError> {
        let uri = &endpoint.uri;
        // The serializer left the operation's host prefix (possibly empty)
        // in the destination host.
        let host = format!("{}{}", request.destination.host(), uri.host());
        let path = join_paths(uri.path(), request.destination.path());

        let mut builder = Uri::builder().scheme(uri.scheme()).host(host);
        if let Some(port) = uri.port() {
            builder = builder.port(port);
        }
        if let Some(path) = path {
            builder = builder.path(path);
        }
        if let Some(query) = request.destination.query() {
            builder = builder.query(query);
        }
        request.destination = builder
            .build()
            .map_err(|e| ClientError::EndpointResolution(e.to_string()))?;

        if let Some(fields) = endpoint.properties.get(&ENDPOINT_FIELDS) {
            request.fields.extend(fields.clone());
        }
        Ok(request)
    }

    async fn deserialize_response<O: DeserializeShape>(
        &self,
        operation: &ApiOperation,
        _request: &Request,
        response: &mut Response,
        _context: &mut TypedProperties,
    ) -> Result<O, ClientError> {
        if !(200..300).contains(&response.status) {
            return Err(self.deserialize_error(operation, response).await);
        }

        let body = if Self::output_is_streaming(operation) {
            None
        } else {
            Some(
                response
                    .body
                    .collect()
                    .await
                    .map_err(|e| {
                        ClientError::transport(
                            smithy_rt_core::TransportErrorKind::Transient,
                            format!("failed to read response body: {e}"),
                        )
                    })?,
            )
        };

        let mut deserializer = HttpResponseDeserializer::new(self.codec.as_ref(), response, body);
        Ok(O::deserialize(&mut deserializer)?)
    }

    fn create_event_publisher<E>(
        &self,
        _operation: &ApiOperation,
        _request: &Request,
        context: &TypedProperties,
    ) -> Result<Box<dyn EventPublisher<E>>, ClientError>
    where
        E: SerializeShape + Send + 'static,
    {
        let encoder = self.frame_encoder.clone().ok_or_else(|| {
            ClientError::Config("no event frame encoder is configured".to_string())
        })?;
        let sender = context
            .get(&EVENT_BODY_SENDER)
            .and_then(|slot| slot.lock().take())
            .ok_or_else(|| {
                ClientError::Config("the request does not carry an event stream body".to_string())
            })?;
        Ok(Box::new(ChannelEventPublisher::new(
            self.codec.clone(),
            encoder,
            context.clone(),
            sender,
        )))
    }

    fn create_event_receiver<E>(
        &self,
        _operation: &ApiOperation,
        _request: &Request,
        response: &mut Response,
        _context: &TypedProperties,
    ) -> Result<Box<dyn EventReceiver<E>>, ClientError>
    where
        E: DeserializeShape + Send + 'static,
    {
        let decoder = self.frame_decoder.clone().ok_or_else(|| {
            ClientError::Config("no event frame decoder is configured".to_string())
        })?;
        let body = std::mem::take(&mut response.body);
        Ok(Box::new(ChannelEventReceiver::new(
            self.codec.clone(),
            decoder,
            body,
        )))
    }
}

fn join_paths(endpoint_path: Option<&str>, request_path: Option<&str>) -> Option<String> {
    match (endpoint_path, request_path) {
        (Some(prefix), Some(path)) => {
            Some(format!("{}{}", prefix.trim_end_matches('/'), path))
        }
        (Some(prefix), None) => Some(prefix.to_string()),
        (None, Some(path)) => Some(path.to_string()),
        (None, None) => None,
    }
}

struct ErrorInfo {
    code: String,
    message: String,
}

/// Generic error information extracted from a rest-json style response.
///
/// The code is found in the `x-amzn-errortype` header or the common body
/// keys, then normalized: some services send a fully-qualified shape ID or
/// a URI, and those suffixes are stripped.
fn parse_error_info(response: &Response, body: &[u8]) -> ErrorInfo {
    let mut code: Option<String> = response
        .fields
        .get(REST_JSON_CODE_HEADER)
        .map(|field| field.as_string());
    let mut message: Option<String> = None;

    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        for (key, value) in map {
            let key = key.to_ascii_lowercase();
            if code.is_none()
                && REST_JSON_CODE_KEYS.contains(&key.as_str())
                && let Value::String(value) = &value
            {
                code = Some(value.clone());
            }
            if message.is_none()
                && REST_JSON_MESSAGE_KEYS.contains(&key.as_str())
                && let Value::String(value) = &value
            {
                message = Some(value.clone());
            }
        }
    }

    let code = code
        .map(|code| {
            let code = code.split('#').next_back().unwrap_or_default();
            code.split(':').next().unwrap_or_default().to_string()
        })
        .filter(|code| !code.is_empty());

    ErrorInfo {
        code: code.unwrap_or_else(|| "Unknown".to_string()),
        message: message.unwrap_or_else(|| "Unknown".to_string()),
    }
}

fn fault_for_status(status: u16) -> ErrorFault {
    match status {
        400..=499 => ErrorFault::Client,
        500..=599 => ErrorFault::Server,
        _ => ErrorFault::Unknown,
    }
}

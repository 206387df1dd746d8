//! End-to-end tests of the request pipeline over an in-memory protocol
//! and transport.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use smithy_rt_core::auth::{AuthOption, AuthScheme, Sign, StaticAuthSchemeResolver};
use smithy_rt_core::client::{ClientCall, ClientProtocol, ClientTransport, RequestPipeline};
use smithy_rt_core::endpoints::StaticEndpointResolver;
use smithy_rt_core::eventstream::{EventPublisher, EventReceiver};
use smithy_rt_core::identity::{Identity, ResolveIdentity, SharedIdentity};
use smithy_rt_core::interceptors::{InputContext, Interceptor, InterceptorChain, RequestContext};
use smithy_rt_core::retries::{ExponentialBackoff, JitterMode, RetryStrategy, SimpleRetryStrategy};
use smithy_rt_core::schema::prelude::STRING;
use smithy_rt_core::schema::{ApiOperation, Schema, SchemaRef, ShapeId, StreamingTrait};
use smithy_rt_core::serde::{
    DeserializeShape, SerializeShape, ShapeDeserializer, ShapeSerializer,
};
use smithy_rt_core::transport::{Body, Endpoint, Field, Request, Response, Uri};
use smithy_rt_core::types::{PropertyKey, RETRY_ATTEMPTS, TypedProperties};
use smithy_rt_core::{Bytes, ClientError, Ref, SerdeError, TransportErrorKind, traits};

#[derive(Debug, Clone)]
struct TestInput {
    message: String,
}

fn input_schema() -> &'static SchemaRef {
    static SCHEMA: std::sync::LazyLock<SchemaRef> = std::sync::LazyLock::new(|| {
        Schema::structure_builder("test#Input", traits![])
            .put_member("message", &STRING, traits![])
            .build()
    });
    &SCHEMA
}

fn streaming_input_schema() -> &'static SchemaRef {
    static SCHEMA: std::sync::LazyLock<SchemaRef> = std::sync::LazyLock::new(|| {
        let events = Schema::union_builder("test#Events", traits![])
            .put_member("message", input_schema(), traits![])
            .build();
        Schema::structure_builder("test#StreamingInput", traits![])
            .put_member("message", &STRING, traits![])
            .put_member("events", &events, traits![StreamingTrait])
            .build()
    });
    &SCHEMA
}

impl SerializeShape for TestInput {
    fn schema(&self) -> &SchemaRef {
        input_schema()
    }

    fn serialize(&self, serializer: &mut dyn ShapeSerializer) -> Result<(), SerdeError> {
        let schema = self.schema().clone();
        serializer.write_struct(&schema, &mut |members| {
            members.write_string(schema.expect_member("message"), &self.message)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TestOutput {
    body: String,
}

impl DeserializeShape for TestOutput {
    fn deserialize(deserializer: &mut dyn ShapeDeserializer) -> Result<Self, SerdeError> {
        Ok(TestOutput {
            body: deserializer.read_string(&STRING)?,
        })
    }
}

/// Deserializer handing out one string.
struct StringDeserializer {
    value: String,
}

impl ShapeDeserializer for StringDeserializer {
    fn read_string(&mut self, _schema: &SchemaRef) -> Result<String, SerdeError> {
        Ok(self.value.clone())
    }
}

// A take-once slot: the publisher removes the sender so context clones do
// not hold the body stream open.
const EVENT_SENDER: PropertyKey<Mutex<Option<mpsc::Sender<Result<Bytes, std::io::Error>>>>> =
    PropertyKey::new("test_event_sender");

/// A minimal text protocol: the request body is the input's message and
/// the response body is the output.
struct TextProtocol {
    id: ShapeId,
}

impl TextProtocol {
    fn new() -> Self {
        TextProtocol {
            id: ShapeId::from("test#textProtocol"),
        }
    }
}

impl ClientProtocol for TextProtocol {
    fn id(&self) -> &ShapeId {
        &self.id
    }

    fn serialize_request(
        &self,
        operation: &ApiOperation,
        input: &dyn SerializeShape,
        endpoint: &Uri,
        context: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        // Capture the message through the document serializer.
        let mut serializer = smithy_rt_core::serde::DocumentSerializer::new();
        input.serialize(&mut serializer)?;
        let document =
            smithy_rt_core::schema::Document::new(input.schema().clone(), serializer.take());
        let message = document
            .get_member("message")
            .and_then(|d| d.as_string().map(str::to_string))
            .unwrap_or_default();

        let mut request = Request::new("POST", endpoint.clone());
        if operation.input_stream_member().is_some() {
            let (sender, mut receiver) = mpsc::channel(4);
            request.body =
                Body::from_stream(futures::stream::poll_fn(move |cx| receiver.poll_recv(cx)));
            context.insert(&EVENT_SENDER, Mutex::new(Some(sender)));
        } else {
            request.body = Body::from(message.into_bytes());
        }
        Ok(request)
    }

    fn set_service_endpoint(
        &self,
        mut request: Request,
        endpoint: &Endpoint,
    ) -> Result<Request, ClientError> {
        request.destination = endpoint.uri.clone();
        Ok(request)
    }

    fn deserialize_response<O: DeserializeShape>(
        &self,
        _operation: &ApiOperation,
        _request: &Request,
        response: &mut Response,
        _context: &mut TypedProperties,
    ) -> impl Future<Output = Result<O, ClientError>> + Send {
        async move {
            if response.status >= 400 {
                return Err(ClientError::transport(
                    TransportErrorKind::Transient,
                    "simulated transient failure",
                ));
            }
            let body = response.body.collect().await.map_err(|e| {
                ClientError::transport(TransportErrorKind::Transient, e.to_string())
            })?;
            let mut deserializer = StringDeserializer {
                value: String::from_utf8_lossy(&body).to_string(),
            };
            Ok(O::deserialize(&mut deserializer)?)
        }
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
        let sender = context
            .get(&EVENT_SENDER)
            .and_then(|slot| slot.lock().take())
            .ok_or_else(|| ClientError::Config("no event sender".to_string()))?;
        Ok(Box::new(TextEventPublisher {
            sender: Some(sender),
            _marker: std::marker::PhantomData,
        }))
    }

    fn create_event_receiver<E>(
        &self,
        _operation: &ApiOperation,
        _request: &Request,
        _response: &mut Response,
        _context: &TypedProperties,
    ) -> Result<Box<dyn EventReceiver<E>>, ClientError>
    where
        E: DeserializeShape + Send + 'static,
    {
        Err(ClientError::Config(
            "output streams are not used in these tests".to_string(),
        ))
    }
}

struct TextEventPublisher<E> {
    sender: Option<mpsc::Sender<Result<Bytes, std::io::Error>>>,
    _marker: std::marker::PhantomData<fn(E)>,
}

#[async_trait]
impl<E: SerializeShape + Send + 'static> EventPublisher<E> for TextEventPublisher<E> {
    async fn send(&mut self, event: E) -> Result<(), ClientError> {
        let Some(sender) = &self.sender else {
            return Err(ClientError::Interrupted("stream closed".to_string()));
        };
        let mut serializer = smithy_rt_core::serde::DocumentSerializer::new();
        event.serialize(&mut serializer)?;
        let document =
            smithy_rt_core::schema::Document::new(event.schema().clone(), serializer.take());
        let message = document
            .get_member("message")
            .and_then(|d| d.as_string().map(str::to_string))
            .unwrap_or_default();
        sender
            .send(Ok(Bytes::from(format!("{message};"))))
            .await
            .map_err(|_| ClientError::Interrupted("transport gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.sender.take();
        Ok(())
    }
}

/// Scripted transport: pops one canned response per call.
struct ScriptedTransport {
    responses: Mutex<Vec<Result<Response, ClientError>>>,
    calls: AtomicU32,
    /// Collected request bodies, for event-stream assertions.
    bodies: Mutex<Vec<Bytes>>,
}

impl ScriptedTransport {
    fn new(mut responses: Vec<Result<Response, ClientError>>) -> Arc<Self> {
        responses.reverse();
        Arc::new(ScriptedTransport {
            responses: Mutex::new(responses),
            calls: AtomicU32::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }

    fn ok(body: &str) -> Result<Response, ClientError> {
        let mut response = Response::new(200);
        response.body = Body::from(body.as_bytes().to_vec());
        Ok(response)
    }

    fn transient() -> Result<Response, ClientError> {
        Err(ClientError::transport(
            TransportErrorKind::Transient,
            "connection reset",
        ))
    }
}

#[async_trait]
impl ClientTransport for ScriptedTransport {
    async fn send(&self, mut request: Request) -> Result<Response, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = request
            .body
            .collect()
            .await
            .map_err(|e| ClientError::transport(TransportErrorKind::Transient, e.to_string()))?;
        self.bodies.lock().push(body);
        self.responses
            .lock()
            .pop()
            .unwrap_or_else(|| Err(ClientError::Config("transport script exhausted".to_string())))
    }
}

fn operation() -> Ref<ApiOperation> {
    Ref::new(ApiOperation::new(
        Schema::create_operation("test#Operation", traits![]),
        input_schema().clone(),
        Schema::structure_builder("test#Output", traits![]).build(),
    ))
}

fn streaming_operation() -> Ref<ApiOperation> {
    Ref::new(ApiOperation::new(
        Schema::create_operation("test#StreamingOperation", traits![]),
        streaming_input_schema().clone(),
        Schema::structure_builder("test#Output", traits![]).build(),
    ))
}

fn immediate_retry_strategy(max_attempts: u32) -> Ref<dyn RetryStrategy> {
    Ref::new(SimpleRetryStrategy::new(max_attempts).with_backoff(
        ExponentialBackoff::with_random(0.0, 0.0, JitterMode::None, Box::new(|| 0.0)),
    ))
}

fn call(
    operation: Ref<ApiOperation>,
    interceptor: InterceptorChain<TestInput, TestOutput>,
    retry_strategy: Ref<dyn RetryStrategy>,
) -> ClientCall<TestInput, TestOutput> {
    ClientCall {
        input: TestInput {
            message: "hello".to_string(),
        },
        operation,
        context: TypedProperties::new(),
        interceptor,
        retry_strategy,
        retry_scope: None,
        auth_scheme_resolver: Ref::new(StaticAuthSchemeResolver::new(vec![])),
        supported_auth_schemes: vec![],
        endpoint_resolver: Ref::new(
            StaticEndpointResolver::from_str("https://example.com").unwrap(),
        ),
    }
}

#[tokio::test]
async fn successful_round_trip() {
    let transport = ScriptedTransport::new(vec![ScriptedTransport::ok("world")]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport.clone());

    let output = pipeline
        .send(call(
            operation(),
            InterceptorChain::new(),
            immediate_retry_strategy(3),
        ))
        .await
        .unwrap();

    assert_eq!(output.body, "world");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(&transport.bodies.lock()[0][..], b"hello");
}

#[tokio::test]
async fn transient_errors_are_retried_to_max_attempts() {
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::transient(),
        ScriptedTransport::transient(),
        ScriptedTransport::transient(),
        ScriptedTransport::ok("never reached"),
    ]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport.clone());

    let result = pipeline
        .send(call(
            operation(),
            InterceptorChain::new(),
            immediate_retry_strategy(3),
        ))
        .await;

    // Exactly three attempts: the initial one and two retries.
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    assert!(matches!(result, Err(ClientError::Transport { .. })));
}

#[tokio::test]
async fn recovery_after_transient_error() {
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::transient(),
        ScriptedTransport::ok("recovered"),
    ]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport.clone());

    let output = pipeline
        .send(call(
            operation(),
            InterceptorChain::new(),
            immediate_retry_strategy(3),
        ))
        .await
        .unwrap();

    assert_eq!(output.body, "recovered");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

/// Records the order in which hooks fire.
#[derive(Default)]
struct HookRecorder {
    hooks: Arc<Mutex<Vec<&'static str>>>,
}

impl Interceptor<TestInput, TestOutput> for HookRecorder {
    fn read_before_execution(
        &self,
        _context: &mut InputContext<'_, TestInput>,
    ) -> Result<(), ClientError> {
        self.hooks.lock().push("read_before_execution");
        Ok(())
    }

    fn read_before_attempt(
        &self,
        _context: &mut RequestContext<'_, TestInput>,
    ) -> Result<(), ClientError> {
        self.hooks.lock().push("read_before_attempt");
        Ok(())
    }

    fn read_before_transmit(
        &self,
        _context: &mut RequestContext<'_, TestInput>,
    ) -> Result<(), ClientError> {
        self.hooks.lock().push("read_before_transmit");
        Ok(())
    }

    fn read_after_attempt(
        &self,
        _context: &mut smithy_rt_core::interceptors::OutputContext<'_, TestInput, TestOutput>,
    ) -> Result<(), ClientError> {
        self.hooks.lock().push("read_after_attempt");
        Ok(())
    }

    fn read_after_execution(
        &self,
        _context: &mut smithy_rt_core::interceptors::OutputContext<'_, TestInput, TestOutput>,
    ) -> Result<(), ClientError> {
        self.hooks.lock().push("read_after_execution");
        Ok(())
    }
}

#[tokio::test]
async fn hooks_fire_in_order_and_pair_up() {
    let hooks = Arc::new(Mutex::new(Vec::new()));
    let recorder = HookRecorder {
        hooks: hooks.clone(),
    };
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::transient(),
        ScriptedTransport::ok("done"),
    ]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport);

    pipeline
        .send(call(
            operation(),
            InterceptorChain::new().with(recorder),
            immediate_retry_strategy(3),
        ))
        .await
        .unwrap();

    let recorded = hooks.lock().clone();
    assert_eq!(
        recorded,
        [
            "read_before_execution",
            // first attempt
            "read_before_attempt",
            "read_before_transmit",
            "read_after_attempt",
            // retry attempt
            "read_before_attempt",
            "read_before_transmit",
            "read_after_attempt",
            "read_after_execution",
        ]
    );
}

#[tokio::test]
async fn read_before_execution_errors_skip_the_attempt() {
    struct Failing;
    impl Interceptor<TestInput, TestOutput> for Failing {
        fn read_before_execution(
            &self,
            _context: &mut InputContext<'_, TestInput>,
        ) -> Result<(), ClientError> {
            Err(ClientError::Interceptor("rejected".to_string()))
        }
    }

    let transport = ScriptedTransport::new(vec![ScriptedTransport::ok("unused")]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport.clone());

    let result = pipeline
        .send(call(
            operation(),
            InterceptorChain::new().with(Failing),
            immediate_retry_strategy(3),
        ))
        .await;

    assert!(matches!(result, Err(ClientError::Interceptor(_))));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn attempt_counter_is_maintained() {
    struct CounterProbe {
        seen: Arc<Mutex<Vec<u32>>>,
    }
    impl Interceptor<TestInput, TestOutput> for CounterProbe {
        fn read_before_attempt(
            &self,
            context: &mut RequestContext<'_, TestInput>,
        ) -> Result<(), ClientError> {
            self.seen
                .lock()
                .push(context.properties.get(&RETRY_ATTEMPTS).copied().unwrap_or(0));
            Ok(())
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::transient(),
        ScriptedTransport::transient(),
        ScriptedTransport::ok("done"),
    ]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport);

    pipeline
        .send(call(
            operation(),
            InterceptorChain::new().with(CounterProbe { seen: seen.clone() }),
            immediate_retry_strategy(5),
        ))
        .await
        .unwrap();

    assert_eq!(seen.lock().clone(), [1, 2, 3]);
}

/// The auth plumbing: a scheme that stamps a header.
#[derive(Debug)]
struct StampIdentity;
impl Identity for StampIdentity {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct StampResolver;
#[async_trait]
impl ResolveIdentity for StampResolver {
    async fn resolve_identity(
        &self,
        _identity_properties: &TypedProperties,
    ) -> Result<SharedIdentity, ClientError> {
        Ok(Ref::new(StampIdentity))
    }
}

struct StampSigner;
#[async_trait]
impl Sign for StampSigner {
    async fn sign(
        &self,
        mut request: Request,
        _identity: &SharedIdentity,
        _signer_properties: &TypedProperties,
        _context: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        request
            .fields
            .set_field(Field::with_values("x-stamped", ["yes"]));
        Ok(request)
    }
}

struct StampScheme {
    id: ShapeId,
}
impl AuthScheme for StampScheme {
    fn scheme_id(&self) -> &ShapeId {
        &self.id
    }
    fn identity_resolver(&self) -> Ref<dyn ResolveIdentity> {
        Ref::new(StampResolver)
    }
    fn signer(&self) -> Ref<dyn Sign> {
        Ref::new(StampSigner)
    }
}

#[tokio::test]
async fn first_supported_auth_scheme_signs_the_request() {
    struct HeaderProbe {
        seen: Arc<Mutex<Option<bool>>>,
    }
    impl Interceptor<TestInput, TestOutput> for HeaderProbe {
        fn read_before_transmit(
            &self,
            context: &mut RequestContext<'_, TestInput>,
        ) -> Result<(), ClientError> {
            *self.seen.lock() = Some(context.transport_request.fields.contains("x-stamped"));
            Ok(())
        }
    }

    let transport = ScriptedTransport::new(vec![ScriptedTransport::ok("done")]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport);

    let seen = Arc::new(Mutex::new(None));
    let mut client_call = call(
        operation(),
        InterceptorChain::new().with(HeaderProbe { seen: seen.clone() }),
        immediate_retry_strategy(1),
    );
    client_call.auth_scheme_resolver = Ref::new(StaticAuthSchemeResolver::new(vec![
        AuthOption::new("test#unsupported"),
        AuthOption::new("test#stamp"),
    ]));
    client_call.supported_auth_schemes = vec![Ref::new(StampScheme {
        id: ShapeId::from("test#stamp"),
    })];

    pipeline.send(client_call).await.unwrap();
    assert_eq!(*seen.lock(), Some(true));
}

#[tokio::test]
async fn input_stream_publishes_before_response() {
    let transport = ScriptedTransport::new(vec![ScriptedTransport::ok("accepted")]);
    let pipeline = RequestPipeline::new(TextProtocol::new(), transport.clone());

    let mut client_call = call(
        streaming_operation(),
        InterceptorChain::new(),
        immediate_retry_strategy(1),
    );
    client_call.input = TestInput {
        message: "initial".to_string(),
    };

    let mut stream = pipeline
        .input_stream::<TestInput, TestOutput, TestInput>(client_call)
        .await
        .unwrap();

    stream
        .input_stream
        .send(TestInput {
            message: "one".to_string(),
        })
        .await
        .unwrap();
    stream
        .input_stream
        .send(TestInput {
            message: "two".to_string(),
        })
        .await
        .unwrap();
    stream.close().await.unwrap();
    // Re-entrant close is a no-op.
    stream.close().await.unwrap();

    let output = stream.await_output().await.unwrap();
    assert_eq!(output.body, "accepted");
    assert_eq!(&transport.bodies.lock()[0][..], b"one;two;");
}

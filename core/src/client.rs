//! The request execution pipeline.
//!
//! [`RequestPipeline`] drives a single operation call: interceptor hooks,
//! serialization through the protocol, endpoint and auth resolution,
//! signing, per-attempt retries, transport send, and deserialization.
//! Event-stream operations fork at the transmit step and return publisher
//! and receiver handles over the same connection.

use async_trait::async_trait;
use std::future::Future;
use tokio::sync::oneshot;
use tracing::debug;

use crate::auth::{AuthParams, AuthScheme, ResolveAuthScheme};
use crate::endpoints::{EndpointResolverParams, ResolveEndpoint};
use crate::eventstream::{
    DuplexEventStream, EventPublisher, EventReceiver, InputEventStream, OutputEventStream,
};
use crate::interceptors::{
    InputContext, Interceptor, InterceptorChain, OutputContext, RequestContext, ResponseContext,
};
use crate::retries::RetryStrategy;
use crate::schema::{ApiOperation, ShapeId};
use crate::serde::{DeserializeShape, SerializeShape};
use crate::transport::{Endpoint, Request, Response, Uri};
use crate::types::{RETRY_ATTEMPTS, TypedProperties};
use crate::{ClientError, Ref};

/// Everything needed to execute one operation call.
pub struct ClientCall<I, O> {
    pub input: I,
    pub operation: Ref<ApiOperation>,
    pub context: TypedProperties,
    pub interceptor: InterceptorChain<I, O>,
    pub retry_strategy: Ref<dyn RetryStrategy>,
    pub retry_scope: Option<String>,
    pub auth_scheme_resolver: Ref<dyn ResolveAuthScheme>,
    pub supported_auth_schemes: Vec<Ref<dyn AuthScheme>>,
    pub endpoint_resolver: Ref<dyn ResolveEndpoint>,
}

/// Serializes operations onto a transport and interprets the results.
pub trait ClientProtocol: Send + Sync {
    /// The protocol's identifier.
    fn id(&self) -> &ShapeId;

    /// Serialize the operation input into a transport request bound to the
    /// given (possibly unresolved) endpoint.
    fn serialize_request(
        &self,
        operation: &ApiOperation,
        input: &dyn SerializeShape,
        endpoint: &Uri,
        context: &mut TypedProperties,
    ) -> Result<Request, ClientError>;

    /// Bind the resolved service endpoint onto the transport request.
    fn set_service_endpoint(
        &self,
        request: Request,
        endpoint: &Endpoint,
    ) -> Result<Request, ClientError>;

    /// Deserialize the transport response into the operation output.
    ///
    /// Error responses are resolved against the operation's error registry
    /// so modeled errors surface as typed errors.
    fn deserialize_response<O: DeserializeShape>(
        &self,
        operation: &ApiOperation,
        request: &Request,
        response: &mut Response,
        context: &mut TypedProperties,
    ) -> impl Future<Output = Result<O, ClientError>> + Send;

    /// Create a publisher that serializes events onto the request body.
    fn create_event_publisher<E>(
        &self,
        operation: &ApiOperation,
        request: &Request,
        context: &TypedProperties,
    ) -> Result<Box<dyn EventPublisher<E>>, ClientError>
    where
        E: SerializeShape + Send + 'static;

    /// Create a receiver that consumes events from the response body.
    fn create_event_receiver<E>(
        &self,
        operation: &ApiOperation,
        request: &Request,
        response: &mut Response,
        context: &TypedProperties,
    ) -> Result<Box<dyn EventReceiver<E>>, ClientError>
    where
        E: DeserializeShape + Send + 'static;
}

/// The transport contract the pipeline depends on.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

/// Context handed to the caller of an input-streaming operation once the
/// request has been transmitted, so event publishing can begin.
pub struct StreamContext {
    /// The transmitted request, minus its (streaming) body.
    pub transport_request: Request,
    /// The call's property bag, sharing state with the pipeline.
    pub properties: TypedProperties,
}

struct ExecutionOutcome<I, O> {
    input: Option<I>,
    response: Result<O, ClientError>,
    transport_request: Option<Request>,
    transport_response: Option<Response>,
}

struct AttemptOutcome<O> {
    response: Result<O, ClientError>,
    transport_request: Option<Request>,
    transport_response: Option<Response>,
}

/// Result of a completed execution, carrying everything the event-stream
/// forks need after the fact.
struct FinishedExecution<O> {
    response: Result<O, ClientError>,
    transport_request: Option<Request>,
    transport_response: Option<Response>,
    context: TypedProperties,
}

/// Drives requests for a protocol and transport pairing.
pub struct RequestPipeline<P: ClientProtocol> {
    protocol: Ref<P>,
    transport: Ref<dyn ClientTransport>,
}

impl<P: ClientProtocol> Clone for RequestPipeline<P> {
    fn clone(&self) -> Self {
        RequestPipeline {
            protocol: self.protocol.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<P: ClientProtocol + 'static> RequestPipeline<P> {
    pub fn new(protocol: P, transport: Ref<dyn ClientTransport>) -> Self {
        RequestPipeline {
            protocol: Ref::new(protocol),
            transport,
        }
    }

    /// Execute a request/response operation.
    pub async fn send<I, O>(&self, call: ClientCall<I, O>) -> Result<O, ClientError>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        self.execute(call, None).await.response
    }

    /// Execute an operation with an input event stream.
    ///
    /// The transport send is started on a background task and the stream
    /// is returned as soon as the request context is available, so the
    /// caller can begin publishing events before the service's initial
    /// response arrives.
    pub async fn input_stream<I, O, E>(
        &self,
        call: ClientCall<I, O>,
    ) -> Result<InputEventStream<E, O>, ClientError>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
        E: SerializeShape + Send + 'static,
    {
        let operation = call.operation.clone();
        let (request_tx, request_rx) = oneshot::channel();
        let pipeline = self.clone();
        let execute_task =
            tokio::spawn(async move { pipeline.execute(call, Some(request_tx)).await.response });

        let Ok(stream_context) = request_rx.await else {
            // The pipeline failed before transmitting; surface its error.
            return Err(await_failed_execution(execute_task).await);
        };
        let publisher = self.protocol.create_event_publisher::<E>(
            &operation,
            &stream_context.transport_request,
            &stream_context.properties,
        )?;
        Ok(InputEventStream::new(publisher, execute_task))
    }

    /// Execute an operation with an output event stream.
    pub async fn output_stream<I, O, E>(
        &self,
        call: ClientCall<I, O>,
    ) -> Result<OutputEventStream<E, O>, ClientError>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
        E: DeserializeShape + Send + 'static,
    {
        let operation = call.operation.clone();
        let finished = self.execute(call, None).await;
        let output = finished.response?;
        let (request, mut response) = streamed_transport_pair(
            finished.transport_request,
            finished.transport_response,
        )?;
        let receiver = self.protocol.create_event_receiver::<E>(
            &operation,
            &request,
            &mut response,
            &finished.context,
        )?;
        Ok(OutputEventStream::new(receiver, output))
    }

    /// Execute an operation streaming events in both directions.
    pub async fn duplex_stream<I, O, IE, OE>(
        &self,
        call: ClientCall<I, O>,
    ) -> Result<DuplexEventStream<IE, OE, O>, ClientError>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
        IE: SerializeShape + Send + 'static,
        OE: DeserializeShape + Send + 'static,
    {
        let operation = call.operation.clone();
        let task_operation = call.operation.clone();
        let (request_tx, request_rx) = oneshot::channel();
        let pipeline = self.clone();
        let execute_task = tokio::spawn(async move {
            let finished = pipeline.execute(call, Some(request_tx)).await;
            let output = finished.response?;
            let (request, mut response) = streamed_transport_pair(
                finished.transport_request,
                finished.transport_response,
            )?;
            let receiver = pipeline.protocol.create_event_receiver::<OE>(
                &task_operation,
                &request,
                &mut response,
                &finished.context,
            )?;
            Ok((output, receiver))
        });

        let Ok(stream_context) = request_rx.await else {
            return Err(await_failed_execution(execute_task).await);
        };
        let publisher = self.protocol.create_event_publisher::<IE>(
            &operation,
            &stream_context.transport_request,
            &stream_context.properties,
        )?;
        Ok(DuplexEventStream::new(publisher, execute_task))
    }

    async fn execute<I, O>(
        &self,
        call: ClientCall<I, O>,
        request_tx: Option<oneshot::Sender<StreamContext>>,
    ) -> FinishedExecution<O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        let ClientCall {
            input,
            operation,
            mut context,
            interceptor,
            retry_strategy,
            retry_scope,
            auth_scheme_resolver,
            supported_auth_schemes,
            endpoint_resolver,
        } = call;
        debug!(operation = operation.name(), "making request");
        context.insert(&RETRY_ATTEMPTS, 1u32);

        let call = CallState {
            operation,
            interceptor,
            retry_strategy,
            retry_scope,
            auth_scheme_resolver,
            supported_auth_schemes,
            endpoint_resolver,
        };

        let mut outcome = self
            .handle_execution(&call, input, &mut context, request_tx)
            .await;

        // 11. modify_before_completion -> read_after_execution
        outcome.response = match call
            .interceptor
            .modify_before_completion(outcome.response, &mut context)
        {
            Ok(response) => response,
            Err(error) => Err(error),
        };
        if let Err(error) = call.interceptor.read_after_execution(&mut OutputContext {
            request: outcome.input.as_ref(),
            transport_request: outcome.transport_request.as_ref(),
            transport_response: outcome.transport_response.as_ref(),
            response: &outcome.response,
            properties: &mut context,
        }) {
            outcome.response = Err(error);
        }

        FinishedExecution {
            response: outcome.response,
            transport_request: outcome.transport_request,
            transport_response: outcome.transport_response,
            context,
        }
    }

    async fn handle_execution<I, O>(
        &self,
        call: &CallState<I, O>,
        input: I,
        context: &mut TypedProperties,
        request_tx: Option<oneshot::Sender<StreamContext>>,
    ) -> ExecutionOutcome<I, O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        // 1. read_before_execution. Any throw jumps to the completion hooks.
        if let Err(error) = call.interceptor.read_before_execution(&mut InputContext {
            request: &input,
            properties: context,
        }) {
            return ExecutionOutcome {
                input: Some(input),
                response: Err(error),
                transport_request: None,
                transport_response: None,
            };
        }

        // 2. modify_before_serialization -> read_before_serialization
        let input = match call
            .interceptor
            .modify_before_serialization(input, context)
        {
            Ok(input) => input,
            Err(error) => {
                return ExecutionOutcome {
                    input: None,
                    response: Err(error),
                    transport_request: None,
                    transport_response: None,
                };
            }
        };
        if let Err(error) = call
            .interceptor
            .read_before_serialization(&mut InputContext {
                request: &input,
                properties: context,
            })
        {
            return ExecutionOutcome {
                input: Some(input),
                response: Err(error),
                transport_request: None,
                transport_response: None,
            };
        }

        debug!("serializing request");
        // 3. Serialize into a transport request bound to an unresolved
        //    endpoint placeholder.
        let transport_request = match self.protocol.serialize_request(
            &call.operation,
            &input,
            &unresolved_endpoint(),
            context,
        ) {
            Ok(request) => request,
            Err(error) => {
                return ExecutionOutcome {
                    input: Some(input),
                    response: Err(error),
                    transport_request: None,
                    transport_response: None,
                };
            }
        };
        debug!(request = ?transport_request, "serialization complete");

        if let Err(error) = call
            .interceptor
            .read_after_serialization(&mut RequestContext {
                request: &input,
                transport_request: &transport_request,
                properties: context,
            })
        {
            return ExecutionOutcome {
                input: Some(input),
                response: Err(error),
                transport_request: Some(transport_request),
                transport_response: None,
            };
        }

        // 4. modify_before_retry_loop, then acquire the initial token.
        let transport_request = match call
            .interceptor
            .modify_before_retry_loop(transport_request, context)
        {
            Ok(request) => request,
            Err(error) => {
                return ExecutionOutcome {
                    input: Some(input),
                    response: Err(error),
                    transport_request: None,
                    transport_response: None,
                };
            }
        };

        self.retry_loop(call, input, transport_request, context, request_tx)
            .await
    }

    async fn retry_loop<I, O>(
        &self,
        call: &CallState<I, O>,
        input: I,
        transport_request: Request,
        context: &mut TypedProperties,
        mut request_tx: Option<oneshot::Sender<StreamContext>>,
    ) -> ExecutionOutcome<I, O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        let mut retry_token = match call
            .retry_strategy
            .acquire_initial_retry_token(call.retry_scope.as_deref())
        {
            Ok(token) => token,
            Err(error) => {
                return ExecutionOutcome {
                    input: Some(input),
                    response: Err(error),
                    transport_request: Some(transport_request),
                    transport_response: None,
                };
            }
        };

        // A pristine copy is kept across attempts so retries never observe
        // changes made by signers or interceptors in earlier attempts.
        // Streaming bodies cannot be replayed; those requests get exactly
        // one attempt.
        let mut pristine = Some(transport_request);
        loop {
            // 5. Even the first token can carry a delay.
            if !retry_token.retry_delay.is_zero() {
                tokio::time::sleep(retry_token.retry_delay).await;
            }

            let attempt_request = match pristine.as_ref().and_then(Request::try_clone) {
                Some(clone) => clone,
                None => match pristine.take() {
                    Some(original) => original,
                    None => {
                        return ExecutionOutcome {
                            input: Some(input),
                            response: Err(ClientError::Retry {
                                message: "streaming request body cannot be replayed".to_string(),
                            }),
                            transport_request: None,
                            transport_response: None,
                        };
                    }
                },
            };

            let attempt = self
                .handle_attempt(call, &input, attempt_request, context, &mut request_tx)
                .await;

            match attempt.response {
                Err(error) => {
                    match call
                        .retry_strategy
                        .refresh_retry_token_for_retry(&retry_token, &error)
                    {
                        Ok(new_token) => {
                            if pristine.is_none() {
                                debug!("retry allowed but request is not replayable");
                                return ExecutionOutcome {
                                    input: Some(input),
                                    response: Err(error),
                                    transport_request: attempt.transport_request,
                                    transport_response: attempt.transport_response,
                                };
                            }
                            debug!(
                                attempt = new_token.attempt_count(),
                                delay = new_token.retry_delay.as_secs_f64(),
                                "retry needed"
                            );
                            let attempts = context.get(&RETRY_ATTEMPTS).copied().unwrap_or(1);
                            context.insert(&RETRY_ATTEMPTS, attempts + 1);
                            retry_token = new_token;
                        }
                        Err(refusal) => {
                            debug!(%refusal, "not retrying");
                            return ExecutionOutcome {
                                input: Some(input),
                                response: Err(error),
                                transport_request: attempt.transport_request,
                                transport_response: attempt.transport_response,
                            };
                        }
                    }
                }
                Ok(output) => {
                    call.retry_strategy.record_success(&retry_token);
                    return ExecutionOutcome {
                        input: Some(input),
                        response: Ok(output),
                        transport_request: attempt.transport_request,
                        transport_response: attempt.transport_response,
                    };
                }
            }
        }
    }

    async fn handle_attempt<I, O>(
        &self,
        call: &CallState<I, O>,
        input: &I,
        request: Request,
        context: &mut TypedProperties,
        request_tx: &mut Option<oneshot::Sender<StreamContext>>,
    ) -> AttemptOutcome<O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        let outcome = self
            .try_attempt(call, input, request, context, request_tx)
            .await;
        self.finalize_attempt(call, input, outcome, context)
    }

    async fn try_attempt<I, O>(
        &self,
        call: &CallState<I, O>,
        input: &I,
        mut request: Request,
        context: &mut TypedProperties,
        request_tx: &mut Option<oneshot::Sender<StreamContext>>,
    ) -> AttemptOutcome<O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        macro_rules! fail_attempt {
            ($error:expr, $request:expr) => {
                return AttemptOutcome {
                    response: Err($error),
                    transport_request: $request,
                    transport_response: None,
                }
            };
        }

        // 5 (cont). read_before_attempt.
        if let Err(error) = call.interceptor.read_before_attempt(&mut RequestContext {
            request: input,
            transport_request: &request,
            properties: context,
        }) {
            fail_attempt!(error, Some(request));
        }

        // 6. Resolve the endpoint and bind it to the request. This runs
        //    before auth because its result can affect auth.
        debug!("calling endpoint resolver");
        let endpoint = match call
            .endpoint_resolver
            .resolve_endpoint(EndpointResolverParams {
                operation: &call.operation,
                context,
            })
            .await
        {
            Ok(endpoint) => endpoint,
            Err(error) => fail_attempt!(error, Some(request)),
        };
        debug!(endpoint = %endpoint.uri, "endpoint resolved");
        request = match self.protocol.set_service_endpoint(request, &endpoint) {
            Ok(request) => request,
            Err(error) => fail_attempt!(error, None),
        };

        // 7. modify_before_signing -> read_before_signing, then resolve an
        //    auth option/scheme pair, resolve the identity, and sign.
        request = match call.interceptor.modify_before_signing(request, context) {
            Ok(request) => request,
            Err(error) => fail_attempt!(error, None),
        };
        if let Err(error) = call.interceptor.read_before_signing(&mut RequestContext {
            request: input,
            transport_request: &request,
            properties: context,
        }) {
            fail_attempt!(error, Some(request));
        }

        let auth = match resolve_auth(call, self.protocol.id(), context) {
            Ok(auth) => auth,
            Err(error) => fail_attempt!(error, Some(request)),
        };
        if let Some((option, scheme)) = auth {
            let identity = match scheme
                .identity_resolver()
                .resolve_identity(&option.identity_properties)
                .await
            {
                Ok(identity) => identity,
                Err(error) => fail_attempt!(error, Some(request)),
            };
            debug!(request = ?request, "signing request");
            request = match scheme
                .signer()
                .sign(request, &identity, &option.signer_properties, context)
                .await
            {
                Ok(request) => request,
                Err(error) => fail_attempt!(error, None),
            };
        }

        if let Err(error) = call.interceptor.read_after_signing(&mut RequestContext {
            request: input,
            transport_request: &request,
            properties: context,
        }) {
            fail_attempt!(error, Some(request));
        }

        // 8. modify_before_transmit -> read_before_transmit, then send.
        request = match call.interceptor.modify_before_transmit(request, context) {
            Ok(request) => request,
            Err(error) => fail_attempt!(error, None),
        };
        if let Err(error) = call.interceptor.read_before_transmit(&mut RequestContext {
            request: input,
            transport_request: &request,
            properties: context,
        }) {
            fail_attempt!(error, Some(request));
        }

        debug!(request = ?request, "sending request");
        // The transport consumes the request; keep a body-less copy for
        // the response-side hooks and the event-stream forks.
        let held_request = request.clone_without_body();
        let transport_response = if let Some(sender) = request_tx.take() {
            // The caller is waiting to publish events; start the send on a
            // background task, hand over the request context, then await
            // the transport's response.
            let transport = self.transport.clone();
            let transport_task = tokio::spawn(async move { transport.send(request).await });
            let _ = sender.send(StreamContext {
                transport_request: held_request.clone_without_body(),
                properties: context.clone(),
            });
            match transport_task.await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(error)) => Err(error),
                Err(join_error) => Err(ClientError::Interrupted(join_error.to_string())),
            }
        } else {
            self.transport.send(request).await
        };
        let mut transport_response = match transport_response {
            Ok(response) => response,
            Err(error) => fail_attempt!(error, Some(held_request)),
        };
        debug!(response = ?transport_response, "received response");

        // 9. read_after_transmit -> modify_before_deserialization ->
        //    read_before_deserialization, then deserialize.
        if let Err(error) = call.interceptor.read_after_transmit(&mut ResponseContext {
            request: input,
            transport_request: &held_request,
            transport_response: &transport_response,
            properties: context,
        }) {
            fail_attempt!(error, Some(held_request));
        }
        transport_response = match call
            .interceptor
            .modify_before_deserialization(transport_response, context)
        {
            Ok(response) => response,
            Err(error) => fail_attempt!(error, Some(held_request)),
        };
        if let Err(error) = call
            .interceptor
            .read_before_deserialization(&mut ResponseContext {
                request: input,
                transport_request: &held_request,
                transport_response: &transport_response,
                properties: context,
            })
        {
            fail_attempt!(error, Some(held_request));
        }

        debug!("deserializing response");
        let output = self
            .protocol
            .deserialize_response::<O>(
                &call.operation,
                &held_request,
                &mut transport_response,
                context,
            )
            .await;
        debug!("deserialization complete");

        let mut outcome = AttemptOutcome {
            response: output,
            transport_request: Some(held_request),
            transport_response: Some(transport_response),
        };

        if let Err(error) = call
            .interceptor
            .read_after_deserialization(&mut OutputContext {
                request: Some(input),
                transport_request: outcome.transport_request.as_ref(),
                transport_response: outcome.transport_response.as_ref(),
                response: &outcome.response,
                properties: context,
            })
        {
            outcome.response = Err(error);
        }

        outcome
    }

    /// 10. modify_before_attempt_completion -> read_after_attempt.
    ///
    /// Every attempt outcome funnels through here, giving interceptors a
    /// chance to swap a failure for a success before the retry decision.
    fn finalize_attempt<I, O>(
        &self,
        call: &CallState<I, O>,
        input: &I,
        mut outcome: AttemptOutcome<O>,
        context: &mut TypedProperties,
    ) -> AttemptOutcome<O>
    where
        I: SerializeShape + Send + Sync + 'static,
        O: DeserializeShape + Send + Sync + 'static,
    {
        outcome.response = match call
            .interceptor
            .modify_before_attempt_completion(outcome.response, context)
        {
            Ok(response) => response,
            Err(error) => Err(error),
        };

        if let Err(error) = call.interceptor.read_after_attempt(&mut OutputContext {
            request: Some(input),
            transport_request: outcome.transport_request.as_ref(),
            transport_response: outcome.transport_response.as_ref(),
            response: &outcome.response,
            properties: context,
        }) {
            outcome.response = Err(error);
        }

        outcome
    }
}

/// Shared, per-call components threaded through the driver.
struct CallState<I, O> {
    operation: Ref<ApiOperation>,
    interceptor: InterceptorChain<I, O>,
    retry_strategy: Ref<dyn RetryStrategy>,
    retry_scope: Option<String>,
    auth_scheme_resolver: Ref<dyn ResolveAuthScheme>,
    supported_auth_schemes: Vec<Ref<dyn AuthScheme>>,
    endpoint_resolver: Ref<dyn ResolveEndpoint>,
}

/// Resolve an auth option/scheme pair from the first resolver-proposed
/// scheme that the client supports. `None` leaves the request unsigned.
fn resolve_auth<I, O>(
    call: &CallState<I, O>,
    protocol_id: &ShapeId,
    context: &TypedProperties,
) -> Result<Option<(crate::auth::AuthOption, Ref<dyn AuthScheme>)>, ClientError> {
    let options = call.auth_scheme_resolver.resolve_auth_schemes(&AuthParams {
        protocol_id,
        operation: &call.operation,
        context,
    })?;

    for option in options {
        if let Some(scheme) = call
            .supported_auth_schemes
            .iter()
            .find(|scheme| scheme.scheme_id() == &option.scheme_id)
        {
            return Ok(Some((option, scheme.clone())));
        }
    }
    Ok(None)
}

fn unresolved_endpoint() -> Uri {
    Uri::builder()
        .host("")
        .path("/")
        .build()
        .expect("the empty host is a valid reg-name")
}

fn streamed_transport_pair(
    request: Option<Request>,
    response: Option<Response>,
) -> Result<(Request, Response), ClientError> {
    match (request, response) {
        (Some(request), Some(response)) => Ok((request, response)),
        _ => Err(ClientError::Interrupted(
            "transport exchange did not complete".to_string(),
        )),
    }
}

async fn await_failed_execution<O>(
    task: tokio::task::JoinHandle<Result<O, ClientError>>,
) -> ClientError {
    match task.await {
        Ok(Ok(_)) => ClientError::Interrupted(
            "request context was dropped before the stream was ready".to_string(),
        ),
        Ok(Err(error)) => error,
        Err(join_error) => ClientError::Interrupted(join_error.to_string()),
    }
}

//! Full-stack tests: the request pipeline driving the HTTP binding
//! protocol with the JSON codec and SigV4 signing over a fake transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use smithy_rt_core::auth::{AuthOption, StaticAuthSchemeResolver};
use smithy_rt_core::client::{ClientCall, ClientTransport, RequestPipeline};
use smithy_rt_core::endpoints::StaticEndpointResolver;
use smithy_rt_core::interceptors::InterceptorChain;
use smithy_rt_core::retries::{ExponentialBackoff, JitterMode, SimpleRetryStrategy};
use smithy_rt_core::transport::{Body, Field, Request, Response};
use smithy_rt_core::types::TypedProperties;
use smithy_rt_core::{ClientError, Ref};

use smithy_rt_http::HttpBindingProtocol;
use smithy_rt_json_codec::JsonCodec;
use smithy_rt_sigv4::{
    AwsCredentialsIdentity, SIGNING_PROPERTIES, SIGV4_SCHEME_ID, SigV4AuthScheme,
    SigV4SigningProperties,
};
use smithy_rt_test_utils::{
    GetForecastInput, GetForecastOutput, any_forecast_input, get_forecast_operation,
};

/// Records requests and replies with a canned response per call.
struct RecordingTransport {
    responses: Mutex<Vec<Response>>,
    requests: Mutex<Vec<Request>>,
    calls: AtomicU32,
}

impl RecordingTransport {
    fn new(mut responses: Vec<Response>) -> Arc<Self> {
        responses.reverse();
        Arc::new(RecordingTransport {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    fn json(status: u16, body: &str) -> Response {
        let mut response = Response::new(status);
        response
            .fields
            .set_field(Field::with_values("content-type", ["application/json"]));
        response.body = Body::from(body.as_bytes().to_vec());
        response
    }
}

#[async_trait]
impl ClientTransport for RecordingTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop()
            .ok_or_else(|| ClientError::Config("transport script exhausted".to_string()))
    }
}

fn forecast_call(transport_scheme: &str) -> ClientCall<GetForecastInput, GetForecastOutput> {
    let mut signer_properties = TypedProperties::new();
    signer_properties.insert(&SIGNING_PROPERTIES, {
        SigV4SigningProperties {
            date: Some("20150830T123600Z".into()),
            ..SigV4SigningProperties::new("us-east-1", "weather")
        }
    });
    let mut auth_option = AuthOption::new(SIGV4_SCHEME_ID.clone());
    auth_option.signer_properties = signer_properties;

    ClientCall {
        input: any_forecast_input(),
        operation: Ref::new(get_forecast_operation()),
        context: TypedProperties::new(),
        interceptor: InterceptorChain::new(),
        retry_strategy: Ref::new(SimpleRetryStrategy::new(3).with_backoff(
            ExponentialBackoff::with_random(0.0, 0.0, JitterMode::None, Box::new(|| 0.0)),
        )),
        retry_scope: None,
        auth_scheme_resolver: Ref::new(StaticAuthSchemeResolver::new(vec![auth_option])),
        supported_auth_schemes: vec![Ref::new(SigV4AuthScheme::new(
            AwsCredentialsIdentity::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        ))],
        endpoint_resolver: Ref::new(
            StaticEndpointResolver::from_str(&format!("{transport_scheme}://api.example.com"))
                .unwrap(),
        ),
    }
}

#[tokio::test]
async fn signed_request_round_trip() {
    let transport = RecordingTransport::new(vec![RecordingTransport::json(
        200,
        r#"{"city":"anvik","chance_of_rain":0.75}"#,
    )]);
    let pipeline = RequestPipeline::new(HttpBindingProtocol::new(JsonCodec), transport.clone());

    let output = pipeline.send(forecast_call("https")).await.unwrap();

    assert_eq!(output.city, "anvik");
    assert_eq!(output.chance_of_rain, 0.75);
    assert_eq!(output.status, 200);

    let requests = transport.requests.lock();
    let request = &requests[0];
    assert_eq!(request.destination.host(), "api.example.com");
    assert_eq!(request.destination.path(), Some("/forecast/anvik"));
    assert_eq!(request.destination.query(), Some("type=daily&unit=celsius"));
    // SigV4 left its marks.
    let authorization = request.fields.get("Authorization").unwrap().as_string();
    assert!(authorization.starts_with(
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/weather/aws4_request, "
    ));
    assert!(authorization.contains("SignedHeaders="));
    assert!(request.fields.contains("x-amz-date"));
}

#[tokio::test]
async fn modeled_errors_surface_as_typed_errors() {
    let transport = RecordingTransport::new(vec![RecordingTransport::json(
        404,
        r#"{"__type":"example.weather#InvalidCityError","message":"no such city"}"#,
    )]);
    let pipeline = RequestPipeline::new(HttpBindingProtocol::new(JsonCodec), transport);

    let result = pipeline.send(forecast_call("https")).await;
    let Err(ClientError::Modeled(error)) = result else {
        panic!("expected a modeled error, got: {result:?}");
    };
    assert_eq!(error.shape_id().name, "InvalidCityError");
    assert_eq!(error.to_string(), "InvalidCityError: no such city");
}

#[tokio::test]
async fn unknown_errors_become_generic_call_errors() {
    let transport = RecordingTransport::new(vec![RecordingTransport::json(
        500,
        r#"{"__type":"example.weather#MysteryError","message":"???"}"#,
    )]);
    let pipeline = RequestPipeline::new(HttpBindingProtocol::new(JsonCodec), transport);

    let result = pipeline.send(forecast_call("https")).await;
    let Err(ClientError::Call { fault, code, .. }) = result else {
        panic!("expected a call error, got: {result:?}");
    };
    assert_eq!(code, "MysteryError");
    assert_eq!(fault, smithy_rt_core::ErrorFault::Server);
}

#[tokio::test]
async fn retryable_modeled_errors_drive_the_retry_loop() {
    let transport = RecordingTransport::new(vec![
        RecordingTransport::json(
            429,
            r#"{"__type":"example.weather#ThrottlingError","message":"slow down"}"#,
        ),
        RecordingTransport::json(200, r#"{"city":"anvik","chance_of_rain":0.1}"#),
    ]);
    let pipeline = RequestPipeline::new(HttpBindingProtocol::new(JsonCodec), transport.clone());

    let output = pipeline.send(forecast_call("https")).await.unwrap();
    assert_eq!(output.city, "anvik");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

//! Tests of the HTTP binding serializer and deserializer over the JSON
//! codec.

use smithy_rt_core::codecs::Codec;
use smithy_rt_core::schema::prelude::STRING;
use smithy_rt_core::schema::{HttpLabelTrait, HttpTrait, Schema};
use smithy_rt_core::serde::{DeserializeShape, SerializeShape, ShapeSerializer};
use smithy_rt_core::transport::{Body, Field, Response};
use smithy_rt_core::traits;

use smithy_rt_http::serializers::HttpRequestSerializer;
use smithy_rt_http::deserializers::HttpResponseDeserializer;
use smithy_rt_json_codec::JsonCodec;
use smithy_rt_test_utils::{GetForecastInput, GetForecastOutput, any_forecast_input};

fn serialize(
    input: &GetForecastInput,
    http_trait: &HttpTrait,
) -> smithy_rt_core::transport::Request {
    serialize_shape(input, http_trait)
}

#[test]
fn binds_all_request_locations() {
    let http_trait = HttpTrait::new("GET", "/forecast/{city}?type=daily", 200);
    let mut input = any_forecast_input();
    input.request_id = Some("abc-123".to_string());
    input.tags = vec!["a,b".to_string(), "c".to_string()];
    input
        .metadata
        .insert("color".to_string(), "blue".to_string());
    input.notes = Some("warm".to_string());

    let request = serialize(&input, &http_trait);

    assert_eq!(request.method, "GET");
    assert_eq!(request.destination.path(), Some("/forecast/anvik"));
    // Pattern query defaults come first, member params after.
    assert_eq!(
        request.destination.query(),
        Some("type=daily&unit=celsius")
    );
    assert_eq!(
        request.fields.get("x-request-id").unwrap().as_string(),
        "abc-123"
    );
    // List members produce one field with multiple values.
    assert_eq!(
        request.fields.get("x-tags").unwrap().values(),
        ["a,b", "c"]
    );
    assert_eq!(
        request.fields.get("x-tags").unwrap().as_string(),
        "\"a,b\", c"
    );
    // Map members produce one field per entry under the prefix.
    assert_eq!(
        request.fields.get("x-meta-color").unwrap().as_string(),
        "blue"
    );
    assert_eq!(
        request.fields.get("content-type").unwrap().as_string(),
        "application/json"
    );
    // Only the body-bound member lands in the payload.
    assert_eq!(request.body.bytes().unwrap().as_ref(), br#"{"notes":"warm"}"#);
    // The destination host holds only the (empty) host prefix.
    assert_eq!(request.destination.host(), "");
}

#[test]
fn greedy_and_non_greedy_labels() {
    #[derive(Debug)]
    struct LabelInput {
        label: String,
    }
    impl SerializeShape for LabelInput {
        fn schema(&self) -> &smithy_rt_core::schema::SchemaRef {
            static SCHEMA: std::sync::LazyLock<smithy_rt_core::schema::SchemaRef> =
                std::sync::LazyLock::new(|| {
                    Schema::structure_builder("test#LabelInput", traits![])
                        .put_member("label", &STRING, traits![HttpLabelTrait])
                        .build()
                });
            &SCHEMA
        }
        fn serialize(
            &self,
            serializer: &mut dyn ShapeSerializer,
        ) -> Result<(), smithy_rt_core::SerdeError> {
            let schema = self.schema().clone();
            serializer.write_struct(&schema, &mut |members| {
                members.write_string(schema.expect_member("label"), &self.label)
            })
        }
    }

    let input = LabelInput {
        label: "a/b/c".to_string(),
    };

    // Greedy labels keep their separators unencoded.
    let greedy = HttpTrait::new("POST", "/{label+}", 200);
    let request = serialize_shape(&input, &greedy);
    assert_eq!(request.destination.path(), Some("/a/b/c"));

    // Non-greedy labels percent-encode them.
    let plain = HttpTrait::new("POST", "/{label}", 200);
    let request = serialize_shape(&input, &plain);
    assert_eq!(request.destination.path(), Some("/a%2Fb%2Fc"));
}

fn serialize_shape(
    input: &impl SerializeShape,
    http_trait: &HttpTrait,
) -> smithy_rt_core::transport::Request {
    let codec = JsonCodec;
    let mut serializer = HttpRequestSerializer::new(&codec, http_trait, None);
    input.serialize(&mut serializer).unwrap();
    serializer.result.take().unwrap()
}

#[test]
fn deserializes_response_locations() {
    let codec = JsonCodec;
    let mut response = Response::new(203);
    response
        .fields
        .set_field(Field::with_values("x-server", ["unit-test"]));
    response.body = Body::from(br#"{"city":"anvik","chance_of_rain":0.25}"#.to_vec());

    let body = Some(bytes::Bytes::from_static(
        br#"{"city":"anvik","chance_of_rain":0.25}"#,
    ));
    let mut deserializer = HttpResponseDeserializer::new(&codec, &mut response, body);
    let output = GetForecastOutput::deserialize(&mut deserializer).unwrap();

    assert_eq!(output.status, 203);
    assert_eq!(output.server.as_deref(), Some("unit-test"));
    assert_eq!(output.city, "anvik");
    assert_eq!(output.chance_of_rain, 0.25);
}

#[test]
fn round_trips_body_members_through_the_codec() {
    let codec = JsonCodec;
    let http_trait = HttpTrait::new("GET", "/forecast/{city}", 200);
    let mut input = any_forecast_input();
    input.notes = Some("pack an umbrella".to_string());

    let request = serialize(&input, &http_trait);
    let body = request.body.bytes().unwrap().clone();

    // The body is valid codec output holding exactly the body members.
    let mut deserializer = codec.create_deserializer(&body).unwrap();
    let mut notes = None;
    deserializer
        .read_struct(input.schema(), &mut |member, de| {
            if member.member_name() == Some("notes") {
                notes = Some(de.read_string(member)?);
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(notes.as_deref(), Some("pack an umbrella"));
}

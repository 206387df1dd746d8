//! Round-trip tests through the JSON codec.

use smithy_rt_core::codecs::Codec;
use smithy_rt_core::schema::Document;
use smithy_rt_core::serde::{DeserializeShape, SerializeShape};

use smithy_rt_json_codec::JsonCodec;
use smithy_rt_test_utils::ChatMessage;

fn encode(shape: &impl SerializeShape) -> Vec<u8> {
    let codec = JsonCodec;
    let mut sink = Vec::new();
    {
        let mut serializer = codec.create_serializer(&mut sink);
        shape.serialize(serializer.as_mut()).unwrap();
        serializer.flush().unwrap();
    }
    sink
}

fn decode<T: DeserializeShape>(source: &[u8]) -> T {
    let codec = JsonCodec;
    let mut deserializer = codec.create_deserializer(source).unwrap();
    T::deserialize(deserializer.as_mut()).unwrap()
}

#[test]
fn shape_round_trip() {
    let message = ChatMessage {
        message: "hello, \"world\"".to_string(),
    };
    let encoded = encode(&message);
    assert_eq!(encoded, br#"{"message":"hello, \"world\""}"#);

    let decoded: ChatMessage = decode(&encoded);
    assert_eq!(decoded, message);
}

#[test]
fn unknown_members_are_tolerated() {
    let decoded: ChatMessage = decode(br#"{"message":"hi","extra":[1,2,3]}"#);
    assert_eq!(decoded.message, "hi");
}

#[test]
fn document_round_trip_preserves_equality() {
    let message = ChatMessage {
        message: "doc".to_string(),
    };
    // Shape -> document -> shape -> document is stable modulo
    // unknown-member retention.
    let document = Document::from_shape(&message).unwrap();
    let decoded: ChatMessage = document.as_shape().unwrap();
    let document_again = Document::from_shape(&decoded).unwrap();
    assert_eq!(document, document_again);
}

#[test]
fn codec_media_type() {
    assert_eq!(JsonCodec.media_type(), "application/json");
}

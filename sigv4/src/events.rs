//! Chained signing for event-stream messages.

use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use smithy_rt_core::{Ref, Timestamp};

use crate::identity::AwsCredentialsIdentity;
use crate::signer::{
    SigV4SigningProperties, SigningError, derive_signing_key, format_sigv4_date, hmac_sha256,
    scope,
};

/// A header carried by an event-stream message.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHeader {
    pub name: String,
    pub value: EventHeaderValue,
}

impl EventHeader {
    pub fn new(name: impl Into<String>, value: EventHeaderValue) -> Self {
        EventHeader {
            name: name.into(),
            value,
        }
    }
}

/// Values representable in event-stream headers.
#[derive(Debug, Clone, PartialEq)]
pub enum EventHeaderValue {
    Bool(bool),
    String(String),
    Bytes(Bytes),
    Timestamp(Timestamp),
}

/// A single event-stream message: modeled headers plus an opaque payload.
///
/// Frame encoding and decoding is provided by an external event codec; the
/// signer only attaches the `:date` and `:chunk-signature` headers.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub headers: Vec<EventHeader>,
    pub payload: Bytes,
}

impl EventMessage {
    pub fn new(headers: Vec<EventHeader>, payload: Bytes) -> Self {
        EventMessage { headers, payload }
    }
}

/// Encodes event headers into their wire form.
///
/// Implemented by the external event codec; the signer uses it to encode
/// the headers-only `:date` frame that is part of the signed material.
pub trait EncodeEventHeaders: Send + Sync {
    fn encode_headers(&self, headers: &[EventHeader]) -> Vec<u8>;
}

type Clock = Box<dyn Fn() -> Timestamp + Send + Sync>;

/// Signs the messages of an event stream with chained signatures.
///
/// Each event's signature is linked to the prior one: event N carries a
/// prior-signature equal to the hex-encoded signature of event N-1, and
/// event 0's prior is the request's `Authorization`-header signature. A
/// mutex serializes sign calls so only one signature is computed at a time
/// per stream; the prior-signature update is the last step inside the
/// critical section.
pub struct EventSigner {
    signing_properties: SigV4SigningProperties,
    identity: AwsCredentialsIdentity,
    encoder: Ref<dyn EncodeEventHeaders>,
    prior_signature: Mutex<String>,
    clock: Clock,
}

impl EventSigner {
    pub fn new(
        signing_properties: SigV4SigningProperties,
        identity: AwsCredentialsIdentity,
        initial_signature: String,
        encoder: Ref<dyn EncodeEventHeaders>,
    ) -> Self {
        EventSigner {
            signing_properties,
            identity,
            encoder,
            prior_signature: Mutex::new(initial_signature),
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the monotonic timestamp source, for deterministic tests.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sign a single event, attaching `:date` and `:chunk-signature`.
    pub fn sign_event(&self, mut event: EventMessage) -> Result<EventMessage, SigningError> {
        let mut prior_signature = self.prior_signature.lock();

        let now = (self.clock)();
        let timestamp = format_sigv4_date(&now);
        let mut properties = self.signing_properties.clone();
        properties.date = Some(timestamp.clone());

        let date_header = EventHeader::new(":date", EventHeaderValue::Timestamp(now));
        let encoded_headers = self.encoder.encode_headers(std::slice::from_ref(&date_header));

        let string_to_sign = event_string_to_sign(
            &timestamp,
            &scope(&properties)?,
            &prior_signature,
            &encoded_headers,
            &event.payload,
        );
        let key = derive_signing_key(
            &self.identity.secret_access_key,
            &timestamp[..8],
            &properties.region,
            &properties.service,
        );
        let signature = hmac_sha256(&key, string_to_sign.as_bytes());

        event.headers.push(date_header);
        event.headers.push(EventHeader::new(
            ":chunk-signature",
            EventHeaderValue::Bytes(Bytes::from(signature.clone())),
        ));

        // The new prior signature must be set before releasing the lock.
        *prior_signature = hex::encode(signature);
        Ok(event)
    }
}

fn event_string_to_sign(
    timestamp: &str,
    scope: &str,
    prior_signature: &str,
    encoded_headers: &[u8],
    payload: &[u8],
) -> String {
    format!(
        "AWS4-HMAC-SHA256-PAYLOAD\n{timestamp}\n{scope}\n{prior_signature}\n{}\n{}",
        hex::encode(Sha256::digest(encoded_headers)),
        hex::encode(Sha256::digest(payload)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct StubEncoder;
    impl EncodeEventHeaders for StubEncoder {
        fn encode_headers(&self, headers: &[EventHeader]) -> Vec<u8> {
            let mut out = Vec::new();
            for header in headers {
                out.extend_from_slice(header.name.as_bytes());
                if let EventHeaderValue::Timestamp(ts) = &header.value {
                    out.extend_from_slice(ts.timestamp_millis().to_be_bytes().as_ref());
                }
            }
            out
        }
    }

    fn signer_with_initial(initial: &str) -> EventSigner {
        let properties = SigV4SigningProperties::new("us-east-1", "service");
        let identity = AwsCredentialsIdentity::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        );
        EventSigner::new(
            properties,
            identity,
            initial.to_string(),
            Ref::new(StubEncoder),
        )
        .with_clock(|| chrono::Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap())
    }

    fn chunk_signature(event: &EventMessage) -> Bytes {
        let header = event
            .headers
            .iter()
            .find(|h| h.name == ":chunk-signature")
            .expect("event is signed");
        match &header.value {
            EventHeaderValue::Bytes(bytes) => bytes.clone(),
            other => panic!("unexpected signature value: {other:?}"),
        }
    }

    #[test]
    fn signatures_form_a_strict_chain() {
        let signer = signer_with_initial("f00d");

        let payloads: [&'static [u8]; 3] = [b"one", b"two", b"three"];
        let mut prior = "f00d".to_string();
        for payload in payloads {
            let event = EventMessage::new(vec![], Bytes::from_static(payload));
            let signed = signer.sign_event(event).unwrap();
            let signature = chunk_signature(&signed);

            // Recompute the expected signature from the observable chain.
            let timestamp = "20150830T123600Z";
            let date_header = EventHeader::new(
                ":date",
                EventHeaderValue::Timestamp(
                    chrono::Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
                ),
            );
            let encoded = StubEncoder.encode_headers(std::slice::from_ref(&date_header));
            let sts = event_string_to_sign(
                timestamp,
                "20150830/us-east-1/service/aws4_request",
                &prior,
                &encoded,
                payload,
            );
            let key = derive_signing_key(
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                "20150830",
                "us-east-1",
                "service",
            );
            let expected = hmac_sha256(&key, sts.as_bytes());
            assert_eq!(&signature[..], &expected[..]);

            prior = hex::encode(expected);
        }
    }

    #[test]
    fn signed_events_carry_date_and_signature_headers() {
        let signer = signer_with_initial("f00d");
        let event = EventMessage::new(
            vec![EventHeader::new(
                ":event-type",
                EventHeaderValue::String("message".into()),
            )],
            Bytes::from_static(b"payload"),
        );
        let signed = signer.sign_event(event).unwrap();
        let names: Vec<&str> = signed.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, [":event-type", ":date", ":chunk-signature"]);
    }
}

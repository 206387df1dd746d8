//! The SigV4 auth scheme for the request pipeline.

use std::sync::LazyLock;

use async_trait::async_trait;

use smithy_rt_core::ClientError;
use smithy_rt_core::auth::{AuthScheme, Sign};
use smithy_rt_core::identity::{Identity, ResolveIdentity, SharedIdentity};
use smithy_rt_core::schema::ShapeId;
use smithy_rt_core::transport::Request;
use smithy_rt_core::types::{PropertyKey, TypedProperties};
use smithy_rt_core::Ref;

use crate::events::{EncodeEventHeaders, EventSigner};
use crate::identity::AwsCredentialsIdentity;
use crate::signer::{SigV4Signer, SigV4SigningProperties};

/// The shape ID of the SigV4 auth scheme.
pub static SIGV4_SCHEME_ID: LazyLock<ShapeId> = LazyLock::new(|| ShapeId::from("aws.auth#sigv4"));

/// Signer properties carried on the resolved auth option.
pub const SIGNING_PROPERTIES: PropertyKey<SigV4SigningProperties> =
    PropertyKey::new("sigv4_signing_properties");

/// The chained event signer the request signer leaves in the call context
/// for signed event streams.
pub const EVENT_SIGNER: PropertyKey<EventSigner> = PropertyKey::new("sigv4_event_signer");

/// Resolves a fixed set of AWS credentials.
struct StaticCredentialsResolver {
    identity: SharedIdentity,
}

#[async_trait]
impl ResolveIdentity for StaticCredentialsResolver {
    async fn resolve_identity(
        &self,
        _identity_properties: &TypedProperties,
    ) -> Result<SharedIdentity, ClientError> {
        if self.identity.is_expired() {
            return Err(ClientError::Identity(
                "the configured credentials have expired".to_string(),
            ));
        }
        Ok(self.identity.clone())
    }
}

/// The request signer half of the scheme.
struct SigV4HttpSigner {
    signer: SigV4Signer,
    event_encoder: Option<Ref<dyn EncodeEventHeaders>>,
}

#[async_trait]
impl Sign for SigV4HttpSigner {
    async fn sign(
        &self,
        request: Request,
        identity: &SharedIdentity,
        signer_properties: &TypedProperties,
        context: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        let credentials = identity
            .as_any()
            .downcast_ref::<AwsCredentialsIdentity>()
            .ok_or_else(|| {
                ClientError::Auth("the SigV4 signer requires AWS credentials".to_string())
            })?;
        let properties = signer_properties
            .get(&SIGNING_PROPERTIES)
            .ok_or_else(|| ClientError::Auth("missing SigV4 signing properties".to_string()))?;

        let signed = self
            .signer
            .sign(request, credentials, properties)
            .await
            .map_err(|e| ClientError::Auth(e.to_string()))?;

        // When the operation opens a signed event stream, seed a chained
        // event signer with the request signature so the first event links
        // back to it.
        if let Some(encoder) = &self.event_encoder {
            context.insert(
                &EVENT_SIGNER,
                EventSigner::new(
                    properties.clone(),
                    credentials.clone(),
                    signed.signature.clone(),
                    encoder.clone(),
                ),
            );
        }

        Ok(signed.request)
    }
}

/// Binds the SigV4 identity resolver and signers into an auth scheme.
pub struct SigV4AuthScheme {
    identity_resolver: Ref<dyn ResolveIdentity>,
    signer: Ref<dyn Sign>,
}

impl SigV4AuthScheme {
    /// Scheme over a fixed set of credentials, without event signing.
    pub fn new(credentials: AwsCredentialsIdentity) -> Self {
        Self::with_resolver(Ref::new(StaticCredentialsResolver {
            identity: Ref::new(credentials),
        }))
    }

    /// Scheme over a custom identity resolver.
    pub fn with_resolver(identity_resolver: Ref<dyn ResolveIdentity>) -> Self {
        SigV4AuthScheme {
            identity_resolver,
            signer: Ref::new(SigV4HttpSigner {
                signer: SigV4Signer,
                event_encoder: None,
            }),
        }
    }

    /// Enable event-stream signing with the given header encoder.
    #[must_use]
    pub fn with_event_encoder(mut self, encoder: Ref<dyn EncodeEventHeaders>) -> Self {
        self.signer = Ref::new(SigV4HttpSigner {
            signer: SigV4Signer,
            event_encoder: Some(encoder),
        });
        self
    }
}

impl AuthScheme for SigV4AuthScheme {
    fn scheme_id(&self) -> &ShapeId {
        &SIGV4_SCHEME_ID
    }

    fn identity_resolver(&self) -> Ref<dyn ResolveIdentity> {
        self.identity_resolver.clone()
    }

    fn signer(&self) -> Ref<dyn Sign> {
        self.signer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_rt_core::transport::Uri;

    fn credentials() -> AwsCredentialsIdentity {
        AwsCredentialsIdentity::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    #[tokio::test]
    async fn scheme_signs_requests_end_to_end() {
        let scheme = SigV4AuthScheme::new(credentials());
        let identity = scheme
            .identity_resolver()
            .resolve_identity(&TypedProperties::new())
            .await
            .unwrap();

        let mut signer_properties = TypedProperties::new();
        signer_properties.insert(&SIGNING_PROPERTIES, {
            SigV4SigningProperties {
                date: Some("20150830T123600Z".into()),
                ..SigV4SigningProperties::new("us-east-1", "service")
            }
        });

        let uri = Uri::builder()
            .scheme("https")
            .host("example.com")
            .path("/")
            .build()
            .unwrap();
        let request = Request::new("GET", uri);
        let mut context = TypedProperties::new();
        let signed = scheme
            .signer()
            .sign(request, &identity, &signer_properties, &mut context)
            .await
            .unwrap();
        assert!(signed.fields.contains("Authorization"));
        assert!(context.get(&EVENT_SIGNER).is_none());
    }
}

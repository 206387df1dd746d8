//! API key authentication for HTTP requests.

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::LazyLock;

use async_trait::async_trait;

use smithy_rt_core::ClientError;
use smithy_rt_core::auth::{AuthScheme, Sign};
use smithy_rt_core::identity::{Identity, ResolveIdentity, SharedIdentity};
use smithy_rt_core::schema::ShapeId;
use smithy_rt_core::transport::{Field, Request};
use smithy_rt_core::types::{API_KEY, PropertyKey, TypedProperties};
use smithy_rt_core::utils::url_encode_component;
use smithy_rt_core::Ref;

/// The shape ID of the API key auth scheme.
pub static API_KEY_SCHEME_ID: LazyLock<ShapeId> =
    LazyLock::new(|| ShapeId::from("smithy.api#httpApiKeyAuth"));

/// A custom identity resolver placed in the per-call context.
pub const API_KEY_IDENTITY_RESOLVER: PropertyKey<Ref<dyn ResolveIdentity>> =
    PropertyKey::new("api_key_identity_resolver");

/// The resolved API key identity.
pub struct ApiKeyIdentity {
    api_key: String,
}

impl ApiKeyIdentity {
    pub fn new(api_key: impl Into<String>) -> Self {
        ApiKeyIdentity {
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl Debug for ApiKeyIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // The key itself never appears in debug output.
        f.debug_struct("ApiKeyIdentity").finish_non_exhaustive()
    }
}

impl Identity for ApiKeyIdentity {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Resolves the API key from the `api_key` context property.
pub struct ApiKeyIdentityResolver;

#[async_trait]
impl ResolveIdentity for ApiKeyIdentityResolver {
    async fn resolve_identity(
        &self,
        identity_properties: &TypedProperties,
    ) -> Result<SharedIdentity, ClientError> {
        let api_key = identity_properties.get(&API_KEY).ok_or_else(|| {
            ClientError::Identity("no api_key was found in the call context".to_string())
        })?;
        Ok(Ref::new(ApiKeyIdentity::new(api_key.clone())))
    }
}

/// Where the API key is placed on the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Applies an API key to a request header or query parameter.
pub struct ApiKeySigner {
    name: String,
    location: ApiKeyLocation,
    scheme: Option<String>,
}

#[async_trait]
impl Sign for ApiKeySigner {
    async fn sign(
        &self,
        mut request: Request,
        identity: &SharedIdentity,
        _signer_properties: &TypedProperties,
        _context: &mut TypedProperties,
    ) -> Result<Request, ClientError> {
        let identity = identity
            .as_any()
            .downcast_ref::<ApiKeyIdentity>()
            .ok_or_else(|| {
                ClientError::Auth("the api-key signer requires an API key identity".to_string())
            })?;

        match self.location {
            ApiKeyLocation::Header => {
                let value = match &self.scheme {
                    Some(scheme) => format!("{scheme} {}", identity.api_key()),
                    None => identity.api_key().to_string(),
                };
                request.fields.set_field(Field::with_values(&self.name, [value]));
            }
            ApiKeyLocation::Query => {
                let param = format!(
                    "{}={}",
                    url_encode_component(&self.name),
                    url_encode_component(identity.api_key())
                );
                let query = match request.destination.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{param}"),
                    _ => param,
                };
                request.destination = request
                    .destination
                    .with_target(request.destination.path().map(str::to_string), Some(query));
            }
        }
        Ok(request)
    }
}

/// Binds the API key identity resolver and signer into an auth scheme.
pub struct ApiKeyAuthScheme {
    resolver: Ref<dyn ResolveIdentity>,
    signer: Ref<dyn Sign>,
}

impl ApiKeyAuthScheme {
    /// Scheme placing the key in the named location.
    pub fn new(name: impl Into<String>, location: ApiKeyLocation, scheme: Option<String>) -> Self {
        ApiKeyAuthScheme {
            resolver: Ref::new(ApiKeyIdentityResolver),
            signer: Ref::new(ApiKeySigner {
                name: name.into(),
                location,
                scheme,
            }),
        }
    }

    /// Replace the identity resolver, e.g. with one from the call context.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Ref<dyn ResolveIdentity>) -> Self {
        self.resolver = resolver;
        self
    }
}

impl AuthScheme for ApiKeyAuthScheme {
    fn scheme_id(&self) -> &ShapeId {
        &API_KEY_SCHEME_ID
    }

    fn identity_resolver(&self) -> Ref<dyn ResolveIdentity> {
        self.resolver.clone()
    }

    fn signer(&self) -> Ref<dyn Sign> {
        self.signer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithy_rt_core::transport::Uri;

    #[tokio::test]
    async fn applies_header_key_with_scheme() {
        let scheme = ApiKeyAuthScheme::new(
            "Authorization",
            ApiKeyLocation::Header,
            Some("ApiKey".to_string()),
        );
        let mut identity_properties = TypedProperties::new();
        identity_properties.insert(&API_KEY, "secret".to_string());
        let identity = scheme
            .identity_resolver()
            .resolve_identity(&identity_properties)
            .await
            .unwrap();

        let request = Request::new("GET", Uri::builder().host("example.com").build().unwrap());
        let mut context = TypedProperties::new();
        let signed = scheme
            .signer()
            .sign(request, &identity, &TypedProperties::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(
            signed.fields.get("authorization").unwrap().as_string(),
            "ApiKey secret"
        );
    }

    #[tokio::test]
    async fn applies_query_key() {
        let scheme = ApiKeyAuthScheme::new("api_key", ApiKeyLocation::Query, None);
        let mut identity_properties = TypedProperties::new();
        identity_properties.insert(&API_KEY, "se cret".to_string());
        let identity = scheme
            .identity_resolver()
            .resolve_identity(&identity_properties)
            .await
            .unwrap();

        let uri = Uri::builder()
            .host("example.com")
            .path("/")
            .query("a=1")
            .build()
            .unwrap();
        let request = Request::new("GET", uri);
        let mut context = TypedProperties::new();
        let signed = scheme
            .signer()
            .sign(request, &identity, &TypedProperties::new(), &mut context)
            .await
            .unwrap();
        assert_eq!(signed.destination.query(), Some("a=1&api_key=se%20cret"));
    }
}

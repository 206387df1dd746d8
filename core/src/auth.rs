//! Auth scheme resolution interfaces.
//!
//! An [`AuthScheme`] binds a scheme ID to an identity resolver and a
//! request signer. Resolvers propose an ordered list of [`AuthOption`]s and
//! the pipeline picks the first proposed scheme that the client supports.

use async_trait::async_trait;

use crate::identity::{ResolveIdentity, SharedIdentity};
use crate::schema::{ApiOperation, ShapeId};
use crate::transport::Request;
use crate::types::TypedProperties;
use crate::{ClientError, Ref};

/// A resolved authentication option for an operation.
#[derive(Debug, Clone)]
pub struct AuthOption {
    pub scheme_id: ShapeId,
    pub identity_properties: TypedProperties,
    pub signer_properties: TypedProperties,
}

impl AuthOption {
    pub fn new(scheme_id: impl Into<ShapeId>) -> Self {
        AuthOption {
            scheme_id: scheme_id.into(),
            identity_properties: TypedProperties::new(),
            signer_properties: TypedProperties::new(),
        }
    }
}

/// Parameters handed to an auth scheme resolver.
///
/// The context bag carries anything the resolver needs beyond the basics;
/// auth schemes can come with interceptors that set those properties.
pub struct AuthParams<'a> {
    pub protocol_id: &'a ShapeId,
    pub operation: &'a ApiOperation,
    pub context: &'a TypedProperties,
}

/// Resolves the ordered auth options an operation may use.
pub trait ResolveAuthScheme: Send + Sync {
    fn resolve_auth_schemes(&self, params: &AuthParams<'_>) -> Result<Vec<AuthOption>, ClientError>;
}

/// Proposes a fixed list of auth options for every operation.
pub struct StaticAuthSchemeResolver {
    options: Vec<AuthOption>,
}

impl StaticAuthSchemeResolver {
    pub fn new(options: Vec<AuthOption>) -> Self {
        StaticAuthSchemeResolver { options }
    }
}

impl ResolveAuthScheme for StaticAuthSchemeResolver {
    fn resolve_auth_schemes(
        &self,
        _params: &AuthParams<'_>,
    ) -> Result<Vec<AuthOption>, ClientError> {
        Ok(self.options.clone())
    }
}

/// Signs a transport request on behalf of an auth scheme.
#[async_trait]
pub trait Sign: Send + Sync {
    /// Sign the request with the resolved identity.
    ///
    /// The signed request is returned; signers that support event streams
    /// may record per-stream state (such as an event signer seeded with the
    /// request signature) into the mutable call context.
    async fn sign(
        &self,
        request: Request,
        identity: &SharedIdentity,
        signer_properties: &TypedProperties,
        context: &mut TypedProperties,
    ) -> Result<Request, ClientError>;
}

/// An auth scheme supported by the client.
pub trait AuthScheme: Send + Sync {
    /// The unique identifier of this scheme.
    fn scheme_id(&self) -> &ShapeId;

    /// The resolver producing identities for this scheme.
    fn identity_resolver(&self) -> Ref<dyn ResolveIdentity>;

    /// The signer applying this scheme to requests.
    fn signer(&self) -> Ref<dyn Sign>;
}

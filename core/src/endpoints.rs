//! Endpoint resolution interfaces.

use async_trait::async_trait;

use crate::schema::ApiOperation;
use crate::transport::{Endpoint, Uri};
use crate::types::{ENDPOINT_URI, TypedProperties};
use crate::ClientError;

/// Parameters handed to an endpoint resolver.
pub struct EndpointResolverParams<'a> {
    pub operation: &'a ApiOperation,
    pub context: &'a TypedProperties,
}

/// Resolves the service endpoint for an operation attempt.
#[async_trait]
pub trait ResolveEndpoint: Send + Sync {
    async fn resolve_endpoint(
        &self,
        params: EndpointResolverParams<'_>,
    ) -> Result<Endpoint, ClientError>;
}

/// Resolves a fixed endpoint, honoring the per-call `endpoint_uri` override.
pub struct StaticEndpointResolver {
    uri: Uri,
}

impl StaticEndpointResolver {
    pub fn new(uri: Uri) -> Self {
        StaticEndpointResolver { uri }
    }

    pub fn from_str(uri: &str) -> Result<Self, ClientError> {
        Ok(StaticEndpointResolver {
            uri: Uri::parse(uri).map_err(|e| ClientError::EndpointResolution(e.to_string()))?,
        })
    }
}

#[async_trait]
impl ResolveEndpoint for StaticEndpointResolver {
    async fn resolve_endpoint(
        &self,
        params: EndpointResolverParams<'_>,
    ) -> Result<Endpoint, ClientError> {
        let uri = params
            .context
            .get(&ENDPOINT_URI)
            .cloned()
            .unwrap_or_else(|| self.uri.clone());
        Ok(Endpoint::new(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::traits;

    fn operation() -> ApiOperation {
        ApiOperation::new(
            Schema::create_operation("test#Operation", traits![]),
            Schema::structure_builder("test#Input", traits![]).build(),
            Schema::structure_builder("test#Output", traits![]).build(),
        )
    }

    #[tokio::test]
    async fn context_override_wins() {
        let resolver = StaticEndpointResolver::from_str("https://default.example.com").unwrap();
        let mut context = TypedProperties::new();
        context.insert(
            &ENDPOINT_URI,
            Uri::parse("https://override.example.com").unwrap(),
        );
        let operation = operation();
        let endpoint = resolver
            .resolve_endpoint(EndpointResolverParams {
                operation: &operation,
                context: &context,
            })
            .await
            .unwrap();
        assert_eq!(endpoint.uri.host(), "override.example.com");
    }
}

//! Identity resolution interfaces and caching.

use std::any::Any;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::types::TypedProperties;
use crate::{ClientError, Ref, Timestamp};

/// A resolved identity, such as a set of credentials or an API key.
pub trait Identity: Debug + Send + Sync + 'static {
    /// When the identity stops being valid, if it expires at all.
    fn expiration(&self) -> Option<Timestamp> {
        None
    }

    /// True if the identity is past its expiration.
    fn is_expired(&self) -> bool {
        self.expiration().is_some_and(|exp| exp <= Utc::now())
    }

    /// Downcast support for signers that need the concrete identity type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a resolved identity.
pub type SharedIdentity = Ref<dyn Identity>;

/// Resolves an identity for an auth scheme.
#[async_trait]
pub trait ResolveIdentity: Send + Sync {
    /// Resolve an identity using the option's identity properties.
    async fn resolve_identity(
        &self,
        identity_properties: &TypedProperties,
    ) -> Result<SharedIdentity, ClientError>;
}

/// An identity resolver that caches the resolved identity.
///
/// The first resolution populates the cache and later concurrent resolvers
/// observe the same value; on expiry any one resolver may refresh.
pub struct IdentityCache {
    resolver: Ref<dyn ResolveIdentity>,
    cached: Mutex<Option<SharedIdentity>>,
}

impl IdentityCache {
    pub fn new(resolver: Ref<dyn ResolveIdentity>) -> Self {
        IdentityCache {
            resolver,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ResolveIdentity for IdentityCache {
    async fn resolve_identity(
        &self,
        identity_properties: &TypedProperties,
    ) -> Result<SharedIdentity, ClientError> {
        if let Some(identity) = self.cached.lock().as_ref()
            && !identity.is_expired()
        {
            return Ok(identity.clone());
        }

        let resolved = self.resolver.resolve_identity(identity_properties).await?;

        // Single writer wins: a resolution that raced with ours keeps the
        // value it stored unless it has expired.
        let mut cached = self.cached.lock();
        match cached.as_ref() {
            Some(existing) if !existing.is_expired() => Ok(existing.clone()),
            _ => {
                *cached = Some(resolved.clone());
                Ok(resolved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestIdentity(u32);
    impl Identity for TestIdentity {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct CountingResolver(AtomicU32);

    #[async_trait]
    impl ResolveIdentity for CountingResolver {
        async fn resolve_identity(
            &self,
            _identity_properties: &TypedProperties,
        ) -> Result<SharedIdentity, ClientError> {
            let count = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Ref::new(TestIdentity(count)))
        }
    }

    #[tokio::test]
    async fn cache_resolves_once() {
        let cache = IdentityCache::new(Ref::new(CountingResolver(AtomicU32::new(0))));
        let properties = TypedProperties::new();
        let first = cache.resolve_identity(&properties).await.unwrap();
        let second = cache.resolve_identity(&properties).await.unwrap();
        let first = first.as_any().downcast_ref::<TestIdentity>().unwrap();
        let second = second.as_any().downcast_ref::<TestIdentity>().unwrap();
        assert_eq!(first.0, second.0);
    }
}

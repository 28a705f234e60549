//! A [ServiceResolver] decorator remembering the first resolved instance of every service.
//!
//! [CachedServiceResolver] gives a stronger guarantee than lifetimes do: within one wrapper, each
//! service is resolved at most once, even if it's registered as transient. This is only safe for a
//! bounded scope of work (e.g. a single request), since cached instances live as long as the
//! wrapper and are never disposed by it.

use crate::error::ResolveError;
use crate::provider::{ResolvedService, ServiceResolver};
use crate::service_id::ServiceId;
use dashmap::DashMap;
use fxhash::FxBuildHasher;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::trace;

type ResolvedServiceCell = Arc<OnceCell<ResolvedService>>;

/// Caching wrapper over another [ServiceResolver]. Concurrent resolutions of the same service
/// block until the first one finishes and share its result. Failed resolutions are not cached -
/// the next caller will try again.
pub struct CachedServiceResolver<R> {
    resolver: R,
    cache: DashMap<ServiceId, ResolvedServiceCell, FxBuildHasher>,
}

impl<R: ServiceResolver> CachedServiceResolver<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            cache: DashMap::default(),
        }
    }

    #[inline]
    pub fn inner(&self) -> &R {
        &self.resolver
    }

    /// Number of services with a cached instance.
    pub fn len(&self) -> usize {
        self.cache
            .iter()
            .filter(|cell| cell.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: ServiceResolver> ServiceResolver for CachedServiceResolver<R> {
    fn resolve_any(&self, service: &ServiceId) -> Result<ResolvedService, ResolveError> {
        // the shard lock must not be held while resolving, since resolution can recurse into
        // this wrapper
        let cell = Arc::clone(&self.cache.entry(service.clone()).or_default());

        if let Some(resolved) = cell.get() {
            trace!(%service, "Using cached service");
            return Ok(resolved.clone());
        }

        cell.get_or_try_init(|| self.resolver.resolve_any(service))
            .cloned()
    }

    fn resolve_all_any(&self, service: &ServiceId) -> Result<Vec<ResolvedService>, ResolveError> {
        self.resolver.resolve_all_any(service)
    }
}

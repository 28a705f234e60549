//! Service instances are contained in [Scope]s - containers which decide when to reuse or create
//! an instance. The root [ServiceProvider](crate::provider::ServiceProvider) owns a scope for
//! singletons, each provider scope owns one for scoped services, while transient services never
//! get stored.
//!
//! Note: lifetimes are enforced at resolution time, which can lead to unexpected consequences if
//! incompatible lifetimes are mixed together, e.g. a singleton service can depend on a transient
//! one. In such case, when creating the singleton, a new instance of the dependency will be
//! created, but then that single instance will live as long as the singleton lives.

use crate::error::ResolveError;
use crate::instance::ServiceInstanceAnyPtr;
use crate::service_id::{ServiceId, TypeRef};
use fxhash::FxHashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// Identity of a stored instance: the implementation type registered under a given service.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InstanceKey {
    pub service: ServiceId,
    pub implementation_type: TypeRef,
}

/// Creates a new instance for a scope.
pub type InstanceFactory<'a> = dyn FnMut() -> Result<ServiceInstanceAnyPtr, ResolveError> + 'a;

/// A scope containing service instances. See module documentation for information on scopes.
pub trait Scope {
    /// Gets an instance stored for the given key, if available in this scope.
    fn instance(&self, key: &InstanceKey) -> Option<ServiceInstanceAnyPtr>;

    /// Gets the instance stored for the given key, creating it if missing. Scopes storing
    /// instances run the factory at most once per key: concurrent callers wait for the first
    /// creation and share its result. A failed creation is not stored.
    fn instance_or_create(
        &self,
        key: &InstanceKey,
        factory: &mut InstanceFactory<'_>,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError>;
}

type InstanceCell = Arc<OnceCell<ServiceInstanceAnyPtr>>;

/// Scope keeping instances for its whole lifetime. Used for both singletons and scoped services -
/// the difference lies in which provider owns it.
#[derive(Default)]
pub struct SharedScope {
    instances: Mutex<FxHashMap<InstanceKey, InstanceCell>>,
}

impl SharedScope {
    /// Number of created instances.
    pub fn len(&self) -> usize {
        self.instances
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scope for SharedScope {
    #[inline]
    fn instance(&self, key: &InstanceKey) -> Option<ServiceInstanceAnyPtr> {
        self.instances
            .lock()
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    fn instance_or_create(
        &self,
        key: &InstanceKey,
        factory: &mut InstanceFactory<'_>,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        // the map lock is released before creating, since factories resolve other instances
        let cell = self
            .instances
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        cell.get_or_try_init(factory).cloned()
    }
}

/// A scope which creates a new instance on each request.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct TransientScope;

impl Scope for TransientScope {
    #[inline]
    fn instance(&self, _key: &InstanceKey) -> Option<ServiceInstanceAnyPtr> {
        None
    }

    #[inline]
    fn instance_or_create(
        &self,
        _key: &InstanceKey,
        factory: &mut InstanceFactory<'_>,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        factory()
    }
}

//! Resolution of services registered in a [ServiceCollection]. The [ServiceProvider] is the
//! reference registry implementation: it honors lifetimes through [scopes](crate::scope) and
//! follows redirect entries, so that an implementation exposed under many services is only created
//! once per scope.

use crate::error::ResolveError;
use crate::instance::{CastFunction, ServiceInstanceAnyPtr, ServiceInstancePtr};
use crate::lifetime::ServiceLifetime;
use crate::scope::{InstanceKey, Scope, SharedScope, TransientScope};
use crate::service_collection::{RegistrationEntry, ServiceCollection};
use crate::service_id::{ServiceId, ServiceKey};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::trace;

/// A resolved, type-erased instance along with the cast to the requested service type.
pub type ResolvedService = (ServiceInstanceAnyPtr, CastFunction);

/// Generic provider for service instances.
pub trait ServiceResolver {
    /// Resolves the last registered entry for given service.
    fn resolve_any(&self, service: &ServiceId) -> Result<ResolvedService, ResolveError>;

    /// Resolves all entries registered for given service, in registration order.
    fn resolve_all_any(&self, service: &ServiceId) -> Result<Vec<ResolvedService>, ResolveError>;
}

/// Helper trait for [ServiceResolver] providing strongly-typed access.
pub trait TypedServiceResolver {
    /// Typesafe version of [ServiceResolver::resolve_any].
    fn get<T: ?Sized + 'static>(&self) -> Result<ServiceInstancePtr<T>, ResolveError>;

    /// Resolves a keyed service.
    fn get_keyed<T: ?Sized + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<ServiceInstancePtr<T>, ResolveError>;

    /// Tries to get an instance like [TypedServiceResolver::get] does, but returns `None` on
    /// missing registration.
    fn get_optional<T: ?Sized + 'static>(
        &self,
    ) -> Result<Option<ServiceInstancePtr<T>>, ResolveError>;

    /// Typesafe version of [ServiceResolver::resolve_all_any].
    fn get_all<T: ?Sized + 'static>(&self) -> Result<Vec<ServiceInstancePtr<T>>, ResolveError>;
}

fn cast_resolved<T: ?Sized + 'static>(
    service: &ServiceId,
    (instance, cast): ResolvedService,
) -> Result<ServiceInstancePtr<T>, ResolveError> {
    cast(instance)
        .ok()
        .and_then(|boxed| boxed.downcast::<ServiceInstancePtr<T>>().ok())
        .map(|instance| *instance)
        .ok_or_else(|| ResolveError::IncompatibleService(service.clone()))
}

impl<R: ServiceResolver + ?Sized> TypedServiceResolver for R {
    fn get<T: ?Sized + 'static>(&self) -> Result<ServiceInstancePtr<T>, ResolveError> {
        let service = ServiceId::of::<T>();
        self.resolve_any(&service)
            .and_then(|resolved| cast_resolved(&service, resolved))
    }

    fn get_keyed<T: ?Sized + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> Result<ServiceInstancePtr<T>, ResolveError> {
        let service = ServiceId::keyed::<T>(key);
        self.resolve_any(&service)
            .and_then(|resolved| cast_resolved(&service, resolved))
    }

    fn get_optional<T: ?Sized + 'static>(
        &self,
    ) -> Result<Option<ServiceInstancePtr<T>>, ResolveError> {
        match self.get::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(ResolveError::NotRegistered(service)) if service == ServiceId::of::<T>() => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn get_all<T: ?Sized + 'static>(&self) -> Result<Vec<ServiceInstancePtr<T>>, ResolveError> {
        let service = ServiceId::of::<T>();
        self.resolve_all_any(&service)?
            .into_iter()
            .map(|resolved| cast_resolved(&service, resolved))
            .try_collect()
    }
}

/// Frozen, indexed view of a [ServiceCollection].
#[derive(Debug)]
struct RegisteredServices {
    entries: Vec<RegistrationEntry>,
    index: FxHashMap<ServiceId, Vec<usize>>,
}

impl RegisteredServices {
    fn new(services: ServiceCollection) -> Self {
        let entries = services.into_iter().collect_vec();
        let mut index: FxHashMap<ServiceId, Vec<usize>> = FxHashMap::default();
        for (position, entry) in entries.iter().enumerate() {
            index
                .entry(entry.exposed_as.clone())
                .or_default()
                .push(position);
        }

        Self { entries, index }
    }

    fn entries(&self, service: &ServiceId) -> impl Iterator<Item = &RegistrationEntry> {
        self.index
            .get(service)
            .into_iter()
            .flatten()
            .map(|position| &self.entries[*position])
    }
}

/// Resolves services registered in a [ServiceCollection].
///
/// The provider created by [ServiceCollection::build_provider] is the root provider, which also
/// acts as its own scope for scoped services. Child scopes are created with
/// [ServiceProvider::create_scope] and share singletons with the root.
#[derive(Clone)]
pub struct ServiceProvider {
    services: Arc<RegisteredServices>,
    singletons: Arc<SharedScope>,
    scoped: Arc<SharedScope>,
}

impl ServiceProvider {
    pub fn new(services: ServiceCollection) -> Self {
        Self {
            services: Arc::new(RegisteredServices::new(services)),
            singletons: Default::default(),
            scoped: Default::default(),
        }
    }

    /// Creates a new scope sharing registrations and singletons with this provider, but with its
    /// own scoped instances.
    pub fn create_scope(&self) -> ServiceProvider {
        Self {
            services: self.services.clone(),
            singletons: self.singletons.clone(),
            scoped: Default::default(),
        }
    }

    /// Checks if there's at least one entry for given service.
    pub fn is_registered(&self, service: &ServiceId) -> bool {
        self.services.index.contains_key(service)
    }

    fn scope(&self, lifetime: ServiceLifetime) -> &dyn Scope {
        match lifetime {
            ServiceLifetime::Transient => &TransientScope,
            ServiceLifetime::Scoped => self.scoped.as_ref(),
            ServiceLifetime::Singleton => self.singletons.as_ref(),
        }
    }

    fn resolve_with(
        &self,
        service: &ServiceId,
        resolution: &Resolution,
    ) -> Result<ResolvedService, ResolveError> {
        let entry = self
            .services
            .entries(service)
            .last()
            .ok_or_else(|| ResolveError::NotRegistered(service.clone()))?;

        self.create_instance(entry, resolution)
            .map(|instance| (instance, entry.cast.clone()))
    }

    fn resolve_all_with(
        &self,
        service: &ServiceId,
        resolution: &Resolution,
    ) -> Result<Vec<ResolvedService>, ResolveError> {
        self.services
            .entries(service)
            .map(|entry| {
                self.create_instance(entry, resolution)
                    .map(|instance| (instance, entry.cast.clone()))
            })
            .try_collect()
    }

    fn create_instance(
        &self,
        entry: &RegistrationEntry,
        resolution: &Resolution,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        if let Some(target) = entry.redirect_id() {
            let target_entry = self
                .services
                .entries(&target)
                .filter(|candidate| candidate.implementation_type == entry.implementation_type)
                .last()
                .ok_or_else(|| ResolveError::MissingRedirectTarget {
                    service: entry.exposed_as.clone(),
                    target: target.clone(),
                    implementation_type: entry.implementation_type.name().to_string(),
                })?;

            trace!(service = %entry.exposed_as, target = %target, "Following redirect");
            return self.create_instance(target_entry, resolution);
        }

        let key = InstanceKey {
            service: entry.exposed_as.clone(),
            implementation_type: entry.implementation_type,
        };

        let scope = self.scope(entry.lifetime);
        if let Some(instance) = scope.instance(&key) {
            return Ok(instance);
        }

        // entering first reports a cycle instead of waiting on an instance this thread creates
        resolution.enter(&key)?;
        let instance = scope.instance_or_create(&key, &mut || (entry.constructor)(resolution));
        resolution.leave();

        instance
    }
}

impl ServiceResolver for ServiceProvider {
    fn resolve_any(&self, service: &ServiceId) -> Result<ResolvedService, ResolveError> {
        self.resolve_with(service, &Resolution::new(self))
    }

    fn resolve_all_any(&self, service: &ServiceId) -> Result<Vec<ResolvedService>, ResolveError> {
        self.resolve_all_with(service, &Resolution::new(self))
    }
}

/// A single top-level resolution, tracking instances under construction to detect cycles. Passed
/// to constructors as their [ServiceResolver].
struct Resolution<'a> {
    provider: &'a ServiceProvider,
    under_construction: RefCell<Vec<InstanceKey>>,
}

impl<'a> Resolution<'a> {
    fn new(provider: &'a ServiceProvider) -> Self {
        Self {
            provider,
            under_construction: Default::default(),
        }
    }

    fn enter(&self, key: &InstanceKey) -> Result<(), ResolveError> {
        let mut under_construction = self.under_construction.borrow_mut();
        if under_construction.contains(key) {
            let path = under_construction
                .iter()
                .skip_while(|existing| *existing != key)
                .chain([key])
                .map(|key| key.service.to_string())
                .collect();

            return Err(ResolveError::CircularDependency { path });
        }

        under_construction.push(key.clone());
        Ok(())
    }

    fn leave(&self) {
        self.under_construction.borrow_mut().pop();
    }
}

impl ServiceResolver for Resolution<'_> {
    fn resolve_any(&self, service: &ServiceId) -> Result<ResolvedService, ResolveError> {
        self.provider.resolve_with(service, self)
    }

    fn resolve_all_any(&self, service: &ServiceId) -> Result<Vec<ResolvedService>, ResolveError> {
        self.provider.resolve_all_with(service, self)
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::RegistrationMode;
    use crate::error::ResolveError;
    use crate::instance::{
        cast_function, error_ptr, self_cast_function, ServiceInstanceAnyPtr, ServiceInstancePtr,
    };
    use crate::lifetime::ServiceLifetime;
    use crate::provider::{ServiceResolver, TypedServiceResolver};
    use crate::service_collection::{RegistrationEntry, ServiceCollection, ServiceRegistry};
    use crate::service_id::{ServiceId, TypeRef};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    trait Named: Send + Sync {}

    #[derive(Debug)]
    struct TestService;

    impl Named for TestService {}

    struct Dependent {
        _dependency: Arc<TestService>,
    }

    fn constructor(_resolver: &dyn ServiceResolver) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        Ok(ServiceInstancePtr::new(TestService) as ServiceInstanceAnyPtr)
    }

    fn dependent_constructor(
        resolver: &dyn ServiceResolver,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        resolver.get::<TestService>().map(|dependency| {
            ServiceInstancePtr::new(Dependent {
                _dependency: dependency,
            }) as ServiceInstanceAnyPtr
        })
    }

    fn recursive_constructor(
        resolver: &dyn ServiceResolver,
    ) -> Result<ServiceInstanceAnyPtr, ResolveError> {
        resolver
            .get::<TestService>()
            .map(|instance| instance as ServiceInstanceAnyPtr)
    }

    fn self_entry(lifetime: ServiceLifetime) -> RegistrationEntry {
        RegistrationEntry {
            implementation_type: TypeRef::of::<TestService>(),
            exposed_as: ServiceId::of::<TestService>(),
            lifetime,
            redirect_to: None,
            constructor: Arc::new(constructor),
            cast: self_cast_function::<TestService>(),
        }
    }

    fn named_entry(lifetime: ServiceLifetime, redirect: bool) -> RegistrationEntry {
        RegistrationEntry {
            implementation_type: TypeRef::of::<TestService>(),
            exposed_as: ServiceId::of::<dyn Named>(),
            lifetime,
            redirect_to: redirect.then(TypeRef::of::<TestService>),
            constructor: Arc::new(constructor),
            cast: cast_function::<TestService, dyn Named>(|this| this as Arc<dyn Named>),
        }
    }

    fn create_provider(entries: Vec<RegistrationEntry>) -> crate::provider::ServiceProvider {
        let mut services = ServiceCollection::new();
        for entry in entries {
            services.register(entry, RegistrationMode::Add);
        }

        services.build_provider()
    }

    #[test]
    fn should_create_transient_instances() {
        let provider = create_provider(vec![self_entry(ServiceLifetime::Transient)]);

        let first = provider.get::<TestService>().unwrap();
        let second = provider.get::<TestService>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_share_singletons_between_scopes() {
        let provider = create_provider(vec![self_entry(ServiceLifetime::Singleton)]);
        let scope = provider.create_scope();

        let first = provider.get::<TestService>().unwrap();
        let second = scope.get::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_share_scoped_instances_within_scope() {
        let provider = create_provider(vec![self_entry(ServiceLifetime::Scoped)]);
        let scope_1 = provider.create_scope();
        let scope_2 = provider.create_scope();

        let first = scope_1.get::<TestService>().unwrap();
        let second = scope_1.get::<TestService>().unwrap();
        let third = scope_2.get::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn should_follow_redirects_to_shared_instance() {
        let provider = create_provider(vec![
            self_entry(ServiceLifetime::Singleton),
            named_entry(ServiceLifetime::Singleton, true),
        ]);

        let concrete = provider.get::<TestService>().unwrap();
        let named = provider.get::<dyn Named>().unwrap();
        assert!(std::ptr::eq(
            Arc::as_ptr(&concrete) as *const u8,
            Arc::as_ptr(&named) as *const u8
        ));
    }

    #[test]
    fn should_not_share_without_redirects() {
        let provider = create_provider(vec![
            self_entry(ServiceLifetime::Singleton),
            named_entry(ServiceLifetime::Singleton, false),
        ]);

        let concrete = provider.get::<TestService>().unwrap();
        let named = provider.get::<dyn Named>().unwrap();
        assert!(!std::ptr::eq(
            Arc::as_ptr(&concrete) as *const u8,
            Arc::as_ptr(&named) as *const u8
        ));
    }

    #[test]
    fn should_report_missing_redirect_target() {
        let provider = create_provider(vec![named_entry(ServiceLifetime::Singleton, true)]);

        assert!(matches!(
            provider.get::<dyn Named>().err().unwrap(),
            ResolveError::MissingRedirectTarget { .. }
        ));
    }

    #[test]
    fn should_inject_dependencies() {
        let mut dependent = self_entry(ServiceLifetime::Transient);
        dependent.implementation_type = TypeRef::of::<Dependent>();
        dependent.exposed_as = ServiceId::of::<Dependent>();
        dependent.constructor = Arc::new(dependent_constructor);
        dependent.cast = self_cast_function::<Dependent>();

        let provider = create_provider(vec![self_entry(ServiceLifetime::Singleton), dependent]);
        assert!(provider.get::<Dependent>().is_ok());
    }

    #[test]
    fn should_detect_dependency_cycles() {
        let mut entry = self_entry(ServiceLifetime::Singleton);
        entry.constructor = Arc::new(recursive_constructor);

        let provider = create_provider(vec![entry]);
        assert!(matches!(
            provider.get::<TestService>().unwrap_err(),
            ResolveError::CircularDependency { .. }
        ));
    }

    #[test]
    fn should_resolve_all_and_last_entries() {
        let provider = create_provider(vec![
            self_entry(ServiceLifetime::Transient),
            self_entry(ServiceLifetime::Singleton),
        ]);

        assert_eq!(provider.get_all::<TestService>().unwrap().len(), 2);

        let first = provider.get::<TestService>().unwrap();
        let second = provider.get::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_handle_missing_services() {
        let provider = create_provider(vec![]);

        assert!(matches!(
            provider.get::<TestService>().unwrap_err(),
            ResolveError::NotRegistered(_)
        ));
        assert!(provider.get_optional::<TestService>().unwrap().is_none());
        assert!(!provider.is_registered(&ServiceId::of::<TestService>()));
    }

    #[test]
    fn should_resolve_keyed_services() {
        let mut entry = self_entry(ServiceLifetime::Singleton);
        entry.exposed_as = ServiceId::keyed::<TestService>("main");

        let provider = create_provider(vec![entry]);
        assert!(provider.get_keyed::<TestService>("main").is_ok());
        assert!(provider.get_keyed::<TestService>("other").is_err());
        assert!(provider.get::<TestService>().is_err());
    }

    #[test]
    fn should_construct_shared_instances_once_under_contention() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut entry = self_entry(ServiceLifetime::Singleton);
        entry.constructor = Arc::new(move |_: &dyn ServiceResolver| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(ServiceInstancePtr::new(TestService) as ServiceInstanceAnyPtr)
        });

        let provider = create_provider(vec![entry]);
        let barrier = Barrier::new(4);

        let instances = thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        provider.get::<TestService>().unwrap()
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances
            .iter()
            .all(|instance| Arc::ptr_eq(instance, &instances[0])));
    }

    #[test]
    fn should_propagate_constructor_errors() {
        let mut entry = self_entry(ServiceLifetime::Singleton);
        entry.constructor = Arc::new(|_: &dyn ServiceResolver| {
            "not a number"
                .parse::<u8>()
                .map(|value| ServiceInstancePtr::new(value) as ServiceInstanceAnyPtr)
                .map_err(|error| ResolveError::ConstructorError(error_ptr(error)))
        });

        let provider = create_provider(vec![entry]);
        assert!(matches!(
            provider.get::<TestService>().unwrap_err(),
            ResolveError::ConstructorError(_)
        ));
        assert!(matches!(
            provider.get::<TestService>().unwrap_err(),
            ResolveError::ConstructorError(_)
        ));
    }
}

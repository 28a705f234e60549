//! Contexts passed to module [lifecycle stages](crate::lifecycle::LifecycleStage).

use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;
use wirekit_di::conventional::{ConventionalRegistrar, DefaultConventionalRegistrar};
use wirekit_di::provider::ServiceProvider;
use wirekit_di::scan::{AssemblyRef, TypeScanner};
use wirekit_di::service_collection::ServiceCollection;
use wirekit_di::RegistrationError;

pub type ConventionalRegistrarPtr = Box<dyn ConventionalRegistrar + Send + Sync>;

pub type TypeScannerPtr = Arc<dyn TypeScanner + Send + Sync>;

/// Context of the service configuration stages. Modules register their services in the
/// [ServiceCollection] and can share configuration objects with modules configured later through
/// typed items.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ServiceConfigurationContext {
    services: ServiceCollection,
    registrar: DefaultConventionalRegistrar,
    #[derivative(Debug = "ignore")]
    additional_registrars: Vec<ConventionalRegistrarPtr>,
    #[derivative(Debug = "ignore")]
    scanner: TypeScannerPtr,
    scanned_assemblies: FxHashSet<AssemblyRef>,
    #[derivative(Debug = "ignore")]
    items: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceConfigurationContext {
    pub fn new(registrar: DefaultConventionalRegistrar, scanner: TypeScannerPtr) -> Self {
        Self {
            services: ServiceCollection::new(),
            registrar,
            additional_registrars: Vec::new(),
            scanner,
            scanned_assemblies: Default::default(),
            items: Default::default(),
        }
    }

    #[inline]
    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    #[inline]
    pub fn services_mut(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    /// The default registrar, e.g. for adding exposing or registered actions.
    #[inline]
    pub fn registrar_mut(&mut self) -> &mut DefaultConventionalRegistrar {
        &mut self.registrar
    }

    /// Adds a registrar run after the default one for every scanned assembly.
    pub fn add_registrar(&mut self, registrar: ConventionalRegistrarPtr) {
        self.additional_registrars.push(registrar);
    }

    #[inline]
    pub fn scanner(&self) -> &TypeScannerPtr {
        &self.scanner
    }

    pub fn is_assembly_registered(&self, assembly: &AssemblyRef) -> bool {
        self.scanned_assemblies.contains(assembly)
    }

    /// Registers services from given assembly with all registrars. Returns `false` if the
    /// assembly was already registered. A failed assembly is not marked as registered.
    pub fn register_assembly(&mut self, assembly: &AssemblyRef) -> Result<bool, RegistrationError> {
        if self.scanned_assemblies.contains(assembly) {
            return Ok(false);
        }

        debug!(%assembly, "Registering services from assembly");

        self.registrar
            .add_assembly(&mut self.services, self.scanner.as_ref(), assembly)?;

        for registrar in &mut self.additional_registrars {
            registrar.add_assembly(&mut self.services, self.scanner.as_ref(), assembly)?;
        }

        self.scanned_assemblies.insert(assembly.clone());
        Ok(true)
    }

    pub fn item<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.items
            .get(&TypeId::of::<T>())
            .and_then(|item| item.downcast_ref())
    }

    pub fn item_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.items
            .get_mut(&TypeId::of::<T>())
            .and_then(|item| item.downcast_mut())
    }

    /// Stores an item, returning the previous one of the same type.
    pub fn set_item<T: Any + Send + Sync>(&mut self, item: T) -> Option<T> {
        self.items
            .insert(TypeId::of::<T>(), Box::new(item))
            .and_then(|previous| previous.downcast().ok())
            .map(|previous| *previous)
    }

    /// Consumes the context, returning registered services.
    pub fn into_services(self) -> ServiceCollection {
        self.services
    }
}

/// Context of the initialization stages.
#[derive(Clone)]
pub struct ApplicationInitializationContext {
    service_provider: ServiceProvider,
}

impl ApplicationInitializationContext {
    pub fn new(service_provider: ServiceProvider) -> Self {
        Self { service_provider }
    }

    #[inline]
    pub fn service_provider(&self) -> &ServiceProvider {
        &self.service_provider
    }
}

/// Context of the shutdown stage.
#[derive(Clone)]
pub struct ApplicationShutdownContext {
    service_provider: ServiceProvider,
}

impl ApplicationShutdownContext {
    pub fn new(service_provider: ServiceProvider) -> Self {
        Self { service_provider }
    }

    #[inline]
    pub fn service_provider(&self) -> &ServiceProvider {
        &self.service_provider
    }
}

#[cfg(test)]
mod tests {
    use crate::context::ServiceConfigurationContext;
    use std::sync::Arc;
    use wirekit_di::conventional::DefaultConventionalRegistrar;
    use wirekit_di::descriptor::{ExposeServices, ServiceTypeDescriptor};
    use wirekit_di::RegistrationError;
    use wirekit_di::lifetime::ServiceLifetime;
    use wirekit_di::scan::{AssemblyRef, StaticTypeScanner};

    struct Greeter;

    struct Unsatisfied;

    #[derive(Debug, Eq, PartialEq)]
    struct Settings(u8);

    fn create_context() -> ServiceConfigurationContext {
        let scanner = StaticTypeScanner::default().with_type(
            ServiceTypeDescriptor::builder(|_| Ok(Greeter))
                .lifetime(ServiceLifetime::Singleton)
                .build(),
        );

        ServiceConfigurationContext::new(DefaultConventionalRegistrar::default(), Arc::new(scanner))
    }

    #[test]
    fn should_register_assemblies_once() {
        let mut context = create_context();
        let assembly = AssemblyRef::of::<Greeter>();

        assert!(context.register_assembly(&assembly).unwrap());
        assert!(!context.register_assembly(&assembly).unwrap());
        assert!(context.is_assembly_registered(&assembly));
        assert_eq!(context.services().len(), 1);
    }

    #[test]
    fn should_not_mark_failed_assemblies_as_registered() {
        let scanner = StaticTypeScanner::default().with_type(
            ServiceTypeDescriptor::builder(|_| Ok(Unsatisfied))
                .lifetime(ServiceLifetime::Singleton)
                .expose(ExposeServices::new().service::<u8>())
                .build(),
        );
        let mut context = ServiceConfigurationContext::new(
            DefaultConventionalRegistrar::default(),
            Arc::new(scanner),
        );
        let assembly = AssemblyRef::of::<Unsatisfied>();

        assert!(matches!(
            context.register_assembly(&assembly),
            Err(RegistrationError::UnsatisfiedService { .. })
        ));
        assert!(!context.is_assembly_registered(&assembly));
        assert!(context.register_assembly(&assembly).is_err());
    }

    #[test]
    fn should_store_typed_items() {
        let mut context = create_context();

        assert!(context.item::<Settings>().is_none());
        assert!(context.set_item(Settings(1)).is_none());
        assert_eq!(context.set_item(Settings(2)), Some(Settings(1)));

        context.item_mut::<Settings>().unwrap().0 = 7;
        assert_eq!(context.item::<Settings>(), Some(&Settings(7)));
    }
}

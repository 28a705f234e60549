//! Conventional registration turns [ServiceTypeDescriptor]s into
//! [RegistrationEntries](RegistrationEntry). For every candidate type a registrar decides:
//!
//! 1. whether the type should be registered at all,
//! 2. its [ServiceLifetime] (explicit lifetime, then marker traits, then the registrar default),
//! 3. the services it is exposed as (explicit declarations, keyed declarations and the naming
//!    convention),
//! 4. which entries are redirects, so that a shared instance stays shared regardless of the service
//!    used to resolve it.
//!
//! The naming convention exposes a type as each implemented capability whose simple name, without
//! a single leading `I`, is a suffix of the type's simple name, e.g. `DefaultOrderService` is
//! exposed as `dyn OrderService` or `dyn IOrderService`, but not as an unrelated `dyn Disposable`.

use crate::descriptor::{ExposeServices, ServiceTypeDescriptor};
use crate::error::RegistrationError;
use crate::lifetime::ServiceLifetime;
use crate::scan::{AssemblyRef, TypeScanner};
use crate::service_collection::{RegistrationEntry, ServiceRegistry};
use crate::service_id::{ServiceId, TypeRef};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use tracing::{debug, trace};

/// Options for [DefaultConventionalRegistrar].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConventionalRegistrationOptions {
    /// Lifetime for types without an explicit lifetime and without marker traits. Such types are
    /// skipped if not present.
    pub default_lifetime: Option<ServiceLifetime>,
}

/// Context passed to [ServiceExposingAction]s. Actions can remove services to veto exposing them or
/// add new ones.
#[derive(Debug)]
pub struct ServiceExposingContext<'a> {
    pub descriptor: &'a ServiceTypeDescriptor,
    pub exposed_services: Vec<ServiceId>,
}

pub type ServiceExposingAction = Box<dyn Fn(&mut ServiceExposingContext) + Send + Sync>;

/// Context passed to [ServiceRegisteredAction]s after all entries of a type were registered.
#[derive(Debug)]
pub struct ServiceRegisteredContext<'a> {
    pub implementation_type: TypeRef,
    pub exposed_services: &'a [ServiceId],
    pub lifetime: ServiceLifetime,
}

pub type ServiceRegisteredAction = Box<dyn Fn(&ServiceRegisteredContext) + Send + Sync>;

/// Registers candidate types in a [ServiceRegistry] according to some convention.
pub trait ConventionalRegistrar {
    /// Registers a single candidate type. Types which should not be registered are skipped
    /// silently.
    fn add_type(
        &mut self,
        registry: &mut dyn ServiceRegistry,
        descriptor: &ServiceTypeDescriptor,
    ) -> Result<(), RegistrationError>;

    /// Registers given types in order.
    fn add_types(
        &mut self,
        registry: &mut dyn ServiceRegistry,
        descriptors: &[ServiceTypeDescriptor],
    ) -> Result<(), RegistrationError> {
        descriptors
            .iter()
            .try_for_each(|descriptor| self.add_type(registry, descriptor))
    }

    /// Registers all types found by the scanner in given assembly.
    fn add_assembly(
        &mut self,
        registry: &mut dyn ServiceRegistry,
        scanner: &dyn TypeScanner,
        assembly: &AssemblyRef,
    ) -> Result<(), RegistrationError> {
        self.add_types(registry, &scanner.scan(assembly))
    }
}

/// Checks if the service type name, without a single leading `I`, is a suffix of the
/// implementation type name.
pub fn matches_naming_convention(implementation_type: &TypeRef, service_type: &TypeRef) -> bool {
    let service_name = service_type.simple_name();
    let service_name = service_name.strip_prefix('I').unwrap_or(service_name);

    !service_name.is_empty() && implementation_type.simple_name().ends_with(service_name)
}

/// Decides if the entry for `service` should redirect to another service of the same
/// implementation type. Shared lifetimes need a single canonical entry per key: the implementation
/// type itself if exposed, otherwise the first exposed service with the same key.
pub fn redirect_target(
    implementation_type: TypeRef,
    service: &ServiceId,
    exposed_services: &[ServiceId],
    lifetime: ServiceLifetime,
) -> Option<TypeRef> {
    if !lifetime.is_shared() || service.service_type() == implementation_type {
        return None;
    }

    let group = exposed_services
        .iter()
        .filter(|candidate| candidate.key() == service.key())
        .collect_vec();

    if group.len() < 2 {
        return None;
    }

    if group
        .iter()
        .any(|candidate| candidate.service_type() == implementation_type)
    {
        return Some(implementation_type);
    }

    group
        .first()
        .filter(|canonical| **canonical != service)
        .map(|canonical| canonical.service_type())
}

/// The standard [ConventionalRegistrar].
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct DefaultConventionalRegistrar {
    options: ConventionalRegistrationOptions,

    #[derivative(Debug = "ignore")]
    exposing_actions: Vec<ServiceExposingAction>,

    #[derivative(Debug = "ignore")]
    registered_actions: Vec<ServiceRegisteredAction>,

    conventional_services: FxHashMap<TypeRef, Vec<TypeRef>>,
}

impl DefaultConventionalRegistrar {
    pub fn new(options: ConventionalRegistrationOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    #[inline]
    pub fn options(&self) -> &ConventionalRegistrationOptions {
        &self.options
    }

    pub fn on_exposing(&mut self, action: ServiceExposingAction) {
        self.exposing_actions.push(action);
    }

    pub fn on_registered(&mut self, action: ServiceRegisteredAction) {
        self.registered_actions.push(action);
    }

    /// Lifetime for given type, or `None` if the type should not be registered.
    pub fn lifetime_of(&self, descriptor: &ServiceTypeDescriptor) -> Option<ServiceLifetime> {
        descriptor
            .lifetime
            .or_else(|| ServiceLifetime::from_markers(descriptor))
            .or(self.options.default_lifetime)
    }

    /// Services the type should be exposed as, before running exposing actions. Unkeyed services
    /// come first, followed by keyed ones.
    pub fn exposed_services(
        &mut self,
        descriptor: &ServiceTypeDescriptor,
    ) -> Result<Vec<ServiceId>, RegistrationError> {
        let implementation_type = descriptor.implementation_type();

        let conventional = [ExposeServices::conventional()];
        let declarations: &[ExposeServices] = match (
            descriptor.expose.is_empty(),
            descriptor.expose_keyed.is_empty(),
        ) {
            (true, true) => &conventional,
            (true, false) => &[],
            _ => &descriptor.expose,
        };

        let mut service_types = Vec::new();
        for declaration in declarations {
            service_types.extend(declaration.service_types.iter().copied());

            if declaration.include_defaults {
                service_types.extend(self.conventional_services(descriptor).iter().copied());
            }

            if declaration.include_self {
                service_types.push(implementation_type);
            }
        }

        for service_type in &service_types {
            Self::check_implemented(descriptor, service_type)?;
        }

        let keyed = descriptor
            .expose_keyed
            .iter()
            .map(|keyed| {
                if keyed.key.is_empty() {
                    return Err(RegistrationError::EmptyServiceKey {
                        implementation_type: implementation_type.name().to_string(),
                        service_type: keyed.service_type.name().to_string(),
                    });
                }

                Self::check_implemented(descriptor, &keyed.service_type)?;
                Ok(ServiceId::with_key(keyed.key.clone(), keyed.service_type))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(service_types
            .into_iter()
            .map(ServiceId::new)
            .chain(keyed)
            .unique()
            .collect_vec())
    }

    fn conventional_services(&mut self, descriptor: &ServiceTypeDescriptor) -> &[TypeRef] {
        let implementation_type = descriptor.implementation_type();
        self.conventional_services
            .entry(implementation_type)
            .or_insert_with(|| {
                descriptor
                    .capabilities
                    .iter()
                    .map(|capability| capability.service_type)
                    .filter(|service_type| {
                        matches_naming_convention(&implementation_type, service_type)
                    })
                    .collect_vec()
            })
    }

    fn check_implemented(
        descriptor: &ServiceTypeDescriptor,
        service_type: &TypeRef,
    ) -> Result<(), RegistrationError> {
        if descriptor.implements(service_type) {
            Ok(())
        } else {
            Err(RegistrationError::UnsatisfiedService {
                implementation_type: descriptor.implementation_type().name().to_string(),
                service_type: service_type.name().to_string(),
            })
        }
    }
}

impl ConventionalRegistrar for DefaultConventionalRegistrar {
    fn add_type(
        &mut self,
        registry: &mut dyn ServiceRegistry,
        descriptor: &ServiceTypeDescriptor,
    ) -> Result<(), RegistrationError> {
        let implementation_type = descriptor.implementation_type();
        if descriptor.registration_disabled {
            trace!(%implementation_type, "Registration disabled");
            return Ok(());
        }

        let Some(lifetime) = self.lifetime_of(descriptor) else {
            trace!(%implementation_type, "No lifetime determined - skipping");
            return Ok(());
        };

        let mut context = ServiceExposingContext {
            descriptor,
            exposed_services: self.exposed_services(descriptor)?,
        };

        for action in &self.exposing_actions {
            action(&mut context);
        }

        let exposed_services = context.exposed_services.into_iter().unique().collect_vec();
        let casts = exposed_services
            .iter()
            .map(|service| {
                descriptor
                    .capability(&service.service_type())
                    .map(|capability| capability.cast.clone())
                    .ok_or_else(|| RegistrationError::UnsatisfiedService {
                        implementation_type: implementation_type.name().to_string(),
                        service_type: service.service_type().name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for key in exposed_services.iter().map(ServiceId::key).unique() {
            // the canonical entry is registered first; if the registry rejects it, the next
            // accepted entry of the group takes its place
            let group = exposed_services
                .iter()
                .zip(&casts)
                .filter(|(service, _)| service.key() == key)
                .sorted_by_key(|(service, _)| {
                    redirect_target(implementation_type, service, &exposed_services, lifetime)
                        .is_some()
                })
                .collect_vec();

            let shared = lifetime.is_shared() && group.len() > 1;
            let mut canonical: Option<TypeRef> = None;

            for (service, cast) in group {
                debug!(
                    %implementation_type,
                    service = %service,
                    %lifetime,
                    redirect_to = ?canonical.map(|target| target.name()),
                    "Registering service"
                );

                let registered = registry.register(
                    RegistrationEntry {
                        implementation_type,
                        exposed_as: service.clone(),
                        lifetime,
                        redirect_to: canonical,
                        constructor: descriptor.constructor.clone(),
                        cast: cast.clone(),
                    },
                    descriptor.registration_mode,
                );

                if !registered {
                    debug!(%implementation_type, service = %service, "Service already registered");
                } else if shared && canonical.is_none() {
                    canonical = Some(service.service_type());
                }
            }
        }

        let context = ServiceRegisteredContext {
            implementation_type,
            exposed_services: &exposed_services,
            lifetime,
        };

        for action in &self.registered_actions {
            action(&context);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::conventional::{
        matches_naming_convention, redirect_target, ConventionalRegistrar,
        ConventionalRegistrationOptions, DefaultConventionalRegistrar,
    };
    use crate::descriptor::{ExposeServices, RegistrationMode, ServiceTypeDescriptor};
    use crate::error::RegistrationError;
    use crate::lifetime::{ServiceLifetime, SingletonDependency, TransientDependency};
    use crate::provider::TypedServiceResolver;
    use crate::service_collection::{MockServiceRegistry, ServiceCollection};
    use crate::service_id::{ServiceId, TypeRef};
    use parking_lot::Mutex;
    use std::sync::Arc;

    trait IOrderService: Send + Sync {}

    trait Disposable: Send + Sync {}

    trait Auditable: Send + Sync {}

    struct OrderService;

    impl IOrderService for OrderService {}

    impl Disposable for OrderService {}

    impl Auditable for OrderService {}

    impl SingletonDependency for OrderService {}

    impl TransientDependency for OrderService {}

    struct LegacyOrderService;

    impl IOrderService for LegacyOrderService {}

    fn order_service() -> crate::descriptor::ServiceTypeDescriptorBuilder<OrderService> {
        ServiceTypeDescriptor::builder(|_| Ok(OrderService))
            .implements::<dyn IOrderService>(|this| this as Arc<dyn IOrderService>)
            .implements::<dyn Disposable>(|this| this as Arc<dyn Disposable>)
            .implements::<dyn Auditable>(|this| this as Arc<dyn Auditable>)
    }

    fn singleton_order_service() -> crate::descriptor::ServiceTypeDescriptorBuilder<OrderService>
    {
        order_service()
            .implements::<dyn SingletonDependency>(|this| this as Arc<dyn SingletonDependency>)
    }

    fn services_with_legacy_order_service(
        registrar: &mut DefaultConventionalRegistrar,
    ) -> ServiceCollection {
        let mut services = ServiceCollection::new();
        registrar
            .add_type(
                &mut services,
                &ServiceTypeDescriptor::builder(|_| Ok(LegacyOrderService))
                    .implements::<dyn IOrderService>(|this| this as Arc<dyn IOrderService>)
                    .lifetime(ServiceLifetime::Singleton)
                    .expose(ExposeServices::new().service::<dyn IOrderService>())
                    .build(),
            )
            .unwrap();

        services
    }

    fn data_ptr<T: ?Sized>(instance: &Arc<T>) -> *const u8 {
        Arc::as_ptr(instance) as *const u8
    }

    fn exposed(services: &ServiceCollection) -> Vec<ServiceId> {
        services
            .entries()
            .iter()
            .map(|entry| entry.exposed_as.clone())
            .collect()
    }

    #[test]
    fn should_match_naming_convention() {
        let implementation = TypeRef::of::<OrderService>();

        assert!(matches_naming_convention(
            &implementation,
            &TypeRef::of::<dyn IOrderService>()
        ));
        assert!(!matches_naming_convention(
            &implementation,
            &TypeRef::of::<dyn Disposable>()
        ));
        assert!(!matches_naming_convention(
            &implementation,
            &TypeRef::of::<dyn SingletonDependency>()
        ));
    }

    #[test]
    fn should_expose_conventional_services() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(&mut services, &singleton_order_service().build())
            .unwrap();

        assert_eq!(
            exposed(&services),
            vec![
                ServiceId::of::<OrderService>(),
                ServiceId::of::<dyn IOrderService>()
            ]
        );
    }

    #[test]
    fn should_skip_types_without_lifetime() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(&mut services, &order_service().build())
            .unwrap();
        assert!(services.is_empty());

        let mut registrar = DefaultConventionalRegistrar::new(ConventionalRegistrationOptions {
            default_lifetime: Some(ServiceLifetime::Scoped),
        });
        registrar
            .add_type(&mut services, &order_service().build())
            .unwrap();
        assert!(services
            .entries()
            .iter()
            .all(|entry| entry.lifetime == ServiceLifetime::Scoped));
    }

    #[test]
    fn should_skip_disabled_types() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(
                &mut services,
                &singleton_order_service().disable_registration().build(),
            )
            .unwrap();

        assert!(services.is_empty());
    }

    #[test]
    fn should_prefer_explicit_lifetime_and_transient_marker() {
        let registrar = DefaultConventionalRegistrar::default();

        let marked = singleton_order_service()
            .implements::<dyn TransientDependency>(|this| this as Arc<dyn TransientDependency>)
            .build();
        assert_eq!(
            registrar.lifetime_of(&marked),
            Some(ServiceLifetime::Transient)
        );

        let explicit = singleton_order_service()
            .lifetime(ServiceLifetime::Scoped)
            .build();
        assert_eq!(
            registrar.lifetime_of(&explicit),
            Some(ServiceLifetime::Scoped)
        );
    }

    #[test]
    fn should_redirect_shared_services_to_self() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(
                &mut services,
                &singleton_order_service()
                    .expose(
                        ExposeServices::new()
                            .service::<dyn IOrderService>()
                            .service::<dyn Auditable>()
                            .with_self(),
                    )
                    .build(),
            )
            .unwrap();

        let entries = services.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].exposed_as, ServiceId::of::<OrderService>());
        assert_eq!(entries[0].redirect_to, None);
        assert_eq!(entries[1].redirect_to, Some(TypeRef::of::<OrderService>()));
        assert_eq!(entries[2].redirect_to, Some(TypeRef::of::<OrderService>()));
    }

    #[test]
    fn should_redirect_to_first_service_without_self() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(
                &mut services,
                &singleton_order_service()
                    .expose(
                        ExposeServices::new()
                            .service::<dyn Auditable>()
                            .service::<dyn IOrderService>(),
                    )
                    .build(),
            )
            .unwrap();

        let entries = services.entries();
        assert_eq!(entries[0].redirect_to, None);
        assert_eq!(
            entries[1].redirect_to,
            Some(TypeRef::of::<dyn Auditable>())
        );
    }

    #[test]
    fn should_not_redirect_transient_services() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(
                &mut services,
                &order_service()
                    .lifetime(ServiceLifetime::Transient)
                    .build(),
            )
            .unwrap();

        assert_eq!(services.len(), 2);
        assert!(services.entries().iter().all(|entry| !entry.is_redirect()));
    }

    #[test]
    fn should_group_redirects_by_key() {
        let implementation = TypeRef::of::<OrderService>();
        let exposed = vec![
            ServiceId::of::<dyn IOrderService>(),
            ServiceId::keyed::<dyn IOrderService>("a"),
            ServiceId::keyed::<dyn Auditable>("a"),
        ];

        assert_eq!(
            redirect_target(
                implementation,
                &exposed[0],
                &exposed,
                ServiceLifetime::Singleton
            ),
            None
        );
        assert_eq!(
            redirect_target(
                implementation,
                &exposed[1],
                &exposed,
                ServiceLifetime::Singleton
            ),
            None
        );
        assert_eq!(
            redirect_target(
                implementation,
                &exposed[2],
                &exposed,
                ServiceLifetime::Singleton
            ),
            Some(TypeRef::of::<dyn IOrderService>())
        );
    }

    #[test]
    fn should_suppress_defaults_for_keyed_only_types() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar
            .add_type(
                &mut services,
                &singleton_order_service()
                    .expose_keyed::<dyn IOrderService>("primary")
                    .build(),
            )
            .unwrap();

        assert_eq!(
            exposed(&services),
            vec![ServiceId::keyed::<dyn IOrderService>("primary")]
        );
    }

    #[test]
    fn should_union_declarations_with_keyed_services() {
        let mut registrar = DefaultConventionalRegistrar::default();

        let services = registrar
            .exposed_services(
                &singleton_order_service()
                    .expose(ExposeServices::new().service::<dyn Auditable>())
                    .expose(
                        ExposeServices::new()
                            .service::<dyn Auditable>()
                            .with_defaults(),
                    )
                    .expose_keyed::<dyn Auditable>(1_i64)
                    .build(),
            )
            .unwrap();

        assert_eq!(
            services,
            vec![
                ServiceId::of::<dyn Auditable>(),
                ServiceId::of::<dyn IOrderService>(),
                ServiceId::keyed::<dyn Auditable>(1_i64),
            ]
        );
    }

    #[test]
    fn should_reject_empty_keys() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        let result = registrar.add_type(
            &mut services,
            &singleton_order_service()
                .expose_keyed::<dyn IOrderService>("")
                .build(),
        );

        assert!(matches!(
            result.unwrap_err(),
            RegistrationError::EmptyServiceKey { .. }
        ));
        assert!(services.is_empty());
    }

    #[test]
    fn should_reject_unsatisfied_services() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        let result = registrar.add_type(
            &mut services,
            &singleton_order_service()
                .expose(ExposeServices::new().service::<u8>())
                .build(),
        );

        assert!(matches!(
            result.unwrap_err(),
            RegistrationError::UnsatisfiedService { .. }
        ));
    }

    #[test]
    fn should_run_exposing_and_registered_actions() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();

        registrar.on_exposing(Box::new(|context| {
            context
                .exposed_services
                .retain(|service| service.service_type() != TypeRef::of::<OrderService>());
            context
                .exposed_services
                .push(ServiceId::of::<dyn Disposable>());
        }));

        let registered = Arc::new(Mutex::new(Vec::new()));
        let registered_clone = registered.clone();
        registrar.on_registered(Box::new(move |context| {
            registered_clone
                .lock()
                .push((context.implementation_type, context.exposed_services.len()));
        }));

        registrar
            .add_type(&mut services, &singleton_order_service().build())
            .unwrap();

        assert_eq!(
            exposed(&services),
            vec![
                ServiceId::of::<dyn IOrderService>(),
                ServiceId::of::<dyn Disposable>()
            ]
        );
        assert_eq!(services.entries()[0].redirect_to, None);
        assert_eq!(
            services.entries()[1].redirect_to,
            Some(TypeRef::of::<dyn IOrderService>())
        );
        assert_eq!(
            *registered.lock(),
            vec![(TypeRef::of::<OrderService>(), 2)]
        );
    }

    #[test]
    fn should_pass_registration_mode() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut registry = MockServiceRegistry::new();
        registry
            .expect_register()
            .withf(|entry, mode| {
                *mode == RegistrationMode::Replace
                    && entry.implementation_type == TypeRef::of::<OrderService>()
            })
            .times(2)
            .return_const(true);

        registrar
            .add_type(
                &mut registry,
                &singleton_order_service()
                    .registration_mode(RegistrationMode::Replace)
                    .build(),
            )
            .unwrap();
    }

    #[test]
    fn should_register_types_from_scanner() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = ServiceCollection::new();
        let scanner = crate::scan::StaticTypeScanner::new(vec![singleton_order_service().build()]);

        registrar
            .add_assembly(
                &mut services,
                &scanner,
                &crate::scan::AssemblyRef::of::<OrderService>(),
            )
            .unwrap();

        assert_eq!(services.len(), 2);
    }

    #[test]
    fn should_register_directly_when_canonical_service_is_taken() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = services_with_legacy_order_service(&mut registrar);

        registrar
            .add_type(
                &mut services,
                &singleton_order_service()
                    .expose(
                        ExposeServices::new()
                            .service::<dyn IOrderService>()
                            .service::<dyn Auditable>(),
                    )
                    .registration_mode(RegistrationMode::TryAdd)
                    .build(),
            )
            .unwrap();

        let entries = services.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].implementation_type, TypeRef::of::<LegacyOrderService>());
        assert_eq!(entries[1].exposed_as, ServiceId::of::<dyn Auditable>());
        assert_eq!(entries[1].redirect_to, None);

        let provider = services.build_provider();
        assert!(provider.get::<dyn Auditable>().is_ok());
        assert!(provider.get::<dyn IOrderService>().is_ok());
    }

    #[test]
    fn should_redirect_to_next_accepted_service() {
        let mut registrar = DefaultConventionalRegistrar::default();
        let mut services = services_with_legacy_order_service(&mut registrar);

        registrar
            .add_type(
                &mut services,
                &singleton_order_service()
                    .expose(
                        ExposeServices::new()
                            .service::<dyn IOrderService>()
                            .service::<dyn Auditable>()
                            .service::<dyn Disposable>(),
                    )
                    .registration_mode(RegistrationMode::TryAdd)
                    .build(),
            )
            .unwrap();

        let entries = services.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].exposed_as, ServiceId::of::<dyn Auditable>());
        assert_eq!(entries[1].redirect_to, None);
        assert_eq!(entries[2].exposed_as, ServiceId::of::<dyn Disposable>());
        assert_eq!(entries[2].redirect_to, Some(TypeRef::of::<dyn Auditable>()));

        let provider = services.build_provider();
        let auditable = provider.get::<dyn Auditable>().unwrap();
        let disposable = provider.get::<dyn Disposable>().unwrap();
        assert_eq!(data_ptr(&auditable), data_ptr(&disposable));
    }
}

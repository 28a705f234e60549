//! Declarative metadata of candidate implementation types. A [ServiceTypeDescriptor] describes
//! everything the [conventional registrar](crate::conventional) needs to know about a type: how to
//! construct it, which capabilities it implements, and how the type wishes to be registered.
//!
//! Descriptors are usually created with the typed builder:
//!
//! ```
//! use std::sync::Arc;
//! use wirekit_di::descriptor::{ExposeServices, ServiceTypeDescriptor};
//! use wirekit_di::lifetime::SingletonDependency;
//!
//! trait OrderService: Send + Sync {}
//!
//! struct DefaultOrderService;
//!
//! impl OrderService for DefaultOrderService {}
//! impl SingletonDependency for DefaultOrderService {}
//!
//! let descriptor = ServiceTypeDescriptor::builder(|_| Ok(DefaultOrderService))
//!     .implements::<dyn OrderService>(|this| this as Arc<dyn OrderService>)
//!     .implements::<dyn SingletonDependency>(|this| this as Arc<dyn SingletonDependency>)
//!     .build();
//!
//! assert_eq!(descriptor.implementation_type().simple_name(), "DefaultOrderService");
//! ```

use crate::error::ResolveError;
use crate::instance::{
    cast_function, self_cast_function, CastFunction, ConstructorFunction, ServiceInstanceAnyPtr,
    ServiceInstancePtr,
};
use crate::lifetime::ServiceLifetime;
use crate::provider::ServiceResolver;
use crate::service_id::{ServiceKey, TypeRef};
use derivative::Derivative;
use std::marker::PhantomData;
use std::sync::Arc;

/// A capability implemented by a type, together with the cast turning an implementation instance
/// into an instance of the capability.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct CapabilityDescriptor {
    pub service_type: TypeRef,

    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// Explicit list of services a type should be exposed as.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExposeServices {
    pub service_types: Vec<TypeRef>,

    /// Also expose services found by the naming convention.
    pub include_defaults: bool,

    /// Also expose the implementation type itself.
    pub include_self: bool,
}

impl ExposeServices {
    pub fn new() -> Self {
        Default::default()
    }

    /// Exposure used when a type carries no explicit declaration.
    pub fn conventional() -> Self {
        Self {
            service_types: Vec::new(),
            include_defaults: true,
            include_self: true,
        }
    }

    pub fn service<T: ?Sized + 'static>(mut self) -> Self {
        self.service_types.push(TypeRef::of::<T>());
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.include_defaults = true;
        self
    }

    pub fn with_self(mut self) -> Self {
        self.include_self = true;
        self
    }
}

/// A keyed service declaration. Keyed services are always exposed verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExposeKeyedService {
    pub key: ServiceKey,
    pub service_type: TypeRef,
}

/// How registration entries should treat entries already present for the same service.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum RegistrationMode {
    /// Always add a new entry.
    #[default]
    Add,
    /// Remove existing entries for the same service first.
    Replace,
    /// Only add if there's no entry for the same service.
    TryAdd,
}

/// Metadata of a single candidate implementation type.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ServiceTypeDescriptor {
    implementation: CapabilityDescriptor,

    /// Capabilities implemented by the type, excluding the type itself.
    pub capabilities: Vec<CapabilityDescriptor>,

    /// Explicit lifetime, overriding marker traits and registrar defaults.
    pub lifetime: Option<ServiceLifetime>,

    pub expose: Vec<ExposeServices>,

    pub expose_keyed: Vec<ExposeKeyedService>,

    pub registration_mode: RegistrationMode,

    /// Skip the type entirely during conventional registration.
    pub registration_disabled: bool,

    #[derivative(Debug = "ignore")]
    pub constructor: ConstructorFunction,
}

impl ServiceTypeDescriptor {
    /// Starts building a descriptor for `T` using given constructor.
    pub fn builder<T: Send + Sync + 'static>(
        constructor: fn(&dyn ServiceResolver) -> Result<T, ResolveError>,
    ) -> ServiceTypeDescriptorBuilder<T> {
        ServiceTypeDescriptorBuilder::new(constructor)
    }

    #[inline]
    pub fn implementation_type(&self) -> TypeRef {
        self.implementation.service_type
    }

    /// Checks if the type implements given capability, including being the capability itself.
    pub fn implements(&self, service_type: &TypeRef) -> bool {
        self.capability(service_type).is_some()
    }

    /// Returns the capability descriptor for given type, if implemented.
    pub fn capability(&self, service_type: &TypeRef) -> Option<&CapabilityDescriptor> {
        if *service_type == self.implementation.service_type {
            return Some(&self.implementation);
        }

        self.capabilities
            .iter()
            .find(|capability| capability.service_type == *service_type)
    }
}

/// Typed builder for [ServiceTypeDescriptor].
pub struct ServiceTypeDescriptorBuilder<T> {
    descriptor: ServiceTypeDescriptor,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ServiceTypeDescriptorBuilder<T> {
    fn new(constructor: fn(&dyn ServiceResolver) -> Result<T, ResolveError>) -> Self {
        Self {
            descriptor: ServiceTypeDescriptor {
                implementation: CapabilityDescriptor {
                    service_type: TypeRef::of::<T>(),
                    cast: self_cast_function::<T>(),
                },
                capabilities: Vec::new(),
                lifetime: None,
                expose: Vec::new(),
                expose_keyed: Vec::new(),
                registration_mode: RegistrationMode::Add,
                registration_disabled: false,
                constructor: Arc::new(move |resolver: &dyn ServiceResolver| {
                    constructor(resolver).map(|instance| {
                        ServiceInstancePtr::new(instance) as ServiceInstanceAnyPtr
                    })
                }),
            },
            _phantom: PhantomData,
        }
    }

    /// Declares `C` as a capability implemented by `T`.
    pub fn implements<C: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: fn(ServiceInstancePtr<T>) -> ServiceInstancePtr<C>,
    ) -> Self {
        let service_type = TypeRef::of::<C>();
        self.descriptor
            .capabilities
            .retain(|capability| capability.service_type != service_type);
        self.descriptor.capabilities.push(CapabilityDescriptor {
            service_type,
            cast: cast_function(cast),
        });
        self
    }

    pub fn lifetime(mut self, lifetime: ServiceLifetime) -> Self {
        self.descriptor.lifetime = Some(lifetime);
        self
    }

    pub fn expose(mut self, expose: ExposeServices) -> Self {
        self.descriptor.expose.push(expose);
        self
    }

    pub fn expose_keyed<C: ?Sized + 'static>(mut self, key: impl Into<ServiceKey>) -> Self {
        self.descriptor.expose_keyed.push(ExposeKeyedService {
            key: key.into(),
            service_type: TypeRef::of::<C>(),
        });
        self
    }

    pub fn registration_mode(mut self, registration_mode: RegistrationMode) -> Self {
        self.descriptor.registration_mode = registration_mode;
        self
    }

    pub fn disable_registration(mut self) -> Self {
        self.descriptor.registration_disabled = true;
        self
    }

    pub fn build(self) -> ServiceTypeDescriptor {
        self.descriptor
    }
}

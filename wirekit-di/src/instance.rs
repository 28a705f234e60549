//! Pointer and function types shared by everything that stores or hands out service instances.

use crate::error::ResolveError;
use crate::provider::ServiceResolver;
use std::any::Any;
use std::error::Error;
use std::sync::Arc;

pub type ServiceInstancePtr<T> = Arc<T>;

/// Type-erased instance of a concrete implementation type.
pub type ServiceInstanceAnyPtr = ServiceInstancePtr<dyn Any + Send + Sync + 'static>;

pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Casts an erased implementation instance to a boxed `ServiceInstancePtr<Capability>`. Each
/// exposed capability of an implementation type carries its own cast, which is how one concrete
/// instance can be handed out under several capability types. Returns the original pointer when
/// the instance is not of the expected implementation type.
pub type CastFunction = Arc<
    dyn Fn(ServiceInstanceAnyPtr) -> Result<Box<dyn Any + Send>, ServiceInstanceAnyPtr>
        + Send
        + Sync,
>;

/// Creates a new erased instance of an implementation type.
pub type ConstructorFunction = Arc<
    dyn Fn(&dyn ServiceResolver) -> Result<ServiceInstanceAnyPtr, ResolveError> + Send + Sync,
>;

/// Builds a [CastFunction] from a typed upcast, e.g. `|this| this as Arc<dyn Trait + Send + Sync>`.
pub fn cast_function<T, C>(cast: fn(ServiceInstancePtr<T>) -> ServiceInstancePtr<C>) -> CastFunction
where
    T: Send + Sync + 'static,
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(move |instance: ServiceInstanceAnyPtr| {
        instance
            .downcast::<T>()
            .map(|instance| Box::new(cast(instance)) as Box<dyn Any + Send>)
    })
}

/// Cast handing out the implementation type itself.
pub fn self_cast_function<T: Send + Sync + 'static>() -> CastFunction {
    cast_function::<T, T>(|instance| instance)
}

/// Converts any error into an [ErrorPtr], e.g. for returning from constructors.
pub fn error_ptr<E: Error + Send + Sync + 'static>(error: E) -> ErrorPtr {
    Arc::new(error) as ErrorPtr
}

use crate::instance::ErrorPtr;
use crate::service_id::ServiceId;
use thiserror::Error;

/// Errors related to resolving service instances.
#[derive(Error, Clone, Debug)]
pub enum ResolveError {
    #[error("No service registered for: {0}")]
    NotRegistered(ServiceId),
    #[error("Tried to cast service to incompatible type: {0}")]
    IncompatibleService(ServiceId),
    #[error("Cannot find redirect target {target} of implementation {implementation_type} for: {service}")]
    MissingRedirectTarget {
        service: ServiceId,
        target: ServiceId,
        implementation_type: String,
    },
    #[error("Circular dependency detected: {}", path.join(" -> "))]
    CircularDependency { path: Vec<String> },
    #[error("Error in service constructor: {0}")]
    ConstructorError(ErrorPtr),
}

/// Errors raised while turning declarative service metadata into registration entries. All of
/// them are configuration mistakes and are reported at scan time.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum RegistrationError {
    #[error("Empty service key declared for keyed service {service_type} of: {implementation_type}")]
    EmptyServiceKey {
        implementation_type: String,
        service_type: String,
    },
    #[error("Type {implementation_type} is exposed as {service_type}, which it does not implement")]
    UnsatisfiedService {
        implementation_type: String,
        service_type: String,
    },
}

//! Convention-based dependency injection.
//!
//! Implementation types are described by [ServiceTypeDescriptor](descriptor::ServiceTypeDescriptor)s,
//! which get turned into [RegistrationEntries](service_collection::RegistrationEntry) by a
//! [ConventionalRegistrar](conventional::ConventionalRegistrar). Registered services are then
//! resolved by a [ServiceProvider](provider::ServiceProvider), which takes care of
//! [lifetimes](lifetime::ServiceLifetime) and of sharing a single instance between all services
//! an implementation is exposed as.
//!
//! Candidate types are usually discovered per crate by a [TypeScanner](scan::TypeScanner) - types
//! submitted with [register_service!] are found automatically by
//! [InventoryTypeScanner](scan::InventoryTypeScanner).
//!
//! For short-lived units of work, [CachedServiceResolver](cached::CachedServiceResolver) can be
//! layered on top of a provider scope to resolve every service at most once.

pub mod cached;
pub mod conventional;
pub mod descriptor;
mod error;
pub mod instance;
pub mod lifetime;
pub mod provider;
pub mod scan;
pub mod scope;
pub mod service_collection;
pub mod service_id;

pub use error::{RegistrationError, ResolveError};

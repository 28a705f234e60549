//! Service lifetimes decide how instances are shared:
//!
//! * [ServiceLifetime::Transient] - a new instance on every resolution
//! * [ServiceLifetime::Scoped] - one instance per [provider scope](crate::provider::ServiceProvider::create_scope)
//! * [ServiceLifetime::Singleton] - one instance per root provider
//!
//! A type can declare its lifetime explicitly in its
//! [descriptor](crate::descriptor::ServiceTypeDescriptor), or by implementing one of the marker
//! traits: [TransientDependency], [ScopedDependency] or [SingletonDependency] and listing the
//! marker as a capability.

use crate::descriptor::ServiceTypeDescriptor;
use crate::service_id::TypeRef;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum ServiceLifetime {
    Transient,
    Scoped,
    Singleton,
}

impl ServiceLifetime {
    /// Derives the lifetime from marker capabilities of given type, checked in transient,
    /// singleton, scoped order.
    pub fn from_markers(descriptor: &ServiceTypeDescriptor) -> Option<Self> {
        [
            (TypeRef::of::<dyn TransientDependency>(), Self::Transient),
            (TypeRef::of::<dyn SingletonDependency>(), Self::Singleton),
            (TypeRef::of::<dyn ScopedDependency>(), Self::Scoped),
        ]
        .into_iter()
        .find_map(|(marker, lifetime)| descriptor.implements(&marker).then_some(lifetime))
    }

    /// Can a single instance be handed out for multiple resolutions?
    #[inline]
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::Transient)
    }
}

impl Display for ServiceLifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Transient => "transient",
            Self::Scoped => "scoped",
            Self::Singleton => "singleton",
        })
    }
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("Unknown service lifetime: {0}")]
pub struct UnknownLifetimeError(pub String);

impl FromStr for ServiceLifetime {
    type Err = UnknownLifetimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "transient" => Ok(Self::Transient),
            "scoped" => Ok(Self::Scoped),
            "singleton" => Ok(Self::Singleton),
            _ => Err(UnknownLifetimeError(value.to_string())),
        }
    }
}

/// Marks a type as registered with [ServiceLifetime::Transient] by convention.
pub trait TransientDependency: Send + Sync {}

/// Marks a type as registered with [ServiceLifetime::Scoped] by convention.
pub trait ScopedDependency: Send + Sync {}

/// Marks a type as registered with [ServiceLifetime::Singleton] by convention.
pub trait SingletonDependency: Send + Sync {}

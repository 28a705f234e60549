//! Functionality related to storing [RegistrationEntries](RegistrationEntry). A [ServiceRegistry]
//! receives entries from the [conventional registrar](crate::conventional) or from manual
//! registrations, and a [ServiceProvider](crate::provider::ServiceProvider) later resolves services
//! based on them.

use crate::descriptor::RegistrationMode;
use crate::error::ResolveError;
use crate::instance::{
    self_cast_function, CastFunction, ConstructorFunction, ServiceInstanceAnyPtr,
    ServiceInstancePtr,
};
use crate::lifetime::ServiceLifetime;
use crate::provider::{ServiceProvider, ServiceResolver};
use crate::service_id::{ServiceId, TypeRef};
use derivative::Derivative;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::trace;

/// A single "implementation provides capability with lifetime" entry.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct RegistrationEntry {
    pub implementation_type: TypeRef,

    pub exposed_as: ServiceId,

    pub lifetime: ServiceLifetime,

    /// When present, resolving [Self::exposed_as] delegates to the entry registered for the same
    /// implementation under this type (and the same key), so no second instance is created.
    pub redirect_to: Option<TypeRef>,

    #[derivative(Debug = "ignore")]
    pub constructor: ConstructorFunction,

    /// Cast from the implementation instance to the exposed capability.
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl RegistrationEntry {
    /// Identifier of the redirect target, if this entry is a redirect.
    pub fn redirect_id(&self) -> Option<ServiceId> {
        self.redirect_to
            .map(|target| self.exposed_as.sibling(target))
    }

    #[inline]
    pub fn is_redirect(&self) -> bool {
        self.redirect_to.is_some()
    }
}

/// Registry abstraction storing [RegistrationEntries](RegistrationEntry).
#[cfg_attr(test, automock)]
pub trait ServiceRegistry {
    /// Stores given entry according to the mode. Returns `false` if the entry was not added, which
    /// can only happen for [RegistrationMode::TryAdd].
    fn register(&mut self, entry: RegistrationEntry, mode: RegistrationMode) -> bool;

    /// Checks if there's at least one entry for given service.
    fn is_registered(&self, service: &ServiceId) -> bool;
}

/// Ordered collection of registration entries, which can be turned into a
/// [ServiceProvider].
#[derive(Clone, Debug, Default)]
pub struct ServiceCollection {
    entries: Vec<RegistrationEntry>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn add(&mut self, entry: RegistrationEntry) {
        trace!(
            service = %entry.exposed_as,
            implementation = %entry.implementation_type,
            "Adding service entry"
        );
        self.entries.push(entry);
    }

    /// Removes all entries for the exposed service and adds the given one.
    pub fn replace(&mut self, entry: RegistrationEntry) {
        self.entries
            .retain(|existing| existing.exposed_as != entry.exposed_as);
        self.add(entry);
    }

    /// Adds given entry only if the exposed service is not registered yet.
    pub fn try_add(&mut self, entry: RegistrationEntry) -> bool {
        if self.contains(&entry.exposed_as) {
            return false;
        }

        self.add(entry);
        true
    }

    /// Registers an already created instance as a singleton exposed as `T`.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, instance: ServiceInstancePtr<T>) {
        let instance = instance as ServiceInstanceAnyPtr;
        self.add(RegistrationEntry {
            implementation_type: TypeRef::of::<T>(),
            exposed_as: ServiceId::of::<T>(),
            lifetime: ServiceLifetime::Singleton,
            redirect_to: None,
            constructor: Arc::new(move |_: &dyn ServiceResolver| {
                Ok::<_, ResolveError>(instance.clone())
            }),
            cast: self_cast_function::<T>(),
        });
    }

    #[inline]
    pub fn contains(&self, service: &ServiceId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.exposed_as == *service)
    }

    #[inline]
    pub fn entries(&self) -> &[RegistrationEntry] {
        &self.entries
    }

    /// Returns entries for given service in registration order.
    pub fn entries_for<'a>(
        &'a self,
        service: &'a ServiceId,
    ) -> impl Iterator<Item = &'a RegistrationEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.exposed_as == *service)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freezes the collection into a root [ServiceProvider].
    pub fn build_provider(self) -> ServiceProvider {
        ServiceProvider::new(self)
    }
}

impl ServiceRegistry for ServiceCollection {
    fn register(&mut self, entry: RegistrationEntry, mode: RegistrationMode) -> bool {
        match mode {
            RegistrationMode::Add => {
                self.add(entry);
                true
            }
            RegistrationMode::Replace => {
                self.replace(entry);
                true
            }
            RegistrationMode::TryAdd => self.try_add(entry),
        }
    }

    #[inline]
    fn is_registered(&self, service: &ServiceId) -> bool {
        self.contains(service)
    }
}

impl IntoIterator for ServiceCollection {
    type Item = RegistrationEntry;
    type IntoIter = std::vec::IntoIter<RegistrationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

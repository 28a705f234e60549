//! The type scan feed: candidate implementation types, grouped by the [assembly](AssemblyRef)
//! (crate) they are defined in. Types can be submitted statically with [register_service!] and
//! discovered by [InventoryTypeScanner], or listed explicitly with [StaticTypeScanner].

use crate::descriptor::ServiceTypeDescriptor;
use crate::scan::internal::ServiceTypeRegisterer;
use itertools::Itertools;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Reference to a crate, which is the unit of type scanning and module ownership.
#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct AssemblyRef(Cow<'static, str>);

impl AssemblyRef {
    /// Creates a reference from a crate name. Dashes are normalized to underscores, so both
    /// package and crate names can be used.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if name.contains('-') {
            Self(Cow::Owned(name.replace('-', "_")))
        } else {
            Self(name)
        }
    }

    /// The crate defining `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        crate::service_id::TypeRef::of::<T>().assembly()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for AssemblyRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of candidate implementation types.
pub trait TypeScanner {
    /// Returns descriptors of all candidate types defined in given assembly, in a stable order.
    fn scan(&self, assembly: &AssemblyRef) -> Vec<ServiceTypeDescriptor>;
}

/// Scanner returning types submitted with [register_service!].
#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryTypeScanner;

impl TypeScanner for InventoryTypeScanner {
    fn scan(&self, assembly: &AssemblyRef) -> Vec<ServiceTypeDescriptor> {
        inventory::iter::<ServiceTypeRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .filter(|descriptor| descriptor.implementation_type().assembly() == *assembly)
            .sorted_by_key(|descriptor| descriptor.implementation_type().name())
            .collect_vec()
    }
}

/// Scanner over an explicit list of descriptors.
#[derive(Clone, Debug, Default)]
pub struct StaticTypeScanner {
    descriptors: Vec<ServiceTypeDescriptor>,
}

impl StaticTypeScanner {
    pub fn new(descriptors: Vec<ServiceTypeDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn with_type(mut self, descriptor: ServiceTypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }
}

impl TypeScanner for StaticTypeScanner {
    fn scan(&self, assembly: &AssemblyRef) -> Vec<ServiceTypeDescriptor> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.implementation_type().assembly() == *assembly)
            .cloned()
            .collect_vec()
    }
}

/// Submits a [ServiceTypeDescriptor] for discovery by [InventoryTypeScanner]. The argument is an
/// expression evaluated lazily on each scan.
///
/// ```ignore
/// register_service!(ServiceTypeDescriptor::builder(|_| Ok(DefaultOrderService))
///     .implements::<dyn OrderService>(|this| this as Arc<dyn OrderService>)
///     .build());
/// ```
#[macro_export]
macro_rules! register_service {
    ($descriptor:expr) => {
        const _: () = {
            fn register() -> $crate::descriptor::ServiceTypeDescriptor {
                $descriptor
            }

            $crate::scan::internal::submit! {
                $crate::scan::internal::ServiceTypeRegisterer {
                    register
                }
            }
        };
    };
}

#[doc(hidden)]
pub mod internal {
    use crate::descriptor::ServiceTypeDescriptor;
    use inventory::collect;
    pub use inventory::submit;

    pub struct ServiceTypeRegisterer {
        pub register: fn() -> ServiceTypeDescriptor,
    }

    collect!(ServiceTypeRegisterer);
}

#[cfg(test)]
mod tests {
    use crate::descriptor::ServiceTypeDescriptor;
    use crate::scan::{AssemblyRef, InventoryTypeScanner, StaticTypeScanner, TypeScanner};
    use crate::service_id::TypeRef;

    struct Registered;

    crate::register_service!(ServiceTypeDescriptor::builder(|_| Ok(Registered)).build());

    #[test]
    fn should_normalize_assembly_names() {
        assert_eq!(AssemblyRef::new("wirekit-di"), AssemblyRef::new("wirekit_di"));
        assert_eq!(AssemblyRef::of::<Registered>().name(), "wirekit_di");
    }

    #[test]
    fn should_scan_static_types_by_assembly() {
        let scanner = StaticTypeScanner::default()
            .with_type(ServiceTypeDescriptor::builder(|_| Ok(Registered)).build());

        assert_eq!(scanner.scan(&AssemblyRef::new("wirekit_di")).len(), 1);
        assert!(scanner.scan(&AssemblyRef::new("other")).is_empty());
    }

    #[test]
    fn should_discover_registered_types() {
        let descriptors = InventoryTypeScanner.scan(&AssemblyRef::new("wirekit_di"));

        assert!(descriptors
            .iter()
            .any(|descriptor| descriptor.implementation_type() == TypeRef::of::<Registered>()));
    }
}

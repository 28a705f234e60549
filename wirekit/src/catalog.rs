//! Module metadata. A [ModuleDeclaration] is the type-erased form of a [ModuleType], read by the
//! [module graph builder](crate::module_graph) through a [ModuleMetadataReader]. The default
//! reader is the [ModuleCatalog], which knows explicitly added modules and modules submitted with
//! [register_module!].

use crate::catalog::internal::ModuleRegisterer;
use crate::module::{ModulePtr, ModuleType};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use std::iter::once;
use std::sync::Arc;
use wirekit_di::instance::ErrorPtr;
use wirekit_di::scan::AssemblyRef;
use wirekit_di::service_id::TypeRef;

pub type ModuleConstructor = fn() -> Result<ModulePtr, ErrorPtr>;

/// Type-erased metadata of a module type.
#[derive(Clone, Copy, Derivative)]
#[derivative(Debug)]
pub struct ModuleDeclaration {
    pub module_type: TypeRef,

    #[derivative(Debug = "ignore")]
    pub dependencies: fn() -> Vec<TypeRef>,

    #[derivative(Debug = "ignore")]
    pub assemblies: fn() -> Vec<AssemblyRef>,

    /// Declarations without a constructor describe abstract modules, which can't be part of an
    /// application.
    #[derivative(Debug = "ignore")]
    pub constructor: Option<ModuleConstructor>,
}

fn module_assemblies<M: ModuleType>() -> Vec<AssemblyRef> {
    once(AssemblyRef::of::<M>())
        .chain(M::additional_assemblies())
        .unique()
        .collect_vec()
}

fn create_module<M: ModuleType>() -> Result<ModulePtr, ErrorPtr> {
    M::create().map(|module| Arc::new(module) as ModulePtr)
}

fn no_dependencies() -> Vec<TypeRef> {
    Vec::new()
}

fn no_assemblies() -> Vec<AssemblyRef> {
    Vec::new()
}

impl ModuleDeclaration {
    pub fn of<M: ModuleType>() -> Self {
        Self {
            module_type: TypeRef::of::<M>(),
            dependencies: M::dependencies,
            assemblies: module_assemblies::<M>,
            constructor: Some(create_module::<M>),
        }
    }

    /// Declaration of a type which can't be instantiated as a module.
    pub fn abstract_module<T: ?Sized + 'static>() -> Self {
        Self {
            module_type: TypeRef::of::<T>(),
            dependencies: no_dependencies,
            assemblies: no_assemblies,
            constructor: None,
        }
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.constructor.is_none()
    }
}

/// Source of module metadata.
#[cfg_attr(test, automock)]
pub trait ModuleMetadataReader {
    /// Returns the declaration of given module type, if known.
    fn read(&self, module_type: &TypeRef) -> Option<ModuleDeclaration>;

    /// Finds a declaration by full type name or, if not found, by simple type name.
    fn find_by_name(&self, name: &str) -> Option<ModuleDeclaration>;
}

/// Registry of known module declarations.
#[derive(Clone, Debug, Default)]
pub struct ModuleCatalog {
    declarations: FxHashMap<TypeRef, ModuleDeclaration>,
}

impl ModuleCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a catalog with all modules submitted with [register_module!].
    pub fn from_registered() -> Self {
        let mut catalog = Self::new();
        for registerer in inventory::iter::<ModuleRegisterer> {
            catalog.add((registerer.register)());
        }

        catalog
    }

    /// Adds a declaration, replacing any previous one for the same module type.
    pub fn add(&mut self, declaration: ModuleDeclaration) {
        self.declarations
            .insert(declaration.module_type, declaration);
    }

    pub fn add_module<M: ModuleType>(&mut self) {
        self.add(ModuleDeclaration::of::<M>());
    }

    pub fn with_module<M: ModuleType>(mut self) -> Self {
        self.add_module::<M>();
        self
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl ModuleMetadataReader for ModuleCatalog {
    fn read(&self, module_type: &TypeRef) -> Option<ModuleDeclaration> {
        self.declarations.get(module_type).copied()
    }

    fn find_by_name(&self, name: &str) -> Option<ModuleDeclaration> {
        let by_name = |matches: fn(&TypeRef, &str) -> bool| {
            self.declarations
                .values()
                .filter(|declaration| matches(&declaration.module_type, name))
                .min_by_key(|declaration| declaration.module_type.name())
                .copied()
        };

        by_name(|module_type, name| module_type.name() == name)
            .or_else(|| by_name(|module_type, name| module_type.simple_name() == name))
    }
}

/// Submits a [ModuleType] to be found by [ModuleCatalog::from_registered].
#[macro_export]
macro_rules! register_module {
    ($module:ty) => {
        const _: () = {
            fn register() -> $crate::catalog::ModuleDeclaration {
                $crate::catalog::ModuleDeclaration::of::<$module>()
            }

            $crate::catalog::internal::submit! {
                $crate::catalog::internal::ModuleRegisterer {
                    register
                }
            }
        };
    };
}

#[doc(hidden)]
pub mod internal {
    use crate::catalog::ModuleDeclaration;
    use inventory::collect;
    pub use inventory::submit;

    pub struct ModuleRegisterer {
        pub register: fn() -> ModuleDeclaration,
    }

    collect!(ModuleRegisterer);
}

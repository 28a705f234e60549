//! Modules are units of application composition. Each module declares other modules it depends
//! on, owns one or more assemblies (crates) with services, and can take part in any
//! [lifecycle stage](crate::lifecycle::LifecycleStage) by implementing the matching stage trait and
//! returning itself from the corresponding `as_*` accessor:
//!
//! ```
//! use wirekit::context::ServiceConfigurationContext;
//! use wirekit::module::{ConfigureServices, Module, ModuleType};
//! use wirekit_di::instance::ErrorPtr;
//!
//! struct CoreModule;
//!
//! impl Module for CoreModule {
//!     fn as_configure_services(&self) -> Option<&dyn ConfigureServices> {
//!         Some(self)
//!     }
//! }
//!
//! impl ConfigureServices for CoreModule {
//!     fn configure_services(
//!         &self,
//!         context: &mut ServiceConfigurationContext,
//!     ) -> Result<(), ErrorPtr> {
//!         context.services_mut().add_instance(std::sync::Arc::new(42_u32));
//!         Ok(())
//!     }
//! }
//!
//! impl ModuleType for CoreModule {
//!     fn create() -> Result<Self, ErrorPtr> {
//!         Ok(Self)
//!     }
//! }
//! ```

use crate::context::{
    ApplicationInitializationContext, ApplicationShutdownContext, ServiceConfigurationContext,
};
use derivative::Derivative;
use futures::future::BoxFuture;
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use wirekit_di::instance::ErrorPtr;
use wirekit_di::scan::AssemblyRef;
use wirekit_di::service_id::TypeRef;

pub type ModulePtr = Arc<dyn Module>;

/// Base trait for all modules. Stage participation is discovered through the `as_*` accessors,
/// which return `None` by default.
pub trait Module: Send + Sync + 'static {
    fn as_pre_configure_services(&self) -> Option<&dyn PreConfigureServices> {
        None
    }

    fn as_configure_services(&self) -> Option<&dyn ConfigureServices> {
        None
    }

    fn as_post_configure_services(&self) -> Option<&dyn PostConfigureServices> {
        None
    }

    fn as_pre_application_initialization(&self) -> Option<&dyn OnPreApplicationInitialization> {
        None
    }

    fn as_application_initialization(&self) -> Option<&dyn OnApplicationInitialization> {
        None
    }

    fn as_post_application_initialization(
        &self,
    ) -> Option<&dyn OnPostApplicationInitialization> {
        None
    }

    fn as_application_shutdown(&self) -> Option<&dyn OnApplicationShutdown> {
        None
    }

    /// Should assemblies of this module be skipped by automatic service registration.
    fn skip_auto_service_registration(&self) -> bool {
        false
    }
}

#[cfg_attr(test, automock)]
pub trait PreConfigureServices: Send + Sync {
    fn pre_configure_services(
        &self,
        context: &mut ServiceConfigurationContext,
    ) -> Result<(), ErrorPtr>;
}

#[cfg_attr(test, automock)]
pub trait ConfigureServices: Send + Sync {
    fn configure_services(&self, context: &mut ServiceConfigurationContext)
        -> Result<(), ErrorPtr>;
}

#[cfg_attr(test, automock)]
pub trait PostConfigureServices: Send + Sync {
    fn post_configure_services(
        &self,
        context: &mut ServiceConfigurationContext,
    ) -> Result<(), ErrorPtr>;
}

// Asynchronous stages receive their own copy of the context, so the returned future doesn't need
// to borrow it.

#[cfg_attr(test, automock)]
pub trait OnPreApplicationInitialization: Send + Sync {
    fn on_pre_application_initialization(
        &self,
        context: ApplicationInitializationContext,
    ) -> BoxFuture<'_, Result<(), ErrorPtr>>;
}

#[cfg_attr(test, automock)]
pub trait OnApplicationInitialization: Send + Sync {
    fn on_application_initialization(
        &self,
        context: ApplicationInitializationContext,
    ) -> BoxFuture<'_, Result<(), ErrorPtr>>;
}

#[cfg_attr(test, automock)]
pub trait OnPostApplicationInitialization: Send + Sync {
    fn on_post_application_initialization(
        &self,
        context: ApplicationInitializationContext,
    ) -> BoxFuture<'_, Result<(), ErrorPtr>>;
}

#[cfg_attr(test, automock)]
pub trait OnApplicationShutdown: Send + Sync {
    fn on_application_shutdown(
        &self,
        context: ApplicationShutdownContext,
    ) -> BoxFuture<'_, Result<(), ErrorPtr>>;
}

/// Static metadata of a concrete module type.
pub trait ModuleType: Module + Sized {
    fn create() -> Result<Self, ErrorPtr>;

    /// Module types this module depends on.
    fn dependencies() -> Vec<TypeRef> {
        Vec::new()
    }

    /// Assemblies owned by this module, besides the one it's defined in.
    fn additional_assemblies() -> Vec<AssemblyRef> {
        Vec::new()
    }
}

/// A module discovered while building the module graph. There is exactly one descriptor per module
/// type, holding the only instance of that module.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ModuleDescriptor {
    module_type: TypeRef,
    assemblies: Vec<AssemblyRef>,
    #[derivative(Debug = "ignore")]
    instance: ModulePtr,
    is_plugin: bool,
    #[derivative(Debug = "ignore")]
    dependencies: RwLock<Vec<Weak<ModuleDescriptor>>>,
}

impl ModuleDescriptor {
    pub fn new(
        module_type: TypeRef,
        assemblies: Vec<AssemblyRef>,
        instance: ModulePtr,
        is_plugin: bool,
    ) -> Self {
        Self {
            module_type,
            assemblies,
            instance,
            is_plugin,
            dependencies: Default::default(),
        }
    }

    #[inline]
    pub fn module_type(&self) -> TypeRef {
        self.module_type
    }

    #[inline]
    pub fn assemblies(&self) -> &[AssemblyRef] {
        &self.assemblies
    }

    #[inline]
    pub fn instance(&self) -> &dyn Module {
        self.instance.as_ref()
    }

    #[inline]
    pub fn is_plugin(&self) -> bool {
        self.is_plugin
    }

    /// Linked dependencies, in declaration order.
    pub fn dependencies(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.dependencies
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Links a dependency. Linking the same descriptor twice has no effect.
    pub fn add_dependency(&self, dependency: &Arc<ModuleDescriptor>) {
        let mut dependencies = self.dependencies.write();
        let dependency = Arc::downgrade(dependency);
        if !dependencies
            .iter()
            .any(|existing| existing.ptr_eq(&dependency))
        {
            dependencies.push(dependency);
        }
    }
}

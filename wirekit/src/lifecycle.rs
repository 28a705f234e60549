//! Module lifecycle orchestration.
//!
//! Modules go through the following [stages](LifecycleStage), each run for all modules before the
//! next one starts:
//!
//! 1. [PreConfigureServices](LifecycleStage::PreConfigureServices)
//! 2. [ConfigureServices](LifecycleStage::ConfigureServices) - before the module callback, services
//!    from the module assemblies are registered automatically
//! 3. [PostConfigureServices](LifecycleStage::PostConfigureServices)
//! 4. [PreInitialization](LifecycleStage::PreInitialization)
//! 5. [Initialization](LifecycleStage::Initialization)
//! 6. [PostInitialization](LifecycleStage::PostInitialization)
//! 7. [Shutdown](LifecycleStage::Shutdown) - run in reverse module order
//!
//! Modules are processed strictly one after another, in dependency order. Asynchronous stages are
//! awaited before moving to the next module. The first error aborts the whole sequence.

use crate::context::{
    ApplicationInitializationContext, ApplicationShutdownContext, ServiceConfigurationContext,
};
use crate::module::ModuleDescriptor;
use derive_more::Display;
use futures::future::{ready, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use wirekit_di::instance::{error_ptr, ErrorPtr};

#[derive(Clone, Copy, Debug, Display, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum LifecycleStage {
    #[display(fmt = "pre-configure services")]
    PreConfigureServices,
    #[display(fmt = "configure services")]
    ConfigureServices,
    #[display(fmt = "post-configure services")]
    PostConfigureServices,
    #[display(fmt = "pre-initialization")]
    PreInitialization,
    #[display(fmt = "initialization")]
    Initialization,
    #[display(fmt = "post-initialization")]
    PostInitialization,
    #[display(fmt = "shutdown")]
    Shutdown,
}

impl LifecycleStage {
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

#[derive(Error, Clone, Debug)]
pub enum ModuleLifecycleError {
    #[error("Error in {stage} stage of module {module}: {source}")]
    Stage {
        stage: LifecycleStage,
        module: String,
        source: ErrorPtr,
    },
}

/// Runs one of the service configuration stages for a single module.
pub trait ServiceConfigurationContributor: Send + Sync {
    fn stage(&self) -> LifecycleStage;

    fn configure(
        &self,
        context: &mut ServiceConfigurationContext,
        module: &ModuleDescriptor,
    ) -> Result<(), ErrorPtr>;
}

/// Runs initialization or shutdown stages for a single module. Both do nothing by default.
pub trait ModuleLifecycleContributor: Send + Sync {
    fn stage(&self) -> LifecycleStage;

    fn initialize<'a>(
        &'a self,
        _context: ApplicationInitializationContext,
        _module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        ready(Ok(())).boxed()
    }

    fn shutdown<'a>(
        &'a self,
        _context: ApplicationShutdownContext,
        _module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        ready(Ok(())).boxed()
    }
}

pub type ServiceConfigurationContributorPtr = Box<dyn ServiceConfigurationContributor>;

pub type ModuleLifecycleContributorPtr = Box<dyn ModuleLifecycleContributor>;

#[derive(Clone, Copy, Debug, Default)]
pub struct PreConfigureServicesContributor;

impl ServiceConfigurationContributor for PreConfigureServicesContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::PreConfigureServices
    }

    fn configure(
        &self,
        context: &mut ServiceConfigurationContext,
        module: &ModuleDescriptor,
    ) -> Result<(), ErrorPtr> {
        match module.instance().as_pre_configure_services() {
            Some(stage) => stage.pre_configure_services(context),
            None => Ok(()),
        }
    }
}

/// Registers services from module assemblies and calls the module.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigureServicesContributor;

impl ServiceConfigurationContributor for ConfigureServicesContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::ConfigureServices
    }

    fn configure(
        &self,
        context: &mut ServiceConfigurationContext,
        module: &ModuleDescriptor,
    ) -> Result<(), ErrorPtr> {
        let instance = module.instance();
        if !instance.skip_auto_service_registration() {
            for assembly in module.assemblies() {
                context.register_assembly(assembly).map_err(error_ptr)?;
            }
        }

        match instance.as_configure_services() {
            Some(stage) => stage.configure_services(context),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PostConfigureServicesContributor;

impl ServiceConfigurationContributor for PostConfigureServicesContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::PostConfigureServices
    }

    fn configure(
        &self,
        context: &mut ServiceConfigurationContext,
        module: &ModuleDescriptor,
    ) -> Result<(), ErrorPtr> {
        match module.instance().as_post_configure_services() {
            Some(stage) => stage.post_configure_services(context),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PreInitializationContributor;

impl ModuleLifecycleContributor for PreInitializationContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::PreInitialization
    }

    fn initialize<'a>(
        &'a self,
        context: ApplicationInitializationContext,
        module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        match module.instance().as_pre_application_initialization() {
            Some(stage) => stage.on_pre_application_initialization(context),
            None => ready(Ok(())).boxed(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InitializationContributor;

impl ModuleLifecycleContributor for InitializationContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::Initialization
    }

    fn initialize<'a>(
        &'a self,
        context: ApplicationInitializationContext,
        module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        match module.instance().as_application_initialization() {
            Some(stage) => stage.on_application_initialization(context),
            None => ready(Ok(())).boxed(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PostInitializationContributor;

impl ModuleLifecycleContributor for PostInitializationContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::PostInitialization
    }

    fn initialize<'a>(
        &'a self,
        context: ApplicationInitializationContext,
        module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        match module.instance().as_post_application_initialization() {
            Some(stage) => stage.on_post_application_initialization(context),
            None => ready(Ok(())).boxed(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ShutdownContributor;

impl ModuleLifecycleContributor for ShutdownContributor {
    fn stage(&self) -> LifecycleStage {
        LifecycleStage::Shutdown
    }

    fn shutdown<'a>(
        &'a self,
        context: ApplicationShutdownContext,
        module: &'a ModuleDescriptor,
    ) -> BoxFuture<'a, Result<(), ErrorPtr>> {
        match module.instance().as_application_shutdown() {
            Some(stage) => stage.on_application_shutdown(context),
            None => ready(Ok(())).boxed(),
        }
    }
}

/// Service configuration contributors in stage order.
pub fn default_service_configuration_contributors() -> Vec<ServiceConfigurationContributorPtr> {
    vec![
        Box::new(PreConfigureServicesContributor),
        Box::new(ConfigureServicesContributor),
        Box::new(PostConfigureServicesContributor),
    ]
}

/// Lifecycle contributors in stage order.
pub fn default_lifecycle_contributors() -> Vec<ModuleLifecycleContributorPtr> {
    vec![
        Box::new(PreInitializationContributor),
        Box::new(InitializationContributor),
        Box::new(PostInitializationContributor),
        Box::new(ShutdownContributor),
    ]
}

fn stage_error(
    stage: LifecycleStage,
    module: &ModuleDescriptor,
) -> impl FnOnce(ErrorPtr) -> ModuleLifecycleError {
    let module = module.module_type().name().to_string();
    move |source| ModuleLifecycleError::Stage {
        stage,
        module,
        source,
    }
}

/// Drives lifecycle stages over a sorted list of modules.
pub struct ModuleManager {
    modules: Vec<Arc<ModuleDescriptor>>,
    service_contributors: Vec<ServiceConfigurationContributorPtr>,
    lifecycle_contributors: Vec<ModuleLifecycleContributorPtr>,
}

impl ModuleManager {
    /// Creates a manager with default contributors.
    pub fn new(modules: Vec<Arc<ModuleDescriptor>>) -> Self {
        Self::with_contributors(
            modules,
            default_service_configuration_contributors(),
            default_lifecycle_contributors(),
        )
    }

    pub fn with_contributors(
        modules: Vec<Arc<ModuleDescriptor>>,
        service_contributors: Vec<ServiceConfigurationContributorPtr>,
        lifecycle_contributors: Vec<ModuleLifecycleContributorPtr>,
    ) -> Self {
        Self {
            modules,
            service_contributors,
            lifecycle_contributors,
        }
    }

    pub fn add_service_contributor(&mut self, contributor: ServiceConfigurationContributorPtr) {
        self.service_contributors.push(contributor);
    }

    pub fn add_lifecycle_contributor(&mut self, contributor: ModuleLifecycleContributorPtr) {
        self.lifecycle_contributors.push(contributor);
    }

    /// Modules in dependency order.
    #[inline]
    pub fn modules(&self) -> &[Arc<ModuleDescriptor>] {
        &self.modules
    }

    /// Runs all service configuration stages.
    pub fn configure_services(
        &self,
        context: &mut ServiceConfigurationContext,
    ) -> Result<(), ModuleLifecycleError> {
        for contributor in &self.service_contributors {
            let stage = contributor.stage();
            info!("Running stage: {stage}");

            for module in &self.modules {
                debug!(module = module.module_type().name(), %stage, "Configuring module");
                contributor
                    .configure(context, module)
                    .map_err(stage_error(stage, module))?;
            }
        }

        Ok(())
    }

    /// Runs all initialization stages in module order.
    pub async fn initialize_modules(
        &self,
        context: &ApplicationInitializationContext,
    ) -> Result<(), ModuleLifecycleError> {
        for contributor in self
            .lifecycle_contributors
            .iter()
            .filter(|contributor| !contributor.stage().is_shutdown())
        {
            let stage = contributor.stage();
            info!("Running stage: {stage}");

            for module in &self.modules {
                debug!(module = module.module_type().name(), %stage, "Initializing module");
                contributor
                    .initialize(context.clone(), module)
                    .await
                    .map_err(stage_error(stage, module))?;
            }
        }

        Ok(())
    }

    /// Runs the shutdown stages in reverse module order.
    pub async fn shutdown_modules(
        &self,
        context: &ApplicationShutdownContext,
    ) -> Result<(), ModuleLifecycleError> {
        for contributor in self
            .lifecycle_contributors
            .iter()
            .filter(|contributor| contributor.stage().is_shutdown())
        {
            let stage = contributor.stage();
            info!("Running stage: {stage}");

            for module in self.modules.iter().rev() {
                debug!(module = module.module_type().name(), %stage, "Shutting down module");
                contributor
                    .shutdown(context.clone(), module)
                    .await
                    .map_err(stage_error(stage, module))?;
            }
        }

        Ok(())
    }
}

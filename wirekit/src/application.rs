//! Core application bootstrap functionality.

use crate::catalog::{ModuleCatalog, ModuleDeclaration};
use crate::config::ApplicationConfig;
use crate::context::{
    ApplicationInitializationContext, ApplicationShutdownContext, ConventionalRegistrarPtr,
    ServiceConfigurationContext, TypeScannerPtr,
};
use crate::lifecycle::{
    ModuleLifecycleContributorPtr, ModuleLifecycleError, ModuleManager,
    ServiceConfigurationContributorPtr,
};
use crate::module::{ModuleDescriptor, ModuleType};
use crate::module_graph::{ModuleGraphBuilder, ModuleGraphError};
use crate::plugin::{NamedPlugInSource, PlugInSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wirekit_di::conventional::{ConventionalRegistrationOptions, DefaultConventionalRegistrar};
use wirekit_di::instance::ErrorPtr;
use wirekit_di::provider::ServiceProvider;
use wirekit_di::scan::{InventoryTypeScanner, TypeScanner};
use wirekit_di::service_id::TypeRef;

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading configuration: {0}")]
    ConfigError(ErrorPtr),
    #[error(transparent)]
    ModuleGraphError(#[from] ModuleGraphError),
    #[error(transparent)]
    LifecycleError(#[from] ModuleLifecycleError),
}

/// Builder for an [Application] with given root module. By default, the root module and all
/// modules submitted with [register_module!](crate::register_module) are known, services are
/// discovered with [InventoryTypeScanner], and the configuration is loaded from the environment.
pub struct ApplicationBuilder {
    root: TypeRef,
    catalog: ModuleCatalog,
    plugin_sources: Vec<Box<dyn PlugInSource>>,
    scanner: TypeScannerPtr,
    config: Option<ApplicationConfig>,
    registrars: Vec<ConventionalRegistrarPtr>,
    service_contributors: Vec<ServiceConfigurationContributorPtr>,
    lifecycle_contributors: Vec<ModuleLifecycleContributorPtr>,
}

impl ApplicationBuilder {
    pub fn new<Root: ModuleType>() -> Self {
        Self {
            root: TypeRef::of::<Root>(),
            catalog: ModuleCatalog::from_registered().with_module::<Root>(),
            plugin_sources: Vec::new(),
            scanner: Arc::new(InventoryTypeScanner),
            config: None,
            registrars: Vec::new(),
            service_contributors: Vec::new(),
            lifecycle_contributors: Vec::new(),
        }
    }

    /// Makes given module known to the application. Note: the module is only loaded if it's
    /// reachable from the root module or a plug-in.
    pub fn with_module<M: ModuleType>(mut self) -> Self {
        self.catalog.add_module::<M>();
        self
    }

    pub fn with_module_declaration(mut self, declaration: ModuleDeclaration) -> Self {
        self.catalog.add(declaration);
        self
    }

    pub fn with_plugin_source(mut self, source: impl PlugInSource + 'static) -> Self {
        self.plugin_sources.push(Box::new(source));
        self
    }

    pub fn with_type_scanner(mut self, scanner: impl TypeScanner + Send + Sync + 'static) -> Self {
        self.scanner = Arc::new(scanner);
        self
    }

    /// Uses given config instead of loading it from the environment.
    pub fn with_config(mut self, config: ApplicationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds a registrar run beside the default one.
    pub fn with_registrar(mut self, registrar: ConventionalRegistrarPtr) -> Self {
        self.registrars.push(registrar);
        self
    }

    pub fn with_service_contributor(
        mut self,
        contributor: ServiceConfigurationContributorPtr,
    ) -> Self {
        self.service_contributors.push(contributor);
        self
    }

    pub fn with_lifecycle_contributor(
        mut self,
        contributor: ModuleLifecycleContributorPtr,
    ) -> Self {
        self.lifecycle_contributors.push(contributor);
        self
    }

    /// Builds the module graph and configures services of all modules.
    pub fn build(self) -> Result<Application, ApplicationError> {
        let config = match self.config {
            Some(config) => config,
            None => ApplicationConfig::init_from_environment()
                .map_err(ApplicationError::ConfigError)?,
        };

        if config.install_tracing_logger {
            install_tracing_logger();
        }

        info!("Building module graph...");

        let mut plugins = Vec::new();
        for source in &self.plugin_sources {
            plugins.extend(source.modules(&self.catalog)?);
        }

        if !config.plugins.is_empty() {
            plugins.extend(NamedPlugInSource::new(config.plugins.clone()).modules(&self.catalog)?);
        }

        let modules = ModuleGraphBuilder::new(&self.catalog).build(&self.root, &plugins)?;
        log_modules(&modules);

        let mut manager = ModuleManager::new(modules);
        for contributor in self.service_contributors {
            manager.add_service_contributor(contributor);
        }

        for contributor in self.lifecycle_contributors {
            manager.add_lifecycle_contributor(contributor);
        }

        let mut context = ServiceConfigurationContext::new(
            DefaultConventionalRegistrar::new(ConventionalRegistrationOptions {
                default_lifetime: config.default_lifetime,
            }),
            self.scanner,
        );

        for registrar in self.registrars {
            context.add_registrar(registrar);
        }

        context.services_mut().add_instance(Arc::new(config.clone()));

        info!("Configuring services...");
        manager.configure_services(&mut context)?;

        let service_provider = context.into_services().build_provider();
        Ok(Application {
            config,
            manager,
            service_provider,
        })
    }
}

fn install_tracing_logger() {
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        debug!("Tracing logger not installed: {error}");
    }
}

fn log_modules(modules: &[Arc<ModuleDescriptor>]) {
    info!("Loaded {} modules:", modules.len());
    for module in modules {
        if module.is_plugin() {
            info!("- {} (plug-in)", module.module_type().name());
        } else {
            info!("- {}", module.module_type().name());
        }
    }
}

/// Main entrypoint for the application. Holds modules in dependency order and the root
/// [ServiceProvider].
pub struct Application {
    config: ApplicationConfig,
    manager: ModuleManager,
    service_provider: ServiceProvider,
}

impl Application {
    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    #[inline]
    pub fn service_provider(&self) -> &ServiceProvider {
        &self.service_provider
    }

    /// Loaded modules in dependency order, with the root module last.
    #[inline]
    pub fn modules(&self) -> &[Arc<ModuleDescriptor>] {
        self.manager.modules()
    }

    /// Runs the initialization stages.
    pub async fn initialize(&self) -> Result<(), ApplicationError> {
        info!("Initializing application...");

        self.manager
            .initialize_modules(&ApplicationInitializationContext::new(
                self.service_provider.clone(),
            ))
            .await?;

        Ok(())
    }

    /// Runs the shutdown stage in reverse module order.
    pub async fn shutdown(&self) -> Result<(), ApplicationError> {
        info!("Shutting down application...");

        self.manager
            .shutdown_modules(&ApplicationShutdownContext::new(
                self.service_provider.clone(),
            ))
            .await?;

        Ok(())
    }
}

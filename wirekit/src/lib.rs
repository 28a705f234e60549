//! Modular application framework based on [wirekit_di] conventional service registration.
//!
//! Applications are composed of [modules](module::Module) forming a dependency graph. Starting
//! from a root module (and optional plug-ins), the framework discovers all transitively required
//! modules, instantiates each of them once, orders them so that dependencies come first, and then
//! drives them through [lifecycle stages](lifecycle::LifecycleStage): service configuration,
//! initialization and shutdown. The entrypoint is [Application](application::Application), built
//! with an [ApplicationBuilder](application::ApplicationBuilder), which also configures additional
//! supporting infrastructure, e.g. logging.
//!
//! ```
//! use wirekit::application::ApplicationBuilder;
//! use wirekit::config::ApplicationConfig;
//! use wirekit::module::{Module, ModuleType};
//! use wirekit_di::instance::ErrorPtr;
//!
//! struct AppModule;
//!
//! impl Module for AppModule {}
//!
//! impl ModuleType for AppModule {
//!     fn create() -> Result<Self, ErrorPtr> {
//!         Ok(Self)
//!     }
//! }
//!
//! let application = ApplicationBuilder::new::<AppModule>()
//!     .with_config(ApplicationConfig::default().with_install_tracing_logger(false))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(application.modules().len(), 1);
//! ```

pub mod application;
pub mod catalog;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod module;
pub mod module_graph;
pub mod plugin;

/// Future types used by asynchronous lifecycle stages.
pub mod future {
    pub use futures::future::{ready, BoxFuture, FutureExt};
}

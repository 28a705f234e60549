use std::sync::Arc;
use wirekit::application::ApplicationBuilder;
use wirekit::context::{ApplicationInitializationContext, ServiceConfigurationContext};
use wirekit::future::{BoxFuture, FutureExt};
use wirekit::module::{ConfigureServices, Module, ModuleType, OnApplicationInitialization};
use wirekit::register_module;
use wirekit_di::descriptor::ServiceTypeDescriptor;
use wirekit_di::instance::{error_ptr, ErrorPtr};
use wirekit_di::lifetime::SingletonDependency;
use wirekit_di::provider::TypedServiceResolver;
use wirekit_di::register_service;
use wirekit_di::service_id::TypeRef;

// Services are discovered in the crate (assembly) of each loaded module.

struct Greeting(String);

trait GreetingService: Send + Sync {
    fn greet(&self) -> String;
}

struct DefaultGreetingService {
    greeting: Arc<Greeting>,
}

impl GreetingService for DefaultGreetingService {
    fn greet(&self) -> String {
        self.greeting.0.clone()
    }
}

impl SingletonDependency for DefaultGreetingService {}

register_service!(ServiceTypeDescriptor::builder(|resolver| {
    resolver
        .get::<Greeting>()
        .map(|greeting| DefaultGreetingService { greeting })
})
.implements::<dyn GreetingService>(|this| this as Arc<dyn GreetingService>)
.implements::<dyn SingletonDependency>(|this| this as Arc<dyn SingletonDependency>)
.build());

struct CoreModule;

impl Module for CoreModule {
    fn as_configure_services(&self) -> Option<&dyn ConfigureServices> {
        Some(self)
    }
}

impl ConfigureServices for CoreModule {
    fn configure_services(
        &self,
        context: &mut ServiceConfigurationContext,
    ) -> Result<(), ErrorPtr> {
        context
            .services_mut()
            .add_instance(Arc::new(Greeting("Hello world!".to_string())));
        Ok(())
    }
}

impl ModuleType for CoreModule {
    fn create() -> Result<Self, ErrorPtr> {
        Ok(Self)
    }
}

// registered modules can be found by dependents and by name in the plug-in configuration
register_module!(CoreModule);

struct AppModule;

impl Module for AppModule {
    fn as_application_initialization(&self) -> Option<&dyn OnApplicationInitialization> {
        Some(self)
    }
}

impl OnApplicationInitialization for AppModule {
    fn on_application_initialization(
        &self,
        context: ApplicationInitializationContext,
    ) -> BoxFuture<'_, Result<(), ErrorPtr>> {
        async move {
            let service = context
                .service_provider()
                .get::<dyn GreetingService>()
                .map_err(error_ptr)?;

            println!("{}", service.greet());
            Ok(())
        }
        .boxed()
    }
}

impl ModuleType for AppModule {
    fn create() -> Result<Self, ErrorPtr> {
        Ok(Self)
    }

    fn dependencies() -> Vec<TypeRef> {
        vec![TypeRef::of::<CoreModule>()]
    }
}

#[tokio::main]
async fn main() {
    // the config is read from wirekit.json and WIREKIT_* environment variables
    let application = ApplicationBuilder::new::<AppModule>()
        .build()
        .expect("error building application");

    application
        .initialize()
        .await
        .expect("error initializing application");

    application
        .shutdown()
        .await
        .expect("error shutting down application");
}

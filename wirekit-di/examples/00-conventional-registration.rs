use std::sync::Arc;
use wirekit_di::conventional::{ConventionalRegistrar, DefaultConventionalRegistrar};
use wirekit_di::descriptor::ServiceTypeDescriptor;
use wirekit_di::instance::error_ptr;
use wirekit_di::lifetime::SingletonDependency;
use wirekit_di::provider::TypedServiceResolver;
use wirekit_di::register_service;
use wirekit_di::scan::{AssemblyRef, InventoryTypeScanner};
use wirekit_di::service_collection::ServiceCollection;
use wirekit_di::ResolveError;

// this is a capability we would like to use in our application
trait Greeter: Send + Sync {
    fn greet(&self);
}

// some other capability, which just happens to be implemented by our type
trait Disposable: Send + Sync {}

// the implementation - its name ends with "Greeter", so it will be exposed as dyn Greeter by
// convention, but not as dyn Disposable
struct ConsoleGreeter {
    repeat: usize,
}

impl ConsoleGreeter {
    // constructors report their own failures as ConstructorError
    fn from_env() -> Result<Self, ResolveError> {
        std::env::var("GREETER_REPEAT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map(|repeat| Self { repeat })
            .map_err(|error| ResolveError::ConstructorError(error_ptr(error)))
    }
}

impl Greeter for ConsoleGreeter {
    fn greet(&self) {
        for _ in 0..self.repeat {
            println!("Hello world!");
        }
    }
}

impl Disposable for ConsoleGreeter {}

// the marker trait makes the type a singleton
impl SingletonDependency for ConsoleGreeter {}

// descriptors tell the registrar what a type implements; the casts are resolved at compile time
register_service!(ServiceTypeDescriptor::builder(|_| ConsoleGreeter::from_env())
    .implements::<dyn Greeter>(|this| this as Arc<dyn Greeter>)
    .implements::<dyn Disposable>(|this| this as Arc<dyn Disposable>)
    .implements::<dyn SingletonDependency>(|this| this as Arc<dyn SingletonDependency>)
    .build());

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut services = ServiceCollection::new();

    // scan this crate for registered types
    DefaultConventionalRegistrar::default()
        .add_assembly(
            &mut services,
            &InventoryTypeScanner,
            &AssemblyRef::of::<ConsoleGreeter>(),
        )
        .expect("error registering services");

    for entry in services.entries() {
        println!(
            "{} as {} ({}, redirect: {:?})",
            entry.implementation_type.simple_name(),
            entry.exposed_as,
            entry.lifetime,
            entry.redirect_to.map(|target| target.simple_name())
        );
    }

    let provider = services.build_provider();

    // prints "Hello world!" GREETER_REPEAT times
    provider
        .get::<dyn Greeter>()
        .expect("error resolving dyn Greeter")
        .greet();

    // both services share the same singleton instance
    let greeter = provider.get::<dyn Greeter>().unwrap();
    let concrete = provider.get::<ConsoleGreeter>().unwrap();
    assert_eq!(
        Arc::as_ptr(&greeter) as *const u8,
        Arc::as_ptr(&concrete) as *const u8
    );
}

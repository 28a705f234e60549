//! Plug-ins are modules which are not reachable from the root module through dependencies, but are
//! supplied externally, e.g. listed in configuration. They join the module graph along with their
//! own dependencies.

use crate::catalog::{ModuleDeclaration, ModuleMetadataReader};
use crate::module::ModuleType;
use crate::module_graph::ModuleGraphError;
use itertools::Itertools;

/// Source of additional plug-in modules.
pub trait PlugInSource: Send + Sync {
    /// Returns declarations of plug-in modules. The reader can be used to look up modules known to
    /// the application.
    fn modules(
        &self,
        reader: &dyn ModuleMetadataReader,
    ) -> Result<Vec<ModuleDeclaration>, ModuleGraphError>;
}

/// Plug-ins given as module types.
#[derive(Clone, Debug, Default)]
pub struct TypePlugInSource {
    modules: Vec<ModuleDeclaration>,
}

impl TypePlugInSource {
    pub fn new(modules: Vec<ModuleDeclaration>) -> Self {
        Self { modules }
    }

    pub fn with_module<M: ModuleType>(mut self) -> Self {
        self.modules.push(ModuleDeclaration::of::<M>());
        self
    }
}

impl PlugInSource for TypePlugInSource {
    fn modules(
        &self,
        _reader: &dyn ModuleMetadataReader,
    ) -> Result<Vec<ModuleDeclaration>, ModuleGraphError> {
        Ok(self.modules.clone())
    }
}

/// Plug-ins given as module type names, resolved with [ModuleMetadataReader::find_by_name].
#[derive(Clone, Debug, Default)]
pub struct NamedPlugInSource {
    names: Vec<String>,
}

impl NamedPlugInSource {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl PlugInSource for NamedPlugInSource {
    fn modules(
        &self,
        reader: &dyn ModuleMetadataReader,
    ) -> Result<Vec<ModuleDeclaration>, ModuleGraphError> {
        self.names
            .iter()
            .map(|name| {
                reader
                    .find_by_name(name)
                    .ok_or_else(|| ModuleGraphError::InvalidModuleType {
                        module: name.clone(),
                    })
            })
            .try_collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{MockModuleMetadataReader, ModuleDeclaration};
    use crate::module::{Module, ModuleType};
    use crate::module_graph::ModuleGraphError;
    use crate::plugin::{NamedPlugInSource, PlugInSource, TypePlugInSource};
    use wirekit_di::instance::ErrorPtr;
    use wirekit_di::service_id::TypeRef;

    struct PlugInModule;

    impl Module for PlugInModule {}

    impl ModuleType for PlugInModule {
        fn create() -> Result<Self, ErrorPtr> {
            Ok(Self)
        }
    }

    #[test]
    fn should_return_typed_plugins() {
        let source = TypePlugInSource::default().with_module::<PlugInModule>();
        let reader = MockModuleMetadataReader::new();

        let modules = source.modules(&reader).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].module_type, TypeRef::of::<PlugInModule>());
    }

    #[test]
    fn should_resolve_named_plugins() {
        let source = NamedPlugInSource::new(vec!["PlugInModule".to_string()]);

        let mut reader = MockModuleMetadataReader::new();
        reader
            .expect_find_by_name()
            .withf(|name| name == "PlugInModule")
            .times(1)
            .return_const(Some(ModuleDeclaration::of::<PlugInModule>()));

        let modules = source.modules(&reader).unwrap();
        assert_eq!(modules[0].module_type, TypeRef::of::<PlugInModule>());
    }

    #[test]
    fn should_reject_unknown_named_plugins() {
        let source = NamedPlugInSource::new(vec!["Unknown".to_string()]);

        let mut reader = MockModuleMetadataReader::new();
        reader
            .expect_find_by_name()
            .return_const(None::<ModuleDeclaration>);

        assert!(matches!(
            source.modules(&reader).unwrap_err(),
            ModuleGraphError::InvalidModuleType { module } if module == "Unknown"
        ));
    }
}

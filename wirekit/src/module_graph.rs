//! Building the ordered list of application modules.
//!
//! Starting from the root module, dependencies are discovered depth-first through a
//! [ModuleMetadataReader]. Plug-in modules are added afterwards, along with any dependencies not
//! discovered yet. Every module type gets exactly one [ModuleDescriptor] and one instance. The
//! result is sorted topologically, so dependencies always precede dependents, and the root module
//! is always last.

use crate::catalog::{ModuleDeclaration, ModuleMetadataReader};
use crate::module::ModuleDescriptor;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use wirekit_di::instance::ErrorPtr;
use wirekit_di::service_id::TypeRef;

/// Errors raised while building the module graph. All of them prevent the application from
/// starting.
#[derive(Error, Clone, Debug)]
pub enum ModuleGraphError {
    #[error("Not a valid module type: {module}")]
    InvalidModuleType { module: String },
    #[error("Module {module} depends on unknown module: {dependency}")]
    MissingDependency { module: String, dependency: String },
    #[error("Cyclic dependency detected for module {module}: {}", path.join(" -> "))]
    CyclicDependency { module: String, path: Vec<String> },
    #[error("Error creating module {module}: {source}")]
    ModuleCreation { module: String, source: ErrorPtr },
}

/// Builds sorted module lists based on metadata from a [ModuleMetadataReader].
pub struct ModuleGraphBuilder<'a> {
    reader: &'a dyn ModuleMetadataReader,
}

struct DiscoveredModule {
    declaration: ModuleDeclaration,
    is_plugin: bool,
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

impl<'a> ModuleGraphBuilder<'a> {
    pub fn new(reader: &'a dyn ModuleMetadataReader) -> Self {
        Self { reader }
    }

    /// Builds the sorted module list for given root module and plug-ins.
    pub fn build(
        &self,
        root: &TypeRef,
        plugins: &[ModuleDeclaration],
    ) -> Result<Vec<Arc<ModuleDescriptor>>, ModuleGraphError> {
        let discovered = self.discover(root, plugins)?;
        let descriptors = Self::instantiate(&discovered)?;
        self.link(&discovered, &descriptors, plugins)?;

        let mut sorted = Self::sort(&descriptors)?;
        if let Some(position) = sorted
            .iter()
            .position(|descriptor| descriptor.module_type() == *root)
        {
            let root = sorted.remove(position);
            sorted.push(root);
        }

        Ok(sorted)
    }

    fn declaration(
        &self,
        module_type: &TypeRef,
        plugins: &[ModuleDeclaration],
    ) -> Option<ModuleDeclaration> {
        plugins
            .iter()
            .find(|declaration| declaration.module_type == *module_type)
            .copied()
            .or_else(|| self.reader.read(module_type))
    }

    fn discover(
        &self,
        root: &TypeRef,
        plugins: &[ModuleDeclaration],
    ) -> Result<Vec<DiscoveredModule>, ModuleGraphError> {
        let root = self
            .declaration(root, plugins)
            .filter(|declaration| !declaration.is_abstract())
            .ok_or_else(|| ModuleGraphError::InvalidModuleType {
                module: root.name().to_string(),
            })?;

        let mut discovered = Vec::new();
        let mut seen = FxHashSet::default();
        self.visit(root, false, plugins, &mut discovered, &mut seen)?;

        for plugin in plugins {
            if plugin.is_abstract() {
                return Err(ModuleGraphError::InvalidModuleType {
                    module: plugin.module_type.name().to_string(),
                });
            }

            self.visit(*plugin, true, plugins, &mut discovered, &mut seen)?;
        }

        Ok(discovered)
    }

    fn visit(
        &self,
        declaration: ModuleDeclaration,
        is_plugin: bool,
        plugins: &[ModuleDeclaration],
        discovered: &mut Vec<DiscoveredModule>,
        seen: &mut FxHashSet<TypeRef>,
    ) -> Result<(), ModuleGraphError> {
        if !seen.insert(declaration.module_type) {
            return Ok(());
        }

        if declaration.is_abstract() {
            return Err(ModuleGraphError::InvalidModuleType {
                module: declaration.module_type.name().to_string(),
            });
        }

        discovered.push(DiscoveredModule {
            declaration,
            is_plugin,
        });

        // unknown dependencies are reported when linking
        for dependency in (declaration.dependencies)() {
            if let Some(dependency) = self.declaration(&dependency, plugins) {
                self.visit(dependency, is_plugin, plugins, discovered, seen)?;
            }
        }

        Ok(())
    }

    fn instantiate(
        discovered: &[DiscoveredModule],
    ) -> Result<Vec<Arc<ModuleDescriptor>>, ModuleGraphError> {
        discovered
            .iter()
            .map(|module| {
                let declaration = &module.declaration;
                let module_name = declaration.module_type.name();
                let constructor = declaration.constructor.ok_or_else(|| {
                    ModuleGraphError::InvalidModuleType {
                        module: module_name.to_string(),
                    }
                })?;

                debug!(module = module_name, "Creating module instance");

                constructor()
                    .map(|instance| {
                        Arc::new(ModuleDescriptor::new(
                            declaration.module_type,
                            (declaration.assemblies)(),
                            instance,
                            module.is_plugin,
                        ))
                    })
                    .map_err(|source| ModuleGraphError::ModuleCreation {
                        module: module_name.to_string(),
                        source,
                    })
            })
            .try_collect()
    }

    fn link(
        &self,
        discovered: &[DiscoveredModule],
        descriptors: &[Arc<ModuleDescriptor>],
        plugins: &[ModuleDeclaration],
    ) -> Result<(), ModuleGraphError> {
        let by_type: FxHashMap<TypeRef, &Arc<ModuleDescriptor>> = descriptors
            .iter()
            .map(|descriptor| (descriptor.module_type(), descriptor))
            .collect();

        for (module, descriptor) in discovered.iter().zip(descriptors) {
            for dependency in (module.declaration.dependencies)() {
                let dependency_descriptor = by_type.get(&dependency).ok_or_else(|| {
                    let dependency_name = self
                        .declaration(&dependency, plugins)
                        .map(|declaration| declaration.module_type.name())
                        .unwrap_or(dependency.name());

                    ModuleGraphError::MissingDependency {
                        module: descriptor.module_type().name().to_string(),
                        dependency: dependency_name.to_string(),
                    }
                })?;

                descriptor.add_dependency(dependency_descriptor);
            }
        }

        Ok(())
    }

    fn sort(
        descriptors: &[Arc<ModuleDescriptor>],
    ) -> Result<Vec<Arc<ModuleDescriptor>>, ModuleGraphError> {
        let indices: FxHashMap<TypeRef, usize> = descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (descriptor.module_type(), index))
            .collect();

        let adjacency = descriptors
            .iter()
            .map(|descriptor| {
                descriptor
                    .dependencies()
                    .iter()
                    .filter_map(|dependency| indices.get(&dependency.module_type()).copied())
                    .collect_vec()
            })
            .collect_vec();

        fn visit(
            node: usize,
            descriptors: &[Arc<ModuleDescriptor>],
            adjacency: &[Vec<usize>],
            colors: &mut [Color],
            path: &mut Vec<usize>,
            sorted: &mut Vec<Arc<ModuleDescriptor>>,
        ) -> Result<(), ModuleGraphError> {
            colors[node] = Color::Gray;
            path.push(node);

            for &dependency in &adjacency[node] {
                match colors[dependency] {
                    Color::Gray => {
                        let start = path
                            .iter()
                            .position(|&index| index == dependency)
                            .unwrap_or_default();

                        return Err(ModuleGraphError::CyclicDependency {
                            module: descriptors[dependency].module_type().name().to_string(),
                            path: path[start..]
                                .iter()
                                .chain([&dependency])
                                .map(|&index| descriptors[index].module_type().name().to_string())
                                .collect(),
                        });
                    }
                    Color::White => {
                        visit(dependency, descriptors, adjacency, colors, path, sorted)?
                    }
                    Color::Black => {}
                }
            }

            path.pop();
            colors[node] = Color::Black;
            sorted.push(descriptors[node].clone());
            Ok(())
        }

        let mut colors = vec![Color::White; descriptors.len()];
        let mut path = Vec::new();
        let mut sorted = Vec::with_capacity(descriptors.len());

        for node in 0..descriptors.len() {
            if colors[node] == Color::White {
                visit(
                    node,
                    descriptors,
                    &adjacency,
                    &mut colors,
                    &mut path,
                    &mut sorted,
                )?;
            }
        }

        Ok(sorted)
    }
}

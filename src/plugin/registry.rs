//! Plugin Registry
//!
//! Maps plugin identifiers to descriptors and builds plugin instances. The
//! registry is assembled once from the enabled plugin packages and is
//! read-only afterwards, so concurrent probe executions share it freely.

use crate::auth::ResourceAuth;
use crate::core::error_handling::panic_message;
use crate::geocode::Geocoder;
use crate::params::{CheckAvailability, MetadataRegistry, ParameterSchema};
use crate::plugin::discovery::{discover_packages, DiscoveryConfig};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::types::{Capability, PluginDescriptor, PluginFactory, PluginInfo};
use crate::probe::traits::{Check, Probe};
use std::collections::BTreeMap;

pub const CLASS_VAR_NAME: &str = "NAME";
pub const CLASS_VAR_RESOURCE_TYPE: &str = "RESOURCE_TYPE";
pub const CLASS_VAR_REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const CLASS_VAR_REQUEST_TEMPLATE: &str = "REQUEST_TEMPLATE";

#[derive(Debug, Clone)]
struct PackageEntry {
    root: String,
    aliases: Vec<String>,
}

impl PackageEntry {
    fn answers_to(&self, module: &str) -> bool {
        self.root.eq_ignore_ascii_case(module)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(module))
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    plugins: BTreeMap<String, PluginDescriptor>,
    packages: Vec<PackageEntry>,
    metadata: MetadataRegistry,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the packages enabled by `config`
    pub fn discover(config: &DiscoveryConfig) -> Self {
        let mut registry = Self::new();
        for package in discover_packages(config) {
            if let Err(e) = registry.register_package(package.root, package.aliases, (package.plugins)())
            {
                log::warn!("Plugin package '{}' partially registered: {}", package.root, e);
            }
        }
        log::debug!(
            "Registry holds {} plugins from {} packages",
            registry.plugins.len(),
            registry.packages.len()
        );
        registry
    }

    /// Register a package; a bad plugin does not stop the others
    ///
    /// Returns the first registration error, if any.
    pub fn register_package(
        &mut self,
        root: &str,
        aliases: &[&str],
        plugins: Vec<PluginDescriptor>,
    ) -> PluginResult<()> {
        if !self.packages.iter().any(|p| p.root == root) {
            self.packages.push(PackageEntry {
                root: root.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            });
        }

        let mut first_error = None;
        for descriptor in plugins {
            if let Err(e) = self.register_plugin(descriptor) {
                log::warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn register_plugin(&mut self, descriptor: PluginDescriptor) -> PluginResult<()> {
        if self.plugins.contains_key(descriptor.id) {
            return Err(PluginError::DuplicatePlugin {
                plugin_id: descriptor.id.to_string(),
            });
        }

        let id = descriptor.id;
        self.metadata.declare_type(id, descriptor.extends);
        for (name, patch) in (descriptor.parameters)().iter() {
            self.metadata.declare_parameter(id, name, patch.clone());
        }
        for usage in (descriptor.check_usages)() {
            self.metadata.declare_check_usage(id, usage);
        }
        if !descriptor.name.is_empty() {
            self.metadata.declare_class_var(id, CLASS_VAR_NAME, descriptor.name);
        }
        for (name, value) in descriptor.class_vars {
            self.metadata.declare_class_var(id, name, value);
        }

        self.plugins.insert(id.to_string(), descriptor);
        Ok(())
    }

    /// Resolve an identifier to its descriptor
    ///
    /// First an exact lookup; then the last segment is looked up as a type
    /// inside the package named by the preceding path, which may be a
    /// package alias.
    pub fn resolve(&self, plugin_id: &str) -> PluginResult<&PluginDescriptor> {
        if let Some(descriptor) = self.plugins.get(plugin_id) {
            return Ok(descriptor);
        }
        log::debug!("No plugin registered as '{}', trying package lookup", plugin_id);

        match self.resolve_in_package(plugin_id) {
            Ok(descriptor) => Ok(descriptor),
            Err(reason) => {
                log::warn!("Cannot resolve plugin '{}': {}", plugin_id, reason);
                Err(PluginError::PluginNotFound {
                    plugin_id: plugin_id.to_string(),
                })
            }
        }
    }

    fn resolve_in_package(&self, plugin_id: &str) -> Result<&PluginDescriptor, String> {
        let (module, type_name) = match plugin_id.rsplit_once('.') {
            Some((module, type_name)) if !module.is_empty() && !type_name.is_empty() => {
                (module, type_name)
            }
            _ => return Err("identifier must contain a package part".to_string()),
        };

        let package = self
            .packages
            .iter()
            .find(|p| p.answers_to(module))
            .ok_or_else(|| format!("no package '{}'", module))?;

        let candidate = format!("{}.{}", package.root, type_name);
        self.plugins
            .get(&candidate)
            .ok_or_else(|| format!("package '{}' has no type '{}'", package.root, type_name))
    }

    fn resolve_as(&self, plugin_id: &str, expected: Capability) -> PluginResult<&PluginDescriptor> {
        let descriptor = self.resolve(plugin_id)?;
        if descriptor.capability() != expected {
            return Err(PluginError::CapabilityMismatch {
                plugin_id: plugin_id.to_string(),
                expected,
                actual: descriptor.capability(),
            });
        }
        Ok(descriptor)
    }

    /// Canonical identifier for a possibly aliased one
    pub fn canonical_id(&self, plugin_id: &str) -> PluginResult<&'static str> {
        self.resolve(plugin_id).map(|d| d.id)
    }

    pub fn create_probe(&self, plugin_id: &str) -> PluginResult<Box<dyn Probe>> {
        let descriptor = self.resolve_as(plugin_id, Capability::Probe)?;
        match descriptor.factory {
            PluginFactory::Probe(factory) => construct(descriptor.id, factory),
            _ => Err(abstract_type(descriptor)),
        }
    }

    pub fn create_check(&self, plugin_id: &str) -> PluginResult<Box<dyn Check>> {
        let descriptor = self.resolve_as(plugin_id, Capability::Check)?;
        match descriptor.factory {
            PluginFactory::Check(factory) => construct(descriptor.id, factory),
            _ => Err(abstract_type(descriptor)),
        }
    }

    pub fn create_auth(&self, plugin_id: &str) -> PluginResult<Box<dyn ResourceAuth>> {
        let descriptor = self.resolve_as(plugin_id, Capability::ResourceAuth)?;
        match descriptor.factory {
            PluginFactory::ResourceAuth(factory) => construct(descriptor.id, factory),
            _ => Err(abstract_type(descriptor)),
        }
    }

    pub fn create_geocoder(&self, plugin_id: &str) -> PluginResult<Box<dyn Geocoder>> {
        let descriptor = self.resolve_as(plugin_id, Capability::Geocoder)?;
        match descriptor.factory {
            PluginFactory::Geocoder(factory) => construct(descriptor.id, factory),
            _ => Err(abstract_type(descriptor)),
        }
    }

    /// Concrete plugins of a capability whose class variables match every
    /// `(name, value)` filter exactly
    pub fn list_plugins(&self, capability: Capability, filters: &[(&str, &str)]) -> Vec<String> {
        self.plugins
            .values()
            .filter(|d| d.capability() == capability && !d.factory.is_abstract())
            .filter(|d| {
                let vars = self.metadata.effective_class_vars(d.id);
                filters
                    .iter()
                    .all(|(name, value)| vars.get(*name).map(String::as_str) == Some(*value))
            })
            .map(|d| d.id.to_string())
            .collect()
    }

    pub fn plugin_info(&self, plugin_id: &str) -> PluginResult<PluginInfo> {
        let descriptor = self.resolve(plugin_id)?;
        Ok(PluginInfo {
            id: descriptor.id.to_string(),
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            author: descriptor.author.to_string(),
            capability: descriptor.capability(),
            class_vars: self.metadata.effective_class_vars(descriptor.id),
        })
    }

    /// Parameter schema merged across the plugin's supertype chain
    pub fn effective_schema(&self, plugin_id: &str) -> PluginResult<ParameterSchema> {
        let id = self.canonical_id(plugin_id)?;
        Ok(self.metadata.effective_schema(id))
    }

    /// Check usages declared along the probe's supertype chain
    pub fn check_usages(&self, plugin_id: &str) -> PluginResult<Vec<CheckAvailability>> {
        let id = self.canonical_id(plugin_id)?;
        Ok(self.metadata.effective_check_usages(id))
    }

    pub fn class_vars(&self, plugin_id: &str) -> PluginResult<BTreeMap<String, String>> {
        let id = self.canonical_id(plugin_id)?;
        Ok(self.metadata.effective_class_vars(id))
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

fn construct<T: ?Sized>(
    plugin_id: &str,
    factory: fn() -> Result<Box<T>, String>,
) -> PluginResult<Box<T>> {
    let outcome = std::panic::catch_unwind(factory).unwrap_or_else(|payload| {
        Err(format!("factory panicked: {}", panic_message(payload.as_ref())))
    });
    outcome.map_err(|cause| {
        log::error!("Cannot create plugin '{}': {}", plugin_id, cause);
        PluginError::PluginConstruction {
            plugin_id: plugin_id.to_string(),
            cause,
        }
    })
}

fn abstract_type(descriptor: &PluginDescriptor) -> PluginError {
    PluginError::PluginConstruction {
        plugin_id: descriptor.id.to_string(),
        cause: "abstract plugin type".to_string(),
    }
}

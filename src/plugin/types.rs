//! Type definitions for the plugin system
//!
//! A plugin type is described once by a [`PluginDescriptor`]: its
//! identifier, human metadata, the supertypes it extends, its own parameter
//! and check-usage declarations, and a factory for fresh instances.

use crate::auth::ResourceAuth;
use crate::geocode::Geocoder;
use crate::params::{CheckAvailability, SchemaOverride};
use crate::probe::traits::{Check, Probe};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Interface a plugin implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Capability {
    Probe,
    Check,
    ResourceAuth,
    Geocoder,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Probe => write!(f, "Probe"),
            Capability::Check => write!(f, "Check"),
            Capability::ResourceAuth => write!(f, "ResourceAuth"),
            Capability::Geocoder => write!(f, "Geocoder"),
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "probe" => Ok(Capability::Probe),
            "check" => Ok(Capability::Check),
            "auth" | "resourceauth" => Ok(Capability::ResourceAuth),
            "geocoder" | "geocode" => Ok(Capability::Geocoder),
            other => Err(format!("unknown capability '{}'", other)),
        }
    }
}

pub type ProbeFactory = fn() -> Result<Box<dyn Probe>, String>;
pub type CheckFactory = fn() -> Result<Box<dyn Check>, String>;
pub type AuthFactory = fn() -> Result<Box<dyn ResourceAuth>, String>;
pub type GeocoderFactory = fn() -> Result<Box<dyn Geocoder>, String>;

/// Constructor for one plugin type
#[derive(Clone, Copy)]
pub enum PluginFactory {
    Probe(ProbeFactory),
    Check(CheckFactory),
    ResourceAuth(AuthFactory),
    Geocoder(GeocoderFactory),
    /// Declaration-only base type; never instantiated or listed
    Abstract(Capability),
}

impl PluginFactory {
    pub fn capability(&self) -> Capability {
        match self {
            PluginFactory::Probe(_) => Capability::Probe,
            PluginFactory::Check(_) => Capability::Check,
            PluginFactory::ResourceAuth(_) => Capability::ResourceAuth,
            PluginFactory::Geocoder(_) => Capability::Geocoder,
            PluginFactory::Abstract(capability) => *capability,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, PluginFactory::Abstract(_))
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_abstract() {
            write!(f, "Abstract({})", self.capability())
        } else {
            write!(f, "{}(..)", self.capability())
        }
    }
}

/// Static description of a plugin type
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    /// Supertype identifiers, nearest first
    pub extends: &'static [&'static str],
    /// Class-level metadata such as `RESOURCE_TYPE`, used by list filters
    pub class_vars: &'static [(&'static str, &'static str)],
    /// Parameters declared by this type only
    pub parameters: fn() -> SchemaOverride,
    /// Check usages declared by this type only
    pub check_usages: fn() -> Vec<CheckAvailability>,
    pub factory: PluginFactory,
}

impl PluginDescriptor {
    pub fn new(id: &'static str, factory: PluginFactory) -> Self {
        Self {
            id,
            name: "",
            description: "",
            author: "GeoProbe Team",
            extends: &[],
            class_vars: &[],
            parameters: SchemaOverride::new,
            check_usages: Vec::new,
            factory,
        }
    }

    pub fn named(mut self, name: &'static str, description: &'static str) -> Self {
        self.name = name;
        self.description = description;
        self
    }

    pub fn author(mut self, author: &'static str) -> Self {
        self.author = author;
        self
    }

    pub fn extends(mut self, supertypes: &'static [&'static str]) -> Self {
        self.extends = supertypes;
        self
    }

    pub fn class_vars(mut self, vars: &'static [(&'static str, &'static str)]) -> Self {
        self.class_vars = vars;
        self
    }

    pub fn parameters(mut self, parameters: fn() -> SchemaOverride) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn check_usages(mut self, usages: fn() -> Vec<CheckAvailability>) -> Self {
        self.check_usages = usages;
        self
    }

    pub fn capability(&self) -> Capability {
        self.factory.capability()
    }

    /// Last segment of the identifier
    pub fn type_name(&self) -> &'static str {
        self.id.rsplit('.').next().unwrap_or(self.id)
    }
}

/// A set of plugins registered under one package root
///
/// Packages submit themselves with the `builtin!` macro and are enabled at
/// discovery time when a configured plugin source matches their root.
pub struct PluginPackage {
    pub root: &'static str,
    /// Alternative roots accepted by identifier resolution
    pub aliases: &'static [&'static str],
    pub plugins: fn() -> Vec<PluginDescriptor>,
}

impl fmt::Debug for PluginPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginPackage")
            .field("root", &self.root)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Listing entry for a registered plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub capability: Capability,
    pub class_vars: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_parsing() {
        assert_eq!("probe".parse::<Capability>(), Ok(Capability::Probe));
        assert_eq!("Auth".parse::<Capability>(), Ok(Capability::ResourceAuth));
        assert_eq!("geocoder".parse::<Capability>(), Ok(Capability::Geocoder));
        assert!("output".parse::<Capability>().is_err());
    }

    #[test]
    fn test_descriptor_type_name() {
        let descriptor = PluginDescriptor::new(
            "geoprobe.plugins.probe.owsgetcaps.OwsGetCaps",
            PluginFactory::Abstract(Capability::Probe),
        );
        assert_eq!(descriptor.type_name(), "OwsGetCaps");
        assert_eq!(descriptor.capability(), Capability::Probe);
        assert!(descriptor.factory.is_abstract());
    }
}

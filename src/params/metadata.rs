//! Plugin metadata declarations
//!
//! Every plugin type declares its own parameters, check usages and class
//! variables, plus the supertypes it extends. The registry answers "what is
//! the effective declaration for this type" by walking the supertype chain
//! and merging child declarations over parent ones. No plugin instance is
//! needed to introspect a type.

use crate::params::schema::{merge, ParameterSchema, SchemaOverride, SpecPatch};
use std::collections::{BTreeMap, HashMap};

/// A check a probe type can run, with probe-specific parameter overrides
#[derive(Debug, Clone, PartialEq)]
pub struct CheckAvailability {
    /// Check plugin identifier
    pub check: String,
    /// Overrides merged into the check's own schema for this probe
    pub set_params: SchemaOverride,
    /// Run when a target declares no checks of its own
    pub default: bool,
}

impl CheckAvailability {
    pub fn new(check: &str) -> Self {
        Self {
            check: check.to_string(),
            set_params: SchemaOverride::new(),
            default: false,
        }
    }

    pub fn by_default(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn set_param(mut self, name: &str, patch: SpecPatch) -> Self {
        self.set_params.set(name, patch);
        self
    }

    fn refined_by(&self, child: &CheckAvailability) -> CheckAvailability {
        CheckAvailability {
            check: child.check.clone(),
            set_params: self.set_params.merge(&child.set_params),
            default: child.default,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TypeMetadata {
    supertypes: Vec<String>,
    parameters: SchemaOverride,
    check_usages: Vec<CheckAvailability>,
    class_vars: BTreeMap<String, String>,
}

/// Declarations keyed by (owning type, attribute)
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    types: HashMap<String, TypeMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type and its supertypes, nearest first
    pub fn declare_type(&mut self, type_name: &str, supertypes: &[&str]) {
        self.types.entry(type_name.to_string()).or_default().supertypes =
            supertypes.iter().map(|s| s.to_string()).collect();
    }

    /// Declare a parameter; declaring the same attribute again replaces it
    pub fn declare_parameter(&mut self, type_name: &str, attribute: &str, patch: SpecPatch) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .parameters
            .replace(attribute, patch);
    }

    /// Declare a check usage; a second usage of the same check replaces it
    pub fn declare_check_usage(&mut self, type_name: &str, usage: CheckAvailability) {
        let usages = &mut self.types.entry(type_name.to_string()).or_default().check_usages;
        match usages.iter_mut().find(|u| u.check == usage.check) {
            Some(existing) => *existing = usage,
            None => usages.push(usage),
        }
    }

    pub fn declare_class_var(&mut self, type_name: &str, name: &str, value: &str) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .class_vars
            .insert(name.to_string(), value.to_string());
    }

    /// Supertype chain in merge order: farthest ancestor first, type last
    pub fn linearize(&self, type_name: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut visiting = Vec::new();
        self.collect_chain(type_name, &mut visiting, &mut order);
        order
    }

    fn collect_chain(&self, type_name: &str, visiting: &mut Vec<String>, order: &mut Vec<String>) {
        if visiting.iter().any(|t| t == type_name) {
            log::warn!("Supertype cycle through '{}' ignored", type_name);
            return;
        }
        if order.iter().any(|t| t == type_name) {
            return;
        }
        visiting.push(type_name.to_string());
        if let Some(meta) = self.types.get(type_name) {
            // Later supertypes merge first so that the nearest one wins
            for parent in meta.supertypes.iter().rev() {
                self.collect_chain(parent, visiting, order);
            }
        }
        visiting.pop();
        order.push(type_name.to_string());
    }

    /// All parameter declarations of the chain merged into one override
    pub fn effective_override(&self, type_name: &str) -> SchemaOverride {
        self.linearize(type_name)
            .iter()
            .filter_map(|t| self.types.get(t))
            .fold(SchemaOverride::new(), |acc, meta| acc.merge(&meta.parameters))
    }

    pub fn effective_schema(&self, type_name: &str) -> ParameterSchema {
        merge(&ParameterSchema::new(), &self.effective_override(type_name))
    }

    /// Check usages of the chain; same-check usages refine parent ones
    pub fn effective_check_usages(&self, type_name: &str) -> Vec<CheckAvailability> {
        let mut usages: Vec<CheckAvailability> = Vec::new();
        for meta in self.linearize(type_name).iter().filter_map(|t| self.types.get(t)) {
            for usage in &meta.check_usages {
                match usages.iter_mut().find(|u| u.check == usage.check) {
                    Some(existing) => *existing = existing.refined_by(usage),
                    None => usages.push(usage.clone()),
                }
            }
        }
        usages
    }

    pub fn effective_class_vars(&self, type_name: &str) -> BTreeMap<String, String> {
        self.linearize(type_name)
            .iter()
            .filter_map(|t| self.types.get(t))
            .fold(BTreeMap::new(), |mut acc, meta| {
                acc.extend(meta.class_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
                acc
            })
    }
}

//! Per-instance parameter values
//!
//! Values are resolved lazily on first read and cached for the lifetime of
//! the plugin instance, so a fixed value read once stays put even if the
//! schema it came from is replaced afterwards.

use crate::params::error::{ConfigResult, ConfigurationError};
use crate::params::schema::{ParamValue, ParameterSchema};
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
pub struct ParameterValues {
    plugin: String,
    schema: ParameterSchema,
    supplied: BTreeMap<String, ParamValue>,
    cache: HashMap<String, OnceCell<ParamValue>>,
}

impl ParameterValues {
    pub fn new(plugin: &str, schema: ParameterSchema, supplied: BTreeMap<String, ParamValue>) -> Self {
        let cache = schema
            .names()
            .map(|name| (name.to_string(), OnceCell::new()))
            .collect();
        Self {
            plugin: plugin.to_string(),
            schema,
            supplied,
            cache,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Resolved value of a declared parameter
    pub fn get(&self, name: &str) -> ConfigResult<&ParamValue> {
        let (cell, spec) = match (self.cache.get(name), self.schema.get(name)) {
            (Some(cell), Some(spec)) => (cell, spec),
            _ => {
                return Err(ConfigurationError::UnknownParameter {
                    parameter: name.to_string(),
                    plugin: self.plugin.clone(),
                })
            }
        };
        cell.get_or_try_init(|| spec.resolve_value(name, &self.plugin, self.supplied.get(name)))
    }

    pub fn text(&self, name: &str) -> ConfigResult<String> {
        self.get(name).map(ParamValue::render)
    }

    pub fn list(&self, name: &str) -> ConfigResult<Vec<String>> {
        self.get(name).map(ParamValue::as_list)
    }

    pub fn number(&self, name: &str) -> ConfigResult<f64> {
        let value = self.get(name)?;
        value
            .as_number()
            .ok_or_else(|| ConfigurationError::InvalidParameterValue {
                parameter: name.to_string(),
                plugin: self.plugin.clone(),
                reason: format!("'{}' is not a number", value.render()),
            })
    }

    /// Resolve everything, failing on the first unresolvable parameter
    pub fn resolve_all(&self) -> ConfigResult<BTreeMap<String, ParamValue>> {
        self.schema
            .names()
            .map(|name| self.get(name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }
}

//! Target configuration supplied by the resource store

use crate::auth::AuthDescriptor;
use crate::params::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A check the target wants run, with its parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckUsage {
    #[serde(alias = "pluginId", alias = "check_class")]
    pub plugin_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl CheckUsage {
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

/// Everything one probe execution needs to know about its target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Label used in reports and logs
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Probe plugin identifier
    pub probe: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub auth: Option<AuthDescriptor>,
    /// Auth descriptor encrypted with the server secret
    #[serde(default)]
    pub auth_encoded: Option<String>,
    #[serde(default, alias = "checkUsages")]
    pub checks: Vec<CheckUsage>,
}

impl TargetConfig {
    pub fn new(url: &str, probe: &str) -> Self {
        Self {
            name: None,
            url: url.to_string(),
            resource_type: None,
            probe: probe.to_string(),
            parameters: BTreeMap::new(),
            auth: None,
            auth_encoded: None,
            checks: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn with_check(mut self, usage: CheckUsage) -> Self {
        self.checks.push(usage);
        self
    }

    pub fn with_auth(mut self, auth: AuthDescriptor) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

//! Parameter schemas
//!
//! A schema is an ordered list of named [`ParameterSpec`]s. Derived plugins
//! refine a base schema with a [`SchemaOverride`]: entries that share a name
//! are merged field by field, every other entry from either side is kept.

use crate::params::error::{ConfigResult, ConfigurationError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    #[serde(rename = "stringlist")]
    StringList,
    Bbox,
    Password,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Number => write!(f, "number"),
            ParamType::StringList => write!(f, "stringlist"),
            ParamType::Bbox => write!(f, "bbox"),
            ParamType::Password => write!(f, "password"),
        }
    }
}

/// A parameter value as supplied by configuration or declared by a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Bbox([f64; 4]),
    List(Vec<String>),
}

impl ParamValue {
    /// Empty text and empty lists count as "not supplied"
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Text(s) => s.is_empty(),
            ParamValue::List(items) => items.is_empty(),
            ParamValue::Number(_) | ParamValue::Bbox(_) => false,
        }
    }

    /// Value as it appears in a request template
    ///
    /// Lists and boxes are joined with `,`.
    pub fn render(&self) -> String {
        match self {
            ParamValue::Text(s) => s.clone(),
            ParamValue::Number(n) => format_number(*n),
            ParamValue::Bbox(b) => b
                .iter()
                .map(|v| format_number(*v))
                .collect::<Vec<_>>()
                .join(","),
            ParamValue::List(items) => items.join(","),
        }
    }

    /// The value as a list of strings; scalars become a one element list
    pub fn as_list(&self) -> Vec<String> {
        match self {
            ParamValue::List(items) => items.clone(),
            ParamValue::Text(s) if s.is_empty() => Vec::new(),
            ParamValue::Text(s) => vec![s.clone()],
            other => vec![other.render()],
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Read this value as `ptype`, converting from text where needed
    pub fn coerce(&self, ptype: ParamType) -> Result<ParamValue, String> {
        match (ptype, self) {
            (ParamType::String | ParamType::Password, ParamValue::Text(_)) => Ok(self.clone()),
            (ParamType::String | ParamType::Password, other) => Ok(ParamValue::Text(other.render())),
            (ParamType::Number, ParamValue::Number(_)) => Ok(self.clone()),
            (ParamType::Number, ParamValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(ParamValue::Number)
                .map_err(|_| format!("'{}' is not a number", s)),
            (ParamType::StringList, ParamValue::List(_)) => Ok(self.clone()),
            (ParamType::StringList, ParamValue::Text(s)) => Ok(ParamValue::List(
                s.split(',').map(|item| item.trim().to_string()).collect(),
            )),
            (ParamType::Bbox, ParamValue::Bbox(_)) => Ok(self.clone()),
            (ParamType::Bbox, ParamValue::Text(s)) => parse_bbox(s.split(',')),
            (ParamType::Bbox, ParamValue::List(items)) => parse_bbox(items.iter().map(|s| s.as_str())),
            (ptype, other) => Err(format!("{:?} is not a valid {}", other, ptype)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        ParamValue::List(value.into_iter().map(String::from).collect())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn parse_bbox<'a>(parts: impl Iterator<Item = &'a str>) -> Result<ParamValue, String> {
    let values = parts
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bbox coordinate is not a number: {}", e))?;
    match values.as_slice() {
        [minx, miny, maxx, maxy] => Ok(ParamValue::Bbox([*minx, *miny, *maxx, *maxy])),
        _ => Err(format!("bbox needs 4 coordinates, got {}", values.len())),
    }
}

/// Declaration of one plugin parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub ptype: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(default)]
    pub required: bool,
    /// Allowed values; advisory only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<ParamValue>>,
    /// Fixed value; wins over anything supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,
}

impl ParameterSpec {
    pub fn new(ptype: ParamType, description: &str) -> Self {
        Self {
            ptype,
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn string(description: &str) -> Self {
        Self::new(ParamType::String, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_range<V: Into<ParamValue>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.range = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn fixed(mut self, value: impl Into<ParamValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Apply a patch, replacing only the fields it names
    pub fn patched(&self, patch: &SpecPatch) -> ParameterSpec {
        ParameterSpec {
            ptype: patch.ptype.unwrap_or(self.ptype),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            default: patch.default.clone().or_else(|| self.default.clone()),
            required: patch.required.unwrap_or(self.required),
            range: patch.range.clone().or_else(|| self.range.clone()),
            value: patch.value.clone().or_else(|| self.value.clone()),
        }
    }

    /// Resolve one value: fixed, then supplied, then default, then empty
    pub fn resolve_value(
        &self,
        name: &str,
        plugin: &str,
        supplied: Option<&ParamValue>,
    ) -> ConfigResult<ParamValue> {
        let invalid = |reason: String| ConfigurationError::InvalidParameterValue {
            parameter: name.to_string(),
            plugin: plugin.to_string(),
            reason,
        };

        let resolved = if let Some(fixed) = &self.value {
            fixed.coerce(self.ptype).map_err(invalid)?
        } else if let Some(given) = supplied.filter(|v| !v.is_empty()) {
            given.coerce(self.ptype).map_err(invalid)?
        } else if let Some(default) = self.default.as_ref().filter(|v| !v.is_empty()) {
            default.coerce(self.ptype).map_err(invalid)?
        } else if !self.required {
            self.empty_value()
        } else {
            return Err(ConfigurationError::RequiredParameterMissing {
                parameter: name.to_string(),
                plugin: plugin.to_string(),
            });
        };

        if !self.in_range(&resolved) {
            log::warn!(
                "Parameter '{}' of '{}' has value '{}' outside its range",
                name,
                plugin,
                resolved.render()
            );
        }
        Ok(resolved)
    }

    fn empty_value(&self) -> ParamValue {
        match self.ptype {
            ParamType::StringList => ParamValue::List(Vec::new()),
            _ => ParamValue::Text(String::new()),
        }
    }

    /// True when there is no range, the value is empty, or it is listed
    pub fn in_range(&self, value: &ParamValue) -> bool {
        match &self.range {
            None => true,
            Some(range) if range.is_empty() || value.is_empty() => true,
            Some(range) => range
                .iter()
                .any(|allowed| allowed == value || allowed.render() == value.render()),
        }
    }
}

/// Field-level override of a [`ParameterSpec`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ptype: Option<ParamType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<ParamValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,
}

impl SpecPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn range<V: Into<ParamValue>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.range = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn value(mut self, value: impl Into<ParamValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Compose two patches; fields named by `over` win
    pub fn merge(&self, over: &SpecPatch) -> SpecPatch {
        SpecPatch {
            ptype: over.ptype.or(self.ptype),
            description: over.description.clone().or_else(|| self.description.clone()),
            default: over.default.clone().or_else(|| self.default.clone()),
            required: over.required.or(self.required),
            range: over.range.clone().or_else(|| self.range.clone()),
            value: over.value.clone().or_else(|| self.value.clone()),
        }
    }

    /// Spec for a name the base schema does not have
    fn into_spec(self) -> ParameterSpec {
        ParameterSpec::default().patched(&self)
    }
}

impl From<&ParameterSpec> for SpecPatch {
    fn from(spec: &ParameterSpec) -> Self {
        SpecPatch {
            ptype: Some(spec.ptype),
            description: Some(spec.description.clone()),
            default: spec.default.clone(),
            required: Some(spec.required),
            range: spec.range.clone(),
            value: spec.value.clone(),
        }
    }
}

impl From<ParameterSpec> for SpecPatch {
    fn from(spec: ParameterSpec) -> Self {
        SpecPatch::from(&spec)
    }
}

/// Ordered mapping from parameter name to spec
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSchema {
    entries: Vec<(String, ParameterSpec)>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, spec: ParameterSpec) -> Self {
        self.insert(name, spec);
        self
    }

    /// Insert or replace, keeping the original position on replace
    pub fn insert(&mut self, name: &str, spec: ParameterSpec) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = spec,
            None => self.entries.push((name.to_string(), spec)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every declared parameter against the supplied values
    pub fn resolve(
        &self,
        plugin: &str,
        supplied: &BTreeMap<String, ParamValue>,
    ) -> ConfigResult<BTreeMap<String, ParamValue>> {
        self.iter()
            .map(|(name, spec)| {
                spec.resolve_value(name, plugin, supplied.get(name))
                    .map(|v| (name.to_string(), v))
            })
            .collect()
    }

    /// Names of parameters whose value is outside the declared range
    ///
    /// Resolution itself never rejects these; front ends that want strict
    /// validation call this explicitly.
    pub fn range_violations(&self, values: &BTreeMap<String, ParamValue>) -> Vec<String> {
        self.iter()
            .filter_map(|(name, spec)| match values.get(name) {
                Some(value) if !spec.in_range(value) => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl Serialize for ParameterSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, spec) in &self.entries {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

/// Ordered set of patches applied on top of a base schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaOverride {
    entries: Vec<(String, SpecPatch)>,
}

impl SchemaOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patch; a second patch for the same name composes with the first
    pub fn with(mut self, name: &str, patch: impl Into<SpecPatch>) -> Self {
        self.set(name, patch.into());
        self
    }

    pub fn set(&mut self, name: &str, patch: SpecPatch) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = entry.1.merge(&patch),
            None => self.entries.push((name.to_string(), patch)),
        }
    }

    /// Replace the patch for `name` outright
    pub fn replace(&mut self, name: &str, patch: SpecPatch) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = patch,
            None => self.entries.push((name.to_string(), patch)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SpecPatch> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpecPatch)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compose two overrides so that applying the result equals applying
    /// `self` then `over`
    pub fn merge(&self, over: &SchemaOverride) -> SchemaOverride {
        let mut merged = self.clone();
        for (name, patch) in over.iter() {
            merged.set(name, patch.clone());
        }
        merged
    }
}

impl From<&ParameterSchema> for SchemaOverride {
    fn from(schema: &ParameterSchema) -> Self {
        SchemaOverride {
            entries: schema
                .iter()
                .map(|(n, s)| (n.to_string(), SpecPatch::from(s)))
                .collect(),
        }
    }
}

/// Merge `overrides` into `base`, returning a new schema
///
/// Shared names merge field by field; names only in `base` keep their
/// position, names only in `overrides` are appended in their order.
pub fn merge(base: &ParameterSchema, overrides: &SchemaOverride) -> ParameterSchema {
    let mut merged = base.clone();
    for (name, patch) in overrides.iter() {
        let spec = match base.get(name) {
            Some(existing) => existing.patched(patch),
            None => patch.clone().into_spec(),
        };
        merged.insert(name, spec);
    }
    merged
}

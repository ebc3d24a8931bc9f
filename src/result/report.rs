//! Serializable view of a result tree

use crate::params::ParamValue;
use crate::result::node::{CheckResult, ProbeResult, ResultEntry, ResultNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub success: bool,
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub response_time_seconds: Option<f64>,
    #[serde(default)]
    pub children: Vec<ResultReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, ParamValue>>,
}

impl From<&ResultNode> for ResultReport {
    fn from(node: &ResultNode) -> Self {
        ResultReport {
            name: node.name().map(String::from),
            probe_plugin_id: None,
            url: None,
            success: node.success(),
            message: node.message().to_string(),
            start_time: node.start_time(),
            end_time: node.end_time(),
            response_time_seconds: node.response_time_secs(),
            children: node.children().iter().map(ResultReport::from).collect(),
            check_plugin_id: None,
            parameters: None,
        }
    }
}

impl From<&CheckResult> for ResultReport {
    fn from(check: &CheckResult) -> Self {
        ResultReport {
            check_plugin_id: Some(check.check_id().to_string()),
            parameters: Some(check.parameters().clone()),
            ..ResultReport::from(check.node())
        }
    }
}

impl From<&ResultEntry> for ResultReport {
    fn from(entry: &ResultEntry) -> Self {
        match entry {
            ResultEntry::Node(node) => ResultReport::from(node),
            ResultEntry::Check(check) => ResultReport::from(check),
        }
    }
}

impl From<&ProbeResult> for ResultReport {
    fn from(result: &ProbeResult) -> Self {
        ResultReport {
            probe_plugin_id: Some(result.probe_id().to_string()),
            url: Some(result.url().to_string()),
            ..ResultReport::from(result.node())
        }
    }
}

impl ProbeResult {
    pub fn report(&self) -> ResultReport {
        ResultReport::from(self)
    }
}

//! Timed, success-aggregating result nodes

use crate::params::ParamValue;
use crate::result::error::{ResultError, ResultResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

pub const DEFAULT_MESSAGE: &str = "OK";

/// One node of a result tree
///
/// Success is monotonic: once a failure is recorded it stays failed. A
/// node's overall success also requires every child to have succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNode {
    name: Option<String>,
    own_success: bool,
    message: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    children: Vec<ResultEntry>,
}

impl Default for ResultNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultNode {
    pub fn new() -> Self {
        Self {
            name: None,
            own_success: true,
            message: DEFAULT_MESSAGE.to_string(),
            start_time: None,
            end_time: None,
            children: Vec::new(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn start(&mut self) -> ResultResult<()> {
        if self.start_time.is_some() {
            return Err(ResultError::AlreadyStarted);
        }
        self.start_time = Some(Utc::now());
        Ok(())
    }

    pub fn stop(&mut self) -> ResultResult<()> {
        if self.start_time.is_none() {
            return Err(ResultError::NotStarted);
        }
        if self.end_time.is_some() {
            return Err(ResultError::AlreadyStopped);
        }
        self.end_time = Some(Utc::now());
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.end_time.is_some()
    }

    /// Record an outcome
    ///
    /// The first failure replaces the message, further failures append to
    /// it, and a success after a failure changes nothing.
    pub fn set(&mut self, success: bool, message: &str) -> ResultResult<()> {
        if self.is_stopped() {
            return Err(ResultError::Finalized);
        }
        match (self.own_success, success) {
            (true, true) => self.message = message.to_string(),
            (true, false) => {
                self.own_success = false;
                self.message = message.to_string();
            }
            (false, false) => {
                self.message.push_str("; ");
                self.message.push_str(message);
            }
            (false, true) => {}
        }
        Ok(())
    }

    /// Shorthand for `set(false, message)`
    pub fn fail(&mut self, message: &str) -> ResultResult<()> {
        self.set(false, message)
    }

    pub fn add_result(&mut self, child: impl Into<ResultEntry>) -> ResultResult<()> {
        if self.is_stopped() {
            return Err(ResultError::Finalized);
        }
        self.children.push(child.into());
        Ok(())
    }

    /// Own outcome AND every child's success
    pub fn success(&self) -> bool {
        self.own_success && self.children.iter().all(ResultEntry::success)
    }

    /// Outcome recorded on this node only
    pub fn own_success(&self) -> bool {
        self.own_success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn duration(&self) -> ResultResult<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Ok(end - start),
            (None, _) => Err(ResultError::NotStarted),
            (Some(_), None) => Err(ResultError::NotStopped),
        }
    }

    /// Duration in seconds, once stopped
    pub fn response_time_secs(&self) -> Option<f64> {
        self.duration()
            .ok()
            .map(|d| d.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0)
    }

    pub fn children(&self) -> &[ResultEntry] {
        &self.children
    }

    /// Close an interrupted node: mark it failed and stop it if running
    pub fn abandon(&mut self, message: &str) {
        if self.is_stopped() {
            return;
        }
        for child in self.children.iter_mut() {
            if let ResultEntry::Node(node) = child {
                node.abandon(message);
            }
        }
        let _ = self.set(false, message);
        if !self.is_started() {
            let _ = self.start();
        }
        let _ = self.stop();
    }
}

/// Leaf result of one check invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    check_id: String,
    parameters: BTreeMap<String, ParamValue>,
    node: ResultNode,
}

impl CheckResult {
    pub fn new(check_id: &str, parameters: BTreeMap<String, ParamValue>) -> Self {
        Self {
            check_id: check_id.to_string(),
            parameters,
            node: ResultNode::new(),
        }
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    pub fn start(&mut self) -> ResultResult<()> {
        self.node.start()
    }

    pub fn stop(&mut self) -> ResultResult<()> {
        self.node.stop()
    }

    pub fn set(&mut self, success: bool, message: &str) -> ResultResult<()> {
        self.node.set(success, message)
    }

    pub fn success(&self) -> bool {
        self.node.success()
    }

    pub fn message(&self) -> &str {
        self.node.message()
    }

    pub fn node(&self) -> &ResultNode {
        &self.node
    }
}

/// Child of a result node
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEntry {
    Node(ResultNode),
    Check(CheckResult),
}

impl ResultEntry {
    pub fn success(&self) -> bool {
        match self {
            ResultEntry::Node(node) => node.success(),
            ResultEntry::Check(check) => check.success(),
        }
    }

    pub fn as_check(&self) -> Option<&CheckResult> {
        match self {
            ResultEntry::Check(check) => Some(check),
            ResultEntry::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&ResultNode> {
        match self {
            ResultEntry::Node(node) => Some(node),
            ResultEntry::Check(_) => None,
        }
    }
}

impl From<ResultNode> for ResultEntry {
    fn from(node: ResultNode) -> Self {
        ResultEntry::Node(node)
    }
}

impl From<CheckResult> for ResultEntry {
    fn from(check: CheckResult) -> Self {
        ResultEntry::Check(check)
    }
}

/// Root result of one probe execution
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    probe_id: String,
    url: String,
    node: ResultNode,
}

impl ProbeResult {
    pub fn new(probe_id: &str, url: &str) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            url: url.to_string(),
            node: ResultNode::new(),
        }
    }

    pub fn probe_id(&self) -> &str {
        &self.probe_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn node(&self) -> &ResultNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut ResultNode {
        &mut self.node
    }

    pub fn start(&mut self) -> ResultResult<()> {
        self.node.start()
    }

    pub fn stop(&mut self) -> ResultResult<()> {
        self.node.stop()
    }

    pub fn set(&mut self, success: bool, message: &str) -> ResultResult<()> {
        self.node.set(success, message)
    }

    pub fn add_result(&mut self, child: impl Into<ResultEntry>) -> ResultResult<()> {
        self.node.add_result(child)
    }

    pub fn success(&self) -> bool {
        self.node.success()
    }

    pub fn message(&self) -> &str {
        self.node.message()
    }

    pub fn children(&self) -> &[ResultEntry] {
        self.node.children()
    }

    /// Check results directly under the root, in execution order
    pub fn check_results(&self) -> impl Iterator<Item = &CheckResult> {
        self.node.children().iter().filter_map(ResultEntry::as_check)
    }

    pub fn abandon(&mut self, message: &str) {
        self.node.abandon(message)
    }
}

impl std::fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "success={} msg={} response_time={}",
            self.success(),
            self.message(),
            self.node
                .response_time_secs()
                .map(|s| format!("{:.3}s", s))
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_twice_fails() {
        let mut node = ResultNode::new();
        node.start().unwrap();
        assert_eq!(node.start(), Err(ResultError::AlreadyStarted));
    }

    #[test]
    fn test_stop_requires_start_and_only_once() {
        let mut node = ResultNode::new();
        assert_eq!(node.stop(), Err(ResultError::NotStarted));
        node.start().unwrap();
        node.stop().unwrap();
        assert_eq!(node.stop(), Err(ResultError::AlreadyStopped));
    }

    #[test]
    fn test_duration_requires_stop() {
        let mut node = ResultNode::new();
        assert_eq!(node.duration(), Err(ResultError::NotStarted));
        node.start().unwrap();
        assert_eq!(node.duration(), Err(ResultError::NotStopped));
        node.stop().unwrap();
        assert!(node.duration().unwrap() >= Duration::zero());
        assert!(node.response_time_secs().unwrap() >= 0.0);
    }

    #[test]
    fn test_failure_is_monotonic() {
        let mut node = ResultNode::new();
        node.set(false, "HTTP Error status=500").unwrap();
        node.set(true, "OK").unwrap();
        assert!(!node.success());
        assert_eq!(node.message(), "HTTP Error status=500");
    }

    #[test]
    fn test_later_failures_append() {
        let mut node = ResultNode::new();
        node.set(true, "fine so far").unwrap();
        assert_eq!(node.message(), "fine so far");
        node.set(false, "first").unwrap();
        node.set(false, "second").unwrap();
        assert_eq!(node.message(), "first; second");
    }

    #[test]
    fn test_no_mutation_after_stop() {
        let mut node = ResultNode::new();
        node.start().unwrap();
        node.stop().unwrap();
        assert_eq!(node.set(false, "late"), Err(ResultError::Finalized));
        assert_eq!(node.add_result(ResultNode::new()), Err(ResultError::Finalized));
        assert!(node.success());
    }

    #[test]
    fn test_success_is_and_of_children() {
        let mut root = ProbeResult::new("probe", "http://example.org");
        assert!(root.success());

        let mut ok = CheckResult::new("check.A", BTreeMap::new());
        ok.set(true, "OK").unwrap();
        root.add_result(ok).unwrap();
        assert!(root.success());

        let mut nested = ResultNode::named("Test Layers");
        let mut failed = ResultNode::named("GetMap roads");
        failed.set(false, "not an image").unwrap();
        nested.add_result(failed).unwrap();
        root.add_result(nested).unwrap();

        assert!(!root.success());
        assert!(root.node().own_success());
        assert_eq!(root.message(), "OK");
    }

    #[test]
    fn test_abandon_closes_running_nodes() {
        let mut root = ProbeResult::new("probe", "http://example.org");
        root.start().unwrap();
        let mut child = ResultNode::named("Test Capabilities");
        child.start().unwrap();
        root.add_result(child).unwrap();

        root.abandon("Probe cancelled");
        assert!(!root.success());
        assert!(root.node().is_stopped());
        let child = root.children()[0].as_node().unwrap();
        assert!(child.is_stopped());
        assert_eq!(child.message(), "Probe cancelled");
    }
}

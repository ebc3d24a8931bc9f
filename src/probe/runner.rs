//! Probe execution lifecycle
//!
//! One run goes INIT → REQUEST_PREP → REQUEST_SENT → CHECKS_RUN →
//! FINALIZED. Everything that can go wrong after INIT is recorded in the
//! result tree; only configuration errors found during INIT are returned
//! to the caller, before any result exists.

use crate::auth::{self, AuthCipher, AuthDescriptor};
use crate::core::error_handling::panic_message;
use crate::params::{merge, ConfigResult, ConfigurationError, ParamValue, ParameterValues};
use crate::plugin::api::Registry;
use crate::probe::cancel::{CancelSignal, CANCELLED_MESSAGE};
use crate::probe::error::ProbeError;
use crate::probe::session::ProbeSession;
use crate::probe::target::{CheckUsage, TargetConfig};
use crate::probe::traits::{Check, CheckContext, Probe};
use crate::probe::transport::Transport;
use crate::result::{CheckResult, ProbeResult};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const BLOCKING_IN_RUNTIME_MESSAGE: &str = "Cannot run a blocking probe inside an async runtime";

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    /// Applied to every request, drilldown sub-requests included
    pub timeout: Duration,
    /// Key for stored (encrypted) auth descriptors
    pub secret_key: Option<String>,
    /// Reject parameter values outside their declared range
    pub strict_ranges: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secret_key: None,
            strict_ranges: false,
        }
    }
}

struct PlannedCheck {
    check_id: String,
    check: Box<dyn Check>,
    params: ParameterValues,
    resolved: BTreeMap<String, ParamValue>,
}

/// Everything INIT resolved for one execution
pub struct ExecutionPlan {
    probe_id: String,
    url: String,
    probe: Box<dyn Probe>,
    params: ParameterValues,
    resolved: BTreeMap<String, ParamValue>,
    class_vars: BTreeMap<String, String>,
    checks: Vec<PlannedCheck>,
    auth_headers: BTreeMap<String, String>,
}

impl ExecutionPlan {
    pub fn probe_id(&self) -> &str {
        &self.probe_id
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.resolved
    }

    /// Checks to run, in order
    pub fn check_ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.check_id.as_str()).collect()
    }

    pub fn check_parameters(&self, index: usize) -> Option<&BTreeMap<String, ParamValue>> {
        self.checks.get(index).map(|c| &c.resolved)
    }

    pub fn has_auth_header(&self) -> bool {
        !self.auth_headers.is_empty()
    }
}

pub struct ProbeRunner {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    options: RunnerOptions,
}

impl ProbeRunner {
    pub fn new(registry: Arc<Registry>, transport: Arc<dyn Transport>, options: RunnerOptions) -> Self {
        Self {
            registry,
            transport,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub async fn run(&self, target: &TargetConfig) -> ConfigResult<ProbeResult> {
        self.run_with_cancel(target, &CancelSignal::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        target: &TargetConfig,
        cancel: &CancelSignal,
    ) -> ConfigResult<ProbeResult> {
        let plan = self.prepare(target)?;
        Ok(self.execute(plan, cancel).await)
    }

    /// Run one probe from synchronous code
    ///
    /// Uses its own current-thread runtime. Called from inside an async
    /// context it returns an abandoned result instead of blocking.
    pub fn run_blocking(&self, target: &TargetConfig) -> ConfigResult<ProbeResult> {
        let plan = self.prepare(target)?;
        if tokio::runtime::Handle::try_current().is_ok() {
            log::error!("run_blocking called inside an async runtime for {}", plan.url);
            let mut result = ProbeResult::new(&plan.probe_id, &plan.url);
            result.abandon(BLOCKING_IN_RUNTIME_MESSAGE);
            return Ok(result);
        }
        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => Ok(runtime.block_on(self.execute(plan, &CancelSignal::new()))),
            Err(e) => {
                log::error!("Cannot start runtime for {}: {}", plan.url, e);
                let mut result = ProbeResult::new(&plan.probe_id, &plan.url);
                result.abandon(&format!("Cannot start runtime: {}", e));
                Ok(result)
            }
        }
    }

    /// INIT: resolve plugins, parameters and credentials
    pub fn prepare(&self, target: &TargetConfig) -> ConfigResult<ExecutionPlan> {
        let probe_id = self.registry.canonical_id(&target.probe)?;
        let probe = self.registry.create_probe(probe_id)?;
        let params = ParameterValues::new(
            probe_id,
            self.registry.effective_schema(probe_id)?,
            target.parameters.clone(),
        );
        let resolved = params.resolve_all()?;
        self.check_ranges(&params, &resolved)?;
        probe.init(&params)?;

        Ok(ExecutionPlan {
            probe_id: probe_id.to_string(),
            url: target.url.clone(),
            probe,
            params,
            resolved,
            class_vars: self.registry.class_vars(probe_id)?,
            checks: self.plan_checks(probe_id, target)?,
            auth_headers: self.auth_headers(target)?,
        })
    }

    fn plan_checks(&self, probe_id: &str, target: &TargetConfig) -> ConfigResult<Vec<PlannedCheck>> {
        let available = self.registry.check_usages(probe_id)?;
        let usages: Vec<CheckUsage> = if target.checks.is_empty() {
            available
                .iter()
                .filter(|a| a.default)
                .map(|a| CheckUsage::new(&a.check))
                .collect()
        } else {
            target.checks.clone()
        };

        usages
            .iter()
            .map(|usage| {
                let check_id = self.registry.canonical_id(&usage.plugin_id)?;
                let check = self.registry.create_check(check_id)?;
                let mut schema = self.registry.effective_schema(check_id)?;
                // Probe-level refinements of this check's parameters
                if let Some(availability) = available
                    .iter()
                    .find(|a| self.registry.canonical_id(&a.check).ok() == Some(check_id))
                {
                    schema = merge(&schema, &availability.set_params);
                }
                let params = ParameterValues::new(check_id, schema, usage.parameters.clone());
                let resolved = params.resolve_all()?;
                self.check_ranges(&params, &resolved)?;
                Ok(PlannedCheck {
                    check_id: check_id.to_string(),
                    check,
                    params,
                    resolved,
                })
            })
            .collect()
    }

    fn check_ranges(
        &self,
        params: &ParameterValues,
        resolved: &BTreeMap<String, ParamValue>,
    ) -> ConfigResult<()> {
        if !self.options.strict_ranges {
            return Ok(());
        }
        match params.schema().range_violations(resolved).into_iter().next() {
            None => Ok(()),
            Some(name) => Err(ConfigurationError::InvalidParameterValue {
                reason: format!(
                    "'{}' is outside the allowed range",
                    resolved.get(&name).map(ParamValue::render).unwrap_or_default()
                ),
                parameter: name,
                plugin: params.plugin().to_string(),
            }),
        }
    }

    /// Authorization header for the target, empty when there is none
    ///
    /// A scheme that is unknown or does not verify only costs the header;
    /// stored credentials that cannot be decrypted are a configuration error.
    fn auth_headers(&self, target: &TargetConfig) -> ConfigResult<BTreeMap<String, String>> {
        let descriptor = match (&target.auth, &target.auth_encoded) {
            (Some(descriptor), _) => descriptor.clone(),
            (None, Some(encoded)) => self.decode_auth(encoded)?,
            (None, None) => return Ok(BTreeMap::new()),
        };

        let mut headers = BTreeMap::new();
        match auth::create(&self.registry, &descriptor) {
            Ok(auth) => {
                auth.add_auth_header(&mut headers);
                if headers.is_empty() {
                    log::debug!(
                        "Auth '{}' for {} did not verify; no Authorization header",
                        descriptor.scheme,
                        target.url
                    );
                }
            }
            Err(e) => log::warn!("Ignoring auth for {}: {}", target.url, e),
        }
        Ok(headers)
    }

    fn decode_auth(&self, encoded: &str) -> ConfigResult<AuthDescriptor> {
        let secret = self
            .options
            .secret_key
            .as_deref()
            .ok_or_else(|| ConfigurationError::CredentialDecode {
                reason: "no secret key configured".to_string(),
            })?;
        AuthDescriptor::decode(&AuthCipher::new(secret), encoded).map_err(|e| {
            ConfigurationError::CredentialDecode {
                reason: e.to_string(),
            }
        })
    }

    /// REQUEST_PREP through FINALIZED
    pub async fn execute(&self, plan: ExecutionPlan, cancel: &CancelSignal) -> ProbeResult {
        let ExecutionPlan {
            probe_id,
            url,
            probe,
            params,
            resolved,
            class_vars,
            checks,
            auth_headers,
        } = plan;

        log::debug!("Running {} against {}", probe_id, url);
        let mut session = ProbeSession::new(
            &probe_id,
            &url,
            params,
            resolved,
            class_vars,
            Arc::clone(&self.transport),
            auth_headers,
            self.options.timeout,
            cancel.clone(),
        );

        if let Err(e) = session.result_mut().start() {
            log::error!("Result for {} not started: {}", url, e);
        }
        if cancel.is_cancelled() {
            return cancelled(session);
        }

        let outcome = AssertUnwindSafe(request_phase(probe.as_ref(), &mut session))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => record_failure(&mut session, &format!("Request Err: {}", e)),
            Err(payload) => record_failure(
                &mut session,
                &format!("Probe panicked: {}", panic_message(payload.as_ref())),
            ),
        }
        // Multi-step probes stop quietly when cancelled mid-request
        if cancel.is_cancelled() {
            return cancelled(session);
        }

        for planned in &checks {
            if cancel.is_cancelled() {
                return cancelled(session);
            }
            let check_result = run_check(planned, &session);
            if let Err(e) = session.result_mut().add_result(check_result) {
                log::error!("Cannot record check {}: {}", planned.check_id, e);
            }
        }

        let mut result = session.into_result();
        if let Err(e) = result.stop() {
            log::error!("Result for {} not stopped: {}", url, e);
        }
        log::info!(
            "{} {}: {} ({:.3}s) {}",
            if result.success() { "OK" } else { "FAILED" },
            probe_id,
            url,
            result.node().response_time_secs().unwrap_or_default(),
            result.message()
        );
        result
    }
}

async fn request_phase(probe: &dyn Probe, session: &mut ProbeSession) -> Result<(), ProbeError> {
    probe.before_request(session).await?;
    probe.perform_request(session).await?;
    probe.after_request(session).await
}

fn record_failure(session: &mut ProbeSession, message: &str) {
    log::warn!("{}: {}", session.url(), message);
    if let Err(e) = session.result_mut().set(false, message) {
        log::error!("Cannot record failure for {}: {}", session.url(), e);
    }
}

fn run_check(planned: &PlannedCheck, session: &ProbeSession) -> CheckResult {
    let mut result = CheckResult::new(&planned.check_id, planned.resolved.clone());
    if let Err(e) = result.start() {
        log::error!("Check result for {} not started: {}", planned.check_id, e);
    }

    let context = CheckContext {
        probe_id: session.probe_id(),
        url: session.url(),
        response: session.response(),
        params: &planned.params,
    };
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| planned.check.perform(&context)));
    let (success, message) = match outcome {
        Ok(Ok(outcome)) => (outcome.success, outcome.message),
        Ok(Err(e)) => (false, e.to_string()),
        Err(payload) => (false, format!("Check panicked: {}", panic_message(payload.as_ref()))),
    };
    log::debug!(
        "Check {} {}: {}",
        planned.check_id,
        if success { "passed" } else { "failed" },
        message
    );

    if let Err(e) = result.set(success, &message).and_then(|_| result.stop()) {
        log::error!("Check result for {} not recorded: {}", planned.check_id, e);
    }
    result
}

fn cancelled(session: ProbeSession) -> ProbeResult {
    log::warn!("Probe {} against {} cancelled", session.probe_id(), session.url());
    let mut result = session.into_result();
    result.abandon(CANCELLED_MESSAGE);
    result
}

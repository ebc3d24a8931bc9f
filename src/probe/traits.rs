//! Probe and Check plugin interfaces

use crate::params::{ConfigResult, ParameterValues};
use crate::probe::error::{CheckError, ProbeError};
use crate::probe::session::ProbeSession;
use crate::probe::transport::ProbeResponse;
use crate::result::DEFAULT_MESSAGE;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A plugin that talks to a target and captures what it answered
///
/// The runner calls `init` while preparing, then the hooks in order:
/// `before_request`, `perform_request`, `after_request`. The default `perform_request` sends
/// one request built from the probe's `REQUEST_METHOD` and
/// `REQUEST_TEMPLATE` class variables and keeps the response for checks.
/// Multi-step probes override it and record named sub-results on the
/// session instead.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Validate resolved parameters before anything is sent
    fn init(&self, _params: &ParameterValues) -> ConfigResult<()> {
        Ok(())
    }

    async fn before_request(&self, _session: &mut ProbeSession) -> Result<(), ProbeError> {
        Ok(())
    }

    /// Extra headers for the templated request
    fn request_headers(&self, _session: &ProbeSession) -> ConfigResult<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }

    async fn perform_request(&self, session: &mut ProbeSession) -> Result<(), ProbeError> {
        let headers = self.request_headers(session)?;
        session.send_templated(headers).await
    }

    async fn after_request(&self, _session: &mut ProbeSession) -> Result<(), ProbeError> {
        Ok(())
    }
}

/// What a check gets to look at
pub struct CheckContext<'a> {
    pub probe_id: &'a str,
    pub url: &'a str,
    pub response: Option<&'a ProbeResponse>,
    pub params: &'a ParameterValues,
}

impl<'a> CheckContext<'a> {
    /// The captured response, or [`CheckError::NoResponse`]
    pub fn response(&self) -> Result<&'a ProbeResponse, CheckError> {
        self.response.ok_or(CheckError::NoResponse)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub success: bool,
    pub message: String,
}

impl CheckOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: DEFAULT_MESSAGE.to_string(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Pass or fail depending on `condition`
    pub fn expect(condition: bool, failure: impl FnOnce() -> String) -> Self {
        if condition {
            Self::ok()
        } else {
            Self::fail(failure())
        }
    }
}

/// A plugin that judges the response captured by a probe
///
/// Checks are synchronous; a returned error becomes a failed check result
/// and never stops the checks that follow.
pub trait Check: Send + Sync {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError>;
}

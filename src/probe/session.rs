//! State of one probe execution
//!
//! A session is built by the runner after parameters are resolved and is
//! handed to the probe hooks. It owns the root result, the last captured
//! response and the request defaults (auth headers, timeout) applied to
//! every request the probe sends, sub-requests included.

use crate::params::{ParamValue, ParameterValues};
use crate::plugin::api::{CLASS_VAR_REQUEST_METHOD, CLASS_VAR_REQUEST_TEMPLATE};
use crate::probe::cancel::CancelSignal;
use crate::probe::error::{ProbeError, TransportError};
use crate::probe::template;
use crate::probe::transport::{ProbeRequest, ProbeResponse, RequestMethod, Transport};
use crate::result::ProbeResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Longest body excerpt logged for error responses
const ERROR_EXCERPT_CHARS: usize = 240;

pub struct ProbeSession {
    url: String,
    params: ParameterValues,
    resolved: BTreeMap<String, ParamValue>,
    class_vars: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
    default_headers: BTreeMap<String, String>,
    timeout: Duration,
    result: ProbeResult,
    response: Option<ProbeResponse>,
    cancel: CancelSignal,
}

impl ProbeSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        probe_id: &str,
        url: &str,
        params: ParameterValues,
        resolved: BTreeMap<String, ParamValue>,
        class_vars: BTreeMap<String, String>,
        transport: Arc<dyn Transport>,
        default_headers: BTreeMap<String, String>,
        timeout: Duration,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            url: url.to_string(),
            params,
            resolved,
            class_vars,
            transport,
            default_headers,
            timeout,
            result: ProbeResult::new(probe_id, url),
            response: None,
            cancel,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn probe_id(&self) -> &str {
        self.result.probe_id()
    }

    pub fn params(&self) -> &ParameterValues {
        &self.params
    }

    /// All probe parameters, resolved before the session was created
    pub fn resolved_params(&self) -> &BTreeMap<String, ParamValue> {
        &self.resolved
    }

    pub fn class_var(&self, name: &str) -> Option<&str> {
        self.class_vars.get(name).map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn result(&self) -> &ProbeResult {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut ProbeResult {
        &mut self.result
    }

    pub(crate) fn into_result(self) -> ProbeResult {
        self.result
    }

    /// Most recent response kept for checks
    pub fn response(&self) -> Option<&ProbeResponse> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: ProbeResponse) {
        self.response = Some(response);
    }

    /// Send one request with the session defaults applied
    ///
    /// Auth headers are added unless the request sets them itself, and the
    /// session timeout is used when the request carries none. Error status
    /// codes are logged; judging them is left to checks.
    pub async fn send(&self, mut request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
        for (name, value) in &self.default_headers {
            request
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        request.timeout.get_or_insert(self.timeout);

        log::info!("Requesting: {} {}", request.method, request.url);
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        log::debug!("Response status {} from {}", response.status, url);
        if response.is_error_status() {
            let text = response.text();
            let excerpt: String = text.chars().take(ERROR_EXCERPT_CHARS).collect();
            log::warn!("Error response {} from {}: {}", response.status, url, excerpt);
        }
        Ok(response)
    }

    /// Build the request described by the probe's class variables
    pub fn templated_request(&self) -> Result<ProbeRequest, ProbeError> {
        let method = match self.class_var(CLASS_VAR_REQUEST_METHOD) {
            Some(method) => method.parse::<RequestMethod>().map_err(ProbeError::Template)?,
            None => RequestMethod::Get,
        };
        let template = self.class_var(CLASS_VAR_REQUEST_TEMPLATE).unwrap_or("");

        let request = match method {
            RequestMethod::Get if template.is_empty() => ProbeRequest::get(&self.url),
            RequestMethod::Get => {
                let url = template::render_query(&self.url, template, &self.resolved)
                    .map_err(ProbeError::Template)?;
                ProbeRequest::get(&url)
            }
            RequestMethod::Post => {
                let body = template::render(template, &self.resolved).map_err(ProbeError::Template)?;
                ProbeRequest::post(&self.url, body)
            }
        };
        Ok(request)
    }

    /// Send the templated request and keep its response
    pub async fn send_templated(
        &mut self,
        headers: BTreeMap<String, String>,
    ) -> Result<(), ProbeError> {
        let mut request = self.templated_request()?;
        request.headers.extend(headers);
        let response = self.send(request).await?;
        self.set_response(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterSchema, ParameterSpec};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<ProbeRequest>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(ProbeResponse::new(200, "ok"))
        }
    }

    fn session(
        url: &str,
        class_vars: &[(&str, &str)],
        recorder: Arc<Recorder>,
    ) -> ProbeSession {
        let schema = ParameterSchema::new()
            .with("query", ParameterSpec::string("Query").with_default("a=1"));
        let params = ParameterValues::new("TestProbe", schema, BTreeMap::new());
        let resolved = params.resolve_all().unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer t".to_string());
        ProbeSession::new(
            "TestProbe",
            url,
            params,
            resolved,
            class_vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            recorder,
            headers,
            Duration::from_secs(7),
            CancelSignal::new(),
        )
    }

    #[tokio::test]
    async fn test_templated_get_carries_defaults() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session(
            "http://host/ows?map=x",
            &[(CLASS_VAR_REQUEST_TEMPLATE, "?{query}")],
            recorder.clone(),
        );
        session.send_templated(BTreeMap::new()).await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].url, "http://host/ows?map=x&a=1");
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(7)));
        assert_eq!(seen[0].headers["Authorization"], "Bearer t");
        assert_eq!(session.response().map(|r| r.status), Some(200));
    }

    #[tokio::test]
    async fn test_templated_post_sends_body() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session(
            "http://host/ows",
            &[
                (CLASS_VAR_REQUEST_METHOD, "POST"),
                (CLASS_VAR_REQUEST_TEMPLATE, "<q>{query}</q>"),
            ],
            recorder.clone(),
        );
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/xml".to_string());
        session.send_templated(headers).await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].method, RequestMethod::Post);
        assert_eq!(seen[0].url, "http://host/ows");
        assert_eq!(seen[0].body.as_deref(), Some("<q>a=1</q>"));
        assert_eq!(seen[0].headers["content-type"], "text/xml");
    }
}

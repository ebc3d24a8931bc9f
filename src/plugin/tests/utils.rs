//! Shared helpers for the plugin test suites

use crate::params::{ParamValue, ParameterValues};
use crate::plugin::api::{DiscoveryConfig, Registry};
use crate::plugin::builtin::http::HTTP_GET;
use crate::probe::error::CheckError;
use crate::probe::traits::{CheckContext, CheckOutcome};
use crate::probe::transport::ProbeResponse;
use std::collections::BTreeMap;

pub const TARGET_URL: &str = "https://demo.example.org/ows";

/// Registry with every builtin package enabled
pub fn builtin_registry() -> Registry {
    Registry::discover(&DiscoveryConfig::default())
}

pub fn supplied(values: &[(&str, &str)]) -> BTreeMap<String, ParamValue> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
        .collect()
}

/// Run a registered check against `response` with the given parameters
pub fn perform_check(
    registry: &Registry,
    check_id: &str,
    response: Option<&ProbeResponse>,
    values: &[(&str, &str)],
) -> Result<CheckOutcome, CheckError> {
    let check = registry.create_check(check_id).unwrap();
    let schema = registry.effective_schema(check_id).unwrap();
    let params = ParameterValues::new(check_id, schema, supplied(values));
    let context = CheckContext {
        probe_id: HTTP_GET,
        url: TARGET_URL,
        response,
        params: &params,
    };
    check.perform(&context)
}

pub fn xml_response(body: &str) -> ProbeResponse {
    ProbeResponse::new(200, body.as_bytes().to_vec()).with_header("Content-Type", "text/xml")
}

//! ResourceAuth plugin interface

use crate::params::ParameterValues;
use std::collections::BTreeMap;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// A credential scheme that turns itself into an Authorization header
///
/// Instances are initialised with the descriptor's data fields resolved
/// against the scheme's parameter schema. An instance that does not verify
/// never yields a header.
pub trait ResourceAuth: Send + Sync {
    fn init(&mut self, params: ParameterValues);

    fn params(&self) -> Option<&ParameterValues>;

    /// Every required data field is present and non-empty
    fn verify(&self) -> bool {
        let params = match self.params() {
            Some(params) => params,
            None => return false,
        };
        params
            .schema()
            .iter()
            .filter(|(_, spec)| spec.required)
            .all(|(name, _)| params.get(name).map(|v| !v.is_empty()).unwrap_or(false))
    }

    /// Scheme-specific header value
    fn encode_auth_header_val(&self) -> Option<String>;

    fn get_auth_header(&self) -> Option<BTreeMap<String, String>> {
        if !self.verify() {
            return None;
        }
        let value = self.encode_auth_header_val()?;
        let mut header = BTreeMap::new();
        header.insert(AUTHORIZATION_HEADER.to_string(), value.replace(['\n', '\r'], ""));
        Some(header)
    }

    fn add_auth_header(&self, headers: &mut BTreeMap<String, String>) {
        if let Some(header) = self.get_auth_header() {
            headers.extend(header);
        }
    }
}

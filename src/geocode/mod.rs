//! Geocoder capability
//!
//! Geocoders place a server on the map from its hostname. Lookups never
//! fail outward: anything that goes wrong yields [`Location::UNKNOWN`].

use crate::params::{ConfigResult, ParamValue, ParameterValues};
use crate::plugin::api::Registry;
use crate::probe::transport::Transport;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const UNKNOWN: Location = Location { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Collaborators a geocoder may use for lookups
#[derive(Clone)]
pub struct GeocodeContext {
    pub transport: Arc<dyn Transport>,
    pub timeout: Duration,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    fn init(&mut self, params: ParameterValues);

    async fn locate(&self, hostname: &str, context: &GeocodeContext) -> Location;
}

/// Build a geocoder and resolve its parameters
pub fn create(
    registry: &Registry,
    plugin_id: &str,
    vars: BTreeMap<String, ParamValue>,
) -> ConfigResult<Box<dyn Geocoder>> {
    let mut geocoder = registry.create_geocoder(plugin_id)?;
    let id = registry.canonical_id(plugin_id)?;
    let params = ParameterValues::new(id, registry.effective_schema(id)?, vars);
    params.resolve_all()?;
    geocoder.init(params);
    Ok(geocoder)
}

/// Hostname part of a URL
pub fn hostname_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

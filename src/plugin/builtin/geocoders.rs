//! Server geolocation plugins

use crate::builtin;
use crate::geocode::{GeocodeContext, Geocoder, Location};
use crate::params::{ParamType, ParameterSpec, ParameterValues, SchemaOverride};
use crate::plugin::builtin::geocoder;
use crate::plugin::types::{PluginDescriptor, PluginFactory, PluginPackage};
use crate::probe::transport::ProbeRequest;
use async_trait::async_trait;

pub const FIXED_PACKAGE: &str = "geoprobe.plugins.geocode.fixedlocation";
pub const WEB_PACKAGE: &str = "geoprobe.plugins.geocode.webgeocoder";

pub const FIXED_LOCATION: &str = "geoprobe.plugins.geocode.fixedlocation.FixedLocation";
pub const HTTP_GET_GEOCODER: &str = "geoprobe.plugins.geocode.webgeocoder.HttpGetGeocoder";

builtin!(PluginPackage {
    root: FIXED_PACKAGE,
    aliases: &["GeoHealthCheck.plugins.geocode.fixedlocation"],
    plugins: fixed_plugins,
});

builtin!(PluginPackage {
    root: WEB_PACKAGE,
    aliases: &["GeoHealthCheck.plugins.geocode.webgeocoder"],
    plugins: web_plugins,
});

fn fixed_plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(FIXED_LOCATION, PluginFactory::Geocoder(geocoder::<FixedLocation>))
            .named(
                "Fixed geolocation",
                "Geolocator service returning a fixed position",
            )
            .parameters(|| {
                SchemaOverride::new()
                    .with(
                        "lat",
                        ParameterSpec::new(ParamType::Number, "Latitude").with_default(0.0),
                    )
                    .with(
                        "lon",
                        ParameterSpec::new(ParamType::Number, "Longitude").with_default(0.0),
                    )
            }),
    ]
}

fn web_plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(
            HTTP_GET_GEOCODER,
            PluginFactory::Geocoder(geocoder::<HttpGetGeocoder>),
        )
        .named(
            "Http geocoder plugin based on a GET request",
            "Geolocator service via a http GET request",
        )
        .parameters(|| {
            SchemaOverride::new()
                .with(
                    "geocoder_url",
                    ParameterSpec::string("Lookup URL; {hostname} is replaced by the server name")
                        .required(),
                )
                .with(
                    "lat_field",
                    ParameterSpec::string("Latitude field in the JSON response").required(),
                )
                .with(
                    "lon_field",
                    ParameterSpec::string("Longitude field in the JSON response").required(),
                )
        }),
    ]
}

#[derive(Debug, Default)]
pub struct FixedLocation {
    location: Option<Location>,
}

#[async_trait]
impl Geocoder for FixedLocation {
    fn init(&mut self, params: ParameterValues) {
        let lat = params.number("lat").unwrap_or_default();
        let lon = params.number("lon").unwrap_or_default();
        self.location = Some(Location::new(lat, lon));
    }

    async fn locate(&self, _hostname: &str, _context: &GeocodeContext) -> Location {
        self.location.unwrap_or(Location::UNKNOWN)
    }
}

#[derive(Debug, Default)]
pub struct HttpGetGeocoder {
    params: Option<ParameterValues>,
}

impl HttpGetGeocoder {
    async fn lookup(&self, hostname: &str, context: &GeocodeContext) -> Result<Location, String> {
        let params = self.params.as_ref().ok_or("geocoder not initialised")?;
        let url = params
            .text("geocoder_url")
            .map_err(|e| e.to_string())?
            .replace("{hostname}", hostname);
        let lat_field = params.text("lat_field").map_err(|e| e.to_string())?;
        let lon_field = params.text("lon_field").map_err(|e| e.to_string())?;

        log::info!("Requesting: url={}", url);
        let mut request = ProbeRequest::get(&url);
        request.timeout = Some(context.timeout);
        let response = context
            .transport
            .send(request)
            .await
            .map_err(|e| e.to_string())?;
        if response.is_error_status() {
            return Err(format!("HTTP Error status={}", response.status));
        }

        let content: serde_json::Value =
            serde_json::from_slice(&response.body).map_err(|e| e.to_string())?;
        Ok(Location::new(
            coordinate(&content, &lat_field)?,
            coordinate(&content, &lon_field)?,
        ))
    }
}

/// Numeric field, also accepted as a numeric string
fn coordinate(content: &serde_json::Value, field: &str) -> Result<f64, String> {
    let value = content
        .get(field)
        .ok_or_else(|| format!("no field '{}' in response", field))?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| format!("field '{}' is not a number", field))
}

#[async_trait]
impl Geocoder for HttpGetGeocoder {
    fn init(&mut self, params: ParameterValues) {
        self.params = Some(params);
    }

    async fn locate(&self, hostname: &str, context: &GeocodeContext) -> Location {
        match self.lookup(hostname, context).await {
            Ok(location) => location,
            Err(reason) => {
                log::warn!("Could not derive coordinates for {}: {}", hostname, reason);
                Location::UNKNOWN
            }
        }
    }
}

//! WMS drilldown probe
//!
//! Starts at the Capabilities document and, depending on the drilldown
//! level, continues with GetMap requests on the advertised layers. Each
//! step is a named sub-result of the probe result:
//!
//! - `basic` (alias `minor`): Capabilities only
//! - `moderate`: plus GetMap on the first testable layer
//! - `full`: plus GetMap on every testable layer

pub mod capabilities;

use crate::builtin;
use crate::params::{
    CheckAvailability, ConfigResult, ConfigurationError, ParameterSpec, ParameterValues,
    SchemaOverride,
};
use crate::plugin::builtin::checks::{NOT_CONTAINS_OWS_EXCEPTION, XML_PARSE};
use crate::plugin::builtin::probe;
use crate::plugin::registry::{CLASS_VAR_REQUEST_METHOD, CLASS_VAR_RESOURCE_TYPE};
use crate::plugin::types::{PluginDescriptor, PluginFactory, PluginPackage};
use crate::probe::error::ProbeError;
use crate::probe::session::ProbeSession;
use crate::probe::template;
use crate::probe::traits::Probe;
use crate::probe::transport::ProbeRequest;
use crate::result::ResultNode;
use async_trait::async_trait;
use capabilities::{Capabilities, LayerInfo};
use std::str::FromStr;

pub const PACKAGE: &str = "geoprobe.plugins.probe.wmsdrilldown";
pub const WMS_DRILLDOWN: &str = "geoprobe.plugins.probe.wmsdrilldown.WmsDrilldown";

pub const CAPABILITIES_STEP: &str = "Test Capabilities";
pub const LAYERS_STEP: &str = "Test Layers";

const CAPABILITIES_TEMPLATE: &str = "?SERVICE=WMS&VERSION={version}&REQUEST=GetCapabilities";
const MAP_SIZE: &str = "256";

builtin!(PluginPackage {
    root: PACKAGE,
    aliases: &["GeoHealthCheck.plugins.probe.wmsdrilldown"],
    plugins,
});

fn plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(WMS_DRILLDOWN, PluginFactory::Probe(probe::<WmsDrilldown>))
            .named(
                "WMS Drilldown",
                "Traverses a WMS endpoint by drilling down from Capabilities",
            )
            .class_vars(&[
                (CLASS_VAR_RESOURCE_TYPE, "OGC:WMS"),
                (CLASS_VAR_REQUEST_METHOD, "GET"),
            ])
            .parameters(|| {
                SchemaOverride::new()
                    .with(
                        "drilldown_level",
                        ParameterSpec::string("How heavy the drilldown should be")
                            .with_default("basic")
                            .with_range(["basic", "moderate", "full"])
                            .required(),
                    )
                    .with(
                        "version",
                        ParameterSpec::string("The WMS version to request")
                            .with_default("1.1.1")
                            .with_range(["1.1.1", "1.3.0"])
                            .required(),
                    )
            })
            .check_usages(|| {
                vec![
                    CheckAvailability::new(XML_PARSE),
                    CheckAvailability::new(NOT_CONTAINS_OWS_EXCEPTION),
                ]
            }),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DrilldownLevel {
    Basic,
    Moderate,
    Full,
}

impl FromStr for DrilldownLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "minor" => Ok(DrilldownLevel::Basic),
            "moderate" => Ok(DrilldownLevel::Moderate),
            "full" => Ok(DrilldownLevel::Full),
            other => Err(format!("unknown drilldown level '{}'", other)),
        }
    }
}

fn drilldown_level(params: &ParameterValues) -> ConfigResult<DrilldownLevel> {
    let text = params.text("drilldown_level")?;
    text.parse()
        .map_err(|reason| ConfigurationError::InvalidParameterValue {
            parameter: "drilldown_level".to_string(),
            plugin: params.plugin().to_string(),
            reason,
        })
}

#[derive(Debug, Default)]
pub struct WmsDrilldown;

#[async_trait]
impl Probe for WmsDrilldown {
    fn init(&self, params: &ParameterValues) -> ConfigResult<()> {
        drilldown_level(params).map(|_| ())
    }

    async fn perform_request(&self, session: &mut ProbeSession) -> Result<(), ProbeError> {
        let level = drilldown_level(session.params())?;
        let version = session.params().text("version")?;

        let caps = match test_capabilities(session).await? {
            Some(caps) => caps,
            // Nothing below the Capabilities level can be tested
            None => return Ok(()),
        };
        if level == DrilldownLevel::Basic || session.is_cancelled() {
            return Ok(());
        }

        test_layers(session, &caps, &version, level).await;
        Ok(())
    }
}

async fn test_capabilities(session: &mut ProbeSession) -> Result<Option<Capabilities>, ProbeError> {
    let url = template::render_query(session.url(), CAPABILITIES_TEMPLATE, session.resolved_params())
        .map_err(ProbeError::Template)?;

    let mut node = ResultNode::named(CAPABILITIES_STEP);
    begin(&mut node);
    let outcome = match session.send(ProbeRequest::get(&url)).await {
        Err(e) => Err(e.to_string()),
        Ok(response) => {
            let parsed = if response.is_error_status() {
                Err(format!("HTTP Error status={}", response.status))
            } else {
                capabilities::parse(&response.body)
            };
            session.set_response(response);
            parsed
        }
    };

    let caps = match outcome {
        Ok(caps) => {
            log::info!(
                "response: title={}",
                caps.title.as_deref().unwrap_or("(untitled)")
            );
            Some(caps)
        }
        Err(message) => {
            fail(&mut node, &message);
            None
        }
    };
    finish(session, node);
    Ok(caps)
}

async fn test_layers(
    session: &mut ProbeSession,
    caps: &Capabilities,
    version: &str,
    level: DrilldownLevel,
) {
    let mut node = ResultNode::named(LAYERS_STEP);
    begin(&mut node);

    let testable: Vec<&LayerInfo> = caps.layers.iter().filter(|l| l.is_testable()).collect();
    if testable.is_empty() {
        fail(&mut node, "No layer with an EPSG:4326 bounding box in Capabilities");
    }
    let count = match level {
        DrilldownLevel::Full => testable.len(),
        _ => 1,
    };

    for layer in testable.into_iter().take(count) {
        if session.is_cancelled() {
            break;
        }
        let child = test_layer(session, caps, layer, version).await;
        if let Err(e) = node.add_result(child) {
            log::error!("Cannot record layer {}: {}", layer.name, e);
        }
    }
    finish(session, node);
}

async fn test_layer(
    session: &ProbeSession,
    caps: &Capabilities,
    layer: &LayerInfo,
    version: &str,
) -> ResultNode {
    let mut node = ResultNode::named(&format!("Layer {}", layer.name));
    begin(&mut node);
    log::info!("testing layer: {}", layer.name);

    match getmap_url(session.url(), caps, layer, version) {
        Err(message) => fail(&mut node, &message),
        Ok(url) => match session.send(ProbeRequest::get(&url)).await {
            Err(e) => fail(&mut node, &e.to_string()),
            Ok(response) if response.is_error_status() => {
                fail(&mut node, &format!("HTTP Error status={}", response.status))
            }
            Ok(response) => {
                let content_type = response.header("content-type").unwrap_or("");
                if !content_type.starts_with("image/") {
                    fail(
                        &mut node,
                        &format!(
                            "GetMap for layer {} returned content-type '{}'",
                            layer.name, content_type
                        ),
                    );
                }
            }
        },
    }

    if let Err(e) = node.stop() {
        log::error!("Layer result not stopped: {}", e);
    }
    node
}

fn getmap_url(
    base: &str,
    caps: &Capabilities,
    layer: &LayerInfo,
    version: &str,
) -> Result<String, String> {
    let [minx, miny, maxx, maxy] = layer
        .bbox
        .ok_or_else(|| format!("Layer {} has no bounding box", layer.name))?;
    // WMS 1.3.0 uses latitude/longitude axis order for EPSG:4326
    let (crs_key, bbox) = if version == "1.3.0" {
        ("CRS", format!("{},{},{},{}", miny, minx, maxy, maxx))
    } else {
        ("SRS", format!("{},{},{},{}", minx, miny, maxx, maxy))
    };

    let params = [
        ("SERVICE", "WMS"),
        ("VERSION", version),
        ("REQUEST", "GetMap"),
        ("LAYERS", layer.name.as_str()),
        ("STYLES", ""),
        (crs_key, "EPSG:4326"),
        ("BBOX", bbox.as_str()),
        ("WIDTH", MAP_SIZE),
        ("HEIGHT", MAP_SIZE),
        ("FORMAT", caps.image_format()),
        ("TRANSPARENT", "FALSE"),
    ];
    reqwest::Url::parse_with_params(base, params.iter())
        .map(String::from)
        .map_err(|e| format!("Cannot build GetMap URL: {}", e))
}

fn begin(node: &mut ResultNode) {
    if let Err(e) = node.start() {
        log::error!("Step result not started: {}", e);
    }
}

fn fail(node: &mut ResultNode, message: &str) {
    if let Err(e) = node.fail(message) {
        log::error!("Cannot record step failure '{}': {}", message, e);
    }
}

fn finish(session: &mut ProbeSession, mut node: ResultNode) {
    if let Err(e) = node.stop() {
        log::error!("Step result not stopped: {}", e);
    }
    if let Err(e) = session.result_mut().add_result(node) {
        log::error!("Cannot record step: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!("basic".parse(), Ok(DrilldownLevel::Basic));
        assert_eq!("minor".parse(), Ok(DrilldownLevel::Basic));
        assert_eq!("Moderate".parse(), Ok(DrilldownLevel::Moderate));
        assert_eq!("full".parse(), Ok(DrilldownLevel::Full));
        assert!("deep".parse::<DrilldownLevel>().is_err());
    }

    #[test]
    fn test_getmap_axis_order() {
        let caps = Capabilities::default();
        let layer = LayerInfo {
            name: "roads".to_string(),
            title: None,
            crs: vec!["EPSG:4326".to_string()],
            bbox: Some([4.0, 52.0, 5.0, 53.0]),
        };

        let v111 = getmap_url("http://host/wms?map=x", &caps, &layer, "1.1.1").unwrap();
        assert!(v111.starts_with("http://host/wms?map=x&SERVICE=WMS"));
        assert!(v111.contains("SRS=EPSG%3A4326"));
        assert!(v111.contains("BBOX=4%2C52%2C5%2C53"));
        assert!(v111.contains("FORMAT=image%2Fpng"));

        let v130 = getmap_url("http://host/wms", &caps, &layer, "1.3.0").unwrap();
        assert!(v130.contains("CRS=EPSG%3A4326"));
        assert!(v130.contains("BBOX=52%2C4%2C53%2C5"));
    }
}

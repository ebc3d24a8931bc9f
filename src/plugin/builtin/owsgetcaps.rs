//! OGC OWS GetCapabilities probes
//!
//! `OwsGetCaps` declares the request template, parameters and checks; each
//! concrete service type fixes `service` and narrows `version`.

use crate::builtin;
use crate::params::{CheckAvailability, ParameterSpec, SchemaOverride, SpecPatch};
use crate::plugin::builtin::checks::{
    CONTAINS_STRINGS, HTTP_STATUS_NO_ERROR, NOT_CONTAINS_OWS_EXCEPTION, XML_PARSE,
};
use crate::plugin::builtin::probe;
use crate::plugin::registry::{
    CLASS_VAR_REQUEST_METHOD, CLASS_VAR_REQUEST_TEMPLATE, CLASS_VAR_RESOURCE_TYPE,
};
use crate::plugin::types::{Capability, PluginDescriptor, PluginFactory, PluginPackage};
use crate::probe::traits::Probe;
use async_trait::async_trait;

pub const PACKAGE: &str = "geoprobe.plugins.probe.owsgetcaps";

pub const OWS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.OwsGetCaps";
pub const WMS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.WmsGetCaps";
pub const WFS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.WfsGetCaps";
pub const WCS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.WcsGetCaps";
pub const CSW_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.CswGetCaps";
pub const WMTS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.WmtsGetCaps";
pub const WPS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.WpsGetCaps";
pub const SOS_GET_CAPS: &str = "geoprobe.plugins.probe.owsgetcaps.SosGetCaps";

pub const GET_CAPS_TEMPLATE: &str = "?SERVICE={service}&VERSION={version}&REQUEST=GetCapabilities";

builtin!(PluginPackage {
    root: PACKAGE,
    aliases: &[
        "GeoHealthCheck.plugins.probe.owsgetcaps",
        "GeoHealthCheck.plugins.owsgetcaps",
    ],
    plugins,
});

fn plugins() -> Vec<PluginDescriptor> {
    let base = PluginDescriptor::new(OWS_GET_CAPS, PluginFactory::Abstract(Capability::Probe))
        .named(
            "OWS GetCapabilities",
            "Perform GetCapabilities Operation and check validity",
        )
        .author("GHC Team")
        .class_vars(&[
            (CLASS_VAR_REQUEST_METHOD, "GET"),
            (CLASS_VAR_REQUEST_TEMPLATE, GET_CAPS_TEMPLATE),
        ])
        .parameters(|| {
            SchemaOverride::new()
                .with(
                    "service",
                    ParameterSpec::string("The OWS service within resource endpoint").required(),
                )
                .with(
                    "version",
                    ParameterSpec::string("The OWS service version within resource endpoint")
                        .required(),
                )
        })
        .check_usages(|| {
            vec![
                CheckAvailability::new(HTTP_STATUS_NO_ERROR).by_default(),
                CheckAvailability::new(XML_PARSE).by_default(),
                CheckAvailability::new(NOT_CONTAINS_OWS_EXCEPTION).by_default(),
                CheckAvailability::new(CONTAINS_STRINGS)
                    .by_default()
                    .set_param(
                        "strings",
                        SpecPatch::new()
                            .description("Contains Title Element")
                            .value(vec!["Title>"]),
                    ),
            ]
        });

    vec![
        base,
        service(WMS_GET_CAPS, "WMS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WMS")])
            .parameters(|| version_params("WMS", "1.3.0", &["1.1.1", "1.3.0"])),
        service(WFS_GET_CAPS, "WFS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WFS")])
            .parameters(|| version_params("WFS", "1.1.0", &["1.0.0", "1.1.0", "2.0.2"])),
        service(WCS_GET_CAPS, "WCS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WCS")])
            .parameters(|| version_params("WCS", "1.1.0", &["1.1.0", "1.1.1", "2.0.1"])),
        service(CSW_GET_CAPS, "CSW GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:CSW")])
            .parameters(|| version_params("CSW", "2.0.2", &["2.0.2"])),
        service(WMTS_GET_CAPS, "WMTS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WMTS")])
            .parameters(|| version_params("WMTS", "1.0.0", &["1.0.0"])),
        service(WPS_GET_CAPS, "WPS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:WPS")])
            .parameters(|| version_params("WPS", "1.0.0", &["1.0.0", "2.0.0"])),
        service(SOS_GET_CAPS, "SOS GetCapabilities", &[(CLASS_VAR_RESOURCE_TYPE, "OGC:SOS")])
            .parameters(|| version_params("SOS", "1.0.0", &["1.0.0", "2.0.0"])),
    ]
}

fn service(
    id: &'static str,
    name: &'static str,
    class_vars: &'static [(&'static str, &'static str)],
) -> PluginDescriptor {
    PluginDescriptor::new(id, PluginFactory::Probe(probe::<OwsGetCaps>))
        .named(name, "Perform GetCapabilities Operation and check validity")
        .author("GHC Team")
        .extends(&[OWS_GET_CAPS])
        .class_vars(class_vars)
}

fn version_params(service: &str, default_version: &str, versions: &[&str]) -> SchemaOverride {
    SchemaOverride::new()
        .with("service", SpecPatch::new().value(service))
        .with(
            "version",
            SpecPatch::new()
                .default_value(default_version)
                .range(versions.iter().copied()),
        )
}

/// Templated GetCapabilities request; all judging is done by checks
#[derive(Debug, Default)]
pub struct OwsGetCaps;

#[async_trait]
impl Probe for OwsGetCaps {}

//! Plain HTTP probes

use crate::auth::AUTHORIZATION_HEADER;
use crate::builtin;
use crate::params::{CheckAvailability, ConfigResult, ParameterSpec, SchemaOverride};
use crate::plugin::builtin::checks::{
    CONTAINS_STRINGS, HTTP_HAS_CONTENT_TYPE, HTTP_STATUS_NO_ERROR, NOT_CONTAINS_STRINGS,
};
use crate::plugin::builtin::probe;
use crate::plugin::registry::{
    CLASS_VAR_REQUEST_METHOD, CLASS_VAR_REQUEST_TEMPLATE, CLASS_VAR_RESOURCE_TYPE,
};
use crate::plugin::types::{PluginDescriptor, PluginFactory, PluginPackage};
use crate::probe::session::ProbeSession;
use crate::probe::traits::Probe;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;

pub const PACKAGE: &str = "geoprobe.plugins.probe.http";

pub const HTTP_GET: &str = "geoprobe.plugins.probe.http.HttpGet";
pub const HTTP_GET_QUERY: &str = "geoprobe.plugins.probe.http.HttpGetQuery";
pub const HTTP_POST: &str = "geoprobe.plugins.probe.http.HttpPost";

pub const DEFAULT_POST_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

builtin!(PluginPackage {
    root: PACKAGE,
    aliases: &["GeoHealthCheck.plugins.probe.http"],
    plugins,
});

fn plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(HTTP_GET, PluginFactory::Probe(probe::<HttpGet>))
            .named("HTTP GET Resource URL", "Simple HTTP GET on Resource URL")
            .class_vars(&[
                (CLASS_VAR_RESOURCE_TYPE, "*:*"),
                (CLASS_VAR_REQUEST_METHOD, "GET"),
            ])
            .parameters(|| {
                SchemaOverride::new()
                    .with("username", ParameterSpec::string("HTTP-Basic-Authentication username"))
                    .with("password", ParameterSpec::string("HTTP-Basic-Authentication password"))
            })
            .check_usages(|| {
                vec![
                    CheckAvailability::new(HTTP_STATUS_NO_ERROR).by_default(),
                    CheckAvailability::new(CONTAINS_STRINGS),
                    CheckAvailability::new(NOT_CONTAINS_STRINGS),
                    CheckAvailability::new(HTTP_HAS_CONTENT_TYPE),
                ]
            }),
        PluginDescriptor::new(HTTP_GET_QUERY, PluginFactory::Probe(probe::<HttpGet>))
            .named(
                "HTTP GET Resource URL with query",
                "HTTP GET Resource URL with ?query string to be user-supplied (without ?)",
            )
            .extends(&[HTTP_GET])
            .class_vars(&[(CLASS_VAR_REQUEST_TEMPLATE, "?{query}")])
            .parameters(|| {
                SchemaOverride::new().with(
                    "query",
                    ParameterSpec::string("The query string to add to request (without ?)")
                        .required(),
                )
            }),
        PluginDescriptor::new(HTTP_POST, PluginFactory::Probe(probe::<HttpPost>))
            .named(
                "HTTP POST Resource URL with body",
                "HTTP POST to Resource URL with body content(-type) to be user-supplied",
            )
            .extends(&[HTTP_GET])
            .class_vars(&[
                (CLASS_VAR_REQUEST_METHOD, "POST"),
                (CLASS_VAR_REQUEST_TEMPLATE, "{body}"),
            ])
            .parameters(|| {
                SchemaOverride::new()
                    .with("body", ParameterSpec::string("The post body to send").required())
                    .with(
                        "content_type",
                        ParameterSpec::string("The post content type to send")
                            .with_default(DEFAULT_POST_CONTENT_TYPE)
                            .required(),
                    )
            }),
    ]
}

/// Basic credentials given as probe parameters, if both are set
fn basic_credentials(session: &ProbeSession) -> ConfigResult<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    let username = session.params().text("username")?;
    let password = session.params().text("password")?;
    if !username.is_empty() && !password.is_empty() {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        headers.insert(AUTHORIZATION_HEADER.to_string(), format!("Basic {}", token));
    }
    Ok(headers)
}

/// GET on the resource URL, with an optional query template
#[derive(Debug, Default)]
pub struct HttpGet;

#[async_trait]
impl Probe for HttpGet {
    fn request_headers(&self, session: &ProbeSession) -> ConfigResult<BTreeMap<String, String>> {
        basic_credentials(session)
    }
}

#[derive(Debug, Default)]
pub struct HttpPost;

#[async_trait]
impl Probe for HttpPost {
    fn request_headers(&self, session: &ProbeSession) -> ConfigResult<BTreeMap<String, String>> {
        let mut headers = basic_credentials(session)?;
        headers.insert(
            "content-type".to_string(),
            session.params().text("content_type")?,
        );
        Ok(headers)
    }
}

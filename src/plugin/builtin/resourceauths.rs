//! Credential schemes for protected resources

use crate::auth::ResourceAuth;
use crate::builtin;
use crate::params::{ParamType, ParameterSpec, ParameterValues, SchemaOverride};
use crate::plugin::builtin::auth;
use crate::plugin::types::{PluginDescriptor, PluginFactory, PluginPackage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const PACKAGE: &str = "geoprobe.plugins.resourceauth.resourceauths";

pub const NO_AUTH: &str = "geoprobe.plugins.resourceauth.resourceauths.NoAuth";
pub const BASIC_AUTH: &str = "geoprobe.plugins.resourceauth.resourceauths.BasicAuth";
pub const BEARER_TOKEN_AUTH: &str = "geoprobe.plugins.resourceauth.resourceauths.BearerTokenAuth";

builtin!(PluginPackage {
    root: PACKAGE,
    aliases: &["GeoHealthCheck.plugins.resourceauth.resourceauths"],
    plugins,
});

fn plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(NO_AUTH, PluginFactory::ResourceAuth(auth::<NoAuth>))
            .named("None", "Default class for no auth"),
        PluginDescriptor::new(BASIC_AUTH, PluginFactory::ResourceAuth(auth::<BasicAuth>))
            .named("Basic", "Basic authentication")
            .parameters(|| {
                SchemaOverride::new()
                    .with("username", ParameterSpec::string("Username").required())
                    .with(
                        "password",
                        ParameterSpec::new(ParamType::Password, "Password").required(),
                    )
            }),
        PluginDescriptor::new(
            BEARER_TOKEN_AUTH,
            PluginFactory::ResourceAuth(auth::<BearerTokenAuth>),
        )
        .named("Bearer Token", "Bearer token auth")
        .parameters(|| {
            SchemaOverride::new().with(
                "token",
                ParameterSpec::new(ParamType::Password, "Token string").required(),
            )
        }),
    ]
}

/// Never verifies, so never yields a header
#[derive(Debug, Default)]
pub struct NoAuth {
    params: Option<ParameterValues>,
}

impl ResourceAuth for NoAuth {
    fn init(&mut self, params: ParameterValues) {
        self.params = Some(params);
    }

    fn params(&self) -> Option<&ParameterValues> {
        self.params.as_ref()
    }

    fn verify(&self) -> bool {
        false
    }

    fn encode_auth_header_val(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
pub struct BasicAuth {
    params: Option<ParameterValues>,
}

impl ResourceAuth for BasicAuth {
    fn init(&mut self, params: ParameterValues) {
        self.params = Some(params);
    }

    fn params(&self) -> Option<&ParameterValues> {
        self.params.as_ref()
    }

    fn encode_auth_header_val(&self) -> Option<String> {
        let params = self.params.as_ref()?;
        let username = params.text("username").ok()?;
        let password = params.text("password").ok()?;
        let token = STANDARD.encode(format!("{}:{}", username, password));
        Some(format!("Basic {}", token))
    }
}

#[derive(Debug, Default)]
pub struct BearerTokenAuth {
    params: Option<ParameterValues>,
}

impl ResourceAuth for BearerTokenAuth {
    fn init(&mut self, params: ParameterValues) {
        self.params = Some(params);
    }

    fn params(&self) -> Option<&ParameterValues> {
        self.params.as_ref()
    }

    fn encode_auth_header_val(&self) -> Option<String> {
        let token = self.params.as_ref()?.text("token").ok()?;
        Some(format!("Bearer {}", token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamValue, ParameterSchema};
    use std::collections::BTreeMap;

    fn values(plugin: &str, schema: ParameterSchema, data: &[(&str, &str)]) -> ParameterValues {
        let supplied: BTreeMap<String, ParamValue> = data
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::from(*v)))
            .collect();
        ParameterValues::new(plugin, schema, supplied)
    }

    fn basic_schema() -> ParameterSchema {
        ParameterSchema::new()
            .with("username", ParameterSpec::string("Username").required())
            .with(
                "password",
                ParameterSpec::new(ParamType::Password, "Password").required(),
            )
    }

    #[test]
    fn test_basic_header() {
        let mut auth = BasicAuth::default();
        auth.init(values(
            BASIC_AUTH,
            basic_schema(),
            &[("username", "user"), ("password", "pass")],
        ));
        assert!(auth.verify());

        let header = auth.get_auth_header().unwrap();
        assert_eq!(header["Authorization"], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_basic_missing_password_does_not_verify() {
        let mut auth = BasicAuth::default();
        auth.init(values(BASIC_AUTH, basic_schema(), &[("username", "user")]));
        assert!(!auth.verify());
        assert_eq!(auth.get_auth_header(), None);

        let mut headers = BTreeMap::new();
        auth.add_auth_header(&mut headers);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_bearer_header() {
        let schema = ParameterSchema::new().with(
            "token",
            ParameterSpec::new(ParamType::Password, "Token string").required(),
        );
        let mut auth = BearerTokenAuth::default();
        auth.init(values(BEARER_TOKEN_AUTH, schema, &[("token", "abc\n123")]));

        let mut headers = BTreeMap::new();
        auth.add_auth_header(&mut headers);
        assert_eq!(headers["Authorization"], "Bearer abc123");
    }

    #[test]
    fn test_no_auth_never_yields_header() {
        let mut auth = NoAuth::default();
        auth.init(values(NO_AUTH, ParameterSchema::new(), &[]));
        assert!(!auth.verify());
        assert_eq!(auth.get_auth_header(), None);
    }

    #[test]
    fn test_uninitialised_auth_does_not_verify() {
        assert!(!BasicAuth::default().verify());
        assert_eq!(BearerTokenAuth::default().encode_auth_header_val(), None);
    }
}

//! Response checks
//!
//! Generic checks on the response captured by a probe: status code,
//! headers, well-formed XML or JSON, and (non-)presence of strings.

use crate::builtin;
use crate::params::{ParamType, ParameterSpec, SchemaOverride, SpecPatch};
use crate::plugin::builtin::check;
use crate::plugin::types::{PluginDescriptor, PluginFactory, PluginPackage};
use crate::probe::error::CheckError;
use crate::probe::traits::{Check, CheckContext, CheckOutcome};
use crate::probe::transport::ProbeResponse;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

pub const PACKAGE: &str = "geoprobe.plugins.check.checks";

pub const HTTP_STATUS_NO_ERROR: &str = "geoprobe.plugins.check.checks.HttpStatusNoError";
pub const HTTP_HAS_HEADER_VALUE: &str = "geoprobe.plugins.check.checks.HttpHasHeaderValue";
pub const HTTP_HAS_CONTENT_TYPE: &str = "geoprobe.plugins.check.checks.HttpHasContentType";
pub const HTTP_HAS_IMAGE_CONTENT_TYPE: &str =
    "geoprobe.plugins.check.checks.HttpHasImageContentType";
pub const XML_PARSE: &str = "geoprobe.plugins.check.checks.XmlParse";
pub const JSON_PARSE: &str = "geoprobe.plugins.check.checks.JsonParse";
pub const CONTAINS_STRINGS: &str = "geoprobe.plugins.check.checks.ContainsStrings";
pub const NOT_CONTAINS_STRINGS: &str = "geoprobe.plugins.check.checks.NotContainsStrings";
pub const NOT_CONTAINS_OWS_EXCEPTION: &str =
    "geoprobe.plugins.check.checks.NotContainsOwsException";

builtin!(PluginPackage {
    root: PACKAGE,
    aliases: &["GeoHealthCheck.plugins.check.checks"],
    plugins,
});

fn plugins() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(HTTP_STATUS_NO_ERROR, PluginFactory::Check(check::<HttpStatusNoError>))
            .named(
                "HTTP status should not be errored",
                "Response should not contain a HTTP 400 or 500 range Error",
            ),
        PluginDescriptor::new(
            HTTP_HAS_HEADER_VALUE,
            PluginFactory::Check(check::<HttpHasHeaderValue>),
        )
        .named(
            "Has specific HTTP Header value",
            "HTTP response has specific HTTP Header value",
        )
        .parameters(header_params),
        PluginDescriptor::new(
            HTTP_HAS_CONTENT_TYPE,
            PluginFactory::Check(check::<HttpHasHeaderValue>),
        )
        .named(
            "Has specific Content-Type",
            "HTTP response has specific Content-Type",
        )
        .extends(&[HTTP_HAS_HEADER_VALUE])
        .parameters(|| {
            SchemaOverride::new().with(
                "header_name",
                SpecPatch::new().value("content-type"),
            )
        }),
        PluginDescriptor::new(
            HTTP_HAS_IMAGE_CONTENT_TYPE,
            PluginFactory::Check(check::<HttpHasImageContentType>),
        )
        .named(
            "HTTP response is image",
            "HTTP response has image/* Content-Type",
        ),
        PluginDescriptor::new(XML_PARSE, PluginFactory::Check(check::<XmlParse>))
            .named("Valid XML response", "HTTP response contains valid XML"),
        PluginDescriptor::new(JSON_PARSE, PluginFactory::Check(check::<JsonParse>))
            .named("Valid JSON response", "HTTP response contains valid JSON"),
        PluginDescriptor::new(CONTAINS_STRINGS, PluginFactory::Check(check::<ContainsStrings>))
            .named(
                "Response contains strings",
                "HTTP response contains all (XML) strings specified",
            )
            .parameters(strings_params),
        PluginDescriptor::new(
            NOT_CONTAINS_STRINGS,
            PluginFactory::Check(check::<NotContainsStrings>),
        )
        .named(
            "Response does not contain strings",
            "HTTP response does not contain any of the (XML) strings specified",
        )
        .extends(&[CONTAINS_STRINGS]),
        PluginDescriptor::new(
            NOT_CONTAINS_OWS_EXCEPTION,
            PluginFactory::Check(check::<NotContainsStrings>),
        )
        .named(
            "Response NOT contains OWS Exceptions",
            "HTTP response does not contain an OWS Exception",
        )
        .extends(&[NOT_CONTAINS_STRINGS])
        .parameters(|| {
            SchemaOverride::new().with(
                "strings",
                SpecPatch::new()
                    .value(vec!["ExceptionReport>", "ServiceException>"]),
            )
        }),
    ]
}

fn header_params() -> SchemaOverride {
    SchemaOverride::new()
        .with("header_name", ParameterSpec::string("The HTTP header name").required())
        .with("header_value", ParameterSpec::string("The HTTP header value").required())
}

fn strings_params() -> SchemaOverride {
    SchemaOverride::new().with(
        "strings",
        ParameterSpec::new(
            ParamType::StringList,
            "The string text(s) that should be contained in response (comma-separated)",
        )
        .required(),
    )
}

/// Status outside the 4xx and 5xx ranges
#[derive(Debug, Default)]
pub struct HttpStatusNoError;

impl Check for HttpStatusNoError {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        Ok(CheckOutcome::expect(!response.is_error_status(), || {
            format!("HTTP Error status={}", response.status)
        }))
    }
}

/// Named header present with an exact value
///
/// Also serves `HttpHasContentType`, which fixes the header name.
#[derive(Debug, Default)]
pub struct HttpHasHeaderValue;

impl Check for HttpHasHeaderValue {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        let name = context.params.text("header_name")?;
        let expected = context.params.text("header_value")?;

        Ok(match response.header(&name) {
            None => CheckOutcome::fail(format!("HTTP response has no header {}", name)),
            Some(value) if value != expected => CheckOutcome::fail(format!(
                "HTTP response header {} has no value {}",
                name, expected
            )),
            Some(_) => CheckOutcome::ok(),
        })
    }
}

#[derive(Debug, Default)]
pub struct HttpHasImageContentType;

impl Check for HttpHasImageContentType {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        Ok(match response.header("content-type") {
            None => CheckOutcome::fail("HTTP response has no header content-type"),
            Some(value) if !value.contains("image/") => {
                CheckOutcome::fail("HTTP response header content-type is not image type")
            }
            Some(_) => CheckOutcome::ok(),
        })
    }
}

#[derive(Debug, Default)]
pub struct XmlParse;

impl Check for XmlParse {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        Ok(match check_well_formed(&response.body) {
            Ok(()) => CheckOutcome::ok(),
            Err(reason) => CheckOutcome::fail(format!("Invalid XML: {}", reason)),
        })
    }
}

/// Well-formed XML with a single root element
pub fn check_well_formed(body: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(_)) if depth == 0 => roots += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!("{} (at byte {})", e, reader.buffer_position()));
            }
        }
        buf.clear();
    }

    match (roots, depth) {
        (0, _) => Err("no root element".to_string()),
        (_, d) if d > 0 => Err("document ends inside an element".to_string()),
        (1, _) => Ok(()),
        _ => Err("more than one root element".to_string()),
    }
}

#[derive(Debug, Default)]
pub struct JsonParse;

impl Check for JsonParse {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        Ok(
            match serde_json::from_slice::<serde_json::Value>(&response.body) {
                Ok(_) => CheckOutcome::ok(),
                Err(e) => CheckOutcome::fail(format!("Invalid JSON: {}", e)),
            },
        )
    }
}

fn first_missing<'a>(response: &ProbeResponse, strings: &'a [String]) -> Option<&'a str> {
    let text = response.text();
    strings
        .iter()
        .find(|s| !text.contains(s.as_str()))
        .map(String::as_str)
}

#[derive(Debug, Default)]
pub struct ContainsStrings;

impl Check for ContainsStrings {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        let strings = context.params.list("strings")?;
        Ok(match first_missing(response, &strings) {
            Some(missing) => CheckOutcome::fail(format!("{} not in response text", missing)),
            None => CheckOutcome::ok(),
        })
    }
}

/// None of the strings may occur
///
/// Also serves `NotContainsOwsException`, which fixes the strings.
#[derive(Debug, Default)]
pub struct NotContainsStrings;

impl Check for NotContainsStrings {
    fn perform(&self, context: &CheckContext<'_>) -> Result<CheckOutcome, CheckError> {
        let response = context.response()?;
        let strings = context.params.list("strings")?;
        let text = response.text();
        Ok(match strings.iter().find(|s| text.contains(s.as_str())) {
            Some(found) => CheckOutcome::fail(format!("{} in response text", found)),
            None => CheckOutcome::ok(),
        })
    }
}

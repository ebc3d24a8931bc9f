//! Request templates
//!
//! Templates hold `{name}` placeholders filled from resolved parameters. A
//! template that starts with `?` is a query string; when the target URL
//! already has a query the leading `?` becomes `&`.

use crate::params::ParamValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap_or_else(|e| panic!("placeholder regex: {}", e))
});

/// Placeholder names in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute parameters into `template`
///
/// Fails with the name of the first placeholder that has no value.
pub fn render(template: &str, params: &BTreeMap<String, ParamValue>) -> Result<String, String> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !params.contains_key(name))
    {
        return Err(format!("no value for placeholder '{{{}}}'", missing));
    }

    Ok(PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            params
                .get(&caps[1])
                .map(ParamValue::render)
                .unwrap_or_default()
        })
        .into_owned())
}

/// Adjust a query-string template to the URL it is appended to
pub fn adjust_query_prefix<'a>(template: &'a str, url: &str) -> std::borrow::Cow<'a, str> {
    match template.strip_prefix('?') {
        Some(rest) if url.contains('?') => std::borrow::Cow::Owned(format!("&{}", rest)),
        _ => std::borrow::Cow::Borrowed(template),
    }
}

/// Render a query template and append it to `url`
pub fn render_query(
    url: &str,
    template: &str,
    params: &BTreeMap<String, ParamValue>,
) -> Result<String, String> {
    let query = render(&adjust_query_prefix(template, url), params)?;
    Ok(format!("{}{}", url, query))
}

//! Build metadata generated by the build script

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Plugin API version from `package.metadata.plugin_api_version`
pub fn get_api_version() -> u32 {
    PLUGIN_API_VERSION.parse().unwrap_or(20250727)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Crate version from the manifest
pub fn crate_version() -> &'static str {
    CRATE_VERSION
}

/// One-line version banner for `geoprobe version`
pub fn version_banner() -> String {
    format!(
        "geoprobe {} (plugin api {}, built {}, git {})",
        crate_version(),
        get_api_version(),
        build_time(),
        git_hash()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_is_date_like() {
        assert!(get_api_version() >= 20250101);
    }

    #[test]
    fn test_banner_mentions_version() {
        let banner = version_banner();
        assert!(banner.starts_with("geoprobe "));
        assert!(banner.contains(crate_version()));
    }
}

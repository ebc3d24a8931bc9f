//! Plugin Discovery
//!
//! Plugin sources are package roots such as `geoprobe.plugins` (installed
//! plugins) plus user-contributed roots. A source enables every linked
//! package whose root equals it or lies below it. A source that matches
//! nothing is logged and skipped; it never aborts discovery of the others.

use crate::plugin::builtin::api::all_packages;
use crate::plugin::types::PluginPackage;

pub const DEFAULT_PLUGIN_ROOT: &str = "geoprobe.plugins";

/// Configuration for plugin discovery
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Installed plugin package roots
    pub plugins: Vec<String>,
    /// User-contributed plugin package roots
    pub user_plugins: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            plugins: vec![DEFAULT_PLUGIN_ROOT.to_string()],
            user_plugins: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn with_sources(plugins: &[&str], user_plugins: &[&str]) -> Self {
        Self {
            plugins: plugins.iter().map(|s| s.to_string()).collect(),
            user_plugins: user_plugins.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.plugins
            .iter()
            .chain(self.user_plugins.iter())
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// True when `root` is `source` or a package below it
pub(crate) fn source_matches(source: &str, root: &str) -> bool {
    let source = source.trim().trim_end_matches('.');
    root == source
        || root
            .strip_prefix(source)
            .map(|rest| rest.starts_with('.'))
            .unwrap_or(false)
}

/// Packages enabled by `config`, each at most once, in source order
pub fn discover_packages(config: &DiscoveryConfig) -> Vec<&'static PluginPackage> {
    discover_from(config, all_packages())
}

pub(crate) fn discover_from(
    config: &DiscoveryConfig,
    available: impl Iterator<Item = &'static PluginPackage>,
) -> Vec<&'static PluginPackage> {
    let available: Vec<&'static PluginPackage> = available.collect();
    let mut enabled: Vec<&'static PluginPackage> = Vec::new();

    for source in config.sources() {
        let matched: Vec<_> = available
            .iter()
            .copied()
            .filter(|pkg| source_matches(source, pkg.root))
            .collect();

        if matched.is_empty() {
            log::warn!("Plugin source '{}' not found, skipping", source);
            continue;
        }

        log::debug!("Plugin source '{}' provides {} package(s)", source, matched.len());
        for pkg in matched {
            if !enabled.iter().any(|e| std::ptr::eq(*e, pkg)) {
                enabled.push(pkg);
            }
        }
    }

    enabled
}

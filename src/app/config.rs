//! Engine configuration
//!
//! Loaded from TOML (`geoprobe.toml` in the user config directory unless a
//! path is given), then overridden by the `GHC_*` and `SECRET_KEY`
//! environment variables used by existing deployments.

use crate::app::error::{AppError, AppResult};
use crate::params::ParamValue;
use crate::plugin::api::{DiscoveryConfig, DEFAULT_PLUGIN_ROOT};
use crate::probe::runner::DEFAULT_TIMEOUT_SECS;
use crate::probe::{RunnerOptions, TargetConfig, TransportOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_NAME: &str = "geoprobe";
pub const CONFIG_FILE_NAME: &str = "geoprobe.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Installed plugin package roots
    pub plugins: Vec<String>,
    /// Extra package roots contributed by the operator
    pub user_plugins: Vec<String>,
    pub request_timeout_secs: u64,
    pub verify_ssl: bool,
    /// Treat parameter ranges as hard limits
    pub strict_ranges: bool,
    pub user_agent: Option<String>,
    /// Key for encrypted auth descriptors
    pub secret_key: Option<String>,
    /// Geocoder plugin used to place targets, if any
    pub geocoder: Option<String>,
    pub geocoder_vars: BTreeMap<String, ParamValue>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plugins: vec![DEFAULT_PLUGIN_ROOT.to_string()],
            user_plugins: Vec::new(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_ssl: true,
            strict_ranges: false,
            user_agent: None,
            secret_key: None,
            geocoder: None,
            geocoder_vars: BTreeMap::new(),
            log_level: None,
            log_format: None,
            log_file: None,
        }
    }
}

impl EngineConfig {
    /// `<config dir>/geoprobe/geoprobe.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration and apply environment overrides
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise.
    pub async fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(AppError::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Self::from_file(path).await?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path).await?,
                _ => {
                    log::debug!("No configuration file, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> AppResult<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let contents = read_file(path).await?;
        toml::from_str(&contents).map_err(|e| AppError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn apply_env(&mut self) -> AppResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(value) = lookup("GHC_PLUGINS") {
            self.plugins = split_list(&value);
        }
        if let Some(value) = lookup("GHC_USER_PLUGINS") {
            self.user_plugins = split_list(&value);
        }
        if let Some(value) = lookup("GHC_PROBE_HTTP_TIMEOUT_SECS") {
            self.request_timeout_secs =
                value.trim().parse().map_err(|_| AppError::Environment {
                    variable: "GHC_PROBE_HTTP_TIMEOUT_SECS".to_string(),
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("GHC_VERIFY_SSL") {
            self.verify_ssl = parse_bool(&value).ok_or_else(|| AppError::Environment {
                variable: "GHC_VERIFY_SSL".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("SECRET_KEY").filter(|v| !v.is_empty()) {
            self.secret_key = Some(value);
        }
        if let Some(value) = lookup("GHC_LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = Some(value.to_ascii_lowercase());
        }
        Ok(())
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            plugins: self.plugins.clone(),
            user_plugins: self.user_plugins.clone(),
        }
    }

    /// Options for the probe lifecycle
    pub fn engine_options(&self) -> RunnerOptions {
        RunnerOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            secret_key: self.secret_key.clone(),
            strict_ranges: self.strict_ranges,
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        let mut options = TransportOptions {
            verify_ssl: self.verify_ssl,
            ..TransportOptions::default()
        };
        if let Some(agent) = &self.user_agent {
            options.user_agent = agent.clone();
        }
        options
    }
}

/// A `targets.toml` file: one `[[target]]` table per probe execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetsFile {
    #[serde(default, rename = "target", alias = "targets")]
    pub targets: Vec<TargetConfig>,
}

impl TargetsFile {
    pub async fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = read_file(path).await?;
        toml::from_str(&contents).map_err(|e| AppError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

async fn read_file(path: &Path) -> AppResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_from_file_fills_defaults() {
        let file = write_config(
            r#"
            user_plugins = ["acme.plugins"]
            request_timeout_secs = 5
            secret_key = "s3cret"
            "#,
        );
        let config = EngineConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.plugins, vec![DEFAULT_PLUGIN_ROOT]);
        assert_eq!(config.user_plugins, vec!["acme.plugins"]);
        assert!(config.verify_ssl);

        let options = config.engine_options();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.secret_key.as_deref(), Some("s3cret"));
        assert!(!options.strict_ranges);
    }

    #[tokio::test]
    async fn test_strict_ranges_reach_runner_options() {
        let file = write_config("strict_ranges = true\n");
        let config = EngineConfig::from_file(file.path()).await.unwrap();
        assert!(config.engine_options().strict_ranges);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = EngineConfig::load(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, AppError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_a_parse_error() {
        let file = write_config("plugins = [");
        let err = EngineConfig::from_file(file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: BTreeMap<&str, &str> = [
            ("GHC_PLUGINS", "geoprobe.plugins.probe, geoprobe.plugins.check"),
            ("GHC_VERIFY_SSL", "False"),
            ("GHC_PROBE_HTTP_TIMEOUT_SECS", "12"),
            ("SECRET_KEY", "k"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(
            config.plugins,
            vec!["geoprobe.plugins.probe", "geoprobe.plugins.check"]
        );
        assert!(!config.verify_ssl);
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.secret_key.as_deref(), Some("k"));
        assert!(!config.transport_options().verify_ssl);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|name| (name == "GHC_PROBE_HTTP_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GHC_PROBE_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    #[serial]
    fn test_apply_env_reads_process_environment() {
        std::env::set_var("GHC_USER_PLUGINS", "acme.plugins,other.plugins");
        let mut config = EngineConfig::default();
        let outcome = config.apply_env();
        std::env::remove_var("GHC_USER_PLUGINS");

        outcome.unwrap();
        assert_eq!(config.user_plugins, vec!["acme.plugins", "other.plugins"]);
    }

    #[tokio::test]
    async fn test_targets_file() {
        let file = write_config(
            r#"
            [[target]]
            url = "https://demo.example.org/wms"
            probe = "geoprobe.plugins.probe.owsgetcaps.WmsGetCaps"

            [[target]]
            name = "api"
            url = "https://api.example.org/health"
            probe = "geoprobe.plugins.probe.http.HttpGet"
            "#,
        );
        let targets = TargetsFile::load(file.path()).await.unwrap();
        assert_eq!(targets.targets.len(), 2);
        assert_eq!(targets.targets[1].label(), "api");
    }
}

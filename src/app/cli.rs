//! Command line arguments

use crate::plugin::api::Capability;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "geoprobe")]
#[command(about = "Probe and check engine for geospatial web services")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(long = "config-file", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Force colored output
    #[arg(long = "color", global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", conflicts_with = "color", global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        global = true,
        value_parser = ["trace", "debug", "info", "warn", "error", "off"]
    )]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        global = true,
        value_parser = ["text", "ext", "json"]
    )]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the probes described in a targets file
    Run {
        /// TOML file with one [[target]] table per probe
        #[arg(long = "targets", short = 't', value_name = "FILE")]
        targets: PathBuf,

        /// Pretty-print the JSON results
        #[arg(long = "pretty")]
        pretty: bool,

        /// Reject parameter values outside their declared range
        #[arg(long = "strict")]
        strict: bool,
    },

    /// List registered plugins
    Plugins {
        /// probe, check, auth or geocoder
        #[arg(long = "capability", short = 'c', default_value = "probe")]
        capability: Capability,

        /// Class variable filter, e.g. RESOURCE_TYPE=OGC:WMS
        #[arg(long = "filter", short = 'f', value_name = "KEY=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },

    /// Show the effective parameter schema of a plugin
    Schema {
        plugin_id: String,
    },

    /// Encrypt or decrypt a stored auth descriptor
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Show version and build details
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum AuthAction {
    /// Encrypt a JSON auth descriptor such as {"type":"Basic","data":{...}}
    Encode { descriptor: String },
    /// Decrypt an encoded descriptor back to JSON
    Decode { encoded: String },
}

impl Args {
    /// Log file from the command line; `none` and `-` disable it
    pub fn log_file(&self) -> Option<Option<&str>> {
        self.log_file.as_deref().map(|f| {
            if f.eq_ignore_ascii_case("none") || f == "-" {
                None
            } else {
                Some(f)
            }
        })
    }
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command() {
        let args = Args::try_parse_from([
            "geoprobe",
            "--log-level",
            "debug",
            "run",
            "--targets",
            "targets.toml",
            "--pretty",
            "--strict",
        ])
        .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(
            args.command,
            Command::Run {
                targets: PathBuf::from("targets.toml"),
                pretty: true,
                strict: true,
            }
        );
    }

    #[test]
    fn test_plugins_filters() {
        let args = Args::try_parse_from([
            "geoprobe",
            "plugins",
            "--capability",
            "check",
            "--filter",
            "RESOURCE_TYPE=OGC:WMS",
        ])
        .unwrap();
        match args.command {
            Command::Plugins {
                capability,
                filters,
            } => {
                assert_eq!(capability, Capability::Check);
                assert_eq!(
                    filters,
                    vec![("RESOURCE_TYPE".to_string(), "OGC:WMS".to_string())]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_bad_filter_rejected() {
        assert!(Args::try_parse_from(["geoprobe", "plugins", "--filter", "nokey"]).is_err());
    }

    #[test]
    fn test_log_file_none_disables() {
        let args =
            Args::try_parse_from(["geoprobe", "--log-file", "none", "version"]).unwrap();
        assert_eq!(args.log_file(), Some(None));
    }
}

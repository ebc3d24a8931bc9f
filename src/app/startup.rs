//! Binary entry point
//!
//! Parses arguments, loads configuration, installs logging and dispatches
//! the subcommand. Returns the process exit code.

use crate::app::cli::{Args, AuthAction, Command};
use crate::app::config::{EngineConfig, TargetsFile};
use crate::app::error::{AppError, AppResult};
use crate::auth::{AuthCipher, AuthDescriptor, AuthError};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::version::version_banner;
use crate::geocode::{self, GeocodeContext, Geocoder, Location};
use crate::params::merge;
use crate::plugin::api::{rebuild_shared_registry, shared_registry, Capability};
use crate::probe::{CancelSignal, HttpTransport, ProbeRunner, TargetConfig, Transport};
use crate::result::ResultReport;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

/// Outcome of one target in `geoprobe run`
#[derive(Debug, Serialize)]
struct TargetOutput {
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ResultReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn startup() -> i32 {
    let args = Args::parse();
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run(args)),
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {}", e);
            1
        }
    }
}

async fn run(args: Args) -> i32 {
    let config = match EngineConfig::load(args.config_file.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let use_color = (args.color || std::io::stdout().is_terminal()) && !args.no_color;
    colored::control::set_override(use_color);

    let log_file = match args.log_file() {
        Some(from_cli) => from_cli,
        None => config.log_file.as_deref(),
    };
    if let Err(e) = init_logging(
        args.log_level.as_deref().or(config.log_level.as_deref()),
        args.log_format.as_deref().or(config.log_format.as_deref()),
        log_file,
        use_color,
    ) {
        eprintln!("Error: cannot start logging: {}", e);
    }
    rebuild_shared_registry(&config.discovery_config());

    match dispatch(&args.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            log_error_with_context(&e, operation(&args.command));
            1
        }
    }
}

fn operation(command: &Command) -> &'static str {
    match command {
        Command::Run { .. } => "Running probes",
        Command::Plugins { .. } => "Listing plugins",
        Command::Schema { .. } => "Showing plugin schema",
        Command::Auth { .. } => "Processing auth descriptor",
        Command::Version => "Showing version",
    }
}

async fn dispatch(command: &Command, config: &EngineConfig) -> AppResult<i32> {
    match command {
        Command::Run {
            targets,
            pretty,
            strict,
        } => run_targets(config, targets, *pretty, *strict).await,
        Command::Plugins {
            capability,
            filters,
        } => {
            list_plugins(*capability, filters);
            Ok(0)
        }
        Command::Schema { plugin_id } => show_schema(plugin_id).map(|_| 0),
        Command::Auth { action } => auth_action(config, action).map(|_| 0),
        Command::Version => {
            println!("{}", version_banner());
            Ok(0)
        }
    }
}

async fn run_targets(
    config: &EngineConfig,
    path: &Path,
    pretty: bool,
    strict: bool,
) -> AppResult<i32> {
    let targets = TargetsFile::load(path).await?.targets;
    if targets.is_empty() {
        log::warn!("No targets in {}", path.display());
        return Ok(0);
    }

    let registry = shared_registry();
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.transport_options())?);
    let mut options = config.engine_options();
    options.strict_ranges |= strict;
    let runner = ProbeRunner::new(Arc::clone(&registry), Arc::clone(&transport), options);
    let geocoder = match &config.geocoder {
        Some(id) => Some(geocode::create(&registry, id, config.geocoder_vars.clone())?),
        None => None,
    };
    let context = GeocodeContext {
        transport,
        timeout: runner.options().timeout,
    };

    let cancel = CancelSignal::new();
    cancel.cancel_on_ctrl_c();

    log::info!("Running {} target(s) from {}", targets.len(), path.display());
    let outputs = futures::future::join_all(targets.iter().map(|target| {
        run_target(&runner, target, &cancel, geocoder.as_deref(), &context)
    }))
    .await;

    let mut exit_code = 0;
    for output in &outputs {
        if output.error.is_some() {
            exit_code = 1;
        }
        let line = if pretty {
            serde_json::to_string_pretty(output)
        } else {
            serde_json::to_string(output)
        }
        .map_err(|e| AppError::Output(e.to_string()))?;
        println!("{}", line);
    }
    Ok(exit_code)
}

async fn run_target(
    runner: &ProbeRunner,
    target: &TargetConfig,
    cancel: &CancelSignal,
    geocoder: Option<&dyn Geocoder>,
    context: &GeocodeContext,
) -> TargetOutput {
    let location = match (geocoder, geocode::hostname_of(&target.url)) {
        (Some(geocoder), Some(host)) => Some(geocoder.locate(&host, context).await),
        _ => None,
    };

    match runner.run_with_cancel(target, cancel).await {
        Ok(result) => TargetOutput {
            target: target.label().to_string(),
            location,
            result: Some(result.report()),
            error: None,
        },
        Err(e) => {
            log_error_with_context(&e, &format!("Starting probe for {}", target.label()));
            TargetOutput {
                target: target.label().to_string(),
                location,
                result: None,
                error: Some(e.to_string()),
            }
        }
    }
}

fn list_plugins(capability: Capability, filters: &[(String, String)]) {
    let registry = shared_registry();
    let filters: Vec<(&str, &str)> = filters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    for id in registry.list_plugins(capability, &filters) {
        match registry.plugin_info(&id) {
            Ok(info) if !info.name.is_empty() => println!("{}  {}", id.bold(), info.name.dimmed()),
            _ => println!("{}", id.bold()),
        }
    }
}

fn show_schema(plugin_id: &str) -> AppResult<()> {
    let registry = shared_registry();
    let info = registry.plugin_info(plugin_id)?;
    let schema = registry.effective_schema(plugin_id)?;

    let mut checks = Vec::new();
    for usage in registry.check_usages(plugin_id)? {
        let check_schema = merge(&registry.effective_schema(&usage.check)?, &usage.set_params);
        checks.push(serde_json::json!({
            "check": usage.check,
            "default": usage.default,
            "parameters": check_schema,
        }));
    }

    let document = serde_json::json!({
        "id": info.id,
        "name": info.name,
        "description": info.description,
        "capability": info.capability,
        "classVars": info.class_vars,
        "parameters": schema,
        "checks": checks,
    });
    let text = serde_json::to_string_pretty(&document).map_err(|e| AppError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn auth_action(config: &EngineConfig, action: &AuthAction) -> AppResult<()> {
    let secret = config.secret_key.as_deref().ok_or(AppError::MissingSecret)?;
    let cipher = AuthCipher::new(secret);
    match action {
        AuthAction::Encode { descriptor } => {
            let descriptor: AuthDescriptor = serde_json::from_str(descriptor)
                .map_err(|e| AuthError::InvalidPayload(e.to_string()))?;
            println!("{}", descriptor.encode(&cipher)?);
        }
        AuthAction::Decode { encoded } => {
            let descriptor = AuthDescriptor::decode(&cipher, encoded)?;
            let text = serde_json::to_string(&descriptor).map_err(|e| AppError::Output(e.to_string()))?;
            println!("{}", text);
        }
    }
    Ok(())
}

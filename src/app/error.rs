//! Front end errors
//!
//! Everything that can stop the binary before or around probe execution.
//! Failures inside a probe run never show up here; they live in the result
//! tree.

use crate::auth::AuthError;
use crate::core::error_handling::ContextualError;
use crate::params::ConfigurationError;
use crate::plugin::api::PluginError;
use crate::probe::TransportError;
use std::path::PathBuf;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Invalid TOML in {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value '{value}' for {variable}")]
    Environment { variable: String, value: String },

    #[error("No secret key configured")]
    MissingSecret,

    #[error("Cannot write output: {0}")]
    Output(String),

    #[error("Cannot start async runtime: {0}")]
    Runtime(String),

    #[error(transparent)]
    Config(#[from] ConfigurationError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ContextualError for AppError {
    fn is_user_actionable(&self) -> bool {
        match self {
            AppError::Output(_) | AppError::Runtime(_) | AppError::Transport(_) => false,
            AppError::Config(e) => e.is_user_actionable(),
            AppError::Plugin(e) => e.is_user_actionable(),
            _ => true,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AppError::FileNotFound { .. } => Some("the given file does not exist"),
            AppError::Read { .. } => Some("the given file cannot be read"),
            AppError::Parse { .. } => Some("the given file is not valid TOML for this command"),
            AppError::Environment { .. } => Some("an environment override has an invalid value"),
            AppError::MissingSecret => Some("set secret_key in the configuration or SECRET_KEY"),
            AppError::Auth(AuthError::UnknownScheme { .. }) => {
                Some("unknown auth type; see 'geoprobe plugins --capability auth'")
            }
            AppError::Auth(_) => Some("credentials do not match the configured secret key"),
            AppError::Config(e) => e.user_message(),
            AppError::Plugin(e) => e.user_message(),
            AppError::Output(_) | AppError::Runtime(_) | AppError::Transport(_) => None,
        }
    }
}

//! Configuration errors
//!
//! These are the only errors that cross the engine boundary: they mean a
//! probe could not even start, so no result tree exists for them.

use crate::core::error_handling::ContextualError;
use crate::plugin::error::PluginError;
use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Required parameter with no supplied, fixed or default value
    #[error("Required parameter '{parameter}' missing for plugin '{plugin}'")]
    RequiredParameterMissing { parameter: String, plugin: String },

    /// Supplied value cannot be read as the declared parameter type
    #[error("Invalid value for parameter '{parameter}' of plugin '{plugin}': {reason}")]
    InvalidParameterValue {
        parameter: String,
        plugin: String,
        reason: String,
    },

    /// Parameter name not declared in the plugin schema
    #[error("Unknown parameter '{parameter}' for plugin '{plugin}'")]
    UnknownParameter { parameter: String, plugin: String },

    /// Plugin identifier could not be resolved or constructed
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Stored credentials could not be decrypted
    #[error("Cannot decode stored credentials: {reason}")]
    CredentialDecode { reason: String },
}

impl ContextualError for ConfigurationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigurationError::RequiredParameterMissing { .. } => {
                Some("a required plugin parameter has no value")
            }
            ConfigurationError::InvalidParameterValue { .. } => {
                Some("a plugin parameter has a value of the wrong type")
            }
            ConfigurationError::UnknownParameter { .. } => {
                Some("a plugin parameter is not declared by the plugin")
            }
            ConfigurationError::Plugin(err) => err.user_message(),
            ConfigurationError::CredentialDecode { .. } => {
                Some("stored credentials do not match the configured secret key")
            }
        }
    }
}

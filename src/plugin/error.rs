//! Plugin Error Handling
//!
//! Error types for resolving, listing and constructing plugins.

use crate::core::error_handling::ContextualError;
use crate::plugin::types::Capability;
use std::fmt;

/// Result type alias for plugin operations
pub type PluginResult<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Clone, PartialEq)]
pub enum PluginError {
    /// Neither resolution strategy found the identifier
    PluginNotFound { plugin_id: String },

    /// The plugin factory failed or the type is abstract
    PluginConstruction { plugin_id: String, cause: String },

    /// The plugin exists but implements a different capability
    CapabilityMismatch {
        plugin_id: String,
        expected: Capability,
        actual: Capability,
    },

    /// Two packages register the same identifier
    DuplicatePlugin { plugin_id: String },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::PluginNotFound { plugin_id } => {
                write!(f, "Plugin not found: {}", plugin_id)
            }
            PluginError::PluginConstruction { plugin_id, cause } => {
                write!(f, "Cannot construct plugin '{}': {}", plugin_id, cause)
            }
            PluginError::CapabilityMismatch {
                plugin_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Plugin '{}' is a {} plugin, expected {}",
                    plugin_id, actual, expected
                )
            }
            PluginError::DuplicatePlugin { plugin_id } => {
                write!(f, "Plugin '{}' is already registered", plugin_id)
            }
        }
    }
}

impl std::error::Error for PluginError {}

impl ContextualError for PluginError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, PluginError::PluginConstruction { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            PluginError::PluginNotFound { .. } => {
                Some("unknown plugin identifier; run 'geoprobe plugins' to list them")
            }
            PluginError::CapabilityMismatch { .. } => {
                Some("plugin identifier refers to the wrong kind of plugin")
            }
            PluginError::DuplicatePlugin { .. } => {
                Some("two plugin packages register the same identifier")
            }
            PluginError::PluginConstruction { .. } => None,
        }
    }
}

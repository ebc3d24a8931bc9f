//! Public API for the plugin system
//!
//! External modules should import from here rather than directly from
//! internal modules.

use once_cell::sync::OnceCell;
use std::sync::{Arc, RwLock};

pub use crate::plugin::discovery::{DiscoveryConfig, DEFAULT_PLUGIN_ROOT};
pub use crate::plugin::error::{PluginError, PluginResult};
pub use crate::plugin::registry::{
    Registry, CLASS_VAR_NAME, CLASS_VAR_REQUEST_METHOD, CLASS_VAR_REQUEST_TEMPLATE,
    CLASS_VAR_RESOURCE_TYPE,
};
pub use crate::plugin::types::{
    Capability, PluginDescriptor, PluginFactory, PluginInfo, PluginPackage,
};

static SHARED: OnceCell<RwLock<Arc<Registry>>> = OnceCell::new();

/// Process-wide registry, discovered with defaults on first use
pub fn shared_registry() -> Arc<Registry> {
    let cell = SHARED.get_or_init(|| RwLock::new(Arc::new(Registry::discover(&DiscoveryConfig::default()))));
    match cell.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

/// Replace the process-wide registry with a fresh discovery
///
/// Running probes keep the registry they started with.
pub fn rebuild_shared_registry(config: &DiscoveryConfig) -> Arc<Registry> {
    let fresh = Arc::new(Registry::discover(config));
    let cell = SHARED.get_or_init(|| RwLock::new(Arc::clone(&fresh)));
    match cell.write() {
        Ok(mut guard) => *guard = Arc::clone(&fresh),
        Err(poisoned) => *poisoned.into_inner() = Arc::clone(&fresh),
    }
    fresh
}

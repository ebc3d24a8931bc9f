//! API for plugin package registration
//!
//! Packages use the `builtin!` macro to submit themselves for discovery.
//! Crates that link against geoprobe can use the same macro to contribute
//! user plugin packages.

use crate::plugin::types::PluginPackage;

inventory::collect!(PluginPackage);

/// Macro for registering a plugin package
#[macro_export]
macro_rules! builtin {
    ($package:expr) => {
        inventory::submit!($package);
    };
}

/// Every package linked into this binary, whether enabled or not
pub fn all_packages() -> impl Iterator<Item = &'static PluginPackage> {
    inventory::iter::<PluginPackage>.into_iter()
}

//! Test suites for the plugin system
//!
//! Registry behaviour against the builtin packages, and the builtin checks
//! and credential schemes driven through the registry.

mod registry;
mod utils;

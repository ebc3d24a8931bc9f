//! Plugin System Module
//!
//! Resolves plugin identifiers to constructible plugin types. Packages of
//! plugins register themselves statically; discovery enables the packages
//! named by configuration, and the resulting [`api::Registry`] builds fresh
//! instances on demand.

pub(crate) mod builtin;
pub(crate) mod discovery;
pub(crate) mod error;
pub(crate) mod registry;
pub(crate) mod types;

// Public API module - the only public interface for the plugin system
pub mod api;

#[cfg(test)]
mod tests;

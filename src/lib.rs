//! geoprobe: pluggable probe and check engine for geospatial web services
//!
//! A Probe sends a request to a target, Checks judge the captured response,
//! and every step lands in a result tree. Plugins are discovered from
//! statically registered packages and configured through parameter
//! schemas.

pub mod app;
pub mod auth;
pub mod core;
pub mod geocode;
pub mod params;
pub mod plugin;
pub mod probe;
pub mod result;

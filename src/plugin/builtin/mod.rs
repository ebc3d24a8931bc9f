//! Built-in Plugin Packages
//!
//! Each submodule is one package, submitted with `builtin!` and enabled
//! when a configured plugin source covers its root. Packages also answer
//! to their legacy `GeoHealthCheck.plugins.*` names.

pub mod api;
pub mod checks;
pub mod geocoders;
pub mod http;
pub mod owsgetcaps;
pub mod resourceauths;
pub mod wmsdrilldown;

use crate::auth::ResourceAuth;
use crate::geocode::Geocoder;
use crate::probe::traits::{Check, Probe};

pub(crate) fn probe<T: Probe + Default + 'static>() -> Result<Box<dyn Probe>, String> {
    Ok(Box::new(T::default()))
}

pub(crate) fn check<T: Check + Default + 'static>() -> Result<Box<dyn Check>, String> {
    Ok(Box::new(T::default()))
}

pub(crate) fn auth<T: ResourceAuth + Default + 'static>() -> Result<Box<dyn ResourceAuth>, String> {
    Ok(Box::new(T::default()))
}

pub(crate) fn geocoder<T: Geocoder + Default + 'static>() -> Result<Box<dyn Geocoder>, String> {
    Ok(Box::new(T::default()))
}

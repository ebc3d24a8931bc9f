//! Declarative plugin parameters
//!
//! Schemas describe what a plugin accepts, overrides refine them down a
//! plugin's supertype chain, and [`ParameterValues`] resolves them lazily
//! for one plugin instance.

pub mod error;
pub mod metadata;
pub mod schema;
pub mod values;

pub use error::{ConfigResult, ConfigurationError};
pub use metadata::{CheckAvailability, MetadataRegistry};
pub use schema::{
    merge, ParamType, ParamValue, ParameterSchema, ParameterSpec, SchemaOverride, SpecPatch,
};
pub use values::ParameterValues;

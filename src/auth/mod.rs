//! Resource Authentication
//!
//! Credential schemes are plugins of the ResourceAuth capability, selected
//! by their `NAME` class variable. Descriptors are stored encrypted with
//! [`AuthCipher`].

pub mod cipher;
pub mod descriptor;
pub mod error;
pub mod traits;

pub use cipher::AuthCipher;
pub use descriptor::AuthDescriptor;
pub use error::{AuthError, AuthResult};
pub use traits::{ResourceAuth, AUTHORIZATION_HEADER};

use crate::params::ParameterValues;
use crate::plugin::api::{Capability, Registry, CLASS_VAR_NAME};

/// Build and initialise the scheme named by `descriptor`
pub fn create(registry: &Registry, descriptor: &AuthDescriptor) -> AuthResult<Box<dyn ResourceAuth>> {
    let plugin_id = registry
        .list_plugins(Capability::ResourceAuth, &[(CLASS_VAR_NAME, descriptor.scheme.as_str())])
        .into_iter()
        .next()
        .ok_or_else(|| AuthError::UnknownScheme {
            scheme: descriptor.scheme.clone(),
            known: scheme_names(registry).join(", "),
        })?;

    let mut auth = registry.create_auth(&plugin_id)?;
    let schema = registry.effective_schema(&plugin_id)?;
    auth.init(ParameterValues::new(&plugin_id, schema, descriptor.parameters()));
    Ok(auth)
}

/// Names of all registered schemes
pub fn scheme_names(registry: &Registry) -> Vec<String> {
    registry
        .list_plugins(Capability::ResourceAuth, &[])
        .iter()
        .filter_map(|id| registry.class_vars(id).ok())
        .filter_map(|vars| vars.get(CLASS_VAR_NAME).cloned())
        .collect()
}

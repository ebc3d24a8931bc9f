//! Resource authentication errors

use crate::plugin::api::PluginError;
use thiserror::Error;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("No auth scheme named '{scheme}' (known: {known})")]
    UnknownScheme { scheme: String, known: String },

    #[error("Cannot encode credentials: {0}")]
    Encode(String),

    /// Wrong secret, corrupted or truncated ciphertext
    #[error("Cannot decode credentials: {0}")]
    Decode(String),

    /// Decrypted payload is not an auth descriptor
    #[error("Decoded credentials are not a valid auth descriptor: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

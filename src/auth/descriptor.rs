//! Auth descriptors as kept by the resource store

use crate::auth::cipher::AuthCipher;
use crate::auth::error::{AuthError, AuthResult};
use crate::params::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scheme name plus the scheme-specific data fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDescriptor {
    #[serde(rename = "type")]
    pub scheme: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl AuthDescriptor {
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.data.insert(field.to_string(), value.to_string());
        self
    }

    pub fn basic(username: &str, password: &str) -> Self {
        Self::new("Basic")
            .with("username", username)
            .with("password", password)
    }

    pub fn bearer(token: &str) -> Self {
        Self::new("Bearer Token").with("token", token)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }

    /// Data fields as plugin parameter values
    pub fn parameters(&self) -> BTreeMap<String, ParamValue> {
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), ParamValue::Text(v.clone())))
            .collect()
    }

    /// Encrypt for storage
    pub fn encode(&self, cipher: &AuthCipher) -> AuthResult<String> {
        let json = serde_json::to_vec(self).map_err(|e| AuthError::Encode(e.to_string()))?;
        cipher.encrypt(&json)
    }

    /// Decrypt a stored descriptor
    pub fn decode(cipher: &AuthCipher, encoded: &str) -> AuthResult<Self> {
        let json = cipher.decrypt(encoded)?;
        serde_json::from_slice(&json).map_err(|e| AuthError::InvalidPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_with_same_secret() {
        let cipher = AuthCipher::new("server-secret");
        let descriptor = AuthDescriptor::basic("ows", "p@ss:word");
        let stored = descriptor.encode(&cipher).unwrap();
        assert!(!stored.contains("p@ss"));
        assert_eq!(AuthDescriptor::decode(&cipher, &stored).unwrap(), descriptor);
    }

    #[test]
    fn test_decode_with_wrong_secret_fails() {
        let stored = AuthDescriptor::bearer("tok")
            .encode(&AuthCipher::new("server-secret"))
            .unwrap();
        let err = AuthDescriptor::decode(&AuthCipher::new("guess"), &stored).unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_non_descriptor_payload() {
        let cipher = AuthCipher::new("server-secret");
        let stored = cipher.encrypt(b"[1, 2, 3]").unwrap();
        let err = AuthDescriptor::decode(&cipher, &stored).unwrap_err();
        assert!(matches!(err, AuthError::InvalidPayload(_)));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(AuthDescriptor::bearer("tok")).unwrap();
        assert_eq!(json["type"], "Bearer Token");
        assert_eq!(json["data"]["token"], "tok");
    }
}

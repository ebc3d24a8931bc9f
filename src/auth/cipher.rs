//! Symmetric protection of stored credentials
//!
//! AES-256-GCM keyed by the SHA-256 digest of the server secret. The
//! encoded form is base64 of `nonce || ciphertext`, so a wrong key or any
//! tampering fails authentication instead of yielding wrong plaintext.

use crate::auth::error::{AuthError, AuthResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

pub struct AuthCipher {
    cipher: Aes256Gcm,
}

impl AuthCipher {
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> AuthResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AuthError::Encode(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub fn decrypt(&self, encoded: &str) -> AuthResult<Vec<u8>> {
        let sealed = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::Decode(format!("not base64: {}", e)))?;
        if sealed.len() <= NONCE_LEN {
            return Err(AuthError::Decode("ciphertext too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AuthError::Decode("wrong secret key or tampered data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = AuthCipher::new("secret");
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), b"same");
        assert_eq!(cipher.decrypt(&b).unwrap(), b"same");
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let sealed = AuthCipher::new("secret").encrypt(b"payload").unwrap();
        let err = AuthCipher::new("other").decrypt(&sealed).unwrap_err();
        assert!(matches!(err, AuthError::Decode(_)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let cipher = AuthCipher::new("secret");
        assert!(matches!(cipher.decrypt("%%%"), Err(AuthError::Decode(_))));
        assert!(matches!(cipher.decrypt("AAAA"), Err(AuthError::Decode(_))));
    }
}

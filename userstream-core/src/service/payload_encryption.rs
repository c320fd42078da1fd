//! Queue payload encryption using AES-256-GCM
//!
//! Producers encrypt each user record before putting it on the work queue;
//! the consumer decrypts with the same shared key. Wire format is
//! `base64(nonce || ciphertext)` where the nonce is 12 random bytes.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::Engine;

use crate::{Error, Result};

/// AES-256-GCM nonce size (96 bits / 12 bytes)
const NONCE_SIZE: usize = 12;

/// AES-256 key size
const KEY_SIZE: usize = 32;

/// Shared-key cipher for queue payloads
#[derive(Clone)]
pub struct PayloadCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl PayloadCipher {
    /// Create a cipher from a 32-byte key
    pub fn new(key_bytes: &[u8]) -> Result<Self> {
        if key_bytes.len() != KEY_SIZE {
            return Err(Error::InvalidInput(format!(
                "Encryption key must be exactly {KEY_SIZE} bytes, got {}",
                key_bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create from a configured key string.
    ///
    /// A 64-character hex string is decoded; anything else must be a
    /// 32-byte literal.
    pub fn from_key_str(key: &str) -> Result<Self> {
        if key.len() == KEY_SIZE * 2 {
            if let Ok(bytes) = hex::decode(key) {
                return Self::new(&bytes);
            }
        }
        Self::new(key.as_bytes())
    }

    /// Encrypt a payload into its base64 wire form
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::Internal(format!("Payload encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(combined))
    }

    /// Decrypt a base64 wire payload
    pub fn decrypt(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let trimmed = encoded.trim_ascii();
        let combined = base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| Error::Decryption(format!("Invalid base64 payload: {e}")))?;

        if combined.len() <= NONCE_SIZE {
            return Err(Error::Decryption("Encrypted payload too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher.decrypt(nonce, ciphertext).map_err(|_| {
            Error::Decryption("Payload decryption failed (wrong key or corrupted data)".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_encrypt_then_decrypt() {
        let cipher = PayloadCipher::from_key_str(HEX_KEY).unwrap();
        let wire = cipher.encrypt(br#"{"id":1}"#).unwrap();

        assert_eq!(cipher.decrypt(wire.as_bytes()).unwrap(), br#"{"id":1}"#);
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = PayloadCipher::from_key_str(HEX_KEY).unwrap();
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_literal_key_accepted() {
        assert!(PayloadCipher::from_key_str("0123456789abcdef0123456789ABCDEF").is_ok());
        assert!(PayloadCipher::from_key_str("short").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let producer = PayloadCipher::from_key_str(HEX_KEY).unwrap();
        let consumer = PayloadCipher::from_key_str("0123456789abcdef0123456789ABCDEF").unwrap();
        let wire = producer.encrypt(b"secret").unwrap();

        let err = consumer.decrypt(wire.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_malformed_payloads_fail() {
        let cipher = PayloadCipher::from_key_str(HEX_KEY).unwrap();

        assert!(matches!(cipher.decrypt(b"%%%"), Err(Error::Decryption(_))));
        assert!(matches!(cipher.decrypt(b"AAAA"), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        let cipher = PayloadCipher::from_key_str(HEX_KEY).unwrap();
        let wire = format!("{}\n", cipher.encrypt(b"x").unwrap());

        assert_eq!(cipher.decrypt(wire.as_bytes()).unwrap(), b"x");
    }
}

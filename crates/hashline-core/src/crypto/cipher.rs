// ============================================
// File: crates/hashline-core/src/crypto/cipher.rs
// ============================================
//! # Symmetric Stream Cipher
//!
//! ## Creation Reason
//! Protects open packet contents and line packet bodies with a stream
//! cipher keyed by a derived `SymmetricKey` and a 16-byte IV.
//!
//! ## Main Functionality
//! - `SymmetricCipher`: Trait for keystream application
//! - `Aes256Ctr`: AES-256 with a 128-bit big-endian counter
//!
//! ## Layout
//! ```text
//! ciphertext = plaintext XOR AES-256-CTR(key, iv)
//! ```
//! Output length always equals input length. Encryption and decryption
//! are the same operation.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never reuse a (key, iv) pair - the XOR of two ciphertexts leaks the
//!   XOR of their plaintexts
//! - CTR mode has no integrity of its own; open packets are authenticated
//!   by their signature, not by this layer
//!
//! ## Last Modified
//! v0.1.0 - Initial stream cipher implementation

use std::fmt;

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};

use crate::crypto::keys::{Iv, SymmetricKey};
use crate::error::{CoreError, Result};

type Aes256CtrCore = ctr::Ctr128BE<Aes256>;

// ============================================
// SymmetricCipher Trait
// ============================================

/// Trait for symmetric stream encryption.
///
/// # Purpose
/// Abstracts the stream cipher so cipher suites can carry their own
/// symmetric layer and tests can substitute implementations.
pub trait SymmetricCipher: Send + Sync + fmt::Debug {
    /// Returns a short algorithm name for logs.
    fn name(&self) -> &'static str;

    /// Encrypts `data` under `key` and `iv`.
    ///
    /// # Errors
    /// Returns `Crypto` if the cipher cannot be keyed.
    fn encrypt(&self, data: &[u8], iv: &Iv, key: &SymmetricKey) -> Result<Vec<u8>>;

    /// Decrypts `data` under `key` and `iv`.
    ///
    /// Stream mode: identical to [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    /// Returns `Crypto` if the cipher cannot be keyed.
    fn decrypt(&self, data: &[u8], iv: &Iv, key: &SymmetricKey) -> Result<Vec<u8>> {
        self.encrypt(data, iv, key)
    }
}

// ============================================
// Aes256Ctr
// ============================================

/// AES-256 in counter mode with a 16-byte IV.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256Ctr;

impl Aes256Ctr {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SymmetricCipher for Aes256Ctr {
    fn name(&self) -> &'static str {
        "aes-256-ctr"
    }

    fn encrypt(&self, data: &[u8], iv: &Iv, key: &SymmetricKey) -> Result<Vec<u8>> {
        let mut cipher = Aes256CtrCore::new_from_slices(key.as_bytes(), iv.as_bytes())
            .map_err(|_| CoreError::crypto("AES-256-CTR key/iv setup failed"))?;

        let mut output = data.to_vec();
        cipher.apply_keystream(&mut output);
        Ok(output)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SymmetricKey {
        SymmetricKey::from_bytes([0x42; 32])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = Aes256Ctr::new();
        let iv = Iv::from_array([0x01; 16]);
        let plaintext = b"hello over the line";

        let ciphertext = cipher.encrypt(plaintext, &iv, &key()).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = cipher.decrypt(&ciphertext, &iv, &key()).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn test_different_iv_different_keystream() {
        let cipher = Aes256Ctr::new();
        let plaintext = [0u8; 32];

        let a = cipher.encrypt(&plaintext, &Iv::from_array([1; 16]), &key()).unwrap();
        let b = cipher.encrypt(&plaintext, &Iv::from_array([2; 16]), &key()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_garbles() {
        let cipher = Aes256Ctr::new();
        let iv = Iv::from_array([9; 16]);
        let ciphertext = cipher.encrypt(b"secret", &iv, &key()).unwrap();

        let wrong = SymmetricKey::from_bytes([0x43; 32]);
        let decrypted = cipher.decrypt(&ciphertext, &iv, &wrong).unwrap();
        assert_ne!(&decrypted[..], b"secret");
    }

    #[test]
    fn test_bit_flip_is_local() {
        let cipher = Aes256Ctr::new();
        let iv = Iv::from_array([3; 16]);
        let mut ciphertext = cipher.encrypt(b"abcdef", &iv, &key()).unwrap();
        ciphertext[2] ^= 0x01;

        let decrypted = cipher.decrypt(&ciphertext, &iv, &key()).unwrap();
        assert_eq!(&decrypted[..2], b"ab");
        assert_eq!(decrypted[2], b'c' ^ 0x01);
    }

    #[test]
    fn test_empty_input() {
        let cipher = Aes256Ctr::new();
        let out = cipher.encrypt(&[], &Iv::from_array([0; 16]), &key()).unwrap();
        assert!(out.is_empty());
    }
}

// ============================================
// File: crates/hashline-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Main Functionality
//! - `derive_key`: One labelled symmetric key from a shared secret
//! - `derive_line_keys`: The encryption/decryption pair of a line
//!
//! Every derivation uses the fixed salt [`HKDF_SALT`] and a distinct
//! `info` label so that no two keys in a handshake coincide.
//!
//! ## Last Modified
//! v0.1.0 - Initial KDF implementation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use hashline_common::types::LineIdentifier;

use super::{HKDF_SALT, LABEL_LINE, SYMMETRIC_KEY_SIZE};
use crate::crypto::SymmetricKey;
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Derives a 32-byte symmetric key from a shared secret and label.
///
/// # Errors
/// Returns `Crypto` if HKDF expansion fails.
pub fn derive_key(shared_secret: &[u8], label: &[u8]) -> Result<SymmetricKey> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared_secret);

    let mut key_bytes = [0u8; SYMMETRIC_KEY_SIZE];
    hk.expand(label, &mut key_bytes)
        .map_err(|_| CoreError::crypto("HKDF expansion failed"))?;

    let key = SymmetricKey::from_bytes(key_bytes);
    key_bytes.zeroize();
    Ok(key)
}

/// Derives the `(encryption, decryption)` keys of a line.
///
/// # Key Binding
/// ```text
/// encryption = HKDF(secret, "line" || outgoing || incoming)
/// decryption = HKDF(secret, "line" || incoming || outgoing)
/// ```
/// The peer holds the same identifiers with the roles swapped, so its
/// decryption key equals our encryption key and vice versa.
///
/// # Errors
/// Returns `Crypto` if HKDF expansion fails.
pub fn derive_line_keys(
    shared_secret: &[u8],
    outgoing: &LineIdentifier,
    incoming: &LineIdentifier,
) -> Result<(SymmetricKey, SymmetricKey)> {
    let encryption = derive_key(shared_secret, &line_info(outgoing, incoming))?;
    let decryption = derive_key(shared_secret, &line_info(incoming, outgoing))?;
    Ok((encryption, decryption))
}

fn line_info(first: &LineIdentifier, second: &LineIdentifier) -> Vec<u8> {
    let mut info = Vec::with_capacity(LABEL_LINE.len() + 32);
    info.extend_from_slice(LABEL_LINE);
    info.extend_from_slice(first.as_bytes());
    info.extend_from_slice(second.as_bytes());
    info
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{LABEL_OPEN_INNER, LABEL_OPEN_SIGNATURE};

    #[test]
    fn test_derive_key_deterministic() {
        let secret = [0x42u8; 32];
        let a = derive_key(&secret, LABEL_OPEN_INNER).unwrap();
        let b = derive_key(&secret, LABEL_OPEN_INNER).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_separate_keys() {
        let secret = [0x42u8; 32];
        let inner = derive_key(&secret, LABEL_OPEN_INNER).unwrap();
        let signature = derive_key(&secret, LABEL_OPEN_SIGNATURE).unwrap();
        assert_ne!(inner, signature);
    }

    #[test]
    fn test_line_keys_mirror_between_peers() {
        let secret = [0x17u8; 32];
        let a_id = LineIdentifier::from_array([0xAA; 16]);
        let b_id = LineIdentifier::from_array([0xBB; 16]);

        // A sends to B's id, receives on its own
        let (a_enc, a_dec) = derive_line_keys(&secret, &b_id, &a_id).unwrap();
        let (b_enc, b_dec) = derive_line_keys(&secret, &a_id, &b_id).unwrap();

        assert_eq!(a_enc, b_dec);
        assert_eq!(b_enc, a_dec);
        assert_ne!(a_enc, a_dec);
    }
}

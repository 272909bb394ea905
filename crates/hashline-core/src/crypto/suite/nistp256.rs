// ============================================
// File: crates/hashline-core/src/crypto/suite/nistp256.rs
// ============================================
//! # `p256` Primitives
//!
//! ## Encodings
//! ```text
//! identity / line public  (33) = SEC1 compressed point
//! identity / line private (32) = big-endian scalar
//! signature               (64) = ECDSA r || s (RFC 6979 nonces)
//! ```
//! One identity scalar serves both ECDSA and ECDH.
//!
//! ## Last Modified
//! v0.1.0 - Initial p256 primitives

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use super::standard::{EncodedKeyPair, SharedSecret, SuitePrimitives};
use crate::crypto::keys::SuiteId;
use crate::crypto::random::RandomSource;
use crate::crypto::SHARED_SECRET_SIZE;
use crate::error::{CoreError, Result};

const SCALAR_SIZE: usize = 32;
const POINT_SIZE: usize = 33;

/// A uniformly random 32-byte string is out of range with probability
/// about 2^-32, so a handful of draws is plenty.
const MAX_SCALAR_ATTEMPTS: usize = 8;

/// NIST P-256 ECDSA signatures with ECDH agreement.
#[derive(Debug)]
pub struct NistP256;

fn secret_key(bytes: &[u8]) -> Result<SecretKey> {
    if bytes.len() != SCALAR_SIZE {
        return Err(CoreError::decode(format!(
            "p256 private key must be {SCALAR_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    SecretKey::from_slice(bytes).map_err(|_| CoreError::decode("p256 scalar out of range"))
}

fn public_key(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != POINT_SIZE {
        return Err(CoreError::decode(format!(
            "p256 public key must be {POINT_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(bytes).map_err(|_| CoreError::decode("p256 point not on curve"))
}

fn encode_public(key: &PublicKey) -> Vec<u8> {
    key.to_encoded_point(true).as_bytes().to_vec()
}

fn generate(rng: &dyn RandomSource) -> Result<EncodedKeyPair> {
    for _ in 0..MAX_SCALAR_ATTEMPTS {
        let mut raw = Zeroizing::new([0u8; SCALAR_SIZE]);
        rng.fill_bytes(&mut raw[..])?;
        if let Ok(secret) = SecretKey::from_slice(&raw[..]) {
            let public = encode_public(&secret.public_key());
            return Ok((public, Zeroizing::new(secret.to_bytes().to_vec())));
        }
    }
    Err(CoreError::entropy("could not sample a p256 scalar"))
}

fn agree(private: &[u8], public: &[u8]) -> Result<SharedSecret> {
    let secret = secret_key(private)?;
    let public = public_key(public)?;
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());

    let mut out = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
    out.copy_from_slice(shared.raw_secret_bytes());
    Ok(out)
}

impl SuitePrimitives for NistP256 {
    const ID: SuiteId = SuiteId::P256;
    const LINE_PUBLIC_KEY_SIZE: usize = POINT_SIZE;

    fn generate_identity(rng: &dyn RandomSource) -> Result<EncodedKeyPair> {
        generate(rng)
    }

    fn generate_line_key_pair(rng: &dyn RandomSource) -> Result<EncodedKeyPair> {
        generate(rng)
    }

    fn derive_public_key(identity_private: &[u8]) -> Result<Vec<u8>> {
        Ok(encode_public(&secret_key(identity_private)?.public_key()))
    }

    fn check_public_key(bytes: &[u8]) -> Result<()> {
        public_key(bytes).map(|_| ())
    }

    fn check_private_key(bytes: &[u8]) -> Result<()> {
        secret_key(bytes).map(|_| ())
    }

    fn check_line_public_key(bytes: &[u8]) -> Result<()> {
        public_key(bytes).map(|_| ())
    }

    fn check_line_private_key(bytes: &[u8]) -> Result<()> {
        secret_key(bytes).map(|_| ())
    }

    fn sign(identity_private: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let signing = SigningKey::from(&secret_key(identity_private)?);
        let signature: Signature = signing.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(identity_public: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        let key = VerifyingKey::from_sec1_bytes(identity_public)
            .map_err(|_| CoreError::verification("invalid sender key"))?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| CoreError::verification("malformed signature"))?;
        key.verify(message, &signature)
            .map_err(|_| CoreError::verification("signature mismatch"))
    }

    fn agree_with_identity(line_private: &[u8], identity_public: &[u8]) -> Result<SharedSecret> {
        agree(line_private, identity_public)
    }

    fn agree_as_identity(identity_private: &[u8], line_public: &[u8]) -> Result<SharedSecret> {
        agree(identity_private, line_public)
    }

    fn agree_lines(line_private: &[u8], line_public: &[u8]) -> Result<SharedSecret> {
        agree(line_private, line_public)
    }
}

// ============================================
// Tests
// ============================================

// ============================================
// File: crates/hashline-core/src/crypto/suite/curve25519.rs
// ============================================
//! # `c25519` Primitives
//!
//! ## Encodings
//! ```text
//! identity public  (64) = ed25519 verifying key || x25519 public key
//! identity private (64) = ed25519 seed          || x25519 static secret
//! line public      (32) = x25519 public key
//! line private     (32) = x25519 static secret
//! signature        (64) = ed25519
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Agreements reject low-order peer points (non-contributory results)
//! - Signature verification uses `verify_strict`
//!
//! ## Last Modified
//! v0.1.0 - Initial c25519 primitives

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::standard::{EncodedKeyPair, SharedSecret, SuitePrimitives};
use crate::crypto::keys::SuiteId;
use crate::crypto::random::RandomSource;
use crate::error::{CoreError, Result};

const KEY_SIZE: usize = 32;
const IDENTITY_SIZE: usize = KEY_SIZE * 2;

/// Ed25519 signatures with X25519 agreement.
#[derive(Debug)]
pub struct Curve25519;

/// Splits an identity encoding into its signing and agreement halves.
fn halves(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    if bytes.len() != IDENTITY_SIZE {
        return Err(CoreError::decode(format!(
            "c25519 identity key must be {IDENTITY_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes.split_at(KEY_SIZE))
}

fn to_array(bytes: &[u8]) -> Result<[u8; KEY_SIZE]> {
    bytes.try_into().map_err(|_| {
        CoreError::decode(format!(
            "c25519 key must be {KEY_SIZE} bytes, got {}",
            bytes.len()
        ))
    })
}

fn static_secret(bytes: &[u8]) -> Result<StaticSecret> {
    let raw = Zeroizing::new(to_array(bytes)?);
    Ok(StaticSecret::from(*raw))
}

fn agree(secret: &StaticSecret, public: [u8; KEY_SIZE]) -> Result<SharedSecret> {
    let shared = secret.diffie_hellman(&X25519PublicKey::from(public));
    if !shared.was_contributory() {
        return Err(CoreError::crypto("x25519 agreement with low-order point"));
    }
    Ok(Zeroizing::new(*shared.as_bytes()))
}

impl SuitePrimitives for Curve25519 {
    const ID: SuiteId = SuiteId::C25519;
    const LINE_PUBLIC_KEY_SIZE: usize = KEY_SIZE;

    fn generate_identity(rng: &dyn RandomSource) -> Result<EncodedKeyPair> {
        let mut seed = Zeroizing::new([0u8; IDENTITY_SIZE]);
        rng.fill_bytes(&mut seed[..])?;

        let private = Zeroizing::new(seed.to_vec());
        let public = Self::derive_public_key(&private)?;
        Ok((public, private))
    }

    fn derive_public_key(identity_private: &[u8]) -> Result<Vec<u8>> {
        let (signing_seed, agreement_seed) = halves(identity_private)?;
        let signing = SigningKey::from_bytes(&Zeroizing::new(to_array(signing_seed)?));
        let agreement = static_secret(agreement_seed)?;

        let mut public = Vec::with_capacity(IDENTITY_SIZE);
        public.extend_from_slice(signing.verifying_key().as_bytes());
        public.extend_from_slice(X25519PublicKey::from(&agreement).as_bytes());
        Ok(public)
    }

    fn generate_line_key_pair(rng: &dyn RandomSource) -> Result<EncodedKeyPair> {
        let mut raw = Zeroizing::new([0u8; KEY_SIZE]);
        rng.fill_bytes(&mut raw[..])?;

        let secret = StaticSecret::from(*raw);
        let public = X25519PublicKey::from(&secret).as_bytes().to_vec();
        Ok((public, Zeroizing::new(secret.to_bytes().to_vec())))
    }

    fn check_public_key(bytes: &[u8]) -> Result<()> {
        let (signing, _) = halves(bytes)?;
        VerifyingKey::from_bytes(&to_array(signing)?)
            .map_err(|_| CoreError::decode("invalid ed25519 verifying key"))?;
        Ok(())
    }

    fn check_private_key(bytes: &[u8]) -> Result<()> {
        halves(bytes).map(|_| ())
    }

    fn check_line_public_key(bytes: &[u8]) -> Result<()> {
        to_array(bytes).map(|_| ())
    }

    fn check_line_private_key(bytes: &[u8]) -> Result<()> {
        to_array(bytes).map(|_| ())
    }

    fn sign(identity_private: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let (seed, _) = halves(identity_private)?;
        let signing = SigningKey::from_bytes(&Zeroizing::new(to_array(seed)?));
        Ok(signing.sign(message).to_bytes().to_vec())
    }

    fn verify(identity_public: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        let invalid_key = |_| CoreError::verification("invalid sender key");
        let (verifying, _) = halves(identity_public).map_err(invalid_key)?;
        let verifying = to_array(verifying).map_err(invalid_key)?;
        let key = VerifyingKey::from_bytes(&verifying)
            .map_err(|_| CoreError::verification("invalid sender key"))?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| CoreError::verification("malformed signature"))?;
        key.verify_strict(message, &signature)
            .map_err(|_| CoreError::verification("signature mismatch"))
    }

    fn agree_with_identity(line_private: &[u8], identity_public: &[u8]) -> Result<SharedSecret> {
        let (_, agreement) = halves(identity_public)?;
        agree(&static_secret(line_private)?, to_array(agreement)?)
    }

    fn agree_as_identity(identity_private: &[u8], line_public: &[u8]) -> Result<SharedSecret> {
        let (_, agreement) = halves(identity_private)?;
        agree(&static_secret(agreement)?, to_array(line_public)?)
    }

    fn agree_lines(line_private: &[u8], line_public: &[u8]) -> Result<SharedSecret> {
        agree(&static_secret(line_private)?, to_array(line_public)?)
    }
}

// ============================================
// Tests
// ============================================

// ============================================
// File: crates/hashline-core/src/crypto/suite/standard.rs
// ============================================
//! # Standard Open-Packet Construction
//!
//! ## Creation Reason
//! Both suites run the same handshake; only the curve operations differ.
//! `StandardSuite<P>` implements `CipherSuite` once on top of a
//! `SuitePrimitives` type.
//!
//! ## Main Logical Flow
//! ```text
//! pre-render (sender, recipient identity R):
//!   L, W  ← fresh line key pairs        iv ← 16 random bytes
//!   open  = W.pub || CTR(kdf(DH(W, R), "open-parameter"), iv, L.pub)
//!   s     = DH(L, R)
//!   k_in  = kdf(s, "open-inner")        k_sig = kdf(s, "open-signature")
//!
//! render:
//!   inner = frame({to, at, line}, identity.pub)
//!   sig   = Sign(identity, inner || L.pub)
//!   out   = frame({type, cs, iv, open, sig: CTR(k_sig, iv, sig)},
//!                 CTR(k_in, iv, inner))
//!
//! unwrap (recipient): W.pub → L.pub → s = DH(R, L.pub) → inner, sig
//! verify: key from inner body, signature, destination, line id, time
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `W` never leaves `pre_render_open_packet`
//! - Every verify failure is reported as `Verification`, whatever the cause
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake construction

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use hashline_common::time::{Timestamp, DEFAULT_OPEN_WINDOW};
use hashline_common::types::{Hashname, LineIdentifier, Path};

use super::CipherSuite;
use crate::crypto::cipher::{Aes256Ctr, SymmetricCipher};
use crate::crypto::kdf::{self, derive_key};
use crate::crypto::keys::{
    HashnamePrivateKey, HashnamePublicKey, IdentityKeyPair, Iv, LineKeyPair, LinePrivateKey,
    LinePublicKey, SuiteId, SymmetricKey,
};
use crate::crypto::random::RandomSource;
use crate::crypto::{
    IV_SIZE, LABEL_OPEN_INNER, LABEL_OPEN_PARAMETER, LABEL_OPEN_SIGNATURE, SHARED_SECRET_SIZE,
};
use crate::error::{CoreError, Result};
use crate::protocol::framing::{decode_frame, decode_json_header, encode_json_frame};
use crate::protocol::open::{
    InnerOpenHeader, OpenHeader, OpenPacket, OutgoingOpen, PreRenderedOpen, RenderMaterial,
    UnwrappedOpenPacket, OPEN_PACKET_TYPE,
};

// ============================================
// Suite Primitives
// ============================================

/// Shared secret produced by a key agreement.
pub type SharedSecret = Zeroizing<[u8; SHARED_SECRET_SIZE]>;

/// Encoded key pair: `(public, private)`.
pub type EncodedKeyPair = (Vec<u8>, Zeroizing<Vec<u8>>);

/// The curve-specific operations the handshake is built from.
///
/// All inputs are canonical encodings already validated by the matching
/// `check_*` function or produced by a `generate_*` function.
pub trait SuitePrimitives: Send + Sync + 'static {
    /// Suite identifier.
    const ID: SuiteId;
    /// Encoded size of a line public key.
    const LINE_PUBLIC_KEY_SIZE: usize;

    /// Generates an encoded identity key pair.
    fn generate_identity(rng: &dyn RandomSource) -> Result<EncodedKeyPair>;
    /// Generates an encoded line key pair.
    fn generate_line_key_pair(rng: &dyn RandomSource) -> Result<EncodedKeyPair>;

    /// Computes the identity public key encoding for a private key.
    fn derive_public_key(identity_private: &[u8]) -> Result<Vec<u8>>;
    /// Validates an identity public key encoding.
    fn check_public_key(bytes: &[u8]) -> Result<()>;
    /// Validates an identity private key encoding.
    fn check_private_key(bytes: &[u8]) -> Result<()>;
    /// Validates a line public key encoding.
    fn check_line_public_key(bytes: &[u8]) -> Result<()>;
    /// Validates a line private key encoding.
    fn check_line_private_key(bytes: &[u8]) -> Result<()>;

    /// Signs `message` with an identity private key.
    fn sign(identity_private: &[u8], message: &[u8]) -> Result<Vec<u8>>;
    /// Verifies a signature; fails with `Verification`.
    fn verify(identity_public: &[u8], message: &[u8], signature: &[u8]) -> Result<()>;

    /// DH(line private, identity public): sender side of the open.
    fn agree_with_identity(line_private: &[u8], identity_public: &[u8]) -> Result<SharedSecret>;
    /// DH(identity private, line public): receiver side of the open.
    fn agree_as_identity(identity_private: &[u8], line_public: &[u8]) -> Result<SharedSecret>;
    /// DH(line private, line public): line promotion.
    fn agree_lines(line_private: &[u8], line_public: &[u8]) -> Result<SharedSecret>;
}

// ============================================
// StandardSuite
// ============================================

/// `CipherSuite` implementation shared by every curve.
pub struct StandardSuite<P> {
    open_time_window: Duration,
    cipher: Aes256Ctr,
    _primitives: PhantomData<fn() -> P>,
}

impl<P: SuitePrimitives> StandardSuite<P> {
    /// Creates a suite with the default freshness window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_open_time_window(DEFAULT_OPEN_WINDOW)
    }

    /// Creates a suite accepting open times within `window` of now.
    #[must_use]
    pub const fn with_open_time_window(window: Duration) -> Self {
        Self {
            open_time_window: window,
            cipher: Aes256Ctr::new(),
            _primitives: PhantomData,
        }
    }

    /// Returns the freshness window.
    #[must_use]
    pub const fn open_time_window(&self) -> Duration {
        self.open_time_window
    }

    fn ensure_suite(id: SuiteId) -> Result<()> {
        if id == P::ID {
            Ok(())
        } else {
            Err(CoreError::UnsupportedSuite(id.tag().to_string()))
        }
    }

    fn random_iv(rng: &dyn RandomSource) -> Result<Iv> {
        let mut iv = [0u8; IV_SIZE];
        rng.fill_bytes(&mut iv)?;
        Ok(Iv::from_array(iv))
    }

    fn open_keys(secret: &SharedSecret) -> Result<(SymmetricKey, SymmetricKey)> {
        let inner_key = derive_key(&secret[..], LABEL_OPEN_INNER)?;
        let signature_key = derive_key(&secret[..], LABEL_OPEN_SIGNATURE)?;
        Ok((inner_key, signature_key))
    }

    /// Checks that the declared fields are the ones inside the signed
    /// inner packet.
    fn check_binding(
        inner_packet: &[u8],
        destination: &Hashname,
        line_id_bytes: &[u8],
        open_time: Timestamp,
        inner_packet_body: &[u8],
    ) -> Result<()> {
        let mismatch = || CoreError::verification("declared fields do not match inner packet");

        let (header, body) = decode_frame(inner_packet).map_err(|_| mismatch())?;
        let inner: InnerOpenHeader = decode_json_header(header).map_err(|_| mismatch())?;

        let bound = body == inner_packet_body
            && inner.to == destination.to_hex()
            && inner.at == open_time.as_millis()
            && hex::decode(&inner.line).is_ok_and(|line| line == line_id_bytes);
        if bound {
            Ok(())
        } else {
            Err(mismatch())
        }
    }
}

impl<P: SuitePrimitives> Default for StandardSuite<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: SuitePrimitives> fmt::Debug for StandardSuite<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardSuite")
            .field("suite", &P::ID)
            .field("open_time_window", &self.open_time_window)
            .finish()
    }
}

/// The bytes an open packet signature covers.
fn signed_message(inner_packet: &[u8], line_public_key: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(inner_packet.len() + line_public_key.len());
    message.extend_from_slice(inner_packet);
    message.extend_from_slice(line_public_key);
    message
}

impl<P: SuitePrimitives> CipherSuite for StandardSuite<P> {
    fn id(&self) -> SuiteId {
        P::ID
    }

    fn symmetric_cipher(&self) -> &dyn SymmetricCipher {
        &self.cipher
    }

    fn generate_identity(&self, rng: &dyn RandomSource) -> Result<IdentityKeyPair> {
        let (public, private) = P::generate_identity(rng)?;
        IdentityKeyPair::new(
            HashnamePublicKey::new(P::ID, public),
            HashnamePrivateKey::new(P::ID, private),
        )
    }

    fn decode_public_key(&self, bytes: &[u8]) -> Result<HashnamePublicKey> {
        P::check_public_key(bytes)?;
        Ok(HashnamePublicKey::new(P::ID, bytes.to_vec()))
    }

    fn decode_private_key(&self, bytes: &[u8]) -> Result<HashnamePrivateKey> {
        P::check_private_key(bytes)?;
        Ok(HashnamePrivateKey::new(P::ID, Zeroizing::new(bytes.to_vec())))
    }

    fn derive_public_key(&self, private: &HashnamePrivateKey) -> Result<HashnamePublicKey> {
        Self::ensure_suite(private.suite())?;
        Ok(HashnamePublicKey::new(P::ID, P::derive_public_key(private.as_bytes())?))
    }

    fn decode_line_public_key(&self, bytes: &[u8]) -> Result<LinePublicKey> {
        P::check_line_public_key(bytes)?;
        Ok(LinePublicKey::new(P::ID, bytes.to_vec()))
    }

    fn decode_line_private_key(&self, bytes: &[u8]) -> Result<LinePrivateKey> {
        P::check_line_private_key(bytes)?;
        Ok(LinePrivateKey::new(P::ID, Zeroizing::new(bytes.to_vec())))
    }

    fn generate_line_key_pair(&self, rng: &dyn RandomSource) -> Result<LineKeyPair> {
        let (public, private) = P::generate_line_key_pair(rng)?;
        LineKeyPair::new(
            LinePublicKey::new(P::ID, public),
            LinePrivateKey::new(P::ID, private),
        )
    }

    fn unwrap_open_packet(
        &self,
        identity: &IdentityKeyPair,
        iv: &Iv,
        encrypted_signature: &[u8],
        open_parameter: &[u8],
        encrypted_inner_packet: &[u8],
        origin: &Path,
    ) -> Result<UnwrappedOpenPacket> {
        Self::ensure_suite(identity.suite())?;

        let key_size = P::LINE_PUBLIC_KEY_SIZE;
        if open_parameter.len() != key_size * 2 {
            return Err(CoreError::crypto(format!(
                "open parameter must be {} bytes, got {}",
                key_size * 2,
                open_parameter.len()
            )));
        }
        let (wrap_public, wrapped_line_key) = open_parameter.split_at(key_size);
        P::check_line_public_key(wrap_public)
            .map_err(|_| CoreError::crypto("open parameter carries an invalid wrap key"))?;

        let private = identity.private().as_bytes();
        let wrap_secret = P::agree_as_identity(private, wrap_public)?;
        let wrap_key = derive_key(&wrap_secret[..], LABEL_OPEN_PARAMETER)?;
        let line_public = self.cipher.decrypt(wrapped_line_key, iv, &wrap_key)?;
        P::check_line_public_key(&line_public)
            .map_err(|_| CoreError::crypto("unwrapped line key is invalid"))?;

        let secret = P::agree_as_identity(private, &line_public)?;
        let (inner_key, signature_key) = Self::open_keys(&secret)?;
        let inner_packet = self.cipher.decrypt(encrypted_inner_packet, iv, &inner_key)?;
        let signature = self.cipher.decrypt(encrypted_signature, iv, &signature_key)?;

        trace!(suite = %P::ID, path = %origin, inner_len = inner_packet.len(), "Open packet unwrapped");

        Ok(UnwrappedOpenPacket::new(
            P::ID,
            identity.hashname(),
            LinePublicKey::new(P::ID, line_public),
            inner_packet,
            signature,
            origin.clone(),
        ))
    }

    fn verify_open_packet(
        &self,
        unwrapped: UnwrappedOpenPacket,
        destination: &Hashname,
        line_id_bytes: &[u8],
        line_identifier: LineIdentifier,
        open_time: Timestamp,
        inner_packet_body: &[u8],
    ) -> Result<OpenPacket> {
        if unwrapped.suite() != P::ID {
            return Err(CoreError::verification("packet was unwrapped by another suite"));
        }

        P::check_public_key(inner_packet_body)
            .map_err(|_| CoreError::verification("inner packet carries an invalid sender key"))?;

        let message = signed_message(
            unwrapped.inner_packet(),
            unwrapped.line_public_key().as_bytes(),
        );
        P::verify(inner_packet_body, &message, unwrapped.signature())?;

        Self::check_binding(
            unwrapped.inner_packet(),
            destination,
            line_id_bytes,
            open_time,
            inner_packet_body,
        )?;

        if destination != unwrapped.local_hashname() {
            return Err(CoreError::verification(format!(
                "open packet addressed to {destination}"
            )));
        }

        if line_id_bytes != line_identifier.as_bytes() {
            return Err(CoreError::verification("line identifier does not match"));
        }

        if !open_time.is_within(self.open_time_window) {
            return Err(CoreError::verification(format!(
                "open time offset {}ms outside window of {}ms",
                open_time.offset_from_now(),
                self.open_time_window.as_millis()
            )));
        }

        let sender = HashnamePublicKey::new(P::ID, inner_packet_body.to_vec());
        Ok(unwrapped.into_verified(sender, line_identifier, open_time))
    }

    fn pre_render_open_packet(
        &self,
        open: OutgoingOpen,
        rng: &dyn RandomSource,
    ) -> Result<PreRenderedOpen> {
        Self::ensure_suite(open.recipient().suite())?;
        let recipient = open.recipient().as_bytes();

        let line_key_pair = self.generate_line_key_pair(rng)?;
        let (wrap_public, wrap_private) = P::generate_line_key_pair(rng)?;
        let iv = Self::random_iv(rng)?;

        let wrap_secret = P::agree_with_identity(&wrap_private, recipient)?;
        let wrap_key = derive_key(&wrap_secret[..], LABEL_OPEN_PARAMETER)?;
        let wrapped_line_key =
            self.cipher
                .encrypt(line_key_pair.public().as_bytes(), &iv, &wrap_key)?;

        let mut open_parameter = wrap_public;
        open_parameter.extend_from_slice(&wrapped_line_key);

        let secret = P::agree_with_identity(line_key_pair.private().as_bytes(), recipient)?;
        let (inner_key, signature_key) = Self::open_keys(&secret)?;

        debug!(
            suite = %P::ID,
            peer = %open.recipient().hashname(),
            line = %open.line_identifier(),
            "Open packet pre-rendered"
        );

        Ok(PreRenderedOpen::new(
            P::ID,
            open,
            line_key_pair,
            RenderMaterial::generated(iv, open_parameter),
            inner_key,
            signature_key,
        ))
    }

    fn render_open_packet(
        &self,
        packet: &PreRenderedOpen,
        identity: &IdentityKeyPair,
    ) -> Result<Vec<u8>> {
        Self::ensure_suite(packet.suite())?;
        Self::ensure_suite(identity.suite())?;

        let open = packet.open();
        let inner_header = InnerOpenHeader {
            to: open.recipient().hashname().to_hex(),
            at: open.open_time().as_millis(),
            line: open.line_identifier().to_hex(),
        };
        let inner = encode_json_frame(&inner_header, identity.public().as_bytes())?;

        let message = signed_message(&inner, packet.line_public_key().as_bytes());
        let signature = P::sign(identity.private().as_bytes(), &message)?;

        let material = packet.material();
        let encrypted_inner = self.cipher.encrypt(&inner, material.iv(), packet.inner_key())?;
        let encrypted_signature =
            self.cipher
                .encrypt(&signature, material.iv(), packet.signature_key())?;

        let header = OpenHeader {
            kind: OPEN_PACKET_TYPE.to_string(),
            cs: P::ID.tag().to_string(),
            iv: material.iv().to_hex(),
            open: BASE64.encode(material.open_parameter()),
            sig: BASE64.encode(&encrypted_signature),
        };
        let bytes = encode_json_frame(&header, &encrypted_inner)?;

        trace!(
            suite = %P::ID,
            peer = %open.recipient().hashname(),
            len = bytes.len(),
            "Open packet rendered"
        );
        Ok(bytes)
    }

    fn derive_line_keys(
        &self,
        local: LinePrivateKey,
        remote: &LinePublicKey,
        outgoing: &LineIdentifier,
        incoming: &LineIdentifier,
    ) -> Result<(SymmetricKey, SymmetricKey)> {
        Self::ensure_suite(local.suite())?;
        Self::ensure_suite(remote.suite())?;

        let secret = P::agree_lines(local.as_bytes(), remote.as_bytes())?;
        kdf::derive_line_keys(&secret[..], outgoing, incoming)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::random::{OsRandom, SeededRandom};
    use crate::crypto::suite::{for_id, C25519Suite};

    fn origin() -> Path {
        Path::Local("test".into())
    }

    fn suites() -> Vec<Arc<dyn CipherSuite>> {
        SuiteId::ALL.into_iter().map(for_id).collect()
    }

    /// Runs the receiver half the way `parse_open_packet` does.
    fn receive(
        suite: &dyn CipherSuite,
        recipient: &IdentityKeyPair,
        packet: &[u8],
        tamper_signature: bool,
    ) -> Result<OpenPacket> {
        let (header, body) = decode_frame(packet).unwrap();
        let header: OpenHeader = decode_json_header(header).unwrap();
        let iv = Iv::from_hex(&header.iv).unwrap();
        let open_parameter = BASE64.decode(&header.open).unwrap();
        let mut signature = BASE64.decode(&header.sig).unwrap();
        if tamper_signature {
            signature[5] ^= 0x01;
        }

        let unwrapped = suite.unwrap_open_packet(
            recipient,
            &iv,
            &signature,
            &open_parameter,
            body,
            &origin(),
        )?;

        let (inner_header, inner_body) = decode_frame(unwrapped.inner_packet())?;
        let inner: InnerOpenHeader = decode_json_header(inner_header)?;
        let inner_body = inner_body.to_vec();
        let destination: Hashname = inner.to.parse().unwrap();
        let line_bytes = hex::decode(&inner.line).unwrap();
        let line = LineIdentifier::from_bytes(&line_bytes).unwrap();

        suite.verify_open_packet(
            unwrapped,
            &destination,
            &line_bytes,
            line,
            Timestamp::from_millis(inner.at),
            &inner_body,
        )
    }

    #[test]
    fn test_handshake_roundtrip_with_fixed_material() {
        for suite in suites() {
            let rng = SeededRandom::new(42);
            let sender = suite.generate_identity(&rng).unwrap();
            let recipient = suite.generate_identity(&rng).unwrap();
            let line = LineIdentifier::from_array([0x3c; 16]);
            let at = Timestamp::now();

            let outgoing = OutgoingOpen::new(recipient.public().clone(), line).with_open_time(at);
            let first = suite.pre_render_open_packet(outgoing.clone(), &rng).unwrap();
            let material = first.material().clone();

            // Same line keys, fixed iv and open parameter
            let replay_rng = SeededRandom::new(42);
            suite.generate_identity(&replay_rng).unwrap();
            suite.generate_identity(&replay_rng).unwrap();
            let second = suite
                .pre_render_open_packet(outgoing, &replay_rng)
                .unwrap()
                .with_material(RenderMaterial::new(*material.iv(), material.open_parameter().to_vec()));

            let a = suite.render_open_packet(&first, &sender).unwrap();
            let b = suite.render_open_packet(&second, &sender).unwrap();
            assert_eq!(a, b, "{} render is not deterministic", suite.id());

            let open = receive(suite.as_ref(), &recipient, &a, false).unwrap();
            assert_eq!(open.sender(), sender.public());
            assert_eq!(open.line_identifier(), line);
            assert_eq!(open.open_time(), at);
            assert_eq!(open.line_public_key(), first.line_public_key());
            assert_eq!(open.origin(), &origin());
        }
    }

    #[test]
    fn test_render_is_repeatable() {
        for suite in suites() {
            let sender = suite.generate_identity(&OsRandom).unwrap();
            let recipient = suite.generate_identity(&OsRandom).unwrap();
            let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate());
            let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();

            let a = suite.render_open_packet(&pre, &sender).unwrap();
            let b = suite.render_open_packet(&pre, &sender).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_pre_render_draws_fresh_material() {
        for suite in suites() {
            let recipient = suite.generate_identity(&OsRandom).unwrap();
            let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate());

            let a = suite.pre_render_open_packet(open.clone(), &OsRandom).unwrap();
            let b = suite.pre_render_open_packet(open, &OsRandom).unwrap();
            assert_ne!(a.material().iv(), b.material().iv());
            assert_ne!(a.material().open_parameter(), b.material().open_parameter());
            assert_ne!(a.line_public_key(), b.line_public_key());
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        for suite in suites() {
            let sender = suite.generate_identity(&OsRandom).unwrap();
            let recipient = suite.generate_identity(&OsRandom).unwrap();
            let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate());
            let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();
            let packet = suite.render_open_packet(&pre, &sender).unwrap();

            let result = receive(suite.as_ref(), &recipient, &packet, true);
            assert!(
                matches!(result, Err(CoreError::Verification { .. })),
                "{}: {result:?}",
                suite.id()
            );
        }
    }

    #[test]
    fn test_stale_and_future_opens_rejected() {
        for suite in suites() {
            let sender = suite.generate_identity(&OsRandom).unwrap();
            let recipient = suite.generate_identity(&OsRandom).unwrap();

            for offset in [-600_000, 600_000] {
                let at = Timestamp::now().offset_by(offset);
                let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate())
                    .with_open_time(at);
                let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();
                let packet = suite.render_open_packet(&pre, &sender).unwrap();

                assert!(matches!(
                    receive(suite.as_ref(), &recipient, &packet, false),
                    Err(CoreError::Verification { .. })
                ));
            }
        }
    }

    #[test]
    fn test_wider_window_accepts_old_open() {
        let suite = C25519Suite::with_open_time_window(Duration::from_secs(3600));
        let sender = suite.generate_identity(&OsRandom).unwrap();
        let recipient = suite.generate_identity(&OsRandom).unwrap();
        let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate())
            .with_open_time(Timestamp::now().offset_by(-600_000));
        let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();
        let packet = suite.render_open_packet(&pre, &sender).unwrap();

        assert!(receive(&suite, &recipient, &packet, false).is_ok());
    }

    #[test]
    fn test_other_recipient_cannot_open() {
        for suite in suites() {
            let sender = suite.generate_identity(&OsRandom).unwrap();
            let recipient = suite.generate_identity(&OsRandom).unwrap();
            let eavesdropper = suite.generate_identity(&OsRandom).unwrap();
            let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate());
            let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();
            let packet = suite.render_open_packet(&pre, &sender).unwrap();

            assert!(receive(suite.as_ref(), &eavesdropper, &packet, false).is_err());
        }
    }

    #[test]
    fn test_declared_fields_must_match() {
        let suite = for_id(SuiteId::C25519);
        let sender = suite.generate_identity(&OsRandom).unwrap();
        let recipient = suite.generate_identity(&OsRandom).unwrap();
        let line = LineIdentifier::generate();
        let at = Timestamp::now();
        let open = OutgoingOpen::new(recipient.public().clone(), line).with_open_time(at);
        let pre = suite.pre_render_open_packet(open, &OsRandom).unwrap();
        let packet = suite.render_open_packet(&pre, &sender).unwrap();

        let (header, body) = decode_frame(&packet).unwrap();
        let header: OpenHeader = decode_json_header(header).unwrap();
        let iv = Iv::from_hex(&header.iv).unwrap();
        let open_parameter = BASE64.decode(&header.open).unwrap();
        let signature = BASE64.decode(&header.sig).unwrap();
        let unwrap = || {
            suite
                .unwrap_open_packet(&recipient, &iv, &signature, &open_parameter, body, &origin())
                .unwrap()
        };
        let sender_key = sender.public().as_bytes();
        let destination = recipient.hashname();

        // Wrong destination
        let other = suite.generate_identity(&OsRandom).unwrap().hashname();
        assert!(matches!(
            suite.verify_open_packet(unwrap(), &other, line.as_bytes(), line, at, sender_key),
            Err(CoreError::Verification { .. })
        ));

        // Line bytes that are not the identifier
        let other_line = LineIdentifier::generate();
        assert!(matches!(
            suite.verify_open_packet(unwrap(), &destination, other_line.as_bytes(), line, at, sender_key),
            Err(CoreError::Verification { .. })
        ));

        // Sender key that did not sign
        let impostor = suite.generate_identity(&OsRandom).unwrap();
        assert!(matches!(
            suite.verify_open_packet(unwrap(), &destination, line.as_bytes(), line, at, impostor.public().as_bytes()),
            Err(CoreError::Verification { .. })
        ));

        // Everything declared correctly
        assert!(suite
            .verify_open_packet(unwrap(), &destination, line.as_bytes(), line, at, sender_key)
            .is_ok());
    }

    #[test]
    fn test_open_parameter_length_checked() {
        for suite in suites() {
            let recipient = suite.generate_identity(&OsRandom).unwrap();
            let iv = Iv::from_array([0; 16]);
            let result = suite.unwrap_open_packet(&recipient, &iv, &[0; 64], &[1, 2, 3], &[], &origin());
            assert!(matches!(result, Err(CoreError::Crypto { .. })));
        }
    }

    #[test]
    fn test_suite_mismatch_rejected() {
        let c25519 = for_id(SuiteId::C25519);
        let p256 = for_id(SuiteId::P256);
        let recipient = c25519.generate_identity(&OsRandom).unwrap();
        let open = OutgoingOpen::new(recipient.public().clone(), LineIdentifier::generate());

        assert!(matches!(
            p256.pre_render_open_packet(open, &OsRandom),
            Err(CoreError::UnsupportedSuite(_))
        ));
    }

    #[test]
    fn test_line_keys_mirror() {
        for suite in suites() {
            let a = suite.generate_line_key_pair(&OsRandom).unwrap();
            let b = suite.generate_line_key_pair(&OsRandom).unwrap();
            let a_public = a.public().clone();
            let b_public = b.public().clone();
            let a_id = LineIdentifier::generate();
            let b_id = LineIdentifier::generate();

            let (a_enc, a_dec) = suite
                .derive_line_keys(a.into_private(), &b_public, &b_id, &a_id)
                .unwrap();
            let (b_enc, b_dec) = suite
                .derive_line_keys(b.into_private(), &a_public, &a_id, &b_id)
                .unwrap();
            assert_eq!(a_enc, b_dec);
            assert_eq!(b_enc, a_dec);
        }
    }

    #[test]
    fn test_key_decoding_roundtrip() {
        for suite in suites() {
            let identity = suite.generate_identity(&OsRandom).unwrap();
            let public = suite.decode_public_key(identity.public().as_bytes()).unwrap();
            let private = suite.decode_private_key(identity.private().as_bytes()).unwrap();
            let restored = IdentityKeyPair::new(public, private).unwrap();
            assert_eq!(restored.hashname(), identity.hashname());

            let line = suite.generate_line_key_pair(&OsRandom).unwrap();
            assert!(suite.decode_line_public_key(line.public().as_bytes()).is_ok());
            assert!(suite
                .decode_line_private_key(line.private().as_bytes())
                .is_ok());

            assert!(matches!(suite.decode_public_key(&[0u8; 7]), Err(CoreError::Decode { .. })));
            assert!(matches!(suite.decode_private_key(&[]), Err(CoreError::Decode { .. })));
            assert!(matches!(suite.decode_line_public_key(&[0u8; 5]), Err(CoreError::Decode { .. })));
        }
    }
}

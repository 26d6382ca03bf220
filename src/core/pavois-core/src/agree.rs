//! Key agreement.

use std::fmt;
use std::sync::atomic::AtomicBool;

use tracing::debug;
use x25519_dalek::StaticSecret;

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, AsymmetricSpec, KeySpec};
use crate::error::Error;
use crate::key::{Key, PublicKey};
use pavois_mem::SecretBuffer;

/// X25519 private key size in bytes.
pub const X25519_PRIVATE_KEY_SIZE: usize = 32;
/// X25519 public key size in bytes.
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;
/// X25519 shared secret size in bytes.
pub const X25519_SHARED_SECRET_SIZE: usize = 32;

/// The output of a key agreement.
///
/// The raw bytes are never exposed; a shared secret only feeds a key
/// derivation algorithm. Dropping it wipes the backing memory.
pub struct SharedSecret {
    buffer: SecretBuffer,
}

impl SharedSecret {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let mut buffer = SecretBuffer::from_bytes(bytes);
        buffer.freeze();
        Self { buffer }
    }

    /// Size of the secret in bytes.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Releases the backing memory early.
    pub fn dispose(&mut self) {
        self.buffer.release();
    }

    /// Returns `true` once the secret has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.buffer.is_released()
    }

    pub(crate) fn bytes(&self) -> Result<&[u8], Error> {
        self.buffer.expose().map_err(|_| Error::Disposed)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("size", &self.size())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A key agreement algorithm.
pub trait KeyAgreementAlgorithm: Algorithm {
    /// Private key size in bytes.
    fn private_key_size(&self) -> usize;

    /// Public key size in bytes.
    fn public_key_size(&self) -> usize;

    /// Shared secret size in bytes.
    fn shared_secret_size(&self) -> usize;

    /// Computes the shared secret between `key` and `peer`.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if either half belongs to another
    /// algorithm, [`Error::Disposed`] if the private key has been
    /// released, [`Error::Crypto`] if the peer contributes a
    /// low-order point.
    fn agree(&self, key: &Key, peer: &PublicKey) -> Result<SharedSecret, Error>;

    /// Like [`agree`](Self::agree), collapsing every failure to `None`.
    fn try_agree(&self, key: &Key, peer: &PublicKey) -> Option<SharedSecret> {
        self.agree(key, peer).ok()
    }
}

/// X25519 (RFC 7748).
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519;

static X25519_CHECKED: AtomicBool = AtomicBool::new(false);

impl X25519 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(&X25519_CHECKED, "x25519", {
            // Basepoint agreement of the all-one scalar against its
            // own public key must contribute and yield 32 bytes.
            let secret = StaticSecret::from([1u8; 32]);
            let public = x25519_dalek::PublicKey::from(&secret);
            let shared = secret.diffie_hellman(&public);
            shared.was_contributory() && shared.as_bytes().len() == X25519_SHARED_SECRET_SIZE
        });
        Self
    }
}

impl Algorithm for X25519 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::X25519
    }

    fn key_spec(&self) -> Option<KeySpec> {
        Some(KeySpec {
            min_size: X25519_PRIVATE_KEY_SIZE,
            default_size: X25519_PRIVATE_KEY_SIZE,
            max_size: X25519_PRIVATE_KEY_SIZE,
            blob_magic: [0xDE, 0x66, 0x41, 0xDE],
            blob_output_size: X25519_SHARED_SECRET_SIZE as u16,
            asymmetric: Some(AsymmetricSpec {
                public_key_size: X25519_PUBLIC_KEY_SIZE,
                oid: &[1, 3, 101, 110],
            }),
        })
    }

    fn derive_public_key(&self, secret: &[u8]) -> Option<Vec<u8>> {
        let scalar: [u8; X25519_PRIVATE_KEY_SIZE] = secret.try_into().ok()?;
        let secret = StaticSecret::from(scalar);
        Some(x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec())
    }
}

impl KeyAgreementAlgorithm for X25519 {
    fn private_key_size(&self) -> usize {
        X25519_PRIVATE_KEY_SIZE
    }

    fn public_key_size(&self) -> usize {
        X25519_PUBLIC_KEY_SIZE
    }

    fn shared_secret_size(&self) -> usize {
        X25519_SHARED_SECRET_SIZE
    }

    fn agree(&self, key: &Key, peer: &PublicKey) -> Result<SharedSecret, Error> {
        key.check_algorithm(AlgorithmId::X25519)?;
        if peer.algorithm() != AlgorithmId::X25519 {
            return Err(Error::AlgorithmMismatch {
                expected: AlgorithmId::X25519,
                got: peer.algorithm(),
            });
        }
        let scalar: [u8; X25519_PRIVATE_KEY_SIZE] = key
            .secret_bytes()?
            .try_into()
            .map_err(|_| Error::Crypto)?;
        let point: [u8; X25519_PUBLIC_KEY_SIZE] = peer
            .as_bytes()
            .try_into()
            .map_err(|_| Error::Crypto)?;
        let secret = StaticSecret::from(scalar);
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(point));
        if !shared.was_contributory() {
            debug!("x25519 agreement rejected a non-contributory peer point");
            return Err(Error::Crypto);
        }
        Ok(SharedSecret::from_bytes(shared.as_bytes()))
    }
}

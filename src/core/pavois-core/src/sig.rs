//! Digital signatures.

use std::sync::atomic::AtomicBool;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, AsymmetricSpec, KeySpec};
use crate::error::Error;
use crate::key::{Key, PublicKey};

/// Ed25519 seed size in bytes.
pub const ED25519_PRIVATE_KEY_SIZE: usize = 32;
/// Ed25519 public key size in bytes.
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;
/// Ed25519 signature size in bytes.
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// A signature algorithm with distinct signing and verification keys.
pub trait SignatureAlgorithm: Algorithm {
    /// Private key size in bytes.
    fn private_key_size(&self) -> usize;

    /// Public key size in bytes.
    fn public_key_size(&self) -> usize;

    /// Signature size in bytes.
    fn signature_size(&self) -> usize;

    /// Signs `data` with the private half of `key`.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if `key` belongs to another
    /// algorithm, [`Error::Disposed`] if its secret has been released.
    fn sign(&self, key: &Key, data: &[u8]) -> Result<Vec<u8>, Error>;

    /// Verifies `signature` over `data` against `public`.
    ///
    /// A signature of the wrong length or a malformed public key
    /// verifies as `false` rather than erroring, so untrusted input
    /// never distinguishes "badly shaped" from "forged".
    fn verify(&self, public: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Ed25519 (RFC 8032).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

static ED25519_CHECKED: AtomicBool = AtomicBool::new(false);

impl Ed25519 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &ED25519_CHECKED,
            "ed25519",
            ed25519_dalek::SECRET_KEY_LENGTH == ED25519_PRIVATE_KEY_SIZE
                && ed25519_dalek::PUBLIC_KEY_LENGTH == ED25519_PUBLIC_KEY_SIZE
                && ed25519_dalek::SIGNATURE_LENGTH == ED25519_SIGNATURE_SIZE,
        );
        Self
    }

    pub(crate) fn signing_key(key: &Key) -> Result<SigningKey, Error> {
        key.check_algorithm(AlgorithmId::Ed25519)?;
        let seed: [u8; ED25519_PRIVATE_KEY_SIZE] = key
            .secret_bytes()?
            .try_into()
            .map_err(|_| Error::Crypto)?;
        Ok(SigningKey::from_bytes(&seed))
    }

    pub(crate) fn verifying_key(public: &PublicKey) -> Result<Option<VerifyingKey>, Error> {
        if public.algorithm() != AlgorithmId::Ed25519 {
            return Err(Error::AlgorithmMismatch {
                expected: AlgorithmId::Ed25519,
                got: public.algorithm(),
            });
        }
        let bytes: [u8; ED25519_PUBLIC_KEY_SIZE] = match public.as_bytes().try_into() {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };
        // Non-canonical point encodings are rejected here.
        Ok(VerifyingKey::from_bytes(&bytes).ok())
    }
}

impl Algorithm for Ed25519 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Ed25519
    }

    fn key_spec(&self) -> Option<KeySpec> {
        Some(KeySpec {
            min_size: ED25519_PRIVATE_KEY_SIZE,
            default_size: ED25519_PRIVATE_KEY_SIZE,
            max_size: ED25519_PRIVATE_KEY_SIZE,
            blob_magic: [0xDE, 0x64, 0x45, 0xDE],
            blob_output_size: ED25519_SIGNATURE_SIZE as u16,
            asymmetric: Some(AsymmetricSpec {
                public_key_size: ED25519_PUBLIC_KEY_SIZE,
                oid: &[1, 3, 101, 112],
            }),
        })
    }

    fn derive_public_key(&self, secret: &[u8]) -> Option<Vec<u8>> {
        let seed: [u8; ED25519_PRIVATE_KEY_SIZE] = secret.try_into().ok()?;
        Some(SigningKey::from_bytes(&seed).verifying_key().to_bytes().to_vec())
    }
}

impl SignatureAlgorithm for Ed25519 {
    fn private_key_size(&self) -> usize {
        ED25519_PRIVATE_KEY_SIZE
    }

    fn public_key_size(&self) -> usize {
        ED25519_PUBLIC_KEY_SIZE
    }

    fn signature_size(&self) -> usize {
        ED25519_SIGNATURE_SIZE
    }

    fn sign(&self, key: &Key, data: &[u8]) -> Result<Vec<u8>, Error> {
        let signing_key = Self::signing_key(key)?;
        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, public: &PublicKey, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        let Some(verifying_key) = Self::verifying_key(public)? else {
            return Ok(false);
        };
        let sig_bytes: [u8; ED25519_SIGNATURE_SIZE] = match signature.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::format::KeyBlobFormat;
    use crate::key::ExportPolicy;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let public = key.public_key().unwrap();
        let signature = algorithm.sign(&key, b"attestation").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(algorithm.verify(public, b"attestation", &signature).unwrap());
    }

    #[test]
    fn test_verify_rejects_modified_message() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let public = key.public_key().unwrap();
        let signature = algorithm.sign(&key, b"attestation").unwrap();
        assert!(!algorithm.verify(public, b"attestation!", &signature).unwrap());
    }

    #[test]
    fn test_verify_rejects_flipped_signature_bits() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let public = key.public_key().unwrap();
        let signature = algorithm.sign(&key, b"attestation").unwrap();
        for i in 0..signature.len() {
            let mut wrong = signature.clone();
            wrong[i] ^= 0x01;
            assert!(!algorithm.verify(public, b"attestation", &wrong).unwrap());
        }
    }

    #[test]
    fn test_verify_rejects_wrong_length_signature() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let public = key.public_key().unwrap();
        assert!(!algorithm.verify(public, b"attestation", &[0u8; 63]).unwrap());
        assert!(!algorithm.verify(public, b"attestation", &[0u8; 65]).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let other = Key::generate(&algorithm, ExportPolicy::None).unwrap();
        let signature = algorithm.sign(&key, b"attestation").unwrap();
        assert!(!algorithm
            .verify(other.public_key().unwrap(), b"attestation", &signature)
            .unwrap());
    }

    #[test]
    fn test_signing_survives_raw_private_roundtrip() {
        let algorithm = Ed25519::new();
        let key = Key::generate(&algorithm, ExportPolicy::AllowExport).unwrap();
        let blob = key.export(KeyBlobFormat::RawPrivateKey).unwrap();
        let restored = Key::import(
            &algorithm,
            &blob,
            KeyBlobFormat::RawPrivateKey,
            ExportPolicy::None,
        )
        .unwrap();
        let signature = algorithm.sign(&restored, b"attestation").unwrap();
        assert!(algorithm
            .verify(key.public_key().unwrap(), b"attestation", &signature)
            .unwrap());
    }

    #[test]
    fn test_sign_rejects_foreign_key() {
        let key = Key::generate(&crate::mac::HmacSha256::new(), ExportPolicy::None).unwrap();
        let err = Ed25519::new().sign(&key, b"attestation").unwrap_err();
        assert!(matches!(err, Error::AlgorithmMismatch { .. }));
    }
}

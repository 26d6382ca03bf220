//! Key entities and export policy.
//!
//! A [`Key`] binds secret material in a [`SecretBuffer`] to the algorithm
//! that created it. Operations take the key together with its descriptor
//! and reject keys created under a different algorithm, so a key can
//! never silently be used with the wrong primitive.
//!
//! ## Export policy
//!
//! Whether private material may ever leave the process is decided at
//! construction time:
//!
//! - [`ExportPolicy::None`]: private export always fails.
//! - [`ExportPolicy::AllowExport`]: private export always succeeds.
//! - [`ExportPolicy::AllowArchiving`]: exactly one *successful* private
//!   export, modeling a one-time backup; attempts that fail for other
//!   reasons do not consume the allowance.
//!
//! Public key material is captured at construction and is exempt from
//! the policy; it stays exportable even after [`Key::dispose`].

use std::cell::Cell;

use pavois_mem::SecretBuffer;
use tracing::{debug, warn};

use crate::algorithm::{Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::format::{self, KeyBlobFormat};

/// Controls whether and how often private key material may be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPolicy {
    /// Private material never leaves the secure container.
    #[default]
    None,
    /// Private material may be exported any number of times.
    AllowExport,
    /// Private material may be exported exactly once.
    AllowArchiving,
}

/// The public half of an asymmetric key.
///
/// Plain, non-secret bytes plus the algorithm they belong to. Equality
/// is by content and algorithm.
#[derive(Debug, Clone)]
pub struct PublicKey {
    id: AlgorithmId,
    spec: KeySpec,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn new(id: AlgorithmId, spec: KeySpec, bytes: Vec<u8>) -> Self {
        Self { id, spec, bytes }
    }

    /// Imports a public key from a public-material blob.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for private formats or algorithms
    /// without a public half, [`Error::KeylessAlgorithm`] for keyless
    /// algorithms, [`Error::BadFormat`] if decoding fails.
    pub fn import(
        algorithm: &dyn Algorithm,
        blob: &[u8],
        format: KeyBlobFormat,
    ) -> Result<Self, Error> {
        let spec = algorithm
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(algorithm.id()))?;
        if !format.is_public() {
            return Err(Error::UnsupportedFormat(format));
        }
        let bytes = format::import_public(&spec, blob, format)?;
        Ok(Self::new(algorithm.id(), spec, bytes))
    }

    /// Exports the public key in a public-material format.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for private formats.
    pub fn export(&self, format: KeyBlobFormat) -> Result<Vec<u8>, Error> {
        if !format.is_public() {
            return Err(Error::UnsupportedFormat(format));
        }
        format::export_public(&self.spec, &self.bytes, format)
    }

    /// The algorithm this public key belongs to.
    pub fn algorithm(&self) -> AlgorithmId {
        self.id
    }

    /// The raw public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.bytes == other.bytes
    }
}

impl Eq for PublicKey {}

/// A key: secret material bound to the algorithm that created it.
///
/// The secret lives in a [`SecretBuffer`] owned exclusively by this key;
/// disposal (explicit or on drop) zeroes it. `Key` is deliberately not
/// `Sync`; callers must serialize disposal against in-flight use.
pub struct Key {
    id: AlgorithmId,
    spec: KeySpec,
    secret: SecretBuffer,
    public: Option<PublicKey>,
    policy: ExportPolicy,
    archived: Cell<bool>,
}

impl Key {
    /// Generates a fresh key for `algorithm` from the OS CSPRNG.
    ///
    /// The container is sized to the algorithm's default key size, filled
    /// with randomness, used to derive the public half where one exists,
    /// then frozen.
    ///
    /// # Errors
    ///
    /// [`Error::KeylessAlgorithm`] if the algorithm does not use keys.
    pub fn generate(algorithm: &dyn Algorithm, policy: ExportPolicy) -> Result<Self, Error> {
        let spec = algorithm
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(algorithm.id()))?;
        let secret = SecretBuffer::random(spec.default_size);
        let public = algorithm
            .derive_public_key(secret.expose().map_err(|_| Error::Crypto)?)
            .map(|bytes| PublicKey::new(algorithm.id(), spec, bytes));
        debug!(algorithm = %algorithm.id(), "generated key");
        Ok(Self::assemble(algorithm.id(), spec, secret, public, policy))
    }

    /// Imports a key from a private-material blob.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] if the algorithm does not support the
    /// format (including all public-material formats),
    /// [`Error::KeylessAlgorithm`] for keyless algorithms, and
    /// [`Error::BadFormat`] if decoding fails.
    pub fn import(
        algorithm: &dyn Algorithm,
        blob: &[u8],
        format: KeyBlobFormat,
        policy: ExportPolicy,
    ) -> Result<Self, Error> {
        let spec = algorithm
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(algorithm.id()))?;
        if !format.is_private() {
            return Err(Error::UnsupportedFormat(format));
        }
        let (secret, public_bytes) = format::import_secret(algorithm, &spec, blob, format)?;
        let public = public_bytes.map(|bytes| PublicKey::new(algorithm.id(), spec, bytes));
        debug!(algorithm = %algorithm.id(), %format, "imported key");
        Ok(Self::assemble(algorithm.id(), spec, secret, public, policy))
    }

    /// Like [`Key::import`] but returns `None` instead of an error, for
    /// callers probing whether a blob matches a format.
    pub fn try_import(
        algorithm: &dyn Algorithm,
        blob: &[u8],
        format: KeyBlobFormat,
        policy: ExportPolicy,
    ) -> Option<Self> {
        Self::import(algorithm, blob, format, policy).ok()
    }

    /// Builds a key around already-validated secret material.
    ///
    /// Used by key derivation; the container is frozen here.
    pub(crate) fn from_secret_bytes(
        algorithm: &dyn Algorithm,
        bytes: &[u8],
        policy: ExportPolicy,
    ) -> Result<Self, Error> {
        let spec = algorithm
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(algorithm.id()))?;
        if bytes.len() < spec.min_size || bytes.len() > spec.max_size {
            return Err(Error::InvalidSize {
                what: "derived key",
                expected: format!("{}..={}", spec.min_size, spec.max_size),
                got: bytes.len(),
            });
        }
        let secret = SecretBuffer::from_bytes(bytes);
        let public = algorithm
            .derive_public_key(bytes)
            .map(|pk| PublicKey::new(algorithm.id(), spec, pk));
        Ok(Self::assemble(algorithm.id(), spec, secret, public, policy))
    }

    fn assemble(
        id: AlgorithmId,
        spec: KeySpec,
        mut secret: SecretBuffer,
        public: Option<PublicKey>,
        policy: ExportPolicy,
    ) -> Self {
        secret.freeze();
        Self {
            id,
            spec,
            secret,
            public,
            policy,
            archived: Cell::new(false),
        }
    }

    /// The algorithm this key was created under.
    pub fn algorithm(&self) -> AlgorithmId {
        self.id
    }

    /// The key's export policy.
    pub fn export_policy(&self) -> ExportPolicy {
        self.policy
    }

    /// The public half, for asymmetric algorithms.
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public.as_ref()
    }

    /// The size of the secret material in bytes.
    pub fn size(&self) -> usize {
        self.secret.len()
    }

    /// Returns `true` once the key has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.secret.is_released()
    }

    /// Exports the key in the given format.
    ///
    /// Private-material formats are subject to the export policy and fail
    /// after disposal; public-material formats are always permitted for
    /// asymmetric keys, do not consume the archiving allowance, and keep
    /// working after disposal.
    ///
    /// # Errors
    ///
    /// [`Error::Disposed`], [`Error::ExportForbidden`],
    /// [`Error::UnsupportedFormat`].
    pub fn export(&self, format: KeyBlobFormat) -> Result<Vec<u8>, Error> {
        if format.is_public() {
            let public = self
                .public
                .as_ref()
                .ok_or(Error::UnsupportedFormat(format))?;
            return public.export(format);
        }

        let secret = self.secret.expose().map_err(|_| Error::Disposed)?;
        match self.policy {
            ExportPolicy::AllowExport => {}
            ExportPolicy::AllowArchiving if !self.archived.get() => {}
            ExportPolicy::AllowArchiving => {
                warn!(algorithm = %self.id, "archiving export allowance already consumed");
                return Err(Error::ExportForbidden);
            }
            ExportPolicy::None => return Err(Error::ExportForbidden),
        }

        let blob = format::export_secret(&self.spec, secret, format)?;
        // Only a successful export consumes the one-time allowance.
        if self.policy == ExportPolicy::AllowArchiving {
            self.archived.set(true);
        }
        debug!(algorithm = %self.id, %format, "exported private key material");
        Ok(blob)
    }

    /// Zeroes and releases the secret material. Idempotent.
    ///
    /// The public half, if any, remains readable and exportable.
    pub fn dispose(&mut self) {
        if !self.secret.is_released() {
            debug!(algorithm = %self.id, "disposing key");
        }
        self.secret.release();
    }

    pub(crate) fn spec(&self) -> &KeySpec {
        &self.spec
    }

    /// Borrows the secret material for an operation.
    pub(crate) fn secret_bytes(&self) -> Result<&[u8], Error> {
        self.secret.expose().map_err(|_| Error::Disposed)
    }

    /// Rejects keys created under a different algorithm.
    pub(crate) fn check_algorithm(&self, expected: AlgorithmId) -> Result<(), Error> {
        if self.id != expected {
            return Err(Error::AlgorithmMismatch {
                expected,
                got: self.id,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("algorithm", &self.id)
            .field("policy", &self.policy)
            .field("disposed", &self.is_disposed())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::aead::Aes256Gcm;
    use crate::hash::Sha256;
    use crate::sig::Ed25519;

    #[test]
    fn test_generate_uses_default_key_size() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::None).unwrap();
        assert_eq!(key.size(), 32);
        assert_eq!(key.algorithm(), AlgorithmId::Aes256Gcm);
    }

    #[test]
    fn test_generate_for_keyless_algorithm_fails() {
        let result = Key::generate(&Sha256::new(), ExportPolicy::None);
        assert!(matches!(result, Err(Error::KeylessAlgorithm(_))));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowExport).unwrap();
        let b = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowExport).unwrap();
        assert_ne!(
            a.export(KeyBlobFormat::RawSymmetricKey).unwrap(),
            b.export(KeyBlobFormat::RawSymmetricKey).unwrap()
        );
    }

    #[test]
    fn test_asymmetric_key_has_public_half() {
        let key = Key::generate(&Ed25519::new(), ExportPolicy::None).unwrap();
        let public = key.public_key().unwrap();
        assert_eq!(public.algorithm(), AlgorithmId::Ed25519);
        assert_eq!(public.as_bytes().len(), 32);
    }

    #[test]
    fn test_symmetric_key_has_no_public_half() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::None).unwrap();
        assert!(key.public_key().is_none());
    }

    #[test]
    fn test_export_policy_none_forbids_private_export() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::None).unwrap();
        assert!(matches!(
            key.export(KeyBlobFormat::RawSymmetricKey),
            Err(Error::ExportForbidden)
        ));
    }

    #[test]
    fn test_archiving_permits_exactly_one_export() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowArchiving).unwrap();
        assert!(key.export(KeyBlobFormat::RawSymmetricKey).is_ok());
        assert!(matches!(
            key.export(KeyBlobFormat::RawSymmetricKey),
            Err(Error::ExportForbidden)
        ));
    }

    #[test]
    fn test_failed_export_does_not_consume_archiving_allowance() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowArchiving).unwrap();
        // Wrong format for a symmetric algorithm; fails without spending
        // the allowance.
        assert!(key.export(KeyBlobFormat::PkixPrivateKey).is_err());
        assert!(key.export(KeyBlobFormat::RawSymmetricKey).is_ok());
    }

    #[test]
    fn test_public_export_does_not_consume_archiving_allowance() {
        let key = Key::generate(&Ed25519::new(), ExportPolicy::AllowArchiving).unwrap();
        assert!(key.export(KeyBlobFormat::RawPublicKey).is_ok());
        assert!(key.export(KeyBlobFormat::RawPrivateKey).is_ok());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut key = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowExport).unwrap();
        key.dispose();
        key.dispose();
        assert!(key.is_disposed());
    }

    #[test]
    fn test_private_export_after_dispose_fails() {
        let mut key = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowExport).unwrap();
        key.dispose();
        assert!(matches!(
            key.export(KeyBlobFormat::RawSymmetricKey),
            Err(Error::Disposed)
        ));
    }

    #[test]
    fn test_public_export_survives_dispose() {
        let mut key = Key::generate(&Ed25519::new(), ExportPolicy::None).unwrap();
        let before = key.export(KeyBlobFormat::RawPublicKey).unwrap();
        key.dispose();
        let after = key.export(KeyBlobFormat::RawPublicKey).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_import_roundtrip_symmetric() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::AllowExport).unwrap();
        let blob = key.export(KeyBlobFormat::RawSymmetricKey).unwrap();
        let imported = Key::import(
            &Aes256Gcm::new(),
            &blob,
            KeyBlobFormat::RawSymmetricKey,
            ExportPolicy::AllowExport,
        )
        .unwrap();
        assert_eq!(
            imported.export(KeyBlobFormat::RawSymmetricKey).unwrap(),
            blob
        );
    }

    #[test]
    fn test_import_with_public_format_fails() {
        let result = Key::import(
            &Ed25519::new(),
            &[0u8; 32],
            KeyBlobFormat::RawPublicKey,
            ExportPolicy::None,
        );
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_try_import_returns_none_on_bad_blob() {
        let result = Key::try_import(
            &Aes256Gcm::new(),
            &[0u8; 7],
            KeyBlobFormat::RawSymmetricKey,
            ExportPolicy::None,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_imported_private_key_rederives_public() {
        let key = Key::generate(&Ed25519::new(), ExportPolicy::AllowExport).unwrap();
        let blob = key.export(KeyBlobFormat::RawPrivateKey).unwrap();
        let imported = Key::import(
            &Ed25519::new(),
            &blob,
            KeyBlobFormat::RawPrivateKey,
            ExportPolicy::None,
        )
        .unwrap();
        assert_eq!(key.public_key(), imported.public_key());
    }

    #[test]
    fn test_public_key_equality_is_content_and_algorithm() {
        let key = Key::generate(&Ed25519::new(), ExportPolicy::AllowExport).unwrap();
        let blob = key.export(KeyBlobFormat::RawPrivateKey).unwrap();
        let same = Key::import(
            &Ed25519::new(),
            &blob,
            KeyBlobFormat::RawPrivateKey,
            ExportPolicy::None,
        )
        .unwrap();
        let other = Key::generate(&Ed25519::new(), ExportPolicy::None).unwrap();
        assert_eq!(key.public_key(), same.public_key());
        assert_ne!(key.public_key(), other.public_key());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = Key::generate(&Aes256Gcm::new(), ExportPolicy::None).unwrap();
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("[REDACTED]"));
    }
}

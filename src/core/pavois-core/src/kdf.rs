//! Key derivation from shared secrets.

use std::sync::atomic::AtomicBool;

use hkdf::Hkdf;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::agree::SharedSecret;
use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::key::{ExportPolicy, Key};

/// A key derivation algorithm over a [`SharedSecret`].
pub trait KeyDerivationAlgorithm: Algorithm {
    /// Largest number of bytes a single derivation can produce.
    fn max_output_size(&self) -> usize;

    /// Derives `len` bytes from `secret`, bound to `salt` and `info`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSize`] if `len` is zero or above
    /// [`max_output_size`](Self::max_output_size), [`Error::Disposed`]
    /// if `secret` has been released.
    fn derive_bytes(
        &self,
        secret: &SharedSecret,
        salt: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Derives a fresh [`Key`] for `target` from `secret`.
    ///
    /// The derived key takes `target`'s default size and never leaves
    /// the process unless `policy` says otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::KeylessAlgorithm`] if `target` takes no key, plus
    /// everything [`derive_bytes`](Self::derive_bytes) can return.
    fn derive_key(
        &self,
        secret: &SharedSecret,
        salt: &[u8],
        info: &[u8],
        target: &dyn Algorithm,
        policy: ExportPolicy,
    ) -> Result<Key, Error> {
        let spec = target
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(target.id()))?;
        let bytes = self.derive_bytes(secret, salt, info, spec.default_size)?;
        Key::from_secret_bytes(target, &bytes, policy)
    }
}

fn check_output_len(len: usize, max: usize) -> Result<(), Error> {
    if len == 0 || len > max {
        return Err(Error::InvalidSize {
            what: "output length",
            expected: format!("1..={max}"),
            got: len,
        });
    }
    Ok(())
}

// An empty salt means "no salt", matching RFC 5869's default of a
// zero-filled string of hash length.
fn optional(salt: &[u8]) -> Option<&[u8]> {
    if salt.is_empty() {
        None
    } else {
        Some(salt)
    }
}

/// HKDF-SHA-256 (RFC 5869).
#[derive(Debug, Clone, Copy, Default)]
pub struct HkdfSha256;

static HKDF_SHA256_CHECKED: AtomicBool = AtomicBool::new(false);

impl HkdfSha256 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(&HKDF_SHA256_CHECKED, "hkdf-sha256", {
            let hkdf = Hkdf::<Sha256>::new(None, &[0u8; 32]);
            hkdf.expand(&[], &mut [0u8; 32]).is_ok()
                && hkdf.expand(&[], &mut vec![0u8; 255 * 32 + 1]).is_err()
        });
        Self
    }
}

impl Algorithm for HkdfSha256 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::HkdfSha256
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl KeyDerivationAlgorithm for HkdfSha256 {
    fn max_output_size(&self) -> usize {
        255 * 32
    }

    fn derive_bytes(
        &self,
        secret: &SharedSecret,
        salt: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        check_output_len(len, self.max_output_size())?;
        let hkdf = Hkdf::<Sha256>::new(optional(salt), secret.bytes()?);
        let mut out = Zeroizing::new(vec![0u8; len]);
        hkdf.expand(info, &mut out).map_err(|_| Error::Crypto)?;
        Ok(out)
    }
}

/// HKDF-SHA-512 (RFC 5869).
#[derive(Debug, Clone, Copy, Default)]
pub struct HkdfSha512;

static HKDF_SHA512_CHECKED: AtomicBool = AtomicBool::new(false);

impl HkdfSha512 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(&HKDF_SHA512_CHECKED, "hkdf-sha512", {
            let hkdf = Hkdf::<Sha512>::new(None, &[0u8; 64]);
            hkdf.expand(&[], &mut [0u8; 64]).is_ok()
                && hkdf.expand(&[], &mut vec![0u8; 255 * 64 + 1]).is_err()
        });
        Self
    }
}

impl Algorithm for HkdfSha512 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::HkdfSha512
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl KeyDerivationAlgorithm for HkdfSha512 {
    fn max_output_size(&self) -> usize {
        255 * 64
    }

    fn derive_bytes(
        &self,
        secret: &SharedSecret,
        salt: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        check_output_len(len, self.max_output_size())?;
        let hkdf = Hkdf::<Sha512>::new(optional(salt), secret.bytes()?);
        let mut out = Zeroizing::new(vec![0u8; len]);
        hkdf.expand(info, &mut out).map_err(|_| Error::Crypto)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::agree::{KeyAgreementAlgorithm, X25519};
    use crate::mac::HmacSha256;

    fn shared_secret() -> SharedSecret {
        let x25519 = X25519::new();
        let alice = Key::generate(&x25519, ExportPolicy::None).unwrap();
        let bob = Key::generate(&x25519, ExportPolicy::None).unwrap();
        x25519.agree(&alice, bob.public_key().unwrap()).unwrap()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let kdf = HkdfSha256::new();
        let secret = shared_secret();
        let a = kdf.derive_bytes(&secret, b"salt", b"info", 42).unwrap();
        let b = kdf.derive_bytes(&secret, b"salt", b"info", 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 42);
    }

    #[test]
    fn test_salt_and_info_both_bind_the_output() {
        let kdf = HkdfSha256::new();
        let secret = shared_secret();
        let base = kdf.derive_bytes(&secret, b"salt", b"info", 32).unwrap();
        let other_salt = kdf.derive_bytes(&secret, b"tlas", b"info", 32).unwrap();
        let other_info = kdf.derive_bytes(&secret, b"salt", b"ofni", 32).unwrap();
        assert_ne!(base, other_salt);
        assert_ne!(base, other_info);
    }

    #[test]
    fn test_empty_salt_matches_rfc_default() {
        let kdf = HkdfSha512::new();
        let secret = shared_secret();
        // RFC 5869: no salt == a zero-filled salt of hash length.
        let implicit = kdf.derive_bytes(&secret, b"", b"info", 32).unwrap();
        let explicit = kdf.derive_bytes(&secret, &[0u8; 64], b"info", 32).unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_output_length_bounds() {
        let kdf = HkdfSha256::new();
        let secret = shared_secret();
        assert!(kdf.derive_bytes(&secret, b"", b"", 0).is_err());
        assert!(kdf.derive_bytes(&secret, b"", b"", 255 * 32).is_ok());
        assert!(matches!(
            kdf.derive_bytes(&secret, b"", b"", 255 * 32 + 1),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_derive_key_produces_usable_key() {
        use crate::mac::MacAlgorithm;

        let kdf = HkdfSha256::new();
        let secret = shared_secret();
        let mac = HmacSha256::new();
        let key = kdf
            .derive_key(&secret, b"salt", b"mac key", &mac, ExportPolicy::None)
            .unwrap();
        assert_eq!(key.algorithm(), AlgorithmId::HmacSha256);
        assert_eq!(key.size(), 32);
        assert!(mac.mac(&key, b"payload").is_ok());
    }

    #[test]
    fn test_derive_key_rejects_keyless_target() {
        let kdf = HkdfSha256::new();
        let secret = shared_secret();
        let err = kdf
            .derive_key(
                &secret,
                b"",
                b"",
                &crate::hash::Sha256::new(),
                ExportPolicy::None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::KeylessAlgorithm(AlgorithmId::Sha256)));
    }

    #[test]
    fn test_disposed_secret_is_rejected() {
        let kdf = HkdfSha256::new();
        let mut secret = shared_secret();
        secret.dispose();
        assert!(matches!(
            kdf.derive_bytes(&secret, b"", b"", 32),
            Err(Error::Disposed)
        ));
    }
}

//! The abstract algorithm model.
//!
//! Every capability (AEAD, MAC, hash, signature, key agreement, key
//! derivation, stream cipher, password hashing) is described by an
//! immutable, thread-safe descriptor implementing [`Algorithm`] plus one
//! of the category traits. Descriptors carry nothing but compiled-in
//! sizes; they are cheap to construct and safe to share.
//!
//! Constructing the first descriptor of a concrete algorithm runs a
//! one-time self-check comparing the primitive engine's reported sizes
//! against this crate's compiled-in expectations. A mismatch means the
//! engine's layout assumptions no longer hold, which this layer cannot
//! paper over: it panics.

use std::sync::atomic::{AtomicBool, Ordering};

/// Identity of a concrete algorithm.
///
/// Keys are tagged with the id of the descriptor that created them;
/// operations compare ids to reject keys created under a different
/// algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AlgorithmId {
    /// AES-256-GCM authenticated encryption.
    Aes256Gcm,
    /// ChaCha20-Poly1305 authenticated encryption.
    ChaCha20Poly1305,
    /// SHA-256 hash.
    Sha256,
    /// SHA-512 hash.
    Sha512,
    /// BLAKE2b hash.
    Blake2b,
    /// HMAC-SHA-256 message authentication.
    HmacSha256,
    /// HMAC-SHA-512 message authentication.
    HmacSha512,
    /// Keyed BLAKE2b message authentication.
    Blake2bMac,
    /// Ed25519 signatures.
    Ed25519,
    /// X25519 key agreement.
    X25519,
    /// HKDF-SHA-256 key derivation.
    HkdfSha256,
    /// HKDF-SHA-512 key derivation.
    HkdfSha512,
    /// ChaCha20 stream cipher.
    ChaCha20,
    /// Argon2id password hashing.
    Argon2id,
}

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Aes256Gcm => "aes256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake2b => "blake2b",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
            Self::Blake2bMac => "blake2b-mac",
            Self::Ed25519 => "ed25519",
            Self::X25519 => "x25519",
            Self::HkdfSha256 => "hkdf-sha256",
            Self::HkdfSha512 => "hkdf-sha512",
            Self::ChaCha20 => "chacha20",
            Self::Argon2id => "argon2id",
        };
        f.write_str(name)
    }
}

/// Extra description for algorithms with a public half.
#[derive(Debug, Clone, Copy)]
pub struct AsymmetricSpec {
    /// Exact public key size in bytes.
    pub public_key_size: usize,
    /// Object identifier for the PKIX formats.
    pub oid: &'static [u32],
}

/// Key sizing and blob parameters for a keyed algorithm.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    /// Smallest accepted key size in bytes.
    pub min_size: usize,
    /// Key size used by [`crate::Key::generate`].
    pub default_size: usize,
    /// Largest accepted key size in bytes.
    pub max_size: usize,
    /// Magic constant of the tagged blob format, unique per algorithm.
    pub blob_magic: [u8; 4],
    /// Output (tag/MAC) size recorded in the tagged blob, 0 if not
    /// applicable.
    pub blob_output_size: u16,
    /// Present iff the algorithm has a public key.
    pub asymmetric: Option<AsymmetricSpec>,
}

/// Common surface of every algorithm descriptor.
pub trait Algorithm {
    /// This algorithm's identity.
    fn id(&self) -> AlgorithmId;

    /// Key sizing parameters, or `None` for keyless algorithms.
    fn key_spec(&self) -> Option<KeySpec>;

    /// Derives the public key for a secret, for asymmetric algorithms.
    fn derive_public_key(&self, secret: &[u8]) -> Option<Vec<u8>> {
        let _ = secret;
        None
    }
}

/// Runs a one-time engine self-check guarded by a process-wide flag.
///
/// The flag is set with a compare-and-set so that a racing first use from
/// several threads at worst re-runs the check, which is harmless.
///
/// # Panics
///
/// Panics if `sizes_match` is false: the engine's binary layout no longer
/// matches the compiled-in expectations, a fatal initialization failure.
pub(crate) fn engine_self_check(flag: &AtomicBool, algorithm: &str, sizes_match: bool) {
    if flag.load(Ordering::Acquire) {
        return;
    }
    assert!(
        sizes_match,
        "primitive engine self-check failed for {algorithm}: \
         reported sizes do not match compiled-in expectations"
    );
    let _ = flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_are_stable() {
        assert_eq!(AlgorithmId::Aes256Gcm.to_string(), "aes256-gcm");
        assert_eq!(AlgorithmId::Ed25519.to_string(), "ed25519");
        assert_eq!(AlgorithmId::HkdfSha256.to_string(), "hkdf-sha256");
    }

    #[test]
    fn test_self_check_sets_flag_once() {
        let flag = AtomicBool::new(false);
        engine_self_check(&flag, "test", true);
        assert!(flag.load(Ordering::Acquire));
        // Re-running with the flag set is a no-op even if the check
        // would now fail; the flag records that it already passed.
        engine_self_check(&flag, "test", false);
    }

    #[test]
    #[should_panic(expected = "self-check failed")]
    fn test_self_check_mismatch_is_fatal() {
        let flag = AtomicBool::new(false);
        engine_self_check(&flag, "test", false);
    }
}

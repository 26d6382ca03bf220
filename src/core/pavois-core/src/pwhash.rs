//! Password-based key derivation.

use std::sync::atomic::AtomicBool;

use argon2::{Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::key::{ExportPolicy, Key};

/// Required salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// Smallest output a derivation can produce.
pub const MIN_OUTPUT_SIZE: usize = 4;
/// Largest output a derivation can produce.
pub const MAX_OUTPUT_SIZE: usize = 1024;

/// A password hashing algorithm used for key derivation.
///
/// Unlike [`KeyDerivationAlgorithm`](crate::kdf::KeyDerivationAlgorithm),
/// the input is a low-entropy password and the cost parameters are the
/// defense.
pub trait PasswordHashAlgorithm: Algorithm {
    /// Required salt size in bytes.
    fn salt_size(&self) -> usize;

    /// Derives `len` bytes from `password` and `salt`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSize`] if the salt is not exactly
    /// [`salt_size`](Self::salt_size) bytes or `len` falls outside
    /// [`MIN_OUTPUT_SIZE`]`..=`[`MAX_OUTPUT_SIZE`].
    fn derive_bytes(
        &self,
        password: &[u8],
        salt: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Derives a fresh [`Key`] for `target` from `password` and `salt`.
    ///
    /// # Errors
    ///
    /// [`Error::KeylessAlgorithm`] if `target` takes no key, plus
    /// everything [`derive_bytes`](Self::derive_bytes) can return.
    fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
        target: &dyn Algorithm,
        policy: ExportPolicy,
    ) -> Result<Key, Error> {
        let spec = target
            .key_spec()
            .ok_or(Error::KeylessAlgorithm(target.id()))?;
        let bytes = self.derive_bytes(password, salt, spec.default_size)?;
        Key::from_secret_bytes(target, &bytes, policy)
    }
}

/// Argon2id (RFC 9106).
#[derive(Debug, Clone, Copy)]
pub struct Argon2id {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

static ARGON2ID_CHECKED: AtomicBool = AtomicBool::new(false);

impl Argon2id {
    /// Creates the descriptor with the RFC 9106 second recommended
    /// parameter set (19 MiB, 2 passes, 1 lane).
    pub fn new() -> Self {
        Self::run_self_check();
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }

    /// Creates the descriptor with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// [`Error::BadFormat`] if the engine rejects the combination,
    /// for example memory below `8 * parallelism` KiB.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, Error> {
        Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| Error::BadFormat(format!("argon2 parameters: {e}")))?;
        Self::run_self_check();
        Ok(Self {
            memory_kib,
            iterations,
            parallelism,
        })
    }

    fn run_self_check() {
        engine_self_check(
            &ARGON2ID_CHECKED,
            "argon2id",
            argon2::RECOMMENDED_SALT_LEN == SALT_SIZE
                && Params::new(8, 1, 1, Some(MIN_OUTPUT_SIZE)).is_ok(),
        );
    }

    /// Memory cost in KiB.
    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    /// Number of passes over the memory.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Number of lanes.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }
}

impl Default for Argon2id {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Argon2id {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Argon2id
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl PasswordHashAlgorithm for Argon2id {
    fn salt_size(&self) -> usize {
        SALT_SIZE
    }

    fn derive_bytes(
        &self,
        password: &[u8],
        salt: &[u8],
        len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        if salt.len() != SALT_SIZE {
            return Err(Error::InvalidSize {
                what: "salt",
                expected: SALT_SIZE.to_string(),
                got: salt.len(),
            });
        }
        if !(MIN_OUTPUT_SIZE..=MAX_OUTPUT_SIZE).contains(&len) {
            return Err(Error::InvalidSize {
                what: "output length",
                expected: format!("{MIN_OUTPUT_SIZE}..={MAX_OUTPUT_SIZE}"),
                got: len,
            });
        }
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(len))
            .map_err(|_| Error::Crypto)?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);
        let mut out = Zeroizing::new(vec![0u8; len]);
        argon2
            .hash_password_into(password, salt, &mut out)
            .map_err(|_| Error::Crypto)?;
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::aead::{Aead, Aes256Gcm};

    // Fast parameters; cost is not under test.
    fn cheap() -> Argon2id {
        Argon2id::with_params(32, 1, 1).unwrap()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let pwhash = cheap();
        let salt = [3u8; 16];
        let a = pwhash.derive_bytes(b"correct horse", &salt, 32).unwrap();
        let b = pwhash.derive_bytes(b"correct horse", &salt, 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_password_and_salt_both_bind_the_output() {
        let pwhash = cheap();
        let base = pwhash.derive_bytes(b"password", &[3u8; 16], 32).unwrap();
        let other_password = pwhash.derive_bytes(b"passwore", &[3u8; 16], 32).unwrap();
        let other_salt = pwhash.derive_bytes(b"password", &[4u8; 16], 32).unwrap();
        assert_ne!(base, other_password);
        assert_ne!(base, other_salt);
    }

    #[test]
    fn test_cost_parameters_bind_the_output() {
        let salt = [3u8; 16];
        let a = Argon2id::with_params(32, 1, 1)
            .unwrap()
            .derive_bytes(b"password", &salt, 32)
            .unwrap();
        let b = Argon2id::with_params(64, 1, 1)
            .unwrap()
            .derive_bytes(b"password", &salt, 32)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_salt_must_be_exactly_sixteen_bytes() {
        let pwhash = cheap();
        assert!(matches!(
            pwhash.derive_bytes(b"password", &[0u8; 15], 32),
            Err(Error::InvalidSize { .. })
        ));
        assert!(matches!(
            pwhash.derive_bytes(b"password", &[0u8; 17], 32),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_output_length_bounds() {
        let pwhash = cheap();
        let salt = [0u8; 16];
        assert!(pwhash.derive_bytes(b"password", &salt, 3).is_err());
        assert!(pwhash.derive_bytes(b"password", &salt, 4).is_ok());
        assert!(pwhash.derive_bytes(b"password", &salt, 1024).is_ok());
        assert!(pwhash.derive_bytes(b"password", &salt, 1025).is_err());
    }

    #[test]
    fn test_invalid_cost_parameters_are_rejected() {
        // Memory below 8 KiB per lane is out of spec.
        assert!(Argon2id::with_params(7, 1, 1).is_err());
    }

    #[test]
    fn test_derive_key_produces_usable_key() {
        let pwhash = cheap();
        let aead = Aes256Gcm::new();
        let key = pwhash
            .derive_key(b"password", &[9u8; 16], &aead, ExportPolicy::None)
            .unwrap();
        assert_eq!(key.algorithm(), AlgorithmId::Aes256Gcm);
        let ciphertext = aead.encrypt(&key, &[0u8; 12], b"", b"payload").unwrap();
        let plaintext = aead.decrypt(&key, &[0u8; 12], b"", &ciphertext).unwrap();
        assert_eq!(&plaintext[..], b"payload");
    }

    #[test]
    fn test_derive_key_rejects_keyless_target() {
        let err = cheap()
            .derive_key(
                b"password",
                &[0u8; 16],
                &crate::hash::Sha512::new(),
                ExportPolicy::None,
            )
            .unwrap_err();
        assert!(matches!(err, Error::KeylessAlgorithm(AlgorithmId::Sha512)));
    }
}

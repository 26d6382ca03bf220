//! Cryptographic hash algorithms.

use std::sync::atomic::AtomicBool;

use blake2::digest::{Update as VarUpdate, VariableOutput};
use blake2::Blake2bVar;
use sha2::Digest;
use subtle::ConstantTimeEq;

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::incremental::HashState;

#[doc(hidden)]
pub mod sealed {
    use crate::incremental::HashState;

    pub trait HashCore {
        fn begin(&self) -> HashState;
    }
}

/// A keyless hash algorithm.
pub trait HashAlgorithm: Algorithm + sealed::HashCore {
    /// Hash output size in bytes.
    fn hash_size(&self) -> usize;

    /// Hashes `data` in one shot.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hashes `data` and compares against `expected` in constant time.
    ///
    /// The comparison's duration depends only on the lengths involved,
    /// never on where the first mismatching byte sits.
    fn verify(&self, data: &[u8], expected: &[u8]) -> bool {
        expected.len() == self.hash_size()
            && bool::from(self.hash(data).as_slice().ct_eq(expected))
    }
}

/// SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256;

static SHA256_CHECKED: AtomicBool = AtomicBool::new(false);

impl Sha256 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &SHA256_CHECKED,
            "sha256",
            sha2::Sha256::digest(b"").len() == 32,
        );
        Self
    }
}

impl Algorithm for Sha256 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Sha256
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl sealed::HashCore for Sha256 {
    fn begin(&self) -> HashState {
        HashState::Sha256(sha2::Sha256::new())
    }
}

impl HashAlgorithm for Sha256 {
    fn hash_size(&self) -> usize {
        32
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        sha2::Sha256::digest(data).to_vec()
    }
}

/// SHA-512.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512;

static SHA512_CHECKED: AtomicBool = AtomicBool::new(false);

impl Sha512 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &SHA512_CHECKED,
            "sha512",
            sha2::Sha512::digest(b"").len() == 64,
        );
        Self
    }
}

impl Algorithm for Sha512 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Sha512
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl sealed::HashCore for Sha512 {
    fn begin(&self) -> HashState {
        HashState::Sha512(sha2::Sha512::new())
    }
}

impl HashAlgorithm for Sha512 {
    fn hash_size(&self) -> usize {
        64
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        sha2::Sha512::digest(data).to_vec()
    }
}

/// Smallest BLAKE2b output size this descriptor accepts.
pub const BLAKE2B_MIN_HASH_SIZE: usize = 32;
/// Largest BLAKE2b output size (the algorithm's own maximum).
pub const BLAKE2B_MAX_HASH_SIZE: usize = 64;

/// BLAKE2b with a configurable output size.
#[derive(Debug, Clone, Copy)]
pub struct Blake2b {
    hash_size: usize,
}

static BLAKE2B_CHECKED: AtomicBool = AtomicBool::new(false);

impl Blake2b {
    /// Creates the descriptor with the default 64-byte output.
    pub fn new() -> Self {
        Self::run_self_check();
        Self {
            hash_size: BLAKE2B_MAX_HASH_SIZE,
        }
    }

    /// Creates the descriptor with a specific output size.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSize`] if `hash_size` is outside
    /// [`BLAKE2B_MIN_HASH_SIZE`]`..=`[`BLAKE2B_MAX_HASH_SIZE`].
    pub fn with_output_size(hash_size: usize) -> Result<Self, Error> {
        if !(BLAKE2B_MIN_HASH_SIZE..=BLAKE2B_MAX_HASH_SIZE).contains(&hash_size) {
            return Err(Error::InvalidSize {
                what: "hash size",
                expected: format!("{BLAKE2B_MIN_HASH_SIZE}..={BLAKE2B_MAX_HASH_SIZE}"),
                got: hash_size,
            });
        }
        Self::run_self_check();
        Ok(Self { hash_size })
    }

    fn run_self_check() {
        engine_self_check(
            &BLAKE2B_CHECKED,
            "blake2b",
            Blake2bVar::new(BLAKE2B_MAX_HASH_SIZE).is_ok()
                && Blake2bVar::new(BLAKE2B_MAX_HASH_SIZE + 1).is_err(),
        );
    }
}

impl Default for Blake2b {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Blake2b {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Blake2b
    }

    fn key_spec(&self) -> Option<KeySpec> {
        None
    }
}

impl sealed::HashCore for Blake2b {
    fn begin(&self) -> HashState {
        let state = Blake2bVar::new(self.hash_size)
            .expect("output size was validated at construction");
        HashState::Blake2b(state)
    }
}

impl HashAlgorithm for Blake2b {
    fn hash_size(&self) -> usize {
        self.hash_size
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        let mut state = Blake2bVar::new(self.hash_size)
            .expect("output size was validated at construction");
        state.update(data);
        let mut out = vec![0u8; self.hash_size];
        state
            .finalize_variable(&mut out)
            .expect("output buffer matches the configured size");
        out
    }
}

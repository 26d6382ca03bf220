//! Incremental hashing, authentication, and signing.
//!
//! Each state is created from its algorithm, fed any number of
//! `update` calls, and consumed by exactly one finalization. The move
//! makes double-finalization and use-after-finalize unrepresentable
//! rather than a runtime error.

use blake2::digest::block_buffer::LazyBuffer;
use blake2::digest::core_api::{Block, BlockSizeUser, UpdateCore, VariableOutputCore};
use blake2::digest::{Output, Update as VarUpdate, VariableOutput};
use blake2::{Blake2bVar, Blake2bVarCore};
use ed25519_dalek::Signature;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256 as Sha256Engine, Sha512 as Sha512Engine};
use subtle::ConstantTimeEq;

use crate::algorithm::AlgorithmId;
use crate::error::Error;
use crate::hash::HashAlgorithm;
use crate::key::{Key, PublicKey};
use crate::mac::MacAlgorithm;
use crate::sig::{Ed25519, ED25519_SIGNATURE_SIZE};

#[doc(hidden)]
pub enum HashState {
    Sha256(Sha256Engine),
    Sha512(Sha512Engine),
    Blake2b(Blake2bVar),
}

impl HashState {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(state) => Digest::update(state, data),
            Self::Sha512(state) => Digest::update(state, data),
            Self::Blake2b(state) => VarUpdate::update(state, data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha256(state) => state.finalize().to_vec(),
            Self::Sha512(state) => state.finalize().to_vec(),
            Self::Blake2b(state) => {
                let mut out = vec![0u8; state.output_size()];
                state
                    .finalize_variable(&mut out)
                    .expect("output buffer matches the configured size");
                out
            }
        }
    }
}

/// Keyed BLAKE2b with its tag size chosen at run time.
///
/// `blake2` only exposes type-level tag sizes for its keyed mode, so
/// this drives the crate's variable-output core directly: the padded
/// key block is queued as the first compressed block and the tag size
/// goes into the parameter block, exactly as the crate's own fixed-size
/// wrapper does it.
#[doc(hidden)]
pub struct KeyedBlake2bState {
    core: Blake2bVarCore,
    buffer: LazyBuffer<<Blake2bVarCore as BlockSizeUser>::BlockSize>,
    mac_size: usize,
}

impl KeyedBlake2bState {
    /// Both sizes must already be validated against the key spec; the
    /// engine core asserts on out-of-range parameters.
    pub(crate) fn new(key: &[u8], mac_size: usize) -> Self {
        let mut padded_key = Block::<Blake2bVarCore>::default();
        padded_key[..key.len()].copy_from_slice(key);
        Self {
            core: Blake2bVarCore::new_with_params(&[], &[], key.len(), mac_size),
            buffer: LazyBuffer::new(&padded_key),
            mac_size,
        }
    }

    fn update(&mut self, data: &[u8]) {
        let Self { core, buffer, .. } = self;
        buffer.digest_blocks(data, |blocks| core.update_blocks(blocks));
    }

    fn finalize(mut self) -> Vec<u8> {
        let mut full = Output::<Blake2bVarCore>::default();
        self.core
            .finalize_variable_core(&mut self.buffer, &mut full);
        full[..self.mac_size].to_vec()
    }
}

#[doc(hidden)]
pub enum MacState {
    HmacSha256(Hmac<Sha256Engine>),
    HmacSha512(Hmac<Sha512Engine>),
    Blake2b(KeyedBlake2bState),
}

impl MacState {
    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            Self::HmacSha256(state) => Mac::update(state, data),
            Self::HmacSha512(state) => Mac::update(state, data),
            Self::Blake2b(state) => state.update(data),
        }
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self {
            Self::HmacSha256(state) => state.finalize().into_bytes().to_vec(),
            Self::HmacSha512(state) => state.finalize().into_bytes().to_vec(),
            Self::Blake2b(state) => state.finalize(),
        }
    }
}

/// An in-progress hash computation.
pub struct IncrementalHash {
    id: AlgorithmId,
    hash_size: usize,
    state: HashState,
}

impl IncrementalHash {
    /// Starts a hash computation for `algorithm`.
    pub fn init(algorithm: &dyn HashAlgorithm) -> Self {
        Self {
            id: algorithm.id(),
            hash_size: algorithm.hash_size(),
            state: algorithm.begin(),
        }
    }

    /// The algorithm this state belongs to.
    pub fn algorithm(&self) -> AlgorithmId {
        self.id
    }

    /// Absorbs `data`. Splitting the input across calls never changes
    /// the result.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Consumes the state and returns the digest.
    pub fn finalize(self) -> Vec<u8> {
        self.state.finalize()
    }

    /// Consumes the state and compares the digest against `expected`
    /// in constant time.
    pub fn finalize_and_verify(self, expected: &[u8]) -> bool {
        let hash_size = self.hash_size;
        let digest = self.finalize();
        expected.len() == hash_size && bool::from(digest.as_slice().ct_eq(expected))
    }
}

/// An in-progress MAC computation.
pub struct IncrementalMac {
    id: AlgorithmId,
    mac_size: usize,
    state: MacState,
}

impl IncrementalMac {
    /// Starts a MAC computation for `algorithm` keyed with `key`.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if `key` belongs to another
    /// algorithm, [`Error::Disposed`] if its secret has been released.
    pub fn init(algorithm: &dyn MacAlgorithm, key: &Key) -> Result<Self, Error> {
        key.check_algorithm(algorithm.id())?;
        Ok(Self {
            id: algorithm.id(),
            mac_size: algorithm.mac_size(),
            state: algorithm.begin(key.secret_bytes()?)?,
        })
    }

    /// The algorithm this state belongs to.
    pub fn algorithm(&self) -> AlgorithmId {
        self.id
    }

    /// Absorbs `data`. Splitting the input across calls never changes
    /// the result.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Consumes the state and returns the tag.
    pub fn finalize(self) -> Vec<u8> {
        self.state.finalize()
    }

    /// Consumes the state and compares the tag against `expected` in
    /// constant time.
    pub fn finalize_and_verify(self, expected: &[u8]) -> bool {
        let mac_size = self.mac_size;
        let tag = self.finalize();
        expected.len() == mac_size && bool::from(tag.as_slice().ct_eq(expected))
    }
}

/// An in-progress signature over a message too large to hold at once.
///
/// This is Ed25519ph (RFC 8032 §5.1): the message is pre-hashed with
/// SHA-512, so signatures are NOT interchangeable with the one-shot
/// [`SignatureAlgorithm::sign`](crate::sig::SignatureAlgorithm::sign).
///
/// The state carries no key material. The same absorbed message can be
/// finalized either by signing with a private [`Key`] or by verifying
/// against a [`PublicKey`].
pub struct IncrementalSignature {
    state: Sha512Engine,
}

impl IncrementalSignature {
    /// Starts a signature computation.
    pub fn init(_algorithm: &Ed25519) -> Self {
        Self {
            state: Sha512Engine::new(),
        }
    }

    /// The algorithm this state belongs to.
    pub fn algorithm(&self) -> AlgorithmId {
        AlgorithmId::Ed25519
    }

    /// Absorbs `data`. Splitting the input across calls never changes
    /// the result.
    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.state, data);
    }

    /// Consumes the state and signs the absorbed message with `key`.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if `key` belongs to another
    /// algorithm, [`Error::Disposed`] if its secret has been released.
    pub fn sign(self, key: &Key) -> Result<Vec<u8>, Error> {
        let signing_key = Ed25519::signing_key(key)?;
        let signature = signing_key
            .sign_prehashed(self.state, None)
            .map_err(|_| Error::Crypto)?;
        Ok(signature.to_bytes().to_vec())
    }

    /// Consumes the state and verifies `signature` over the absorbed
    /// message against `public`.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if `public` belongs to another
    /// algorithm.
    pub fn verify(self, public: &PublicKey, signature: &[u8]) -> Result<bool, Error> {
        let Some(verifying_key) = Ed25519::verifying_key(public)? else {
            return Ok(false);
        };
        let sig_bytes: [u8; ED25519_SIGNATURE_SIZE] = match signature.try_into() {
            Ok(bytes) => bytes,
            Err(_) => return Ok(false),
        };
        let signature = Signature::from_bytes(&sig_bytes);
        Ok(verifying_key
            .verify_prehashed(self.state, None, &signature)
            .is_ok())
    }
}

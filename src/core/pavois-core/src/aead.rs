//! Authenticated encryption with associated data.
//!
//! Both ciphers take a caller-supplied nonce and produce
//! `ciphertext || tag`; decrypting returns the plaintext in a
//! [`Zeroizing`] buffer. A failed decryption reports only
//! [`Error::Crypto`]; no reason is ever disclosed.

use std::sync::atomic::AtomicBool;

use aes_gcm::aead::{Aead as AeadOp, KeyInit, Nonce, Payload};
use zeroize::Zeroizing;

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::key::Key;

/// An authenticated encryption algorithm.
pub trait Aead: Algorithm {
    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// Authentication tag size in bytes.
    fn tag_size(&self) -> usize;

    /// Encrypts `plaintext`, authenticating it together with `aad`.
    ///
    /// Returns `ciphertext || tag`; the output is always
    /// `plaintext.len() + tag_size()` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`], [`Error::InvalidSize`] for a wrong
    /// nonce length, [`Error::Disposed`].
    fn encrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error>;

    /// Decrypts and authenticates `ciphertext` (as produced by
    /// [`Aead::encrypt`]) against `aad`.
    ///
    /// # Errors
    ///
    /// [`Error::Crypto`] if authentication fails, plus the argument
    /// errors of [`Aead::encrypt`].
    fn decrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error>;
}

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256Gcm;

static AES256_GCM_CHECKED: AtomicBool = AtomicBool::new(false);

impl Aes256Gcm {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &AES256_GCM_CHECKED,
            "aes256-gcm",
            engine_sizes_match::<aes_gcm::Aes256Gcm>(KEY_SIZE, NONCE_SIZE, TAG_SIZE),
        );
        Self
    }
}

impl Algorithm for Aes256Gcm {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Aes256Gcm
    }

    fn key_spec(&self) -> Option<KeySpec> {
        Some(KeySpec {
            min_size: KEY_SIZE,
            default_size: KEY_SIZE,
            max_size: KEY_SIZE,
            blob_magic: [0xDE, 0x61, 0x44, 0xDE],
            blob_output_size: TAG_SIZE as u16,
            asymmetric: None,
        })
    }
}

impl Aead for Aes256Gcm {
    fn key_size(&self) -> usize {
        KEY_SIZE
    }

    fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    fn tag_size(&self) -> usize {
        TAG_SIZE
    }

    fn encrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        key.check_algorithm(self.id())?;
        check_nonce(nonce, NONCE_SIZE)?;
        seal::<aes_gcm::Aes256Gcm>(key.secret_bytes()?, nonce, aad, plaintext)
    }

    fn decrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        key.check_algorithm(self.id())?;
        check_nonce(nonce, NONCE_SIZE)?;
        check_ciphertext(ciphertext, TAG_SIZE)?;
        open::<aes_gcm::Aes256Gcm>(key.secret_bytes()?, nonce, aad, ciphertext)
    }
}

/// ChaCha20-Poly1305 (RFC 8439).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20Poly1305;

static CHACHA20_POLY1305_CHECKED: AtomicBool = AtomicBool::new(false);

impl ChaCha20Poly1305 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &CHACHA20_POLY1305_CHECKED,
            "chacha20-poly1305",
            engine_sizes_match::<chacha20poly1305::ChaCha20Poly1305>(
                KEY_SIZE, NONCE_SIZE, TAG_SIZE,
            ),
        );
        Self
    }
}

impl Algorithm for ChaCha20Poly1305 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::ChaCha20Poly1305
    }

    fn key_spec(&self) -> Option<KeySpec> {
        Some(KeySpec {
            min_size: KEY_SIZE,
            default_size: KEY_SIZE,
            max_size: KEY_SIZE,
            blob_magic: [0xDE, 0x61, 0x43, 0xDE],
            blob_output_size: TAG_SIZE as u16,
            asymmetric: None,
        })
    }
}

impl Aead for ChaCha20Poly1305 {
    fn key_size(&self) -> usize {
        KEY_SIZE
    }

    fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    fn tag_size(&self) -> usize {
        TAG_SIZE
    }

    fn encrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, Error> {
        key.check_algorithm(self.id())?;
        check_nonce(nonce, NONCE_SIZE)?;
        seal::<chacha20poly1305::ChaCha20Poly1305>(key.secret_bytes()?, nonce, aad, plaintext)
    }

    fn decrypt(
        &self,
        key: &Key,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        key.check_algorithm(self.id())?;
        check_nonce(nonce, NONCE_SIZE)?;
        check_ciphertext(ciphertext, TAG_SIZE)?;
        open::<chacha20poly1305::ChaCha20Poly1305>(key.secret_bytes()?, nonce, aad, ciphertext)
    }
}

fn check_nonce(nonce: &[u8], expected: usize) -> Result<(), Error> {
    if nonce.len() != expected {
        return Err(Error::InvalidSize {
            what: "nonce",
            expected: expected.to_string(),
            got: nonce.len(),
        });
    }
    Ok(())
}

fn check_ciphertext(ciphertext: &[u8], tag_size: usize) -> Result<(), Error> {
    if ciphertext.len() < tag_size {
        return Err(Error::InvalidSize {
            what: "ciphertext",
            expected: format!(">= {tag_size}"),
            got: ciphertext.len(),
        });
    }
    Ok(())
}

fn seal<E: AeadOp + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, Error> {
    let cipher = E::new_from_slice(key).map_err(|_| Error::Crypto)?;
    cipher
        .encrypt(
            Nonce::<E>::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| Error::Crypto)
}

fn open<E: AeadOp + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let cipher = E::new_from_slice(key).map_err(|_| Error::Crypto)?;
    cipher
        .decrypt(
            Nonce::<E>::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| Error::Crypto)
}

/// Queries the engine's accepted sizes instead of trusting it blindly.
fn engine_sizes_match<E: AeadOp + KeyInit>(
    key_size: usize,
    nonce_size: usize,
    tag_size: usize,
) -> bool {
    if Nonce::<E>::default().len() != nonce_size {
        return false;
    }
    let zero_key = vec![0u8; key_size];
    if E::new_from_slice(&zero_key[..key_size - 1]).is_ok() {
        return false;
    }
    let cipher = match E::new_from_slice(&zero_key) {
        Ok(cipher) => cipher,
        Err(_) => return false,
    };
    match cipher.encrypt(&Nonce::<E>::default(), Payload { msg: &[], aad: &[] }) {
        Ok(ciphertext) => ciphertext.len() == tag_size,
        Err(_) => false,
    }
}

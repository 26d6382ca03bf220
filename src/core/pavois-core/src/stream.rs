//! Unauthenticated stream ciphers.

use std::sync::atomic::AtomicBool;

use chacha20::cipher::{KeyIvInit, StreamCipher as StreamCipherOp};

use crate::algorithm::{engine_self_check, Algorithm, AlgorithmId, KeySpec};
use crate::error::Error;
use crate::key::Key;

/// ChaCha20 key size in bytes.
pub const CHACHA20_KEY_SIZE: usize = 32;
/// ChaCha20 nonce size in bytes (IETF variant).
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// An unauthenticated stream cipher.
///
/// Stream ciphers provide no integrity whatsoever; a flipped
/// ciphertext bit flips the same plaintext bit silently. Reach for an
/// [`AeadAlgorithm`](crate::aead::Aead) unless a protocol specifically
/// demands raw keystream XOR.
pub trait StreamCipherAlgorithm: Algorithm {
    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// XORs `data` with the keystream for `key` and `nonce`.
    ///
    /// Applying the same call twice restores the original bytes.
    ///
    /// # Errors
    ///
    /// [`Error::AlgorithmMismatch`] if `key` belongs to another
    /// algorithm, [`Error::InvalidSize`] for a wrong nonce length,
    /// [`Error::Disposed`] if the key has been released.
    fn xor(&self, key: &Key, nonce: &[u8], data: &[u8]) -> Result<Vec<u8>, Error>;
}

/// ChaCha20 (RFC 8439, IETF nonce).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChaCha20;

static CHACHA20_CHECKED: AtomicBool = AtomicBool::new(false);

impl ChaCha20 {
    /// Creates the descriptor, running the engine self-check once per
    /// process.
    pub fn new() -> Self {
        engine_self_check(
            &CHACHA20_CHECKED,
            "chacha20",
            chacha20::ChaCha20::new_from_slices(
                &[0u8; CHACHA20_KEY_SIZE],
                &[0u8; CHACHA20_NONCE_SIZE],
            )
            .is_ok()
                && chacha20::ChaCha20::new_from_slices(&[0u8; CHACHA20_KEY_SIZE], &[0u8; 8])
                    .is_err(),
        );
        Self
    }
}

impl Algorithm for ChaCha20 {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::ChaCha20
    }

    fn key_spec(&self) -> Option<KeySpec> {
        Some(KeySpec {
            min_size: CHACHA20_KEY_SIZE,
            default_size: CHACHA20_KEY_SIZE,
            max_size: CHACHA20_KEY_SIZE,
            blob_magic: [0xDE, 0x60, 0x43, 0xDE],
            blob_output_size: 0,
            asymmetric: None,
        })
    }
}

impl StreamCipherAlgorithm for ChaCha20 {
    fn key_size(&self) -> usize {
        CHACHA20_KEY_SIZE
    }

    fn nonce_size(&self) -> usize {
        CHACHA20_NONCE_SIZE
    }

    fn xor(&self, key: &Key, nonce: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        key.check_algorithm(AlgorithmId::ChaCha20)?;
        if nonce.len() != CHACHA20_NONCE_SIZE {
            return Err(Error::InvalidSize {
                what: "nonce",
                expected: CHACHA20_NONCE_SIZE.to_string(),
                got: nonce.len(),
            });
        }
        let mut cipher = chacha20::ChaCha20::new_from_slices(key.secret_bytes()?, nonce)
            .map_err(|_| Error::Crypto)?;
        let mut out = data.to_vec();
        cipher.apply_keystream(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::key::ExportPolicy;

    #[test]
    fn test_xor_twice_restores_plaintext() {
        let cipher = ChaCha20::new();
        let key = Key::generate(&cipher, ExportPolicy::None).unwrap();
        let nonce = [7u8; 12];
        let masked = cipher.xor(&key, &nonce, b"counter-mode payload").unwrap();
        assert_ne!(masked.as_slice(), b"counter-mode payload");
        let restored = cipher.xor(&key, &nonce, &masked).unwrap();
        assert_eq!(restored.as_slice(), b"counter-mode payload");
    }

    #[test]
    fn test_rfc8439_keystream_vector() {
        // RFC 8439 §2.3.2: key 00..1f, nonce 000000090000004a00000000,
        // block counter 1. The counter here starts at 0, so the
        // vector's block is the second 64 bytes of keystream.
        let cipher = ChaCha20::new();
        let key_bytes: Vec<u8> = (0u8..32).collect();
        let key = Key::import(
            &cipher,
            &key_bytes,
            crate::format::KeyBlobFormat::RawSymmetricKey,
            ExportPolicy::None,
        )
        .unwrap();
        let nonce = [0, 0, 0, 9, 0, 0, 0, 0x4a, 0, 0, 0, 0];
        let keystream = cipher.xor(&key, &nonce, &[0u8; 128]).unwrap();
        assert_eq!(
            hex::encode(&keystream[64..96]),
            "10f1e7e4d13b5915500fdd1fa32071c4c7d1f4c733c068030422aa9ac3d46c4e"
        );
    }

    #[test]
    fn test_nonce_changes_keystream() {
        let cipher = ChaCha20::new();
        let key = Key::generate(&cipher, ExportPolicy::None).unwrap();
        let a = cipher.xor(&key, &[1u8; 12], &[0u8; 64]).unwrap();
        let b = cipher.xor(&key, &[2u8; 12], &[0u8; 64]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_nonce_length_is_rejected() {
        let cipher = ChaCha20::new();
        let key = Key::generate(&cipher, ExportPolicy::None).unwrap();
        assert!(matches!(
            cipher.xor(&key, &[0u8; 8], b"data"),
            Err(Error::InvalidSize { .. })
        ));
        assert!(matches!(
            cipher.xor(&key, &[0u8; 16], b"data"),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let cipher = ChaCha20::new();
        let key = Key::generate(&cipher, ExportPolicy::None).unwrap();
        assert!(cipher.xor(&key, &[0u8; 12], b"").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let key = Key::generate(&crate::mac::HmacSha256::new(), ExportPolicy::None).unwrap();
        assert!(matches!(
            ChaCha20::new().xor(&key, &[0u8; 12], b"data"),
            Err(Error::AlgorithmMismatch { .. })
        ));
    }
}

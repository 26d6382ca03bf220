//! Error types for key lifecycle and cryptographic operations.
//!
//! Expected, data-dependent failures are reported through [`Error`].
//! Programming misuse (mutating a frozen secure buffer, an engine
//! self-check mismatch) is not: those panic, because no caller can
//! meaningfully recover from them.

use thiserror::Error;

use crate::algorithm::AlgorithmId;
use crate::format::KeyBlobFormat;

/// Errors that can occur during key lifecycle and cryptographic operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested key blob format is not supported by the algorithm.
    #[error("key blob format not supported by this algorithm: {0}")]
    UnsupportedFormat(KeyBlobFormat),

    /// An argument does not have the size the algorithm expects.
    #[error("invalid size for {what}: expected {expected}, got {got}")]
    InvalidSize {
        /// Which argument had the wrong size.
        what: &'static str,
        /// The expected size or bound, e.g. `"32"` or `"16..=64"`.
        expected: String,
        /// The size that was supplied.
        got: usize,
    },

    /// A key created under a different algorithm was supplied.
    #[error("key algorithm mismatch: expected {expected}, got {got}")]
    AlgorithmMismatch {
        /// The algorithm the operation belongs to.
        expected: AlgorithmId,
        /// The algorithm the key was created under.
        got: AlgorithmId,
    },

    /// The algorithm does not use keys.
    #[error("algorithm {0} does not use keys")]
    KeylessAlgorithm(AlgorithmId),

    /// A key blob could not be decoded.
    #[error("bad key blob: {0}")]
    BadFormat(String),

    /// A cryptographic operation failed.
    ///
    /// Deliberately carries no detail: distinguishing *why* a ciphertext
    /// or signature was rejected would hand an oracle to an attacker.
    #[error("cryptographic operation failed")]
    Crypto,

    /// The key's export policy forbids this export.
    #[error("export not permitted by the key's export policy")]
    ExportForbidden,

    /// The key has been disposed.
    #[error("key has been disposed")]
    Disposed,
}

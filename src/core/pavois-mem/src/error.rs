//! Secure memory error types.

use thiserror::Error;

/// Errors that can occur when accessing a secure memory container.
#[derive(Debug, Error)]
pub enum MemError {
    /// The container has already been released.
    #[error("secure buffer has been released")]
    Released,

    /// The destination buffer is too small for the container's content.
    #[error("destination too small: need {needed} bytes, got {got}")]
    DestinationTooSmall {
        /// Number of bytes the container holds.
        needed: usize,
        /// Number of bytes the caller provided.
        got: usize,
    },
}

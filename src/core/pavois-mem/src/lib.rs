//! # Pavois Mem
//!
//! Secure memory container for secret key material.
//!
//! [`SecretBuffer`] owns a single fixed-size heap region that:
//!
//! - never lives inside a growable collection (no reallocation can leave
//!   stale copies of key bytes behind),
//! - can be frozen so the content becomes read-only for the rest of its life,
//! - is overwritten with zeros before the memory is returned to the
//!   allocator, on every path including drop.
//!
//! Release is idempotent: calling [`SecretBuffer::release`] twice, or
//! releasing and then dropping, is safe. Reading after release fails with
//! [`MemError::Released`]; writing after [`SecretBuffer::freeze`] is a
//! programming error and panics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

pub use error::MemError;

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// An owned, zero-on-release container for secret bytes.
pub struct SecretBuffer {
    region: Option<Box<[u8]>>,
    len: usize,
    frozen: bool,
}

impl SecretBuffer {
    /// Allocates a zero-filled, writable container of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            region: Some(vec![0u8; len].into_boxed_slice()),
            len,
            frozen: false,
        }
    }

    /// Allocates a container of `len` bytes filled from the OS CSPRNG.
    pub fn random(len: usize) -> Self {
        let mut buffer = Self::zeroed(len);
        if let Some(region) = buffer.region.as_mut() {
            OsRng.fill_bytes(region);
        }
        buffer
    }

    /// Allocates a container holding a copy of `bytes`.
    ///
    /// The caller keeps ownership of the source slice and is responsible
    /// for clearing it once the copy has been made.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            region: Some(bytes.to_vec().into_boxed_slice()),
            len: bytes.len(),
            frozen: false,
        }
    }

    /// Returns the declared size of the container in bytes.
    ///
    /// The size stays valid after release; only the content goes away.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the container was declared with size zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` once the container has been released.
    pub fn is_released(&self) -> bool {
        self.region.is_none()
    }

    /// Returns `true` once the container has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Makes the content read-only for the rest of the container's life.
    ///
    /// After this point the content can be read and exported but never
    /// mutated in place; [`SecretBuffer::expose_mut`] panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Borrows the content for reading.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::Released`] if the container has been released.
    pub fn expose(&self) -> Result<&[u8], MemError> {
        self.region.as_deref().ok_or(MemError::Released)
    }

    /// Borrows the content for writing.
    ///
    /// # Panics
    ///
    /// Panics if the container has been frozen; mutating a frozen container
    /// is a bug in the caller, not a recoverable condition.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::Released`] if the container has been released.
    pub fn expose_mut(&mut self) -> Result<&mut [u8], MemError> {
        assert!(
            !self.frozen,
            "attempted to mutate a frozen secure buffer"
        );
        self.region.as_deref_mut().ok_or(MemError::Released)
    }

    /// Copies the full content into `dest`.
    ///
    /// Only the first `len()` bytes of `dest` are written.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::Released`] if released, or
    /// [`MemError::DestinationTooSmall`] if `dest` is shorter than the
    /// container.
    pub fn export_into(&self, dest: &mut [u8]) -> Result<(), MemError> {
        let content = self.expose()?;
        if dest.len() < content.len() {
            return Err(MemError::DestinationTooSmall {
                needed: content.len(),
                got: dest.len(),
            });
        }
        dest[..content.len()].copy_from_slice(content);
        Ok(())
    }

    /// Zeroes the content and returns the memory to the allocator.
    ///
    /// Idempotent; releasing an already-released container is a no-op.
    pub fn release(&mut self) {
        if let Some(mut region) = self.region.take() {
            region.zeroize();
        }
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.len)
            .field("frozen", &self.frozen)
            .field("released", &self.is_released())
            .field("content", &"[REDACTED]")
            .finish()
    }
}

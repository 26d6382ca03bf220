//! # Pavois Core
//!
//! Misuse-resistant key lifecycle and operations over audited
//! cryptographic primitives.
//!
//! Every algorithm is a small descriptor struct implementing
//! [`Algorithm`] plus one capability trait per operation family:
//!
//! - [`aead::Aead`]: authenticated encryption (AES-256-GCM,
//!   ChaCha20-Poly1305)
//! - [`hash::HashAlgorithm`]: SHA-256, SHA-512, BLAKE2b
//! - [`mac::MacAlgorithm`]: HMAC-SHA-256/512, keyed BLAKE2b
//! - [`sig::SignatureAlgorithm`]: Ed25519
//! - [`agree::KeyAgreementAlgorithm`]: X25519
//! - [`kdf::KeyDerivationAlgorithm`]: HKDF-SHA-256/512
//! - [`stream::StreamCipherAlgorithm`]: ChaCha20
//! - [`pwhash::PasswordHashAlgorithm`]: Argon2id
//!
//! Key material lives in a [`Key`], which pins the algorithm at import
//! or generation time and refuses every operation under a different
//! one. Private material leaves the process only through
//! [`Key::export`], and only when the key was created with a policy
//! that allows it. Descriptor constructors probe the underlying engine
//! once per process and abort on disagreement, so a miscompiled or
//! substituted primitive never signs or encrypts anything.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod agree;
pub mod algorithm;
pub mod error;
pub mod format;
pub mod hash;
pub mod incremental;
pub mod kdf;
pub mod key;
pub mod mac;
pub mod pwhash;
pub mod sig;
pub mod stream;

pub use algorithm::{Algorithm, AlgorithmId};
pub use error::Error;
pub use format::KeyBlobFormat;
pub use key::{ExportPolicy, Key, PublicKey};

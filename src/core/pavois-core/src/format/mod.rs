//! Key blob encoding and decoding.
//!
//! Three families of interchange formats:
//!
//! - **raw**: the exact key bytes, no metadata; importing raw bytes for
//!   the wrong algorithm is undetectable here, by design.
//! - **tagged**: a self-describing blob with a per-algorithm magic
//!   constant and declared size fields, made to fail fast on accidental
//!   algorithm/format confusion.
//! - **PKIX**: standards-based DER envelopes for asymmetric keys, plus
//!   their Base64 text forms.
//!
//! Decoding is deterministic: input whose length or structure does not
//! match the target algorithm is rejected, never silently truncated or
//! padded.

mod pem;
mod pkix;
mod raw;
mod tagged;

use pavois_mem::SecretBuffer;

use crate::algorithm::{Algorithm, KeySpec};
use crate::error::Error;

/// Interchange formats for key blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyBlobFormat {
    /// Exact symmetric key bytes, no metadata.
    RawSymmetricKey,
    /// Exact private key bytes, no metadata.
    RawPrivateKey,
    /// Exact public key bytes, no metadata.
    RawPublicKey,
    /// Self-describing symmetric key blob with magic and size fields.
    TaggedSymmetricKey,
    /// Self-describing private key blob with magic and size fields.
    TaggedPrivateKey,
    /// Self-describing public key blob with magic and size fields.
    TaggedPublicKey,
    /// PKCS#8-shaped DER private key.
    PkixPrivateKey,
    /// SubjectPublicKeyInfo-shaped DER public key.
    PkixPublicKey,
    /// PEM text form of [`KeyBlobFormat::PkixPrivateKey`].
    PkixPrivateKeyText,
    /// PEM text form of [`KeyBlobFormat::PkixPublicKey`].
    PkixPublicKeyText,
}

impl KeyBlobFormat {
    /// Returns `true` if the format carries public material only.
    ///
    /// Public formats are exempt from the export policy.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            Self::RawPublicKey
                | Self::TaggedPublicKey
                | Self::PkixPublicKey
                | Self::PkixPublicKeyText
        )
    }

    /// Returns `true` if the format carries secret material.
    pub fn is_private(self) -> bool {
        !self.is_public()
    }
}

impl std::fmt::Display for KeyBlobFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RawSymmetricKey => "raw-symmetric-key",
            Self::RawPrivateKey => "raw-private-key",
            Self::RawPublicKey => "raw-public-key",
            Self::TaggedSymmetricKey => "tagged-symmetric-key",
            Self::TaggedPrivateKey => "tagged-private-key",
            Self::TaggedPublicKey => "tagged-public-key",
            Self::PkixPrivateKey => "pkix-private-key",
            Self::PkixPublicKey => "pkix-public-key",
            Self::PkixPrivateKeyText => "pkix-private-key-text",
            Self::PkixPublicKeyText => "pkix-public-key-text",
        };
        f.write_str(name)
    }
}

/// Encodes secret key material in a private-material format.
pub(crate) fn export_secret(
    spec: &KeySpec,
    secret: &[u8],
    format: KeyBlobFormat,
) -> Result<Vec<u8>, Error> {
    let symmetric = spec.asymmetric.is_none();
    match format {
        KeyBlobFormat::RawSymmetricKey if symmetric => Ok(raw::export(secret)),
        KeyBlobFormat::RawPrivateKey if !symmetric => Ok(raw::export(secret)),
        KeyBlobFormat::TaggedSymmetricKey if symmetric => Ok(tagged::export(spec, secret)),
        KeyBlobFormat::TaggedPrivateKey if !symmetric => Ok(tagged::export(spec, secret)),
        KeyBlobFormat::PkixPrivateKey if !symmetric => Ok(pkix::export_private(spec, secret)),
        KeyBlobFormat::PkixPrivateKeyText if !symmetric => {
            Ok(pem::wrap_private(&pkix::export_private(spec, secret)))
        }
        _ => Err(Error::UnsupportedFormat(format)),
    }
}

/// Encodes public key bytes in a public-material format.
pub(crate) fn export_public(
    spec: &KeySpec,
    public: &[u8],
    format: KeyBlobFormat,
) -> Result<Vec<u8>, Error> {
    if spec.asymmetric.is_none() {
        return Err(Error::UnsupportedFormat(format));
    }
    match format {
        KeyBlobFormat::RawPublicKey => Ok(raw::export(public)),
        KeyBlobFormat::TaggedPublicKey => Ok(tagged::export_public(spec, public)),
        KeyBlobFormat::PkixPublicKey => Ok(pkix::export_public(spec, public)),
        KeyBlobFormat::PkixPublicKeyText => Ok(pem::wrap_public(&pkix::export_public(spec, public))),
        _ => Err(Error::UnsupportedFormat(format)),
    }
}

/// Decodes a private-material blob into a secure container, deriving the
/// public half for asymmetric algorithms.
pub(crate) fn import_secret(
    algorithm: &dyn Algorithm,
    spec: &KeySpec,
    blob: &[u8],
    format: KeyBlobFormat,
) -> Result<(SecretBuffer, Option<Vec<u8>>), Error> {
    let symmetric = spec.asymmetric.is_none();
    let secret = match format {
        KeyBlobFormat::RawSymmetricKey if symmetric => raw::import(spec, blob)?,
        KeyBlobFormat::RawPrivateKey if !symmetric => raw::import(spec, blob)?,
        KeyBlobFormat::TaggedSymmetricKey if symmetric => tagged::import(spec, blob)?,
        KeyBlobFormat::TaggedPrivateKey if !symmetric => tagged::import(spec, blob)?,
        KeyBlobFormat::PkixPrivateKey if !symmetric => pkix::import_private(spec, blob)?,
        KeyBlobFormat::PkixPrivateKeyText if !symmetric => {
            pkix::import_private(spec, &pem::unwrap_private(blob)?)?
        }
        _ => return Err(Error::UnsupportedFormat(format)),
    };
    let public = algorithm.derive_public_key(secret.expose().map_err(|_| Error::Crypto)?);
    Ok((secret, public))
}

/// Decodes a public-material blob into public key bytes.
pub(crate) fn import_public(
    spec: &KeySpec,
    blob: &[u8],
    format: KeyBlobFormat,
) -> Result<Vec<u8>, Error> {
    if spec.asymmetric.is_none() {
        return Err(Error::UnsupportedFormat(format));
    }
    match format {
        KeyBlobFormat::RawPublicKey => raw::import_public(spec, blob),
        KeyBlobFormat::TaggedPublicKey => tagged::import_public(spec, blob),
        KeyBlobFormat::PkixPublicKey => pkix::import_public(spec, blob),
        KeyBlobFormat::PkixPublicKeyText => pkix::import_public(spec, &pem::unwrap_public(blob)?),
        _ => Err(Error::UnsupportedFormat(format)),
    }
}

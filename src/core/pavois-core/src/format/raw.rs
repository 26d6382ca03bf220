//! Raw key blobs: the exact key bytes, nothing else.
//!
//! No metadata means no mismatch detection; raw is the
//! "I know what I'm doing" format.

use pavois_mem::SecretBuffer;

use crate::algorithm::KeySpec;
use crate::error::Error;

pub(super) fn export(bytes: &[u8]) -> Vec<u8> {
    bytes.to_vec()
}

pub(super) fn import(spec: &KeySpec, blob: &[u8]) -> Result<SecretBuffer, Error> {
    if blob.len() < spec.min_size || blob.len() > spec.max_size {
        return Err(Error::BadFormat(format!(
            "raw key length {} outside {}..={}",
            blob.len(),
            spec.min_size,
            spec.max_size
        )));
    }
    Ok(SecretBuffer::from_bytes(blob))
}

pub(super) fn import_public(spec: &KeySpec, blob: &[u8]) -> Result<Vec<u8>, Error> {
    let expected = spec
        .asymmetric
        .as_ref()
        .map(|a| a.public_key_size)
        .unwrap_or(0);
    if blob.len() != expected {
        return Err(Error::BadFormat(format!(
            "raw public key length {} != {expected}",
            blob.len()
        )));
    }
    Ok(blob.to_vec())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::algorithm::AsymmetricSpec;

    fn fixed_spec(size: usize) -> KeySpec {
        KeySpec {
            min_size: size,
            default_size: size,
            max_size: size,
            blob_magic: [0xDE, 0x00, 0x00, 0xDE],
            blob_output_size: 0,
            asymmetric: None,
        }
    }

    #[test]
    fn test_roundtrip() {
        let spec = fixed_spec(32);
        let key = [0x5Au8; 32];
        let blob = export(&key);
        let imported = import(&spec, &blob).unwrap();
        assert_eq!(imported.expose().unwrap(), &key);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let spec = fixed_spec(32);
        assert!(matches!(
            import(&spec, &[0u8; 31]),
            Err(Error::BadFormat(_))
        ));
        assert!(matches!(
            import(&spec, &[0u8; 33]),
            Err(Error::BadFormat(_))
        ));
    }

    #[test]
    fn test_accepts_bounded_range() {
        let spec = KeySpec {
            min_size: 16,
            max_size: 64,
            ..fixed_spec(32)
        };
        assert!(import(&spec, &[0u8; 16]).is_ok());
        assert!(import(&spec, &[0u8; 64]).is_ok());
        assert!(import(&spec, &[0u8; 15]).is_err());
        assert!(import(&spec, &[0u8; 65]).is_err());
    }

    #[test]
    fn test_public_key_length_is_exact() {
        let spec = KeySpec {
            asymmetric: Some(AsymmetricSpec {
                public_key_size: 32,
                oid: &[1, 3, 101, 112],
            }),
            ..fixed_spec(32)
        };
        assert!(import_public(&spec, &[0u8; 32]).is_ok());
        assert!(import_public(&spec, &[0u8; 31]).is_err());
    }
}

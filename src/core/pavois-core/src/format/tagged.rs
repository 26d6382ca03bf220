//! Self-describing key blobs.
//!
//! Layout: `[4-byte magic][u16 LE key size][u16 LE output size][key bytes]`.
//!
//! The magic constant is unique per algorithm and the declared sizes must
//! agree with both the payload and the target algorithm's expectations;
//! an import for the wrong algorithm fails on the first four bytes
//! instead of producing a silently wrong key.

use pavois_mem::SecretBuffer;

use crate::algorithm::KeySpec;
use crate::error::Error;

const HEADER_SIZE: usize = 8;

pub(super) fn export(spec: &KeySpec, secret: &[u8]) -> Vec<u8> {
    encode(spec, secret)
}

pub(super) fn export_public(spec: &KeySpec, public: &[u8]) -> Vec<u8> {
    encode(spec, public)
}

fn encode(spec: &KeySpec, payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len());
    blob.extend_from_slice(&spec.blob_magic);
    blob.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    blob.extend_from_slice(&spec.blob_output_size.to_le_bytes());
    blob.extend_from_slice(payload);
    blob
}

pub(super) fn import(spec: &KeySpec, blob: &[u8]) -> Result<SecretBuffer, Error> {
    let payload = decode(spec, blob)?;
    if payload.len() < spec.min_size || payload.len() > spec.max_size {
        return Err(Error::BadFormat(format!(
            "declared key size {} outside {}..={}",
            payload.len(),
            spec.min_size,
            spec.max_size
        )));
    }
    Ok(SecretBuffer::from_bytes(payload))
}

pub(super) fn import_public(spec: &KeySpec, blob: &[u8]) -> Result<Vec<u8>, Error> {
    let payload = decode(spec, blob)?;
    let expected = spec
        .asymmetric
        .as_ref()
        .map(|a| a.public_key_size)
        .unwrap_or(0);
    if payload.len() != expected {
        return Err(Error::BadFormat(format!(
            "declared public key size {} != {expected}",
            payload.len()
        )));
    }
    Ok(payload.to_vec())
}

/// Validates the header and returns the payload.
fn decode<'a>(spec: &KeySpec, blob: &'a [u8]) -> Result<&'a [u8], Error> {
    if blob.len() < HEADER_SIZE {
        return Err(Error::BadFormat(format!(
            "blob shorter than the {HEADER_SIZE}-byte header"
        )));
    }
    if blob[..4] != spec.blob_magic {
        return Err(Error::BadFormat("magic constant mismatch".into()));
    }
    let declared_size = usize::from(u16::from_le_bytes([blob[4], blob[5]]));
    let output_size = u16::from_le_bytes([blob[6], blob[7]]);
    if output_size != spec.blob_output_size {
        return Err(Error::BadFormat(format!(
            "declared output size {output_size} != {}",
            spec.blob_output_size
        )));
    }
    let payload = &blob[HEADER_SIZE..];
    if payload.len() != declared_size {
        return Err(Error::BadFormat(format!(
            "declared key size {declared_size} != payload length {}",
            payload.len()
        )));
    }
    Ok(payload)
}

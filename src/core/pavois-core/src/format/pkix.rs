//! PKIX-style DER key envelopes.
//!
//! Private keys use the PKCS#8 shape:
//! `SEQUENCE { INTEGER 0, SEQUENCE { OID }, OCTET STRING { OCTET STRING key } }`,
//! the raw key nested inside a DER octet string that is itself the
//! content of the outer octet string.
//!
//! Public keys use the SubjectPublicKeyInfo shape:
//! `SEQUENCE { SEQUENCE { OID }, BIT STRING key }`.

use pavois_asn1::{Asn1Reader, Asn1Writer, Oid};
use pavois_mem::SecretBuffer;
use zeroize::Zeroize;

use crate::algorithm::{AsymmetricSpec, KeySpec};
use crate::error::Error;

fn algorithm_oid(spec: &KeySpec) -> (Oid, &AsymmetricSpec) {
    let asym = spec
        .asymmetric
        .as_ref()
        .expect("PKIX formats require an asymmetric algorithm");
    let oid = Oid::new(asym.oid).expect("compiled-in OID is well-formed");
    (oid, asym)
}

pub(super) fn export_private(spec: &KeySpec, secret: &[u8]) -> Vec<u8> {
    let (oid, _) = algorithm_oid(spec);

    // The inner octet string holds the secret; scrub it once embedded.
    let mut inner = Asn1Writer::new();
    inner.octet_string(secret);
    let mut inner_bytes = inner
        .finish()
        .expect("key envelopes stay below the DER length limit");

    let mut writer = Asn1Writer::new();
    writer.sequence(|w| {
        w.integer(0);
        w.sequence(|w| w.object_identifier(&oid));
        w.octet_string(&inner_bytes);
    });
    inner_bytes.zeroize();
    writer
        .finish()
        .expect("key envelopes stay below the DER length limit")
}

pub(super) fn export_public(spec: &KeySpec, public: &[u8]) -> Vec<u8> {
    let (oid, _) = algorithm_oid(spec);
    let mut writer = Asn1Writer::new();
    writer.sequence(|w| {
        w.sequence(|w| w.object_identifier(&oid));
        w.bit_string(public);
    });
    writer
        .finish()
        .expect("key envelopes stay below the DER length limit")
}

pub(super) fn import_private(spec: &KeySpec, blob: &[u8]) -> Result<SecretBuffer, Error> {
    let (oid, _) = algorithm_oid(spec);

    let mut reader = Asn1Reader::new(blob);
    reader.begin_sequence();
    let version = reader.integer32();
    reader.begin_sequence();
    let blob_oid = reader.object_identifier().to_vec();
    reader.end();
    let inner = reader.octet_string();
    reader.end();

    let mut inner_reader = Asn1Reader::new(inner);
    let key = inner_reader.octet_string();

    if !reader.success_complete() || !inner_reader.success_complete() {
        return Err(Error::BadFormat("malformed DER private key".into()));
    }
    if version != 0 {
        return Err(Error::BadFormat(format!(
            "unsupported private key version {version}"
        )));
    }
    if blob_oid != oid.to_der_content() {
        return Err(Error::BadFormat("algorithm identifier mismatch".into()));
    }
    if key.len() < spec.min_size || key.len() > spec.max_size {
        return Err(Error::BadFormat(format!(
            "private key length {} outside {}..={}",
            key.len(),
            spec.min_size,
            spec.max_size
        )));
    }
    Ok(SecretBuffer::from_bytes(key))
}

pub(super) fn import_public(spec: &KeySpec, blob: &[u8]) -> Result<Vec<u8>, Error> {
    let (oid, asym) = algorithm_oid(spec);

    let mut reader = Asn1Reader::new(blob);
    reader.begin_sequence();
    reader.begin_sequence();
    let blob_oid = reader.object_identifier().to_vec();
    reader.end();
    let key = reader.bit_string();
    reader.end();

    if !reader.success_complete() {
        return Err(Error::BadFormat("malformed DER public key".into()));
    }
    if blob_oid != oid.to_der_content() {
        return Err(Error::BadFormat("algorithm identifier mismatch".into()));
    }
    if key.len() != asym.public_key_size {
        return Err(Error::BadFormat(format!(
            "public key length {} != {}",
            key.len(),
            asym.public_key_size
        )));
    }
    Ok(key.to_vec())
}

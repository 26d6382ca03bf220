//! # Pavois ASN.1
//!
//! Minimal DER encoder/decoder for the PKIX key blob formats.
//!
//! This is not a general ASN.1 library. It covers exactly the subset the
//! key formatters need (sequences, small integers, object identifiers,
//! octet strings and bit strings) with two properties the formatters
//! rely on:
//!
//! - the reader reports malformed input through a poisoned state instead
//!   of unwinding, so format probing is a read-then-check-one-flag affair;
//! - the writer computes every length bottom-up, so the emitted encoding
//!   is always valid definite-length DER.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod oid;
pub mod reader;
pub mod writer;

pub use error::Asn1Error;
pub use oid::Oid;
pub use reader::Asn1Reader;
pub use writer::Asn1Writer;

/// DER universal tags used by the key formats.
pub(crate) mod tags {
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
}

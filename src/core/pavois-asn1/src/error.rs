//! DER codec error types.

use thiserror::Error;

/// Errors that can occur while handling DER values outside the reader.
///
/// The reader itself reports structural problems through its poisoned
/// state (see [`crate::Asn1Reader::success_complete`]) so that format
/// probing never has to unwind; this type covers the value-level cases.
#[derive(Debug, Error)]
pub enum Asn1Error {
    /// An object identifier could not be encoded or decoded.
    #[error("invalid object identifier: {0}")]
    InvalidOid(String),

    /// A value handed to the writer exceeds its two-byte length limit.
    #[error("value of {0} bytes exceeds the DER writer's length limit")]
    ValueTooLong(usize),
}

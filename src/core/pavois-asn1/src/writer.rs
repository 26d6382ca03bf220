//! DER writer.
//!
//! DER length prefixes must state the exact encoded size of their content,
//! so nested values are built innermost-first: a sequence renders its
//! content into a scratch writer, then emits the tag and the now-known
//! length in front of it.

use crate::error::Asn1Error;
use crate::oid::Oid;
use crate::tags;

/// Largest content length the writer encodes (two length bytes, the
/// reader's own limit). Key envelopes stay far below it.
const MAX_CONTENT_LEN: usize = 0xFFFF;

/// Builds a DER encoding value by value.
///
/// An oversized value marks the writer instead of panicking; the fault
/// surfaces when [`finish`](Self::finish) is called.
#[derive(Default)]
pub struct Asn1Writer {
    out: Vec<u8>,
    oversized: Option<usize>,
}

impl Asn1Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the writer and returns the encoded bytes.
    ///
    /// # Errors
    ///
    /// [`Asn1Error::ValueTooLong`] if any written value exceeded the
    /// two-byte length limit.
    pub fn finish(self) -> Result<Vec<u8>, Asn1Error> {
        match self.oversized {
            None => Ok(self.out),
            Some(len) => Err(Asn1Error::ValueTooLong(len)),
        }
    }

    /// Writes a SEQUENCE whose content is produced by `content`.
    pub fn sequence(&mut self, content: impl FnOnce(&mut Asn1Writer)) {
        let mut inner = Asn1Writer::new();
        content(&mut inner);
        if self.oversized.is_none() {
            self.oversized = inner.oversized;
        }
        self.write_tlv(tags::SEQUENCE, &inner.out);
    }

    /// Writes an INTEGER in its minimal two's-complement form.
    pub fn integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 3 {
            let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        self.write_tlv(tags::INTEGER, &bytes[start..]);
    }

    /// Writes an OBJECT IDENTIFIER.
    pub fn object_identifier(&mut self, oid: &Oid) {
        self.write_tlv(tags::OBJECT_IDENTIFIER, &oid.to_der_content());
    }

    /// Writes an OCTET STRING.
    pub fn octet_string(&mut self, content: &[u8]) {
        self.write_tlv(tags::OCTET_STRING, content);
    }

    /// Writes a BIT STRING with no unused bits.
    pub fn bit_string(&mut self, content: &[u8]) {
        let mut padded = Vec::with_capacity(content.len() + 1);
        padded.push(0);
        padded.extend_from_slice(content);
        self.write_tlv(tags::BIT_STRING, &padded);
    }

    fn write_tlv(&mut self, tag: u8, content: &[u8]) {
        if content.len() > MAX_CONTENT_LEN {
            self.oversized.get_or_insert(content.len());
            return;
        }
        self.out.push(tag);
        match content.len() {
            len @ 0..=0x7F => self.out.push(len as u8),
            len @ 0x80..=0xFF => {
                self.out.push(0x81);
                self.out.push(len as u8);
            }
            len => {
                self.out.push(0x82);
                self.out.push((len >> 8) as u8);
                self.out.push(len as u8);
            }
        }
        self.out.extend_from_slice(content);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::reader::Asn1Reader;

    #[test]
    fn test_write_integer_zero() {
        let mut writer = Asn1Writer::new();
        writer.integer(0);
        assert_eq!(writer.finish().unwrap(), vec![0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_write_integer_minimal() {
        let mut writer = Asn1Writer::new();
        writer.integer(256);
        assert_eq!(writer.finish().unwrap(), vec![0x02, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_write_negative_integer() {
        let mut writer = Asn1Writer::new();
        writer.integer(-1);
        assert_eq!(writer.finish().unwrap(), vec![0x02, 0x01, 0xFF]);
    }

    #[test]
    fn test_sequence_length_is_computed_bottom_up() {
        let mut writer = Asn1Writer::new();
        writer.sequence(|w| {
            w.integer(0);
            w.octet_string(&[0xAA; 4]);
        });
        let encoded = writer.finish().unwrap();
        // 3 bytes of integer + 6 bytes of octet string.
        assert_eq!(encoded[0], 0x30);
        assert_eq!(encoded[1], 9);
        assert_eq!(encoded.len(), 11);
    }

    #[test]
    fn test_long_form_length() {
        let mut writer = Asn1Writer::new();
        writer.octet_string(&[0x55; 200]);
        let encoded = writer.finish().unwrap();
        assert_eq!(&encoded[..3], &[0x04, 0x81, 200]);
        assert_eq!(encoded.len(), 203);
    }

    #[test]
    fn test_two_byte_length() {
        let mut writer = Asn1Writer::new();
        writer.octet_string(&[0x55; 0x1234]);
        let encoded = writer.finish().unwrap();
        assert_eq!(&encoded[..4], &[0x04, 0x82, 0x12, 0x34]);
    }

    #[test]
    fn test_bit_string_prepends_unused_bits_byte() {
        let mut writer = Asn1Writer::new();
        writer.bit_string(&[0xAB, 0xCD]);
        assert_eq!(writer.finish().unwrap(), vec![0x03, 0x03, 0x00, 0xAB, 0xCD]);
    }

    #[test]
    fn test_oversized_value_fails_at_finish() {
        let mut writer = Asn1Writer::new();
        writer.octet_string(&vec![0u8; 0x1_0000]);
        assert!(matches!(
            writer.finish(),
            Err(Asn1Error::ValueTooLong(0x1_0000))
        ));
    }

    #[test]
    fn test_oversized_value_inside_sequence_fails_at_finish() {
        let mut writer = Asn1Writer::new();
        writer.sequence(|w| {
            w.integer(0);
            w.octet_string(&vec![0u8; 0x1_0001]);
        });
        assert!(matches!(
            writer.finish(),
            Err(Asn1Error::ValueTooLong(0x1_0001))
        ));
    }

    #[test]
    fn test_largest_value_still_encodes() {
        let mut writer = Asn1Writer::new();
        writer.octet_string(&vec![0x55u8; 0xFFFF]);
        let encoded = writer.finish().unwrap();
        assert_eq!(&encoded[..4], &[0x04, 0x82, 0xFF, 0xFF]);
        assert_eq!(encoded.len(), 4 + 0xFFFF);
    }

    #[test]
    fn test_writer_reader_roundtrip() {
        let oid = Oid::new(&[1, 3, 101, 112]).unwrap();
        let mut writer = Asn1Writer::new();
        writer.sequence(|w| {
            w.integer(0);
            w.sequence(|w| w.object_identifier(&oid));
            w.octet_string(&[0x42; 32]);
        });
        let encoded = writer.finish().unwrap();

        let mut reader = Asn1Reader::new(&encoded);
        reader.begin_sequence();
        assert_eq!(reader.integer32(), 0);
        reader.begin_sequence();
        assert_eq!(reader.object_identifier(), oid.to_der_content().as_slice());
        reader.end();
        assert_eq!(reader.octet_string(), &[0x42; 32]);
        reader.end();
        assert!(reader.success_complete());
    }
}

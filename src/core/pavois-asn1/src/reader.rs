//! Forward-only DER reader.
//!
//! The reader never panics on malformed input. Any structural
//! inconsistency (wrong tag, length overrunning the enclosing value,
//! unterminated sequence) poisons the reader; every later call returns a
//! default value, and [`Asn1Reader::success_complete`] reports `false`.
//! This lets format-detection code probe a blob and check one flag at the
//! end instead of handling an error on every read.

use crate::oid::Oid;
use crate::tags;

/// A forward-only reader over a DER-encoded byte slice.
pub struct Asn1Reader<'a> {
    input: &'a [u8],
    cursor: usize,
    // End offsets of the open sequences, innermost last.
    ends: Vec<usize>,
    failed: bool,
}

impl<'a> Asn1Reader<'a> {
    /// Creates a reader over `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: 0,
            ends: Vec::new(),
            failed: false,
        }
    }

    /// Returns `true` if no structural error occurred and the whole input
    /// was consumed with every sequence closed.
    pub fn success_complete(&self) -> bool {
        !self.failed && self.ends.is_empty() && self.cursor == self.input.len()
    }

    /// Returns `true` if the reader has been poisoned by malformed input.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Opens a SEQUENCE and descends into it.
    pub fn begin_sequence(&mut self) {
        if let Some(content) = self.read_value(tags::SEQUENCE) {
            // Descend: the sequence's content becomes the current bound.
            let end = self.cursor;
            self.cursor = end - content.len();
            self.ends.push(end);
        }
    }

    /// Closes the innermost open SEQUENCE.
    ///
    /// Poisons the reader if content remains in the sequence or no
    /// sequence is open.
    pub fn end(&mut self) {
        match self.ends.pop() {
            Some(end) if end == self.cursor => {}
            _ => self.failed = true,
        }
    }

    /// Reads an INTEGER constrained to 32 bits. Returns 0 on failure.
    pub fn integer32(&mut self) -> i32 {
        let content = match self.read_value(tags::INTEGER) {
            Some(content) => content,
            None => return 0,
        };
        if content.is_empty() || content.len() > 4 || !is_minimal_integer(content) {
            self.failed = true;
            return 0;
        }

        let mut value: i32 = if content[0] & 0x80 != 0 { -1 } else { 0 };
        for &byte in content {
            value = (value << 8) | i32::from(byte);
        }
        value
    }

    /// Reads an OBJECT IDENTIFIER and returns its raw content bytes.
    /// Returns an empty slice on failure.
    pub fn object_identifier(&mut self) -> &'a [u8] {
        self.read_value(tags::OBJECT_IDENTIFIER).unwrap_or(&[])
    }

    /// Reads an OBJECT IDENTIFIER and decodes its arcs.
    pub fn oid(&mut self) -> Option<Oid> {
        let content = self.read_value(tags::OBJECT_IDENTIFIER)?;
        match Oid::from_der_content(content) {
            Ok(oid) => Some(oid),
            Err(_) => {
                self.failed = true;
                None
            }
        }
    }

    /// Reads an OCTET STRING. Returns an empty slice on failure.
    pub fn octet_string(&mut self) -> &'a [u8] {
        self.read_value(tags::OCTET_STRING).unwrap_or(&[])
    }

    /// Reads a BIT STRING with no unused bits and returns its bytes.
    /// Returns an empty slice on failure.
    pub fn bit_string(&mut self) -> &'a [u8] {
        let content = match self.read_value(tags::BIT_STRING) {
            Some(content) => content,
            None => return &[],
        };
        // First content byte counts unused trailing bits; only whole-byte
        // strings appear in the key formats.
        if content.is_empty() || content[0] != 0 {
            self.failed = true;
            return &[];
        }
        &content[1..]
    }

    /// Current read bound: the innermost sequence end, or the input end.
    fn bound(&self) -> usize {
        self.ends.last().copied().unwrap_or(self.input.len())
    }

    fn fail<T>(&mut self) -> Option<T> {
        self.failed = true;
        None
    }

    /// Reads one TLV with the expected tag, advancing past it, and returns
    /// the content bytes. Poisons the reader and returns `None` on any
    /// structural problem.
    fn read_value(&mut self, tag: u8) -> Option<&'a [u8]> {
        if self.failed {
            return None;
        }
        let bound = self.bound();
        if self.cursor >= bound || self.input[self.cursor] != tag {
            return self.fail();
        }
        let mut pos = self.cursor + 1;

        if pos >= bound {
            return self.fail();
        }
        let first = self.input[pos];
        pos += 1;

        let length = match first {
            0x00..=0x7F => usize::from(first),
            0x81 => {
                if pos >= bound {
                    return self.fail();
                }
                let len = usize::from(self.input[pos]);
                pos += 1;
                if len < 0x80 {
                    // Must use the short form.
                    return self.fail();
                }
                len
            }
            0x82 => {
                if pos + 1 >= bound {
                    return self.fail();
                }
                let len = usize::from(self.input[pos]) << 8 | usize::from(self.input[pos + 1]);
                pos += 2;
                if len < 0x100 {
                    return self.fail();
                }
                len
            }
            // Longer and indefinite forms never occur in the key formats.
            _ => return self.fail(),
        };

        if length > bound - pos {
            return self.fail();
        }

        let content = &self.input[pos..pos + length];
        self.cursor = pos + length;
        Some(content)
    }
}

/// DER integers must use the shortest representation.
fn is_minimal_integer(content: &[u8]) -> bool {
    if content.len() < 2 {
        return true;
    }
    !((content[0] == 0x00 && content[1] & 0x80 == 0)
        || (content[0] == 0xFF && content[1] & 0x80 != 0))
}

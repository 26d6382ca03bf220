//! Object identifier encoding per ITU-T X.690 (DER).
//!
//! Each arc is encoded big-endian base 128 with the high bit as a
//! continuation flag; the first two arcs are folded into a single value
//! as `first * 40 + second`.

use crate::error::Asn1Error;

/// Largest arc value supported (28 bits, four base-128 digits).
const MAX_ARC: u32 = 0x0FFF_FFFF;

/// An ASN.1 object identifier as a sequence of arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Creates an OID from its arc sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Asn1Error::InvalidOid`] if fewer than two arcs are given,
    /// the first arc is not 0, 1 or 2, or an arc exceeds 28 bits.
    pub fn new(arcs: &[u32]) -> Result<Self, Asn1Error> {
        if arcs.len() < 2 {
            return Err(Asn1Error::InvalidOid(
                "an OID needs at least two arcs".into(),
            ));
        }
        if arcs[0] > 2 {
            return Err(Asn1Error::InvalidOid(format!(
                "first arc must be 0, 1 or 2, got {}",
                arcs[0]
            )));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(Asn1Error::InvalidOid(format!(
                "second arc must be < 40 under arc {}, got {}",
                arcs[0], arcs[1]
            )));
        }
        if let Some(arc) = arcs.iter().find(|&&a| a > MAX_ARC) {
            return Err(Asn1Error::InvalidOid(format!("arc {arc} exceeds 28 bits")));
        }
        Ok(Self {
            arcs: arcs.to_vec(),
        })
    }

    /// Returns the arc sequence.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Encodes the OID as DER content bytes (tag and length not included).
    pub fn to_der_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_arc(self.arcs[0] * 40 + self.arcs[1], &mut out);
        for &arc in &self.arcs[2..] {
            encode_arc(arc, &mut out);
        }
        out
    }

    /// Decodes an OID from DER content bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Asn1Error::InvalidOid`] on empty input, a truncated final
    /// arc, a non-minimal leading byte, or an arc exceeding 28 bits.
    pub fn from_der_content(content: &[u8]) -> Result<Self, Asn1Error> {
        if content.is_empty() {
            return Err(Asn1Error::InvalidOid("empty OID content".into()));
        }

        let mut values = Vec::new();
        let mut cursor = 0;
        while cursor < content.len() {
            let (value, next) = decode_arc(content, cursor)?;
            values.push(value);
            cursor = next;
        }

        let folded = values[0];
        let (first, second) = match folded {
            0..=39 => (0, folded),
            40..=79 => (1, folded - 40),
            _ => (2, folded - 80),
        };

        let mut arcs = vec![first, second];
        arcs.extend_from_slice(&values[1..]);
        Ok(Self { arcs })
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{arc}")?;
        }
        Ok(())
    }
}

fn encode_arc(value: u32, out: &mut Vec<u8>) {
    if value & 0xFFE0_0000 != 0 {
        out.push(((value >> 21) & 0x7F) as u8 | 0x80);
    }
    if value & 0xFFFF_C000 != 0 {
        out.push(((value >> 14) & 0x7F) as u8 | 0x80);
    }
    if value & 0xFFFF_FF80 != 0 {
        out.push(((value >> 7) & 0x7F) as u8 | 0x80);
    }
    out.push((value & 0x7F) as u8);
}

fn decode_arc(content: &[u8], mut cursor: usize) -> Result<(u32, usize), Asn1Error> {
    if content[cursor] == 0x80 {
        return Err(Asn1Error::InvalidOid("non-minimal arc encoding".into()));
    }

    let mut value: u32 = 0;
    let mut digits = 0;
    loop {
        if cursor >= content.len() {
            return Err(Asn1Error::InvalidOid("truncated arc".into()));
        }
        let byte = content[cursor];
        cursor += 1;
        digits += 1;
        if digits > 4 {
            return Err(Asn1Error::InvalidOid("arc exceeds 28 bits".into()));
        }
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, cursor));
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_oid_encoding() {
        // id-Ed25519 = 1.3.101.112
        let oid = Oid::new(&[1, 3, 101, 112]).unwrap();
        assert_eq!(oid.to_der_content(), vec![0x2B, 0x65, 0x70]);
    }

    #[test]
    fn test_x25519_oid_encoding() {
        // id-X25519 = 1.3.101.110
        let oid = Oid::new(&[1, 3, 101, 110]).unwrap();
        assert_eq!(oid.to_der_content(), vec![0x2B, 0x65, 0x6E]);
    }

    #[test]
    fn test_multi_byte_arc_encoding() {
        // 1.2.840.113549 (RSA arc) exercises two- and three-digit arcs.
        let oid = Oid::new(&[1, 2, 840, 113549]).unwrap();
        assert_eq!(
            oid.to_der_content(),
            vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]
        );
    }

    #[test]
    fn test_roundtrip() {
        let oid = Oid::new(&[1, 3, 101, 112]).unwrap();
        let decoded = Oid::from_der_content(&oid.to_der_content()).unwrap();
        assert_eq!(decoded.arcs(), &[1, 3, 101, 112]);
    }

    #[test]
    fn test_roundtrip_multi_byte() {
        let oid = Oid::new(&[1, 2, 840, 113549, 1, 1, 11]).unwrap();
        let decoded = Oid::from_der_content(&oid.to_der_content()).unwrap();
        assert_eq!(decoded.arcs(), oid.arcs());
    }

    #[test]
    fn test_rejects_single_arc() {
        assert!(Oid::new(&[1]).is_err());
    }

    #[test]
    fn test_rejects_bad_first_arc() {
        assert!(Oid::new(&[3, 1]).is_err());
    }

    #[test]
    fn test_rejects_bad_second_arc() {
        assert!(Oid::new(&[1, 40]).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_arc() {
        // Continuation bit set on the final byte.
        assert!(Oid::from_der_content(&[0x2B, 0xE5]).is_err());
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(Oid::from_der_content(&[]).is_err());
    }

    #[test]
    fn test_display() {
        let oid = Oid::new(&[1, 3, 101, 112]).unwrap();
        assert_eq!(oid.to_string(), "1.3.101.112");
    }
}

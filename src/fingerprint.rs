//! Fingerprint derivation.
//!
//! A fingerprint is the compact summary stored in the filter in place of the
//! full identifier. Uniform distribution is all that matters here; this is
//! not a cryptographic hash.

use crc::{Crc, CRC_32_BZIP2};

use crate::identifier::Identifier;

/// CRC-32/BZIP2: poly 0x04C11DB7, init 0xFFFFFFFF, no reflection,
/// xorout 0xFFFFFFFF.
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Derive the 32-bit fingerprint of an identifier.
///
/// Pure and deterministic: the CRC-32/BZIP2 checksum of the big-endian bytes
/// of the identifier's low 32 bits (its last four byte groups).
#[must_use]
pub fn fingerprint(identifier: Identifier) -> u32 {
    CRC32.checksum(&identifier.low32().to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bzip2_check_value() {
        // Canonical check value for CRC-32/BZIP2 over "123456789".
        assert_eq!(CRC32.checksum(b"123456789"), 0xFC89_1918);
    }

    #[test]
    fn test_known_vector() {
        let id: Identifier = "11:22:33:44:55:66".parse().unwrap();
        assert_eq!(fingerprint(id), 1_144_124_523);
    }

    #[test]
    fn test_deterministic() {
        let id: Identifier = "de:ad:be:ef:00:01".parse().unwrap();
        assert_eq!(fingerprint(id), fingerprint(id));
    }

    #[test]
    fn test_high_bits_ignored() {
        // Only the last four byte groups participate.
        let a: Identifier = "00:00:33:44:55:66".parse().unwrap();
        let b: Identifier = "ff:ff:33:44:55:66".parse().unwrap();
        assert_eq!(fingerprint(a), fingerprint(b));
    }
}

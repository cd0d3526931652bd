//! 48-bit identifiers and their colon-separated wire format.
//!
//! Identifiers are opaque payloads; only the low 32 bits (the last four byte
//! groups) feed fingerprint derivation.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::Error;

/// Number of 2-hex-digit byte groups in the wire format.
const GROUPS: usize = 6;

/// A 48-bit identifier, written on the wire as six colon-separated
/// 2-hex-digit groups, e.g. `"11:22:33:44:55:66"`.
///
/// Parsing accepts upper- or lowercase hex; display renders lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(u64);

impl Identifier {
    /// Construct from a raw 48-bit value. Bits above 47 are discarded.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value & 0xFFFF_FFFF_FFFF)
    }

    /// The raw 48-bit value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// The low 32 bits (last four byte groups, big-endian), the only part
    /// that participates in fingerprinting.
    #[must_use]
    pub fn low32(self) -> u32 {
        self.0 as u32
    }

    /// Draw a pseudorandom identifier from the given generator.
    ///
    /// Test-exercise utility; the generator is injected so sequences are
    /// reproducible under a fixed seed.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_raw(rng.gen::<u64>())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut value: u64 = 0;
        let mut groups = 0;
        for group in s.split(':') {
            if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::MalformedIdentifier(s.to_string()));
            }
            // Length and digit checks above make this parse infallible.
            let byte = u8::from_str_radix(group, 16)
                .map_err(|_| Error::MalformedIdentifier(s.to_string()))?;
            value = (value << 8) | u64::from(byte);
            groups += 1;
        }
        if groups != GROUPS {
            return Err(Error::MalformedIdentifier(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

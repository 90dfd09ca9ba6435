//! Fixed-size op digests and their text encodings.
//!
//! A [`Digest`] is 256 bits. It prints as 64 lowercase hex symbols or as 43
//! symbols of the identifier alphabet (big-endian sextets; the last symbol's
//! two low bits must be zero). Abbreviated digests keep only a leading run of
//! bits and [`Digest::matches`] any full digest sharing that run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chain::HashAlgorithm;
use crate::error::ErrorCode;
use crate::op::Uuid;
use crate::op::uuid::{SYMBOLS, symbol_value};

/// Digest size in bytes.
pub const DIGEST_BYTES: usize = 32;
/// Digest size in bits.
pub const DIGEST_BITS: u16 = 256;
/// Length of the full hex form.
pub const HEX_LEN: usize = 64;
/// Length of the full base64 form.
pub const BASE64_LEN: usize = 43;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Text encoding used when printing a digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    Hex,
    #[default]
    Base64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from decoding digest text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The text length is not one the requested form accepts.
    #[error("digest text has {found} symbols, expected {expected}")]
    Length { found: usize, expected: &'static str },

    /// A symbol outside the encoding's alphabet.
    #[error("invalid digest symbol {symbol:?} at position {offset}")]
    BadSymbol { offset: usize, symbol: char },

    /// The final base64 symbol sets bits past the end of the digest.
    #[error("final base64 symbol {symbol:?} sets bits past the digest end")]
    Padding { symbol: char },
}

impl DigestError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::BadDigest
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// A full or abbreviated 256-bit digest.
///
/// Equality is exact: same bits, same length. Bits past the length are
/// always zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest {
    bytes: [u8; DIGEST_BYTES],
    bits: u16,
}

impl Digest {
    /// A full digest over raw hash output.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_BYTES]) -> Self {
        Self {
            bytes,
            bits: DIGEST_BITS,
        }
    }

    /// The SHA-256 digest of an identifier's text form.
    ///
    /// Used for type digests (`rga`) and chain seeds.
    #[must_use]
    pub fn of_uuid(uuid: &Uuid) -> Self {
        HashAlgorithm::Sha256.digest_uuid(uuid)
    }

    /// Decode a full digest from 64 hex or 43 base64 symbols.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] for any other length, a foreign symbol, or
    /// nonzero padding bits.
    pub fn from_text(text: &str) -> Result<Self, DigestError> {
        match text.len() {
            HEX_LEN => Self::from_hex(text),
            BASE64_LEN => Self::from_base64(text),
            found => Err(DigestError::Length {
                found,
                expected: "64 (hex) or 43 (base64)",
            }),
        }
    }

    /// Returns `true` if `text` is a well-formed full digest.
    #[must_use]
    pub fn valid(text: &str) -> bool {
        Self::from_text(text).is_ok()
    }

    /// Decode exactly 64 hex symbols (either case).
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] on a wrong length or a non-hex symbol.
    pub fn from_hex(text: &str) -> Result<Self, DigestError> {
        if text.len() != HEX_LEN {
            return Err(DigestError::Length {
                found: text.len(),
                expected: "64",
            });
        }
        Self::from_hex_prefix(text)
    }

    /// Decode exactly 43 base64 symbols.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] on a wrong length, a foreign symbol, or
    /// nonzero padding bits.
    pub fn from_base64(text: &str) -> Result<Self, DigestError> {
        if text.len() != BASE64_LEN {
            return Err(DigestError::Length {
                found: text.len(),
                expected: "43",
            });
        }
        Self::from_base64_prefix(text)
    }

    /// An abbreviated digest from 1 to 64 leading hex symbols.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] on an empty or over-long prefix, or a non-hex
    /// symbol.
    pub fn from_hex_prefix(text: &str) -> Result<Self, DigestError> {
        if text.is_empty() || text.len() > HEX_LEN {
            return Err(DigestError::Length {
                found: text.len(),
                expected: "1 to 64",
            });
        }
        let mut bytes = [0u8; DIGEST_BYTES];
        for (i, c) in text.chars().enumerate() {
            let nibble = c
                .to_digit(16)
                .and_then(|d| u8::try_from(d).ok())
                .ok_or(DigestError::BadSymbol {
                    offset: i,
                    symbol: c,
                })?;
            write_bits(&mut bytes, i * 4, 4, nibble);
        }
        Ok(Self {
            bytes,
            bits: prefix_bits(text.len(), 4),
        })
    }

    /// An abbreviated digest from 1 to 43 leading base64 symbols.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] on an empty or over-long prefix, a foreign
    /// symbol, or (for a full-length text) nonzero padding bits.
    pub fn from_base64_prefix(text: &str) -> Result<Self, DigestError> {
        if text.is_empty() || text.len() > BASE64_LEN {
            return Err(DigestError::Length {
                found: text.len(),
                expected: "1 to 43",
            });
        }
        let mut bytes = [0u8; DIGEST_BYTES];
        for (i, c) in text.chars().enumerate() {
            let sextet = u8::try_from(c)
                .ok()
                .and_then(symbol_value)
                .ok_or(DigestError::BadSymbol {
                    offset: i,
                    symbol: c,
                })?;
            if i == BASE64_LEN - 1 && sextet & 0b11 != 0 {
                return Err(DigestError::Padding { symbol: c });
            }
            write_bits(&mut bytes, i * 6, 6, sextet);
        }
        Ok(Self {
            bytes,
            bits: prefix_bits(text.len(), 6),
        })
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_BYTES] {
        &self.bytes
    }

    /// Number of significant leading bits (256 for a full digest).
    #[must_use]
    pub const fn bit_len(&self) -> u16 {
        self.bits
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.bits == DIGEST_BITS
    }

    /// Prefix relation: the shorter digest's bits lead the longer one.
    ///
    /// Symmetric. Two full digests match only when equal.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let bits = usize::from(self.bits.min(other.bits));
        let whole = bits / 8;
        if self.bytes[..whole] != other.bytes[..whole] {
            return false;
        }
        let rest = bits % 8;
        if rest == 0 {
            return true;
        }
        let mask = 0xffu8 << (8 - rest);
        (self.bytes[whole] ^ other.bytes[whole]) & mask == 0
    }

    /// Lowercase hex, one symbol per started nibble.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let len = usize::from(self.bits).div_ceil(4);
        (0..len)
            .map(|i| char::from(HEX[usize::from(read_bits(&self.bytes, i * 4, 4))]))
            .collect()
    }

    /// Base64 in the identifier alphabet, one symbol per started sextet.
    #[must_use]
    pub fn to_base64(&self) -> String {
        let len = usize::from(self.bits).div_ceil(6);
        (0..len)
            .map(|i| char::from(SYMBOLS[usize::from(read_bits(&self.bytes, i * 6, 6))]))
            .collect()
    }

    /// Text in the requested encoding.
    #[must_use]
    pub fn encode(&self, encoding: DigestEncoding) -> String {
        match encoding {
            DigestEncoding::Hex => self.to_hex(),
            DigestEncoding::Base64 => self.to_base64(),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            write!(f, "Digest({})", self.to_hex())
        } else {
            write!(f, "Digest({}/{})", self.to_hex(), self.bits)
        }
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

// ---------------------------------------------------------------------------
// Bit packing
// ---------------------------------------------------------------------------

fn prefix_bits(symbols: usize, width: usize) -> u16 {
    u16::try_from(symbols * width)
        .unwrap_or(DIGEST_BITS)
        .min(DIGEST_BITS)
}

/// Read `width` bits starting at bit `offset`, MSB first. Bits past the end
/// read as zero.
fn read_bits(bytes: &[u8; DIGEST_BYTES], offset: usize, width: usize) -> u8 {
    let mut out = 0u8;
    for bit in offset..offset + width {
        let set = bit < DIGEST_BYTES * 8 && bytes[bit / 8] & (0x80 >> (bit % 8)) != 0;
        out = (out << 1) | u8::from(set);
    }
    out
}

/// Write the low `width` bits of `value` at bit `offset`, MSB first. Bits past
/// the end are dropped.
fn write_bits(bytes: &mut [u8; DIGEST_BYTES], offset: usize, width: usize, value: u8) {
    for k in 0..width {
        let bit = offset + k;
        if bit >= DIGEST_BYTES * 8 {
            break;
        }
        if value & (1 << (width - 1 - k)) != 0 {
            bytes[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_HEX: &str = "97fa0525e009867adffe5e2c71f93057dfb8293c25c27292cd4caf230a0e39ec";
    const OK_BASE64: &str = "a~d59U09XcgV~athSV_lLyztAJlalcAIoKnk8ldEEUl";

    #[test]
    fn hex_and_base64_describe_the_same_bits() {
        let from_hex = Digest::from_hex(OK_HEX).expect("hex");
        let from_b64 = Digest::from_base64(OK_BASE64).expect("base64");
        assert_eq!(from_hex, from_b64);
        assert_eq!(from_hex.to_base64(), OK_BASE64);
        assert_eq!(from_b64.to_hex(), OK_HEX);
    }

    #[test]
    fn from_text_dispatches_on_length() {
        assert!(Digest::valid(OK_HEX));
        assert!(Digest::valid(OK_BASE64));
        assert!(Digest::valid(&OK_HEX.to_uppercase()));
        assert!(!Digest::valid(&OK_HEX[1..]));
        assert!(!Digest::valid(""));
    }

    #[test]
    fn rejects_padding_bits_in_last_symbol() {
        let mut bad = OK_BASE64.to_string();
        bad.replace_range(BASE64_LEN - 1.., "1");
        assert_eq!(Digest::from_text(&bad), Err(DigestError::Padding { symbol: '1' }));
    }

    #[test]
    fn rejects_foreign_symbols() {
        let mut bad = OK_HEX.to_string();
        bad.replace_range(3..4, "g");
        assert_eq!(
            Digest::from_text(&bad),
            Err(DigestError::BadSymbol { offset: 3, symbol: 'g' })
        );
        let mut bad = OK_BASE64.to_string();
        bad.replace_range(0..1, "+");
        assert!(matches!(Digest::from_text(&bad), Err(DigestError::BadSymbol { .. })));
    }

    #[test]
    fn partial_hex_matches() {
        let full = Digest::from_hex(OK_HEX).expect("hex");
        let short = Digest::from_hex_prefix("97fa").expect("prefix");
        assert!(full.matches(&short));
        assert!(short.matches(&full));
        assert_ne!(full, short);
        assert!(Digest::from_hex_prefix("97fA0525E").expect("prefix").matches(&full));
        assert!(Digest::from_hex_prefix("97fa0").expect("prefix").matches(&full));
        assert!(!Digest::from_hex_prefix("97fa1").expect("prefix").matches(&full));
    }

    #[test]
    fn partial_base64_matches() {
        let full = Digest::from_base64(OK_BASE64).expect("base64");
        let short = Digest::from_base64_prefix("a~d5").expect("prefix");
        assert_eq!(short.bit_len(), 24);
        assert!(short.matches(&full));
        assert!(!Digest::from_base64_prefix("a~d6").expect("prefix").matches(&full));
    }

    #[test]
    fn prefixes_print_their_own_length() {
        let short = Digest::from_hex_prefix("97f").expect("prefix");
        assert_eq!(short.to_hex(), "97f");
        assert!(!short.is_full());
        assert_eq!(format!("{short:?}"), "Digest(97f/12)");
    }

    #[test]
    fn of_uuid_is_deterministic() {
        let rga = Uuid::name("rga").expect("rga");
        let lww = Uuid::name("lww").expect("lww");
        assert_eq!(Digest::of_uuid(&rga), Digest::of_uuid(&rga));
        assert_ne!(Digest::of_uuid(&rga), Digest::of_uuid(&lww));
        assert!(Digest::of_uuid(&rga).is_full());
    }
}

//! Event identifiers.
//!
//! A [`Uuid`] is a pair of 60-bit words: a logical timestamp (`value`) and the
//! authoring yarn (`origin`), plus a scheme tag. Identifiers are totally
//! ordered by value, then origin, so any two replicas agree on their order
//! without coordination.
//!
//! # Text form
//!
//! ```text
//! value[scheme origin]        1+A   1i08e40003+path   rga   0
//! ```
//!
//! Each word is written in the 64-symbol alphabet [`SYMBOLS`], left-aligned
//! in 10 symbols with trailing zero symbols dropped. Scheme symbols are `$`
//! (name, the default when absent), `%` (hash), `+` (event) and `-`
//! (derived). A name identifier with a zero origin is written as its value
//! alone.

use std::fmt;
use std::str::FromStr;

/// The ordered 64-symbol alphabet shared by identifiers and base64 digests.
pub const SYMBOLS: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz~";

/// Symbols per 60-bit word.
pub const WORD_SYMBOLS: usize = 10;

const WORD_BITS: u32 = 60;
const WORD_MASK: u64 = (1 << WORD_BITS) - 1;

/// Decode one alphabet symbol to its 6-bit value.
#[must_use]
pub const fn symbol_value(symbol: u8) -> Option<u8> {
    match symbol {
        b'0'..=b'9' => Some(symbol - b'0'),
        b'A'..=b'Z' => Some(symbol - b'A' + 10),
        b'_' => Some(36),
        b'a'..=b'z' => Some(symbol - b'a' + 37),
        b'~' => Some(63),
        _ => None,
    }
}

/// Returns `true` for bytes that may appear inside an identifier token.
#[must_use]
pub const fn is_uuid_byte(byte: u8) -> bool {
    symbol_value(byte).is_some() || Scheme::from_symbol(byte).is_some()
}

// ---------------------------------------------------------------------------
// Scheme
// ---------------------------------------------------------------------------

/// How the two words of an identifier are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    /// A global or scoped name (`rga`, `rm`, `lww`).
    Name,
    /// A number or hash-derived value.
    Hash,
    /// A logical timestamp stamped by a yarn.
    Event,
    /// An identifier derived from an event.
    Derived,
}

impl Scheme {
    /// The separator symbol written between value and origin.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Name => '$',
            Self::Hash => '%',
            Self::Event => '+',
            Self::Derived => '-',
        }
    }

    const fn from_symbol(byte: u8) -> Option<Self> {
        match byte {
            b'$' => Some(Self::Name),
            b'%' => Some(Self::Hash),
            b'+' => Some(Self::Event),
            b'-' => Some(Self::Derived),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from parsing an identifier's text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UuidError {
    /// The text (or one of its words) is empty.
    #[error("identifier word is empty")]
    Empty,

    /// A word is longer than 10 symbols.
    #[error("identifier word '{0}' exceeds 10 symbols")]
    TooLong(String),

    /// A character outside the identifier alphabet.
    #[error("invalid identifier symbol {0:?}")]
    BadSymbol(char),
}

// ---------------------------------------------------------------------------
// Uuid
// ---------------------------------------------------------------------------

/// A globally comparable event identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid {
    value: u64,
    origin: u64,
    scheme: Scheme,
}

impl Uuid {
    /// The "nothing" identifier, also the causal root reference.
    pub const ZERO: Self = Self::new(0, 0, Scheme::Name);

    /// Sentinel for "not given, infer from context".
    ///
    /// [`crate::op::Builder::append_new`] replaces it with the previous op's
    /// id (for a ref) or that id's successor (for an id).
    pub const UNSPECIFIED: Self = Self::new(WORD_MASK, WORD_MASK, Scheme::Derived);

    /// Build an identifier from raw words. Bits above 60 are dropped.
    #[must_use]
    pub const fn new(value: u64, origin: u64, scheme: Scheme) -> Self {
        Self {
            value: value & WORD_MASK,
            origin: origin & WORD_MASK,
            scheme,
        }
    }

    /// An event identifier stamped by `origin`.
    #[must_use]
    pub const fn event(value: u64, origin: u64) -> Self {
        Self::new(value, origin, Scheme::Event)
    }

    /// A name identifier from its text (`"rga"`, `"rm"`).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError`] if `name` is not a single valid word.
    pub fn name(name: &str) -> Result<Self, UuidError> {
        Ok(Self::new(decode_word(name)?, 0, Scheme::Name))
    }

    /// Parse the text form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError`] for empty words, words over 10 symbols, or
    /// symbols outside the alphabet.
    pub fn parse(text: &str) -> Result<Self, UuidError> {
        let split = text.bytes().position(|b| Scheme::from_symbol(b).is_some());
        match split {
            None => Self::name(text),
            Some(at) => {
                let scheme = Scheme::from_symbol(text.as_bytes()[at]).unwrap_or(Scheme::Name);
                let value = decode_word(&text[..at])?;
                let origin = decode_word(&text[at + 1..])?;
                Ok(Self::new(value, origin, scheme))
            }
        }
    }

    /// The logical timestamp word.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The origin (yarn) word.
    #[must_use]
    pub const fn origin(&self) -> u64 {
        self.origin
    }

    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// The sequential successor: same origin and scheme, value plus one.
    ///
    /// Saturates at the largest 60-bit value.
    #[must_use]
    pub const fn inc(&self) -> Self {
        let value = if self.value == WORD_MASK {
            WORD_MASK
        } else {
            self.value + 1
        };
        Self::new(value, self.origin, self.scheme)
    }

    /// Returns `true` if the bare text form could be read as a number, so an
    /// atom holding this identifier needs the `>` prefix.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        let first = SYMBOLS[(self.value >> 54) as usize & 63];
        first.is_ascii_digit()
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, self.value)?;
        if self.scheme != Scheme::Name || self.origin != 0 {
            write!(f, "{}", self.scheme.symbol())?;
            write_word(f, self.origin)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uuid({self})")
    }
}

impl FromStr for Uuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode_word(text: &str) -> Result<u64, UuidError> {
    if text.is_empty() {
        return Err(UuidError::Empty);
    }
    if text.len() > WORD_SYMBOLS {
        return Err(UuidError::TooLong(text.to_string()));
    }
    let mut word = 0u64;
    for (i, byte) in text.bytes().enumerate() {
        let sym = symbol_value(byte).ok_or(UuidError::BadSymbol(char::from(byte)))?;
        word |= u64::from(sym) << (54 - 6 * i);
    }
    Ok(word)
}

fn write_word(f: &mut fmt::Formatter<'_>, word: u64) -> fmt::Result {
    let mut symbols = [b'0'; WORD_SYMBOLS];
    for (i, slot) in symbols.iter_mut().enumerate() {
        *slot = SYMBOLS[((word >> (54 - 6 * i)) & 63) as usize];
    }
    let len = symbols.iter().rposition(|&s| s != b'0').map_or(1, |p| p + 1);
    for &s in &symbols[..len] {
        write!(f, "{}", char::from(s))?;
    }
    Ok(())
}

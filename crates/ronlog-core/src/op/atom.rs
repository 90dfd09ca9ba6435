//! Op payload values and their text codec.

use std::fmt;

use super::uuid::Uuid;

/// A single payload value carried by an op.
///
/// Floats always print with a `.` or an exponent so they never read back as
/// integers. Non-finite floats have no text form and do not survive a
/// round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    String(String),
}

impl Atom {
    /// Shorthand for a string atom.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// The string payload, if this is a string atom.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The identifier payload, if this is a uuid atom.
    #[must_use]
    pub const fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            _ => None,
        }
    }
}

impl From<i64> for Atom {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Atom {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Uuid> for Atom {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<&str> for Atom {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Uuid(u) if u.is_ambiguous() => write!(f, ">{u}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::String(s) => {
                f.write_str("'")?;
                write_escaped(f, s)?;
                f.write_str("'")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// String escapes
// ---------------------------------------------------------------------------

/// Write `s` with quote, backslash and control characters escaped.
///
/// # Errors
///
/// Propagates errors from the underlying writer.
pub fn write_escaped<W: fmt::Write + ?Sized>(w: &mut W, s: &str) -> fmt::Result {
    for c in s.chars() {
        match c {
            '\'' => w.write_str("\\'")?,
            '\\' => w.write_str("\\\\")?,
            '\n' => w.write_str("\\n")?,
            '\r' => w.write_str("\\r")?,
            '\t' => w.write_str("\\t")?,
            '\0' => w.write_str("\\0")?,
            c if c.is_control() => write!(w, "\\u{{{:x}}}", u32::from(c))?,
            c => w.write_char(c)?,
        }
    }
    Ok(())
}

/// Decode the body of a quoted string (without the quotes).
///
/// Returns the byte offset of the offending escape on failure.
pub fn unescape(body: &str) -> Result<String, usize> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((at, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, esc)) = chars.next() else {
            return Err(at);
        };
        match esc {
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '/' => out.push('/'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'u' => {
                let rest = &body[at + 2..];
                let close = rest.find('}').ok_or(at)?;
                if !rest.starts_with('{') {
                    return Err(at);
                }
                let code = u32::from_str_radix(&rest[1..close], 16).map_err(|_| at)?;
                out.push(char::from_u32(code).ok_or(at)?);
                // skip "{...}"
                for _ in 0..=close {
                    chars.next();
                }
            }
            _ => return Err(at),
        }
    }
    Ok(out)
}

//! Decoding of `\uXXXX` escapes, including surrogate pairs.
//!
//! [`UnicodeEscapeBuffer`] accumulates four hex digits into one UTF-16 code
//! unit. [`SurrogatePair`] joins a high and a low unit into a scalar value.

use crate::parser::error::SyntaxError;

/// Accumulates exactly four hexadecimal digits into a UTF-16 code unit.
#[derive(Debug, Default)]
pub(crate) struct UnicodeEscapeBuffer {
    acc: u16,
    len: u8,
}

impl UnicodeEscapeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn hex_val(b: u8) -> Option<u16> {
        match b {
            b'0'..=b'9' => Some(u16::from(b - b'0')),
            b'a'..=b'f' => Some(u16::from(b - b'a' + 10)),
            b'A'..=b'F' => Some(u16::from(b - b'A' + 10)),
            _ => None,
        }
    }

    /// Feeds one digit; returns the code unit after the fourth and resets.
    pub fn feed(&mut self, b: u8) -> Result<Option<u16>, SyntaxError> {
        let d = Self::hex_val(b).ok_or(SyntaxError::InvalidUnicodeEscapeChar(char::from(b)))?;
        self.acc = (self.acc << 4) | d;
        self.len += 1;
        if self.len < 4 {
            return Ok(None);
        }
        let unit = self.acc;
        *self = Self::default();
        Ok(Some(unit))
    }

    /// Decodes the four digits at the start of `digits`.
    pub fn decode(digits: &[u8]) -> Result<u16, SyntaxError> {
        let mut buf = Self::new();
        for &b in digits.iter().take(4) {
            if let Some(unit) = buf.feed(b)? {
                return Ok(unit);
            }
        }
        Err(SyntaxError::UnterminatedString)
    }
}

/// What a code unit contributes to the decoded string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    /// A complete scalar value.
    Char(char),
    /// A high surrogate waiting for its low half.
    High(u16),
    /// A surrogate that cannot pair up.
    Lone,
}

/// Classifies `unit`, joining it with a preceding high surrogate.
pub(crate) fn classify(high: Option<u16>, unit: u16) -> Unit {
    match (high, unit) {
        (Some(hi), 0xDC00..=0xDFFF) => {
            let c = 0x10000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
            char::from_u32(c).map_or(Unit::Lone, Unit::Char)
        }
        (_, 0xD800..=0xDBFF) => Unit::High(unit),
        (_, 0xDC00..=0xDFFF) => Unit::Lone,
        (_, unit) => char::from_u32(u32::from(unit)).map_or(Unit::Lone, Unit::Char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_decoding() {
        let mut buf = UnicodeEscapeBuffer::new();
        assert_eq!(buf.feed(b'0').unwrap(), None);
        assert_eq!(buf.feed(b'0').unwrap(), None);
        assert_eq!(buf.feed(b'4').unwrap(), None);
        assert_eq!(buf.feed(b'1').unwrap(), Some(0x41));
    }

    #[test]
    fn mixed_case_hex() {
        assert_eq!(UnicodeEscapeBuffer::decode(b"AbCd").unwrap(), 0xABCD);
    }

    #[test]
    fn invalid_hex_error() {
        let mut buf = UnicodeEscapeBuffer::new();
        assert_eq!(buf.feed(b'G').unwrap_err(), SyntaxError::InvalidUnicodeEscapeChar('G'));
    }

    #[test]
    fn short_escape_is_unterminated() {
        assert_eq!(
            UnicodeEscapeBuffer::decode(b"12").unwrap_err(),
            SyntaxError::UnterminatedString
        );
    }

    #[test]
    fn surrogates_pair_up() {
        assert_eq!(classify(None, 0xD83D), Unit::High(0xD83D));
        assert_eq!(classify(Some(0xD83D), 0xDE00), Unit::Char('\u{1F600}'));
        assert_eq!(classify(None, 0xDE00), Unit::Lone);
        assert_eq!(classify(None, 0x00E9), Unit::Char('é'));
    }
}

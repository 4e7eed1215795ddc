//! Per-mode byte escape tables and the string codec built on them.
//!
//! Every string is measured first and written second, so the output buffer
//! grows at most once per string.

use crate::{Error, dump::buffer::OutputBuffer, options::EscapeMode};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// How a single input byte is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EscapeClass {
    /// Copied as is.
    Literal,
    /// Two-character escape such as `\n` or `\"`.
    Short,
    /// Six-character `\u00XX` escape.
    Unicode,
    /// Lead or continuation byte of a UTF-8 sequence that is decoded and
    /// written as `\uXXXX` (a surrogate pair above U+FFFF).
    Decode,
    /// Part of a UTF-8 sequence copied as is once validated.
    Passthrough,
    /// Like [`Passthrough`](Self::Passthrough), but U+2028 and U+2029 are
    /// written as escapes.
    LineSeparator,
}

/// An immutable 256-entry map from byte to [`EscapeClass`].
#[derive(Debug)]
pub struct EscapeTable([EscapeClass; 256]);

impl EscapeTable {
    /// The shared table for `mode`.
    #[must_use]
    pub fn for_mode(mode: EscapeMode) -> &'static Self {
        match mode {
            EscapeMode::Json => &JSON,
            EscapeMode::Newline => &NEWLINE,
            EscapeMode::Ascii => &ASCII,
            EscapeMode::Xss => &XSS,
            EscapeMode::JsonXss | EscapeMode::Rails => &JSON_XSS,
        }
    }

    /// The class of `b`.
    #[inline]
    #[must_use]
    pub fn class(&self, b: u8) -> EscapeClass {
        self.0[usize::from(b)]
    }

    // '1' literal, '2' short, '6' \u00XX, '3' decode, '4' passthrough,
    // '8' line separator lead byte.
    const fn build(rows: &str) -> Self {
        let src = rows.as_bytes();
        assert!(src.len() == 256, "escape table needs 256 entries");
        let mut table = [EscapeClass::Literal; 256];
        let mut i = 0;
        while i < 256 {
            table[i] = match src[i] {
                b'1' => EscapeClass::Literal,
                b'2' => EscapeClass::Short,
                b'6' => EscapeClass::Unicode,
                b'3' => EscapeClass::Decode,
                b'4' => EscapeClass::Passthrough,
                b'8' => EscapeClass::LineSeparator,
                _ => panic!("unknown escape class"),
            };
            i += 1;
        }
        Self(table)
    }
}

#[rustfmt::skip]
static JSON: EscapeTable = EscapeTable::build(concat!(
    "66666666222622666666666666666666",
    "11211111111111111111111111111111",
    "11111111111111111111111111112111",
    "11111111111111111111111111111111",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
));

#[rustfmt::skip]
static NEWLINE: EscapeTable = EscapeTable::build(concat!(
    "66666666221622666666666666666666",
    "11211111111111111111111111111111",
    "11111111111111111111111111112111",
    "11111111111111111111111111111111",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
));

#[rustfmt::skip]
static ASCII: EscapeTable = EscapeTable::build(concat!(
    "66666666222622666666666666666666",
    "11211111111111111111111111111111",
    "11111111111111111111111111112111",
    "11111111111111111111111111111116",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
));

#[rustfmt::skip]
static XSS: EscapeTable = EscapeTable::build(concat!(
    "66666666222622666666666666666666",
    "11211161111111121111111111116161",
    "11111111111111111111111111112111",
    "11111111111111111111111111111116",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
    "33333333333333333333333333333333",
));

#[rustfmt::skip]
static JSON_XSS: EscapeTable = EscapeTable::build(concat!(
    "66666666222622666666666666666666",
    "11211161111111111111111111116161",
    "11111111111111111111111111112111",
    "11111111111111111111111111111111",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44444444444444444444444444444444",
    "44844444444444444444444444444444",
));

/// One unit of escaped output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Raw(&'a [u8]),
    Short(u8),
    Unit(u16),
}

impl Piece<'_> {
    fn len(self) -> usize {
        match self {
            Self::Raw(s) => s.len(),
            Self::Short(_) => 2,
            Self::Unit(_) => 6,
        }
    }

    fn write(self, out: &mut OutputBuffer) {
        match self {
            Self::Raw(s) => out.append_bytes(s),
            Self::Short(c) => out.append_bytes(&[b'\\', short_escape(c)]),
            Self::Unit(u) => out.append_bytes(&[
                b'\\',
                b'u',
                HEX[usize::from(u >> 12)],
                HEX[usize::from((u >> 8) & 0xF)],
                HEX[usize::from((u >> 4) & 0xF)],
                HEX[usize::from(u & 0xF)],
            ]),
        }
    }
}

fn short_escape(b: u8) -> u8 {
    match b {
        b'\x08' => b'b',
        b'\t' => b't',
        b'\n' => b'n',
        b'\x0c' => b'f',
        b'\r' => b'r',
        other => other,
    }
}

fn push_scalar<'a>(c: char, f: &mut impl FnMut(Piece<'a>)) {
    let mut units = [0u16; 2];
    for &unit in c.encode_utf16(&mut units).iter() {
        f(Piece::Unit(unit));
    }
}

/// Splits `bytes` into output pieces. With `escape_head` the first byte (which
/// must be ASCII) is forced into a `\u00XX` escape.
fn for_each_piece<'a>(
    bytes: &'a [u8],
    table: &EscapeTable,
    escape_head: bool,
    mut f: impl FnMut(Piece<'a>),
) -> Result<(), Error> {
    let mut i = 0;
    if let (true, Some(&b)) = (escape_head, bytes.first()) {
        f(Piece::Unit(u16::from(b)));
        i = 1;
    }
    let mut run = i;
    while i < bytes.len() {
        let b = bytes[i];
        let class = table.class(b);
        if class == EscapeClass::Literal {
            i += 1;
            continue;
        }
        if run < i {
            f(Piece::Raw(&bytes[run..i]));
        }
        match class {
            EscapeClass::Literal => {}
            EscapeClass::Short => {
                f(Piece::Short(b));
                i += 1;
            }
            EscapeClass::Unicode => {
                f(Piece::Unit(u16::from(b)));
                i += 1;
            }
            EscapeClass::Decode | EscapeClass::Passthrough | EscapeClass::LineSeparator => {
                let (c, size) = bstr::decode_utf8(&bytes[i..]);
                let Some(c) = c else {
                    return Err(Error::Encoding(format!(
                        "invalid UTF-8 sequence at byte {i} of string"
                    )));
                };
                let escape = class == EscapeClass::Decode
                    || (class == EscapeClass::LineSeparator && matches!(c, '\u{2028}' | '\u{2029}'));
                if escape {
                    push_scalar(c, &mut f);
                } else {
                    f(Piece::Raw(&bytes[i..i + size]));
                }
                i += size;
            }
        }
        run = i;
    }
    if run < bytes.len() {
        f(Piece::Raw(&bytes[run..]));
    }
    Ok(())
}

/// Exact length of the escaped form of `bytes`, excluding the quotes.
///
/// # Errors
///
/// [`Error::Encoding`] if a multi-byte sequence is invalid or truncated.
pub fn string_escape_size(bytes: &[u8], table: &EscapeTable) -> Result<usize, Error> {
    let mut size = 0;
    for_each_piece(bytes, table, false, |p| size += p.len())?;
    Ok(size)
}

/// Writes `bytes` as a quoted JSON string.
///
/// # Errors
///
/// [`Error::Encoding`] if a multi-byte sequence is invalid or truncated.
pub fn write_escaped_string(
    bytes: &[u8],
    table: &EscapeTable,
    out: &mut OutputBuffer,
) -> Result<(), Error> {
    write_escaped(bytes, table, false, out)
}

pub(crate) fn write_escaped(
    bytes: &[u8],
    table: &EscapeTable,
    escape_head: bool,
    out: &mut OutputBuffer,
) -> Result<(), Error> {
    let mut size = 2;
    for_each_piece(bytes, table, escape_head, |p| size += p.len())?;
    out.ensure(size);
    out.append_byte(b'"');
    for_each_piece(bytes, table, escape_head, |p| p.write(out))?;
    out.append_byte(b'"');
    Ok(())
}

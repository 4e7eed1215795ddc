use crate::{
    dump::number::{INF_LITERAL, NAN_LITERAL, NINF_LITERAL},
    parser::error::SyntaxError,
};

// More significant digits than this cannot be held exactly by an f64.
const DEC_MAX: u32 = 15;
// Exponents at least this large are kept as exact text.
const EXP_MAX: i64 = 100_000;

/// A scanned number, not yet turned into a value.
///
/// The integer and fraction parts are accumulated as they are read; once
/// they stop fitting (or more than 15 significant digits appear) the number
/// is flagged `big` and only `text` is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumInfo<'a> {
    /// The whole token.
    pub text: &'a str,
    /// Leading `-`.
    pub neg: bool,
    /// Integer part, valid unless `big`.
    pub int: u64,
    /// Fraction digits, without the point.
    pub frac: &'a str,
    /// Exponent value (signed).
    pub exp: i64,
    /// Whether an exponent was present.
    pub has_exp: bool,
    /// Too long or too large for exact machine representation.
    pub big: bool,
    /// `Infinity`, `-Infinity`, or one of the dumped stand-ins.
    pub infinity: bool,
    /// `NaN` or its dumped stand-in.
    pub nan: bool,
}

impl NumInfo<'_> {
    /// Whether the number has a fraction or exponent.
    #[must_use]
    pub fn is_float(&self) -> bool {
        !self.frac.is_empty() || self.has_exp || self.infinity || self.nan
    }

    /// The value as an `i64`, for integers that fit.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        if self.is_float() {
            return None;
        }
        self.text.parse().ok()
    }

    /// The value as the nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        if self.nan {
            f64::NAN
        } else if self.infinity {
            if self.neg { f64::NEG_INFINITY } else { f64::INFINITY }
        } else {
            self.text.parse().unwrap_or(f64::NAN)
        }
    }
}

fn digits_end(bytes: &[u8], from: usize) -> usize {
    from + bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of the JSON number at the start of `bytes`, if there is one.
pub(crate) fn scan_number(bytes: &[u8]) -> Option<usize> {
    let mut i = usize::from(bytes.first() == Some(&b'-'));
    match bytes.get(i) {
        Some(b'0') if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => return None,
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits_end(bytes, i),
        _ => return None,
    }
    if bytes.get(i) == Some(&b'.') {
        let end = digits_end(bytes, i + 1);
        if end == i + 1 {
            return None;
        }
        i = end;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = digits_end(bytes, i);
        if end == i {
            return None;
        }
        i = end;
    }
    Some(i)
}

/// Reads the number starting at `bytes[start]`, returning it and the offset
/// just past it.
pub(crate) fn read_number(
    bytes: &[u8],
    start: usize,
    allow_nan: bool,
) -> Result<(NumInfo<'_>, usize), SyntaxError> {
    let rest = &bytes[start..];
    let neg = rest.first() == Some(&b'-');
    let sign = usize::from(neg);

    for (word, nan) in [(&b"Infinity"[..], false), (&b"NaN"[..], true)] {
        if rest[sign..].starts_with(word) {
            if !allow_nan || (nan && neg) {
                return Err(SyntaxError::InvalidNumber);
            }
            let len = sign + word.len();
            let info = NumInfo {
                text: ascii(&rest[..len]),
                neg,
                int: 0,
                frac: "",
                exp: 0,
                has_exp: false,
                big: false,
                infinity: !nan,
                nan,
            };
            return Ok((info, start + len));
        }
    }

    let len = scan_number(rest).ok_or(SyntaxError::InvalidNumber)?;
    let text = ascii(&rest[..len]);
    let int_end = digits_end(rest, sign);
    let mut big = false;
    let mut significant = 0u32;

    let mut int = 0u64;
    for &d in &rest[sign..int_end] {
        if int > 0 {
            significant += 1;
        }
        match int.checked_mul(10).and_then(|i| i.checked_add(u64::from(d - b'0'))) {
            Some(i) => int = i,
            None => big = true,
        }
    }
    if int > i64::MAX.unsigned_abs() + u64::from(neg) {
        big = true;
    }

    let mut i = int_end;
    let mut frac = "";
    if rest.get(i) == Some(&b'.') {
        let end = digits_end(rest, i + 1);
        frac = ascii(&rest[i + 1..end]);
        let mut seen_nonzero = int > 0;
        for &d in frac.as_bytes() {
            if seen_nonzero {
                significant += 1;
            }
            seen_nonzero |= d != b'0';
        }
        i = end;
    }
    if significant > DEC_MAX || frac.len() > 18 {
        big = true;
    }

    let mut exp = 0i64;
    let has_exp = matches!(rest.get(i), Some(b'e' | b'E'));
    if has_exp {
        i += 1;
        let eneg = rest.get(i) == Some(&b'-');
        if matches!(rest.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        for &d in &rest[i..len] {
            exp = exp.saturating_mul(10).saturating_add(i64::from(d - b'0'));
            if exp >= EXP_MAX {
                big = true;
            }
        }
        if eneg {
            exp = -exp;
        }
    }

    let mut info = NumInfo {
        text,
        neg,
        int,
        frac,
        exp,
        has_exp,
        big,
        infinity: false,
        nan: false,
    };
    if big {
        match text {
            INF_LITERAL | NINF_LITERAL => info.infinity = true,
            NAN_LITERAL => info.nan = true,
            _ => {}
        }
    }
    Ok((info, start + len))
}

// Callers only pass slices of ASCII digits and punctuation.
fn ascii(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes).unwrap_or_default()
}

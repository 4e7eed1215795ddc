//! Float rendering and the non-finite policies.

use std::borrow::Cow;

use crate::{
    Error,
    options::{Mode, NanPolicy},
};

/// Stand-in for `+Infinity` under [`NanPolicy::Huge`].
pub const INF_LITERAL: &str = "3.0e14159265358979323846";
/// Stand-in for `-Infinity` under [`NanPolicy::Huge`].
pub const NINF_LITERAL: &str = "-3.0e14159265358979323846";
/// Stand-in for `NaN` under [`NanPolicy::Huge`].
pub const NAN_LITERAL: &str = "3.3e14159265358979323846";

// Largest magnitude still printed with "%.1f".
const INTEGRAL_LIMIT: f64 = 9.223_372_036_854_776e18;

/// Renders a finite float.
///
/// `0.0` and integral values in `i64` range get a single `.0` decimal.
/// Otherwise the value is printed with `precision` significant digits (the
/// C `%g` layout), unless that output shows a rounding artifact, in which
/// case the shortest round-trip form is used instead. A precision of `0`
/// always uses the shortest round-trip form.
pub fn format_float(f: f64, precision: u8) -> Cow<'static, str> {
    debug_assert!(f.is_finite());
    if f == 0.0 {
        return Cow::Borrowed("0.0");
    }
    if f.fract() == 0.0 && f.abs() < INTEGRAL_LIMIT {
        return Cow::Owned(format!("{f:.1}"));
    }
    if precision == 0 {
        return Cow::Owned(shortest(f));
    }
    let general = format_general(f, usize::from(precision));
    if general.len() >= 17 && (general.ends_with("0001") || general.ends_with("9999")) {
        Cow::Owned(shortest(f))
    } else {
        Cow::Owned(general)
    }
}

fn shortest(f: f64) -> String {
    ryu::Buffer::new().format_finite(f).to_owned()
}

/// `printf("%.{precision}g", f)`.
fn format_general(f: f64, precision: usize) -> String {
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let p = i32::try_from(precision).unwrap_or(i32::MAX);

    if exp < -4 || exp >= p {
        let mantissa = strip_fraction_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
    } else {
        let decimals = usize::try_from(p - 1 - exp).unwrap_or(0);
        strip_fraction_zeros(&format!("{f:.decimals$}")).to_owned()
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// The output token for a non-finite float under `policy`, which must already
/// be resolved for `mode`.
pub fn non_finite_token(f: f64, policy: NanPolicy, mode: Mode) -> Result<&'static str, Error> {
    let (word, huge) = if f.is_nan() {
        ("NaN", NAN_LITERAL)
    } else if f > 0.0 {
        ("Infinity", INF_LITERAL)
    } else {
        ("-Infinity", NINF_LITERAL)
    };
    match policy {
        NanPolicy::Raise => Err(Error::Nan { value: word, mode }),
        NanPolicy::Null => Ok("null"),
        NanPolicy::Word => Ok(word),
        NanPolicy::Huge | NanPolicy::Auto => Ok(huge),
    }
}

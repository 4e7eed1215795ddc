//! Time values and their textual forms.
//!
//! A [`Time`] is an instant (seconds and nanoseconds since the Unix epoch)
//! plus the UTC offset it should be displayed in. Formatting never consults
//! the system time zone database.

use core::fmt::Write as _;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Seconds-based exponent marking a UTC time in the zoned Unix format.
pub(crate) const UTC_MARKER: i64 = 86_400;

/// An instant with a display offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    secs: i64,
    nanos: u32,
    utc_offset: i32,
    utc: bool,
}

impl Time {
    /// A UTC time. Nanoseconds at or above one second carry into `secs`,
    /// saturating at the `i64` range.
    #[must_use]
    pub fn utc(secs: i64, nanos: u32) -> Self {
        Self {
            secs: secs.saturating_add(i64::from(nanos / NANOS_PER_SEC)),
            nanos: nanos % NANOS_PER_SEC,
            utc_offset: 0,
            utc: true,
        }
    }

    /// A time displayed at `utc_offset` seconds east of UTC.
    #[must_use]
    pub fn with_offset(secs: i64, nanos: u32, utc_offset: i32) -> Self {
        Self {
            utc_offset,
            utc: false,
            ..Self::utc(secs, nanos)
        }
    }

    /// Whole seconds since the epoch (floored).
    #[must_use]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Nanoseconds past [`secs`](Self::secs), always `< 1_000_000_000`.
    #[must_use]
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Display offset in seconds east of UTC.
    #[must_use]
    pub fn utc_offset(&self) -> i32 {
        self.utc_offset
    }

    /// Whether the time is marked as UTC.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.utc
    }

    /// Rebuilds a time from the parts of a zoned Unix number
    /// (`[-]int.frac[e<offset>]`).
    pub(crate) fn from_unix_parts(
        neg: bool,
        int: u64,
        frac_digits: &str,
        zone: Option<i64>,
    ) -> Option<Self> {
        let mut nanos: u32 = 0;
        for (i, b) in frac_digits.bytes().take(9).enumerate() {
            let place = 10u32.pow(8 - u32::try_from(i).ok()?);
            nanos += u32::from(b - b'0') * place;
        }
        let int = i64::try_from(int).ok()?;
        let (secs, nanos) = if neg && nanos > 0 {
            (-int - 1, NANOS_PER_SEC - nanos)
        } else if neg {
            (-int, 0)
        } else {
            (int, nanos)
        };
        let time = match zone {
            Some(UTC_MARKER) | None => Self::utc(secs, nanos),
            Some(offset) => Self::with_offset(secs, nanos, i32::try_from(offset).ok()?),
        };
        // Local time plus a rounding carry must stay in range.
        time.secs
            .checked_add(i64::from(time.utc_offset))?
            .checked_add(1)?;
        Some(time)
    }

    /// Parses `YYYY-MM-DDTHH:MM:SS[.f+](Z|±HH:MM)`.
    #[must_use]
    pub fn parse_xml(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() < 20 || b[4] != b'-' || b[7] != b'-' || b[10] != b'T' {
            return None;
        }
        if b[13] != b':' || b[16] != b':' {
            return None;
        }
        let year = digits(&b[0..4])?;
        let month = digits(&b[5..7])?;
        let day = digits(&b[8..10])?;
        let hour = digits(&b[11..13])?;
        let min = digits(&b[14..16])?;
        let sec = digits(&b[17..19])?;
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        if hour > 23 || min > 59 || sec > 60 {
            return None;
        }

        let mut rest = &b[19..];
        let mut nanos = 0u32;
        if let Some((b'.', tail)) = rest.split_first() {
            let n = tail.iter().take_while(|c| c.is_ascii_digit()).count();
            if n == 0 {
                return None;
            }
            for (i, &c) in tail[..n.min(9)].iter().enumerate() {
                nanos += u32::from(c - b'0') * 10u32.pow(8 - u32::try_from(i).ok()?);
            }
            rest = &tail[n..];
        }

        let local = days_from_civil(year, month, day) * 86_400 + hour * 3600 + min * 60 + sec;
        match rest {
            b"Z" => Some(Self::utc(local, nanos)),
            [sign @ (b'+' | b'-'), hh1, hh2, b':', mm1, mm2] => {
                let offset = digits(&[*hh1, *hh2])? * 3600 + digits(&[*mm1, *mm2])? * 60;
                let offset = if *sign == b'-' { -offset } else { offset };
                Some(Self::with_offset(
                    local - offset,
                    nanos,
                    i32::try_from(offset).ok()?,
                ))
            }
            _ => None,
        }
    }

    /// `secs.fraction`, optionally followed by `e<offset>`.
    pub(crate) fn format_unix(&self, precision: u8, with_zone: bool) -> String {
        let precision = precision.min(9);
        let (neg, mut secs, nanos) = if self.secs < 0 && self.nanos > 0 {
            (true, self.secs.unsigned_abs() - 1, NANOS_PER_SEC - self.nanos)
        } else {
            (self.secs < 0, self.secs.unsigned_abs(), self.nanos)
        };
        let (frac, carry) = round_nanos(nanos, precision);
        secs += u64::from(carry);

        let mut out = String::with_capacity(32);
        if neg {
            out.push('-');
        }
        out.push_str(itoa::Buffer::new().format(secs));
        if precision > 0 {
            let _ = write!(out, ".{frac:0width$}", width = usize::from(precision));
        }
        if with_zone {
            let zone = if self.utc {
                UTC_MARKER
            } else {
                i64::from(self.utc_offset)
            };
            let _ = write!(out, "e{zone}");
        }
        out
    }

    /// XML Schema `dateTime`; no fraction when `nanos == 0` or `precision == 0`.
    pub(crate) fn format_xml(&self, precision: u8) -> String {
        let precision = precision.min(9);
        let (frac, carry) = round_nanos(self.nanos, precision);
        let local = self.local_secs().saturating_add(i64::from(carry));
        let mut out = String::with_capacity(36);
        write_civil(&mut out, local, 'T');
        if precision > 0 && self.nanos > 0 {
            let _ = write!(out, ".{frac:0width$}", width = usize::from(precision));
        }
        if self.utc {
            out.push('Z');
        } else {
            let (sign, off) = sign_and_abs(self.utc_offset);
            let _ = write!(out, "{sign}{:02}:{:02}", off / 3600, off % 3600 / 60);
        }
        out
    }

    /// UTC with all nine fractional digits, e.g. `2012-01-05T14:58:07.000000000Z`.
    pub(crate) fn format_rfc3339_utc(&self) -> String {
        let mut out = String::with_capacity(32);
        write_civil(&mut out, self.secs, 'T');
        let _ = write!(out, ".{:09}Z", self.nanos);
        out
    }

    /// The host-native rendering: `2012-01-05 23:58:07 +0900` or `... UTC`.
    pub(crate) fn format_ruby(&self) -> String {
        let mut out = String::with_capacity(32);
        write_civil(&mut out, self.local_secs(), ' ');
        if self.utc {
            out.push_str(" UTC");
        } else {
            let (sign, off) = sign_and_abs(self.utc_offset);
            let _ = write!(out, " {sign}{:02}{:02}", off / 3600, off % 3600 / 60);
        }
        out
    }

    fn local_secs(&self) -> i64 {
        if self.utc {
            self.secs
        } else {
            self.secs.saturating_add(i64::from(self.utc_offset))
        }
    }
}

/// Rounds nanoseconds half-up to `precision` digits. The second element is
/// the carry into whole seconds.
fn round_nanos(nanos: u32, precision: u8) -> (u32, u32) {
    let one = 10u32.pow(u32::from(precision));
    let div = NANOS_PER_SEC / one;
    let mut frac = nanos / div;
    if (nanos % div) * 2 >= div && div > 1 {
        frac += 1;
    }
    if frac >= one { (frac - one, 1) } else { (frac, 0) }
}

fn sign_and_abs(offset: i32) -> (char, u32) {
    if offset < 0 {
        ('-', offset.unsigned_abs())
    } else {
        ('+', offset.unsigned_abs())
    }
}

fn write_civil(out: &mut String, secs: i64, sep: char) {
    let days = secs.div_euclid(86_400);
    let day_secs = secs.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    let _ = write!(
        out,
        "{y:04}-{m:02}-{d:02}{sep}{:02}:{:02}:{:02}",
        day_secs / 3600,
        day_secs / 60 % 60,
        day_secs % 60
    );
}

fn digits(b: &[u8]) -> Option<i64> {
    b.iter().try_fold(0i64, |acc, &c| {
        c.is_ascii_digit().then(|| acc * 10 + i64::from(c - b'0'))
    })
}

// ---------------------------------------------------------------------------
// Proleptic Gregorian calendar helpers (UTC only)
// ---------------------------------------------------------------------------

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 to `(year, month, day)`.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// `(year, month, day)` to days since 1970-01-01.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    // 2012-01-05T23:58:07.123456789+09:00
    fn tokyo() -> Time {
        Time::with_offset(1_325_775_487, 123_456_789, 9 * 3600)
    }

    #[rstest]
    #[case(9, "1325775487.123456789")]
    #[case(3, "1325775487.123")]
    #[case(6, "1325775487.123457")]
    #[case(0, "1325775487")]
    fn unix_precision(#[case] precision: u8, #[case] expected: &str) {
        assert_eq!(tokyo().format_unix(precision, false), expected);
    }

    #[test]
    fn rounding_carries_into_seconds() {
        let t = Time::utc(10, 999_999_999);
        assert_eq!(t.format_unix(3, false), "11.000");
        assert_eq!(t.format_xml(3), "1970-01-01T00:00:11.000Z");
    }

    #[test]
    fn negative_times_keep_sign_on_the_whole_value() {
        let t = Time::utc(-2, 300_000_000);
        assert_eq!(t.format_unix(9, false), "-1.700000000");
        assert_eq!(Time::from_unix_parts(true, 1, "7", None), Some(t));
    }

    #[test]
    fn zone_exponent() {
        assert_eq!(tokyo().format_unix(9, true), "1325775487.123456789e32400");
        assert_eq!(Time::utc(5, 0).format_unix(9, true), "5.000000000e86400");
        assert_eq!(
            Time::from_unix_parts(false, 1_325_775_487, "123456789", Some(32_400)),
            Some(tokyo())
        );
    }

    #[test]
    fn xml_round_trip() {
        let s = tokyo().format_xml(9);
        assert_eq!(s, "2012-01-05T23:58:07.123456789+09:00");
        assert_eq!(Time::parse_xml(&s), Some(tokyo()));
        assert_eq!(tokyo().format_xml(3), "2012-01-05T23:58:07.123+09:00");
        assert_eq!(
            Time::utc(1_325_775_487, 0).format_xml(9),
            "2012-01-05T14:58:07Z"
        );
    }

    #[test]
    fn ruby_and_rfc3339() {
        assert_eq!(tokyo().format_ruby(), "2012-01-05 23:58:07 +0900");
        assert_eq!(Time::utc(0, 0).format_ruby(), "1970-01-01 00:00:00 UTC");
        assert_eq!(
            tokyo().format_rfc3339_utc(),
            "2012-01-05T14:58:07.123456789Z"
        );
    }

    #[test]
    fn civil_conversion_is_consistent() {
        for days in [-719_468, -1, 0, 59, 365, 11_016, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days, "{y}-{m}-{d}");
        }
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
    }

    #[test]
    fn out_of_range_seconds() {
        let max = i64::MAX.unsigned_abs();
        assert_eq!(Time::from_unix_parts(false, max, "5", Some(3600)), None);
        assert_eq!(Time::from_unix_parts(false, max, "", None), None);
        assert_eq!(Time::from_unix_parts(true, max, "5", Some(-3600)), None);
        assert!(Time::from_unix_parts(false, max - 3601, "", Some(3600)).is_some());

        assert_eq!(Time::utc(i64::MAX, 1_500_000_000).secs(), i64::MAX);
        let edge = Time::with_offset(i64::MAX, 999_999_999, 3600);
        assert!(edge.format_xml(3).ends_with("+01:00"));
        assert!(edge.format_ruby().ends_with("+0100"));
        assert!(!edge.format_unix(3, true).is_empty());
    }

    #[test]
    fn rejects_malformed_xml() {
        assert_eq!(Time::parse_xml("2012-13-05T23:58:07Z"), None);
        assert_eq!(Time::parse_xml("2012-02-30T23:58:07Z"), None);
        assert_eq!(Time::parse_xml("2012-01-05 23:58:07Z"), None);
        assert_eq!(Time::parse_xml("2012-01-05T23:58:07."), None);
    }
}

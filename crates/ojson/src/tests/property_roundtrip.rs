use quickcheck::{QuickCheck, TestResult};

use crate::{DecimalLoad, EscapeMode, Mode, Options, Value, dump, parse};

fn tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}

/// Property: object mode restores every plain value, provided floats are
/// written in shortest form and read back as floats.
#[test]
fn object_mode_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value) -> TestResult {
        let options = Options {
            float_precision: 0,
            decimal_load: DecimalLoad::Float,
            ..Options::default()
        };
        let json = match dump(&value, &options) {
            Ok(json) => json,
            Err(err) => return TestResult::error(err.to_string()),
        };
        match parse(&json, &options) {
            Ok(parsed) if parsed == value => TestResult::passed(),
            Ok(parsed) => {
                dbg!(&json, &value, &parsed);
                TestResult::failed()
            }
            Err(err) => TestResult::error(format!("{err} in {json}")),
        }
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value) -> TestResult);
}

/// Property: dumping what was parsed from a dump reproduces the dump.
#[test]
fn redump_is_idempotent_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, mode: u8, indent: u8) -> TestResult {
        let mode = [Mode::Strict, Mode::Compat, Mode::Object, Mode::Custom][usize::from(mode % 4)];
        let options = Options {
            indent: usize::from(indent % 3),
            float_precision: 0,
            decimal_load: DecimalLoad::Float,
            ..Options::with_mode(mode)
        };
        let Ok(first) = dump(&value, &options) else {
            return TestResult::discard();
        };
        let again = parse(&first, &options).and_then(|v| dump(&v, &options));
        match again {
            Ok(second) => TestResult::from_bool(second == first),
            Err(err) => TestResult::error(format!("{err} in {first}")),
        }
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(Value, u8, u8) -> TestResult);
}

/// Property: every escape table produces text that parses back to the
/// original string.
#[test]
fn escaping_roundtrip_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(s: String, escape: EscapeMode) -> bool {
        let options = Options {
            escape_mode: Some(escape),
            ..Options::with_mode(Mode::Strict)
        };
        dump(&Value::from(s.as_str()), &options)
            .and_then(|json| parse(&json, &options))
            .is_ok_and(|v| v == Value::Str(s))
    }

    QuickCheck::new()
        .tests(tests())
        .quickcheck(prop as fn(String, EscapeMode) -> bool);
}

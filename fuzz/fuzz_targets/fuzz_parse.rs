#![no_main]
use std::cell::RefCell;

use arbitrary::Arbitrary;
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use ojson::{DecimalLoad, Mode, NoHost, Options, dump, parse, parse_bytes};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::{Map, Value};

const HEADER: usize = 1; // option flags

thread_local! {
    static RNG: RefCell<SmallRng> =
        RefCell::new(SmallRng::from_os_rng());
}

// Tag prefixes object mode gives meaning to, spliced into generated strings.
static TAGS: &[&str] = &["^o", "^u", "^c", "^t", "^i", "^r1", "^#1", ":", "~", "\\u005e"];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8);
        HEADER + append_value(&mut data[HEADER..], size, max_size - HEADER)
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

fn append_value(data: &mut [u8], size: usize, limit: usize) -> usize {
    let value = loop {
        let s = with_rng(|rng| rng.random_range(size / 2..size * 2 + 1).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value;
        }
    };

    let Ok(serialized) = serde_json::to_vec(&value.0) else {
        return 0;
    };

    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(Value);

fn tagged_string(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<String> {
    let tag = u.choose(TAGS)?;
    let tail: String = u.arbitrary()?;
    Ok(format!("{tag}{tail}"))
}

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(24)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => {
                let n: f64 = u.arbitrary()?;
                Value::Number(
                    serde_json::Number::from_f64(n).ok_or(arbitrary::Error::IncorrectFormat)?,
                )
            }
            3 => Value::Number(u.arbitrary::<i64>()?.into()),
            4..=8 => Value::String(u.arbitrary()?),
            9..=11 => Value::String(tagged_string(u)?),
            12..=16 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            17..=20 => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                Value::Object(Map::from_iter(m.into_iter().map(|(k, v)| (k, v.0))))
            }
            21..=23 => {
                let m: Vec<ArbitraryValue> = u.arbitrary()?;
                let mut map = Map::new();
                for v in m {
                    map.insert(tagged_string(u)?, v.0);
                }
                Value::Object(map)
            }
            _ => Err(arbitrary::Error::IncorrectFormat)?,
        };
        Ok(ArbitraryValue(value))
    }
}

fn options(flags: u8) -> Options {
    let mode = match flags & 7 {
        0 => Mode::Strict,
        1 => Mode::Null,
        2 | 3 => Mode::Object,
        4 => Mode::Compat,
        5 => Mode::Custom,
        6 => Mode::Rails,
        _ => Mode::Wab,
    };
    Options {
        circular: flags & 8 != 0,
        allow_nan: flags & 16 != 0,
        allow_invalid_unicode: flags & 32 != 0,
        create_additions: flags & 64 != 0,
        float_precision: 0,
        decimal_load: DecimalLoad::Float,
        ..Options::with_mode(mode)
    }
}

fn parse_then_redump(data: &[u8]) {
    let Some((&flags, input)) = data.split_first() else {
        return;
    };
    let options = options(flags);
    let Ok(value) = parse_bytes(input, &options, &NoHost) else {
        return;
    };
    let Ok(first) = dump(&value, &options) else {
        return;
    };
    if matches!(options.mode, Mode::Strict | Mode::Object) {
        let reparsed = parse(&first, &options).expect("dump output must parse");
        let second = dump(&reparsed, &options).expect("reparsed value must dump");
        assert_eq!(first, second);
    }
}

fuzz_target!(|data: &[u8]| parse_then_redump(data));

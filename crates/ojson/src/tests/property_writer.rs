use quickcheck::QuickCheck;

use crate::{Error, Mode, Options, StringWriter, Value, dump};

fn write(w: &mut StringWriter, value: &Value, key: Option<&str>) -> Result<(), Error> {
    match value {
        Value::Array(items) => {
            w.push_array(key)?;
            for item in items.borrow().iter() {
                write(w, item, None)?;
            }
            w.pop()
        }
        Value::Map(map) => {
            w.push_object(key)?;
            for (k, item) in map.borrow().iter() {
                write(w, item, k.as_str())?;
            }
            w.pop()
        }
        other => w.push_value(other, key),
    }
}

/// Property: building a document piece by piece with a `StringWriter`
/// yields exactly what `dump` writes for the finished value.
#[test]
fn writer_matches_dump_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(value: Value, indent: u8) -> bool {
        let options = Options {
            indent: usize::from(indent % 4),
            ..Options::with_mode(Mode::Strict)
        };
        let mut w = StringWriter::new(options.clone());
        write(&mut w, &value, None).is_ok()
            && w.as_str().ok() == dump(&value, &options).ok().as_deref()
    }

    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;

    QuickCheck::new()
        .tests(tests)
        .quickcheck(prop as fn(Value, u8) -> bool);
}

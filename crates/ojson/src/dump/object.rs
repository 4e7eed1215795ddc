//! Object mode: every value gets a tagged form the parser can rebuild,
//! including repeated and self-referencing composites.
//!
//! | tag    | meaning                                   |
//! |--------|-------------------------------------------|
//! | `^o`   | class of a generic object                 |
//! | `^u`   | struct name followed by member values     |
//! | `^c`   | a class reference                         |
//! | `^t`   | a time                                    |
//! | `^i`   | id of a composite (first entry/element)   |
//! | `^r`   | back-reference to an id                   |
//! | `^#N`  | a map entry whose key is not a string     |
//! | `:`    | a symbol                                  |

use std::rc::Rc;

use super::{Encoder, Nl};
use crate::{
    Error, Value,
    dump::circular::Visit,
    host::Attr,
    options::TimeFormat,
    value::Key,
};

/// Outcome of the circular check for one composite.
enum Slot {
    /// First visit; `Some(id)` when tracking is on.
    Fresh(Option<u64>),
    /// Already written; a reference has been emitted in its place.
    Written,
}

fn check(enc: &mut Encoder<'_>, identity: usize) -> Result<Slot, Error> {
    let Some(cache) = enc.circular.as_mut() else {
        return Ok(Slot::Fresh(None));
    };
    match cache.check(identity) {
        Visit::Unseen(id) => Ok(Slot::Fresh(Some(id))),
        Visit::Seen(id) => {
            enc.string(&format!("^r{id}"))?;
            Ok(Slot::Written)
        }
    }
}

fn needs_head_escape(s: &str) -> bool {
    s.starts_with(':') || s.starts_with("^r") || s.starts_with("^i")
}

pub(super) fn dump_str(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Str(s) = value else {
        return Ok(());
    };
    if needs_head_escape(s) {
        enc.string_head_escaped(s)
    } else {
        enc.string(s)
    }
}

pub(super) fn dump_sym(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Symbol(s) = value else {
        return Ok(());
    };
    enc.string(&format!(":{s}"))
}

pub(super) fn dump_class(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Class(name) = value else {
        return Ok(());
    };
    enc.raw("{\"^c\":");
    enc.string(name)?;
    enc.byte(b'}');
    Ok(())
}

pub(super) fn dump_time(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Time(t) = value else {
        return Ok(());
    };
    let prec = enc.opts.sec_precision;
    enc.raw("{\"^t\":");
    match enc.opts.time_format {
        TimeFormat::Unix => enc.raw(&t.format_unix(prec, false)),
        TimeFormat::UnixZone => enc.raw(&t.format_unix(prec, true)),
        TimeFormat::Xml => enc.string(&t.format_xml(prec))?,
        TimeFormat::Ruby => enc.string(&t.format_ruby())?,
    }
    enc.byte(b'}');
    Ok(())
}

pub(super) fn dump_array(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Array(items) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    let Slot::Fresh(id) = check(enc, items.identity())? else {
        return Ok(());
    };
    let items = items.borrow();
    enc.byte(b'[');
    let mut first = true;
    if let Some(id) = id {
        enc.fill(Nl::Array, depth + 1);
        enc.string(&format!("^i{id}"))?;
        first = false;
    }
    for item in items.iter() {
        if !first {
            enc.byte(b',');
        }
        first = false;
        enc.fill(Nl::Array, depth + 1);
        enc.encode(item, depth + 1)?;
    }
    if !first {
        enc.fill(Nl::Array, depth);
    }
    enc.byte(b']');
    Ok(())
}

fn write_id_entry(enc: &mut Encoder<'_>, id: u64, depth: usize) {
    enc.fill(Nl::Object, depth + 1);
    enc.raw("\"^i\"");
    enc.colon();
    enc.int(id);
}

pub(super) fn dump_map(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Map(map) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    if map.borrow().is_empty() {
        enc.raw("{}");
        return Ok(());
    }
    let Slot::Fresh(id) = check(enc, map.identity())? else {
        return Ok(());
    };
    let map = map.borrow();
    enc.byte(b'{');
    let mut first = true;
    if let Some(id) = id {
        write_id_entry(enc, id, depth);
        first = false;
    }
    for (key, item) in map.iter() {
        if enc.opts.omit_nil_fields && item.is_null() {
            continue;
        }
        if !first {
            enc.byte(b',');
        }
        first = false;
        enc.fill(Nl::Object, depth + 1);
        match key {
            Key::Str(s) if s.starts_with([':', '^']) => {
                enc.string_head_escaped(s)?;
            }
            Key::Str(s) => enc.string(s)?,
            Key::Sym(s) => enc.string(&format!(":{s}"))?,
            Key::Int(i) => {
                // Non-string keys travel as a two-element array.
                enc.key_pairs += 1;
                let tag = format!("^#{:x}", enc.key_pairs);
                enc.string(&tag)?;
                enc.colon();
                enc.byte(b'[');
                enc.raw(itoa::Buffer::new().format(*i));
                enc.byte(b',');
                enc.encode(item, depth + 2)?;
                enc.byte(b']');
                continue;
            }
        }
        enc.colon();
        enc.encode(item, depth + 1)?;
    }
    if !first {
        enc.fill(Nl::Object, depth);
    }
    enc.byte(b'}');
    Ok(())
}

pub(super) fn dump_struct(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Struct(data) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    let Slot::Fresh(id) = check(enc, data.identity())? else {
        return Ok(());
    };
    let data = data.borrow();
    enc.byte(b'{');
    if let Some(id) = id {
        write_id_entry(enc, id, depth);
        enc.byte(b',');
    }
    enc.fill(Nl::Object, depth + 1);
    enc.raw("\"^u\"");
    enc.colon();
    enc.byte(b'[');
    enc.string(&data.name)?;
    for attr in &data.fields {
        enc.byte(b',');
        enc.encode(&attr.value, depth + 2)?;
    }
    enc.byte(b']');
    enc.fill(Nl::Object, depth);
    enc.byte(b'}');
    Ok(())
}

fn write_object(
    enc: &mut Encoder<'_>,
    class: &str,
    id: Option<u64>,
    fields: &[Attr],
    depth: usize,
) -> Result<(), Error> {
    enc.byte(b'{');
    enc.fill(Nl::Object, depth + 1);
    enc.raw("\"^o\"");
    enc.colon();
    enc.string(class)?;
    if let Some(id) = id {
        enc.byte(b',');
        write_id_entry(enc, id, depth);
    }
    for attr in fields {
        if enc.opts.omit_nil_fields && attr.value.is_null() {
            continue;
        }
        enc.byte(b',');
        enc.fill(Nl::Object, depth + 1);
        if attr.name.starts_with(['^', '~']) {
            enc.string(&format!("~{}", attr.name))?;
        } else {
            enc.string(&attr.name)?;
        }
        enc.colon();
        enc.encode(&attr.value, depth + 1)?;
    }
    enc.fill(Nl::Object, depth);
    enc.byte(b'}');
    Ok(())
}

pub(super) fn dump_object(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Object(data) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    let Slot::Fresh(id) = check(enc, data.identity())? else {
        return Ok(());
    };
    let data = data.borrow();
    write_object(enc, &data.class, id, &data.fields, depth)
}

/// Host values are written like objects when the host exposes their fields,
/// and as their display string otherwise.
pub(super) fn dump_other(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Other(obj) = value else {
        return Ok(());
    };
    let Some(fields) = enc.host_fields(obj.as_ref()) else {
        tracing::warn!(class = obj.class_name(), "host value has no fields, dumping display string");
        let text = enc.display_string(value);
        return enc.string(&text);
    };
    enc.check_depth(depth)?;
    let identity = Rc::as_ptr(obj).cast::<()>() as usize;
    let Slot::Fresh(id) = check(enc, identity)? else {
        return Ok(());
    };
    write_object(enc, obj.class_name(), id, &fields, depth)
}

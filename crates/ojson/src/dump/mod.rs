//! The dump side: a per-mode jump table from value kind to encoder, writing
//! through the string codec and number/time formatters into an
//! [`OutputBuffer`].

pub mod buffer;
pub mod circular;
pub mod escape;
pub mod number;
mod object;
pub mod writer;

use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use self::{
    buffer::OutputBuffer,
    circular::CircularCache,
    escape::{EscapeTable, write_escaped},
};
use crate::{
    Error, Host, NoHost, Options, Value,
    host::{Attr, HostObject},
    options::{Mode, NanPolicy, TimeFormat},
    value::Key,
};

/// Dumps `value` to a string.
///
/// # Errors
///
/// Any [`Error`] raised by the active mode: unsupported values, non-finite
/// floats under a raising policy, nesting beyond `max_depth`, invalid UTF-8.
///
/// # Examples
///
/// ```
/// use ojson::{Mode, Options, Value, dump};
///
/// let v = Value::map([("a", Value::from(1)), ("b", Value::array([1.into(), 2.into()]))]);
/// let json = dump(&v, &Options::with_mode(Mode::Strict)).unwrap();
/// assert_eq!(json, r#"{"a":1,"b":[1,2]}"#);
/// ```
pub fn dump(value: &Value, options: &Options) -> Result<String, Error> {
    dump_with_host(value, options, &NoHost)
}

/// Dumps `value` to a string, consulting `host` for host values.
///
/// # Errors
///
/// See [`dump`].
pub fn dump_with_host(value: &Value, options: &Options, host: &dyn Host) -> Result<String, Error> {
    let mut out = OutputBuffer::default();
    encode_document(&mut out, value, options, host)?;
    String::from_utf8(out.into_bytes()).map_err(|e| Error::Encoding(e.to_string()))
}

/// Dumps `value` into `writer`.
///
/// # Errors
///
/// See [`dump`]; write failures surface as [`Error::Io`].
pub fn dump_to_writer<W: Write>(value: &Value, mut writer: W, options: &Options) -> Result<(), Error> {
    let mut out = OutputBuffer::default();
    encode_document(&mut out, value, options, &NoHost)?;
    writer.write_all(out.finish())?;
    writer.flush()?;
    Ok(())
}

/// Dumps `value` into the file at `path`, creating or truncating it.
///
/// # Errors
///
/// See [`dump_to_writer`].
pub fn dump_to_file(value: &Value, path: impl AsRef<Path>, options: &Options) -> Result<(), Error> {
    let file = File::create(path.as_ref())?;
    dump_to_writer(value, BufWriter::new(file), options)
}

/// A dumper that reuses its output buffer across calls.
#[derive(Debug)]
pub struct Dumper {
    out: OutputBuffer,
    options: Options,
}

impl Dumper {
    /// A dumper with its own options.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            out: OutputBuffer::default(),
            options,
        }
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Dumps `value`, overwriting the previous output.
    ///
    /// # Errors
    ///
    /// See [`dump`].
    pub fn dump(&mut self, value: &Value) -> Result<&str, Error> {
        self.dump_with_host(value, &NoHost)
    }

    /// Dumps `value` with a host, overwriting the previous output.
    ///
    /// # Errors
    ///
    /// See [`dump`].
    pub fn dump_with_host(&mut self, value: &Value, host: &dyn Host) -> Result<&str, Error> {
        self.out.reset();
        encode_document(&mut self.out, value, &self.options, host)?;
        self.out.as_str()
    }
}

fn encode_document(
    out: &mut OutputBuffer,
    value: &Value,
    options: &Options,
    host: &dyn Host,
) -> Result<(), Error> {
    let start = out.cursor();
    let mut enc = Encoder::new(out, options, host);
    enc.encode(value, 0)?;
    if enc.format.trailing_newline && matches!(enc.out.last(), Some(b']' | b'}')) {
        enc.out.push_str("\n");
    }
    tracing::debug!(
        mode = %options.mode,
        bytes = out.cursor() - start,
        "dumped document"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Jump tables
// ---------------------------------------------------------------------------

type EncodeFn = fn(&mut Encoder<'_>, &Value, usize) -> Result<(), Error>;

const KINDS: usize = 15;

fn kind_index(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::BigInt(_) => 3,
        Value::Float(_) => 4,
        Value::Decimal(_) => 5,
        Value::Str(_) => 6,
        Value::Symbol(_) => 7,
        Value::Time(_) => 8,
        Value::Class(_) => 9,
        Value::Array(_) => 10,
        Value::Map(_) => 11,
        Value::Struct(_) => 12,
        Value::Object(_) => 13,
        Value::Other(_) => 14,
    }
}

#[rustfmt::skip]
static STRICT_FUNCS: [EncodeFn; KINDS] = [
    dump_null, dump_bool, dump_int, dump_big_int, dump_float, dump_decimal,
    dump_str, dump_sym_as_str, unsupported, unsupported,
    dump_array, dump_map, unsupported, unsupported, unsupported,
];

#[rustfmt::skip]
static COMPAT_FUNCS: [EncodeFn; KINDS] = [
    dump_null, dump_bool, dump_int, dump_big_int, dump_float, dump_decimal,
    dump_str, dump_sym_as_str, dump_time, dump_class_name,
    dump_array, dump_map, dump_tagged_or_display, dump_tagged_or_display, dump_tagged_or_display,
];

#[rustfmt::skip]
static CUSTOM_FUNCS: [EncodeFn; KINDS] = [
    dump_null, dump_bool, dump_int, dump_big_int, dump_float, dump_decimal,
    dump_str, dump_sym_as_str, dump_time, dump_class_name,
    dump_array, dump_map, dump_fields_map, dump_fields_map, dump_fields_map,
];

#[rustfmt::skip]
static OBJECT_FUNCS: [EncodeFn; KINDS] = [
    dump_null, dump_bool, dump_int, dump_big_int, dump_float, dump_decimal,
    object::dump_str, object::dump_sym, object::dump_time, object::dump_class,
    object::dump_array, object::dump_map, object::dump_struct, object::dump_object, object::dump_other,
];

#[rustfmt::skip]
static WAB_FUNCS: [EncodeFn; KINDS] = [
    dump_null, dump_bool, dump_int, dump_big_int, dump_float, unsupported,
    dump_str, dump_sym_as_str, dump_time, unsupported,
    dump_array, dump_map, unsupported, unsupported, unsupported,
];

fn funcs_for(mode: Mode) -> &'static [EncodeFn; KINDS] {
    match mode {
        Mode::Strict | Mode::Null => &STRICT_FUNCS,
        Mode::Compat => &COMPAT_FUNCS,
        Mode::Custom | Mode::Rails => &CUSTOM_FUNCS,
        Mode::Object => &OBJECT_FUNCS,
        Mode::Wab => &WAB_FUNCS,
    }
}

// ---------------------------------------------------------------------------
// Encoder state
// ---------------------------------------------------------------------------

/// Separators derived once per call from `indent` or the explicit layout.
#[derive(Debug)]
pub(crate) struct Format<'a> {
    indent: Cow<'a, str>,
    array_nl: &'a str,
    object_nl: &'a str,
    before_colon: &'a str,
    after_colon: &'a str,
    trailing_newline: bool,
}

impl<'a> Format<'a> {
    fn new(options: &'a Options) -> Self {
        match &options.layout {
            Some(layout) => Self {
                indent: Cow::Borrowed(&layout.indent),
                array_nl: &layout.array_nl,
                object_nl: &layout.object_nl,
                before_colon: &layout.before_colon,
                after_colon: &layout.after_colon,
                trailing_newline: false,
            },
            None if options.indent > 0 => Self {
                indent: Cow::Owned(" ".repeat(options.indent)),
                array_nl: "\n",
                object_nl: "\n",
                before_colon: "",
                after_colon: "",
                trailing_newline: true,
            },
            None => Self {
                indent: Cow::Borrowed(""),
                array_nl: "",
                object_nl: "",
                before_colon: "",
                after_colon: "",
                trailing_newline: false,
            },
        }
    }
}

/// Which newline string a fill uses.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Nl {
    Array,
    Object,
}

/// State of one dump call.
pub(crate) struct Encoder<'a> {
    pub(crate) out: &'a mut OutputBuffer,
    pub(crate) opts: &'a Options,
    host: &'a dyn Host,
    table: &'static EscapeTable,
    format: Format<'a>,
    funcs: &'static [EncodeFn; KINDS],
    nan: NanPolicy,
    class_tag: &'a str,
    circular: Option<CircularCache>,
    ancestors: Vec<usize>,
    key_pairs: u64,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(out: &'a mut OutputBuffer, opts: &'a Options, host: &'a dyn Host) -> Self {
        Self {
            out,
            opts,
            host,
            table: EscapeTable::for_mode(opts.effective_escape()),
            format: Format::new(opts),
            funcs: funcs_for(opts.mode),
            nan: opts.effective_nan_policy(),
            class_tag: opts.effective_class_tag(),
            circular: (opts.circular && opts.mode == Mode::Object).then(CircularCache::new),
            ancestors: Vec::new(),
            key_pairs: 0,
        }
    }

    /// Encodes `value` found at nesting `depth`.
    pub(crate) fn encode(&mut self, value: &Value, depth: usize) -> Result<(), Error> {
        (self.funcs[kind_index(value)])(self, value, depth)
    }

    fn check_depth(&self, depth: usize) -> Result<(), Error> {
        if depth >= self.opts.max_depth {
            return Err(Error::Nesting {
                depth: depth + 1,
                limit: self.opts.max_depth,
            });
        }
        Ok(())
    }

    // Cycle guard for modes without back-references: a value that contains
    // itself is written as `null` at the point of recursion.
    fn enter(&mut self, identity: usize) -> bool {
        if !self.opts.circular {
            return true;
        }
        if self.ancestors.contains(&identity) {
            tracing::trace!(identity, "cycle replaced with null");
            return false;
        }
        self.ancestors.push(identity);
        true
    }

    fn leave(&mut self) {
        if self.opts.circular {
            self.ancestors.pop();
        }
    }

    pub(crate) fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    pub(crate) fn byte(&mut self, b: u8) {
        self.out.ensure(1);
        self.out.append_byte(b);
    }

    pub(crate) fn string(&mut self, s: &str) -> Result<(), Error> {
        write_escaped(s.as_bytes(), self.table, false, self.out)
    }

    fn string_head_escaped(&mut self, s: &str) -> Result<(), Error> {
        write_escaped(s.as_bytes(), self.table, true, self.out)
    }

    /// Newline plus indentation for an element at `depth`.
    pub(crate) fn fill(&mut self, nl: Nl, depth: usize) {
        let nl = match nl {
            Nl::Array => self.format.array_nl,
            Nl::Object => self.format.object_nl,
        };
        let unit = self.format.indent.len();
        if nl.is_empty() && unit == 0 {
            return;
        }
        self.out.ensure(nl.len() + unit * depth);
        self.out.append_bytes(nl.as_bytes());
        for _ in 0..depth {
            self.out.append_bytes(self.format.indent.as_bytes());
        }
    }

    pub(crate) fn colon(&mut self) {
        let (before, after) = (self.format.before_colon, self.format.after_colon);
        self.out.ensure(before.len() + after.len() + 1);
        self.out.append_bytes(before.as_bytes());
        self.out.append_byte(b':');
        self.out.append_bytes(after.as_bytes());
    }

    fn int(&mut self, i: u64) {
        self.raw(itoa::Buffer::new().format(i));
    }

    /// The fallback rendering of a value with no encoding of its own.
    fn display_string(&self, value: &Value) -> String {
        match value {
            Value::Other(obj) => self.host.to_display_string(obj.as_ref()),
            Value::Struct(s) => format!("#<struct {}>", s.borrow().name),
            Value::Object(o) => format!("#<{}>", o.borrow().class),
            Value::Class(name) => name.clone(),
            other => other.kind_name().to_owned(),
        }
    }

    /// Writes a JSON object of fields, optionally led by a class tag entry.
    fn fields_map(
        &mut self,
        tag: Option<&str>,
        fields: &[Attr],
        depth: usize,
    ) -> Result<(), Error> {
        self.check_depth(depth)?;
        self.byte(b'{');
        let mut first = true;
        if let Some(class) = tag {
            self.fill(Nl::Object, depth + 1);
            let key = self.class_tag;
            self.string(key)?;
            self.colon();
            self.string(class)?;
            first = false;
        }
        for attr in fields {
            if self.opts.omit_nil_fields && attr.value.is_null() {
                continue;
            }
            if !first {
                self.byte(b',');
            }
            first = false;
            self.fill(Nl::Object, depth + 1);
            self.string(&attr.name)?;
            self.colon();
            self.encode(&attr.value, depth + 1)?;
        }
        if !first {
            self.fill(Nl::Object, depth);
        }
        self.byte(b'}');
        Ok(())
    }

    fn host_fields(&self, obj: &dyn HostObject) -> Option<Vec<Attr>> {
        self.host.get_fields(obj)
    }
}

// ---------------------------------------------------------------------------
// Shared encoders
// ---------------------------------------------------------------------------

fn dump_null(enc: &mut Encoder<'_>, _: &Value, _: usize) -> Result<(), Error> {
    enc.raw("null");
    Ok(())
}

fn dump_bool(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    enc.raw(if value.as_bool() == Some(true) { "true" } else { "false" });
    Ok(())
}

fn dump_int(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    if let Value::Int(i) = value {
        enc.raw(itoa::Buffer::new().format(*i));
    }
    Ok(())
}

fn dump_big_int(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    if let Value::BigInt(b) = value {
        enc.raw(b.as_str());
    }
    Ok(())
}

fn dump_float(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Float(f) = *value else {
        return Ok(());
    };
    if f.is_finite() {
        let text = number::format_float(f, enc.opts.float_precision);
        enc.raw(&text);
    } else {
        let token = number::non_finite_token(f, enc.nan, enc.opts.mode)?;
        enc.raw(token);
    }
    Ok(())
}

fn dump_decimal(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    if let Value::Decimal(d) = value {
        enc.raw(d.as_str());
    }
    Ok(())
}

fn dump_str(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    match value {
        Value::Str(s) => enc.string(s),
        _ => Ok(()),
    }
}

fn dump_sym_as_str(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    match value {
        Value::Symbol(s) => enc.string(s),
        _ => Ok(()),
    }
}

fn dump_class_name(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    match value {
        Value::Class(name) => enc.string(name),
        _ => Ok(()),
    }
}

fn dump_time(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let Value::Time(t) = value else {
        return Ok(());
    };
    let prec = enc.opts.sec_precision;
    match enc.opts.mode {
        Mode::Compat => enc.string(&t.format_ruby()),
        Mode::Rails => enc.string(&t.format_xml(prec.min(3))),
        Mode::Wab => enc.string(&t.format_rfc3339_utc()),
        _ => match enc.opts.time_format {
            TimeFormat::Unix => {
                enc.raw(&t.format_unix(prec, false));
                Ok(())
            }
            TimeFormat::UnixZone => {
                enc.raw(&t.format_unix(prec, true));
                Ok(())
            }
            TimeFormat::Xml => enc.string(&t.format_xml(prec)),
            TimeFormat::Ruby => enc.string(&t.format_ruby()),
        },
    }
}

fn dump_array(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Array(items) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    if !enc.enter(items.identity()) {
        enc.raw("null");
        return Ok(());
    }
    let items = items.borrow();
    enc.byte(b'[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            enc.byte(b',');
        }
        enc.fill(Nl::Array, depth + 1);
        enc.encode(item, depth + 1)?;
    }
    if !items.is_empty() {
        enc.fill(Nl::Array, depth);
    }
    enc.byte(b']');
    enc.leave();
    Ok(())
}

fn write_key(enc: &mut Encoder<'_>, key: &Key) -> Result<(), Error> {
    let mode = enc.opts.mode;
    match (key, mode) {
        (Key::Str(_), Mode::Wab) => Err(Error::UnsupportedType {
            kind: "string key",
            mode,
        }),
        (Key::Str(s) | Key::Sym(s), _) => enc.string(s),
        (Key::Int(_), Mode::Strict | Mode::Null | Mode::Wab) => Err(Error::UnsupportedType {
            kind: "integer key",
            mode,
        }),
        (Key::Int(i), _) => enc.string(itoa::Buffer::new().format(*i)),
    }
}

fn dump_map(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let Value::Map(map) = value else {
        return Ok(());
    };
    enc.check_depth(depth)?;
    if !enc.enter(map.identity()) {
        enc.raw("null");
        return Ok(());
    }
    let map = map.borrow();
    enc.byte(b'{');
    let mut first = true;
    for (key, item) in map.iter() {
        if enc.opts.omit_nil_fields && item.is_null() {
            continue;
        }
        if !first {
            enc.byte(b',');
        }
        first = false;
        enc.fill(Nl::Object, depth + 1);
        write_key(enc, key)?;
        enc.colon();
        enc.encode(item, depth + 1)?;
    }
    if !first {
        enc.fill(Nl::Object, depth);
    }
    enc.byte(b'}');
    enc.leave();
    Ok(())
}

/// Encodes a struct, object or host value as a map of its fields; with
/// `create_additions` the class tag leads the map.
fn dump_fields_map(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    let tagged = enc.opts.create_additions && enc.opts.mode == Mode::Custom;
    write_fields_map(enc, value, depth, tagged)
}

fn write_fields_map(
    enc: &mut Encoder<'_>,
    value: &Value,
    depth: usize,
    tagged: bool,
) -> Result<(), Error> {
    let identity = match value {
        Value::Struct(s) => s.identity(),
        Value::Object(o) => o.identity(),
        Value::Other(obj) => std::rc::Rc::as_ptr(obj).cast::<()>() as usize,
        _ => return unsupported(enc, value, depth),
    };
    if !enc.enter(identity) {
        enc.raw("null");
        return Ok(());
    }
    let result = match value {
        Value::Struct(s) => {
            let s = s.borrow();
            enc.fields_map(tagged.then_some(s.name.as_str()), &s.fields, depth)
        }
        Value::Object(o) => {
            let o = o.borrow();
            enc.fields_map(tagged.then_some(o.class.as_str()), &o.fields, depth)
        }
        Value::Other(obj) => match enc.host_fields(obj.as_ref()) {
            Some(fields) => enc.fields_map(tagged.then_some(obj.class_name()), &fields, depth),
            None => {
                let text = enc.display_string(value);
                enc.string(&text)
            }
        },
        _ => Ok(()),
    };
    enc.leave();
    result
}

/// Compat mode: tagged field maps with `create_additions`, display strings
/// otherwise.
fn dump_tagged_or_display(enc: &mut Encoder<'_>, value: &Value, depth: usize) -> Result<(), Error> {
    if enc.opts.create_additions {
        write_fields_map(enc, value, depth, true)
    } else {
        let text = enc.display_string(value);
        enc.string(&text)
    }
}

/// The fallback for kinds a mode has no encoder for.
fn unsupported(enc: &mut Encoder<'_>, value: &Value, _: usize) -> Result<(), Error> {
    let mode = enc.opts.mode;
    match mode {
        Mode::Strict | Mode::Wab => Err(Error::UnsupportedType {
            kind: value.kind_name(),
            mode,
        }),
        Mode::Null => {
            enc.raw("null");
            Ok(())
        }
        _ => {
            tracing::warn!(kind = value.kind_name(), %mode, "dumping value by its display string");
            let text = enc.display_string(value);
            enc.string(&text)
        }
    }
}

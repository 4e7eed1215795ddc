//! The value materializer: turns parse events into [`Value`]s.
//!
//! In object mode it also undoes the dumper's tagging: `^o` objects are
//! resolved through the host, `^u`/`^t`/`^c` objects collapse into structs,
//! times and classes, `^i` registers a composite under its id and `"^rN"`
//! strings resolve to the composite registered as `N`.

use std::collections::HashMap;

use super::{Delegate, NumInfo, ParseError, SyntaxError, Text};
use crate::{
    Error, Host, Options, Value,
    host::{Attr, TypeHandle},
    options::{DecimalLoad, Mode},
    time::Time,
    value::{Key, Map, ObjectData, Shared, StructData},
};

/// A parsed value, or an array id marker that only means something as the
/// first element of an array.
#[derive(Debug)]
pub(crate) enum Slot {
    Value(Value),
    Id(u64, String),
}

impl Slot {
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(v) => v,
            Self::Id(_, text) => Value::Str(text),
        }
    }
}

/// Materializes a number according to `decimal_load`.
pub(crate) fn number_value(num: &NumInfo<'_>, opts: &Options) -> Value {
    if num.nan || num.infinity {
        return Value::Float(num.to_f64());
    }
    if !num.is_float() {
        return match num.as_i64() {
            Some(i) => Value::Int(i),
            None => num
                .text
                .parse()
                .map_or_else(|_| Value::Float(num.to_f64()), Value::BigInt),
        };
    }
    match (opts.decimal_load, num.big) {
        (DecimalLoad::BigDecimal, _) | (DecimalLoad::Auto, true) => num
            .text
            .parse()
            .map_or_else(|_| Value::Float(num.to_f64()), Value::Decimal),
        _ => Value::Float(num.to_f64()),
    }
}

pub(crate) struct ArrayAcc {
    items: Shared<Vec<Value>>,
    first: bool,
}

enum Kind {
    Plain,
    Generic(Shared<ObjectData>),
    Typed(TypeHandle, Vec<Attr>),
    // Registered under its id before the `^u` array is read, so references
    // inside the array resolve to the struct itself.
    PendingStruct(Shared<StructData>),
    Struct(Value),
    Time(Time),
    Class(String),
}

pub(crate) struct ObjectAcc {
    map: Shared<Map>,
    kind: Kind,
    id: Option<u64>,
    len: usize,
}

pub(crate) struct ValueBuilder<'a> {
    input: &'a [u8],
    opts: &'a Options,
    host: &'a dyn Host,
    refs: HashMap<u64, Value>,
}

impl<'a> ValueBuilder<'a> {
    pub fn new(input: &'a [u8], opts: &'a Options, host: &'a dyn Host) -> Self {
        Self {
            input,
            opts,
            host,
            refs: HashMap::new(),
        }
    }

    /// Drops the id table between documents.
    pub fn forget_references(&mut self) {
        self.refs.clear();
    }

    fn object_mode(&self) -> bool {
        self.opts.mode == Mode::Object
    }

    fn syntax(&self, message: &'static str, at: usize) -> Error {
        Error::Parse(ParseError::at(SyntaxError::Other(message), self.input, at))
    }

    fn resolve(&self, name: &str) -> Result<TypeHandle, Error> {
        self.host
            .resolve_class(name)
            .ok_or_else(|| Error::Host(format!("class {name} is not defined")))
    }

    fn map_key(&self, key: Text<'_>) -> Key {
        if self.object_mode() {
            if let Some(name) = key.tag().and_then(|t| t.strip_prefix(':')) {
                return Key::Sym(name.to_owned());
            }
        }
        if self.opts.symbol_keys || self.opts.mode == Mode::Wab {
            Key::Sym(key.text.into_owned())
        } else {
            Key::Str(key.text.into_owned())
        }
    }

    fn insert_plain(&self, obj: &mut ObjectAcc, key: Text<'_>, value: Value) {
        match &mut obj.kind {
            Kind::Generic(data) => data.borrow_mut().fields.push(Attr {
                name: field_name(key),
                value,
            }),
            Kind::Typed(_, fields) => fields.push(Attr {
                name: field_name(key),
                value,
            }),
            _ => {
                let key = self.map_key(key);
                obj.map.borrow_mut().insert(key, value);
            }
        }
    }

    /// Handles an object-mode `^` key. Returns the value back when the key
    /// turns out not to be a tag in this position.
    fn insert_tagged(
        &mut self,
        obj: &mut ObjectAcc,
        tag: &str,
        value: Value,
        at: usize,
    ) -> Result<Option<Value>, Error> {
        let first = obj.len == 1;
        match (tag, value) {
            ("^o", Value::Str(class)) if first => {
                let ty = self.resolve(&class)?;
                obj.kind = if ty.is_generic() {
                    Kind::Generic(Shared::new(ObjectData {
                        class,
                        fields: Vec::new(),
                    }))
                } else {
                    Kind::Typed(ty, Vec::new())
                };
            }
            ("^u", Value::Array(items))
                if matches!(obj.kind, Kind::Plain | Kind::PendingStruct(_)) && obj.map.borrow().is_empty() =>
            {
                let data = self.build_struct(&items.borrow(), at)?;
                let shared = match std::mem::replace(&mut obj.kind, Kind::Plain) {
                    Kind::PendingStruct(shared) => {
                        *shared.borrow_mut() = data;
                        shared
                    }
                    _ => Shared::new(data),
                };
                obj.kind = Kind::Struct(Value::Struct(shared));
            }
            ("^c", Value::Str(name)) if first => obj.kind = Kind::Class(name),
            ("^t", Value::Time(t)) if first => obj.kind = Kind::Time(t),
            ("^i", Value::Int(id)) if obj.id.is_none() => {
                let id = u64::try_from(id).map_err(|_| self.syntax("invalid circular id", at))?;
                obj.id = Some(id);
                match &obj.kind {
                    Kind::Plain => {
                        self.refs.insert(id, Value::Map(obj.map.clone()));
                    }
                    Kind::Generic(data) => {
                        self.refs.insert(id, Value::Object(data.clone()));
                    }
                    _ => {}
                }
            }
            (tag, Value::Array(pair)) if tag.starts_with("^#") && pair.borrow().len() == 2 => {
                let pair = pair.borrow();
                let key = match &pair[0] {
                    Value::Int(i) => Key::Int(*i),
                    Value::Symbol(s) => Key::Sym(s.clone()),
                    Value::Str(s) => Key::Str(s.clone()),
                    other => Key::Str(other.to_string()),
                };
                obj.map.borrow_mut().insert(key, pair[1].clone());
            }
            (_, value) => return Ok(Some(value)),
        }
        Ok(None)
    }

    fn build_struct(&self, items: &[Value], at: usize) -> Result<StructData, Error> {
        let Some((Value::Str(name), values)) = items.split_first() else {
            return Err(self.syntax("struct must start with its name", at));
        };
        let members = self.host.struct_members(name).unwrap_or_default();
        let fields = values
            .iter()
            .enumerate()
            .map(|(i, value)| Attr {
                name: members.get(i).cloned().unwrap_or_else(|| i.to_string()),
                value: value.clone(),
            })
            .collect();
        Ok(StructData {
            name: name.clone(),
            fields,
        })
    }

    /// Builds a host value from a map led by the class tag key.
    fn construct_tagged(&self, map: &Shared<Map>, class: &str) -> Result<Value, Error> {
        let ty = self.resolve(class)?;
        let tag_key = self.opts.effective_class_tag();
        let entries = std::mem::take(&mut *map.borrow_mut());
        let fields = entries
            .into_iter()
            .filter(|(k, _)| k.as_str() != Some(tag_key))
            .map(|(k, value)| Attr {
                name: k.to_string(),
                value,
            })
            .collect();
        self.host.construct(&ty, fields)
    }
}

// Field names starting with `^` or `~` were written with an extra `~`.
fn field_name(key: Text<'_>) -> String {
    match key.tag().and_then(|t| t.strip_prefix('~')) {
        Some(name) => name.to_owned(),
        None => key.text.into_owned(),
    }
}

fn is_tag(key: Option<&Text<'_>>, tag: &str) -> bool {
    key.and_then(Text::tag) == Some(tag)
}

impl Delegate for ValueBuilder<'_> {
    type Value = Slot;
    type Array = ArrayAcc;
    type Object = ObjectAcc;

    fn null(&mut self, _: Option<&Text<'_>>, _: usize) -> Result<Slot, Error> {
        Ok(Slot::Value(Value::Null))
    }

    fn boolean(&mut self, b: bool, _: Option<&Text<'_>>, _: usize) -> Result<Slot, Error> {
        Ok(Slot::Value(Value::Bool(b)))
    }

    fn number(&mut self, num: &NumInfo<'_>, key: Option<&Text<'_>>, at: usize) -> Result<Slot, Error> {
        if self.object_mode() && is_tag(key, "^t") && !num.nan && !num.infinity {
            let zone = num.has_exp.then_some(num.exp);
            let time = Time::from_unix_parts(num.neg, num.int, num.frac, zone)
                .ok_or_else(|| self.syntax("invalid time", at))?;
            return Ok(Slot::Value(Value::Time(time)));
        }
        Ok(Slot::Value(number_value(num, self.opts)))
    }

    fn string(&mut self, s: Text<'_>, key: Option<&Text<'_>>, at: usize) -> Result<Slot, Error> {
        if self.object_mode() {
            if is_tag(key, "^t") {
                if let Some(time) = Time::parse_xml(&s.text) {
                    return Ok(Slot::Value(Value::Time(time)));
                }
            }
            if let Some(tag) = s.tag() {
                if let Some(name) = tag.strip_prefix(':') {
                    return Ok(Slot::Value(Value::Symbol(name.to_owned())));
                }
                if let Some(id) = tag.strip_prefix("^r").and_then(|d| d.parse::<u64>().ok()) {
                    return self
                        .refs
                        .get(&id)
                        .cloned()
                        .map(Slot::Value)
                        .ok_or_else(|| self.syntax("reference to an unknown circular id", at));
                }
                if let Some(id) = tag.strip_prefix("^i").and_then(|d| d.parse::<u64>().ok()) {
                    return Ok(Slot::Id(id, s.text.into_owned()));
                }
            }
        }
        Ok(Slot::Value(Value::Str(s.text.into_owned())))
    }

    fn array_start(&mut self, _: Option<&Text<'_>>, _: usize) -> Result<ArrayAcc, Error> {
        Ok(ArrayAcc {
            items: Shared::new(Vec::new()),
            first: true,
        })
    }

    fn array_push(&mut self, array: &mut ArrayAcc, value: Slot) -> Result<(), Error> {
        let first = std::mem::replace(&mut array.first, false);
        match value {
            Slot::Id(id, _) if first && self.object_mode() => {
                self.refs.insert(id, Value::Array(array.items.clone()));
            }
            value => array.items.borrow_mut().push(value.into_value()),
        }
        Ok(())
    }

    fn array_end(&mut self, array: ArrayAcc, _: Option<&Text<'_>>, _: usize) -> Result<Slot, Error> {
        Ok(Slot::Value(Value::Array(array.items)))
    }

    fn object_start(&mut self, _: Option<&Text<'_>>, _: usize) -> Result<ObjectAcc, Error> {
        Ok(ObjectAcc {
            map: Shared::new(Map::new()),
            kind: Kind::Plain,
            id: None,
            len: 0,
        })
    }

    fn object_key(&mut self, obj: &mut ObjectAcc, key: &Text<'_>) -> Result<(), Error> {
        let (Some(id), Some("^u")) = (obj.id, key.tag()) else {
            return Ok(());
        };
        if self.object_mode() && matches!(obj.kind, Kind::Plain) && obj.map.borrow().is_empty() {
            let placeholder = Shared::new(StructData {
                name: String::new(),
                fields: Vec::new(),
            });
            self.refs.insert(id, Value::Struct(placeholder.clone()));
            obj.kind = Kind::PendingStruct(placeholder);
        }
        Ok(())
    }

    fn object_insert(&mut self, obj: &mut ObjectAcc, key: Text<'_>, value: Slot, at: usize) -> Result<(), Error> {
        obj.len += 1;
        let value = value.into_value();
        let value = match key.tag() {
            Some(tag) if self.object_mode() && tag.starts_with('^') => {
                match self.insert_tagged(obj, tag, value, at)? {
                    Some(value) => value,
                    None => return Ok(()),
                }
            }
            _ => value,
        };
        self.insert_plain(obj, key, value);
        Ok(())
    }

    fn object_end(
        &mut self,
        obj: ObjectAcc,
        class_tag: Option<&str>,
        _: Option<&Text<'_>>,
        at: usize,
    ) -> Result<Slot, Error> {
        let additions = self.opts.create_additions && matches!(self.opts.mode, Mode::Compat | Mode::Custom);
        let value = match obj.kind {
            Kind::Plain => match class_tag {
                Some(class) if additions => self.construct_tagged(&obj.map, class)?,
                _ => Value::Map(obj.map),
            },
            Kind::Generic(data) => Value::Object(data),
            Kind::Typed(ty, fields) => self.host.construct(&ty, fields)?,
            Kind::PendingStruct(_) => {
                return Err(self.syntax("struct id without a struct array", at));
            }
            Kind::Struct(value) => value,
            Kind::Time(t) => Value::Time(t),
            Kind::Class(name) => Value::Class(name),
        };
        if let Some(id) = obj.id {
            self.refs.insert(id, value.clone());
        }
        Ok(Slot::Value(value))
    }
}

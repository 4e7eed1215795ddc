use super::{Delegate, NumInfo, Text, build::number_value};
use crate::{Error, Options, Value};

/// Receiver for [`saj_parse`](crate::saj_parse) events.
///
/// `key` is the object key the value or container is stored under, or
/// `None` inside arrays and at the top level. `offset` is the byte offset of
/// the token that triggered the event. Every method defaults to doing
/// nothing.
#[allow(unused_variables)]
pub trait Callbacks {
    /// An object opened.
    fn object_start(&mut self, key: Option<&str>, offset: usize) {}
    /// An object closed.
    fn object_end(&mut self, key: Option<&str>, offset: usize) {}
    /// An array opened.
    fn array_start(&mut self, key: Option<&str>, offset: usize) {}
    /// An array closed.
    fn array_end(&mut self, key: Option<&str>, offset: usize) {}
    /// A scalar value.
    fn value(&mut self, value: Value, key: Option<&str>, offset: usize) {}
    /// A number. `num` is the scanned token; `value` is what
    /// [`decimal_load`](crate::Options::decimal_load) makes of it. Defaults to
    /// [`value`](Self::value).
    fn number(&mut self, num: &NumInfo<'_>, value: Value, key: Option<&str>, offset: usize) {
        self.value(value, key, offset);
    }
    /// A string, decoded. Defaults to [`value`](Self::value).
    fn string(&mut self, s: &str, key: Option<&str>, offset: usize) {
        self.value(Value::Str(s.to_owned()), key, offset);
    }
    /// Parsing failed; called once, before the error is returned.
    fn error(&mut self, error: &Error) {}
}

pub(crate) struct SajDelegate<'c, 'o, C> {
    callbacks: &'c mut C,
    opts: &'o Options,
}

impl<'c, 'o, C: Callbacks> SajDelegate<'c, 'o, C> {
    pub fn new(callbacks: &'c mut C, opts: &'o Options) -> Self {
        Self { callbacks, opts }
    }

    pub fn report(&mut self, error: &Error) {
        self.callbacks.error(error);
    }

    fn scalar(&mut self, value: Value, key: Option<&Text<'_>>, at: usize) {
        self.callbacks.value(value, key.map(|k| &*k.text), at);
    }
}

impl<C: Callbacks> Delegate for SajDelegate<'_, '_, C> {
    type Value = ();
    type Array = ();
    type Object = ();

    fn null(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.scalar(Value::Null, key, at);
        Ok(())
    }

    fn boolean(&mut self, b: bool, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.scalar(Value::Bool(b), key, at);
        Ok(())
    }

    fn number(&mut self, num: &NumInfo<'_>, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        let value = number_value(num, self.opts);
        self.callbacks.number(num, value, key.map(|k| &*k.text), at);
        Ok(())
    }

    fn string(&mut self, s: Text<'_>, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.callbacks.string(&s.text, key.map(|k| &*k.text), at);
        Ok(())
    }

    fn array_start(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.callbacks.array_start(key.map(|k| &*k.text), at);
        Ok(())
    }

    fn array_push(&mut self, _: &mut (), _: ()) -> Result<(), Error> {
        Ok(())
    }

    fn array_end(&mut self, _: (), key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.callbacks.array_end(key.map(|k| &*k.text), at);
        Ok(())
    }

    fn object_start(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.callbacks.object_start(key.map(|k| &*k.text), at);
        Ok(())
    }

    fn object_insert(&mut self, _: &mut (), _: Text<'_>, _: (), _: usize) -> Result<(), Error> {
        Ok(())
    }

    fn object_end(&mut self, _: (), _: Option<&str>, key: Option<&Text<'_>>, at: usize) -> Result<(), Error> {
        self.callbacks.object_end(key.map(|k| &*k.text), at);
        Ok(())
    }
}

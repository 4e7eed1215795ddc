//! Incremental document construction.
//!
//! A [`StringWriter`] builds one JSON document piece by piece: containers
//! are opened with `push_object`/`push_array`, filled with keys and values,
//! and closed with `pop`. Commas and indentation are inserted as needed.

use std::io::Write;

use super::{Encoder, Nl, buffer::OutputBuffer};
use crate::{Error, NoHost, Options, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object { empty: bool },
    Array { empty: bool },
}

impl Frame {
    fn is_empty(self) -> bool {
        match self {
            Self::Object { empty } | Self::Array { empty } => empty,
        }
    }

    fn filled(self) -> Self {
        match self {
            Self::Object { .. } => Self::Object { empty: false },
            Self::Array { .. } => Self::Array { empty: false },
        }
    }
}

/// Builds a JSON document into an in-memory buffer.
///
/// # Examples
///
/// ```
/// use ojson::{Mode, Options, StringWriter, Value};
///
/// let mut w = StringWriter::new(Options::with_mode(Mode::Strict));
/// w.push_object(None)?;
/// w.push_value(&Value::from(1), Some("a"))?;
/// w.push_array(Some("list"))?;
/// w.push_value(&Value::from("x"), None)?;
/// w.pop_all()?;
/// assert_eq!(w.as_str()?, r#"{"a":1,"list":["x"]}"#);
/// # Ok::<(), ojson::Error>(())
/// ```
#[derive(Debug)]
pub struct StringWriter {
    out: OutputBuffer,
    options: Options,
    stack: Vec<Frame>,
    key_written: bool,
}

impl StringWriter {
    /// An empty writer.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            out: OutputBuffer::default(),
            options,
            stack: Vec::new(),
            key_written: false,
        }
    }

    /// Number of open containers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Writes a key for the next value in the open object.
    ///
    /// # Errors
    ///
    /// [`Error::Writer`] if no object is open or a key is already pending.
    pub fn push_key(&mut self, key: &str) -> Result<(), Error> {
        match self.stack.last() {
            Some(Frame::Object { .. }) if self.key_written => Err(Error::Writer(
                "can not push more than one key before pushing a non-key",
            )),
            Some(Frame::Object { .. }) => {
                self.write_key(key)?;
                self.key_written = true;
                Ok(())
            }
            _ => Err(Error::Writer("can only push a key onto an object")),
        }
    }

    /// Opens an object, stored under `key` when the enclosing container is an
    /// object.
    ///
    /// # Errors
    ///
    /// See [`push_value`](Self::push_value).
    pub fn push_object(&mut self, key: Option<&str>) -> Result<(), Error> {
        self.open(key, b'{', Frame::Object { empty: true })
    }

    /// Opens an array.
    ///
    /// # Errors
    ///
    /// See [`push_value`](Self::push_value).
    pub fn push_array(&mut self, key: Option<&str>) -> Result<(), Error> {
        self.open(key, b'[', Frame::Array { empty: true })
    }

    /// Encodes `value` with the writer's options.
    ///
    /// # Errors
    ///
    /// [`Error::Writer`] when the open container is an object and either no
    /// key or two keys (one pushed, one given) are supplied; otherwise any
    /// error of [`dump`](crate::dump).
    pub fn push_value(&mut self, value: &Value, key: Option<&str>) -> Result<(), Error> {
        self.separate(key)?;
        let depth = self.stack.len();
        Encoder::new(&mut self.out, &self.options, &NoHost).encode(value, depth)?;
        self.finish_top_level();
        Ok(())
    }

    /// Inserts already-encoded JSON text verbatim.
    ///
    /// # Errors
    ///
    /// See [`push_value`](Self::push_value).
    pub fn push_json(&mut self, json: &str, key: Option<&str>) -> Result<(), Error> {
        self.separate(key)?;
        self.out.push_str(json);
        self.finish_top_level();
        Ok(())
    }

    /// Closes the innermost container.
    ///
    /// # Errors
    ///
    /// [`Error::Writer`] if nothing is open or a key is waiting for its value.
    pub fn pop(&mut self) -> Result<(), Error> {
        if self.key_written {
            return Err(Error::Writer("can not pop after writing a key but no value"));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(Error::Writer("can not pop with no open array or object"));
        };
        let depth = self.stack.len();
        let mut enc = Encoder::new(&mut self.out, &self.options, &NoHost);
        let (nl, close) = match frame {
            Frame::Object { .. } => (Nl::Object, b'}'),
            Frame::Array { .. } => (Nl::Array, b']'),
        };
        if !frame.is_empty() {
            enc.fill(nl, depth);
        }
        enc.byte(close);
        self.finish_top_level();
        Ok(())
    }

    /// Closes every open container.
    ///
    /// # Errors
    ///
    /// See [`pop`](Self::pop).
    pub fn pop_all(&mut self) -> Result<(), Error> {
        while !self.stack.is_empty() {
            self.pop()?;
        }
        Ok(())
    }

    /// The document written so far.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if raw JSON pushed earlier broke UTF-8.
    pub fn as_str(&self) -> Result<&str, Error> {
        self.out.as_str()
    }

    /// Discards all output and open containers.
    pub fn reset(&mut self) {
        self.out.reset();
        self.stack.clear();
        self.key_written = false;
    }

    pub(crate) fn drain_into(&mut self, w: &mut impl Write) -> Result<(), Error> {
        w.write_all(self.out.finish())?;
        self.out.reset();
        Ok(())
    }

    fn open(&mut self, key: Option<&str>, bracket: u8, frame: Frame) -> Result<(), Error> {
        self.separate(key)?;
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::Nesting {
                depth: self.stack.len() + 1,
                limit: self.options.max_depth,
            });
        }
        let mut enc = Encoder::new(&mut self.out, &self.options, &NoHost);
        enc.byte(bracket);
        self.stack.push(frame);
        Ok(())
    }

    fn write_key(&mut self, key: &str) -> Result<(), Error> {
        let depth = self.stack.len();
        if let Some(top) = self.stack.last_mut() {
            let empty = top.is_empty();
            *top = top.filled();
            let mut enc = Encoder::new(&mut self.out, &self.options, &NoHost);
            if !empty {
                enc.byte(b',');
            }
            enc.fill(Nl::Object, depth);
            enc.string(key)?;
            enc.colon();
        }
        Ok(())
    }

    // Writes whatever must precede the next value in the open container.
    fn separate(&mut self, key: Option<&str>) -> Result<(), Error> {
        let depth = self.stack.len();
        match self.stack.last_mut() {
            Some(Frame::Object { .. }) if self.key_written => {
                if key.is_some() {
                    return Err(Error::Writer(
                        "can not push more than one key before pushing a non-key",
                    ));
                }
                self.key_written = false;
                Ok(())
            }
            Some(Frame::Object { .. }) => match key {
                Some(key) => self.write_key(key),
                None => Err(Error::Writer("can not push onto an object without a key")),
            },
            Some(top @ Frame::Array { .. }) => {
                let empty = top.is_empty();
                *top = top.filled();
                let mut enc = Encoder::new(&mut self.out, &self.options, &NoHost);
                if !empty {
                    enc.byte(b',');
                }
                enc.fill(Nl::Array, depth);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn finish_top_level(&mut self) {
        if self.stack.is_empty()
            && self.options.indent > 0
            && matches!(self.out.last(), Some(b']' | b'}'))
        {
            self.out.push_str("\n");
        }
    }
}

/// A [`StringWriter`] that hands its output to `W` after every pop.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: StringWriter,
    sink: W,
}

impl<W: Write> StreamWriter<W> {
    /// Wraps `sink`.
    pub fn new(sink: W, options: Options) -> Self {
        Self {
            inner: StringWriter::new(options),
            sink,
        }
    }

    /// See [`StringWriter::push_key`].
    ///
    /// # Errors
    ///
    /// See [`StringWriter::push_key`].
    pub fn push_key(&mut self, key: &str) -> Result<(), Error> {
        self.inner.push_key(key)
    }

    /// See [`StringWriter::push_object`].
    ///
    /// # Errors
    ///
    /// See [`StringWriter::push_object`].
    pub fn push_object(&mut self, key: Option<&str>) -> Result<(), Error> {
        self.inner.push_object(key)
    }

    /// See [`StringWriter::push_array`].
    ///
    /// # Errors
    ///
    /// See [`StringWriter::push_array`].
    pub fn push_array(&mut self, key: Option<&str>) -> Result<(), Error> {
        self.inner.push_array(key)
    }

    /// See [`StringWriter::push_value`].
    ///
    /// # Errors
    ///
    /// See [`StringWriter::push_value`].
    pub fn push_value(&mut self, value: &Value, key: Option<&str>) -> Result<(), Error> {
        self.inner.push_value(value, key)
    }

    /// See [`StringWriter::push_json`].
    ///
    /// # Errors
    ///
    /// See [`StringWriter::push_json`].
    pub fn push_json(&mut self, json: &str, key: Option<&str>) -> Result<(), Error> {
        self.inner.push_json(json, key)
    }

    /// Closes the innermost container and flushes.
    ///
    /// # Errors
    ///
    /// See [`StringWriter::pop`]; write failures surface as [`Error::Io`].
    pub fn pop(&mut self) -> Result<(), Error> {
        self.inner.pop()?;
        self.flush()
    }

    /// Closes every open container and flushes.
    ///
    /// # Errors
    ///
    /// See [`pop`](Self::pop).
    pub fn pop_all(&mut self) -> Result<(), Error> {
        self.inner.pop_all()?;
        self.flush()
    }

    /// Writes buffered output to the sink.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] on write failure.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.inner.drain_into(&mut self.sink)?;
        self.sink.flush()?;
        Ok(())
    }

    /// Returns the sink, dropping unflushed output.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

//! JSON parsing over a byte slice.
//!
//! The tokenizer and the container stack live in `Parser`; what a token
//! turns into is decided by a `Delegate`. Two delegates exist: the value
//! builder behind [`parse`] (which also reconstructs typed objects and
//! circular references) and the callback adapter behind [`saj_parse`].
//!
//! Nesting is tracked with an explicit stack of `ParseFrame`s, so deeply
//! nested input never recurses; it is bounded by `max_depth` instead.

mod build;
mod error;
mod escape_buffer;
mod numbers;
mod saj;

use std::{borrow::Cow, fs::File, io::Read, path::Path};

use bstr::ByteSlice;
pub use error::{ParseError, SyntaxError};
use escape_buffer::{UnicodeEscapeBuffer, Unit, classify};
pub use numbers::NumInfo;
pub(crate) use numbers::scan_number;
pub use saj::Callbacks;

use self::build::ValueBuilder;
use crate::{Error, Host, NoHost, Options, Value};

/// Parses one JSON document.
///
/// # Errors
///
/// [`Error::Parse`] on a syntax violation, [`Error::Encoding`] on malformed
/// UTF-8 or surrogate escapes, [`Error::Nesting`] past `max_depth`, and
/// [`Error::Host`] when a tagged class cannot be resolved or built.
///
/// # Examples
///
/// ```
/// use ojson::{Mode, Options, Value, parse};
///
/// let v = parse(r#"{"a":[1,2.5,"x"]}"#, &Options::with_mode(Mode::Strict)).unwrap();
/// assert_eq!(v.get("a").and_then(|a| a.at(2)), Some(Value::from("x")));
/// ```
pub fn parse(json: &str, options: &Options) -> Result<Value, Error> {
    parse_bytes(json.as_bytes(), options, &NoHost)
}

/// Parses one JSON document, resolving tagged classes through `host`.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with_host(json: &str, options: &Options, host: &dyn Host) -> Result<Value, Error> {
    parse_bytes(json.as_bytes(), options, host)
}

/// Parses one JSON document from raw bytes, which need not be valid UTF-8
/// outside of strings.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_bytes(bytes: &[u8], options: &Options, host: &dyn Host) -> Result<Value, Error> {
    tracing::debug!(mode = %options.mode, bytes = bytes.len(), "parsing document");
    let mut parser = Parser::new(bytes, options, ValueBuilder::new(bytes, options, host));
    let value = parser.document()?;
    parser.finish()?;
    tracing::debug!(offset = parser.pos, "parsed document");
    Ok(value.into_value())
}

/// Reads `reader` to its end, then parses the contents.
///
/// # Errors
///
/// [`Error::Io`] if reading fails; otherwise see [`parse`].
pub fn parse_reader<R: Read>(mut reader: R, options: &Options) -> Result<Value, Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_bytes(&bytes, options, &NoHost)
}

/// Parses the file at `path`.
///
/// # Errors
///
/// See [`parse_reader`].
pub fn parse_file(path: impl AsRef<Path>, options: &Options) -> Result<Value, Error> {
    parse_reader(File::open(path.as_ref())?, options)
}

/// Lazily parses a sequence of whitespace-separated documents.
///
/// # Examples
///
/// ```
/// use ojson::{Options, Value, parse_many};
///
/// let opts = Options::default();
/// let docs: Result<Vec<_>, _> = parse_many("1 [2] {\"a\":3}", &opts).collect();
/// assert_eq!(docs.unwrap().len(), 3);
/// ```
pub fn parse_many<'a>(json: &'a str, options: &'a Options) -> Documents<'a> {
    let bytes = json.as_bytes();
    Documents {
        parser: Parser::new(bytes, options, ValueBuilder::new(bytes, options, &NoHost)),
        done: false,
        count: 0,
    }
}

/// Iterator returned by [`parse_many`]. Stops after the first error.
pub struct Documents<'a> {
    parser: Parser<'a, 'a, ValueBuilder<'a>>,
    done: bool,
    count: usize,
}

impl Iterator for Documents<'_> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.at_end() {
            Ok(false) => {}
            Ok(true) => {
                self.done = true;
                tracing::debug!(documents = self.count, "parsed document stream");
                return None;
            }
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        }
        let result = self.parser.document().map(build::Slot::into_value);
        self.parser.delegate.forget_references();
        self.count += 1;
        self.done = result.is_err();
        Some(result)
    }
}

/// Parses one document, reporting each value and container boundary to
/// `callbacks` instead of building a tree.
///
/// # Errors
///
/// See [`parse`]. The error is also passed to [`Callbacks::error`].
pub fn saj_parse<C: Callbacks>(json: &str, callbacks: &mut C, options: &Options) -> Result<(), Error> {
    let bytes = json.as_bytes();
    let mut parser = Parser::new(bytes, options, saj::SajDelegate::new(callbacks, options));
    let result = parser.document().and_then(|()| parser.finish());
    if let Err(err) = &result {
        parser.delegate.report(err);
    }
    result
}

// ------------------------------------------------------------------------------------------------
// Delegate
// ------------------------------------------------------------------------------------------------

/// A string token: its decoded text and whether its first character was
/// written as an escape (which hides tag prefixes from object mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Text<'a> {
    pub text: Cow<'a, str>,
    pub head_escaped: bool,
}

impl Text<'_> {
    /// The text, unless an escaped head disqualifies it as a tag.
    pub fn tag(&self) -> Option<&str> {
        (!self.head_escaped).then_some(&*self.text)
    }
}

/// Turns tokens into values.
///
/// Value callbacks receive the key the value will be stored under (when the
/// enclosing container is an object) and the byte offset of the token.
pub(crate) trait Delegate {
    type Value;
    type Array;
    type Object;

    fn null(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<Self::Value, Error>;
    fn boolean(&mut self, b: bool, key: Option<&Text<'_>>, at: usize) -> Result<Self::Value, Error>;
    fn number(&mut self, num: &NumInfo<'_>, key: Option<&Text<'_>>, at: usize) -> Result<Self::Value, Error>;
    fn string(&mut self, s: Text<'_>, key: Option<&Text<'_>>, at: usize) -> Result<Self::Value, Error>;

    fn array_start(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<Self::Array, Error>;
    fn array_push(&mut self, array: &mut Self::Array, value: Self::Value) -> Result<(), Error>;
    fn array_end(&mut self, array: Self::Array, key: Option<&Text<'_>>, at: usize) -> Result<Self::Value, Error>;

    fn object_start(&mut self, key: Option<&Text<'_>>, at: usize) -> Result<Self::Object, Error>;
    /// A key was read; its value has not been parsed yet.
    fn object_key(&mut self, object: &mut Self::Object, key: &Text<'_>) -> Result<(), Error> {
        let _ = (object, key);
        Ok(())
    }
    fn object_insert(
        &mut self,
        object: &mut Self::Object,
        key: Text<'_>,
        value: Self::Value,
        at: usize,
    ) -> Result<(), Error>;
    fn object_end(
        &mut self,
        object: Self::Object,
        class_tag: Option<&str>,
        key: Option<&Text<'_>>,
        at: usize,
    ) -> Result<Self::Value, Error>;
}

// ------------------------------------------------------------------------------------------------
// State machine
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    BeforeArrayValue,
    AfterArrayValue,
    BeforePropertyName,
    AfterPropertyName,
    BeforePropertyValue,
    AfterPropertyValue,
}

enum Container<A, O> {
    Array(A),
    Object(O),
}

/// One open container.
struct ParseFrame<'a, D: Delegate> {
    container: Container<D::Array, D::Object>,
    /// Key read for the value being parsed, objects only.
    pending_key: Option<Text<'a>>,
    /// Class named by a leading class-tag entry.
    class_tag: Option<String>,
    state: ParseState,
    count: usize,
}

enum Step<V> {
    Continue,
    Value(V),
}

pub(crate) struct Parser<'a, 'o, D: Delegate> {
    input: &'a [u8],
    pos: usize,
    opts: &'o Options,
    class_tag: &'o str,
    stack: Vec<ParseFrame<'a, D>>,
    pub(crate) delegate: D,
}

impl<'a, 'o, D: Delegate> Parser<'a, 'o, D> {
    pub(crate) fn new(input: &'a [u8], opts: &'o Options, delegate: D) -> Self {
        Self {
            input,
            pos: 0,
            opts,
            class_tag: opts.effective_class_tag(),
            stack: Vec::new(),
            delegate,
        }
    }

    fn error(&self, kind: SyntaxError, at: usize) -> Error {
        Error::Parse(ParseError::at(kind, self.input, at))
    }

    fn eof_error(&self) -> Error {
        let kind = match self.stack.last().map(|f| &f.container) {
            None => SyntaxError::UnexpectedEndOfInput,
            Some(Container::Array(_)) => SyntaxError::UnterminatedArray,
            Some(Container::Object(_)) => SyntaxError::UnterminatedObject,
        };
        self.error(kind, self.input.len())
    }

    fn invalid_char(&self, at: usize) -> Error {
        let kind = match self.input[at] {
            b',' => SyntaxError::UnexpectedComma,
            b':' => SyntaxError::UnexpectedColon,
            b']' => SyntaxError::UnexpectedArrayClose,
            b'}' => SyntaxError::UnexpectedObjectClose,
            _ => {
                let (c, _) = bstr::decode_utf8(&self.input[at..]);
                SyntaxError::InvalidCharacter(c.unwrap_or(char::REPLACEMENT_CHARACTER))
            }
        };
        self.error(kind, at)
    }

    /// Skips whitespace and comments.
    fn skip_ws(&mut self) -> Result<(), Error> {
        while let Some(&b) = self.input.get(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' => self.pos += 1,
                b'/' => match self.input.get(self.pos + 1) {
                    Some(b'*') => {
                        let body = &self.input[self.pos + 2..];
                        let end = body
                            .find("*/")
                            .ok_or_else(|| self.error(SyntaxError::UnterminatedComment, self.input.len()))?;
                        self.pos += 2 + end + 2;
                    }
                    Some(b'/') => {
                        let body = &self.input[self.pos..];
                        self.pos += body.find_byte(b'\n').unwrap_or(body.len());
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    /// Whether only whitespace and comments remain.
    pub(crate) fn at_end(&mut self) -> Result<bool, Error> {
        self.skip_ws()?;
        Ok(self.pos >= self.input.len())
    }

    /// Rejects anything but whitespace after the document.
    pub(crate) fn finish(&mut self) -> Result<(), Error> {
        if self.at_end()? {
            Ok(())
        } else {
            Err(self.error(SyntaxError::TrailingCharacters, self.pos))
        }
    }

    /// Parses the next complete document.
    pub(crate) fn document(&mut self) -> Result<D::Value, Error> {
        if self.at_end()? {
            return Err(self.error(SyntaxError::Empty, self.pos));
        }
        loop {
            let step = match self.stack.last().map(|f| f.state) {
                None | Some(ParseState::BeforeArrayValue | ParseState::BeforePropertyValue) => {
                    self.value_start()?
                }
                Some(ParseState::BeforePropertyName) => self.property_name()?,
                Some(ParseState::AfterPropertyName) => self.colon()?,
                Some(ParseState::AfterArrayValue) => self.after_value(b']')?,
                Some(ParseState::AfterPropertyValue) => self.after_value(b'}')?,
            };
            if let Step::Value(value) = step {
                if self.stack.is_empty() {
                    return Ok(value);
                }
                self.attach(value)?;
            }
        }
    }

    fn attach(&mut self, value: D::Value) -> Result<(), Error> {
        let at = self.pos;
        let Some(frame) = self.stack.last_mut() else {
            return Ok(());
        };
        frame.count += 1;
        match &mut frame.container {
            Container::Array(array) => {
                self.delegate.array_push(array, value)?;
                frame.state = ParseState::AfterArrayValue;
            }
            Container::Object(object) => {
                let key = frame.pending_key.take().unwrap_or(Text {
                    text: Cow::Borrowed(""),
                    head_escaped: false,
                });
                self.delegate.object_insert(object, key, value, at)?;
                frame.state = ParseState::AfterPropertyValue;
            }
        }
        Ok(())
    }

    fn value_start(&mut self) -> Result<Step<D::Value>, Error> {
        self.skip_ws()?;
        let at = self.pos;
        let Some(&b) = self.input.get(at) else {
            return Err(self.eof_error());
        };
        let value = match b {
            b'{' | b'[' => return self.open(b, at),
            b']' if self.stack.last().is_some_and(|f| {
                f.state == ParseState::BeforeArrayValue && f.count == 0
            }) =>
            {
                self.pos += 1;
                return self.close(at).map(Step::Value);
            }
            b'"' => {
                let text = self.read_string()?;
                self.note_class_tag(&text);
                let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
                self.delegate.string(text, key, at)?
            }
            b'n' => {
                self.literal(b"null")?;
                let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
                self.delegate.null(key, at)?
            }
            b't' | b'f' => {
                let truth = b == b't';
                self.literal(if truth { &b"true"[..] } else { &b"false"[..] })?;
                let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
                self.delegate.boolean(truth, key, at)?
            }
            b'-' | b'0'..=b'9' | b'I' | b'N' => {
                let (num, end) = numbers::read_number(self.input, at, self.opts.allow_nan)
                    .map_err(|kind| self.error(kind, at))?;
                self.pos = end;
                let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
                self.delegate.number(&num, key, at)?
            }
            _ => return Err(self.invalid_char(at)),
        };
        Ok(Step::Value(value))
    }

    fn note_class_tag(&mut self, text: &Text<'_>) {
        let class_tag = self.class_tag;
        if let Some(frame) = self.stack.last_mut() {
            let is_tag = frame.count == 0
                && frame
                    .pending_key
                    .as_ref()
                    .and_then(Text::tag)
                    .is_some_and(|k| k == class_tag);
            if is_tag {
                frame.class_tag = Some(text.text.clone().into_owned());
            }
        }
    }

    fn literal(&mut self, word: &[u8]) -> Result<(), Error> {
        if self.input[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(self.error(SyntaxError::InvalidLiteral, self.pos))
        }
    }

    fn open(&mut self, bracket: u8, at: usize) -> Result<Step<D::Value>, Error> {
        if self.stack.len() >= self.opts.max_depth {
            return Err(Error::Nesting {
                depth: self.stack.len() + 1,
                limit: self.opts.max_depth,
            });
        }
        let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
        let (container, state) = if bracket == b'[' {
            let array = self.delegate.array_start(key, at)?;
            (Container::Array(array), ParseState::BeforeArrayValue)
        } else {
            let object = self.delegate.object_start(key, at)?;
            (Container::Object(object), ParseState::BeforePropertyName)
        };
        self.stack.push(ParseFrame {
            container,
            pending_key: None,
            class_tag: None,
            state,
            count: 0,
        });
        self.pos += 1;
        Ok(Step::Continue)
    }

    fn close(&mut self, at: usize) -> Result<D::Value, Error> {
        let Some(frame) = self.stack.pop() else {
            return Err(self.invalid_char(at));
        };
        let key = self.stack.last().and_then(|f| f.pending_key.as_ref());
        match frame.container {
            Container::Array(array) => self.delegate.array_end(array, key, at),
            Container::Object(object) => {
                self.delegate
                    .object_end(object, frame.class_tag.as_deref(), key, at)
            }
        }
    }

    fn property_name(&mut self) -> Result<Step<D::Value>, Error> {
        self.skip_ws()?;
        let at = self.pos;
        match self.input.get(at) {
            None => Err(self.eof_error()),
            Some(b'"') => {
                let key = self.read_string()?;
                if let Some(frame) = self.stack.last_mut() {
                    if let Container::Object(object) = &mut frame.container {
                        self.delegate.object_key(object, &key)?;
                    }
                    frame.pending_key = Some(key);
                    frame.state = ParseState::AfterPropertyName;
                }
                Ok(Step::Continue)
            }
            Some(b'}') if self.stack.last().is_some_and(|f| f.count == 0) => {
                self.pos += 1;
                self.close(at).map(Step::Value)
            }
            Some(b',' | b'}') => Err(self.invalid_char(at)),
            Some(_) => Err(self.error(SyntaxError::ExpectedKey, at)),
        }
    }

    fn colon(&mut self) -> Result<Step<D::Value>, Error> {
        self.skip_ws()?;
        match self.input.get(self.pos) {
            None => Err(self.eof_error()),
            Some(b':') => {
                self.pos += 1;
                if let Some(frame) = self.stack.last_mut() {
                    frame.state = ParseState::BeforePropertyValue;
                }
                Ok(Step::Continue)
            }
            Some(_) => Err(self.error(SyntaxError::ExpectedColon, self.pos)),
        }
    }

    fn after_value(&mut self, close: u8) -> Result<Step<D::Value>, Error> {
        self.skip_ws()?;
        let at = self.pos;
        match self.input.get(at) {
            None => Err(self.eof_error()),
            Some(b',') => {
                self.pos += 1;
                if let Some(frame) = self.stack.last_mut() {
                    frame.state = if close == b']' {
                        ParseState::BeforeArrayValue
                    } else {
                        ParseState::BeforePropertyName
                    };
                }
                Ok(Step::Continue)
            }
            Some(&b) if b == close => {
                self.pos += 1;
                self.close(at).map(Step::Value)
            }
            Some(_) => Err(self.invalid_char(at)),
        }
    }

    // --------------------------------------------------------------------------------------------
    // Strings
    // --------------------------------------------------------------------------------------------

    fn utf8(&self, bytes: &'a [u8], at: usize) -> Result<&'a str, Error> {
        bytes.to_str().map_err(|e| {
            Error::Encoding(format!("invalid UTF-8 in string at byte {}", at + e.valid_up_to()))
        })
    }

    fn lone_surrogate(&self, at: usize) -> Result<char, Error> {
        if self.opts.allow_invalid_unicode {
            Ok(char::REPLACEMENT_CHARACTER)
        } else {
            Err(Error::Encoding(format!("invalid surrogate escape at byte {at}")))
        }
    }

    /// Reads the string whose opening quote is at `pos`. Strings without
    /// escapes are borrowed from the input.
    fn read_string(&mut self) -> Result<Text<'a>, Error> {
        let input = self.input;
        let start = self.pos + 1;
        let body = &input[start..];
        let Some(i) = body.find_byteset(b"\"\\\0") else {
            return Err(self.error(SyntaxError::UnterminatedString, input.len()));
        };
        match body[i] {
            b'"' => {
                let text = self.utf8(&body[..i], start)?;
                self.pos = start + i + 1;
                Ok(Text {
                    text: Cow::Borrowed(text),
                    head_escaped: false,
                })
            }
            0 => Err(self.error(SyntaxError::NullByteInString, start + i)),
            _ => {
                let mut out = String::with_capacity(i + 16);
                out.push_str(self.utf8(&body[..i], start)?);
                self.read_escaped(start + i, out, i == 0)
            }
        }
    }

    fn read_escaped(&mut self, mut j: usize, mut out: String, head_escaped: bool) -> Result<Text<'a>, Error> {
        let input = self.input;
        let mut high: Option<u16> = None;
        loop {
            let Some(&b) = input.get(j) else {
                return Err(self.error(SyntaxError::UnterminatedString, input.len()));
            };
            // A pending high surrogate must be followed by another \u escape.
            if (b != b'\\' || input.get(j + 1) != Some(&b'u')) && high.take().is_some() {
                out.push(self.lone_surrogate(j)?);
            }
            match b {
                b'"' => break,
                0 => return Err(self.error(SyntaxError::NullByteInString, j)),
                b'\\' => {
                    let Some(&e) = input.get(j + 1) else {
                        return Err(self.error(SyntaxError::UnterminatedString, input.len()));
                    };
                    if e == b'u' {
                        let digits = input.get(j + 2..(j + 6).min(input.len())).unwrap_or_default();
                        let unit = UnicodeEscapeBuffer::decode(digits).map_err(|kind| {
                            let at = if kind == SyntaxError::UnterminatedString { input.len() } else { j };
                            self.error(kind, at)
                        })?;
                        let pending = high.take();
                        if pending.is_some() && !(0xDC00..=0xDFFF).contains(&unit) {
                            out.push(self.lone_surrogate(j)?);
                        }
                        match classify(pending, unit) {
                            Unit::Char(c) => out.push(c),
                            Unit::High(h) => high = Some(h),
                            Unit::Lone => out.push(self.lone_surrogate(j)?),
                        }
                        j += 6;
                    } else {
                        out.push(match e {
                            b'"' => '"',
                            b'\\' => '\\',
                            b'/' => '/',
                            b'b' => '\u{8}',
                            b'f' => '\u{c}',
                            b'n' => '\n',
                            b'r' => '\r',
                            b't' => '\t',
                            other => {
                                let (c, _) = bstr::decode_utf8(&input[j + 1..]);
                                let c = c.unwrap_or(char::from(other));
                                return Err(self.error(SyntaxError::InvalidEscape(c), j));
                            }
                        });
                        j += 2;
                    }
                }
                _ => {
                    let run = &input[j..];
                    let len = run.find_byteset(b"\"\\\0").unwrap_or(run.len());
                    out.push_str(self.utf8(&run[..len], j)?);
                    j += len;
                }
            }
        }
        self.pos = j + 1;
        Ok(Text {
            text: Cow::Owned(out),
            head_escaped,
        })
    }
}

#[cfg(test)]
mod tests;

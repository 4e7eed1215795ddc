//! A JSON dump/load engine with selectable modes.
//!
//! Values are modelled by [`Value`], a closed set of kinds with one escape
//! hatch ([`Value::Other`]) for host-owned objects. [`dump`] walks a value
//! through a per-mode table of encoders; [`parse`] runs a byte-level state
//! machine whose events build a [`Value`] again (or drive [`Callbacks`]).
//!
//! The mode decides which kinds are representable and how:
//!
//! - [`Mode::Strict`] and [`Mode::Null`] write plain JSON only.
//! - [`Mode::Object`] tags everything it writes (`^o`, `^i`, `^r`, ...) so that
//!   typed objects and circular references survive a round trip.
//! - [`Mode::Compat`], [`Mode::Custom`] and [`Mode::Rails`] trade fidelity for
//!   output other JSON consumers expect.
//! - [`Mode::Wab`] is a small, strictly typed subset.
//!
//! ```
//! use ojson::{Mode, Options, Value, dump, parse};
//!
//! let opts = Options::with_mode(Mode::Strict);
//! let v = parse(r#"{"a": 1, "b": [1,2,3]}"#, &opts).unwrap();
//! assert_eq!(dump(&v, &opts).unwrap(), r#"{"a":1,"b":[1,2,3]}"#);
//! ```

pub mod dump;
mod error;
mod host;
mod options;
mod parser;
mod time;
mod value;

#[cfg(test)]
mod tests;

pub use dump::{
    Dumper, dump, dump_to_file, dump_to_writer, dump_with_host,
    writer::{StreamWriter, StringWriter},
};
pub use error::{Error, Result};
pub use host::{Attr, Host, HostObject, NoHost, TypeHandle};
pub use options::{
    DecimalLoad, EscapeMode, Layout, MAX_DEPTH, Mode, NanPolicy, Options, TimeFormat,
    default_options, set_default_options,
};
pub use parser::{
    Callbacks, Documents, NumInfo, ParseError, SyntaxError, parse, parse_bytes, parse_file,
    parse_many, parse_reader, parse_with_host, saj_parse,
};
pub use time::Time;
pub use value::{BigInt, Decimal, InvalidNumber, Key, Map, ObjectData, Shared, StructData, Value};

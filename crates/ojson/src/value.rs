//! The value model shared by the dumper and the parser.
//!
//! Scalars are stored inline. Composites live behind [`Shared`] handles so
//! that a value can appear more than once in a graph (or contain itself),
//! which is what circular-reference support round-trips.

use core::{cell, fmt, str::FromStr};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    Options,
    host::{Attr, HostObject},
    time::Time,
};

/// Insertion-ordered map storage.
pub type Map = IndexMap<Key, Value>;

/// A reference-counted, interior-mutable composite.
///
/// Cloning the handle clones the reference, not the contents. Equality on
/// handles is structural, with a pointer-equality shortcut; comparing or
/// debug-printing a cyclic graph through two distinct but isomorphic handles
/// does not terminate.
pub struct Shared<T>(Rc<cell::RefCell<T>>);

impl<T> Shared<T> {
    /// Wraps `value` in a fresh handle.
    pub fn new(value: T) -> Self {
        Self(Rc::new(cell::RefCell::new(value)))
    }

    /// Immutable access to the contents.
    ///
    /// # Panics
    ///
    /// Panics if the contents are currently mutably borrowed.
    pub fn borrow(&self) -> cell::Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutable access to the contents.
    ///
    /// # Panics
    ///
    /// Panics if the contents are currently borrowed.
    pub fn borrow_mut(&self) -> cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the allocation, stable while any handle is alive.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: PartialEq> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.borrow() == *other.borrow()
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => inner.fmt(f),
            Err(_) => f.write_str("<borrowed>"),
        }
    }
}

/// A map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A string key, the only kind plain JSON has.
    Str(String),
    /// An interned name.
    Sym(String),
    /// An integer key.
    Int(i64),
}

impl Key {
    /// The key as text, if it is a string or symbol.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Sym(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) | Self::Sym(s) => f.write_str(s),
            Self::Int(i) => i.fmt(f),
        }
    }
}

/// A named record with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructData {
    /// Struct type name.
    pub name: String,
    /// Member values in declaration order.
    pub fields: Vec<Attr>,
}

/// A generic instance of a named class.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    /// Qualified class name.
    pub class: String,
    /// Instance fields in declaration order.
    pub fields: Vec<Attr>,
}

/// An integer of arbitrary size, kept as its exact decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt(String);

impl BigInt {
    /// The decimal digits, with a leading `-` when negative.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value as an `i64`, if it fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<i128> for BigInt {
    fn from(i: i128) -> Self {
        Self(itoa::Buffer::new().format(i).to_owned())
    }
}

impl From<u128> for BigInt {
    fn from(i: u128) -> Self {
        Self(itoa::Buffer::new().format(i).to_owned())
    }
}

impl FromStr for BigInt {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidNumber);
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(InvalidNumber);
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An exact decimal number, kept as validated JSON number text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    /// The number text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Decimal {
    type Err = InvalidNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match crate::parser::scan_number(s.as_bytes()) {
            Some(len) if len == s.len() => Ok(Self(s.to_owned())),
            _ => Err(InvalidNumber),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned when text is not a valid number for [`BigInt`] or [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid number text")]
pub struct InvalidNumber;

/// Any value the engine can dump or produce by parsing.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// JSON `null`.
    #[default]
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// A machine-sized integer.
    Int(i64),
    /// An integer outside `i64`.
    BigInt(BigInt),
    /// A binary float.
    Float(f64),
    /// An exact decimal.
    Decimal(Decimal),
    /// A string.
    Str(String),
    /// An interned name.
    Symbol(String),
    /// A point in time.
    Time(Time),
    /// A reference to a class by name.
    Class(String),
    /// An ordered list.
    Array(Shared<Vec<Value>>),
    /// An insertion-ordered map.
    Map(Shared<Map>),
    /// A named record.
    Struct(Shared<StructData>),
    /// A generic class instance.
    Object(Shared<ObjectData>),
    /// A host-owned value, encoded through the [`Host`](crate::Host).
    Other(Rc<dyn HostObject>),
}

impl Value {
    /// A new array.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(Shared::new(items.into_iter().collect()))
    }

    /// A new map.
    ///
    /// # Examples
    ///
    /// ```
    /// use ojson::Value;
    ///
    /// let v = Value::map([("a", Value::from(1)), ("b", Value::Null)]);
    /// assert_eq!(v.get("a"), Some(Value::Int(1)));
    /// ```
    pub fn map<K: Into<Key>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(Shared::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// A new generic object.
    pub fn object(class: impl Into<String>, fields: impl IntoIterator<Item = Attr>) -> Self {
        Self::Object(Shared::new(ObjectData {
            class: class.into(),
            fields: fields.into_iter().collect(),
        }))
    }

    /// A new struct.
    pub fn structure(name: impl Into<String>, fields: impl IntoIterator<Item = Attr>) -> Self {
        Self::Struct(Shared::new(StructData {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }))
    }

    /// A symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    ///
    /// # Examples
    ///
    /// ```
    /// use ojson::Value;
    ///
    /// assert!(Value::Null.is_null());
    /// assert!(!Value::Bool(false).is_null());
    /// ```
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for arrays, maps, structs and objects.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Map(_) | Self::Struct(_) | Self::Object(_)
        )
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an [`Int`](Value::Int).
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The number as a float, for any numeric kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use ojson::Value;
    ///
    /// assert_eq!(Value::Int(2).as_f64(), Some(2.0));
    /// assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
    /// assert_eq!(Value::Null.as_f64(), None);
    /// ```
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::BigInt(b) => b.as_str().parse().ok(),
            Self::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    /// The text of a string or symbol.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a string key in a map, cloning the handle or scalar.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Map(map) => map.borrow().get(&Key::from(key)).cloned(),
            _ => None,
        }
    }

    /// Array element `index`, cloning the handle or scalar.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<Value> {
        match self {
            Self::Array(items) => items.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// Whether `self` and `other` are the same composite allocation.
    #[must_use]
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::Struct(a), Self::Struct(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Other(a), Self::Other(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// A short name for the value kind, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::BigInt(_) => "big integer",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Str(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Time(_) => "time",
            Self::Class(_) => "class",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::Object(_) => "object",
            Self::Other(_) => "host object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Str(a), Self::Str(b))
            | (Self::Symbol(a), Self::Symbol(b))
            | (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Self::BigInt(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<Time> for Value {
    fn from(t: Time) -> Self {
        Self::Time(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Shared::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(Shared::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Renders the value in object mode with circular tracking, so every value
/// has a textual form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = Options {
            circular: true,
            ..Options::default()
        };
        let text = crate::dump(self, &options).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_contents() {
        let a = Value::array([Value::from(1)]);
        let b = a.clone();
        if let Value::Array(items) = &b {
            items.borrow_mut().push(Value::from(2));
        }
        assert_eq!(a.at(1), Some(Value::Int(2)));
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&Value::array([Value::from(1), Value::from(2)])));
        assert_eq!(a, Value::array([Value::from(1), Value::from(2)]));
    }

    #[test]
    fn self_containing_array_equals_itself() {
        let a = Value::array([]);
        if let Value::Array(items) = &a {
            items.borrow_mut().push(a.clone());
        }
        assert_eq!(a, a.clone());
    }

    #[test]
    fn big_int_text_is_validated() {
        assert_eq!(
            "-123456789012345678901234567890".parse::<BigInt>().map(|b| b.to_string()),
            Ok("-123456789012345678901234567890".to_owned())
        );
        assert!("12a".parse::<BigInt>().is_err());
        assert!("007".parse::<BigInt>().is_err());
        assert_eq!(BigInt::from(10u128.pow(30)).as_str().len(), 31);
        assert_eq!(BigInt::from(-5i128).to_i64(), Some(-5));
    }

    #[test]
    fn decimal_text_is_validated() {
        assert!("0.1e-7".parse::<Decimal>().is_ok());
        assert!("1.".parse::<Decimal>().is_err());
        assert!("1.5x".parse::<Decimal>().is_err());
        assert_eq!(
            "3.14159265358979323846".parse::<Decimal>().map(|d| d.to_f64()),
            Ok(core::f64::consts::PI)
        );
    }
}

//! The seam between the engine and the host's object model.
//!
//! The engine never introspects foreign objects itself. Whatever it needs to
//! know about a [`Value::Other`] or a class named in a document is asked of a
//! [`Host`].

use core::{any::Any, fmt};
use std::rc::Rc;

use crate::{Error, Value, value::ObjectData};

/// One named field of an object or struct, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: Value,
}

impl Attr {
    /// Creates a field.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A value owned by the host, carried opaquely through [`Value::Other`].
pub trait HostObject: fmt::Debug {
    /// Qualified class name.
    fn class_name(&self) -> &str;

    /// Upcast for hosts that need to recover the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A class resolved by [`Host::resolve_class`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: Rc<str>,
    tag: u64,
}

impl TypeHandle {
    /// A handle the host can recognise later through `tag`.
    pub fn new(name: impl Into<Rc<str>>, tag: u64) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    /// A handle for classes without host-specific construction; objects of
    /// such classes materialize as [`Value::Object`].
    pub fn generic(name: impl Into<Rc<str>>) -> Self {
        Self::new(name, 0)
    }

    /// Class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host-defined discriminator; `0` for generic handles.
    #[must_use]
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Whether this handle was produced by [`TypeHandle::generic`].
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.tag == 0
    }
}

/// Callbacks the engine needs from its host.
///
/// Every method has a default, so `impl Host for MyHost {}` is a valid host
/// that behaves like [`NoHost`].
pub trait Host {
    /// Looks up a class named in a document. `None` means the class is not
    /// defined and the parse fails.
    fn resolve_class(&self, name: &str) -> Option<TypeHandle> {
        Some(TypeHandle::generic(name))
    }

    /// The fields a host value should be dumped with, or `None` if it has no
    /// field representation.
    fn get_fields(&self, value: &dyn HostObject) -> Option<Vec<Attr>> {
        let _ = value;
        None
    }

    /// Member names of a struct type, in declaration order. Struct documents
    /// carry values only; without names the members are numbered from `0`.
    fn struct_members(&self, name: &str) -> Option<Vec<String>> {
        let _ = name;
        None
    }

    /// Builds a value of `ty` from parsed fields.
    ///
    /// # Errors
    ///
    /// Hosts report construction failures as [`Error::Host`].
    fn construct(&self, ty: &TypeHandle, fields: Vec<Attr>) -> Result<Value, Error> {
        Ok(Value::Object(
            ObjectData {
                class: ty.name().to_owned(),
                fields,
            }
            .into(),
        ))
    }

    /// Fallback string for values a lenient mode cannot otherwise encode.
    fn to_display_string(&self, value: &dyn HostObject) -> String {
        format!("#<{}>", value.class_name())
    }
}

/// The host used when the caller supplies none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

impl Host for NoHost {}

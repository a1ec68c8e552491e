//! Generic value model shared by every entity.
//!
//! Two representations live here:
//!
//! - [`Value`] (re-exported from `serde_json`) is the owned, closed sum type
//!   used for parsed text, `meta` payloads, and serialized output. It cannot
//!   alias, so anything held as a `Value` is already reference-free.
//! - [`Dynamic`] is the loosely-typed input graph handed over by producers.
//!   Its containers are reference counted and may be shared between several
//!   parents, or even contain themselves. [`deep_copy`] turns it into a `Value`,
//!   rejecting cycles and anything that is not plain data.

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Map;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{CopyError, Error, Result};

pub use serde_json::Value;

/// Interior-mutable, reference-counted container.
pub type Shared<T> = Rc<RefCell<T>>;

/// Ordered sequence inside a [`Dynamic`] graph.
pub type DynArray = Shared<Vec<Dynamic>>;

/// Key/value record inside a [`Dynamic`] graph. Keys keep insertion order.
pub type DynObject = Shared<IndexMap<String, Dynamic>>;

/// A handle to something that is not plain data (a callback, a clock value,
/// a foreign object). It can sit inside a [`Dynamic`] graph but can never be copied.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    handle: Rc<dyn Any>,
}

impl Opaque {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            handle: Rc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}

/// Loosely-typed, possibly aliased input value.
///
/// Cloning a `Dynamic` clones the handle, not the container: both clones see
/// the same sequence or record.
#[derive(Clone)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(DynArray),
    Object(DynObject),
    Opaque(Opaque),
}

impl Dynamic {
    pub fn array(items: impl IntoIterator<Item = Dynamic>) -> Self {
        Dynamic::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Dynamic)>) -> Self {
        Dynamic::Object(Rc::new(RefCell::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn opaque<T: Any>(value: T) -> Self {
        Dynamic::Opaque(Opaque::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    /// Field of a record. `None` for missing keys and for non-records.
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        match self {
            Dynamic::Object(fields) => fields.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Item of a sequence. `None` when out of range or not a sequence.
    pub fn at(&self, index: usize) -> Option<Dynamic> {
        match self {
            Dynamic::Array(items) => items.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// Sets a field on a record, returning the previous value. No-op on non-records.
    pub fn insert(&self, key: impl Into<String>, value: Dynamic) -> Option<Dynamic> {
        match self {
            Dynamic::Object(fields) => fields.borrow_mut().insert(key.into(), value),
            _ => None,
        }
    }

    /// Appends to a sequence. No-op on non-sequences.
    pub fn push(&self, value: Dynamic) {
        if let Dynamic::Array(items) = self {
            items.borrow_mut().push(value);
        }
    }

    /// Whether both values are the same container (identity, not structure).
    pub fn ptr_eq(&self, other: &Dynamic) -> bool {
        match (self, other) {
            (Dynamic::Array(a), Dynamic::Array(b)) => Rc::ptr_eq(a, b),
            (Dynamic::Object(a), Dynamic::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// Containers are printed shallowly so that cyclic graphs can still be debugged.
impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Null => f.write_str("Null"),
            Dynamic::Bool(b) => write!(f, "Bool({b})"),
            Dynamic::Number(n) => write!(f, "Number({n})"),
            Dynamic::String(s) => write!(f, "String({s:?})"),
            Dynamic::Array(items) => match items.try_borrow() {
                Ok(items) => write!(f, "Array(len={})", items.len()),
                Err(_) => f.write_str("Array(<borrowed>)"),
            },
            Dynamic::Object(fields) => match fields.try_borrow() {
                Ok(fields) => f.debug_set().entries(fields.keys()).finish(),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
            Dynamic::Opaque(opaque) => fmt::Debug::fmt(opaque, f),
        }
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i32> for Dynamic {
    fn from(value: i32) -> Self {
        Dynamic::Number(f64::from(value))
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

/// Builds a fresh graph in which every container is unshared.
impl From<Value> for Dynamic {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Dynamic::Null, Dynamic::Number),
            Value::String(s) => Dynamic::String(s),
            Value::Array(items) => Dynamic::array(items.into_iter().map(Dynamic::from)),
            Value::Object(fields) => {
                Dynamic::object(fields.into_iter().map(|(k, v)| (k, Dynamic::from(v))))
            }
        }
    }
}

impl From<&Value> for Dynamic {
    fn from(value: &Value) -> Self {
        Dynamic::from(value.clone())
    }
}

/// Input that can be turned into a reference-free [`Value`] snapshot.
///
/// Every construction entry point takes its input through this trait, so the
/// defensive copy happens once, before validation, and nothing the caller
/// still holds can reach into the constructed entity.
pub trait Untrusted {
    fn to_plain(&self) -> std::result::Result<Cow<'_, Value>, CopyError>;
}

impl Untrusted for Value {
    fn to_plain(&self) -> std::result::Result<Cow<'_, Value>, CopyError> {
        Ok(Cow::Borrowed(self))
    }
}

impl Untrusted for Dynamic {
    fn to_plain(&self) -> std::result::Result<Cow<'_, Value>, CopyError> {
        deep_copy(self).map(Cow::Owned)
    }
}

/// Whether a looked-up value exists and is not `null`.
pub fn is_present(value: Option<&Dynamic>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// [`is_present`] for owned values.
pub fn is_present_value(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// Copies a [`Dynamic`] graph into an owned [`Value`].
///
/// Fails with [`CopyError::Cycle`] when a container is reached again while it
/// is still being copied (it is its own ancestor). The same container showing
/// up in two sibling positions is fine and is copied twice. Opaque handles and
/// non-finite numbers fail with [`CopyError::UnsupportedType`].
pub fn deep_copy(value: &Dynamic) -> std::result::Result<Value, CopyError> {
    let mut active = HashSet::new();
    copy_value(value, &mut active)
}

fn copy_value(
    value: &Dynamic,
    active: &mut HashSet<*const ()>,
) -> std::result::Result<Value, CopyError> {
    match value {
        Dynamic::Null => Ok(Value::Null),
        Dynamic::Bool(b) => Ok(Value::Bool(*b)),
        Dynamic::Number(n) => number_value(*n).ok_or_else(|| CopyError::UnsupportedType {
            type_name: format!("non-finite number ({n})"),
        }),
        Dynamic::String(s) => Ok(Value::String(s.clone())),
        Dynamic::Array(items) => {
            let id = Rc::as_ptr(items).cast::<()>();
            if !active.insert(id) {
                return Err(CopyError::Cycle);
            }
            let copied = items
                .borrow()
                .iter()
                .map(|item| copy_value(item, active))
                .collect::<std::result::Result<Vec<_>, _>>();
            active.remove(&id);
            Ok(Value::Array(copied?))
        }
        Dynamic::Object(fields) => {
            let id = Rc::as_ptr(fields).cast::<()>();
            if !active.insert(id) {
                return Err(CopyError::Cycle);
            }
            let copied = fields
                .borrow()
                .iter()
                .map(|(k, v)| copy_value(v, active).map(|v| (k.clone(), v)))
                .collect::<std::result::Result<Map<_, _>, _>>();
            active.remove(&id);
            Ok(Value::Object(copied?))
        }
        Dynamic::Opaque(opaque) => Err(CopyError::UnsupportedType {
            type_name: opaque.type_name().to_string(),
        }),
    }
}

/// Integral values within the exactly-representable range are emitted as
/// integers, everything else as a float. `None` for NaN and infinities.
pub(crate) fn number_value(n: f64) -> Option<Value> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

/// Parses a text document into a [`Value`].
pub fn parse_text(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(Error::Parse)
}

/// Pretty-prints a [`Value`] with `indent` spaces per nesting level.
pub fn emit_text(value: &Value, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser).map_err(Error::Emit)?;

    // serde_json only ever writes UTF-8.
    Ok(String::from_utf8(buf)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}

//! Value representation
//!
//! Scalars are stored inline. Strings are immutable shared slices.
//! Composites and references are shared handles whose strong count is the
//! ownership count the mutation guard inspects.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::object::{Composite, CompositeRef};

/// A VM value
#[derive(Clone, Default)]
pub enum Value {
    /// Null / undefined
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Reference cell shared by several variables
    Ref(Reference),
    /// User-defined composite (durable reference)
    Composite(Composite),
}

/// Shared reference-to-value cell
///
/// Produced by `ASSIGN_REF`: every variable bound to the same cell observes
/// writes made through any of them.
#[derive(Clone)]
pub struct Reference(Rc<RefCell<Value>>);

impl Reference {
    /// Create a new reference cell holding `value`
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Borrow the referenced value
    #[inline]
    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    /// Mutably borrow the referenced value
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    /// Clone the referenced value out of the cell
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Check if two references share one cell
    #[inline]
    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Value {
    /// Null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// String value
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Wrap a freshly constructed composite
    ///
    /// The composite's creating handle becomes the value's durable reference,
    /// so the ownership count is unchanged.
    pub fn composite(composite: Composite) -> Self {
        Value::Composite(composite)
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Ref(_) => "reference",
            Value::Composite(_) => "composite",
        }
    }

    /// Check if value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean interpretation of the value
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty() && &**s != "0",
            Value::Ref(r) => r.borrow().is_truthy(),
            Value::Composite(_) => true,
        }
    }

    /// Get as integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float, widening integers
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrowed view of the composite, if this is one
    ///
    /// The view cannot change the ownership count.
    #[inline]
    pub fn as_composite(&self) -> Option<CompositeRef<'_>> {
        match self {
            Value::Composite(c) => Some(c.view()),
            _ => None,
        }
    }

    /// Mutable access to the composite handle stored in this slot
    #[inline]
    pub fn as_composite_mut(&mut self) -> Option<&mut Composite> {
        match self {
            Value::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Value with one level of reference indirection removed
    pub fn deref_value(&self) -> Value {
        match self {
            Value::Ref(r) => r.get(),
            other => other.clone(),
        }
    }
}

/// Strict identity: same type and value; same handle for composites and references
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Composite(a), Value::Composite(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => write!(f, "1"),
            Value::Bool(false) => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => write!(f, "NAN"),
            Value::Float(x) if x.is_infinite() => {
                write!(f, "{}", if *x > 0.0 { "INF" } else { "-INF" })
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Ref(r) => match r.0.try_borrow() {
                Ok(v) => write!(f, "{}", *v),
                Err(_) => write!(f, "<borrowed>"),
            },
            Value::Composite(c) => write!(f, "{}", c.class()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Ref(r) => match r.0.try_borrow() {
                Ok(v) => write!(f, "&{:?}", *v),
                Err(_) => write!(f, "&<borrowed>"),
            },
            Value::Composite(c) => write!(f, "{:?}", c),
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", Value::Ref(self.clone()))
    }
}

//! Two-component vector values
//!
//! A vector is a composite of class `Vector` with numeric fields `x` and
//! `y`. Integer components stay integers until an operation overflows or
//! meets a float.

use std::cmp::Ordering;
use std::rc::Rc;

use ophook_engine::{Composite, CompositeRef, Fields, UnsupportedOperand, Value};

/// Class name of vector composites
pub const VECTOR_CLASS: &str = "Vector";

/// Numeric vector component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Integer component
    Int(i64),
    /// Float component
    Float(f64),
}

impl Scalar {
    /// Read a numeric value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Scalar::Int(*i)),
            Value::Float(f) => Some(Scalar::Float(*f)),
            _ => None,
        }
    }

    /// Convert to an engine value
    pub fn into_value(self) -> Value {
        match self {
            Scalar::Int(i) => Value::Int(i),
            Scalar::Float(f) => Value::Float(f),
        }
    }

    /// Widen to f64
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(i) => i as f64,
            Scalar::Float(f) => f,
        }
    }

    fn combine(
        self,
        other: Scalar,
        int: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Scalar {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => match int(a, b) {
                Some(r) => Scalar::Int(r),
                None => Scalar::Float(float(a as f64, b as f64)),
            },
            _ => Scalar::Float(float(self.as_f64(), other.as_f64())),
        }
    }

    /// Sum, promoting to float on overflow
    pub fn add(self, other: Scalar) -> Scalar {
        self.combine(other, i64::checked_add, |a, b| a + b)
    }

    /// Difference, promoting to float on overflow
    pub fn sub(self, other: Scalar) -> Scalar {
        self.combine(other, i64::checked_sub, |a, b| a - b)
    }

    /// Product, promoting to float on overflow
    pub fn mul(self, other: Scalar) -> Scalar {
        self.combine(other, i64::checked_mul, |a, b| a * b)
    }

    /// Numeric equality across int/float
    pub fn num_eq(self, other: Scalar) -> bool {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i as i64)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

/// Plain copy of a vector composite's components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    /// First component
    pub x: Scalar,
    /// Second component
    pub y: Scalar,
}

impl Vector {
    /// Create a vector
    pub fn new(x: impl Into<Scalar>, y: impl Into<Scalar>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Read a vector out of a composite
    pub fn from_composite(view: CompositeRef<'_>) -> Result<Self, UnsupportedOperand> {
        if view.class() != VECTOR_CLASS {
            return Err(UnsupportedOperand::new("vector", "composite"));
        }
        let component = |name: &str| {
            view.get(name)
                .as_ref()
                .and_then(Scalar::from_value)
                .ok_or_else(|| UnsupportedOperand::new("numeric component", "non-numeric field"))
        };
        Ok(Self {
            x: component("x")?,
            y: component("y")?,
        })
    }

    /// Read a vector out of any value
    pub fn from_value(value: &Value) -> Result<Self, UnsupportedOperand> {
        match value.as_composite() {
            Some(view) => Self::from_composite(view),
            None => Err(UnsupportedOperand::new("vector", value.type_name())),
        }
    }

    /// Create a fresh composite holding this vector
    pub fn to_composite(self) -> Composite {
        Composite::with_fields(
            VECTOR_CLASS,
            [("x", self.x.into_value()), ("y", self.y.into_value())],
        )
    }

    /// Create a fresh composite value holding this vector
    pub fn into_value(self) -> Value {
        Value::composite(self.to_composite())
    }

    /// Overwrite the components in `fields`
    pub fn write_into(self, fields: &mut Fields) {
        fields.insert(Rc::from("x"), self.x.into_value());
        fields.insert(Rc::from("y"), self.y.into_value());
    }

    /// Component-wise sum
    pub fn add(self, other: Vector) -> Vector {
        Vector {
            x: self.x.add(other.x),
            y: self.y.add(other.y),
        }
    }

    /// Component-wise difference
    pub fn sub(self, other: Vector) -> Vector {
        Vector {
            x: self.x.sub(other.x),
            y: self.y.sub(other.y),
        }
    }

    /// Scale by a scalar
    pub fn scale(self, factor: Scalar) -> Vector {
        Vector {
            x: self.x.mul(factor),
            y: self.y.mul(factor),
        }
    }

    /// Negation
    pub fn negate(self) -> Vector {
        self.scale(Scalar::Int(-1))
    }

    /// Add `delta` to every component
    pub fn step(self, delta: i64) -> Vector {
        let d = Scalar::Int(delta);
        Vector {
            x: self.x.add(d),
            y: self.y.add(d),
        }
    }

    /// Euclidean length
    pub fn magnitude(self) -> f64 {
        self.x.as_f64().hypot(self.y.as_f64())
    }

    /// Component-wise numeric equality
    pub fn num_eq(self, other: Vector) -> bool {
        self.x.num_eq(other.x) && self.y.num_eq(other.y)
    }

    /// Order by magnitude
    pub fn cmp_magnitude(self, other: Vector) -> Option<Ordering> {
        self.magnitude().partial_cmp(&other.magnitude())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_composite() {
        let v = Vector::new(3, 4.5);
        let back = Vector::from_value(&v.into_value()).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_rejects_other_values() {
        assert_eq!(
            Vector::from_value(&Value::Int(1)),
            Err(UnsupportedOperand::new("vector", "int"))
        );
        let point = Value::composite(Composite::with_fields("Point", [("x", Value::Int(1))]));
        assert!(Vector::from_value(&point).is_err());

        let partial =
            Value::composite(Composite::with_fields(VECTOR_CLASS, [("x", Value::Int(1))]));
        assert!(Vector::from_value(&partial).is_err());
    }

    #[test]
    fn test_int_components_stay_int() {
        let v = Vector::new(1, 2).add(Vector::new(10, 20));
        assert_eq!(v, Vector::new(11, 22));
        assert_eq!(Vector::new(1, 2).scale(Scalar::Float(0.5)), Vector::new(0.5, 1.0));
    }

    #[test]
    fn test_overflow_promotes() {
        let v = Vector::new(i64::MAX, 0).step(1);
        assert_eq!(v.x, Scalar::Float(i64::MAX as f64 + 1.0));
        assert_eq!(v.y, Scalar::Int(1));
    }

    #[test]
    fn test_magnitude_ordering() {
        assert_eq!(Vector::new(3, 4).magnitude(), 5.0);
        assert_eq!(
            Vector::new(3, 4).cmp_magnitude(Vector::new(-4, 3)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Vector::new(1, 0).cmp_magnitude(Vector::new(0, 2)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_numeric_equality() {
        assert!(Vector::new(1, 2).num_eq(Vector::new(1.0, 2.0)));
        assert!(!Vector::new(1, 2).num_eq(Vector::new(2, 1)));
    }
}

//! Durable reference lifecycle
//!
//! A composite has exactly one counter: the strong count of its shared
//! handle. `wrap` adds a durable reference and `unwrap` removes one, so the
//! two always act on the same counter.

use super::object::CompositeRef;
use super::value::Value;

/// Create a durable reference from a borrowed view (+1)
pub fn wrap(view: CompositeRef<'_>) -> Value {
    Value::Composite(view.handle().clone())
}

/// Destroy a durable reference (-1)
///
/// Returns the ownership count left on the composite, or `None` if `value`
/// is not a composite (it is dropped either way).
pub fn unwrap(value: Value) -> Option<usize> {
    match value {
        Value::Composite(composite) => {
            let remaining = composite.ownership_count() - 1;
            drop(composite);
            Some(remaining)
        }
        _ => None,
    }
}

//! Built-in comparison operators

use std::cmp::Ordering;

use super::arithmetic::{parse_numeric, Num};
use crate::bytecode::{Instruction, Opcode};
use crate::hook::resolver;
use crate::hook::shim::release_operands;
use crate::vm::frame::Frame;
use crate::vm::interpreter::execution::ControlFlow;
use crate::vm::interpreter::Vm;
use crate::vm::object::Composite;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

fn num_of(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

fn cmp_num(a: Num, b: Num) -> Option<Ordering> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn cmp_composite(a: &Composite, b: &Composite) -> Option<Ordering> {
    if a.ptr_eq(b) {
        return Some(Ordering::Equal);
    }
    if a.class() != b.class() {
        return None;
    }
    let (fa, fb) = (a.fields(), b.fields());
    if fa.len() != fb.len() {
        return Some(fa.len().cmp(&fb.len()));
    }
    for ((ka, va), (kb, vb)) in fa.iter().zip(fb.iter()) {
        if ka != kb {
            return None;
        }
        match compare(va, vb)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(Ordering::Equal)
}

/// Loose ordering; `None` when the operands are uncomparable
///
/// Null and booleans compare by truthiness, numbers numerically, numeric
/// strings as numbers, other strings bytewise, and composites of one class
/// field by field.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Ref(r), _) => compare(&r.borrow(), b),
        (_, Value::Ref(r)) => compare(a, &r.borrow()),
        (Value::Null, Value::Str(s)) => Some("".cmp(&**s)),
        (Value::Str(s), Value::Null) => Some((**s).cmp("")),
        (Value::Null | Value::Bool(_), _) | (_, Value::Null | Value::Bool(_)) => {
            Some(a.is_truthy().cmp(&b.is_truthy()))
        }
        (Value::Str(x), Value::Str(y)) => match (parse_numeric(x), parse_numeric(y)) {
            (Some(nx), Some(ny)) => cmp_num(nx, ny),
            _ => Some(x.cmp(y)),
        },
        (Value::Str(s), _) => match (parse_numeric(s), num_of(b)) {
            (Some(x), Some(y)) => cmp_num(x, y),
            (None, Some(_)) => Some((**s).cmp(b.to_string().as_str())),
            _ => None,
        },
        (_, Value::Str(s)) => match (num_of(a), parse_numeric(s)) {
            (Some(x), Some(y)) => cmp_num(x, y),
            (Some(_), None) => Some(a.to_string().as_str().cmp(&**s)),
            _ => None,
        },
        (Value::Composite(x), Value::Composite(y)) => cmp_composite(x, y),
        (Value::Composite(_), _) | (_, Value::Composite(_)) => None,
        _ => match (num_of(a), num_of(b)) {
            (Some(x), Some(y)) => cmp_num(x, y),
            _ => None,
        },
    }
}

/// Loose equality (`==`)
pub(crate) fn loose_equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

/// Built-in semantics of a comparison operator
pub(crate) fn comparison(op: Opcode, a: &Value, b: &Value) -> VmResult<Value> {
    let result = match op {
        Opcode::IsIdentical => Value::Bool(a == b),
        Opcode::IsNotIdentical => Value::Bool(a != b),
        Opcode::IsEqual => Value::Bool(loose_equals(a, b)),
        Opcode::IsNotEqual => Value::Bool(!loose_equals(a, b)),
        Opcode::IsSmaller => Value::Bool(compare(a, b) == Some(Ordering::Less)),
        Opcode::IsSmallerOrEqual => Value::Bool(matches!(
            compare(a, b),
            Some(Ordering::Less | Ordering::Equal)
        )),
        Opcode::Spaceship => Value::Int(match compare(a, b) {
            Some(Ordering::Less) => -1,
            Some(Ordering::Equal) => 0,
            // uncomparable operands sort after
            Some(Ordering::Greater) | None => 1,
        }),
        _ => {
            return Err(VmError::RuntimeError(format!(
                "{} is not a comparison operator",
                op
            )))
        }
    };
    Ok(result)
}

impl Vm {
    /// `R = A cmp B`
    pub(in crate::vm::interpreter) fn exec_comparison(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let result = {
            let a = resolver::view(frame, constants, instr.op1)?;
            let b = resolver::view(frame, constants, instr.op2)?;
            comparison(instr.opcode, &a, &b)?
        };
        release_operands(frame, instr)?;
        resolver::store_operand(frame, constants, instr.result, result)?;
        Ok(ControlFlow::Continue)
    }
}

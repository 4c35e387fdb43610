//! Vector operator registry
//!
//! Installs operator handlers for [`Vector`] composites into a dispatch
//! table builder. Every handler declines operands it does not understand,
//! so programs without vectors run exactly as they would without this crate.

use std::cmp::Ordering;

use ophook_engine::{
    guard, lifecycle, DispatchError, DispatchTableBuilder, HandlerResult, NormalizedUnary, Opcode,
    OperatorCall, UnaryKind, UnsupportedOperand, Value,
};
use tracing::debug;

use crate::vector::{Scalar, Vector};

/// Register all vector operators into the given builder.
pub fn register_operators(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    register_arithmetic(builder)?;
    register_comparison(builder)?;
    register_assignment(builder)?;
    register_step(builder)?;
    debug!(handlers = builder.len(), "vector operators registered");
    Ok(())
}

/// Second operand of a binary call
fn second(call: &OperatorCall<'_>) -> Result<Value, UnsupportedOperand> {
    match call.op2() {
        Some(view) => Ok(Value::clone(&view)),
        None => Err(UnsupportedOperand::new("second operand", "none")),
    }
}

fn both_vectors(call: &OperatorCall<'_>) -> Result<(Vector, Vector), UnsupportedOperand> {
    let a = Vector::from_value(&call.op1())?;
    let b = Vector::from_value(&second(call)?)?;
    Ok((a, b))
}

// ============================================================================
// Arithmetic
// ============================================================================

fn register_arithmetic(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    builder.set(Opcode::Add, |call| {
        let (a, b) = both_vectors(call)?;
        call.set_result(a.add(b).into_value())?;
        Ok(true)
    })?;

    builder.set(Opcode::Sub, |call| {
        let (a, b) = both_vectors(call)?;
        call.set_result(a.sub(b).into_value())?;
        Ok(true)
    })?;

    builder.set(Opcode::Mul, multiply)?;
    Ok(())
}

/// `v * s`, `s * v`, and the desugared `-v` / `+v`
fn multiply(call: &mut OperatorCall<'_>) -> HandlerResult {
    let unary = match call.normalized_unary() {
        Some(unary) => Some(apply_unary(&unary)?),
        None => None,
    };
    if let Some(result) = unary {
        call.set_result(result)?;
        return Ok(true);
    }

    let lhs = Value::clone(&call.op1());
    let rhs = second(call)?;
    let scaled = match (Vector::from_value(&lhs), Vector::from_value(&rhs)) {
        (Ok(v), Err(_)) => v.scale(scalar(&rhs)?),
        (Err(_), Ok(v)) => v.scale(scalar(&lhs)?),
        (Ok(_), Ok(_)) => return Err(UnsupportedOperand::new("scalar", "vector").into()),
        (Err(e), Err(_)) => return Err(e.into()),
    };
    call.set_result(scaled.into_value())?;
    Ok(true)
}

fn apply_unary(unary: &NormalizedUnary<'_>) -> Result<Value, UnsupportedOperand> {
    let view = unary
        .operand
        .as_composite()
        .ok_or_else(|| UnsupportedOperand::new("vector", unary.operand.type_name()))?;
    let v = Vector::from_composite(view)?;
    Ok(match unary.kind {
        UnaryKind::Negate => v.negate().into_value(),
        // `+v` is the same vector
        UnaryKind::Plus => lifecycle::wrap(view),
    })
}

fn scalar(value: &Value) -> Result<Scalar, UnsupportedOperand> {
    Scalar::from_value(value).ok_or_else(|| UnsupportedOperand::new("number", value.type_name()))
}

// ============================================================================
// Comparison
// ============================================================================

fn register_comparison(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    builder.set(Opcode::IsEqual, |call| {
        let (a, b) = both_vectors(call)?;
        call.set_result(Value::Bool(a.num_eq(b)))?;
        Ok(true)
    })?;

    builder.set(Opcode::IsNotEqual, |call| {
        let (a, b) = both_vectors(call)?;
        call.set_result(Value::Bool(!a.num_eq(b)))?;
        Ok(true)
    })?;

    builder.set(Opcode::Spaceship, |call| {
        let (a, b) = both_vectors(call)?;
        let order = match a.cmp_magnitude(b) {
            Some(Ordering::Less) => -1,
            Some(Ordering::Equal) => 0,
            Some(Ordering::Greater) | None => 1,
        };
        call.set_result(Value::Int(order))?;
        Ok(true)
    })?;
    Ok(())
}

// ============================================================================
// In-place updates
// ============================================================================

/// Replace the vector held by op1 with `next`, separating it first
///
/// When the instruction has a result, it receives another durable reference
/// to the updated composite.
fn update_in_place(call: &mut OperatorCall<'_>, next: Vector) -> HandlerResult {
    let wants_result = call.has_result();
    let result = {
        let mut target = call.op1_mut()?;
        guard::separate(&mut target);
        let got = target.type_name();
        let composite = match target.as_composite_mut() {
            Some(composite) => composite,
            None => return Err(UnsupportedOperand::new("vector", got).into()),
        };
        next.write_into(&mut *composite.fields_mut()?);
        wants_result.then(|| lifecycle::wrap(composite.view()))
    };
    if let Some(value) = result {
        call.set_result(value)?;
    }
    Ok(true)
}

fn register_assignment(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    builder.set(Opcode::AssignAdd, |call| {
        let (a, b) = both_vectors(call)?;
        update_in_place(call, a.add(b))
    })?;

    builder.set(Opcode::AssignSub, |call| {
        let (a, b) = both_vectors(call)?;
        update_in_place(call, a.sub(b))
    })?;

    builder.set(Opcode::AssignMul, |call| {
        let a = Vector::from_value(&call.op1())?;
        let factor = scalar(&second(call)?)?;
        update_in_place(call, a.scale(factor))
    })?;
    Ok(())
}

fn register_step(builder: &mut DispatchTableBuilder) -> Result<(), DispatchError> {
    for (opcode, delta) in [(Opcode::PreInc, 1), (Opcode::PreDec, -1)] {
        builder.set(opcode, move |call| {
            let v = Vector::from_value(&call.op1())?;
            update_in_place(call, v.step(delta))
        })?;
    }

    for (opcode, delta) in [(Opcode::PostInc, 1), (Opcode::PostDec, -1)] {
        builder.set(opcode, move |call| {
            let v = Vector::from_value(&call.op1())?;
            {
                let mut target = call.op1_mut()?;
                guard::separate(&mut target);
                if let Some(composite) = target.as_composite_mut() {
                    v.step(delta).write_into(&mut *composite.fields_mut()?);
                }
            }
            // the old value is a fresh vector, not the updated composite
            call.set_result(v.into_value())?;
            Ok(true)
        })?;
    }
    Ok(())
}

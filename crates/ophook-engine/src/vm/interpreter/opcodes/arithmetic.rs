//! Built-in arithmetic, bitwise and string operators

use crate::bytecode::{Instruction, Opcode};
use crate::hook::resolver;
use crate::hook::shim::release_operands;
use crate::vm::frame::Frame;
use crate::vm::interpreter::execution::ControlFlow;
use crate::vm::interpreter::Vm;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Numeric operand after coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    #[inline]
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Num::Int(i) => i == 0,
            Num::Float(f) => f == 0.0,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

/// Parse a numeric string (`"12"`, `" 1.5 "`, `"1e3"`)
pub(crate) fn parse_numeric(s: &str) -> Option<Num> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Num::Int(i));
    }
    let plausible = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !plausible {
        return None;
    }
    s.parse::<f64>().ok().map(Num::Float)
}

fn unsupported(op: Opcode, a: &Value, b: &Value) -> VmError {
    VmError::UnsupportedOperandTypes {
        op,
        left: a.type_name(),
        right: b.type_name(),
    }
}

/// Coerce a scalar for arithmetic
pub(crate) fn to_num(op: Opcode, value: &Value) -> VmResult<Num> {
    match value {
        Value::Null => Ok(Num::Int(0)),
        Value::Bool(b) => Ok(Num::Int(*b as i64)),
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Float(f) => Ok(Num::Float(*f)),
        Value::Str(s) => parse_numeric(s).ok_or_else(|| {
            VmError::TypeError(format!("Non-numeric value \"{}\" used with {}", s, op))
        }),
        Value::Ref(_) | Value::Composite(_) => Err(VmError::UnsupportedOperandType {
            op,
            operand: value.type_name(),
        }),
    }
}

/// Coerce a value for integer-only operators
fn to_int(op: Opcode, value: &Value) -> VmResult<i64> {
    match to_num(op, value)? {
        Num::Int(i) => Ok(i),
        Num::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Num::Float(_) => Err(VmError::Arithmetic(format!(
            "Non-finite float used with {}",
            op
        ))),
    }
}

fn checked(int: Option<i64>, fallback: impl FnOnce() -> f64) -> Num {
    match int {
        Some(i) => Num::Int(i),
        None => Num::Float(fallback()),
    }
}

fn add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked(x.checked_add(y), || x as f64 + y as f64),
        _ => Num::Float(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked(x.checked_sub(y), || x as f64 - y as f64),
        _ => Num::Float(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked(x.checked_mul(y), || x as f64 * y as f64),
        _ => Num::Float(a.as_f64() * b.as_f64()),
    }
}

fn div(a: Num, b: Num) -> VmResult<Num> {
    if b.is_zero() {
        return Err(VmError::DivisionByZero);
    }
    Ok(match (a, b) {
        (Num::Int(x), Num::Int(y)) if x.checked_rem(y) == Some(0) => {
            checked(x.checked_div(y), || x as f64 / y as f64)
        }
        _ => Num::Float(a.as_f64() / b.as_f64()),
    })
}

fn pow(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) if y >= 0 => {
            let exact = u32::try_from(y).ok().and_then(|y| x.checked_pow(y));
            checked(exact, || (x as f64).powf(y as f64))
        }
        _ => Num::Float(a.as_f64().powf(b.as_f64())),
    }
}

fn shift(op: Opcode, x: i64, by: i64) -> VmResult<i64> {
    if by < 0 {
        return Err(VmError::Arithmetic("Bit shift by negative number".to_string()));
    }
    let left = op == Opcode::Shl;
    Ok(match (left, by >= 64) {
        (true, true) => 0,
        (true, false) => x.wrapping_shl(by as u32),
        (false, true) => {
            if x < 0 {
                -1
            } else {
                0
            }
        }
        (false, false) => x >> by,
    })
}

/// Built-in semantics of a binary arithmetic, bitwise or string operator
pub(crate) fn binary_arithmetic(op: Opcode, a: &Value, b: &Value) -> VmResult<Value> {
    let opaque = |v: &Value| matches!(v, Value::Composite(_) | Value::Ref(_));
    if op != Opcode::BoolXor && (opaque(a) || opaque(b)) {
        return Err(unsupported(op, a, b));
    }
    match op {
        Opcode::Concat => Ok(Value::string(&format!("{}{}", a, b))),
        Opcode::BoolXor => Ok(Value::Bool(a.is_truthy() ^ b.is_truthy())),
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Pow => {
            let x = to_num(op, a)?;
            let y = to_num(op, b)?;
            let result = match op {
                Opcode::Add => add(x, y),
                Opcode::Sub => sub(x, y),
                Opcode::Mul => mul(x, y),
                Opcode::Div => div(x, y)?,
                _ => pow(x, y),
            };
            Ok(result.into_value())
        }
        Opcode::Mod | Opcode::Shl | Opcode::Shr | Opcode::BitAnd | Opcode::BitOr
        | Opcode::BitXor => {
            let x = to_int(op, a)?;
            let y = to_int(op, b)?;
            let result = match op {
                Opcode::Mod => {
                    if y == 0 {
                        return Err(VmError::ModuloByZero);
                    }
                    x.checked_rem(y).unwrap_or(0)
                }
                Opcode::Shl | Opcode::Shr => shift(op, x, y)?,
                Opcode::BitAnd => x & y,
                Opcode::BitOr => x | y,
                _ => x ^ y,
            };
            Ok(Value::Int(result))
        }
        _ => Err(VmError::RuntimeError(format!(
            "{} is not an arithmetic operator",
            op
        ))),
    }
}

/// Built-in semantics of `~A` and `!A`
pub(crate) fn unary(op: Opcode, a: &Value) -> VmResult<Value> {
    match op {
        Opcode::BoolNot => Ok(Value::Bool(!a.is_truthy())),
        Opcode::BitNot => match a {
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Float(f) if f.is_finite() => Ok(Value::Int(!(f.trunc() as i64))),
            _ => Err(VmError::UnsupportedOperandType {
                op,
                operand: a.type_name(),
            }),
        },
        _ => Err(VmError::RuntimeError(format!("{} is not a unary operator", op))),
    }
}

/// Built-in `++` / `--` step
///
/// `null++` is 1 and `null--` stays null.
pub(crate) fn step(op: Opcode, a: &Value) -> VmResult<Value> {
    let up = matches!(op, Opcode::PreInc | Opcode::PostInc);
    let delta = if up { Num::Int(1) } else { Num::Int(-1) };
    match a {
        Value::Null if up => Ok(Value::Int(1)),
        Value::Null => Ok(Value::Null),
        Value::Bool(_) => Ok(a.clone()),
        Value::Int(_) | Value::Float(_) | Value::Str(_) => {
            let n = match a {
                Value::Str(s) => parse_numeric(s).ok_or_else(|| {
                    VmError::TypeError(format!("Cannot {} non-numeric string", op))
                })?,
                Value::Float(f) => Num::Float(*f),
                _ => Num::Int(a.as_int().unwrap_or(0)),
            };
            Ok(add(n, delta).into_value())
        }
        Value::Ref(_) | Value::Composite(_) => Err(VmError::UnsupportedOperandType {
            op,
            operand: a.type_name(),
        }),
    }
}

impl Vm {
    /// `R = A op B` for arithmetic, bitwise and string operators
    pub(in crate::vm::interpreter) fn exec_arithmetic(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let result = {
            let a = resolver::view(frame, constants, instr.op1)?;
            let b = resolver::view(frame, constants, instr.op2)?;
            binary_arithmetic(instr.opcode, &a, &b)?
        };
        release_operands(frame, instr)?;
        resolver::store_operand(frame, constants, instr.result, result)?;
        Ok(ControlFlow::Continue)
    }

    /// `R = ~A` / `R = !A`
    pub(in crate::vm::interpreter) fn exec_unary(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let result = {
            let a = resolver::view(frame, constants, instr.op1)?;
            unary(instr.opcode, &a)?
        };
        release_operands(frame, instr)?;
        resolver::store_operand(frame, constants, instr.result, result)?;
        Ok(ControlFlow::Continue)
    }
}

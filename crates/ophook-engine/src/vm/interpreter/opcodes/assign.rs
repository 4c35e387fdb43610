//! Built-in assignment, compound assignment and increment/decrement

use super::arithmetic::{binary_arithmetic, step};
use crate::bytecode::{Instruction, Operand};
use crate::hook::resolver::{self, OperandViewMut};
use crate::hook::shim::release_operands;
use crate::vm::frame::Frame;
use crate::vm::interpreter::execution::ControlFlow;
use crate::vm::interpreter::Vm;
use crate::vm::value::{Reference, Value};
use crate::vm::{VmError, VmResult};

/// Replace the value behind `target` (one dereference) with `f(current)`
///
/// Returns the value before and after.
fn update(
    frame: &mut Frame,
    constants: &[Value],
    target: Operand,
    f: impl FnOnce(&Value) -> VmResult<Value>,
) -> VmResult<(Value, Value)> {
    let slot = resolver::resolve_mut(frame, constants, target)?;
    let mut view = OperandViewMut::of(slot);
    let next = f(&view)?;
    let previous = std::mem::replace(&mut *view, next.clone());
    Ok((previous, next))
}

impl Vm {
    /// `A = B` (and `R = A` when R is used)
    ///
    /// Composites are shared, not copied: the assignment adds a durable
    /// reference.
    pub(in crate::vm::interpreter) fn exec_assign(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let value = resolver::load(frame, constants, instr.op2)?;
        release_operands(frame, instr)?;
        if !instr.result.is_unused() {
            resolver::store_operand(frame, constants, instr.result, value.clone())?;
        }
        resolver::store_operand(frame, constants, instr.op1, value)?;
        Ok(ControlFlow::Continue)
    }

    /// `A =& B`: bind both variables to one reference cell
    pub(in crate::vm::interpreter) fn exec_assign_ref(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let source = resolver::resolve_mut(frame, constants, instr.op2)?;
        let cell = match source {
            Value::Ref(cell) => cell.clone(),
            other => {
                let cell = Reference::new(std::mem::take(other));
                *other = Value::Ref(cell.clone());
                cell
            }
        };
        // rebinds op1; does not write through a reference op1 may hold
        *resolver::resolve_mut(frame, constants, instr.op1)? = Value::Ref(cell);
        Ok(ControlFlow::Continue)
    }

    /// `A op= B`
    pub(in crate::vm::interpreter) fn exec_compound_assign(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let base = instr.opcode.compound_base().ok_or_else(|| {
            VmError::RuntimeError(format!("{} is not a compound assignment", instr.opcode))
        })?;
        let rhs = resolver::load(frame, constants, instr.op2)?;
        let (_, next) = update(frame, constants, instr.op1, |current| {
            binary_arithmetic(base, current, &rhs)
        })?;
        release_operands(frame, instr)?;
        if !instr.result.is_unused() {
            resolver::store_operand(frame, constants, instr.result, next)?;
        }
        Ok(ControlFlow::Continue)
    }

    /// `++A` / `--A` (and `R = A` when R is used)
    pub(in crate::vm::interpreter) fn exec_pre_step(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let op = instr.opcode;
        let (_, next) = update(frame, constants, instr.op1, |current| step(op, current))?;
        if !instr.result.is_unused() {
            resolver::store_operand(frame, constants, instr.result, next)?;
        }
        Ok(ControlFlow::Continue)
    }

    /// `R = A; A++` / `R = A; A--`
    pub(in crate::vm::interpreter) fn exec_post_step(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let op = instr.opcode;
        let (previous, _) = update(frame, constants, instr.op1, |current| step(op, current))?;
        resolver::store_operand(frame, constants, instr.result, previous)?;
        Ok(ControlFlow::Continue)
    }
}

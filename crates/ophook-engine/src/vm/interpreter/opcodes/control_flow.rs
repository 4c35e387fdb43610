//! Built-in control flow and slot management

use crate::bytecode::{Instruction, Operand};
use crate::hook::resolver;
use crate::vm::frame::Frame;
use crate::vm::interpreter::execution::ControlFlow;
use crate::vm::interpreter::Vm;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

impl Vm {
    /// `if !A goto ext`
    pub(in crate::vm::interpreter) fn exec_jump_if_false(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let truthy = resolver::view(frame, constants, instr.op1)?.is_truthy();
        if let Operand::Temporary(index) = instr.op1 {
            frame.release_temporary(index)?;
        }
        if truthy {
            Ok(ControlFlow::Continue)
        } else {
            Ok(ControlFlow::Jump(instr.ext as usize))
        }
    }

    /// `return A`
    pub(in crate::vm::interpreter) fn exec_return(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let value = resolver::load(frame, constants, instr.op1)?;
        if let Operand::Temporary(index) = instr.op1 {
            frame.release_temporary(index)?;
        }
        Ok(ControlFlow::Return(value))
    }

    /// Release temporary A
    pub(in crate::vm::interpreter) fn exec_free(
        &self,
        frame: &mut Frame,
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        match instr.op1 {
            Operand::Temporary(index) => {
                frame.release_temporary(index)?;
                Ok(ControlFlow::Continue)
            }
            other => Err(VmError::RuntimeError(format!(
                "FREE expects a temporary, got {}",
                other
            ))),
        }
    }
}

//! Built-in composite construction and field access

use crate::bytecode::{Function, Instruction, Opcode, Operand};
use crate::hook::resolver::{self, OperandViewMut};
use crate::vm::frame::Frame;
use crate::vm::guard;
use crate::vm::interpreter::execution::ControlFlow;
use crate::vm::interpreter::Vm;
use crate::vm::object::Composite;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Field name from a key operand
fn field_key(key: &Value) -> VmResult<String> {
    match key {
        Value::Str(s) => Ok(s.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        other => Err(VmError::TypeError(format!(
            "Cannot use {} as a field name",
            other.type_name()
        ))),
    }
}

fn release(frame: &mut Frame, operand: Operand) -> VmResult<()> {
    if let Operand::Temporary(index) = operand {
        frame.release_temporary(index)?;
    }
    Ok(())
}

impl Vm {
    /// `R = new A`
    pub(in crate::vm::interpreter) fn exec_new_composite(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let class = match resolver::resolve(frame, constants, instr.op1)? {
            Value::Str(name) => name.clone(),
            other => {
                return Err(VmError::TypeError(format!(
                    "Class name must be a string, got {}",
                    other.type_name()
                )))
            }
        };
        let composite = Composite::new(&class);
        resolver::store_operand(frame, constants, instr.result, Value::composite(composite))?;
        Ok(ControlFlow::Continue)
    }

    /// `A[B] = <OP_DATA value>`
    ///
    /// A shared composite is separated first, so other holders keep the old
    /// field values.
    pub(in crate::vm::interpreter) fn exec_set_field(
        &self,
        frame: &mut Frame,
        function: &Function,
        instr: &Instruction,
        pc: usize,
    ) -> VmResult<ControlFlow> {
        let constants = &function.constants;
        let data = match function.code.get(pc + 1) {
            Some(next) if next.opcode == Opcode::OpData => *next,
            _ => {
                return Err(VmError::RuntimeError(format!(
                    "SET_FIELD at {} is not followed by OP_DATA",
                    pc
                )))
            }
        };
        let key = field_key(&*resolver::view(frame, constants, instr.op2)?)?;
        let value = resolver::load(frame, constants, data.op1)?;

        {
            let slot = resolver::resolve_mut(frame, constants, instr.op1)?;
            let mut target = OperandViewMut::of(slot);
            guard::separate(&mut target);
            match target.as_composite_mut() {
                Some(composite) => composite.set(&key, value)?,
                None => {
                    return Err(VmError::TypeError(format!(
                        "Cannot set field \"{}\" on {}",
                        key,
                        target.type_name()
                    )))
                }
            }
        }

        release(frame, instr.op2)?;
        release(frame, data.op1)?;
        Ok(ControlFlow::Jump(pc + 2))
    }

    /// `R = A[B]`; missing fields read as null
    pub(in crate::vm::interpreter) fn exec_get_field(
        &self,
        frame: &mut Frame,
        constants: &[Value],
        instr: &Instruction,
    ) -> VmResult<ControlFlow> {
        let value = {
            let key = field_key(&*resolver::view(frame, constants, instr.op2)?)?;
            let target = resolver::view(frame, constants, instr.op1)?;
            match target.as_composite() {
                Some(composite) => composite.get(&key).unwrap_or_default(),
                None => {
                    return Err(VmError::TypeError(format!(
                        "Cannot read field \"{}\" of {}",
                        key,
                        target.type_name()
                    )))
                }
            }
        };
        release(frame, instr.op1)?;
        release(frame, instr.op2)?;
        resolver::store_operand(frame, constants, instr.result, value)?;
        Ok(ControlFlow::Continue)
    }
}

//! Function verification
//!
//! Checks the operand shapes the interpreter and the hook layer rely on,
//! so that neither has to re-validate descriptors at run time.

use super::instr::{Function, Instruction, Operand};
use super::opcode::Opcode;
use crate::hook::classifier::OperatorCategory;
use crate::vm::value::Value;

/// Function verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Constant index out of range
    #[error("Invalid constant reference c{index} (pool size {max}) at {pc}")]
    InvalidConstantRef {
        /// Referenced index
        index: u32,
        /// Constant pool size
        max: usize,
        /// Instruction position
        pc: usize,
    },

    /// Temporary index out of range
    #[error("Invalid temporary t{index} (max {max}) at {pc}")]
    InvalidTemporaryRef {
        /// Referenced index
        index: u32,
        /// Number of temporaries
        max: u32,
        /// Instruction position
        pc: usize,
    },

    /// Compiled variable index out of range
    #[error("Invalid compiled variable v{index} (max {max}) at {pc}")]
    InvalidVariableRef {
        /// Referenced index
        index: u32,
        /// Number of compiled variables
        max: usize,
        /// Instruction position
        pc: usize,
    },

    /// Dynamic variable whose name constant is not a string
    #[error("Dynamic variable name c{index} is not a string at {pc}")]
    InvalidVariableName {
        /// Constant holding the name
        index: u32,
        /// Instruction position
        pc: usize,
    },

    /// Required operand is Unused
    #[error("{opcode} requires operand {position} at {pc}")]
    MissingOperand {
        /// Instruction opcode
        opcode: Opcode,
        /// Which operand ("op1", "op2" or "result")
        position: &'static str,
        /// Instruction position
        pc: usize,
    },

    /// Operand or result descriptor is of a kind the opcode cannot accept
    #[error("{opcode} cannot use {operand} as {position} at {pc}")]
    InvalidOperandKind {
        /// Instruction opcode
        opcode: Opcode,
        /// Offending descriptor
        operand: Operand,
        /// Which operand ("op1", "op2" or "result")
        position: &'static str,
        /// Instruction position
        pc: usize,
    },

    /// SetField not followed by OpData
    #[error("SET_FIELD at {0} is not followed by OP_DATA")]
    MissingOpData(usize),

    /// Jump target out of range
    #[error("Invalid jump target {target} at {pc}")]
    InvalidJumpTarget {
        /// Requested target
        target: u32,
        /// Instruction position
        pc: usize,
    },

    /// Execution falls off end
    #[error("Execution falls off end of function at {0}")]
    FallOffEnd(usize),
}

/// Verify a single function
pub fn verify_function(function: &Function) -> Result<(), VerifyError> {
    let len = function.code.len();
    if len == 0 {
        return Err(VerifyError::FallOffEnd(0));
    }

    for (pc, instr) in function.code.iter().enumerate() {
        for operand in [instr.op1, instr.op2, instr.result] {
            verify_ref(function, operand, pc)?;
        }
        verify_shape(function, instr, pc)?;

        if instr.opcode.is_jump() && instr.ext as usize >= len {
            return Err(VerifyError::InvalidJumpTarget {
                target: instr.ext,
                pc,
            });
        }
    }

    // Last instruction must not fall through
    let last = len - 1;
    if !function.code[last].opcode.is_terminator() {
        return Err(VerifyError::FallOffEnd(last));
    }

    Ok(())
}

fn verify_ref(function: &Function, operand: Operand, pc: usize) -> Result<(), VerifyError> {
    match operand {
        Operand::Unused => Ok(()),
        Operand::Constant(index) => {
            if (index as usize) < function.constants.len() {
                Ok(())
            } else {
                Err(VerifyError::InvalidConstantRef {
                    index,
                    max: function.constants.len(),
                    pc,
                })
            }
        }
        Operand::Temporary(index) => {
            if index < function.num_temporaries {
                Ok(())
            } else {
                Err(VerifyError::InvalidTemporaryRef {
                    index,
                    max: function.num_temporaries,
                    pc,
                })
            }
        }
        Operand::CompiledVariable(index) => {
            if (index as usize) < function.compiled_variables.len() {
                Ok(())
            } else {
                Err(VerifyError::InvalidVariableRef {
                    index,
                    max: function.compiled_variables.len(),
                    pc,
                })
            }
        }
        Operand::DynamicVariable(index) => match function.constants.get(index as usize) {
            Some(Value::Str(_)) => Ok(()),
            Some(_) => Err(VerifyError::InvalidVariableName { index, pc }),
            None => Err(VerifyError::InvalidConstantRef {
                index,
                max: function.constants.len(),
                pc,
            }),
        },
    }
}

fn verify_shape(function: &Function, instr: &Instruction, pc: usize) -> Result<(), VerifyError> {
    let op = instr.opcode;

    if let Some(category) = OperatorCategory::of(op) {
        require(op, instr.op1, "op1", pc)?;
        if category.has_second_operand() {
            require(op, instr.op2, "op2", pc)?;
        }
        if category.is_assignment() {
            variable(op, instr.op1, "op1", pc)?;
        }
        return match category {
            OperatorCategory::UnaryAssignPost => match instr.result {
                Operand::Temporary(_) => Ok(()),
                other => Err(invalid(op, other, "result", pc)),
            },
            _ => optional_result(op, instr.result, pc),
        };
    }

    match op {
        Opcode::Nop | Opcode::Jmp => Ok(()),
        Opcode::Assign => {
            variable(op, instr.op1, "op1", pc)?;
            require(op, instr.op2, "op2", pc)?;
            optional_result(op, instr.result, pc)
        }
        Opcode::AssignRef => {
            variable(op, instr.op1, "op1", pc)?;
            variable(op, instr.op2, "op2", pc)
        }
        Opcode::NewComposite => {
            match instr.op1 {
                Operand::Constant(index)
                    if matches!(function.constants.get(index as usize), Some(Value::Str(_))) => {}
                other => return Err(invalid(op, other, "op1", pc)),
            }
            required_result(op, instr.result, pc)
        }
        Opcode::SetField => {
            variable(op, instr.op1, "op1", pc)?;
            require(op, instr.op2, "op2", pc)?;
            match function.code.get(pc + 1) {
                Some(next) if next.opcode == Opcode::OpData => Ok(()),
                _ => Err(VerifyError::MissingOpData(pc)),
            }
        }
        Opcode::OpData | Opcode::JmpIfFalse => require(op, instr.op1, "op1", pc),
        Opcode::GetField => {
            require(op, instr.op1, "op1", pc)?;
            require(op, instr.op2, "op2", pc)?;
            required_result(op, instr.result, pc)
        }
        Opcode::Free => match instr.op1 {
            Operand::Temporary(_) => Ok(()),
            other => Err(invalid(op, other, "op1", pc)),
        },
        // Unused returns null
        Opcode::Return => Ok(()),
        _ => Ok(()),
    }
}

#[inline]
fn invalid(opcode: Opcode, operand: Operand, position: &'static str, pc: usize) -> VerifyError {
    VerifyError::InvalidOperandKind {
        opcode,
        operand,
        position,
        pc,
    }
}

fn require(opcode: Opcode, operand: Operand, position: &'static str, pc: usize) -> Result<(), VerifyError> {
    if operand.is_unused() {
        Err(VerifyError::MissingOperand {
            opcode,
            position,
            pc,
        })
    } else {
        Ok(())
    }
}

fn variable(opcode: Opcode, operand: Operand, position: &'static str, pc: usize) -> Result<(), VerifyError> {
    require(opcode, operand, position, pc)?;
    if operand.is_variable() {
        Ok(())
    } else {
        Err(invalid(opcode, operand, position, pc))
    }
}

fn optional_result(opcode: Opcode, result: Operand, pc: usize) -> Result<(), VerifyError> {
    if result.is_unused() || result.is_writable() {
        Ok(())
    } else {
        Err(invalid(opcode, result, "result", pc))
    }
}

fn required_result(opcode: Opcode, result: Operand, pc: usize) -> Result<(), VerifyError> {
    require(opcode, result, "result", pc)?;
    optional_result(opcode, result, pc)
}

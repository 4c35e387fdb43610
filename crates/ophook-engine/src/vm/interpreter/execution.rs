//! Per-instruction control flow

use crate::vm::value::Value;

/// What the interpreter loop does after an instruction
///
/// Returned by every built-in opcode handler.
#[derive(Debug)]
pub enum ControlFlow {
    /// Continue to the next instruction
    Continue,

    /// Jump to an absolute instruction index
    Jump(usize),

    /// Return from the function with a value
    Return(Value),
}

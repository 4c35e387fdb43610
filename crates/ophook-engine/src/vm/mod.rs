//! Ophook VM runtime
//!
//! This module provides the host virtual machine:
//! - Value model and composites
//! - Ownership counting, durable references and the COW mutation guard
//! - Frames and the register interpreter
//! - VM configuration

pub mod defaults;
pub mod frame;
pub mod guard;
pub mod interpreter;
pub mod lifecycle;
pub mod object;
pub mod options;
pub mod value;

pub use frame::Frame;
pub use guard::MutationGuard;
pub use interpreter::{Vm, VmStats};
pub use object::{Composite, CompositeRef, Fields};
pub use options::{OptionsError, VmOptions};
pub use value::{Reference, Value};

use crate::bytecode::{Opcode, VerifyError};
use crate::hook::error::ContractViolation;

/// VM errors
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Operator applied to operand types it has no built-in meaning for
    #[error("Unsupported operand types: {left} {op} {right}")]
    UnsupportedOperandTypes {
        /// Operator
        op: Opcode,
        /// Type of the left operand
        left: &'static str,
        /// Type of the right operand
        right: &'static str,
    },

    /// Unary operator applied to an operand type it has no built-in meaning for
    #[error("Unsupported operand type for {op}: {operand}")]
    UnsupportedOperandType {
        /// Operator
        op: Opcode,
        /// Type of the operand
        operand: &'static str,
    },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Modulo by zero
    #[error("Modulo by zero")]
    ModuloByZero,

    /// Arithmetic error (negative shift, bad exponent, ...)
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// A native handler or native code broke a hook contract
    #[error("Contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// Function failed verification
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Instruction budget exhausted
    #[error("Instruction limit of {0} exceeded")]
    InstructionLimit(u64),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;

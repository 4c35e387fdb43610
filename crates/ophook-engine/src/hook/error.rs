//! Hook layer errors

use crate::bytecode::Opcode;

/// Broken contract between native code and the VM
///
/// Never recovered: the VM aborts execution (or panics in strict mode).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    /// Handler wrote a result the instruction discards
    #[error("{opcode} handler wrote to an unused result")]
    UnusedResultWrite {
        /// Intercepted opcode
        opcode: Opcode,
    },

    /// In-place mutation of a composite with other holders
    #[error("in-place mutation of a composite shared by {count} holders")]
    SharedMutation {
        /// Ownership count at the time of the mutation
        count: usize,
    },

    /// Handler asked for write access to a non-assignment operand
    #[error("{opcode} handler requested write access to op1")]
    NotAssignable {
        /// Intercepted opcode
        opcode: Opcode,
    },
}

/// Operand a handler has no meaning for
///
/// Treated like a not-handled outcome: the built-in semantics run instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported operand: expected {expected}, got {got}")]
pub struct UnsupportedOperand {
    /// What the handler accepts
    pub expected: &'static str,
    /// What it received
    pub got: &'static str,
}

impl UnsupportedOperand {
    /// Create a new error
    pub fn new(expected: &'static str, got: &'static str) -> Self {
        Self { expected, got }
    }
}

/// Error returned by an operator handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// Declined; defer to built-in semantics
    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperand),

    /// Fatal
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Result of an operator handler: `Ok(true)` handled, `Ok(false)` not handled
pub type HandlerResult = Result<bool, HandlerError>;

/// Dispatch table registration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Opcode is not an operator instruction
    #[error("opcode {0} cannot be intercepted")]
    NotInterceptable(&'static str),

    /// Global table already frozen
    #[error("dispatch table is frozen")]
    Frozen,
}

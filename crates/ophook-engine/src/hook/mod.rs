//! Operator interception
//!
//! Native code registers [`OperatorHandler`]s for operator opcodes in a
//! [`DispatchTable`]. When the interpreter reaches an opcode with a handler,
//! the [`shim`] resolves the operands, invokes the handler and either
//! commits its result ([`DispatchOutcome::Continue`]) or falls back to the
//! built-in semantics ([`DispatchOutcome::Dispatch`]).

pub mod classifier;
pub mod dispatch_table;
pub mod error;
pub mod resolver;
pub mod shim;

pub use classifier::{Classifier, NegationOrder, OperandPosition, OperatorCategory, UnaryKind};
pub use dispatch_table::{
    freeze_global, global_table, register_global, with_global, DispatchTable,
    DispatchTableBuilder, OperatorHandler,
};
pub use error::{ContractViolation, DispatchError, HandlerError, HandlerResult, UnsupportedOperand};
pub use resolver::{OperandView, OperandViewMut};
pub use shim::{DispatchOutcome, NormalizedUnary, OperatorCall};

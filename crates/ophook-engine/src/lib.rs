//! Ophook Engine
//!
//! A register-based bytecode VM whose operator instructions can be
//! intercepted by native handlers:
//! - **Bytecode**: opcodes, operand descriptors, instructions and verification (`bytecode` module)
//! - **Hook**: dispatch table, operand resolver, operator classifier and invocation shim (`hook` module)
//! - **VM**: values, composites, ownership/COW discipline and the interpreter (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use ophook_engine::{CodeWriter, DispatchTableBuilder, Opcode, Value, Vm, VmOptions};
//!
//! let mut table = DispatchTableBuilder::new();
//! table.set(Opcode::Add, |call| {
//!     // decline anything that is not a composite
//!     Ok(call.op1().as_composite().is_some())
//! })?;
//!
//! let mut w = CodeWriter::new("main");
//! let (a, b, t) = (w.constant(Value::Int(1)), w.constant(Value::Int(2)), w.temp());
//! w.emit(Opcode::Add, a, b, t);
//! w.emit_return(t);
//!
//! let mut vm = Vm::with_table(VmOptions::default(), table.freeze().into());
//! assert_eq!(vm.execute(&w.finish())?, Value::Int(3));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::needless_return)]

// ============================================================================
// Core Modules
// ============================================================================

/// Bytecode module: opcodes, instructions, code writer and verifier
pub mod bytecode;

/// Hook module: operator interception layer
pub mod hook;

/// VM module: value model, ownership discipline and interpreter
pub mod vm;

// ============================================================================
// Re-exports
// ============================================================================

pub use bytecode::{
    verify_function, CodeWriter, Function, Instruction, Opcode, Operand, VerifyError,
};

pub use hook::{
    freeze_global, global_table, register_global, with_global, Classifier, ContractViolation,
    DispatchError, DispatchOutcome, DispatchTable, DispatchTableBuilder, HandlerError,
    HandlerResult, NegationOrder, NormalizedUnary, OperandPosition, OperandView, OperandViewMut,
    OperatorCall, OperatorCategory, OperatorHandler, UnaryKind, UnsupportedOperand,
};

pub use vm::{
    guard, lifecycle, Composite, CompositeRef, Fields, Frame, MutationGuard, OptionsError,
    Reference, Value, Vm, VmError, VmOptions, VmResult, VmStats,
};

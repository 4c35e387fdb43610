//! Register interpreter
//!
//! Runs a `Function` against a `Frame`. Every instruction first consults the
//! dispatch table; the built-in handlers in `opcodes` run when no handler is
//! registered for the opcode or the registered one declines.

mod core;
mod execution;
mod opcodes;
mod stats;

pub use self::core::Vm;
pub use execution::ControlFlow;
pub use stats::VmStats;

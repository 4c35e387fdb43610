//! Built-in opcode handlers
//!
//! Each module implements a family of opcodes as methods on `Vm`. These run
//! whenever no operator handler is registered or the registered one declines.

pub(crate) mod arithmetic;
pub(crate) mod assign;
pub(crate) mod comparison;
pub(crate) mod control_flow;
pub(crate) mod objects;

//! Bytecode definitions for the Ophook VM
//!
//! Instructions are three-address: two operand descriptors and one result
//! descriptor, plus an `ext` word for per-instruction metadata.

pub mod instr;
pub mod opcode;
pub mod verify;

pub use instr::{CodeWriter, Function, Instruction, Operand};
pub use opcode::Opcode;
pub use verify::{verify_function, VerifyError};

//! Ophook Standard Library
//!
//! Native operator overloads for composite values. Register them before the
//! dispatch table is frozen:
//!
//! ```rust,ignore
//! let mut builder = ophook_engine::DispatchTableBuilder::new();
//! ophook_stdlib::register_operators(&mut builder)?;
//! let vm = ophook_engine::Vm::with_table(Default::default(), builder.freeze().into());
//! ```

#![warn(missing_docs)]

pub mod registry;
pub mod vector;

pub use registry::register_operators;
pub use vector::{Scalar, Vector, VECTOR_CLASS};

//! Call frame storage
//!
//! A frame owns the value slots an instruction's operand descriptors name:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ temporaries  t0..tN          │  intermediate results, released on use
//! ├──────────────────────────────┤
//! │ variables    v0..vM          │  compiled (statically known) locals
//! ├──────────────────────────────┤
//! │ symbols      name -> value   │  dynamic variables
//! ├──────────────────────────────┤
//! │ scratch                      │  result of a discarded operator result
//! └──────────────────────────────┘
//! ```

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::value::Value;
use super::{VmError, VmResult};
use crate::bytecode::Function;

/// Value storage for one function activation
#[derive(Debug, Default)]
pub struct Frame {
    temporaries: Vec<Value>,
    variables: Vec<Value>,
    symbols: FxHashMap<Rc<str>, Value>,
    scratch: Value,
    /// Always null; read in place of undefined dynamic variables
    null: Value,
}

impl Frame {
    /// Create a frame with the given slot counts
    pub fn new(num_temporaries: usize, num_variables: usize) -> Self {
        Self {
            temporaries: vec![Value::Null; num_temporaries],
            variables: vec![Value::Null; num_variables],
            ..Self::default()
        }
    }

    /// Create a frame sized for `function`
    pub fn for_function(function: &Function) -> Self {
        Self::new(
            function.num_temporaries as usize,
            function.compiled_variables.len(),
        )
    }

    /// Grow the frame so every slot `function` names exists
    ///
    /// Existing values are kept.
    pub fn prepare(&mut self, function: &Function) {
        let temps = function.num_temporaries as usize;
        if self.temporaries.len() < temps {
            self.temporaries.resize(temps, Value::Null);
        }
        let vars = function.compiled_variables.len();
        if self.variables.len() < vars {
            self.variables.resize(vars, Value::Null);
        }
    }

    /// Get temporary slot
    #[inline]
    pub fn temporary(&self, index: u32) -> VmResult<&Value> {
        let len = self.temporaries.len();
        self.temporaries
            .get(index as usize)
            .ok_or_else(|| out_of_bounds("Temporary", index, len))
    }

    /// Get temporary slot mutably
    #[inline]
    pub fn temporary_mut(&mut self, index: u32) -> VmResult<&mut Value> {
        let len = self.temporaries.len();
        self.temporaries
            .get_mut(index as usize)
            .ok_or_else(|| out_of_bounds("Temporary", index, len))
    }

    /// Release a temporary slot, dropping its value
    #[inline]
    pub fn release_temporary(&mut self, index: u32) -> VmResult<()> {
        *self.temporary_mut(index)? = Value::Null;
        Ok(())
    }

    /// Get compiled variable slot
    #[inline]
    pub fn variable(&self, index: u32) -> VmResult<&Value> {
        let len = self.variables.len();
        self.variables
            .get(index as usize)
            .ok_or_else(|| out_of_bounds("Variable", index, len))
    }

    /// Get compiled variable slot mutably
    #[inline]
    pub fn variable_mut(&mut self, index: u32) -> VmResult<&mut Value> {
        let len = self.variables.len();
        self.variables
            .get_mut(index as usize)
            .ok_or_else(|| out_of_bounds("Variable", index, len))
    }

    /// Look up a dynamic variable
    pub fn symbol(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// Get a dynamic variable slot, defining it as null if missing
    pub fn symbol_entry(&mut self, name: Rc<str>) -> &mut Value {
        self.symbols.entry(name).or_default()
    }

    /// Define or overwrite a dynamic variable
    pub fn set_symbol(&mut self, name: &str, value: Value) {
        self.symbols.insert(Rc::from(name), value);
    }

    /// Number of defined dynamic variables
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub(crate) fn null(&self) -> &Value {
        &self.null
    }

    #[inline]
    pub(crate) fn scratch_mut(&mut self) -> &mut Value {
        &mut self.scratch
    }

    #[inline]
    pub(crate) fn clear_scratch(&mut self) {
        self.scratch = Value::Null;
    }
}

fn out_of_bounds(kind: &str, index: u32, len: usize) -> VmError {
    VmError::RuntimeError(format!(
        "{} slot {} out of bounds (len={})",
        kind, index, len
    ))
}

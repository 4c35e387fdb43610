//! Execution statistics

use rustc_hash::FxHashMap;

use crate::bytecode::Opcode;

/// Counters collected by a VM across `execute` calls
#[derive(Debug, Clone, Default)]
pub struct VmStats {
    /// Instructions executed
    pub instructions: u64,
    handled: FxHashMap<Opcode, u64>,
    declined: FxHashMap<Opcode, u64>,
}

impl VmStats {
    /// Times a handler for `opcode` handled the instruction
    pub fn handled(&self, opcode: Opcode) -> u64 {
        self.handled.get(&opcode).copied().unwrap_or(0)
    }

    /// Times a handler for `opcode` declined and the built-in ran
    pub fn declined(&self, opcode: Opcode) -> u64 {
        self.declined.get(&opcode).copied().unwrap_or(0)
    }

    /// Handled instructions over all opcodes
    pub fn total_handled(&self) -> u64 {
        self.handled.values().sum()
    }

    /// Declined instructions over all opcodes
    pub fn total_declined(&self) -> u64 {
        self.declined.values().sum()
    }

    pub(crate) fn record_handled(&mut self, opcode: Opcode) {
        *self.handled.entry(opcode).or_insert(0) += 1;
    }

    pub(crate) fn record_declined(&mut self, opcode: Opcode) {
        *self.declined.entry(opcode).or_insert(0) += 1;
    }
}

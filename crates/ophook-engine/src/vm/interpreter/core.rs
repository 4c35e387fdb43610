//! The interpreter loop

use std::sync::Arc;

use tracing::{debug, warn};

use super::execution::ControlFlow;
use super::stats::VmStats;
use crate::bytecode::{verify_function, Function, Instruction, Opcode};
use crate::hook::classifier::Classifier;
use crate::hook::dispatch_table::{freeze_global, DispatchTable};
use crate::hook::shim::{self, DispatchOutcome};
use crate::vm::frame::Frame;
use crate::vm::options::VmOptions;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Ophook virtual machine
///
/// Owns no program state between calls besides statistics; each `execute`
/// runs one function against a fresh or caller-supplied frame.
pub struct Vm {
    /// Configuration
    options: VmOptions,
    /// Classifier derived from the options
    classifier: Classifier,
    /// Frozen operator handlers
    table: Arc<DispatchTable>,
    /// Execution counters
    stats: VmStats,
}

impl Vm {
    /// Create a VM with default options and the process-wide handler table
    ///
    /// Freezes the process-wide table if it is still open.
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    /// Create a VM with the process-wide handler table
    pub fn with_options(options: VmOptions) -> Self {
        Self::with_table(options, freeze_global())
    }

    /// Create a VM with an explicit handler table
    pub fn with_table(options: VmOptions, table: Arc<DispatchTable>) -> Self {
        debug!(
            negation_order = ?options.negation_order,
            max_instructions = ?options.max_instructions,
            strict_contracts = options.strict_contracts,
            verify = options.verify,
            handlers = table.len(),
            "vm created"
        );
        Self {
            classifier: Classifier::new(options.negation_order),
            options,
            table,
            stats: VmStats::default(),
        }
    }

    /// Configuration
    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    /// Classifier in effect
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Handler table in effect
    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    /// Execution counters
    pub fn stats(&self) -> &VmStats {
        &self.stats
    }

    /// Reset execution counters
    pub fn reset_stats(&mut self) {
        self.stats = VmStats::default();
    }

    /// Run `function` in a fresh frame
    pub fn execute(&mut self, function: &Function) -> VmResult<Value> {
        let mut frame = Frame::for_function(function);
        self.execute_in(function, &mut frame)
    }

    /// Run `function` in `frame`, leaving its variables for inspection
    pub fn execute_in(&mut self, function: &Function, frame: &mut Frame) -> VmResult<Value> {
        if self.options.verify {
            verify_function(function)?;
        }
        frame.prepare(function);

        let mut pc = 0usize;
        let mut executed = 0u64;
        loop {
            let instr = function.code.get(pc).ok_or_else(|| {
                VmError::RuntimeError(format!("Program counter {} out of range", pc))
            })?;

            executed += 1;
            if let Some(limit) = self.options.max_instructions {
                if executed > limit {
                    return Err(VmError::InstructionLimit(limit));
                }
            }
            self.stats.instructions += 1;

            match self.step(function, frame, instr, pc) {
                Ok(ControlFlow::Continue) => pc += 1,
                Ok(ControlFlow::Jump(target)) => pc = target,
                Ok(ControlFlow::Return(value)) => return Ok(value),
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    fn step(
        &mut self,
        function: &Function,
        frame: &mut Frame,
        instr: &Instruction,
        pc: usize,
    ) -> VmResult<ControlFlow> {
        if let Some(handler) = self.table.lookup(instr.opcode) {
            let outcome =
                shim::invoke(handler, frame, &function.constants, instr, &self.classifier)?;
            match outcome {
                DispatchOutcome::Continue => {
                    self.stats.record_handled(instr.opcode);
                    return Ok(ControlFlow::Continue);
                }
                DispatchOutcome::Dispatch => self.stats.record_declined(instr.opcode),
            }
        }
        let flow = self.builtin(function, frame, instr, pc);
        frame.clear_scratch();
        flow
    }

    fn builtin(
        &self,
        function: &Function,
        frame: &mut Frame,
        instr: &Instruction,
        pc: usize,
    ) -> VmResult<ControlFlow> {
        use Opcode::*;
        let constants = &function.constants;
        match instr.opcode {
            // ===== Data Movement & Control =====
            Nop => Ok(ControlFlow::Continue),
            Assign => self.exec_assign(frame, constants, instr),
            AssignRef => self.exec_assign_ref(frame, constants, instr),
            NewComposite => self.exec_new_composite(frame, constants, instr),
            SetField => self.exec_set_field(frame, function, instr, pc),
            OpData => Err(VmError::RuntimeError(format!(
                "OP_DATA at {} without a preceding SET_FIELD",
                pc
            ))),
            GetField => self.exec_get_field(frame, constants, instr),
            Free => self.exec_free(frame, instr),
            Jmp => Ok(ControlFlow::Jump(instr.ext as usize)),
            JmpIfFalse => self.exec_jump_if_false(frame, constants, instr),
            Return => self.exec_return(frame, constants, instr),

            // ===== Binary Operators =====
            Add | Sub | Mul | Div | Mod | Pow | Concat | Shl | Shr | BitAnd | BitOr | BitXor
            | BoolXor => self.exec_arithmetic(frame, constants, instr),
            IsIdentical | IsNotIdentical | IsEqual | IsNotEqual | IsSmaller
            | IsSmallerOrEqual | Spaceship => self.exec_comparison(frame, constants, instr),

            // ===== Compound Assignment =====
            AssignAdd | AssignSub | AssignMul | AssignDiv | AssignMod | AssignPow
            | AssignConcat | AssignShl | AssignShr | AssignBitAnd | AssignBitOr
            | AssignBitXor => self.exec_compound_assign(frame, constants, instr),

            // ===== Unary =====
            BitNot | BoolNot => self.exec_unary(frame, constants, instr),
            PreInc | PreDec => self.exec_pre_step(frame, constants, instr),
            PostInc | PostDec => self.exec_post_step(frame, constants, instr),
        }
    }

    /// Final handling of an error that ends execution
    fn abort(&self, error: VmError) -> VmError {
        if let VmError::ContractViolation(violation) = &error {
            warn!(%violation, "contract violation, aborting execution");
            if self.options.strict_contracts {
                panic!("contract violation: {}", violation);
            }
        }
        error
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("options", &self.options)
            .field("table", &self.table)
            .field("instructions", &self.stats.instructions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{CodeWriter, Operand};
    use crate::hook::DispatchTableBuilder;

    fn vm() -> Vm {
        Vm::with_table(VmOptions::default(), Arc::new(DispatchTable::empty()))
    }

    #[test]
    fn test_return_constant() {
        let mut w = CodeWriter::new("main");
        let c = w.constant(Value::Int(42));
        w.emit_return(c);
        assert_eq!(vm().execute(&w.finish()).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_loop_with_jumps() {
        // i = 0; while (i < 5) ++i; return i
        let mut w = CodeWriter::new("loop");
        let i = w.variable("i");
        let zero = w.constant(Value::Int(0));
        let five = w.constant(Value::Int(5));
        let t = w.temp();
        w.emit(Opcode::Assign, i, zero, Operand::Unused);
        let head = w.position();
        w.emit(Opcode::IsSmaller, i, five, t);
        let exit = w.emit_jump_if_false(t, 0);
        w.emit(Opcode::PreInc, i, Operand::Unused, Operand::Unused);
        w.emit_jump(head);
        let end = w.position();
        w.patch_jump(exit, end);
        w.emit_return(i);

        let mut vm = vm();
        assert_eq!(vm.execute(&w.finish()).unwrap(), Value::Int(5));
        assert!(vm.stats().instructions > 10);
    }

    #[test]
    fn test_instruction_limit() {
        let mut w = CodeWriter::new("spin");
        w.emit_jump(0);
        let options = VmOptions::default().with_max_instructions(Some(100));
        let mut vm = Vm::with_table(options, Arc::new(DispatchTable::empty()));
        assert!(matches!(
            vm.execute(&w.finish()),
            Err(VmError::InstructionLimit(100))
        ));
    }

    #[test]
    fn test_verification_runs_first() {
        let mut w = CodeWriter::new("bad");
        let c = w.constant(Value::Int(1));
        w.emit(Opcode::Add, c, c, Operand::Temporary(0));
        assert!(matches!(vm().execute(&w.finish()), Err(VmError::Verify(_))));
    }

    #[test]
    fn test_stats_count_handled_and_declined() {
        let mut builder = DispatchTableBuilder::new();
        builder
            .set(Opcode::Add, |call| Ok(call.op1().as_int() == Some(1)))
            .unwrap();
        let mut vm = Vm::with_table(VmOptions::default(), Arc::new(builder.freeze()));

        let mut w = CodeWriter::new("main");
        let a = w.variable("a");
        let one = w.constant(Value::Int(1));
        let two = w.constant(Value::Int(2));
        let t = w.temp();
        w.emit(Opcode::Assign, a, one, Operand::Unused);
        w.emit(Opcode::Add, a, two, t);
        w.emit(Opcode::Assign, a, two, Operand::Unused);
        w.emit(Opcode::Add, a, two, t);
        w.emit_return(t);

        // second ADD is declined and computed by the built-in
        assert_eq!(vm.execute(&w.finish()).unwrap(), Value::Int(4));
        assert_eq!(vm.stats().handled(Opcode::Add), 1);
        assert_eq!(vm.stats().declined(Opcode::Add), 1);
        assert_eq!(vm.stats().total_handled(), 1);

        vm.reset_stats();
        assert_eq!(vm.stats().instructions, 0);
    }

    #[test]
    fn test_contract_violation_aborts() {
        let mut builder = DispatchTableBuilder::new();
        builder
            .set(Opcode::AssignAdd, |call| {
                call.set_result(Value::Int(0))?;
                Ok(true)
            })
            .unwrap();
        let mut vm = Vm::with_table(VmOptions::default(), Arc::new(builder.freeze()));

        let mut w = CodeWriter::new("main");
        let a = w.variable("a");
        let one = w.constant(Value::Int(1));
        w.emit(Opcode::AssignAdd, a, one, Operand::Unused);
        w.emit_return(a);
        assert!(matches!(
            vm.execute(&w.finish()),
            Err(VmError::ContractViolation(_))
        ));
    }

    #[test]
    #[should_panic(expected = "contract violation")]
    fn test_strict_contracts_panic() {
        let mut builder = DispatchTableBuilder::new();
        builder
            .set(Opcode::PreInc, |call| {
                call.set_result(Value::Int(0))?;
                Ok(true)
            })
            .unwrap();
        let options = VmOptions::default().with_strict_contracts(true);
        let mut vm = Vm::with_table(options, Arc::new(builder.freeze()));

        let mut w = CodeWriter::new("main");
        let a = w.variable("a");
        w.emit(Opcode::PreInc, a, Operand::Unused, Operand::Unused);
        w.emit_return(a);
        let _ = vm.execute(&w.finish());
    }
}

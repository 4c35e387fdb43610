//! Instructions, operand descriptors and the code writer

use std::fmt;

use super::opcode::Opcode;
use crate::hook::classifier::NegationOrder;
use crate::vm::value::Value;

/// Where an instruction's input or output value lives
///
/// The payload is the location token handed to the operand resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    /// No operand / result discarded
    #[default]
    Unused,
    /// Index into the function's constant table
    Constant(u32),
    /// Frame temporary slot
    Temporary(u32),
    /// Statically known local variable slot
    CompiledVariable(u32),
    /// Variable looked up by name; the payload indexes a string constant
    DynamicVariable(u32),
}

impl Operand {
    /// Check if this descriptor is Unused
    #[inline]
    pub fn is_unused(self) -> bool {
        matches!(self, Operand::Unused)
    }

    /// Check if this descriptor names a variable (compiled or dynamic)
    #[inline]
    pub fn is_variable(self) -> bool {
        matches!(self, Operand::CompiledVariable(_) | Operand::DynamicVariable(_))
    }

    /// Check if an instruction may store into this descriptor
    #[inline]
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Operand::Temporary(_) | Operand::CompiledVariable(_) | Operand::DynamicVariable(_)
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Unused => write!(f, "_"),
            Operand::Constant(i) => write!(f, "c{}", i),
            Operand::Temporary(i) => write!(f, "t{}", i),
            Operand::CompiledVariable(i) => write!(f, "v{}", i),
            Operand::DynamicVariable(i) => write!(f, "${{c{}}}", i),
        }
    }
}

/// A single VM instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Operation
    pub opcode: Opcode,
    /// First operand
    pub op1: Operand,
    /// Second operand
    pub op2: Operand,
    /// Result descriptor
    pub result: Operand,
    /// Extra metadata: jump target for jumps, unused otherwise
    pub ext: u32,
}

impl Instruction {
    /// Create an instruction with `ext = 0`
    pub fn new(opcode: Opcode, op1: Operand, op2: Operand, result: Operand) -> Self {
        Self {
            opcode,
            op1,
            op2,
            result,
            ext: 0,
        }
    }

    /// Set the `ext` word
    pub fn with_ext(mut self, ext: u32) -> Self {
        self.ext = ext;
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.name())?;
        if !self.result.is_unused() {
            write!(f, " {} <-", self.result)?;
        }
        write!(f, " {}, {}", self.op1, self.op2)?;
        if self.opcode.is_jump() {
            write!(f, " -> {}", self.ext)?;
        }
        Ok(())
    }
}

/// A compiled function
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Instruction stream
    pub code: Vec<Instruction>,
    /// Literal table referenced by `Operand::Constant`
    pub constants: Vec<Value>,
    /// Number of temporary slots
    pub num_temporaries: u32,
    /// Names of compiled variables, indexed by slot
    pub compiled_variables: Vec<String>,
}

impl Function {
    /// Look up a compiled variable slot by name
    pub fn variable_slot(&self, name: &str) -> Option<u32> {
        self.compiled_variables
            .iter()
            .position(|n| n == name)
            .map(|i| i as u32)
    }

    /// Render the instruction stream, one instruction per line
    pub fn disassemble(&self) -> String {
        let mut out = format!("function {}:\n", self.name);
        for (pc, instr) in self.code.iter().enumerate() {
            out.push_str(&format!("  {:04} {}\n", pc, instr));
        }
        out
    }
}

// ============================================================================
// CodeWriter: builds a Function instruction by instruction
// ============================================================================

/// Writer for VM functions
pub struct CodeWriter {
    name: String,
    code: Vec<Instruction>,
    constants: Vec<Value>,
    num_temporaries: u32,
    compiled_variables: Vec<String>,
}

impl CodeWriter {
    /// Create a new writer for a function called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: Vec::new(),
            constants: Vec::new(),
            num_temporaries: 0,
            compiled_variables: Vec::new(),
        }
    }

    /// Add a literal to the constant table
    pub fn constant(&mut self, value: Value) -> Operand {
        let index = self.constants.len() as u32;
        self.constants.push(value);
        Operand::Constant(index)
    }

    /// Allocate a fresh temporary slot
    pub fn temp(&mut self) -> Operand {
        let index = self.num_temporaries;
        self.num_temporaries += 1;
        Operand::Temporary(index)
    }

    /// Get (or allocate) the compiled variable slot for `name`
    pub fn variable(&mut self, name: &str) -> Operand {
        let index = match self.compiled_variables.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                self.compiled_variables.push(name.to_string());
                self.compiled_variables.len() - 1
            }
        };
        Operand::CompiledVariable(index as u32)
    }

    /// Name a dynamically looked-up variable
    pub fn dynamic(&mut self, name: &str) -> Operand {
        let index = self.constants.len() as u32;
        self.constants.push(Value::string(name));
        Operand::DynamicVariable(index)
    }

    /// Emit an instruction, returning its position
    #[inline]
    pub fn emit(&mut self, opcode: Opcode, op1: Operand, op2: Operand, result: Operand) -> usize {
        self.push(Instruction::new(opcode, op1, op2, result))
    }

    /// Emit a prepared instruction, returning its position
    #[inline]
    pub fn push(&mut self, instr: Instruction) -> usize {
        let pos = self.code.len();
        self.code.push(instr);
        pos
    }

    /// Emit `result = -value` in the desugared multiply form
    ///
    /// The operand order of the multiply follows `order`.
    pub fn emit_negate(&mut self, value: Operand, result: Operand, order: NegationOrder) -> usize {
        let factor = self.constant(Value::Int(-1));
        let (op1, op2) = order.arrange(value, factor);
        self.emit(Opcode::Mul, op1, op2, result)
    }

    /// Emit `result = +value` in the desugared multiply form
    pub fn emit_plus(&mut self, value: Operand, result: Operand, order: NegationOrder) -> usize {
        let factor = self.constant(Value::Int(1));
        let (op1, op2) = order.arrange(value, factor);
        self.emit(Opcode::Mul, op1, op2, result)
    }

    /// Emit `target[key] = value` (SET_FIELD followed by OP_DATA)
    pub fn emit_set_field(&mut self, target: Operand, key: Operand, value: Operand) -> usize {
        let pos = self.emit(Opcode::SetField, target, key, Operand::Unused);
        self.emit(Opcode::OpData, value, Operand::Unused, Operand::Unused);
        pos
    }

    /// Emit `return value`
    pub fn emit_return(&mut self, value: Operand) -> usize {
        self.emit(Opcode::Return, value, Operand::Unused, Operand::Unused)
    }

    /// Emit an unconditional jump
    pub fn emit_jump(&mut self, target: usize) -> usize {
        self.push(
            Instruction::new(Opcode::Jmp, Operand::Unused, Operand::Unused, Operand::Unused)
                .with_ext(target as u32),
        )
    }

    /// Emit a jump taken when `cond` is falsy
    pub fn emit_jump_if_false(&mut self, cond: Operand, target: usize) -> usize {
        self.push(
            Instruction::new(Opcode::JmpIfFalse, cond, Operand::Unused, Operand::Unused)
                .with_ext(target as u32),
        )
    }

    /// Patch the jump target of the instruction at `pos`
    pub fn patch_jump(&mut self, pos: usize, target: usize) {
        if let Some(instr) = self.code.get_mut(pos) {
            instr.ext = target as u32;
        }
    }

    /// Position of the next instruction
    #[inline]
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// Finish writing and produce the function
    pub fn finish(self) -> Function {
        Function {
            name: self.name,
            code: self.code,
            constants: self.constants,
            num_temporaries: self.num_temporaries,
            compiled_variables: self.compiled_variables,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Opcodes for the Ophook VM
//!
//! Opcode bytes are grouped by operator family:
//! - 0x00-0x0F: data movement, composites, control flow (never intercepted)
//! - 0x10-0x1F: binary arithmetic and bitwise operators
//! - 0x20-0x2F: comparison operators
//! - 0x30-0x3F: compound assignment operators
//! - 0x40-0x4F: unary and increment/decrement operators

/// Opcode enumeration
///
/// Operand notation in the variant docs: `R` is the result descriptor,
/// `A` is op1 and `B` is op2.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    // ===== Data Movement & Control (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// A = B; R = A (R optional)
    Assign = 0x01,
    /// A =& B (bind both variables to one reference cell)
    AssignRef = 0x02,
    /// R = new composite of class A (A is a string constant)
    NewComposite = 0x03,
    /// A[B] = value of the following OpData instruction
    SetField = 0x04,
    /// Carries the value operand (A) of the preceding SetField
    OpData = 0x05,
    /// R = A[B]
    GetField = 0x06,
    /// Release temporary A
    Free = 0x07,
    /// Jump to `ext`
    Jmp = 0x08,
    /// Jump to `ext` if A is falsy
    JmpIfFalse = 0x09,
    /// Return A
    Return = 0x0A,

    // ===== Binary Arithmetic & Bitwise (0x10-0x1F) =====
    /// R = A + B
    Add = 0x10,
    /// R = A - B
    Sub = 0x11,
    /// R = A * B
    Mul = 0x12,
    /// R = A / B
    Div = 0x13,
    /// R = A % B
    Mod = 0x14,
    /// R = A ** B
    Pow = 0x15,
    /// R = A . B (string concatenation)
    Concat = 0x16,
    /// R = A << B
    Shl = 0x17,
    /// R = A >> B
    Shr = 0x18,
    /// R = A & B
    BitAnd = 0x19,
    /// R = A | B
    BitOr = 0x1A,
    /// R = A ^ B
    BitXor = 0x1B,
    /// R = A xor B (logical)
    BoolXor = 0x1C,

    // ===== Comparison (0x20-0x2F) =====
    /// R = A === B
    IsIdentical = 0x20,
    /// R = A !== B
    IsNotIdentical = 0x21,
    /// R = A == B
    IsEqual = 0x22,
    /// R = A != B
    IsNotEqual = 0x23,
    /// R = A < B
    IsSmaller = 0x24,
    /// R = A <= B
    IsSmallerOrEqual = 0x25,
    /// R = A <=> B
    Spaceship = 0x26,

    // ===== Compound Assignment (0x30-0x3F) =====
    /// A += B; R = A (R optional)
    AssignAdd = 0x30,
    /// A -= B
    AssignSub = 0x31,
    /// A *= B
    AssignMul = 0x32,
    /// A /= B
    AssignDiv = 0x33,
    /// A %= B
    AssignMod = 0x34,
    /// A **= B
    AssignPow = 0x35,
    /// A .= B
    AssignConcat = 0x36,
    /// A <<= B
    AssignShl = 0x37,
    /// A >>= B
    AssignShr = 0x38,
    /// A &= B
    AssignBitAnd = 0x39,
    /// A |= B
    AssignBitOr = 0x3A,
    /// A ^= B
    AssignBitXor = 0x3B,

    // ===== Unary (0x40-0x4F) =====
    /// R = ~A
    BitNot = 0x40,
    /// R = !A
    BoolNot = 0x41,
    /// ++A; R = A (R optional)
    PreInc = 0x42,
    /// --A; R = A (R optional)
    PreDec = 0x43,
    /// R = A; A++ (R is a temporary)
    PostInc = 0x44,
    /// R = A; A-- (R is a temporary)
    PostDec = 0x45,
}

impl Opcode {
    /// Every opcode, in byte order
    pub const ALL: [Opcode; 49] = [
        Self::Nop, Self::Assign, Self::AssignRef, Self::NewComposite, Self::SetField,
        Self::OpData, Self::GetField, Self::Free, Self::Jmp, Self::JmpIfFalse, Self::Return,
        Self::Add, Self::Sub, Self::Mul, Self::Div, Self::Mod, Self::Pow, Self::Concat,
        Self::Shl, Self::Shr, Self::BitAnd, Self::BitOr, Self::BitXor, Self::BoolXor,
        Self::IsIdentical, Self::IsNotIdentical, Self::IsEqual, Self::IsNotEqual,
        Self::IsSmaller, Self::IsSmallerOrEqual, Self::Spaceship,
        Self::AssignAdd, Self::AssignSub, Self::AssignMul, Self::AssignDiv, Self::AssignMod,
        Self::AssignPow, Self::AssignConcat, Self::AssignShl, Self::AssignShr,
        Self::AssignBitAnd, Self::AssignBitOr, Self::AssignBitXor,
        Self::BitNot, Self::BoolNot, Self::PreInc, Self::PreDec, Self::PostInc, Self::PostDec,
    ];

    /// Convert byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            // Data movement & control
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Assign),
            0x02 => Some(Self::AssignRef),
            0x03 => Some(Self::NewComposite),
            0x04 => Some(Self::SetField),
            0x05 => Some(Self::OpData),
            0x06 => Some(Self::GetField),
            0x07 => Some(Self::Free),
            0x08 => Some(Self::Jmp),
            0x09 => Some(Self::JmpIfFalse),
            0x0A => Some(Self::Return),

            // Binary
            0x10 => Some(Self::Add),
            0x11 => Some(Self::Sub),
            0x12 => Some(Self::Mul),
            0x13 => Some(Self::Div),
            0x14 => Some(Self::Mod),
            0x15 => Some(Self::Pow),
            0x16 => Some(Self::Concat),
            0x17 => Some(Self::Shl),
            0x18 => Some(Self::Shr),
            0x19 => Some(Self::BitAnd),
            0x1A => Some(Self::BitOr),
            0x1B => Some(Self::BitXor),
            0x1C => Some(Self::BoolXor),

            // Comparison
            0x20 => Some(Self::IsIdentical),
            0x21 => Some(Self::IsNotIdentical),
            0x22 => Some(Self::IsEqual),
            0x23 => Some(Self::IsNotEqual),
            0x24 => Some(Self::IsSmaller),
            0x25 => Some(Self::IsSmallerOrEqual),
            0x26 => Some(Self::Spaceship),

            // Compound assignment
            0x30 => Some(Self::AssignAdd),
            0x31 => Some(Self::AssignSub),
            0x32 => Some(Self::AssignMul),
            0x33 => Some(Self::AssignDiv),
            0x34 => Some(Self::AssignMod),
            0x35 => Some(Self::AssignPow),
            0x36 => Some(Self::AssignConcat),
            0x37 => Some(Self::AssignShl),
            0x38 => Some(Self::AssignShr),
            0x39 => Some(Self::AssignBitAnd),
            0x3A => Some(Self::AssignBitOr),
            0x3B => Some(Self::AssignBitXor),

            // Unary
            0x40 => Some(Self::BitNot),
            0x41 => Some(Self::BoolNot),
            0x42 => Some(Self::PreInc),
            0x43 => Some(Self::PreDec),
            0x44 => Some(Self::PostInc),
            0x45 => Some(Self::PostDec),

            _ => None,
        }
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The binary operator a compound assignment applies
    ///
    /// `AssignAdd` → `Add`, `AssignConcat` → `Concat`, and so on.
    pub fn compound_base(self) -> Option<Opcode> {
        match self {
            Self::AssignAdd => Some(Self::Add),
            Self::AssignSub => Some(Self::Sub),
            Self::AssignMul => Some(Self::Mul),
            Self::AssignDiv => Some(Self::Div),
            Self::AssignMod => Some(Self::Mod),
            Self::AssignPow => Some(Self::Pow),
            Self::AssignConcat => Some(Self::Concat),
            Self::AssignShl => Some(Self::Shl),
            Self::AssignShr => Some(Self::Shr),
            Self::AssignBitAnd => Some(Self::BitAnd),
            Self::AssignBitOr => Some(Self::BitOr),
            Self::AssignBitXor => Some(Self::BitXor),
            _ => None,
        }
    }

    /// Returns true if this instruction transfers control
    pub fn is_jump(self) -> bool {
        matches!(self, Self::Jmp | Self::JmpIfFalse)
    }

    /// Returns true if execution cannot fall through to the next instruction
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Jmp | Self::Return)
    }

    /// Get the human-readable name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Assign => "ASSIGN",
            Self::AssignRef => "ASSIGN_REF",
            Self::NewComposite => "NEW_COMPOSITE",
            Self::SetField => "SET_FIELD",
            Self::OpData => "OP_DATA",
            Self::GetField => "GET_FIELD",
            Self::Free => "FREE",
            Self::Jmp => "JMP",
            Self::JmpIfFalse => "JMP_IF_FALSE",
            Self::Return => "RETURN",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Pow => "POW",
            Self::Concat => "CONCAT",
            Self::Shl => "SL",
            Self::Shr => "SR",
            Self::BitAnd => "BW_AND",
            Self::BitOr => "BW_OR",
            Self::BitXor => "BW_XOR",
            Self::BoolXor => "BOOL_XOR",
            Self::IsIdentical => "IS_IDENTICAL",
            Self::IsNotIdentical => "IS_NOT_IDENTICAL",
            Self::IsEqual => "IS_EQUAL",
            Self::IsNotEqual => "IS_NOT_EQUAL",
            Self::IsSmaller => "IS_SMALLER",
            Self::IsSmallerOrEqual => "IS_SMALLER_OR_EQUAL",
            Self::Spaceship => "SPACESHIP",
            Self::AssignAdd => "ASSIGN_ADD",
            Self::AssignSub => "ASSIGN_SUB",
            Self::AssignMul => "ASSIGN_MUL",
            Self::AssignDiv => "ASSIGN_DIV",
            Self::AssignMod => "ASSIGN_MOD",
            Self::AssignPow => "ASSIGN_POW",
            Self::AssignConcat => "ASSIGN_CONCAT",
            Self::AssignShl => "ASSIGN_SL",
            Self::AssignShr => "ASSIGN_SR",
            Self::AssignBitAnd => "ASSIGN_BW_AND",
            Self::AssignBitOr => "ASSIGN_BW_OR",
            Self::AssignBitXor => "ASSIGN_BW_XOR",
            Self::BitNot => "BW_NOT",
            Self::BoolNot => "BOOL_NOT",
            Self::PreInc => "PRE_INC",
            Self::PreDec => "PRE_DEC",
            Self::PostInc => "POST_INC",
            Self::PostDec => "POST_DEC",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================

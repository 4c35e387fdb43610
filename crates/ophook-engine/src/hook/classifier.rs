//! Operator classification
//!
//! Maps opcodes to the contract their handlers follow, normalizes the
//! desugared unary negate/plus form and answers whether an instruction can
//! reach a handler at all.

use serde::{Deserialize, Serialize};

use crate::bytecode::{Instruction, Opcode, Operand};
use crate::vm::value::Value;

/// Handler contract category of an interceptable opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCategory {
    /// `R = A op B`; always produces a result
    Binary,
    /// `A op= B`; result optional
    BinaryAssign,
    /// `R = op A`; always produces a result
    Unary,
    /// `op A; R = A`; result optional
    UnaryAssignPre,
    /// `R = A; op A`; result is always a temporary holding the old value
    UnaryAssignPost,
}

impl OperatorCategory {
    /// Category of `opcode`, or `None` if it is not interceptable
    pub fn of(opcode: Opcode) -> Option<Self> {
        use Opcode::*;
        match opcode {
            Add | Sub | Mul | Div | Mod | Pow | Concat | Shl | Shr | BitAnd | BitOr | BitXor
            | BoolXor | IsIdentical | IsNotIdentical | IsEqual | IsNotEqual | IsSmaller
            | IsSmallerOrEqual | Spaceship => Some(Self::Binary),
            AssignAdd | AssignSub | AssignMul | AssignDiv | AssignMod | AssignPow
            | AssignConcat | AssignShl | AssignShr | AssignBitAnd | AssignBitOr
            | AssignBitXor => Some(Self::BinaryAssign),
            BitNot | BoolNot => Some(Self::Unary),
            PreInc | PreDec => Some(Self::UnaryAssignPre),
            PostInc | PostDec => Some(Self::UnaryAssignPost),
            Nop | Assign | AssignRef | NewComposite | SetField | OpData | GetField | Free
            | Jmp | JmpIfFalse | Return => None,
        }
    }

    /// Whether op1 is written by the instruction
    #[inline]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::BinaryAssign | Self::UnaryAssignPre | Self::UnaryAssignPost
        )
    }

    /// Whether the handler always gets a result slot
    #[inline]
    pub fn always_produces_result(self) -> bool {
        matches!(self, Self::Binary | Self::Unary | Self::UnaryAssignPost)
    }

    /// Whether op2 is an input
    #[inline]
    pub fn has_second_operand(self) -> bool {
        matches!(self, Self::Binary | Self::BinaryAssign)
    }
}

/// Operand order of the desugared `MUL` that implements unary negate/plus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegationOrder {
    /// `-V` is `V * -1`
    #[default]
    ValueFirst,
    /// `-V` is `-1 * V`
    ConstantFirst,
}

impl NegationOrder {
    /// Arrange `(value, constant)` into `(op1, op2)`
    #[inline]
    pub fn arrange<T>(self, value: T, constant: T) -> (T, T) {
        match self {
            Self::ValueFirst => (value, constant),
            Self::ConstantFirst => (constant, value),
        }
    }

    /// Position of the value operand
    #[inline]
    pub fn value_position(self) -> OperandPosition {
        match self {
            Self::ValueFirst => OperandPosition::First,
            Self::ConstantFirst => OperandPosition::Second,
        }
    }
}

/// Operand position within an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandPosition {
    /// op1
    First,
    /// op2
    Second,
}

impl OperandPosition {
    /// The other position
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Pick the descriptor at this position
    #[inline]
    pub fn select(self, instr: &Instruction) -> Operand {
        match self {
            Self::First => instr.op1,
            Self::Second => instr.op2,
        }
    }
}

/// Unary operator recovered from a desugared multiply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryKind {
    /// `-V`
    Negate,
    /// `+V`
    Plus,
}

impl UnaryKind {
    fn from_factor(value: &Value) -> Option<Self> {
        match value {
            Value::Int(-1) => Some(Self::Negate),
            Value::Int(1) => Some(Self::Plus),
            Value::Float(f) if *f == -1.0 => Some(Self::Negate),
            Value::Float(f) if *f == 1.0 => Some(Self::Plus),
            _ => None,
        }
    }
}

/// Static opcode classifier, parameterized by the negation order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classifier {
    negation_order: NegationOrder,
}

impl Classifier {
    /// Create a classifier for the given negation order
    pub fn new(negation_order: NegationOrder) -> Self {
        Self { negation_order }
    }

    /// Configured negation order
    #[inline]
    pub fn negation_order(&self) -> NegationOrder {
        self.negation_order
    }

    /// Category of `opcode`
    #[inline]
    pub fn category(&self, opcode: Opcode) -> Option<OperatorCategory> {
        OperatorCategory::of(opcode)
    }

    /// Recognize a desugared unary negate/plus
    ///
    /// Matches a `MUL` whose constant-side operand (per the configured
    /// order) is a literal `-1` or `1`, and returns the operator together
    /// with the position of the value operand.
    pub fn normalized_unary(
        &self,
        instr: &Instruction,
        constants: &[Value],
    ) -> Option<(UnaryKind, OperandPosition)> {
        if instr.opcode != Opcode::Mul {
            return None;
        }
        let value_pos = self.negation_order.value_position();
        let factor = match value_pos.other().select(instr) {
            Operand::Constant(index) => constants.get(index as usize)?,
            _ => return None,
        };
        UnaryKind::from_factor(factor).map(|kind| (kind, value_pos))
    }

    /// Whether a handler can ever observe `instr`
    ///
    /// An operator whose inputs are all literals may be folded before the
    /// program runs, so overloads are never consulted for it. This is a
    /// permanent boundary of the interception model.
    pub fn reaches_handler(&self, instr: &Instruction) -> bool {
        let Some(category) = self.category(instr.opcode) else {
            return false;
        };
        let literal = |op: Operand| matches!(op, Operand::Constant(_));
        let op2_literal = !category.has_second_operand() || literal(instr.op2);
        !(literal(instr.op1) && op2_literal)
    }
}

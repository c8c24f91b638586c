//! Bytecode operands

use serde::{Deserialize, Serialize};

/// Virtual register (0-255)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register
    #[inline]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get register index
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for Register {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

/// Index into the constant pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Create a new constant index
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Index into a function's feedback vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FeedbackSlot(pub u16);

impl FeedbackSlot {
    /// Create a new feedback slot
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Get slot index
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Jump offset, relative to the instruction holding it (signed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct JumpOffset(pub i32);

impl JumpOffset {
    /// Create a new jump offset
    #[inline]
    pub const fn new(offset: i32) -> Self {
        Self(offset)
    }

    /// Get offset value
    #[inline]
    pub const fn offset(self) -> i32 {
        self.0
    }
}

/// Operand width scaling for a bytecode handler.
///
/// Each interpreter dispatch-table entry handles one (opcode, scale) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperandScale {
    /// Operands are encoded at their natural width
    Single = 1,
    /// Operands are widened 2x
    Double = 2,
    /// Operands are widened 4x
    Quadruple = 4,
}

impl OperandScale {
    /// Suffix appended to the opcode name when formatting a handler name,
    /// e.g. `"Add.Wide"` for the double-width `Add` handler.
    pub const fn name_suffix(self) -> &'static str {
        match self {
            Self::Single => "",
            Self::Double => ".Wide",
            Self::Quadruple => ".ExtraWide",
        }
    }
}

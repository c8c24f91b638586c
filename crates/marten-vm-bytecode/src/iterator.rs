//! Cursor over a bytecode array

use crate::array::BytecodeArray;
use crate::instruction::Instruction;

/// A positionable cursor over a [`BytecodeArray`].
///
/// Used by the tiering controller to decode loop back edges recorded in the
/// OSR code cache.
pub struct BytecodeArrayIterator<'a> {
    array: &'a BytecodeArray,
    offset: usize,
}

impl<'a> BytecodeArrayIterator<'a> {
    /// Create an iterator positioned at offset 0
    pub fn new(array: &'a BytecodeArray) -> Self {
        Self { array, offset: 0 }
    }

    /// Reposition the cursor.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range.
    pub fn set_offset(&mut self, offset: usize) {
        assert!(
            offset < self.array.length(),
            "offset {offset} out of range for array of length {}",
            self.array.length()
        );
        self.offset = offset;
    }

    /// Current cursor offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The instruction under the cursor
    pub fn current(&self) -> &Instruction {
        self.array.get(self.offset)
    }

    /// Advance to the next instruction; returns false at the end
    pub fn advance(&mut self) -> bool {
        if self.offset + 1 < self.array.length() {
            self.offset += 1;
            true
        } else {
            false
        }
    }

    /// Absolute target offset of the jump under the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the current instruction is not a jump. The OSR code cache
    /// records only `JumpLoop` offsets, so cache-driven callers satisfy this
    /// by construction.
    pub fn jump_target_offset(&self) -> usize {
        let relative = self
            .current()
            .jump_offset()
            .unwrap_or_else(|| {
                panic!(
                    "{:?} at offset {} is not a jump",
                    self.current().opcode(),
                    self.offset
                )
            })
            .offset();
        let target = self.offset as i64 + relative as i64;
        assert!(
            target >= 0 && (target as usize) < self.array.length(),
            "jump at offset {} targets out-of-range offset {target}",
            self.offset
        );
        target as usize
    }

    /// Immediate operand of the instruction under the cursor.
    ///
    /// For jumps, operand 0 is the relative offset; for `JumpLoop`,
    /// operand 1 is the static loop depth.
    ///
    /// # Panics
    ///
    /// Panics if the instruction has no immediate operand at `operand_index`.
    pub fn immediate_operand(&self, operand_index: usize) -> i32 {
        let current = self.current();
        let operand = match (current, operand_index) {
            (Instruction::LoadInt32 { value, .. }, 0) => Some(*value),
            (Instruction::Jump { offset }, 0)
            | (Instruction::JumpIfFalse { offset, .. }, 0)
            | (Instruction::JumpIfTrue { offset, .. }, 0)
            | (Instruction::JumpLoop { offset, .. }, 0) => Some(offset.offset()),
            (Instruction::JumpLoop { loop_depth, .. }, 1) => Some(i32::from(*loop_depth)),
            _ => None,
        };
        operand.unwrap_or_else(|| {
            panic!(
                "{:?} at offset {} has no immediate operand {operand_index}",
                current.opcode(),
                self.offset
            )
        })
    }
}

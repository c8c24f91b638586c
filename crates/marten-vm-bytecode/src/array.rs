//! Bytecode array representation

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::BytecodeError;
use crate::instruction::Instruction;
use crate::operand::{FeedbackSlot, JumpOffset, Register};

/// Upper bound for the armed OSR loop nesting level.
///
/// Loop back edges whose static depth is below the armed level trigger the
/// on-stack replacement path; arming at this marker catches every loop.
pub const MAX_LOOP_NESTING_MARKER: u8 = 6;

/// An immutable instruction sequence plus the one mutable header field the
/// tiering controller writes: the armed OSR loop nesting level.
///
/// Offsets into the array are instruction indices.
#[derive(Debug)]
pub struct BytecodeArray {
    instructions: Vec<Instruction>,
    /// Armed nesting level for on-stack replacement. Written by the tiering
    /// controller, read by the interpreter on every `JumpLoop`; cleared by
    /// the interpreter once OSR succeeds. Always `<= MAX_LOOP_NESTING_MARKER`.
    osr_loop_nesting_level: AtomicU8,
}

impl BytecodeArray {
    /// Create a bytecode array from decoded instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            osr_loop_nesting_level: AtomicU8::new(0),
        }
    }

    /// Create a new builder
    pub fn builder() -> BytecodeArrayBuilder {
        BytecodeArrayBuilder::new()
    }

    /// Number of instructions
    #[inline]
    pub fn length(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the array holds no instructions
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of range; callers iterate within `length()`.
    pub fn get(&self, offset: usize) -> &Instruction {
        &self.instructions[offset]
    }

    /// Iterate over all instructions in offset order
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// Check structural validity: every jump must land inside the array.
    ///
    /// Front ends run this once after assembly; the controller and the
    /// interpreter then rely on it and treat bad offsets as programming
    /// errors.
    pub fn validate(&self) -> Result<(), BytecodeError> {
        for (offset, instruction) in self.instructions.iter().enumerate() {
            if let Some(jump) = instruction.jump_offset() {
                let target = offset as i64 + i64::from(jump.offset());
                if target < 0 || target >= self.instructions.len() as i64 {
                    return Err(BytecodeError::InvalidJumpTarget { offset, target });
                }
            }
        }
        Ok(())
    }

    /// Current armed OSR loop nesting level
    #[inline]
    pub fn osr_loop_nesting_level(&self) -> u8 {
        self.osr_loop_nesting_level.load(Ordering::Relaxed)
    }

    /// Arm (or clear) the OSR loop nesting level, clamped to
    /// [`MAX_LOOP_NESTING_MARKER`].
    ///
    /// Back edges and this store both execute on the interpreter thread, so a
    /// relaxed store is observed by the next back-edge read.
    pub fn set_osr_loop_nesting_level(&self, level: u8) {
        self.osr_loop_nesting_level
            .store(level.min(MAX_LOOP_NESTING_MARKER), Ordering::Relaxed);
    }
}

impl Clone for BytecodeArray {
    fn clone(&self) -> Self {
        Self {
            instructions: self.instructions.clone(),
            osr_loop_nesting_level: AtomicU8::new(self.osr_loop_nesting_level()),
        }
    }
}

/// Builder for assembling bytecode arrays in tests and front ends
#[derive(Debug, Default)]
pub struct BytecodeArrayBuilder {
    instructions: Vec<Instruction>,
}

impl BytecodeArrayBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single instruction
    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Append `count` copies of `Nop` (filler for offset-sensitive tests)
    pub fn nops(mut self, count: usize) -> Self {
        self.instructions
            .extend(std::iter::repeat(Instruction::Nop).take(count));
        self
    }

    /// Append a loop back edge targeting `header_offset`, which must precede
    /// the edge's own offset.
    pub fn jump_loop(mut self, header_offset: usize, loop_depth: u8) -> Self {
        let here = self.instructions.len() as i32;
        self.instructions.push(Instruction::JumpLoop {
            offset: JumpOffset::new(header_offset as i32 - here),
            loop_depth,
            feedback: FeedbackSlot::new(0),
        });
        self
    }

    /// Append a `Return` of register 0
    pub fn ret(mut self) -> Self {
        self.instructions.push(Instruction::Return {
            src: Register::new(0),
        });
        self
    }

    /// Build the array
    pub fn build(self) -> BytecodeArray {
        BytecodeArray::new(self.instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_offsets() {
        let array = BytecodeArray::builder().nops(3).jump_loop(1, 2).ret().build();

        assert_eq!(array.length(), 5);
        assert_eq!(
            array.get(3).jump_offset(),
            Some(JumpOffset::new(-2)),
            "back edge at offset 3 should target the header at offset 1"
        );
    }

    #[test]
    fn test_osr_nesting_level_clamps() {
        let array = BytecodeArray::builder().ret().build();
        assert_eq!(array.osr_loop_nesting_level(), 0);

        array.set_osr_loop_nesting_level(3);
        assert_eq!(array.osr_loop_nesting_level(), 3);

        array.set_osr_loop_nesting_level(200);
        assert_eq!(array.osr_loop_nesting_level(), MAX_LOOP_NESTING_MARKER);
    }

    #[test]
    fn test_validate_accepts_well_formed_loops() {
        let array = BytecodeArray::builder().nops(3).jump_loop(1, 2).ret().build();
        assert!(array.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_jumps() {
        let array = BytecodeArray::new(vec![
            Instruction::Jump {
                offset: JumpOffset::new(9),
            },
            Instruction::Nop,
        ]);
        assert!(matches!(
            array.validate(),
            Err(BytecodeError::InvalidJumpTarget { offset: 0, target: 9 })
        ));
    }

    #[test]
    fn test_clone_preserves_nesting_level() {
        let array = BytecodeArray::builder().ret().build();
        array.set_osr_loop_nesting_level(4);
        assert_eq!(array.clone().osr_loop_nesting_level(), 4);
    }
}

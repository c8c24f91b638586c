//! Bytecode errors

use thiserror::Error;

/// Errors that can occur during bytecode operations
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Invalid opcode byte
    #[error("Invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// Offset past the end of the array
    #[error("Offset {offset} out of range for array of length {length}")]
    OffsetOutOfRange {
        /// The requested offset
        offset: usize,
        /// The array length
        length: usize,
    },

    /// A jump whose target lands outside the array
    #[error("Jump at offset {offset} targets out-of-range offset {target}")]
    InvalidJumpTarget {
        /// Offset of the jump instruction
        offset: usize,
        /// The (possibly negative) absolute target
        target: i64,
    },
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;

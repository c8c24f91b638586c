//! # Marten VM Bytecode
//!
//! This crate defines the bytecode format consumed by the Marten interpreter
//! and inspected by the tiering controller.
//!
//! ## Design Principles
//!
//! - **Register-based**: Operations work on virtual registers, not a stack
//! - **Profiled**: Arithmetic, property and call sites carry feedback slots
//! - **Loop-aware**: `JumpLoop` back edges record their static nesting depth,
//!   which is what arms on-stack replacement

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod array;
pub mod error;
pub mod instruction;
pub mod iterator;
pub mod operand;

pub use array::{BytecodeArray, BytecodeArrayBuilder, MAX_LOOP_NESTING_MARKER};
pub use error::BytecodeError;
pub use instruction::{Instruction, Opcode};
pub use iterator::BytecodeArrayIterator;
pub use operand::{ConstantIndex, FeedbackSlot, JumpOffset, OperandScale, Register};

/// Bytecode format version
pub const BYTECODE_VERSION: u32 = 1;

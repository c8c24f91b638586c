//! # Marten VM Tiering
//!
//! Profile-driven tier-up decisions for the Marten VM: per-function interrupt
//! budgets and tick counters, the interrupt-tick handler, the tier-up
//! decision function and on-stack-replacement arming.
//!
//! The interpreter decrements a function's interrupt budget on back edges and
//! calls [`TieringManager::on_interrupt_tick`] on underflow. The controller
//! allocates the feedback vector lazily, may hand the function to the
//! baseline batch compiler, may mark it for optimized recompilation, and may
//! arm OSR back edges on the live interpreted frame. It runs only on the
//! execution thread, returns promptly, and never lets an error escape a tick.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod compiler;
pub mod decision;
pub mod flags;
pub mod frame;
pub mod function;
pub mod manager;
pub mod osr;
pub mod pending;
pub mod tracer;

pub use compiler::{BaselineBatchCompiler, BaselineCompiler, CompileError, ExceptionHandling};
pub use decision::{ConcurrencyMode, OptimizationDecision, OptimizationReason};
pub use flags::TieringFlags;
pub use frame::{JsFrame, UnoptimizedFrame};
pub use function::{
    CodeKind, FeedbackVector, JsFunction, OsrCodeCacheState, SfiId, SharedFunctionInfo,
};
pub use manager::TieringManager;
pub use osr::{
    OSR_BYTECODE_SIZE_ALLOWANCE_BASE, OSR_BYTECODE_SIZE_ALLOWANCE_PER_TICK, OsrCodeCache,
};
pub use pending::PendingOptimizationTable;
pub use tracer::{CapturedTrace, CodeTracer};

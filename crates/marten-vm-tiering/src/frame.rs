//! Accessor view over the frame a tick fired on

use std::sync::Arc;

use marten_vm_bytecode::BytecodeArray;

use crate::function::JsFunction;

/// An interpreted or baseline frame: the function plus its current bytecode
/// offset.
pub struct UnoptimizedFrame<'a> {
    function: &'a Arc<JsFunction>,
    bytecode_offset: usize,
}

impl<'a> UnoptimizedFrame<'a> {
    /// View of an unoptimized frame executing `function` at
    /// `bytecode_offset`.
    pub fn new(function: &'a Arc<JsFunction>, bytecode_offset: usize) -> Self {
        debug_assert!(bytecode_offset < function.shared().bytecode().length());
        Self {
            function,
            bytecode_offset,
        }
    }

    /// The executing function
    pub fn function(&self) -> &'a Arc<JsFunction> {
        self.function
    }

    /// Current bytecode offset
    #[inline]
    pub fn bytecode_offset(&self) -> usize {
        self.bytecode_offset
    }

    /// The bytecode array this frame executes
    pub fn bytecode_array(&self) -> &'a Arc<BytecodeArray> {
        self.function.shared().bytecode()
    }
}

/// The frame a tick fired on
pub enum JsFrame<'a> {
    /// Interpreted or baseline frame
    Unoptimized(UnoptimizedFrame<'a>),
    /// Optimized frame
    Optimized {
        /// The executing function
        function: &'a Arc<JsFunction>,
    },
}

impl<'a> JsFrame<'a> {
    /// Shorthand for an unoptimized frame view
    pub fn unoptimized(function: &'a Arc<JsFunction>, bytecode_offset: usize) -> Self {
        Self::Unoptimized(UnoptimizedFrame::new(function, bytecode_offset))
    }

    /// The executing function
    pub fn function(&self) -> &'a Arc<JsFunction> {
        match self {
            Self::Unoptimized(frame) => frame.function(),
            Self::Optimized { function } => function,
        }
    }

    /// Whether this is an interpreted or baseline frame
    pub fn is_unoptimized(&self) -> bool {
        matches!(self, Self::Unoptimized(_))
    }
}

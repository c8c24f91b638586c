//! Tier-up decisions

use std::fmt;

use crate::function::CodeKind;

/// Why a function was (or was not) chosen for optimized recompilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OptimizationReason {
    /// No recompilation requested
    DoNotOptimize,
    /// Hot under stable type feedback
    HotAndStable,
    /// Small and stable enough to optimize opportunistically
    SmallFunction,
}

impl OptimizationReason {
    /// Human-readable reason used in trace output
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DoNotOptimize => "do not optimize",
            Self::HotAndStable => "hot and stable",
            Self::SmallFunction => "small function",
        }
    }
}

impl fmt::Display for OptimizationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a requested compilation may run on a background thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Compile on a background thread, install later
    Concurrent,
    /// Compile on the execution thread before proceeding
    Synchronous,
}

/// Outcome of [`TieringManager::should_optimize`](crate::TieringManager::should_optimize):
/// the reason, the target tier and the concurrency mode of the requested
/// compilation. Passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizationDecision {
    /// Why this decision was made
    pub optimization_reason: OptimizationReason,
    /// Target code kind of the requested compilation
    pub code_kind: CodeKind,
    /// Concurrency mode of the requested compilation
    pub concurrency_mode: ConcurrencyMode,
}

impl OptimizationDecision {
    /// Tier up to the mid-tier optimizer (currently non-concurrent)
    pub const fn maglev() -> Self {
        Self {
            optimization_reason: OptimizationReason::HotAndStable,
            code_kind: CodeKind::Maglev,
            concurrency_mode: ConcurrencyMode::Synchronous,
        }
    }

    /// Tier up to the top tier because the function is hot and stable
    pub const fn turbofan_hot_and_stable() -> Self {
        Self {
            optimization_reason: OptimizationReason::HotAndStable,
            code_kind: CodeKind::Turbofan,
            concurrency_mode: ConcurrencyMode::Concurrent,
        }
    }

    /// Opportunistic top-tier compile of a small stable function
    pub const fn turbofan_small_function() -> Self {
        Self {
            optimization_reason: OptimizationReason::SmallFunction,
            code_kind: CodeKind::Turbofan,
            concurrency_mode: ConcurrencyMode::Concurrent,
        }
    }

    /// No recompilation. Kind and mode carry no meaning here.
    pub const fn do_not_optimize() -> Self {
        Self {
            optimization_reason: OptimizationReason::DoNotOptimize,
            code_kind: CodeKind::Turbofan,
            concurrency_mode: ConcurrencyMode::Concurrent,
        }
    }

    /// Whether this decision requests a recompilation
    #[inline]
    pub const fn should_optimize(self) -> bool {
        !matches!(self.optimization_reason, OptimizationReason::DoNotOptimize)
    }
}

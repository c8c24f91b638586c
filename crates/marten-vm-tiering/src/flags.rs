//! Tiering configuration

/// Global tiering configuration, immutable after startup.
///
/// Built once (from defaults or the environment) and shared into the
/// [`TieringManager`](crate::TieringManager) by `Arc`; there is no mutable
/// process-wide flag state.
#[derive(Debug, Clone)]
pub struct TieringFlags {
    /// Arm loop back edges for on-stack replacement
    pub use_osr: bool,
    /// Tier unoptimized functions up to the mid-tier optimizer instead of
    /// straight to the top tier
    pub maglev: bool,
    /// Enable the baseline tier
    pub baseline: bool,
    /// Global optimizer kill-switch; when false, ticks stop after the
    /// baseline decision
    pub use_optimizer: bool,
    /// Allocate feedback vectors lazily on the first tick
    pub lazy_feedback_allocation: bool,
    /// Arm OSR at maximum nesting on every tick (stress mode)
    pub always_osr: bool,
    /// Hand baseline candidates to the batch compiler instead of compiling
    /// synchronously
    pub baseline_batch_compilation: bool,
    /// Deterministic test harness: heuristic tiering only acts on functions
    /// explicitly allowlisted in the pending-optimization table
    pub testing_test_runner: bool,
    /// Trace tier-up marking
    pub trace_opt: bool,
    /// Also trace the decisions that did NOT mark
    pub trace_opt_verbose: bool,
    /// Trace OSR back-edge arming
    pub trace_osr: bool,
    /// Permit dynamic function construction across contexts
    pub allow_unsafe_function_constructor: bool,

    /// Back-edge/call budget between ticks once a feedback vector exists
    pub interrupt_budget: i32,
    /// Budget used instead when the function would tier up to the mid tier
    pub interrupt_budget_for_maglev: i32,
    /// Initial budget under lazy feedback allocation
    pub interrupt_budget_for_feedback_allocation: i32,
    /// Per-bytecode budget factor before the first tick allocates the vector
    pub interrupt_budget_factor_for_feedback_allocation: i32,
    /// Ticks required before a top-tier compile, independent of size
    pub ticks_before_optimization: u32,
    /// Additional tick required per this many bytecodes
    pub bytecode_size_allowance_per_tick: usize,
    /// Size ceiling for the opportunistic small-function tier-up
    pub max_bytecode_size_for_early_opt: usize,
}

impl Default for TieringFlags {
    fn default() -> Self {
        Self {
            use_osr: true,
            maglev: false,
            baseline: true,
            use_optimizer: true,
            lazy_feedback_allocation: true,
            always_osr: false,
            baseline_batch_compilation: true,
            testing_test_runner: false,
            trace_opt: false,
            trace_opt_verbose: false,
            trace_osr: false,
            allow_unsafe_function_constructor: false,
            interrupt_budget: 132 * 1024,
            interrupt_budget_for_maglev: 40 * 1024,
            interrupt_budget_for_feedback_allocation: 8 * 1024,
            interrupt_budget_factor_for_feedback_allocation: 8,
            ticks_before_optimization: 3,
            bytecode_size_allowance_per_tick: 1200,
            max_bytecode_size_for_early_opt: 81,
        }
    }
}

fn parse_env_truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0")
        && !value.trim().eq_ignore_ascii_case("false")
        && !value.trim().eq_ignore_ascii_case("off")
        && !value.trim().eq_ignore_ascii_case("no")
}

fn env_bool(var_name: &str, default: bool) -> bool {
    std::env::var(var_name)
        .ok()
        .map(|value| parse_env_truthy(&value))
        .unwrap_or(default)
}

fn env_i32(var_name: &str, default: i32) -> i32 {
    std::env::var(var_name)
        .ok()
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u32(var_name: &str, default: u32) -> u32 {
    std::env::var(var_name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(var_name: &str, default: usize) -> usize {
    std::env::var(var_name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

impl TieringFlags {
    /// Defaults overridden by `MARTEN_*` environment variables, e.g.
    /// `MARTEN_MAGLEV=1` or `MARTEN_INTERRUPT_BUDGET=4096`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            use_osr: env_bool("MARTEN_USE_OSR", defaults.use_osr),
            maglev: env_bool("MARTEN_MAGLEV", defaults.maglev),
            baseline: env_bool("MARTEN_BASELINE", defaults.baseline),
            use_optimizer: env_bool("MARTEN_USE_OPTIMIZER", defaults.use_optimizer),
            lazy_feedback_allocation: env_bool(
                "MARTEN_LAZY_FEEDBACK_ALLOCATION",
                defaults.lazy_feedback_allocation,
            ),
            always_osr: env_bool("MARTEN_ALWAYS_OSR", defaults.always_osr),
            baseline_batch_compilation: env_bool(
                "MARTEN_BASELINE_BATCH_COMPILATION",
                defaults.baseline_batch_compilation,
            ),
            testing_test_runner: env_bool(
                "MARTEN_TESTING_TEST_RUNNER",
                defaults.testing_test_runner,
            ),
            trace_opt: env_bool("MARTEN_TRACE_OPT", defaults.trace_opt),
            trace_opt_verbose: env_bool("MARTEN_TRACE_OPT_VERBOSE", defaults.trace_opt_verbose),
            trace_osr: env_bool("MARTEN_TRACE_OSR", defaults.trace_osr),
            allow_unsafe_function_constructor: env_bool(
                "MARTEN_ALLOW_UNSAFE_FUNCTION_CONSTRUCTOR",
                defaults.allow_unsafe_function_constructor,
            ),
            interrupt_budget: env_i32("MARTEN_INTERRUPT_BUDGET", defaults.interrupt_budget),
            interrupt_budget_for_maglev: env_i32(
                "MARTEN_INTERRUPT_BUDGET_FOR_MAGLEV",
                defaults.interrupt_budget_for_maglev,
            ),
            interrupt_budget_for_feedback_allocation: env_i32(
                "MARTEN_INTERRUPT_BUDGET_FOR_FEEDBACK_ALLOCATION",
                defaults.interrupt_budget_for_feedback_allocation,
            ),
            interrupt_budget_factor_for_feedback_allocation: env_i32(
                "MARTEN_INTERRUPT_BUDGET_FACTOR_FOR_FEEDBACK_ALLOCATION",
                defaults.interrupt_budget_factor_for_feedback_allocation,
            ),
            ticks_before_optimization: env_u32(
                "MARTEN_TICKS_BEFORE_OPTIMIZATION",
                defaults.ticks_before_optimization,
            ),
            bytecode_size_allowance_per_tick: env_usize(
                "MARTEN_BYTECODE_SIZE_ALLOWANCE_PER_TICK",
                defaults.bytecode_size_allowance_per_tick,
            ),
            max_bytecode_size_for_early_opt: env_usize(
                "MARTEN_MAX_BYTECODE_SIZE_FOR_EARLY_OPT",
                defaults.max_bytecode_size_for_early_opt,
            ),
        }
    }
}

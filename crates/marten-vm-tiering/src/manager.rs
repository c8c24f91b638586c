//! The interrupt-tick handler and its tier-up decisions

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use marten_vm_builtins::{Builtin, Builtins};
use marten_vm_bytecode::{BytecodeArrayIterator, MAX_LOOP_NESTING_MARKER};

use crate::compiler::{BaselineBatchCompiler, BaselineCompiler, ExceptionHandling};
use crate::decision::OptimizationDecision;
use crate::flags::TieringFlags;
use crate::frame::{JsFrame, UnoptimizedFrame};
use crate::function::{CodeKind, JsFunction, OsrCodeCacheState, SharedFunctionInfo};
use crate::osr::{
    OSR_BYTECODE_SIZE_ALLOWANCE_BASE, OSR_BYTECODE_SIZE_ALLOWANCE_PER_TICK, OsrCodeCache,
};
use crate::pending::PendingOptimizationTable;
use crate::tracer::CodeTracer;

fn tiers_up_to_maglev(flags: &TieringFlags, code_kind: CodeKind) -> bool {
    flags.maglev && code_kind.is_unoptimized_js()
}

fn should_optimize_as_small_function(
    flags: &TieringFlags,
    bytecode_size: usize,
    any_ic_changed: bool,
) -> bool {
    !any_ic_changed && bytecode_size < flags.max_bytecode_size_for_early_opt
}

/// Decides, per function and per tick, whether and how to promote execution
/// to a faster tier, and whether to arm loop back edges for on-stack
/// replacement.
///
/// Runs exclusively on the interpreter's execution thread at interrupt-tick
/// boundaries; [`TieringManager::on_interrupt_tick`] always returns promptly
/// and never propagates an error. Compilations it requests are
/// fire-and-forget.
pub struct TieringManager {
    flags: Arc<TieringFlags>,
    builtins: Arc<Builtins>,
    osr_cache: Arc<OsrCodeCache>,
    pending: Arc<PendingOptimizationTable>,
    baseline: Arc<dyn BaselineCompiler>,
    batch_compiler: Arc<BaselineBatchCompiler>,
    tracer: Arc<CodeTracer>,
    /// Set by the inline-cache subsystem whenever an IC site was patched
    /// since the last tick boundary; cleared when the tick scope ends.
    any_ic_changed: AtomicBool,
}

impl TieringManager {
    /// A controller over the given collaborators. `flags` are immutable from
    /// here on.
    pub fn new(
        flags: Arc<TieringFlags>,
        builtins: Arc<Builtins>,
        osr_cache: Arc<OsrCodeCache>,
        pending: Arc<PendingOptimizationTable>,
        baseline: Arc<dyn BaselineCompiler>,
        batch_compiler: Arc<BaselineBatchCompiler>,
        tracer: Arc<CodeTracer>,
    ) -> Self {
        Self {
            flags,
            builtins,
            osr_cache,
            pending,
            baseline,
            batch_compiler,
            tracer,
            any_ic_changed: AtomicBool::new(false),
        }
    }

    /// The controller's configuration
    pub fn flags(&self) -> &TieringFlags {
        &self.flags
    }

    /// Budget installed by the function-allocation path, before any tick has
    /// run.
    pub fn initial_interrupt_budget(flags: &TieringFlags) -> i32 {
        if flags.lazy_feedback_allocation {
            flags.interrupt_budget_for_feedback_allocation
        } else {
            flags.interrupt_budget
        }
    }

    /// Budget to re-seed after a tick.
    ///
    /// Without a feedback vector the budget scales with bytecode length, so
    /// vector allocation is not dominated by tiny functions.
    pub fn interrupt_budget_for(flags: &TieringFlags, function: &JsFunction) -> i32 {
        if function.has_feedback_vector() {
            let to_maglev = function
                .active_tier()
                .is_some_and(|kind| tiers_up_to_maglev(flags, kind));
            return if to_maglev {
                flags.interrupt_budget_for_maglev
            } else {
                flags.interrupt_budget
            };
        }

        debug_assert!(function.shared().is_compiled());
        function.shared().bytecode().length() as i32
            * flags.interrupt_budget_factor_for_feedback_allocation
    }

    /// Record that some IC site was patched since the last tick boundary.
    pub fn notify_ic_changed(&self) {
        self.any_ic_changed.store(true, Ordering::Relaxed);
    }

    fn any_ic_changed(&self) -> bool {
        self.any_ic_changed.load(Ordering::Relaxed)
    }

    /// Handle an interrupt-budget underflow on `function`'s back edge.
    ///
    /// Ensures the feedback vector exists (allocating it on the first tick),
    /// re-seeds the budget, requests baseline compilation when the function
    /// still runs below baseline, and evaluates the tier-up and OSR
    /// heuristics once the function has been ticked with a vector.
    ///
    /// Never fails: the interpreter resumes unconditionally afterwards.
    pub fn on_interrupt_tick(&self, function: &Arc<JsFunction>, frame: &JsFrame<'_>) {
        // Remember whether the function had a vector at this point:
        // interpreted-without-a-vector is a tier of its own, and tiering past
        // baseline starts only when a tick arrives *with* a vector.
        let had_feedback_vector = function.has_feedback_vector();

        if had_feedback_vector {
            function.set_interrupt_budget(Self::interrupt_budget_for(&self.flags, function));
        } else {
            function.create_and_attach_feedback_vector();
            // Profiling starts here: route dispatch through the interpreter
            // entry until a faster tier installs its own stub.
            function.set_code_entry(self.builtins.entry(Builtin::InterpreterEntryTrampoline));
            function.set_interrupt_budget(Self::interrupt_budget_for(&self.flags, function));
        }

        debug_assert!(function.has_feedback_vector());
        debug_assert!(function.shared().is_compiled());
        debug_assert!(!function.shared().bytecode().is_empty());

        // Baseline tier-up does not require a vector tick; batching hands the
        // function to a background worker, the synchronous path compiles here
        // and swallows any exception.
        if self.can_compile_with_baseline(function.shared()) && !function.active_tier_is_baseline()
        {
            if self.flags.baseline_batch_compilation {
                self.batch_compiler.enqueue_function(function);
            } else if let Err(error) = self
                .baseline
                .compile_baseline(function, ExceptionHandling::ClearException)
            {
                tracing::debug!(function = function.name(), %error, "baseline compilation failed");
            }
        }

        if !had_feedback_vector {
            return;
        }
        if !self.flags.use_optimizer {
            return;
        }

        let _scope = OnInterruptTickScope::new(self);
        function.feedback_vector().saturating_increment_profiler_ticks();

        let code_kind = function
            .active_tier()
            .expect("ticking function has no active tier");
        self.maybe_optimize_frame(function, frame, code_kind);
    }

    fn can_compile_with_baseline(&self, shared: &SharedFunctionInfo) -> bool {
        self.flags.baseline && shared.is_user_javascript()
    }

    fn maybe_optimize_frame(
        &self,
        function: &Arc<JsFunction>,
        frame: &JsFrame<'_>,
        code_kind: CodeKind,
    ) {
        if function.is_in_optimization_queue() {
            if self.flags.trace_opt_verbose {
                self.tracer.print(format_args!(
                    "[function {} is already in optimization queue]\n",
                    function.name()
                ));
            }
            return;
        }

        if self.flags.testing_test_runner
            && !self.pending.is_heuristic_optimization_allowed(function)
        {
            if self.flags.trace_opt_verbose {
                self.tracer.print(format_args!(
                    "[function {} has been marked manually for optimization]\n",
                    function.name()
                ));
            }
            return;
        }

        if function.shared().optimization_disabled() {
            return;
        }

        if let JsFrame::Unoptimized(unoptimized) = frame {
            if self.flags.always_osr {
                self.attempt_on_stack_replacement(unoptimized, MAX_LOOP_NESTING_MARKER);
                // Fall through and request a normal optimized compile as well.
            } else if self.maybe_osr(function, unoptimized) {
                return;
            }
        }

        let decision = self.should_optimize(function, code_kind, frame);
        if decision.should_optimize() {
            self.optimize(function, decision);
        }
    }

    /// With an optimized compile already pending or present, OSR is the only
    /// lever left: arm the back edges if the bytecode is small enough for the
    /// observed tick count. Returns true iff an optimized compile was pending
    /// or present, meaning the caller must not also schedule a tier-up.
    fn maybe_osr(&self, function: &Arc<JsFunction>, frame: &UnoptimizedFrame<'_>) -> bool {
        let ticks = function.feedback_vector().profiler_ticks();
        if function.is_marked_for_optimization()
            || function.is_marked_for_concurrent_optimization()
            || function.has_available_optimized_code()
        {
            let allowance = OSR_BYTECODE_SIZE_ALLOWANCE_BASE as u64
                + u64::from(ticks) * OSR_BYTECODE_SIZE_ALLOWANCE_PER_TICK as u64;
            if function.shared().bytecode().length() as u64 <= allowance {
                self.attempt_on_stack_replacement(frame, 1);
            }
            return true;
        }
        false
    }

    /// Arm the frame's bytecode for on-stack replacement by raising its OSR
    /// loop nesting level, clamped to the maximum marker. The interpreter
    /// yields to the OSR path at the next back edge whose static loop depth
    /// is below the armed level.
    ///
    /// No-op unless OSR is enabled, the function is user JavaScript and
    /// optimization is not disabled.
    pub fn attempt_on_stack_replacement(
        &self,
        frame: &UnoptimizedFrame<'_>,
        loop_nesting_levels: u8,
    ) {
        let function = frame.function();
        let shared = function.shared();
        if !self.flags.use_osr || !shared.is_user_javascript() {
            return;
        }

        // If the code is not optimizable, don't try OSR.
        if shared.optimization_disabled() {
            return;
        }

        if self.flags.trace_osr {
            self.tracer.print(format_args!(
                "[OSR - arming back edges in {}]\n",
                function.name()
            ));
        }

        let bytecode = frame.bytecode_array();
        let level = bytecode.osr_loop_nesting_level();
        bytecode.set_osr_loop_nesting_level(
            level
                .saturating_add(loop_nesting_levels)
                .min(MAX_LOOP_NESTING_MARKER),
        );
    }

    /// The tier-up decision for `function` executing at `code_kind` in
    /// `frame`.
    pub fn should_optimize(
        &self,
        function: &JsFunction,
        code_kind: CodeKind,
        frame: &JsFrame<'_>,
    ) -> OptimizationDecision {
        debug_assert_eq!(function.active_tier(), Some(code_kind));

        if tiers_up_to_maglev(&self.flags, code_kind) {
            return OptimizationDecision::maglev();
        }
        if code_kind == CodeKind::Turbofan {
            // Already in the top tier.
            return OptimizationDecision::do_not_optimize();
        }

        let shared = function.shared();
        let bytecode = shared.bytecode();

        // A cached OSR entry means a loop in this function has tiered up
        // before. Once execution re-enters that loop's range, arm the back
        // edge right away so the next JumpLoop hits the cached code instead
        // of waiting out the tick threshold.
        if shared.osr_code_cache_state() != OsrCodeCacheState::NotCached {
            if let JsFrame::Unoptimized(unoptimized) = frame {
                let current_offset = unoptimized.bytecode_offset();
                let mut iterator = BytecodeArrayIterator::new(bytecode);
                for jump_offset in self.osr_cache.bytecode_offsets_for(shared) {
                    iterator.set_offset(jump_offset);
                    let jump_target_offset = iterator.jump_target_offset();
                    if jump_offset >= current_offset && current_offset >= jump_target_offset {
                        let level = (iterator.immediate_operand(1) + 1)
                            .min(i32::from(MAX_LOOP_NESTING_MARKER));
                        bytecode.set_osr_loop_nesting_level(level as u8);
                        return OptimizationDecision::turbofan_hot_and_stable();
                    }
                }
            }
        }

        let ticks = function.feedback_vector().profiler_ticks();
        let ticks_for_optimization = self.flags.ticks_before_optimization
            + (bytecode.length() / self.flags.bytecode_size_allowance_per_tick) as u32;
        if ticks >= ticks_for_optimization {
            return OptimizationDecision::turbofan_hot_and_stable();
        }
        if should_optimize_as_small_function(&self.flags, bytecode.length(), self.any_ic_changed())
        {
            // No IC was patched since the last tick and this function is very
            // small: optimistically optimize it now.
            return OptimizationDecision::turbofan_small_function();
        }
        if self.flags.trace_opt_verbose {
            if self.any_ic_changed() {
                self.tracer.print(format_args!(
                    "[not yet optimizing {}, not enough ticks: {}/{} and ICs changed]\n",
                    function.name(),
                    ticks,
                    ticks_for_optimization
                ));
            } else {
                self.tracer.print(format_args!(
                    "[not yet optimizing {}, not enough ticks: {}/{} and too large for small function optimization: {}/{}]\n",
                    function.name(),
                    ticks,
                    ticks_for_optimization,
                    bytecode.length(),
                    self.flags.max_bytecode_size_for_early_opt
                ));
            }
        }
        OptimizationDecision::do_not_optimize()
    }

    fn optimize(&self, function: &JsFunction, decision: OptimizationDecision) {
        debug_assert!(decision.should_optimize());
        if self.flags.trace_opt {
            self.tracer.print(format_args!(
                "[marking {} for optimized recompilation, reason: {}]\n",
                function.name(),
                decision.optimization_reason
            ));
        }
        function.mark_for_optimization(decision.code_kind, decision.concurrency_mode);
    }
}

/// Scoped tick state: clears `any_ic_changed` when the tick ends, on every
/// exit path.
struct OnInterruptTickScope<'a> {
    manager: &'a TieringManager,
}

impl<'a> OnInterruptTickScope<'a> {
    fn new(manager: &'a TieringManager) -> Self {
        tracing::trace!("marking candidates for optimization");
        Self { manager }
    }
}

impl Drop for OnInterruptTickScope<'_> {
    fn drop(&mut self) {
        self.manager.any_ic_changed.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileError;
    use crate::decision::ConcurrencyMode;
    use crate::tracer::CapturedTrace;
    use marten_vm_builtins::{Code, EmbeddedBlob};
    use marten_vm_bytecode::BytecodeArray;

    struct NoopCompiler;

    impl BaselineCompiler for NoopCompiler {
        fn compile_baseline(
            &self,
            function: &Arc<JsFunction>,
            _exception_handling: ExceptionHandling,
        ) -> Result<(), CompileError> {
            function.set_installed_code(CodeKind::Baseline);
            Ok(())
        }
    }

    fn installed_builtins() -> Arc<Builtins> {
        let blob = EmbeddedBlob::from_sizes(0x10_0000, &[0x20; Builtin::COUNT]);
        let mut builtins = Builtins::new(blob.clone());
        for builtin in Builtin::all() {
            builtins.set_code(
                builtin,
                Code::new(
                    builtin,
                    blob.instruction_start_of(builtin),
                    blob.instruction_size_of(builtin),
                ),
            );
        }
        builtins.initialize_isolate_tables();
        Arc::new(builtins)
    }

    fn manager(flags: TieringFlags) -> (TieringManager, CapturedTrace) {
        let compiler: Arc<dyn BaselineCompiler> = Arc::new(NoopCompiler);
        let (tracer, trace) = CodeTracer::captured();
        let manager = TieringManager::new(
            Arc::new(flags),
            installed_builtins(),
            Arc::new(OsrCodeCache::new()),
            Arc::new(PendingOptimizationTable::new()),
            Arc::clone(&compiler),
            Arc::new(BaselineBatchCompiler::new(compiler)),
            Arc::new(tracer),
        );
        (manager, trace)
    }

    fn function_of_length(length: usize) -> Arc<JsFunction> {
        let bytecode = Arc::new(BytecodeArray::builder().nops(length - 1).ret().build());
        JsFunction::new(SharedFunctionInfo::new("f", bytecode))
    }

    #[test]
    fn test_osr_size_gate_at_zero_ticks() {
        let (manager, _) = manager(TieringFlags::default());
        // 120 > 119 + 0 * 44: the gate fails, but an OSR-considered tick
        // still suppresses the normal tier-up path.
        let function = function_of_length(120);
        function.create_and_attach_feedback_vector();
        function.mark_for_optimization(CodeKind::Turbofan, ConcurrencyMode::Concurrent);

        let frame = UnoptimizedFrame::new(&function, 0);
        assert!(manager.maybe_osr(&function, &frame));
        assert_eq!(function.shared().bytecode().osr_loop_nesting_level(), 0);
    }

    #[test]
    fn test_osr_size_gate_passes_at_the_boundary() {
        let (manager, _) = manager(TieringFlags::default());
        let function = function_of_length(119);
        function.create_and_attach_feedback_vector();
        function.mark_for_optimization(CodeKind::Turbofan, ConcurrencyMode::Concurrent);

        let frame = UnoptimizedFrame::new(&function, 0);
        assert!(manager.maybe_osr(&function, &frame));
        assert_eq!(function.shared().bytecode().osr_loop_nesting_level(), 1);
    }

    #[test]
    fn test_maybe_osr_declines_unmarked_functions() {
        let (manager, _) = manager(TieringFlags::default());
        let function = function_of_length(16);
        function.create_and_attach_feedback_vector();

        let frame = UnoptimizedFrame::new(&function, 0);
        assert!(!manager.maybe_osr(&function, &frame));
        assert_eq!(function.shared().bytecode().osr_loop_nesting_level(), 0);
    }

    #[test]
    fn test_osr_ticks_widen_the_size_allowance() {
        let (manager, _) = manager(TieringFlags::default());
        let function = function_of_length(200);
        let vector = function.create_and_attach_feedback_vector();
        // 200 <= 119 + 2 * 44.
        vector.set_profiler_ticks_for_testing(2);
        function.mark_for_optimization(CodeKind::Turbofan, ConcurrencyMode::Concurrent);

        let frame = UnoptimizedFrame::new(&function, 0);
        assert!(manager.maybe_osr(&function, &frame));
        assert_eq!(function.shared().bytecode().osr_loop_nesting_level(), 1);
    }

    #[test]
    fn test_cached_osr_nesting_level_is_clamped() {
        let (manager, _) = manager(TieringFlags::default());
        // Loop depth at the marker: the armed level must not exceed it.
        let bytecode = Arc::new(
            BytecodeArray::builder()
                .nops(4)
                .jump_loop(1, MAX_LOOP_NESTING_MARKER)
                .ret()
                .build(),
        );
        let function = JsFunction::new(SharedFunctionInfo::new("deep", bytecode));
        function.create_and_attach_feedback_vector();
        manager.osr_cache.insert(function.shared(), 4);

        let frame = JsFrame::unoptimized(&function, 2);
        let decision = manager.should_optimize(&function, CodeKind::Interpreted, &frame);
        assert!(decision.should_optimize());
        assert_eq!(
            function.shared().bytecode().osr_loop_nesting_level(),
            MAX_LOOP_NESTING_MARKER
        );
    }

    #[test]
    fn test_baseline_kind_does_not_reach_the_top_tier_ceiling() {
        let (manager, _) = manager(TieringFlags::default());
        let function = function_of_length(16);
        function.create_and_attach_feedback_vector();
        function.set_installed_code(CodeKind::Baseline);

        let frame = JsFrame::unoptimized(&function, 0);
        let decision = manager.should_optimize(&function, CodeKind::Baseline, &frame);
        assert_eq!(decision, OptimizationDecision::turbofan_small_function());
    }
}

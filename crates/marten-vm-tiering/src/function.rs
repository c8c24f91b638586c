//! The function-object surface the tiering controller reads and writes

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use marten_vm_bytecode::BytecodeArray;

use crate::decision::ConcurrencyMode;

/// Code quality level of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CodeKind {
    /// Running in the interpreter
    Interpreted = 0,
    /// Baseline-compiled
    Baseline = 1,
    /// Mid-tier optimized
    Maglev = 2,
    /// Top-tier optimized
    Turbofan = 3,
}

impl CodeKind {
    /// Whether this kind is an unoptimized JS function tier
    #[inline]
    pub fn is_unoptimized_js(self) -> bool {
        matches!(self, Self::Interpreted | Self::Baseline)
    }

    /// Whether this kind is an optimized tier
    #[inline]
    pub fn is_optimized(self) -> bool {
        matches!(self, Self::Maglev | Self::Turbofan)
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Interpreted),
            1 => Some(Self::Baseline),
            2 => Some(Self::Maglev),
            3 => Some(Self::Turbofan),
            _ => None,
        }
    }
}

/// Whether a shared function info has entries in the OSR code cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsrCodeCacheState {
    /// No cached OSR code
    NotCached = 0,
    /// The cache holds at least one entry for this function
    CachedWithEntries = 1,
}

/// Process-unique key of a shared function info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SfiId(pub u64);

static NEXT_SFI_ID: AtomicU64 = AtomicU64::new(1);

/// State shared across all closures of one source function.
pub struct SharedFunctionInfo {
    id: SfiId,
    name: String,
    bytecode: Arc<BytecodeArray>,
    is_user_javascript: bool,
    is_compiled: AtomicBool,
    /// Sticky: set by a failed optimization attempt, never cleared
    optimization_disabled: AtomicBool,
    osr_code_cache_state: AtomicU8,
}

impl SharedFunctionInfo {
    /// Shared info for a user JavaScript function
    pub fn new(name: impl Into<String>, bytecode: Arc<BytecodeArray>) -> Arc<Self> {
        Self::with_user_javascript(name, bytecode, true)
    }

    /// Shared info for an internal/builtin-shim function; never OSR'd and
    /// never baseline-compiled
    pub fn internal(name: impl Into<String>, bytecode: Arc<BytecodeArray>) -> Arc<Self> {
        Self::with_user_javascript(name, bytecode, false)
    }

    fn with_user_javascript(
        name: impl Into<String>,
        bytecode: Arc<BytecodeArray>,
        is_user_javascript: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: SfiId(NEXT_SFI_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            bytecode,
            is_user_javascript,
            is_compiled: AtomicBool::new(false),
            optimization_disabled: AtomicBool::new(false),
            osr_code_cache_state: AtomicU8::new(OsrCodeCacheState::NotCached as u8),
        })
    }

    /// Process-unique key
    #[inline]
    pub fn id(&self) -> SfiId {
        self.id
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's bytecode
    pub fn bytecode(&self) -> &Arc<BytecodeArray> {
        &self.bytecode
    }

    /// False for internal/builtin-shim functions
    #[inline]
    pub fn is_user_javascript(&self) -> bool {
        self.is_user_javascript
    }

    /// Whether bytecode compilation has completed
    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.is_compiled.load(Ordering::Acquire)
    }

    /// Record that bytecode compilation completed
    pub fn set_compiled(&self) {
        self.is_compiled.store(true, Ordering::Release);
    }

    /// Whether optimization is permanently disabled for this function
    #[inline]
    pub fn optimization_disabled(&self) -> bool {
        self.optimization_disabled.load(Ordering::Acquire)
    }

    /// Permanently disable optimization. Called by the compile services,
    /// possibly from a background thread; future ticks short-circuit.
    pub fn disable_optimization(&self) {
        self.optimization_disabled.store(true, Ordering::Release);
    }

    /// OSR code cache state for this function
    pub fn osr_code_cache_state(&self) -> OsrCodeCacheState {
        match self.osr_code_cache_state.load(Ordering::Acquire) {
            0 => OsrCodeCacheState::NotCached,
            _ => OsrCodeCacheState::CachedWithEntries,
        }
    }

    pub(crate) fn set_osr_code_cache_state(&self, state: OsrCodeCacheState) {
        self.osr_code_cache_state.store(state as u8, Ordering::Release);
    }
}

/// Per-function execution profile, allocated lazily on the first tick.
#[derive(Debug, Default)]
pub struct FeedbackVector {
    invocation_count: AtomicU32,
    profiler_ticks: AtomicU32,
    interrupt_budget: AtomicI32,
}

impl FeedbackVector {
    /// Fresh vector with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interrupt ticks observed
    #[inline]
    pub fn profiler_ticks(&self) -> u32 {
        self.profiler_ticks.load(Ordering::Relaxed)
    }

    /// Increment the tick counter, saturating instead of wrapping.
    ///
    /// Ticks run on the execution thread, so there is no other writer.
    pub fn saturating_increment_profiler_ticks(&self) {
        let ticks = self.profiler_ticks.load(Ordering::Relaxed);
        if ticks < u32::MAX {
            self.profiler_ticks.store(ticks + 1, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_profiler_ticks_for_testing(&self, ticks: u32) {
        self.profiler_ticks.store(ticks, Ordering::Relaxed);
    }

    /// Number of invocations; non-zero once the vector exists
    #[inline]
    pub fn invocation_count(&self) -> u32 {
        self.invocation_count.load(Ordering::Relaxed)
    }

    /// Store the invocation count (relaxed)
    pub fn set_invocation_count(&self, count: u32) {
        self.invocation_count.store(count, Ordering::Relaxed);
    }

    /// Remaining interrupt budget
    #[inline]
    pub fn interrupt_budget(&self) -> i32 {
        self.interrupt_budget.load(Ordering::Relaxed)
    }

    /// Re-seed the interrupt budget
    pub fn set_interrupt_budget(&self, budget: i32) {
        self.interrupt_budget.store(budget, Ordering::Relaxed);
    }
}

// Tiering flag bits.
const IN_OPTIMIZATION_QUEUE: u8 = 1 << 0;
const MARKED_FOR_OPTIMIZATION: u8 = 1 << 1;
const MARKED_FOR_CONCURRENT_OPTIMIZATION: u8 = 1 << 2;

/// A closure as seen by the tiering controller: shared info, lazily-attached
/// feedback vector, tiering flags and the currently installed code.
pub struct JsFunction {
    shared: Arc<SharedFunctionInfo>,
    feedback_vector: OnceLock<Arc<FeedbackVector>>,
    tiering_state: AtomicU8,
    /// Best installed code kind, encoded as `kind + 1`; 0 = bytecode only
    installed_code: AtomicU8,
    /// Entry address of the stub this function currently dispatches through
    code_entry: AtomicUsize,
}

impl JsFunction {
    /// A closure over `shared`, initially without a feedback vector
    pub fn new(shared: Arc<SharedFunctionInfo>) -> Arc<Self> {
        Arc::new(Self {
            shared,
            feedback_vector: OnceLock::new(),
            tiering_state: AtomicU8::new(0),
            installed_code: AtomicU8::new(0),
            code_entry: AtomicUsize::new(0),
        })
    }

    /// The shared function info
    pub fn shared(&self) -> &Arc<SharedFunctionInfo> {
        &self.shared
    }

    /// Function name (from the shared info)
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Whether the feedback vector has been allocated
    #[inline]
    pub fn has_feedback_vector(&self) -> bool {
        self.feedback_vector.get().is_some()
    }

    /// The feedback vector.
    ///
    /// # Panics
    ///
    /// Panics if the vector has not been allocated yet.
    pub fn feedback_vector(&self) -> &Arc<FeedbackVector> {
        self.feedback_vector
            .get()
            .expect("feedback vector not allocated")
    }

    /// Allocate and attach a fresh feedback vector, completing lazy
    /// compilation if necessary.
    ///
    /// The invocation count starts at 1 (relaxed store) so functions that OSR
    /// before their second call still look invoked to inlining heuristics.
    /// Idempotent: a vector attached by an earlier path is kept.
    pub fn create_and_attach_feedback_vector(&self) -> &Arc<FeedbackVector> {
        if !self.shared.is_compiled() {
            self.shared.set_compiled();
        }
        let vector = self.feedback_vector.get_or_init(|| {
            let vector = FeedbackVector::new();
            vector.set_invocation_count(1);
            Arc::new(vector)
        });
        debug_assert!(self.shared.is_compiled());
        vector
    }

    /// Re-seed the interrupt budget on the feedback vector.
    ///
    /// # Panics
    ///
    /// Panics if the vector has not been allocated yet.
    pub fn set_interrupt_budget(&self, budget: i32) {
        self.feedback_vector().set_interrupt_budget(budget);
    }

    /// Derived view of the tier this function currently executes at:
    /// `None` before compilation, otherwise the best installed code kind
    /// (bytecode-only functions run interpreted).
    pub fn active_tier(&self) -> Option<CodeKind> {
        if let Some(kind) = CodeKind::from_u8(self.installed_code.load(Ordering::Acquire).wrapping_sub(1)) {
            return Some(kind);
        }
        self.shared.is_compiled().then_some(CodeKind::Interpreted)
    }

    /// Whether the active tier is exactly baseline
    pub fn active_tier_is_baseline(&self) -> bool {
        self.active_tier() == Some(CodeKind::Baseline)
    }

    /// Whether optimized (mid- or top-tier) code is installed
    pub fn has_available_optimized_code(&self) -> bool {
        self.active_tier().is_some_and(CodeKind::is_optimized)
    }

    /// Install code of the given kind. Called by the compile services when a
    /// compilation completes; clears the optimization markers it fulfilled.
    pub fn set_installed_code(&self, kind: CodeKind) {
        self.installed_code.store(kind as u8 + 1, Ordering::Release);
        if kind.is_optimized() {
            self.tiering_state.fetch_and(
                !(MARKED_FOR_OPTIMIZATION | MARKED_FOR_CONCURRENT_OPTIMIZATION),
                Ordering::AcqRel,
            );
        }
    }

    /// Mark this function for optimized recompilation at `kind`.
    ///
    /// The external compile service observes the marker and enqueues the
    /// actual compilation.
    pub fn mark_for_optimization(&self, kind: CodeKind, mode: ConcurrencyMode) {
        debug_assert!(kind.is_optimized(), "cannot mark for {kind:?}");
        let bits = match mode {
            ConcurrencyMode::Concurrent => {
                MARKED_FOR_OPTIMIZATION | MARKED_FOR_CONCURRENT_OPTIMIZATION
            }
            ConcurrencyMode::Synchronous => MARKED_FOR_OPTIMIZATION,
        };
        self.tiering_state.fetch_or(bits, Ordering::AcqRel);
    }

    /// Whether the function is marked for (any-mode) optimization
    pub fn is_marked_for_optimization(&self) -> bool {
        self.tiering_state.load(Ordering::Acquire) & MARKED_FOR_OPTIMIZATION != 0
    }

    /// Whether the function is marked for concurrent optimization
    pub fn is_marked_for_concurrent_optimization(&self) -> bool {
        self.tiering_state.load(Ordering::Acquire) & MARKED_FOR_CONCURRENT_OPTIMIZATION != 0
    }

    /// Whether the external compile queue currently owns this function
    pub fn is_in_optimization_queue(&self) -> bool {
        self.tiering_state.load(Ordering::Acquire) & IN_OPTIMIZATION_QUEUE != 0
    }

    /// Set or clear queue ownership. Called by the external compile service
    /// when it picks up and when it completes (or permanently fails) the
    /// function.
    pub fn set_in_optimization_queue(&self, in_queue: bool) {
        if in_queue {
            self.tiering_state.fetch_or(IN_OPTIMIZATION_QUEUE, Ordering::AcqRel);
        } else {
            self.tiering_state.fetch_and(!IN_OPTIMIZATION_QUEUE, Ordering::AcqRel);
        }
    }

    /// Entry address of the stub this function dispatches through
    pub fn code_entry(&self) -> usize {
        self.code_entry.load(Ordering::Acquire)
    }

    /// Install the dispatch entry address
    pub fn set_code_entry(&self, entry: usize) {
        self.code_entry.store(entry, Ordering::Release);
    }
}

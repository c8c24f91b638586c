//! The seam to the external compile services

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::function::{JsFunction, SfiId};

/// What to do with an exception raised during a synchronous compile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionHandling {
    /// Swallow the exception; the caller resumes as if the compile never ran
    ClearException,
    /// Leave the exception pending for the caller
    KeepException,
}

/// Errors reported by the compile services
#[derive(Debug, Error)]
pub enum CompileError {
    /// Baseline compilation failed; retryable on a later tick
    #[error("baseline compilation of {function} failed: {message}")]
    BaselineFailed {
        /// Name of the function
        function: String,
        /// Why the compile failed
        message: String,
    },

    /// The function can never be compiled at the requested tier
    #[error("{function} is not eligible for the requested tier")]
    NotEligible {
        /// Name of the function
        function: String,
    },
}

/// Baseline compile service.
///
/// Implementations never block the controller for long and may install code
/// asynchronously; permanent failures are reported by disabling optimization
/// on the shared info.
pub trait BaselineCompiler: Send + Sync {
    /// Compile `function` to the baseline tier.
    fn compile_baseline(
        &self,
        function: &Arc<JsFunction>,
        exception_handling: ExceptionHandling,
    ) -> Result<(), CompileError>;
}

#[derive(Default)]
struct BatchState {
    pending: VecDeque<Arc<JsFunction>>,
    enqueued: FxHashSet<SfiId>,
}

struct BatchInner {
    compiler: Arc<dyn BaselineCompiler>,
    state: Mutex<BatchState>,
}

impl BatchInner {
    fn mark_request_finished(&self, id: SfiId) {
        self.state.lock().enqueued.remove(&id);
    }

    fn compile_now(&self, function: &Arc<JsFunction>) {
        let id = function.shared().id();
        if let Err(error) = self
            .compiler
            .compile_baseline(function, ExceptionHandling::ClearException)
        {
            tracing::debug!(function = function.name(), %error, "batched baseline compilation failed");
        }
        self.mark_request_finished(id);
    }
}

/// Batches baseline compile requests, deduplicating per shared function info.
///
/// In background mode a dedicated worker thread drains requests as they
/// arrive; otherwise requests queue until the host calls
/// [`BaselineBatchCompiler::compile_next`]. A function stays deduplicated
/// until its request finishes, so a tick storm cannot enqueue it twice.
pub struct BaselineBatchCompiler {
    inner: Arc<BatchInner>,
    worker_tx: Option<Sender<Arc<JsFunction>>>,
}

impl BaselineBatchCompiler {
    /// Queue-only batch compiler; the host drains it with
    /// [`BaselineBatchCompiler::compile_next`].
    pub fn new(compiler: Arc<dyn BaselineCompiler>) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                compiler,
                state: Mutex::new(BatchState::default()),
            }),
            worker_tx: None,
        }
    }

    /// Batch compiler with a background worker thread draining the queue.
    /// Falls back to queue-only mode if the worker cannot be spawned.
    pub fn with_background_worker(compiler: Arc<dyn BaselineCompiler>) -> Self {
        let inner = Arc::new(BatchInner {
            compiler,
            state: Mutex::new(BatchState::default()),
        });

        let (tx, rx) = mpsc::channel::<Arc<JsFunction>>();
        let worker_inner = Arc::clone(&inner);
        let spawned = thread::Builder::new()
            .name("marten-baseline-bg".to_string())
            .spawn(move || {
                for function in rx {
                    worker_inner.compile_now(&function);
                }
            });

        Self {
            inner,
            worker_tx: spawned.ok().map(|_| tx),
        }
    }

    /// Enqueue `function` for baseline compilation. Returns false if a
    /// request for it is already in flight.
    pub fn enqueue_function(&self, function: &Arc<JsFunction>) -> bool {
        let id = function.shared().id();
        {
            let mut state = self.inner.state.lock();
            if !state.enqueued.insert(id) {
                return false;
            }
            if self.worker_tx.is_none() {
                state.pending.push_back(Arc::clone(function));
                return true;
            }
        }

        let tx = self.worker_tx.as_ref().expect("worker mode checked above");
        if let Err(send_error) = tx.send(Arc::clone(function)) {
            // Worker is gone; compile on this thread rather than dropping the
            // request.
            self.inner.compile_now(&send_error.0);
        }
        true
    }

    /// Drain one queued request synchronously. Returns false if the queue was
    /// empty. No-op in background mode (the worker owns the queue).
    pub fn compile_next(&self) -> bool {
        let Some(function) = self.inner.state.lock().pending.pop_front() else {
            return false;
        };
        self.inner.compile_now(&function);
        true
    }

    /// Number of queued requests not yet handed to the compiler
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Whether a request for `function` is currently in flight
    pub fn is_enqueued(&self, function: &JsFunction) -> bool {
        self.inner.state.lock().enqueued.contains(&function.shared().id())
    }
}

//! Diagnostic trace output for tier-up decisions

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Host-provided stream for the controller's free-form diagnostic lines.
///
/// Output is best-effort: write errors are dropped, never surfaced to the
/// tick path.
pub struct CodeTracer {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl CodeTracer {
    /// Tracer writing to the given sink
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Tracer writing to stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Tracer writing into an in-memory buffer, plus a handle for reading it
    /// back. Used by tests and by hosts that surface traces elsewhere.
    pub fn captured() -> (Self, CapturedTrace) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let tracer = Self::new(Box::new(SharedBufferSink {
            buffer: Arc::clone(&buffer),
        }));
        (tracer, CapturedTrace { buffer })
    }

    /// Write one formatted diagnostic fragment
    pub fn print(&self, args: fmt::Arguments<'_>) {
        let mut sink = self.sink.lock();
        let _ = sink.write_fmt(args);
        let _ = sink.flush();
    }
}

struct SharedBufferSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for SharedBufferSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Read side of [`CodeTracer::captured`]
#[derive(Clone)]
pub struct CapturedTrace {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedTrace {
    /// Everything traced so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Whether nothing has been traced
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_tracer_roundtrip() {
        let (tracer, capture) = CodeTracer::captured();
        assert!(capture.is_empty());
        tracer.print(format_args!("[marking {} for recompilation]\n", "f"));
        assert_eq!(capture.contents(), "[marking f for recompilation]\n");
    }
}

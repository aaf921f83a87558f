use std::io;
use std::sync::Mutex;

/// Receiver for already-formatted monitor lines.
///
/// Implementations append the line and keep the latest visible. Callers in
/// the core treat every sink as best-effort; a failed emit is logged by the
/// caller, never propagated into the transaction result.
pub trait OutputSink: Send + Sync {
    fn emit(&self, line: &str) -> io::Result<()>;
}

/// Sink that buffers lines in memory
///
/// Used by the interactive monitor to retain scrollback, and by tests as the
/// transcript observer.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|lines| lines.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "sink buffer poisoned"))?;
        lines.push(line.to_string());
        Ok(())
    }
}

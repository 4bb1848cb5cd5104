//! `tracing` subscriber setup.
//!
//! A full-screen UI owns the terminal, so log lines written to stderr would
//! land in the middle of the picture. When a [`LogHandle`] is registered the
//! subscriber writes into its in-memory ring buffer instead; otherwise it
//! falls back to stderr.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::Level;

use crate::constants::DEFAULT_LOG_LINES;

static GLOBAL_LOG: OnceLock<LogHandle> = OnceLock::new();

/// Registers the process-wide log buffer. Returns `false` if one was
/// already set.
pub fn set_global_log(handle: LogHandle) -> bool {
    GLOBAL_LOG.set(handle).is_ok()
}

pub fn global_log() -> Option<LogHandle> {
    GLOBAL_LOG.get().cloned()
}

#[derive(Debug)]
struct LogBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LogBuffer {
    fn push_line(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

/// Shared ring buffer of formatted log lines.
#[derive(Clone, Debug)]
pub struct LogHandle {
    inner: Arc<Mutex<LogBuffer>>,
}

impl Default for LogHandle {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LINES)
    }
}

impl LogHandle {
    pub fn new(max_lines: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogBuffer {
                lines: VecDeque::new(),
                max_lines: max_lines.max(1),
            })),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        if let Ok(mut buffer) = self.inner.lock() {
            buffer.push_line(line.into());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|buffer| buffer.lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn writer(&self) -> LogWriter {
        LogWriter {
            handle: self.clone(),
            pending: Vec::new(),
        }
    }
}

/// Splits written bytes into lines for a [`LogHandle`]. A trailing partial
/// line is held until the next newline or flush.
#[derive(Debug)]
pub struct LogWriter {
    handle: LogHandle,
    pending: Vec<u8>,
}

impl LogWriter {
    fn flush_pending(&mut self, force: bool) {
        let end = if force {
            self.pending.len()
        } else {
            match self.pending.iter().rposition(|b| *b == b'\n') {
                Some(pos) => pos + 1,
                None => return,
            }
        };
        let drained: Vec<u8> = self.pending.drain(..end).collect();
        let text = String::from_utf8_lossy(&drained);
        for line in text.split('\n').filter(|l| !l.is_empty()) {
            self.handle.push(line);
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.flush_pending(false);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_pending(true);
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.flush_pending(true);
    }
}

pub struct DelegatingWriter {
    inner: DelegatingInner,
}

enum DelegatingInner {
    Buffer(LogWriter),
    Stderr(io::Stderr),
}

impl DelegatingWriter {
    fn new() -> Self {
        let inner = match global_log() {
            Some(handle) => DelegatingInner::Buffer(handle.writer()),
            None => DelegatingInner::Stderr(io::stderr()),
        };
        DelegatingWriter { inner }
    }
}

impl Write for DelegatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            DelegatingInner::Buffer(w) => w.write(buf),
            DelegatingInner::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            DelegatingInner::Buffer(w) => w.flush(),
            DelegatingInner::Stderr(s) => s.flush(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SubscriberMakeWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SubscriberMakeWriter {
    type Writer = DelegatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DelegatingWriter::new()
    }
}

/// Installs a compact subscriber at `max_level`. Later calls are no-ops.
pub fn init(max_level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(SubscriberMakeWriter)
        .with_target(false)
        .with_thread_names(false)
        .with_ansi(false)
        .try_init();
}

pub fn init_default() {
    init(Level::DEBUG);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_splits_lines_and_holds_partial_tail() {
        let handle = LogHandle::new(10);
        let mut w = handle.writer();
        w.write_all(b"first\nsec").unwrap();
        assert_eq!(handle.lines(), vec!["first"]);
        w.write_all(b"ond\n\nthird").unwrap();
        assert_eq!(handle.lines(), vec!["first", "second"]);
        drop(w);
        assert_eq!(handle.lines(), vec!["first", "second", "third"]);
    }

    #[test]
    fn ring_keeps_newest_lines() {
        let handle = LogHandle::new(2);
        for line in ["a", "b", "c"] {
            handle.push(line);
        }
        assert_eq!(handle.lines(), vec!["b", "c"]);
    }

    #[test]
    fn subscriber_events_land_in_registered_buffer() {
        let handle = LogHandle::new(50);
        set_global_log(handle.clone());
        init_default();
        tracing::info!(node = 7, "hello from the tree");
        if let Some(global) = global_log() {
            assert!(
                global
                    .lines()
                    .iter()
                    .any(|l| l.contains("hello from the tree"))
            );
        }
    }
}

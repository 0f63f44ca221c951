//! Capture of dispatched commands for later replay.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};
use std::time::Instant;

use shared::protocol::ReplayEntry;

/// Records every command sent through the dispatcher while active.
/// Timestamps are milliseconds since `start()`.
pub struct CommandRecorder {
    active: AtomicBool,
    inner: Mutex<RecorderInner>,
}

struct RecorderInner {
    started_at: Instant,
    entries: Vec<ReplayEntry>,
}

impl Default for CommandRecorder {
    fn default() -> Self {
        Self {
            active: AtomicBool::new(false),
            inner: Mutex::new(RecorderInner {
                started_at: Instant::now(),
                entries: Vec::new(),
            }),
        }
    }
}

impl CommandRecorder {
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.started_at = Instant::now();
        inner.entries.clear();
        self.active.store(true, Ordering::SeqCst);
    }

    /// Stops recording and returns the captured queue.
    pub fn stop(&self) -> Vec<ReplayEntry> {
        self.active.store(false, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.entries)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn record(&self, command: &str) {
        if !self.is_active() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let executed_at = inner.started_at.elapsed().as_millis() as u64;
        inner.entries.push(ReplayEntry {
            command: command.to_string(),
            executed_at,
        });
    }
}

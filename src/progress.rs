//! 进度观察者：在每次收割批次结果后接收 (完成数, 失败数) 增量。
//!
//! # Progress Observers
//!
//! The scheduler reports `(done_delta, fault_delta)` after every harvested
//! batch. Observers are for display and logging only; nothing in the core
//! reads them back.
//!
//! | Observer | Description |
//! |----------|-------------|
//! | [`NoopProgress`] | Discards every report (default) |
//! | [`TracingProgress`] | Logs running totals at `debug` level |
//! | [`RecordingProgress`] | Keeps every delta in memory, for tests |
//! | [`CompositeProgress`] | Fans a report out to several observers |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sink for per-harvest progress deltas.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, done: usize, fault: usize);

    /// Called when a new attempt starts.
    fn on_attempt(&self, _attempt: u32) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _: usize, _: usize) {}
}

pub fn noop_observer() -> Arc<dyn ProgressObserver> {
    Arc::new(NoopProgress)
}

/// Logs running totals through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgress {
    done: AtomicUsize,
    fault: AtomicUsize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, done: usize, fault: usize) {
        if done + fault == 0 {
            return;
        }
        let total_done = self.done.fetch_add(done, Ordering::Relaxed) + done;
        let total_fault = self.fault.fetch_add(fault, Ordering::Relaxed) + fault;
        tracing::debug!(done, fault, total_done, total_fault, "batch harvested");
    }

    fn on_attempt(&self, attempt: u32) {
        self.done.store(0, Ordering::Relaxed);
        self.fault.store(0, Ordering::Relaxed);
        tracing::debug!(attempt, "progress counters reset");
    }
}

/// In-memory observer for tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    deltas: Mutex<Vec<(usize, usize)>>,
    attempts: Mutex<Vec<u32>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deltas(&self) -> Vec<(usize, usize)> {
        self.deltas.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn total_done(&self) -> usize {
        self.deltas().iter().map(|(d, _)| d).sum()
    }

    pub fn total_fault(&self) -> usize {
        self.deltas().iter().map(|(_, f)| f).sum()
    }
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, done: usize, fault: usize) {
        if let Ok(mut d) = self.deltas.lock() {
            d.push((done, fault));
        }
    }

    fn on_attempt(&self, attempt: u32) {
        if let Ok(mut a) = self.attempts.lock() {
            a.push(attempt);
        }
    }
}

/// Composite observer for multiple destinations.
#[derive(Default)]
pub struct CompositeProgress {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl CompositeProgress {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl ProgressObserver for CompositeProgress {
    fn on_progress(&self, done: usize, fault: usize) {
        for o in &self.observers {
            o.on_progress(done, fault);
        }
    }

    fn on_attempt(&self, attempt: u32) {
        for o in &self.observers {
            o.on_attempt(attempt);
        }
    }
}

//! Transforms shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use transpool::batch::DEFAULT_DELIMITER;
use transpool::{Error, ErrorContext, Result, TextTransform};

/// Uppercases the whole joined text. The default delimiter has no case.
pub struct Uppercase;

#[async_trait]
impl TextTransform for Uppercase {
    async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
        Ok(text.to_uppercase())
    }
    fn name(&self) -> &'static str {
        "uppercase"
    }
}

/// Always errors.
pub struct Failing;

#[async_trait]
impl TextTransform for Failing {
    async fn transform(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Err(Error::transform("service unavailable", ErrorContext::new()))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fails the first `failures` calls, then uppercases.
pub struct Flaky {
    failures: usize,
    fatal: bool,
    calls: AtomicUsize,
}

impl Flaky {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            fatal: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Same, but the failures are marked as not retryable.
    pub fn fatal(failures: usize) -> Self {
        Self {
            fatal: true,
            ..Self::new(failures)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextTransform for Flaky {
    async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(if self.fatal {
                Error::transform_fatal("rejected", ErrorContext::new())
            } else {
                Error::transform("temporarily unavailable", ErrorContext::new())
            });
        }
        Ok(text.to_uppercase())
    }
    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// Uppercases and keeps only the first `keep` parts of every batch.
pub struct Truncating {
    pub keep: usize,
}

#[async_trait]
impl TextTransform for Truncating {
    async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
        let parts: Vec<String> = text
            .split(DEFAULT_DELIMITER)
            .take(self.keep)
            .map(str::to_uppercase)
            .collect();
        Ok(parts.join(DEFAULT_DELIMITER))
    }
    fn name(&self) -> &'static str {
        "truncating"
    }
}

/// Uppercases after a delay while tracking how many calls overlap.
pub struct Gauge {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Gauge {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextTransform for Gauge {
    async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(text.to_uppercase())
    }
    fn name(&self) -> &'static str {
        "gauge"
    }
}

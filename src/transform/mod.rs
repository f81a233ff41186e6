//! 文本变换模块：外部变换服务的抽象、回显实现、网络实现与后处理。
//!
//! # Text Transform Module
//!
//! A [`TextTransform`] is the slow external capability the pool exists to
//! drive: it takes one joined batch text and returns one joined result. The
//! implementation is chosen when the orchestrator is built, so tests and dry
//! runs inject [`EchoTransform`] while real runs inject a networked one such
//! as [`GoogleWebTransform`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TextTransform`] | Async capability `transform(source, target, text)` |
//! | [`EchoTransform`] | Returns its input, optionally after a delay |
//! | [`GoogleWebTransform`] | Calls the mobile Google Translate page over HTTP |
//! | [`PostProcessor`] | Optional per-item fixup applied after splitting |
//! | [`CaseMatch`] | Lowercases an output whose source did not start uppercase |

mod google;
mod postprocess;

pub use google::{GoogleWebConfig, GoogleWebTransform};
pub use postprocess::{CaseMatch, PostProcessor};

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// External text transformation service.
///
/// Implementations may fail freely. Errors are caught at the slot boundary and
/// turned into a failed slot result, never propagated to the orchestrator.
#[async_trait]
pub trait TextTransform: Send + Sync {
    async fn transform(&self, source_locale: &str, target_locale: &str, text: &str)
        -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Identity transform for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct EchoTransform {
    delay: Option<Duration>,
}

impl EchoTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before answering, to simulate a slow service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl TextTransform for EchoTransform {
    async fn transform(&self, _source: &str, _target: &str, text: &str) -> Result<String> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

use super::RetryOrchestrator;
use crate::config::RunConfig;
use crate::progress::{noop_observer, ProgressObserver};
use crate::transform::{PostProcessor, TextTransform};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;

/// Builder for a [`RetryOrchestrator`].
///
/// A transform is required; everything else has a default.
pub struct OrchestratorBuilder {
    config: RunConfig,
    transform: Option<Arc<dyn TextTransform>>,
    observer: Arc<dyn ProgressObserver>,
    post_processor: Option<Arc<dyn PostProcessor>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            transform: None,
            observer: noop_observer(),
            post_processor: None,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn TextTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Inject a progress observer. Default is a no-op observer.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Applied to every split part before it is saved.
    pub fn with_post_processor(mut self, post_processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = Some(post_processor);
        self
    }

    pub fn build(self) -> Result<RetryOrchestrator> {
        self.config.validate()?;
        let transform = self.transform.ok_or_else(|| {
            Error::configuration_with_context(
                "a text transform is required",
                ErrorContext::new()
                    .with_field_path("transform")
                    .with_source("orchestrator_builder"),
            )
        })?;
        RetryOrchestrator::from_parts(self.config, transform, self.observer, self.post_processor)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

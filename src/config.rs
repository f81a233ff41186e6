//! Run configuration.
//!
//! Values come from [`RunConfig::default`], an optional YAML file and
//! `TRANSPOOL_*` environment variables, applied in that order.

use crate::batch::{BatchLimits, DEFAULT_DELIMITER};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What to do with items whose source text is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySourcePolicy {
    /// Treat them like any other item. Their stored value can never differ from
    /// the source, so they are re-sent on every attempt.
    #[default]
    Process,
    /// Leave them out of batching entirely.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of task slots, i.e. the maximum number of concurrent transform calls.
    pub pool_capacity: usize,
    /// Maximum summed UTF-8 size of the texts in one batch.
    pub byte_budget: usize,
    /// Maximum number of items in one batch.
    pub max_batch_count: usize,
    /// Number of scan-and-process passes before giving up on the rest.
    pub max_attempts: u32,
    /// Stop after this many items were queued (0 = unlimited).
    pub item_limit: usize,
    pub source_locale: String,
    pub target_locale: String,
    pub delimiter: String,
    /// Accept whitespace inserted by the service around the delimiter.
    pub tolerant_split: bool,
    /// Re-poll period while waiting on busy slots (0 disables the guard).
    pub liveness_timeout_secs: u64,
    pub empty_source: EmptySourcePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 6,
            byte_budget: 4999,
            max_batch_count: 20,
            max_attempts: 3,
            item_limit: 0,
            source_locale: "auto".to_string(),
            target_locale: "en".to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            tolerant_split: true,
            liveness_timeout_secs: 20,
            empty_source: EmptySourcePolicy::Process,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                "cannot read config file",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("run_config"),
            )
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply `TRANSPOOL_*` overrides from the environment. Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        fn env_num<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
        }
        if let Some(v) = env_num("TRANSPOOL_POOL_CAPACITY") {
            self.pool_capacity = v;
        }
        if let Some(v) = env_num("TRANSPOOL_BYTE_BUDGET") {
            self.byte_budget = v;
        }
        if let Some(v) = env_num("TRANSPOOL_MAX_BATCH_COUNT") {
            self.max_batch_count = v;
        }
        if let Some(v) = env_num("TRANSPOOL_MAX_ATTEMPTS") {
            self.max_attempts = v;
        }
        if let Some(v) = env_num("TRANSPOOL_ITEM_LIMIT") {
            self.item_limit = v;
        }
        if let Some(v) = env_num("TRANSPOOL_LIVENESS_TIMEOUT_SECS") {
            self.liveness_timeout_secs = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pool_capacity", self.pool_capacity),
            ("byte_budget", self.byte_budget),
            ("max_batch_count", self.max_batch_count),
            ("max_attempts", self.max_attempts as usize),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(Error::configuration_with_context(
                    "must be greater than zero",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("run_config"),
                ));
            }
        }
        if self.delimiter.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "delimiter must contain at least one visible character",
                ErrorContext::new()
                    .with_field_path("delimiter")
                    .with_source("run_config"),
            ));
        }
        if self.target_locale.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "target locale is required",
                ErrorContext::new()
                    .with_field_path("target_locale")
                    .with_source("run_config"),
            ));
        }
        Ok(())
    }

    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits::new()
            .with_byte_budget(self.byte_budget)
            .with_max_count(self.max_batch_count)
    }

    pub fn liveness_timeout(&self) -> Option<Duration> {
        (self.liveness_timeout_secs > 0).then(|| Duration::from_secs(self.liveness_timeout_secs))
    }

    pub fn with_pool_capacity(mut self, n: usize) -> Self {
        self.pool_capacity = n;
        self
    }
    pub fn with_byte_budget(mut self, b: usize) -> Self {
        self.byte_budget = b;
        self
    }
    pub fn with_max_batch_count(mut self, c: usize) -> Self {
        self.max_batch_count = c;
        self
    }
    pub fn with_max_attempts(mut self, a: u32) -> Self {
        self.max_attempts = a;
        self
    }
    pub fn with_item_limit(mut self, l: usize) -> Self {
        self.item_limit = l;
        self
    }
    pub fn with_locales(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_locale = source.into();
        self.target_locale = target.into();
        self
    }
    pub fn with_delimiter(mut self, d: impl Into<String>) -> Self {
        self.delimiter = d.into();
        self
    }
    pub fn with_tolerant_split(mut self, t: bool) -> Self {
        self.tolerant_split = t;
        self
    }
    pub fn with_liveness_timeout_secs(mut self, secs: u64) -> Self {
        self.liveness_timeout_secs = secs;
        self
    }
    pub fn with_empty_source(mut self, p: EmptySourcePolicy) -> Self {
        self.empty_source = p;
        self
    }
}

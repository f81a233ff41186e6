//! 重试编排器：多轮扫描源集合，决定哪些条目需要处理，组批提交，并在结果不完整时重新排队。
//!
//! # Retry Orchestrator
//!
//! Each attempt walks the source items in order and sorts every item into one of:
//!
//! - **cloned**: a peer store already has a finished value the output lacks;
//! - **satisfied**: the output already holds a value that differs from the source;
//! - **added** / **requeued**: the key is absent, or its value is empty or still
//!   equal to the source text.
//!
//! Added and requeued items go through the [`BatchBuilder`] into the
//! [`Scheduler`]. Attempts repeat while work remains, up to `max_attempts`,
//! and stop early once the item limit is reached.

mod builder;
mod summary;

pub use builder::OrchestratorBuilder;
pub use summary::{AttemptState, RunSummary};

use crate::batch::{Batch, BatchBuilder, BatchCodec};
use crate::config::{EmptySourcePolicy, RunConfig};
use crate::pool::CallContext;
use crate::progress::ProgressObserver;
use crate::scheduler::Scheduler;
use crate::store::{OutputStore, ReadStore};
use crate::transform::{PostProcessor, TextTransform};
use crate::types::WorkItem;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// How a scanned item is treated in the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Key absent from the output store.
    Add,
    /// Stored value is empty or equal to the source text.
    Requeue,
    /// Nothing to do.
    Satisfied,
}

/// Classify `item` against the output store.
pub fn classify<S>(item: &WorkItem, store: &S, policy: EmptySourcePolicy) -> Disposition
where
    S: ReadStore + ?Sized,
{
    if policy == EmptySourcePolicy::Skip && item.source_text.trim().is_empty() {
        return Disposition::Satisfied;
    }
    match store.get(&item.key) {
        None => Disposition::Add,
        Some(value) if value.is_empty() || value == item.source_text => Disposition::Requeue,
        Some(_) => Disposition::Satisfied,
    }
}

pub fn needs_processing<S>(item: &WorkItem, store: &S, policy: EmptySourcePolicy) -> bool
where
    S: ReadStore + ?Sized,
{
    classify(item, store, policy) != Disposition::Satisfied
}

/// Items that would be submitted if an attempt started now, in source order.
pub fn pending_items<'a, S>(
    items: &'a [WorkItem],
    store: &S,
    policy: EmptySourcePolicy,
) -> Vec<&'a WorkItem>
where
    S: ReadStore + ?Sized,
{
    items
        .iter()
        .filter(|item| needs_processing(item, store, policy))
        .collect()
}

/// Drives repeated passes over a source collection until it is processed.
pub struct RetryOrchestrator {
    config: RunConfig,
    ctx: Arc<CallContext>,
    observer: Arc<dyn ProgressObserver>,
}

impl RetryOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    fn from_parts(
        config: RunConfig,
        transform: Arc<dyn TextTransform>,
        observer: Arc<dyn ProgressObserver>,
        post_processor: Option<Arc<dyn PostProcessor>>,
    ) -> Result<Self> {
        let codec = BatchCodec::new(config.delimiter.clone())?
            .with_tolerant_split(config.tolerant_split)?;
        let mut ctx = CallContext::new(
            transform,
            codec,
            config.source_locale.clone(),
            config.target_locale.clone(),
        );
        if let Some(p) = post_processor {
            ctx = ctx.with_post_processor(p);
        }
        Ok(Self {
            config,
            ctx: Arc::new(ctx),
            observer,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn transform_name(&self) -> &'static str {
        self.ctx.transform.name()
    }

    /// Process `items` into `store`, copying finished values from `peer` when it has them.
    ///
    /// Transform failures never surface here; the affected items are simply left
    /// pending. Only structural errors (pool misuse, configuration) are returned.
    pub async fn run<S>(
        &self,
        items: &[WorkItem],
        store: &mut S,
        peer: Option<&dyn ReadStore>,
    ) -> Result<RunSummary>
    where
        S: OutputStore + ?Sized,
    {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("transpool_run", run_id = %run_id, transform = self.transform_name());
        self.run_inner(run_id, items, store, peer)
            .instrument(span)
            .await
    }

    async fn run_inner<S>(
        &self,
        run_id: String,
        items: &[WorkItem],
        store: &mut S,
        peer: Option<&dyn ReadStore>,
    ) -> Result<RunSummary>
    where
        S: OutputStore + ?Sized,
    {
        let cfg = &self.config;
        let source_count = items.len();
        let effective_limit = if cfg.item_limit > 0 {
            cfg.item_limit
        } else {
            source_count
        };
        info!(
            source_count,
            pool_capacity = cfg.pool_capacity,
            byte_budget = cfg.byte_budget,
            max_batch_count = cfg.max_batch_count,
            max_attempts = cfg.max_attempts,
            item_limit = cfg.item_limit,
            "run started"
        );

        let mut scheduler = Scheduler::new(
            cfg.pool_capacity,
            Arc::clone(&self.ctx),
            Arc::clone(&self.observer),
        )?
        .with_liveness_timeout(cfg.liveness_timeout());

        let mut summary = RunSummary::new(run_id, source_count);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.observer.on_attempt(attempt);
            scheduler.reset_progress();

            let state = self
                .run_attempt(attempt, items, store, peer, &mut scheduler, &mut summary.limit_reached)
                .await?;
            info!(
                attempt,
                added = state.added,
                requeued = state.requeued,
                cloned = state.cloned,
                satisfied = state.satisfied,
                done = state.done,
                fault = state.fault,
                batches = state.batches,
                "attempt finished"
            );
            summary.record(state);

            let keep_going = summary.accounted() < source_count
                && attempt < cfg.max_attempts
                && summary.translated < effective_limit
                && !summary.limit_reached;
            if !keep_going {
                break;
            }
        }
        drop(scheduler);

        summary.pending = source_count.saturating_sub(summary.accounted());
        info!(
            translated = summary.translated,
            cloned = summary.cloned,
            already_present = summary.already_present,
            pending = summary.pending,
            attempts = summary.attempts,
            "run finished"
        );
        Ok(summary)
    }

    async fn run_attempt<S>(
        &self,
        attempt: u32,
        items: &[WorkItem],
        store: &mut S,
        peer: Option<&dyn ReadStore>,
        scheduler: &mut Scheduler,
        limit_reached: &mut bool,
    ) -> Result<AttemptState>
    where
        S: OutputStore + ?Sized,
    {
        let cfg = &self.config;
        let mut state = AttemptState::new(attempt);
        let mut builder = BatchBuilder::new(cfg.batch_limits());

        for item in items {
            if let Some(value) = peer.and_then(|p| p.get(&item.key)).filter(|v| !v.is_empty()) {
                if store.get(&item.key).map_or(true, str::is_empty) {
                    store.set(&item.key, value.to_string());
                    state.cloned += 1;
                    continue;
                }
            }

            match classify(item, &*store, cfg.empty_source) {
                Disposition::Satisfied => {
                    state.satisfied += 1;
                    continue;
                }
                Disposition::Add => state.added += 1,
                Disposition::Requeue => state.requeued += 1,
            }

            if let Some(batch) = builder.offer(item.clone()) {
                Self::submit(scheduler, batch, store, &mut state).await?;
            }

            if cfg.item_limit > 0 && state.submitted() >= cfg.item_limit {
                info!(item_limit = cfg.item_limit, "item limit reached, scan stopped");
                *limit_reached = true;
                break;
            }
        }

        if let Some(batch) = builder.finish() {
            Self::submit(scheduler, batch, store, &mut state).await?;
        }

        state.done = scheduler.wait_all(store).await?;
        state.fault = scheduler.pass_fault();
        Ok(state)
    }

    async fn submit<S>(
        scheduler: &mut Scheduler,
        batch: Batch,
        store: &mut S,
        state: &mut AttemptState,
    ) -> Result<()>
    where
        S: OutputStore + ?Sized,
    {
        debug!(
            batch = batch.sequence,
            items = batch.len(),
            bytes = batch.byte_total,
            "batch flushed"
        );
        state.batches += 1;
        scheduler.submit(batch, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::EchoTransform;
    use std::collections::HashMap;

    fn store(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify() {
        let s = store(&[("done", "Hallo"), ("stale", "Hello"), ("blank", "")]);
        let policy = EmptySourcePolicy::Process;

        assert_eq!(classify(&WorkItem::new("done", "Hello"), &s, policy), Disposition::Satisfied);
        assert_eq!(classify(&WorkItem::new("stale", "Hello"), &s, policy), Disposition::Requeue);
        assert_eq!(classify(&WorkItem::new("blank", "Hello"), &s, policy), Disposition::Requeue);
        assert_eq!(classify(&WorkItem::new("new", "Hello"), &s, policy), Disposition::Add);
    }

    #[test]
    fn test_empty_source_policy() {
        let s = store(&[]);
        let item = WorkItem::new("e", "  ");
        assert!(needs_processing(&item, &s, EmptySourcePolicy::Process));
        assert!(!needs_processing(&item, &s, EmptySourcePolicy::Skip));
    }

    #[test]
    fn test_pending_items_keeps_source_order() {
        let items = WorkItem::from_pairs([("c", "3"), ("a", "1"), ("b", "2")]);
        let s = store(&[("a", "eins")]);
        let keys: Vec<_> = pending_items(&items, &s, EmptySourcePolicy::Process)
            .into_iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(keys, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_empty_source_collection_runs_one_attempt() {
        let orch = RetryOrchestrator::builder()
            .with_transform(Arc::new(EchoTransform::new()))
            .build()
            .unwrap();
        let mut s: HashMap<String, String> = HashMap::new();
        let summary = orch.run(&[], &mut s, None).await.unwrap();
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.batches_submitted, 0);
        assert!(summary.is_complete());
        assert!(!summary.run_id.is_empty());
    }

    #[tokio::test]
    async fn test_skip_policy_does_not_retry_empty_sources() {
        let orch = RetryOrchestrator::builder()
            .with_config(
                RunConfig::default()
                    .with_empty_source(EmptySourcePolicy::Skip)
                    .with_max_attempts(5),
            )
            .with_transform(Arc::new(EchoTransform::new()))
            .build()
            .unwrap();
        let items = WorkItem::from_pairs([("a", "Hello"), ("b", "")]);
        let mut s: HashMap<String, String> = HashMap::new();
        let summary = orch.run(&items, &mut s, None).await.unwrap();

        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.translated, 1);
        assert_eq!(summary.already_present, 1);
        assert!(!s.contains_key("b"));
        assert_eq!(summary.pending, 0);
    }
}

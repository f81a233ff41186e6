//! A reusable execution slot bound to one transform call at a time.

use crate::batch::{Batch, BatchCodec};
use crate::store::OutputStore;
use crate::transform::{PostProcessor, TextTransform};
use crate::types::SlotResult;
use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Reserved,
}

/// Everything a slot operation needs besides its batch. Shared by all slots.
pub struct CallContext {
    pub transform: Arc<dyn TextTransform>,
    pub codec: BatchCodec,
    pub post_processor: Option<Arc<dyn PostProcessor>>,
    pub source_locale: String,
    pub target_locale: String,
}

impl CallContext {
    pub fn new(
        transform: Arc<dyn TextTransform>,
        codec: BatchCodec,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            transform,
            codec,
            post_processor: None,
            source_locale: source_locale.into(),
            target_locale: target_locale.into(),
        }
    }

    pub fn with_post_processor(mut self, p: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = Some(p);
        self
    }
}

/// One unit of concurrent execution.
///
/// The slot's state is only changed through [`try_reserve`](Self::try_reserve),
/// [`reserve`](Self::reserve) and [`release`](Self::release). The scheduler is the
/// only owner, so a second reservation of a reserved slot is always a reentrant
/// call and is rejected.
#[derive(Debug)]
pub struct TaskSlot {
    index: usize,
    state: SlotState,
    pending: Option<Batch>,
    result: SlotResult,
    abort: Option<AbortHandle>,
}

impl TaskSlot {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            state: SlotState::Free,
            pending: None,
            result: SlotResult::Pending,
            abort: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_reserved(&self) -> bool {
        self.state == SlotState::Reserved
    }

    pub fn pending_batch(&self) -> Option<&Batch> {
        self.pending.as_ref()
    }

    pub fn result(&self) -> &SlotResult {
        &self.result
    }

    pub fn try_reserve(&mut self) -> bool {
        if self.state == SlotState::Free {
            self.state = SlotState::Reserved;
            true
        } else {
            false
        }
    }

    pub fn reserve(&mut self) -> Result<()> {
        if self.try_reserve() {
            Ok(())
        } else {
            Err(Error::SlotAlreadyReserved { index: self.index })
        }
    }

    /// Return the slot to the pool, dropping its batch and result.
    pub fn release(&mut self) -> Result<()> {
        if self.state != SlotState::Reserved {
            return Err(Error::runtime_with_context(
                "release without reservation",
                ErrorContext::new()
                    .with_details(format!("slot {}", self.index))
                    .with_source("task_slot"),
            ));
        }
        self.state = SlotState::Free;
        self.pending = None;
        self.result = SlotResult::Pending;
        self.abort = None;
        Ok(())
    }

    /// Bind `batch` to this reserved slot and build the transform call for it.
    ///
    /// The returned future owns everything it touches, so it can be spawned.
    /// It never fails: transform errors and empty replies become
    /// [`SlotResult::Failure`].
    pub fn run(
        &mut self,
        batch: Batch,
        ctx: Arc<CallContext>,
    ) -> Result<impl Future<Output = SlotResult> + Send + 'static> {
        if !self.is_reserved() {
            return Err(Error::runtime_with_context(
                "run on a slot that is not reserved",
                ErrorContext::new()
                    .with_details(format!("slot {}", self.index))
                    .with_source("task_slot"),
            ));
        }
        let index = self.index;
        let sequence = batch.sequence;
        let texts: Vec<String> = batch.texts().map(str::to_string).collect();
        self.pending = Some(batch);
        self.result = SlotResult::Pending;

        Ok(async move {
            let joined = ctx.codec.join(texts.iter().map(String::as_str));
            debug!(slot = index, batch = sequence, items = texts.len(), bytes = joined.len(), "transform call");
            let reply = ctx
                .transform
                .transform(&ctx.source_locale, &ctx.target_locale, &joined)
                .await;
            match reply {
                Ok(out) if out.trim().is_empty() => {
                    warn!(slot = index, batch = sequence, "transform returned nothing");
                    SlotResult::Failure
                }
                Ok(out) => {
                    let mut parts = ctx.codec.split(&out);
                    if let Some(post) = &ctx.post_processor {
                        for (part, source) in parts.iter_mut().zip(texts.iter()) {
                            *part = post.process(source, std::mem::take(part));
                        }
                    }
                    SlotResult::Success(parts)
                }
                Err(e) => {
                    warn!(
                        slot = index,
                        batch = sequence,
                        transform = ctx.transform.name(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "transform failed"
                    );
                    SlotResult::Failure
                }
            }
        })
    }

    pub(crate) fn complete(&mut self, result: SlotResult) {
        self.result = result;
    }

    pub(crate) fn set_abort_handle(&mut self, handle: AbortHandle) {
        self.abort = Some(handle);
    }

    pub(crate) fn abort(&mut self) {
        if let Some(h) = self.abort.take() {
            h.abort();
        }
    }

    /// Write the aligned prefix of the result into `store`.
    ///
    /// Returns `(saved, failed)`. Keys past the end of a short result are left
    /// untouched so the next scan picks them up again.
    pub fn save_result<S: OutputStore + ?Sized>(&self, store: &mut S) -> (usize, usize) {
        let Some(batch) = &self.pending else {
            return (0, 0);
        };
        let sent = batch.len();
        let parts = match &self.result {
            SlotResult::Success(parts) => parts,
            SlotResult::Failure | SlotResult::Pending => return (0, sent),
        };
        let saved = parts.len().min(sent);
        for (item, part) in batch.items.iter().zip(parts.iter()) {
            store.set(&item.key, part.clone());
        }
        if parts.len() != sent {
            warn!(
                slot = self.index,
                batch = batch.sequence,
                sent,
                received = parts.len(),
                saved,
                "split count does not match batch size"
            );
        }
        (saved, sent - saved)
    }
}

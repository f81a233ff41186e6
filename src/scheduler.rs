//! 调度器：把批次分派到槽位上执行，饱和时阻塞等待（背压），收割结果并写入输出存储。
//!
//! # Scheduler
//!
//! The scheduler is the only writer of the output store. Workers run as tokio
//! tasks and hand their [`SlotResult`] back through a completion future; the
//! scheduler moves it into the slot, saves the aligned prefix, releases the
//! slot and reports the delta to the progress observer.
//!
//! At most `capacity` operations are ever in flight: when every slot is busy,
//! [`Scheduler::submit`] waits for the first completion and reuses that slot.

use crate::batch::Batch;
use crate::pool::{CallContext, SlotPool};
use crate::progress::ProgressObserver;
use crate::store::OutputStore;
use crate::types::SlotResult;
use crate::{Error, ErrorContext, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

type Completion = Pin<Box<dyn Future<Output = (usize, SlotResult)> + Send>>;

pub struct Scheduler {
    pool: SlotPool,
    ctx: Arc<CallContext>,
    inflight: FuturesUnordered<Completion>,
    observer: Arc<dyn ProgressObserver>,
    liveness_timeout: Option<Duration>,
    pass_done: usize,
    pass_fault: usize,
    batches_submitted: usize,
    peak_inflight: usize,
}

impl Scheduler {
    pub fn new(
        capacity: usize,
        ctx: Arc<CallContext>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<Self> {
        Ok(Self {
            pool: SlotPool::new(capacity)?,
            ctx,
            inflight: FuturesUnordered::new(),
            observer,
            liveness_timeout: None,
            pass_done: 0,
            pass_fault: 0,
            batches_submitted: 0,
            peak_inflight: 0,
        })
    }

    /// Re-poll period while blocked on busy slots. Each elapsed period is logged.
    pub fn with_liveness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn pass_done(&self) -> usize {
        self.pass_done
    }

    pub fn pass_fault(&self) -> usize {
        self.pass_fault
    }

    pub fn batches_submitted(&self) -> usize {
        self.batches_submitted
    }

    /// Highest number of operations that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_inflight
    }

    pub fn reset_progress(&mut self) {
        self.pass_done = 0;
        self.pass_fault = 0;
    }

    /// Dispatch `batch` onto a slot, waiting for a completion if all slots are busy.
    ///
    /// Results harvested while waiting are written to `store`.
    pub async fn submit<S>(&mut self, batch: Batch, store: &mut S) -> Result<()>
    where
        S: OutputStore + ?Sized,
    {
        let index = if !self.pool.is_full() {
            let index = self.pool.len();
            self.pool.get_or_create(index)?.reserve()?;
            index
        } else if let Some(slot) = self.pool.free_slot() {
            slot.index()
        } else {
            let (index, result) = self.next_completion().await?;
            self.harvest(index, result, store)?;
            self.pool.slot_mut(index)?.reserve()?;
            index
        };
        self.dispatch(index, batch)
    }

    /// Wait for every in-flight operation and harvest it.
    ///
    /// Returns the number of items saved since the last [`reset_progress`](Self::reset_progress).
    pub async fn wait_all<S>(&mut self, store: &mut S) -> Result<usize>
    where
        S: OutputStore + ?Sized,
    {
        while !self.inflight.is_empty() {
            let (index, result) = self.next_completion().await?;
            self.harvest(index, result, store)?;
        }
        Ok(self.pass_done)
    }

    fn dispatch(&mut self, index: usize, batch: Batch) -> Result<()> {
        let sequence = batch.sequence;
        let items = batch.len();
        let slot = self.pool.slot_mut(index)?;
        let op = slot.run(batch, Arc::clone(&self.ctx))?;
        let handle = tokio::spawn(op);
        slot.set_abort_handle(handle.abort_handle());

        self.inflight.push(Box::pin(async move {
            match handle.await {
                Ok(result) => (index, result),
                Err(e) => {
                    warn!(slot = index, error = %e, "slot operation did not finish");
                    (index, SlotResult::Failure)
                }
            }
        }));
        self.batches_submitted += 1;
        self.peak_inflight = self.peak_inflight.max(self.inflight.len());
        debug!(slot = index, batch = sequence, items, in_flight = self.inflight.len(), "batch dispatched");
        Ok(())
    }

    async fn next_completion(&mut self) -> Result<(usize, SlotResult)> {
        loop {
            let next = match self.liveness_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.inflight.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            busy = ?self.pool.reserved_indices(),
                            waited_ms = limit.as_millis() as u64,
                            "still waiting for a slot to finish"
                        );
                        continue;
                    }
                },
                None => self.inflight.next().await,
            };
            return next.ok_or_else(|| {
                Error::runtime_with_context(
                    "waited for a completion with nothing in flight",
                    ErrorContext::new().with_source("scheduler"),
                )
            });
        }
    }

    fn harvest<S>(&mut self, index: usize, result: SlotResult, store: &mut S) -> Result<()>
    where
        S: OutputStore + ?Sized,
    {
        let slot = self.pool.slot_mut(index)?;
        slot.complete(result);
        let (done, fault) = slot.save_result(store);
        slot.release()?;

        self.pass_done += done;
        self.pass_fault += fault;
        self.observer.on_progress(done, fault);
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.inflight.is_empty() {
            debug!(in_flight = self.inflight.len(), "aborting in-flight slot operations");
        }
        self.pool.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchCodec;
    use crate::progress::RecordingProgress;
    use crate::transform::{EchoTransform, TextTransform};
    use crate::types::WorkItem;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Echo with a delay that records how many calls overlap.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextTransform for Gauge {
        async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(text.to_string())
        }
        fn name(&self) -> &'static str {
            "gauge"
        }
    }

    struct Panicky;

    #[async_trait]
    impl TextTransform for Panicky {
        async fn transform(&self, _: &str, _: &str, _: &str) -> Result<String> {
            panic!("worker blew up");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    struct SlowFlag(Arc<AtomicBool>);

    #[async_trait]
    impl TextTransform for SlowFlag {
        async fn transform(&self, _: &str, _: &str, text: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.store(true, Ordering::SeqCst);
            Ok(text.to_string())
        }
        fn name(&self) -> &'static str {
            "slow_flag"
        }
    }

    fn scheduler(capacity: usize, t: Arc<dyn TextTransform>) -> (Scheduler, Arc<RecordingProgress>) {
        let rec = Arc::new(RecordingProgress::new());
        let ctx = Arc::new(CallContext::new(t, BatchCodec::default(), "en", "de"));
        (Scheduler::new(capacity, ctx, rec.clone()).unwrap(), rec)
    }

    fn single(seq: u64, key: &str) -> Batch {
        let mut b = Batch::new(seq);
        b.items.push(WorkItem::new(key, format!("text {key}")));
        b.byte_total = b.items[0].encoded_len();
        b
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_capacity() {
        let gauge = Arc::new(Gauge::default());
        let (mut sched, rec) = scheduler(3, gauge.clone());
        let mut store: HashMap<String, String> = HashMap::new();

        for i in 0..20 {
            sched.submit(single(i + 1, &format!("k{i}")), &mut store).await.unwrap();
            assert!(sched.in_flight() <= 3);
        }
        let done = sched.wait_all(&mut store).await.unwrap();

        assert_eq!(done, 20);
        assert_eq!(store.len(), 20);
        assert_eq!(gauge.calls.load(Ordering::SeqCst), 20);
        assert!(gauge.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(sched.peak_in_flight(), 3);
        assert_eq!(sched.pool().len(), 3);
        assert!(sched.pool().reserved_indices().is_empty());
        assert_eq!(rec.total_done(), 20);
        assert_eq!(rec.deltas().len(), 20);
    }

    #[tokio::test]
    async fn test_slots_are_reused_across_passes() {
        let (mut sched, _) = scheduler(2, Arc::new(EchoTransform::new()));
        let mut store: HashMap<String, String> = HashMap::new();

        sched.submit(single(1, "a"), &mut store).await.unwrap();
        sched.submit(single(2, "b"), &mut store).await.unwrap();
        assert_eq!(sched.wait_all(&mut store).await.unwrap(), 2);

        sched.reset_progress();
        assert_eq!(sched.pass_done(), 0);
        sched.submit(single(1, "c"), &mut store).await.unwrap();
        assert_eq!(sched.pool().reserved_indices(), vec![0]);
        assert_eq!(sched.wait_all(&mut store).await.unwrap(), 1);
        assert_eq!(sched.pool().len(), 2);
        assert_eq!(sched.batches_submitted(), 3);
    }

    #[tokio::test]
    async fn test_panicking_worker_counts_as_fault_and_frees_slot() {
        let (mut sched, rec) = scheduler(1, Arc::new(Panicky));
        let mut store: HashMap<String, String> = HashMap::new();

        sched.submit(single(1, "a"), &mut store).await.unwrap();
        // The only slot is busy: this waits for the panic, harvests it, and reuses slot 0.
        sched.submit(single(2, "b"), &mut store).await.unwrap();
        assert_eq!(sched.wait_all(&mut store).await.unwrap(), 0);

        assert_eq!(sched.pass_fault(), 2);
        assert!(store.is_empty());
        assert!(sched.pool().reserved_indices().is_empty());
        assert_eq!(rec.deltas(), vec![(0, 1), (0, 1)]);
    }

    #[tokio::test]
    async fn test_liveness_timeout_only_repolls() {
        let flag = Arc::new(AtomicBool::new(false));
        let (sched, _) = scheduler(1, Arc::new(SlowFlag(flag.clone())));
        let mut sched = sched.with_liveness_timeout(Some(Duration::from_millis(5)));
        let mut store: HashMap<String, String> = HashMap::new();

        sched.submit(single(1, "a"), &mut store).await.unwrap();
        assert_eq!(sched.wait_all(&mut store).await.unwrap(), 1);
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_aborts_in_flight_work() {
        let flag = Arc::new(AtomicBool::new(false));
        let (mut sched, _) = scheduler(2, Arc::new(SlowFlag(flag.clone())));
        let mut store: HashMap<String, String> = HashMap::new();

        sched.submit(single(1, "a"), &mut store).await.unwrap();
        drop(sched);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!flag.load(Ordering::SeqCst));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wait_all_with_nothing_in_flight() {
        let (mut sched, rec) = scheduler(2, Arc::new(EchoTransform::new()));
        let mut store: HashMap<String, String> = HashMap::new();
        assert_eq!(sched.wait_all(&mut store).await.unwrap(), 0);
        assert!(rec.deltas().is_empty());
    }
}

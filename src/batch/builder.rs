//! Batch builder.

use crate::types::WorkItem;

/// Size limits applied while grouping items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Upper bound on the summed encoded size of a batch, in bytes.
    pub byte_budget: usize,
    /// Upper bound on the number of items in a batch.
    pub max_count: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            byte_budget: 4999,
            max_count: 20,
        }
    }
}

impl BatchLimits {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_byte_budget(mut self, b: usize) -> Self {
        self.byte_budget = b;
        self
    }
    pub fn with_max_count(mut self, c: usize) -> Self {
        self.max_count = c;
        self
    }
}

/// A size-bounded group of items submitted in one transform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub items: Vec<WorkItem>,
    /// 1-based position of the batch within its attempt.
    pub sequence: u64,
    pub byte_total: usize,
}

impl Batch {
    pub fn new(sequence: u64) -> Self {
        Self {
            items: Vec::new(),
            sequence,
            byte_total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.key.as_str())
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.source_text.as_str())
    }

    fn push(&mut self, item: WorkItem) {
        self.byte_total += item.encoded_len();
        self.items.push(item);
    }
}

/// Groups items into batches that respect [`BatchLimits`].
///
/// Items are offered one at a time in scan order. When an item does not fit,
/// the batch built so far is handed back for submission and the item starts a
/// fresh one. An item larger than the whole budget still gets a batch of its own.
pub struct BatchBuilder {
    limits: BatchLimits,
    current: Batch,
    next_sequence: u64,
}

impl BatchBuilder {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            current: Batch::new(1),
            next_sequence: 2,
        }
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Add an item; returns the batch that must be flushed first, if any.
    pub fn offer(&mut self, item: WorkItem) -> Option<Batch> {
        let size = item.encoded_len();
        let flushed = if !self.current.is_empty()
            && (self.current.byte_total + size > self.limits.byte_budget
                || self.current.len() >= self.limits.max_count)
        {
            Some(self.rotate())
        } else {
            None
        };
        if size > self.limits.byte_budget {
            tracing::debug!(
                key = %item.key,
                bytes = size,
                budget = self.limits.byte_budget,
                "item exceeds byte budget, submitting alone"
            );
        }
        self.current.push(item);
        flushed
    }

    /// Hand back the remaining non-empty batch, if any.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.rotate())
        }
    }

    /// Items held in the batch under construction.
    pub fn pending_len(&self) -> usize {
        self.current.len()
    }

    fn rotate(&mut self) -> Batch {
        let fresh = Batch::new(self.next_sequence);
        self.next_sequence += 1;
        std::mem::replace(&mut self.current, fresh)
    }
}

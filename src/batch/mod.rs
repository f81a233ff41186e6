//! 请求批处理模块：按字节预算与条数上限将工作项分组，并负责拼接与拆分。
//!
//! # Batching Module
//!
//! Batching amortizes the per-call overhead of a slow remote transform by
//! packing many short texts into one request.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchBuilder`] | Groups items in scan order under a byte budget and a count limit |
//! | [`BatchLimits`] | The two limits, with builder-style setters |
//! | [`Batch`] | Items submitted together, with their sequence number and byte total |
//! | [`BatchCodec`] | Joins texts with a delimiter and splits the reply back into parts |
//!
//! ## Example
//!
//! ```rust
//! use transpool::batch::{BatchBuilder, BatchLimits};
//! use transpool::types::WorkItem;
//!
//! let limits = BatchLimits::new().with_byte_budget(12).with_max_count(20);
//! let mut builder = BatchBuilder::new(limits);
//!
//! assert!(builder.offer(WorkItem::new("a", "Hello")).is_none());
//! assert!(builder.offer(WorkItem::new("b", "World")).is_none());
//! // "Again" would push the batch to 15 bytes, so the first two are flushed.
//! let full = builder.offer(WorkItem::new("c", "Again")).unwrap();
//! assert_eq!(full.len(), 2);
//! assert_eq!(builder.finish().unwrap().len(), 1);
//! ```

mod builder;
mod codec;

pub use builder::{Batch, BatchBuilder, BatchLimits};
pub use codec::{BatchCodec, DEFAULT_DELIMITER};

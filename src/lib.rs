//! # transpool
//!
//! 面向慢速、不可靠外部文本变换（如远程翻译调用）的批处理运行时：固定容量槽位池、阻塞式背压与多轮重试。
//!
//! Batched, bounded-concurrency text transformation runtime with slot recycling
//! and multi-attempt retries.
//!
//! ## Overview
//!
//! A large ordered collection of key/text items is pushed through a
//! [`TextTransform`] in size-bounded batches. At most `pool_capacity` calls are
//! in flight; when every slot is busy, submission waits for one to finish and
//! reuses it. Items that come back missing, empty or unchanged are picked up
//! again by the next attempt.
//!
//! ## Key Features
//!
//! - **Slot pool**: fixed set of reusable [`pool::TaskSlot`]s with explicit reservation
//! - **Backpressure**: [`scheduler::Scheduler::submit`] blocks while the pool is saturated
//! - **Batching**: [`batch::BatchBuilder`] respects a byte budget and a count limit
//! - **Retries**: [`RetryOrchestrator`] repeats passes until done or out of attempts
//! - **Partial results**: a short reply saves the aligned prefix and requeues the rest
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use transpool::{EchoTransform, RetryOrchestrator, RunConfig, WorkItem};
//!
//! #[tokio::main]
//! async fn main() -> transpool::Result<()> {
//!     let orchestrator = RetryOrchestrator::builder()
//!         .with_config(RunConfig::default().with_locales("en", "de"))
//!         .with_transform(Arc::new(EchoTransform::new()))
//!         .build()?;
//!
//!     let items = WorkItem::from_pairs([("greeting", "Hello"), ("farewell", "Goodbye")]);
//!     let mut store: HashMap<String, String> = HashMap::new();
//!     let summary = orchestrator.run(&items, &mut store, None).await?;
//!     println!("{} translated, {} pending", summary.translated, summary.pending);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Work items and slot results |
//! | [`batch`] | Batch construction and the join/split codec |
//! | [`pool`] | Task slots and the fixed-capacity slot pool |
//! | [`scheduler`] | Dispatch, backpressure and result harvesting |
//! | [`orchestrator`] | Multi-attempt scan/submit/retry driver |
//! | [`transform`] | Transform trait, echo and Google web transforms, post-processing |
//! | [`store`] | Output store traits, the JSON string table and translations files |
//! | [`progress`] | Progress observers |
//! | [`config`] | Run configuration |

pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod scheduler;
pub mod store;
pub mod transform;
pub mod types;

// Re-export main types for convenience
pub use config::{EmptySourcePolicy, RunConfig};
pub use orchestrator::{OrchestratorBuilder, RetryOrchestrator, RunSummary};
pub use progress::ProgressObserver;
pub use store::{JsonStringTable, OutputStore, ReadStore, StringMap, TranslationsFile};
pub use transform::{CaseMatch, EchoTransform, GoogleWebTransform, PostProcessor, TextTransform};
pub use types::{SlotResult, WorkItem};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

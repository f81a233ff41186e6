//! 类型模块：工作项与槽位结果的核心数据类型。
//!
//! # Types Module
//!
//! Core data types shared by the pool, the scheduler and the orchestrator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WorkItem`] | One key/source-text pair scanned from the source collection |
//! | [`SlotResult`] | Tagged outcome of a slot operation (`Pending`, `Success`, `Failure`) |

pub mod item;
pub mod result;

pub use item::WorkItem;
pub use result::SlotResult;

//! Tagged outcome of one slot operation.

/// Result held by a task slot.
///
/// `Success` carries the split output parts. Their count may differ from the
/// number of submitted items; saving reconciles the aligned prefix only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotResult {
    #[default]
    Pending,
    Success(Vec<String>),
    Failure,
}

impl SlotResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, SlotResult::Pending)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SlotResult::Failure)
    }
}

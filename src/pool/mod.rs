//! 槽位池模块：固定容量的可复用执行槽位，负责预留、回收与查询。
//!
//! # Slot Pool Module
//!
//! A [`SlotPool`] owns at most `capacity` [`TaskSlot`]s for its whole
//! lifetime. Slots are created lazily, in index order, the first time the
//! scheduler needs one; after that they are recycled. A slot index never
//! changes once assigned.
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | [`SlotPool::get_or_create`] | Existing slot, or the next one while below capacity |
//! | [`SlotPool::free_slot`] | Reserves and returns the first free slot, without waiting |
//! | [`SlotPool::reserved_indices`] | Slots whose operation the scheduler still has to harvest |

mod slot;

pub use slot::{CallContext, SlotState, TaskSlot};

use crate::{Error, ErrorContext, Result};

#[derive(Debug)]
pub struct SlotPool {
    capacity: usize,
    slots: Vec<TaskSlot>,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::configuration_with_context(
                "slot pool needs at least one slot",
                ErrorContext::new()
                    .with_field_path("pool_capacity")
                    .with_source("slot_pool"),
            ));
        }
        Ok(Self {
            capacity,
            slots: Vec::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots created so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Return slot `index`, creating it if it is the next one to exist.
    pub fn get_or_create(&mut self, index: usize) -> Result<&mut TaskSlot> {
        if index >= self.capacity {
            return Err(Error::PoolExhaustion {
                index,
                capacity: self.capacity,
            });
        }
        let created = self.slots.len();
        if index == created {
            self.slots.push(TaskSlot::new(index));
        } else if index > created {
            return Err(Error::InvalidSlotAccess { index, created });
        }
        Ok(&mut self.slots[index])
    }

    pub fn slot(&self, index: usize) -> Result<&TaskSlot> {
        let created = self.slots.len();
        self.slots
            .get(index)
            .ok_or(Error::InvalidSlotAccess { index, created })
    }

    pub fn slot_mut(&mut self, index: usize) -> Result<&mut TaskSlot> {
        let created = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(Error::InvalidSlotAccess { index, created })
    }

    /// Reserve the first free slot, if any. Never waits.
    pub fn free_slot(&mut self) -> Option<&mut TaskSlot> {
        self.slots.iter_mut().find_map(|s| s.try_reserve().then_some(s))
    }

    pub fn reserved_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|s| s.is_reserved())
            .map(TaskSlot::index)
            .collect()
    }

    /// Abort every in-flight operation. Results of those operations are lost.
    pub(crate) fn abort_all(&mut self) {
        for slot in &mut self.slots {
            slot.abort();
        }
    }
}

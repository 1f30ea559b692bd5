//! Pipeline stage buffers.
//!
//! A stage buffer is a fixed-capacity FIFO of instruction records carrying a
//! readiness countdown per entry. It provides:
//! 1. **Admission:** `push_back` applies the stage latency, `push_back_ready` skips it;
//!    both hand the record back when the buffer is full.
//! 2. **Readiness:** Only the front entry is inspected; entries leave in order.
//! 3. **Aging:** `operate` advances every waiting entry by one cycle.
//!
//! Per-cycle bandwidth is enforced by the stage that drains the buffer, not here.

use std::collections::VecDeque;

use crate::core::pipeline::instr::InstrRecord;

#[derive(Clone, Debug)]
struct BufferSlot {
    instr: InstrRecord,
    remaining: u64,
}

/// Fixed-capacity ordered queue of in-flight instruction records.
#[derive(Clone, Debug)]
pub struct StageBuffer {
    slots: VecDeque<BufferSlot>,
    capacity: usize,
    latency: u64,
}

impl StageBuffer {
    /// Creates an empty buffer with the given capacity and stage latency.
    pub fn new(capacity: usize, latency: u64) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
            latency,
        }
    }

    /// Returns the configured capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if the buffer is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    /// Returns the number of free entries.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.slots.len())
    }

    /// Appends a record that becomes ready after the stage latency.
    ///
    /// # Errors
    ///
    /// Returns the record unchanged when the buffer is full.
    pub fn push_back(&mut self, instr: InstrRecord) -> Result<(), InstrRecord> {
        self.push_with_delay(instr, self.latency)
    }

    /// Appends a record that is ready immediately.
    ///
    /// # Errors
    ///
    /// Returns the record unchanged when the buffer is full.
    pub fn push_back_ready(&mut self, instr: InstrRecord) -> Result<(), InstrRecord> {
        self.push_with_delay(instr, 0)
    }

    fn push_with_delay(&mut self, instr: InstrRecord, remaining: u64) -> Result<(), InstrRecord> {
        if self.is_full() {
            return Err(instr);
        }
        self.slots.push_back(BufferSlot { instr, remaining });
        Ok(())
    }

    /// Returns true if the front entry has finished its latency.
    #[inline]
    pub fn has_ready(&self) -> bool {
        self.slots.front().is_some_and(|s| s.remaining == 0)
    }

    /// Returns the oldest entry.
    pub fn front(&self) -> Option<&InstrRecord> {
        self.slots.front().map(|s| &s.instr)
    }

    /// Removes and returns the oldest entry regardless of readiness.
    pub fn pop_front(&mut self) -> Option<InstrRecord> {
        self.slots.pop_front().map(|s| s.instr)
    }

    /// Advances every waiting entry by one cycle.
    pub fn operate(&mut self) {
        for slot in &mut self.slots {
            slot.remaining = slot.remaining.saturating_sub(1);
        }
    }

    /// Returns the entry at position `pos` (0 is the oldest).
    pub fn get(&self, pos: usize) -> Option<&InstrRecord> {
        self.slots.get(pos).map(|s| &s.instr)
    }

    /// Returns the entry at position `pos` mutably.
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut InstrRecord> {
        self.slots.get_mut(pos).map(|s| &mut s.instr)
    }

    /// Finds an entry by instruction id.
    pub fn find_mut(&mut self, instr_id: u64) -> Option<&mut InstrRecord> {
        self.slots
            .iter_mut()
            .map(|s| &mut s.instr)
            .find(|i| i.instr_id == instr_id)
    }

    /// Iterates entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &InstrRecord> + '_ {
        self.slots.iter().map(|s| &s.instr)
    }

    /// Iterates entries oldest first, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InstrRecord> + '_ {
        self.slots.iter_mut().map(|s| &mut s.instr)
    }
}

//! Reorder Buffer (ROB) for in-order retirement.
//!
//! The ROB is a circular buffer of slots holding every dispatched but not yet
//! retired instruction. It provides:
//! 1. **Allocation:** Appends at the tail and returns a generation-checked handle.
//! 2. **Stable References:** Dependency lists and LSQ entries hold [`RobHandle`]s;
//!    a handle stops resolving the moment its slot retires.
//! 3. **Program-order Walks:** Oldest-first positional access for the scheduler
//!    and backward searches for register and memory producers.
//! 4. **In-order Retirement:** Releases from the head only.

use crate::core::pipeline::instr::InstrRecord;

/// Generation-checked reference to a ROB slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RobHandle {
    index: u32,
    generation: u32,
}

impl RobHandle {
    /// Slot index inside the ROB.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Clone, Debug, Default)]
struct RobSlot {
    generation: u32,
    entry: Option<InstrRecord>,
}

/// Reorder Buffer: circular arena with in-order release.
#[derive(Clone, Debug)]
pub struct ReorderBuffer {
    /// Fixed-size slot array.
    slots: Vec<RobSlot>,
    /// Index of the oldest entry.
    head: usize,
    /// Number of valid entries.
    count: usize,
}

impl ReorderBuffer {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, RobSlot::default);
        Self {
            slots,
            head: 0,
            count: 0,
        }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Appends an instruction at the tail.
    ///
    /// # Errors
    ///
    /// Returns the instruction unchanged when the ROB is full.
    pub fn push_back(&mut self, instr: InstrRecord) -> Result<RobHandle, InstrRecord> {
        if self.is_full() {
            return Err(instr);
        }
        let index = (self.head + self.count) % self.slots.len();
        let slot = &mut self.slots[index];
        slot.entry = Some(instr);
        self.count += 1;
        Ok(RobHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Returns the handle of the entry at program-order position `pos` (0 is the oldest).
    pub fn handle_at(&self, pos: usize) -> Option<RobHandle> {
        if pos >= self.count {
            return None;
        }
        let index = (self.head + pos) % self.slots.len();
        Some(RobHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Returns the handle of the oldest entry.
    #[inline]
    pub fn front_handle(&self) -> Option<RobHandle> {
        self.handle_at(0)
    }

    /// Returns the oldest entry.
    pub fn front(&self) -> Option<&InstrRecord> {
        self.front_handle().and_then(|h| self.get(h))
    }

    /// Resolves a handle; `None` once the slot has retired.
    pub fn get(&self, handle: RobHandle) -> Option<&InstrRecord> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Resolves a handle mutably; `None` once the slot has retired.
    pub fn get_mut(&mut self, handle: RobHandle) -> Option<&mut InstrRecord> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Resolves a handle that the pipeline guarantees is live.
    ///
    /// # Panics
    ///
    /// Panics if the handle outlived its instruction, which means a dependency
    /// or LSQ reference survived retirement.
    pub fn entry(&self, handle: RobHandle) -> &InstrRecord {
        match self.get(handle) {
            Some(entry) => entry,
            None => panic!("stale ROB handle {handle:?} dereferenced"),
        }
    }

    /// Mutable form of [`ReorderBuffer::entry`].
    ///
    /// # Panics
    ///
    /// Panics if the handle outlived its instruction.
    pub fn entry_mut(&mut self, handle: RobHandle) -> &mut InstrRecord {
        match self.get_mut(handle) {
            Some(entry) => entry,
            None => panic!("stale ROB handle {handle:?} dereferenced"),
        }
    }

    /// Program-order position of a live handle.
    pub fn position(&self, handle: RobHandle) -> Option<usize> {
        self.get(handle)?;
        let len = self.slots.len();
        Some((handle.index() + len - self.head) % len)
    }

    /// Walks backward from just before `handle` toward the oldest entry and
    /// returns the first entry matching `pred`.
    pub fn find_older(
        &self,
        handle: RobHandle,
        mut pred: impl FnMut(&InstrRecord) -> bool,
    ) -> Option<RobHandle> {
        let pos = self.position(handle)?;
        (0..pos)
            .rev()
            .filter_map(|p| self.handle_at(p))
            .find(|&h| self.get(h).is_some_and(&mut pred))
    }

    /// Iterates live entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (RobHandle, &InstrRecord)> + '_ {
        (0..self.count).filter_map(move |p| {
            let h = self.handle_at(p)?;
            self.get(h).map(|e| (h, e))
        })
    }

    /// Removes the oldest entry and invalidates every handle to it.
    pub fn pop_front(&mut self) -> Option<InstrRecord> {
        if self.count == 0 {
            return None;
        }
        let slot = &mut self.slots[self.head];
        let entry = slot.entry.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        entry
    }

    /// Returns true if any live entry still lists `handle` as a register or
    /// memory dependent.
    pub fn is_referenced(&self, handle: RobHandle) -> bool {
        self.iter().any(|(_, e)| {
            e.registers_instrs_depend_on_me.contains(&handle)
                || e.memory_instrs_depend_on_me.contains(&handle)
        })
    }
}

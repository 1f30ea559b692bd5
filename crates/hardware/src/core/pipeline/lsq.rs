//! Load Queue and Store Queue.
//!
//! Both queues are unordered arenas of entries addressed by generation-checked
//! [`LsqHandle`]s. Each entry tracks one memory operand of one instruction:
//! 1. **Addresses:** Virtual address from the trace, physical address after translation.
//! 2. **Progress:** Address translation and data delivery flags.
//! 3. **Back-reference:** The owning ROB entry, used to settle its memory-op count.
//! 4. **RAW Producer:** For loads, the id of the older store writing the same address.
//!
//! An entry is released (and every handle to it invalidated) once its data has
//! been delivered: load entries on data return or forwarding, store entries when
//! the write is accepted at retirement.

use crate::core::pipeline::instr::Progress;
use crate::core::pipeline::rob::RobHandle;

/// Generation-checked reference to a load or store queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LsqHandle {
    index: u32,
    generation: u32,
}

impl LsqHandle {
    /// Slot index inside its queue.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

/// One memory operand in flight.
#[derive(Clone, Debug)]
pub struct LsqEntry {
    /// Owning instruction id.
    pub instr_id: u64,
    /// Owning instruction program counter.
    pub ip: u64,
    /// Owning ROB entry.
    pub rob_index: RobHandle,
    /// Operand virtual address.
    pub virtual_address: u64,
    /// Operand physical address once translated.
    pub physical_address: u64,
    /// Older store this load reads from, if any.
    pub producer_id: Option<u64>,
    /// Cycle the next action on this entry may happen.
    pub event_cycle: u64,
    /// Address translation progress.
    pub translated: Progress,
    /// Data delivery progress.
    pub fetched: Progress,
}

impl LsqEntry {
    /// Creates an untranslated entry for one operand of `rob_index`.
    pub const fn new(
        instr_id: u64,
        ip: u64,
        rob_index: RobHandle,
        virtual_address: u64,
        event_cycle: u64,
    ) -> Self {
        Self {
            instr_id,
            ip,
            rob_index,
            virtual_address,
            physical_address: 0,
            producer_id: None,
            event_cycle,
            translated: Progress::NotStarted,
            fetched: Progress::NotStarted,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct LsqSlot {
    generation: u32,
    entry: Option<LsqEntry>,
}

/// Fixed-capacity arena used for both the load queue and the store queue.
#[derive(Clone, Debug)]
pub struct LoadStoreQueue {
    slots: Vec<LsqSlot>,
    occupied: usize,
}

impl LoadStoreQueue {
    /// Creates an empty queue.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, LsqSlot::default);
        Self { slots, occupied: 0 }
    }

    /// Returns the configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.occupied
    }

    /// Returns true if no entry is occupied.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Returns true if every entry is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.occupied == self.slots.len()
    }

    /// Places `entry` in the first free slot.
    ///
    /// # Errors
    ///
    /// Returns the entry unchanged when the queue is full.
    pub fn allocate(&mut self, entry: LsqEntry) -> Result<LsqHandle, LsqEntry> {
        let Some(index) = self.slots.iter().position(|s| s.entry.is_none()) else {
            return Err(entry);
        };
        let slot = &mut self.slots[index];
        slot.entry = Some(entry);
        self.occupied += 1;
        Ok(LsqHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Resolves a handle; `None` once the entry has been released.
    pub fn get(&self, handle: LsqHandle) -> Option<&LsqEntry> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Resolves a handle mutably; `None` once the entry has been released.
    pub fn get_mut(&mut self, handle: LsqHandle) -> Option<&mut LsqEntry> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Resolves a handle the pipeline guarantees is live.
    ///
    /// # Panics
    ///
    /// Panics if the entry was already released.
    pub fn entry(&self, handle: LsqHandle) -> &LsqEntry {
        match self.get(handle) {
            Some(entry) => entry,
            None => panic!("stale LSQ handle {handle:?} dereferenced"),
        }
    }

    /// Mutable form of [`LoadStoreQueue::entry`].
    ///
    /// # Panics
    ///
    /// Panics if the entry was already released.
    pub fn entry_mut(&mut self, handle: LsqHandle) -> &mut LsqEntry {
        match self.get_mut(handle) {
            Some(entry) => entry,
            None => panic!("stale LSQ handle {handle:?} dereferenced"),
        }
    }

    /// Frees an entry and invalidates every handle to it.
    pub fn release(&mut self, handle: LsqHandle) -> Option<LsqEntry> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.occupied -= 1;
        Some(entry)
    }

    /// Returns the first live entry matching `pred`.
    pub fn find(&self, mut pred: impl FnMut(&LsqEntry) -> bool) -> Option<LsqHandle> {
        self.iter().find(|(_, e)| pred(e)).map(|(h, _)| h)
    }

    /// Iterates live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (LsqHandle, &LsqEntry)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|e| {
                (
                    LsqHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    e,
                )
            })
        })
    }
}

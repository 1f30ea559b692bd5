//! Memory subsystem trait.
//!
//! This module defines the contract between a core and the cache/TLB hierarchy
//! behind it. The core only ever:
//! 1. **Submits:** Reads (translations, instruction fetches, loads), commit writes and
//!    best-effort prefetches. Any submission may be rejected; the core retries on a
//!    later tick and never treats a rejection as an error.
//! 2. **Drains:** Completed reads, which the subsystem delivers onto the core's
//!    [`ReturnBus`] from `operate`, carrying back every waiter of the request.

use crate::soc::request::{MemoryRequest, ReturnBus, Submit};

/// Cache/TLB hierarchy as seen by one core.
pub trait MemorySubsystem: std::fmt::Debug {
    /// Offers a read. On acceptance a completion is delivered later.
    fn submit_read(&mut self, request: MemoryRequest) -> Submit;

    /// Offers a write. Completion is not reported back.
    fn submit_write(&mut self, request: MemoryRequest) -> Submit;

    /// Offers a best-effort prefetch. Dropping it has no effect on correctness.
    fn submit_prefetch(&mut self, request: MemoryRequest) -> Submit;

    /// Advances the subsystem to `cycle`, delivering every read completed by then.
    fn operate(&mut self, cycle: u64, returns: &mut ReturnBus);
}

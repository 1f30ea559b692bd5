//! Memory request/response channel.
//!
//! This module defines what travels between a core and its memory subsystem:
//! 1. **Ports:** The four entry points a core uses: instruction TLB, L1 instruction
//!    cache, data TLB and L1 data cache. Each has its own completion queue.
//! 2. **Requests:** Address, requester, access type, originating instruction and the
//!    list of waiters (fetch-buffer instructions or LSQ entries) to service on
//!    completion.
//! 3. **Return Bus:** Per-port time-ordered queues of processed requests that the
//!    core drains in arrival order, a bounded number per tick.
//!
//! Prefetch completions are never queued.

use std::collections::VecDeque;

use crate::common::AccessType;
use crate::core::pipeline::lsq::LsqHandle;

/// Core-side memory port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Port {
    /// Instruction address translation.
    Itlb,
    /// Instruction bytes.
    L1i,
    /// Data address translation.
    Dtlb,
    /// Data bytes.
    L1d,
}

impl Port {
    /// Number of ports.
    pub const COUNT: usize = 4;

    /// All ports in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::Itlb, Self::L1i, Self::Dtlb, Self::L1d];

    /// Returns the index of this port.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Something waiting on a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waiter {
    /// A fetch-buffer instruction, by id.
    Instr(u64),
    /// A load queue entry.
    Load(LsqHandle),
    /// A store queue entry.
    Store(LsqHandle),
}

/// One request in flight between the core and the memory subsystem.
#[derive(Clone, Debug)]
pub struct MemoryRequest {
    /// Requesting core.
    pub cpu: usize,
    /// Port the completion returns on.
    pub port: Port,
    /// Kind of access.
    pub access: AccessType,
    /// Address presented to the port: a virtual page number for TLB ports, a
    /// physical byte address otherwise.
    pub address: u64,
    /// Virtual byte address that caused the request.
    pub v_address: u64,
    /// Originating instruction.
    pub instr_id: u64,
    /// Originating instruction program counter.
    pub ip: u64,
    /// Earliest cycle the request may be serviced; the completion cycle once processed.
    pub event_cycle: u64,
    /// References serviced when the request completes.
    pub waiters: VecDeque<Waiter>,
}

impl MemoryRequest {
    /// Creates a request with no waiters.
    pub const fn new(cpu: usize, port: Port, access: AccessType, address: u64) -> Self {
        Self {
            cpu,
            port,
            access,
            address,
            v_address: 0,
            instr_id: 0,
            ip: 0,
            event_cycle: 0,
            waiters: VecDeque::new(),
        }
    }

    /// Records the originating instruction.
    #[must_use]
    pub const fn with_origin(mut self, instr_id: u64, ip: u64) -> Self {
        self.instr_id = instr_id;
        self.ip = ip;
        self
    }

    /// Records the virtual address behind the request.
    #[must_use]
    pub const fn with_virtual(mut self, v_address: u64) -> Self {
        self.v_address = v_address;
        self
    }

    /// Sets the earliest service cycle.
    #[must_use]
    pub const fn at(mut self, event_cycle: u64) -> Self {
        self.event_cycle = event_cycle;
        self
    }

    /// Appends a waiter.
    #[must_use]
    pub fn waiting(mut self, waiter: Waiter) -> Self {
        self.waiters.push_back(waiter);
        self
    }
}

/// Outcome of submitting a request.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submit {
    /// Queued; a completion follows for reads.
    Accepted,
    /// Refused; retry on a later tick.
    Rejected,
}

impl Submit {
    /// Returns true if the request was accepted.
    #[inline]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Per-port queues of processed requests awaiting the core.
#[derive(Clone, Debug, Default)]
pub struct ReturnBus {
    processed: [VecDeque<MemoryRequest>; Port::COUNT],
}

impl ReturnBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a completed request on its port. Prefetches are dropped.
    pub fn deliver(&mut self, request: MemoryRequest) {
        if request.access != AccessType::Prefetch {
            self.processed[request.port.index()].push_back(request);
        }
    }

    /// Oldest processed request of `port`.
    pub fn front_mut(&mut self, port: Port) -> Option<&mut MemoryRequest> {
        self.processed[port.index()].front_mut()
    }

    /// Removes the oldest processed request of `port`.
    pub fn pop_front(&mut self, port: Port) -> Option<MemoryRequest> {
        self.processed[port.index()].pop_front()
    }

    /// Processed requests waiting on `port`.
    pub fn len(&self, port: Port) -> usize {
        self.processed[port.index()].len()
    }

    /// Returns true if no port has a pending completion.
    pub fn is_empty(&self) -> bool {
        self.processed.iter().all(VecDeque::is_empty)
    }
}

//! Fixed-latency memory subsystem.
//!
//! A stand-in for the cache/TLB hierarchy that services every request after a
//! constant, per-port number of cycles. It provides:
//! 1. **Latency:** Translation ports, instruction fetch, data reads and commit writes
//!    each take their configured latency, counted from the later of the current
//!    cycle and the request's own event cycle.
//! 2. **Backpressure:** Bounded read queues per port and one write queue; a full
//!    queue rejects the request.
//! 3. **Prefetch Sink:** Code prefetches occupy the instruction read queue until
//!    serviced and are then discarded.

use tracing::trace;

use crate::common::AccessType;
use crate::config::MemoryConfig;
use crate::soc::request::{MemoryRequest, Port, ReturnBus, Submit};
use crate::soc::traits::MemorySubsystem;

/// Request counters of a [`FixedLatencyMemory`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Reads accepted per port.
    pub reads: [u64; Port::COUNT],
    /// Writes accepted.
    pub writes: u64,
    /// Prefetches accepted.
    pub prefetches: u64,
    /// Submissions rejected for a full queue.
    pub rejections: u64,
    /// Read completions delivered to the core.
    pub completions: u64,
}

#[derive(Clone, Debug)]
struct Pending {
    ready: u64,
    seq: u64,
    request: MemoryRequest,
}

/// Constant-latency memory with bounded queues.
#[derive(Clone, Debug)]
pub struct FixedLatencyMemory {
    config: MemoryConfig,
    reads: [Vec<Pending>; Port::COUNT],
    writes: Vec<Pending>,
    cycle: u64,
    seq: u64,
    accepting: bool,
    /// Request counters.
    pub stats: MemoryStats,
}

impl FixedLatencyMemory {
    /// Creates an idle memory.
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            config: config.clone(),
            reads: Default::default(),
            writes: Vec::new(),
            cycle: 0,
            seq: 0,
            accepting: true,
            stats: MemoryStats::default(),
        }
    }

    /// Accepts (`true`) or rejects (`false`) every subsequent submission.
    pub const fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    /// Reads still in flight on `port`.
    pub fn pending_reads(&self, port: Port) -> usize {
        self.reads[port.index()].len()
    }

    /// Writes still in flight.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    const fn read_latency(&self, port: Port) -> u64 {
        match port {
            Port::Itlb | Port::Dtlb => self.config.translation_latency,
            Port::L1i => self.config.fetch_latency,
            Port::L1d => self.config.data_latency,
        }
    }

    fn enqueue(&mut self, request: MemoryRequest, latency: u64) -> Pending {
        let ready = self.cycle.max(request.event_cycle) + latency;
        self.seq += 1;
        Pending {
            ready,
            seq: self.seq,
            request,
        }
    }

    fn reject(&mut self, request: &MemoryRequest) -> Submit {
        self.stats.rejections += 1;
        trace!(port = ?request.port, instr_id = request.instr_id, "memory request rejected");
        Submit::Rejected
    }
}

impl MemorySubsystem for FixedLatencyMemory {
    fn submit_read(&mut self, request: MemoryRequest) -> Submit {
        let port = request.port;
        if !self.accepting || self.reads[port.index()].len() >= self.config.read_queue_size {
            return self.reject(&request);
        }
        let latency = self.read_latency(port);
        let pending = self.enqueue(request, latency);
        self.reads[port.index()].push(pending);
        self.stats.reads[port.index()] += 1;
        Submit::Accepted
    }

    fn submit_write(&mut self, request: MemoryRequest) -> Submit {
        if !self.accepting || self.writes.len() >= self.config.write_queue_size {
            return self.reject(&request);
        }
        let pending = self.enqueue(request, self.config.write_latency);
        self.writes.push(pending);
        self.stats.writes += 1;
        Submit::Accepted
    }

    fn submit_prefetch(&mut self, mut request: MemoryRequest) -> Submit {
        let port = request.port;
        if !self.accepting || self.reads[port.index()].len() >= self.config.read_queue_size {
            return self.reject(&request);
        }
        request.access = AccessType::Prefetch;
        let latency = self.read_latency(port);
        let pending = self.enqueue(request, latency);
        self.reads[port.index()].push(pending);
        self.stats.prefetches += 1;
        Submit::Accepted
    }

    fn operate(&mut self, cycle: u64, returns: &mut ReturnBus) {
        for queue in &mut self.reads {
            let mut done: Vec<Pending> = Vec::new();
            let mut i = 0;
            while i < queue.len() {
                if queue[i].ready <= cycle {
                    done.push(queue.remove(i));
                } else {
                    i += 1;
                }
            }
            done.sort_by_key(|p| (p.ready, p.seq));
            for mut pending in done {
                pending.request.event_cycle = pending.ready;
                if pending.request.access != AccessType::Prefetch {
                    self.stats.completions += 1;
                }
                returns.deliver(pending.request);
            }
        }
        self.writes.retain(|p| p.ready > cycle);
        self.cycle = cycle + 1;
    }
}

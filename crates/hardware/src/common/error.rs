//! Simulator error definitions.
//!
//! This module defines the fatal, reportable failures of a simulation. It provides:
//! 1. **Configuration Errors:** Invalid parameters, physical memory exhaustion and
//!    accesses outside a flat segment map.
//! 2. **Input Errors:** Malformed configuration JSON and trace I/O failures.
//! 3. **Progress Errors:** Deadlock detection in the simulation driver.
//!
//! Backpressure (full queues, rejected requests) is never an error: the stage
//! that hits it simply retries on the next cycle. Broken internal invariants are
//! assertions, not variants of this enum.

use thiserror::Error;

use crate::core::units::mmu::segment::SegmentLayout;

/// Fatal simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// The random page pool has no physical page left for a new mapping.
    #[error("physical memory exhausted while mapping vaddr {vaddr:#x} for cpu {cpu}")]
    PhysicalMemoryExhausted {
        /// Core requesting the mapping.
        cpu: usize,
        /// Virtual address that faulted.
        vaddr: u64,
    },

    /// A flat-segment translation fell outside every configured region.
    #[error("address {vaddr:#x} is outside all segments\n{layout}")]
    UnmappedSegmentAddress {
        /// Virtual address that missed every segment.
        vaddr: u64,
        /// Active region layout.
        layout: SegmentLayout,
    },

    /// The configured segment sizes do not fit in physical memory.
    #[error("segment layout needs more than {capacity:#x} bytes of physical memory\n{layout}")]
    SegmentLayoutOverflow {
        /// Configured physical memory capacity.
        capacity: u64,
        /// Layout that overflowed.
        layout: SegmentLayout,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration JSON could not be parsed.
    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// The instruction trace could not be read.
    #[error("trace read error: {0}")]
    Trace(#[from] std::io::Error),

    /// No instruction retired within the deadlock threshold.
    #[error("deadlock at cycle {cycle}: ROB head {instr_id:?} made no progress")]
    Deadlock {
        /// Cycle the deadlock was detected.
        cycle: u64,
        /// Id of the oldest in-flight instruction, if any.
        instr_id: Option<u64>,
    },
}

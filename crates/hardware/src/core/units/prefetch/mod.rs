//! Code prefetcher seam.
//!
//! The core calls a [`CodePrefetcher`] every time the branch oracle is used and
//! once per cycle. Returned virtual addresses are translated without a lookup and
//! submitted to the memory subsystem as best-effort prefetches.

/// Next-line code prefetcher (prefetches lines after predicted targets).
pub mod next_line;

pub use self::next_line::NextLinePrefetcher;

use std::fmt::Debug;

use crate::core::pipeline::instr::BranchType;

/// Trait for instruction-side prefetchers.
pub trait CodePrefetcher: Debug {
    /// Observes one use of the branch oracle and returns code addresses to prefetch.
    fn branch_operate(&mut self, ip: u64, branch_type: BranchType, predicted_target: u64)
    -> Vec<u64>;

    /// Called once per cycle; returns code addresses to prefetch.
    fn cycle_operate(&mut self) -> Vec<u64>;
}

/// Prefetcher that never prefetches.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrefetcher;

impl CodePrefetcher for NoPrefetcher {
    fn branch_operate(&mut self, _ip: u64, _branch_type: BranchType, _predicted_target: u64) -> Vec<u64> {
        Vec::new()
    }

    fn cycle_operate(&mut self) -> Vec<u64> {
        Vec::new()
    }
}

//! Next-Line Code Prefetcher.
//!
//! A simple spatial prefetcher: whenever a branch is predicted taken toward a
//! known target, fetch the target's cache line and the `degree - 1` lines after
//! it. Instruction streams are sequential between taken branches, so these lines
//! are likely to be fetched next.

use super::CodePrefetcher;
use crate::common::constants::BLOCK_SIZE;
use crate::core::pipeline::instr::BranchType;

/// Next-Line code prefetcher state.
#[derive(Clone, Debug)]
pub struct NextLinePrefetcher {
    /// Number of lines to prefetch starting at the target line.
    degree: usize,
}

impl NextLinePrefetcher {
    /// Creates a new next-line prefetcher. A degree of 0 is treated as 1.
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
        }
    }
}

impl CodePrefetcher for NextLinePrefetcher {
    fn branch_operate(&mut self, _ip: u64, _branch_type: BranchType, predicted_target: u64) -> Vec<u64> {
        if predicted_target == 0 {
            return Vec::new();
        }
        let line = predicted_target & !(BLOCK_SIZE - 1);
        (0..self.degree as u64).map(|k| line + k * BLOCK_SIZE).collect()
    }

    fn cycle_operate(&mut self) -> Vec<u64> {
        Vec::new()
    }
}

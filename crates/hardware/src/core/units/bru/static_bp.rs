//! Static Branch Oracle.
//!
//! Implements an "always not taken" policy for conditional branches. Every other
//! branch class is predicted taken toward whatever target the BTB remembers, so
//! after one execution an unconditional branch with a fixed target is predicted
//! exactly.

use super::{BranchOracle, btb::Btb};
use crate::core::pipeline::instr::BranchType;

/// Default BTB size of the static oracle.
const DEFAULT_BTB_ENTRIES: usize = 1024;

/// Static branch oracle backed by a BTB.
#[derive(Clone, Debug)]
pub struct StaticOracle {
    /// Branch Target Buffer for branch targets.
    btb: Btb,
}

impl StaticOracle {
    /// Creates a static oracle with a BTB of `btb_entries` entries.
    pub fn new(btb_entries: usize) -> Self {
        Self {
            btb: Btb::new(btb_entries),
        }
    }
}

impl Default for StaticOracle {
    fn default() -> Self {
        Self::new(DEFAULT_BTB_ENTRIES)
    }
}

impl BranchOracle for StaticOracle {
    fn predict_target(&mut self, ip: u64, branch_type: BranchType) -> (u64, bool) {
        match self.btb.lookup(ip) {
            Some((target, always_taken)) => {
                (target, always_taken && branch_type != BranchType::Conditional)
            }
            None => (0, false),
        }
    }

    fn predict_taken(
        &mut self,
        _ip: u64,
        _predicted_target: u64,
        _always_taken: bool,
        branch_type: BranchType,
    ) -> bool {
        !matches!(branch_type, BranchType::Conditional | BranchType::NotBranch)
    }

    fn on_resolve(&mut self, ip: u64, target: u64, taken: bool, _branch_type: BranchType) {
        self.btb.update(ip, target, taken);
    }
}

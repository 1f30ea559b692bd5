use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use o3sim_core::core::pipeline::instr::BranchType;
use o3sim_core::core::units::prefetch::CodePrefetcher;

/// Code prefetcher that asks for every predicted target and replays a script
/// of per-cycle prefetch addresses.
#[derive(Clone, Debug, Default)]
pub struct RecordingPrefetcher {
    script: VecDeque<Vec<u64>>,
    /// `(ip, type, predicted target)` of every branch seen.
    pub branches: Rc<RefCell<Vec<(u64, BranchType, u64)>>>,
}

impl RecordingPrefetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the addresses returned by the next `cycle_operate` call.
    pub fn then_cycle(mut self, addrs: Vec<u64>) -> Self {
        self.script.push_back(addrs);
        self
    }
}

impl CodePrefetcher for RecordingPrefetcher {
    fn branch_operate(&mut self, ip: u64, branch_type: BranchType, predicted_target: u64) -> Vec<u64> {
        self.branches.borrow_mut().push((ip, branch_type, predicted_target));
        if predicted_target == 0 {
            Vec::new()
        } else {
            vec![predicted_target]
        }
    }

    fn cycle_operate(&mut self) -> Vec<u64> {
        self.script.pop_front().unwrap_or_default()
    }
}

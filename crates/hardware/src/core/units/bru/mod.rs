//! Branch resolution unit (BRU) seam.
//!
//! The core does not implement prediction algorithms. It consults a
//! [`BranchOracle`] once per fetched branch and reports the actual outcome back
//! through the same object. This module provides:
//! 1. **Oracle Contract:** Target lookup, direction prediction and update hook.
//! 2. **Branch Target Buffer:** Target storage with an always-taken bit.
//! 3. **Static Oracle:** BTB targets, unconditional branches taken, conditional
//!    branches predicted not taken.

pub use self::static_bp::StaticOracle;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Static branch oracle (conditional branches predicted not taken).
pub mod static_bp;

use std::fmt::Debug;

use crate::core::pipeline::instr::BranchType;

/// Prediction oracle consulted by fetch for every branch-classified instruction.
pub trait BranchOracle: Debug {
    /// Returns the predicted target and whether the branch is always taken.
    ///
    /// A target of 0 means "no target known".
    fn predict_target(&mut self, ip: u64, branch_type: BranchType) -> (u64, bool);

    /// Predicts the direction of a branch given the target lookup result.
    fn predict_taken(
        &mut self,
        ip: u64,
        predicted_target: u64,
        always_taken: bool,
        branch_type: BranchType,
    ) -> bool;

    /// Reports the actual outcome of a branch.
    fn on_resolve(&mut self, ip: u64, target: u64, taken: bool, branch_type: BranchType);
}

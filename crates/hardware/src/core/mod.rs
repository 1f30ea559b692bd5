//! Out-of-order core model.
//!
//! This module contains everything that belongs to one simulated core: the
//! `Core` container and its per-cycle loop, the pipeline structures and
//! stages, and the units the stages consult (branch oracle, DIB, address
//! translation, code prefetcher).

/// Core container and per-cycle orchestration.
pub mod cpu;

/// Instruction pipeline (stage buffers, ROB, LSQ, STA ring, stages).
pub mod pipeline;

/// Functional units (branch oracle, DIB, MMU, code prefetcher).
pub mod units;

pub use self::cpu::{Core, CoreState};

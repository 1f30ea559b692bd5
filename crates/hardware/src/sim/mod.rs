//! Simulation driver and instruction sources.
//!
//! Provides the instruction stream the core consumes and the driver that ticks
//! a core against a memory subsystem.

/// Simulator driver: warmup transition, deadlock detection, run loop.
pub mod simulator;

/// Instruction source trait, in-memory source and binary trace reader.
pub mod trace;

pub use simulator::Simulator;
pub use trace::{InstructionSource, TraceReader, VecSource};

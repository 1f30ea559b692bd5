//! Cycle-level out-of-order core simulator library.
//!
//! This crate models a single out-of-order core fed by an instruction trace:
//! 1. **Core:** Fetch with branch prediction and a decoded-instruction buffer, decode,
//!    dispatch, register and memory scheduling, execution and in-order retirement.
//! 2. **Memory Ordering:** Load and store queues with store-to-load forwarding and an
//!    in-order store-address ring.
//! 3. **Translation:** A per-core random page map with emulated page-table walks, or a
//!    flat segment map.
//! 4. **SoC:** The request/response channel to the memory subsystem and a
//!    fixed-latency reference implementation.
//! 5. **Simulation:** Instruction sources, configuration, the driver and statistics.

/// Common types and constants (addresses, access types, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Out-of-order core (pipeline structures, stages, units).
pub mod core;
/// Instruction sources and the simulation driver.
pub mod sim;
/// Memory request channel and subsystems.
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// One simulated core; advance it with `Core::tick`.
pub use crate::core::Core;
/// Top-level driver owning a core, its source and its memory.
pub use crate::sim::Simulator;

//! Memory-side components.
//!
//! This module organizes everything a core talks to below its own pipeline:
//! the request/response channel, the memory subsystem contract and a reference
//! fixed-latency implementation of that contract.

/// Reference constant-latency memory subsystem.
pub mod fixed_latency;

/// Request descriptors, ports and the completion bus.
pub mod request;

/// Memory subsystem trait definition.
pub mod traits;

pub use fixed_latency::FixedLatencyMemory;
pub use request::{MemoryRequest, Port, ReturnBus, Submit, Waiter};
pub use traits::MemorySubsystem;

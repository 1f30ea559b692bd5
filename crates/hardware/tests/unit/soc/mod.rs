//! Memory channel tests.

/// Fixed-latency memory timing and backpressure.
pub mod fixed_latency;

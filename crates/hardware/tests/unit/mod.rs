//! # Unit Components
//!
//! This module organizes the tests of every simulator component, mirroring the
//! source tree: configuration, statistics, the core (pipeline and units), the
//! simulation driver and the memory channel.

/// Configuration defaults, JSON parsing and validation.
pub mod config;


/// Instruction sources and the simulation driver.
pub mod sim;

/// Memory request channel and the reference memory.
pub mod soc;

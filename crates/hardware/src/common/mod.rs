//! Common utilities and types used throughout the core simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses, plus bit splicing.
//! 2. **Constants:** Page/block geometry, operand slot counts and classifier register ids.
//! 3. **Memory Access:** Definitions for categorizing memory requests.
//! 4. **Error Handling:** The fatal simulation error type.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{PhysAddr, VirtAddr, splice_bits};
pub use constants::{LOG2_BLOCK_SIZE, LOG2_PAGE_SIZE, PAGE_SIZE};
pub use data::AccessType;
pub use error::SimError;

//! Memory Access Types.
//!
//! This module defines the classification of memory requests the core sends
//! to the memory subsystem. These types are used for the following:
//! 1. **Request Tagging:** Every request descriptor carries the access that caused it.
//! 2. **Subsystem Policy:** Implementations may treat prefetches and writes differently.
//! 3. **Statistics Tracking:** Categorizing memory operations for performance analysis.

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Instruction fetch or instruction translation.
    Fetch,

    /// Data load, or the translation of a load address.
    Read,

    /// Data store (read-for-ownership at commit), or the translation of a store address.
    Write,

    /// Best-effort code prefetch; never completed back to the core.
    Prefetch,
}

//! Functional units consulted by the pipeline stages.
//!
//! This module contains the pieces of a core that are not pipeline storage:
//! branch prediction, the decoded-instruction buffer, address translation and
//! the code prefetcher hooks.

/// Branch oracle interface, BTB and the static reference oracle.
pub mod bru;

/// Decoded-instruction buffer.
pub mod dib;

/// Virtual-to-physical address translation.
pub mod mmu;

/// Code prefetcher hooks.
pub mod prefetch;

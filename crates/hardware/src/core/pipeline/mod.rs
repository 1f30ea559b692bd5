//! Instruction pipeline implementation.
//!
//! This module contains the storage an instruction passes through between fetch
//! and retirement, and the stages that move it. It includes the following:
//! 1. **Records:** The trace instruction and its in-flight record with progress flags.
//! 2. **Buffers:** Latency-aware fetch, decode and dispatch buffers.
//! 3. **ROB:** The generation-checked reorder buffer arena.
//! 4. **LSQ:** Load and store queue arenas and the store-address ring.
//! 5. **Stages:** Fetch through retire, one free function per stage.

/// Latency-aware stage buffers.
pub mod buffer;

/// Trace instruction and in-flight instruction record.
pub mod instr;

/// Load and store queues.
pub mod lsq;

/// Reorder buffer.
pub mod rob;

/// Store-address disambiguation ring.
pub mod sta;

/// Pipeline stage implementations.
pub mod stages;

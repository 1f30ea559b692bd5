//! Global Simulator Constants.
//!
//! This module defines constants shared by every part of the core model. It includes:
//! 1. **Memory Constants:** Page and cache-block geometry used for grouping and splicing.
//! 2. **Trace Constants:** Operand slot counts of an instruction record.
//! 3. **Register Constants:** Architectural register ids the classifier inspects.
//! 4. **Translation Constants:** Reserved physical space and page-table entry width.

/// log2 of the page size.
pub const LOG2_PAGE_SIZE: u32 = 12;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 1 << LOG2_PAGE_SIZE;

/// log2 of the cache block size.
pub const LOG2_BLOCK_SIZE: u32 = 6;

/// Cache block size in bytes (64B).
pub const BLOCK_SIZE: u64 = 1 << LOG2_BLOCK_SIZE;

/// Number of source register and source memory slots per instruction.
pub const NUM_INSTR_SOURCES: usize = 4;

/// Number of destination register and destination memory slots per instruction.
pub const NUM_INSTR_DESTINATIONS: usize = 2;

/// Register id of the stack pointer.
pub const REG_STACK_POINTER: u8 = 6;

/// Register id of the flags register.
pub const REG_FLAGS: u8 = 25;

/// Register id of the instruction pointer.
pub const REG_INSTRUCTION_POINTER: u8 = 26;

/// Physical memory kept out of the random page pool (1 MiB).
pub const VMEM_RESERVE_CAPACITY: u64 = 1 << 20;

/// Size of one page-table entry in bytes.
pub const PTE_BYTES: u64 = 8;

/// Size of one encoded trace record in bytes.
pub const TRACE_RECORD_BYTES: usize = 64;

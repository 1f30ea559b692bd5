//! Configuration system for the out-of-order core simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline core geometry (buffers, widths, latencies), DIB shape and
//!    translator sizing.
//! 2. **Structures:** Hierarchical config for general, core, DIB, virtual memory and the
//!    reference memory subsystem.
//! 3. **Enums:** Translation mode selection.
//! 4. **Validation:** Sizing checks performed once before a core is built.
//!
//! Configuration is read once at construction and is immutable afterwards. Use
//! `Config::default()` or `Config::from_json`.

use serde::Deserialize;

use crate::common::constants::{PAGE_SIZE, VMEM_RESERVE_CAPACITY};
use crate::common::error::SimError;

/// Default configuration constants for the simulator.
///
/// These values describe a wide out-of-order core of the kind commonly used as
/// a research baseline.
mod defaults {
    /// Fetch buffer capacity (instructions).
    pub const IFETCH_BUFFER_SIZE: usize = 64;

    /// Decode buffer capacity (instructions).
    pub const DECODE_BUFFER_SIZE: usize = 32;

    /// Dispatch buffer capacity (instructions).
    pub const DISPATCH_BUFFER_SIZE: usize = 32;

    /// Reorder buffer capacity.
    pub const ROB_SIZE: usize = 352;

    /// Load queue capacity.
    pub const LQ_SIZE: usize = 128;

    /// Store queue capacity.
    pub const SQ_SIZE: usize = 72;

    /// Instructions read from the source per cycle.
    pub const FETCH_WIDTH: usize = 6;

    /// Instructions decoded per cycle.
    pub const DECODE_WIDTH: usize = 6;

    /// Instructions dispatched into the ROB per cycle.
    pub const DISPATCH_WIDTH: usize = 6;

    /// Number of not-yet-executed ROB entries the scheduler inspects per cycle.
    pub const SCHEDULER_SIZE: usize = 128;

    /// Instructions issued to execution (and completed) per cycle.
    pub const EXEC_WIDTH: usize = 4;

    /// Load queue issue bandwidth per cycle.
    pub const LQ_WIDTH: usize = 2;

    /// Store queue issue bandwidth per cycle.
    pub const SQ_WIDTH: usize = 2;

    /// Instructions retired per cycle.
    pub const RETIRE_WIDTH: usize = 5;

    /// Cycles lost after a branch misprediction is resolved.
    pub const BRANCH_MISPREDICT_PENALTY: u64 = 1;

    /// Decode buffer latency in cycles.
    pub const DECODE_LATENCY: u64 = 1;

    /// Dispatch buffer latency in cycles.
    pub const DISPATCH_LATENCY: u64 = 1;

    /// Scheduling latency in cycles.
    pub const SCHEDULING_LATENCY: u64 = 0;

    /// Execution latency in cycles.
    pub const EXEC_LATENCY: u64 = 0;

    /// Completions drained per return port per cycle.
    pub const MAX_READ: usize = 2;

    /// DIB set count.
    pub const DIB_SETS: usize = 32;

    /// DIB associativity.
    pub const DIB_WAYS: usize = 8;

    /// log2 of the DIB window (16 bytes).
    pub const DIB_WINDOW_BITS: u32 = 4;

    /// Physical memory capacity handed to the translator (2 GiB).
    pub const VMEM_CAPACITY: u64 = 2 << 30;

    /// Page-table page size in bytes.
    pub const PTE_PAGE_SIZE: u64 = 4096;

    /// Emulated page-table levels.
    pub const PT_LEVELS: u32 = 5;

    /// Seed for the physical page shuffle.
    pub const VMEM_SEED: u64 = 0x5eed;

    /// Code segment size (16 MiB).
    pub const CODE_SIZE: u64 = 16 << 20;

    /// Heap segment size (256 MiB).
    pub const HEAP_SIZE: u64 = 256 << 20;

    /// Mmap segment size (256 MiB).
    pub const MMAP_SIZE: u64 = 256 << 20;

    /// Stack segment size (8 MiB).
    pub const STACK_SIZE: u64 = 8 << 20;

    /// Reference memory: translation latency.
    pub const TRANSLATION_LATENCY: u64 = 1;

    /// Reference memory: instruction fetch latency.
    pub const FETCH_LATENCY: u64 = 4;

    /// Reference memory: data access latency.
    pub const DATA_LATENCY: u64 = 5;

    /// Reference memory: write drain latency.
    pub const WRITE_LATENCY: u64 = 5;

    /// Reference memory: outstanding reads per port.
    pub const READ_QUEUE_SIZE: usize = 16;

    /// Reference memory: outstanding writes.
    pub const WRITE_QUEUE_SIZE: usize = 16;

    /// Cycles without a retirement before the driver reports a deadlock.
    pub const DEADLOCK_CYCLES: u64 = 1_000_000;
}

/// Virtual-to-physical translation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TranslationMode {
    /// Randomized page allocation; translations are looked up through the TLB ports.
    #[default]
    Paged,
    /// Flat four-segment direct map; translations are immediate.
    Segment,
}

/// Root configuration structure.
///
/// # Example
///
/// ```
/// use o3sim_core::config::{Config, TranslationMode};
///
/// let json = r#"{
///     "core": { "rob_size": 64, "fetch_width": 4 },
///     "vmem": { "mode": "Segment", "capacity": 1073741824 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.core.rob_size, 64);
/// assert_eq!(config.core.fetch_width, 4);
/// assert_eq!(config.core.decode_width, 6);
/// assert_eq!(config.vmem.mode, TranslationMode::Segment);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General simulation settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Core buffers, widths and latencies
    #[serde(default)]
    pub core: CoreConfig,
    /// Decoded-instruction buffer geometry
    #[serde(default)]
    pub dib: DibConfig,
    /// Address translator configuration
    #[serde(default)]
    pub vmem: VmemConfig,
    /// Reference memory subsystem timing
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses a configuration from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] for malformed JSON and
    /// [`SimError::InvalidConfig`] when a value fails [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks sizing constraints that would otherwise surface as stalls or panics mid-run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        let c = &self.core;
        let nonzero = [
            ("core.ifetch_buffer_size", c.ifetch_buffer_size),
            ("core.decode_buffer_size", c.decode_buffer_size),
            ("core.dispatch_buffer_size", c.dispatch_buffer_size),
            ("core.rob_size", c.rob_size),
            ("core.lq_size", c.lq_size),
            ("core.sq_size", c.sq_size),
            ("core.fetch_width", c.fetch_width),
            ("core.decode_width", c.decode_width),
            ("core.dispatch_width", c.dispatch_width),
            ("core.scheduler_size", c.scheduler_size),
            ("core.exec_width", c.exec_width),
            ("core.lq_width", c.lq_width),
            ("core.sq_width", c.sq_width),
            ("core.retire_width", c.retire_width),
            ("core.max_read", c.max_read),
            ("dib.sets", self.dib.sets),
            ("dib.ways", self.dib.ways),
            ("memory.read_queue_size", self.memory.read_queue_size),
            ("memory.write_queue_size", self.memory.write_queue_size),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(SimError::InvalidConfig(format!("{name} must be non-zero")));
        }
        if self.dib.window_bits >= 64 {
            return Err(SimError::InvalidConfig("dib.window_bits must be below 64".into()));
        }

        let v = &self.vmem;
        if v.capacity % PAGE_SIZE != 0 {
            return Err(SimError::InvalidConfig(format!(
                "vmem.capacity {:#x} is not a multiple of the page size",
                v.capacity
            )));
        }
        if !v.pte_page_size.is_power_of_two() || v.pte_page_size <= 1024 {
            return Err(SimError::InvalidConfig(format!(
                "vmem.pte_page_size {} must be a power of two above 1024",
                v.pte_page_size
            )));
        }
        if v.levels == 0 {
            return Err(SimError::InvalidConfig("vmem.levels must be non-zero".into()));
        }
        if v.mode == TranslationMode::Paged && v.capacity <= VMEM_RESERVE_CAPACITY + PAGE_SIZE {
            return Err(SimError::InvalidConfig(format!(
                "vmem.capacity {:#x} leaves no pages after the {:#x} byte reserve",
                v.capacity, VMEM_RESERVE_CAPACITY
            )));
        }
        Ok(())
    }
}

/// General simulation settings and options.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Instructions retired before statistics start and timing becomes exact
    #[serde(default)]
    pub warmup_instructions: u64,

    /// Cycles without a retirement before the driver reports a deadlock
    #[serde(default = "GeneralConfig::default_deadlock_cycles")]
    pub deadlock_cycles: u64,

    /// Record every retired instruction id in the core's commit log
    #[serde(default)]
    pub commit_log: bool,
}

impl GeneralConfig {
    /// Returns the default deadlock threshold.
    fn default_deadlock_cycles() -> u64 {
        defaults::DEADLOCK_CYCLES
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            warmup_instructions: 0,
            deadlock_cycles: defaults::DEADLOCK_CYCLES,
            commit_log: false,
        }
    }
}

/// Out-of-order core geometry.
///
/// Capacities bound the structures; widths bound per-cycle stage bandwidth;
/// latencies are applied only after warmup.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Fetch buffer capacity
    #[serde(default = "CoreConfig::default_ifetch_buffer_size")]
    pub ifetch_buffer_size: usize,
    /// Decode buffer capacity
    #[serde(default = "CoreConfig::default_decode_buffer_size")]
    pub decode_buffer_size: usize,
    /// Dispatch buffer capacity
    #[serde(default = "CoreConfig::default_dispatch_buffer_size")]
    pub dispatch_buffer_size: usize,
    /// Reorder buffer capacity
    #[serde(default = "CoreConfig::default_rob_size")]
    pub rob_size: usize,
    /// Load queue capacity
    #[serde(default = "CoreConfig::default_lq_size")]
    pub lq_size: usize,
    /// Store queue capacity
    #[serde(default = "CoreConfig::default_sq_size")]
    pub sq_size: usize,
    /// Fetch width
    #[serde(default = "CoreConfig::default_fetch_width")]
    pub fetch_width: usize,
    /// Decode width
    #[serde(default = "CoreConfig::default_decode_width")]
    pub decode_width: usize,
    /// Dispatch width
    #[serde(default = "CoreConfig::default_dispatch_width")]
    pub dispatch_width: usize,
    /// Scheduler search window (not-yet-executed entries per cycle)
    #[serde(default = "CoreConfig::default_scheduler_size")]
    pub scheduler_size: usize,
    /// Execute and completion width
    #[serde(default = "CoreConfig::default_exec_width")]
    pub exec_width: usize,
    /// Load issue width (address generation and execute, each)
    #[serde(default = "CoreConfig::default_lq_width")]
    pub lq_width: usize,
    /// Store issue width (address generation and execute, each)
    #[serde(default = "CoreConfig::default_sq_width")]
    pub sq_width: usize,
    /// Retire width
    #[serde(default = "CoreConfig::default_retire_width")]
    pub retire_width: usize,
    /// Misprediction penalty in cycles
    #[serde(default = "CoreConfig::default_branch_mispredict_penalty")]
    pub branch_mispredict_penalty: u64,
    /// Decode buffer latency
    #[serde(default = "CoreConfig::default_decode_latency")]
    pub decode_latency: u64,
    /// Dispatch buffer latency
    #[serde(default = "CoreConfig::default_dispatch_latency")]
    pub dispatch_latency: u64,
    /// Scheduling latency
    #[serde(default = "CoreConfig::default_scheduling_latency")]
    pub scheduling_latency: u64,
    /// Execution latency
    #[serde(default = "CoreConfig::default_exec_latency")]
    pub exec_latency: u64,
    /// Completions drained per return port per cycle
    #[serde(default = "CoreConfig::default_max_read")]
    pub max_read: usize,
}

impl CoreConfig {
    fn default_ifetch_buffer_size() -> usize {
        defaults::IFETCH_BUFFER_SIZE
    }

    fn default_decode_buffer_size() -> usize {
        defaults::DECODE_BUFFER_SIZE
    }

    fn default_dispatch_buffer_size() -> usize {
        defaults::DISPATCH_BUFFER_SIZE
    }

    fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }

    fn default_lq_size() -> usize {
        defaults::LQ_SIZE
    }

    fn default_sq_size() -> usize {
        defaults::SQ_SIZE
    }

    fn default_fetch_width() -> usize {
        defaults::FETCH_WIDTH
    }

    fn default_decode_width() -> usize {
        defaults::DECODE_WIDTH
    }

    fn default_dispatch_width() -> usize {
        defaults::DISPATCH_WIDTH
    }

    fn default_scheduler_size() -> usize {
        defaults::SCHEDULER_SIZE
    }

    fn default_exec_width() -> usize {
        defaults::EXEC_WIDTH
    }

    fn default_lq_width() -> usize {
        defaults::LQ_WIDTH
    }

    fn default_sq_width() -> usize {
        defaults::SQ_WIDTH
    }

    fn default_retire_width() -> usize {
        defaults::RETIRE_WIDTH
    }

    fn default_branch_mispredict_penalty() -> u64 {
        defaults::BRANCH_MISPREDICT_PENALTY
    }

    fn default_decode_latency() -> u64 {
        defaults::DECODE_LATENCY
    }

    fn default_dispatch_latency() -> u64 {
        defaults::DISPATCH_LATENCY
    }

    fn default_scheduling_latency() -> u64 {
        defaults::SCHEDULING_LATENCY
    }

    fn default_exec_latency() -> u64 {
        defaults::EXEC_LATENCY
    }

    fn default_max_read() -> usize {
        defaults::MAX_READ
    }

    /// Capacity of the store-address ring: every store slot that can be in flight
    /// between fetch and retirement.
    pub const fn sta_size(&self) -> usize {
        (self.rob_size + self.ifetch_buffer_size + self.decode_buffer_size + self.dispatch_buffer_size)
            * crate::common::constants::NUM_INSTR_DESTINATIONS
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ifetch_buffer_size: defaults::IFETCH_BUFFER_SIZE,
            decode_buffer_size: defaults::DECODE_BUFFER_SIZE,
            dispatch_buffer_size: defaults::DISPATCH_BUFFER_SIZE,
            rob_size: defaults::ROB_SIZE,
            lq_size: defaults::LQ_SIZE,
            sq_size: defaults::SQ_SIZE,
            fetch_width: defaults::FETCH_WIDTH,
            decode_width: defaults::DECODE_WIDTH,
            dispatch_width: defaults::DISPATCH_WIDTH,
            scheduler_size: defaults::SCHEDULER_SIZE,
            exec_width: defaults::EXEC_WIDTH,
            lq_width: defaults::LQ_WIDTH,
            sq_width: defaults::SQ_WIDTH,
            retire_width: defaults::RETIRE_WIDTH,
            branch_mispredict_penalty: defaults::BRANCH_MISPREDICT_PENALTY,
            decode_latency: defaults::DECODE_LATENCY,
            dispatch_latency: defaults::DISPATCH_LATENCY,
            scheduling_latency: defaults::SCHEDULING_LATENCY,
            exec_latency: defaults::EXEC_LATENCY,
            max_read: defaults::MAX_READ,
        }
    }
}

/// Decoded-instruction buffer geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct DibConfig {
    /// Number of sets
    #[serde(default = "DibConfig::default_sets")]
    pub sets: usize,
    /// Ways per set
    #[serde(default = "DibConfig::default_ways")]
    pub ways: usize,
    /// log2 of the window each way covers
    #[serde(default = "DibConfig::default_window_bits")]
    pub window_bits: u32,
}

impl DibConfig {
    fn default_sets() -> usize {
        defaults::DIB_SETS
    }

    fn default_ways() -> usize {
        defaults::DIB_WAYS
    }

    fn default_window_bits() -> u32 {
        defaults::DIB_WINDOW_BITS
    }
}

impl Default for DibConfig {
    fn default() -> Self {
        Self {
            sets: defaults::DIB_SETS,
            ways: defaults::DIB_WAYS,
            window_bits: defaults::DIB_WINDOW_BITS,
        }
    }
}

/// Address translator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VmemConfig {
    /// Translation policy
    #[serde(default)]
    pub mode: TranslationMode,
    /// Physical memory capacity in bytes
    #[serde(default = "VmemConfig::default_capacity")]
    pub capacity: u64,
    /// Page-table page size in bytes
    #[serde(default = "VmemConfig::default_pte_page_size")]
    pub pte_page_size: u64,
    /// Emulated page-table levels
    #[serde(default = "VmemConfig::default_levels")]
    pub levels: u32,
    /// Seed for the physical page shuffle
    #[serde(default = "VmemConfig::default_seed")]
    pub seed: u64,
    /// Region sizes for segment mode
    #[serde(default)]
    pub segments: SegmentSizes,
}

impl VmemConfig {
    fn default_capacity() -> u64 {
        defaults::VMEM_CAPACITY
    }

    fn default_pte_page_size() -> u64 {
        defaults::PTE_PAGE_SIZE
    }

    fn default_levels() -> u32 {
        defaults::PT_LEVELS
    }

    fn default_seed() -> u64 {
        defaults::VMEM_SEED
    }
}

impl Default for VmemConfig {
    fn default() -> Self {
        Self {
            mode: TranslationMode::default(),
            capacity: defaults::VMEM_CAPACITY,
            pte_page_size: defaults::PTE_PAGE_SIZE,
            levels: defaults::PT_LEVELS,
            seed: defaults::VMEM_SEED,
            segments: SegmentSizes::default(),
        }
    }
}

/// Sizes of the four flat-segment regions in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SegmentSizes {
    /// Code region, mapped from virtual address 0
    #[serde(default = "SegmentSizes::default_code")]
    pub code: u64,
    /// Heap region
    #[serde(default = "SegmentSizes::default_heap")]
    pub heap: u64,
    /// Mmap region, growing down from the mmap ceiling
    #[serde(default = "SegmentSizes::default_mmap")]
    pub mmap: u64,
    /// Stack region, growing down from the stack ceiling
    #[serde(default = "SegmentSizes::default_stack")]
    pub stack: u64,
}

impl SegmentSizes {
    fn default_code() -> u64 {
        defaults::CODE_SIZE
    }

    fn default_heap() -> u64 {
        defaults::HEAP_SIZE
    }

    fn default_mmap() -> u64 {
        defaults::MMAP_SIZE
    }

    fn default_stack() -> u64 {
        defaults::STACK_SIZE
    }
}

impl Default for SegmentSizes {
    fn default() -> Self {
        Self {
            code: defaults::CODE_SIZE,
            heap: defaults::HEAP_SIZE,
            mmap: defaults::MMAP_SIZE,
            stack: defaults::STACK_SIZE,
        }
    }
}

/// Timing of the reference fixed-latency memory subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Instruction and data translation latency
    #[serde(default = "MemoryConfig::default_translation_latency")]
    pub translation_latency: u64,
    /// Instruction fetch latency
    #[serde(default = "MemoryConfig::default_fetch_latency")]
    pub fetch_latency: u64,
    /// Data read latency
    #[serde(default = "MemoryConfig::default_data_latency")]
    pub data_latency: u64,
    /// Write drain latency
    #[serde(default = "MemoryConfig::default_write_latency")]
    pub write_latency: u64,
    /// Outstanding reads per port before requests are rejected
    #[serde(default = "MemoryConfig::default_read_queue_size")]
    pub read_queue_size: usize,
    /// Outstanding writes before requests are rejected
    #[serde(default = "MemoryConfig::default_write_queue_size")]
    pub write_queue_size: usize,
}

impl MemoryConfig {
    fn default_translation_latency() -> u64 {
        defaults::TRANSLATION_LATENCY
    }

    fn default_fetch_latency() -> u64 {
        defaults::FETCH_LATENCY
    }

    fn default_data_latency() -> u64 {
        defaults::DATA_LATENCY
    }

    fn default_write_latency() -> u64 {
        defaults::WRITE_LATENCY
    }

    fn default_read_queue_size() -> usize {
        defaults::READ_QUEUE_SIZE
    }

    fn default_write_queue_size() -> usize {
        defaults::WRITE_QUEUE_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            translation_latency: defaults::TRANSLATION_LATENCY,
            fetch_latency: defaults::FETCH_LATENCY,
            data_latency: defaults::DATA_LATENCY,
            write_latency: defaults::WRITE_LATENCY,
            read_queue_size: defaults::READ_QUEUE_SIZE,
            write_queue_size: defaults::WRITE_QUEUE_SIZE,
        }
    }
}

//! Core Definition and Initialization.
//!
//! This module defines the central `Core` structure, the container for the whole
//! state of one simulated out-of-order core. It coordinates the following:
//! 1. **Per-core State:** Current cycle, warmup flag and the fetch stall/resume pair,
//!    bundled in [`CoreState`] and consulted by every stage.
//! 2. **Pipeline Structures:** Fetch, decode and dispatch buffers, the ROB, the load and
//!    store queues, the store-address ring and the four LSQ issue queues.
//! 3. **Collaborators:** The translation policy, the branch oracle and the code
//!    prefetcher, all fixed at construction.
//! 4. **Bookkeeping:** In-flight execution counters, statistics and the commit log.

/// Per-cycle orchestration of the pipeline stages.
pub mod execution;

use std::collections::VecDeque;

use crate::common::error::SimError;
use crate::config::{Config, CoreConfig};
use crate::core::pipeline::buffer::StageBuffer;
use crate::core::pipeline::lsq::{LoadStoreQueue, LsqHandle};
use crate::core::pipeline::rob::{ReorderBuffer, RobHandle};
use crate::core::pipeline::sta::StoreAddressRing;
use crate::core::units::bru::{BranchOracle, StaticOracle};
use crate::core::units::dib::Dib;
use crate::core::units::mmu::Translator;
use crate::core::units::prefetch::{CodePrefetcher, NoPrefetcher};
use crate::soc::request::ReturnBus;
use crate::stats::CoreStats;

/// Mutable per-core state every stage reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreState {
    /// Current cycle.
    pub cycle: u64,
    /// Whether warmup has finished.
    pub warmup_complete: bool,
    /// Fetch is suppressed behind a mispredicted branch.
    pub fetch_stall: bool,
    /// Cycle at which a stalled fetch resumes, once known.
    pub fetch_resume_cycle: Option<u64>,
}

impl CoreState {
    /// Event cycle after adding `latency` to an activity that may start at
    /// `event_cycle` but not before the current cycle.
    ///
    /// During warmup every latency collapses to zero.
    #[inline]
    pub const fn apply_latency(&self, event_cycle: u64, latency: u64) -> u64 {
        let start = if event_cycle < self.cycle {
            self.cycle
        } else {
            event_cycle
        };
        if self.warmup_complete {
            start + latency
        } else {
            start
        }
    }
}

/// One simulated out-of-order core.
#[derive(Debug)]
pub struct Core {
    /// Core id, used to key translations.
    pub cpu: usize,
    /// Cycle, warmup and fetch-stall state.
    pub state: CoreState,
    /// Buffer sizes, widths and latencies.
    pub params: CoreConfig,

    /// Instructions read from the source awaiting translation and fetch.
    pub ifetch_buffer: StageBuffer,
    /// Fetched instructions awaiting decode.
    pub decode_buffer: StageBuffer,
    /// Decoded instructions awaiting a ROB slot.
    pub dispatch_buffer: StageBuffer,
    /// Reorder buffer.
    pub rob: ReorderBuffer,
    /// Load queue.
    pub lq: LoadStoreQueue,
    /// Store queue.
    pub sq: LoadStoreQueue,
    /// Store-address disambiguation ring.
    pub sta: StoreAddressRing,
    /// Decoded-instruction buffer.
    pub dib: Dib,

    /// Non-memory instructions whose operands are ready.
    pub ready_to_execute: VecDeque<RobHandle>,
    /// Stores awaiting address translation.
    pub rts0: VecDeque<LsqHandle>,
    /// Stores with a translated address awaiting execution.
    pub rts1: VecDeque<LsqHandle>,
    /// Loads awaiting address translation.
    pub rtl0: VecDeque<LsqHandle>,
    /// Loads with a translated address awaiting the data cache.
    pub rtl1: VecDeque<LsqHandle>,
    /// Completions delivered by the memory subsystem.
    pub returns: ReturnBus,

    /// Address translation policy.
    pub translator: Translator,
    /// Branch prediction oracle.
    pub oracle: Box<dyn BranchOracle>,
    /// Code prefetcher hooks.
    pub prefetcher: Box<dyn CodePrefetcher>,

    /// Performance counters.
    pub stats: CoreStats,
    /// Non-memory instructions executing.
    pub inflight_reg_executions: u64,
    /// Memory instructions whose operands have all been satisfied.
    pub inflight_mem_executions: u64,
    /// Instructions executed but not yet retired.
    pub completed_executions: u64,
    /// Id given to the next instruction read.
    pub next_instr_id: u64,
    /// Instructions retired since construction, warmup included.
    pub num_retired: u64,
    /// Set once the instruction source reports its end.
    pub source_exhausted: bool,
    /// Id of the most recently retired instruction.
    pub last_retired_id: Option<u64>,
    /// Retired instruction ids, when enabled.
    pub commit_log: Option<Vec<u64>>,
}

impl Core {
    /// Creates a core with the static branch oracle and no code prefetcher.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for an invalid configuration and the
    /// translator's construction error (e.g. a segment layout that does not fit).
    pub fn new(cpu: usize, config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        let c = &config.core;
        Ok(Self {
            cpu,
            state: CoreState {
                warmup_complete: config.general.warmup_instructions == 0,
                ..CoreState::default()
            },
            params: c.clone(),
            ifetch_buffer: StageBuffer::new(c.ifetch_buffer_size, 0),
            decode_buffer: StageBuffer::new(c.decode_buffer_size, c.decode_latency),
            dispatch_buffer: StageBuffer::new(c.dispatch_buffer_size, c.dispatch_latency),
            rob: ReorderBuffer::new(c.rob_size),
            lq: LoadStoreQueue::new(c.lq_size),
            sq: LoadStoreQueue::new(c.sq_size),
            sta: StoreAddressRing::new(c.sta_size()),
            dib: Dib::new(config.dib.sets, config.dib.ways, config.dib.window_bits),
            ready_to_execute: VecDeque::with_capacity(c.rob_size),
            rts0: VecDeque::with_capacity(c.sq_size),
            rts1: VecDeque::with_capacity(c.sq_size),
            rtl0: VecDeque::with_capacity(c.lq_size),
            rtl1: VecDeque::with_capacity(c.lq_size),
            returns: ReturnBus::new(),
            translator: Translator::from_config(&config.vmem)?,
            oracle: Box::new(StaticOracle::default()),
            prefetcher: Box::new(NoPrefetcher),
            stats: CoreStats::default(),
            inflight_reg_executions: 0,
            inflight_mem_executions: 0,
            completed_executions: 0,
            next_instr_id: 0,
            num_retired: 0,
            source_exhausted: false,
            last_retired_id: None,
            commit_log: config.general.commit_log.then(Vec::new),
        })
    }

    /// Replaces the branch oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn BranchOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replaces the code prefetcher.
    #[must_use]
    pub fn with_prefetcher(mut self, prefetcher: Box<dyn CodePrefetcher>) -> Self {
        self.prefetcher = prefetcher;
        self
    }

    /// Returns true if no instruction is left anywhere between fetch and retirement.
    pub fn is_drained(&self) -> bool {
        self.ifetch_buffer.is_empty()
            && self.decode_buffer.is_empty()
            && self.dispatch_buffer.is_empty()
            && self.rob.is_empty()
    }

    /// Ends warmup: latencies and register dependencies take effect from now on
    /// and the statistics restart.
    pub fn finish_warmup(&mut self) {
        self.state.warmup_complete = true;
        self.stats = CoreStats::default();
        tracing::info!(
            cpu = self.cpu,
            cycle = self.state.cycle,
            retired = self.num_retired,
            "warmup complete"
        );
    }
}

//! Simulator: owns one core, its instruction source and its memory subsystem.
//!
//! The core borrows the source and the memory for the duration of each tick,
//! so all three live side by side here. Per tick the driver also:
//! 1. **Ends Warmup:** Once `warmup_instructions` have retired, switches the core to
//!    exact timing and restarts its statistics.
//! 2. **Detects Deadlock:** Fails when nothing retires for `deadlock_cycles` cycles
//!    while work remains (a threshold of 0 disables the check).

use tracing::{error, info};

use crate::common::error::SimError;
use crate::config::Config;
use crate::core::Core;
use crate::sim::trace::InstructionSource;
use crate::soc::traits::MemorySubsystem;
use crate::stats::CoreStats;

/// Top-level simulator: core, instruction source and memory subsystem.
#[derive(Debug)]
pub struct Simulator<S, M> {
    /// The simulated core.
    pub core: Core,
    /// Instruction stream.
    pub source: S,
    /// Memory subsystem behind the core.
    pub memory: M,
    warmup_instructions: u64,
    deadlock_cycles: u64,
    last_progress_cycle: u64,
    last_retired: u64,
}

impl<S: InstructionSource, M: MemorySubsystem> Simulator<S, M> {
    /// Creates a simulator for core 0.
    ///
    /// # Errors
    ///
    /// Returns any error raised while building the core.
    pub fn new(config: &Config, source: S, memory: M) -> Result<Self, SimError> {
        let core = Core::new(0, config)?;
        Ok(Self::with_core(config, core, source, memory))
    }

    /// Creates a simulator around an already built core (e.g. one with a
    /// custom branch oracle or prefetcher).
    pub const fn with_core(config: &Config, core: Core, source: S, memory: M) -> Self {
        Self {
            core,
            source,
            memory,
            warmup_instructions: config.general.warmup_instructions,
            deadlock_cycles: config.general.deadlock_cycles,
            last_progress_cycle: 0,
            last_retired: 0,
        }
    }

    /// Returns true once the source is exhausted and the core holds no instruction.
    pub fn is_finished(&self) -> bool {
        self.core.source_exhausted && self.core.is_drained()
    }

    /// Advances the simulation by one clock cycle.
    ///
    /// # Errors
    ///
    /// Propagates core errors and returns [`SimError::Deadlock`] when the
    /// retirement watchdog fires.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.core.tick(&mut self.source, &mut self.memory)?;

        if !self.core.state.warmup_complete && self.core.num_retired >= self.warmup_instructions {
            self.core.finish_warmup();
        }

        let cycle = self.core.state.cycle;
        if self.core.num_retired != self.last_retired {
            self.last_retired = self.core.num_retired;
            self.last_progress_cycle = cycle;
        } else if self.deadlock_cycles > 0
            && !self.is_finished()
            && cycle - self.last_progress_cycle >= self.deadlock_cycles
        {
            let instr_id = self.core.rob.front().map(|i| i.instr_id);
            error!(cpu = self.core.cpu, cycle, ?instr_id, "no retirement progress");
            return Err(SimError::Deadlock { cycle, instr_id });
        }
        Ok(())
    }

    /// Runs until the source is exhausted and the core drained, or until
    /// `max_instructions` have retired after warmup.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by [`Simulator::tick`].
    pub fn run(&mut self, max_instructions: Option<u64>) -> Result<&CoreStats, SimError> {
        while !self.is_finished() {
            if let Some(limit) = max_instructions
                && self.core.state.warmup_complete
                && self.core.stats.instructions_retired >= limit
            {
                break;
            }
            self.tick()?;
        }
        info!(
            cpu = self.core.cpu,
            cycles = self.core.stats.cycles,
            retired = self.core.stats.instructions_retired,
            "simulation finished"
        );
        Ok(&self.core.stats)
    }
}

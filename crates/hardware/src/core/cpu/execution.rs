//! Main Execution Loop.
//!
//! This module advances one core by exactly one cycle. Stages run in a fixed
//! order so that no stage observes state produced later in the same cycle:
//! 1. **Front End:** Fetch, DIB check, translation and instruction fetch requests,
//!    promotion to decode, decode and dispatch.
//! 2. **Scheduling:** Register dependencies, then memory operand admission.
//! 3. **Execution:** Ready non-memory instructions, then the LSQ issue queues.
//! 4. **Memory:** The memory subsystem and the code prefetcher advance one cycle,
//!    then their completions are drained.
//! 5. **Back End:** Completion of executed instructions and in-order retirement.

use super::Core;
use crate::common::error::SimError;
use crate::core::pipeline::stages::fetch::prefetch_code_line;
use crate::core::pipeline::stages::{
    check_dib, complete_inflight, decode_stage, dispatch_stage, execute_stage, fetch_instruction,
    fetch_stage, handle_memory_return, operate_lsq, promote_to_decode, retire_stage,
    schedule_memory_stage, schedule_stage, translate_fetch,
};
use crate::sim::trace::InstructionSource;
use crate::soc::traits::MemorySubsystem;

impl Core {
    /// Advances the core by one cycle.
    ///
    /// # Errors
    ///
    /// Propagates instruction source failures and translation errors.
    pub fn tick(
        &mut self,
        source: &mut dyn InstructionSource,
        memory: &mut dyn MemorySubsystem,
    ) -> Result<(), SimError> {
        fetch_stage(self, source, memory)?;
        check_dib(self);
        translate_fetch(self, memory)?;
        fetch_instruction(self, memory);
        promote_to_decode(self);
        decode_stage(self);
        dispatch_stage(self);

        schedule_stage(self);
        schedule_memory_stage(self);
        execute_stage(self);
        operate_lsq(self, memory)?;

        memory.operate(self.state.cycle, &mut self.returns);
        for addr in self.prefetcher.cycle_operate() {
            prefetch_code_line(self, memory, addr)?;
        }
        handle_memory_return(self)?;

        complete_inflight(self);
        retire_stage(self, memory);

        self.state.cycle += 1;
        self.stats.cycles += 1;
        Ok(())
    }
}

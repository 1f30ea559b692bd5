//! Instruction Decode (ID) Stage.
//!
//! This module implements the decode stage. It performs the following:
//! 1. **DIB Update:** Records every decoded instruction window so later fetches of the
//!    same window can skip translation, fetch and decode.
//! 2. **Early Resolution:** Direct jumps and calls know their target here. A mispredicted
//!    one schedules the fetch resume now and clears its flag, so execution does not
//!    pay the penalty a second time.
//! 3. **Forwarding:** Moves decoded instructions to the dispatch buffer, bounded by
//!    `decode_width` and dispatch buffer space.

use tracing::{debug, trace};

use super::admit;
use crate::core::Core;
use crate::core::pipeline::instr::Progress;

/// Executes the decode stage, then ages the decode buffer by one cycle.
pub fn decode_stage(core: &mut Core) {
    let cycle = core.state.cycle;
    let mut bandwidth = core.params.decode_width;

    while bandwidth > 0 && core.decode_buffer.has_ready() && !core.dispatch_buffer.is_full() {
        let Some(mut instr) = core.decode_buffer.pop_front() else {
            break;
        };
        core.dib.update(instr.ip);

        if instr.branch_mispredicted && instr.branch_type.resolves_at_decode() {
            instr.branch_mispredicted = false;
            let resume = cycle + core.params.branch_mispredict_penalty;
            core.state.fetch_resume_cycle = Some(resume);
            debug!(
                cpu = core.cpu,
                instr_id = instr.instr_id,
                resume,
                "direct branch misprediction resolved at decode"
            );
        }

        instr.decoded = Progress::Completed;
        trace!(instr_id = instr.instr_id, cycle, "decoded");
        let ready = !core.state.warmup_complete;
        admit(&mut core.dispatch_buffer, instr, ready, "decode");
        bandwidth -= 1;
    }

    core.decode_buffer.operate();
}

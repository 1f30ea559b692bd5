//! Execute (EX) Stage.
//!
//! Issues non-memory instructions whose register operands are ready. Each
//! issued instruction occupies its ROB entry until the completion stage sees
//! its event cycle pass.

use tracing::trace;

use crate::core::Core;
use crate::core::pipeline::instr::Progress;

/// Issues up to `exec_width` instructions from the ready queue.
pub fn execute_stage(core: &mut Core) {
    let latency = core.params.exec_latency;
    let state = core.state;
    let mut issued = 0;
    while issued < core.params.exec_width {
        let Some(handle) = core.ready_to_execute.pop_front() else {
            break;
        };
        let instr = core.rob.entry_mut(handle);
        instr.executed = Progress::InFlight;
        instr.event_cycle = state.apply_latency(instr.event_cycle, latency);
        core.inflight_reg_executions += 1;
        trace!(
            instr_id = instr.instr_id,
            done_at = instr.event_cycle,
            "executing"
        );
        issued += 1;
    }
}

//! Dispatch stage: decoded instructions enter the ROB in program order,
//! up to `dispatch_width` per cycle and while the ROB has room.

use tracing::trace;

use crate::core::Core;

/// Executes the dispatch stage, then ages the dispatch buffer by one cycle.
///
/// # Panics
///
/// Panics if the ROB refuses an instruction after reporting free space.
pub fn dispatch_stage(core: &mut Core) {
    if core.dispatch_buffer.is_empty() {
        return;
    }

    let mut bandwidth = core.params.dispatch_width;
    while bandwidth > 0 && core.dispatch_buffer.has_ready() && !core.rob.is_full() {
        let Some(instr) = core.dispatch_buffer.pop_front() else {
            break;
        };
        let instr_id = instr.instr_id;
        if let Err(rejected) = core.rob.push_back(instr) {
            panic!("dispatch: ROB overflow admitting instr {}", rejected.instr_id);
        }
        trace!(instr_id, cycle = core.state.cycle, "dispatched");
        bandwidth -= 1;
    }

    core.dispatch_buffer.operate();
}

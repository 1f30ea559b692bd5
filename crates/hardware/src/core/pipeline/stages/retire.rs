//! Retire Stage.
//!
//! Releases instructions from the ROB head strictly in program order:
//! 1. **Write-back:** Each pending store operand of the head is written to the data
//!    cache first. A rejected write stops retirement for this cycle; operands already
//!    written are not written again.
//! 2. **Release:** The head leaves the ROB, every handle to it is invalidated, and
//!    the commit log and counters are updated.

use tracing::{debug, trace};

use crate::common::AccessType;
use crate::common::constants::NUM_INSTR_DESTINATIONS;
use crate::core::Core;
use crate::core::pipeline::instr::Progress;
use crate::soc::request::MemoryRequest;
use crate::soc::request::Port;
use crate::soc::traits::MemorySubsystem;

/// Retires up to `retire_width` completed instructions from the ROB head.
///
/// # Panics
///
/// Panics if a store operand reaches retirement without a store queue entry,
/// or if retirement order would go backwards.
pub fn retire_stage(core: &mut Core, memory: &mut dyn MemorySubsystem) {
    let cycle = core.state.cycle;
    let mut bandwidth = core.params.retire_width;

    while bandwidth > 0 {
        let Some(head) = core.rob.front_handle() else {
            break;
        };
        if core.rob.entry(head).executed != Progress::Completed {
            break;
        }

        for i in 0..NUM_INSTR_DESTINATIONS {
            let instr = core.rob.entry(head);
            if instr.destination_memory[i] == 0 {
                continue;
            }
            let Some(sq_handle) = instr.sq_index[i] else {
                panic!("retiring store instr {} has no store queue entry", instr.instr_id);
            };
            let store = core.sq.entry(sq_handle);
            let request = MemoryRequest::new(core.cpu, Port::L1d, AccessType::Write, store.physical_address)
                .with_origin(store.instr_id, store.ip)
                .with_virtual(store.virtual_address)
                .at(cycle);
            if !memory.submit_write(request).is_accepted() {
                core.stats.retire_write_stalls += 1;
                core.stats.rejected_requests += 1;
                debug!(cpu = core.cpu, instr_id = store.instr_id, cycle, "store write rejected at retire");
                return;
            }
            core.rob.entry_mut(head).destination_memory[i] = 0;
            let _ = core.sq.release(sq_handle);
        }

        let Some(retired) = core.rob.pop_front() else {
            break;
        };
        if let Some(last) = core.last_retired_id {
            assert!(
                retired.instr_id > last,
                "retirement out of order: {} after {last}",
                retired.instr_id
            );
        }
        core.last_retired_id = Some(retired.instr_id);
        if let Some(log) = core.commit_log.as_mut() {
            log.push(retired.instr_id);
        }
        core.completed_executions -= 1;
        core.stats.instructions_retired += 1;
        core.num_retired += 1;
        bandwidth -= 1;
        trace!(instr_id = retired.instr_id, cycle, "retired");
    }
}

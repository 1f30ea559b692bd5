//! Scheduling stages.
//!
//! Both walks start at the oldest ROB entry and stop after `scheduler_size`
//! entries that have not started executing.
//! 1. **Register Scheduling:** For every source register of an unscheduled entry, the
//!    nearest older instruction still producing that register gets this entry on its
//!    dependent list. Non-memory entries become ready once nothing is pending;
//!    memory entries wait for address scheduling.
//! 2. **Memory Scheduling:** Memory entries whose registers are ready admit their
//!    operands to the load and store queues. Stores additionally wait for their turn
//!    at the head of the store-address ring.

use tracing::{debug, trace};

use crate::common::constants::{NUM_INSTR_DESTINATIONS, NUM_INSTR_SOURCES};
use crate::core::Core;
use crate::core::pipeline::instr::Progress;
use crate::core::pipeline::rob::RobHandle;
use crate::core::pipeline::stages::memory::{add_load_queue, add_store_queue};

/// Executes the register scheduling stage.
///
/// # Panics
///
/// Panics if the ready queue would hold as many entries as the ROB.
pub fn schedule_stage(core: &mut Core) {
    let mut search_bw = core.params.scheduler_size;
    let mut pos = 0;
    while search_bw > 0 {
        let Some(handle) = core.rob.handle_at(pos) else {
            break;
        };
        if core.rob.entry(handle).scheduled == Progress::NotStarted {
            do_scheduling(core, handle);

            let instr = core.rob.entry(handle);
            if instr.scheduled == Progress::Completed && instr.num_reg_dependent == 0 {
                assert!(
                    core.ready_to_execute.len() < core.rob.len(),
                    "ready queue overflow at instr {}",
                    instr.instr_id
                );
                trace!(instr_id = instr.instr_id, "ready to execute");
                core.ready_to_execute.push_back(handle);
            }
        }
        if core.rob.entry(handle).executed == Progress::NotStarted {
            search_bw -= 1;
        }
        pos += 1;
    }
}

/// Links `handle` to the producers of its source registers and advances its
/// scheduling state.
fn do_scheduling(core: &mut Core, handle: RobHandle) {
    let sources = core.rob.entry(handle).source_registers;
    for reg in sources {
        if reg == 0 {
            continue;
        }
        let producer = core
            .rob
            .find_older(handle, |e| e.executed != Progress::Completed && e.writes_register(reg));
        let Some(producer) = producer else {
            continue;
        };
        let producer = core.rob.entry_mut(producer);
        if producer.registers_instrs_depend_on_me.last() != Some(&handle) {
            producer.registers_instrs_depend_on_me.push(handle);
            core.rob.entry_mut(handle).num_reg_dependent += 1;
        }
    }

    let latency = core.params.scheduling_latency;
    let state = core.state;
    let instr = core.rob.entry_mut(handle);
    if instr.is_memory {
        instr.scheduled = Progress::InFlight;
    } else {
        instr.scheduled = Progress::Completed;
        instr.event_cycle = state.apply_latency(instr.event_cycle, latency);
    }
}

/// Executes the memory scheduling stage.
pub fn schedule_memory_stage(core: &mut Core) {
    let mut search_bw = core.params.scheduler_size;
    let mut pos = 0;
    while search_bw > 0 {
        let Some(handle) = core.rob.handle_at(pos) else {
            break;
        };
        let instr = core.rob.entry(handle);
        if instr.is_memory && instr.num_reg_dependent == 0 && instr.scheduled == Progress::InFlight {
            do_memory_scheduling(core, handle);
        }
        if core.rob.entry(handle).executed == Progress::NotStarted {
            search_bw -= 1;
        }
        pos += 1;
    }
}

/// Admits every not-yet-admitted memory operand of `handle` that fits.
///
/// Once all operands are admitted the instruction is fully scheduled and
/// executing (unless forwarding already finished it).
///
/// # Panics
///
/// Panics if more operands are admitted than the instruction has.
fn do_memory_scheduling(core: &mut Core, handle: RobHandle) {
    let mut num_mem_ops = 0;
    let mut num_added = 0;

    for i in 0..NUM_INSTR_SOURCES {
        let instr = core.rob.entry(handle);
        if instr.source_memory[i] == 0 {
            continue;
        }
        num_mem_ops += 1;
        if instr.source_added[i] {
            num_added += 1;
        } else if !core.lq.is_full() {
            add_load_queue(core, handle, i);
            num_added += 1;
        } else {
            core.stats.lq_full_events += 1;
            debug!(
                instr_id = instr.instr_id,
                occupancy = core.lq.len(),
                cycle = core.state.cycle,
                "cannot be added to the load queue"
            );
        }
    }

    for i in 0..NUM_INSTR_DESTINATIONS {
        let instr = core.rob.entry(handle);
        if instr.destination_memory[i] == 0 {
            continue;
        }
        num_mem_ops += 1;
        if instr.destination_added[i] {
            num_added += 1;
        } else if core.sq.is_full() {
            core.stats.sq_full_events += 1;
            debug!(
                instr_id = instr.instr_id,
                occupancy = core.sq.len(),
                cycle = core.state.cycle,
                "cannot be added to the store queue"
            );
        } else if core.sta.head() == Some(instr.instr_id) {
            add_store_queue(core, handle, i);
            num_added += 1;
        } else {
            core.stats.sta_wait_events += 1;
        }
    }

    let instr = core.rob.entry_mut(handle);
    assert!(
        num_added <= num_mem_ops,
        "instr {} admitted {num_added} of {num_mem_ops} memory operands",
        instr.instr_id
    );
    if num_mem_ops == num_added {
        instr.scheduled = Progress::Completed;
        // Forwarding may already have completed it.
        if instr.executed == Progress::NotStarted {
            instr.executed = Progress::InFlight;
        }
        trace!(instr_id = instr.instr_id, num_mem_ops = instr.num_mem_ops, "memory operands scheduled");
    }
}

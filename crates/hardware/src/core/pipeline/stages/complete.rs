//! Completion Stage.
//!
//! This module drains asynchronous memory completions and finishes executed
//! instructions:
//! 1. **Instruction Translation:** Completes translations of the fetch-buffer entries
//!    waiting on each returned page, limited by fetch bandwidth. A request whose
//!    waiters are not all serviced stays at the head of its queue.
//! 2. **Instruction Fetch:** Marks fetch-buffer entries of each returned block fetched.
//! 3. **Data Translation:** Records the physical address of each waiting LSQ entry and
//!    moves it to its execute queue.
//! 4. **Data Return:** Delivers load data, settles the load's memory operand and frees
//!    its queue entry.
//! 5. **Completion:** Finishes executed instructions whose event cycle has passed and
//!    releases their register dependents.

use tracing::{debug, trace};

use crate::common::constants::{LOG2_BLOCK_SIZE, LOG2_PAGE_SIZE};
use crate::common::error::SimError;
use crate::common::VirtAddr;
use crate::core::Core;
use crate::core::pipeline::instr::Progress;
use crate::core::units::mmu::TranslationPolicy;
use crate::soc::request::{Port, Waiter};

/// Drains the four return ports, at most `max_read` requests each.
///
/// # Errors
///
/// Propagates translation errors while resolving returned translations.
///
/// # Panics
///
/// Panics if a returned load belongs to an instruction with no memory
/// operand outstanding.
pub fn handle_memory_return(core: &mut Core) -> Result<(), SimError> {
    drain_instruction_translations(core)?;
    drain_instruction_fetches(core);
    drain_data_translations(core)?;
    drain_data_returns(core);
    Ok(())
}

fn drain_instruction_translations(core: &mut Core) -> Result<(), SimError> {
    let cycle = core.state.cycle;
    let mut bandwidth = core.params.fetch_width;
    let mut to_read = core.params.max_read;

    while bandwidth > 0 && to_read > 0 {
        let Some(request) = core.returns.front_mut(Port::Itlb) else {
            break;
        };
        if request.event_cycle > cycle {
            break;
        }
        let page = request.address;
        while bandwidth > 0 {
            let Some(Waiter::Instr(id)) = request.waiters.pop_front() else {
                break;
            };
            let Some(instr) = core.ifetch_buffer.find_mut(id) else {
                continue;
            };
            if instr.ip >> LOG2_PAGE_SIZE == page && instr.translated == Progress::InFlight {
                instr.instruction_pa = core.translator.translate(core.cpu, VirtAddr::new(instr.ip))?.val();
                instr.translated = Progress::Completed;
                bandwidth -= 1;
                trace!(instr_id = id, pa = format_args!("{:#x}", instr.instruction_pa), "instruction translated");
            }
        }
        if !request.waiters.is_empty() {
            debug!(cpu = core.cpu, page = format_args!("{page:#x}"), "instruction translation partially drained");
            break;
        }
        let _ = core.returns.pop_front(Port::Itlb);
        to_read -= 1;
    }
    Ok(())
}

fn drain_instruction_fetches(core: &mut Core) {
    let cycle = core.state.cycle;
    let mut bandwidth = core.params.fetch_width;
    let mut to_read = core.params.max_read;

    while bandwidth > 0 && to_read > 0 {
        let Some(request) = core.returns.front_mut(Port::L1i) else {
            break;
        };
        if request.event_cycle > cycle {
            break;
        }
        let block = request.address >> LOG2_BLOCK_SIZE;
        while bandwidth > 0 {
            let Some(Waiter::Instr(id)) = request.waiters.pop_front() else {
                break;
            };
            let Some(instr) = core.ifetch_buffer.find_mut(id) else {
                continue;
            };
            if instr.instruction_pa >> LOG2_BLOCK_SIZE == block
                && instr.fetched == Progress::InFlight
                && instr.translated == Progress::Completed
            {
                instr.fetched = Progress::Completed;
                bandwidth -= 1;
                trace!(instr_id = id, "instruction fetched");
            }
        }
        if !request.waiters.is_empty() {
            break;
        }
        let _ = core.returns.pop_front(Port::L1i);
        to_read -= 1;
    }
}

fn drain_data_translations(core: &mut Core) -> Result<(), SimError> {
    let cycle = core.state.cycle;
    for _ in 0..core.params.max_read {
        if core.returns.front_mut(Port::Dtlb).is_none_or(|r| r.event_cycle > cycle) {
            break;
        }
        let Some(request) = core.returns.pop_front(Port::Dtlb) else {
            break;
        };
        for waiter in request.waiters {
            match waiter {
                Waiter::Store(handle) => {
                    let Some(vaddr) = core.sq.get(handle).map(|e| e.virtual_address) else {
                        continue;
                    };
                    let pa = core.translator.translate(core.cpu, VirtAddr::new(vaddr))?;
                    let entry = core.sq.entry_mut(handle);
                    entry.physical_address = pa.val();
                    entry.translated = Progress::Completed;
                    entry.event_cycle = cycle;
                    core.rts1.push_back(handle);
                }
                Waiter::Load(handle) => {
                    let Some(vaddr) = core.lq.get(handle).map(|e| e.virtual_address) else {
                        continue;
                    };
                    let pa = core.translator.translate(core.cpu, VirtAddr::new(vaddr))?;
                    let entry = core.lq.entry_mut(handle);
                    entry.physical_address = pa.val();
                    entry.translated = Progress::Completed;
                    entry.event_cycle = cycle;
                    core.rtl1.push_back(handle);
                }
                Waiter::Instr(_) => {}
            }
        }
    }
    Ok(())
}

fn drain_data_returns(core: &mut Core) {
    let cycle = core.state.cycle;
    for _ in 0..core.params.max_read {
        if core.returns.front_mut(Port::L1d).is_none_or(|r| r.event_cycle > cycle) {
            break;
        }
        let Some(request) = core.returns.pop_front(Port::L1d) else {
            break;
        };
        for waiter in request.waiters {
            let Waiter::Load(handle) = waiter else {
                continue;
            };
            let Some(load) = core.lq.get_mut(handle) else {
                continue;
            };
            load.fetched = Progress::Completed;
            load.event_cycle = cycle;
            let pa = load.physical_address;
            let rob_index = load.rob_index;

            let instr = core.rob.entry_mut(rob_index);
            assert!(
                instr.num_mem_ops > 0,
                "load data for instr {} with no memory operand outstanding",
                instr.instr_id
            );
            instr.num_mem_ops -= 1;
            instr.event_cycle = request.event_cycle;
            if let Some(slot) = instr.lq_index.iter().position(|&h| h == Some(handle)) {
                instr.source_physical[slot] = pa;
            }
            if instr.num_mem_ops == 0 {
                core.inflight_mem_executions += 1;
            }
            trace!(instr_id = instr.instr_id, remaining = instr.num_mem_ops, "load data returned");
            let _ = core.lq.release(handle);
        }
    }
}

/// Finishes up to `exec_width` executed instructions, oldest first, and
/// releases their register dependents.
///
/// # Panics
///
/// Panics if a dependent's pending register count would underflow.
pub fn complete_inflight(core: &mut Core) {
    if core.inflight_reg_executions == 0 && core.inflight_mem_executions == 0 {
        return;
    }

    let cycle = core.state.cycle;
    let mut bandwidth = core.params.exec_width;
    let mut pos = 0;
    while bandwidth > 0 {
        let Some(handle) = core.rob.handle_at(pos) else {
            break;
        };
        pos += 1;

        let instr = core.rob.entry_mut(handle);
        if instr.executed != Progress::InFlight || instr.event_cycle > cycle || instr.num_mem_ops != 0 {
            continue;
        }
        instr.executed = Progress::Completed;
        if instr.is_memory {
            core.inflight_mem_executions -= 1;
        } else {
            core.inflight_reg_executions -= 1;
        }
        core.completed_executions += 1;
        bandwidth -= 1;

        if instr.branch_mispredicted {
            let resume = cycle + core.params.branch_mispredict_penalty;
            core.state.fetch_resume_cycle = Some(resume);
            debug!(cpu = core.cpu, instr_id = instr.instr_id, resume, "branch resolved at execute");
        }
        trace!(instr_id = instr.instr_id, cycle, "completed");

        let dependents = std::mem::take(&mut instr.registers_instrs_depend_on_me);
        for dependent in dependents {
            let consumer = core.rob.entry_mut(dependent);
            assert!(
                consumer.num_reg_dependent > 0,
                "instr {} released with no pending register",
                consumer.instr_id
            );
            consumer.num_reg_dependent -= 1;
            if consumer.num_reg_dependent == 0 {
                if consumer.is_memory {
                    consumer.scheduled = Progress::InFlight;
                } else {
                    consumer.scheduled = Progress::Completed;
                    core.ready_to_execute.push_back(dependent);
                }
            }
        }
    }
}

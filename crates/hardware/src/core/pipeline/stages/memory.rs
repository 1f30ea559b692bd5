//! Load/Store Queue (LSQ) Stage.
//!
//! This module handles memory operands from admission to data delivery:
//! 1. **Admission:** Loads search backward for the nearest older store to the same
//!    address. A load with such a producer waits for it (or is forwarded at once if
//!    the store already has its data); one without goes to address generation.
//!    Stores are admitted in program order and go to address generation.
//! 2. **Issue:** Four bandwidth-limited queues. Store and load address generation
//!    (`RTS0`, `RTL0`) request translations; store execution (`RTS1`) completes the
//!    store and forwards to waiting loads; load execution (`RTL1`) reads the data
//!    cache.
//! 3. **Forwarding:** Copies the store's physical line into the load entry, settles
//!    one memory operand of the consumer and frees the load entry.

use tracing::{debug, trace};

use crate::common::constants::{LOG2_BLOCK_SIZE, LOG2_PAGE_SIZE, NUM_INSTR_SOURCES};
use crate::common::error::SimError;
use crate::common::{AccessType, VirtAddr, splice_bits};
use crate::core::Core;
use crate::core::pipeline::instr::Progress;
use crate::core::pipeline::lsq::{LsqEntry, LsqHandle};
use crate::core::pipeline::rob::RobHandle;
use crate::core::units::mmu::TranslationPolicy;
use crate::soc::request::{MemoryRequest, Port, Submit, Waiter};
use crate::soc::traits::MemorySubsystem;

/// Admits source operand `data_index` of `handle` to the load queue.
///
/// # Panics
///
/// Panics if the load queue is full; callers check for space first.
pub fn add_load_queue(core: &mut Core, handle: RobHandle, data_index: usize) {
    let event_cycle = core.state.cycle + core.params.scheduling_latency;
    let instr = core.rob.entry(handle);
    let vaddr = instr.source_memory[data_index];
    let entry = LsqEntry::new(instr.instr_id, instr.ip, handle, vaddr, event_cycle);
    let lq_handle = match core.lq.allocate(entry) {
        Ok(h) => h,
        Err(e) => panic!("load queue overflow admitting instr {}", e.instr_id),
    };

    let instr = core.rob.entry_mut(handle);
    instr.lq_index[data_index] = Some(lq_handle);
    instr.source_added[data_index] = true;

    // The producer may not be in the store queue yet, so search the ROB.
    let Some(producer) = core.rob.find_older(handle, |e| e.writes_memory(vaddr)) else {
        core.rtl0.push_back(lq_handle);
        return;
    };

    let producer = core.rob.entry_mut(producer);
    producer.memory_instrs_depend_on_me.push(handle);
    let producer_id = producer.instr_id;

    let load = core.lq.entry_mut(lq_handle);
    load.producer_id = Some(producer_id);
    load.translated = Progress::InFlight;
    trace!(
        instr_id = load.instr_id,
        producer_id,
        vaddr = format_args!("{vaddr:#x}"),
        "load waits on older store"
    );

    let ready_store = core.sq.find(|s| {
        s.fetched == Progress::Completed && s.instr_id == producer_id && s.virtual_address == vaddr
    });
    if let Some(store) = ready_store {
        forward_store_to_load(core, store, lq_handle);
    }
}

/// Admits destination operand `data_index` of `handle` to the store queue and
/// consumes its store-address ring entry.
///
/// # Panics
///
/// Panics if the store queue is full or the ring head belongs to another store.
pub fn add_store_queue(core: &mut Core, handle: RobHandle, data_index: usize) {
    let event_cycle = core.state.cycle + core.params.scheduling_latency;
    let instr = core.rob.entry(handle);
    let instr_id = instr.instr_id;
    let vaddr = instr.destination_memory[data_index];
    let entry = LsqEntry::new(instr_id, instr.ip, handle, vaddr, event_cycle);
    let sq_handle = match core.sq.allocate(entry) {
        Ok(h) => h,
        Err(e) => panic!("store queue overflow admitting instr {}", e.instr_id),
    };

    let instr = core.rob.entry_mut(handle);
    instr.sq_index[data_index] = Some(sq_handle);
    instr.destination_added[data_index] = true;

    core.sta.pop(instr_id);
    core.rts0.push_back(sq_handle);
    trace!(instr_id, vaddr = format_args!("{vaddr:#x}"), "store added to the SQ");
}

/// Satisfies a load from an older store's queue entry and frees the load entry.
///
/// # Panics
///
/// Panics if the consumer has no memory operand left to settle.
pub(crate) fn forward_store_to_load(core: &mut Core, store: LsqHandle, load: LsqHandle) {
    let cycle = core.state.cycle;
    let store_entry = core.sq.entry(store);
    let store_pa = store_entry.physical_address;
    let store_id = store_entry.instr_id;

    let load_entry = core.lq.entry_mut(load);
    load_entry.physical_address = splice_bits(store_pa, load_entry.virtual_address, LOG2_BLOCK_SIZE);
    load_entry.translated = Progress::Completed;
    load_entry.fetched = Progress::Completed;
    let load_pa = load_entry.physical_address;
    let consumer = load_entry.rob_index;

    let instr = core.rob.entry_mut(consumer);
    assert!(
        instr.num_mem_ops > 0,
        "instr {} forwarded with no memory operand outstanding",
        instr.instr_id
    );
    instr.num_mem_ops -= 1;
    instr.event_cycle = cycle;
    if let Some(slot) = instr.lq_index.iter().position(|&h| h == Some(load)) {
        instr.source_physical[slot] = load_pa;
    }
    if instr.num_mem_ops == 0 {
        core.inflight_mem_executions += 1;
    }
    trace!(
        instr_id = instr.instr_id,
        store_id,
        pa = format_args!("{load_pa:#x}"),
        remaining = instr.num_mem_ops,
        "load forwarded from store"
    );

    core.stats.store_forwards += 1;
    let _ = core.lq.release(load);
}

/// Completes a translated store and forwards it to every load waiting on it.
///
/// # Panics
///
/// Panics if the store's instruction has no memory operand left to settle.
fn execute_store(core: &mut Core, store: LsqHandle) {
    let cycle = core.state.cycle;
    let entry = core.sq.entry_mut(store);
    entry.fetched = Progress::Completed;
    entry.event_cycle = cycle;
    let rob_index = entry.rob_index;
    let store_id = entry.instr_id;
    let vaddr = entry.virtual_address;

    let instr = core.rob.entry_mut(rob_index);
    assert!(
        instr.num_mem_ops > 0,
        "store instr {} executed with no memory operand outstanding",
        instr.instr_id
    );
    instr.num_mem_ops -= 1;
    instr.event_cycle = cycle;
    if instr.num_mem_ops == 0 {
        core.inflight_mem_executions += 1;
    }
    trace!(instr_id = store_id, remaining = instr.num_mem_ops, "store executed");
    let dependents = instr.memory_instrs_depend_on_me.clone();

    // A single load may read several addresses; only the operand naming this
    // store as producer is forwarded.
    let mut waiting = Vec::new();
    for dependent in dependents {
        let Some(load_instr) = core.rob.get(dependent) else {
            continue;
        };
        for j in 0..NUM_INSTR_SOURCES {
            if load_instr.source_memory[j] != vaddr || !load_instr.source_added[j] {
                continue;
            }
            if let Some(lq_handle) = load_instr.lq_index[j]
                && core
                    .lq
                    .get(lq_handle)
                    .is_some_and(|l| l.producer_id == Some(store_id))
            {
                waiting.push(lq_handle);
            }
        }
    }
    for load in waiting {
        forward_store_to_load(core, store, load);
    }
}

/// Sends a load to the data cache.
fn execute_load(core: &mut Core, load: LsqHandle, memory: &mut dyn MemorySubsystem) -> Submit {
    let entry = core.lq.entry(load);
    let request = MemoryRequest::new(core.cpu, Port::L1d, AccessType::Read, entry.physical_address)
        .with_origin(entry.instr_id, entry.ip)
        .with_virtual(entry.virtual_address)
        .at(entry.event_cycle)
        .waiting(Waiter::Load(load));
    let result = memory.submit_read(request);
    if result.is_accepted() {
        core.lq.entry_mut(load).fetched = Progress::InFlight;
    }
    result
}

/// Builds the data translation request for one LSQ entry.
fn translation_request(cpu: usize, entry: &LsqEntry, access: AccessType, waiter: Waiter) -> MemoryRequest {
    MemoryRequest::new(cpu, Port::Dtlb, access, entry.virtual_address >> LOG2_PAGE_SIZE)
        .with_origin(entry.instr_id, entry.ip)
        .with_virtual(entry.virtual_address)
        .at(entry.event_cycle)
        .waiting(waiter)
}

/// Drives the four LSQ issue queues for one cycle.
///
/// Stores are handled before loads. A rejected request stops its queue for the
/// rest of the cycle.
///
/// # Errors
///
/// Propagates translation errors of policies that translate immediately.
pub fn operate_lsq(core: &mut Core, memory: &mut dyn MemorySubsystem) -> Result<(), SimError> {
    let lookup = core.translator.needs_lookup();

    let mut store_ag_issued = 0;
    while store_ag_issued < core.params.sq_width {
        let Some(&store) = core.rts0.front() else {
            break;
        };
        if lookup {
            let request =
                translation_request(core.cpu, core.sq.entry(store), AccessType::Write, Waiter::Store(store));
            if !memory.submit_read(request).is_accepted() {
                core.stats.rejected_requests += 1;
                debug!(cpu = core.cpu, "store address translation rejected");
                break;
            }
            core.sq.entry_mut(store).translated = Progress::InFlight;
        } else {
            let vaddr = core.sq.entry(store).virtual_address;
            let pa = core.translator.translate(core.cpu, VirtAddr::new(vaddr))?;
            let entry = core.sq.entry_mut(store);
            entry.physical_address = pa.val();
            entry.translated = Progress::Completed;
            core.rts1.push_back(store);
        }
        let _ = core.rts0.pop_front();
        store_ag_issued += 1;
    }

    let mut store_issued = 0;
    while store_issued < core.params.sq_width {
        let Some(store) = core.rts1.pop_front() else {
            break;
        };
        execute_store(core, store);
        store_issued += 1;
    }

    let mut load_ag_issued = 0;
    while load_ag_issued < core.params.lq_width {
        let Some(&load) = core.rtl0.front() else {
            break;
        };
        if lookup {
            let request =
                translation_request(core.cpu, core.lq.entry(load), AccessType::Read, Waiter::Load(load));
            if !memory.submit_read(request).is_accepted() {
                core.stats.rejected_requests += 1;
                debug!(cpu = core.cpu, "load address translation rejected");
                break;
            }
            core.lq.entry_mut(load).translated = Progress::InFlight;
        } else {
            let vaddr = core.lq.entry(load).virtual_address;
            let pa = core.translator.translate(core.cpu, VirtAddr::new(vaddr))?;
            let entry = core.lq.entry_mut(load);
            entry.physical_address = pa.val();
            entry.translated = Progress::Completed;
            core.rtl1.push_back(load);
        }
        let _ = core.rtl0.pop_front();
        load_ag_issued += 1;
    }

    let mut load_issued = 0;
    while load_issued < core.params.lq_width {
        let Some(&load) = core.rtl1.front() else {
            break;
        };
        if !execute_load(core, load, memory).is_accepted() {
            core.stats.rejected_requests += 1;
            debug!(cpu = core.cpu, "data cache read rejected");
            break;
        }
        let _ = core.rtl1.pop_front();
        load_issued += 1;
    }

    Ok(())
}

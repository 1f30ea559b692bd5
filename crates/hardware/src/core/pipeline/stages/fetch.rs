//! Instruction Fetch (IF) Stage.
//!
//! This module implements the front of the pipeline. Per cycle it:
//! 1. **Reads:** Pulls up to `fetch_width` instructions from the instruction source
//!    into the fetch buffer, bounded by free space, unless fetch is stalled.
//! 2. **Predicts:** Consults the branch oracle for every branch, flags mispredictions
//!    and stalls fetch behind them once warmup is over.
//! 3. **Checks the DIB:** Entries whose window was recently decoded skip translation,
//!    fetch and decode.
//! 4. **Translates:** Issues one translation for the oldest run of untranslated entries
//!    sharing a virtual page.
//! 5. **Fetches:** Issues one instruction fetch for the oldest run of translated,
//!    unfetched entries sharing a cache line.
//! 6. **Promotes:** Moves fully fetched entries from the buffer front into decode.

use tracing::{debug, trace, warn};

use super::admit;
use crate::common::constants::{LOG2_BLOCK_SIZE, LOG2_PAGE_SIZE};
use crate::common::error::SimError;
use crate::common::{AccessType, VirtAddr};
use crate::core::Core;
use crate::core::pipeline::instr::{InstrRecord, Progress, TraceInstr};
use crate::core::units::mmu::TranslationPolicy;
use crate::sim::trace::InstructionSource;
use crate::soc::request::{MemoryRequest, Port, Waiter};
use crate::soc::traits::MemorySubsystem;

/// Reads new instructions into the fetch buffer.
///
/// Clears an expired misprediction stall first. Reading stops early after a
/// correctly predicted taken branch or a misprediction.
///
/// # Errors
///
/// Propagates instruction source failures and translation errors raised by
/// code prefetches.
pub fn fetch_stage(
    core: &mut Core,
    source: &mut dyn InstructionSource,
    memory: &mut dyn MemorySubsystem,
) -> Result<(), SimError> {
    let cycle = core.state.cycle;
    if core.state.fetch_stall && core.state.fetch_resume_cycle.is_some_and(|r| cycle >= r) {
        core.state.fetch_stall = false;
        core.state.fetch_resume_cycle = None;
        debug!(cpu = core.cpu, cycle, "fetch resumed");
    }

    if core.state.fetch_stall {
        core.stats.fetch_stall_cycles += 1;
        return Ok(());
    }
    if core.source_exhausted {
        return Ok(());
    }

    let mut to_read = core.params.fetch_width.min(core.ifetch_buffer.free_slots());
    while to_read > 0 {
        let Some(trace) = source.next_instr()? else {
            core.source_exhausted = true;
            debug!(cpu = core.cpu, cycle, "instruction source exhausted");
            break;
        };
        to_read -= 1;
        if !init_instruction(core, &trace, memory)? {
            break;
        }
    }
    Ok(())
}

/// Builds the record for one trace instruction, runs branch prediction and
/// appends it to the fetch buffer.
///
/// Returns false when fetch must stop for this cycle.
fn init_instruction(
    core: &mut Core,
    trace: &TraceInstr,
    memory: &mut dyn MemorySubsystem,
) -> Result<bool, SimError> {
    let instr_id = core.next_instr_id;
    let mut instr = InstrRecord::new(instr_id, trace);

    for &addr in &instr.destination_memory {
        if addr != 0 {
            core.sta.push(instr_id);
        }
    }

    core.stats.instructions_fetched += 1;
    core.stats.branch_types[instr.branch_type.index()] += 1;

    let mut keep_reading = true;
    if instr.is_branch {
        core.stats.branches += 1;
        let ty = instr.branch_type;
        let (mut predicted_target, always_taken) = core.oracle.predict_target(instr.ip, ty);
        let taken = core
            .oracle
            .predict_taken(instr.ip, predicted_target, always_taken, ty);
        if !taken && !always_taken {
            predicted_target = 0;
        }

        let prefetches = core.prefetcher.branch_operate(instr.ip, ty, predicted_target);
        for addr in prefetches {
            prefetch_code_line(core, memory, addr)?;
        }

        if predicted_target == instr.branch_target {
            // A taken branch ends the fetch group even when predicted right.
            if instr.branch_taken {
                keep_reading = false;
            }
        } else {
            core.stats.branch_mispredictions += 1;
            core.stats.rob_occupancy_at_mispredict += core.rob.len() as u64;
            core.stats.branch_type_misses[ty.index()] += 1;
            if core.state.warmup_complete {
                core.state.fetch_stall = true;
                instr.branch_mispredicted = true;
                keep_reading = false;
                debug!(
                    cpu = core.cpu,
                    instr_id,
                    ip = format_args!("{:#x}", instr.ip),
                    predicted = format_args!("{predicted_target:#x}"),
                    actual = format_args!("{:#x}", instr.branch_target),
                    "branch mispredicted, fetch stalled"
                );
            }
        }

        core.oracle
            .on_resolve(instr.ip, instr.branch_target, instr.branch_taken, ty);
        trace!(
            instr_id,
            ip = format_args!("{:#x}", instr.ip),
            taken = instr.branch_taken,
            "branch"
        );
    }

    instr.event_cycle = core.state.cycle;
    if !core.state.warmup_complete {
        instr.strip_registers();
    }

    admit(&mut core.ifetch_buffer, instr, true, "fetch");
    core.next_instr_id += 1;
    Ok(keep_reading)
}

/// Issues a best-effort code prefetch for `pf_v_addr`.
///
/// The address is translated on the spot, without a translation request.
/// Prefetches of address 0 are dropped with a warning.
///
/// # Errors
///
/// Propagates translation errors. The prefetch is best-effort but its
/// translation is not: in segment mode an address outside every region fails
/// the simulation like any other access.
pub fn prefetch_code_line(
    core: &mut Core,
    memory: &mut dyn MemorySubsystem,
    pf_v_addr: u64,
) -> Result<(), SimError> {
    core.stats.code_prefetches_requested += 1;
    if pf_v_addr == 0 {
        warn!(cpu = core.cpu, "cannot prefetch code line 0x0");
        core.stats.code_prefetches_dropped += 1;
        return Ok(());
    }

    let pa = core.translator.translate(core.cpu, VirtAddr::new(pf_v_addr))?;
    let request = MemoryRequest::new(core.cpu, Port::L1i, AccessType::Prefetch, pa.val())
        .with_origin(0, pf_v_addr)
        .with_virtual(pf_v_addr)
        .at(core.state.cycle);
    if memory.submit_prefetch(request).is_accepted() {
        core.stats.code_prefetches_issued += 1;
    }
    Ok(())
}

/// Marks fetch-buffer entries that hit in the DIB as translated, fetched and
/// decoded. Only the first `fetch_width` entries are examined.
pub fn check_dib(core: &mut Core) {
    let cycle = core.state.cycle;
    let width = core.params.fetch_width;
    for instr in core.ifetch_buffer.iter_mut().take(width) {
        if instr.decoded == Progress::Completed {
            continue;
        }
        if core.dib.lookup(instr.ip) {
            instr.translated = Progress::Completed;
            instr.fetched = Progress::Completed;
            instr.decoded = Progress::Completed;
            instr.event_cycle = cycle;
            core.stats.dib_hits += 1;
            trace!(instr_id = instr.instr_id, "DIB hit");
        }
    }
}

/// Finds the oldest run of buffer entries satisfying `eligible` whose `key`
/// matches the first one.
///
/// The run is only returned when something different ends it or it starts at
/// the buffer front, so a run still growing at the tail is left for later.
fn find_run(
    core: &Core,
    eligible: impl Fn(&InstrRecord) -> bool,
    key: impl Fn(&InstrRecord) -> u64,
) -> Option<(usize, usize)> {
    let buf = &core.ifetch_buffer;
    let begin = buf.iter().position(&eligible)?;
    let first = key(buf.get(begin)?);
    let end = buf
        .iter()
        .skip(begin)
        .position(|x| key(x) != first)
        .map_or(buf.len(), |off| begin + off);
    (end != buf.len() || begin == 0).then_some((begin, end))
}

/// Requests translation for the oldest run of untranslated fetch-buffer entries
/// sharing a virtual page.
///
/// When the translation policy needs no lookup the run is translated at once.
///
/// # Errors
///
/// Propagates translation errors.
pub fn translate_fetch(core: &mut Core, memory: &mut dyn MemorySubsystem) -> Result<(), SimError> {
    let Some((begin, end)) = find_run(
        core,
        |x| x.translated == Progress::NotStarted,
        |x| x.ip >> LOG2_PAGE_SIZE,
    ) else {
        return Ok(());
    };

    if !core.translator.needs_lookup() {
        for pos in begin..end {
            let Some(instr) = core.ifetch_buffer.get_mut(pos) else {
                break;
            };
            if instr.translated == Progress::NotStarted {
                let pa = core.translator.translate(core.cpu, VirtAddr::new(instr.ip))?;
                instr.instruction_pa = pa.val();
                instr.translated = Progress::Completed;
            }
        }
        return Ok(());
    }

    let Some(head) = core.ifetch_buffer.get(begin) else {
        return Ok(());
    };
    let mut request = MemoryRequest::new(
        core.cpu,
        Port::Itlb,
        AccessType::Fetch,
        head.ip >> LOG2_PAGE_SIZE,
    )
    .with_origin(head.instr_id, head.ip)
    .with_virtual(head.ip)
    .at(core.state.cycle);
    for instr in core.ifetch_buffer.iter().skip(begin).take(end - begin) {
        if instr.translated == Progress::NotStarted {
            request.waiters.push_back(Waiter::Instr(instr.instr_id));
        }
    }

    if memory.submit_read(request).is_accepted() {
        for instr in core.ifetch_buffer.iter_mut().skip(begin).take(end - begin) {
            if instr.translated == Progress::NotStarted {
                instr.translated = Progress::InFlight;
            }
        }
    } else {
        core.stats.rejected_requests += 1;
        debug!(cpu = core.cpu, "instruction translation rejected");
    }
    Ok(())
}

/// Requests the instruction bytes for the oldest run of translated, unfetched
/// fetch-buffer entries sharing a cache line.
pub fn fetch_instruction(core: &mut Core, memory: &mut dyn MemorySubsystem) {
    let Some((begin, end)) = find_run(
        core,
        |x| x.translated == Progress::Completed && x.fetched == Progress::NotStarted,
        |x| x.instruction_pa >> LOG2_BLOCK_SIZE,
    ) else {
        return;
    };

    let Some(head) = core.ifetch_buffer.get(begin) else {
        return;
    };
    let mut request = MemoryRequest::new(
        core.cpu,
        Port::L1i,
        AccessType::Fetch,
        head.instruction_pa,
    )
    .with_origin(head.instr_id, head.ip)
    .with_virtual(head.ip)
    .at(core.state.cycle);
    let wanted = |x: &InstrRecord| x.translated == Progress::Completed && x.fetched == Progress::NotStarted;
    for instr in core.ifetch_buffer.iter().skip(begin).take(end - begin) {
        if wanted(instr) {
            request.waiters.push_back(Waiter::Instr(instr.instr_id));
        }
    }

    if memory.submit_read(request).is_accepted() {
        for instr in core.ifetch_buffer.iter_mut().skip(begin).take(end - begin) {
            if wanted(instr) {
                instr.fetched = Progress::InFlight;
            }
        }
    } else {
        core.stats.rejected_requests += 1;
        debug!(cpu = core.cpu, "instruction fetch rejected");
    }
}

/// Moves fully translated and fetched entries from the front of the fetch
/// buffer into the decode buffer, up to `fetch_width` per cycle.
///
/// DIB hits and all warmup instructions skip the decode latency.
pub fn promote_to_decode(core: &mut Core) {
    let mut bandwidth = core.params.fetch_width;
    while bandwidth > 0 && !core.decode_buffer.is_full() {
        let ready = core.ifetch_buffer.front().is_some_and(|f| {
            f.translated == Progress::Completed && f.fetched == Progress::Completed
        });
        if !ready {
            break;
        }
        let Some(instr) = core.ifetch_buffer.pop_front() else {
            break;
        };
        let skip_latency = !core.state.warmup_complete || instr.decoded == Progress::Completed;
        admit(&mut core.decode_buffer, instr, skip_latency, "promote_to_decode");
        bandwidth -= 1;
    }
}

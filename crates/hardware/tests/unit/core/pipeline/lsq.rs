use pretty_assertions::assert_eq;
use rstest::rstest;

use o3sim_core::common::{AccessType, VirtAddr};
use o3sim_core::config::{Config, TranslationMode};
use o3sim_core::core::Core;
use o3sim_core::core::pipeline::instr::Progress;
use o3sim_core::core::units::mmu::segment::{HEAP_VIRT_START, SegmentMap};
use o3sim_core::soc::Port;

use crate::common::builder::instruction::InstrBuilder;
use crate::common::harness::{TestContext, paged_config, small_config};
use crate::common::mocks::ScriptedMemory;

const ADDR: u64 = HEAP_VIRT_START + 0x100;

#[test]
fn test_load_waits_on_unscheduled_store_then_forwards() {
    let mut config = small_config();
    config.core.rob_size = 4;
    let instrs = vec![
        InstrBuilder::new(0x1000).dst(1).build(),
        InstrBuilder::new(0x1004).src(1).store(ADDR).build(),
        InstrBuilder::new(0x1008).dst(2).load(ADDR).build(),
    ];
    let mut ctx = TestContext::new(&config, instrs);

    // The load enters the LQ while the store still waits for r1.
    assert!(ctx.run_until(200, |c| !c.lq.is_empty()));
    let core = ctx.core();
    let (_, load) = core.lq.iter().next().unwrap();
    assert_eq!(load.instr_id, 2);
    assert_eq!(load.producer_id, Some(1));
    assert_eq!(load.translated, Progress::InFlight);
    assert!(core.sq.is_empty());
    assert!(core.rtl0.is_empty(), "a load with a producer skips address generation");

    ctx.run_to_end();
    let core = ctx.core();
    assert_eq!(core.stats.store_forwards, 1);
    assert!(core.lq.is_empty());
    assert!(core.sq.is_empty());
    assert_eq!(ctx.memory().accepted_on(Port::L1d), 1, "only the store's commit write");
    assert_eq!(ctx.memory().inner.stats.writes, 1);
    assert_eq!(ctx.commit_log(), vec![0, 1, 2]);
}

#[test]
fn test_load_after_executed_store_forwards_on_admission() {
    // The head load is refused by the data cache for a while, so the store
    // executes but cannot retire before the younger load arrives.
    let mut instrs = vec![
        InstrBuilder::new(0x1000).dst(3).load(ADDR + 0x40).build(),
        InstrBuilder::new(0x1004).store(ADDR).build(),
    ];
    instrs.extend((0..6).map(|i| InstrBuilder::new(0x1008 + i * 4).dst(1).build()));
    instrs.push(InstrBuilder::new(0x1020).dst(2).load(ADDR).build());
    let memory = ScriptedMemory::new(&small_config().memory).reject_reads_on(Port::L1d, 30);
    let mut ctx = TestContext::with_memory(&small_config(), instrs, memory);

    while !ctx.sim.is_finished() {
        ctx.tick();
        assert!(
            ctx.core().lq.iter().all(|(_, l)| l.producer_id.is_none()),
            "an executed store satisfies the load without a wait"
        );
        assert!(ctx.cycle() < 1_000);
    }
    assert_eq!(ctx.core().stats.store_forwards, 1);
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 1, "only the head load");
}

#[rstest]
#[case::segment(small_config())]
#[case::paged(paged_config())]
fn test_forwarded_load_takes_the_store_physical_address(#[case] config: Config) {
    // The blocked head load keeps both the store and the younger load in flight.
    let mut instrs = vec![
        InstrBuilder::new(0x1000).dst(3).load(ADDR + 0x40).build(),
        InstrBuilder::new(0x1004).store(ADDR).build(),
    ];
    instrs.extend((0..6).map(|i| InstrBuilder::new(0x1008 + i * 4).dst(1).build()));
    instrs.push(InstrBuilder::new(0x1020).dst(2).load(ADDR).build());
    let memory = ScriptedMemory::new(&config.memory).reject_reads_on(Port::L1d, 60);
    let mut ctx = TestContext::with_memory(&config, instrs, memory);

    let forwarded = |c: &Core| {
        c.rob
            .iter()
            .any(|(_, e)| e.instr_id == 8 && e.source_physical[0] != 0)
    };
    assert!(ctx.run_until(200, forwarded));
    let core = ctx.core();
    assert_eq!(core.stats.store_forwards, 1);
    let (_, load) = core.rob.iter().find(|(_, e)| e.instr_id == 8).unwrap();
    let (_, store) = core.sq.iter().find(|(_, s)| s.instr_id == 1).unwrap();
    assert_eq!(store.fetched, Progress::Completed);
    assert_eq!(load.source_physical[0], store.physical_address);

    if config.vmem.mode == TranslationMode::Segment {
        let map = SegmentMap::new(config.vmem.capacity, &config.vmem.segments).unwrap();
        let pa = map.va_to_pa(VirtAddr::new(ADDR)).unwrap();
        assert_eq!(load.source_physical[0], pa.val());
    }

    ctx.run_to_end();
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 1, "only the head load");
}

#[test]
fn test_load_before_store_reads_the_cache() {
    let instrs = vec![
        InstrBuilder::new(0x1000).dst(2).load(ADDR).build(),
        InstrBuilder::new(0x1004).store(ADDR).build(),
    ];
    let mut ctx = TestContext::new(&small_config(), instrs);
    ctx.run_to_end();

    let core = ctx.core();
    assert_eq!(core.stats.store_forwards, 0);
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 1);
    assert_eq!(ctx.memory().inner.stats.writes, 1);
}

#[test]
fn test_different_address_is_not_forwarded() {
    let instrs = vec![
        InstrBuilder::new(0x1000).store(ADDR).build(),
        InstrBuilder::new(0x1004).dst(2).load(ADDR + 8).build(),
    ];
    let mut ctx = TestContext::new(&small_config(), instrs);
    ctx.run_to_end();

    assert_eq!(ctx.core().stats.store_forwards, 0);
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 1);
}

#[test]
fn test_load_forwards_from_nearest_older_store() {
    let instrs = vec![
        InstrBuilder::new(0x1000).dst(3).load(ADDR + 0x40).build(),
        InstrBuilder::new(0x1004).store(ADDR).build(),
        InstrBuilder::new(0x1008).src(3).store(ADDR).build(),
        InstrBuilder::new(0x100c).dst(2).load(ADDR).build(),
    ];
    let mut ctx = TestContext::new(&small_config(), instrs);

    let waiting = |c: &Core| c.lq.iter().any(|(_, l)| l.instr_id == 3);
    assert!(ctx.run_until(200, waiting));
    let (_, load) = ctx.core().lq.iter().find(|(_, l)| l.instr_id == 3).unwrap();
    assert_eq!(load.producer_id, Some(2));

    ctx.run_to_end();
    assert_eq!(ctx.core().stats.store_forwards, 1);
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 1);
}

#[test]
fn test_stores_enter_the_queue_in_program_order() {
    // Store 1 is register-ready long before store 0, yet may not pass it.
    let instrs = vec![
        InstrBuilder::new(0x1000).dst(1).load(ADDR + 0x40).build(),
        InstrBuilder::new(0x1004).src(1).store(ADDR).build(),
        InstrBuilder::new(0x1008).store(ADDR + 8).build(),
    ];
    let mut ctx = TestContext::new(&small_config(), instrs);

    assert!(ctx.run_until(200, |c| c.stats.sta_wait_events > 0));
    let core = ctx.core();
    assert!(core.sq.is_empty(), "younger store held behind the ring head");
    assert_eq!(core.sta.head(), Some(1));

    ctx.run_to_end();
    let order: Vec<u64> = ctx
        .memory()
        .accepted
        .iter()
        .filter(|r| r.port == Port::L1d && r.access == AccessType::Write)
        .map(|r| r.instr_id)
        .collect();
    assert_eq!(order, vec![1, 2]);
    assert!(ctx.core().sta.is_empty());
}

#[test]
fn test_full_load_queue_is_counted_and_recovers() {
    let mut config = small_config();
    config.core.lq_size = 1;
    let instrs: Vec<_> = (0..4)
        .map(|i| InstrBuilder::new(0x1000 + i * 4).dst(2).load(ADDR + i * 64).build())
        .collect();
    let mut ctx = TestContext::new(&config, instrs);
    ctx.run_to_end();

    let core = ctx.core();
    assert!(core.stats.lq_full_events > 0);
    assert_eq!(core.stats.instructions_retired, 4);
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 4);
}

#[test]
fn test_multi_operand_load_completes_after_every_operand() {
    let instrs = vec![
        InstrBuilder::new(0x1000)
            .dst(2)
            .load(ADDR)
            .load(ADDR + 0x1000)
            .load(ADDR + 0x2000)
            .build(),
    ];
    let mut ctx = TestContext::new(&small_config(), instrs);

    assert!(ctx.run_until(200, |c| c.lq.len() == 3));
    assert_eq!(ctx.core().rob.front().unwrap().num_mem_ops, 3);
    ctx.run_to_end();
    assert_eq!(ctx.memory().inner.stats.reads[Port::L1d.index()], 3);
}

#[test]
fn test_paged_loads_and_stores_translate_through_the_dtlb() {
    let instrs = vec![
        InstrBuilder::new(0x1000).store(ADDR).build(),
        InstrBuilder::new(0x1004).dst(2).load(ADDR + 0x3000).build(),
    ];
    let mut ctx = TestContext::new(&paged_config(), instrs);
    ctx.run_to_end();

    let memory = ctx.memory();
    assert_eq!(memory.accepted_on(Port::Dtlb), 2);
    let dtlb: Vec<u64> = memory
        .accepted
        .iter()
        .filter(|r| r.port == Port::Dtlb)
        .map(|r| r.address)
        .collect();
    assert!(dtlb.contains(&(ADDR >> 12)));
    assert!(dtlb.contains(&((ADDR + 0x3000) >> 12)));
}

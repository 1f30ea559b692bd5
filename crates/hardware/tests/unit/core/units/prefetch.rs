use pretty_assertions::assert_eq;

use o3sim_core::common::{AccessType, SimError};
use o3sim_core::core::pipeline::instr::BranchType;
use o3sim_core::core::units::prefetch::CodePrefetcher;
use o3sim_core::core::units::mmu::segment::STACK_VIRT_END;
use o3sim_core::core::units::prefetch::next_line::NextLinePrefetcher;
use o3sim_core::soc::Port;

use crate::common::builder::instruction::{InstrBuilder, alu_stream};
use crate::common::harness::{TestContext, paged_config, small_config};
use crate::common::mocks::{RecordingPrefetcher, ScriptedOracle};

#[test]
fn test_next_line_covers_degree_lines() {
    let mut pf = NextLinePrefetcher::new(2);
    assert_eq!(
        pf.branch_operate(0x10, BranchType::DirectJump, 0x2010),
        vec![0x2000, 0x2040]
    );
    assert!(pf.branch_operate(0x10, BranchType::Conditional, 0).is_empty());
    assert!(pf.cycle_operate().is_empty());
    assert_eq!(NextLinePrefetcher::new(0).branch_operate(0, BranchType::Return, 0x80), vec![0x80]);
}

#[test]
fn test_branch_and_cycle_prefetches_are_issued() {
    let mut instrs = vec![InstrBuilder::new(0x1000).conditional(true).build()];
    instrs.extend(alu_stream(0x2000, 2));
    let prefetcher = RecordingPrefetcher::new().then_cycle(vec![0, 0x3000]);
    let branches = prefetcher.branches.clone();
    let mut ctx = TestContext::new(&small_config(), instrs)
        .with_oracle(ScriptedOracle::new().predict(0x1000, 0x2000))
        .with_prefetcher(prefetcher);
    ctx.run_to_end();

    assert_eq!(
        branches.borrow().as_slice(),
        &[(0x1000, BranchType::Conditional, 0x2000)]
    );
    let stats = &ctx.core().stats;
    assert_eq!(stats.code_prefetches_requested, 3);
    assert_eq!(stats.code_prefetches_dropped, 1, "address 0 is never prefetched");
    assert_eq!(stats.code_prefetches_issued, 2);

    let memory = ctx.memory();
    assert_eq!(memory.inner.stats.prefetches, 2);
    let lines: Vec<u64> = memory
        .accepted
        .iter()
        .filter(|r| r.access == AccessType::Prefetch)
        .map(|r| r.v_address)
        .collect();
    assert_eq!(lines, vec![0x2000, 0x3000]);
}

#[test]
fn test_not_taken_prediction_requests_nothing() {
    let mut instrs = vec![InstrBuilder::new(0x1000).conditional(false).build()];
    instrs.extend(alu_stream(0x1004, 2));
    let prefetcher = RecordingPrefetcher::new();
    let branches = prefetcher.branches.clone();
    let mut ctx = TestContext::new(&small_config(), instrs).with_prefetcher(prefetcher);
    ctx.run_to_end();

    assert_eq!(branches.borrow().as_slice(), &[(0x1000, BranchType::Conditional, 0)]);
    assert_eq!(ctx.core().stats.code_prefetches_requested, 0);
}

#[test]
fn test_prefetch_translates_without_the_itlb() {
    let prefetcher = RecordingPrefetcher::new().then_cycle(vec![0x9000]);
    let mut ctx = TestContext::new(&paged_config(), alu_stream(0x1000, 2)).with_prefetcher(prefetcher);
    ctx.run_to_end();

    let memory = ctx.memory();
    assert!(memory.accepted.iter().filter(|r| r.port == Port::Itlb).all(|r| r.address == 0x1));
    let prefetch = memory
        .accepted
        .iter()
        .find(|r| r.access == AccessType::Prefetch)
        .unwrap();
    assert_eq!(prefetch.port, Port::L1i);
    assert_eq!(prefetch.address % 4096, 0);
    assert_eq!(ctx.core().stats.code_prefetches_issued, 1);
}

#[test]
fn test_segment_prefetch_outside_every_region_is_fatal() {
    let prefetcher = RecordingPrefetcher::new().then_cycle(vec![STACK_VIRT_END + 0x40]);
    let mut ctx = TestContext::new(&small_config(), alu_stream(0x1000, 2)).with_prefetcher(prefetcher);
    let err = ctx.sim.tick().unwrap_err();
    assert!(
        matches!(err, SimError::UnmappedSegmentAddress { vaddr, .. } if vaddr == STACK_VIRT_END + 0x40),
        "{err:?}"
    );
}

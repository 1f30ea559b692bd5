use pretty_assertions::assert_eq;
use rstest::rstest;

use o3sim_core::common::AccessType;
use o3sim_core::config::MemoryConfig;
use o3sim_core::soc::{FixedLatencyMemory, MemoryRequest, MemorySubsystem, Port, ReturnBus, Submit, Waiter};

fn config() -> MemoryConfig {
    MemoryConfig {
        translation_latency: 2,
        fetch_latency: 4,
        data_latency: 6,
        write_latency: 3,
        read_queue_size: 4,
        write_queue_size: 2,
    }
}

/// Operates `mem` from cycle 0 until `port` delivers, returning that cycle.
fn cycle_of_return(mem: &mut FixedLatencyMemory, port: Port) -> Option<u64> {
    let mut bus = ReturnBus::new();
    (0..100).find(|&cycle| {
        mem.operate(cycle, &mut bus);
        bus.len(port) > 0
    })
}

#[rstest]
#[case::itlb(Port::Itlb, 2)]
#[case::dtlb(Port::Dtlb, 2)]
#[case::l1i(Port::L1i, 4)]
#[case::l1d(Port::L1d, 6)]
fn test_latency_per_port(#[case] port: Port, #[case] latency: u64) {
    let mut mem = FixedLatencyMemory::new(&config());
    assert!(mem.submit_read(MemoryRequest::new(0, port, AccessType::Read, 0x40)).is_accepted());
    assert_eq!(cycle_of_return(&mut mem, port), Some(latency));
}

#[test]
fn test_future_event_cycle_delays_service() {
    let mut mem = FixedLatencyMemory::new(&config());
    let req = MemoryRequest::new(0, Port::L1d, AccessType::Read, 0x40).at(10);
    assert!(mem.submit_read(req).is_accepted());
    assert_eq!(cycle_of_return(&mut mem, Port::L1d), Some(16));
}

#[test]
fn test_completions_keep_identity_and_waiters() {
    let mut mem = FixedLatencyMemory::new(&config());
    let mut bus = ReturnBus::new();
    let req = MemoryRequest::new(0, Port::Itlb, AccessType::Fetch, 0x7)
        .with_origin(42, 0x7123)
        .with_virtual(0x7123)
        .waiting(Waiter::Instr(42))
        .waiting(Waiter::Instr(43));
    assert!(mem.submit_read(req).is_accepted());
    mem.operate(0, &mut bus);
    mem.operate(1, &mut bus);
    mem.operate(2, &mut bus);

    let done = bus.pop_front(Port::Itlb).unwrap();
    assert_eq!(done.instr_id, 42);
    assert_eq!(done.v_address, 0x7123);
    assert_eq!(done.event_cycle, 2);
    assert_eq!(Vec::from(done.waiters), vec![Waiter::Instr(42), Waiter::Instr(43)]);
    assert_eq!(mem.stats.completions, 1);
}

#[test]
fn test_same_cycle_completions_arrive_in_submission_order() {
    let mut mem = FixedLatencyMemory::new(&config());
    let mut bus = ReturnBus::new();
    for addr in [0x100, 0x200, 0x300] {
        assert!(mem.submit_read(MemoryRequest::new(0, Port::L1d, AccessType::Read, addr)).is_accepted());
    }
    for cycle in 0..=6 {
        mem.operate(cycle, &mut bus);
    }
    let order: Vec<u64> = std::iter::from_fn(|| bus.pop_front(Port::L1d)).map(|r| r.address).collect();
    assert_eq!(order, vec![0x100, 0x200, 0x300]);
}

#[test]
fn test_queue_frees_after_service() {
    let mut mem = FixedLatencyMemory::new(&config());
    let mut bus = ReturnBus::new();
    for _ in 0..4 {
        assert!(mem.submit_read(MemoryRequest::new(0, Port::Dtlb, AccessType::Read, 1)).is_accepted());
    }
    assert_eq!(
        mem.submit_read(MemoryRequest::new(0, Port::Dtlb, AccessType::Read, 1)),
        Submit::Rejected
    );
    assert_eq!(mem.pending_reads(Port::Dtlb), 4);
    for cycle in 0..=2 {
        mem.operate(cycle, &mut bus);
    }
    assert_eq!(mem.pending_reads(Port::Dtlb), 0);
    assert!(mem.submit_read(MemoryRequest::new(0, Port::Dtlb, AccessType::Read, 1)).is_accepted());
}

#[test]
fn test_prefetch_shares_the_fetch_queue() {
    let mut mem = FixedLatencyMemory::new(&config());
    for _ in 0..4 {
        assert!(mem.submit_prefetch(MemoryRequest::new(0, Port::L1i, AccessType::Fetch, 0x40)).is_accepted());
    }
    assert_eq!(
        mem.submit_read(MemoryRequest::new(0, Port::L1i, AccessType::Fetch, 0x80)),
        Submit::Rejected
    );
    assert_eq!(mem.stats.prefetches, 4);
    assert_eq!(cycle_of_return(&mut mem, Port::L1i), None, "prefetches never return");
}

#[test]
fn test_closed_memory_rejects_everything() {
    let mut mem = FixedLatencyMemory::new(&config());
    mem.set_accepting(false);
    let req = || MemoryRequest::new(0, Port::L1d, AccessType::Write, 0x40);
    assert_eq!(mem.submit_read(req()), Submit::Rejected);
    assert_eq!(mem.submit_write(req()), Submit::Rejected);
    assert_eq!(mem.submit_prefetch(req()), Submit::Rejected);
    assert_eq!(mem.stats.rejections, 3);

    mem.set_accepting(true);
    assert_eq!(mem.submit_write(req()), Submit::Accepted);
    assert_eq!(mem.stats.writes, 1);
}

use proptest::prelude::*;

use o3sim_core::core::Core;
use o3sim_core::core::pipeline::instr::TraceInstr;
use o3sim_core::core::units::mmu::segment::HEAP_VIRT_START;

use crate::common::builder::instruction::InstrBuilder;
use crate::common::harness::{TestContext, paged_config, small_config};

/// One generated instruction shape.
#[derive(Clone, Debug)]
enum Shape {
    Alu { dst: u8, src: u8 },
    Load { dst: u8, slot: u64 },
    Store { src: u8, slot: u64 },
    LoadStore { slot: u64 },
    Conditional { taken: bool },
}

fn shape() -> impl Strategy<Value = Shape> {
    let reg = prop_oneof![1u8..=5, 7u8..=12];
    prop_oneof![
        4 => (reg.clone(), reg.clone()).prop_map(|(dst, src)| Shape::Alu { dst, src }),
        2 => (reg.clone(), 0u64..8).prop_map(|(dst, slot)| Shape::Load { dst, slot }),
        2 => (reg, 0u64..8).prop_map(|(src, slot)| Shape::Store { src, slot }),
        1 => (0u64..8).prop_map(|slot| Shape::LoadStore { slot }),
        1 => any::<bool>().prop_map(|taken| Shape::Conditional { taken }),
    ]
}

/// Lays the shapes out as straight-line code with data in the heap segment.
pub fn materialize(shapes: &[Shape]) -> Vec<TraceInstr> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let b = InstrBuilder::new(0x40_0000 + i as u64 * 4);
            let data = |slot: u64| HEAP_VIRT_START + slot * 8;
            match *s {
                Shape::Alu { dst, src } => b.dst(dst).src(src),
                Shape::Load { dst, slot } => b.dst(dst).load(data(slot)),
                Shape::Store { src, slot } => b.src(src).store(data(slot)),
                Shape::LoadStore { slot } => b.load(data(slot)).store(data(slot + 1)),
                Shape::Conditional { taken } => b.conditional(taken),
            }
            .build()
        })
        .collect()
}

pub fn stream() -> impl Strategy<Value = Vec<TraceInstr>> {
    prop::collection::vec(shape(), 1..80).prop_map(|s| materialize(&s))
}

fn assert_within_capacity(core: &Core) {
    assert!(core.ifetch_buffer.len() <= core.ifetch_buffer.capacity());
    assert!(core.decode_buffer.len() <= core.decode_buffer.capacity());
    assert!(core.dispatch_buffer.len() <= core.dispatch_buffer.capacity());
    assert!(core.rob.len() <= core.rob.capacity());
    assert!(core.lq.len() <= core.lq.capacity());
    assert!(core.sq.len() <= core.sq.capacity());
    assert!(core.ready_to_execute.len() <= core.rob.len());
    assert!(core.rts0.len() + core.rts1.len() <= core.sq.len());
    assert!(core.rtl0.len() + core.rtl1.len() <= core.lq.len());
}

fn run_checked(ctx: &mut TestContext, limit: u64) {
    for _ in 0..limit {
        if ctx.sim.is_finished() {
            return;
        }
        ctx.tick();
        assert_within_capacity(ctx.core());
    }
    panic!("stream did not drain within {limit} cycles");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_segment_structures_stay_bounded(instrs in stream()) {
        let mut config = small_config();
        config.core.rob_size = 8;
        config.core.lq_size = 3;
        config.core.sq_size = 2;
        let n = instrs.len();
        let mut ctx = TestContext::new(&config, instrs);
        run_checked(&mut ctx, 20_000);
        prop_assert_eq!(ctx.core().stats.instructions_retired, n as u64);
    }

    #[test]
    fn test_paged_structures_stay_bounded(instrs in stream()) {
        let mut config = paged_config();
        config.core.rob_size = 6;
        config.core.lq_size = 2;
        config.core.sq_size = 2;
        config.core.ifetch_buffer_size = 4;
        let n = instrs.len();
        let mut ctx = TestContext::new(&config, instrs);
        run_checked(&mut ctx, 20_000);
        prop_assert_eq!(ctx.commit_log().len(), n);
    }
}

#[test]
fn test_full_rob_backs_up_the_front_end() {
    let mut config = small_config();
    config.core.rob_size = 2;
    // Long dependence chain so the ROB head stays busy.
    let instrs: Vec<_> = (0..24)
        .map(|i| InstrBuilder::new(0x1000 + i * 4).dst(1).src(1).load(HEAP_VIRT_START).build())
        .collect();
    let mut ctx = TestContext::new(&config, instrs);

    assert!(ctx.run_until(500, |c| c.rob.is_full() && c.dispatch_buffer.is_full()));
    assert_within_capacity(ctx.core());
    ctx.run_to_end();
    assert_eq!(ctx.core().stats.instructions_retired, 24);
}

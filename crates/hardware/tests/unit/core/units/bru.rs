use pretty_assertions::assert_eq;
use rstest::rstest;

use o3sim_core::core::pipeline::instr::BranchType;
use o3sim_core::core::units::bru::btb::Btb;
use o3sim_core::core::units::bru::{BranchOracle, StaticOracle};

#[test]
fn test_btb_miss_then_hit() {
    let mut btb = Btb::new(64);
    assert_eq!(btb.lookup(0x1000), None);
    btb.update(0x1000, 0x2000, true);
    assert_eq!(btb.lookup(0x1000), Some((0x2000, true)));
}

#[test]
fn test_btb_not_taken_clears_always_taken() {
    let mut btb = Btb::new(64);
    btb.update(0x1000, 0x2000, true);
    btb.update(0x1000, 0, false);
    assert_eq!(btb.lookup(0x1000), Some((0x2000, false)));
    btb.update(0x1000, 0x3000, true);
    assert_eq!(btb.lookup(0x1000), Some((0x3000, false)), "target follows the last taken instance");
}

#[test]
fn test_btb_never_allocates_not_taken() {
    let mut btb = Btb::new(64);
    btb.update(0x1000, 0, false);
    assert_eq!(btb.lookup(0x1000), None);
}

#[test]
fn test_btb_tag_mismatch_misses() {
    let mut btb = Btb::new(1);
    btb.update(0x1000, 0x2000, true);
    btb.update(0x4000, 0x5000, true);
    assert_eq!(btb.lookup(0x1000), None);
    assert_eq!(btb.lookup(0x4000), Some((0x5000, true)));
}

#[rstest]
#[case::jump(BranchType::DirectJump, true)]
#[case::call(BranchType::DirectCall, true)]
#[case::ret(BranchType::Return, true)]
#[case::indirect(BranchType::Indirect, true)]
#[case::conditional(BranchType::Conditional, false)]
fn test_static_direction(#[case] ty: BranchType, #[case] taken: bool) {
    let mut oracle = StaticOracle::default();
    assert_eq!(oracle.predict_taken(0x1000, 0, false, ty), taken);
}

#[test]
fn test_static_oracle_learns_targets() {
    let mut oracle = StaticOracle::new(16);
    assert_eq!(oracle.predict_target(0x1000, BranchType::DirectJump), (0, false));
    oracle.on_resolve(0x1000, 0x2000, true, BranchType::DirectJump);
    assert_eq!(oracle.predict_target(0x1000, BranchType::DirectJump), (0x2000, true));
}

#[test]
fn test_conditional_is_never_always_taken() {
    let mut oracle = StaticOracle::new(16);
    oracle.on_resolve(0x1000, 0x2000, true, BranchType::Conditional);
    assert_eq!(oracle.predict_target(0x1000, BranchType::Conditional), (0x2000, false));
}

//! Instruction Record Tests.
//!
//! Branch classification from register usage, target clearing, stack-pointer
//! folding and operand counting.

use o3sim_core::common::constants::{REG_FLAGS, REG_INSTRUCTION_POINTER, REG_STACK_POINTER};
use o3sim_core::core::pipeline::instr::{BranchType, InstrRecord, Progress};
use rstest::rstest;

use crate::common::builder::InstrBuilder;

const IP: u8 = REG_INSTRUCTION_POINTER;
const SP: u8 = REG_STACK_POINTER;
const FLAGS: u8 = REG_FLAGS;
const OTHER: u8 = 5;

fn record(dst: &[u8], src: &[u8], taken: bool) -> InstrRecord {
    let mut b = InstrBuilder::new(0x400).taken(taken);
    for &r in dst {
        b = b.dst(r);
    }
    for &r in src {
        b = b.src(r);
    }
    let mut trace = b.build();
    trace.branch_target = 0x900;
    InstrRecord::new(7, &trace)
}

// ══════════════════════════════════════════════════════════
// 1. Classification
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::direct_jump(&[IP], &[], BranchType::DirectJump)]
#[case::indirect(&[IP], &[OTHER], BranchType::Indirect)]
#[case::conditional(&[IP], &[IP, FLAGS], BranchType::Conditional)]
#[case::direct_call(&[IP, SP], &[IP, SP], BranchType::DirectCall)]
#[case::indirect_call(&[IP, SP], &[IP, SP, OTHER], BranchType::IndirectCall)]
#[case::ret(&[IP, SP], &[SP], BranchType::Return)]
#[case::other(&[IP], &[FLAGS], BranchType::Other)]
#[case::not_branch(&[OTHER], &[OTHER], BranchType::NotBranch)]
fn test_classification(#[case] dst: &[u8], #[case] src: &[u8], #[case] expected: BranchType) {
    let instr = record(dst, src, true);
    assert_eq!(instr.branch_type, expected);
    if expected != BranchType::NotBranch {
        assert!(instr.is_branch);
    }
}

#[rstest]
#[case::direct_jump(&[IP], &[])]
#[case::indirect(&[IP], &[OTHER])]
#[case::direct_call(&[IP, SP], &[IP, SP])]
#[case::ret(&[IP, SP], &[SP])]
fn test_unconditional_classes_are_taken(#[case] dst: &[u8], #[case] src: &[u8]) {
    let instr = record(dst, src, false);
    assert!(instr.branch_taken, "{:?} must be forced taken", instr.branch_type);
}

#[test]
fn test_conditional_keeps_trace_outcome_and_clears_target() {
    let taken = record(&[IP], &[IP, FLAGS], true);
    assert!(taken.branch_taken);
    assert_eq!(taken.branch_target, 0x900);

    let not_taken = record(&[IP], &[IP, FLAGS], false);
    assert!(!not_taken.branch_taken);
    assert_eq!(not_taken.branch_target, 0, "not-taken branches carry no target");
}

#[test]
fn test_non_branch_target_cleared() {
    let mut trace = InstrBuilder::new(0x400).dst(OTHER).build();
    trace.branch_target = 0x900;
    let instr = InstrRecord::new(0, &trace);
    assert!(!instr.is_branch);
    assert_eq!(instr.branch_target, 0);
}

#[test]
fn test_unclassified_trace_branch_keeps_its_flag() {
    let instr = record(&[OTHER], &[], true);
    assert!(instr.is_branch, "the trace marker survives when no class applies");
    assert_eq!(instr.branch_type, BranchType::NotBranch);
    assert_eq!(instr.branch_target, 0x900);
}

// ══════════════════════════════════════════════════════════
// 2. Stack-pointer folding
// ══════════════════════════════════════════════════════════

#[test]
fn test_call_folds_stack_pointer() {
    let instr = record(&[IP, SP], &[IP, SP], true);
    assert!(!instr.writes_register(SP));
    assert!(instr.writes_register(IP));
}

#[test]
fn test_push_like_update_folds() {
    let instr = record(&[SP], &[SP], false);
    assert!(!instr.writes_register(SP));
    assert_eq!(instr.num_reg_ops, 1);
}

#[test]
fn test_variable_offset_update_keeps_dependency() {
    // sp = other: not a branch, no memory operand, reads a general register.
    let trace = InstrBuilder::new(0x10).dst(SP).src(OTHER).build();
    let instr = InstrRecord::new(1, &trace);
    assert!(!instr.is_branch);
    assert!(instr.writes_register(SP));
    assert_eq!(instr.num_reg_ops, 2);
}

#[test]
fn test_sp_update_flagged_as_branch_folds() {
    let instr = record(&[SP], &[SP, OTHER], false);
    assert!(instr.is_branch);
    assert!(!instr.writes_register(SP));
    assert_eq!(instr.num_reg_ops, 2);
}

#[test]
fn test_memory_update_of_sp_folds() {
    let trace = InstrBuilder::new(0x10).dst(SP).src(SP).src(OTHER).load(0x8000).build();
    let instr = InstrRecord::new(1, &trace);
    assert!(!instr.writes_register(SP));
}

// ══════════════════════════════════════════════════════════
// 3. Operands and initial state
// ══════════════════════════════════════════════════════════

#[test]
fn test_operand_counts() {
    let trace = InstrBuilder::new(0x10)
        .dst(1)
        .src(2)
        .src(3)
        .store(0x100)
        .load(0x200)
        .load(0x300)
        .build();
    let instr = InstrRecord::new(3, &trace);
    assert_eq!(instr.instr_id, 3);
    assert_eq!(instr.num_reg_ops, 3);
    assert_eq!(instr.num_mem_ops, 3);
    assert!(instr.is_memory);
    assert!(instr.writes_memory(0x100));
    assert!(!instr.writes_memory(0x200));
    assert!(!instr.writes_memory(0), "slot value 0 is never an address");
    assert_eq!(instr.executed, Progress::NotStarted);
    assert_eq!(instr.translated, Progress::NotStarted);
}

#[test]
fn test_strip_registers() {
    let trace = InstrBuilder::new(0x10).dst(1).src(2).build();
    let mut instr = InstrRecord::new(0, &trace);
    instr.strip_registers();
    assert_eq!(instr.num_reg_ops, 0);
    assert!(!instr.writes_register(1));
    assert_eq!(instr.source_registers, [0; 4]);
}

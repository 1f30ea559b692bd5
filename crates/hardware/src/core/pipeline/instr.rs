//! Instruction records.
//!
//! An instruction enters the core as a [`TraceInstr`] read from an instruction
//! source and becomes an [`InstrRecord`] at fetch. The record is owned by exactly
//! one stage buffer or the ROB at a time and carries:
//! 1. **Operands:** Source/destination register ids and memory virtual addresses.
//! 2. **Branch Metadata:** Classification, actual target and misprediction flag.
//! 3. **Progress Flags:** `translated`, `fetched`, `decoded`, `scheduled`, `executed`.
//! 4. **Dependency Edges:** Handles of ROB entries waiting on this one's registers or
//!    memory writes, and handles of its own load/store queue entries.

use crate::common::constants::{
    NUM_INSTR_DESTINATIONS, NUM_INSTR_SOURCES, REG_FLAGS, REG_INSTRUCTION_POINTER,
    REG_STACK_POINTER,
};
use crate::core::pipeline::lsq::LsqHandle;
use crate::core::pipeline::rob::RobHandle;

/// Progress of one pipeline activity for an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum Progress {
    /// Not started.
    #[default]
    NotStarted,
    /// Issued and waiting on a latency or an outstanding request.
    InFlight,
    /// Finished.
    Completed,
}

/// Branch classification derived from register usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum BranchType {
    /// Not a branch.
    #[default]
    NotBranch,
    /// Unconditional jump to an encoded target.
    DirectJump,
    /// Jump through a register.
    Indirect,
    /// Flag-dependent branch.
    Conditional,
    /// Call to an encoded target.
    DirectCall,
    /// Call through a register.
    IndirectCall,
    /// Return.
    Return,
    /// Writes the instruction pointer but fits no other class.
    Other,
}

impl BranchType {
    /// Number of branch classes, including `NotBranch`.
    pub const COUNT: usize = 8;

    /// All classes in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::NotBranch,
        Self::DirectJump,
        Self::Indirect,
        Self::Conditional,
        Self::DirectCall,
        Self::IndirectCall,
        Self::Return,
        Self::Other,
    ];

    /// Returns the index of this class for per-type statistics.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns true for classes whose target is known at decode.
    pub const fn resolves_at_decode(self) -> bool {
        matches!(self, Self::DirectJump | Self::DirectCall)
    }

    /// Short label used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotBranch => "not_branch",
            Self::DirectJump => "direct_jump",
            Self::Indirect => "indirect",
            Self::Conditional => "conditional",
            Self::DirectCall => "direct_call",
            Self::IndirectCall => "indirect_call",
            Self::Return => "return",
            Self::Other => "other",
        }
    }
}

/// One instruction as delivered by an instruction source.
///
/// Register id 0 and memory address 0 mean "unused slot". `branch_target` is the
/// address of the next instruction when the branch was taken; sources fill it by
/// looking one instruction ahead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceInstr {
    /// Program counter.
    pub ip: u64,
    /// Trace-level branch marker.
    pub is_branch: bool,
    /// Branch outcome recorded in the trace.
    pub branch_taken: bool,
    /// Actual target of a taken branch.
    pub branch_target: u64,
    /// Destination register ids.
    pub destination_registers: [u8; NUM_INSTR_DESTINATIONS],
    /// Source register ids.
    pub source_registers: [u8; NUM_INSTR_SOURCES],
    /// Destination (store) memory addresses.
    pub destination_memory: [u64; NUM_INSTR_DESTINATIONS],
    /// Source (load) memory addresses.
    pub source_memory: [u64; NUM_INSTR_SOURCES],
}

/// An in-flight instruction.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Default)]
pub struct InstrRecord {
    /// Unique, monotonically increasing sequence id.
    pub instr_id: u64,
    /// Program counter.
    pub ip: u64,
    /// Cycle at which the current activity finishes.
    pub event_cycle: u64,

    /// Whether the instruction is a branch.
    pub is_branch: bool,
    /// Whether the branch was taken.
    pub branch_taken: bool,
    /// Branch class.
    pub branch_type: BranchType,
    /// Actual target; 0 unless a taken branch.
    pub branch_target: u64,
    /// Set at fetch when the predicted target disagreed and warmup is over.
    pub branch_mispredicted: bool,

    /// Instruction address translation.
    pub translated: Progress,
    /// Instruction bytes fetch.
    pub fetched: Progress,
    /// Decode.
    pub decoded: Progress,
    /// Register (and, for memory instructions, address) scheduling.
    pub scheduled: Progress,
    /// Execution.
    pub executed: Progress,

    /// Physical address of the instruction bytes.
    pub instruction_pa: u64,

    /// Destination register ids.
    pub destination_registers: [u8; NUM_INSTR_DESTINATIONS],
    /// Source register ids.
    pub source_registers: [u8; NUM_INSTR_SOURCES],
    /// Destination memory virtual addresses.
    pub destination_memory: [u64; NUM_INSTR_DESTINATIONS],
    /// Source memory virtual addresses.
    pub source_memory: [u64; NUM_INSTR_SOURCES],
    /// Physical address each source operand was finally read from.
    pub source_physical: [u64; NUM_INSTR_SOURCES],

    /// Source operands admitted to the load queue.
    pub source_added: [bool; NUM_INSTR_SOURCES],
    /// Destination operands admitted to the store queue.
    pub destination_added: [bool; NUM_INSTR_DESTINATIONS],
    /// Load queue entries of the source operands.
    pub lq_index: [Option<LsqHandle>; NUM_INSTR_SOURCES],
    /// Store queue entries of the destination operands.
    pub sq_index: [Option<LsqHandle>; NUM_INSTR_DESTINATIONS],

    /// Register operands in use.
    pub num_reg_ops: usize,
    /// Memory operands not yet satisfied.
    pub num_mem_ops: usize,
    /// Producers this instruction still waits on.
    pub num_reg_dependent: usize,
    /// Whether the instruction has any memory operand.
    pub is_memory: bool,

    /// Consumers of this instruction's destination registers.
    pub registers_instrs_depend_on_me: Vec<RobHandle>,
    /// Loads that read an address this instruction writes.
    pub memory_instrs_depend_on_me: Vec<RobHandle>,
}

impl InstrRecord {
    /// Builds a record from a trace instruction: counts operands, classifies the
    /// branch, clears the target of non-taken branches and folds stack-pointer
    /// updates.
    pub fn new(instr_id: u64, trace: &TraceInstr) -> Self {
        let mut instr = Self {
            instr_id,
            ip: trace.ip,
            is_branch: trace.is_branch,
            branch_taken: trace.branch_taken,
            branch_target: trace.branch_target,
            destination_registers: trace.destination_registers,
            source_registers: trace.source_registers,
            destination_memory: trace.destination_memory,
            source_memory: trace.source_memory,
            ..Self::default()
        };

        let writes_sp = instr.destination_registers.contains(&REG_STACK_POINTER);
        let writes_ip = instr.destination_registers.contains(&REG_INSTRUCTION_POINTER);
        let reads_sp = instr.source_registers.contains(&REG_STACK_POINTER);
        let reads_flags = instr.source_registers.contains(&REG_FLAGS);
        let reads_ip = instr.source_registers.contains(&REG_INSTRUCTION_POINTER);
        let reads_other = instr.source_registers.iter().any(|&r| {
            r != 0 && r != REG_STACK_POINTER && r != REG_FLAGS && r != REG_INSTRUCTION_POINTER
        });

        instr.num_reg_ops = instr.destination_registers.iter().filter(|&&r| r != 0).count()
            + instr.source_registers.iter().filter(|&&r| r != 0).count();
        instr.num_mem_ops = instr.destination_memory.iter().filter(|&&a| a != 0).count()
            + instr.source_memory.iter().filter(|&&a| a != 0).count();
        instr.is_memory = instr.num_mem_ops > 0;

        let classified = classify(writes_sp, writes_ip, reads_sp, reads_flags, reads_ip, reads_other);
        if let Some((branch_type, always_taken)) = classified {
            instr.is_branch = true;
            instr.branch_type = branch_type;
            if always_taken {
                instr.branch_taken = true;
            }
        }

        if !instr.is_branch || !instr.branch_taken {
            instr.branch_target = 0;
        }

        // SP writes by branches, memory operations and SP-only arithmetic are
        // folded. A plain update that reads a general register keeps it.
        if writes_sp && (instr.is_branch || instr.num_mem_ops > 0 || !reads_other) {
            for reg in &mut instr.destination_registers {
                if *reg == REG_STACK_POINTER {
                    *reg = 0;
                    instr.num_reg_ops -= 1;
                }
            }
        }

        instr
    }

    /// Removes every register operand. Used during warmup.
    pub fn strip_registers(&mut self) {
        self.source_registers = [0; NUM_INSTR_SOURCES];
        self.destination_registers = [0; NUM_INSTR_DESTINATIONS];
        self.num_reg_ops = 0;
    }

    /// Returns true if `reg` is one of this instruction's destination registers.
    pub fn writes_register(&self, reg: u8) -> bool {
        reg != 0 && self.destination_registers.contains(&reg)
    }

    /// Returns true if this instruction stores to `vaddr`.
    pub fn writes_memory(&self, vaddr: u64) -> bool {
        vaddr != 0 && self.destination_memory.contains(&vaddr)
    }
}

/// Classifies a branch from its register reads and writes.
///
/// Returns the class and whether the class is unconditionally taken. Conditional
/// and unclassified branches keep the trace's outcome.
#[allow(clippy::fn_params_excessive_bools)]
const fn classify(
    writes_sp: bool,
    writes_ip: bool,
    reads_sp: bool,
    reads_flags: bool,
    reads_ip: bool,
    reads_other: bool,
) -> Option<(BranchType, bool)> {
    if !writes_ip {
        return None;
    }
    let class = if !reads_sp && !reads_flags && !reads_other {
        (BranchType::DirectJump, true)
    } else if !reads_sp && !reads_flags && reads_other {
        (BranchType::Indirect, true)
    } else if !reads_sp && reads_ip && !writes_sp && reads_flags && !reads_other {
        (BranchType::Conditional, false)
    } else if reads_sp && reads_ip && writes_sp && !reads_flags && !reads_other {
        (BranchType::DirectCall, true)
    } else if reads_sp && reads_ip && writes_sp && !reads_flags && reads_other {
        (BranchType::IndirectCall, true)
    } else if reads_sp && !reads_ip && writes_sp {
        (BranchType::Return, true)
    } else {
        (BranchType::Other, false)
    };
    Some(class)
}

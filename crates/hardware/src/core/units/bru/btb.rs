//! Branch Target Buffer (BTB).
//!
//! The BTB is a direct-mapped table that stores target addresses for control flow
//! instructions, together with a bit recording whether the branch has ever been
//! seen not taken. It lets fetch name a target before the instruction is decoded.

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Debug, Default)]
struct BtbEntry {
    /// Full program counter, used as the tag.
    tag: u64,
    /// The predicted target address.
    target: u64,
    /// Cleared the first time the branch falls through.
    always_taken: bool,
    /// Indicates if this entry contains valid data.
    valid: bool,
}

/// Branch Target Buffer structure.
#[derive(Clone, Debug)]
pub struct Btb {
    /// The table of BTB entries.
    table: Vec<BtbEntry>,
}

impl Btb {
    /// Creates a new Branch Target Buffer with the specified number of entries.
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![BtbEntry::default(); size.max(1)],
        }
    }

    /// Calculates the index into the BTB table for a given program counter.
    fn index(&self, pc: u64) -> usize {
        ((pc ^ (pc >> 12)) % self.table.len() as u64) as usize
    }

    /// Looks up a target address and the always-taken bit for `pc`.
    pub fn lookup(&self, pc: u64) -> Option<(u64, bool)> {
        let e = self.table[self.index(pc)];
        if e.valid && e.tag == pc {
            Some((e.target, e.always_taken))
        } else {
            None
        }
    }

    /// Records a resolved branch.
    ///
    /// Taken branches install or refresh their target. A not-taken outcome keeps
    /// the stored target and clears the always-taken bit.
    pub fn update(&mut self, pc: u64, target: u64, taken: bool) {
        let idx = self.index(pc);
        let e = &mut self.table[idx];
        if e.valid && e.tag == pc {
            if taken {
                e.target = target;
            } else {
                e.always_taken = false;
            }
        } else if taken {
            *e = BtbEntry {
                tag: pc,
                target,
                always_taken: true,
                valid: true,
            };
        }
    }
}

//! Store-address disambiguation ring (STA).
//!
//! Every destination memory operand pushes its instruction id here at fetch, in
//! program order. A store may enter the store queue only while its id is at the
//! head, so store addresses resolve strictly in program order. Entries are
//! consumed head-first exactly once.

/// Fixed-size circular record of in-flight store instruction ids.
#[derive(Clone, Debug)]
pub struct StoreAddressRing {
    entries: Vec<Option<u64>>,
    head: usize,
    tail: usize,
    count: usize,
}

impl StoreAddressRing {
    /// Creates an empty ring.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the number of pending store operands.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no store is pending.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Records a store operand of `instr_id` at the tail.
    ///
    /// # Panics
    ///
    /// Panics on overflow. The ring is sized for every store slot that can be in
    /// flight between fetch and retirement, so overflow is a sizing defect.
    pub fn push(&mut self, instr_id: u64) {
        assert!(
            self.count < self.entries.len(),
            "store-address ring overflow at instr {instr_id}"
        );
        self.entries[self.tail] = Some(instr_id);
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
    }

    /// Returns the id of the oldest undisambiguated store operand.
    #[inline]
    pub fn head(&self) -> Option<u64> {
        if self.count == 0 { None } else { self.entries[self.head] }
    }

    /// Consumes the head entry.
    ///
    /// # Panics
    ///
    /// Panics if the head does not belong to `instr_id`.
    pub fn pop(&mut self, instr_id: u64) {
        assert_eq!(
            self.head(),
            Some(instr_id),
            "store-address ring head consumed out of order"
        );
        self.entries[self.head] = None;
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
    }
}

//! Decoded-Instruction Buffer (DIB).
//!
//! A small set-associative cache of recently decoded instruction windows, used
//! like a micro-op cache: fetch-buffer entries that hit skip translation, fetch
//! and decode. Each way holds a `(valid, address, lru)` triple.
//!
//! # Replacement
//!
//! Rank 0 is most recently used. Promoting a way ages every way ranked more
//! recently than it by one step, so ranks stay a permutation among valid ways.
//! Invalid ways carry the maximum rank and are therefore chosen as victims
//! first, lowest way index winning ties.

/// One DIB way.
#[derive(Clone, Copy, Debug)]
struct DibWay {
    valid: bool,
    address: u64,
    lru: usize,
}

impl Default for DibWay {
    fn default() -> Self {
        Self {
            valid: false,
            address: 0,
            lru: usize::MAX,
        }
    }
}

/// Decoded-instruction buffer.
#[derive(Clone, Debug)]
pub struct Dib {
    sets: Vec<Vec<DibWay>>,
    window_bits: u32,
}

impl Dib {
    /// Creates an empty DIB.
    pub fn new(sets: usize, ways: usize, window_bits: u32) -> Self {
        Self {
            sets: vec![vec![DibWay::default(); ways]; sets],
            window_bits,
        }
    }

    /// Set index for `addr`.
    #[inline]
    fn set_index(&self, addr: u64) -> usize {
        ((addr >> self.window_bits) % self.sets.len() as u64) as usize
    }

    /// Way holding the window of `addr`, if any.
    fn find_way(&self, set: usize, addr: u64) -> Option<usize> {
        let window = addr >> self.window_bits;
        self.sets[set]
            .iter()
            .position(|w| w.valid && (w.address >> self.window_bits) == window)
    }

    /// Makes `way` the most recently used way of `set`.
    fn promote(&mut self, set: usize, way: usize) {
        let rank = self.sets[set][way].lru;
        for w in &mut self.sets[set] {
            if w.lru < rank {
                w.lru += 1;
            }
        }
        self.sets[set][way].lru = 0;
    }

    /// Checks whether the window of `addr` was recently decoded; a hit is promoted.
    pub fn lookup(&mut self, addr: u64) -> bool {
        let set = self.set_index(addr);
        match self.find_way(set, addr) {
            Some(way) => {
                self.promote(set, way);
                true
            }
            None => false,
        }
    }

    /// Returns true if the window of `addr` is present, without touching replacement state.
    pub fn contains(&self, addr: u64) -> bool {
        self.find_way(self.set_index(addr), addr).is_some()
    }

    /// Records a decoded instruction: installs its window over the LRU way on a
    /// miss, then promotes it.
    pub fn update(&mut self, addr: u64) {
        let set = self.set_index(addr);
        let way = match self.find_way(set, addr) {
            Some(way) => way,
            None => {
                let victim = self.victim(set);
                let w = &mut self.sets[set][victim];
                w.valid = true;
                w.address = addr;
                victim
            }
        };
        self.promote(set, way);
    }

    /// Least recently used way; the first one on ties.
    fn victim(&self, set: usize) -> usize {
        let mut victim = 0;
        for (i, w) in self.sets[set].iter().enumerate() {
            if w.lru > self.sets[set][victim].lru {
                victim = i;
            }
        }
        victim
    }
}

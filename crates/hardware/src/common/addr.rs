//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses to prevent
//! accidental mixing of address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Address Manipulation:** Page numbers, page alignment and bit splicing.
//! 3. **Translator Integration:** The input and output types of every translation policy.

use super::constants::{LOG2_PAGE_SIZE, PAGE_SIZE};

/// A virtual address as seen by the traced program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address produced by a translation policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Returns the virtual page number.
    #[inline(always)]
    pub const fn page(&self) -> u64 {
        self.0 >> LOG2_PAGE_SIZE
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }
}

/// Returns a mask with the low `bits` bits set.
#[inline(always)]
pub const fn bitmask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

/// Combines the bits of `upper` above position `bits` with the low `bits` bits of `lower`.
///
/// Used to place a page or block offset onto a translated frame address.
#[inline(always)]
pub const fn splice_bits(upper: u64, lower: u64, bits: u32) -> u64 {
    let mask = bitmask(bits);
    (upper & !mask) | (lower & mask)
}

/// Rounds `addr` up to the next page boundary, or `None` past the top of the
/// address space.
#[inline(always)]
pub const fn page_align(addr: u64) -> Option<u64> {
    match addr.checked_add(PAGE_SIZE - 1) {
        Some(a) => Some(a & !(PAGE_SIZE - 1)),
        None => None,
    }
}

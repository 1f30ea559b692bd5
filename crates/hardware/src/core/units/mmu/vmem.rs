//! Random-map virtual memory.
//!
//! Physical pages are handed out lazily, once per `(cpu, virtual page)`, from a
//! pool shuffled with a fixed seed. Random placement keeps the cache hierarchy
//! from seeing artificial address reuse between unrelated virtual pages.
//!
//! Page-table walks are emulated by [`VirtualMemory::get_pte_pa`]: each
//! `(cpu, address range, level)` gets a page-table page on first touch, carved
//! from a cursor that draws a fresh pool page whenever it reaches a page
//! boundary. Once issued, neither mapping ever changes.

use std::collections::{HashMap, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::common::addr::{bitmask, splice_bits};
use crate::common::constants::{LOG2_PAGE_SIZE, PAGE_SIZE, PTE_BYTES, VMEM_RESERVE_CAPACITY};
use crate::common::error::SimError;
use crate::common::{PhysAddr, VirtAddr};

/// Lazily populated random page map plus emulated page tables.
#[derive(Clone, Debug)]
pub struct VirtualMemory {
    vpage_to_ppage: HashMap<(usize, u64), u64>,
    page_table: HashMap<(usize, u64, u32), u64>,
    free_pages: VecDeque<u64>,
    next_pte_page: u64,
    pt_levels: u32,
    pte_page_size: u64,
}

impl VirtualMemory {
    /// Builds the page pool for `capacity` bytes of physical memory.
    ///
    /// The first [`VMEM_RESERVE_CAPACITY`] bytes are never handed out. The
    /// remaining pages are shuffled with `seed`; the first one becomes the
    /// page-table cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `capacity` is not a page multiple,
    /// leaves no page after the reserve, or `pte_page_size` is not a power of two
    /// above 1024.
    pub fn new(capacity: u64, pte_page_size: u64, pt_levels: u32, seed: u64) -> Result<Self, SimError> {
        if capacity % PAGE_SIZE != 0 {
            return Err(SimError::InvalidConfig(format!(
                "physical capacity {capacity:#x} is not a multiple of the page size"
            )));
        }
        if !pte_page_size.is_power_of_two() || pte_page_size <= 1024 {
            return Err(SimError::InvalidConfig(format!(
                "page-table page size {pte_page_size} must be a power of two above 1024"
            )));
        }
        let frames = capacity.saturating_sub(VMEM_RESERVE_CAPACITY) / PAGE_SIZE;
        if frames == 0 {
            return Err(SimError::InvalidConfig(format!(
                "physical capacity {capacity:#x} leaves no pages after the reserve"
            )));
        }

        let mut pages: Vec<u64> = (0..frames).map(|i| VMEM_RESERVE_CAPACITY + i * PAGE_SIZE).collect();
        pages.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut free_pages = VecDeque::from(pages);
        let next_pte_page = free_pages
            .pop_front()
            .ok_or_else(|| SimError::InvalidConfig("empty physical page pool".into()))?;

        debug!(frames, seed, "random page pool built");
        Ok(Self {
            vpage_to_ppage: HashMap::new(),
            page_table: HashMap::new(),
            free_pages,
            next_pte_page,
            pt_levels,
            pte_page_size,
        })
    }

    /// Pages still available for new mappings.
    pub fn free_pages(&self) -> usize {
        self.free_pages.len()
    }

    /// Number of `(cpu, virtual page)` mappings issued so far.
    pub fn mapped_pages(&self) -> usize {
        self.vpage_to_ppage.len()
    }

    /// Emulated page-table depth.
    pub const fn levels(&self) -> u32 {
        self.pt_levels
    }

    /// log2 of the number of PTEs in one page-table page.
    fn index_bits(&self) -> u32 {
        (self.pte_page_size / PTE_BYTES).trailing_zeros()
    }

    /// Shift amount selecting the virtual address bits indexed at `level`.
    pub fn shamt(&self, level: u32) -> u32 {
        LOG2_PAGE_SIZE + self.index_bits() * level
    }

    /// Index of the PTE for `vaddr` inside its level-`level` table.
    pub fn get_offset(&self, vaddr: u64, level: u32) -> u64 {
        let shift = self.shamt(level);
        let index = if shift >= 64 { 0 } else { vaddr >> shift };
        index & bitmask(self.index_bits())
    }

    fn pop_free_page(&mut self, cpu: usize, vaddr: u64) -> Result<u64, SimError> {
        self.free_pages
            .pop_front()
            .ok_or(SimError::PhysicalMemoryExhausted { cpu, vaddr })
    }

    /// Translates `vaddr` for `cpu`, allocating a physical page on first touch.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhysicalMemoryExhausted`] when a new page is needed
    /// and the pool is empty.
    pub fn va_to_pa(&mut self, cpu: usize, vaddr: VirtAddr) -> Result<PhysAddr, SimError> {
        let key = (cpu, vaddr.page());
        let ppage = match self.vpage_to_ppage.get(&key) {
            Some(&ppage) => ppage,
            None => {
                let ppage = self.pop_free_page(cpu, vaddr.val())?;
                let _ = self.vpage_to_ppage.insert(key, ppage);
                ppage
            }
        };
        Ok(PhysAddr::new(splice_bits(ppage, vaddr.val(), LOG2_PAGE_SIZE)))
    }

    /// Physical address of the level-`level` PTE that maps `vaddr` for `cpu`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::PhysicalMemoryExhausted`] when the page-table cursor
    /// needs a fresh page and the pool is empty.
    pub fn get_pte_pa(&mut self, cpu: usize, vaddr: VirtAddr, level: u32) -> Result<PhysAddr, SimError> {
        let upper_shift = self.shamt(level + 1);
        let range = if upper_shift >= 64 { 0 } else { vaddr.val() >> upper_shift };
        let key = (cpu, range, level);

        let table_page = match self.page_table.get(&key) {
            Some(&page) => page,
            None => {
                let page = self.next_pte_page;
                let _ = self.page_table.insert(key, page);
                self.next_pte_page += self.pte_page_size;
                if self.next_pte_page % PAGE_SIZE == 0 {
                    self.next_pte_page = self.pop_free_page(cpu, vaddr.val())?;
                }
                page
            }
        };

        let offset = self.get_offset(vaddr.val(), level) * PTE_BYTES;
        Ok(PhysAddr::new(splice_bits(
            table_page,
            offset,
            self.pte_page_size.trailing_zeros(),
        )))
    }

    /// PTE addresses a walk of `vaddr` touches, from the root level down to level 0.
    ///
    /// # Errors
    ///
    /// Propagates exhaustion from [`VirtualMemory::get_pte_pa`].
    pub fn walk_addresses(&mut self, cpu: usize, vaddr: VirtAddr) -> Result<Vec<PhysAddr>, SimError> {
        (0..self.pt_levels)
            .rev()
            .map(|level| self.get_pte_pa(cpu, vaddr, level))
            .collect()
    }
}

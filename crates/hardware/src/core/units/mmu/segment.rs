//! Flat four-segment direct map.
//!
//! For low-overhead physical-cache experiments the workload's address space is
//! assumed to be four known, bounded regions: code at virtual 0, heap at the
//! conventional PIE heap base, mmap and stack growing down from their usual
//! ceilings. Each region maps by constant offset onto a physical region; the
//! physical regions are laid out contiguously and page-aligned after a
//! reserved area of one byte per physical page.
//!
//! An address outside every region is a sizing error, not a runtime event.

use std::fmt;

use tracing::info;

use crate::common::addr::page_align;
use crate::common::constants::PAGE_SIZE;
use crate::common::error::SimError;
use crate::common::{PhysAddr, VirtAddr};
use crate::config::SegmentSizes;

/// Virtual start of the code region.
pub const CODE_VIRT_START: u64 = 0x0;

/// Virtual start of the heap region.
pub const HEAP_VIRT_START: u64 = 0x5555_5555_4000;

/// Virtual end (exclusive) of the mmap region.
pub const MMAP_VIRT_END: u64 = 0x7fff_f800_0000;

/// Virtual end (exclusive) of the stack region.
pub const STACK_VIRT_END: u64 = 0x7fff_ffff_f000;

/// One region: `[virt_start, virt_end)` maps onto `[phys_start, phys_end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Region name used in reports.
    pub name: &'static str,
    /// First virtual address.
    pub virt_start: u64,
    /// One past the last virtual address.
    pub virt_end: u64,
    /// First physical address.
    pub phys_start: u64,
    /// One past the last physical address.
    pub phys_end: u64,
}

impl Segment {
    fn new(name: &'static str, virt_start: u64, size: u64, phys_start: u64) -> Option<Self> {
        Some(Self {
            name,
            virt_start,
            virt_end: virt_start.checked_add(size)?,
            phys_start,
            phys_end: phys_start.checked_add(size)?,
        })
    }

    /// Returns true if `vaddr` falls in this region.
    #[inline]
    pub const fn contains(&self, vaddr: u64) -> bool {
        vaddr >= self.virt_start && vaddr < self.virt_end
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} [{:#x}-{:#x}] - [{:#x}-{:#x}]",
            self.name, self.virt_start, self.virt_end, self.phys_start, self.phys_end
        )
    }
}

/// The four regions in physical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentLayout {
    /// Code region.
    pub code: Segment,
    /// Heap region.
    pub heap: Segment,
    /// Mmap region.
    pub mmap: Segment,
    /// Stack region.
    pub stack: Segment,
}

impl SegmentLayout {
    /// Computes the layout for `sizes`, placing physical regions after a
    /// reserved area sized for `capacity` bytes of physical memory.
    ///
    /// Returns `None` if a region would end past the top of the address space.
    pub fn new(capacity: u64, sizes: &SegmentSizes) -> Option<Self> {
        let table_bytes = capacity / PAGE_SIZE;
        let code = Segment::new("Code", CODE_VIRT_START, sizes.code, page_align(table_bytes)?)?;
        let heap = Segment::new("Heap", HEAP_VIRT_START, sizes.heap, page_align(code.phys_end)?)?;
        let mmap = Segment::new(
            "Mmap",
            MMAP_VIRT_END.checked_sub(sizes.mmap)?,
            sizes.mmap,
            page_align(heap.phys_end)?,
        )?;
        let stack = Segment::new(
            "Stack",
            STACK_VIRT_END.checked_sub(sizes.stack)?,
            sizes.stack,
            page_align(mmap.phys_end)?,
        )?;
        Some(Self {
            code,
            heap,
            mmap,
            stack,
        })
    }

    /// Regions in lookup order.
    pub const fn segments(&self) -> [&Segment; 4] {
        [&self.code, &self.heap, &self.mmap, &self.stack]
    }
}

impl fmt::Display for SegmentLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

/// Constant-offset translator over a [`SegmentLayout`].
#[derive(Clone, Debug)]
pub struct SegmentMap {
    layout: SegmentLayout,
}

impl SegmentMap {
    /// Builds the map and logs the layout.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when virtual regions overlap or a
    /// region runs past the top of the address space, and
    /// [`SimError::SegmentLayoutOverflow`] when the stack region ends beyond
    /// `capacity`.
    pub fn new(capacity: u64, sizes: &SegmentSizes) -> Result<Self, SimError> {
        let heap_end = HEAP_VIRT_START.checked_add(sizes.heap);
        let mmap_start = MMAP_VIRT_END.checked_sub(sizes.mmap);
        let disjoint = sizes.code <= HEAP_VIRT_START
            && sizes.stack <= STACK_VIRT_END - MMAP_VIRT_END
            && matches!((heap_end, mmap_start), (Some(end), Some(start)) if end <= start);
        if !disjoint {
            return Err(SimError::InvalidConfig(format!(
                "segment sizes {sizes:?} produce overlapping virtual regions"
            )));
        }
        let Some(layout) = SegmentLayout::new(capacity, sizes) else {
            return Err(SimError::InvalidConfig(format!(
                "segment sizes {sizes:?} overflow the physical address space"
            )));
        };
        if layout.stack.phys_end > capacity {
            return Err(SimError::SegmentLayoutOverflow { capacity, layout });
        }
        for seg in layout.segments() {
            info!("{seg}");
        }
        Ok(Self { layout })
    }

    /// Active layout.
    pub const fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Translates `vaddr` by its region's constant offset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnmappedSegmentAddress`], carrying the layout, when
    /// `vaddr` is outside all four regions.
    pub fn va_to_pa(&self, vaddr: VirtAddr) -> Result<PhysAddr, SimError> {
        let va = vaddr.val();
        self.layout
            .segments()
            .into_iter()
            .find(|seg| seg.contains(va))
            .map(|seg| PhysAddr::new(seg.phys_start + (va - seg.virt_start)))
            .ok_or(SimError::UnmappedSegmentAddress {
                vaddr: va,
                layout: self.layout,
            })
    }
}

//! Address translation.
//!
//! Stages never branch on the translation mode. They ask the core's
//! [`Translator`] two things through [`TranslationPolicy`]:
//! 1. **Lookup Requirement:** Whether a translation must travel through the TLB
//!    ports of the memory subsystem before the address can be used.
//! 2. **Translation:** The physical address for a `(cpu, virtual address)` pair,
//!    computed when the lookup completes (or immediately when none is needed).
//!
//! Two policies exist: the random page map with emulated page tables, and the
//! flat four-segment map.

/// Flat four-segment direct map.
pub mod segment;

/// Random-map virtual memory with emulated page-table walks.
pub mod vmem;

use crate::common::error::SimError;
use crate::common::{PhysAddr, VirtAddr};
use crate::config::{TranslationMode, VmemConfig};

use self::segment::SegmentMap;
use self::vmem::VirtualMemory;

/// Translation-and-completion policy seen by the pipeline stages.
pub trait TranslationPolicy {
    /// Returns true if translations must be looked up through the TLB ports.
    fn needs_lookup(&self) -> bool;

    /// Translates `vaddr` for `cpu`.
    ///
    /// # Errors
    ///
    /// Configuration errors (pool exhaustion, unmapped segment address) are fatal.
    fn translate(&mut self, cpu: usize, vaddr: VirtAddr) -> Result<PhysAddr, SimError>;
}

/// Enum wrapper for static dispatch of translation policies, selected once at
/// construction.
#[derive(Clone, Debug)]
pub enum Translator {
    /// Random page map; lookups go through the TLB ports.
    Paged(VirtualMemory),
    /// Flat segment map; translations are immediate.
    Segment(SegmentMap),
}

impl Translator {
    /// Builds the policy named by `config.mode`.
    ///
    /// # Errors
    ///
    /// Returns the construction error of the selected policy.
    pub fn from_config(config: &VmemConfig) -> Result<Self, SimError> {
        match config.mode {
            TranslationMode::Paged => Ok(Self::Paged(VirtualMemory::new(
                config.capacity,
                config.pte_page_size,
                config.levels,
                config.seed,
            )?)),
            TranslationMode::Segment => Ok(Self::Segment(SegmentMap::new(
                config.capacity,
                &config.segments,
            )?)),
        }
    }
}

impl TranslationPolicy for Translator {
    #[inline]
    fn needs_lookup(&self) -> bool {
        matches!(self, Self::Paged(_))
    }

    fn translate(&mut self, cpu: usize, vaddr: VirtAddr) -> Result<PhysAddr, SimError> {
        match self {
            Self::Paged(vmem) => vmem.va_to_pa(cpu, vaddr),
            Self::Segment(map) => map.va_to_pa(vaddr),
        }
    }
}

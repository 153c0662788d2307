//! Physical memory start alignment
//!
//! The base of RAM is rounded down before the linear map is laid out so that
//! it can be covered with the largest efficient mappings:
//! - 4KB granule: a level 1 block (1GB)
//! - 16KB granule: 32 contiguous level 2 blocks (32 x 32MB = 1GB)
//! - 64KB granule: a level 2 block (512MB)
//!
//! Sparse memory with a virtual memmap adds its own requirement: the start of
//! memory must sit on a section boundary. That requirement is about
//! correctness rather than speed, so the wider of the two always wins.

use bootmap_common::PhysAddr;

use crate::config::SparseMemory;
use crate::error::{ConfigurationError, InvariantViolation};
use crate::granule::PageGranule;

/// Minimum alignment for the physical base of memory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemstartAlignment {
    pub granule: PageGranule,
    /// Final alignment shift
    pub shift: u32,
    /// Shift derived from the granule alone
    pub granule_shift: u32,
    /// Section shift imposed by sparse memory, if enabled
    pub section_shift: Option<u32>,
}

impl MemstartAlignment {
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        1 << self.shift
    }

    /// True when sparse memory forced a wider alignment than the granule
    #[inline]
    #[must_use]
    pub const fn is_widened(&self) -> bool {
        self.shift > self.granule_shift
    }

    /// Round a reported memory base down to this alignment.
    #[inline]
    #[must_use]
    pub const fn round_down(&self, base: PhysAddr) -> PhysAddr {
        base.align_down(self.size())
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned(&self, base: PhysAddr) -> bool {
        base.is_aligned(self.size())
    }

    pub const fn verify(&self) -> Result<(), InvariantViolation> {
        if self.shift > self.granule.max_phys_bits() {
            return Err(InvariantViolation::AlignmentTooWide {
                shift: self.shift,
                max: self.granule.max_phys_bits(),
            });
        }
        if self.shift < self.granule_shift {
            return Err(InvariantViolation::AlignmentNarrowed {
                shift: self.shift,
                required: self.granule_shift,
            });
        }
        if let Some(section_shift) = self.section_shift {
            if self.shift < section_shift {
                return Err(InvariantViolation::AlignmentNarrowed {
                    shift: self.shift,
                    required: section_shift,
                });
            }
        }
        Ok(())
    }
}

/// Alignment shift that lets the linear map start with block mappings.
#[must_use]
pub const fn granule_memstart_shift(granule: PageGranule) -> u32 {
    match granule {
        PageGranule::Size4K => granule.pud_shift(),
        PageGranule::Size16K => granule.pmd_shift() + granule.contiguous_pmds().trailing_zeros(),
        PageGranule::Size64K => granule.pmd_shift(),
    }
}

/// Derive the memory start alignment, widened for sparse memory sections.
///
/// A section shift must lie between the page shift and the widest physical
/// address the granule can output.
pub const fn resolve_memstart_alignment(
    granule: PageGranule,
    sparse: SparseMemory,
) -> Result<MemstartAlignment, ConfigurationError> {
    let granule_shift = granule_memstart_shift(granule);
    let section_shift = sparse.section_shift();
    let shift = match section_shift {
        Some(section) if section < granule.page_shift() || section > granule.max_phys_bits() => {
            return Err(ConfigurationError::SectionShiftOutOfRange {
                section_shift: section,
                phys_bits: granule.max_phys_bits(),
            });
        }
        Some(section) if section > granule_shift => section,
        _ => granule_shift,
    };

    Ok(MemstartAlignment {
        granule,
        shift,
        granule_shift,
        section_shift,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootmap_common::memory::page::{SIZE_1G, SIZE_512M};

    #[test]
    fn test_granule_shifts() {
        assert_eq!(granule_memstart_shift(PageGranule::Size4K), 30);
        assert_eq!(granule_memstart_shift(PageGranule::Size16K), 30);
        assert_eq!(granule_memstart_shift(PageGranule::Size64K), 29);
    }

    #[test]
    fn test_flat_memory() {
        let a = resolve_memstart_alignment(PageGranule::Size4K, SparseMemory::Disabled).unwrap();
        assert_eq!(a.size(), SIZE_1G);
        assert!(!a.is_widened());
        assert_eq!(a.section_shift, None);

        let a = resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::Disabled).unwrap();
        assert_eq!(a.size(), SIZE_512M);
    }

    #[test]
    fn test_64k_widened_by_sections() {
        let a = resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::VMEMMAP).unwrap();
        assert_eq!(a.granule_shift, 29);
        assert_eq!(a.shift, 30);
        assert!(a.is_widened());
        assert_eq!(a.verify(), Ok(()));
    }

    #[test]
    fn test_never_below_section_shift() {
        for g in PageGranule::ALL {
            for section_shift in g.page_shift()..=g.max_phys_bits() {
                let a = resolve_memstart_alignment(g, SparseMemory::Vmemmap { section_shift }).unwrap();
                assert!(a.shift >= section_shift);
                assert!(a.shift >= granule_memstart_shift(g));
                assert_eq!(a.verify(), Ok(()));
            }
        }
    }

    #[test]
    fn test_small_sections_do_not_narrow() {
        let a = resolve_memstart_alignment(
            PageGranule::Size4K,
            SparseMemory::Vmemmap { section_shift: 27 },
        )
        .unwrap();
        assert_eq!(a.shift, 30);
        assert!(!a.is_widened());
    }

    #[test]
    fn test_round_down() {
        let a = resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::Disabled).unwrap();
        assert_eq!(a.round_down(PhysAddr::new(0x8_2345_6789)), PhysAddr::new(0x8_2000_0000));
        assert!(a.is_aligned(PhysAddr::new(0x8_2000_0000)));
        assert!(!a.is_aligned(PhysAddr::new(0x8_1000_0000)));
    }

    #[test]
    fn test_verify_catches_narrowing() {
        let mut a = resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::VMEMMAP).unwrap();
        a.shift = 29;
        assert_eq!(
            a.verify(),
            Err(InvariantViolation::AlignmentNarrowed {
                shift: 29,
                required: 30,
            })
        );
    }

    #[test]
    fn test_section_shift_out_of_range() {
        assert_eq!(
            resolve_memstart_alignment(PageGranule::Size4K, SparseMemory::Vmemmap { section_shift: 64 }),
            Err(ConfigurationError::SectionShiftOutOfRange {
                section_shift: 64,
                phys_bits: 48,
            })
        );
        assert!(
            resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::Vmemmap { section_shift: 53 })
                .is_err()
        );
        assert!(
            resolve_memstart_alignment(PageGranule::Size16K, SparseMemory::Vmemmap { section_shift: 13 })
                .is_err()
        );
        assert!(
            resolve_memstart_alignment(PageGranule::Size64K, SparseMemory::Vmemmap { section_shift: 52 })
                .is_ok()
        );
    }

    #[test]
    fn test_verify_catches_oversized_shift() {
        let mut a = resolve_memstart_alignment(PageGranule::Size4K, SparseMemory::Disabled).unwrap();
        a.shift = 64;
        assert_eq!(
            a.verify(),
            Err(InvariantViolation::AlignmentTooWide { shift: 64, max: 48 })
        );
    }
}

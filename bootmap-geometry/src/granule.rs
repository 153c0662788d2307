//! Translation granule
//!
//! The granule fixes every other shift in the hierarchy. A table occupies
//! exactly one page and holds 8-byte descriptors, so each level resolves
//! `page_shift - 3` bits of the address:
//!
//! ```text
//! granule   bits/level   L3 (page)   L2 (PMD)   L1 (PUD)   L0 (PGD)
//!   4K          9          4K          2M          1G        512G
//!  16K         11         16K         32M         64G        128T
//!  64K         13         64K        512M          4T          -
//! ```

use core::fmt;

use bootmap_common::memory::page::{
    SHIFT_4K, SHIFT_16K, SHIFT_64K, SIZE_4K, SIZE_16K, SIZE_64K,
};

use crate::error::ConfigurationError;

/// Number of hardware levels in a full 4-level hierarchy
pub const MAX_LEVELS: u32 = 4;

/// Widest virtual address supported by any granule
pub const MAX_VA_BITS: u32 = 48;

/// Narrowest virtual address width accepted in a configuration
pub const MIN_VA_BITS: u32 = 36;

/// Narrowest physical address range an implementation can report
pub const MIN_PHYS_BITS: u32 = 32;

/// Hardware page granule in effect for a build
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PageGranule {
    /// 4KB pages, 2MB sections
    #[default]
    Size4K,
    /// 16KB pages, 32MB sections
    Size16K,
    /// 64KB pages, 512MB sections
    Size64K,
}

impl PageGranule {
    /// All supported granules, smallest first
    pub const ALL: [Self; 3] = [Self::Size4K, Self::Size16K, Self::Size64K];

    /// Look up a granule by page size in bytes.
    pub const fn from_size(size: u64) -> Result<Self, ConfigurationError> {
        match size {
            SIZE_4K => Ok(Self::Size4K),
            SIZE_16K => Ok(Self::Size16K),
            SIZE_64K => Ok(Self::Size64K),
            _ => Err(ConfigurationError::UnsupportedGranule(size)),
        }
    }

    #[inline]
    #[must_use]
    pub const fn page_shift(self) -> u32 {
        match self {
            Self::Size4K => SHIFT_4K,
            Self::Size16K => SHIFT_16K,
            Self::Size64K => SHIFT_64K,
        }
    }

    #[inline]
    #[must_use]
    pub const fn page_size(self) -> u64 {
        1 << self.page_shift()
    }

    /// Address bits resolved by one table level
    #[inline]
    #[must_use]
    pub const fn bits_per_level(self) -> u32 {
        self.page_shift() - 3
    }

    /// Descriptors in one table
    #[inline]
    #[must_use]
    pub const fn entries_per_table(self) -> u64 {
        1 << self.bits_per_level()
    }

    /// Shift of the region mapped by one entry at hardware level `level`.
    ///
    /// Levels are numbered as in a 4-level walk: 3 is the leaf, 0 the root.
    #[inline]
    const fn level_shift(self, level: u32) -> u32 {
        debug_assert!(level < MAX_LEVELS);
        self.bits_per_level() * (MAX_LEVELS - level) + 3
    }

    /// Level 2 entry shift (section size)
    #[inline]
    #[must_use]
    pub const fn pmd_shift(self) -> u32 {
        self.level_shift(2)
    }

    /// Level 1 entry shift
    #[inline]
    #[must_use]
    pub const fn pud_shift(self) -> u32 {
        self.level_shift(1)
    }

    /// Size of a section (level 2 block) mapping
    #[inline]
    #[must_use]
    pub const fn section_size(self) -> u64 {
        1 << self.pmd_shift()
    }

    /// Number of adjacent level 2 entries covered by the contiguous hint
    #[inline]
    #[must_use]
    pub const fn contiguous_pmds(self) -> u64 {
        match self {
            Self::Size4K => 16,
            Self::Size16K => 32,
            Self::Size64K => 1,
        }
    }

    /// Widest physical address this granule can output.
    ///
    /// Only the 64KB granule carries the 52-bit large physical address
    /// extension.
    #[inline]
    #[must_use]
    pub const fn max_phys_bits(self) -> u32 {
        match self {
            Self::Size4K | Self::Size16K => 48,
            Self::Size64K => 52,
        }
    }
}

impl TryFrom<u64> for PageGranule {
    type Error = ConfigurationError;

    fn try_from(size: u64) -> Result<Self, Self::Error> {
        Self::from_size(size)
    }
}

impl fmt::Display for PageGranule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size4K => write!(f, "4K"),
            Self::Size16K => write!(f, "16K"),
            Self::Size64K => write!(f, "64K"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootmap_common::memory::page::{SIZE_1G, SIZE_2M, SIZE_32M, SIZE_512M};

    #[test]
    fn test_from_size() {
        assert_eq!(PageGranule::from_size(4096), Ok(PageGranule::Size4K));
        assert_eq!(PageGranule::from_size(16384), Ok(PageGranule::Size16K));
        assert_eq!(PageGranule::try_from(65536), Ok(PageGranule::Size64K));
        assert_eq!(
            PageGranule::from_size(8192),
            Err(ConfigurationError::UnsupportedGranule(8192))
        );
        assert_eq!(
            PageGranule::try_from(0),
            Err(ConfigurationError::UnsupportedGranule(0))
        );
    }

    #[test]
    fn test_section_sizes() {
        assert_eq!(PageGranule::Size4K.section_size(), SIZE_2M);
        assert_eq!(PageGranule::Size16K.section_size(), SIZE_32M);
        assert_eq!(PageGranule::Size64K.section_size(), SIZE_512M);
    }

    #[test]
    fn test_level_shifts_4k() {
        let g = PageGranule::Size4K;
        assert_eq!(g.level_shift(3), 12);
        assert_eq!(g.pmd_shift(), 21);
        assert_eq!(g.pud_shift(), 30);
        assert_eq!(g.level_shift(0), 39);
        assert_eq!(1u64 << g.pud_shift(), SIZE_1G);
        assert_eq!(g.entries_per_table(), 512);
    }

    #[test]
    fn test_leaf_shift_is_page_shift() {
        for g in PageGranule::ALL {
            assert_eq!(g.level_shift(3), g.page_shift());
            assert_eq!(g.page_size(), 1 << g.page_shift());
        }
    }
}

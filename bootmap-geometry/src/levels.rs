//! Translation depth
//!
//! How many table levels a walk needs to resolve a given number of address
//! bits. The leaf level resolves `page_shift` bits of offset and every level
//! above it adds `page_shift - 3`, so
//!
//! ```text
//! levels(bits) = ceil((bits - page_shift) / (page_shift - 3))
//!              = (bits - 4) / (page_shift - 3)
//! ```

use crate::error::ConfigurationError;
use crate::granule::{MAX_VA_BITS, MIN_PHYS_BITS, PageGranule};

/// Level arithmetic for one granule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslationLevels {
    granule: PageGranule,
}

impl TranslationLevels {
    #[inline]
    pub const fn new(granule: PageGranule) -> Self {
        Self { granule }
    }

    #[inline]
    pub const fn granule(&self) -> PageGranule {
        self.granule
    }

    /// Levels needed to walk the widest supported virtual address.
    #[inline]
    #[must_use]
    pub const fn total_levels(&self) -> u32 {
        Self::levels_for_bits(self.granule, MAX_VA_BITS)
    }

    /// Levels needed to address `phys_bits` bits of physical address space.
    pub const fn hw_levels(&self, phys_bits: u32) -> Result<u32, ConfigurationError> {
        let max = self.granule.max_phys_bits();
        if phys_bits > max {
            return Err(ConfigurationError::PhysBitsTooLarge {
                granule: self.granule,
                phys_bits,
                max,
            });
        }
        if phys_bits < MIN_PHYS_BITS {
            return Err(ConfigurationError::PhysBitsTooSmall {
                granule: self.granule,
                phys_bits,
            });
        }
        Ok(Self::levels_for_bits(self.granule, phys_bits))
    }

    /// Bits a walk of `levels` levels can resolve, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn reach(&self, levels: u32) -> u32 {
        levels
            .saturating_mul(self.granule.bits_per_level())
            .saturating_add(self.granule.page_shift())
    }

    const fn levels_for_bits(granule: PageGranule, bits: u32) -> u32 {
        (bits - 4) / granule.bits_per_level()
    }
}

/// Levels needed to cover the full supported virtual range for `granule`.
#[inline]
#[must_use]
pub const fn levels_for_granule(granule: PageGranule) -> u32 {
    TranslationLevels::new(granule).total_levels()
}

/// Levels needed to reach `phys_bits` bits of physical address space.
///
/// Fails if the width is beyond what the granule can output, or narrower than
/// the smallest physical range the architecture defines.
pub const fn levels_for_physical_width(
    granule: PageGranule,
    phys_bits: u32,
) -> Result<u32, ConfigurationError> {
    TranslationLevels::new(granule).hw_levels(phys_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_for_granule() {
        assert_eq!(levels_for_granule(PageGranule::Size4K), 4);
        assert_eq!(levels_for_granule(PageGranule::Size16K), 4);
        assert_eq!(levels_for_granule(PageGranule::Size64K), 3);
    }

    #[test]
    fn test_known_widths() {
        // 39-bit VA with 4K pages is the classic 3-level layout
        assert_eq!(levels_for_physical_width(PageGranule::Size4K, 39), Ok(3));
        assert_eq!(levels_for_physical_width(PageGranule::Size4K, 40), Ok(4));
        assert_eq!(levels_for_physical_width(PageGranule::Size16K, 47), Ok(3));
        assert_eq!(levels_for_physical_width(PageGranule::Size16K, 36), Ok(2));
        assert_eq!(levels_for_physical_width(PageGranule::Size64K, 42), Ok(2));
        assert_eq!(levels_for_physical_width(PageGranule::Size64K, 52), Ok(3));
    }

    #[test]
    fn test_monotonic_in_phys_bits() {
        for g in PageGranule::ALL {
            let mut prev = 0;
            for bits in MIN_PHYS_BITS..=g.max_phys_bits() {
                let levels = levels_for_physical_width(g, bits).unwrap();
                assert!(levels >= prev, "{} granule: {} bits went from {} to {}", g, bits, prev, levels);
                prev = levels;
            }
        }
    }

    #[test]
    fn test_never_under_provisioned() {
        for g in PageGranule::ALL {
            let t = TranslationLevels::new(g);
            for bits in MIN_PHYS_BITS..=g.max_phys_bits() {
                let levels = t.hw_levels(bits).unwrap();
                assert!(t.reach(levels) >= bits);
                // and one level fewer would not have been enough
                assert!(t.reach(levels - 1) < bits);
            }
        }
    }

    #[test]
    fn test_max_boundary() {
        for g in PageGranule::ALL {
            let max = g.max_phys_bits();
            assert!(levels_for_physical_width(g, max).is_ok());
            assert_eq!(
                levels_for_physical_width(g, max + 1),
                Err(ConfigurationError::PhysBitsTooLarge {
                    granule: g,
                    phys_bits: max + 1,
                    max,
                })
            );
        }
    }

    #[test]
    fn test_too_narrow() {
        assert!(matches!(
            levels_for_physical_width(PageGranule::Size64K, 16),
            Err(ConfigurationError::PhysBitsTooSmall { .. })
        ));
        assert!(levels_for_physical_width(PageGranule::Size4K, MIN_PHYS_BITS - 1).is_err());
        // every granule needs at least two levels at the minimum width
        for g in PageGranule::ALL {
            assert!(levels_for_physical_width(g, MIN_PHYS_BITS).unwrap() >= 2);
        }
    }

    #[test]
    fn test_reach_saturates() {
        let t = TranslationLevels::new(PageGranule::Size64K);
        assert_eq!(t.reach(0), 16);
        assert_eq!(t.reach(3), 55);
        assert_eq!(t.reach(u32::MAX), u32::MAX);
    }
}

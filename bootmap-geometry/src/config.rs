//! Resolver configuration
//!
//! Every input the resolver reads lives in one immutable [`GeometryConfig`]
//! passed explicitly to each derivation. [`GeometryConfig::BUILD`] is the
//! value selected by this crate's Cargo features; any other value can be
//! built for tests or for tooling that reasons about other targets.

use crate::error::ConfigurationError;
use crate::granule::{MAX_VA_BITS, MIN_VA_BITS, PageGranule};
use crate::levels::TranslationLevels;

/// Section shift used by sparse memory when none is given (1GB sections)
pub const DEFAULT_SECTION_SHIFT: u32 = 30;

/// Default physical address width before clamping to the granule maximum
pub const DEFAULT_PHYS_BITS: u32 = 48;

/// Sparse memory model in effect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SparseMemory {
    /// Flat or non-vmemmap memory model; no extra alignment constraint
    #[default]
    Disabled,
    /// Sparse memory with a virtually mapped memmap
    Vmemmap {
        /// log2 of the memory section size
        section_shift: u32,
    },
}

impl SparseMemory {
    /// Vmemmap with the default 1GB sections
    pub const VMEMMAP: Self = Self::Vmemmap {
        section_shift: DEFAULT_SECTION_SHIFT,
    };

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Vmemmap { .. })
    }

    #[inline]
    #[must_use]
    pub const fn section_shift(&self) -> Option<u32> {
        match self {
            Self::Disabled => None,
            Self::Vmemmap { section_shift } => Some(*section_shift),
        }
    }
}

/// How much table storage to reserve for the identity map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IdmapSizing {
    /// Reserve enough to reach the granule's widest physical address, so the
    /// identity map can grow if RAM sits beyond the default VA range
    #[default]
    WorstCase,
    /// Reserve only what the configured physical width needs
    Configured,
}

/// Whether section mappings may be used where the granule permits them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlockMappingPolicy {
    #[default]
    Auto,
    /// Map everything at page granularity
    ForcePages,
}

/// Immutable resolver input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryConfig {
    pub granule: PageGranule,
    /// Virtual address width; selects the configured page table depth
    pub va_bits: u32,
    /// Maximum physical address width present in the system
    pub phys_bits: u32,
    pub sparse: SparseMemory,
    pub idmap_sizing: IdmapSizing,
    pub block_mappings: BlockMappingPolicy,
}

impl GeometryConfig {
    /// Configuration selected by Cargo features
    pub const BUILD: Self = Self::new(build::GRANULE)
        .with_va_bits(build::VA_BITS)
        .with_sparse(build::SPARSE)
        .with_idmap_sizing(build::IDMAP_SIZING)
        .with_block_mappings(build::BLOCK_MAPPINGS);

    /// Defaults for `granule`: 48-bit VA, 48-bit PA (clamped to the granule
    /// maximum), no sparse memory, worst-case identity map, automatic blocks.
    pub const fn new(granule: PageGranule) -> Self {
        let max = granule.max_phys_bits();
        Self {
            granule,
            va_bits: MAX_VA_BITS,
            phys_bits: if DEFAULT_PHYS_BITS < max { DEFAULT_PHYS_BITS } else { max },
            sparse: SparseMemory::Disabled,
            idmap_sizing: IdmapSizing::WorstCase,
            block_mappings: BlockMappingPolicy::Auto,
        }
    }

    #[must_use]
    pub const fn with_va_bits(mut self, va_bits: u32) -> Self {
        self.va_bits = va_bits;
        self
    }

    #[must_use]
    pub const fn with_phys_bits(mut self, phys_bits: u32) -> Self {
        self.phys_bits = phys_bits;
        self
    }

    #[must_use]
    pub const fn with_sparse(mut self, sparse: SparseMemory) -> Self {
        self.sparse = sparse;
        self
    }

    #[must_use]
    pub const fn with_idmap_sizing(mut self, sizing: IdmapSizing) -> Self {
        self.idmap_sizing = sizing;
        self
    }

    #[must_use]
    pub const fn with_block_mappings(mut self, policy: BlockMappingPolicy) -> Self {
        self.block_mappings = policy;
        self
    }

    /// Check every field against the architectural limits of the granule.
    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        let levels = TranslationLevels::new(self.granule);

        if let Err(e) = levels.hw_levels(self.phys_bits) {
            return Err(e);
        }

        if self.va_bits < MIN_VA_BITS || self.va_bits > MAX_VA_BITS {
            return Err(ConfigurationError::VaBitsOutOfRange {
                granule: self.granule,
                va_bits: self.va_bits,
            });
        }
        // A single level cannot hold both a table and its output
        match levels.hw_levels(self.va_bits) {
            Ok(n) if n >= 2 => {}
            _ => {
                return Err(ConfigurationError::VaBitsOutOfRange {
                    granule: self.granule,
                    va_bits: self.va_bits,
                });
            }
        }

        if let Some(section_shift) = self.sparse.section_shift() {
            if section_shift < self.granule.page_shift() || section_shift > self.phys_bits {
                return Err(ConfigurationError::SectionShiftOutOfRange {
                    section_shift,
                    phys_bits: self.phys_bits,
                });
            }
        }

        Ok(())
    }

    /// Configured page table depth for the kernel address space.
    pub const fn pgtable_levels(&self) -> Result<u32, ConfigurationError> {
        if self.va_bits < MIN_VA_BITS || self.va_bits > MAX_VA_BITS {
            return Err(ConfigurationError::VaBitsOutOfRange {
                granule: self.granule,
                va_bits: self.va_bits,
            });
        }
        TranslationLevels::new(self.granule).hw_levels(self.va_bits)
    }

    /// Physical width the identity map must be able to reach.
    #[must_use]
    pub const fn idmap_phys_bits(&self) -> u32 {
        match self.idmap_sizing {
            IdmapSizing::WorstCase => self.granule.max_phys_bits(),
            IdmapSizing::Configured => self.phys_bits,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self::BUILD
    }
}

/// Values picked from Cargo features at compile time
mod build {
    use super::{BlockMappingPolicy, IdmapSizing, SparseMemory};
    use crate::granule::{MAX_VA_BITS, PageGranule};

    pub(super) const GRANULE: PageGranule = if cfg!(feature = "granule-64k") {
        PageGranule::Size64K
    } else if cfg!(feature = "granule-16k") {
        PageGranule::Size16K
    } else {
        PageGranule::Size4K
    };

    pub(super) const VA_BITS: u32 = if cfg!(feature = "va-48") {
        48
    } else if cfg!(feature = "va-47") {
        47
    } else if cfg!(feature = "va-42") {
        42
    } else if cfg!(feature = "va-39") {
        39
    } else if cfg!(feature = "va-36") {
        36
    } else {
        MAX_VA_BITS
    };

    pub(super) const SPARSE: SparseMemory = if cfg!(feature = "sparsemem-vmemmap") {
        SparseMemory::VMEMMAP
    } else {
        SparseMemory::Disabled
    };

    pub(super) const IDMAP_SIZING: IdmapSizing = if cfg!(feature = "idmap-configured") {
        IdmapSizing::Configured
    } else {
        IdmapSizing::WorstCase
    };

    pub(super) const BLOCK_MAPPINGS: BlockMappingPolicy = if cfg!(feature = "force-page-mappings") {
        BlockMappingPolicy::ForcePages
    } else {
        BlockMappingPolicy::Auto
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        for g in PageGranule::ALL {
            let config = GeometryConfig::new(g);
            assert_eq!(config.validate(), Ok(()));
            assert_eq!(config.phys_bits, 48);
        }
        assert_eq!(GeometryConfig::BUILD.validate(), Ok(()));
    }

    #[test]
    fn test_pgtable_levels() {
        let c = GeometryConfig::new(PageGranule::Size4K);
        assert_eq!(c.pgtable_levels(), Ok(4));
        assert_eq!(c.with_va_bits(39).pgtable_levels(), Ok(3));
        assert_eq!(GeometryConfig::new(PageGranule::Size64K).with_va_bits(42).pgtable_levels(), Ok(2));
        assert_eq!(GeometryConfig::new(PageGranule::Size16K).with_va_bits(47).pgtable_levels(), Ok(3));
    }

    #[test]
    fn test_va_bits_range() {
        let c = GeometryConfig::new(PageGranule::Size4K);
        assert!(matches!(
            c.with_va_bits(52).validate(),
            Err(ConfigurationError::VaBitsOutOfRange { va_bits: 52, .. })
        ));
        assert!(matches!(
            c.with_va_bits(32).validate(),
            Err(ConfigurationError::VaBitsOutOfRange { va_bits: 32, .. })
        ));
        assert!(c.with_va_bits(36).validate().is_ok());
    }

    #[test]
    fn test_phys_bits_limit() {
        let c = GeometryConfig::new(PageGranule::Size64K);
        assert!(c.with_phys_bits(52).validate().is_ok());
        assert!(matches!(
            c.with_phys_bits(53).validate(),
            Err(ConfigurationError::PhysBitsTooLarge { max: 52, .. })
        ));
        assert!(matches!(
            GeometryConfig::new(PageGranule::Size4K).with_phys_bits(49).validate(),
            Err(ConfigurationError::PhysBitsTooLarge { max: 48, .. })
        ));
    }

    #[test]
    fn test_section_shift_range() {
        let c = GeometryConfig::new(PageGranule::Size16K).with_phys_bits(40);
        assert!(c.with_sparse(SparseMemory::VMEMMAP).validate().is_ok());
        assert_eq!(
            c.with_sparse(SparseMemory::Vmemmap { section_shift: 12 }).validate(),
            Err(ConfigurationError::SectionShiftOutOfRange {
                section_shift: 12,
                phys_bits: 40,
            })
        );
        assert!(c.with_sparse(SparseMemory::Vmemmap { section_shift: 41 }).validate().is_err());
    }

    #[test]
    fn test_idmap_phys_bits() {
        let c = GeometryConfig::new(PageGranule::Size64K).with_phys_bits(44);
        assert_eq!(c.idmap_phys_bits(), 52);
        assert_eq!(c.with_idmap_sizing(IdmapSizing::Configured).idmap_phys_bits(), 44);
    }
}

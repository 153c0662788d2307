//! Per-map layout
//!
//! Two hierarchies are built before the MMU is enabled:
//! - the identity map, which must reach the highest physical address
//! - the kernel (swapper) map, whose depth follows the configured VA width
//!
//! Both lose their last level when section mappings are allowed, because the
//! walk then terminates in a level 2 block entry instead of a level 3 table.

use core::fmt;

use bootmap_common::memory::page::SIZE_2M;

use crate::attrs::MmuFlags;
use crate::config::{BlockMappingPolicy, GeometryConfig};
use crate::error::{ConfigurationError, GeometryError, InvariantViolation};
use crate::granule::PageGranule;
use crate::levels::TranslationLevels;

/// Alignment the boot protocol guarantees for the start of memory and the
/// linear mapping
pub const LINEAR_MAP_ALIGN: u64 = SIZE_2M;

/// Which boot hierarchy a geometry describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapKind {
    Identity,
    Kernel,
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Kernel => write!(f, "kernel"),
        }
    }
}

/// Derived layout for one boot hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapGeometry {
    pub kind: MapKind,
    pub granule: PageGranule,
    /// Table levels to allocate
    pub levels: u32,
    /// Bytes to reserve for the tables, one page per level
    pub table_bytes: u64,
    pub uses_block_mapping: bool,
    /// Shift of the region mapped by each bottom-level entry
    pub block_shift: u32,
    pub block_size: u64,
    /// Shift of the region covered by the table holding the bottom entries
    pub table_shift: u32,
    /// Size of the initial mapping covered by one bottom-level table
    pub init_map_size: u64,
    pub mmu_flags: MmuFlags,
}

impl MapGeometry {
    /// Number of pages to reserve for the tables
    #[inline]
    #[must_use]
    pub const fn table_pages(&self) -> u64 {
        self.levels as u64
    }

    /// Check the layout against the physical width it has to reach.
    pub const fn verify(&self, required_bits: u32) -> Result<(), InvariantViolation> {
        let granule = self.granule;

        if self.levels == 0 || self.table_bytes != self.levels as u64 * granule.page_size() {
            return Err(InvariantViolation::TableBytesMismatch {
                kind: self.kind,
                levels: self.levels,
                table_bytes: self.table_bytes,
            });
        }

        let (block_shift, table_shift) = if self.uses_block_mapping {
            (granule.pmd_shift(), granule.pud_shift())
        } else {
            (granule.page_shift(), granule.pmd_shift())
        };
        if self.block_shift != block_shift
            || self.table_shift != table_shift
            || self.block_size != 1 << block_shift
            || self.init_map_size != 1 << table_shift
            || self.mmu_flags.bits() != MmuFlags::for_block_mapping(self.uses_block_mapping).bits()
        {
            return Err(InvariantViolation::BlockLevelMismatch { kind: self.kind });
        }

        // A block entry stands in for the level it replaces
        let walk_levels = self.levels.saturating_add(if self.uses_block_mapping { 1 } else { 0 });
        if TranslationLevels::new(granule).reach(walk_levels) < required_bits {
            return Err(InvariantViolation::UnderProvisioned {
                kind: self.kind,
                levels: self.levels,
                required_bits,
            });
        }

        Ok(())
    }
}

/// Whether the linear map may use section mappings with this granule.
///
/// Sections are only safe when their size equals the 2MB alignment the boot
/// protocol guarantees for memory. 16KB and 64KB sections (32MB, 512MB) would
/// demand a coarser alignment than the platform promises, leaving the edges of
/// memory unmapped or mapped past the end of RAM.
#[inline]
#[must_use]
pub const fn resolve_block_mapping(granule: PageGranule) -> bool {
    match granule {
        PageGranule::Size4K => true,
        PageGranule::Size16K | PageGranule::Size64K => false,
    }
}

/// Block mapping decision for a whole configuration, honouring its policy.
#[inline]
#[must_use]
pub const fn block_mapping_enabled(config: &GeometryConfig) -> bool {
    match config.block_mappings {
        BlockMappingPolicy::Auto => resolve_block_mapping(config.granule),
        BlockMappingPolicy::ForcePages => false,
    }
}

/// Derive the layout of one boot hierarchy.
///
/// The identity map is sized for [`GeometryConfig::idmap_phys_bits`]; the
/// kernel map follows the configured page table depth. Both drop one level
/// when section mappings are in use.
pub const fn resolve_geometry(
    kind: MapKind,
    config: &GeometryConfig,
) -> Result<MapGeometry, GeometryError> {
    if let Err(e) = config.validate() {
        return Err(GeometryError::Configuration(e));
    }

    let granule = config.granule;
    let levels = TranslationLevels::new(granule);
    let required_bits = match kind {
        MapKind::Identity => config.idmap_phys_bits(),
        MapKind::Kernel => config.va_bits,
    };

    let hw_levels = match kind {
        MapKind::Identity => levels.hw_levels(required_bits),
        MapKind::Kernel => config.pgtable_levels(),
    };
    let hw_levels = match hw_levels {
        Ok(n) => n,
        Err(e) => return Err(GeometryError::Configuration(e)),
    };

    if let MapKind::Identity = kind {
        if let Err(e) = check_monotonic(granule, required_bits, hw_levels) {
            return Err(GeometryError::Invariant(e));
        }
    }

    let geometry = build(kind, granule, hw_levels, block_mapping_enabled(config));
    match geometry.verify(required_bits) {
        Ok(()) => Ok(geometry),
        Err(e) => Err(GeometryError::Invariant(e)),
    }
}

const fn build(kind: MapKind, granule: PageGranule, hw_levels: u32, block: bool) -> MapGeometry {
    let (levels, block_shift, table_shift) = if block {
        (hw_levels - 1, granule.pmd_shift(), granule.pud_shift())
    } else {
        (hw_levels, granule.page_shift(), granule.pmd_shift())
    };

    MapGeometry {
        kind,
        granule,
        levels,
        table_bytes: levels as u64 * granule.page_size(),
        uses_block_mapping: block,
        block_shift,
        block_size: 1 << block_shift,
        table_shift,
        init_map_size: 1 << table_shift,
        mmu_flags: MmuFlags::for_block_mapping(block),
    }
}

/// One bit narrower must never need more levels.
const fn check_monotonic(
    granule: PageGranule,
    phys_bits: u32,
    levels: u32,
) -> Result<(), InvariantViolation> {
    match TranslationLevels::new(granule).hw_levels(phys_bits - 1) {
        Ok(narrower) if narrower > levels => {
            Err(InvariantViolation::NonMonotonicLevels { phys_bits })
        }
        // Below one page there is nothing to compare against
        Ok(_) | Err(ConfigurationError::PhysBitsTooSmall { .. }) => Ok(()),
        Err(_) => Err(InvariantViolation::NonMonotonicLevels { phys_bits }),
    }
}

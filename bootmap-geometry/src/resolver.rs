//! Full boot geometry
//!
//! Composes the per-map layouts, the memory start alignment and the fixed
//! boot placement rules into one value handed to the table builder and the
//! image placement code.

use bootmap_common::BootImageConstraints;

use crate::config::GeometryConfig;
use crate::error::GeometryError;
use crate::geometry::{MapGeometry, MapKind, resolve_geometry};
use crate::memstart::{MemstartAlignment, resolve_memstart_alignment};

/// Everything the early boot code needs to build and place its page tables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootGeometry {
    pub config: GeometryConfig,
    pub idmap: MapGeometry,
    pub kernel: MapGeometry,
    pub memstart: MemstartAlignment,
    pub constraints: BootImageConstraints,
}

impl BootGeometry {
    /// Layout of the requested hierarchy
    #[inline]
    #[must_use]
    pub const fn map(&self, kind: MapKind) -> &MapGeometry {
        match kind {
            MapKind::Identity => &self.idmap,
            MapKind::Kernel => &self.kernel,
        }
    }

    /// Bytes to reserve in the image for both hierarchies
    #[inline]
    #[must_use]
    pub const fn reserved_table_bytes(&self) -> u64 {
        self.idmap.table_bytes + self.kernel.table_bytes
    }

    /// Log the resolved layout.
    pub fn log_summary(&self) {
        log::info!(
            "Boot geometry: {} granule, {}-bit VA, {}-bit PA, block mappings {}",
            self.config.granule,
            self.config.va_bits,
            self.config.phys_bits,
            if self.kernel.uses_block_mapping { "on" } else { "off" },
        );
        for map in [&self.idmap, &self.kernel] {
            log::debug!(
                "  {} map: {} levels ({} bytes), block {:#x}, table shift {}, flags {:?}",
                map.kind,
                map.levels,
                map.table_bytes,
                map.block_size,
                map.table_shift,
                map.mmu_flags,
            );
        }
        log::info!(
            "  memstart alignment {:#x}{}",
            self.memstart.size(),
            if self.memstart.is_widened() { " (widened for sparse memory)" } else { "" },
        );
    }
}

/// Resolve the complete boot geometry for `config`.
pub const fn resolve(config: &GeometryConfig) -> Result<BootGeometry, GeometryError> {
    let idmap = match resolve_geometry(MapKind::Identity, config) {
        Ok(m) => m,
        Err(e) => return Err(e),
    };
    let kernel = match resolve_geometry(MapKind::Kernel, config) {
        Ok(m) => m,
        Err(e) => return Err(e),
    };

    let memstart = match resolve_memstart_alignment(config.granule, config.sparse) {
        Ok(m) => m,
        Err(e) => return Err(GeometryError::Configuration(e)),
    };
    if let Err(e) = memstart.verify() {
        return Err(GeometryError::Invariant(e));
    }

    Ok(BootGeometry {
        config: *config,
        idmap,
        kernel,
        memstart,
        constraints: BootImageConstraints::ARM64,
    })
}

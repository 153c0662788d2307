//! Boot page table geometry
//!
//! Derives every size, shift and depth needed to build the two page table
//! hierarchies used while bringing up an ARM64 system: the identity map that
//! is live while the MMU is switched on, and the kernel (swapper) map of all
//! physical memory.
//!
//! # Modules
//!
//! - `granule`: page size and per-level shifts (`PageGranule`)
//! - `levels`: table depth for a given address width (`TranslationLevels`)
//! - `geometry`: per-map layout and the block mapping decision (`MapGeometry`)
//! - `attrs`: lower attributes for the initial mapping (`MmuFlags`)
//! - `memstart`: physical memory start alignment (`MemstartAlignment`)
//! - `config`: resolver inputs (`GeometryConfig`)
//! - `resolver`: the composed result (`BootGeometry`)
//!
//! # Build-time vs runtime
//!
//! Everything is a `const fn` of an explicit [`GeometryConfig`].
//! [`BUILD_GEOMETRY`] is resolved at compile time from Cargo features, so an
//! impossible feature combination fails the build. Boot code that discovers
//! its configuration at runtime calls [`install`] once during single-threaded
//! initialisation instead.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

use spin::Once;

pub mod attrs;
pub mod config;
pub mod error;
pub mod geometry;
pub mod granule;
pub mod levels;
pub mod memstart;
pub mod resolver;

// Re-export commonly used types
pub use attrs::MmuFlags;
pub use config::{BlockMappingPolicy, GeometryConfig, IdmapSizing, SparseMemory};
pub use error::{ConfigurationError, GeometryError, InvariantViolation};
pub use geometry::{MapGeometry, MapKind, resolve_block_mapping, resolve_geometry};
pub use granule::PageGranule;
pub use levels::{TranslationLevels, levels_for_granule, levels_for_physical_width};
pub use memstart::{MemstartAlignment, resolve_memstart_alignment};
pub use resolver::{BootGeometry, resolve};

pub use bootmap_common::boot::{MAX_FDT_SIZE, MIN_FDT_ALIGN, MIN_KIMG_ALIGN};

/// Geometry for the configuration selected by Cargo features
pub const BUILD_GEOMETRY: BootGeometry = match resolve(&GeometryConfig::BUILD) {
    Ok(geometry) => geometry,
    Err(GeometryError::Configuration(_)) => {
        panic!("feature selection describes an invalid page table configuration")
    }
    Err(GeometryError::Invariant(_)) => panic!("boot geometry failed its invariants"),
};

/// Identity map tables to reserve in the image, in bytes
pub const IDMAP_DIR_SIZE: u64 = BUILD_GEOMETRY.idmap.table_bytes;

/// Kernel map tables to reserve in the image, in bytes
pub const SWAPPER_DIR_SIZE: u64 = BUILD_GEOMETRY.kernel.table_bytes;

// ============================================================================
// Runtime installation
// ============================================================================

/// Geometry resolved during early boot.
///
/// Uses `spin::Once` so the layout the tables were built with can never be
/// replaced afterwards.
static INSTALLED: Once<BootGeometry> = Once::new();

/// Resolve `config` and make it the system's boot geometry.
///
/// Installing the same configuration again returns the stored geometry.
/// Installing a different one fails with
/// [`ConfigurationError::AlreadyInstalled`].
pub fn install(config: &GeometryConfig) -> Result<&'static BootGeometry, GeometryError> {
    let geometry = match resolve(config) {
        Ok(geometry) => geometry,
        Err(e) => {
            log::error!("Failed to resolve boot geometry: {}", e);
            return Err(e);
        }
    };

    let mut was_set = false;
    let installed = INSTALLED.call_once(|| {
        was_set = true;
        geometry
    });

    if was_set {
        installed.log_summary();
    } else if *installed != geometry {
        log::error!(
            "Boot geometry already installed for {} granule, refusing {} granule config",
            installed.config.granule,
            config.granule
        );
        return Err(ConfigurationError::AlreadyInstalled.into());
    }

    Ok(installed)
}

/// The geometry passed to [`install`], if any.
#[inline]
#[must_use]
pub fn installed() -> Option<&'static BootGeometry> {
    INSTALLED.get()
}

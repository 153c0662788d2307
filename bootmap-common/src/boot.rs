//! Boot Image Placement Constraints
//!
//! Fixed by the ARM64 boot protocol, independent of the translation granule:
//! - the kernel image is loaded at a 2MB aligned base
//! - the device tree blob is 8 byte aligned and no larger than 2MB

use core::fmt;

use crate::addr::PhysAddr;
use crate::memory::page::SIZE_2M;

/// Minimum alignment of the kernel image base
pub const MIN_KIMG_ALIGN: u64 = SIZE_2M;

/// Maximum size of the flattened device tree
pub const MAX_FDT_SIZE: u64 = SIZE_2M;

/// Minimum alignment of the flattened device tree
pub const MIN_FDT_ALIGN: u64 = 8;

/// Placement rules for the boot image and device tree blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootImageConstraints {
    /// Required alignment of the image load address
    pub min_image_align: u64,
    /// Largest device tree the loader will accept
    pub max_fdt_size: u64,
    /// Required alignment of the device tree blob
    pub min_fdt_align: u64,
}

impl BootImageConstraints {
    /// Constraints mandated by the ARM64 boot protocol
    pub const ARM64: Self = Self {
        min_image_align: MIN_KIMG_ALIGN,
        max_fdt_size: MAX_FDT_SIZE,
        min_fdt_align: MIN_FDT_ALIGN,
    };

    /// Check that the kernel image is placed on a permitted boundary.
    pub const fn check_image_base(&self, base: PhysAddr) -> Result<(), BootConstraintError> {
        if base.is_aligned(self.min_image_align) {
            Ok(())
        } else {
            Err(BootConstraintError::ImageMisaligned {
                base,
                align: self.min_image_align,
            })
        }
    }

    /// Check a device tree blob's address and size before it is mapped.
    pub const fn check_fdt(&self, base: PhysAddr, size: u64) -> Result<(), BootConstraintError> {
        if size == 0 {
            return Err(BootConstraintError::FdtEmpty);
        }
        if !base.is_aligned(self.min_fdt_align) {
            return Err(BootConstraintError::FdtMisaligned {
                base,
                align: self.min_fdt_align,
            });
        }
        if size > self.max_fdt_size {
            return Err(BootConstraintError::FdtTooLarge {
                size,
                max: self.max_fdt_size,
            });
        }
        Ok(())
    }
}

impl Default for BootImageConstraints {
    fn default() -> Self {
        Self::ARM64
    }
}

/// Violations of the boot placement rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "boot constraint errors must be handled"]
pub enum BootConstraintError {
    /// Kernel image base is not aligned to the minimum image alignment
    ImageMisaligned { base: PhysAddr, align: u64 },
    /// Device tree blob is not naturally aligned
    FdtMisaligned { base: PhysAddr, align: u64 },
    /// Device tree blob exceeds the maximum size
    FdtTooLarge { size: u64, max: u64 },
    /// Device tree blob has zero length
    FdtEmpty,
}

impl fmt::Display for BootConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageMisaligned { base, align } => {
                write!(f, "kernel image at {} is not {:#x} aligned", base, align)
            }
            Self::FdtMisaligned { base, align } => {
                write!(f, "device tree at {} is not {} byte aligned", base, align)
            }
            Self::FdtTooLarge { size, max } => {
                write!(f, "device tree is {} bytes, limit is {}", size, max)
            }
            Self::FdtEmpty => write!(f, "device tree is empty"),
        }
    }
}

impl core::error::Error for BootConstraintError {}

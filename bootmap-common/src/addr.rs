//! Physical Address Type
//!
//! A `#[repr(transparent)]` wrapper around `u64` used wherever the boot code
//! hands a physical address to the placement checks or the memory start
//! rounding.

use core::fmt;

use crate::memory::page;

/// Physical memory address.
///
/// Represents an address in physical memory space (as seen by the MMU).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Create a new physical address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Check if this address is a multiple of `align` (a power of two).
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, align: u64) -> bool {
        page::is_aligned(self.0, align)
    }

    /// Align this address down to `align` (a power of two).
    #[inline]
    #[must_use]
    pub const fn align_down(self, align: u64) -> Self {
        Self(page::align_down(self.0, align))
    }
}

// -- Formatting implementations

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#018x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA:{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        let pa = PhysAddr::new(0x4020_1000);
        assert!(pa.is_aligned(0x1000));
        assert!(!pa.is_aligned(0x20_0000));
        assert_eq!(pa.align_down(0x20_0000), PhysAddr::new(0x4020_0000));
    }
}

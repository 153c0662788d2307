//! Size Constants
//!
//! Byte sizes and shifts used when laying out the boot page tables.

/// Page and block size constants
pub mod page {
    /// 4KB page size
    pub const SIZE_4K: u64 = 4096;
    /// 16KB page size
    pub const SIZE_16K: u64 = 16384;
    /// 64KB page size
    pub const SIZE_64K: u64 = 65536;
    /// 2MB block size (4KB granule section)
    pub const SIZE_2M: u64 = 2 * 1024 * 1024;
    /// 32MB block size (16KB granule section)
    pub const SIZE_32M: u64 = 32 * 1024 * 1024;
    /// 512MB block size (64KB granule section)
    pub const SIZE_512M: u64 = 512 * 1024 * 1024;
    /// 1GB block size (4KB granule level 1 block)
    pub const SIZE_1G: u64 = 1024 * 1024 * 1024;

    /// 4KB page shift
    pub const SHIFT_4K: u32 = 12;
    /// 16KB page shift
    pub const SHIFT_16K: u32 = 14;
    /// 64KB page shift
    pub const SHIFT_64K: u32 = 16;
    /// 2MB block shift
    pub const SHIFT_2M: u32 = 21;
    /// 32MB block shift
    pub const SHIFT_32M: u32 = 25;
    /// 512MB block shift
    pub const SHIFT_512M: u32 = 29;
    /// 1GB block shift
    pub const SHIFT_1G: u32 = 30;

    // Compile-time verification of page constants
    const _: () = assert!(1 << SHIFT_4K == SIZE_4K, "SHIFT_4K must match SIZE_4K");
    const _: () = assert!(1 << SHIFT_16K == SIZE_16K, "SHIFT_16K must match SIZE_16K");
    const _: () = assert!(1 << SHIFT_64K == SIZE_64K, "SHIFT_64K must match SIZE_64K");
    const _: () = assert!(1 << SHIFT_2M == SIZE_2M, "SHIFT_2M must match SIZE_2M");
    const _: () = assert!(1 << SHIFT_32M == SIZE_32M, "SHIFT_32M must match SIZE_32M");
    const _: () = assert!(1 << SHIFT_512M == SIZE_512M, "SHIFT_512M must match SIZE_512M");
    const _: () = assert!(1 << SHIFT_1G == SIZE_1G, "SHIFT_1G must match SIZE_1G");

    /// Round `value` down to a multiple of `align` (a power of two).
    #[must_use]
    pub const fn align_down(value: u64, align: u64) -> u64 {
        debug_assert!(align.is_power_of_two());
        value & !(align - 1)
    }

    #[must_use]
    pub const fn is_aligned(value: u64, align: u64) -> bool {
        debug_assert!(align.is_power_of_two());
        value & (align - 1) == 0
    }
}

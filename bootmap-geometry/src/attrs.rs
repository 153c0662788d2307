//! Initial mapping attributes
//!
//! The boot table builder stamps the same lower attributes into every block
//! or page descriptor of the initial kernel mapping: normal memory, inner
//! shareable, access flag set. Only the descriptor type differs.
//!
//! Descriptor lower attributes (ARMv8-A):
//! ```text
//! +----+----+----+----+------+----+----+
//! | AF | SH | AP | NS | INDX | TB | VB |
//! +----+----+----+----+------+----+----+
//!   10  9  8 7  6  5   4    2  1    0
//! ```
//!
//! MAIR layout: index 0 is normal write-back memory, index 1 is device memory.
//! The consumer must program MAIR_EL1 with normal memory at index 0 before the
//! MMU is enabled; a layout with normal memory elsewhere (e.g. index 4) would
//! need flags of `0x711`/`0x713` instead.

use core::fmt;

use tock_registers::{
    interfaces::Readable,
    register_bitfields,
    registers::InMemoryRegister,
};

register_bitfields![u64,
    /// Lower attribute fields shared by block and page descriptors
    pub DescriptorFields [
        /// Valid bit - entry is valid when set
        VALID OFFSET(0) NUMBITS(1) [],

        /// Type bit - 0=Block (levels 1-2), 1=Table or Page
        TYPE OFFSET(1) NUMBITS(1) [
            Block = 0,
            TableOrPage = 1
        ],

        /// Memory attribute index into MAIR_EL1
        ATTR_INDEX OFFSET(2) NUMBITS(3) [
            Normal = 0,
            Device = 1
        ],

        /// Non-secure bit
        NS OFFSET(5) NUMBITS(1) [],

        /// Access permissions
        AP OFFSET(6) NUMBITS(2) [
            RW_EL1 = 0b00,
            RW_EL0 = 0b01,
            RO_EL1 = 0b10,
            RO_EL0 = 0b11
        ],

        /// Shareability
        SH OFFSET(8) NUMBITS(2) [
            NonShareable = 0b00,
            OuterShareable = 0b10,
            InnerShareable = 0b11
        ],

        /// Access flag
        AF OFFSET(10) NUMBITS(1) []
    ]
];

const DESC_VALID: u64 = 1 << 0;
const DESC_TYPE_PAGE: u64 = 1 << 1;
const ATTR_INDEX_NORMAL: u64 = 0 << 2;
const SH_INNER: u64 = 0b11 << 8;
const AF: u64 = 1 << 10;

/// Section (block) descriptor type bits
const PMD_TYPE_SECT: u64 = DESC_VALID;
/// Page descriptor type bits
const PTE_TYPE_PAGE: u64 = DESC_VALID | DESC_TYPE_PAGE;

/// Memory type selected by a descriptor's attribute index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MairType {
    Normal,
    Device,
}

/// Shareability domain of a descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shareability {
    NonShareable,
    OuterShareable,
    InnerShareable,
}

/// Lower attribute bits for the initial kernel mapping
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MmuFlags(u64);

impl MmuFlags {
    /// Flags for section (block) entries
    pub const BLOCK: Self = Self(PMD_TYPE_SECT | AF | SH_INNER | ATTR_INDEX_NORMAL);

    /// Flags for level 3 page entries
    pub const PAGE: Self = Self(PTE_TYPE_PAGE | AF | SH_INNER | ATTR_INDEX_NORMAL);

    /// Flags for the entries written at the bottom of a boot map.
    #[inline]
    #[must_use]
    pub const fn for_block_mapping(uses_block_mapping: bool) -> Self {
        if uses_block_mapping { Self::BLOCK } else { Self::PAGE }
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    fn register(self) -> InMemoryRegister<u64, DescriptorFields::Register> {
        InMemoryRegister::new(self.0)
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.register().is_set(DescriptorFields::VALID)
    }

    /// True for a block descriptor, false for a page descriptor
    #[must_use]
    pub fn is_block(self) -> bool {
        self.register().read(DescriptorFields::TYPE) == 0
    }

    #[must_use]
    pub fn access_flag(self) -> bool {
        self.register().is_set(DescriptorFields::AF)
    }

    #[must_use]
    pub fn memory_type(self) -> Option<MairType> {
        match self.register().read(DescriptorFields::ATTR_INDEX) {
            0 => Some(MairType::Normal),
            1 => Some(MairType::Device),
            _ => None,
        }
    }

    #[must_use]
    pub fn shareability(self) -> Option<Shareability> {
        match self.register().read(DescriptorFields::SH) {
            0b00 => Some(Shareability::NonShareable),
            0b10 => Some(Shareability::OuterShareable),
            0b11 => Some(Shareability::InnerShareable),
            _ => None,
        }
    }
}

impl fmt::Debug for MmuFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_block() { "Block" } else { "Page" };
        write!(f, "MmuFlags::{}({:#x})", kind, self.0)
    }
}

impl From<MmuFlags> for u64 {
    fn from(flags: MmuFlags) -> Self {
        flags.0
    }
}

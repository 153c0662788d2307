//! Error types for the geometry resolver
//!
//! Two classes of failure:
//! - [`ConfigurationError`]: the inputs describe a layout the architecture
//!   cannot build. Report it and refuse to boot with that configuration.
//! - [`InvariantViolation`]: the resolver produced a layout that fails its own
//!   checks. This is a defect in the resolver and is always fatal.

use core::fmt;

use crate::granule::PageGranule;
use crate::geometry::MapKind;

/// An input combination that is architecturally invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Page size is not 4KB, 16KB or 64KB
    UnsupportedGranule(u64),
    /// Physical width is beyond what the granule can output
    PhysBitsTooLarge {
        granule: PageGranule,
        phys_bits: u32,
        max: u32,
    },
    /// Physical width is below the smallest architected range
    PhysBitsTooSmall { granule: PageGranule, phys_bits: u32 },
    /// Virtual width is outside the supported range, or too narrow for two levels
    VaBitsOutOfRange { granule: PageGranule, va_bits: u32 },
    /// Sparse memory section shift is below a page or above the physical width
    SectionShiftOutOfRange { section_shift: u32, phys_bits: u32 },
    /// A different geometry was already installed
    AlreadyInstalled,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedGranule(size) => write!(f, "unsupported page granule of {} bytes", size),
            Self::PhysBitsTooLarge {
                granule,
                phys_bits,
                max,
            } => write!(
                f,
                "{}-bit physical addresses exceed the {}-bit limit of the {} granule",
                phys_bits, max, granule
            ),
            Self::PhysBitsTooSmall { granule, phys_bits } => write!(
                f,
                "{}-bit physical addresses are below the architected minimum ({} granule)",
                phys_bits, granule
            ),
            Self::VaBitsOutOfRange { granule, va_bits } => {
                write!(f, "{}-bit virtual addresses unsupported with {} pages", va_bits, granule)
            }
            Self::SectionShiftOutOfRange {
                section_shift,
                phys_bits,
            } => write!(
                f,
                "sparse memory section shift {} invalid for {}-bit physical addresses",
                section_shift, phys_bits
            ),
            Self::AlreadyInstalled => write!(f, "a different boot geometry is already installed"),
        }
    }
}

impl core::error::Error for ConfigurationError {}

/// A derived value that fails one of the resolver's own invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Adding a physical address bit reduced the level count
    NonMonotonicLevels { phys_bits: u32 },
    /// The allocated levels cannot reach the required address width
    UnderProvisioned {
        kind: MapKind,
        levels: u32,
        required_bits: u32,
    },
    /// Reserved table storage is not one page per level
    TableBytesMismatch { kind: MapKind, levels: u32, table_bytes: u64 },
    /// Block and table shifts disagree with the block mapping decision
    BlockLevelMismatch { kind: MapKind },
    /// Memory start alignment is narrower than a constraint it must satisfy
    AlignmentNarrowed { shift: u32, required: u32 },
    /// Memory start alignment is wider than any physical address
    AlignmentTooWide { shift: u32, max: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonMonotonicLevels { phys_bits } => {
                write!(f, "level count decreased at {} physical bits", phys_bits)
            }
            Self::UnderProvisioned {
                kind,
                levels,
                required_bits,
            } => write!(
                f,
                "{} map: {} levels cannot reach {} address bits",
                kind, levels, required_bits
            ),
            Self::TableBytesMismatch {
                kind,
                levels,
                table_bytes,
            } => write!(
                f,
                "{} map: {} bytes reserved for {} levels",
                kind, table_bytes, levels
            ),
            Self::BlockLevelMismatch { kind } => {
                write!(f, "{} map: block shift inconsistent with block mapping", kind)
            }
            Self::AlignmentNarrowed { shift, required } => write!(
                f,
                "memory start alignment shift {} below required {}",
                shift, required
            ),
            Self::AlignmentTooWide { shift, max } => write!(
                f,
                "memory start alignment shift {} exceeds {}-bit physical addresses",
                shift, max
            ),
        }
    }
}

impl core::error::Error for InvariantViolation {}

/// Any failure while resolving the boot geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "geometry errors must be handled"]
pub enum GeometryError {
    Configuration(ConfigurationError),
    Invariant(InvariantViolation),
}

impl GeometryError {
    /// Invariant violations mean the resolver itself is wrong; there is no
    /// configuration the caller could fall back to.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "invalid configuration: {}", e),
            Self::Invariant(e) => write!(f, "invariant violation: {}", e),
        }
    }
}

impl core::error::Error for GeometryError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Invariant(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for GeometryError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<InvariantViolation> for GeometryError {
    fn from(e: InvariantViolation) -> Self {
        Self::Invariant(e)
    }
}

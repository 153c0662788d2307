//! # bootmap-common
//!
//! Shared constants and types for the boot-time page table builders.
//!
//! This crate carries the parts of the ARM64 boot ABI that do not depend on
//! the translation granule:
//! - [`BootImageConstraints`](boot::BootImageConstraints): kernel image and
//!   device tree placement rules
//! - [`page`](memory::page): size and shift constants for every granule and
//!   the common block sizes
//! - [`PhysAddr`](addr::PhysAddr): physical address newtype with alignment helpers
//!
//! # no_std
//!
//! This crate is `#![no_std]` and has zero dependencies, making it suitable
//! as a foundation crate for the geometry resolver and its consumers.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod addr;
pub mod boot;
pub mod memory;

// Re-export commonly used types
pub use addr::PhysAddr;
pub use boot::{BootConstraintError, BootImageConstraints};

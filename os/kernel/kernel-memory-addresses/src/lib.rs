//! # Physical and Virtual Memory Address Types
//!
//! Strongly typed wrappers for the raw 32-bit addresses, frame numbers and
//! page numbers used by the frame pools and the two-level paging code.
//!
//! ## Overview
//!
//! The kernel runs in 32-bit protected mode with 4 KiB pages and classic
//! two-level paging. Every address is therefore a `u32`, and every frame or page
//! number is the address shifted right by [`PAGE_SHIFT`]. The types in this
//! crate prevent mixing the four kinds of value at compile time while remaining
//! zero-cost wrappers:
//!
//! | Type | Space | Unit |
//! |------|-------|------|
//! | [`PhysicalAddress`] | physical (RAM, MMIO) | byte |
//! | [`FrameNumber`] | physical | 4 KiB frame |
//! | [`VirtualAddress`] | virtual (page-table translated) | byte |
//! | [`PageNumber`] | virtual | 4 KiB page |
//!
//! ## Geometry
//!
//! - [`PAGE_SIZE`]: 4096 bytes, identical for frames and pages.
//! - [`ENTRIES_PER_PAGE`]: 1024 four-byte entries fit into one page-sized table.
//! - [`TABLE_SPAN`]: one page table maps 4 MiB of virtual memory.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0020_1234);
//! let frame = pa.frame();
//! assert_eq!(frame, FrameNumber::new(0x201));
//! assert_eq!(frame.base() + pa.offset(), pa);
//!
//! let va = VirtualAddress::new(0x0040_0042);
//! assert_eq!(va.page().base(), VirtualAddress::new(0x0040_0000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod frame_number;
mod page_number;
mod physical_address;
mod virtual_address;

pub use frame_number::FrameNumber;
pub use page_number::PageNumber;
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// Size of a physical frame and of a virtual page, in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// log2([`PAGE_SIZE`]); number of low address bits forming the in-page offset.
pub const PAGE_SHIFT: u32 = 12;

/// Number of entries in a page directory or a page table.
pub const ENTRIES_PER_PAGE: usize = 1024;

/// Number of frames in the 32-bit physical address space. Valid frame numbers
/// are below this.
pub const FRAME_COUNT: u32 = 1 << (32 - PAGE_SHIFT);

/// Bytes of virtual memory mapped by a single page table (4 MiB).
#[allow(clippy::cast_possible_truncation)]
pub const TABLE_SPAN: u32 = PAGE_SIZE * ENTRIES_PER_PAGE as u32;

const _: () = {
    assert!(1 << PAGE_SHIFT == PAGE_SIZE);
    assert!(ENTRIES_PER_PAGE * 4 == PAGE_SIZE as usize);
    assert!(TABLE_SPAN == 4 * 1024 * 1024);
    assert!(FRAME_COUNT == 1 << 20);
};

/// Rounds `bytes` up to a whole number of pages and returns the page count.
///
/// ```rust
/// # use kernel_memory_addresses::pages_for;
/// assert_eq!(pages_for(0), 0);
/// assert_eq!(pages_for(1), 1);
/// assert_eq!(pages_for(4096), 1);
/// assert_eq!(pages_for(4097), 2);
/// ```
#[inline]
#[must_use]
pub const fn pages_for(bytes: u32) -> u32 {
    bytes.div_ceil(PAGE_SIZE)
}

//! # Virtual Memory Support
//!
//! Two-level (non-PAE) x86 paging for the kernel: page directories and page
//! tables, demand paging from a page-fault handler, and region allocators
//! ([`VmPool`]) over virtual address ranges.
//!
//! ## x86 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! ```text
//!  CR3 → Page Directory → Page Table → Physical Page
//!          │                 │
//!          │                 └───► PTE (maps a 4 KiB page)
//!          └─────────────────────► PDE (points at a page table)
//! ```
//!
//! Both levels hold 1024 entries of 4 bytes, so one directory entry covers
//! 4 MiB and one page table fits in exactly one frame.
//!
//! ## Address space layout
//!
//! ```text
//! 0x0000_0000 ┌────────────────────────┐
//!             │ shared region          │ identity mapped in every page table,
//!             │ (kernel code, pools)   │ never faulted in, never freed
//! shared_size ├────────────────────────┤
//!             │ demand-paged           │ backed on first access, subject to
//!             │ VM pools live here     │ VM pool legitimacy checks
//! 0xFFC0_0000 ├────────────────────────┤
//!             │ recursive window       │ page tables through directory
//!             │                        │ slot 1023
//! 0xFFFF_FFFF └────────────────────────┘
//! ```
//!
//! ## Pieces
//! - [`PageEntry`]: one PDE/PTE as a bitfield.
//! - [`Table`]: a page directory or page table.
//! - [`TableFrames`]: how page-table frames are reached from code.
//! - [`Mmu`]: the control-register operations paging needs.
//! - [`Paging`]: page-table construction, fault handling and page release.
//! - [`VmPool`]: region allocator whose pages are faulted in lazily.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(any(test, feature = "test-utils"))]
extern crate alloc;

mod entry;
mod frames;
mod mmu;
mod page_table;
mod paging;
pub mod table;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
mod vm_pool;

pub use crate::entry::PageEntry;
pub use crate::frames::{IdentityTableFrames, TableFrames};
#[cfg(target_arch = "x86")]
pub use crate::mmu::X86Mmu;
pub use crate::mmu::Mmu;
pub use crate::page_table::{
    PageTable, RECURSIVE_DIRECTORY_BASE, RECURSIVE_SLOT, RECURSIVE_TABLES_BASE,
    recursive_pde_address, recursive_pte_address,
};
pub use crate::paging::{
    FaultOutcome, PageFaultError, Paging, PagingError, VmPoolId, VmReleaseError,
};
pub use crate::table::Table;
pub use crate::vm_pool::{Region, VmPool, VmPoolError};

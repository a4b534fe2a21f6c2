//! # Kernel Memory Configuration
//!
//! This crate defines the physical memory layout and the capacity limits that
//! govern the kernel's memory subsystem. It is the single source of truth for
//! where the frame pools live, which physical range is a hole, and how much low
//! memory every address space shares.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! Physical Memory Layout (32 MiB reference machine):
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Low Memory + Kernel Image      │
//!             │  (BIOS, VGA, kernel text/data)  │
//! 0x0020_0000 ├─────────────────────────────────┤ KERNEL_POOL_START_FRAME
//!             │        Kernel Frame Pool        │
//!             │ (page tables, kernel structures)│
//! 0x0040_0000 ├─────────────────────────────────┤ PROCESS_POOL_START_FRAME
//!             │       Process Frame Pool        │
//! 0x00F0_0000 ├─────────────────────────────────┤ MEM_HOLE_START_FRAME
//!             │   Hole (not RAM, inaccessible)  │
//! 0x0100_0000 ├─────────────────────────────────┤
//!             │   Process Frame Pool (cont.)    │
//! 0x0200_0000 └─────────────────────────────────┘
//! ```
//!
//! The first [`SHARED_SIZE`](memory::SHARED_SIZE) bytes (4 MiB) are identity
//! mapped into every address space. The kernel pool must lie inside that region
//! so page tables stay reachable after paging is enabled.
//!
//! ## Modules
//!
//! * [`memory`]: compile-time constants, checked with `const` assertions.
//! * [`layout`]: [`MemoryLayout`](layout::MemoryLayout), the same values as a
//!   runtime value with builder methods and validation.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod layout;
pub mod memory;

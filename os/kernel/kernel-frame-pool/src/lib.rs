//! # Physical Frame Pools
//!
//! This crate manages physical memory at frame granularity. It is the sole
//! source and sink of physical memory for page tables, thread stacks and data
//! pages.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Pool Registry                      │
//! │    • owns every pool                                │
//! │    • release by frame number                        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ one per physical range
//! ┌─────────────────▼───────────────────────────────────┐
//! │             Contiguous Frame Pool                   │
//! │    • metadata frames (carved or borrowed)           │
//! │    • allocation ledger: head frame → run length     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │             Free-Extent Tracker                     │
//! │    • ordered, coalescing list of free runs          │
//! │    • first fit, low end                             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Both lists are intrusive singly linked lists over a [`Slab`](slab::Slab) of
//! [`Node`](slab::Node)s that lives in the pool's metadata frames, so the
//! allocator never allocates memory for itself.
//!
//! ## Failure model
//!
//! - **Exhaustion** is expected: [`ContFramePool::get_frames`] returns `None`.
//! - **Invalid release** is a client bug, reported as a [`ReleaseError`] and a
//!   warning, and never corrupts the pool.
//! - **Capacity overflow** of the fixed-size registry is fatal (panic).
//!
//! ## Concurrency
//!
//! Nothing here is locked. Callers run mutating operations with interrupts
//! disabled, which makes them atomic on the single core.
//!
//! ## Example
//!
//! ```rust
//! use kernel_frame_pool::testing::VecMapper;
//! use kernel_frame_pool::{ContFramePool, PoolRegistry};
//! use kernel_memory_addresses::FrameNumber;
//!
//! let mut pools = PoolRegistry::new();
//! let pool = ContFramePool::new(FrameNumber::new(512), 512, None, &VecMapper).unwrap();
//! let kernel = pools.register(pool);
//!
//! let frame = pools.get_frames(kernel, 2).unwrap();
//! pools.release_frames(frame).unwrap();
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(any(test, feature = "test-utils"))]
extern crate alloc;

pub mod free_extents;
pub mod ledger;
mod mapper;
mod pool;
mod registry;
pub mod slab;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use free_extents::Extent;
pub use mapper::{IdentityMetadataMapper, MetadataMapper, MetadataStorage, nodes_per_list};
pub use pool::{ContFramePool, FramePoolError, needed_info_frames};
pub use registry::{PoolId, PoolRegistry};

use kernel_memory_addresses::FrameNumber;

/// A release that could not be honoured.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ReleaseError {
    #[error("frame {0} is not managed by any frame pool")]
    NotOwned(FrameNumber),
    #[error("frame {0} does not start a live allocation")]
    NotAllocated(FrameNumber),
}

/// Something that hands out and takes back runs of physical frames.
///
/// This is the interface thread stacks and other kernel structures allocate
/// physical memory through.
pub trait FrameSource {
    /// Allocates `n` contiguous frames, or `None` if no run is available.
    fn get_frames(&mut self, n: u32) -> Option<FrameNumber>;

    /// Releases the run starting at `first`.
    ///
    /// # Errors
    /// Returns a [`ReleaseError`] if `first` does not start a live run.
    fn release_frames(&mut self, first: FrameNumber) -> Result<(), ReleaseError>;
}

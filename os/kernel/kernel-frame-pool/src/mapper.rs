//! # Metadata Placement
//!
//! A frame pool keeps its free-extent list and its ledger in dedicated metadata
//! frames, either carved from its own front or borrowed from another pool. The
//! [`MetadataMapper`] trait turns those frames into node storage.
//!
//! - In the kernel, [`IdentityMetadataMapper`] casts the identity-mapped
//!   physical frames into a `&'static mut [Node]`.
//! - On the host, tests hand out ordinary vectors of the same capacity.

use crate::slab::Node;
use kernel_memory_addresses::{FrameNumber, PAGE_SIZE};

/// Node storage for one pool, split between its two lists.
pub struct MetadataStorage<S> {
    pub extents: S,
    pub ledger: S,
}

/// Number of nodes each list gets from `frames` metadata frames.
#[inline]
#[must_use]
pub const fn nodes_per_list(frames: u32) -> usize {
    (frames as usize * PAGE_SIZE as usize) / size_of::<Node>() / 2
}

/// Maps a pool's metadata frames to node storage.
///
/// # Safety
/// Implementors must return storage that is valid for the whole lifetime of
/// the pool and not aliased by anything else, in particular not by memory that
/// any pool hands out.
pub unsafe trait MetadataMapper {
    type Storage: AsRef<[Node]> + AsMut<[Node]>;

    /// Provides storage backed by `frames` frames starting at `first`.
    fn map_metadata(&self, first: FrameNumber, frames: u32) -> MetadataStorage<Self::Storage>;
}

/// [`MetadataMapper`] for metadata frames that are identity mapped.
///
/// This holds before paging is enabled and, afterwards, for every frame inside
/// the shared low-memory region.
pub struct IdentityMetadataMapper {
    _private: (),
}

impl IdentityMetadataMapper {
    /// # Safety
    /// Every metadata frame passed to [`map_metadata`](MetadataMapper::map_metadata)
    /// must be identity mapped, writable, and exclusively owned by the pool
    /// being constructed for the rest of the kernel's lifetime.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

unsafe impl MetadataMapper for IdentityMetadataMapper {
    type Storage = &'static mut [Node];

    fn map_metadata(&self, first: FrameNumber, frames: u32) -> MetadataStorage<Self::Storage> {
        let per_list = nodes_per_list(frames);
        let base = first.base().as_mut_ptr::<Node>();

        // SAFETY: The constructor contract guarantees that the frames are
        // identity mapped and exclusively ours; `2 * per_list` nodes fit in them.
        let nodes = unsafe {
            for i in 0..2 * per_list {
                base.add(i).write(Node::EMPTY);
            }
            core::slice::from_raw_parts_mut(base, 2 * per_list)
        };

        let (extents, ledger) = nodes.split_at_mut(per_list);
        MetadataStorage { extents, ledger }
    }
}

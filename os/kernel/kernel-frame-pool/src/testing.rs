//! Host-side fixtures shared by the tests of this crate and its dependents.

use crate::mapper::{MetadataMapper, MetadataStorage, nodes_per_list};
use crate::slab::Node;
use alloc::vec;
use alloc::vec::Vec;
use kernel_memory_addresses::FrameNumber;

/// Backs pool metadata with heap vectors of the same capacity the metadata
/// frames would provide.
pub struct VecMapper;

// SAFETY: Every call returns two fresh vectors that nothing else refers to.
unsafe impl MetadataMapper for VecMapper {
    type Storage = Vec<Node>;

    fn map_metadata(&self, _first: FrameNumber, frames: u32) -> MetadataStorage<Vec<Node>> {
        let n = nodes_per_list(frames);
        MetadataStorage {
            extents: vec![Node::EMPTY; n],
            ledger: vec![Node::EMPTY; n],
        }
    }
}

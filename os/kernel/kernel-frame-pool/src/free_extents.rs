//! # Free-Extent Tracker
//!
//! An ordered, coalescing free-list of contiguous frame runs within one managed
//! region.
//!
//! ## Invariants
//! - Extents are linked in ascending `start` order.
//! - No two extents overlap and no two extents are adjacent; a release that
//!   touches a neighbour is merged into it immediately.
//! - Every extent has a non-zero length.
//!
//! ## Allocation policy
//! First fit in address order, always carved from the **low end** of the
//! matched extent, which makes the returned frame deterministic.

use crate::slab::{Node, NodeIndex, Slab};
use core::fmt;
use kernel_memory_addresses::FrameNumber;

/// A contiguous run of frames.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent {
    pub start: FrameNumber,
    pub length: u32,
}

impl Extent {
    #[inline]
    #[must_use]
    pub const fn new(start: FrameNumber, length: u32) -> Self {
        Self { start, length }
    }

    /// One past the last frame of the run.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> FrameNumber {
        FrameNumber::new(self.start.as_u32() + self.length)
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, frame: FrameNumber) -> bool {
        frame.as_u32() >= self.start.as_u32() && frame.as_u32() < self.end().as_u32()
    }

    /// Whether the two runs share at least one frame.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start.as_u32() < other.end().as_u32() && other.start.as_u32() < self.end().as_u32()
    }

    const fn from_node(node: &Node) -> Self {
        Self::new(FrameNumber::new(node.start), node.length)
    }
}

impl fmt::Debug for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Ordered, coalescing list of free frame runs.
pub struct FreeExtents<S> {
    slab: Slab<S>,
    head: Option<NodeIndex>,
    free_frames: u32,
}

impl<S> FreeExtents<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    /// Creates an empty tracker over the given node storage.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            slab: Slab::new(storage),
            head: None,
            free_frames: 0,
        }
    }

    /// Maximum number of extents the tracker can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slab.capacity()
    }

    /// Establishes the tracker over `[start, start + length)` as one extent,
    /// discarding any prior state.
    ///
    /// # Panics
    /// Panics if the node storage is empty.
    pub fn initialize(&mut self, start: FrameNumber, length: u32) {
        debug_assert!(length > 0, "free-extent tracker over an empty region");
        self.slab.clear();
        self.head = None;
        self.free_frames = 0;
        if length == 0 {
            return;
        }

        let index = self.insert_node(Node::new(start.as_u32(), length));
        self.head = Some(index);
        self.free_frames = length;
    }

    /// Takes `n` contiguous frames from the first extent large enough.
    ///
    /// Returns `None` when no extent can hold `n` frames or `n` is zero.
    pub fn allocate(&mut self, n: u32) -> Option<FrameNumber> {
        if n == 0 {
            return None;
        }

        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = *self.slab.get(index);
            if node.length >= n {
                if node.length == n {
                    self.unlink(prev, index);
                } else {
                    let slot = self.slab.get_mut(index);
                    slot.start += n;
                    slot.length -= n;
                }
                self.free_frames -= n;
                return Some(FrameNumber::new(node.start));
            }
            prev = cursor;
            cursor = NodeIndex::from_link(node.next);
        }

        None
    }

    /// Reinserts `[start, start + length)` and merges it with its neighbours.
    ///
    /// The run must have been allocated from this tracker and must not be
    /// free already; overlap is only caught by debug assertions.
    ///
    /// # Panics
    /// Panics if a new extent is needed and the node storage is exhausted.
    pub fn release(&mut self, start: FrameNumber, length: u32) {
        if length == 0 {
            return;
        }
        let start = start.as_u32();
        let end = start + length;

        let (prev, next) = self.neighbours(start);
        if let Some(p) = prev {
            debug_assert!(self.slab.get(p).end() <= start, "released run overlaps a free extent");
        }
        if let Some(n) = next {
            debug_assert!(end <= self.slab.get(n).start, "released run overlaps a free extent");
        }

        let merge_prev = prev.filter(|&p| self.slab.get(p).end() == start);
        let merge_next = next.filter(|&n| self.slab.get(n).start == end);

        match (merge_prev, merge_next) {
            (Some(p), Some(n)) => {
                let next_node = *self.slab.get(n);
                let slot = self.slab.get_mut(p);
                slot.length += length + next_node.length;
                slot.next = next_node.next;
                self.slab.remove(n);
            }
            (Some(p), None) => {
                self.slab.get_mut(p).length += length;
            }
            (None, Some(n)) => {
                let slot = self.slab.get_mut(n);
                slot.start = start;
                slot.length += length;
            }
            (None, None) => {
                let index = self.insert_node(Node::new(start, length));
                self.slab.set_next(index, next);
                self.link_after(prev, index);
            }
        }

        self.free_frames += length;
    }

    /// Removes `[start, start + length)` from the free set without recording an
    /// allocation, clipping or splitting the extents it touches.
    ///
    /// Frames in the range that are not free are ignored. Returns how many free
    /// frames were removed.
    ///
    /// # Panics
    /// Panics if an extent must be split and the node storage is exhausted.
    pub fn mark_unavailable(&mut self, start: FrameNumber, length: u32) -> u32 {
        let start = start.as_u32();
        let end = start.saturating_add(length);
        let mut removed = 0;

        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = *self.slab.get(index);
            let next = NodeIndex::from_link(node.next);
            if node.start >= end {
                break;
            }
            if node.end() <= start {
                prev = cursor;
                cursor = next;
                continue;
            }

            let covers_front = start <= node.start;
            let covers_back = end >= node.end();
            match (covers_front, covers_back) {
                (true, true) => {
                    removed += node.length;
                    self.unlink(prev, index);
                    cursor = next;
                    continue;
                }
                (true, false) => {
                    removed += end - node.start;
                    let slot = self.slab.get_mut(index);
                    slot.start = end;
                    slot.length = node.end() - end;
                }
                (false, true) => {
                    removed += node.end() - start;
                    self.slab.get_mut(index).length = start - node.start;
                }
                (false, false) => {
                    removed += end - start;
                    self.slab.get_mut(index).length = start - node.start;
                    let tail = self.insert_node(Node::new(end, node.end() - end));
                    self.slab.set_next(tail, next);
                    self.slab.set_next(index, Some(tail));
                }
            }
            prev = cursor;
            cursor = next;
        }

        self.free_frames -= removed;
        removed
    }

    /// Total number of free frames.
    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> u32 {
        self.free_frames
    }

    /// Number of free extents.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.slab.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterates the free extents in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Extent> + '_ {
        self.slab.walk(self.head).map(|(_, node)| Extent::from_node(&node))
    }

    /// Whether `frame` is currently free.
    #[must_use]
    pub fn is_free(&self, frame: FrameNumber) -> bool {
        self.iter().any(|e| e.contains(frame))
    }

    /// The last extent starting below `start` and its successor.
    fn neighbours(&self, start: u32) -> (Option<NodeIndex>, Option<NodeIndex>) {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            if self.slab.get(index).start >= start {
                break;
            }
            prev = cursor;
            cursor = self.slab.next(index);
        }
        (prev, cursor)
    }

    fn insert_node(&mut self, node: Node) -> NodeIndex {
        let Some(index) = self.slab.insert(node) else {
            panic!(
                "free-extent storage exhausted ({} extents)",
                self.slab.capacity()
            );
        };
        index
    }

    fn link_after(&mut self, prev: Option<NodeIndex>, index: NodeIndex) {
        match prev {
            Some(p) => self.slab.set_next(p, Some(index)),
            None => self.head = Some(index),
        }
    }

    fn unlink(&mut self, prev: Option<NodeIndex>, index: NodeIndex) {
        let next = self.slab.next(index);
        match prev {
            Some(p) => self.slab.set_next(p, next),
            None => self.head = next,
        }
        self.slab.remove(index);
    }
}

impl<S> fmt::Debug for FreeExtents<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

//! Fixed-capacity node storage for the intrusive lists of a frame pool.
//!
//! A frame allocator cannot allocate memory for its own bookkeeping, so both
//! the free-extent list and the allocation ledger draw their nodes from a
//! pre-sized [`Slab`]. Unused slots are chained through their `next` link into
//! a free-index list and recycled on release.

use core::fmt;

/// Link value terminating a list.
pub const NIL: u32 = u32::MAX;

/// One list node as stored in the metadata frames.
///
/// The same layout serves the free-extent list (`start` is an absolute frame
/// number) and the ledger (`start` is relative to the pool base).
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Node {
    pub start: u32,
    pub length: u32,
    pub next: u32,
}

impl Node {
    /// An unlinked, zero-length node.
    pub const EMPTY: Self = Self {
        start: 0,
        length: 0,
        next: NIL,
    };

    #[inline]
    #[must_use]
    pub const fn new(start: u32, length: u32) -> Self {
        Self {
            start,
            length,
            next: NIL,
        }
    }

    /// One past the last frame covered by this node.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.length
    }
}

/// Index of an occupied slot in a [`Slab`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Decodes a stored link.
    #[inline]
    #[must_use]
    pub const fn from_link(link: u32) -> Option<Self> {
        if link == NIL { None } else { Some(Self(link)) }
    }

    /// Encodes an optional index as a stored link.
    #[inline]
    #[must_use]
    pub const fn to_link(index: Option<Self>) -> u32 {
        match index {
            Some(Self(i)) => i,
            None => NIL,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}

/// Pre-sized node storage with free-index recycling.
///
/// `S` is anything that derefs to a mutable node slice: a `&'static mut [Node]`
/// over metadata frames in the kernel, a `Vec<Node>` in host tests.
pub struct Slab<S> {
    storage: S,
    free_head: Option<NodeIndex>,
    used: usize,
}

impl<S> Slab<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    /// Takes ownership of `storage` and marks every slot free.
    ///
    /// # Panics
    /// Panics if the storage holds `u32::MAX` or more nodes.
    #[must_use]
    pub fn new(storage: S) -> Self {
        assert!(
            u32::try_from(storage.as_ref().len()).is_ok_and(|n| n != NIL),
            "slab storage too large"
        );
        let mut slab = Self {
            storage,
            free_head: None,
            used: 0,
        };
        slab.clear();
        slab
    }

    /// Returns every slot to the free-index list.
    #[allow(clippy::cast_possible_truncation)]
    pub fn clear(&mut self) {
        let nodes = self.storage.as_mut();
        let len = nodes.len();
        for (i, node) in nodes.iter_mut().enumerate() {
            *node = Node::EMPTY;
            if i + 1 < len {
                node.next = (i + 1) as u32;
            }
        }
        self.free_head = if len == 0 {
            None
        } else {
            Some(NodeIndex(0))
        };
        self.used = 0;
    }

    /// Total number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.used
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    /// Stores `node` in a free slot, or returns `None` when every slot is taken.
    pub fn insert(&mut self, node: Node) -> Option<NodeIndex> {
        let index = self.free_head?;
        let slot = &mut self.storage.as_mut()[index.as_usize()];
        self.free_head = NodeIndex::from_link(slot.next);
        *slot = node;
        self.used += 1;
        Some(index)
    }

    /// Returns the slot at `index` to the free-index list.
    pub fn remove(&mut self, index: NodeIndex) {
        let slot = &mut self.storage.as_mut()[index.as_usize()];
        *slot = Node::EMPTY;
        slot.next = NodeIndex::to_link(self.free_head);
        self.free_head = Some(index);
        self.used -= 1;
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> &Node {
        &self.storage.as_ref()[index.as_usize()]
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.storage.as_mut()[index.as_usize()]
    }

    /// The successor of the node at `index`.
    #[inline]
    #[must_use]
    pub fn next(&self, index: NodeIndex) -> Option<NodeIndex> {
        NodeIndex::from_link(self.get(index).next)
    }

    #[inline]
    pub fn set_next(&mut self, index: NodeIndex, next: Option<NodeIndex>) {
        self.get_mut(index).next = NodeIndex::to_link(next);
    }

    /// Iterates the list starting at `head`.
    pub fn walk(&self, head: Option<NodeIndex>) -> Walk<'_, S> {
        Walk {
            slab: self,
            cursor: head,
        }
    }
}

/// Iterator over one intrusive list in a [`Slab`].
pub struct Walk<'a, S> {
    slab: &'a Slab<S>,
    cursor: Option<NodeIndex>,
}

impl<S> Iterator for Walk<'_, S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    type Item = (NodeIndex, Node);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = *self.slab.get(index);
        self.cursor = NodeIndex::from_link(node.next);
        Some((index, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_recycled() {
        let mut slab = Slab::new(vec![Node::EMPTY; 2]);
        let a = slab.insert(Node::new(1, 1)).unwrap();
        let b = slab.insert(Node::new(2, 1)).unwrap();
        assert!(slab.is_full());
        assert!(slab.insert(Node::new(3, 1)).is_none());

        slab.remove(a);
        assert_eq!(slab.len(), 1);
        let c = slab.insert(Node::new(4, 1)).unwrap();
        assert_eq!(c, a);
        assert_eq!(slab.get(b).start, 2);
        assert_eq!(slab.get(c).start, 4);
    }

    #[test]
    fn empty_storage_is_full() {
        let mut slab = Slab::new(Vec::<Node>::new());
        assert_eq!(slab.capacity(), 0);
        assert!(slab.is_full());
        assert!(slab.insert(Node::new(0, 1)).is_none());
    }

    #[test]
    fn walk_follows_links() {
        let mut slab = Slab::new(vec![Node::EMPTY; 4]);
        let a = slab.insert(Node::new(10, 1)).unwrap();
        let b = slab.insert(Node::new(20, 2)).unwrap();
        slab.set_next(a, Some(b));
        let starts: Vec<u32> = slab.walk(Some(a)).map(|(_, n)| n.start).collect();
        assert_eq!(starts, [10, 20]);
    }
}

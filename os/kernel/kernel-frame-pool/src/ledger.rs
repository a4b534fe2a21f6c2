//! Per-pool record of live allocations.
//!
//! A release request only carries the first frame of a run, so the pool keeps
//! one `{relative_start, length}` record per live allocation. Records are kept
//! newest-first and their nodes are recycled on release, so the ledger never
//! holds more records than there are live allocations.

use crate::slab::{Node, NodeIndex, Slab};

/// One ledger record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedgerEntry {
    /// First frame of the run, relative to the pool's base frame.
    pub relative_start: u32,
    /// Number of frames in the run.
    pub length: u32,
}

pub struct Ledger<S> {
    slab: Slab<S>,
    head: Option<NodeIndex>,
}

impl<S> Ledger<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            slab: Slab::new(storage),
            head: None,
        }
    }

    /// Adds a record at the front. Returns `false` if the ledger is full.
    #[must_use]
    pub fn record(&mut self, relative_start: u32, length: u32) -> bool {
        let Some(index) = self.slab.insert(Node::new(relative_start, length)) else {
            return false;
        };
        self.slab.set_next(index, self.head);
        self.head = Some(index);
        true
    }

    /// Removes the record starting at `relative_start` and returns its length.
    pub fn take(&mut self, relative_start: u32) -> Option<u32> {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = *self.slab.get(index);
            if node.start == relative_start {
                let next = NodeIndex::from_link(node.next);
                match prev {
                    Some(p) => self.slab.set_next(p, next),
                    None => self.head = next,
                }
                self.slab.remove(index);
                return Some(node.length);
            }
            prev = cursor;
            cursor = NodeIndex::from_link(node.next);
        }
        None
    }

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

    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.slab.is_full()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slab.capacity()
    }

    /// Iterates the records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = LedgerEntry> + '_ {
        self.slab.walk(self.head).map(|(_, node)| LedgerEntry {
            relative_start: node.start,
            length: node.length,
        })
    }
}

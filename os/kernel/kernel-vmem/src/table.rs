//! # Page Directory and Page Table
//!
//! Both levels of 32-bit paging use the same page-sized array of 1024
//! [`PageEntry`] values. A linear address is split as:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! - [`DirectoryIndex`]: bits `[31:22]`, selects a page table (4 MiB each).
//! - [`TableIndex`]: bits `[21:12]`, selects a 4 KiB page in that table.

use crate::PageEntry;
use kernel_memory_addresses::{ENTRIES_PER_PAGE, PageNumber, VirtualAddress};

/// Index into the page directory (derived from VA bits `[31:22]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u16);

/// Index into a page table (derived from VA bits `[21:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl DirectoryIndex {
    /// Build an index from a virtual address (extracts bits `[31:22]`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new((va.as_u32() >> 22) as u16)
    }

    /// Construct from a raw `u16`.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < ENTRIES_PER_PAGE);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TableIndex {
    /// Build an index from a virtual address (extracts bits `[21:12]`).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    /// Construct from a raw `u16`.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 1024` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < ENTRIES_PER_PAGE);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Splits a page number into its directory and table index.
#[inline]
#[must_use]
pub const fn indices(page: PageNumber) -> (DirectoryIndex, TableIndex) {
    let va = page.base();
    (DirectoryIndex::from(va), TableIndex::from(va))
}

/// A page directory or page table: 1024 entries, 4 KiB-aligned.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct Table {
    entries: [PageEntry; ENTRIES_PER_PAGE],
}

const _: () = assert!(size_of::<Table>() == 4096);

impl Table {
    /// A table whose entries are all [`PageEntry::not_present`].
    #[inline]
    #[must_use]
    pub const fn not_present() -> Self {
        Self {
            entries: [PageEntry::not_present(); ENTRIES_PER_PAGE],
        }
    }

    /// Overwrites every entry with `entry`.
    #[inline]
    pub fn fill(&mut self, entry: PageEntry) {
        self.entries.fill(entry);
    }

    /// Directory entry for the table covering `i`.
    #[inline]
    #[must_use]
    pub const fn directory_entry(&self, i: DirectoryIndex) -> PageEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set_directory_entry(&mut self, i: DirectoryIndex, e: PageEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Table entry for the page at `i`.
    #[inline]
    #[must_use]
    pub const fn table_entry(&self, i: TableIndex) -> PageEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set_table_entry(&mut self, i: TableIndex, e: PageEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Whether no entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| !e.present())
    }

    /// All entries in index order.
    #[inline]
    #[must_use]
    pub const fn entries(&self) -> &[PageEntry; ENTRIES_PER_PAGE] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::FrameNumber;

    #[test]
    fn indices_split_linear_address() {
        let va = VirtualAddress::new(0x0080_3123);
        assert_eq!(DirectoryIndex::from(va).as_usize(), 2);
        assert_eq!(TableIndex::from(va).as_usize(), 3);

        let (d, t) = indices(VirtualAddress::new(0xFFFF_F000).page());
        assert_eq!((d.as_usize(), t.as_usize()), (1023, 1023));
    }

    #[test]
    fn emptiness_tracks_present_entries() {
        let mut table = Table::not_present();
        assert!(table.is_empty());
        table.set_table_entry(TableIndex::new(7), PageEntry::mapped(FrameNumber::new(9)));
        assert!(!table.is_empty());
        assert_eq!(table.table_entry(TableIndex::new(7)).frame(), FrameNumber::new(9));
        table.fill(PageEntry::not_present());
        assert!(table.is_empty());
    }
}

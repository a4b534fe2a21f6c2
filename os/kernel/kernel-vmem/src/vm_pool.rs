//! # Virtual Memory Pool
//!
//! A [`VmPool`] sub-allocates a range of virtual addresses into regions. It
//! never touches physical memory: pages of an allocated region are backed on
//! first access by the page-fault handler, and released through the page
//! table when the region is returned (see [`Paging::vm_release`]).
//!
//! ## Invariants
//! - Free and allocated regions are pairwise disjoint and page-granular.
//! - Together they cover `[base, base + size)` exactly.
//! - Free regions are kept in address order and adjacent free regions are
//!   merged, so first fit returns the lowest suitable address.
//!
//! [`Paging::vm_release`]: crate::Paging::vm_release

use crate::page_table::{PageTable, RECURSIVE_TABLES_BASE};
use core::fmt;
use kernel_frame_pool::PoolId;
use kernel_info::memory::MAX_REGIONS;
use kernel_memory_addresses::{PAGE_SIZE, PageNumber, VirtualAddress, pages_for};

/// A contiguous, page-granular range of virtual addresses.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Region {
    pub start: VirtualAddress,
    pub size: u32,
}

impl Region {
    #[inline]
    #[must_use]
    pub const fn new(start: VirtualAddress, size: u32) -> Self {
        Self { start, size }
    }

    /// One past the last byte of the region.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> VirtualAddress {
        VirtualAddress::new(self.start.as_u32() + self.size)
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        va.as_u32() >= self.start.as_u32() && va.as_u32() < self.end().as_u32()
    }

    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start.as_u32() < other.end().as_u32() && other.start.as_u32() < self.end().as_u32()
    }

    /// The pages making up the region.
    pub fn pages(&self) -> impl Iterator<Item = PageNumber> + use<> {
        let first = self.start.page();
        (0..self.size / PAGE_SIZE).map(move |i| first + i)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// A pool that cannot be constructed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmPoolError {
    #[error("VM pool base {0} is not page aligned")]
    UnalignedBase(VirtualAddress),
    #[error("VM pool size {0:#x} is not a multiple of the page size")]
    UnalignedSize(u32),
    #[error("VM pool at {base} with size {size:#x} reaches into the page-table window")]
    OutOfRange { base: VirtualAddress, size: u32 },
}

/// Region allocator over one range of virtual addresses.
pub struct VmPool {
    base: VirtualAddress,
    size: u32,
    frame_pool: PoolId,
    page_table: PageTable,
    free: heapless::Vec<Region, { MAX_REGIONS + 1 }>,
    allocated: heapless::Vec<Region, MAX_REGIONS>,
}

impl VmPool {
    /// Creates a pool over `[base, base + size)` whose pages are backed by
    /// frames from `frame_pool` and mapped in `page_table`.
    ///
    /// The pool only becomes visible to the fault handler once registered
    /// with [`Paging::register_pool`](crate::Paging::register_pool).
    ///
    /// # Errors
    /// Returns a [`VmPoolError`] if the range is not page aligned or overlaps
    /// the recursive page-table window at the top of the address space.
    pub fn new(
        base: VirtualAddress,
        size: u32,
        frame_pool: PoolId,
        page_table: PageTable,
    ) -> Result<Self, VmPoolError> {
        if !base.is_page_aligned() {
            return Err(VmPoolError::UnalignedBase(base));
        }
        if !size.is_multiple_of(PAGE_SIZE) {
            return Err(VmPoolError::UnalignedSize(size));
        }
        match base.checked_add(size) {
            Some(end) if end <= RECURSIVE_TABLES_BASE => {}
            _ => return Err(VmPoolError::OutOfRange { base, size }),
        }

        let mut free = heapless::Vec::new();
        if size > 0 {
            // A fresh vector always has room for one region.
            let _ = free.push(Region::new(base, size));
        }

        Ok(Self {
            base,
            size,
            frame_pool,
            page_table,
            free,
            allocated: heapless::Vec::new(),
        })
    }

    /// Reserves `size` bytes, rounded up to whole pages.
    ///
    /// Returns `None` if `size` is zero, no free region is large enough, or
    /// the allocated-region list is full. No frames are touched.
    pub fn allocate(&mut self, size: u32) -> Option<VirtualAddress> {
        if size == 0 || self.allocated.is_full() {
            return None;
        }
        let bytes = pages_for(size).checked_mul(PAGE_SIZE)?;

        let i = self.free.iter().position(|r| r.size >= bytes)?;
        let start = self.free[i].start;
        if self.free[i].size == bytes {
            self.free.remove(i);
        } else {
            self.free[i].start += bytes;
            self.free[i].size -= bytes;
        }

        // Checked above.
        let _ = self.allocated.push(Region::new(start, bytes));
        Some(start)
    }

    /// Removes the allocated region starting exactly at `start`.
    pub(crate) fn take_allocated(&mut self, start: VirtualAddress) -> Option<Region> {
        let i = self.allocated.iter().position(|r| r.start == start)?;
        Some(self.allocated.remove(i))
    }

    /// Puts `region` back into the free list, merging it with its neighbours.
    ///
    /// # Panics
    /// Panics if the free list is full, which the region invariants rule out.
    pub(crate) fn return_region(&mut self, region: Region) {
        let i = self
            .free
            .iter()
            .position(|r| r.start > region.start)
            .unwrap_or(self.free.len());
        let merge_prev = i > 0 && self.free[i - 1].end() == region.start;
        let merge_next = i < self.free.len() && region.end() == self.free[i].start;

        match (merge_prev, merge_next) {
            (true, true) => {
                let next = self.free.remove(i);
                self.free[i - 1].size += region.size + next.size;
            }
            (true, false) => self.free[i - 1].size += region.size,
            (false, true) => {
                self.free[i].start = region.start;
                self.free[i].size += region.size;
            }
            (false, false) => {
                if self.free.insert(i, region).is_err() {
                    panic!("VM pool free list is full ({} regions)", MAX_REGIONS + 1);
                }
            }
        }
    }

    /// Whether `va` lies inside a currently allocated region.
    #[must_use]
    pub fn is_legitimate(&self, va: VirtualAddress) -> bool {
        self.allocated.iter().any(|r| r.contains(va))
    }

    /// Whether `va` lies inside the pool's range at all.
    #[inline]
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        self.span().contains(va)
    }

    /// The whole range the pool manages.
    #[inline]
    #[must_use]
    pub const fn span(&self) -> Region {
        Region::new(self.base, self.size)
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// The frame pool that backs this pool's pages.
    #[inline]
    #[must_use]
    pub const fn frame_pool(&self) -> PoolId {
        self.frame_pool
    }

    #[inline]
    #[must_use]
    pub const fn page_table(&self) -> PageTable {
        self.page_table
    }

    /// Free regions in address order.
    #[inline]
    #[must_use]
    pub fn free_regions(&self) -> &[Region] {
        &self.free
    }

    /// Allocated regions in allocation order.
    #[inline]
    #[must_use]
    pub fn allocated_regions(&self) -> &[Region] {
        &self.allocated
    }
}

impl fmt::Debug for VmPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmPool")
            .field("range", &self.span())
            .field("free", &self.free_regions())
            .field("allocated", &self.allocated_regions())
            .finish_non_exhaustive()
    }
}

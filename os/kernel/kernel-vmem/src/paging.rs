//! # Paging Context
//!
//! [`Paging`] owns everything the memory subsystem shares between address
//! spaces: the frame-pool registry, the identities of the kernel and process
//! pools, the size of the shared identity-mapped region, the page-table frames,
//! the MMU, the currently loaded page table, and the registry of VM pools used
//! to validate fault addresses.
//!
//! ## Page-table construction
//!
//! A new [`PageTable`] gets a directory frame plus one table frame per 4 MiB
//! of shared region, all from the kernel pool. Shared tables identity map
//! `[0, shared_size)`; all other entries start not-present. The last directory
//! slot points back at the directory (see [`RECURSIVE_SLOT`]).
//!
//! ## Fault handling
//!
//! Faults are served lazily: a missing page table is allocated from the kernel
//! pool, a missing page from the backing pool. A fault in the shared region, in
//! the recursive window, or (once VM pools are registered for the loaded page
//! table) outside every allocated region is returned as a [`PageFaultError`],
//! which the exception dispatcher must treat as fatal.
//!
//! ## Unmapping
//!
//! [`Paging::free_page`] clears one table entry, returns the frame to its
//! pool, reclaims the page table once it holds no present entry (unless it
//! backs the shared region), and flushes the TLB.

use crate::mmu::Mmu;
use crate::page_table::{PageTable, RECURSIVE_SLOT, RECURSIVE_TABLES_BASE};
use crate::table::{DirectoryIndex, TableIndex, indices};
use crate::vm_pool::VmPool;
use crate::{PageEntry, TableFrames};
use core::fmt;
use kernel_frame_pool::slab::Node;
use kernel_frame_pool::{FrameSource, PoolId, PoolRegistry, ReleaseError};
use kernel_info::memory::MAX_VM_POOLS;
use kernel_memory_addresses::{
    ENTRIES_PER_PAGE, FrameNumber, PAGE_SIZE, PageNumber, PhysicalAddress, TABLE_SPAN,
    VirtualAddress,
};
use log::{debug, error, info, trace, warn};

/// Handle of a VM pool registered with a [`Paging`] context.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct VmPoolId(u8);

impl VmPoolId {
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VmPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VmPoolId({})", self.0)
    }
}

/// A page table could not be built.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PagingError {
    #[error("out of kernel frames while building a page table")]
    OutOfFrames,
}

/// A page fault that cannot be resolved; the faulting access must not resume.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageFaultError {
    #[error("page fault at {0} before any page table was loaded")]
    NoPageTable(VirtualAddress),
    #[error("page fault at {0} inside the always-resident shared region")]
    SharedRegion(VirtualAddress),
    #[error("page fault at {0} outside every allocated region")]
    Illegitimate(VirtualAddress),
    #[error("out of frames while serving page fault at {0}")]
    OutOfFrames(VirtualAddress),
}

/// Result of a successfully handled page fault.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FaultOutcome {
    /// A new frame was mapped at the faulting page.
    Mapped(FrameNumber),
    /// The page was mapped already (spurious fault).
    AlreadyMapped(FrameNumber),
}

/// A VM-pool release that could not be honoured.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmReleaseError {
    #[error("no allocated region starts at {0}")]
    UnknownRegion(VirtualAddress),
}

/// Paging state shared by all address spaces.
pub struct Paging<S, T, M> {
    pools: PoolRegistry<S>,
    kernel_pool: PoolId,
    process_pool: PoolId,
    shared_size: u32,
    tables: T,
    mmu: M,
    current: Option<PageTable>,
    paging_enabled: bool,
    vm_pools: heapless::Vec<VmPool, MAX_VM_POOLS>,
}

impl<S, T, M> Paging<S, T, M>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
    T: TableFrames,
    M: Mmu,
{
    /// Sets up paging over the given pools.
    ///
    /// Page-table frames come from `kernel_pool`; data frames for faults
    /// outside any VM pool come from `process_pool`. The first `shared_size`
    /// bytes are identity mapped into every page table.
    ///
    /// # Panics
    /// Panics if `shared_size` is not page aligned or reaches into the
    /// recursive page-table window.
    #[must_use]
    pub fn new(
        pools: PoolRegistry<S>,
        kernel_pool: PoolId,
        process_pool: PoolId,
        shared_size: u32,
        tables: T,
        mmu: M,
    ) -> Self {
        assert!(
            shared_size.is_multiple_of(PAGE_SIZE),
            "shared size {shared_size:#x} is not page aligned"
        );
        assert!(
            shared_size <= RECURSIVE_TABLES_BASE.as_u32(),
            "shared size {shared_size:#x} overlaps the recursive page-table window"
        );
        debug!("Initialized paging with {shared_size:#x} shared bytes");

        Self {
            pools,
            kernel_pool,
            process_pool,
            shared_size,
            tables,
            mmu,
            current: None,
            paging_enabled: false,
            vm_pools: heapless::Vec::new(),
        }
    }

    /// Number of page tables needed to map the shared region.
    #[inline]
    #[must_use]
    pub const fn shared_tables(&self) -> u32 {
        self.shared_size.div_ceil(TABLE_SPAN)
    }

    /// Builds a new address space with the shared region identity mapped.
    ///
    /// # Errors
    /// [`PagingError::OutOfFrames`] if the kernel pool cannot supply the
    /// directory and shared tables; nothing is leaked in that case.
    #[allow(clippy::cast_possible_truncation)]
    pub fn create_page_table(&mut self) -> Result<PageTable, PagingError> {
        let directory = self
            .pools
            .get_frames(self.kernel_pool, 1)
            .ok_or(PagingError::OutOfFrames)?;
        self.tables
            .table_mut(directory)
            .fill(PageEntry::not_present());

        for t in 0..self.shared_tables() {
            let Some(frame) = self.pools.get_frames(self.kernel_pool, 1) else {
                self.discard_directory(directory, t);
                return Err(PagingError::OutOfFrames);
            };

            let shared_size = self.shared_size;
            let table = self.tables.table_mut(frame);
            for i in 0..ENTRIES_PER_PAGE as u16 {
                let addr = t * TABLE_SPAN + u32::from(i) * PAGE_SIZE;
                let entry = if addr < shared_size {
                    PageEntry::mapped(PhysicalAddress::new(addr).frame())
                } else {
                    PageEntry::not_present()
                };
                table.set_table_entry(TableIndex::new(i), entry);
            }

            self.tables
                .table_mut(directory)
                .set_directory_entry(DirectoryIndex::new(t as u16), PageEntry::mapped(frame));
        }

        self.tables
            .table_mut(directory)
            .set_directory_entry(RECURSIVE_SLOT, PageEntry::mapped(directory));

        debug!(
            "Created page table with directory at {} and {} shared table(s)",
            directory.base(),
            self.shared_tables()
        );
        Ok(PageTable::new(directory))
    }

    /// Releases a half-built directory and its first `tables` shared tables.
    #[allow(clippy::cast_possible_truncation)]
    fn discard_directory(&mut self, directory: FrameNumber, tables: u32) {
        for t in 0..tables {
            let pde = self
                .tables
                .table(directory)
                .directory_entry(DirectoryIndex::new(t as u16));
            let _ = self.pools.release_frames(pde.frame());
        }
        let _ = self.pools.release_frames(directory);
    }

    /// Installs `page_table` in the MMU and records it as the current one.
    pub fn load(&mut self, page_table: PageTable) {
        self.mmu.load_directory(page_table.directory());
        self.current = Some(page_table);
        info!("Loaded page table with directory at {}", page_table.directory().base());
    }

    /// Turns paging on. Calling it again has no effect.
    pub fn enable_paging(&mut self) {
        if self.paging_enabled {
            return;
        }
        self.mmu.enable_paging();
        self.paging_enabled = true;
        info!("Paging enabled");
    }

    #[inline]
    #[must_use]
    pub const fn is_paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    /// The page table that is loaded in the MMU.
    #[inline]
    #[must_use]
    pub const fn current_page_table(&self) -> Option<PageTable> {
        self.current
    }

    /// Serves the page fault whose address is in CR2.
    ///
    /// # Errors
    /// See [`handle_fault_at`](Self::handle_fault_at).
    pub fn handle_fault(&mut self) -> Result<FaultOutcome, PageFaultError> {
        let va = self.mmu.fault_address();
        self.handle_fault_at(va)
    }

    /// Serves a page fault at `va` in the current page table.
    ///
    /// # Errors
    /// - [`PageFaultError::NoPageTable`] if no page table is loaded.
    /// - [`PageFaultError::SharedRegion`] for addresses below the shared size.
    /// - [`PageFaultError::Illegitimate`] for addresses in the recursive
    ///   window, or outside every allocated region once VM pools are
    ///   registered for the current page table.
    /// - [`PageFaultError::OutOfFrames`] if no table or data frame is left.
    pub fn handle_fault_at(&mut self, va: VirtualAddress) -> Result<FaultOutcome, PageFaultError> {
        let Some(pt) = self.current else {
            error!("Page fault at {va} without a loaded page table");
            return Err(PageFaultError::NoPageTable(va));
        };
        if va.as_u32() < self.shared_size {
            error!("Page fault at {va} inside the shared region");
            return Err(PageFaultError::SharedRegion(va));
        }
        if va >= RECURSIVE_TABLES_BASE {
            error!("Page fault at {va} inside the page-table window");
            return Err(PageFaultError::Illegitimate(va));
        }

        let backing = match self.backing_pool(pt, va) {
            Ok(id) => id,
            Err(err) => {
                error!("Page fault at {va} outside every allocated region");
                return Err(err);
            }
        };

        let (dir_index, table_index) = indices(va.page());
        let pde = self.tables.table(pt.directory()).directory_entry(dir_index);
        let (table_frame, new_table) = match pde.present_frame() {
            Some(frame) => (frame, false),
            None => {
                let frame = self
                    .pools
                    .get_frames(self.kernel_pool, 1)
                    .ok_or(PageFaultError::OutOfFrames(va))?;
                self.tables
                    .table_mut(frame)
                    .fill(PageEntry::not_present());
                self.tables
                    .table_mut(pt.directory())
                    .set_directory_entry(dir_index, PageEntry::mapped(frame));
                trace!("Installed page table {} for {va}", frame.base());
                (frame, true)
            }
        };

        let pte = self.tables.table(table_frame).table_entry(table_index);
        if let Some(frame) = pte.present_frame() {
            return Ok(FaultOutcome::AlreadyMapped(frame));
        }

        let Some(frame) = self.pools.get_frames(backing, 1) else {
            if new_table {
                self.tables
                    .table_mut(pt.directory())
                    .set_directory_entry(dir_index, PageEntry::not_present());
                let _ = self.pools.release_frames(table_frame);
            }
            error!("Out of frames while serving page fault at {va}");
            return Err(PageFaultError::OutOfFrames(va));
        };
        self.tables
            .table_mut(table_frame)
            .set_table_entry(table_index, PageEntry::mapped(frame));
        trace!("Mapped {} at {}", frame.base(), va.align_down());
        Ok(FaultOutcome::Mapped(frame))
    }

    /// Pool that supplies the data frame for a fault at `va` in `pt`.
    fn backing_pool(&self, pt: PageTable, va: VirtualAddress) -> Result<PoolId, PageFaultError> {
        let mut guarded = false;
        for pool in self.vm_pools.iter().filter(|p| p.page_table() == pt) {
            if pool.is_legitimate(va) {
                return Ok(pool.frame_pool());
            }
            guarded = true;
        }
        if guarded {
            Err(PageFaultError::Illegitimate(va))
        } else {
            Ok(self.process_pool)
        }
    }

    /// Unmaps `page` in the current page table and flushes the TLB.
    ///
    /// Returns the released frame, or `None` if the page was not mapped.
    pub fn free_page(&mut self, page: PageNumber) -> Option<FrameNumber> {
        let Some(pt) = self.current else {
            warn!("Ignoring free of page {page:?}: no page table loaded");
            return None;
        };
        let freed = self.unmap_page(pt, page);
        self.mmu.flush_tlb();
        freed
    }

    /// Unmaps `page` in `page_table` without flushing the TLB.
    ///
    /// The frame goes back to whichever pool owns it. A page table left
    /// without present entries is returned to the kernel pool unless it maps
    /// the shared region. Pages of the shared region and of the recursive
    /// window are never unmapped.
    pub fn unmap_page(&mut self, page_table: PageTable, page: PageNumber) -> Option<FrameNumber> {
        let va = page.base();
        if va.as_u32() < self.shared_size || va >= RECURSIVE_TABLES_BASE {
            warn!("Refusing to unmap page at {va}");
            return None;
        }

        let (dir_index, table_index) = indices(page);
        let table_frame = self
            .tables
            .table(page_table.directory())
            .directory_entry(dir_index)
            .present_frame()?;

        let table = self.tables.table_mut(table_frame);
        let frame = table.table_entry(table_index).present_frame()?;
        table.set_table_entry(table_index, PageEntry::not_present());
        let table_empty = table.is_empty();

        let _ = self.pools.release_frames(frame);
        trace!("Unmapped {} at {va}", frame.base());

        if table_empty && dir_index.as_usize() >= self.shared_tables() as usize {
            self.tables
                .table_mut(page_table.directory())
                .set_directory_entry(dir_index, PageEntry::not_present());
            let _ = self.pools.release_frames(table_frame);
            debug!("Reclaimed empty page table {}", table_frame.base());
        }

        Some(frame)
    }

    /// Physical address `va` maps to in `page_table`, if any.
    #[must_use]
    pub fn translate(&self, page_table: PageTable, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (dir_index, table_index) = indices(va.page());
        let table_frame = self
            .tables
            .table(page_table.directory())
            .directory_entry(dir_index)
            .present_frame()?;
        let frame = self
            .tables
            .table(table_frame)
            .table_entry(table_index)
            .present_frame()?;
        Some(frame.base() + va.offset())
    }

    /// Adds `pool` to the VM-pool registry consulted on page faults.
    ///
    /// # Panics
    /// Panics if [`MAX_VM_POOLS`] pools are registered already, if the pool
    /// overlaps the shared region or another pool of the same page table, or
    /// if its backing frame pool is not in this context's registry.
    #[allow(clippy::cast_possible_truncation)]
    pub fn register_pool(&mut self, pool: VmPool) -> VmPoolId {
        assert!(
            pool.base().as_u32() >= self.shared_size,
            "VM pool at {} overlaps the shared region",
            pool.base()
        );
        assert!(
            pool.frame_pool().as_usize() < self.pools.len(),
            "VM pool at {} is backed by unknown frame pool {:?}",
            pool.base(),
            pool.frame_pool()
        );
        if let Some(other) = self
            .vm_pools
            .iter()
            .find(|p| p.page_table() == pool.page_table() && p.span().overlaps(&pool.span()))
        {
            panic!(
                "VM pool {:?} overlaps registered VM pool {:?}",
                pool.span(),
                other.span()
            );
        }
        let id = VmPoolId(self.vm_pools.len() as u8);
        debug!("Registered VM pool {pool:?}");
        if self.vm_pools.push(pool).is_err() {
            panic!("VM pool registry is full ({MAX_VM_POOLS} pools)");
        }
        id
    }

    #[inline]
    #[must_use]
    pub fn vm_pool(&self, id: VmPoolId) -> &VmPool {
        &self.vm_pools[id.as_usize()]
    }

    /// Reserves `size` bytes in the VM pool `id`; see [`VmPool::allocate`].
    pub fn vm_allocate(&mut self, id: VmPoolId, size: u32) -> Option<VirtualAddress> {
        let start = self.vm_pools[id.as_usize()].allocate(size);
        if let Some(start) = start {
            trace!("VM pool {id:?}: allocated {size:#x} bytes at {start}");
        }
        start
    }

    /// Releases the region starting at `start` in the VM pool `id`.
    ///
    /// Every page of the region is unmapped and its frame returned, then the
    /// region merges back into the pool's free list.
    ///
    /// # Errors
    /// [`VmReleaseError::UnknownRegion`] if no allocated region starts at
    /// `start`; nothing changes in that case.
    pub fn vm_release(&mut self, id: VmPoolId, start: VirtualAddress) -> Result<(), VmReleaseError> {
        let pool = &mut self.vm_pools[id.as_usize()];
        let page_table = pool.page_table();
        let Some(region) = pool.take_allocated(start) else {
            warn!("VM pool {id:?}: no allocated region starts at {start}");
            return Err(VmReleaseError::UnknownRegion(start));
        };

        for page in region.pages() {
            self.unmap_page(page_table, page);
            self.mmu.flush_tlb();
        }

        self.vm_pools[id.as_usize()].return_region(region);
        trace!("VM pool {id:?}: released {region:?}");
        Ok(())
    }

    /// Whether `va` lies in an allocated region of any registered VM pool.
    #[must_use]
    pub fn is_legitimate(&self, va: VirtualAddress) -> bool {
        self.vm_pools.iter().any(|p| p.is_legitimate(va))
    }

    #[inline]
    #[must_use]
    pub const fn pools(&self) -> &PoolRegistry<S> {
        &self.pools
    }

    #[inline]
    pub const fn pools_mut(&mut self) -> &mut PoolRegistry<S> {
        &mut self.pools
    }

    #[inline]
    #[must_use]
    pub const fn kernel_pool(&self) -> PoolId {
        self.kernel_pool
    }

    #[inline]
    #[must_use]
    pub const fn process_pool(&self) -> PoolId {
        self.process_pool
    }

    #[inline]
    #[must_use]
    pub const fn shared_size(&self) -> u32 {
        self.shared_size
    }

    #[inline]
    #[must_use]
    pub const fn tables(&self) -> &T {
        &self.tables
    }

    #[inline]
    #[must_use]
    pub const fn mmu(&self) -> &M {
        &self.mmu
    }

    #[inline]
    pub const fn mmu_mut(&mut self) -> &mut M {
        &mut self.mmu
    }
}

/// Thread stacks and other kernel structures draw frames from the kernel pool.
impl<S, T, M> FrameSource for Paging<S, T, M>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
    T: TableFrames,
    M: Mmu,
{
    fn get_frames(&mut self, n: u32) -> Option<FrameNumber> {
        self.pools.get_frames(self.kernel_pool, n)
    }

    fn release_frames(&mut self, first: FrameNumber) -> Result<(), ReleaseError> {
        self.pools.release_frames(first)
    }
}

//! # Memory Subsystem Bring-up
//!
//! Ties the frame pools and the paging code together in the order the kernel
//! needs them at boot:
//!
//! 1. The kernel pool is created with its metadata carved from its own front.
//! 2. The process pool's metadata frames are taken from the kernel pool, and
//!    the process pool is created over them.
//! 3. The physical memory hole is removed from the process pool.
//! 4. The paging context takes ownership of both pools.
//! 5. The first page table is created and loaded, then paging is enabled.
//!
//! The returned [`Paging`] value is the kernel's memory context. Page faults
//! are dispatched to [`Paging::handle_fault`], and it hands out kernel frames
//! through [`FrameSource`] (for example, for thread stacks).
//!
//! None of the operations lock. Callers run them with interrupts disabled.
//!
//! ## Example
//! ```no_run
//! # use kernel_frame_pool::IdentityMetadataMapper;
//! # use kernel_info::layout::MemoryLayout;
//! # use kernel_vmem::{IdentityTableFrames, Mmu};
//! # fn boot<M: Mmu>(mmu: M) -> Result<(), kernel_memory::BringUpError> {
//! // SAFETY: Runs once at boot, before paging, on the reference machine.
//! let (mapper, tables) = unsafe { (IdentityMetadataMapper::new(), IdentityTableFrames::new()) };
//! let paging = kernel_memory::bring_up(&MemoryLayout::DEFAULT, &mapper, tables, mmu)?;
//! assert!(paging.is_paging_enabled());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub use kernel_frame_pool::FrameSource;
use kernel_frame_pool::{
    ContFramePool, FramePoolError, MetadataMapper, PoolRegistry, needed_info_frames,
};
use kernel_info::layout::{LayoutError, MemoryLayout};
use kernel_vmem::{Mmu, Paging, PagingError, TableFrames};
use log::info;

/// The memory subsystem could not be brought up.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BringUpError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("kernel pool: {0}")]
    KernelPool(FramePoolError),
    #[error("kernel pool cannot spare {needed} frame(s) for process-pool metadata")]
    ProcessMetadata { needed: u32 },
    #[error("process pool: {0}")]
    ProcessPool(FramePoolError),
    #[error(transparent)]
    Paging(#[from] PagingError),
}

/// Brings the memory subsystem up according to `layout`.
///
/// `mapper` places the pools' metadata, `tables` reaches page-table frames and
/// `mmu` drives the control registers.
///
/// # Errors
/// Returns a [`BringUpError`] if the layout is invalid or a pool runs out of
/// frames before paging is enabled.
pub fn bring_up<P, T, M>(
    layout: &MemoryLayout,
    mapper: &P,
    tables: T,
    mmu: M,
) -> Result<Paging<P::Storage, T, M>, BringUpError>
where
    P: MetadataMapper,
    T: TableFrames,
    M: Mmu,
{
    layout.validate()?;

    let mut pools = PoolRegistry::new();
    let kernel_pool = ContFramePool::new(
        layout.kernel_pool_start,
        layout.kernel_pool_frames,
        None,
        mapper,
    )
    .map_err(BringUpError::KernelPool)?;
    let kernel = pools.register(kernel_pool);

    let needed = needed_info_frames(layout.process_pool_frames);
    let info_frame = pools
        .get_frames(kernel, needed)
        .ok_or(BringUpError::ProcessMetadata { needed })?;
    let process_pool = ContFramePool::new(
        layout.process_pool_start,
        layout.process_pool_frames,
        Some(info_frame),
        mapper,
    )
    .map_err(BringUpError::ProcessPool)?;
    let process = pools.register(process_pool);

    if layout.hole_frames > 0 {
        pools
            .pool_mut(process)
            .mark_inaccessible(layout.hole_start, layout.hole_frames);
    }

    let mut paging = Paging::new(pools, kernel, process, layout.shared_size, tables, mmu);
    let page_table = paging.create_page_table()?;
    paging.load(page_table);
    paging.enable_paging();

    info!(
        "Memory up: {} kernel and {} process frame(s) free",
        paging.pools().pool(kernel).free_frames(),
        paging.pools().pool(process).free_frames()
    );
    Ok(paging)
}

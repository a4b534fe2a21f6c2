//! # Memory Layout

use kernel_memory_addresses::{PAGE_SIZE, TABLE_SPAN};

/// First frame of the kernel frame pool (2 MiB).
///
/// The kernel pool holds page directories, page tables and kernel structures
/// that must stay reachable through the shared identity mapping.
pub const KERNEL_POOL_START_FRAME: u32 = (2 * 1024 * 1024) / PAGE_SIZE;

/// Number of frames in the kernel frame pool (2 MiB).
pub const KERNEL_POOL_SIZE: u32 = (2 * 1024 * 1024) / PAGE_SIZE;

/// First frame of the process frame pool (4 MiB).
pub const PROCESS_POOL_START_FRAME: u32 = (4 * 1024 * 1024) / PAGE_SIZE;

/// Number of frames in the process frame pool (28 MiB).
pub const PROCESS_POOL_SIZE: u32 = (28 * 1024 * 1024) / PAGE_SIZE;

/// First frame of the physical hole that is not backed by RAM (15 MiB).
pub const MEM_HOLE_START_FRAME: u32 = (15 * 1024 * 1024) / PAGE_SIZE;

/// Number of frames in the physical hole (1 MiB).
pub const MEM_HOLE_SIZE: u32 = (1024 * 1024) / PAGE_SIZE;

/// Bytes of low memory identity mapped into every address space.
pub const SHARED_SIZE: u32 = 4 * 1024 * 1024;

/// Maximum number of frame pools the registry can hold.
pub const MAX_FRAME_POOLS: usize = 8;

/// Maximum number of VM pools that can be registered with the paging context.
pub const MAX_VM_POOLS: usize = 16;

/// Maximum number of allocated regions per VM pool.
///
/// One page of 8-byte region descriptors, split between the free and the
/// allocated list.
pub const MAX_REGIONS: usize = 256;

const _: () = {
    assert!(KERNEL_POOL_SIZE > 0 && PROCESS_POOL_SIZE > 0);
    assert!(KERNEL_POOL_START_FRAME + KERNEL_POOL_SIZE <= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME >= PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME + MEM_HOLE_SIZE <= PROCESS_POOL_START_FRAME + PROCESS_POOL_SIZE);
    assert!(SHARED_SIZE.is_multiple_of(PAGE_SIZE));
    assert!((KERNEL_POOL_START_FRAME + KERNEL_POOL_SIZE) * PAGE_SIZE <= SHARED_SIZE);
    assert!(SHARED_SIZE <= 1023 * TABLE_SPAN);
    assert!(MAX_FRAME_POOLS >= 2);
};

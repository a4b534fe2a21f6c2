#![allow(dead_code)]

use kernel_frame_pool::slab::Node;
use kernel_frame_pool::{ContFramePool, PoolRegistry};
use kernel_memory_addresses::{FrameNumber, VirtualAddress};
use kernel_vmem::Paging;

pub use kernel_frame_pool::testing::VecMapper;
pub use kernel_vmem::testing::{ArenaFrames, FakeMmu, TestPaging};

/// First frame of the kernel pool used by the fixtures.
pub const KERNEL_BASE: u32 = 512;

/// First frame of the process pool used by the fixtures.
pub const PROCESS_BASE: u32 = 1024;

/// One page table's worth of identity mapping.
pub const SHARED_SIZE: u32 = 4 * 1024 * 1024;

/// Start of the demand-paged test area.
pub const HEAP: u32 = 0x4000_0000;

/// A pool over `[base, base + count)` whose metadata lives far away.
pub fn external_pool(base: u32, count: u32) -> ContFramePool<Vec<Node>> {
    ContFramePool::new(
        FrameNumber::new(base),
        count,
        Some(FrameNumber::new(0x8_0000 + base)),
        &VecMapper,
    )
    .expect("valid pool")
}

/// Paging over a kernel pool of `kernel_frames` and a process pool of
/// `process_frames`, with one page table of shared identity mapping.
pub fn paging(kernel_frames: u32, process_frames: u32) -> TestPaging {
    let mut pools = PoolRegistry::new();
    let kernel = pools.register(external_pool(KERNEL_BASE, kernel_frames));
    let process = pools.register(external_pool(PROCESS_BASE, process_frames));
    Paging::new(
        pools,
        kernel,
        process,
        SHARED_SIZE,
        ArenaFrames::default(),
        FakeMmu::default(),
    )
}

/// [`paging`] with a page table created, loaded, and paging enabled.
pub fn running(kernel_frames: u32, process_frames: u32) -> TestPaging {
    let mut paging = paging(kernel_frames, process_frames);
    let pt = paging.create_page_table().expect("enough kernel frames");
    paging.load(pt);
    paging.enable_paging();
    paging
}

pub fn va(raw: u32) -> VirtualAddress {
    VirtualAddress::new(raw)
}

//! # Runtime Memory Layout
//!
//! [`MemoryLayout`] bundles the constants from [`memory`](crate::memory) into a
//! single value so the memory subsystem can be brought up with a different
//! placement (smaller pools in tests, other boards) without touching the
//! defaults. [`MemoryLayout::validate`] checks the same relations the
//! compile-time assertions check for the defaults.

use crate::memory::{
    KERNEL_POOL_SIZE, KERNEL_POOL_START_FRAME, MEM_HOLE_SIZE, MEM_HOLE_START_FRAME,
    PROCESS_POOL_SIZE, PROCESS_POOL_START_FRAME, SHARED_SIZE,
};
use kernel_memory_addresses::{FRAME_COUNT, FrameNumber, PAGE_SIZE, TABLE_SPAN};

/// Placement of the kernel pool, the process pool, the physical hole and the
/// shared identity-mapped region.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryLayout {
    /// First frame of the kernel pool.
    pub kernel_pool_start: FrameNumber,
    /// Frames in the kernel pool, including its own metadata frames.
    pub kernel_pool_frames: u32,
    /// First frame of the process pool.
    pub process_pool_start: FrameNumber,
    /// Frames in the process pool. Its metadata lives in the kernel pool.
    pub process_pool_frames: u32,
    /// First frame of the hole inside the process pool.
    pub hole_start: FrameNumber,
    /// Frames in the hole; `0` for none.
    pub hole_frames: u32,
    /// Bytes of low memory identity mapped into every address space.
    pub shared_size: u32,
}

/// A [`MemoryLayout`] that cannot be brought up.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("the {0} pool is empty")]
    EmptyPool(&'static str),
    #[error("the {0} pool extends past the end of the physical address space")]
    PoolOutOfRange(&'static str),
    #[error("the kernel pool and the process pool overlap")]
    PoolsOverlap,
    #[error("the memory hole is not contained in the process pool")]
    HoleOutsideProcessPool,
    #[error("shared size {0:#x} is not a multiple of the page size")]
    SharedSizeUnaligned(u32),
    #[error("shared size {0:#x} reaches into the recursive page-directory slot")]
    SharedSizeTooLarge(u32),
    #[error("the kernel pool is not covered by the shared region")]
    KernelPoolNotShared,
}

impl MemoryLayout {
    /// The layout of the reference machine: 32 MiB of RAM with a hole at 15 MiB.
    pub const DEFAULT: Self = Self {
        kernel_pool_start: FrameNumber::new(KERNEL_POOL_START_FRAME),
        kernel_pool_frames: KERNEL_POOL_SIZE,
        process_pool_start: FrameNumber::new(PROCESS_POOL_START_FRAME),
        process_pool_frames: PROCESS_POOL_SIZE,
        hole_start: FrameNumber::new(MEM_HOLE_START_FRAME),
        hole_frames: MEM_HOLE_SIZE,
        shared_size: SHARED_SIZE,
    };

    #[must_use]
    pub const fn with_kernel_pool(mut self, start: FrameNumber, frames: u32) -> Self {
        self.kernel_pool_start = start;
        self.kernel_pool_frames = frames;
        self
    }

    #[must_use]
    pub const fn with_process_pool(mut self, start: FrameNumber, frames: u32) -> Self {
        self.process_pool_start = start;
        self.process_pool_frames = frames;
        self
    }

    #[must_use]
    pub const fn with_hole(mut self, start: FrameNumber, frames: u32) -> Self {
        self.hole_start = start;
        self.hole_frames = frames;
        self
    }

    #[must_use]
    pub const fn without_hole(self) -> Self {
        self.with_hole(FrameNumber::new(0), 0)
    }

    #[must_use]
    pub const fn with_shared_size(mut self, bytes: u32) -> Self {
        self.shared_size = bytes;
        self
    }

    /// One past the last frame of the kernel pool.
    #[inline]
    #[must_use]
    pub const fn kernel_pool_end(&self) -> u64 {
        self.kernel_pool_start.as_u32() as u64 + self.kernel_pool_frames as u64
    }

    /// One past the last frame of the process pool.
    #[inline]
    #[must_use]
    pub const fn process_pool_end(&self) -> u64 {
        self.process_pool_start.as_u32() as u64 + self.process_pool_frames as u64
    }

    /// Checks that the layout can be brought up.
    ///
    /// # Errors
    /// Returns the first [`LayoutError`] found.
    pub const fn validate(&self) -> Result<(), LayoutError> {
        const FRAMES: u64 = FRAME_COUNT as u64;

        if self.kernel_pool_frames == 0 {
            return Err(LayoutError::EmptyPool("kernel"));
        }
        if self.process_pool_frames == 0 {
            return Err(LayoutError::EmptyPool("process"));
        }
        if self.kernel_pool_end() > FRAMES {
            return Err(LayoutError::PoolOutOfRange("kernel"));
        }
        if self.process_pool_end() > FRAMES {
            return Err(LayoutError::PoolOutOfRange("process"));
        }

        let kernel_start = self.kernel_pool_start.as_u32() as u64;
        let process_start = self.process_pool_start.as_u32() as u64;
        if kernel_start < self.process_pool_end() && process_start < self.kernel_pool_end() {
            return Err(LayoutError::PoolsOverlap);
        }

        if self.hole_frames > 0 {
            let hole_start = self.hole_start.as_u32() as u64;
            let hole_end = hole_start + self.hole_frames as u64;
            if hole_start < process_start || hole_end > self.process_pool_end() {
                return Err(LayoutError::HoleOutsideProcessPool);
            }
        }

        if !self.shared_size.is_multiple_of(PAGE_SIZE) {
            return Err(LayoutError::SharedSizeUnaligned(self.shared_size));
        }
        if self.shared_size > 1023 * TABLE_SPAN {
            return Err(LayoutError::SharedSizeTooLarge(self.shared_size));
        }
        if self.kernel_pool_end() * PAGE_SIZE as u64 > self.shared_size as u64 {
            return Err(LayoutError::KernelPoolNotShared);
        }

        Ok(())
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#![allow(dead_code)]

use kernel_frame_pool::testing::VecMapper;
use kernel_info::layout::MemoryLayout;
use kernel_memory::{BringUpError, bring_up};
use kernel_vmem::testing::{ArenaFrames, FakeMmu};

pub use kernel_vmem::testing::TestPaging;

pub fn boot(layout: &MemoryLayout) -> Result<TestPaging, BringUpError> {
    bring_up(layout, &VecMapper, ArenaFrames::default(), FakeMmu::default())
}

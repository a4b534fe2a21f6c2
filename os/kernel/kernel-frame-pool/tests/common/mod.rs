#![allow(dead_code)]

use kernel_frame_pool::ContFramePool;
use kernel_frame_pool::slab::Node;
pub use kernel_frame_pool::testing::VecMapper;
use kernel_memory_addresses::FrameNumber;

pub type TestPool = ContFramePool<Vec<Node>>;

/// A pool over `[base, base + count)` whose metadata lives elsewhere, so that
/// every frame in the range is allocatable.
pub fn external_pool(base: u32, count: u32) -> TestPool {
    ContFramePool::new(
        FrameNumber::new(base),
        count,
        Some(FrameNumber::new(base + count + 100)),
        &VecMapper,
    )
    .expect("valid pool")
}

/// A pool that carves its metadata from its own front.
pub fn carved_pool(base: u32, count: u32) -> TestPool {
    ContFramePool::new(FrameNumber::new(base), count, None, &VecMapper).expect("valid pool")
}

/// Tiny deterministic generator for operation sequences.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

/// Asserts that free extents and live allocations tile `[base, base + count)`
/// except for `reserved` frames, with no overlap and no adjacent free extents.
pub fn assert_consistent(pool: &TestPool, reserved: u32) {
    let mut runs: Vec<(u32, u32, bool)> = pool
        .extents()
        .map(|e| (e.start.as_u32(), e.length, true))
        .chain(pool.allocations().map(|e| (e.start.as_u32(), e.length, false)))
        .collect();
    runs.sort_unstable();

    let mut covered = 0;
    for pair in runs.windows(2) {
        let (a_start, a_len, a_free) = pair[0];
        let (b_start, _, b_free) = pair[1];
        assert!(a_start + a_len <= b_start, "overlapping runs: {pair:?}");
        if a_free && b_free {
            assert!(a_start + a_len < b_start, "adjacent free extents: {pair:?}");
        }
    }
    for &(start, len, _) in &runs {
        assert!(pool.contains(FrameNumber::new(start)));
        assert!(len > 0);
        covered += len;
    }
    assert_eq!(covered + reserved, pool.frame_count());
}

mod common;

use common::{VecMapper, carved_pool, external_pool};
use kernel_frame_pool::{ContFramePool, FrameSource, PoolRegistry, ReleaseError, needed_info_frames};
use kernel_info::memory::{
    KERNEL_POOL_SIZE, KERNEL_POOL_START_FRAME, MAX_FRAME_POOLS, PROCESS_POOL_SIZE,
    PROCESS_POOL_START_FRAME,
};
use kernel_memory_addresses::FrameNumber;

#[test]
fn release_by_number_finds_owning_pool() {
    let mut pools = PoolRegistry::new();
    let kernel = pools.register(carved_pool(KERNEL_POOL_START_FRAME, KERNEL_POOL_SIZE));

    let info = pools
        .get_frames(kernel, needed_info_frames(PROCESS_POOL_SIZE))
        .unwrap();
    let process = ContFramePool::new(
        FrameNumber::new(PROCESS_POOL_START_FRAME),
        PROCESS_POOL_SIZE,
        Some(info),
        &VecMapper,
    )
    .unwrap();
    let process = pools.register(process);

    let k = pools.get_frames(kernel, 1).unwrap();
    let p = pools.get_frames(process, 4).unwrap();
    assert_eq!(pools.owner_of(k), Some(kernel));
    assert_eq!(pools.owner_of(p), Some(process));

    let before = pools.pool(process).free_frames();
    pools.release_frames(p).unwrap();
    assert_eq!(pools.pool(process).free_frames(), before + 4);
    pools.release_frames(k).unwrap();
    assert_eq!(pools.get_frames(process, 4), Some(p));
}

#[test]
fn invalid_releases_are_reported_and_ignored() {
    let mut pools = PoolRegistry::new();
    let id = pools.register(external_pool(100, 10));
    let f = pools.get_frames(id, 2).unwrap();

    assert_eq!(
        pools.release_frames(FrameNumber::new(5)),
        Err(ReleaseError::NotOwned(FrameNumber::new(5)))
    );
    assert_eq!(
        pools.release_frames(f + 1),
        Err(ReleaseError::NotAllocated(f + 1))
    );
    assert_eq!(pools.pool(id).free_frames(), 8);

    pools.release_frames(f).unwrap();
    assert_eq!(
        pools.release_frames(f),
        Err(ReleaseError::NotAllocated(f))
    );
    assert_eq!(pools.pool(id).free_frames(), 10);
}

#[test]
#[should_panic(expected = "overlaps registered pool")]
fn overlapping_pools_are_refused() {
    let mut pools = PoolRegistry::new();
    pools.register(external_pool(0, 10));
    pools.register(external_pool(5, 10));
}

#[test]
fn adjacent_pools_each_own_their_frames() {
    let mut pools = PoolRegistry::new();
    let low = pools.register(external_pool(0, 10));
    let high = pools.register(external_pool(10, 10));
    assert_eq!(pools.owner_of(FrameNumber::new(9)), Some(low));
    assert_eq!(pools.owner_of(FrameNumber::new(10)), Some(high));
    assert_eq!(pools.owner_of(FrameNumber::new(20)), None);

    let a = pools.get_frames(low, 10).unwrap();
    let b = pools.get_frames(high, 1).unwrap();
    assert_eq!((a, b), (FrameNumber::new(0), FrameNumber::new(10)));
    assert_eq!(pools.release_frames(a), Ok(()));
    assert_eq!(pools.release_frames(b), Ok(()));
}

#[test]
#[should_panic(expected = "frame pool registry is full")]
fn registry_capacity_is_a_hard_limit() {
    let mut pools = PoolRegistry::new();
    for i in (0..).take(MAX_FRAME_POOLS + 1) {
        pools.register(external_pool(i * 100, 10));
    }
}

#[test]
fn pools_are_frame_sources() {
    fn take_two<F: FrameSource>(source: &mut F) -> (FrameNumber, FrameNumber) {
        (source.get_frames(1).unwrap(), source.get_frames(1).unwrap())
    }

    let mut pool = external_pool(40, 4);
    let (a, b) = take_two(&mut pool);
    assert_eq!((a, b), (FrameNumber::new(40), FrameNumber::new(41)));
    FrameSource::release_frames(&mut pool, a).unwrap();
    assert_eq!(pool.free_frames(), 3);
}

#[test]
fn registry_iterates_in_registration_order() {
    let mut pools = PoolRegistry::new();
    assert!(pools.is_empty());
    pools.register(external_pool(0, 4));
    pools.register(external_pool(10, 4));
    let bases: Vec<u32> = pools.iter().map(|(_, p)| p.base_frame().as_u32()).collect();
    assert_eq!(bases, [0, 10]);
    assert_eq!(pools.len(), 2);
}

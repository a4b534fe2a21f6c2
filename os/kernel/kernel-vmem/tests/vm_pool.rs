mod common;

use common::{HEAP, external_pool, running, va};
use kernel_frame_pool::PoolRegistry;
use kernel_info::memory::MAX_VM_POOLS;
use kernel_memory_addresses::PAGE_SIZE;
use kernel_vmem::{FaultOutcome, PageFaultError, Region, VmPool, VmReleaseError};

const POOL_PAGES: u32 = 16;

fn heap_pool(paging: &common::TestPaging, base: u32) -> VmPool {
    VmPool::new(
        va(base),
        POOL_PAGES * PAGE_SIZE,
        paging.process_pool(),
        paging.current_page_table().unwrap(),
    )
    .unwrap()
}

#[test]
fn allocations_exhaust_the_pool() {
    let mut paging = running(16, 16);
    let id = paging.register_pool(heap_pool(&paging, HEAP));
    let size = POOL_PAGES * PAGE_SIZE;

    let a = paging.vm_allocate(id, size / 4).unwrap();
    let b = paging.vm_allocate(id, size - size / 4).unwrap();
    assert_eq!(a, va(HEAP));
    assert_eq!(b, va(HEAP) + size / 4);
    assert_eq!(paging.vm_allocate(id, 1), None);
    assert!(paging.vm_pool(id).free_regions().is_empty());
}

#[test]
fn faults_outside_allocated_regions_are_illegitimate() {
    let mut paging = running(16, 16);
    let id = paging.register_pool(heap_pool(&paging, HEAP));
    let a = paging.vm_allocate(id, 2 * PAGE_SIZE).unwrap();

    assert!(matches!(
        paging.handle_fault_at(a + PAGE_SIZE + 8),
        Ok(FaultOutcome::Mapped(_))
    ));
    let outside = a + 2 * PAGE_SIZE;
    assert_eq!(
        paging.handle_fault_at(outside),
        Err(PageFaultError::Illegitimate(outside))
    );
    let elsewhere = va(HEAP + 0x1000_0000);
    assert_eq!(
        paging.handle_fault_at(elsewhere),
        Err(PageFaultError::Illegitimate(elsewhere))
    );
    assert!(paging.is_legitimate(a));
    assert!(!paging.is_legitimate(outside));
}

#[test]
fn faults_draw_from_the_backing_pool() {
    let mut paging = running(16, 16);
    let backing = paging.pools_mut().register(external_pool(4096, 4));
    let pool = VmPool::new(
        va(HEAP),
        POOL_PAGES * PAGE_SIZE,
        backing,
        paging.current_page_table().unwrap(),
    )
    .unwrap();
    let id = paging.register_pool(pool);
    let a = paging.vm_allocate(id, PAGE_SIZE).unwrap();

    let Ok(FaultOutcome::Mapped(frame)) = paging.handle_fault_at(a) else {
        panic!("fault was not served");
    };
    assert!(paging.pools().pool(backing).contains(frame));
    assert_eq!(paging.pools().pool(backing).free_frames(), 3);
}

#[test]
fn pools_of_other_page_tables_do_not_guard() {
    let mut paging = running(16, 16);
    let other = paging.create_page_table().unwrap();
    let pool = VmPool::new(va(HEAP), POOL_PAGES * PAGE_SIZE, paging.process_pool(), other).unwrap();
    paging.register_pool(pool);

    assert!(matches!(
        paging.handle_fault_at(va(HEAP + 0x0100_0000)),
        Ok(FaultOutcome::Mapped(_))
    ));
}

#[test]
fn release_unmaps_pages_and_merges_region() {
    let mut paging = running(16, 16);
    let pt = paging.current_page_table().unwrap();
    let process = paging.process_pool();
    let id = paging.register_pool(heap_pool(&paging, HEAP));

    let a = paging.vm_allocate(id, 3 * PAGE_SIZE).unwrap();
    let b = paging.vm_allocate(id, PAGE_SIZE).unwrap();
    paging.handle_fault_at(a).unwrap();
    paging.handle_fault_at(a + 2 * PAGE_SIZE).unwrap();
    paging.handle_fault_at(b).unwrap();
    assert_eq!(paging.pools().pool(process).free_frames(), 13);

    let flushes = paging.mmu().flushes;
    paging.vm_release(id, a).unwrap();
    assert_eq!(paging.mmu().flushes, flushes + 3);
    assert_eq!(paging.pools().pool(process).free_frames(), 15);
    assert_eq!(paging.translate(pt, a), None);
    assert!(paging.translate(pt, b).is_some());
    assert_eq!(
        paging.handle_fault_at(a),
        Err(PageFaultError::Illegitimate(a))
    );

    paging.vm_release(id, b).unwrap();
    assert_eq!(
        paging.vm_pool(id).free_regions(),
        [Region::new(va(HEAP), POOL_PAGES * PAGE_SIZE)]
    );
    assert_eq!(paging.pools().pool(process).free_frames(), 16);
}

#[test]
fn release_needs_the_exact_start() {
    let mut paging = running(16, 16);
    let id = paging.register_pool(heap_pool(&paging, HEAP));
    let a = paging.vm_allocate(id, 2 * PAGE_SIZE).unwrap();

    assert_eq!(
        paging.vm_release(id, a + PAGE_SIZE),
        Err(VmReleaseError::UnknownRegion(a + PAGE_SIZE))
    );
    assert!(paging.is_legitimate(a));
    assert_eq!(paging.vm_release(id, a), Ok(()));
    assert_eq!(
        paging.vm_release(id, a),
        Err(VmReleaseError::UnknownRegion(a))
    );
}

#[test]
#[should_panic(expected = "VM pool registry is full")]
fn registry_capacity_is_enforced() {
    let mut paging = running(16, 16);
    for i in (0u32..).take(MAX_VM_POOLS + 1) {
        paging.register_pool(heap_pool(&paging, HEAP + i * POOL_PAGES * PAGE_SIZE));
    }
}

#[test]
#[should_panic(expected = "overlaps the shared region")]
fn pools_may_not_cover_the_shared_region() {
    let mut paging = running(16, 16);
    paging.register_pool(heap_pool(&paging, 0x10_0000));
}

#[test]
#[should_panic(expected = "overlaps registered VM pool")]
fn pools_of_one_page_table_may_not_overlap() {
    let mut paging = running(16, 16);
    paging.register_pool(heap_pool(&paging, HEAP));
    paging.register_pool(heap_pool(&paging, HEAP + (POOL_PAGES / 2) * PAGE_SIZE));
}

#[test]
fn pools_of_one_page_table_may_touch() {
    let mut paging = running(16, 16);
    let low = paging.register_pool(heap_pool(&paging, HEAP));
    let high = paging.register_pool(heap_pool(&paging, HEAP + POOL_PAGES * PAGE_SIZE));
    let a = paging.vm_allocate(low, POOL_PAGES * PAGE_SIZE).unwrap();
    let b = paging.vm_allocate(high, PAGE_SIZE).unwrap();
    assert_eq!(b, a + POOL_PAGES * PAGE_SIZE);
}

#[test]
#[should_panic(expected = "unknown frame pool")]
fn pools_must_be_backed_by_a_registered_frame_pool() {
    let mut foreign = PoolRegistry::new();
    foreign.register(external_pool(0, 4));
    foreign.register(external_pool(8, 4));
    let stranger = foreign.register(external_pool(16, 4));

    let mut paging = running(16, 16);
    let pool = VmPool::new(
        va(HEAP),
        POOL_PAGES * PAGE_SIZE,
        stranger,
        paging.current_page_table().unwrap(),
    )
    .unwrap();
    paging.register_pool(pool);
}

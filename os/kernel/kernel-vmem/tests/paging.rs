mod common;

use common::{HEAP, KERNEL_BASE, PROCESS_BASE, SHARED_SIZE, paging, running, va};
use kernel_memory_addresses::{FrameNumber, PAGE_SIZE, PhysicalAddress};
use kernel_vmem::table::DirectoryIndex;
use kernel_vmem::{FaultOutcome, PageFaultError, PagingError, RECURSIVE_SLOT, TableFrames};

#[test]
fn new_page_table_identity_maps_shared_region() {
    let mut paging = paging(16, 16);
    let pt = paging.create_page_table().unwrap();
    let kernel = paging.kernel_pool();

    assert_eq!(paging.pools().pool(kernel).free_frames(), 14);
    for raw in [0, 0x1234, 0x0020_0000, SHARED_SIZE - 1] {
        assert_eq!(paging.translate(pt, va(raw)), Some(PhysicalAddress::new(raw)));
    }
    assert_eq!(paging.translate(pt, va(SHARED_SIZE)), None);
    assert_eq!(paging.translate(pt, va(HEAP)), None);

    let directory = paging.tables().table(pt.directory());
    assert_eq!(
        directory.directory_entry(RECURSIVE_SLOT).present_frame(),
        Some(pt.directory())
    );
    assert!(!directory.directory_entry(DirectoryIndex::new(1)).present());
    assert!(!directory.directory_entry(DirectoryIndex::new(1022)).present());
}

#[test]
fn page_table_frames_come_from_kernel_pool() {
    let mut paging = paging(16, 16);
    let pt = paging.create_page_table().unwrap();
    let kernel = paging.kernel_pool();

    let shared = paging
        .tables()
        .table(pt.directory())
        .directory_entry(DirectoryIndex::new(0))
        .frame();
    assert!(paging.pools().pool(kernel).contains(pt.directory()));
    assert!(paging.pools().pool(kernel).contains(shared));
}

#[test]
fn create_page_table_rolls_back_when_kernel_pool_is_short() {
    let mut paging = paging(1, 16);
    let kernel = paging.kernel_pool();

    assert_eq!(paging.create_page_table(), Err(PagingError::OutOfFrames));
    assert_eq!(paging.pools().pool(kernel).free_frames(), 1);
}

#[test]
fn load_and_enable_reach_the_mmu() {
    let mut paging = paging(16, 16);
    let pt = paging.create_page_table().unwrap();
    assert_eq!(paging.current_page_table(), None);

    paging.load(pt);
    assert_eq!(paging.current_page_table(), Some(pt));
    assert_eq!(paging.mmu().loaded, [pt.directory()]);

    assert!(!paging.is_paging_enabled());
    paging.enable_paging();
    paging.enable_paging();
    assert!(paging.is_paging_enabled());
    assert_eq!(paging.mmu().enables, 1);
}

#[test]
fn fault_maps_a_process_frame() {
    let mut paging = running(16, 16);
    let pt = paging.current_page_table().unwrap();
    let kernel = paging.kernel_pool();
    let kernel_free = paging.pools().pool(kernel).free_frames();

    let Ok(FaultOutcome::Mapped(frame)) = paging.handle_fault_at(va(HEAP + 0x123)) else {
        panic!("fault was not served");
    };
    assert!(frame.as_u32() >= PROCESS_BASE);
    assert_eq!(
        paging.translate(pt, va(HEAP + 0x456)),
        Some(frame.base() + 0x456)
    );
    assert_eq!(paging.pools().pool(kernel).free_frames(), kernel_free - 1);

    assert_eq!(
        paging.handle_fault_at(va(HEAP + 0xFFF)),
        Ok(FaultOutcome::AlreadyMapped(frame))
    );
}

#[test]
fn faults_in_one_table_share_it() {
    let mut paging = running(16, 16);
    let kernel = paging.kernel_pool();

    paging.handle_fault_at(va(HEAP)).unwrap();
    let after_first = paging.pools().pool(kernel).free_frames();
    paging.handle_fault_at(va(HEAP + PAGE_SIZE)).unwrap();
    assert_eq!(paging.pools().pool(kernel).free_frames(), after_first);

    paging.handle_fault_at(va(HEAP + SHARED_SIZE)).unwrap();
    assert_eq!(paging.pools().pool(kernel).free_frames(), after_first - 1);
}

#[test]
fn handle_fault_reads_the_fault_address() {
    let mut paging = running(16, 16);
    let pt = paging.current_page_table().unwrap();
    paging.mmu_mut().cr2 = HEAP + 0x8000;

    assert!(matches!(paging.handle_fault(), Ok(FaultOutcome::Mapped(_))));
    assert!(paging.translate(pt, va(HEAP + 0x8000)).is_some());
}

#[test]
fn unserviceable_faults_are_errors() {
    let mut idle = paging(16, 16);
    assert_eq!(
        idle.handle_fault_at(va(HEAP)),
        Err(PageFaultError::NoPageTable(va(HEAP)))
    );

    let mut paging = running(16, 16);
    assert_eq!(
        paging.handle_fault_at(va(0x1000)),
        Err(PageFaultError::SharedRegion(va(0x1000)))
    );
    assert_eq!(
        paging.handle_fault_at(va(0xFFFF_F000)),
        Err(PageFaultError::Illegitimate(va(0xFFFF_F000)))
    );
}

#[test]
fn exhausted_process_pool_fails_the_fault() {
    let mut paging = running(16, 1);
    let kernel = paging.kernel_pool();

    paging.handle_fault_at(va(HEAP)).unwrap();
    assert_eq!(
        paging.handle_fault_at(va(HEAP + PAGE_SIZE)),
        Err(PageFaultError::OutOfFrames(va(HEAP + PAGE_SIZE)))
    );

    let kernel_free = paging.pools().pool(kernel).free_frames();
    let far = va(HEAP + 8 * SHARED_SIZE);
    assert_eq!(
        paging.handle_fault_at(far),
        Err(PageFaultError::OutOfFrames(far))
    );
    assert_eq!(paging.pools().pool(kernel).free_frames(), kernel_free);
    assert_eq!(paging.translate(paging.current_page_table().unwrap(), far), None);
}

#[test]
fn exhausted_kernel_pool_fails_the_fault() {
    let mut paging = running(2, 16);
    assert_eq!(
        paging.handle_fault_at(va(HEAP)),
        Err(PageFaultError::OutOfFrames(va(HEAP)))
    );
}

#[test]
fn free_page_returns_frame_and_table() {
    let mut paging = running(16, 16);
    let pt = paging.current_page_table().unwrap();
    let (kernel, process) = (paging.kernel_pool(), paging.process_pool());
    let kernel_free = paging.pools().pool(kernel).free_frames();

    let Ok(FaultOutcome::Mapped(frame)) = paging.handle_fault_at(va(HEAP)) else {
        panic!("fault was not served");
    };
    assert_eq!(paging.pools().pool(process).free_frames(), 15);

    let flushes = paging.mmu().flushes;
    assert_eq!(paging.free_page(va(HEAP).page()), Some(frame));
    assert_eq!(paging.mmu().flushes, flushes + 1);
    assert_eq!(paging.translate(pt, va(HEAP)), None);
    assert_eq!(paging.pools().pool(process).free_frames(), 16);
    assert_eq!(paging.pools().pool(kernel).free_frames(), kernel_free);

    assert_eq!(paging.free_page(va(HEAP).page()), None);
    assert_eq!(paging.mmu().flushes, flushes + 2);
}

#[test]
fn table_survives_while_a_page_is_mapped() {
    let mut paging = running(16, 16);
    let kernel = paging.kernel_pool();

    paging.handle_fault_at(va(HEAP)).unwrap();
    paging.handle_fault_at(va(HEAP + PAGE_SIZE)).unwrap();
    let kernel_free = paging.pools().pool(kernel).free_frames();

    paging.free_page(va(HEAP).page()).unwrap();
    assert_eq!(paging.pools().pool(kernel).free_frames(), kernel_free);
    paging.free_page(va(HEAP + PAGE_SIZE).page()).unwrap();
    assert_eq!(paging.pools().pool(kernel).free_frames(), kernel_free + 1);
}

#[test]
fn shared_pages_are_never_freed() {
    let mut paging = running(16, 16);
    let pt = paging.current_page_table().unwrap();

    assert_eq!(paging.free_page(va(0x5000).page()), None);
    assert_eq!(
        paging.translate(pt, va(0x5000)),
        Some(PhysicalAddress::new(0x5000))
    );
}

#[test]
fn kernel_frames_are_handed_out_as_a_frame_source() {
    use kernel_frame_pool::FrameSource;

    let mut paging = running(16, 16);
    let stack = paging.get_frames(2).unwrap();
    assert!(stack.as_u32() >= KERNEL_BASE && stack.as_u32() < KERNEL_BASE + 16);
    paging.release_frames(stack).unwrap();
    assert!(paging.release_frames(FrameNumber::new(3)).is_err());
}

//! Host-side fixtures shared by the tests of this crate and its dependents.
//!
//! Page tables live on the heap instead of in physical frames, and the MMU
//! only records what it was asked to do.

use crate::{Mmu, PageEntry, Paging, Table, TableFrames};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use kernel_frame_pool::slab::Node;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

/// Paging over heap-backed pools, tables and a recording MMU.
pub type TestPaging = Paging<Vec<Node>, ArenaFrames, FakeMmu>;

/// Page-table frames kept on the heap, keyed by frame number.
///
/// Frames are handed out with every entry present and pointing at garbage so
/// that code forgetting to initialize a table is caught.
#[derive(Default)]
pub struct ArenaFrames {
    frames: BTreeMap<FrameNumber, Box<Table>>,
}

impl ArenaFrames {
    #[must_use]
    pub fn garbage() -> Box<Table> {
        let mut table = Box::new(Table::not_present());
        table.fill(PageEntry::from_bits(0xDEAD_BEEF));
        table
    }
}

// SAFETY: Every frame maps to its own boxed table.
unsafe impl TableFrames for ArenaFrames {
    fn table(&self, frame: FrameNumber) -> &Table {
        self.frames
            .get(&frame)
            .unwrap_or_else(|| panic!("{frame:?} was read before it was written"))
    }

    fn table_mut(&mut self, frame: FrameNumber) -> &mut Table {
        self.frames.entry(frame).or_insert_with(Self::garbage)
    }
}

/// Records every register operation instead of touching hardware.
#[derive(Debug, Default)]
pub struct FakeMmu {
    pub cr2: u32,
    pub loaded: Vec<FrameNumber>,
    pub enables: usize,
    pub flushes: usize,
}

impl Mmu for FakeMmu {
    fn fault_address(&self) -> VirtualAddress {
        VirtualAddress::new(self.cr2)
    }

    fn load_directory(&mut self, directory: FrameNumber) {
        self.loaded.push(directory);
    }

    fn enable_paging(&mut self) {
        self.enables += 1;
    }

    fn flush_tlb(&mut self) {
        self.flushes += 1;
    }
}

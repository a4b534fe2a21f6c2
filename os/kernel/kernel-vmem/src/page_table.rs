use crate::table::{DirectoryIndex, TableIndex};
use core::fmt;
use kernel_memory_addresses::{FrameNumber, VirtualAddress};

/// Directory slot that points back at the directory itself.
///
/// With this entry installed, the directory is visible at
/// [`RECURSIVE_DIRECTORY_BASE`] and every page table at
/// [`RECURSIVE_TABLES_BASE`] + 4 KiB × directory index.
pub const RECURSIVE_SLOT: DirectoryIndex = DirectoryIndex::new(1023);

/// Virtual base of the 4 MiB window through which the page tables are visible.
pub const RECURSIVE_TABLES_BASE: VirtualAddress = VirtualAddress::new(0xFFC0_0000);

/// Virtual address of the directory itself through the recursive slot.
pub const RECURSIVE_DIRECTORY_BASE: VirtualAddress = VirtualAddress::new(0xFFFF_F000);

/// One address space: a page directory plus the page tables it points to.
///
/// The handle is just the directory's frame; the tables themselves are owned
/// by the [`Paging`](crate::Paging) context that created them.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageTable {
    directory: FrameNumber,
}

impl PageTable {
    #[inline]
    #[must_use]
    pub(crate) const fn new(directory: FrameNumber) -> Self {
        Self { directory }
    }

    /// The frame holding the page directory.
    #[inline]
    #[must_use]
    pub const fn directory(&self) -> FrameNumber {
        self.directory
    }
}

impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTable(dir={})", self.directory.base())
    }
}

/// Virtual address of the directory entry covering `va`, as seen through the
/// recursive slot of the loaded directory.
///
/// ```rust
/// # use kernel_vmem::recursive_pde_address;
/// # use kernel_memory_addresses::VirtualAddress;
/// assert_eq!(
///     recursive_pde_address(VirtualAddress::new(0x0040_0000)),
///     VirtualAddress::new(0xFFFF_F004)
/// );
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn recursive_pde_address(va: VirtualAddress) -> VirtualAddress {
    let index = DirectoryIndex::from(va).as_usize() as u32;
    VirtualAddress::new(RECURSIVE_DIRECTORY_BASE.as_u32() | (index << 2))
}

/// Virtual address of the table entry mapping `va`, as seen through the
/// recursive slot of the loaded directory.
///
/// ```rust
/// # use kernel_vmem::recursive_pte_address;
/// # use kernel_memory_addresses::VirtualAddress;
/// assert_eq!(
///     recursive_pte_address(VirtualAddress::new(0x0040_3000)),
///     VirtualAddress::new(0xFFC0_100C)
/// );
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn recursive_pte_address(va: VirtualAddress) -> VirtualAddress {
    let dir = DirectoryIndex::from(va).as_usize() as u32;
    let table = TableIndex::from(va).as_usize() as u32;
    VirtualAddress::new(RECURSIVE_TABLES_BASE.as_u32() | (dir << 12) | (table << 2))
}

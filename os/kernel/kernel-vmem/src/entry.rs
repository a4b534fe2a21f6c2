use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress};

/// A single 32-bit page-directory or page-table entry (non-PAE paging).
///
/// Directory entries (PDEs) point to a page table, table entries (PTEs) map a
/// 4 KiB page. Both share this layout:
///
/// | Bits  | Name / Mnemonic | Meaning |
/// |-------|-----------------|---------|
/// | 0     | `P` (present)   | Valid entry if set |
/// | 1     | `RW`            | Writable if set |
/// | 2     | `US`            | User-mode accessible if set |
/// | 3     | `PWT`           | Write-through caching |
/// | 4     | `PCD`           | Disable caching |
/// | 5     | `A`             | Accessed |
/// | 6     | `D`             | Dirty (PTE only) |
/// | 7     | `PS` / `PAT`    | 4 MiB page in a PDE; must stay 0 here |
/// | 8     | `G`             | Global (PTE only) |
/// | 9–11  | OS avail        | Reserved for OS use |
/// | 12–31 | `frame`         | Physical frame number |
///
/// ### Example
/// ```rust
/// # use kernel_vmem::PageEntry;
/// # use kernel_memory_addresses::FrameNumber;
/// let e = PageEntry::mapped(FrameNumber::new(0x201));
/// assert!(e.present());
/// assert_eq!(e.into_bits(), 0x0020_1003);
/// assert_eq!(PageEntry::not_present().into_bits(), 0x2);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntry {
    /// Present (P, bit 0).
    ///
    /// Clear means any access through this entry raises a page fault.
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    ///
    /// Set to allow user-mode access; clear restricts to supervisor only.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5), set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6), set by the CPU on the first write through a PTE.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Always 0: only 4 KiB pages are used.
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global: bool,

    /// OS-available (bits 9..=11); ignored by hardware.
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    frame_bits: u32,
}

impl PageEntry {
    /// A writable, supervisor-only entry that is not present.
    #[inline]
    #[must_use]
    pub const fn not_present() -> Self {
        Self::new().with_writable(true)
    }

    /// A present, writable, supervisor-only entry pointing at `frame`.
    #[inline]
    #[must_use]
    pub const fn mapped(frame: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_frame_bits(frame.as_u32())
    }

    /// The frame this entry points at (meaningful only if present).
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> FrameNumber {
        FrameNumber::new(self.frame_bits())
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.frame().base()
    }

    /// If present, the frame this entry points at.
    #[inline]
    #[must_use]
    pub const fn present_frame(&self) -> Option<FrameNumber> {
        if self.present() {
            Some(self.frame())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings_match_hardware_layout() {
        assert_eq!(PageEntry::not_present().into_bits(), 0b10);
        assert_eq!(PageEntry::mapped(FrameNumber::new(1)).into_bits(), 0x1003);
        assert_eq!(
            PageEntry::mapped(FrameNumber::new(0xF_FFFF)).into_bits(),
            0xFFFF_F003
        );
    }

    #[test]
    fn decodes_frame_and_flags() {
        let e = PageEntry::from_bits(0x0040_0067);
        assert!(e.present());
        assert!(e.writable());
        assert!(e.user_access());
        assert!(e.accessed());
        assert!(e.dirty());
        assert_eq!(e.present_frame(), Some(FrameNumber::new(0x400)));
        assert_eq!(e.physical_address(), PhysicalAddress::new(0x0040_0000));
        assert_eq!(PageEntry::not_present().present_frame(), None);
    }
}

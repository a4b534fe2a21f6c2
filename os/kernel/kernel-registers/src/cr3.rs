#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{FrameNumber, PhysicalAddress};

/// CR3: Page-Directory Base Register (32-bit paging, no PAE).
///
/// Holds the physical frame of the page directory and cache-control flags
/// for directory accesses. Writing CR3 also flushes all non-global TLB entries.
#[bitfield(u32)]
pub struct Cr3 {
    /// Bits 0–2: Reserved (must be 0).
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3: PWT: Page-level Write-Through for the page directory.
    pub pwt: bool,

    /// Bit 4: PCD: Page-level Cache Disable for the page directory.
    pub pcd: bool,

    /// Bits 5–11: Reserved (must be 0 when written).
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–31: Page-directory frame number.
    ///
    /// The physical base of the directory is `directory_frame << 12`.
    #[bits(20)]
    directory_frame: u32,
}

impl Cr3 {
    /// Create a `Cr3` value that points at the directory stored in `directory`.
    #[must_use]
    pub const fn from_directory(directory: FrameNumber, pwt: bool, pcd: bool) -> Self {
        Self::new()
            .with_pwt(pwt)
            .with_pcd(pcd)
            .with_directory_frame(directory.as_u32())
    }

    /// The frame holding the page directory.
    #[must_use]
    pub const fn directory(&self) -> FrameNumber {
        FrameNumber::new(self.directory_frame())
    }

    /// Return the full physical address of the page-directory base.
    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        self.directory().base()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_frame_occupies_high_bits() {
        let cr3 = Cr3::from_directory(FrameNumber::new(0x201), false, false);
        assert_eq!(cr3.into_bits(), 0x0020_1000);
        assert_eq!(cr3.directory(), FrameNumber::new(0x201));
        assert_eq!(cr3.directory_phys(), PhysicalAddress::new(0x0020_1000));
    }

    #[test]
    fn cache_flags_are_bits_3_and_4() {
        let cr3 = Cr3::from_directory(FrameNumber::new(0), true, true);
        assert_eq!(cr3.into_bits(), 0x18);
    }
}

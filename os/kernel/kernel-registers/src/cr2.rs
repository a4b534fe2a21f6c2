#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::LoadRegisterUnsafe;
use core::fmt;
use kernel_memory_addresses::VirtualAddress;

/// CR2: Page-Fault Linear Address.
///
/// The CPU stores the linear address that caused the most recent page fault
/// here before raising `#PF`. The register is only meaningful inside the fault
/// handler, before another fault can overwrite it.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct Cr2(u32);

impl Cr2 {
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u32 {
        self.0
    }

    /// The faulting linear address.
    #[inline]
    #[must_use]
    pub const fn fault_address(self) -> VirtualAddress {
        VirtualAddress::new(self.0)
    }
}

impl fmt::Debug for Cr2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cr2({:#010x})", self.0)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr2 {
    unsafe fn load_unsafe() -> Self {
        let mut cr2: u32;
        unsafe {
            core::arch::asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_address_is_raw_value() {
        let cr2 = Cr2::from_bits(0x0040_1234);
        assert_eq!(cr2.fault_address(), VirtualAddress::new(0x0040_1234));
        assert_eq!(cr2.into_bits(), 0x0040_1234);
    }
}

//! # Hardware Register Interface
//!
//! The paging code needs exactly four things from the CPU: the faulting
//! address, a way to install a page directory, the paging-enable bit, and a
//! TLB flush. [`Mmu`] names them so the rest of the crate stays testable on
//! the host; [`X86Mmu`] implements them with the control registers.

use kernel_memory_addresses::{FrameNumber, VirtualAddress};

/// The MMU operations consumed by [`Paging`](crate::Paging).
pub trait Mmu {
    /// Linear address of the most recent page fault (CR2).
    fn fault_address(&self) -> VirtualAddress;

    /// Makes the directory in `directory` the active one (CR3).
    fn load_directory(&mut self, directory: FrameNumber);

    /// Sets the paging-enable bit (CR0.PG).
    fn enable_paging(&mut self);

    /// Invalidates every non-global TLB entry.
    fn flush_tlb(&mut self);
}

/// [`Mmu`] backed by the IA-32 control registers.
#[cfg(target_arch = "x86")]
pub struct X86Mmu {
    _private: (),
}

#[cfg(target_arch = "x86")]
impl X86Mmu {
    /// # Safety
    /// Must only be used at CPL0. The caller must keep code, stack and the
    /// page-table frames mapped in every directory it loads.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86")]
impl Mmu for X86Mmu {
    fn fault_address(&self) -> VirtualAddress {
        use kernel_registers::LoadRegisterUnsafe;
        use kernel_registers::cr2::Cr2;

        // SAFETY: Ring 0 is guaranteed by the constructor contract.
        unsafe { Cr2::load_unsafe() }.fault_address()
    }

    fn load_directory(&mut self, directory: FrameNumber) {
        use kernel_registers::StoreRegisterUnsafe;
        use kernel_registers::cr3::Cr3;

        // SAFETY: Ring 0 is guaranteed by the constructor contract.
        unsafe { Cr3::from_directory(directory, false, false).store_unsafe() };
    }

    fn enable_paging(&mut self) {
        use kernel_registers::cr0::Cr0;
        use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

        // SAFETY: Ring 0 is guaranteed by the constructor contract; CR3 holds
        // a directory that maps the running code.
        unsafe {
            let cr0 = Cr0::load_unsafe().with_pg_paging(true);
            cr0.store_unsafe();
        }
    }

    fn flush_tlb(&mut self) {
        use kernel_registers::cr3::Cr3;
        use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

        // SAFETY: Rewriting CR3 with its own value only drops cached translations.
        unsafe { Cr3::load_unsafe().store_unsafe() };
    }
}

//! # Typed IA-32 Control Registers
//!
//! The control registers consumed by two-level paging in 32-bit protected mode:
//!
//! * [`cr0::Cr0`]: the paging-enable bit (`PG`).
//! * [`cr2::Cr2`]: the linear address of the last page fault.
//! * [`cr3::Cr3`]: the physical base of the active page directory.
//!
//! Reading and writing the registers requires ring 0 and is only compiled with
//! the `asm` feature on `target_arch = "x86"`; the bit layouts are available on
//! every target so they can be tested on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr0")]
pub mod cr0;

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

/// Reads a privileged register.
pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The register access is privileged and requires ring 0.
    unsafe fn load_unsafe() -> Self;
}

/// Writes a privileged register.
pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The register access is privileged and requires ring 0. Writes to CR0
    /// and CR3 change address translation for all following instructions.
    unsafe fn store_unsafe(self);
}

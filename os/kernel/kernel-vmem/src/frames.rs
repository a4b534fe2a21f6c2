//! # Access to Page-Table Frames
//!
//! Page directories and page tables live in physical frames taken from the
//! kernel pool. Code that edits them needs a way to "see" such a frame as a
//! [`Table`]. [`TableFrames`] abstracts that translation:
//!
//! - [`IdentityTableFrames`] dereferences the frame's physical address
//!   directly. This is valid because every page-table frame comes from the
//!   kernel pool, which lies inside the shared identity-mapped region.
//! - Host tests use an in-memory arena keyed by frame number.

use crate::Table;
use kernel_memory_addresses::FrameNumber;

/// Resolves page-table frames to typed tables.
///
/// # Safety
/// Implementors must return references to memory that really is the frame's
/// content (or stands in for it consistently) and must not hand out two live
/// mutable references to the same frame.
pub unsafe trait TableFrames {
    /// Borrow the table stored in `frame`.
    fn table(&self, frame: FrameNumber) -> &Table;

    /// Mutably borrow the table stored in `frame`.
    fn table_mut(&mut self, frame: FrameNumber) -> &mut Table;
}

/// [`TableFrames`] for identity-mapped page-table frames.
pub struct IdentityTableFrames {
    _private: (),
}

impl IdentityTableFrames {
    /// # Safety
    /// Every frame later passed to [`TableFrames::table`] or
    /// [`TableFrames::table_mut`] must be identity mapped and writable in every
    /// address space that is active while it is accessed.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

unsafe impl TableFrames for IdentityTableFrames {
    fn table(&self, frame: FrameNumber) -> &Table {
        // SAFETY: Identity mapping is guaranteed by the constructor contract.
        unsafe { &*frame.base().as_mut_ptr::<Table>() }
    }

    fn table_mut(&mut self, frame: FrameNumber) -> &mut Table {
        // SAFETY: Identity mapping is guaranteed by the constructor contract;
        // `&mut self` prevents handing out two mutable borrows at once.
        unsafe { &mut *frame.base().as_mut_ptr::<Table>() }
    }
}

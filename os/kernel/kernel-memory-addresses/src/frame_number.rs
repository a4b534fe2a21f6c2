use crate::{FRAME_COUNT, PAGE_SHIFT, PhysicalAddress};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Number of a 4 KiB physical frame.
///
/// Frame `n` covers the physical bytes `[n * 4096, (n + 1) * 4096)`. Frame
/// pools hand out and take back frames exclusively in this unit.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let f = FrameNumber::new(512);
/// assert_eq!(f.base(), PhysicalAddress::new(0x0020_0000));
/// assert_eq!(f + 3, FrameNumber::new(515));
/// assert_eq!(FrameNumber::new(515) - f, 3);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FrameNumber(u32);

impl FrameNumber {
    #[inline]
    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    /// The frame containing the physical address `pa`.
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u32() >> PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Physical address of the first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }

    /// Whether a run of `n` frames starting here ends at or before
    /// [`FRAME_COUNT`].
    #[inline]
    #[must_use]
    pub const fn run_fits(self, n: u32) -> bool {
        self.0 as u64 + n as u64 <= FRAME_COUNT as u64
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for FrameNumber {
    #[inline]
    fn from(n: u32) -> Self {
        Self::new(n)
    }
}

impl From<FrameNumber> for u32 {
    #[inline]
    fn from(f: FrameNumber) -> Self {
        f.as_u32()
    }
}

impl Add<u32> for FrameNumber {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for FrameNumber {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

/// Distance in frames between two frame numbers.
impl core::ops::Sub for FrameNumber {
    type Output = u32;
    #[inline]
    fn sub(self, rhs: Self) -> u32 {
        self.0 - rhs.0
    }
}

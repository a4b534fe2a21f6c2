//! # Contiguous Frame Pool
//!
//! A [`ContFramePool`] manages one contiguous range of physical frames. It
//! wraps a [`FreeExtents`] tracker together with a [`Ledger`] of live
//! allocations, so that a run can be released knowing only its first frame.
//!
//! ## Metadata frames
//!
//! The pool needs [`needed_info_frames`] frames for its own bookkeeping:
//!
//! - With `info_frame == None` they are carved from the front of the pool,
//!   which shrinks the managed range accordingly.
//! - With `info_frame == Some(f)` the frames starting at `f` are used as-is.
//!   This lets the process pool keep its bookkeeping in the kernel pool.
//!
//! ## Frame states
//!
//! Each frame is either free (covered by an extent), the head of an allocated
//! run (a ledger record starts there), or inside an allocated run. A run goes
//! back to free as one unit; partial release is not supported.
//!
//! ## Invariant
//!
//! The free extents and the ledger-recorded runs together cover the managed
//! range exactly, without overlap, except for frames reserved through
//! [`ContFramePool::mark_inaccessible`], which belong to neither.

use crate::free_extents::{Extent, FreeExtents};
use crate::ledger::Ledger;
use crate::mapper::{MetadataMapper, MetadataStorage};
use crate::slab::Node;
use crate::{FrameSource, ReleaseError};
use kernel_memory_addresses::{FrameNumber, PAGE_SIZE};
use log::{debug, trace};

/// Number of metadata frames a pool of `frame_count` frames needs.
///
/// Worst case every frame is its own one-frame allocation, so both lists need
/// one node per frame. The result is rounded up to whole frames and is at
/// least one.
///
/// ```rust
/// # use kernel_frame_pool::needed_info_frames;
/// assert_eq!(needed_info_frames(1), 1);
/// assert_eq!(needed_info_frames(512), 3);
/// assert_eq!(needed_info_frames(7168), 42);
/// ```
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn needed_info_frames(frame_count: u32) -> u32 {
    let bytes = 2 * size_of::<Node>() as u64 * frame_count as u64;
    let frames = bytes.div_ceil(PAGE_SIZE as u64) as u32;
    if frames == 0 { 1 } else { frames }
}

/// A pool that cannot be constructed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FramePoolError {
    #[error("frame pool at {0} is empty")]
    Empty(FrameNumber),
    #[error("{count} frame(s) at {base} exceed the physical frame range")]
    OutOfRange { base: FrameNumber, count: u32 },
    #[error("frame pool needs {needed} metadata frames but has only {available}")]
    MetadataTooLarge { needed: u32, available: u32 },
    #[error("metadata frame {0} lies inside the pool it describes")]
    MetadataInsidePool(FrameNumber),
    #[error("metadata holds {capacity} extents but the pool needs {needed}")]
    MetadataTooSmall { capacity: usize, needed: usize },
}

/// A contiguous range of physical frames with first-fit allocation of runs.
pub struct ContFramePool<S> {
    base_frame: FrameNumber,
    frame_count: u32,
    info_frame: FrameNumber,
    info_frames: u32,
    extents: FreeExtents<S>,
    ledger: Ledger<S>,
}

impl<S> ContFramePool<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    /// Creates a pool over `[base_frame, base_frame + frame_count)`.
    ///
    /// `info_frame` selects where the bookkeeping lives: `None` carves it from
    /// the front of the pool, `Some(f)` uses [`needed_info_frames`] frames
    /// starting at `f`, which the caller must own.
    ///
    /// # Errors
    /// Returns a [`FramePoolError`] if the range is empty, if it or the
    /// metadata reaches past the last physical frame, if the metadata would
    /// consume the whole pool or overlap it, or if the storage provided by
    /// `mapper` is too small.
    pub fn new<M>(
        base_frame: FrameNumber,
        frame_count: u32,
        info_frame: Option<FrameNumber>,
        mapper: &M,
    ) -> Result<Self, FramePoolError>
    where
        M: MetadataMapper<Storage = S>,
    {
        if frame_count == 0 {
            return Err(FramePoolError::Empty(base_frame));
        }
        if !base_frame.run_fits(frame_count) {
            return Err(FramePoolError::OutOfRange {
                base: base_frame,
                count: frame_count,
            });
        }

        let info_frames = needed_info_frames(frame_count);
        let (managed_base, managed_count, info_frame) = match info_frame {
            None => {
                if info_frames >= frame_count {
                    return Err(FramePoolError::MetadataTooLarge {
                        needed: info_frames,
                        available: frame_count,
                    });
                }
                (
                    base_frame + info_frames,
                    frame_count - info_frames,
                    base_frame,
                )
            }
            Some(frame) => {
                let pool = Extent::new(base_frame, frame_count);
                if !frame.run_fits(info_frames) {
                    return Err(FramePoolError::OutOfRange {
                        base: frame,
                        count: info_frames,
                    });
                }
                let info = Extent::new(frame, info_frames);
                if pool.overlaps(&info) {
                    return Err(FramePoolError::MetadataInsidePool(frame));
                }
                (base_frame, frame_count, frame)
            }
        };

        let MetadataStorage { extents, ledger } = mapper.map_metadata(info_frame, info_frames);
        let mut extents = FreeExtents::new(extents);
        let needed = managed_count.div_ceil(2) as usize;
        if extents.capacity() < needed {
            return Err(FramePoolError::MetadataTooSmall {
                capacity: extents.capacity(),
                needed,
            });
        }
        extents.initialize(managed_base, managed_count);

        debug!(
            "Frame pool at {base_frame}: managing {managed_count} frames from {managed_base}, {info_frames} metadata frame(s) at {info_frame}"
        );

        Ok(Self {
            base_frame: managed_base,
            frame_count: managed_count,
            info_frame,
            info_frames,
            extents,
            ledger: Ledger::new(ledger),
        })
    }

    /// Allocates `n` contiguous frames and returns the first one.
    ///
    /// Returns `None` when no free run of `n` frames exists, when `n` is zero,
    /// or when the ledger has no room for another record.
    pub fn get_frames(&mut self, n: u32) -> Option<FrameNumber> {
        if self.ledger.is_full() {
            return None;
        }
        let first = self.extents.allocate(n)?;
        if !self.ledger.record(first - self.base_frame, n) {
            self.extents.release(first, n);
            return None;
        }
        trace!("Allocated {n} frame(s) at {first}");
        Some(first)
    }

    /// Releases the run starting at `first`.
    ///
    /// # Errors
    /// [`ReleaseError::NotOwned`] if `first` lies outside this pool,
    /// [`ReleaseError::NotAllocated`] if no run starts at `first`.
    pub fn release(&mut self, first: FrameNumber) -> Result<(), ReleaseError> {
        if !self.contains(first) {
            return Err(ReleaseError::NotOwned(first));
        }
        let length = self
            .ledger
            .take(first - self.base_frame)
            .ok_or(ReleaseError::NotAllocated(first))?;
        self.extents.release(first, length);
        trace!("Released {length} frame(s) at {first}");
        Ok(())
    }

    /// Permanently removes `[base, base + n)` from the free frames.
    ///
    /// Intended for holes and non-RAM ranges before any allocation happens.
    /// Returns how many free frames were removed.
    pub fn mark_inaccessible(&mut self, base: FrameNumber, n: u32) -> u32 {
        let removed = self.extents.mark_unavailable(base, n);
        debug!("Marked {removed} of {n} frame(s) at {base} inaccessible");
        removed
    }

    /// First managed frame (after any carved metadata).
    #[inline]
    #[must_use]
    pub const fn base_frame(&self) -> FrameNumber {
        self.base_frame
    }

    /// Number of managed frames (after any carved metadata).
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// First metadata frame and the number of metadata frames.
    #[inline]
    #[must_use]
    pub const fn info_frames(&self) -> (FrameNumber, u32) {
        (self.info_frame, self.info_frames)
    }

    /// The managed range as one run.
    #[inline]
    #[must_use]
    pub const fn managed(&self) -> Extent {
        Extent::new(self.base_frame, self.frame_count)
    }

    /// Whether `frame` lies in the managed range.
    #[inline]
    #[must_use]
    pub const fn contains(&self, frame: FrameNumber) -> bool {
        self.managed().contains(frame)
    }

    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> u32 {
        self.extents.free_frames()
    }

    /// Free runs in ascending order.
    pub fn extents(&self) -> impl Iterator<Item = Extent> + '_ {
        self.extents.iter()
    }

    /// Live allocations, newest first.
    pub fn allocations(&self) -> impl Iterator<Item = Extent> + '_ {
        let base = self.base_frame;
        self.ledger
            .iter()
            .map(move |e| Extent::new(base + e.relative_start, e.length))
    }
}

impl<S> FrameSource for ContFramePool<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    fn get_frames(&mut self, n: u32) -> Option<FrameNumber> {
        Self::get_frames(self, n)
    }

    fn release_frames(&mut self, first: FrameNumber) -> Result<(), ReleaseError> {
        self.release(first)
    }
}

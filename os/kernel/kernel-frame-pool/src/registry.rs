//! # Pool Registry
//!
//! The [`PoolRegistry`] owns every frame pool of the system. Callers that only
//! hold a frame number (a thread stack, a page-table frame, a data page) can
//! release it through [`PoolRegistry::release_frames`], which locates the
//! owning pool by range containment.
//!
//! Pools are registered once and never removed. Their managed ranges are
//! disjoint, so every frame has at most one owner.

use crate::pool::ContFramePool;
use crate::slab::Node;
use crate::ReleaseError;
use core::fmt;
use kernel_info::memory::MAX_FRAME_POOLS;
use kernel_memory_addresses::FrameNumber;
use log::warn;

/// Handle of a pool inside a [`PoolRegistry`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PoolId(u8);

impl PoolId {
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({})", self.0)
    }
}

/// Bounded, append-only collection of frame pools.
pub struct PoolRegistry<S> {
    pools: heapless::Vec<ContFramePool<S>, MAX_FRAME_POOLS>,
}

impl<S> Default for PoolRegistry<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PoolRegistry<S>
where
    S: AsRef<[Node]> + AsMut<[Node]>,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pools: heapless::Vec::new(),
        }
    }

    /// Adds `pool` to the registry.
    ///
    /// # Panics
    /// Panics if [`MAX_FRAME_POOLS`] pools are registered already, or if the
    /// managed range of `pool` overlaps that of a registered pool.
    #[allow(clippy::cast_possible_truncation)]
    pub fn register(&mut self, pool: ContFramePool<S>) -> PoolId {
        let range = pool.managed();
        if let Some(other) = self.pools.iter().find(|p| p.managed().overlaps(&range)) {
            panic!("frame pool {range:?} overlaps registered pool {:?}", other.managed());
        }
        let id = PoolId(self.pools.len() as u8);
        if self.pools.push(pool).is_err() {
            panic!("frame pool registry is full ({MAX_FRAME_POOLS} pools)");
        }
        id
    }

    #[inline]
    #[must_use]
    pub fn pool(&self, id: PoolId) -> &ContFramePool<S> {
        &self.pools[id.as_usize()]
    }

    #[inline]
    pub fn pool_mut(&mut self, id: PoolId) -> &mut ContFramePool<S> {
        &mut self.pools[id.as_usize()]
    }

    /// Allocates `n` contiguous frames from the pool `id`.
    pub fn get_frames(&mut self, id: PoolId, n: u32) -> Option<FrameNumber> {
        self.pool_mut(id).get_frames(n)
    }

    /// The pool whose managed range contains `frame`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn owner_of(&self, frame: FrameNumber) -> Option<PoolId> {
        self.pools
            .iter()
            .position(|pool| pool.contains(frame))
            .map(|i| PoolId(i as u8))
    }

    /// Releases the run starting at `first` back to whichever pool owns it.
    ///
    /// An unknown frame or a frame that does not start a live run is reported
    /// with a warning and otherwise ignored.
    ///
    /// # Errors
    /// [`ReleaseError::NotOwned`] if no pool contains `first`,
    /// [`ReleaseError::NotAllocated`] if no live run starts at `first`.
    pub fn release_frames(&mut self, first: FrameNumber) -> Result<(), ReleaseError> {
        let result = match self.owner_of(first) {
            Some(id) => self.pool_mut(id).release(first),
            None => Err(ReleaseError::NotOwned(first)),
        };
        if let Err(err) = &result {
            warn!("Ignoring frame release: {err}");
        }
        result
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Iterates the pools in registration order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &ContFramePool<S>)> {
        self.pools
            .iter()
            .enumerate()
            .map(|(i, pool)| (PoolId(i as u8), pool))
    }
}

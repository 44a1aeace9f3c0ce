// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// An opaque 32-bit handle to a string interned in a
/// [`crate::SharedStringRepo`].
///
/// Copying a handle does not acquire a reference; see
/// [`crate::SharedStringRepo::copy`] for that. The value `0` is reserved for
/// the empty string, which is never stored and never reference counted.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub const EMPTY: Handle = Handle(0);

    /// Raw value for serialization/debugging.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Recreates a handle from [`Handle::as_u32`]. The result is only
    /// meaningful for the repository that issued the value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

/// Packs `(partition, slot)` pairs into handles and back.
///
/// The encoding is `((slot << partition_bits) | partition) + 1`, so no packed
/// handle is ever [`Handle::EMPTY`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct HandleLayout {
    partition_bits: u32,
}

impl HandleLayout {
    pub(crate) const fn new(partition_bits: u32) -> Self {
        debug_assert!(partition_bits < u32::BITS);
        Self { partition_bits }
    }

    #[inline]
    fn partition_mask(self) -> u32 {
        (1 << self.partition_bits) - 1
    }

    /// Number of slot indices a single partition may hand out. The largest
    /// slot combined with the largest partition id must still leave room for
    /// the `+ 1` offset.
    #[inline]
    pub(crate) fn max_slots(self) -> usize {
        ((1u64 << (u32::BITS - self.partition_bits)) - 1) as usize
    }

    #[inline]
    pub(crate) fn pack(self, partition: usize, slot: u32) -> Handle {
        debug_assert!(partition as u32 <= self.partition_mask());
        debug_assert!((slot as usize) < self.max_slots());
        Handle(((slot << self.partition_bits) | partition as u32) + 1)
    }

    /// Returns `None` for [`Handle::EMPTY`].
    #[inline]
    pub(crate) fn unpack(self, handle: Handle) -> Option<(usize, u32)> {
        let raw = handle.0.checked_sub(1)?;
        let partition = (raw & self.partition_mask()) as usize;
        let slot = raw >> self.partition_bits;
        Some((partition, slot))
    }
}

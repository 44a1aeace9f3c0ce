// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::handle::HandleLayout;
use crate::partition::Partition;
use crate::{Handle, RepoConfig, RepoError, RepoStats};
use std::hash::BuildHasher;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Hashes strings once per `resolve`; the result picks the partition and,
/// remixed by [`table_hash`], keys the partition's lookup table.
pub(crate) type RepoHasher = core::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// A string interning table shared by everything in the process that wants
/// to pass strings around as small integers.
///
/// Strings are spread over `1 << partition_bits` independently locked
/// partitions by hash. Operations on different partitions never wait for
/// each other.
///
/// Each successful [`SharedStringRepo::resolve`] or
/// [`SharedStringRepo::copy`] must be paired with exactly one
/// [`SharedStringRepo::reclaim`]. A handle that is never reclaimed keeps its
/// slot forever; reclaiming too often panics. [`crate::StrongHandles`] and
/// [`crate::StringHandle`] take care of the pairing.
#[derive(Debug)]
pub struct SharedStringRepo {
    layout: HandleLayout,
    partitions: Box<[Partition]>,
}

static REPO: OnceLock<SharedStringRepo> = OnceLock::new();

impl SharedStringRepo {
    /// Returns the process-wide repository, creating it from
    /// [`RepoConfig::from_env`] on first use. It is never torn down.
    pub fn get() -> &'static SharedStringRepo {
        REPO.get_or_init(|| {
            let config = RepoConfig::from_env();
            debug!(
                partitions = config.partition_count(),
                initial_entries = config.initial_entries(),
                "Creating the shared string repo"
            );
            SharedStringRepo::new(config)
        })
    }

    /// Creates an independent repository. Handles from one repository mean
    /// nothing to another.
    pub fn new(config: RepoConfig) -> Self {
        let layout = HandleLayout::new(config.partition_bits());
        let partitions = (0..config.partition_count())
            .map(|id| Partition::new(id, config.initial_entries(), layout.max_slots()))
            .collect();
        Self { layout, partitions }
    }

    /// Selects the partition from the upper bits of the hash; the partition's
    /// own lookup table consumes the full hash.
    #[inline]
    fn select_partition(&self, hash: u64) -> usize {
        let bits = self.partitions.len().trailing_zeros();
        hash.checked_shr(u64::BITS - bits).unwrap_or(0) as usize
    }

    /// Interns `text`, returning a handle that holds one reference to it.
    /// Equal strings get handles naming the same entry.
    pub fn resolve(&self, text: &str) -> Result<Handle, RepoError> {
        if text.is_empty() {
            return Ok(Handle::EMPTY);
        }
        let hash = RepoHasher::default().hash_one(text);
        let part = self.select_partition(hash);
        let slot = self.partitions[part].resolve(table_hash(hash), text)?;
        Ok(self.layout.pack(part, slot))
    }

    /// Returns the string named by a live handle. The returned string stays
    /// valid after the handle is reclaimed.
    ///
    /// # Panics
    /// If the handle has already been reclaimed or was never issued by this
    /// repository.
    pub fn get_string(&self, handle: Handle) -> Arc<str> {
        match self.layout.unpack(handle) {
            Some((part, slot)) => self.partitions[part].get_string(slot),
            None => Arc::from(""),
        }
    }

    /// Adds a reference to the entry named by a live handle and returns the
    /// handle for the new reference.
    ///
    /// # Panics
    /// If the handle is not live.
    pub fn copy(&self, handle: Handle) -> Result<Handle, RepoError> {
        if let Some((part, slot)) = self.layout.unpack(handle) {
            self.partitions[part].copy(slot)?;
        }
        Ok(handle)
    }

    /// Gives up one reference. The last reference frees the slot for reuse,
    /// after which the handle value may name a different string.
    ///
    /// # Panics
    /// If the handle is not live, e.g. on a double reclaim.
    pub fn reclaim(&self, handle: Handle) {
        if let Some((part, slot)) = self.layout.unpack(handle) {
            self.partitions[part].reclaim(slot);
        }
    }

    /// Number of outstanding references for `handle`, 0 if it is not live.
    /// Intended for tests and debugging. [`Handle::EMPTY`] is never counted.
    pub fn ref_count(&self, handle: Handle) -> u32 {
        match self.layout.unpack(handle) {
            Some((part, slot)) => self.partitions[part].ref_count(slot),
            None => 0,
        }
    }

    pub fn stats(&self) -> RepoStats {
        let mut stats = RepoStats::default();
        for partition in self.partitions.iter() {
            stats.merge(&partition.stats());
        }
        stats
    }
}

/// The partition bits sit at the top of the hash, where hashbrown takes its
/// 7-bit control tag from. Inside a partition they are all equal, so rotate
/// them out of the way.
#[inline]
fn table_hash(hash: u64) -> u64 {
    hash.rotate_left(32)
}

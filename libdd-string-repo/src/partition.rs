// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::EntryTable;
use crate::{RepoError, RepoStats};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// An independently locked shard of the repository.
///
/// Every operation holds the lock for its whole duration, so the slot table,
/// its free list and its lookup table always change together. Partitions
/// are cache padded so that neighbouring locks do not share a line.
#[derive(Debug)]
pub(crate) struct Partition {
    id: usize,
    table: CachePadded<Mutex<EntryTable>>,
}

impl Partition {
    pub(crate) fn new(id: usize, initial_entries: usize, max_slots: usize) -> Self {
        Self {
            id,
            table: CachePadded::new(Mutex::new(EntryTable::new(initial_entries, max_slots))),
        }
    }

    /// Returns the slot holding `text`, adding a reference to an existing
    /// one or allocating a new one.
    pub(crate) fn resolve(&self, hash: u64, text: &str) -> Result<u32, RepoError> {
        let mut table = self.table.lock();
        if let Some(idx) = table.find(hash, text) {
            table.acquire(idx)?;
            return Ok(idx);
        }

        let old_len = table.len();
        match table.allocate(hash, text) {
            Ok(idx) => {
                if table.len() != old_len {
                    debug!(
                        partition = self.id,
                        old_len,
                        new_len = table.len(),
                        "Grew string repo partition"
                    );
                }
                Ok(idx)
            }
            Err(RepoError::StorageFull) => {
                warn!(
                    partition = self.id,
                    len = old_len,
                    "String repo partition is out of handle space"
                );
                Err(RepoError::StorageFull)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn copy(&self, idx: u32) -> Result<(), RepoError> {
        self.table.lock().acquire(idx)
    }

    pub(crate) fn reclaim(&self, idx: u32) {
        self.table.lock().release(idx);
    }

    pub(crate) fn get_string(&self, idx: u32) -> Arc<str> {
        self.table.lock().text(idx).clone()
    }

    pub(crate) fn ref_count(&self, idx: u32) -> u32 {
        self.table.lock().ref_count(idx)
    }

    pub(crate) fn stats(&self) -> RepoStats {
        let table = self.table.lock();
        debug_assert_eq!(table.free_list().count(), table.len() - table.live());
        RepoStats::for_partition(table.live(), table.len())
    }

    /// Runs `f` with the partition locked. For invariant checks in tests.
    #[cfg(test)]
    pub(crate) fn with_table<R>(&self, f: impl FnOnce(&EntryTable) -> R) -> R {
        f(&self.table.lock())
    }

    #[cfg(test)]
    pub(crate) fn with_table_mut<R>(&self, f: impl FnOnce(&mut EntryTable) -> R) -> R {
        f(&mut self.table.lock())
    }
}

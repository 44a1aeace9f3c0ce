// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// Snapshot of how much of a repository is in use.
///
/// Partitions are sampled one after another, so under concurrent use the
/// numbers of different partitions may be from slightly different moments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RepoStats {
    /// Slots holding a string.
    pub active_entries: usize,
    /// Slots allocated, live or free.
    pub total_entries: usize,
    /// Highest `active / total` ratio of any single partition.
    pub max_partition_usage: f64,
}

impl RepoStats {
    pub(crate) fn for_partition(active_entries: usize, total_entries: usize) -> Self {
        let max_partition_usage = if total_entries == 0 {
            0.0
        } else {
            active_entries as f64 / total_entries as f64
        };
        Self {
            active_entries,
            total_entries,
            max_partition_usage,
        }
    }

    pub fn merge(&mut self, other: &RepoStats) {
        self.active_entries += other.active_entries;
        self.total_entries += other.total_entries;
        self.max_partition_usage = self.max_partition_usage.max(other.max_partition_usage);
    }

    /// Overall `active / total` ratio.
    pub fn id_space_usage(&self) -> f64 {
        if self.total_entries == 0 {
            0.0
        } else {
            self.active_entries as f64 / self.total_entries as f64
        }
    }
}

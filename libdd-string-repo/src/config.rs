// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::RepoError;
use tracing::warn;

pub const ENV_PARTITION_BITS: &str = "DD_STRING_REPO_PARTITION_BITS";
pub const ENV_INITIAL_ENTRIES: &str = "DD_STRING_REPO_INITIAL_ENTRIES";

/// Largest supported number of partition bits. Every bit spent on the
/// partition id is one bit less for the slot index inside the handle.
pub const MAX_PARTITION_BITS: u32 = 16;

const DEFAULT_PARTITION_BITS: u32 = 8;
const DEFAULT_INITIAL_ENTRIES: usize = 64;

pub mod parse_env {
    use std::env;

    pub fn str_not_empty(name: &str) -> Option<String> {
        env::var(name).ok().filter(|s| !s.is_empty())
    }
}

/// Shape of a [`crate::SharedStringRepo`]. Fixed once the repository is
/// built.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RepoConfig {
    partition_bits: u32,
    initial_entries: usize,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            partition_bits: DEFAULT_PARTITION_BITS,
            initial_entries: DEFAULT_INITIAL_ENTRIES,
        }
    }
}

impl RepoConfig {
    pub fn try_new(partition_bits: u32, initial_entries: usize) -> Result<Self, RepoError> {
        if partition_bits > MAX_PARTITION_BITS {
            return Err(RepoError::InvalidArgument);
        }
        Ok(Self {
            partition_bits,
            initial_entries,
        })
    }

    /// Reads the configuration from the environment. Unset variables use the
    /// defaults; unparsable or out of range values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_values(
            parse_env::str_not_empty(ENV_PARTITION_BITS).as_deref(),
            parse_env::str_not_empty(ENV_INITIAL_ENTRIES).as_deref(),
        )
    }

    fn from_values(partition_bits: Option<&str>, initial_entries: Option<&str>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = partition_bits {
            match raw.parse::<u32>() {
                Ok(bits) if bits <= MAX_PARTITION_BITS => config.partition_bits = bits,
                _ => warn!(
                    "Ignoring {ENV_PARTITION_BITS}={raw:?}, expected an integer in 0..={MAX_PARTITION_BITS}"
                ),
            }
        }

        if let Some(raw) = initial_entries {
            match raw.parse::<usize>() {
                Ok(entries) => config.initial_entries = entries,
                Err(_) => warn!("Ignoring {ENV_INITIAL_ENTRIES}={raw:?}, expected an integer"),
            }
        }

        config
    }

    #[inline]
    pub fn partition_bits(&self) -> u32 {
        self.partition_bits
    }

    #[inline]
    pub fn partition_count(&self) -> usize {
        1 << self.partition_bits
    }

    /// Slot hint used the first time a partition grows.
    #[inline]
    pub fn initial_entries(&self) -> usize {
        self.initial_entries
    }
}

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::TryReserveError;

/// Errors returned by the string repository.
///
/// Only resource problems are reported this way. Contract violations, such
/// as reclaiming a handle twice or resolving a handle that was never issued,
/// panic instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RepoError {
    /// A parameter was incorrect, e.g. partition bits out of range.
    #[error("invalid argument")]
    InvalidArgument,
    /// Failed to allocate memory for more slots or lookup buckets.
    #[error("out of memory")]
    OutOfMemory,
    /// An entry has been acquired more often than its counter can represent.
    #[error("reference count overflow")]
    RefcountOverflow,
    /// The partition has no slot index left that fits into a handle. This
    /// is different from out of memory, the limit comes from the 32-bit
    /// handle encoding.
    #[error("storage full")]
    StorageFull,
}

impl From<TryReserveError> for RepoError {
    #[cold]
    fn from(_: TryReserveError) -> Self {
        RepoError::OutOfMemory
    }
}

impl From<hashbrown::TryReserveError> for RepoError {
    #[cold]
    fn from(err: hashbrown::TryReserveError) -> Self {
        match err {
            hashbrown::TryReserveError::CapacityOverflow => RepoError::StorageFull,
            hashbrown::TryReserveError::AllocError { .. } => RepoError::OutOfMemory,
        }
    }
}

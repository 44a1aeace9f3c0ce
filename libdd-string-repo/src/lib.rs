// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide string interning.
//!
//! [`SharedStringRepo`] maps strings to 32-bit [`Handle`]s so that repeated
//! strings such as field names and tags can be stored and compared as
//! integers. Entries are reference counted and their slots are recycled once
//! the last reference is reclaimed.
//!
//! ```
//! use libdd_string_repo::{RepoConfig, SharedStringRepo, StrongHandles};
//!
//! let repo = SharedStringRepo::new(RepoConfig::default());
//! let mut names = StrongHandles::with_repo(&repo, 2);
//! let a = names.add("service").unwrap();
//! let b = names.add("service").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(&*repo.get_string(a), "service");
//! drop(names);
//! assert_eq!(repo.ref_count(a), 0);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod entry;
mod error;
mod handle;
mod handles;
mod partition;
mod repo;
mod stats;

pub use config::*;
pub use error::*;
pub use handle::Handle;
pub use handles::*;
pub use repo::*;
pub use stats::*;

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{Handle, RepoError, SharedStringRepo};
use std::fmt;
use std::sync::Arc;

/// Handle values recorded without any obligation to reclaim them.
///
/// Whoever fills it must make sure every entry stays live for as long as the
/// collection is read, typically because a [`StrongHandles`] holds them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WeakHandles {
    handles: Vec<Handle>,
}

impl WeakHandles {
    pub fn new(expect_size: usize) -> Self {
        Self {
            handles: Vec::with_capacity(expect_size),
        }
    }

    #[inline]
    pub fn add(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    #[inline]
    pub fn view(&self) -> &[Handle] {
        &self.handles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl From<&StrongHandles<'_>> for WeakHandles {
    fn from(strong: &StrongHandles<'_>) -> Self {
        Self {
            handles: strong.view().to_vec(),
        }
    }
}

/// An ordered list of handles, each holding one reference that is reclaimed
/// when the list is dropped.
///
/// Not `Clone`; moving the list moves the obligation to reclaim.
pub struct StrongHandles<'r> {
    repo: &'r SharedStringRepo,
    handles: Vec<Handle>,
}

impl StrongHandles<'static> {
    /// Creates a list bound to the process-wide [`SharedStringRepo::get`].
    pub fn new(expect_size: usize) -> Self {
        Self::with_repo(SharedStringRepo::get(), expect_size)
    }
}

impl<'r> StrongHandles<'r> {
    pub fn with_repo(repo: &'r SharedStringRepo, expect_size: usize) -> Self {
        Self {
            repo,
            handles: Vec::with_capacity(expect_size),
        }
    }

    /// Interns `text` and appends the resulting handle.
    pub fn add(&mut self, text: &str) -> Result<Handle, RepoError> {
        self.handles.try_reserve(1)?;
        let handle = self.repo.resolve(text)?;
        self.handles.push(handle);
        Ok(handle)
    }

    /// Appends a handle whose reference the caller hands over, e.g. the
    /// result of [`SharedStringRepo::resolve`] or [`SharedStringRepo::copy`]
    /// on the same repository.
    pub fn adopt(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    #[inline]
    pub fn repo(&self) -> &'r SharedStringRepo {
        self.repo
    }

    #[inline]
    pub fn view(&self) -> &[Handle] {
        &self.handles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for StrongHandles<'_> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.repo.reclaim(handle);
        }
    }
}

impl fmt::Debug for StrongHandles<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrongHandles")
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

/// A single handle holding one reference, reclaimed on drop.
pub struct StringHandle<'r> {
    repo: &'r SharedStringRepo,
    id: Handle,
}

impl<'r> StringHandle<'r> {
    pub fn new(repo: &'r SharedStringRepo, text: &str) -> Result<Self, RepoError> {
        let id = repo.resolve(text)?;
        Ok(Self { repo, id })
    }

    /// Acquires another reference to the same entry. Fails instead of
    /// panicking when the reference count would overflow.
    pub fn try_clone(&self) -> Result<Self, RepoError> {
        let id = self.repo.copy(self.id)?;
        Ok(Self {
            repo: self.repo,
            id,
        })
    }

    #[inline]
    pub fn id(&self) -> Handle {
        self.id
    }

    pub fn as_string(&self) -> Arc<str> {
        self.repo.get_string(self.id)
    }

    /// Gives up ownership without reclaiming; the caller becomes responsible
    /// for the reference.
    pub fn into_handle(self) -> Handle {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl StringHandle<'static> {
    /// Interns `text` in the process-wide [`SharedStringRepo::get`].
    pub fn global(text: &str) -> Result<Self, RepoError> {
        Self::new(SharedStringRepo::get(), text)
    }
}

impl Drop for StringHandle<'_> {
    fn drop(&mut self) {
        self.repo.reclaim(self.id);
    }
}

impl fmt::Debug for StringHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringHandle").field(&self.id).finish()
    }
}

impl PartialEq for StringHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.repo, other.repo) && self.id == other.id
    }
}

impl Eq for StringHandle<'_> {}

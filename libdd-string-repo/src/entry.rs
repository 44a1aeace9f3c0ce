// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::RepoError;
use hashbrown::HashTable;
use std::mem::size_of;
use std::sync::Arc;

/// Free list terminator.
pub(crate) const NPOS: u32 = u32::MAX;

/// Highest reference count a live slot may reach.
pub(crate) const MAX_REF_COUNT: u32 = u32::MAX - 1;

/// One slot of an [`EntryTable`].
#[derive(Debug)]
pub(crate) enum Entry {
    /// Part of the intrusive free list; `next` is another free slot or
    /// [`NPOS`].
    Free { next: u32 },
    Live {
        hash: u64,
        ref_cnt: u32,
        text: Arc<str>,
    },
}

impl Entry {
    #[cfg(test)]
    pub(crate) fn is_free(&self) -> bool {
        matches!(self, Entry::Free { .. })
    }

    #[inline]
    fn hash(&self) -> u64 {
        match self {
            Entry::Live { hash, .. } => *hash,
            // Only live slots are ever indexed by the lookup table.
            Entry::Free { .. } => unreachable!("free slot in the lookup table"),
        }
    }
}

/// Growable slot array with an index based free list and a lookup table
/// keyed by content.
///
/// Slots are never removed or reordered, so a slot index stays meaningful
/// for as long as the table exists. Not synchronized; see
/// [`crate::partition::Partition`].
#[derive(Debug)]
pub(crate) struct EntryTable {
    entries: Vec<Entry>,
    free: u32,
    lookup: HashTable<u32>,
    max_slots: usize,
    initial_entries: usize,
}

impl EntryTable {
    /// Creates an empty table. Nothing is allocated until the first
    /// [`EntryTable::allocate`], which grows to at least `initial_entries`
    /// slots. `max_slots` bounds the slot indices this table may hand out.
    pub(crate) fn new(initial_entries: usize, max_slots: usize) -> Self {
        Self {
            entries: Vec::new(),
            free: NPOS,
            lookup: HashTable::new(),
            max_slots,
            initial_entries,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of live slots.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.lookup.len()
    }

    #[cfg(test)]
    pub(crate) fn free_head(&self) -> u32 {
        self.free
    }

    #[cfg(test)]
    pub(crate) fn entry(&self, idx: u32) -> Option<&Entry> {
        self.entries.get(idx as usize)
    }

    /// Adds at least `hint` slots worth of room, rounded up so the slot
    /// array occupies a power of two number of bytes. New slots are pushed
    /// onto the free list in index order, so afterwards the list starts at
    /// the highest new index and the previously free slots follow the new
    /// ones.
    pub(crate) fn grow(&mut self, hint: usize) -> Result<(), RepoError> {
        let old_len = self.entries.len();
        if old_len >= self.max_slots {
            return Err(RepoError::StorageFull);
        }

        let hint = hint.max(old_len + 1);
        let want_mem = hint
            .checked_mul(size_of::<Entry>())
            .and_then(usize::checked_next_power_of_two)
            .ok_or(RepoError::OutOfMemory)?;
        let want = (want_mem / size_of::<Entry>()).min(self.max_slots);

        self.entries.try_reserve_exact(want - old_len)?;
        while self.entries.len() < want {
            self.entries.push(Entry::Free { next: self.free });
            self.free = (self.entries.len() - 1) as u32;
        }
        Ok(())
    }

    /// Exact match lookup among live slots.
    pub(crate) fn find(&self, hash: u64, text: &str) -> Option<u32> {
        let entries = &self.entries;
        self.lookup
            .find(hash, |&idx| match &entries[idx as usize] {
                Entry::Live { text: live, .. } => live.as_ref() == text,
                Entry::Free { .. } => false,
            })
            .copied()
    }

    /// Pops the free list head and makes it live with a reference count of
    /// one. `hash` must be the hash of `text` used for every lookup on this
    /// table, and `text` must not be live already.
    pub(crate) fn allocate(&mut self, hash: u64, text: &str) -> Result<u32, RepoError> {
        debug_assert!(self.find(hash, text).is_none());
        if self.free == NPOS {
            let hint = if self.entries.is_empty() {
                self.initial_entries
            } else {
                self.entries.len() + 1
            };
            self.grow(hint)?;
        }

        // Reserve before touching the free list so a failure leaves the
        // table unchanged.
        let entries = &self.entries;
        self.lookup
            .try_reserve(1, |&idx| entries[idx as usize].hash())?;

        let idx = self.free;
        let slot = &mut self.entries[idx as usize];
        let Entry::Free { next } = *slot else {
            unreachable!("free list head {idx} is live");
        };
        *slot = Entry::Live {
            hash,
            ref_cnt: 1,
            text: Arc::from(text),
        };
        self.free = next;

        let entries = &self.entries;
        self.lookup
            .insert_unique(hash, idx, |&idx| entries[idx as usize].hash());
        Ok(idx)
    }

    /// # Panics
    /// If the slot is not live.
    pub(crate) fn acquire(&mut self, idx: u32) -> Result<(), RepoError> {
        match self.entries.get_mut(idx as usize) {
            Some(Entry::Live { ref_cnt, .. }) => {
                if *ref_cnt >= MAX_REF_COUNT {
                    return Err(RepoError::RefcountOverflow);
                }
                *ref_cnt += 1;
                Ok(())
            }
            _ => panic!("acquire of slot {idx} which is not live"),
        }
    }

    /// Drops one reference; the last one returns the slot to the free list.
    /// Returns whether the slot was freed.
    ///
    /// # Panics
    /// If the slot is not live, i.e. on a double release.
    pub(crate) fn release(&mut self, idx: u32) -> bool {
        let Some(Entry::Live { hash, ref_cnt, .. }) = self.entries.get_mut(idx as usize) else {
            panic!("release of slot {idx} which is not live");
        };
        debug_assert!(*ref_cnt > 0);
        *ref_cnt -= 1;
        if *ref_cnt > 0 {
            return false;
        }

        let hash = *hash;
        let removed = self.lookup.find_entry(hash, |&live| live == idx).map(|e| e.remove());
        debug_assert!(removed.is_ok());
        self.entries[idx as usize] = Entry::Free { next: self.free };
        self.free = idx;
        true
    }

    /// # Panics
    /// If the slot is not live.
    pub(crate) fn text(&self, idx: u32) -> &Arc<str> {
        match self.entries.get(idx as usize) {
            Some(Entry::Live { text, .. }) => text,
            _ => panic!("slot {idx} is not live"),
        }
    }

    /// Reference count of a slot; 0 for free or out of range slots.
    pub(crate) fn ref_count(&self, idx: u32) -> u32 {
        match self.entries.get(idx as usize) {
            Some(Entry::Live { ref_cnt, .. }) => *ref_cnt,
            _ => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_ref_count(&mut self, idx: u32, count: u32) {
        match self.entries.get_mut(idx as usize) {
            Some(Entry::Live { ref_cnt, .. }) => *ref_cnt = count,
            _ => panic!("slot {idx} is not live"),
        }
    }

    /// Walks the free list from its head.
    pub(crate) fn free_list(&self) -> FreeList<'_> {
        FreeList {
            entries: &self.entries,
            next: self.free,
        }
    }
}

pub(crate) struct FreeList<'a> {
    entries: &'a [Entry],
    next: u32,
}

impl Iterator for FreeList<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next == NPOS {
            return None;
        }
        let idx = self.next;
        self.next = match self.entries.get(idx as usize) {
            Some(Entry::Free { next }) => *next,
            // A live slot on the free list is corruption; stop the walk and
            // let the caller see the offending index.
            _ => NPOS,
        };
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::hash::BuildHasher;

    type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

    fn hash(text: &str) -> u64 {
        Hasher::default().hash_one(text)
    }

    fn intern(table: &mut EntryTable, text: &str) -> u32 {
        let hash = hash(text);
        match table.find(hash, text) {
            Some(idx) => {
                table.acquire(idx).unwrap();
                idx
            }
            None => table.allocate(hash, text).unwrap(),
        }
    }

    /// Free list only visits free slots, never twice, and together with the
    /// live slots covers the whole table.
    fn check_free_list(table: &EntryTable) {
        let mut seen = HashSet::new();
        for idx in table.free_list() {
            let entry = table.entry(idx).unwrap();
            assert!(entry.is_free(), "live slot {idx} on the free list");
            assert!(seen.insert(idx), "slot {idx} visited twice");
        }
        assert_eq!(seen.len() + table.live(), table.len());
    }

    #[test]
    fn empty_table_has_no_slots() {
        let table = EntryTable::new(64, usize::MAX);
        assert_eq!(table.len(), 0);
        assert_eq!(table.free_head(), NPOS);
        assert_eq!(table.free_list().count(), 0);
    }

    #[test]
    fn grow_threads_free_list_in_reverse_creation_order() {
        let mut table = EntryTable::new(0, usize::MAX);
        table.grow(3).unwrap();
        let len = table.len();
        assert!(len >= 3);
        assert_eq!(
            len,
            (3 * size_of::<Entry>()).next_power_of_two() / size_of::<Entry>()
        );

        let order: Vec<u32> = table.free_list().collect();
        let expected: Vec<u32> = (0..len as u32).rev().collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn grow_keeps_old_free_slots_behind_new_ones() {
        let mut table = EntryTable::new(0, usize::MAX);
        table.grow(1).unwrap();
        let first_len = table.len() as u32;
        let a = table.allocate(hash("a"), "a").unwrap();
        let old_free: Vec<u32> = table.free_list().collect();

        table.grow(first_len as usize * 2).unwrap();
        let len = table.len() as u32;
        assert!(len > first_len);
        let order: Vec<u32> = table.free_list().collect();
        let mut expected: Vec<u32> = (first_len..len).rev().collect();
        expected.extend(old_free);
        assert_eq!(order, expected);
        assert_eq!(table.text(a).as_ref(), "a");
        check_free_list(&table);
    }

    #[test]
    fn allocate_grows_on_demand() {
        let mut table = EntryTable::new(4, usize::MAX);
        let mut handles = Vec::new();
        for i in 0..100 {
            let text = format!("string {i}");
            handles.push((intern(&mut table, &text), text));
        }
        assert_eq!(table.live(), 100);
        for (idx, text) in &handles {
            assert_eq!(table.text(*idx).as_ref(), text);
            assert_eq!(table.ref_count(*idx), 1);
        }
        check_free_list(&table);
    }

    #[test]
    fn find_acquire_release() {
        let mut table = EntryTable::new(8, usize::MAX);
        let a = intern(&mut table, "alpha");
        assert_eq!(intern(&mut table, "alpha"), a);
        assert_eq!(table.ref_count(a), 2);
        assert_eq!(table.find(hash("alpha"), "alpha"), Some(a));
        assert_eq!(table.find(hash("beta"), "beta"), None);

        assert!(!table.release(a));
        assert_eq!(table.ref_count(a), 1);
        assert!(table.release(a));
        assert_eq!(table.ref_count(a), 0);
        assert_eq!(table.free_head(), a);
        assert_eq!(table.find(hash("alpha"), "alpha"), None);

        // The most recently freed slot is reused first.
        let b = intern(&mut table, "beta");
        assert_eq!(b, a);
        assert_eq!(table.text(b).as_ref(), "beta");
        check_free_list(&table);
    }

    #[test]
    fn exact_byte_equality() {
        let mut table = EntryTable::new(8, usize::MAX);
        let lower = intern(&mut table, "abc");
        let upper = intern(&mut table, "ABC");
        let spaced = intern(&mut table, "abc ");
        assert_ne!(lower, upper);
        assert_ne!(lower, spaced);
        assert_eq!(table.live(), 3);
    }

    #[test]
    fn storage_full() {
        let mut table = EntryTable::new(1, 3);
        let a = intern(&mut table, "a");
        let b = intern(&mut table, "b");
        let c = intern(&mut table, "c");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.allocate(hash("d"), "d"),
            Err(RepoError::StorageFull)
        );
        // Still consistent after the failure.
        assert_eq!(table.live(), 3);
        check_free_list(&table);

        assert!(table.release(b));
        assert_eq!(intern(&mut table, "d"), b);
        assert_eq!(table.text(a).as_ref(), "a");
        assert_eq!(table.text(c).as_ref(), "c");
    }

    #[test]
    fn acquire_stops_at_max_ref_count() {
        let mut table = EntryTable::new(8, usize::MAX);
        let a = intern(&mut table, "a");
        table.set_ref_count(a, MAX_REF_COUNT - 1);
        table.acquire(a).unwrap();
        assert_eq!(table.ref_count(a), MAX_REF_COUNT);

        assert_eq!(table.acquire(a), Err(RepoError::RefcountOverflow));
        assert_eq!(table.ref_count(a), MAX_REF_COUNT);
        assert_eq!(table.find(hash("a"), "a"), Some(a));
    }

    #[test]
    #[should_panic(expected = "not live")]
    fn double_release_panics() {
        let mut table = EntryTable::new(8, usize::MAX);
        let a = intern(&mut table, "a");
        table.release(a);
        table.release(a);
    }

    #[test]
    #[should_panic(expected = "not live")]
    fn acquire_of_free_slot_panics() {
        let mut table = EntryTable::new(8, usize::MAX);
        table.grow(8).unwrap();
        let _ = table.acquire(0);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Intern(u8),
        Release(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => any::<u8>().prop_map(Op::Intern),
            2 => any::<usize>().prop_map(Op::Release),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: if cfg!(miri) { 4 } else { 64 },
            .. ProptestConfig::default()
        })]

        #[test]
        fn free_list_integrity(ops in proptest::collection::vec(op(), 0..if cfg!(miri) { 32 } else { 512 })) {
            let mut table = EntryTable::new(2, usize::MAX);
            // Outstanding references, as (slot, text).
            let mut held: Vec<(u32, String)> = Vec::new();

            for op in ops {
                match op {
                    Op::Intern(n) => {
                        let text = format!("s{}", n % 32);
                        let idx = intern(&mut table, &text);
                        held.push((idx, text));
                    }
                    Op::Release(i) if !held.is_empty() => {
                        let (idx, _) = held.swap_remove(i % held.len());
                        table.release(idx);
                    }
                    Op::Release(_) => {}
                }
                check_free_list(&table);
            }

            for (idx, text) in &held {
                prop_assert_eq!(table.text(*idx).as_ref(), text.as_str());
                let expected = held.iter().filter(|(i, _)| i == idx).count() as u32;
                prop_assert_eq!(table.ref_count(*idx), expected);
            }
        }
    }
}

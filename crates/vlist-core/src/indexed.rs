// SPDX-License-Identifier: Apache-2.0
//! Ordered record sequence with an identity index.
//!
//! The sequence and the id index are kept in lockstep by every mutation.
//! Lookup by identity is O(1) amortized; positional operations behave like
//! the backing vector. No locking — a collection has a single logical owner.
use core::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::error::ListError;
use crate::ident::RecordId;
use crate::record::Record;

/// Ordered sequence of records plus an id → position index.
#[derive(Clone, Debug)]
pub struct IndexedCollection<R: Record> {
    records: Vec<R>,
    index: FxHashMap<RecordId, usize>,
}

impl<R: Record> Default for IndexedCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> IndexedCollection<R> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Number of records held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the collection holds no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends `record`, failing when its identity is already present.
    pub fn add(&mut self, record: R) -> Result<(), ListError> {
        let id = record.identity();
        if self.index.contains_key(&id) {
            return Err(ListError::DuplicateIdentity(id));
        }
        self.index.insert(id, self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Removes and returns the record with `id`, keeping sequence and
    /// index consistent.
    pub fn remove_by_id(&mut self, id: RecordId) -> Option<R> {
        let pos = self.index.remove(&id)?;
        let record = self.records.remove(pos);
        self.reindex_from(pos);
        Some(record)
    }

    /// Removes and returns the record at `pos`, when in bounds.
    pub fn remove_at(&mut self, pos: usize) -> Option<R> {
        if pos >= self.records.len() {
            return None;
        }
        let record = self.records.remove(pos);
        self.index.remove(&record.identity());
        self.reindex_from(pos);
        Some(record)
    }

    /// Replaces the record sharing `record`'s identity in place, keeping
    /// its position. Returns the previous record, or `None` (and drops the
    /// argument) when the identity is absent.
    pub fn replace(&mut self, record: R) -> Option<R> {
        let pos = *self.index.get(&record.identity())?;
        Some(core::mem::replace(&mut self.records[pos], record))
    }

    /// Returns the record with `id`, if present.
    #[inline]
    pub fn get_by_id(&self, id: RecordId) -> Option<&R> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    /// Mutable access to the record with `id`, if present.
    #[inline]
    pub fn get_by_id_mut(&mut self, id: RecordId) -> Option<&mut R> {
        let pos = *self.index.get(&id)?;
        Some(&mut self.records[pos])
    }

    /// Returns the record at `pos`, if in bounds.
    #[inline]
    pub fn get_at(&self, pos: usize) -> Option<&R> {
        self.records.get(pos)
    }

    /// Position of the record with `id`, if present.
    #[inline]
    #[must_use]
    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns `true` when a record with `id` is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Bidirectional iteration in sequence order.
    pub fn iter(&self) -> core::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Stable sort by `cmp`; the identity index is rebuilt afterwards.
    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        self.records.sort_by(cmp);
        self.index.clear();
        for (pos, record) in self.records.iter().enumerate() {
            self.index.insert(record.identity(), pos);
        }
    }

    fn reindex_from(&mut self, pos: usize) {
        for (offset, record) in self.records[pos..].iter().enumerate() {
            self.index.insert(record.identity(), pos + offset);
        }
    }
}

impl<'a, R: Record> IntoIterator for &'a IndexedCollection<R> {
    type Item = &'a R;
    type IntoIter = core::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

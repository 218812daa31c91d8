// SPDX-License-Identifier: Apache-2.0
//! Versioned collection: ordered records plus a monotonic collection
//! version, rewind, and rebase.
//!
//! This is the shared primitive under the base, edit, update, and
//! difference kinds. It is a pure data structure: mutating operations
//! return a [`ChangeNote`] and the owning wrapper decides where (and
//! whether) to publish it. Deletion-flagged records — pending deletes
//! awaiting a phased persistence commit — stay in the sequence but are
//! excluded from the visible views.
use core::cmp::Ordering;

use crate::error::ListError;
use crate::ident::{RecordId, Version};
use crate::indexed::IndexedCollection;
use crate::notify::{ChangeKind, ChangeNote};
use crate::record::Record;

/// Ordered, identity-indexed records with a collection version.
#[derive(Clone, Debug)]
pub struct VersionedCollection<R: Record> {
    items: IndexedCollection<R>,
    version: Version,
}

impl<R: Record> Default for VersionedCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> VersionedCollection<R> {
    /// Creates an empty collection at version zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: IndexedCollection::new(),
            version: Version::ZERO,
        }
    }

    /// Current collection version: the highest version reachable among the
    /// records' histories. Zero means clean.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Recomputes the version from record histories. Used after phased
    /// update commits, which collapse or remove records.
    pub(crate) fn recompute_version(&mut self) {
        self.version = self
            .items
            .iter()
            .map(Record::version)
            .max()
            .unwrap_or(Version::ZERO);
    }

    /// Number of visible (non-deletion-flagged) records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.iter().filter(|r| !r.is_deleted()).count()
    }

    /// Returns `true` when no visible records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records held, counting deletion-flagged ones.
    #[inline]
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.items.len()
    }

    /// Visible records in sequence order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &R> {
        self.items.iter().filter(|r| !r.is_deleted())
    }

    /// Every record in sequence order, deletion-flagged ones included.
    pub fn iter_all(&self) -> impl DoubleEndedIterator<Item = &R> {
        self.items.iter()
    }

    /// Returns the visible record with `id`.
    pub fn get(&self, id: RecordId) -> Option<&R> {
        self.items.get_by_id(id).filter(|r| !r.is_deleted())
    }

    /// Returns the record with `id` regardless of its deletion flag.
    pub fn get_any(&self, id: RecordId) -> Option<&R> {
        self.items.get_by_id(id)
    }

    pub(crate) fn get_mut(&mut self, id: RecordId) -> Option<&mut R> {
        self.items.get_by_id_mut(id)
    }

    /// Appends `record`, failing with [`ListError::DuplicateIdentity`] when
    /// its identity is already present.
    pub fn add(&mut self, record: R) -> Result<(), ListError> {
        self.items.add(record)
    }

    /// Removes and returns the record with `id`.
    pub fn remove_by_id(&mut self, id: RecordId) -> Option<R> {
        self.items.remove_by_id(id)
    }

    pub(crate) fn replace(&mut self, record: R) -> Option<R> {
        self.items.replace(record)
    }

    /// Removes every record and resets the version to zero.
    pub fn clear(&mut self) {
        self.items.clear();
        self.version = Version::ZERO;
    }

    /// Stable sort of the sequence by `cmp`.
    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        self.items.sort_by(cmp);
    }

    /// Clears and bulk-copies every record (histories included) from
    /// `source`, adopting its version.
    pub fn reset_from(&mut self, source: &Self) -> ChangeNote<R> {
        self.items.clear();
        let mut note = ChangeNote::new(ChangeKind::Refresh);
        for record in source.iter_all() {
            // Identities in the source are unique already.
            if self.items.add(record.clone()).is_ok() {
                note.added.push(record.clone());
            }
        }
        self.version = source.version;
        note
    }

    /// Discards record changes introduced after `target`.
    ///
    /// Records whose latest snapshot is newer than `target` either did not
    /// exist at `target` (origin newer too — removed, reported deleted) or
    /// pop snapshots until their top is at or below `target` (reported
    /// changed, deletion flag restored from the surviving snapshot). The
    /// collection version becomes `target`. Calling twice in a row is a
    /// no-op the second time.
    pub fn rewind_to(&mut self, target: Version) -> Result<ChangeNote<R>, ListError> {
        if target > self.version {
            return Err(ListError::InvalidVersion {
                target,
                version: self.version,
            });
        }
        let mut note = ChangeNote::new(ChangeKind::Rewind);
        let stale: Vec<RecordId> = self
            .items
            .iter()
            .filter(|r| r.version() > target)
            .map(Record::identity)
            .collect();
        for id in stale {
            let Some(origin) = self.items.get_by_id(id).map(Record::origin_version) else {
                continue;
            };
            if origin > target {
                self.items.remove_by_id(id);
                note.deleted.push(id);
            } else if let Some(record) = self.items.get_by_id_mut(id) {
                while record.version() > target {
                    record.pop_history();
                }
                note.changed.push(record.clone());
            }
        }
        tracing::debug!(
            from = %self.version,
            to = %target,
            changed = note.changed.len(),
            deleted = note.deleted.len(),
            "rewind"
        );
        self.version = target;
        Ok(note)
    }

    /// Re-anchors this clean collection against `baseline`, producing a
    /// version-one delta.
    ///
    /// Local records found in the baseline with differing values become
    /// version-one changes over the baseline's values; local records the
    /// baseline lacks become "added"; baseline records missing locally are
    /// inserted as "deleted". Fails with [`ListError::IllegalRebaseState`]
    /// unless this collection is at version zero — a dirty rebase would
    /// conflate pre-existing edits with baseline differences.
    pub fn rebase(&mut self, baseline: &Self) -> Result<ChangeNote<R>, ListError> {
        if !self.version.is_zero() {
            return Err(ListError::IllegalRebaseState {
                version: self.version,
            });
        }
        let one = Version::ZERO.next();
        let mut note = ChangeNote::new(ChangeKind::Rebase);

        let local_ids: Vec<RecordId> = self.items.iter().map(Record::identity).collect();
        for id in local_ids {
            let base = baseline.get(id);
            let Some(record) = self.items.get_by_id_mut(id) else {
                continue;
            };
            match base {
                Some(base) if record.same_values(base) => {}
                Some(base) => {
                    record.rebase_origin(base);
                    note.changed.push(record.clone());
                }
                None => {
                    record.set_version(one);
                    note.added.push(record.clone());
                }
            }
        }
        for base in baseline.iter() {
            let id = base.identity();
            if self.items.contains(id) {
                continue;
            }
            let mut tombstone = base.fresh_copy();
            tombstone.push_history(one);
            tombstone.set_deleted(true);
            self.items.add(tombstone)?;
            note.deleted.push(id);
        }
        if !note.is_empty() {
            self.version = one;
        }
        tracing::debug!(
            added = note.added.len(),
            changed = note.changed.len(),
            deleted = note.deleted.len(),
            "rebase"
        );
        Ok(note)
    }
}

impl<'a, R: Record> IntoIterator for &'a VersionedCollection<R> {
    type Item = &'a R;
    type IntoIter = Box<dyn DoubleEndedIterator<Item = &'a R> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::{classify, RecordClass, Versioned};

    type Rec = Versioned<String>;

    fn rec(id: u64, s: &str) -> Rec {
        Versioned::new(RecordId(id), s.to_owned())
    }

    fn collection(items: &[(u64, &str)]) -> VersionedCollection<Rec> {
        let mut c = VersionedCollection::new();
        for &(id, s) in items {
            c.add(rec(id, s)).ok();
        }
        c
    }

    #[test]
    fn rewind_target_above_version_is_invalid() {
        let mut c = collection(&[(1, "a")]);
        let err = c.rewind_to(Version(1)).unwrap_err();
        assert_eq!(
            err,
            ListError::InvalidVersion {
                target: Version(1),
                version: Version::ZERO,
            }
        );
    }

    #[test]
    fn rewind_removes_unborn_records_and_pops_changed_ones() {
        let mut c = collection(&[(1, "a")]);
        // record 2 is born at v1; record 1 changes at v1
        let mut born = rec(2, "b");
        born.set_version(Version(1));
        c.add(born).ok();
        {
            let r = c.get_mut(RecordId(1)).unwrap();
            r.push_history(Version(1));
            r.replace_values(&String::from("aa"));
        }
        c.set_version(Version(1));

        let note = c.rewind_to(Version::ZERO).unwrap();
        assert_eq!(note.deleted, vec![RecordId(2)]);
        assert_eq!(note.changed.len(), 1);
        assert_eq!(c.get(RecordId(1)).unwrap().values(), "a");
        assert_eq!(c.version(), Version::ZERO);

        // second rewind is a no-op
        let note = c.rewind_to(Version::ZERO).unwrap();
        assert!(note.is_empty());
    }

    #[test]
    fn rebase_requires_a_clean_collection() {
        let mut c = collection(&[(1, "a")]);
        c.set_version(Version(2));
        let err = c.rebase(&collection(&[(1, "a")])).unwrap_err();
        assert_eq!(err, ListError::IllegalRebaseState { version: Version(2) });
    }

    #[test]
    fn rebase_produces_a_version_one_delta() {
        // local kept record 1 (edited), record 3 (unknown to baseline);
        // baseline kept record 1 (new values) and record 2 (missing locally).
        let mut local = collection(&[(1, "a-local"), (3, "c")]);
        let baseline = collection(&[(1, "a-base"), (2, "b")]);

        let note = local.rebase(&baseline).unwrap();
        assert_eq!(local.version(), Version(1));
        assert_eq!(note.changed.len(), 1);
        assert_eq!(note.added.len(), 1);
        assert_eq!(note.deleted, vec![RecordId(2)]);

        let changed = local.get(RecordId(1)).unwrap();
        assert_eq!(classify(changed), RecordClass::Changed);
        assert_eq!(changed.values(), "a-local");
        assert_eq!(changed.value_set().history()[0].values(), "a-base");

        assert_eq!(classify(local.get(RecordId(3)).unwrap()), RecordClass::New);
        let tombstone = local.get_any(RecordId(2)).unwrap();
        assert_eq!(classify(tombstone), RecordClass::Deleted);
    }

    #[test]
    fn rebase_with_identical_content_stays_clean() {
        let mut local = collection(&[(1, "a"), (2, "b")]);
        let baseline = collection(&[(1, "a"), (2, "b")]);
        let note = local.rebase(&baseline).unwrap();
        assert!(note.is_empty());
        assert_eq!(local.version(), Version::ZERO);
    }
}

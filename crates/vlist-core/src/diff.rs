// SPDX-License-Identifier: Apache-2.0
//! One-shot difference report between two base collections.
use crate::record::{classify, Record, RecordClass};
use crate::versioned::VersionedCollection;

/// Entry counts of a difference report.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DiffCounts {
    /// Records present only on the new side.
    pub added: usize,
    /// Records present on both sides with differing values.
    pub changed: usize,
    /// Records present only on the old side.
    pub deleted: usize,
}

/// Computed diff between a "new" and an "old" collection.
///
/// Entries are derived records: "changed" carries the new values with the
/// old values on its history stack, "added" is a version-one record,
/// "deleted" is a deletion-flagged record holding the old values. A report
/// has no mutation API and never takes ownership of source records — it is
/// typically rendered or exported, then discarded.
#[derive(Clone, Debug)]
pub struct DifferenceCollection<R: Record> {
    entries: Vec<R>,
}

impl<R: Record> DifferenceCollection<R> {
    pub(crate) fn compute(
        new_side: &VersionedCollection<R>,
        old_side: &VersionedCollection<R>,
    ) -> Self {
        let one = crate::ident::Version::ZERO.next();
        let mut entries = Vec::new();
        for record in new_side.iter() {
            match old_side.get(record.identity()) {
                Some(old) if record.same_values(old) => {}
                Some(old) => {
                    let mut entry = record.fresh_copy();
                    entry.rebase_origin(old);
                    entries.push(entry);
                }
                None => {
                    let mut entry = record.fresh_copy();
                    entry.set_version(one);
                    entries.push(entry);
                }
            }
        }
        for old in old_side.iter() {
            if new_side.get(old.identity()).is_some() {
                continue;
            }
            let mut entry = old.fresh_copy();
            entry.push_history(one);
            entry.set_deleted(true);
            entries.push(entry);
        }
        Self { entries }
    }

    /// Number of entries in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the two sides were identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in new-side sequence order (added and changed first, then
    /// deleted in old-side order).
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.entries.iter()
    }

    /// Classification of one entry.
    #[must_use]
    pub fn class_of(entry: &R) -> RecordClass {
        classify(entry)
    }

    /// Tallies entries by classification.
    #[must_use]
    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts::default();
        for entry in &self.entries {
            match classify(entry) {
                RecordClass::New => counts.added += 1,
                RecordClass::Changed => counts.changed += 1,
                RecordClass::Deleted | RecordClass::DeletedNew => counts.deleted += 1,
                RecordClass::Clean => {}
            }
        }
        counts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ident::RecordId;
    use crate::record::Versioned;

    type Rec = Versioned<String>;

    fn collection(items: &[(u64, &str)]) -> VersionedCollection<Rec> {
        let mut c = VersionedCollection::new();
        for &(id, s) in items {
            c.add(Versioned::new(RecordId(id), s.to_owned())).ok();
        }
        c
    }

    #[test]
    fn identical_sides_diff_empty() {
        let a = collection(&[(1, "a"), (2, "b")]);
        let b = collection(&[(1, "a"), (2, "b")]);
        let diff = DifferenceCollection::compute(&a, &b);
        assert!(diff.is_empty());
        assert_eq!(diff.counts(), DiffCounts::default());
    }

    #[test]
    fn one_of_each_kind() {
        let new_side = collection(&[(1, "a-new"), (3, "c")]);
        let old_side = collection(&[(1, "a"), (2, "b")]);
        let diff = DifferenceCollection::compute(&new_side, &old_side);
        assert_eq!(
            diff.counts(),
            DiffCounts {
                added: 1,
                changed: 1,
                deleted: 1,
            }
        );
        // changed entry: new values current, old values in history
        let changed = diff
            .iter()
            .find(|e| DifferenceCollection::class_of(*e) == RecordClass::Changed)
            .unwrap();
        assert_eq!(changed.identity(), RecordId(1));
        assert_eq!(changed.values(), "a-new");
        assert_eq!(changed.value_set().history()[0].values(), "a");
    }

    #[test]
    fn everything_deleted_against_an_empty_new_side() {
        let new_side = collection(&[]);
        let old_side = collection(&[(1, "a"), (2, "b")]);
        let diff = DifferenceCollection::compute(&new_side, &old_side);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.counts().deleted, 2);
    }
}

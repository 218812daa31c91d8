// SPDX-License-Identifier: Apache-2.0
//! Update collection: dirty source records mirrored for phased persistence.
//!
//! A persistence layer consumes committed edits in dependency-safe order:
//! inserts before updates before deletes, in caller-controlled batches so a
//! host event loop stays responsive. The mirror holds independent copies,
//! never aliases; committing a record applies it to the source and removes
//! it from the mirror.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::base::{BaseCollection, BaseShared};
use crate::error::ListError;
use crate::ident::RecordId;
use crate::notify::{ChangeKind, ChangeNote};
use crate::record::{classify, Record, RecordClass};
use crate::versioned::VersionedCollection;

/// Phase of a phased update commit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommitPhase {
    /// Flush records created since the last persistence run.
    Insert,
    /// Flush value changes to existing records.
    Update,
    /// Flush pending deletions; the source records are physically removed.
    Delete,
}

impl CommitPhase {
    /// Record classification this phase is eligible for.
    #[must_use]
    pub fn matches(self, class: RecordClass) -> bool {
        matches!(
            (self, class),
            (Self::Insert, RecordClass::New)
                | (Self::Update, RecordClass::Changed)
                | (Self::Delete, RecordClass::Deleted)
        )
    }
}

struct UpdateShared<R: Record> {
    list: RefCell<VersionedCollection<R>>,
    source: Weak<BaseShared<R>>,
}

/// Mirror of a source's dirty records, grouped by commit intent.
/// Clones share the same mirror state.
pub struct UpdateCollection<R: Record> {
    shared: Rc<UpdateShared<R>>,
}

impl<R: Record> Clone for UpdateCollection<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<R: Record> core::fmt::Debug for UpdateCollection<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdateCollection")
            .field("pending", &self.pending())
            .finish()
    }
}

impl<R: Record> UpdateCollection<R> {
    pub(crate) fn open(source: &BaseCollection<R>) -> Self {
        let update = Self {
            shared: Rc::new(UpdateShared {
                list: RefCell::new(VersionedCollection::new()),
                source: Rc::downgrade(source.shared()),
            }),
        };
        update.rederive();
        update
    }

    /// Rebuilds the mirror from the source's current dirty records.
    pub fn rederive(&self) {
        let Some(source) = self.shared.source.upgrade() else {
            return;
        };
        let source_list = source.list.borrow();
        let mut list = self.shared.list.borrow_mut();
        list.clear();
        for record in source_list.iter_all() {
            match classify(record) {
                RecordClass::Clean | RecordClass::DeletedNew => {}
                RecordClass::New | RecordClass::Changed | RecordClass::Deleted => {
                    // Source identities are unique by construction.
                    let _ = list.add(record.clone());
                }
            }
        }
        list.set_version(source_list.version());
    }

    /// Number of records still awaiting commit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.list.borrow().total_len()
    }

    /// Number of pending records eligible for `phase`.
    #[must_use]
    pub fn pending_for(&self, phase: CommitPhase) -> usize {
        self.shared
            .list
            .borrow()
            .iter_all()
            .filter(|r| phase.matches(classify(*r)))
            .count()
    }

    /// Commits up to `budget` records whose classification matches `phase`
    /// and returns the unused remainder.
    ///
    /// Inserts and updates make the matching source record adopt the
    /// mirrored values and collapse clean; deletes physically remove the
    /// source record. Every applied record leaves the mirror. One update
    /// note is published against the source per call so collaborating edit
    /// collections observe the committed state. An exhausted budget is not
    /// an error — the remainder stays pending for the next call.
    pub fn commit_items(&self, phase: CommitPhase, budget: usize) -> Result<usize, ListError> {
        if budget == 0 {
            return Ok(0);
        }
        let source = self.shared.source.upgrade().ok_or(ListError::SourceDetached)?;
        let note = {
            let mut list = self.shared.list.borrow_mut();
            let mut source_list = source.list.borrow_mut();

            let eligible: Vec<RecordId> = list
                .iter_all()
                .filter(|r| phase.matches(classify(*r)))
                .take(budget)
                .map(Record::identity)
                .collect();

            let mut note = ChangeNote::new(ChangeKind::Update);
            for id in eligible {
                let Some(mirror) = list.remove_by_id(id) else {
                    continue;
                };
                match phase {
                    CommitPhase::Insert | CommitPhase::Update => {
                        let theirs = source_list
                            .get_mut(id)
                            .ok_or(ListError::MissingRecord(id))?;
                        theirs.adopt_values(&mirror);
                        theirs.collapse();
                        if phase == CommitPhase::Insert {
                            note.added.push(theirs.clone());
                        } else {
                            note.changed.push(theirs.clone());
                        }
                    }
                    CommitPhase::Delete => {
                        source_list
                            .remove_by_id(id)
                            .ok_or(ListError::MissingRecord(id))?;
                        note.deleted.push(id);
                    }
                }
            }
            source_list.recompute_version();
            note
        };
        let applied = note.added.len() + note.changed.len() + note.deleted.len();
        tracing::debug!(?phase, applied, "update commit batch");
        source.registrar.publish(&note);
        Ok(budget - applied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ident::Version;
    use crate::record::Versioned;

    type Rec = Versioned<String>;

    fn rec(id: u64, s: &str) -> Rec {
        Versioned::new(RecordId(id), s.to_owned())
    }

    /// Base with one committed edit session: record 1 changed, record 3
    /// added, record 2 flagged deleted.
    fn dirty_base() -> BaseCollection<Rec> {
        let base =
            BaseCollection::from_records([rec(1, "a"), rec(2, "b")]).unwrap();
        let edit = base.derive_edit_list();
        edit.update(&rec(1, "aa")).unwrap();
        edit.insert(rec(3, "c")).unwrap();
        edit.remove(RecordId(2)).unwrap();
        edit.commit_items().unwrap();
        base
    }

    #[test]
    fn mirror_groups_by_intent() {
        let base = dirty_base();
        let updates = base.derive_updates();
        assert_eq!(updates.pending(), 3);
        assert_eq!(updates.pending_for(CommitPhase::Insert), 1);
        assert_eq!(updates.pending_for(CommitPhase::Update), 1);
        assert_eq!(updates.pending_for(CommitPhase::Delete), 1);
    }

    #[test]
    fn budget_bounds_work_and_remainder_carries() {
        let base = dirty_base();
        let updates = base.derive_updates();
        // budget larger than eligible work: remainder comes back
        let remaining = updates.commit_items(CommitPhase::Insert, 5).unwrap();
        assert_eq!(remaining, 4);
        assert_eq!(updates.pending(), 2);
        // zero budget is a no-op
        assert_eq!(updates.commit_items(CommitPhase::Update, 0).unwrap(), 0);
        assert_eq!(updates.pending(), 2);
    }

    #[test]
    fn full_drain_leaves_the_source_clean() {
        let base = dirty_base();
        assert_eq!(base.version(), Version(1));
        let updates = base.derive_updates();
        updates.commit_items(CommitPhase::Insert, 10).unwrap();
        updates.commit_items(CommitPhase::Update, 10).unwrap();
        updates.commit_items(CommitPhase::Delete, 10).unwrap();
        assert_eq!(updates.pending(), 0);
        assert_eq!(base.version(), Version::ZERO);
        assert_eq!(base.len(), 2);
        assert!(base.get(RecordId(2)).is_none());
        assert_eq!(base.get(RecordId(1)).unwrap().values(), "aa");
    }
}

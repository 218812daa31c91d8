// SPDX-License-Identifier: Apache-2.0
//! Edit collection: a working copy opened against a base source.
//!
//! The working set starts as clean copies of the source records. Edits are
//! speculative: they tag records with an in-progress edit version and can be
//! cancelled (rewound) or committed back into the source atomically within
//! one call. The edit collection observes its source so that an external
//! rewind or a phased update commit is reflected in the working copy —
//! the source wins over local edits on the affected records.
use core::cmp::Ordering;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::base::{BaseCollection, BaseShared};
use crate::error::ListError;
use crate::ident::{RecordId, Version};
use crate::notify::{ChangeKind, ChangeNote, CollectionObserver, ObserverId, Registrar};
use crate::record::{classify, Record, RecordClass};
use crate::versioned::VersionedCollection;

pub(crate) struct EditShared<R: Record> {
    list: RefCell<VersionedCollection<R>>,
    registrar: Registrar<R>,
    source: Weak<BaseShared<R>>,
    /// Edit version in progress; `None` outside an edit session.
    edit_version: Cell<Option<Version>>,
    /// Collection version when the current edit session started.
    pre_edit: Cell<Version>,
}

impl<R: Record> EditShared<R> {
    /// Adopts a source-side transition into the working copy and relays it
    /// to local subscribers.
    fn adopt_source_note(&self, note: &ChangeNote<R>) {
        let mut local = ChangeNote::new(note.kind);
        {
            let mut list = self.list.borrow_mut();
            for id in &note.deleted {
                if list.remove_by_id(*id).is_some() {
                    local.deleted.push(*id);
                }
            }
            if note.kind == ChangeKind::Rewind {
                // Source wins: any local edit on a rewound record is
                // discarded in favour of the source's restored state.
                for record in &note.changed {
                    let copy = record.fresh_copy();
                    if list.replace(copy.clone()).is_some() {
                        local.changed.push(copy);
                    } else if list.add(copy.clone()).is_ok() {
                        // A committed delete the rewind restored: the record
                        // left the working copy and now reappears.
                        local.added.push(copy);
                    }
                }
            }
            // Adopted records arrive clean; the collection version must not
            // outlive the history entries that justified it.
            list.recompute_version();
        }
        self.registrar.publish(&local);
    }
}

impl<R: Record> CollectionObserver<R> for EditShared<R> {
    fn collection_changed(&self, note: &ChangeNote<R>) {
        match note.kind {
            ChangeKind::Rewind | ChangeKind::Update => self.adopt_source_note(note),
            // Commit notes originate from this collection's own commit (or
            // a sibling's); refresh/rebase of the source require an
            // explicit refresh of the working copy.
            ChangeKind::Refresh | ChangeKind::Rebase | ChangeKind::Commit => {}
        }
    }
}

/// Working copy of a base collection for an interactive edit session.
/// Clones share the same working state and source subscription.
pub struct EditCollection<R: Record> {
    shared: Rc<EditShared<R>>,
    source_token: ObserverId,
}

impl<R: Record> Clone for EditCollection<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            source_token: self.source_token,
        }
    }
}

impl<R: Record> core::fmt::Debug for EditCollection<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EditCollection")
            .field("version", &self.version())
            .field("len", &self.len())
            .field("editing", &self.is_editing())
            .finish()
    }
}

impl<R: Record> EditCollection<R> {
    pub(crate) fn open(source: &BaseCollection<R>) -> Self {
        let shared = Rc::new(EditShared {
            list: RefCell::new(VersionedCollection::new()),
            registrar: Registrar::new(),
            source: Rc::downgrade(source.shared()),
            edit_version: Cell::new(None),
            pre_edit: Cell::new(Version::ZERO),
        });
        let weak = Rc::downgrade(&shared) as Weak<dyn CollectionObserver<R>>;
        let source_token = source.subscribe(weak);
        let edit = Self {
            shared,
            source_token,
        };
        edit.refresh_inner();
        edit
    }

    fn refresh_inner(&self) {
        let Some(source) = self.shared.source.upgrade() else {
            return;
        };
        let note = {
            let source_list = source.list.borrow();
            let mut list = self.shared.list.borrow_mut();
            list.clear();
            let mut note = ChangeNote::new(ChangeKind::Refresh);
            for record in source_list.iter() {
                let copy = record.fresh_copy();
                // Source identities are unique by construction.
                if list.add(copy.clone()).is_ok() {
                    note.added.push(copy);
                }
            }
            note
        };
        self.shared.edit_version.set(None);
        self.shared.pre_edit.set(Version::ZERO);
        self.shared.registrar.publish(&note);
    }

    /// Clears the working copy and repopulates it with clean copies of
    /// every visible source record. Any pending edits are discarded.
    pub fn refresh(&self) {
        self.refresh_inner();
    }

    /// Working-copy version. Zero means no pending edits.
    #[must_use]
    pub fn version(&self) -> Version {
        self.shared.list.borrow().version()
    }

    /// Number of visible working records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.list.borrow().len()
    }

    /// Returns `true` when no visible working records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.list.borrow().is_empty()
    }

    /// Clone of the visible working record with `id`.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<R> {
        self.shared.list.borrow().get(id).cloned()
    }

    /// Clones of all visible working records in sequence order.
    #[must_use]
    pub fn records(&self) -> Vec<R> {
        self.shared.list.borrow().iter().cloned().collect()
    }

    /// Stable sort of the working sequence by `cmp`.
    pub fn sort_by<F>(&self, cmp: F)
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        self.shared.list.borrow_mut().sort_by(cmp);
    }

    /// Attaches an observer of the working copy.
    pub fn subscribe(&self, observer: Weak<dyn CollectionObserver<R>>) -> ObserverId {
        self.shared.registrar.subscribe(observer)
    }

    /// Detaches the observer registered under `id`.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.shared.registrar.unsubscribe(id);
    }

    /// Returns `true` while an edit version is in progress.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.shared.edit_version.get().is_some()
    }

    /// Starts an edit version explicitly. Idempotent while editing.
    ///
    /// Edits made without an explicit start implicitly open
    /// `version() + 1`.
    pub fn start_edit_version(&self, version: Version) {
        if self.shared.edit_version.get().is_none() {
            self.shared.pre_edit.set(self.shared.list.borrow().version());
            self.shared.edit_version.set(Some(version));
        }
    }

    fn active_edit_version(&self) -> Version {
        if let Some(version) = self.shared.edit_version.get() {
            return version;
        }
        let current = self.shared.list.borrow().version();
        self.shared.pre_edit.set(current);
        let version = current.next();
        self.shared.edit_version.set(Some(version));
        version
    }

    /// Discards every edit made in the current edit version by rewinding
    /// the working copy to its pre-edit state.
    pub fn cancel_edit_version(&self) -> Result<(), ListError> {
        if self.shared.edit_version.get().is_none() {
            return Ok(());
        }
        let target = self.shared.pre_edit.get();
        let note = self.shared.list.borrow_mut().rewind_to(target)?;
        self.shared.edit_version.set(None);
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Accepts the current edit version's changes into the working copy's
    /// own version and closes the session marker. The working copy stays
    /// dirty until [`EditCollection::commit_items`].
    pub fn commit_edit_version(&self) {
        self.shared.edit_version.set(None);
    }

    /// Inserts a brand-new record into the working copy as an "added"
    /// derived record (single snapshot at the edit version).
    pub fn insert(&self, record: R) -> Result<(), ListError> {
        let edit_version = self.active_edit_version();
        let mut added = record.fresh_copy();
        added.set_version(edit_version);
        let note = {
            let mut list = self.shared.list.borrow_mut();
            list.add(added.clone())?;
            list.set_version(edit_version);
            let mut note = ChangeNote::new(ChangeKind::Update);
            note.added.push(added);
            note
        };
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Replaces the working values of the record sharing `record`'s
    /// identity. The prior state is snapshotted onto the record's history
    /// the first time it is touched within the edit version.
    pub fn update(&self, record: &R) -> Result<(), ListError> {
        let edit_version = self.active_edit_version();
        let id = record.identity();
        let note = {
            let mut list = self.shared.list.borrow_mut();
            let Some(target) = list.get_mut(id).filter(|r| !r.is_deleted()) else {
                return Err(ListError::MissingRecord(id));
            };
            match classify(target) {
                RecordClass::New => target.set_version(edit_version),
                _ if target.version() < edit_version => target.push_history(edit_version),
                _ => {}
            }
            target.adopt_values(record);
            let mut note = ChangeNote::new(ChangeKind::Update);
            note.changed.push(target.clone());
            list.set_version(edit_version);
            note
        };
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Flags the working record with `id` as deleted. A record created
    /// within this session becomes deleted-new and will never reach the
    /// source; otherwise the pre-deletion state is kept on the history
    /// stack for cancel/rewind.
    pub fn remove(&self, id: RecordId) -> Result<(), ListError> {
        let edit_version = self.active_edit_version();
        let note = {
            let mut list = self.shared.list.borrow_mut();
            let Some(target) = list.get_mut(id).filter(|r| !r.is_deleted()) else {
                return Err(ListError::MissingRecord(id));
            };
            if target.origin_version().is_zero() && target.version() < edit_version {
                target.push_history(edit_version);
            }
            target.set_deleted(true);
            list.set_version(edit_version);
            let mut note = ChangeNote::new(ChangeKind::Update);
            note.deleted.push(id);
            note
        };
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Folds every pending edit back into the source.
    ///
    /// Working records are classified: new records join the source tagged
    /// source-version-plus-one; changed records advance the matching source
    /// record's history and replace its values; deleted records flag the
    /// matching source record (physical removal happens in the update
    /// collection's delete phase); deleted-new records drop silently; clean
    /// records are untouched. Afterwards the working copy collapses clean,
    /// the source version bumps by exactly one when anything changed, and
    /// both sides publish commit notes. A no-op commit publishes nothing.
    pub fn commit_items(&self) -> Result<(), ListError> {
        let source = self.shared.source.upgrade().ok_or(ListError::SourceDetached)?;
        let (source_note, local_note) = {
            let mut list = self.shared.list.borrow_mut();
            let mut source_list = source.list.borrow_mut();
            let next = source_list.version().next();

            let mut source_note = ChangeNote::new(ChangeKind::Commit);
            let mut local_note = ChangeNote::new(ChangeKind::Commit);
            let mut drop_ids: Vec<RecordId> = Vec::new();

            let ids: Vec<RecordId> = list.iter_all().map(Record::identity).collect();
            for id in ids {
                let Some(working) = list.get_mut(id) else {
                    continue;
                };
                match classify(working) {
                    RecordClass::Clean => {}
                    RecordClass::DeletedNew => drop_ids.push(id),
                    RecordClass::New => {
                        let mut added = working.fresh_copy();
                        added.set_version(next);
                        source_list.add(added.clone())?;
                        working.collapse();
                        source_note.added.push(added);
                        local_note.changed.push(working.clone());
                    }
                    RecordClass::Changed => {
                        let mutated = working.clone();
                        working.collapse();
                        let theirs = source_list
                            .get_mut(id)
                            .ok_or(ListError::MissingRecord(id))?;
                        theirs.push_history(next);
                        theirs.adopt_values(&mutated);
                        source_note.changed.push(theirs.clone());
                        local_note.changed.push(working.clone());
                    }
                    RecordClass::Deleted => {
                        drop_ids.push(id);
                        let theirs = source_list
                            .get_mut(id)
                            .ok_or(ListError::MissingRecord(id))?;
                        theirs.push_history(next);
                        theirs.set_deleted(true);
                        source_note.deleted.push(id);
                    }
                }
            }
            for id in drop_ids {
                list.remove_by_id(id);
                local_note.deleted.push(id);
            }
            if !source_note.is_empty() {
                source_list.set_version(next);
            }
            list.set_version(Version::ZERO);
            (source_note, local_note)
        };
        self.shared.edit_version.set(None);
        tracing::debug!(
            added = source_note.added.len(),
            changed = source_note.changed.len(),
            deleted = source_note.deleted.len(),
            "edit commit"
        );
        source.registrar.publish(&source_note);
        self.shared.registrar.publish(&local_note);
        Ok(())
    }

    /// Detaches the working copy from its source notifications.
    pub fn detach(&self) {
        if let Some(source) = self.shared.source.upgrade() {
            source.registrar.unsubscribe(self.source_token);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::base::BaseCollection;
    use crate::record::Versioned;

    type Rec = Versioned<String>;

    fn rec(id: u64, s: &str) -> Rec {
        Versioned::new(RecordId(id), s.to_owned())
    }

    fn base(items: &[(u64, &str)]) -> BaseCollection<Rec> {
        BaseCollection::from_records(items.iter().map(|&(id, s)| rec(id, s))).unwrap()
    }

    #[test]
    fn refresh_seeds_clean_copies() {
        let source = base(&[(1, "a"), (2, "b")]);
        let edit = source.derive_edit_list();
        assert_eq!(edit.len(), 2);
        assert_eq!(edit.version(), Version::ZERO);
        assert_eq!(classify(&edit.get(RecordId(1)).unwrap()), RecordClass::Clean);
    }

    #[test]
    fn cancel_discards_pending_edits() {
        let source = base(&[(1, "a")]);
        let edit = source.derive_edit_list();
        edit.update(&rec(1, "aa")).unwrap();
        edit.insert(rec(2, "b")).unwrap();
        assert_eq!(edit.version(), Version(1));

        edit.cancel_edit_version().unwrap();
        assert_eq!(edit.version(), Version::ZERO);
        assert_eq!(edit.get(RecordId(1)).unwrap().values(), "a");
        assert!(edit.get(RecordId(2)).is_none());
        assert!(!edit.is_editing());
    }

    #[test]
    fn deleted_new_never_reaches_the_source() {
        let source = base(&[(1, "a")]);
        let edit = source.derive_edit_list();
        edit.insert(rec(2, "ephemeral")).unwrap();
        edit.remove(RecordId(2)).unwrap();
        edit.commit_items().unwrap();

        assert_eq!(source.len(), 1);
        assert_eq!(source.version(), Version::ZERO);
        assert!(source.get(RecordId(2)).is_none());
    }

    #[test]
    fn noop_commit_leaves_source_untouched() {
        let source = base(&[(1, "a")]);
        let edit = source.derive_edit_list();
        edit.commit_items().unwrap();
        assert_eq!(source.version(), Version::ZERO);
    }

    #[test]
    fn commit_on_a_detached_source_fails() {
        let edit = {
            let source = base(&[(1, "a")]);
            source.derive_edit_list()
        };
        assert_eq!(edit.commit_items(), Err(ListError::SourceDetached));
    }

    #[test]
    fn updating_a_missing_record_fails() {
        let source = base(&[(1, "a")]);
        let edit = source.derive_edit_list();
        assert_eq!(
            edit.update(&rec(9, "x")),
            Err(ListError::MissingRecord(RecordId(9)))
        );
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Base collection: the authoritative, clean collection of record per type.
//!
//! A base collection persists for the whole session and is the system of
//! record. Edit, update, and difference collections derive from it and stay
//! transient. The handle is a cheap `Rc` clone so derived collections can
//! hold a weak reference back to their source; the model stays strictly
//! single-threaded and single-writer.
use core::cmp::Ordering;
use std::cell::RefCell;
use std::rc::Rc;

use crate::diff::DifferenceCollection;
use crate::edit::EditCollection;
use crate::error::ListError;
use crate::ident::{RecordId, Version};
use crate::notify::{CollectionObserver, ObserverId, Registrar};
use crate::record::Record;
use crate::update::UpdateCollection;
use crate::versioned::VersionedCollection;

/// Shared state behind a [`BaseCollection`] handle.
///
/// The registrar lives outside the list's `RefCell` so notes are published
/// after the mutation borrow has been released.
pub(crate) struct BaseShared<R: Record> {
    pub(crate) list: RefCell<VersionedCollection<R>>,
    pub(crate) registrar: Registrar<R>,
}

/// Authoritative collection handle. Clones share the same state.
pub struct BaseCollection<R: Record> {
    shared: Rc<BaseShared<R>>,
}

impl<R: Record> Clone for BaseCollection<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<R: Record> Default for BaseCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> core::fmt::Debug for BaseCollection<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BaseCollection")
            .field("version", &self.version())
            .field("len", &self.len())
            .finish()
    }
}

impl<R: Record> BaseCollection<R> {
    /// Creates an empty base collection at version zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(BaseShared {
                list: RefCell::new(VersionedCollection::new()),
                registrar: Registrar::new(),
            }),
        }
    }

    /// Creates a base collection from clean records.
    pub fn from_records<I: IntoIterator<Item = R>>(records: I) -> Result<Self, ListError> {
        let base = Self::new();
        {
            let mut list = base.shared.list.borrow_mut();
            for record in records {
                list.add(record)?;
            }
        }
        Ok(base)
    }

    pub(crate) fn shared(&self) -> &Rc<BaseShared<R>> {
        &self.shared
    }

    /// Current collection version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.shared.list.borrow().version()
    }

    /// Number of visible records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.list.borrow().len()
    }

    /// Returns `true` when no visible records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.list.borrow().is_empty()
    }

    /// Clone of the visible record with `id`.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<R> {
        self.shared.list.borrow().get(id).cloned()
    }

    /// Clones of all visible records in sequence order.
    #[must_use]
    pub fn records(&self) -> Vec<R> {
        self.shared.list.borrow().iter().cloned().collect()
    }

    /// Appends a clean record directly to the canonical collection.
    ///
    /// Intended for initial load; interactive mutation goes through an
    /// edit collection.
    pub fn add(&self, record: R) -> Result<(), ListError> {
        self.shared.list.borrow_mut().add(record)
    }

    /// Stable sort of the sequence by `cmp`. Order is presentation state
    /// and publishes no note.
    pub fn sort_by<F>(&self, cmp: F)
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        self.shared.list.borrow_mut().sort_by(cmp);
    }

    /// Attaches an observer; notes are delivered in registration order.
    pub fn subscribe(&self, observer: std::rc::Weak<dyn CollectionObserver<R>>) -> ObserverId {
        self.shared.registrar.subscribe(observer)
    }

    /// Detaches the observer registered under `id`.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.shared.registrar.unsubscribe(id);
    }

    /// Clears this collection, bulk-copies every record from `source`, and
    /// adopts its version. Publishes a refresh note.
    pub fn reset_content(&self, source: &Self) {
        let note = {
            let source_list = source.shared.list.borrow();
            self.shared.list.borrow_mut().reset_from(&source_list)
        };
        tracing::debug!(records = note.added.len(), "reset content");
        self.shared.registrar.publish(&note);
    }

    /// Re-anchors this collection against `baseline`.
    ///
    /// Both sides must be at version zero, else
    /// [`ListError::IllegalRebaseState`]: rebase has to start clean so the
    /// resulting delta unambiguously represents differences from the new
    /// baseline rather than pre-existing edits.
    pub fn re_base(&self, baseline: &Self) -> Result<(), ListError> {
        let note = {
            let baseline_list = baseline.shared.list.borrow();
            if !baseline_list.version().is_zero() {
                return Err(ListError::IllegalRebaseState {
                    version: baseline_list.version(),
                });
            }
            self.shared.list.borrow_mut().rebase(&baseline_list)?
        };
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Discards record changes introduced after `target` and publishes a
    /// rewind note.
    ///
    /// Caller discipline: never rewind while an edit collection against
    /// this source holds uncommitted changes — the edit side will adopt the
    /// rewound state and drop local edits on the affected records.
    pub fn rewind_to(&self, target: Version) -> Result<(), ListError> {
        let note = self.shared.list.borrow_mut().rewind_to(target)?;
        self.shared.registrar.publish(&note);
        Ok(())
    }

    /// Rewinds to version zero.
    pub fn reset(&self) -> Result<(), ListError> {
        self.rewind_to(Version::ZERO)
    }

    /// One-shot diff from this collection (old side) to `compare_to` (new
    /// side): records only in `compare_to` report as added, records only
    /// here report as deleted.
    #[must_use]
    pub fn derive_differences(&self, compare_to: &Self) -> DifferenceCollection<R> {
        let old_side = self.shared.list.borrow();
        let new_side = compare_to.shared.list.borrow();
        DifferenceCollection::compute(&new_side, &old_side)
    }

    /// Opens an edit collection against this source and populates it.
    #[must_use]
    pub fn derive_edit_list(&self) -> EditCollection<R> {
        EditCollection::open(self)
    }

    /// Mirrors the dirty records of this source into an update collection
    /// for phased persistence commit.
    #[must_use]
    pub fn derive_updates(&self) -> UpdateCollection<R> {
        UpdateCollection::open(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::record::Versioned;

    type Rec = Versioned<String>;

    fn rec(id: u64, s: &str) -> Rec {
        Versioned::new(RecordId(id), s.to_owned())
    }

    fn base(items: &[(u64, &str)]) -> BaseCollection<Rec> {
        BaseCollection::from_records(items.iter().map(|&(id, s)| rec(id, s))).unwrap()
    }

    #[test]
    fn reset_content_adopts_source_version() {
        let source = base(&[(1, "a"), (2, "b")]);
        source
            .shared
            .list
            .borrow_mut()
            .set_version(Version(3));
        let target = base(&[(9, "z")]);
        target.reset_content(&source);
        assert_eq!(target.len(), 2);
        assert_eq!(target.version(), Version(3));
        assert!(target.get(RecordId(9)).is_none());
    }

    #[test]
    fn re_base_rejects_a_dirty_baseline() {
        let local = base(&[(1, "a")]);
        let baseline = base(&[(1, "a")]);
        baseline
            .shared
            .list
            .borrow_mut()
            .set_version(Version(1));
        assert_eq!(
            local.re_base(&baseline),
            Err(ListError::IllegalRebaseState { version: Version(1) })
        );
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Change notifications and the observer registrar.
//!
//! Every mutating collection operation that changes visible state assembles
//! one [`ChangeNote`] bundling added records, changed records, and deleted
//! identities. Owning wrappers publish non-empty notes through a
//! [`Registrar`]: delivery is synchronous, in registration order, on the
//! caller's thread, after the triggering mutation has completed.
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::ident::RecordId;
use crate::record::Record;

/// What kind of state transition produced a notification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChangeKind {
    /// Content was cleared and repopulated wholesale.
    Refresh,
    /// A clean collection was re-anchored against a new baseline.
    Rebase,
    /// Changes after a target version were discarded.
    Rewind,
    /// Incremental change: interactive edits or a phased update batch.
    Update,
    /// An edit collection folded its changes back into the source.
    Commit,
}

/// One bundled notification: the kind of transition plus three possibly
/// empty groups. Empty notes are never published.
#[derive(Clone, Debug)]
pub struct ChangeNote<R: Record> {
    /// The transition that produced this note.
    pub kind: ChangeKind,
    /// Records that appeared.
    pub added: Vec<R>,
    /// Records whose values changed.
    pub changed: Vec<R>,
    /// Identities of records that disappeared.
    pub deleted: Vec<RecordId>,
}

impl<R: Record> ChangeNote<R> {
    /// Creates an empty note of `kind`.
    #[must_use]
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            added: Vec::new(),
            changed: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Returns `true` when all three groups are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}

/// Subscriber side of the notification contract.
pub trait CollectionObserver<R: Record> {
    /// Invoked synchronously for every non-empty note the observed
    /// collection publishes.
    fn collection_changed(&self, note: &ChangeNote<R>);
}

/// Token returned by [`Registrar::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ObserverId(u64);

/// Ordered observer registry.
///
/// Observers are held weakly: a dropped subscriber detaches itself, and
/// dead entries are pruned on the next publish. Single-threaded by design —
/// the framework has one logical writer and no locking.
pub struct Registrar<R: Record> {
    observers: RefCell<Vec<(ObserverId, Weak<dyn CollectionObserver<R>>)>>,
    next: Cell<u64>,
}

impl<R: Record> Default for Registrar<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Registrar<R> {
    /// Creates an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
            next: Cell::new(0),
        }
    }

    /// Attaches `observer`; notes are delivered in registration order.
    pub fn subscribe(&self, observer: Weak<dyn CollectionObserver<R>>) -> ObserverId {
        let id = ObserverId(self.next.get());
        self.next.set(self.next.get() + 1);
        self.observers.borrow_mut().push((id, observer));
        id
    }

    /// Detaches the observer registered under `id`. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ObserverId) {
        self.observers.borrow_mut().retain(|(oid, _)| *oid != id);
    }

    /// Delivers `note` to every live observer, pruning dead ones.
    ///
    /// Empty notes are dropped here so callers can assemble notes
    /// unconditionally. The observer list borrow is released before any
    /// observer runs, so observers may subscribe or unsubscribe reentrantly.
    pub fn publish(&self, note: &ChangeNote<R>) {
        if note.is_empty() {
            return;
        }
        let live: Vec<Rc<dyn CollectionObserver<R>>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };
        for observer in live {
            observer.collection_changed(note);
        }
    }
}

impl<R: Record> core::fmt::Debug for Registrar<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registrar")
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::RecordId;
    use crate::record::Versioned;

    type Rec = Versioned<String>;

    struct Log {
        seen: RefCell<Vec<(usize, ChangeKind)>>,
        tag: usize,
        shared: Rc<RefCell<Vec<usize>>>,
    }

    impl CollectionObserver<Rec> for Log {
        fn collection_changed(&self, note: &ChangeNote<Rec>) {
            self.seen.borrow_mut().push((self.tag, note.kind));
            self.shared.borrow_mut().push(self.tag);
        }
    }

    #[test]
    fn delivery_follows_registration_order() {
        let registrar: Registrar<Rec> = Registrar::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(Log {
            seen: RefCell::new(Vec::new()),
            tag: 1,
            shared: Rc::clone(&order),
        });
        let b = Rc::new(Log {
            seen: RefCell::new(Vec::new()),
            tag: 2,
            shared: Rc::clone(&order),
        });
        registrar.subscribe(Rc::downgrade(&a) as Weak<dyn CollectionObserver<Rec>>);
        registrar.subscribe(Rc::downgrade(&b) as Weak<dyn CollectionObserver<Rec>>);

        let mut note = ChangeNote::new(ChangeKind::Update);
        note.deleted.push(RecordId(1));
        registrar.publish(&note);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn empty_notes_fire_nothing_and_unsubscribe_detaches() {
        let registrar: Registrar<Rec> = Registrar::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::new(Log {
            seen: RefCell::new(Vec::new()),
            tag: 1,
            shared: Rc::clone(&order),
        });
        let token = registrar.subscribe(Rc::downgrade(&a) as Weak<dyn CollectionObserver<Rec>>);

        registrar.publish(&ChangeNote::new(ChangeKind::Refresh));
        assert!(a.seen.borrow().is_empty());

        registrar.unsubscribe(token);
        let mut note = ChangeNote::new(ChangeKind::Rewind);
        note.deleted.push(RecordId(9));
        registrar.publish(&note);
        assert!(a.seen.borrow().is_empty());
    }
}

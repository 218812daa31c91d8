// SPDX-License-Identifier: Apache-2.0
//! Shared test records, fixtures, and observer doubles for vlist crates.
//!
//! Keeps the integration suites free of record-type boilerplate:
//!
//! - [`TestValues`] / [`TestRecord`] — a minimal identifiable value struct
//!   wrapped in the framework's standard record type.
//! - [`rec`] / [`base_of`] — one-line record and base-collection builders.
//! - [`NoteLog`] — an observer double recording every published note for
//!   assertions on kinds, groups, and delivery order.
#![forbid(unsafe_code)]
// Fixture builders fail loudly on malformed inputs.
#![allow(clippy::panic)]

use std::cell::RefCell;
use std::rc::Rc;

use vlist_core::{
    BaseCollection, ChangeKind, ChangeNote, CollectionObserver, RecordId, Versioned,
};

/// Minimal value struct for framework tests: a name and an amount.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TestValues {
    /// Display name of the fixture record.
    pub name: String,
    /// Arbitrary numeric payload.
    pub amount: i64,
}

/// The standard record wrapper over [`TestValues`].
pub type TestRecord = Versioned<TestValues>;

/// Builds a clean test record.
#[must_use]
pub fn rec(id: u64, name: &str, amount: i64) -> TestRecord {
    Versioned::new(
        RecordId(id),
        TestValues {
            name: name.to_owned(),
            amount,
        },
    )
}

/// Builds a base collection from `(id, name, amount)` triples.
///
/// # Panics
///
/// Panics on duplicate ids — fixtures are expected to be well-formed.
#[must_use]
pub fn base_of(items: &[(u64, &str, i64)]) -> BaseCollection<TestRecord> {
    match BaseCollection::from_records(items.iter().map(|&(id, name, amount)| {
        rec(id, name, amount)
    })) {
        Ok(base) => base,
        Err(err) => panic!("fixture base: {err}"),
    }
}

/// One recorded notification: kind plus the three id groups.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LoggedNote {
    /// Kind of the published note.
    pub kind: ChangeKind,
    /// Identities of the added records.
    pub added: Vec<RecordId>,
    /// Identities of the changed records.
    pub changed: Vec<RecordId>,
    /// Identities of the deleted records.
    pub deleted: Vec<RecordId>,
}

/// Observer double that records every note it receives.
///
/// Keep the returned `Rc` alive for as long as the subscription should
/// last — registrars hold observers weakly.
#[derive(Default)]
pub struct NoteLog {
    notes: RefCell<Vec<LoggedNote>>,
}

impl NoteLog {
    /// Creates an empty log behind an `Rc`, ready to subscribe.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn notes(&self) -> Vec<LoggedNote> {
        self.notes.borrow().clone()
    }

    /// Kinds recorded so far, in delivery order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ChangeKind> {
        self.notes.borrow().iter().map(|n| n.kind).collect()
    }

    /// Number of notes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.borrow().len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.borrow().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.notes.borrow_mut().clear();
    }
}

impl CollectionObserver<TestRecord> for NoteLog {
    fn collection_changed(&self, note: &ChangeNote<TestRecord>) {
        use vlist_core::Record as _;
        self.notes.borrow_mut().push(LoggedNote {
            kind: note.kind,
            added: note.added.iter().map(|r| r.identity()).collect(),
            changed: note.changed.iter().map(|r| r.identity()).collect(),
            deleted: note.deleted.clone(),
        });
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Record contract and classification.
//!
//! Collections are generic over any identifiable, versioned record. The
//! [`Record`] trait is the narrow contract the framework consumes: identity,
//! version tags, and the deletion flag. Field contents are never inspected;
//! the trait compares and transfers them opaquely. It doubles as the
//! explicit factory capability for derived records ([`Record::fresh_copy`]),
//! replacing any reflective default construction.
use core::fmt;

use crate::ident::{RecordId, Version};
use crate::values::ValueSet;

/// An identifiable record backed by a value set with a history stack.
///
/// Host applications usually implement this by embedding a
/// [`ValueSet`] — or simply by wrapping their value struct in
/// [`Versioned`], which implements the whole contract.
pub trait Record: Clone + fmt::Debug + 'static {
    /// Stable identity, assigned once and never reused.
    fn identity(&self) -> RecordId;

    /// Version tag of the latest (current) snapshot.
    fn version(&self) -> Version;

    /// Version tag of the earliest snapshot.
    fn origin_version(&self) -> Version;

    /// Number of snapshots held, counting the current one. One means clean.
    fn depth(&self) -> usize;

    /// Returns the current snapshot's deletion flag.
    fn is_deleted(&self) -> bool;

    /// Sets the current snapshot's deletion flag.
    fn set_deleted(&mut self, deleted: bool);

    /// Retags the current snapshot.
    fn set_version(&mut self, version: Version);

    /// Snapshots the current values onto the history stack and retags the
    /// current snapshot with `version`.
    fn push_history(&mut self, version: Version);

    /// Discards the current snapshot, restoring the most recent prior one.
    fn pop_history(&mut self);

    /// Compares current field values with another record's.
    fn same_values(&self, other: &Self) -> bool;

    /// Installs another record's current values as this record's current
    /// values. Identity and history are untouched.
    fn adopt_values(&mut self, other: &Self);

    /// Re-anchors a clean record against `baseline`: baseline values become
    /// the origin snapshot, local values reappear as a version-one change.
    fn rebase_origin(&mut self, baseline: &Self);

    /// Collapses to a single clean snapshot at version zero.
    fn collapse(&mut self);

    /// Clean clone of the current values at version zero, with no history —
    /// the "copy" derived variant that seeds an edit collection.
    #[must_use]
    fn fresh_copy(&self) -> Self;
}

/// Classification of a record by its history shape and deletion flag.
///
/// This drives both edit-commit behaviour and update-collection intent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecordClass {
    /// Exactly one snapshot at version zero, not deleted.
    Clean,
    /// Created inside an uncommitted session (origin version above zero).
    New,
    /// History present against a version-zero origin.
    Changed,
    /// Deletion-flagged with a committed origin; pre-deletion state is on
    /// the history stack.
    Deleted,
    /// Created and deleted within one uncommitted session; never reached
    /// the source.
    DeletedNew,
}

/// Classifies `record` from the contract alone.
#[must_use]
pub fn classify<R: Record>(record: &R) -> RecordClass {
    let new = !record.origin_version().is_zero();
    if record.is_deleted() {
        if new {
            RecordClass::DeletedNew
        } else {
            RecordClass::Deleted
        }
    } else if new {
        RecordClass::New
    } else if record.depth() > 1 {
        RecordClass::Changed
    } else {
        RecordClass::Clean
    }
}

/// Standard record wrapper: a stable identity plus a [`ValueSet`] over the
/// host's plain value struct.
#[derive(Clone, Debug)]
pub struct Versioned<V: Clone + PartialEq + fmt::Debug + 'static> {
    id: RecordId,
    values: ValueSet<V>,
}

impl<V: Clone + PartialEq + fmt::Debug + 'static> Versioned<V> {
    /// Creates a clean record with `id` and `values` at version zero.
    #[must_use]
    pub fn new(id: RecordId, values: V) -> Self {
        Self {
            id,
            values: ValueSet::new(values),
        }
    }

    /// Returns the current field values.
    #[inline]
    pub fn values(&self) -> &V {
        self.values.current()
    }

    /// Installs new field values without touching history. Callers that
    /// need undo must [`Record::push_history`] first.
    pub fn replace_values(&mut self, values: &V) {
        self.values.replace(values);
    }

    /// Read access to the underlying value set.
    #[inline]
    pub fn value_set(&self) -> &ValueSet<V> {
        &self.values
    }
}

impl<V: Clone + PartialEq + fmt::Debug + 'static> Record for Versioned<V> {
    fn identity(&self) -> RecordId {
        self.id
    }

    fn version(&self) -> Version {
        self.values.version()
    }

    fn origin_version(&self) -> Version {
        self.values.origin_version()
    }

    fn depth(&self) -> usize {
        self.values.depth()
    }

    fn is_deleted(&self) -> bool {
        self.values.is_deleted()
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.values.set_deleted(deleted);
    }

    fn set_version(&mut self, version: Version) {
        self.values.set_version(version);
    }

    fn push_history(&mut self, version: Version) {
        self.values.push_history(version);
    }

    fn pop_history(&mut self) {
        self.values.pop_history();
    }

    fn same_values(&self, other: &Self) -> bool {
        self.values.same_values(&other.values)
    }

    fn adopt_values(&mut self, other: &Self) {
        self.values.adopt(&other.values);
    }

    fn rebase_origin(&mut self, baseline: &Self) {
        self.values.rebase_origin(&baseline.values);
    }

    fn collapse(&mut self) {
        self.values.collapse();
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: self.id,
            values: self.values.fresh_copy(),
        }
    }
}

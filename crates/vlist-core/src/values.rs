// SPDX-License-Identifier: Apache-2.0
//! Value-set storage: immutable field snapshots plus a history stack.
//!
//! A [`ValueSet`] owns the current snapshot of a record's field values and
//! an ordered stack of prior snapshots. Snapshots are immutable and cheaply
//! shareable (`Rc`), so "clone before mutate" is enforced by construction
//! rather than by convention. `history[0]` is always the original values;
//! each later snapshot carries a strictly greater version tag.
use std::rc::Rc;

use crate::ident::Version;

/// One immutable field snapshot tagged with the collection version at
/// capture time.
#[derive(Clone, Debug)]
pub struct Snapshot<V> {
    values: Rc<V>,
    version: Version,
    deleted: bool,
}

impl<V> Snapshot<V> {
    fn new(values: Rc<V>, version: Version, deleted: bool) -> Self {
        Self {
            values,
            version,
            deleted,
        }
    }

    /// Returns the snapshot's field values.
    #[inline]
    pub fn values(&self) -> &V {
        &self.values
    }

    /// Returns the version tag captured with this snapshot.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns `true` when the snapshot carries the deletion flag.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Current snapshot plus prior version-tagged snapshots.
///
/// A value set is *clean* when it holds exactly one snapshot (no history)
/// tagged with [`Version::ZERO`], and *dirty* otherwise.
#[derive(Clone, Debug)]
pub struct ValueSet<V: Clone + PartialEq> {
    current: Snapshot<V>,
    history: Vec<Snapshot<V>>,
}

impl<V: Clone + PartialEq> ValueSet<V> {
    /// Creates a clean value set holding `values` at version zero.
    #[must_use]
    pub fn new(values: V) -> Self {
        Self {
            current: Snapshot::new(Rc::new(values), Version::ZERO, false),
            history: Vec::new(),
        }
    }

    /// Returns the current field values.
    #[inline]
    pub fn current(&self) -> &V {
        self.current.values()
    }

    /// Returns the current snapshot's version tag.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.current.version
    }

    /// Returns the earliest snapshot's version tag.
    ///
    /// A non-zero origin means the record never existed before that
    /// version — it was created inside an uncommitted session.
    #[inline]
    #[must_use]
    pub fn origin_version(&self) -> Version {
        self.history
            .first()
            .map_or(self.current.version, Snapshot::version)
    }

    /// Number of snapshots held, counting the current one. One means clean.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.history.len() + 1
    }

    /// Ordered prior snapshots, earliest first.
    #[inline]
    pub fn history(&self) -> &[Snapshot<V>] {
        &self.history
    }

    /// Returns the current snapshot's deletion flag.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.current.deleted
    }

    /// Sets the current snapshot's deletion flag.
    pub fn set_deleted(&mut self, deleted: bool) {
        self.current.deleted = deleted;
    }

    /// Retags the current snapshot with `version`.
    pub fn set_version(&mut self, version: Version) {
        self.current.version = version;
    }

    /// Pushes the current snapshot onto the history stack and retags the
    /// (still identical) current values with `version`.
    ///
    /// Callers mutate values afterwards via [`ValueSet::replace`]; the
    /// snapshot on the stack keeps the pre-mutation state.
    pub fn push_history(&mut self, version: Version) {
        debug_assert!(version > self.current.version);
        self.history.push(self.current.clone());
        self.current.version = version;
    }

    /// Discards the current snapshot and restores the most recent prior
    /// one, including its deletion flag. No-op on a clean value set.
    pub fn pop_history(&mut self) {
        if let Some(prior) = self.history.pop() {
            self.current = prior;
        }
    }

    /// Installs `values` as the current field values.
    pub fn replace(&mut self, values: &V) {
        if self.current.values() != values {
            self.current.values = Rc::new(values.clone());
        }
    }

    /// Adopts another value set's current values (cheap: shares the
    /// snapshot storage).
    pub fn adopt(&mut self, other: &Self) {
        self.current.values = Rc::clone(&other.current.values);
    }

    /// Re-anchors a clean value set against `baseline`: the baseline's
    /// values become the origin snapshot and the local values reappear as
    /// a version-one change.
    pub fn rebase_origin(&mut self, baseline: &Self) {
        debug_assert_eq!(self.depth(), 1);
        self.history.push(Snapshot::new(
            Rc::clone(&baseline.current.values),
            Version::ZERO,
            false,
        ));
        self.current.version = Version::ZERO.next();
    }

    /// Drops all history and retags the current values clean at version
    /// zero, clearing the deletion flag.
    pub fn collapse(&mut self) {
        self.history.clear();
        self.current.version = Version::ZERO;
        self.current.deleted = false;
    }

    /// Clean clone of the current values at version zero, with no history.
    ///
    /// This is the "copy" derived variant that seeds an edit collection.
    #[must_use]
    pub fn fresh_copy(&self) -> Self {
        Self {
            current: Snapshot::new(Rc::clone(&self.current.values), Version::ZERO, false),
            history: Vec::new(),
        }
    }

    /// Compares current field values.
    #[must_use]
    pub fn same_values(&self, other: &Self) -> bool {
        self.current.values() == other.current.values()
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Collection sets: keyed groups of same-kind collections advanced together.
//!
//! A host application keeps one collection per record type (accounts,
//! transactions, prices, ...). The key space is a closed, caller-supplied
//! sum type — typically a small enum — and members are type-erased behind
//! per-kind traits so collections of different record types share one set.
//! Members are held in a `BTreeMap` so every set-wide walk is in
//! deterministic key order.
use std::collections::BTreeMap;

use crate::diff::{DiffCounts, DifferenceCollection};
use crate::edit::EditCollection;
use crate::error::ListError;
use crate::ident::Version;
use crate::record::Record;
use crate::update::{CommitPhase, UpdateCollection};

/// Key of a collection-set member: a closed, compile-time record-type
/// enumeration supplied by the host.
pub trait SetKey: Copy + Ord + core::fmt::Debug + 'static {}

impl<K: Copy + Ord + core::fmt::Debug + 'static> SetKey for K {}

/// Type-erased edit collection inside an [`EditCollectionSet`].
pub trait EditMember {
    /// Opens the member's edit version. Idempotent while editing.
    fn start_edit_version(&self, version: Version);
    /// Returns `true` while the member has an open edit version.
    fn is_editing(&self) -> bool;
    /// Discards the member's pending edits (rewind to pre-edit state).
    fn cancel_edit_version(&self) -> Result<(), ListError>;
    /// Folds the member's edits into its own version.
    fn commit_edit_version(&self);
    /// The member's working-copy version.
    fn version(&self) -> Version;
    /// Permanently commits the member's changes into its source.
    fn commit_to_source(&self) -> Result<(), ListError>;
}

impl<R: Record> EditMember for EditCollection<R> {
    fn start_edit_version(&self, version: Version) {
        EditCollection::start_edit_version(self, version);
    }

    fn is_editing(&self) -> bool {
        EditCollection::is_editing(self)
    }

    fn cancel_edit_version(&self) -> Result<(), ListError> {
        EditCollection::cancel_edit_version(self)
    }

    fn commit_edit_version(&self) {
        EditCollection::commit_edit_version(self);
    }

    fn version(&self) -> Version {
        EditCollection::version(self)
    }

    fn commit_to_source(&self) -> Result<(), ListError> {
        self.commit_items()
    }
}

/// Keyed group of edit collections sharing one edit-session lifecycle.
///
/// The set tracks an edit-in-progress version distinct from its committed
/// version. Cross-member commits are sequential and stop at the first
/// failing member; the framework offers no cross-collection rollback, so a
/// mid-sequence failure must be surfaced by the caller as a partial commit.
pub struct EditCollectionSet<K: SetKey> {
    members: BTreeMap<K, Box<dyn EditMember>>,
    version: Version,
    edit_version: Option<Version>,
}

impl<K: SetKey> Default for EditCollectionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SetKey> core::fmt::Debug for EditCollectionSet<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EditCollectionSet")
            .field("members", &self.members.len())
            .field("version", &self.version)
            .field("edit_version", &self.edit_version)
            .finish()
    }
}

impl<K: SetKey> EditCollectionSet<K> {
    /// Creates an empty set at version zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
            version: Version::ZERO,
            edit_version: None,
        }
    }

    /// Registers `member` under `key`, replacing any previous member.
    pub fn insert_member(&mut self, key: K, member: Box<dyn EditMember>) {
        self.members.insert(key, member);
    }

    /// Builder-style [`EditCollectionSet::insert_member`].
    #[must_use]
    pub fn with_member(mut self, key: K, member: Box<dyn EditMember>) -> Self {
        self.insert_member(key, member);
        self
    }

    /// The member registered under `key`.
    #[must_use]
    pub fn member(&self, key: K) -> Option<&dyn EditMember> {
        self.members.get(&key).map(AsRef::as_ref)
    }

    /// Set-wide committed version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns `true` while an edit version is open.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.edit_version.is_some()
    }

    /// Opens an edit version across every member. Idempotent while editing.
    pub fn start_edit_version(&mut self) -> Version {
        if let Some(version) = self.edit_version {
            return version;
        }
        let version = self.version.next();
        for member in self.members.values() {
            member.start_edit_version(version);
        }
        self.edit_version = Some(version);
        version
    }

    /// Asks every editing member to discard its pending edits, then clears
    /// the edit marker.
    pub fn cancel_edit_version(&mut self) -> Result<(), ListError> {
        if self.edit_version.is_none() {
            return Ok(());
        }
        for member in self.members.values() {
            if member.is_editing() {
                member.cancel_edit_version()?;
            }
        }
        self.edit_version = None;
        Ok(())
    }

    /// Asks every member to fold its edits into its own version, advances
    /// the set version, and clears the edit marker.
    pub fn commit_edit_version(&mut self) {
        let Some(version) = self.edit_version.take() else {
            return;
        };
        for member in self.members.values() {
            member.commit_edit_version();
        }
        self.version = version;
    }

    /// Commits any open edit version, then permanently commits every member
    /// with pending changes into its source.
    ///
    /// Members are visited in key order; the first failure stops the walk
    /// and leaves later members uncommitted.
    pub fn commit_edit_session(&mut self) -> Result<(), ListError> {
        self.commit_edit_version();
        for (key, member) in &self.members {
            if member.version() > Version::ZERO {
                tracing::debug!(?key, "committing member to source");
                member.commit_to_source()?;
            }
        }
        Ok(())
    }
}

/// Type-erased update collection inside an [`UpdateCollectionSet`].
pub trait UpdateMember {
    /// Rebuilds the member's mirror from its source.
    fn rederive(&self);
    /// Records still awaiting commit.
    fn pending(&self) -> usize;
    /// Commits up to `budget` phase-eligible records; returns the unused
    /// remainder.
    fn commit_items(&self, phase: CommitPhase, budget: usize) -> Result<usize, ListError>;
}

impl<R: Record> UpdateMember for UpdateCollection<R> {
    fn rederive(&self) {
        UpdateCollection::rederive(self);
    }

    fn pending(&self) -> usize {
        UpdateCollection::pending(self)
    }

    fn commit_items(&self, phase: CommitPhase, budget: usize) -> Result<usize, ListError> {
        UpdateCollection::commit_items(self, phase, budget)
    }
}

/// Keyed group of update collections flushed under one shared budget.
pub struct UpdateCollectionSet<K: SetKey> {
    members: BTreeMap<K, Box<dyn UpdateMember>>,
}

impl<K: SetKey> Default for UpdateCollectionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SetKey> core::fmt::Debug for UpdateCollectionSet<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdateCollectionSet")
            .field("members", &self.members.len())
            .field("pending", &self.pending())
            .finish()
    }
}

impl<K: SetKey> UpdateCollectionSet<K> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Registers `member` under `key`, replacing any previous member.
    pub fn insert_member(&mut self, key: K, member: Box<dyn UpdateMember>) {
        self.members.insert(key, member);
    }

    /// Builder-style [`UpdateCollectionSet::insert_member`].
    #[must_use]
    pub fn with_member(mut self, key: K, member: Box<dyn UpdateMember>) -> Self {
        self.insert_member(key, member);
        self
    }

    /// Rebuilds every member's mirror from its source.
    pub fn rederive_all(&self) {
        for member in self.members.values() {
            member.rederive();
        }
    }

    /// Total records awaiting commit across all members.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.members.values().map(|m| m.pending()).sum()
    }

    /// Flushes one phase across members in key order under one shared
    /// budget; returns the unused remainder.
    pub fn commit_batch(&self, phase: CommitPhase, budget: usize) -> Result<usize, ListError> {
        let mut remaining = budget;
        for member in self.members.values() {
            if remaining == 0 {
                break;
            }
            remaining = member.commit_items(phase, remaining)?;
        }
        Ok(remaining)
    }
}

/// Type-erased difference report inside a [`DifferenceCollectionSet`].
pub trait DiffMember {
    /// Returns `true` when the member reports no differences.
    fn is_empty(&self) -> bool;
    /// Number of entries the member reports.
    fn len(&self) -> usize;
    /// Tallies of the member's entries by classification.
    fn counts(&self) -> DiffCounts;
}

impl<R: Record> DiffMember for DifferenceCollection<R> {
    fn is_empty(&self) -> bool {
        DifferenceCollection::is_empty(self)
    }

    fn len(&self) -> usize {
        DifferenceCollection::len(self)
    }

    fn counts(&self) -> DiffCounts {
        DifferenceCollection::counts(self)
    }
}

/// Keyed group of one-shot difference reports.
pub struct DifferenceCollectionSet<K: SetKey> {
    members: BTreeMap<K, Box<dyn DiffMember>>,
}

impl<K: SetKey> Default for DifferenceCollectionSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SetKey> core::fmt::Debug for DifferenceCollectionSet<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DifferenceCollectionSet")
            .field("members", &self.members.len())
            .finish()
    }
}

impl<K: SetKey> DifferenceCollectionSet<K> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Registers `member` under `key`, replacing any previous member.
    pub fn insert_member(&mut self, key: K, member: Box<dyn DiffMember>) {
        self.members.insert(key, member);
    }

    /// Builder-style [`DifferenceCollectionSet::insert_member`].
    #[must_use]
    pub fn with_member(mut self, key: K, member: Box<dyn DiffMember>) -> Self {
        self.insert_member(key, member);
        self
    }

    /// The member registered under `key`.
    #[must_use]
    pub fn member(&self, key: K) -> Option<&dyn DiffMember> {
        self.members.get(&key).map(AsRef::as_ref)
    }

    /// Returns `true` when every member reports no differences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.values().all(|m| m.is_empty())
    }

    /// Total entries across all members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.values().map(|m| m.len()).sum()
    }
}

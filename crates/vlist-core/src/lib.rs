// SPDX-License-Identifier: Apache-2.0
//! vlist-core: single-writer versioned list framework.
//!
//! An in-memory data-versioning engine for collections of identifiable
//! records: open a working copy, make a batch of speculative edits, then
//! atomically commit them back to the canonical collection, discard them,
//! or reconcile them against a freshly reloaded baseline — with no ad-hoc
//! diff code in the host's screens or persistence paths.
//!
//! The building blocks, leaf to root:
//!
//! - [`IndexedCollection`]: ordered sequence plus identity index.
//! - [`VersionedCollection`]: adds a monotonic collection version, change
//!   notes, rewind, and rebase.
//! - [`BaseCollection`]: the authoritative collection; derives the
//!   transient kinds below.
//! - [`DifferenceCollection`]: one-shot computed diff between two bases.
//! - [`EditCollection`]: working copy for an interactive edit session.
//! - [`UpdateCollection`]: dirty-record mirror consumed by a phased
//!   (insert → update → delete) persistence commit.
//! - [`EditCollectionSet`] / [`UpdateCollectionSet`] /
//!   [`DifferenceCollectionSet`]: keyed groups of same-kind collections,
//!   one per record type, advanced and committed together.
//!
//! Everything is single-threaded and single-writer by design: no locking,
//! no background threads. Long commits are sliced by a caller-supplied
//! budget instead of being cancelled mid-flight.
#![forbid(unsafe_code)]

mod base;
mod diff;
mod edit;
mod error;
mod ident;
mod indexed;
mod notify;
mod record;
mod set;
mod update;
mod values;
mod versioned;

/// Authoritative per-type collection.
pub use base::BaseCollection;
/// One-shot difference report and its tallies.
pub use diff::{DiffCounts, DifferenceCollection};
/// Interactive working copy.
pub use edit::EditCollection;
/// Error taxonomy for all collection operations.
pub use error::ListError;
/// Identity and version primitives.
pub use ident::{RecordId, Version};
/// Ordered sequence with identity index.
pub use indexed::IndexedCollection;
/// Change notification contract.
pub use notify::{ChangeKind, ChangeNote, CollectionObserver, ObserverId, Registrar};
/// Record contract, classification, and the standard wrapper.
pub use record::{classify, Record, RecordClass, Versioned};
/// Keyed collection groups and their member seams.
pub use set::{
    DiffMember, DifferenceCollectionSet, EditCollectionSet, EditMember, SetKey,
    UpdateCollectionSet, UpdateMember,
};
/// Dirty-record mirror and the phased-commit phases.
pub use update::{CommitPhase, UpdateCollection};
/// Immutable snapshots and the per-record history stack.
pub use values::{Snapshot, ValueSet};
/// Shared versioned-collection primitive.
pub use versioned::VersionedCollection;

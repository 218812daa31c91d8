// SPDX-License-Identifier: Apache-2.0
//! Error taxonomy for collection operations.
//!
//! Every variant signals a caller precondition violation. Nothing here is
//! retried internally: the framework fails fast instead of guessing intent.
//! The only expected partial-completion path is the phased update commit,
//! where an exhausted budget leaves work pending and is not an error.
use thiserror::Error;

use crate::ident::{RecordId, Version};

/// Errors raised by versioned collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    /// An insert supplied an identity the collection already holds.
    #[error("record {0} already present")]
    DuplicateIdentity(RecordId),

    /// A rewind targeted a version outside `0..=current`.
    #[error("rewind target {target} outside 0..={version}")]
    InvalidVersion {
        /// Requested rewind target.
        target: Version,
        /// Collection version at the time of the call.
        version: Version,
    },

    /// A rebase was attempted on a collection that is not clean.
    ///
    /// Rebase must start from version zero so the resulting delta
    /// unambiguously represents differences from the new baseline.
    #[error("rebase requires a clean collection, found {version}")]
    IllegalRebaseState {
        /// Version of the offending collection.
        version: Version,
    },

    /// A commit or lookup referenced an identity absent from a collection
    /// that was expected to hold it. Signals desynchronized edit/update
    /// state against the source; fatal, never swallowed.
    #[error("record {0} missing from expected collection")]
    MissingRecord(RecordId),

    /// The source collection behind an edit or update collection has been
    /// dropped.
    #[error("source collection detached")]
    SourceDetached,
}

// SPDX-License-Identifier: Apache-2.0
//! Property tests over generated edit-op sequences: identity uniqueness,
//! version monotonicity, and rewind idempotence must hold for any session.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use proptest::prelude::*;

use vlist_core::{
    BaseCollection, CollectionObserver, Record, RecordId, Version,
};
use vlist_testkit::{base_of, rec, NoteLog, TestRecord};

/// One speculative edit against the working copy.
#[derive(Clone, Debug)]
enum EditOp {
    Insert(u64, i64),
    Update(u64, i64),
    Remove(u64),
}

fn edit_op() -> impl Strategy<Value = EditOp> {
    // a deliberately small id space so ops collide with seeded records,
    // with each other, and with their own earlier effects
    let id = 0..8u64;
    prop_oneof![
        (id.clone(), any::<i64>()).prop_map(|(id, amount)| EditOp::Insert(id, amount)),
        (id.clone(), any::<i64>()).prop_map(|(id, amount)| EditOp::Update(id, amount)),
        id.prop_map(EditOp::Remove),
    ]
}

fn seeded_base() -> BaseCollection<TestRecord> {
    base_of(&[(0, "r0", 0), (1, "r1", 1), (2, "r2", 2), (3, "r3", 3)])
}

/// Runs a full session: apply every op (precondition violations are the
/// op's problem, not the session's), then commit.
fn run_session(base: &BaseCollection<TestRecord>, ops: &[EditOp]) {
    let edit = base.derive_edit_list();
    for op in ops {
        match *op {
            EditOp::Insert(id, amount) => {
                let _ = edit.insert(rec(id, "ins", amount));
            }
            EditOp::Update(id, amount) => {
                let _ = edit.update(&rec(id, "upd", amount));
            }
            EditOp::Remove(id) => {
                let _ = edit.remove(RecordId(id));
            }
        }
    }
    if edit.commit_items().is_err() {
        // only possible on desync, which these sessions never create
        unreachable!("commit failed");
    }
}

proptest! {
    /// No op sequence can smuggle a duplicate identity into the source.
    #[test]
    fn identity_uniqueness_holds(ops in proptest::collection::vec(edit_op(), 0..40)) {
        let base = seeded_base();
        run_session(&base, &ops);

        let ids: Vec<RecordId> = base.records().iter().map(Record::identity).collect();
        let unique: HashSet<RecordId> = ids.iter().copied().collect();
        prop_assert_eq!(ids.len(), unique.len());
    }

    /// The collection version never exceeds the highest history version
    /// reachable among its records, before or after a rewind.
    #[test]
    fn version_monotonicity_holds(ops in proptest::collection::vec(edit_op(), 1..40)) {
        let base = seeded_base();
        run_session(&base, &ops);

        let max_record = base
            .records()
            .iter()
            .map(Record::version)
            .max()
            .unwrap_or(Version::ZERO);
        prop_assert!(base.version() <= Version(max_record.0.max(1)));

        let before = base.version();
        base.rewind_to(Version::ZERO).ok();
        prop_assert!(base.version() <= before, "rewind never raises the version");
    }

    /// Rewinding twice to the same target: the second call changes nothing
    /// and publishes nothing.
    #[test]
    fn rewind_idempotence_holds(ops in proptest::collection::vec(edit_op(), 1..40)) {
        let base = seeded_base();
        run_session(&base, &ops);

        base.rewind_to(Version::ZERO).ok();
        let state: Vec<(RecordId, i64)> = base
            .records()
            .iter()
            .map(|r| (r.identity(), r.values().amount))
            .collect();

        let log = NoteLog::new();
        base.subscribe(Rc::downgrade(&log) as Weak<dyn CollectionObserver<TestRecord>>);
        base.rewind_to(Version::ZERO).ok();

        let after: Vec<(RecordId, i64)> = base
            .records()
            .iter()
            .map(|r| (r.identity(), r.values().amount))
            .collect();
        prop_assert_eq!(state, after);
        prop_assert!(log.is_empty(), "second rewind fired a note");
    }
}

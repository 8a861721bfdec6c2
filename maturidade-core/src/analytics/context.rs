//! Collaborators handed to every analytics entry point.

use crate::db::{Database, FactSource, SnapshotStore};

/// Read access to facts plus the snapshot store.
///
/// Analytics never touch a connection directly; swapping either side (for
/// example a fact source that fails for one journey) needs no other change.
#[derive(Clone, Copy)]
pub struct AnalyticsContext<'a> {
    pub facts: &'a dyn FactSource,
    pub store: &'a dyn SnapshotStore,
}

impl<'a> AnalyticsContext<'a> {
    /// Facts and snapshots from the same database.
    pub fn new(db: &'a Database) -> Self {
        Self {
            facts: db,
            store: db,
        }
    }

    pub fn with_parts(facts: &'a dyn FactSource, store: &'a dyn SnapshotStore) -> Self {
        Self { facts, store }
    }
}

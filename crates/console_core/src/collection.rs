use std::collections::HashSet;

use tracing::warn;

use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMutation {
    Applied,
    NoOp,
    /// The updater tried to change the record's id and was undone.
    Rejected,
}

/// Records of the current fetch, in server order, unique by id.
#[derive(Debug, Clone)]
pub struct RecordCollection<R: Record> {
    records: Vec<R>,
}

impl<R: Record> Default for RecordCollection<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R: Record> RecordCollection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a whole new snapshot. Later duplicates of an id are dropped;
    /// returns how many were dropped.
    pub fn replace(&mut self, records: Vec<R>) -> usize {
        let received = records.len();
        let mut seen = HashSet::with_capacity(received);
        let unique: Vec<R> = records
            .into_iter()
            .filter(|record| seen.insert(record.id().clone()))
            .collect();
        let dropped = received - unique.len();
        if dropped > 0 {
            warn!(
                kind = R::KIND.label(),
                dropped, "dropped records with duplicate ids from fetch result"
            );
        }
        self.records = unique;
        dropped
    }

    pub fn apply_field_mutation<F>(&mut self, id: &R::Id, updater: F) -> LocalMutation
    where
        F: FnOnce(&mut R),
    {
        let Some(record) = self.records.iter_mut().find(|record| record.id() == id) else {
            return LocalMutation::NoOp;
        };
        let original = record.clone();
        updater(record);
        if record.id() != id {
            *record = original;
            warn!(kind = R::KIND.label(), %id, "rejected local edit that changed the record id");
            return LocalMutation::Rejected;
        }
        LocalMutation::Applied
    }

    pub fn slice(&self, offset: usize, length: usize) -> &[R] {
        let start = offset.min(self.records.len());
        let end = offset.saturating_add(length).min(self.records.len());
        &self.records[start..end]
    }

    pub fn get(&self, id: &R::Id) -> Option<&R> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn last(&self) -> Option<&R> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }
}

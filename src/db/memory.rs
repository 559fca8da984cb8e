// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local document store.
//!
//! Documents are JSON objects keyed by `collection/id`. A merge holds the
//! shard lock for its one entry, so concurrent merges to the same document
//! serialize and the last writer wins on overlapping fields.

use dashmap::DashMap;
use serde_json::{Map, Value};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }

    /// Snapshot of a document, if present.
    pub fn get(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.documents
            .get(&Self::key(collection, id))
            .map(|doc| doc.value().clone())
    }

    /// Overwrite only the supplied fields, creating the document if needed.
    pub fn merge(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        let mut doc = self
            .documents
            .entry(Self::key(collection, id))
            .or_default();
        doc.extend(fields);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.documents.len()
    }
}

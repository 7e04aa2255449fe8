use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use super::{DocumentStore, StoreError};
use crate::document::{Collection, Document, DocumentId};
use crate::mutation::Patch;
use crate::query::{Filter, FindOptions};

/// Process-local store. Used when no database is configured and in tests.
/// Documents of a collection are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: Collection,
        content: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let doc = Document::new(content);
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        guard.entry(collection).or_default().push(doc.clone());
        Ok(doc)
    }

    async fn get(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = guard.get(&collection) else {
            return Ok(Vec::new());
        };
        let matching = docs.iter().filter(|d| filter.matches(d));
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(if options.newest_first {
            matching.rev().take(limit).cloned().collect()
        } else {
            matching.take(limit).cloned().collect()
        })
    }

    async fn modify(
        &self,
        collection: Collection,
        id: DocumentId,
        edit: &mut (dyn for<'a> FnMut(&'a Document) -> Option<Patch> + Send),
    ) -> Result<Option<Document>, StoreError> {
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let Some(doc) = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };
        if let Some(patch) = edit(doc) {
            patch.apply(&mut doc.content);
            doc.updated_at = Utc::now();
        }
        Ok(Some(doc.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

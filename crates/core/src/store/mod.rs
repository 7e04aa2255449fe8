//! Storage access. Handlers depend on the [`DocumentStore`] trait only; the
//! binary picks PostgreSQL or the in-memory backend at start-up.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::{Collection, Document, DocumentId};
use crate::mutation::Patch;
use crate::query::{Filter, FindOptions};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored document is not an object: {0}")]
    Corrupt(DocumentId),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(
        &self,
        collection: Collection,
        content: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    async fn get(&self, collection: Collection, id: DocumentId)
        -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    /// Read-modify-write of one document while holding its lock. `edit` sees
    /// the current document and returns the patch to apply, or `None` to
    /// leave it as is. Returns the resulting document, `None` when the id
    /// does not exist.
    async fn modify(
        &self,
        collection: Collection,
        id: DocumentId,
        edit: &mut (dyn for<'a> FnMut(&'a Document) -> Option<Patch> + Send),
    ) -> Result<Option<Document>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Apply `patch` to one document. `None` when the id does not exist.
    async fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: &Patch,
    ) -> Result<Option<Document>, StoreError> {
        self.modify(collection, id, &mut |_: &Document| Some(patch.clone()))
            .await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let mut found = self
            .find(collection, filter, FindOptions::default().limit(1))
            .await?;
        Ok(found.pop())
    }

    /// Patch the first document matching `filter`, or insert a new one seeded
    /// with the filter's equality fields. Not atomic across the two steps.
    async fn upsert(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Document, StoreError> {
        if let Some(existing) = self.find_one(collection, filter).await? {
            if let Some(updated) = self.update(collection, existing.id, patch).await? {
                return Ok(updated);
            }
        }
        let mut content = Map::new();
        for (field, value) in filter.equalities() {
            content.insert(field.to_string(), value.clone());
        }
        patch.apply(&mut content);
        self.insert(collection, content).await
    }
}

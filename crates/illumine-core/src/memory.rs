//! In-memory reference implementations of the persistence and object-store
//! contracts (§6), suitable for local development and tests. These are
//! explicitly development stubs, not contracts (spec §9 Open Questions #2);
//! the real contracts are the traits in [`crate::external`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Error;
use crate::external::{ObjectStore, Repository};

/// An in-memory keyed store, generic over any record with an explicit id
/// extraction and filter-match function supplied at construction.
pub struct InMemoryRepository<T, Id, Filter> {
    rows: Arc<RwLock<HashMap<Id, T>>>,
    id_of: fn(&T) -> Id,
    matches: fn(&T, &Filter) -> bool,
}

impl<T, Id, Filter> InMemoryRepository<T, Id, Filter>
where
    T: Clone + Send + Sync,
    Id: Eq + Hash + Clone + Send + Sync,
    Filter: Send + Sync,
{
    /// Build an empty repository with the given id extractor and filter
    /// predicate.
    pub fn new(id_of: fn(&T) -> Id, matches: fn(&T, &Filter) -> bool) -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            id_of,
            matches,
        }
    }
}

#[async_trait]
impl<T, Id, Filter> Repository<T> for InMemoryRepository<T, Id, Filter>
where
    T: Clone + Send + Sync,
    Id: Eq + Hash + Clone + Send + Sync,
    Filter: Send + Sync,
{
    type Id = Id;
    type Filter = Filter;

    async fn get(&self, id: &Id) -> Result<Option<T>, Error> {
        Ok(self.rows.read().get(id).cloned())
    }

    async fn list(&self, filter: &Filter) -> Result<Vec<T>, Error> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|row| (self.matches)(row, filter))
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: T) -> Result<(), Error> {
        let id = (self.id_of)(&record);
        self.rows.write().insert(id, record);
        Ok(())
    }

    async fn delete(&self, id: &Id) -> Result<(), Error> {
        self.rows.write().remove(id);
        Ok(())
    }
}

/// An in-memory object store keyed by a generated opaque UUID path, used in
/// place of a real bucket/blob store for local development and tests.
#[derive(Default)]
pub struct InMemoryObjectStore {
    blobs: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl InMemoryObjectStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &str, blob: Vec<u8>, content_type: &str) -> Result<String, Error> {
        let pointer = format!("mem://{path}/{}", Uuid::new_v4());
        if self.blobs.read().contains_key(&pointer) {
            return Err(Error::StorageError(format!(
                "pointer collision at {pointer}"
            )));
        }
        self.blobs
            .write()
            .insert(pointer.clone(), (blob, content_type.to_string()));
        Ok(pointer)
    }

    async fn get(&self, pointer: &str) -> Result<Vec<u8>, Error> {
        self.blobs
            .read()
            .get(pointer)
            .map(|(blob, _)| blob.clone())
            .ok_or_else(|| Error::NotFound {
                kind: "blob",
                id: pointer.to_string(),
            })
    }

    async fn delete(&self, pointer: &str) -> Result<(), Error> {
        self.blobs.write().remove(pointer);
        Ok(())
    }

    async fn exists(&self, pointer: &str) -> Result<bool, Error> {
        Ok(self.blobs.read().contains_key(pointer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u32,
        group: u32,
    }

    fn id_of(row: &Row) -> u32 {
        row.id
    }

    fn matches(row: &Row, filter: &Option<u32>) -> bool {
        filter.map_or(true, |group| row.group == group)
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo: InMemoryRepository<Row, u32, Option<u32>> = InMemoryRepository::new(id_of, matches);
        repo.upsert(Row { id: 1, group: 7 }).await.unwrap();
        let fetched = repo.get(&1).await.unwrap();
        assert_eq!(fetched, Some(Row { id: 1, group: 7 }));
    }

    #[tokio::test]
    async fn list_applies_filter() {
        let repo: InMemoryRepository<Row, u32, Option<u32>> = InMemoryRepository::new(id_of, matches);
        repo.upsert(Row { id: 1, group: 7 }).await.unwrap();
        repo.upsert(Row { id: 2, group: 8 }).await.unwrap();
        let rows = repo.list(&Some(7)).await.unwrap();
        assert_eq!(rows, vec![Row { id: 1, group: 7 }]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let repo: InMemoryRepository<Row, u32, Option<u32>> = InMemoryRepository::new(id_of, matches);
        repo.delete(&42).await.unwrap();
        repo.upsert(Row { id: 1, group: 1 }).await.unwrap();
        repo.delete(&1).await.unwrap();
        repo.delete(&1).await.unwrap();
        assert_eq!(repo.get(&1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn object_store_put_then_get() {
        let store = InMemoryObjectStore::new();
        let pointer = store
            .put("uploads", b"hello".to_vec(), "image/png")
            .await
            .unwrap();
        assert_eq!(store.get(&pointer).await.unwrap(), b"hello");
        assert!(store.exists(&pointer).await.unwrap());
        store.delete(&pointer).await.unwrap();
        assert!(!store.exists(&pointer).await.unwrap());
    }
}

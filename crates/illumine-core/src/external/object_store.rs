//! The object store contract (§6). Paths are opaque per-upload UUIDs; the
//! core never relies on path structure, and overwriting an existing path is
//! never permitted (§5 "Shared resources").

use async_trait::async_trait;

use crate::error::Error;

/// `put/get/delete/exists` over content-addressed-by-upload blobs (§6).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `blob` under a fresh opaque path, returning a public pointer.
    async fn put(&self, path: &str, blob: Vec<u8>, content_type: &str) -> Result<String, Error>;

    /// Retrieve the blob a pointer resolves to.
    async fn get(&self, pointer: &str) -> Result<Vec<u8>, Error>;

    /// Delete the blob a pointer resolves to.
    async fn delete(&self, pointer: &str) -> Result<(), Error>;

    /// Whether a pointer currently resolves to a stored blob.
    async fn exists(&self, pointer: &str) -> Result<bool, Error>;
}

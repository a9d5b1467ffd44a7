//! Persistence layer contract (§6): one repository interface per durable
//! record type, each with `get`, `list`, `upsert`, `delete`, every call
//! idempotent. A single generic trait captures the shape; concrete
//! repositories are type aliases over it, the way `dashflow-memory`'s
//! chat-message-history backends all implement one shared trait regardless
//! of storage technology.

use async_trait::async_trait;

use crate::error::Error;
use crate::model::{
    Chapter, ChapterJob, Entity, EntityLink, EntityReference, EvolutionRecord, GeneratedImage,
    Prompt, QualityReport, Scene, Work,
};

/// `get(id)`, `list(filter)`, `upsert(record)`, `delete(id)`, each
/// idempotent per call (§6).
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Opaque id type for this repository's records.
    type Id: Send + Sync;
    /// Opaque filter type accepted by `list`.
    type Filter: Send + Sync;

    /// Fetch one record by id, or `None` if it does not exist.
    async fn get(&self, id: &Self::Id) -> Result<Option<T>, Error>;

    /// Fetch all records matching a filter.
    async fn list(&self, filter: &Self::Filter) -> Result<Vec<T>, Error>;

    /// Insert or replace a record, keyed by its own id.
    async fn upsert(&self, record: T) -> Result<(), Error>;

    /// Delete a record by id. Deleting an absent id is not an error.
    async fn delete(&self, id: &Self::Id) -> Result<(), Error>;
}

/// A filter over a work's scoped records, the common case for every
/// repository below (all records in this model are owned, directly or
/// transitively, by exactly one `Work`; see spec §3 "Ownership").
#[derive(Debug, Clone, Default)]
pub struct WorkScopedFilter {
    pub work_id: Option<uuid::Uuid>,
    pub chapter_id: Option<uuid::Uuid>,
}

/// Repository for `Work` records.
pub trait WorkRepository: Repository<Work, Id = uuid::Uuid, Filter = WorkScopedFilter> {}
impl<T> WorkRepository for T where T: Repository<Work, Id = uuid::Uuid, Filter = WorkScopedFilter> {}

/// Repository for `Chapter` records.
pub trait ChapterRepository: Repository<Chapter, Id = uuid::Uuid, Filter = WorkScopedFilter> {}
impl<T> ChapterRepository for T where
    T: Repository<Chapter, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `Scene` records.
pub trait SceneRepository: Repository<Scene, Id = uuid::Uuid, Filter = WorkScopedFilter> {}
impl<T> SceneRepository for T where T: Repository<Scene, Id = uuid::Uuid, Filter = WorkScopedFilter> {}

/// Repository for `Entity` records.
pub trait EntityRepository: Repository<Entity, Id = uuid::Uuid, Filter = WorkScopedFilter> {}
impl<T> EntityRepository for T where
    T: Repository<Entity, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `EntityReference` records.
pub trait EntityReferenceRepository:
    Repository<EntityReference, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}
impl<T> EntityReferenceRepository for T where
    T: Repository<EntityReference, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `EvolutionRecord` records. Records are append-only; `id`
/// is `(entity_id, at_chapter)`.
pub trait EvolutionRecordRepository:
    Repository<EvolutionRecord, Id = (uuid::Uuid, u32), Filter = WorkScopedFilter>
{
}
impl<T> EvolutionRecordRepository for T where
    T: Repository<EvolutionRecord, Id = (uuid::Uuid, u32), Filter = WorkScopedFilter>
{
}

/// Repository for `Prompt` records.
pub trait PromptRepository: Repository<Prompt, Id = uuid::Uuid, Filter = WorkScopedFilter> {}
impl<T> PromptRepository for T where
    T: Repository<Prompt, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `GeneratedImage` records.
pub trait GeneratedImageRepository:
    Repository<GeneratedImage, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}
impl<T> GeneratedImageRepository for T where
    T: Repository<GeneratedImage, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `QualityReport` records, keyed by `image_id`.
pub trait QualityReportRepository:
    Repository<QualityReport, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}
impl<T> QualityReportRepository for T where
    T: Repository<QualityReport, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for `ChapterJob` records.
pub trait ChapterJobRepository:
    Repository<ChapterJob, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}
impl<T> ChapterJobRepository for T where
    T: Repository<ChapterJob, Id = uuid::Uuid, Filter = WorkScopedFilter>
{
}

/// Repository for scene<->entity `EntityLink` edges, keyed by
/// `(scene_id, mention_span)`.
pub trait EntityLinkRepository:
    Repository<EntityLink, Id = (uuid::Uuid, (usize, usize)), Filter = WorkScopedFilter>
{
}
impl<T> EntityLinkRepository for T where
    T: Repository<EntityLink, Id = (uuid::Uuid, (usize, usize)), Filter = WorkScopedFilter>
{
}
